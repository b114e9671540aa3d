use std::cmp::Ordering;

use cryxtal_base::{ModelId, NodeId};

use crate::math::{Point3, Ray, ray_intersect_triangle, transform_point};
use crate::scene::{NodeKind, SceneGraph};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Face {
    pub a: usize,
    pub b: usize,
    pub c: usize,
}

impl Face {
    pub fn indices(&self) -> [usize; 3] {
        [self.a, self.b, self.c]
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct RayHit {
    pub node: NodeId,
    pub model: Option<ModelId>,
    pub face_index: Option<usize>,
    pub face: Option<Face>,
    pub point: Point3,
    pub distance: f64,
}

impl RayHit {
    pub fn at_point(node: NodeId, point: Point3, distance: f64) -> Self {
        Self {
            node,
            model: None,
            face_index: None,
            face: None,
            point,
            distance,
        }
    }
}

/// Ray queries against scene meshes. Results are ordered nearest first.
pub trait RayHitProvider {
    fn cast(&self, scene: &dyn SceneGraph, ray: &Ray, candidates: &[NodeId]) -> Vec<RayHit>;
    fn cast_pointer(&self, scene: &dyn SceneGraph, candidates: &[NodeId]) -> Vec<RayHit>;
    fn cast_models(&self, scene: &dyn SceneGraph) -> Option<RayHit>;
}

/// Brute-force triangle caster over mesh nodes, hidden ones included.
#[derive(Clone, Debug, Default)]
pub struct MeshRayCaster {
    pointer: Option<Ray>,
    models: Vec<NodeId>,
}

impl MeshRayCaster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_pointer_ray(&mut self, ray: Option<Ray>) {
        self.pointer = ray;
    }

    pub fn pointer_ray(&self) -> Option<Ray> {
        self.pointer
    }

    pub fn add_pickable(&mut self, node: NodeId) {
        if !self.models.contains(&node) {
            self.models.push(node);
        }
    }

    fn cast_node(&self, scene: &dyn SceneGraph, ray: &Ray, id: NodeId, hits: &mut Vec<RayHit>) {
        let Some(node) = scene.node(id) else {
            return;
        };
        let NodeKind::Mesh { geometry, .. } = node.kind else {
            return;
        };
        let Some(geometry) = scene.geometry(geometry) else {
            return;
        };
        let Some(matrix) = scene.world_matrix(id) else {
            return;
        };
        let positions = geometry.positions();
        for (face_index, tri) in geometry.triangles().iter().enumerate() {
            let (Some(a), Some(b), Some(c)) = (
                positions.get(tri[0]),
                positions.get(tri[1]),
                positions.get(tri[2]),
            ) else {
                continue;
            };
            let a = transform_point(&matrix, *a);
            let b = transform_point(&matrix, *b);
            let c = transform_point(&matrix, *c);
            if let Some(t) = ray_intersect_triangle(ray, a, b, c) {
                hits.push(RayHit {
                    node: id,
                    model: node.model,
                    face_index: Some(face_index),
                    face: Some(Face {
                        a: tri[0],
                        b: tri[1],
                        c: tri[2],
                    }),
                    point: ray.at(t),
                    distance: t,
                });
            }
        }
    }
}

impl RayHitProvider for MeshRayCaster {
    fn cast(&self, scene: &dyn SceneGraph, ray: &Ray, candidates: &[NodeId]) -> Vec<RayHit> {
        let mut hits = Vec::new();
        for id in candidates {
            self.cast_node(scene, ray, *id, &mut hits);
        }
        hits.sort_by(|a, b| a.distance.partial_cmp(&b.distance).unwrap_or(Ordering::Equal));
        hits
    }

    fn cast_pointer(&self, scene: &dyn SceneGraph, candidates: &[NodeId]) -> Vec<RayHit> {
        match self.pointer {
            Some(ray) => self.cast(scene, &ray, candidates),
            None => Vec::new(),
        }
    }

    fn cast_models(&self, scene: &dyn SceneGraph) -> Option<RayHit> {
        self.cast_pointer(scene, &self.models).into_iter().next()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cgmath::InnerSpace;
    use crate::geometry::Geometry;
    use crate::math::{Transform, Vector3, point};
    use crate::scene::{MemoryScene, Node};

    fn down_ray(x: f64, y: f64) -> Ray {
        Ray::new(point(x, y, 10.0), Vector3::new(0.0, 0.0, -1.0)).unwrap()
    }

    #[test]
    fn nearest_hit_first() {
        let mut scene = MemoryScene::new();
        let low = scene.insert_geometry(Geometry::plane(4.0, 4.0, 0.0));
        let high = scene.insert_geometry(Geometry::plane(4.0, 4.0, 2.0));
        let low = scene.add(Node::mesh(low, None));
        let high = scene.add(Node::mesh(high, None));

        let caster = MeshRayCaster::new();
        let hits = caster.cast(&scene, &down_ray(0.5, -0.5), &[low, high]);
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].node, high);
        assert!((hits[0].distance - 8.0).abs() < 1.0e-9);
        assert!(hits[0].face.is_some());
    }

    #[test]
    fn hidden_meshes_are_still_hit() {
        let mut scene = MemoryScene::new();
        let geometry = scene.insert_geometry(Geometry::cuboid(1.0, 1.0, 1.0));
        let node = scene.add(
            Node::mesh(geometry, None)
                .hidden()
                .with_transform(Transform::at(point(3.0, 0.0, 0.0))),
        );
        let caster = MeshRayCaster::new();
        assert_eq!(caster.cast(&scene, &down_ray(3.2, -0.1), &[node]).len(), 2);
        assert!(caster.cast(&scene, &down_ray(0.0, 0.0), &[node]).is_empty());
    }

    #[test]
    fn model_cast_uses_pointer_ray() {
        let mut scene = MemoryScene::new();
        let geometry = scene.insert_geometry(Geometry::plane(4.0, 4.0, 0.0));
        let node = scene.add(Node::mesh(geometry, None).with_model(ModelId(7)));
        let mut caster = MeshRayCaster::new();
        caster.add_pickable(node);
        assert!(caster.cast_models(&scene).is_none());

        caster.set_pointer_ray(Some(down_ray(1.0, -0.5)));
        let hit = caster.cast_models(&scene).unwrap();
        assert_eq!(hit.model, Some(ModelId(7)));
        assert!((hit.point - point(1.0, -0.5, 0.0)).magnitude() < 1.0e-9);
    }
}
