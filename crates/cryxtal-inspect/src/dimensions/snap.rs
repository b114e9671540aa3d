use cryxtal_scene::math::{MetricSpace, transform_point};
use cryxtal_scene::{Point3, RayHit, SceneGraph, VertexSource};

/// Nearest candidate within `radius` of `point`. A candidate exactly on the
/// radius still snaps; on ties the later candidate wins.
pub fn nearest_within<I>(point: Point3, candidates: I, radius: f64) -> Option<Point3>
where
    I: IntoIterator<Item = Point3>,
{
    let mut best: Option<(Point3, f64)> = None;
    for candidate in candidates {
        let distance = point.distance(candidate);
        if distance > radius {
            continue;
        }
        match best {
            Some((_, best_distance)) if distance > best_distance => {}
            _ => best = Some((candidate, distance)),
        }
    }
    best.map(|(candidate, _)| candidate)
}

pub fn hit_vertices(scene: &dyn SceneGraph, hit: &RayHit) -> Option<[Point3; 3]> {
    let face = hit.face?;
    let geometry = scene.node(hit.node)?.geometry()?;
    let source: &dyn VertexSource = scene.geometry(geometry)?;
    let matrix = scene.world_matrix(hit.node)?;
    let [a, b, c] = face.indices();
    Some([
        transform_point(&matrix, source.vertex_at(a)?),
        transform_point(&matrix, source.vertex_at(b)?),
        transform_point(&matrix, source.vertex_at(c)?),
    ])
}

pub fn snap_hit(scene: &dyn SceneGraph, hit: &RayHit, radius: f64) -> Point3 {
    hit_vertices(scene, hit)
        .and_then(|vertices| nearest_within(hit.point, vertices, radius))
        .unwrap_or(hit.point)
}

#[cfg(test)]
mod tests {
    use super::*;
    use cryxtal_base::NodeId;
    use cryxtal_scene::{Face, Geometry, MemoryScene, Node, Transform, point};

    #[test]
    fn boundary_distance_snaps() {
        let snapped = nearest_within(point(0.0, 0.0, 0.0), [point(0.25, 0.0, 0.0)], 0.25);
        assert_eq!(snapped, Some(point(0.25, 0.0, 0.0)));
    }

    #[test]
    fn picks_the_closest_candidate() {
        let snapped = nearest_within(
            point(0.0, 0.0, 0.0),
            [point(0.2, 0.0, 0.0), point(0.1, 0.0, 0.0), point(0.0, 0.15, 0.0)],
            0.25,
        );
        assert_eq!(snapped, Some(point(0.1, 0.0, 0.0)));
    }

    #[test]
    fn hit_without_face_keeps_raw_point() {
        let scene = MemoryScene::new();
        let hit = RayHit::at_point(NodeId(0), point(1.0, 2.0, 3.0), 4.0);
        assert_eq!(snap_hit(&scene, &hit, 0.25), point(1.0, 2.0, 3.0));
    }

    #[test]
    fn vertices_follow_the_node_transform() {
        let mut scene = MemoryScene::new();
        let geometry = scene.insert_geometry(Geometry::plane(2.0, 2.0, 0.0));
        let node = scene.add(
            Node::mesh(geometry, None).with_transform(Transform::at(point(10.0, 0.0, 0.0))),
        );
        let hit = RayHit {
            node,
            model: None,
            face_index: Some(0),
            face: Some(Face { a: 0, b: 1, c: 2 }),
            point: point(10.9, 0.9, 0.0),
            distance: 1.0,
        };
        assert_eq!(snap_hit(&scene, &hit, 0.25), point(11.0, 1.0, 0.0));
        assert_eq!(snap_hit(&scene, &hit, 0.1), point(10.9, 0.9, 0.0));
    }
}
