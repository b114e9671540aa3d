use std::collections::{BTreeSet, HashMap};

use cryxtal_base::{ElementId, Error, MaterialId, ModelId, NodeId, Result};
use tracing::debug;

use crate::geometry::{Geometry, Material};
use crate::scene::{Node, NodeKind, SceneGraph};

#[derive(Clone, Copy, Debug)]
pub struct HighlightRequest<'a> {
    pub model: ModelId,
    pub ids: &'a [ElementId],
    /// Replace the ids of an existing highlight instead of adding to them.
    pub remove_previous: bool,
    pub material: MaterialId,
}

pub trait ElementIdentity {
    fn element_at(&self, scene: &dyn SceneGraph, node: NodeId, face_index: usize) -> Option<ElementId>;
    fn model_node(&self, model: ModelId) -> Option<NodeId>;
    fn create_highlight(
        &mut self,
        scene: &mut dyn SceneGraph,
        request: HighlightRequest<'_>,
    ) -> Option<NodeId>;
    fn remove_highlight(
        &mut self,
        scene: &mut dyn SceneGraph,
        model: ModelId,
        material: MaterialId,
    ) -> bool;
}

#[derive(Clone, Debug)]
struct ModelEntry {
    node: NodeId,
    face_elements: Vec<ElementId>,
}

#[derive(Clone, Debug)]
struct Subset {
    node: NodeId,
    ids: BTreeSet<ElementId>,
}

#[derive(Debug, Default)]
pub struct SubsetManager {
    models: HashMap<ModelId, ModelEntry>,
    subsets: HashMap<(ModelId, MaterialId), Subset>,
}

impl SubsetManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a model mesh to the scene. `face_elements[i]` is the element that
    /// owns triangle `i`.
    pub fn register_model(
        &mut self,
        scene: &mut dyn SceneGraph,
        model: ModelId,
        geometry: Geometry,
        face_elements: Vec<ElementId>,
    ) -> Result<NodeId> {
        if face_elements.len() != geometry.triangles().len() {
            return Err(Error::InvalidParameter(format!(
                "{model}: {} element ids for {} triangles",
                face_elements.len(),
                geometry.triangles().len()
            )));
        }
        if self.models.contains_key(&model) {
            return Err(Error::InvalidParameter(format!("{model} is already loaded")));
        }
        let material = scene.insert_material(Material::basic(crate::geometry::Color::WHITE));
        let geometry = scene.insert_geometry(geometry);
        let node = scene.add(Node::mesh(geometry, Some(material)).with_model(model));
        self.models.insert(
            model,
            ModelEntry {
                node,
                face_elements,
            },
        );
        Ok(node)
    }

    pub fn highlight_node(&self, model: ModelId, material: MaterialId) -> Option<NodeId> {
        self.subsets.get(&(model, material)).map(|subset| subset.node)
    }

    pub fn highlighted_ids(&self, model: ModelId, material: MaterialId) -> Vec<ElementId> {
        self.subsets
            .get(&(model, material))
            .map(|subset| subset.ids.iter().copied().collect())
            .unwrap_or_default()
    }

    fn build_geometry(
        &self,
        scene: &dyn SceneGraph,
        model: ModelId,
        ids: &BTreeSet<ElementId>,
    ) -> Option<Geometry> {
        let entry = self.models.get(&model)?;
        let source = scene.node(entry.node)?.geometry()?;
        let source = scene.geometry(source)?;
        let faces = entry
            .face_elements
            .iter()
            .enumerate()
            .filter(|(_, id)| ids.contains(*id))
            .map(|(face, _)| face);
        let geometry = source.subset(faces);
        if geometry.triangles().is_empty() {
            None
        } else {
            Some(geometry)
        }
    }
}

impl ElementIdentity for SubsetManager {
    fn element_at(&self, scene: &dyn SceneGraph, node: NodeId, face_index: usize) -> Option<ElementId> {
        let model = scene.node(node)?.model?;
        let entry = self.models.get(&model)?;
        entry.face_elements.get(face_index).copied()
    }

    fn model_node(&self, model: ModelId) -> Option<NodeId> {
        self.models.get(&model).map(|entry| entry.node)
    }

    fn create_highlight(
        &mut self,
        scene: &mut dyn SceneGraph,
        request: HighlightRequest<'_>,
    ) -> Option<NodeId> {
        let key = (request.model, request.material);
        let mut ids: BTreeSet<ElementId> = request.ids.iter().copied().collect();
        if !request.remove_previous {
            if let Some(existing) = self.subsets.get(&key) {
                ids.extend(existing.ids.iter().copied());
            }
        }

        let Some(geometry) = self.build_geometry(&*scene, request.model, &ids) else {
            self.remove_highlight(scene, request.model, request.material);
            return None;
        };

        if let Some(subset) = self.subsets.get_mut(&key) {
            let replaced = scene.insert_geometry(geometry);
            if let Some(node) = scene.node_mut(subset.node) {
                let old = node.geometry();
                node.kind = NodeKind::Mesh {
                    geometry: replaced,
                    material: Some(request.material),
                };
                if let Some(old) = old {
                    scene.release_geometry(old);
                }
                subset.ids = ids;
                debug!(model = %request.model, count = subset.ids.len(), "subset rebuilt");
                return Some(subset.node);
            }
            // The node was removed behind our back; build a fresh one below.
            scene.release_geometry(replaced);
            self.subsets.remove(&key);
            let geometry = self.build_geometry(&*scene, request.model, &ids)?;
            return Some(self.insert_subset(scene, key, geometry, ids));
        }

        Some(self.insert_subset(scene, key, geometry, ids))
    }

    fn remove_highlight(
        &mut self,
        scene: &mut dyn SceneGraph,
        model: ModelId,
        material: MaterialId,
    ) -> bool {
        let Some(subset) = self.subsets.remove(&(model, material)) else {
            return false;
        };
        let geometry = scene.node(subset.node).and_then(Node::geometry);
        scene.remove(subset.node);
        if let Some(geometry) = geometry {
            scene.release_geometry(geometry);
        }
        debug!(model = %model, "subset removed");
        true
    }
}

impl SubsetManager {
    fn insert_subset(
        &mut self,
        scene: &mut dyn SceneGraph,
        key: (ModelId, MaterialId),
        geometry: Geometry,
        ids: BTreeSet<ElementId>,
    ) -> NodeId {
        let geometry = scene.insert_geometry(geometry);
        let node = scene.add(Node::mesh(geometry, Some(key.1)).with_model(key.0));
        debug!(model = %key.0, count = ids.len(), "subset created");
        self.subsets.insert(key, Subset { node, ids });
        node
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::MemoryScene;

    fn boxed(scene: &mut MemoryScene, manager: &mut SubsetManager) -> NodeId {
        let elements = (0..12).map(|face| ElementId(face / 2 + 1)).collect();
        manager
            .register_model(scene, ModelId(0), Geometry::cuboid(1.0, 1.0, 1.0), elements)
            .unwrap()
    }

    #[test]
    fn rejects_mismatched_face_table() {
        let mut scene = MemoryScene::new();
        let mut manager = SubsetManager::new();
        let result = manager.register_model(
            &mut scene,
            ModelId(0),
            Geometry::cuboid(1.0, 1.0, 1.0),
            vec![ElementId(1)],
        );
        assert!(result.is_err());
    }

    #[test]
    fn element_lookup_by_face() {
        let mut scene = MemoryScene::new();
        let mut manager = SubsetManager::new();
        let node = boxed(&mut scene, &mut manager);
        assert_eq!(manager.element_at(&scene, node, 5), Some(ElementId(3)));
        assert_eq!(manager.element_at(&scene, node, 12), None);
    }

    #[test]
    fn additive_requests_merge_and_keep_the_node() {
        let mut scene = MemoryScene::new();
        let mut manager = SubsetManager::new();
        boxed(&mut scene, &mut manager);
        let material = scene.insert_material(Material::basic(crate::geometry::Color::BLACK));

        let first = manager
            .create_highlight(
                &mut scene,
                HighlightRequest {
                    model: ModelId(0),
                    ids: &[ElementId(1)],
                    remove_previous: true,
                    material,
                },
            )
            .unwrap();
        let second = manager
            .create_highlight(
                &mut scene,
                HighlightRequest {
                    model: ModelId(0),
                    ids: &[ElementId(2)],
                    remove_previous: false,
                    material,
                },
            )
            .unwrap();
        assert_eq!(first, second);
        assert_eq!(
            manager.highlighted_ids(ModelId(0), material),
            vec![ElementId(1), ElementId(2)]
        );
        let geometry = scene.node(second).and_then(Node::geometry).unwrap();
        assert_eq!(scene.geometry(geometry).unwrap().triangles().len(), 4);
        // model geometry + current subset geometry
        assert_eq!(scene.geometry_count(), 2);
    }

    #[test]
    fn unknown_ids_build_nothing() {
        let mut scene = MemoryScene::new();
        let mut manager = SubsetManager::new();
        boxed(&mut scene, &mut manager);
        let material = scene.insert_material(Material::basic(crate::geometry::Color::BLACK));
        let node = manager.create_highlight(
            &mut scene,
            HighlightRequest {
                model: ModelId(0),
                ids: &[ElementId(99)],
                remove_previous: true,
                material,
            },
        );
        assert!(node.is_none());
        assert_eq!(scene.node_count(), 1);
    }

    #[test]
    fn remove_releases_node_and_geometry() {
        let mut scene = MemoryScene::new();
        let mut manager = SubsetManager::new();
        boxed(&mut scene, &mut manager);
        let material = scene.insert_material(Material::basic(crate::geometry::Color::BLACK));
        let node = manager
            .create_highlight(
                &mut scene,
                HighlightRequest {
                    model: ModelId(0),
                    ids: &[ElementId(4)],
                    remove_previous: true,
                    material,
                },
            )
            .unwrap();
        assert!(manager.remove_highlight(&mut scene, ModelId(0), material));
        assert!(!scene.contains(node));
        assert_eq!(scene.geometry_count(), 1);
        assert!(!manager.remove_highlight(&mut scene, ModelId(0), material));
    }
}
