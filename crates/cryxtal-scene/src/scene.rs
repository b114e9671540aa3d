use std::collections::{BTreeMap, HashMap};

use cryxtal_base::{GeometryId, MaterialId, ModelId, NodeId};

use crate::geometry::{Geometry, Material};
use crate::math::{Aabb, Matrix4, Transform};

#[derive(Clone, Debug, PartialEq)]
pub enum NodeKind {
    Group,
    Mesh {
        geometry: GeometryId,
        material: Option<MaterialId>,
    },
    Line {
        geometry: GeometryId,
        material: MaterialId,
    },
    Label {
        text: String,
        class_name: String,
    },
}

#[derive(Clone, Debug, PartialEq)]
pub struct Node {
    pub kind: NodeKind,
    pub transform: Transform,
    pub visible: bool,
    pub render_order: i32,
    pub parent: Option<NodeId>,
    pub model: Option<ModelId>,
}

impl Node {
    pub fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            transform: Transform::default(),
            visible: true,
            render_order: 0,
            parent: None,
            model: None,
        }
    }

    pub fn group() -> Self {
        Self::new(NodeKind::Group)
    }

    pub fn mesh(geometry: GeometryId, material: Option<MaterialId>) -> Self {
        Self::new(NodeKind::Mesh { geometry, material })
    }

    pub fn line(geometry: GeometryId, material: MaterialId) -> Self {
        Self::new(NodeKind::Line { geometry, material })
    }

    pub fn label(text: impl Into<String>, class_name: impl Into<String>) -> Self {
        Self::new(NodeKind::Label {
            text: text.into(),
            class_name: class_name.into(),
        })
    }

    pub fn with_parent(mut self, parent: NodeId) -> Self {
        self.parent = Some(parent);
        self
    }

    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = transform;
        self
    }

    pub fn with_render_order(mut self, render_order: i32) -> Self {
        self.render_order = render_order;
        self
    }

    pub fn with_model(mut self, model: ModelId) -> Self {
        self.model = Some(model);
        self
    }

    pub fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }

    pub fn geometry(&self) -> Option<GeometryId> {
        match self.kind {
            NodeKind::Mesh { geometry, .. } | NodeKind::Line { geometry, .. } => Some(geometry),
            NodeKind::Group | NodeKind::Label { .. } => None,
        }
    }

    pub fn label_text(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Label { text, .. } => Some(text),
            _ => None,
        }
    }

    pub fn set_label_text(&mut self, value: impl Into<String>) {
        if let NodeKind::Label { text, .. } = &mut self.kind {
            *text = value.into();
        }
    }
}

pub trait SceneGraph {
    fn add(&mut self, node: Node) -> NodeId;
    /// Detaches the node and all of its descendants.
    fn remove(&mut self, id: NodeId) -> bool;
    fn contains(&self, id: NodeId) -> bool;
    fn node(&self, id: NodeId) -> Option<&Node>;
    fn node_mut(&mut self, id: NodeId) -> Option<&mut Node>;

    fn insert_geometry(&mut self, geometry: Geometry) -> GeometryId;
    fn geometry(&self, id: GeometryId) -> Option<&Geometry>;
    fn geometry_mut(&mut self, id: GeometryId) -> Option<&mut Geometry>;
    fn release_geometry(&mut self, id: GeometryId) -> bool;

    fn insert_material(&mut self, material: Material) -> MaterialId;
    fn material(&self, id: MaterialId) -> Option<&Material>;
    fn material_mut(&mut self, id: MaterialId) -> Option<&mut Material>;
    fn release_material(&mut self, id: MaterialId) -> bool;

    fn world_matrix(&self, id: NodeId) -> Option<Matrix4> {
        let node = self.node(id)?;
        let local = node.transform.matrix();
        match node.parent {
            Some(parent) => self.world_matrix(parent).map(|world| world * local),
            None => Some(local),
        }
    }

    fn world_bounds(&self, id: NodeId) -> Option<Aabb> {
        let geometry = self.node(id)?.geometry()?;
        let bounds = self.geometry(geometry)?.bounds()?;
        Some(bounds.transformed(&self.world_matrix(id)?))
    }
}

#[derive(Debug, Default)]
pub struct MemoryScene {
    nodes: BTreeMap<NodeId, Node>,
    geometries: HashMap<GeometryId, Geometry>,
    materials: HashMap<MaterialId, Material>,
    next_node: u64,
    next_geometry: u64,
    next_material: u64,
}

impl MemoryScene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn geometry_count(&self) -> usize {
        self.geometries.len()
    }

    pub fn material_count(&self) -> usize {
        self.materials.len()
    }

    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &Node)> {
        self.nodes.iter().map(|(id, node)| (*id, node))
    }

    pub fn children(&self, parent: NodeId) -> Vec<NodeId> {
        self.nodes
            .iter()
            .filter(|(_, node)| node.parent == Some(parent))
            .map(|(id, _)| *id)
            .collect()
    }
}

impl SceneGraph for MemoryScene {
    fn add(&mut self, node: Node) -> NodeId {
        let id = NodeId(self.next_node);
        self.next_node += 1;
        self.nodes.insert(id, node);
        id
    }

    fn remove(&mut self, id: NodeId) -> bool {
        if self.nodes.remove(&id).is_none() {
            return false;
        }
        let mut stack = self.children(id);
        while let Some(child) = stack.pop() {
            stack.extend(self.children(child));
            self.nodes.remove(&child);
        }
        true
    }

    fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(&id)
    }

    fn insert_geometry(&mut self, geometry: Geometry) -> GeometryId {
        let id = GeometryId(self.next_geometry);
        self.next_geometry += 1;
        self.geometries.insert(id, geometry);
        id
    }

    fn geometry(&self, id: GeometryId) -> Option<&Geometry> {
        self.geometries.get(&id)
    }

    fn geometry_mut(&mut self, id: GeometryId) -> Option<&mut Geometry> {
        self.geometries.get_mut(&id)
    }

    fn release_geometry(&mut self, id: GeometryId) -> bool {
        self.geometries.remove(&id).is_some()
    }

    fn insert_material(&mut self, material: Material) -> MaterialId {
        let id = MaterialId(self.next_material);
        self.next_material += 1;
        self.materials.insert(id, material);
        id
    }

    fn material(&self, id: MaterialId) -> Option<&Material> {
        self.materials.get(&id)
    }

    fn material_mut(&mut self, id: MaterialId) -> Option<&mut Material> {
        self.materials.get_mut(&id)
    }

    fn release_material(&mut self, id: MaterialId) -> bool {
        self.materials.remove(&id).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::{Transform, point};

    #[test]
    fn remove_detaches_descendants() {
        let mut scene = MemoryScene::new();
        let root = scene.add(Node::group());
        let child = scene.add(Node::group().with_parent(root));
        let grandchild = scene.add(Node::label("1 m", "label").with_parent(child));
        let other = scene.add(Node::group());

        assert!(scene.remove(root));
        assert!(!scene.contains(child));
        assert!(!scene.contains(grandchild));
        assert!(scene.contains(other));
        assert!(!scene.remove(root));
    }

    #[test]
    fn world_matrix_composes_parents() {
        let mut scene = MemoryScene::new();
        let root = scene.add(Node::group().with_transform(Transform::at(point(1.0, 0.0, 0.0))));
        let geometry = scene.insert_geometry(Geometry::cuboid(2.0, 2.0, 2.0));
        let child = scene.add(
            Node::mesh(geometry, None)
                .with_parent(root)
                .with_transform(Transform::at(point(0.0, 3.0, 0.0))),
        );
        let bounds = scene.world_bounds(child).unwrap();
        assert!((bounds.center().x - 1.0).abs() < 1.0e-9);
        assert!((bounds.center().y - 3.0).abs() < 1.0e-9);
    }

    #[test]
    fn release_is_reported_once() {
        let mut scene = MemoryScene::new();
        let geometry = scene.insert_geometry(Geometry::default());
        assert!(scene.release_geometry(geometry));
        assert!(!scene.release_geometry(geometry));
        assert_eq!(scene.geometry_count(), 0);
    }
}
