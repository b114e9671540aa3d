use cryxtal_base::{GeometryId, MaterialId, NodeId, SegmentId};
use cryxtal_scene::math::{MetricSpace, round_to};
use cryxtal_scene::{
    CameraRig, Color, Geometry, Material, Node, Point3, Projection, SceneGraph, Transform, Vector3,
};
use tracing::trace;

use crate::config::MeasurementDisplayConfig;

const ROOT_RENDER_ORDER: i32 = 2;
const ENDPOINT_SEGMENTS: usize = 8;

/// Scale that keeps a marker the same size on screen. Orthographic views do
/// not shrink with depth, so their distance term is compressed tenfold.
pub fn screen_constant_scale(distance: f64, factor: f64, projection: Projection) -> f64 {
    let distance = match projection {
        Projection::Perspective => distance,
        Projection::Orthographic => distance * 0.1,
    };
    distance * factor
}

pub fn format_length(length: f64, config: &MeasurementDisplayConfig) -> String {
    let value = round_to(length / config.display_scale, 2);
    format!("{value} {}", config.unit)
}

#[derive(Clone, Copy, Debug)]
struct Marker {
    node: NodeId,
    geometry: GeometryId,
}

#[derive(Debug)]
pub struct MeasurementSegment {
    id: SegmentId,
    start: Point3,
    end: Point3,
    length: f64,
    center: Point3,
    endpoint_scale: Vector3,
    root: Option<NodeId>,
    line: Option<Marker>,
    line_material: Option<MaterialId>,
    endpoints: Vec<Marker>,
    endpoint_material: Option<MaterialId>,
    label: Option<NodeId>,
    bounding: Option<Marker>,
}

impl MeasurementSegment {
    pub(crate) fn new(
        id: SegmentId,
        scene: &mut dyn SceneGraph,
        camera: &dyn CameraRig,
        start: Point3,
        end: Point3,
        config: &MeasurementDisplayConfig,
    ) -> Self {
        let root = scene.add(Node::group().with_render_order(ROOT_RENDER_ORDER));

        let line_material = scene.insert_material(
            Material::dashed_line(
                config.line_color,
                config.line_width,
                config.dash_size,
                config.gap_size,
            )
            .without_depth_test(),
        );
        let line_geometry = scene.insert_geometry(Geometry::line(start, end));
        let line_node = scene.add(Node::line(line_geometry, line_material).with_parent(root));

        let endpoint_material =
            scene.insert_material(Material::basic(config.endpoint_color).without_depth_test());

        let mut segment = Self {
            id,
            start,
            end,
            length: measure(start, end),
            center: midpoint(start, end),
            endpoint_scale: config.endpoint_scale(),
            root: Some(root),
            line: Some(Marker {
                node: line_node,
                geometry: line_geometry,
            }),
            line_material: Some(line_material),
            endpoints: Vec::with_capacity(2),
            endpoint_material: Some(endpoint_material),
            label: None,
            bounding: None,
        };
        segment.add_endpoints(scene, config);
        let label = Node::label(format_length(segment.length, config), config.label_class.clone())
            .with_parent(root)
            .with_transform(Transform::at(segment.center));
        segment.label = Some(scene.add(label));
        segment.rescale(scene, camera, config);
        segment
    }

    pub fn id(&self) -> SegmentId {
        self.id
    }

    pub fn start(&self) -> Point3 {
        self.start
    }

    pub fn end(&self) -> Point3 {
        self.end
    }

    pub fn length(&self) -> f64 {
        self.length
    }

    pub fn center(&self) -> Point3 {
        self.center
    }

    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    pub fn label(&self) -> Option<NodeId> {
        self.label
    }

    pub fn endpoint_nodes(&self) -> Vec<NodeId> {
        self.endpoints.iter().map(|marker| marker.node).collect()
    }

    pub fn line_geometry(&self) -> Option<GeometryId> {
        self.line.map(|line| line.geometry)
    }

    pub fn materials(&self) -> Vec<MaterialId> {
        [self.line_material, self.endpoint_material]
            .into_iter()
            .flatten()
            .collect()
    }

    pub fn bounding_node(&self) -> Option<NodeId> {
        self.bounding.map(|bounding| bounding.node)
    }

    pub fn is_disposed(&self) -> bool {
        self.root.is_none()
    }

    pub fn label_text<'s>(&self, scene: &'s dyn SceneGraph) -> Option<&'s str> {
        scene.node(self.label?)?.label_text()
    }

    pub fn set_endpoint(
        &mut self,
        scene: &mut dyn SceneGraph,
        point: Point3,
        config: &MeasurementDisplayConfig,
    ) {
        self.end = point;
        let Some(line) = self.line else {
            return;
        };
        if let Some(geometry) = scene.geometry_mut(line.geometry) {
            geometry.set_position(1, point);
        }
        if let [first, second] = self.endpoints.as_slice() {
            if let Some(node) = scene.node_mut(second.node) {
                node.transform.position = point;
                node.transform.look_at(self.start);
            }
            if let Some(node) = scene.node_mut(first.node) {
                node.transform.look_at(point);
            }
        }
        self.length = measure(self.start, self.end);
        self.center = midpoint(self.start, self.end);
        if let Some(label) = self.label.and_then(|label| scene.node_mut(label)) {
            label.set_label_text(format_length(self.length, config));
            label.transform.position = self.center;
        }
        trace!(segment = %self.id, length = self.length, "endpoint moved");
    }

    /// Attaches the pickable box along the segment. Only the first call has
    /// an effect.
    pub(crate) fn create_bounding_volume(
        &mut self,
        scene: &mut dyn SceneGraph,
        camera: &dyn CameraRig,
        config: &MeasurementDisplayConfig,
    ) {
        let Some(root) = self.root else {
            return;
        };
        if self.bounding.is_some() {
            return;
        }
        let geometry = scene.insert_geometry(Geometry::cuboid(1.0, 1.0, self.length));
        let mut transform = Transform::at(self.center);
        transform.look_at(self.end);
        let node = scene.add(
            Node::mesh(geometry, None)
                .with_parent(root)
                .with_transform(transform)
                .hidden(),
        );
        self.bounding = Some(Marker { node, geometry });
        self.rescale(scene, camera, config);
    }

    pub fn rescale(
        &self,
        scene: &mut dyn SceneGraph,
        camera: &dyn CameraRig,
        config: &MeasurementDisplayConfig,
    ) {
        let camera_position = camera.position();
        let projection = camera.projection();
        for marker in &self.endpoints {
            if let Some(node) = scene.node_mut(marker.node) {
                let distance = node.transform.position.distance(camera_position);
                let scale = screen_constant_scale(distance, config.scale_factor, projection);
                node.transform.set_uniform_scale(scale);
            }
        }
        if let Some(bounding) = self.bounding {
            if let Some(node) = scene.node_mut(bounding.node) {
                let distance = node.transform.position.distance(camera_position);
                let scale = screen_constant_scale(distance, config.bounding_size, projection);
                node.transform.scale = Vector3::new(scale, scale, 1.0);
            }
        }
    }

    pub fn set_visible(&self, scene: &mut dyn SceneGraph, visible: bool) {
        for id in [self.root, self.label].into_iter().flatten() {
            if let Some(node) = scene.node_mut(id) {
                node.visible = visible;
            }
        }
    }

    pub fn set_color(&self, scene: &mut dyn SceneGraph, color: Color) {
        for id in self.materials() {
            if let Some(material) = scene.material_mut(id) {
                material.color = color;
            }
        }
    }

    pub fn set_line_width(&self, scene: &mut dyn SceneGraph, width: f64) {
        if let Some(material) = self.line_material.and_then(|id| scene.material_mut(id)) {
            material.set_line_width(width);
        }
    }

    /// Sets the marker scale directly; the next camera change overrides it.
    pub fn set_endpoint_scale(&mut self, scene: &mut dyn SceneGraph, scale: Vector3) {
        self.endpoint_scale = scale;
        for marker in &self.endpoints {
            if let Some(node) = scene.node_mut(marker.node) {
                node.transform.scale = scale;
            }
        }
    }

    pub fn set_endpoint_geometry(
        &mut self,
        scene: &mut dyn SceneGraph,
        camera: &dyn CameraRig,
        config: &MeasurementDisplayConfig,
    ) {
        if self.root.is_none() {
            return;
        }
        self.release_endpoints(scene);
        self.add_endpoints(scene, config);
        self.rescale(scene, camera, config);
    }

    /// Detaches every node and releases every buffer and material this
    /// segment owns. Further calls do nothing.
    pub fn dispose(&mut self, scene: &mut dyn SceneGraph) {
        let Some(root) = self.root.take() else {
            return;
        };
        self.release_endpoints(scene);
        if let Some(label) = self.label.take() {
            scene.remove(label);
        }
        if let Some(line) = self.line.take() {
            scene.remove(line.node);
            scene.release_geometry(line.geometry);
        }
        if let Some(bounding) = self.bounding.take() {
            scene.remove(bounding.node);
            scene.release_geometry(bounding.geometry);
        }
        if let Some(material) = self.line_material.take() {
            scene.release_material(material);
        }
        if let Some(material) = self.endpoint_material.take() {
            scene.release_material(material);
        }
        scene.remove(root);
        trace!(segment = %self.id, "disposed");
    }

    fn add_endpoints(&mut self, scene: &mut dyn SceneGraph, config: &MeasurementDisplayConfig) {
        let (Some(root), Some(material)) = (self.root, self.endpoint_material) else {
            return;
        };
        for (position, toward) in [(self.start, self.end), (self.end, self.start)] {
            let geometry = scene.insert_geometry(Geometry::cone(
                config.endpoint_radius,
                config.endpoint_height,
                ENDPOINT_SEGMENTS,
            ));
            let mut transform = Transform::at(position);
            transform.scale = self.endpoint_scale;
            transform.look_at(toward);
            let node = scene.add(
                Node::mesh(geometry, Some(material))
                    .with_parent(root)
                    .with_transform(transform),
            );
            self.endpoints.push(Marker { node, geometry });
        }
    }

    fn release_endpoints(&mut self, scene: &mut dyn SceneGraph) {
        for marker in self.endpoints.drain(..) {
            scene.remove(marker.node);
            scene.release_geometry(marker.geometry);
        }
    }
}

fn measure(start: Point3, end: Point3) -> f64 {
    round_to(start.distance(end), 2)
}

fn midpoint(start: Point3, end: Point3) -> Point3 {
    start + (end - start) * 0.5
}
