mod segment;
mod snap;

pub use segment::{MeasurementSegment, format_length, screen_constant_scale};
pub use snap::{hit_vertices, nearest_within, snap_hit};

use cryxtal_base::{NodeId, Result, SegmentId};
use cryxtal_scene::{Color, Node, Point3, Ray, RayHit, SceneGraph, Vector3};
use tracing::{debug, trace};

use crate::config::MeasurementDisplayConfig;
use crate::context::Context;

#[derive(Clone, Copy, Debug)]
pub enum DragTarget<'h> {
    Hit(&'h RayHit),
    /// Already resolved point, e.g. on a helper plane. Used as is.
    Point(Point3),
}

#[derive(Debug)]
enum ToolState {
    Idle,
    Armed,
    Dragging(MeasurementSegment),
}

impl ToolState {
    fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Armed => "armed",
            Self::Dragging(_) => "dragging",
        }
    }
}

pub struct DimensionEngine {
    config: MeasurementDisplayConfig,
    state: ToolState,
    segments: Vec<MeasurementSegment>,
    preview: bool,
    preview_node: Option<NodeId>,
    next_id: u64,
}

impl DimensionEngine {
    pub fn new(config: MeasurementDisplayConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            state: ToolState::Idle,
            segments: Vec::new(),
            preview: false,
            preview_node: None,
            next_id: 0,
        })
    }

    pub fn config(&self) -> &MeasurementDisplayConfig {
        &self.config
    }

    pub fn is_enabled(&self) -> bool {
        !matches!(self.state, ToolState::Idle)
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self.state, ToolState::Dragging(_))
    }

    pub fn preview_active(&self) -> bool {
        self.preview
    }

    pub fn preview_node(&self) -> Option<NodeId> {
        self.preview_node
    }

    pub fn segments(&self) -> &[MeasurementSegment] {
        &self.segments
    }

    pub fn segment(&self, id: SegmentId) -> Option<&MeasurementSegment> {
        self.segments.iter().find(|segment| segment.id() == id)
    }

    pub fn current(&self) -> Option<&MeasurementSegment> {
        match &self.state {
            ToolState::Dragging(segment) => Some(segment),
            _ => None,
        }
    }

    /// Arms or disarms the tool. Disarming cancels a drag in progress.
    /// Persisted dimensions are only shown while the tool is armed.
    pub fn enable(&mut self, ctx: &mut Context<'_>, enabled: bool) {
        if enabled == self.is_enabled() {
            return;
        }
        if !enabled {
            self.cancel(ctx);
            self.state = ToolState::Idle;
        } else {
            self.state = ToolState::Armed;
        }
        for segment in &self.segments {
            segment.set_visible(&mut *ctx.scene, enabled);
        }
        debug!(state = self.state.name(), "dimension tool toggled");
    }

    pub fn start_at(&mut self, ctx: &mut Context<'_>, target: DragTarget<'_>) -> Option<Point3> {
        if !matches!(self.state, ToolState::Armed) {
            trace!(state = self.state.name(), "start ignored");
            return None;
        }
        let anchor = self.resolve(&*ctx.scene, target);
        let id = SegmentId(self.next_id);
        self.next_id += 1;
        let segment =
            MeasurementSegment::new(id, &mut *ctx.scene, &*ctx.camera, anchor, anchor, &self.config);
        self.state = ToolState::Dragging(segment);
        debug!(segment = %id, x = anchor.x, y = anchor.y, z = anchor.z, "dimension started");
        Some(anchor)
    }

    pub fn update_drag(&mut self, ctx: &mut Context<'_>, target: DragTarget<'_>) -> Option<Point3> {
        if !self.is_dragging() {
            return None;
        }
        let point = self.resolve(&*ctx.scene, target);
        self.drag_to(ctx, point);
        Some(point)
    }

    pub fn commit(&mut self, ctx: &mut Context<'_>) -> Option<SegmentId> {
        let mut segment = self.take_current()?;
        segment.create_bounding_volume(&mut *ctx.scene, &*ctx.camera, &self.config);
        let id = segment.id();
        debug!(segment = %id, length = segment.length(), "dimension committed");
        self.segments.push(segment);
        Some(id)
    }

    pub fn cancel(&mut self, ctx: &mut Context<'_>) -> bool {
        let Some(mut segment) = self.take_current() else {
            return false;
        };
        segment.dispose(&mut *ctx.scene);
        debug!(segment = %segment.id(), "dimension cancelled");
        true
    }

    pub fn create(&mut self, ctx: &mut Context<'_>) -> Option<SegmentId> {
        match self.state {
            ToolState::Idle => None,
            ToolState::Dragging(_) => self.commit(ctx),
            ToolState::Armed => {
                let hit = ctx.rays.cast_models(&*ctx.scene)?;
                self.start_at(ctx, DragTarget::Hit(&hit));
                None
            }
        }
    }

    /// Like [`create`](Self::create), but starts on a helper plane under the
    /// pointer without snapping.
    pub fn create_in_plane(&mut self, ctx: &mut Context<'_>, plane: NodeId) -> Option<SegmentId> {
        match self.state {
            ToolState::Idle => None,
            ToolState::Dragging(_) => self.commit(ctx),
            ToolState::Armed => {
                let hit = ctx.rays.cast_pointer(&*ctx.scene, &[plane]).into_iter().next()?;
                self.start_at(ctx, DragTarget::Point(hit.point));
                None
            }
        }
    }

    pub fn delete_at(&mut self, ctx: &mut Context<'_>, ray: &Ray) -> Option<SegmentId> {
        if !self.is_enabled() || self.segments.is_empty() {
            return None;
        }
        let boxes = self.bounding_nodes();
        let hit = ctx.rays.cast(&*ctx.scene, ray, &boxes).into_iter().next()?;
        self.remove_by_bounding(ctx, hit.node)
    }

    pub fn delete(&mut self, ctx: &mut Context<'_>) -> Option<SegmentId> {
        if !self.is_enabled() || self.segments.is_empty() {
            return None;
        }
        let boxes = self.bounding_nodes();
        let hit = ctx.rays.cast_pointer(&*ctx.scene, &boxes).into_iter().next()?;
        self.remove_by_bounding(ctx, hit.node)
    }

    pub fn clear_all(&mut self, ctx: &mut Context<'_>) -> usize {
        let count = self.segments.len();
        for mut segment in self.segments.drain(..) {
            segment.dispose(&mut *ctx.scene);
        }
        if count > 0 {
            debug!(count, "dimensions cleared");
        }
        count
    }

    pub fn update(&mut self, ctx: &mut Context<'_>, _delta: f64) {
        if !self.is_enabled() || !self.preview {
            return;
        }
        let snapped = ctx
            .rays
            .cast_models(&*ctx.scene)
            .map(|hit| snap_hit(&*ctx.scene, &hit, self.config.snap_radius));
        if let Some(node) = self.preview_node.and_then(|id| ctx.scene.node_mut(id)) {
            node.visible = snapped.is_some();
            if let Some(point) = snapped {
                node.transform.position = point;
            }
        }
        let Some(point) = snapped else {
            return;
        };
        trace!(x = point.x, y = point.y, z = point.z, "preview");
        if self.is_dragging() {
            self.drag_to(ctx, point);
        }
    }

    /// Keeps markers and pick boxes at a constant screen size. Call when the
    /// camera reports a change.
    pub fn on_camera_changed(&mut self, ctx: &mut Context<'_>) {
        for segment in self.segments.iter().chain(self.current()) {
            segment.rescale(&mut *ctx.scene, &*ctx.camera, &self.config);
        }
    }

    pub fn set_preview_active(&mut self, ctx: &mut Context<'_>, active: bool) {
        self.preview = active;
        match (active, self.preview_node) {
            (true, None) => {
                let node = Node::label("", self.config.preview_class.clone()).hidden();
                self.preview_node = Some(ctx.scene.add(node));
            }
            (false, Some(node)) => {
                ctx.scene.remove(node);
                self.preview_node = None;
            }
            _ => {}
        }
    }

    pub fn set_dimensions_color(&mut self, ctx: &mut Context<'_>, color: Color) {
        self.config.line_color = color;
        self.config.endpoint_color = color;
        for segment in self.segments.iter().chain(self.current()) {
            segment.set_color(&mut *ctx.scene, color);
        }
    }

    pub fn set_dimensions_width(&mut self, ctx: &mut Context<'_>, width: f64) -> Result<()> {
        cryxtal_base::ensure_positive("line_width", width)?;
        self.config.line_width = width;
        for segment in self.segments.iter().chain(self.current()) {
            segment.set_line_width(&mut *ctx.scene, width);
        }
        Ok(())
    }

    pub fn set_endpoint_scale(&mut self, ctx: &mut Context<'_>, scale: Vector3) -> Result<()> {
        for value in [scale.x, scale.y, scale.z] {
            cryxtal_base::ensure_positive("endpoint_scale", value)?;
        }
        self.config.endpoint_scale = [scale.x, scale.y, scale.z];
        for segment in self.segments_mut() {
            segment.set_endpoint_scale(&mut *ctx.scene, scale);
        }
        Ok(())
    }

    pub fn set_endpoint_scale_factor(&mut self, ctx: &mut Context<'_>, factor: f64) -> Result<()> {
        cryxtal_base::ensure_positive("scale_factor", factor)?;
        self.config.scale_factor = factor;
        self.on_camera_changed(ctx);
        Ok(())
    }

    pub fn set_endpoint_geometry(
        &mut self,
        ctx: &mut Context<'_>,
        height: f64,
        radius: f64,
    ) -> Result<()> {
        cryxtal_base::ensure_positive("endpoint_height", height)?;
        cryxtal_base::ensure_positive("endpoint_radius", radius)?;
        self.config.endpoint_height = height;
        self.config.endpoint_radius = radius;
        let config = self.config.clone();
        for segment in self.segments_mut() {
            segment.set_endpoint_geometry(&mut *ctx.scene, &*ctx.camera, &config);
        }
        Ok(())
    }

    pub fn dispose(&mut self, ctx: &mut Context<'_>) {
        self.cancel(ctx);
        self.clear_all(ctx);
        self.set_preview_active(ctx, false);
        self.state = ToolState::Idle;
    }

    fn take_current(&mut self) -> Option<MeasurementSegment> {
        if !self.is_dragging() {
            return None;
        }
        match std::mem::replace(&mut self.state, ToolState::Armed) {
            ToolState::Dragging(segment) => Some(segment),
            _ => None,
        }
    }

    fn resolve(&self, scene: &dyn SceneGraph, target: DragTarget<'_>) -> Point3 {
        match target {
            DragTarget::Hit(hit) => snap_hit(scene, hit, self.config.snap_radius),
            DragTarget::Point(point) => point,
        }
    }

    fn drag_to(&mut self, ctx: &mut Context<'_>, point: Point3) {
        if let ToolState::Dragging(segment) = &mut self.state {
            segment.set_endpoint(&mut *ctx.scene, point, &self.config);
        }
    }

    fn bounding_nodes(&self) -> Vec<NodeId> {
        self.segments
            .iter()
            .filter_map(MeasurementSegment::bounding_node)
            .collect()
    }

    fn remove_by_bounding(&mut self, ctx: &mut Context<'_>, node: NodeId) -> Option<SegmentId> {
        let index = self
            .segments
            .iter()
            .position(|segment| segment.bounding_node() == Some(node))?;
        let mut segment = self.segments.remove(index);
        segment.dispose(&mut *ctx.scene);
        debug!(segment = %segment.id(), "dimension deleted");
        Some(segment.id())
    }

    fn segments_mut(&mut self) -> impl Iterator<Item = &mut MeasurementSegment> {
        let current = match &mut self.state {
            ToolState::Dragging(segment) => Some(segment),
            _ => None,
        };
        self.segments.iter_mut().chain(current)
    }
}

impl std::fmt::Debug for DimensionEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DimensionEngine")
            .field("state", &self.state.name())
            .field("segments", &self.segments.len())
            .field("preview", &self.preview)
            .finish()
    }
}

