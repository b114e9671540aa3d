use std::collections::{BTreeMap, BTreeSet};

use cryxtal_base::{ElementId, MaterialId, ModelId, NodeId, Result};
use cryxtal_scene::{HighlightRequest, Material, RayHit, SceneGraph, Transform};
use tracing::{debug, trace, warn};

use crate::config::SelectionConfig;
use crate::context::Context;
use crate::focus::{FocusTask, PendingFocus};

#[derive(Debug)]
pub struct PickOutcome {
    pub model: ModelId,
    pub elements: Vec<ElementId>,
    pub node: NodeId,
    pub focus: Option<FocusTask>,
}

#[derive(Clone, Debug, Default)]
struct ModelSelection {
    faces: BTreeSet<usize>,
    elements: BTreeSet<ElementId>,
    mesh: Option<NodeId>,
}

pub struct SelectionEngine {
    config: SelectionConfig,
    material: Option<MaterialId>,
    models: BTreeMap<ModelId, ModelSelection>,
    focus: Option<PendingFocus>,
}

impl SelectionEngine {
    pub fn new(scene: &mut dyn SceneGraph, config: SelectionConfig) -> Result<Self> {
        config.validate()?;
        let mut material = Material::basic(config.color).with_opacity(config.opacity);
        material.depth_test = config.depth_test;
        let material = scene.insert_material(material);
        Ok(Self {
            config,
            material: Some(material),
            models: BTreeMap::new(),
            focus: None,
        })
    }

    pub fn config(&self) -> &SelectionConfig {
        &self.config
    }

    pub fn material(&self) -> Option<MaterialId> {
        self.material
    }

    pub fn is_selected(&self, model: ModelId, face_index: usize) -> bool {
        self.models
            .get(&model)
            .is_some_and(|selection| selection.faces.contains(&face_index))
    }

    pub fn selected_models(&self) -> Vec<ModelId> {
        self.models.keys().copied().collect()
    }

    pub fn selected_elements(&self, model: ModelId) -> Vec<ElementId> {
        self.models
            .get(&model)
            .map(|selection| selection.elements.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn selected_faces(&self, model: ModelId) -> Vec<usize> {
        self.models
            .get(&model)
            .map(|selection| selection.faces.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn highlight_node(&self, model: ModelId) -> Option<NodeId> {
        self.models.get(&model).and_then(|selection| selection.mesh)
    }

    pub fn is_focusing(&self) -> bool {
        self.focus.is_some()
    }

    /// Highlights the element under `hit`. Misses, already-highlighted faces
    /// and unresolved elements return `None` without touching any state.
    pub fn pick(
        &mut self,
        ctx: &mut Context<'_>,
        hit: &RayHit,
        focus: bool,
        additive: bool,
    ) -> Option<PickOutcome> {
        let material = self.material?;
        let face_index = hit.face_index?;
        let model = hit.model?;
        if self.is_selected(model, face_index) {
            trace!(model = %model, face_index, "face already highlighted");
            return None;
        }
        let element = ctx.identity.element_at(&*ctx.scene, hit.node, face_index)?;

        if !additive {
            self.clear_previous(ctx);
        }

        let source = ctx.scene.node(hit.node).map(|node| node.transform);
        let node = self.highlight(ctx, material, model, &[element], !additive, source)?;
        let selection = self.models.entry(model).or_default();
        selection.faces.insert(face_index);
        debug!(model = %model, element = %element, face_index, additive, "picked");

        let focus = if focus { self.begin_focus(ctx, node) } else { None };
        Some(PickOutcome {
            model,
            elements: vec![element],
            node,
            focus,
        })
    }

    pub fn pick_by_ids(
        &mut self,
        ctx: &mut Context<'_>,
        model: ModelId,
        ids: &[ElementId],
        focus: bool,
        additive: bool,
    ) -> Option<PickOutcome> {
        let material = self.material?;
        if ids.is_empty() {
            return None;
        }
        let source_node = ctx.identity.model_node(model)?;
        let source = ctx.scene.node(source_node).map(|node| node.transform);

        if !additive {
            self.clear_previous(ctx);
        }

        let node = self.highlight(ctx, material, model, ids, !additive, source)?;
        debug!(model = %model, count = ids.len(), additive, "picked by id");
        let focus = if focus { self.begin_focus(ctx, node) } else { None };
        Some(PickOutcome {
            model,
            elements: ids.to_vec(),
            node,
            focus,
        })
    }

    pub fn clear_selection(&mut self, ctx: &mut Context<'_>) {
        let Some(material) = self.material else {
            return;
        };
        let models = std::mem::take(&mut self.models);
        for (model, selection) in models {
            if let Some(node) = selection.mesh {
                ctx.post.include(node);
            }
            ctx.identity.remove_highlight(&mut *ctx.scene, model, material);
        }
        debug!("selection cleared");
    }

    pub fn set_visible(&self, scene: &mut dyn SceneGraph, visible: bool) {
        for node in self.models.values().filter_map(|selection| selection.mesh) {
            if let Some(node) = scene.node_mut(node) {
                node.visible = visible;
            }
        }
    }

    pub fn update(&mut self, ctx: &mut Context<'_>, _delta: f64) {
        if self.focus.is_none() || ctx.camera.is_focusing() {
            return;
        }
        if let Some(pending) = self.focus.take() {
            pending.finish();
            ctx.post.resume();
            trace!(post_active = ctx.post.is_active(), "focus finished");
        }
    }

    /// Releases every highlight and the highlight material. Safe to repeat.
    pub fn dispose(&mut self, ctx: &mut Context<'_>) {
        if let Some(pending) = self.focus.take() {
            pending.finish();
            ctx.post.resume();
        }
        self.clear_selection(ctx);
        if let Some(material) = self.material.take() {
            ctx.scene.release_material(material);
            debug!("selection disposed");
        }
    }

    fn clear_previous(&mut self, ctx: &mut Context<'_>) {
        if self.config.fast_remove_previous {
            self.set_visible(&mut *ctx.scene, false);
        }
        self.clear_selection(ctx);
    }

    fn highlight(
        &mut self,
        ctx: &mut Context<'_>,
        material: MaterialId,
        model: ModelId,
        ids: &[ElementId],
        remove_previous: bool,
        source: Option<Transform>,
    ) -> Option<NodeId> {
        let request = HighlightRequest {
            model,
            ids,
            remove_previous,
            material,
        };
        let Some(node) = ctx.identity.create_highlight(&mut *ctx.scene, request) else {
            warn!(model = %model, "no highlight geometry for resolved elements");
            return None;
        };
        if let Some(scene_node) = ctx.scene.node_mut(node) {
            if let Some(transform) = source {
                scene_node.transform = transform;
            }
            scene_node.visible = true;
            scene_node.render_order = self.config.render_order;
        }
        ctx.post.exclude(node);

        let selection = self.models.entry(model).or_default();
        if remove_previous {
            selection.elements.clear();
        }
        selection.elements.extend(ids.iter().copied());
        if let Some(previous) = selection.mesh.replace(node) {
            if previous != node {
                ctx.post.include(previous);
            }
        }
        Some(node)
    }

    fn begin_focus(&mut self, ctx: &mut Context<'_>, node: NodeId) -> Option<FocusTask> {
        let bounds = ctx.scene.world_bounds(node)?;
        // One suspension per engine; a focus in flight keeps its own.
        match self.focus.take() {
            Some(previous) => previous.finish(),
            None => ctx.post.suspend(),
        }
        ctx.camera.focus_on(bounds);
        let (pending, task) = PendingFocus::start();
        self.focus = Some(pending);
        debug!(node = %node, "focusing selection");
        Some(task)
    }
}
