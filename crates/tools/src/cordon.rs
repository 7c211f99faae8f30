//! Cordon tool: resize the document's cordon bounds in planar views

use egui::{Color32, Shape};
use glam::Vec3;
use shared::{Completion, CordonBounds, MapDocument, Operation, Transaction};
use tracing::info;

use crate::draggable::box_state::{BoxAction, BoxDraggableState};
use crate::draggable::{
    build_scene_draggables, dispatch, render_planar_draggables, DragContext, DragCore, DragTarget,
    DraggableId, DraggableState, DraggableTool,
};
use crate::input::{EventKind, EventOutcome, ViewportEvent};
use crate::tool::{Tool, ToolNode, ToolUsage};
use crate::viewport::camera::{Camera, OrthographicCamera, PerspectiveCamera};
use crate::viewport::mesh::LineMeshData;
use crate::viewport::MapViewport;

/// Box mirroring the document's cordon bounds. It cannot be drawn anew,
/// only resized through its handles.
#[derive(Debug, Clone)]
pub struct CordonBoxDraggableState {
    pub inner: BoxDraggableState,
}

impl Default for CordonBoxDraggableState {
    fn default() -> Self {
        let fill = Color32::from_rgba_unmultiplied(255, 0, 0, 32);
        let mut inner = BoxDraggableState::new(Color32::RED, fill);
        inner.whole_draggable = false;
        Self { inner }
    }
}

impl CordonBoxDraggableState {
    /// Mirror the cordon of `document`; Idle without one
    pub fn update(&mut self, document: Option<&MapDocument>) {
        match document {
            None => self.inner.state.set_action(BoxAction::Idle),
            Some(document) => {
                let cordon = document.map.data.cordon;
                self.inner.state.start = cordon.bounds.start;
                self.inner.state.end = cordon.bounds.end;
                self.inner.state.set_action(BoxAction::Drawn);
            }
        }
    }
}

impl DraggableState for CordonBoxDraggableState {
    fn handle_count(&self) -> usize {
        self.inner.handle_count()
    }

    fn can_drag(&self, ctx: &DragContext, position: Vec3, target: DragTarget) -> bool {
        target != DragTarget::Whole && self.inner.can_drag(ctx, position, target)
    }

    fn set_highlighted(&mut self, target: DragTarget, highlighted: bool) {
        self.inner.set_highlighted(target, highlighted);
    }

    fn start_drag(&mut self, ctx: &DragContext, position: Vec3, target: DragTarget) {
        self.inner.start_drag(ctx, position, target);
    }

    fn drag(&mut self, ctx: &DragContext, last: Vec3, position: Vec3, target: DragTarget) {
        self.inner.drag(ctx, last, position, target);
    }

    fn end_drag(&mut self, ctx: &DragContext, position: Vec3, target: DragTarget) {
        self.inner.end_drag(ctx, position, target);
    }

    fn origin(&self, target: DragTarget) -> Vec3 {
        self.inner.origin(target)
    }

    fn render_planar(&self, camera: &OrthographicCamera, target: DragTarget) -> Vec<Shape> {
        self.inner.render_planar(camera, target)
    }

    fn render_perspective(&self, camera: &PerspectiveCamera, target: DragTarget) -> Vec<Shape> {
        self.inner.render_perspective(camera, target)
    }

    fn build_scene(&self, mesh: &mut LineMeshData, target: DragTarget) {
        self.inner.build_scene(mesh, target);
    }
}

pub struct CordonTool {
    node: ToolNode,
    drag: DragCore,
    cordon: CordonBoxDraggableState,
}

impl Default for CordonTool {
    fn default() -> Self {
        Self {
            node: ToolNode::new(ToolUsage::View2D),
            drag: DragCore::default(),
            cordon: CordonBoxDraggableState::default(),
        }
    }
}

impl CordonTool {
    pub fn cordon_box(&self) -> &CordonBoxDraggableState {
        &self.cordon
    }

    fn refresh(&mut self) {
        let handle = self.node.document().cloned();
        let document = handle.as_ref().map(|h| h.borrow());
        self.cordon.update(document.as_deref());
        self.node.request_redraw();
    }
}

impl Tool for CordonTool {
    fn node(&self) -> &ToolNode {
        &self.node
    }

    fn node_mut(&mut self) -> &mut ToolNode {
        &mut self.node
    }

    fn name(&self) -> &str {
        "CordonTool"
    }

    fn handle_event(
        &mut self,
        viewport: &MapViewport,
        kind: EventKind,
        event: &ViewportEvent,
    ) -> EventOutcome {
        let Camera::Planar(camera) = &viewport.camera else {
            return EventOutcome::Unhandled;
        };
        let Some(handle) = self.node.document().cloned() else {
            return EventOutcome::Unhandled;
        };
        let document = handle.borrow();
        let ctx = DragContext {
            viewport,
            camera,
            event,
            document: &document,
        };
        dispatch(self, &ctx, kind)
    }

    fn document_changed(&mut self) {
        self.drag.reset();
        self.refresh();
    }

    fn tool_selected(&mut self) {
        self.refresh();
    }

    fn transaction_completed(&mut self, completion: &Completion) {
        if completion.result.as_ref().is_ok_and(|c| c.data_changed) {
            self.refresh();
        }
    }

    fn render_planar(&self, camera: &OrthographicCamera) -> Vec<Shape> {
        render_planar_draggables(self, camera)
    }

    fn build_scene(&self, mesh: &mut LineMeshData) {
        build_scene_draggables(self, mesh);
    }
}

impl DraggableTool for CordonTool {
    fn drag_core(&self) -> &DragCore {
        &self.drag
    }

    fn drag_core_mut(&mut self) -> &mut DragCore {
        &mut self.drag
    }

    fn state_count(&self) -> usize {
        1
    }

    fn state(&self, index: usize) -> Option<&dyn DraggableState> {
        (index == 0).then_some(&self.cordon as &dyn DraggableState)
    }

    fn state_mut(&mut self, index: usize) -> Option<&mut dyn DraggableState> {
        (index == 0).then_some(&mut self.cordon as &mut dyn DraggableState)
    }

    fn on_draggable_changed(&mut self, ctx: &DragContext, kind: EventKind, _id: DraggableId) {
        if kind != EventKind::DragEnd || self.cordon.inner.state.action != BoxAction::Drawn {
            return;
        }
        let cordon = CordonBounds {
            enabled: ctx.document.map.data.cordon.enabled,
            bounds: self.cordon.inner.state.bounds(),
        };
        if cordon == ctx.document.map.data.cordon {
            return;
        }
        info!(start = ?cordon.bounds.start, end = ?cordon.bounds.end, "Updating cordon bounds");
        ctx.document.submit(Transaction::new(vec![Operation::SetCordon { cordon }]));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::Map;

    #[test]
    fn test_update_mirrors_document() {
        let mut state = CordonBoxDraggableState::default();
        state.update(None);
        assert_eq!(state.inner.state.action, BoxAction::Idle);

        let doc = MapDocument::new(Map::new());
        state.update(Some(&doc));
        assert_eq!(state.inner.state.action, BoxAction::Drawn);
        assert_eq!(state.inner.state.start, Vec3::splat(-1024.0));
        assert_eq!(state.handle_count(), 9);
    }

    #[test]
    fn test_cordon_tool_is_planar_only() {
        let tool = CordonTool::default();
        assert_eq!(tool.node().usage, ToolUsage::View2D);
        assert_eq!(tool.name(), "CordonTool");
    }
}
