//! The select tool.
//!
//! In planar views a click selects the first object under the cursor, a
//! dragged empty box selects everything inside it once confirmed, and the box
//! around the selection transforms it through its handles. In perspective
//! views a click ray-casts into the scene and the wheel cycles through the
//! objects behind the cursor while the button is held.

pub mod normalize;
pub mod pick;
pub mod selection_box;
pub mod transform;

use egui::{Color32, Shape};
use glam::{Mat4, Vec3};
use shared::{Completion, MapDocument, ObjectId, Ticket};
use tracing::debug;

use crate::draggable::box_state::{BoxAction, BoxDraggableState};
use crate::draggable::{
    build_scene_draggables, dispatch, render_perspective_draggables, render_planar_draggables,
    DragContext, DragCore, DragTarget, DraggableId, DraggableState, DraggableTool,
};
use crate::input::{EventKind, EventOutcome, Key, Modifiers, ViewportEvent};
use crate::settings::SelectToolSettings;
use crate::snap::nudge_value;
use crate::tool::{Tool, ToolNode, ToolUsage};
use crate::viewport::camera::{Camera, OrthographicCamera, PerspectiveCamera};
use crate::viewport::mesh::{color_to_f32, LineMeshData};
use crate::viewport::MapViewport;
use normalize::{regroup_transaction, set_selected};
use pick::{box_intersections, selection_test, PickContext};
use selection_box::{preview_outline, SelectionBoxDraggableState};
use transform::{execute_transform, TextureTransformationType};

const SELECTION_BOX: usize = 0;
const EMPTY_BOX: usize = 1;

pub struct SelectTool {
    node: ToolNode,
    drag: DragCore,
    settings: SelectToolSettings,
    selection_box: SelectionBoxDraggableState,
    empty_box: BoxDraggableState,
    pick: Option<PickContext>,
    /// Transform shown on the selection while a handle is dragged
    preview: Mat4,
    pending_reset: Option<Ticket>,
    status: String,
    last_ignore_grouping: bool,
}

impl Default for SelectTool {
    fn default() -> Self {
        Self::new(SelectToolSettings::default())
    }
}

impl SelectTool {
    pub fn new(settings: SelectToolSettings) -> Self {
        let opacity = settings.selection_box_background_opacity;
        let fill = Color32::from_rgba_unmultiplied(255, 255, 255, opacity);
        let mut selection_box =
            SelectionBoxDraggableState::new(fill, settings.selection_box_stippled);
        selection_box.inner.box_color = Color32::YELLOW;
        let mut empty_box = BoxDraggableState::new(Color32::YELLOW, fill);
        empty_box.stippled = settings.selection_box_stippled;

        Self {
            node: ToolNode::new(ToolUsage::Both),
            drag: DragCore::default(),
            settings,
            selection_box,
            empty_box,
            pick: None,
            preview: Mat4::IDENTITY,
            pending_reset: None,
            status: String::new(),
            last_ignore_grouping: false,
        }
    }

    pub fn settings(&self) -> &SelectToolSettings {
        &self.settings
    }

    pub fn selection_box(&self) -> &SelectionBoxDraggableState {
        &self.selection_box
    }

    pub fn empty_box(&self) -> &BoxDraggableState {
        &self.empty_box
    }

    pub fn preview_transform(&self) -> Mat4 {
        self.preview
    }

    /// "W x L x H" of the transformed box while a handle is dragged
    pub fn status_text(&self) -> &str {
        &self.status
    }

    pub fn pick_context(&self) -> Option<&PickContext> {
        self.pick.as_ref()
    }

    fn with_document<R>(&mut self, f: impl FnOnce(&mut Self, &MapDocument) -> R) -> Option<R> {
        let handle = self.node.document().cloned()?;
        let document = handle.borrow();
        Some(f(self, &document))
    }

    fn ignore_grouping(document: &MapDocument) -> bool {
        document.map.data.selection_options.ignore_grouping
    }

    fn set_selected(
        &self,
        document: &MapDocument,
        deselect: impl IntoIterator<Item = ObjectId>,
        select: impl IntoIterator<Item = ObjectId>,
        deselect_all: bool,
    ) -> Option<Ticket> {
        set_selected(document, deselect, select, deselect_all, Self::ignore_grouping(document))
    }

    /// Fit the boxes to the current selection
    fn update_box_from_selection(&mut self, document: &MapDocument) {
        match document.selection_bounding_box().filter(|_| !document.selection().is_empty()) {
            None => {
                self.selection_box.set_action(BoxAction::Idle);
                if self.empty_box.state.action == BoxAction::Drawn {
                    self.empty_box.state.set_action(BoxAction::Idle);
                }
            }
            Some(bounds) => {
                self.empty_box.state.set_action(BoxAction::Idle);
                self.selection_box.inner.state.start = bounds.start;
                self.selection_box.inner.state.end = bounds.end;
                self.selection_box.set_action(BoxAction::Drawn);
            }
        }
        self.node.request_redraw();
    }

    fn ignore_grouping_changed(&mut self, document: &MapDocument) {
        let ignore = Self::ignore_grouping(document);
        self.last_ignore_grouping = ignore;
        if let Some(transaction) = regroup_transaction(document, ignore) {
            debug!(ignore_grouping = ignore, "Regrouping selection");
            document.submit(transaction);
        }
    }

    fn ignore_grouping_possibly_changed(&mut self, document: &MapDocument) {
        if Self::ignore_grouping(document) != self.last_ignore_grouping {
            self.ignore_grouping_changed(document);
        }
    }

    /// Select what the drawn empty box covers; shift keeps only objects
    /// entirely inside it
    fn confirm(&mut self, document: &MapDocument, modifiers: Modifiers) -> bool {
        if self.selection_box.action() != BoxAction::Idle
            || self.empty_box.state.action != BoxAction::Drawn
        {
            return false;
        }
        if let Some(region) = self.empty_box.state.selection_box() {
            let objects = box_intersections(document, &region, modifiers.shift);
            debug!(count = objects.len(), contained = modifiers.shift, "Confirming box selection");
            self.set_selected(document, [], objects, false);
        }
        self.update_box_from_selection(document);
        true
    }

    fn cancel(&mut self, document: &MapDocument) {
        if self.selection_box.action() != BoxAction::Idle && !document.selection().is_empty() {
            self.set_selected(document, [], [], true);
        }
        self.drag.reset();
        self.selection_box.set_action(BoxAction::Idle);
        self.empty_box.state.set_action(BoxAction::Idle);
        self.reset_preview();
        self.update_box_from_selection(document);
    }

    fn key_down(
        &mut self,
        document: &MapDocument,
        camera: Option<&OrthographicCamera>,
        event: &ViewportEvent,
    ) -> EventOutcome {
        match event.key {
            Some(Key::Enter) => {
                self.confirm(document, event.modifiers);
                EventOutcome::Handled
            }
            Some(Key::Escape) => {
                self.cancel(document);
                EventOutcome::Handled
            }
            Some(key) => {
                let Some(camera) = camera else {
                    return EventOutcome::Unhandled;
                };
                self.nudge(document, camera, event.modifiers, key)
            }
            None => EventOutcome::Unhandled,
        }
    }

    fn nudge(
        &mut self,
        document: &MapDocument,
        camera: &OrthographicCamera,
        modifiers: Modifiers,
        key: Key,
    ) -> EventOutcome {
        let Some(nudge) = nudge_value(document, modifiers, key) else {
            return EventOutcome::Unhandled;
        };
        if self.selection_box.action() != BoxAction::Drawn || document.selection().is_empty() {
            return EventOutcome::Unhandled;
        }
        let matrix = Mat4::from_translation(camera.expand(nudge));
        execute_transform(
            document,
            "Nudge",
            matrix,
            modifiers.shift,
            TextureTransformationType::Uniform,
            self.settings.keep_visgroups_when_cloning,
        );
        self.update_box_from_selection(document);
        EventOutcome::Handled
    }

    fn mouse_down_perspective(
        &mut self,
        viewport: &MapViewport,
        camera: &PerspectiveCamera,
        document: &MapDocument,
        event: &ViewportEvent,
    ) -> EventOutcome {
        if !event.is_left() {
            return EventOutcome::Unhandled;
        }
        let ray = camera.cast_ray_from_screen(event.x, event.y);
        let pick = PickContext::from_ray(&document.map, &ray);
        let ctrl = event.modifiers.ctrl;

        let chosen: Vec<ObjectId> = pick.chosen.into_iter().collect();
        let deselect_chosen = ctrl && pick.chosen.is_some_and(|id| document.is_selected(id));
        if deselect_chosen {
            self.set_selected(document, chosen, [], !ctrl);
        } else {
            self.set_selected(document, [], chosen, !ctrl);
        }

        debug!(hits = pick.intersecting.len(), "Perspective pick");
        if pick.is_capturing() {
            viewport.acquire_input_lock();
        }
        self.pick = Some(pick);
        EventOutcome::Handled
    }

    fn mouse_wheel_perspective(
        &mut self,
        document: &MapDocument,
        event: &ViewportEvent,
    ) -> EventOutcome {
        let Some(pick) = self.pick.as_mut().filter(|p| p.is_capturing()) else {
            return EventOutcome::Unhandled;
        };
        let Some((previous, chosen)) = pick.cycle(event.wheel_delta) else {
            return EventOutcome::Handled;
        };

        let mut select = Vec::new();
        let mut deselect = Vec::new();
        for id in [previous, chosen] {
            if document.is_selected(id) {
                deselect.push(id);
            } else {
                select.push(id);
            }
        }
        self.set_selected(document, deselect, select, false);
        EventOutcome::Handled
    }

    fn mouse_up_perspective(&mut self, viewport: &MapViewport) -> EventOutcome {
        self.pick = None;
        viewport.release_input_lock();
        EventOutcome::Unhandled
    }

    fn reset_preview(&mut self) {
        self.preview = Mat4::IDENTITY;
        self.pending_reset = None;
        self.status.clear();
        self.node.request_redraw();
    }

    fn handle_planar(
        &mut self,
        viewport: &MapViewport,
        camera: &OrthographicCamera,
        document: &MapDocument,
        kind: EventKind,
        event: &ViewportEvent,
    ) -> EventOutcome {
        if kind == EventKind::KeyDown {
            return self.key_down(document, Some(camera), event);
        }
        let ctx = DragContext {
            viewport,
            camera,
            event,
            document,
        };
        dispatch(self, &ctx, kind)
    }

    fn handle_perspective(
        &mut self,
        viewport: &MapViewport,
        camera: &PerspectiveCamera,
        document: &MapDocument,
        kind: EventKind,
        event: &ViewportEvent,
    ) -> EventOutcome {
        match kind {
            EventKind::MouseDown => self.mouse_down_perspective(viewport, camera, document, event),
            EventKind::MouseWheel => self.mouse_wheel_perspective(document, event),
            EventKind::MouseUp => self.mouse_up_perspective(viewport),
            EventKind::KeyDown => self.key_down(document, None, event),
            _ => EventOutcome::Unhandled,
        }
    }

    fn is_center_handle(&self, id: DraggableId) -> bool {
        match id.target {
            DragTarget::Handle(i) => {
                id.state == SELECTION_BOX && i == self.selection_box.center_index()
            }
            DragTarget::Whole => false,
        }
    }

    fn is_transform_handle(&self, id: DraggableId) -> bool {
        id.state == SELECTION_BOX && matches!(id.target, DragTarget::Handle(_))
    }
}

impl Tool for SelectTool {
    fn node(&self) -> &ToolNode {
        &self.node
    }

    fn node_mut(&mut self) -> &mut ToolNode {
        &mut self.node
    }

    fn name(&self) -> &str {
        "SelectTool"
    }

    fn handle_event(
        &mut self,
        viewport: &MapViewport,
        kind: EventKind,
        event: &ViewportEvent,
    ) -> EventOutcome {
        self.with_document(|tool, document| match &viewport.camera {
            Camera::Planar(camera) => tool.handle_planar(viewport, camera, document, kind, event),
            Camera::Perspective(camera) => {
                tool.handle_perspective(viewport, camera, document, kind, event)
            }
        })
        .unwrap_or_default()
    }

    fn document_changed(&mut self) {
        self.drag.reset();
        self.pick = None;
        self.selection_box.set_action(BoxAction::Idle);
        self.empty_box.state.set_action(BoxAction::Idle);
        self.reset_preview();
        self.with_document(|tool, document| {
            tool.last_ignore_grouping = Self::ignore_grouping(document);
            tool.update_box_from_selection(document);
        });
    }

    fn tool_selected(&mut self) {
        self.with_document(|tool, document| {
            tool.ignore_grouping_changed(document);
            tool.update_box_from_selection(document);
        });
    }

    fn tool_deselected(&mut self) {
        self.pick = None;
        self.drag.reset();
    }

    fn transaction_completed(&mut self, completion: &Completion) {
        if self.pending_reset == Some(completion.ticket) {
            self.reset_preview();
        }
        let Ok(change) = &completion.result else {
            return;
        };
        self.with_document(|tool, document| {
            if change.objects_changed || change.selection_changed {
                tool.update_box_from_selection(document);
            }
            if change.data_changed {
                tool.ignore_grouping_possibly_changed(document);
            }
        });
    }

    fn is_capturing_mouse_wheel(&self) -> bool {
        self.pick.as_ref().is_some_and(PickContext::is_capturing)
    }

    fn render_planar(&self, camera: &OrthographicCamera) -> Vec<Shape> {
        let mut shapes = render_planar_draggables(self, camera);
        if self.preview != Mat4::IDENTITY && self.selection_box.action() == BoxAction::Resizing {
            let outline = preview_outline(camera, &self.selection_box, &self.preview, Color32::RED);
            shapes.extend(outline);
        }
        shapes
    }

    fn render_perspective(&self, camera: &PerspectiveCamera) -> Vec<Shape> {
        render_perspective_draggables(self, camera)
    }

    fn build_scene(&self, mesh: &mut LineMeshData) {
        build_scene_draggables(self, mesh);
        if self.preview != Mat4::IDENTITY {
            let color = color_to_f32(Color32::RED);
            for line in self.selection_box.inner.state.orig_box().lines() {
                mesh.push_line(
                    self.preview.transform_point3(line.start),
                    self.preview.transform_point3(line.end),
                    color,
                );
            }
        }
    }
}

impl DraggableTool for SelectTool {
    fn drag_core(&self) -> &DragCore {
        &self.drag
    }

    fn drag_core_mut(&mut self) -> &mut DragCore {
        &mut self.drag
    }

    fn state_count(&self) -> usize {
        2
    }

    fn state(&self, index: usize) -> Option<&dyn DraggableState> {
        match index {
            SELECTION_BOX => Some(&self.selection_box),
            EMPTY_BOX => Some(&self.empty_box),
            _ => None,
        }
    }

    fn state_mut(&mut self, index: usize) -> Option<&mut dyn DraggableState> {
        match index {
            SELECTION_BOX => Some(&mut self.selection_box),
            EMPTY_BOX => Some(&mut self.empty_box),
            _ => None,
        }
    }

    fn on_draggable_clicked(
        &mut self,
        ctx: &DragContext,
        _position: Vec3,
        id: DraggableId,
    ) -> EventOutcome {
        let ctrl = ctx.event.modifiers.ctrl;
        if id.state == EMPTY_BOX || ctrl {
            let policy = self.settings.filter_policy();
            let hit = selection_test(ctx.document, ctx.camera, ctx.event.x, ctx.event.y, policy);
            let (deselect, select): (Vec<_>, Vec<_>) = match hit {
                Some(h) if ctrl && ctx.document.is_selected(h) => (vec![h], Vec::new()),
                Some(h) => (Vec::new(), vec![h]),
                None => (Vec::new(), Vec::new()),
            };
            self.set_selected(ctx.document, deselect, select, !ctrl);
        } else if self.selection_box.action() == BoxAction::Drawn && self.is_center_handle(id) {
            self.selection_box.cycle();
            // Handle indices shift with the mode; keep pointing at the center
            let center = self.selection_box.center_index();
            self.drag.current = Some(DraggableId::handle(SELECTION_BOX, center));
        }
        EventOutcome::Unhandled
    }

    fn on_draggable_drag_started(
        &mut self,
        ctx: &DragContext,
        _position: Vec3,
        id: DraggableId,
    ) -> EventOutcome {
        if id.state == EMPTY_BOX
            && !ctx.event.modifiers.ctrl
            && !ctx.document.selection().is_empty()
        {
            self.set_selected(ctx.document, [], [], true);
        }
        EventOutcome::Unhandled
    }

    fn on_draggable_drag_moved(
        &mut self,
        ctx: &DragContext,
        _last: Vec3,
        _position: Vec3,
        id: DraggableId,
    ) {
        if self.selection_box.action() != BoxAction::Resizing || !self.is_transform_handle(id) {
            return;
        }
        let Some(matrix) = self.selection_box.transformation_matrix(ctx.camera, ctx.document) else {
            return;
        };
        self.preview = matrix;
        let bounds = self.selection_box.inner.state.orig_box().transform(&matrix);
        self.status = if bounds.is_empty() {
            String::new()
        } else {
            format!("{:.0} x {:.0} x {:.0}", bounds.width(), bounds.length(), bounds.height())
        };
    }

    fn on_draggable_drag_ended(
        &mut self,
        ctx: &DragContext,
        _position: Vec3,
        id: DraggableId,
    ) -> EventOutcome {
        let mut submitted = None;
        if self.selection_box.action() == BoxAction::Resizing && self.is_transform_handle(id) {
            if let (Some(matrix), Some(handle)) = (
                self.selection_box.transformation_matrix(ctx.camera, ctx.document),
                self.selection_box.active_handle(),
            ) {
                let texture_transform =
                    self.selection_box.texture_transformation_type(ctx.document);
                let clone = ctx.event.modifiers.shift && handle.is_center();
                submitted = Some(execute_transform(
                    ctx.document,
                    handle.name(),
                    matrix,
                    clone,
                    texture_transform,
                    self.settings.keep_visgroups_when_cloning,
                ));
            }
        }
        match submitted {
            Some(ticket) => self.pending_reset = Some(ticket),
            None => self.reset_preview(),
        }
        EventOutcome::Unhandled
    }

    fn on_draggable_changed(&mut self, ctx: &DragContext, kind: EventKind, id: DraggableId) {
        if id.state != EMPTY_BOX {
            return;
        }
        if self.empty_box.state.action != BoxAction::Idle
            && self.selection_box.action() != BoxAction::Idle
        {
            self.selection_box.set_action(BoxAction::Idle);
        }
        if kind == EventKind::DragEnd && self.settings.auto_select_box {
            self.confirm(ctx.document, ctx.event.modifiers);
        }
    }
}
