//! Draggable gesture states and the drag mediator.
//!
//! A draggable tool owns a list of [`DraggableState`]s. Each state exposes a
//! number of handles plus itself as a whole-region target. The mediator turns
//! planar viewport events into calls on whichever target is under the cursor.

pub mod box_state;

use egui::Shape;
use glam::Vec3;
use shared::MapDocument;
use tracing::trace;

use crate::input::{EventKind, EventOutcome, ViewportEvent};
use crate::tool::Tool;
use crate::viewport::camera::{OrthographicCamera, PerspectiveCamera};
use crate::viewport::mesh::LineMeshData;
use crate::viewport::MapViewport;

/// Part of a gesture state that can be targeted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DragTarget {
    Handle(usize),
    Whole,
}

/// Stable address of a draggable: state index plus target within it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DraggableId {
    pub state: usize,
    pub target: DragTarget,
}

impl DraggableId {
    pub fn handle(state: usize, handle: usize) -> Self {
        Self {
            state,
            target: DragTarget::Handle(handle),
        }
    }

    pub fn whole(state: usize) -> Self {
        Self {
            state,
            target: DragTarget::Whole,
        }
    }
}

/// Everything a draggable may look at while handling a planar event
pub struct DragContext<'a> {
    pub viewport: &'a MapViewport,
    pub camera: &'a OrthographicCamera,
    pub event: &'a ViewportEvent,
    pub document: &'a MapDocument,
}

/// A region or handle set that reacts to hover, click and drag.
/// Positions are flat points in the camera plane.
pub trait DraggableState {
    fn handle_count(&self) -> usize;

    fn can_drag(&self, ctx: &DragContext, position: Vec3, target: DragTarget) -> bool;

    fn set_highlighted(&mut self, target: DragTarget, highlighted: bool);

    fn click(&mut self, _ctx: &DragContext, _position: Vec3, _target: DragTarget) {}
    fn mouse_down(&mut self, _ctx: &DragContext, _position: Vec3, _target: DragTarget) {}
    fn mouse_up(&mut self, _ctx: &DragContext, _position: Vec3, _target: DragTarget) {}

    fn start_drag(&mut self, ctx: &DragContext, position: Vec3, target: DragTarget);
    fn drag(&mut self, ctx: &DragContext, last: Vec3, position: Vec3, target: DragTarget);
    fn end_drag(&mut self, ctx: &DragContext, position: Vec3, target: DragTarget);

    /// World position used to order perspective rendering
    fn origin(&self, target: DragTarget) -> Vec3;

    fn render_planar(&self, _camera: &OrthographicCamera, _target: DragTarget) -> Vec<Shape> {
        Vec::new()
    }

    fn render_perspective(&self, _camera: &PerspectiveCamera, _target: DragTarget) -> Vec<Shape> {
        Vec::new()
    }

    fn build_scene(&self, _mesh: &mut LineMeshData, _target: DragTarget) {}
}

/// Transient bookkeeping of the mediator
#[derive(Debug, Clone, Default)]
pub struct DragCore {
    pub current: Option<DraggableId>,
    last_drag_point: Option<Vec3>,
}

impl DragCore {
    pub fn is_dragging(&self) -> bool {
        self.last_drag_point.is_some()
    }

    /// Forget the current target and any drag in flight
    pub fn reset(&mut self) {
        self.current = None;
        self.last_drag_point = None;
    }
}

/// A tool whose planar input goes through the drag mediator.
///
/// The `on_draggable_*` hooks run before the target's own handler; returning
/// [`EventOutcome::Handled`] suppresses it. `on_draggable_drag_moved` runs
/// after the target applied the move.
pub trait DraggableTool: Tool {
    fn drag_core(&self) -> &DragCore;
    fn drag_core_mut(&mut self) -> &mut DragCore;

    fn state_count(&self) -> usize;
    fn state(&self, index: usize) -> Option<&dyn DraggableState>;
    fn state_mut(&mut self, index: usize) -> Option<&mut dyn DraggableState>;

    fn on_draggable_mouse_down(
        &mut self,
        _ctx: &DragContext,
        _position: Vec3,
        _id: DraggableId,
    ) -> EventOutcome {
        EventOutcome::Unhandled
    }

    fn on_draggable_mouse_up(
        &mut self,
        _ctx: &DragContext,
        _position: Vec3,
        _id: DraggableId,
    ) -> EventOutcome {
        EventOutcome::Unhandled
    }

    fn on_draggable_clicked(
        &mut self,
        _ctx: &DragContext,
        _position: Vec3,
        _id: DraggableId,
    ) -> EventOutcome {
        EventOutcome::Unhandled
    }

    fn on_draggable_drag_started(
        &mut self,
        _ctx: &DragContext,
        _position: Vec3,
        _id: DraggableId,
    ) -> EventOutcome {
        EventOutcome::Unhandled
    }

    fn on_draggable_drag_moving(
        &mut self,
        _ctx: &DragContext,
        _last: Vec3,
        _position: Vec3,
        _id: DraggableId,
    ) -> EventOutcome {
        EventOutcome::Unhandled
    }

    fn on_draggable_drag_moved(
        &mut self,
        _ctx: &DragContext,
        _last: Vec3,
        _position: Vec3,
        _id: DraggableId,
    ) {
    }

    fn on_draggable_drag_ended(
        &mut self,
        _ctx: &DragContext,
        _position: Vec3,
        _id: DraggableId,
    ) -> EventOutcome {
        EventOutcome::Unhandled
    }

    /// Called after a forwarded event reached a target
    fn on_draggable_changed(&mut self, _ctx: &DragContext, _kind: EventKind, _id: DraggableId) {}
}

fn is_valid<T: DraggableTool + ?Sized>(tool: &T, id: DraggableId) -> bool {
    match (tool.state(id.state), id.target) {
        (Some(_), DragTarget::Whole) => true,
        (Some(state), DragTarget::Handle(h)) => h < state.handle_count(),
        (None, _) => false,
    }
}

/// Every draggable of every state, in hit-test order
pub fn all_draggables<T: DraggableTool + ?Sized>(tool: &T) -> Vec<DraggableId> {
    let mut ids = Vec::new();
    for s in 0..tool.state_count() {
        if let Some(state) = tool.state(s) {
            ids.extend((0..state.handle_count()).map(|h| DraggableId::handle(s, h)));
            ids.push(DraggableId::whole(s));
        }
    }
    ids
}

/// Draggables in render order: the current target is drawn last
pub fn render_order<T: DraggableTool + ?Sized>(tool: &T) -> Vec<DraggableId> {
    let current = tool.drag_core().current;
    let mut ids: Vec<_> = all_draggables(tool)
        .into_iter()
        .filter(|&id| Some(id) != current)
        .collect();
    if let Some(current) = current.filter(|&c| is_valid(tool, c)) {
        ids.push(current);
    }
    ids
}

fn invalidate<T: DraggableTool + ?Sized>(tool: &T) {
    tool.node().request_redraw();
}

/// Run one planar event through the mediator
pub fn dispatch<T: DraggableTool + ?Sized>(
    tool: &mut T,
    ctx: &DragContext,
    kind: EventKind,
) -> EventOutcome {
    let event = ctx.event;
    let position = ctx.camera.flatten(ctx.camera.screen_to_world(event.x, event.y));

    if kind == EventKind::MouseMove {
        if !event.dragging && !event.is_left() {
            hover(tool, ctx, position);
        }
        return EventOutcome::Unhandled;
    }

    // Drop a target that no longer exists, e.g. after a mode change
    if let Some(current) = tool.drag_core().current {
        if !is_valid(tool, current) {
            tool.drag_core_mut().current = None;
        }
    }
    let Some(id) = tool.drag_core().current else {
        return EventOutcome::Unhandled;
    };

    let outcome = match kind {
        EventKind::MouseClick => {
            if event.dragging || !event.is_left() {
                return EventOutcome::Unhandled;
            }
            let outcome = tool.on_draggable_clicked(ctx, position, id);
            if !outcome.is_handled() {
                if let Some(state) = tool.state_mut(id.state) {
                    state.click(ctx, position, id.target);
                }
            }
            outcome
        }
        EventKind::MouseDown => {
            if !event.is_left() {
                return EventOutcome::Unhandled;
            }
            let outcome = tool.on_draggable_mouse_down(ctx, position, id);
            if !outcome.is_handled() {
                if let Some(state) = tool.state_mut(id.state) {
                    state.mouse_down(ctx, position, id.target);
                }
            }
            outcome
        }
        EventKind::MouseUp => {
            if !event.is_left() {
                return EventOutcome::Unhandled;
            }
            let outcome = tool.on_draggable_mouse_up(ctx, position, id);
            if !outcome.is_handled() {
                if let Some(state) = tool.state_mut(id.state) {
                    state.mouse_up(ctx, position, id.target);
                }
            }
            outcome
        }
        EventKind::DragStart => {
            if !event.is_left() {
                return EventOutcome::Unhandled;
            }
            let outcome = tool.on_draggable_drag_started(ctx, position, id);
            if !outcome.is_handled() {
                if let Some(state) = tool.state_mut(id.state) {
                    state.start_drag(ctx, position, id.target);
                }
            }
            tool.drag_core_mut().last_drag_point = Some(position);
            outcome
        }
        EventKind::DragMove => {
            if !event.is_left() {
                return EventOutcome::Unhandled;
            }
            let Some(last) = tool.drag_core().last_drag_point else {
                return EventOutcome::Unhandled;
            };
            let outcome = tool.on_draggable_drag_moving(ctx, last, position, id);
            if !outcome.is_handled() {
                if let Some(state) = tool.state_mut(id.state) {
                    state.drag(ctx, last, position, id.target);
                }
                tool.on_draggable_drag_moved(ctx, last, position, id);
            }
            tool.drag_core_mut().last_drag_point = Some(position);
            outcome
        }
        EventKind::DragEnd => {
            if !event.is_left() {
                return EventOutcome::Unhandled;
            }
            let outcome = tool.on_draggable_drag_ended(ctx, position, id);
            if !outcome.is_handled() {
                if let Some(state) = tool.state_mut(id.state) {
                    state.end_drag(ctx, position, id.target);
                }
            }
            tool.drag_core_mut().last_drag_point = None;
            outcome
        }
        _ => return EventOutcome::Unhandled,
    };

    tool.on_draggable_changed(ctx, kind, id);
    invalidate(tool);
    outcome
}

fn hover<T: DraggableTool + ?Sized>(tool: &mut T, ctx: &DragContext, position: Vec3) {
    let found = all_draggables(tool).into_iter().find(|id| {
        tool.state(id.state)
            .is_some_and(|s| s.can_drag(ctx, position, id.target))
    });

    let previous = tool.drag_core().current;
    if found == previous {
        return;
    }
    if let Some(prev) = previous {
        if let Some(state) = tool.state_mut(prev.state) {
            state.set_highlighted(prev.target, false);
        }
    }
    if let Some(next) = found {
        if let Some(state) = tool.state_mut(next.state) {
            state.set_highlighted(next.target, true);
        }
    }
    trace!(?previous, current = ?found, "Current draggable changed");
    tool.drag_core_mut().current = found;
    invalidate(tool);
}

/// Planar overlay of every draggable, current one last
pub fn render_planar_draggables<T: DraggableTool + ?Sized>(
    tool: &T,
    camera: &OrthographicCamera,
) -> Vec<Shape> {
    render_order(tool)
        .into_iter()
        .filter_map(|id| tool.state(id.state).map(|s| s.render_planar(camera, id.target)))
        .flatten()
        .collect()
}

/// Perspective overlay of every draggable, farthest from the camera first
pub fn render_perspective_draggables<T: DraggableTool + ?Sized>(
    tool: &T,
    camera: &PerspectiveCamera,
) -> Vec<Shape> {
    let mut ordered: Vec<(f32, DraggableId)> = render_order(tool)
        .into_iter()
        .filter_map(|id| {
            let state = tool.state(id.state)?;
            Some(((state.origin(id.target) - camera.position).length_squared(), id))
        })
        .collect();
    ordered.sort_by(|a, b| b.0.total_cmp(&a.0));
    ordered
        .into_iter()
        .filter_map(|(_, id)| tool.state(id.state).map(|s| s.render_perspective(camera, id.target)))
        .flatten()
        .collect()
}

pub fn build_scene_draggables<T: DraggableTool + ?Sized>(tool: &T, mesh: &mut LineMeshData) {
    for id in render_order(tool) {
        if let Some(state) = tool.state(id.state) {
            state.build_scene(mesh, id.target);
        }
    }
}
