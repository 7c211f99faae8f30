//! Box gesture: draw a region, then resize or move it with handles

use egui::{Color32, Shape, Stroke};
use glam::Vec3;
use shared::{BoundingBox, EPSILON, WORLD_EXTENT};
use tracing::debug;

use super::{DragContext, DragTarget, DraggableState};
use crate::snap::{snap_if_needed, snap_to_selection};
use crate::viewport::camera::{OrthographicCamera, PerspectiveCamera};
use crate::viewport::mesh::{color_to_f32, LineMeshData};
use crate::viewport::overlays;

/// Screen distance within which a handle is hit
pub const HANDLE_HIT_PIXELS: f32 = 5.0;
const HANDLE_DRAW_PIXELS: f32 = 4.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BoxAction {
    #[default]
    Idle,
    Drawing,
    Drawn,
    Resizing,
}

/// Lifecycle and geometry of a box. `start`/`end` are world points; the
/// snapshot taken when a resize begins is the base of every preview.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BoxState {
    pub action: BoxAction,
    pub start: Vec3,
    pub end: Vec3,
    orig: Option<(Vec3, Vec3)>,
}

impl BoxState {
    pub fn set_action(&mut self, action: BoxAction) {
        if self.action != action {
            debug!(from = ?self.action, to = ?action, "Box action changed");
            self.action = action;
        }
        if action != BoxAction::Resizing {
            self.orig = None;
        }
    }

    /// Enter Resizing; the snapshot is taken only once per gesture
    pub fn begin_resize(&mut self) {
        if self.orig.is_none() {
            self.orig = Some((self.start, self.end));
        }
        self.set_action(BoxAction::Resizing);
    }

    pub fn orig_start(&self) -> Vec3 {
        self.orig.map_or(self.start, |o| o.0)
    }

    pub fn orig_end(&self) -> Vec3 {
        self.orig.map_or(self.end, |o| o.1)
    }

    pub fn orig_box(&self) -> BoundingBox {
        BoundingBox::new(self.orig_start(), self.orig_end())
    }

    pub fn bounds(&self) -> BoundingBox {
        BoundingBox::new(self.start, self.end)
    }

    pub fn is_visible(&self) -> bool {
        self.action != BoxAction::Idle
    }

    /// Region to select with: flat axes as drawn, any degenerate axis
    /// extended through the whole world. None when the box has no area.
    pub fn selection_box(&self) -> Option<BoundingBox> {
        let b = self.bounds();
        let dims = b.dimensions();
        let degenerate = (0..3).filter(|&a| dims[a].abs() < EPSILON).count();
        if degenerate > 1 {
            return None;
        }
        let (mut start, mut end) = (b.start, b.end);
        for axis in 0..3 {
            if dims[axis].abs() < EPSILON {
                start[axis] = -WORLD_EXTENT;
                end[axis] = WORLD_EXTENT;
            }
        }
        Some(BoundingBox { start, end })
    }

    pub fn cancel(&mut self) {
        self.set_action(BoxAction::Idle);
    }
}

/// Resize handles of a box; corners first, center last
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResizeHandle {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
    Top,
    Bottom,
    Left,
    Right,
    Center,
}

impl ResizeHandle {
    pub const ALL: [ResizeHandle; 9] = [
        ResizeHandle::TopLeft,
        ResizeHandle::TopRight,
        ResizeHandle::BottomLeft,
        ResizeHandle::BottomRight,
        ResizeHandle::Top,
        ResizeHandle::Bottom,
        ResizeHandle::Left,
        ResizeHandle::Right,
        ResizeHandle::Center,
    ];

    pub const CORNERS: [ResizeHandle; 4] = [
        ResizeHandle::TopLeft,
        ResizeHandle::TopRight,
        ResizeHandle::BottomLeft,
        ResizeHandle::BottomRight,
    ];

    pub const EDGES: [ResizeHandle; 4] = [
        ResizeHandle::Top,
        ResizeHandle::Bottom,
        ResizeHandle::Left,
        ResizeHandle::Right,
    ];

    fn moves_left(self) -> bool {
        matches!(self, ResizeHandle::TopLeft | ResizeHandle::BottomLeft | ResizeHandle::Left)
    }

    fn moves_right(self) -> bool {
        matches!(self, ResizeHandle::TopRight | ResizeHandle::BottomRight | ResizeHandle::Right)
    }

    fn moves_top(self) -> bool {
        matches!(self, ResizeHandle::TopLeft | ResizeHandle::TopRight | ResizeHandle::Top)
    }

    fn moves_bottom(self) -> bool {
        matches!(self, ResizeHandle::BottomLeft | ResizeHandle::BottomRight | ResizeHandle::Bottom)
    }

    /// Flat anchor on a box given by its flat min/max corners
    pub fn anchor(self, min: Vec3, max: Vec3) -> Vec3 {
        let mid = (min + max) / 2.0;
        let x = if self.moves_left() {
            min.x
        } else if self.moves_right() {
            max.x
        } else {
            mid.x
        };
        let y = if self.moves_top() {
            max.y
        } else if self.moves_bottom() {
            min.y
        } else {
            mid.y
        };
        Vec3::new(x, y, 0.0)
    }

    /// The handle on the other side of the box
    pub fn opposite(self) -> ResizeHandle {
        match self {
            ResizeHandle::TopLeft => ResizeHandle::BottomRight,
            ResizeHandle::TopRight => ResizeHandle::BottomLeft,
            ResizeHandle::BottomLeft => ResizeHandle::TopRight,
            ResizeHandle::BottomRight => ResizeHandle::TopLeft,
            ResizeHandle::Top => ResizeHandle::Bottom,
            ResizeHandle::Bottom => ResizeHandle::Top,
            ResizeHandle::Left => ResizeHandle::Right,
            ResizeHandle::Right => ResizeHandle::Left,
            ResizeHandle::Center => ResizeHandle::Center,
        }
    }

    /// Move the edges this handle controls to `position`, on flat corners
    pub fn resize(self, min: Vec3, max: Vec3, position: Vec3) -> (Vec3, Vec3) {
        let (mut min, mut max) = (min, max);
        if self.moves_left() {
            min.x = position.x;
        }
        if self.moves_right() {
            max.x = position.x;
        }
        if self.moves_top() {
            max.y = position.y;
        }
        if self.moves_bottom() {
            min.y = position.y;
        }
        (min.min(max), min.max(max))
    }
}

/// Flat min/max of a world box
pub fn flat_corners(camera: &OrthographicCamera, start: Vec3, end: Vec3) -> (Vec3, Vec3) {
    let a = camera.flatten(start);
    let b = camera.flatten(end);
    (a.min(b), a.max(b))
}

/// Back to world space, keeping the depth of `depth_source`
pub fn to_world(camera: &OrthographicCamera, flat: Vec3, depth_source: Vec3) -> Vec3 {
    camera.expand(flat) + camera.unused_coordinate(depth_source)
}

/// True when `position` is within the hit tolerance of `anchor`
pub fn hits_anchor(camera: &OrthographicCamera, anchor: Vec3, position: Vec3) -> bool {
    let tolerance = camera.pixels_to_units(HANDLE_HIT_PIXELS);
    (anchor.x - position.x).abs() <= tolerance && (anchor.y - position.y).abs() <= tolerance
}

/// How the grab point of a move is snapped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveSnap {
    Grid,
    Selection,
}

/// A box gesture state with resize handles
#[derive(Debug, Clone)]
pub struct BoxDraggableState {
    pub state: BoxState,
    /// Whether the whole region can be targeted (drawing a new box)
    pub whole_draggable: bool,
    pub box_color: Color32,
    pub fill_color: Color32,
    pub stippled: bool,
    pub move_snap: MoveSnap,
    highlighted: Option<DragTarget>,
    drag_start: Vec3,
    move_origin: Vec3,
}

impl Default for BoxDraggableState {
    fn default() -> Self {
        Self::new(Color32::YELLOW, Color32::from_rgba_unmultiplied(255, 255, 255, 64))
    }
}

impl BoxDraggableState {
    pub fn new(box_color: Color32, fill_color: Color32) -> Self {
        Self {
            state: BoxState::default(),
            whole_draggable: true,
            box_color,
            fill_color,
            stippled: false,
            move_snap: MoveSnap::Grid,
            highlighted: None,
            drag_start: Vec3::ZERO,
            move_origin: Vec3::ZERO,
        }
    }

    pub fn handles_active(&self) -> bool {
        matches!(self.state.action, BoxAction::Drawn | BoxAction::Resizing)
    }

    pub fn is_highlighted(&self, target: DragTarget) -> bool {
        self.highlighted == Some(target)
    }

    /// Hit test for one resize handle
    pub fn hit_handle(
        &self,
        camera: &OrthographicCamera,
        handle: ResizeHandle,
        position: Vec3,
    ) -> bool {
        if !self.handles_active() {
            return false;
        }
        let (min, max) = flat_corners(camera, self.state.start, self.state.end);
        match handle {
            ResizeHandle::Center => {
                position.x >= min.x
                    && position.x <= max.x
                    && position.y >= min.y
                    && position.y <= max.y
            }
            _ => hits_anchor(camera, handle.anchor(min, max), position),
        }
    }

    /// Start dragging a handle: snapshot the box and remember the grab point
    pub fn begin_handle_drag(&mut self, ctx: &DragContext, position: Vec3) {
        self.state.begin_resize();
        self.drag_start = position;
        self.move_origin = match self.move_snap {
            MoveSnap::Grid => snap_if_needed(ctx.document, ctx.event.modifiers, position),
            MoveSnap::Selection => {
                snap_to_selection(ctx.document, ctx.event.modifiers, position, ctx.camera)
            }
        };
    }

    /// Flat point where the current handle drag began
    pub fn drag_start(&self) -> Vec3 {
        self.drag_start
    }

    /// Flat grab point of the current move
    pub fn move_origin(&self) -> Vec3 {
        self.move_origin
    }

    /// Flat translation of a center-handle move, snapped on the grab point
    pub fn move_delta(&self, ctx: &DragContext, position: Vec3) -> Vec3 {
        let target = self.move_origin + (position - self.drag_start);
        snap_if_needed(ctx.document, ctx.event.modifiers, target) - self.move_origin
    }

    /// Recompute the box from the snapshot for a handle at `position`
    pub fn drag_handle(&mut self, ctx: &DragContext, handle: ResizeHandle, position: Vec3) {
        let camera = ctx.camera;
        let (orig_start, orig_end) = (self.state.orig_start(), self.state.orig_end());
        let (min, max) = flat_corners(camera, orig_start, orig_end);

        let (min, max) = if handle == ResizeHandle::Center {
            let delta = self.move_delta(ctx, position);
            (min + delta, max + delta)
        } else {
            let snapped = snap_if_needed(ctx.document, ctx.event.modifiers, position);
            handle.resize(min, max, snapped)
        };

        self.state.start = to_world(camera, min, orig_start);
        self.state.end = to_world(camera, max, orig_end);
    }

    pub fn end_handle_drag(&mut self) {
        self.state.set_action(BoxAction::Drawn);
    }

    fn handle_at(&self, index: usize) -> Option<ResizeHandle> {
        ResizeHandle::ALL.get(index).copied()
    }

    /// Overlay of the box outline and fill
    pub fn render_box(&self, camera: &OrthographicCamera) -> Vec<Shape> {
        if !self.state.is_visible() {
            return Vec::new();
        }
        let mut shapes = vec![overlays::rect_fill(
            camera,
            self.state.start,
            self.state.end,
            self.fill_color,
        )];
        shapes.extend(overlays::rect_outline(
            camera,
            self.state.start,
            self.state.end,
            Stroke::new(1.0, self.box_color),
            self.stippled,
        ));
        shapes
    }

    /// Overlay of a handle square at a flat anchor
    pub fn render_handle_at(
        &self,
        camera: &OrthographicCamera,
        anchor: Vec3,
        highlighted: bool,
    ) -> Vec<Shape> {
        let center = camera.world_to_screen(camera.expand(anchor));
        let alpha = if highlighted { 255 } else { 160 };
        let fill = Color32::from_rgba_unmultiplied(255, 255, 255, alpha);
        overlays::handle_square(center, HANDLE_DRAW_PIXELS, fill, Stroke::new(1.0, Color32::BLACK))
    }

    pub fn render_box_perspective(&self, camera: &PerspectiveCamera) -> Vec<Shape> {
        if !self.state.is_visible() {
            return Vec::new();
        }
        let stroke = Stroke::new(1.0, self.box_color);
        self.state
            .bounds()
            .lines()
            .iter()
            .filter_map(|l| overlays::perspective_line(camera, l.start, l.end, stroke))
            .collect()
    }
}

impl DraggableState for BoxDraggableState {
    fn handle_count(&self) -> usize {
        if self.handles_active() {
            ResizeHandle::ALL.len()
        } else {
            0
        }
    }

    fn can_drag(&self, ctx: &DragContext, position: Vec3, target: DragTarget) -> bool {
        match target {
            DragTarget::Whole => self.whole_draggable,
            DragTarget::Handle(i) => self
                .handle_at(i)
                .is_some_and(|h| self.hit_handle(ctx.camera, h, position)),
        }
    }

    fn set_highlighted(&mut self, target: DragTarget, highlighted: bool) {
        if highlighted {
            self.highlighted = Some(target);
        } else if self.highlighted == Some(target) {
            self.highlighted = None;
        }
    }

    fn click(&mut self, _ctx: &DragContext, _position: Vec3, target: DragTarget) {
        if target == DragTarget::Whole && self.whole_draggable {
            self.state.cancel();
        }
    }

    fn start_drag(&mut self, ctx: &DragContext, position: Vec3, target: DragTarget) {
        match target {
            DragTarget::Whole => {
                if !self.whole_draggable {
                    return;
                }
                let snapped = snap_if_needed(ctx.document, ctx.event.modifiers, position);
                let world = to_world(ctx.camera, snapped, Vec3::ZERO);
                self.state.start = world;
                self.state.end = world;
                self.state.set_action(BoxAction::Drawing);
            }
            DragTarget::Handle(_) => self.begin_handle_drag(ctx, position),
        }
    }

    fn drag(&mut self, ctx: &DragContext, _last: Vec3, position: Vec3, target: DragTarget) {
        match target {
            DragTarget::Whole => {
                if self.state.action != BoxAction::Drawing {
                    return;
                }
                let snapped = snap_if_needed(ctx.document, ctx.event.modifiers, position);
                self.state.end = to_world(ctx.camera, snapped, self.state.end);
            }
            DragTarget::Handle(i) => {
                if let Some(handle) = self.handle_at(i) {
                    self.drag_handle(ctx, handle, position);
                }
            }
        }
    }

    fn end_drag(&mut self, ctx: &DragContext, _position: Vec3, target: DragTarget) {
        match target {
            DragTarget::Whole => {
                if self.state.action != BoxAction::Drawing {
                    return;
                }
                let (min, max) = flat_corners(ctx.camera, self.state.start, self.state.end);
                let size = max - min;
                if size.x.abs() < EPSILON || size.y.abs() < EPSILON {
                    self.state.set_action(BoxAction::Idle);
                } else {
                    self.state.set_action(BoxAction::Drawn);
                }
            }
            DragTarget::Handle(_) => self.end_handle_drag(),
        }
    }

    fn origin(&self, _target: DragTarget) -> Vec3 {
        self.state.bounds().center()
    }

    fn render_planar(&self, camera: &OrthographicCamera, target: DragTarget) -> Vec<Shape> {
        match target {
            DragTarget::Whole => self.render_box(camera),
            DragTarget::Handle(i) => {
                let Some(handle) = self.handle_at(i) else {
                    return Vec::new();
                };
                if !self.handles_active() || handle == ResizeHandle::Center {
                    return Vec::new();
                }
                let (min, max) = flat_corners(camera, self.state.start, self.state.end);
                self.render_handle_at(camera, handle.anchor(min, max), self.is_highlighted(target))
            }
        }
    }

    fn render_perspective(&self, camera: &PerspectiveCamera, target: DragTarget) -> Vec<Shape> {
        match target {
            DragTarget::Whole => self.render_box_perspective(camera),
            DragTarget::Handle(_) => Vec::new(),
        }
    }

    fn build_scene(&self, mesh: &mut LineMeshData, target: DragTarget) {
        if target == DragTarget::Whole && self.state.is_visible() {
            mesh.push_box(&self.state.bounds(), color_to_f32(self.box_color));
        }
    }
}
