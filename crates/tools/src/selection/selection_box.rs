//! The box drawn around the selection and its transformation handles

use std::f32::consts::PI;

use egui::{Color32, Shape, Stroke};
use glam::{Mat3, Mat4, Vec3};
use shared::{MapDocument, EPSILON};

use super::transform::TextureTransformationType;
use crate::draggable::box_state::{
    flat_corners, hits_anchor, to_world, BoxAction, BoxDraggableState, MoveSnap, ResizeHandle,
};
use crate::draggable::{DragContext, DragTarget, DraggableState};
use crate::input::Modifiers;
use crate::snap::snap_if_needed;
use crate::viewport::camera::{OrthographicCamera, PerspectiveCamera};
use crate::viewport::mesh::LineMeshData;
use crate::viewport::overlays;

/// Rotation snaps to this step unless shift is held
const ROTATION_STEP: f32 = PI / 12.0;
const ROTATE_HANDLE_RADIUS: f32 = 4.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransformationMode {
    #[default]
    Resize,
    Rotate,
    Skew,
}

impl TransformationMode {
    pub fn next(self) -> Self {
        match self {
            TransformationMode::Resize => TransformationMode::Rotate,
            TransformationMode::Rotate => TransformationMode::Skew,
            TransformationMode::Skew => TransformationMode::Resize,
        }
    }
}

/// A handle of the selection box; `Resize(Center)` is the move handle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransformHandle {
    Resize(ResizeHandle),
    Rotate(ResizeHandle),
    Skew(ResizeHandle),
}

impl TransformHandle {
    /// Name of the transformation this handle performs
    pub fn name(self) -> &'static str {
        match self {
            TransformHandle::Resize(ResizeHandle::Center) => "Move",
            TransformHandle::Resize(_) => "Resize",
            TransformHandle::Rotate(_) => "Rotate",
            TransformHandle::Skew(_) => "Skew",
        }
    }

    pub fn is_center(self) -> bool {
        self == TransformHandle::Resize(ResizeHandle::Center)
    }
}

#[derive(Debug, Clone)]
pub struct SelectionBoxDraggableState {
    pub inner: BoxDraggableState,
    pub mode: TransformationMode,
    active: Option<TransformHandle>,
    position: Vec3,
    modifiers: Modifiers,
}

impl Default for SelectionBoxDraggableState {
    fn default() -> Self {
        Self::new(Color32::from_rgba_unmultiplied(255, 255, 255, 64), false)
    }
}

impl SelectionBoxDraggableState {
    pub fn new(fill_color: Color32, stippled: bool) -> Self {
        let mut inner = BoxDraggableState::new(Color32::RED, fill_color);
        inner.whole_draggable = false;
        inner.stippled = stippled;
        inner.move_snap = MoveSnap::Selection;
        Self {
            inner,
            mode: TransformationMode::Resize,
            active: None,
            position: Vec3::ZERO,
            modifiers: Modifiers::NONE,
        }
    }

    pub fn action(&self) -> BoxAction {
        self.inner.state.action
    }

    pub fn set_action(&mut self, action: BoxAction) {
        self.inner.state.set_action(action);
        if action != BoxAction::Resizing {
            self.active = None;
        }
    }

    /// Handles available in the current mode; the center is always last
    pub fn handles(&self) -> Vec<TransformHandle> {
        let center = TransformHandle::Resize(ResizeHandle::Center);
        match self.mode {
            TransformationMode::Resize => {
                ResizeHandle::ALL.iter().map(|&h| TransformHandle::Resize(h)).collect()
            }
            TransformationMode::Rotate => ResizeHandle::CORNERS
                .iter()
                .map(|&h| TransformHandle::Rotate(h))
                .chain(std::iter::once(center))
                .collect(),
            TransformationMode::Skew => ResizeHandle::EDGES
                .iter()
                .map(|&h| TransformHandle::Skew(h))
                .chain(std::iter::once(center))
                .collect(),
        }
    }

    pub fn handle(&self, index: usize) -> Option<TransformHandle> {
        self.handles().get(index).copied()
    }

    pub fn center_index(&self) -> usize {
        self.handles().len() - 1
    }

    /// Switch to the next transformation mode
    pub fn cycle(&mut self) {
        self.mode = self.mode.next();
        tracing::debug!(mode = ?self.mode, "Selection box mode cycled");
    }

    /// Handle being dragged, if a transformation is in progress
    pub fn active_handle(&self) -> Option<TransformHandle> {
        self.active
    }

    fn hit(&self, camera: &OrthographicCamera, handle: TransformHandle, position: Vec3) -> bool {
        match handle {
            TransformHandle::Resize(h) => self.inner.hit_handle(camera, h, position),
            TransformHandle::Rotate(h) | TransformHandle::Skew(h) => {
                if !self.inner.handles_active() {
                    return false;
                }
                let (min, max) = flat_corners(camera, self.inner.state.start, self.inner.state.end);
                hits_anchor(camera, h.anchor(min, max), position)
            }
        }
    }

    /// Matrix for the transformation in progress, relative to the box
    /// snapshot taken when it started
    pub fn transformation_matrix(
        &self,
        camera: &OrthographicCamera,
        document: &MapDocument,
    ) -> Option<Mat4> {
        if self.action() != BoxAction::Resizing {
            return None;
        }
        match self.active? {
            TransformHandle::Resize(ResizeHandle::Center) => {
                Some(Mat4::from_translation(self.inner.state.start - self.inner.state.orig_start()))
            }
            TransformHandle::Resize(_) => Some(self.resize_matrix()),
            TransformHandle::Rotate(_) => Some(self.rotate_matrix(camera)),
            TransformHandle::Skew(h) => self.skew_matrix(camera, document, h),
        }
    }

    fn resize_matrix(&self) -> Mat4 {
        let orig = self.inner.state.orig_box();
        let current = self.inner.state.bounds();
        let (od, nd) = (orig.dimensions(), current.dimensions());
        let scale = Vec3::select(od.abs().cmplt(Vec3::splat(EPSILON)), Vec3::ONE, nd / od);
        Mat4::from_translation(current.start)
            * Mat4::from_scale(scale)
            * Mat4::from_translation(-orig.start)
    }

    fn rotate_matrix(&self, camera: &OrthographicCamera) -> Mat4 {
        let center = self.inner.state.orig_box().center();
        let flat_center = camera.flatten(center);
        let from = self.inner.drag_start() - flat_center;
        let to = self.position - flat_center;
        let mut angle = to.y.atan2(to.x) - from.y.atan2(from.x);
        if !self.modifiers.shift {
            angle = (angle / ROTATION_STEP).round() * ROTATION_STEP;
        }
        Mat4::from_translation(center)
            * Mat4::from_axis_angle(camera.depth_axis(), angle)
            * Mat4::from_translation(-center)
    }

    fn skew_matrix(
        &self,
        camera: &OrthographicCamera,
        document: &MapDocument,
        handle: ResizeHandle,
    ) -> Option<Mat4> {
        let state = &self.inner.state;
        let (min, max) = flat_corners(camera, state.orig_start(), state.orig_end());
        let delta = snap_if_needed(document, self.modifiers, self.position)
            - snap_if_needed(document, self.modifiers, self.inner.drag_start());

        let (fixed, dragged, shift, shifted_axis, along_axis) = match handle {
            ResizeHandle::Top => (min.y, max.y, delta.x, Vec3::X, Vec3::Y),
            ResizeHandle::Bottom => (max.y, min.y, delta.x, Vec3::X, Vec3::Y),
            ResizeHandle::Right => (min.x, max.x, delta.y, Vec3::Y, Vec3::X),
            ResizeHandle::Left => (max.x, min.x, delta.y, Vec3::Y, Vec3::X),
            _ => return None,
        };
        let span = dragged - fixed;
        if span.abs() < EPSILON {
            return None;
        }

        let a = camera.expand(shifted_axis);
        let b = camera.expand(along_axis);
        let shear = Mat3::IDENTITY + Mat3::from_cols(a * b.x, a * b.y, a * b.z) * (shift / span);
        let pivot = to_world(camera, along_axis * fixed, state.orig_start());
        Some(
            Mat4::from_translation(pivot)
                * Mat4::from_mat3(shear)
                * Mat4::from_translation(-pivot),
        )
    }

    /// Texture policy for the transformation in progress
    pub fn texture_transformation_type(&self, document: &MapDocument) -> TextureTransformationType {
        let flags = document.map.data.transformation_flags;
        match self.active {
            Some(TransformHandle::Resize(h)) if h != ResizeHandle::Center => {
                if flags.texture_scale_lock {
                    TextureTransformationType::Scale
                } else {
                    TextureTransformationType::None
                }
            }
            _ if flags.texture_lock => TextureTransformationType::Uniform,
            _ => TextureTransformationType::None,
        }
    }

    fn render_handle(
        &self,
        camera: &OrthographicCamera,
        handle: TransformHandle,
        highlighted: bool,
    ) -> Vec<Shape> {
        let (min, max) = flat_corners(camera, self.inner.state.start, self.inner.state.end);
        match handle {
            TransformHandle::Resize(ResizeHandle::Center) => Vec::new(),
            TransformHandle::Resize(h) | TransformHandle::Skew(h) => {
                self.inner.render_handle_at(camera, h.anchor(min, max), highlighted)
            }
            TransformHandle::Rotate(h) => {
                let center = camera.world_to_screen(camera.expand(h.anchor(min, max)));
                let alpha = if highlighted { 255 } else { 160 };
                vec![overlays::handle_circle(
                    center,
                    ROTATE_HANDLE_RADIUS,
                    Color32::from_rgba_unmultiplied(255, 255, 255, alpha),
                )]
            }
        }
    }
}

impl DraggableState for SelectionBoxDraggableState {
    fn handle_count(&self) -> usize {
        if self.inner.handles_active() {
            self.handles().len()
        } else {
            0
        }
    }

    fn can_drag(&self, ctx: &DragContext, position: Vec3, target: DragTarget) -> bool {
        match target {
            DragTarget::Whole => false,
            DragTarget::Handle(i) => {
                self.handle(i).is_some_and(|h| self.hit(ctx.camera, h, position))
            }
        }
    }

    fn set_highlighted(&mut self, target: DragTarget, highlighted: bool) {
        self.inner.set_highlighted(target, highlighted);
    }

    fn start_drag(&mut self, ctx: &DragContext, position: Vec3, target: DragTarget) {
        let DragTarget::Handle(i) = target else {
            return;
        };
        let Some(handle) = self.handle(i) else {
            return;
        };
        self.inner.begin_handle_drag(ctx, position);
        self.active = Some(handle);
        self.position = position;
        self.modifiers = ctx.event.modifiers;
    }

    fn drag(&mut self, ctx: &DragContext, _last: Vec3, position: Vec3, target: DragTarget) {
        if target == DragTarget::Whole || self.action() != BoxAction::Resizing {
            return;
        }
        self.position = position;
        self.modifiers = ctx.event.modifiers;
        if let Some(TransformHandle::Resize(h)) = self.active {
            self.inner.drag_handle(ctx, h, position);
        }
    }

    fn end_drag(&mut self, _ctx: &DragContext, _position: Vec3, target: DragTarget) {
        if target != DragTarget::Whole {
            self.inner.end_handle_drag();
            self.active = None;
        }
    }

    fn origin(&self, _target: DragTarget) -> Vec3 {
        self.inner.state.bounds().center()
    }

    fn render_planar(&self, camera: &OrthographicCamera, target: DragTarget) -> Vec<Shape> {
        match target {
            DragTarget::Whole => self.inner.render_box(camera),
            DragTarget::Handle(i) => match self.handle(i) {
                Some(h) if self.inner.handles_active() => {
                    self.render_handle(camera, h, self.inner.is_highlighted(target))
                }
                _ => Vec::new(),
            },
        }
    }

    fn render_perspective(&self, camera: &PerspectiveCamera, target: DragTarget) -> Vec<Shape> {
        match target {
            DragTarget::Whole => self.inner.render_box_perspective(camera),
            DragTarget::Handle(_) => Vec::new(),
        }
    }

    fn build_scene(&self, mesh: &mut LineMeshData, target: DragTarget) {
        self.inner.build_scene(mesh, target);
    }
}

/// Outline of a box transformed by a preview matrix, as planar segments
pub fn preview_outline(
    camera: &OrthographicCamera,
    state: &SelectionBoxDraggableState,
    matrix: &Mat4,
    color: Color32,
) -> Vec<Shape> {
    let stroke = Stroke::new(1.0, color);
    state
        .inner
        .state
        .orig_box()
        .lines()
        .iter()
        .map(|l| {
            let a = camera.world_to_screen(matrix.transform_point3(l.start));
            let b = camera.world_to_screen(matrix.transform_point3(l.end));
            Shape::line_segment([a, b], stroke)
        })
        .collect()
}
