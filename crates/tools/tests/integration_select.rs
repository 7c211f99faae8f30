//! Integration tests for the select tool driven through the headless harness.

use editor_tools_lib::fixtures;
use editor_tools_lib::harness::{ToolHarness, ViewportKind};
use editor_tools_lib::input::{EventKind, Key, Modifiers, MouseButton, ViewportEvent};
use editor_tools_lib::selection::selection_box::TransformationMode;
use editor_tools_lib::selection::SelectTool;
use editor_tools_lib::settings::SelectToolSettings;
use editor_tools_lib::draggable::box_state::BoxAction;
use editor_tools_lib::draggable::DraggableTool;
use editor_tools_lib::tool::attach_document;
use glam::{Mat4, Vec3};
use shared::{Map, ObjectId};

fn v(x: f32, y: f32) -> Vec3 {
    Vec3::new(x, y, 0.0)
}

/// Inside, straddling and outside the region (-16,-16)..(64,64)
fn three_cubes() -> (Map, [ObjectId; 3]) {
    let mut map = Map::new();
    let inside = fixtures::add_cuboid(&mut map, Vec3::ZERO, Vec3::splat(32.0)).unwrap();
    let straddling =
        fixtures::add_cuboid(&mut map, Vec3::new(48.0, 48.0, 0.0), Vec3::new(80.0, 80.0, 32.0))
            .unwrap();
    let outside =
        fixtures::add_cuboid(&mut map, Vec3::new(160.0, 160.0, 0.0), Vec3::new(192.0, 192.0, 32.0))
            .unwrap();
    (map, [inside, straddling, outside])
}

fn single_cube(max: Vec3) -> (ToolHarness<SelectTool>, ObjectId) {
    let mut map = Map::new();
    let id = fixtures::add_cuboid(&mut map, Vec3::ZERO, max).unwrap();
    (ToolHarness::new(map, SelectTool::default()), id)
}

/// Drag with an explicit number of intermediate moves and no DragEnd
fn drag_without_release(
    h: &mut ToolHarness<SelectTool>,
    from: Vec3,
    to: Vec3,
    steps: usize,
    modifiers: Modifiers,
) {
    h.hover_2d(from, modifiers);
    let (x, y) = h.screen_2d(from);
    let press = ViewportEvent::at(x, y)
        .with_button(MouseButton::Left)
        .with_modifiers(modifiers);
    h.send(ViewportKind::Planar, EventKind::MouseDown, press);
    h.send(ViewportKind::Planar, EventKind::DragStart, press.dragging());
    for step in 1..=steps {
        let (x, y) = h.screen_2d(from.lerp(to, step as f32 / steps as f32));
        let event = ViewportEvent::at(x, y)
            .with_button(MouseButton::Left)
            .with_modifiers(modifiers)
            .dragging();
        h.send(ViewportKind::Planar, EventKind::DragMove, event);
    }
}

fn release(h: &mut ToolHarness<SelectTool>, at: Vec3, modifiers: Modifiers) {
    let (x, y) = h.screen_2d(at);
    let event = ViewportEvent::at(x, y)
        .with_button(MouseButton::Left)
        .with_modifiers(modifiers);
    h.send(ViewportKind::Planar, EventKind::DragEnd, event.dragging());
    h.send(ViewportKind::Planar, EventKind::MouseUp, event);
}

// ── 2D clicks ─────────────────────────────────────────────────

#[test]
fn test_click_selects_and_fits_box() {
    let (mut h, id) = single_cube(Vec3::splat(64.0));
    h.click_2d(v(0.0, 32.0), Modifiers::NONE);

    assert_eq!(h.selected_ids(), vec![id]);
    let state = &h.tool.selection_box().inner.state;
    assert_eq!(state.action, BoxAction::Drawn);
    assert_eq!(state.bounds().start, Vec3::ZERO);
    assert_eq!(state.bounds().end, Vec3::splat(64.0));
}

#[test]
fn test_click_on_empty_space_deselects() {
    let (mut h, _) = single_cube(Vec3::splat(64.0));
    h.click_2d(v(0.0, 32.0), Modifiers::NONE);
    h.click_2d(v(-160.0, -160.0), Modifiers::NONE);

    assert!(h.selected_ids().is_empty());
    assert_eq!(h.tool.selection_box().action(), BoxAction::Idle);
}

#[test]
fn test_click_replaces_and_ctrl_click_toggles() {
    let (map, [a, b, _]) = three_cubes();
    let mut h = ToolHarness::new(map, SelectTool::default());

    h.click_2d(v(0.0, 16.0), Modifiers::NONE);
    assert_eq!(h.selected_ids(), vec![a]);

    h.click_2d(v(80.0, 64.0), Modifiers::CTRL);
    assert!(h.is_selected(a) && h.is_selected(b));

    h.click_2d(v(0.0, 16.0), Modifiers::CTRL);
    assert_eq!(h.selected_ids(), vec![b]);

    h.click_2d(v(0.0, 16.0), Modifiers::NONE);
    assert_eq!(h.selected_ids(), vec![a]);
}

#[test]
fn test_click_on_grouped_object_selects_group() {
    let mut map = Map::new();
    let root = map.root();
    let group = fixtures::add_group(&mut map, root).unwrap();
    let a = fixtures::add_cuboid_to(&mut map, group, Vec3::ZERO, Vec3::splat(32.0)).unwrap();
    let b_bounds = (Vec3::new(64.0, 0.0, 0.0), Vec3::new(96.0, 32.0, 32.0));
    let b = fixtures::add_cuboid_to(&mut map, group, b_bounds.0, b_bounds.1).unwrap();
    let mut h = ToolHarness::new(map, SelectTool::default());

    h.click_2d(v(0.0, 16.0), Modifiers::NONE);
    assert_eq!(h.selected_ids(), vec![group, a, b]);
    let bounds = h.tool.selection_box().inner.state.bounds();
    assert_eq!(bounds.end, Vec3::new(96.0, 32.0, 32.0));
}

// ── Box selection ─────────────────────────────────────────────

#[test]
fn test_confirm_selects_intersecting_or_contained() {
    let (map, [inside, straddling, _]) = three_cubes();
    let mut h = ToolHarness::new(map, SelectTool::default());

    h.drag_2d(v(-16.0, -16.0), v(64.0, 64.0), Modifiers::NONE);
    assert_eq!(h.tool.empty_box().state.action, BoxAction::Drawn);
    assert!(h.selected_ids().is_empty());

    h.key_down(Key::Enter, Modifiers::SHIFT);
    assert_eq!(h.selected_ids(), vec![inside]);

    h.key_down(Key::Escape, Modifiers::NONE);
    assert!(h.selected_ids().is_empty());

    h.drag_2d(v(-16.0, -16.0), v(64.0, 64.0), Modifiers::NONE);
    h.key_down(Key::Enter, Modifiers::NONE);
    assert_eq!(h.selected_ids(), vec![inside, straddling]);
    assert_eq!(h.tool.empty_box().state.action, BoxAction::Idle);
    assert_eq!(h.tool.selection_box().action(), BoxAction::Drawn);
}

#[test]
fn test_auto_select_confirms_on_release() {
    let (map, [inside, straddling, _]) = three_cubes();
    let settings = SelectToolSettings {
        auto_select_box: true,
        ..Default::default()
    };
    let mut h = ToolHarness::new(map, SelectTool::new(settings));

    h.drag_2d(v(-16.0, -16.0), v(64.0, 64.0), Modifiers::NONE);
    assert_eq!(h.selected_ids(), vec![inside, straddling]);
}

#[test]
fn test_empty_clicks_leave_history_alone() {
    let (mut h, _) = single_cube(Vec3::splat(64.0));
    h.click_2d(v(-200.0, -200.0), Modifiers::NONE);
    h.click_2d(v(-200.0, -200.0), Modifiers::NONE);
    h.key_down(Key::Escape, Modifiers::NONE);

    assert!(h.selected_ids().is_empty());
    assert!(!h.document().can_undo());
}

#[test]
fn test_drawing_empty_box_clears_selection() {
    let (map, [inside, ..]) = three_cubes();
    let mut h = ToolHarness::new(map, SelectTool::default());
    h.click_2d(v(0.0, 16.0), Modifiers::NONE);
    assert!(h.is_selected(inside));

    h.drag_2d(v(-128.0, -128.0), v(-64.0, -64.0), Modifiers::NONE);
    assert!(h.selected_ids().is_empty());
    assert_eq!(h.tool.empty_box().state.action, BoxAction::Drawn);
}

// ── Transforms ────────────────────────────────────────────────

#[test]
fn test_resize_applies_snapshot_transform_once() {
    for steps in [1, 3, 7] {
        let (mut h, id) = single_cube(Vec3::splat(64.0));
        h.click_2d(v(0.0, 32.0), Modifiers::NONE);

        // Top-right corner handle
        drag_without_release(&mut h, v(64.0, 64.0), v(128.0, 128.0), steps, Modifiers::NONE);
        let state = &h.tool.selection_box().inner.state;
        assert_eq!(state.action, BoxAction::Resizing);
        let preview = h.tool.preview_transform();
        let expected = state.orig_box().transform(&preview);
        assert!(expected.start.abs_diff_eq(state.bounds().start, 1e-3));
        assert!(expected.end.abs_diff_eq(state.bounds().end, 1e-3));
        assert_eq!(h.tool.status_text(), "128 x 128 x 64");

        release(&mut h, v(128.0, 128.0), Modifiers::NONE);
        let bounds = h.document().map.bounding_box(id).unwrap();
        assert!(bounds.start.abs_diff_eq(Vec3::ZERO, 1e-3), "steps {steps}");
        assert!(bounds.end.abs_diff_eq(Vec3::new(128.0, 128.0, 64.0), 1e-3), "steps {steps}");
        assert_eq!(h.tool.preview_transform(), Mat4::IDENTITY);
        assert!(h.tool.status_text().is_empty());
    }
}

#[test]
fn test_escape_mid_resize_commits_nothing() {
    let (mut h, id) = single_cube(Vec3::splat(64.0));
    h.click_2d(v(0.0, 32.0), Modifiers::NONE);
    drag_without_release(&mut h, v(64.0, 64.0), v(128.0, 128.0), 3, Modifiers::NONE);
    assert_ne!(h.tool.preview_transform(), Mat4::IDENTITY);

    h.key_down(Key::Escape, Modifiers::NONE);
    assert!(!h.tool.drag_core().is_dragging());
    assert_eq!(h.tool.preview_transform(), Mat4::IDENTITY);
    assert!(h.tool.status_text().is_empty());

    release(&mut h, v(128.0, 128.0), Modifiers::NONE);
    assert_eq!(h.tool.selection_box().action(), BoxAction::Idle);
    assert!(h.selected_ids().is_empty());
    assert_eq!(h.document().map.bounding_box(id).unwrap().end, Vec3::splat(64.0));

    // History holds the click and the deselect, no transform
    assert!(h.undo());
    assert!(h.is_selected(id));
    assert_eq!(h.document().map.bounding_box(id).unwrap().end, Vec3::splat(64.0));
    assert!(h.undo());
    assert!(!h.undo());
}

#[test]
fn test_detaching_document_mid_drag_resets_gesture() {
    let (mut h, id) = single_cube(Vec3::splat(64.0));
    h.click_2d(v(0.0, 32.0), Modifiers::NONE);
    drag_without_release(&mut h, v(64.0, 64.0), v(128.0, 128.0), 2, Modifiers::NONE);
    assert!(h.tool.drag_core().is_dragging());

    attach_document(&mut h.tool, None);
    assert!(!h.tool.drag_core().is_dragging());
    assert_eq!(h.tool.drag_core().current, None);
    assert_eq!(h.tool.selection_box().action(), BoxAction::Idle);
    assert_eq!(h.tool.preview_transform(), Mat4::IDENTITY);

    release(&mut h, v(128.0, 128.0), Modifiers::NONE);
    let doc = h.document();
    assert!(!doc.has_pending());
    assert_eq!(doc.map.bounding_box(id).unwrap().end, Vec3::splat(64.0));
    assert!(doc.is_selected(id));
}

#[test]
fn test_center_drag_moves_selection() {
    let (mut h, id) = single_cube(Vec3::splat(64.0));
    h.click_2d(v(0.0, 32.0), Modifiers::NONE);
    h.drag_2d(v(32.0, 32.0), v(96.0, 32.0), Modifiers::NONE);

    let bounds = h.document().map.bounding_box(id).unwrap();
    assert_eq!(bounds.start, Vec3::new(64.0, 0.0, 0.0));
    assert_eq!(h.tool.selection_box().inner.state.bounds().start, Vec3::new(64.0, 0.0, 0.0));
    assert!(h.is_selected(id));
}

#[test]
fn test_shift_center_drag_clones() {
    let (mut h, id) = single_cube(Vec3::splat(64.0));
    h.click_2d(v(0.0, 32.0), Modifiers::NONE);
    h.drag_2d(v(32.0, 32.0), v(32.0, 128.0), Modifiers::SHIFT);

    let doc = h.document();
    assert_eq!(doc.map.len(), 3);
    assert!(!doc.is_selected(id));
    assert_eq!(doc.map.bounding_box(id).unwrap().start, Vec3::ZERO);
    let copy = doc.selected_objects();
    assert_eq!(copy.len(), 1);
    assert_eq!(doc.map.bounding_box(copy[0]).unwrap().start, Vec3::new(0.0, 96.0, 0.0));
}

#[test]
fn test_center_click_cycles_mode_and_rotates() {
    let (mut h, id) = single_cube(Vec3::new(64.0, 32.0, 32.0));
    h.click_2d(v(0.0, 16.0), Modifiers::NONE);
    assert_eq!(h.tool.selection_box().mode, TransformationMode::Resize);

    h.click_2d(v(32.0, 16.0), Modifiers::NONE);
    assert_eq!(h.tool.selection_box().mode, TransformationMode::Rotate);

    // Quarter turn about the box center (32, 16)
    h.drag_2d(v(64.0, 32.0), v(16.0, 48.0), Modifiers::NONE);
    let bounds = h.document().map.bounding_box(id).unwrap();
    assert!(bounds.start.abs_diff_eq(Vec3::new(16.0, -16.0, 0.0), 1e-3), "{bounds:?}");
    assert!(bounds.end.abs_diff_eq(Vec3::new(48.0, 48.0, 32.0), 1e-3), "{bounds:?}");

    h.click_2d(v(32.0, 16.0), Modifiers::NONE);
    assert_eq!(h.tool.selection_box().mode, TransformationMode::Skew);
    h.click_2d(v(32.0, 16.0), Modifiers::NONE);
    assert_eq!(h.tool.selection_box().mode, TransformationMode::Resize);
}

#[test]
fn test_arrow_keys_nudge_by_grid_step() {
    let (mut h, id) = single_cube(Vec3::splat(32.0));
    h.click_2d(v(0.0, 16.0), Modifiers::NONE);

    h.key_down(Key::Right, Modifiers::NONE);
    assert_eq!(h.document().map.bounding_box(id).unwrap().start, Vec3::new(16.0, 0.0, 0.0));

    h.key_down(Key::Up, Modifiers::CTRL);
    assert_eq!(h.document().map.bounding_box(id).unwrap().start, Vec3::new(16.0, 1.0, 0.0));
    assert_eq!(h.tool.selection_box().inner.state.bounds().start, Vec3::new(16.0, 1.0, 0.0));
}

#[test]
fn test_undo_restores_transformed_object() {
    let (mut h, id) = single_cube(Vec3::splat(32.0));
    h.click_2d(v(0.0, 16.0), Modifiers::NONE);
    h.key_down(Key::Right, Modifiers::NONE);

    assert!(h.undo());
    assert_eq!(h.document().map.bounding_box(id).unwrap().start, Vec3::ZERO);
    assert_eq!(h.tool.selection_box().inner.state.bounds().start, Vec3::ZERO);
}

// ── 3D picking ────────────────────────────────────────────────

/// Three cubes in a row along the perspective camera's line of sight
fn row_of_cubes() -> (ToolHarness<SelectTool>, [ObjectId; 3]) {
    let mut map = Map::new();
    let mut ids = [ObjectId::default(); 3];
    for (i, id) in ids.iter_mut().enumerate() {
        let x = i as f32 * 64.0;
        let (min, max) = (Vec3::new(x, -16.0, -8.0), Vec3::new(x + 32.0, 16.0, 24.0));
        *id = fixtures::add_cuboid(&mut map, min, max).unwrap();
    }
    (ToolHarness::new(map, SelectTool::default()), ids)
}

#[test]
fn test_perspective_click_selects_nearest() {
    let (mut h, [o1, ..]) = row_of_cubes();
    let (x, y) = h.screen_3d(Vec3::ZERO).unwrap();
    h.mouse_down_3d(x, y, Modifiers::NONE);

    assert_eq!(h.selected_ids(), vec![o1]);
    assert!(h.perspective.is_input_locked());
    assert_eq!(h.tool.pick_context().unwrap().intersecting.len(), 3);

    h.mouse_up_3d(x, y);
    assert!(!h.perspective.is_input_locked());
    assert!(h.tool.pick_context().is_none());
}

#[test]
fn test_wheel_cycles_through_hits_and_wraps() {
    let (mut h, [o1, o2, o3]) = row_of_cubes();
    let (x, y) = h.screen_3d(Vec3::ZERO).unwrap();
    h.mouse_down_3d(x, y, Modifiers::NONE);

    h.wheel_3d(x, y, 120);
    assert_eq!(h.selected_ids(), vec![o2]);

    h.wheel_3d(x, y, 120);
    assert_eq!(h.selected_ids(), vec![o3]);

    h.wheel_3d(x, y, 120);
    assert_eq!(h.selected_ids(), vec![o1]);

    h.wheel_3d(x, y, -120);
    assert_eq!(h.selected_ids(), vec![o3]);
}

#[test]
fn test_perspective_ctrl_click_deselects_chosen() {
    let (mut h, [o1, ..]) = row_of_cubes();
    let (x, y) = h.screen_3d(Vec3::ZERO).unwrap();
    h.mouse_down_3d(x, y, Modifiers::NONE);
    h.mouse_up_3d(x, y);
    assert!(h.is_selected(o1));

    h.mouse_down_3d(x, y, Modifiers::CTRL);
    assert!(h.selected_ids().is_empty());
}

#[test]
fn test_perspective_miss_clears_selection() {
    let (mut h, [o1, ..]) = row_of_cubes();
    let (x, y) = h.screen_3d(Vec3::ZERO).unwrap();
    h.mouse_down_3d(x, y, Modifiers::NONE);
    h.mouse_up_3d(x, y);
    assert!(h.is_selected(o1));

    h.mouse_down_3d(5.0, 5.0, Modifiers::NONE);
    assert!(h.selected_ids().is_empty());
    assert!(!h.perspective.is_input_locked());
}
