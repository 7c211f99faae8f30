//! Headless harness driving a tool tree against an in-memory document.
//!
//! Plays the part of the host event loop: every event is routed through the
//! tree, then queued transactions are executed and their completions are
//! handed back to the tools.

use std::cell::{Ref, RefCell};
use std::rc::Rc;

use glam::Vec3;
use shared::{Map, MapDocument, ObjectId};
use tracing::debug;

use crate::input::{EventKind, EventOutcome, Key, Modifiers, MouseButton, ViewportEvent};
use crate::tool::{attach_document, notify_transaction, route, select_tool, DocumentHandle, Tool};
use crate::viewport::camera::{Camera, OrthographicCamera, PerspectiveCamera, ViewDirection};
use crate::viewport::MapViewport;

/// Size of both harness viewports in pixels
pub const VIEWPORT_SIZE: f32 = 512.0;

/// Steps between DragStart and DragEnd of a scripted drag
const DRAG_STEPS: usize = 4;

/// Tools may submit further work from `transaction_completed`; stop
/// draining after this many rounds
const MAX_PUMP_ROUNDS: usize = 16;

/// Which harness viewport an event goes to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewportKind {
    Planar,
    Perspective,
}

/// Headless host: document + tool tree + a top view and a perspective view
pub struct ToolHarness<T: Tool> {
    pub document: DocumentHandle,
    pub tool: T,
    pub planar: MapViewport,
    pub perspective: MapViewport,
}

impl<T: Tool> ToolHarness<T> {
    /// Attach a fresh document built from `map` and activate the tool
    pub fn new(map: Map, mut tool: T) -> Self {
        let document: DocumentHandle = Rc::new(RefCell::new(MapDocument::new(map)));
        attach_document(&mut tool, Some(document.clone()));
        select_tool(&mut tool);

        let planar = MapViewport::new(Camera::Planar(OrthographicCamera::new(
            ViewDirection::Top,
            VIEWPORT_SIZE,
            VIEWPORT_SIZE,
        )));
        let perspective = MapViewport::new(Camera::Perspective(PerspectiveCamera::new(
            Vec3::new(-1024.0, 0.0, 0.0),
            Vec3::ZERO,
            VIEWPORT_SIZE,
            VIEWPORT_SIZE,
        )));

        Self {
            document,
            tool,
            planar,
            perspective,
        }
    }

    pub fn document(&self) -> Ref<'_, MapDocument> {
        self.document.borrow()
    }

    // ── Event loop ────────────────────────────────────────────

    /// Route one event, then run whatever the tools submitted
    pub fn send(
        &mut self,
        viewport: ViewportKind,
        kind: EventKind,
        event: ViewportEvent,
    ) -> EventOutcome {
        let viewport = match viewport {
            ViewportKind::Planar => &self.planar,
            ViewportKind::Perspective => &self.perspective,
        };
        let outcome = route(&mut self.tool, viewport, kind, &event);
        self.pump();
        outcome
    }

    /// Execute queued transactions and deliver their completions
    pub fn pump(&mut self) -> usize {
        let mut executed = 0;
        for _ in 0..MAX_PUMP_ROUNDS {
            let completions = self.document.borrow_mut().process_pending();
            if completions.is_empty() {
                break;
            }
            executed += completions.len();
            for completion in &completions {
                notify_transaction(&mut self.tool, completion);
            }
        }
        executed
    }

    // ── Planar input (world coordinates of the top view) ──────

    pub fn planar_camera(&self) -> Option<&OrthographicCamera> {
        self.planar.camera.as_planar()
    }

    /// Screen position of a world point in the top view
    pub fn screen_2d(&self, world: Vec3) -> (f32, f32) {
        self.planar_camera()
            .map(|c| {
                let p = c.world_to_screen(world);
                (p.x, p.y)
            })
            .unwrap_or_default()
    }

    fn planar_event(&self, world: Vec3, modifiers: Modifiers) -> ViewportEvent {
        let (x, y) = self.screen_2d(world);
        ViewportEvent::at(x, y).with_modifiers(modifiers)
    }

    /// Move the pointer without a button held
    pub fn hover_2d(&mut self, world: Vec3, modifiers: Modifiers) {
        let event = self.planar_event(world, modifiers);
        self.send(ViewportKind::Planar, EventKind::MouseMove, event);
    }

    /// Hover, press, release and click at a point
    pub fn click_2d(&mut self, world: Vec3, modifiers: Modifiers) -> EventOutcome {
        self.hover_2d(world, modifiers);
        let event = self.planar_event(world, modifiers).with_button(MouseButton::Left);
        self.send(ViewportKind::Planar, EventKind::MouseDown, event);
        self.send(ViewportKind::Planar, EventKind::MouseUp, event);
        self.send(ViewportKind::Planar, EventKind::MouseClick, event)
    }

    /// Drag with the left button from `from` to `to` in a few steps
    pub fn drag_2d(&mut self, from: Vec3, to: Vec3, modifiers: Modifiers) {
        debug!(?from, ?to, "Scripted drag");
        self.hover_2d(from, modifiers);
        let press = self.planar_event(from, modifiers).with_button(MouseButton::Left);
        self.send(ViewportKind::Planar, EventKind::MouseDown, press);
        self.send(ViewportKind::Planar, EventKind::DragStart, press.dragging());

        for step in 1..=DRAG_STEPS {
            let point = from.lerp(to, step as f32 / DRAG_STEPS as f32);
            let event = self
                .planar_event(point, modifiers)
                .with_button(MouseButton::Left)
                .dragging();
            self.send(ViewportKind::Planar, EventKind::MouseMove, event);
            self.send(ViewportKind::Planar, EventKind::DragMove, event);
        }

        let release = self.planar_event(to, modifiers).with_button(MouseButton::Left);
        self.send(ViewportKind::Planar, EventKind::DragEnd, release.dragging());
        self.send(ViewportKind::Planar, EventKind::MouseUp, release);
    }

    pub fn key_down(&mut self, key: Key, modifiers: Modifiers) -> EventOutcome {
        let event = ViewportEvent::key(key).with_modifiers(modifiers);
        self.send(ViewportKind::Planar, EventKind::KeyDown, event)
    }

    // ── Perspective input (screen pixels) ─────────────────────

    pub fn perspective_camera(&self) -> Option<&PerspectiveCamera> {
        match &self.perspective.camera {
            Camera::Perspective(camera) => Some(camera),
            Camera::Planar(_) => None,
        }
    }

    /// Screen position of a world point in the perspective view
    pub fn screen_3d(&self, world: Vec3) -> Option<(f32, f32)> {
        let p = self.perspective_camera()?.project(world)?;
        Some((p.x, p.y))
    }

    pub fn mouse_down_3d(&mut self, x: f32, y: f32, modifiers: Modifiers) -> EventOutcome {
        let event = ViewportEvent::at(x, y)
            .with_button(MouseButton::Left)
            .with_modifiers(modifiers);
        self.send(ViewportKind::Perspective, EventKind::MouseDown, event)
    }

    pub fn wheel_3d(&mut self, x: f32, y: f32, delta: i32) -> EventOutcome {
        let event = ViewportEvent::at(x, y).with_button(MouseButton::Left).with_wheel(delta);
        self.send(ViewportKind::Perspective, EventKind::MouseWheel, event)
    }

    pub fn mouse_up_3d(&mut self, x: f32, y: f32) -> EventOutcome {
        let event = ViewportEvent::at(x, y).with_button(MouseButton::Left);
        self.send(ViewportKind::Perspective, EventKind::MouseUp, event)
    }

    // ── History ───────────────────────────────────────────────

    /// Undo and rebind the tools to the restored state
    pub fn undo(&mut self) -> bool {
        let undone = self.document.borrow_mut().undo();
        if undone {
            attach_document(&mut self.tool, Some(self.document.clone()));
        }
        undone
    }

    pub fn redo(&mut self) -> bool {
        let redone = self.document.borrow_mut().redo();
        if redone {
            attach_document(&mut self.tool, Some(self.document.clone()));
        }
        redone
    }

    // ── Inspection ────────────────────────────────────────────

    pub fn selected_ids(&self) -> Vec<ObjectId> {
        self.document.borrow().selected_objects()
    }

    pub fn is_selected(&self, id: ObjectId) -> bool {
        self.document.borrow().is_selected(id)
    }
}
