//! Viewport input events as seen by the tools

use serde::{Deserialize, Serialize};

/// Modifier keys held when the event was raised
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
}

impl Modifiers {
    pub const NONE: Self = Self { shift: false, ctrl: false, alt: false };
    pub const SHIFT: Self = Self { shift: true, ctrl: false, alt: false };
    pub const CTRL: Self = Self { shift: false, ctrl: true, alt: false };
    pub const ALT: Self = Self { shift: false, ctrl: false, alt: true };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MouseButton {
    Left,
    Right,
    Middle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Key {
    Enter,
    Escape,
    Left,
    Right,
    Up,
    Down,
    Char(char),
}

/// Every event kind the router delivers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    MouseEnter,
    MouseLeave,
    MouseDown,
    MouseClick,
    MouseDoubleClick,
    MouseUp,
    MouseWheel,
    MouseMove,
    DragStart,
    DragMove,
    DragEnd,
    KeyPress,
    KeyDown,
    KeyUp,
}

/// Whether a handler consumed an event
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum EventOutcome {
    Handled,
    #[default]
    Unhandled,
}

impl EventOutcome {
    pub fn is_handled(self) -> bool {
        self == EventOutcome::Handled
    }
}

/// A pointer or keyboard event in viewport screen coordinates
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ViewportEvent {
    pub x: f32,
    pub y: f32,
    pub button: Option<MouseButton>,
    /// True while a drag gesture is in progress
    pub dragging: bool,
    /// Wheel rotation; positive is away from the user
    pub wheel_delta: i32,
    pub key: Option<Key>,
    pub modifiers: Modifiers,
}

impl ViewportEvent {
    pub fn at(x: f32, y: f32) -> Self {
        Self {
            x,
            y,
            ..Default::default()
        }
    }

    pub fn key(key: Key) -> Self {
        Self {
            key: Some(key),
            ..Default::default()
        }
    }

    pub fn with_button(mut self, button: MouseButton) -> Self {
        self.button = Some(button);
        self
    }

    pub fn with_modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers = modifiers;
        self
    }

    pub fn with_wheel(mut self, delta: i32) -> Self {
        self.wheel_delta = delta;
        self
    }

    pub fn dragging(mut self) -> Self {
        self.dragging = true;
        self
    }

    pub fn is_left(&self) -> bool {
        self.button == Some(MouseButton::Left)
    }
}
