//! JSON input-script protocol.
//!
//! A script is a list of steps, each a tagged JSON object such as
//! `{"event": "click_2d", "x": 32, "y": 0}`. Planar steps use world x/y of
//! the harness top view; perspective steps use screen pixels.

use std::path::PathBuf;

use glam::Vec3;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::harness::ToolHarness;
use crate::input::{Key, Modifiers};
use crate::tool::{capturing_mouse_wheel, Tool};

/// One recorded input step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ScriptStep {
    /// Hover, press, release and click in the top view
    #[serde(rename = "click_2d")]
    Click2d {
        x: f32,
        y: f32,
        #[serde(default)]
        modifiers: Modifiers,
    },
    /// Left-button drag in the top view
    #[serde(rename = "drag_2d")]
    Drag2d {
        from: [f32; 2],
        to: [f32; 2],
        #[serde(default)]
        modifiers: Modifiers,
    },
    KeyDown {
        key: Key,
        #[serde(default)]
        modifiers: Modifiers,
    },
    #[serde(rename = "mouse_down_3d")]
    MouseDown3d {
        x: f32,
        y: f32,
        #[serde(default)]
        modifiers: Modifiers,
    },
    #[serde(rename = "wheel_3d")]
    Wheel3d { x: f32, y: f32, delta: i32 },
    #[serde(rename = "mouse_up_3d")]
    MouseUp3d { x: f32, y: f32 },
    Undo,
    Redo,
    /// Report the document and selection state
    Inspect,
}

/// Response from executing a step.
#[derive(Debug, Serialize, Deserialize)]
pub struct StepResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl StepResponse {
    fn ok_with_data(data: serde_json::Value) -> Self {
        Self {
            success: true,
            error: None,
            data: Some(data),
        }
    }

    pub fn err(msg: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(msg.into()),
            data: None,
        }
    }
}

#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("Invalid script JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

fn handled(outcome: crate::input::EventOutcome) -> StepResponse {
    StepResponse::ok_with_data(serde_json::json!({ "handled": outcome.is_handled() }))
}

/// Execute a single step on the harness.
pub fn execute_step<T: Tool>(harness: &mut ToolHarness<T>, step: ScriptStep) -> StepResponse {
    match step {
        ScriptStep::Click2d { x, y, modifiers } => {
            handled(harness.click_2d(Vec3::new(x, y, 0.0), modifiers))
        }

        ScriptStep::Drag2d { from, to, modifiers } => {
            harness.drag_2d(
                Vec3::new(from[0], from[1], 0.0),
                Vec3::new(to[0], to[1], 0.0),
                modifiers,
            );
            inspect(harness)
        }

        ScriptStep::KeyDown { key, modifiers } => handled(harness.key_down(key, modifiers)),

        ScriptStep::MouseDown3d { x, y, modifiers } => {
            handled(harness.mouse_down_3d(x, y, modifiers))
        }

        ScriptStep::Wheel3d { x, y, delta } => handled(harness.wheel_3d(x, y, delta)),

        ScriptStep::MouseUp3d { x, y } => handled(harness.mouse_up_3d(x, y)),

        ScriptStep::Undo => {
            let success = harness.undo();
            StepResponse::ok_with_data(serde_json::json!({ "undone": success }))
        }

        ScriptStep::Redo => {
            let success = harness.redo();
            StepResponse::ok_with_data(serde_json::json!({ "redone": success }))
        }

        ScriptStep::Inspect => inspect(harness),
    }
}

fn inspect<T: Tool>(harness: &ToolHarness<T>) -> StepResponse {
    let document = harness.document();
    let selected = document.selected_objects();
    let bounds = document
        .selection_bounding_box()
        .filter(|_| !selected.is_empty())
        .map(|b| serde_json::json!({ "start": b.start.to_array(), "end": b.end.to_array() }));
    StepResponse::ok_with_data(serde_json::json!({
        "tool": harness.tool.name(),
        "object_count": document.map.len(),
        "selected_count": selected.len(),
        "selected": selected,
        "selection_bounds": bounds,
        "can_undo": document.can_undo(),
        "can_redo": document.can_redo(),
        "input_locked": harness.perspective.is_input_locked(),
        "capturing_mouse_wheel": capturing_mouse_wheel(&harness.tool),
    }))
}

/// Parse and execute a single JSON step.
pub fn execute_json<T: Tool>(
    harness: &mut ToolHarness<T>,
    json: &str,
) -> Result<StepResponse, ScriptError> {
    let step: ScriptStep = serde_json::from_str(json)?;
    Ok(execute_step(harness, step))
}

/// Parse and execute a script (JSON array of steps).
pub fn execute_json_batch<T: Tool>(
    harness: &mut ToolHarness<T>,
    json: &str,
) -> Result<Vec<StepResponse>, ScriptError> {
    let steps: Vec<ScriptStep> = serde_json::from_str(json)?;
    Ok(steps.into_iter().map(|step| execute_step(harness, step)).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;
    use crate::selection::SelectTool;
    use shared::{Map, ObjectId};

    fn harness() -> (ToolHarness<SelectTool>, ObjectId) {
        let mut map = Map::new();
        let id = fixtures::add_cuboid(&mut map, Vec3::ZERO, Vec3::splat(64.0)).unwrap();
        (ToolHarness::new(map, SelectTool::default()), id)
    }

    #[test]
    fn test_step_serde_click() {
        let json = r#"{"event": "click_2d", "x": 1.0, "y": 2.0, "modifiers": {"ctrl": true}}"#;
        let step: ScriptStep = serde_json::from_str(json).unwrap();
        assert_eq!(
            step,
            ScriptStep::Click2d {
                x: 1.0,
                y: 2.0,
                modifiers: Modifiers::CTRL,
            }
        );
    }

    #[test]
    fn test_step_serde_key_down() {
        let json = r#"{"event": "key_down", "key": "escape"}"#;
        let step: ScriptStep = serde_json::from_str(json).unwrap();
        assert!(matches!(step, ScriptStep::KeyDown { key: Key::Escape, .. }));
    }

    #[test]
    fn test_execute_click_then_inspect() {
        let (mut h, id) = harness();
        let resp = execute_json(&mut h, r#"{"event": "click_2d", "x": 0.0, "y": 32.0}"#).unwrap();
        assert!(resp.success);
        // Selection clicks do not consume the event
        assert_eq!(resp.data.unwrap()["handled"], false);

        let resp = execute_json(&mut h, r#"{"event": "inspect"}"#).unwrap();
        let data = resp.data.unwrap();
        assert_eq!(data["tool"], "SelectTool");
        assert_eq!(data["selected_count"], 1);
        assert_eq!(data["selected"][0], serde_json::to_value(id).unwrap());
    }

    #[test]
    fn test_execute_batch_with_undo() {
        let (mut h, _) = harness();
        let script = r#"[
            {"event": "click_2d", "x": 0.0, "y": 32.0},
            {"event": "undo"},
            {"event": "undo"},
            {"event": "inspect"}
        ]"#;
        let responses = execute_json_batch(&mut h, script).unwrap();
        assert_eq!(responses.len(), 4);
        assert_eq!(responses[1].data.as_ref().unwrap()["undone"], true);
        assert_eq!(responses[2].data.as_ref().unwrap()["undone"], false);
        assert_eq!(responses[3].data.as_ref().unwrap()["selected_count"], 0);
    }

    #[test]
    fn test_execute_invalid_json() {
        let (mut h, _) = harness();
        let result = execute_json(&mut h, "not valid json");
        assert!(matches!(result, Err(ScriptError::InvalidJson(_))));
    }
}
