use std::path::{Path, PathBuf};
use std::process::ExitCode;

use editor_tools_lib::command::{execute_json_batch, ScriptError, StepResponse};
use editor_tools_lib::fixtures;
use editor_tools_lib::harness::ToolHarness;
use editor_tools_lib::selection::SelectTool;
use editor_tools_lib::settings::SelectToolSettings;
use shared::Map;

/// `--scene` value that loads the built-in sample map
const SAMPLE_SCENE: &str = "sample";

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "editor_tools=info".into()),
        )
        .init();

    let args = parse_args();

    let map = match load_scene(args.scene.as_deref()) {
        Ok(map) => map,
        Err(e) => {
            tracing::error!("Failed to load scene: {e}");
            return ExitCode::FAILURE;
        }
    };
    tracing::info!("Loaded scene ({} objects)", map.len());

    let mut harness = ToolHarness::new(map, SelectTool::new(SelectToolSettings::load()));
    let responses = match read_script(args.script.as_deref())
        .and_then(|script| execute_json_batch(&mut harness, &script))
    {
        Ok(responses) => responses,
        Err(e) => {
            tracing::error!("{e}");
            vec![StepResponse::err(e.to_string())]
        }
    };

    match serde_json::to_string_pretty(&responses) {
        Ok(json) => {
            println!("{json}");
            if responses.iter().all(|r| r.success) {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            }
        }
        Err(e) => {
            tracing::error!("Failed to serialize responses: {e}");
            ExitCode::FAILURE
        }
    }
}

#[derive(Debug, Default)]
struct Args {
    scene: Option<String>,
    script: Option<PathBuf>,
}

fn parse_args() -> Args {
    let args: Vec<String> = std::env::args().collect();
    let mut parsed = Args::default();
    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--scene" if i + 1 < args.len() => {
                parsed.scene = Some(args[i + 1].clone());
                i += 1;
            }
            "--script" if i + 1 < args.len() => {
                parsed.script = Some(PathBuf::from(&args[i + 1]));
                i += 1;
            }
            other => tracing::warn!("Ignoring argument {other}"),
        }
        i += 1;
    }
    parsed
}

/// The map from a JSON file, the sample map, or an empty map
fn load_scene(scene: Option<&str>) -> Result<Map, String> {
    match scene {
        None => Ok(Map::new()),
        Some(SAMPLE_SCENE) => fixtures::sample_map().map_err(|e| e.to_string()),
        Some(path) => {
            let json = std::fs::read_to_string(path).map_err(|e| format!("{path}: {e}"))?;
            Map::from_json(&json).map_err(|e| format!("{path}: {e}"))
        }
    }
}

/// Script text from a file, or from stdin without `--script`
fn read_script(path: Option<&Path>) -> Result<String, ScriptError> {
    match path {
        Some(path) => std::fs::read_to_string(path).map_err(|source| ScriptError::Io {
            path: path.to_path_buf(),
            source,
        }),
        None => std::io::read_to_string(std::io::stdin()).map_err(|source| ScriptError::Io {
            path: PathBuf::from("<stdin>"),
            source,
        }),
    }
}
