// Library crate: the tool framework plus the headless harness and script
// protocol used by the integration tests and the `editor-tools` binary.

pub mod command;
pub mod cordon;
pub mod draggable;
pub mod fixtures;
pub mod harness;
pub mod input;
pub mod selection;
pub mod settings;
pub mod snap;
pub mod tool;
pub mod viewport;
