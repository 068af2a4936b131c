//! CLI command implementations

use anyhow::{Context, Result};
use recast_core::Config;

pub mod functions;
pub mod init;
pub mod preview;
pub mod run;
pub mod status;
pub mod validate;

/// Sample input used when no `--input` is given
pub const DEFAULT_INPUT: &str = "data/input.jsonl";

/// Load the project, with the path in the error
pub fn load_project(config_path: &str) -> Result<Config> {
    tracing::debug!("Loading configuration from {}", config_path);
    Config::load(config_path)
        .with_context(|| format!("Failed to load configuration from {}", config_path))
}
