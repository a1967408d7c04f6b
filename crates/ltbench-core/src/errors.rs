use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum LaunchError {
    /// Custom model arguments did not match the local schema.
    #[error("invalid model arguments: {0}")]
    ModelArgs(#[from] clap::Error),

    #[error("invalid launch configuration: {0}")]
    InvalidConfig(String),

    #[error("failed to read {kind} file {path}: {source}")]
    ReadFile {
        kind: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse KMP config {path}: {source}")]
    KmpConfigParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to parse launch config {path}: {source}")]
    LaunchConfigParse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T, E = LaunchError> = std::result::Result<T, E>;
