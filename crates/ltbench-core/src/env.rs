//! Environment handed to the benchmark child processes.
//!
//! Nothing here touches the launcher's own process environment. Variables are
//! collected into a [`LaunchEnv`] and applied to each spawned command, on top of
//! the inherited parent environment.
//!
//! KMP settings come from a JSON file of the form
//! `{"optimization_parameters": {"KMP_AFFINITY": "...", "KMP_BLOCKTIME": 1}}`
//! and never override a variable the parent already exports.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use serde::Deserialize;

use crate::errors::{LaunchError, Result};

pub const OMP_NUM_THREADS: &str = "OMP_NUM_THREADS";

#[derive(Debug, Deserialize)]
struct KmpConfigFile {
    #[serde(default)]
    optimization_parameters: BTreeMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LaunchEnv {
    vars: BTreeMap<String, String>,
}

impl LaunchEnv {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.vars.insert(key.into(), value.into());
    }

    /// Add `key` unless the parent environment already defines it.
    /// Returns whether the variable was added.
    pub fn set_if_absent(
        &mut self,
        key: &str,
        value: impl Into<String>,
        parent: &HashMap<String, String>,
    ) -> bool {
        if parent.contains_key(key) {
            tracing::debug!(key, "keeping value from parent environment");
            return false;
        }
        self.vars.insert(key.to_string(), value.into());
        true
    }

    /// Apply the KMP settings file at `path`. A missing file is a no-op.
    /// Returns the keys that were added.
    pub fn load_kmp_config(
        &mut self,
        path: &Path,
        parent: &HashMap<String, String>,
    ) -> Result<Vec<String>> {
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "no KMP config, skipping");
                return Ok(Vec::new());
            }
            Err(source) => {
                return Err(LaunchError::ReadFile {
                    kind: "KMP config",
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        let file: KmpConfigFile =
            serde_json::from_str(&raw).map_err(|source| LaunchError::KmpConfigParse {
                path: path.to_path_buf(),
                source,
            })?;

        let mut applied = Vec::new();
        for (key, value) in file.optimization_parameters {
            let value = match value {
                serde_json::Value::String(s) => s,
                other => other.to_string(),
            };
            if self.set_if_absent(&key, value, parent) {
                applied.push(key);
            }
        }
        Ok(applied)
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.vars.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }
}

/// Snapshot of the current process environment.
pub fn parent_env() -> HashMap<String, String> {
    std::env::vars().collect()
}
