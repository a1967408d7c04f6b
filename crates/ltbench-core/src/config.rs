//! Launcher configuration.
//!
//! Every field has a default so a YAML file only needs the values it changes.
//! `-1` is the "unset" sentinel for socket, core and batch settings.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::errors::{LaunchError, Result};

pub const UNSET: i64 = -1;

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct LaunchConfig {
    /// NUMA socket to bind to, or -1 for no binding.
    pub socket_id: i64,
    /// Number of physical cores to bind to, or -1 for all.
    pub num_cores: i64,
    pub num_inter_threads: Option<u32>,
    pub num_intra_threads: Option<u32>,
    /// Inference batch size, or -1 to let the launcher pick.
    pub batch_size: i64,
    pub output_dir: PathBuf,
    /// Checkpoint directory passed to the inference script as `--model_dir`.
    pub checkpoint: String,
    pub python_exe: String,
    /// Root of the model tree; scripts live under `<models_dir>/<mode>/<precision>`.
    pub models_dir: PathBuf,
    pub mode: String,
    pub precision: String,
    /// Working directory for the child processes. Inherited when unset.
    pub workdir: Option<PathBuf>,
    /// KMP settings file. Defaults to `config.json` in the model exec dir.
    pub kmp_config: Option<PathBuf>,
    #[serde(default = "default_true")]
    pub run_bleu_even_on_failure: bool,
}

fn default_true() -> bool {
    true
}

impl Default for LaunchConfig {
    fn default() -> Self {
        Self {
            socket_id: UNSET,
            num_cores: UNSET,
            num_inter_threads: None,
            num_intra_threads: None,
            batch_size: UNSET,
            output_dir: PathBuf::from("."),
            checkpoint: String::new(),
            python_exe: "python".to_string(),
            models_dir: PathBuf::from("models"),
            mode: "inference".to_string(),
            precision: "bfloat16".to_string(),
            workdir: None,
            kmp_config: None,
            run_bleu_even_on_failure: true,
        }
    }
}

impl LaunchConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|source| LaunchError::ReadFile {
            kind: "launch config",
            path: path.to_path_buf(),
            source,
        })?;
        serde_yaml::from_str(&raw).map_err(|source| LaunchError::LaunchConfigParse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn validate(&self) -> Result<()> {
        if self.socket_id < UNSET {
            return Err(LaunchError::InvalidConfig(format!(
                "socket_id must be -1 or a socket index, got {}",
                self.socket_id
            )));
        }
        if self.num_cores != UNSET && !(1..=i64::from(u32::MAX)).contains(&self.num_cores) {
            return Err(LaunchError::InvalidConfig(format!(
                "num_cores must be -1 or between 1 and {}, got {}",
                u32::MAX,
                self.num_cores
            )));
        }
        if self.batch_size != UNSET && self.batch_size < 1 {
            return Err(LaunchError::InvalidConfig(format!(
                "batch_size must be -1 or at least 1, got {}",
                self.batch_size
            )));
        }
        for (name, value) in [
            ("num_inter_threads", self.num_inter_threads),
            ("num_intra_threads", self.num_intra_threads),
        ] {
            if value == Some(0) {
                return Err(LaunchError::InvalidConfig(format!(
                    "{name} must be at least 1"
                )));
            }
        }
        if self.python_exe.trim().is_empty() {
            return Err(LaunchError::InvalidConfig(
                "python_exe must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Directory holding the transformer scripts for this mode and precision.
    pub fn model_exec_dir(&self) -> PathBuf {
        self.models_dir.join(&self.mode).join(&self.precision)
    }

    pub fn kmp_config_path(&self) -> PathBuf {
        self.kmp_config
            .clone()
            .unwrap_or_else(|| self.model_exec_dir().join("config.json"))
    }

    /// Batch size handed to the inference script; the sentinel maps to 1.
    pub fn effective_batch_size(&self) -> i64 {
        if self.batch_size == UNSET {
            1
        } else {
            self.batch_size
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_use_sentinels() {
        let cfg = LaunchConfig::default();
        assert_eq!(cfg.socket_id, UNSET);
        assert_eq!(cfg.num_cores, UNSET);
        assert_eq!(cfg.effective_batch_size(), 1);
        assert!(cfg.run_bleu_even_on_failure);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn partial_yaml_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "socket_id: 0\nnum_cores: 28\nbatch_size: 64").unwrap();

        let cfg = LaunchConfig::load(file.path()).unwrap();
        assert_eq!(cfg.socket_id, 0);
        assert_eq!(cfg.num_cores, 28);
        assert_eq!(cfg.effective_batch_size(), 64);
        assert_eq!(cfg.python_exe, "python");
        assert!(cfg.run_bleu_even_on_failure);
    }

    #[test]
    fn unknown_yaml_field_is_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "sockets: 2").unwrap();

        let err = LaunchConfig::load(file.path()).unwrap_err();
        assert!(matches!(err, LaunchError::LaunchConfigParse { .. }));
    }

    #[test]
    fn validate_rejects_out_of_range_values() {
        let cases = [
            LaunchConfig {
                socket_id: -2,
                ..Default::default()
            },
            LaunchConfig {
                num_cores: 0,
                ..Default::default()
            },
            LaunchConfig {
                num_cores: i64::from(u32::MAX) + 1,
                ..Default::default()
            },
            LaunchConfig {
                batch_size: 0,
                ..Default::default()
            },
            LaunchConfig {
                num_intra_threads: Some(0),
                ..Default::default()
            },
            LaunchConfig {
                python_exe: " ".into(),
                ..Default::default()
            },
        ];
        for cfg in cases {
            assert!(cfg.validate().is_err(), "expected rejection for {cfg:?}");
        }
    }

    #[test]
    fn num_cores_accepts_full_u32_range() {
        let cfg = LaunchConfig {
            num_cores: i64::from(u32::MAX),
            ..Default::default()
        };
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn kmp_config_defaults_to_exec_dir() {
        let cfg = LaunchConfig {
            models_dir: PathBuf::from("/models"),
            ..Default::default()
        };
        assert_eq!(
            cfg.kmp_config_path(),
            PathBuf::from("/models/inference/bfloat16/config.json")
        );
    }
}
