use clap::{Parser, Subcommand};
use std::path::PathBuf;

use ltbench_core::LaunchConfig;

#[derive(Parser)]
#[command(
    name = "ltbench",
    version,
    about = "Launch Transformer translation inference and score it with BLEU"
)]
pub struct Cli {
    #[command(subcommand)]
    pub cmd: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run inference, then BLEU scoring
    Run(RunArgs),
    Version,
}

/// Launcher options. Anything given here overrides the `--config` file.
#[derive(Parser, Clone, Debug)]
pub struct RunArgs {
    /// YAML launch config
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// NUMA socket to bind to (-1 for none)
    #[arg(long, allow_hyphen_values = true)]
    pub socket_id: Option<i64>,

    /// Physical cores to bind to (-1 for all)
    #[arg(long, allow_hyphen_values = true)]
    pub num_cores: Option<i64>,

    #[arg(long)]
    pub num_inter_threads: Option<u32>,

    #[arg(long)]
    pub num_intra_threads: Option<u32>,

    /// Inference batch size (-1 picks 1)
    #[arg(long, allow_hyphen_values = true)]
    pub batch_size: Option<i64>,

    /// Directory the translation is written to
    #[arg(long)]
    pub output_dir: Option<PathBuf>,

    /// Model checkpoint directory
    #[arg(long)]
    pub checkpoint: Option<String>,

    #[arg(long, env = "PYTHON_EXE")]
    pub python_exe: Option<String>,

    /// Root of the model tree (<models-dir>/<mode>/<precision>/transformer)
    #[arg(long)]
    pub models_dir: Option<PathBuf>,

    #[arg(long)]
    pub mode: Option<String>,

    #[arg(long)]
    pub precision: Option<String>,

    /// Working directory for both child processes
    #[arg(long)]
    pub workdir: Option<PathBuf>,

    /// KMP settings JSON (default: <exec dir>/config.json)
    #[arg(long)]
    pub kmp_config: Option<PathBuf>,

    /// Skip BLEU scoring when inference fails
    #[arg(long)]
    pub no_bleu_on_failure: bool,

    /// Capture child output into the report instead of streaming it
    #[arg(long)]
    pub capture: bool,

    /// Print the commands and environment without running anything
    #[arg(long)]
    pub dry_run: bool,

    /// Print a JSON report on stdout
    #[arg(long)]
    pub json: bool,

    /// Model arguments: --param, --data_dir, --model_dir, --file, --file_out, --reference
    #[arg(last = true)]
    pub model_args: Vec<String>,
}

impl RunArgs {
    /// Layer CLI overrides on top of the config file (or defaults).
    pub fn launch_config(&self) -> anyhow::Result<LaunchConfig> {
        let mut cfg = match &self.config {
            Some(path) => LaunchConfig::load(path)?,
            None => LaunchConfig::default(),
        };

        if let Some(v) = self.socket_id {
            cfg.socket_id = v;
        }
        if let Some(v) = self.num_cores {
            cfg.num_cores = v;
        }
        if self.num_inter_threads.is_some() {
            cfg.num_inter_threads = self.num_inter_threads;
        }
        if self.num_intra_threads.is_some() {
            cfg.num_intra_threads = self.num_intra_threads;
        }
        if let Some(v) = self.batch_size {
            cfg.batch_size = v;
        }
        if let Some(v) = &self.output_dir {
            cfg.output_dir = v.clone();
        }
        if let Some(v) = &self.checkpoint {
            cfg.checkpoint = v.clone();
        }
        if let Some(v) = &self.python_exe {
            cfg.python_exe = v.clone();
        }
        if let Some(v) = &self.models_dir {
            cfg.models_dir = v.clone();
        }
        if let Some(v) = &self.mode {
            cfg.mode = v.clone();
        }
        if let Some(v) = &self.precision {
            cfg.precision = v.clone();
        }
        if self.workdir.is_some() {
            cfg.workdir = self.workdir.clone();
        }
        if self.kmp_config.is_some() {
            cfg.kmp_config = self.kmp_config.clone();
        }
        if self.no_bleu_on_failure {
            cfg.run_bleu_even_on_failure = false;
        }
        Ok(cfg)
    }
}
