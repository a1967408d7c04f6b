//! Launcher for the Transformer language-translation benchmark.
//!
//! Builds the inference and BLEU-scoring command lines from a
//! [`LaunchConfig`] plus model arguments, then runs them one after the other.

pub mod command;
pub mod config;
pub mod env;
pub mod errors;
pub mod launch;
pub mod model_args;
pub mod platform;
pub mod runner;

pub use command::{CommandBuilder, CommandLine, LaunchPrefix};
pub use config::LaunchConfig;
pub use env::LaunchEnv;
pub use errors::LaunchError;
pub use launch::TranslationLaunch;
pub use model_args::ModelArgs;
pub use platform::{PlatformInfo, ThreadCounts, ThreadResolver};
pub use runner::{Executor, OutputMode, RunReport, Step, StepOutcome, StepStatus, SystemExecutor};
