//! Transformer translation launch: inference followed by BLEU scoring.

use std::collections::HashMap;
use std::path::PathBuf;

use crate::command::{CommandBuilder, CommandLine, LaunchPrefix};
use crate::config::LaunchConfig;
use crate::env::{self, LaunchEnv, OMP_NUM_THREADS};
use crate::errors::Result;
use crate::model_args::ModelArgs;
use crate::platform::{PlatformInfo, ThreadCounts, ThreadResolver};
use crate::runner::{Executor, Invocation, RunReport, Step, StepOutcome};

pub const TRANSLATE_SCRIPT: &str = "transformer/translate.py";
pub const BLEU_SCRIPT: &str = "transformer/compute_bleu.py";

/// Both commands and the environment they run with, fixed at construction.
#[derive(Debug, Clone)]
pub struct TranslationLaunch {
    config: LaunchConfig,
    model_args: ModelArgs,
    threads: ThreadCounts,
    env: LaunchEnv,
    inference: CommandLine,
    bleu: CommandLine,
}

impl TranslationLaunch {
    /// Build against the detected host topology and the current environment.
    pub fn new<I, S>(config: LaunchConfig, custom_args: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<std::ffi::OsString> + Clone,
    {
        Self::with_resolver(
            config,
            custom_args,
            &PlatformInfo::detect(),
            &env::parent_env(),
        )
    }

    pub fn with_resolver<I, S, R>(
        config: LaunchConfig,
        custom_args: I,
        resolver: &R,
        parent_env: &HashMap<String, String>,
    ) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<std::ffi::OsString> + Clone,
        R: ThreadResolver + ?Sized,
    {
        config.validate()?;
        let model_args = ModelArgs::parse_custom(custom_args)?;

        let prefix = LaunchPrefix::new(config.socket_id, config.num_cores);
        let threads = resolver.resolve(&config);

        let mut env = LaunchEnv::new();
        env.set_if_absent(OMP_NUM_THREADS, threads.intra.to_string(), parent_env);
        let kmp_path = config.kmp_config_path();
        let applied = env.load_kmp_config(&kmp_path, parent_env)?;
        if !applied.is_empty() {
            tracing::info!(path = %kmp_path.display(), vars = ?applied, "applied KMP settings");
        }

        let exec_dir = config.model_exec_dir();
        let translate_file = translation_path(&config, &model_args);

        let inference = CommandBuilder::with_prefix(&prefix, config.python_exe.as_str())
            .arg(exec_dir.join(TRANSLATE_SCRIPT).display().to_string())
            .flag("param_set", &model_args.param_set)
            .flag("model_dir", &config.checkpoint)
            .flag("batch_size", config.effective_batch_size())
            .flag("file", &model_args.decode_from_file)
            .flag("file_out", &translate_file)
            .flag("data_dir", &model_args.data_dir)
            .flag("num_inter", threads.inter)
            .flag("num_intra", threads.intra)
            .build();

        let bleu = CommandBuilder::new(config.python_exe.as_str())
            .arg(exec_dir.join(BLEU_SCRIPT).display().to_string())
            .flag("translation", &translate_file)
            .flag("reference", &model_args.reference)
            .build();

        tracing::debug!(
            inter = threads.inter,
            intra = threads.intra,
            "resolved thread counts"
        );

        Ok(Self {
            config,
            model_args,
            threads,
            env,
            inference,
            bleu,
        })
    }

    pub fn config(&self) -> &LaunchConfig {
        &self.config
    }

    pub fn model_args(&self) -> &ModelArgs {
        &self.model_args
    }

    pub fn threads(&self) -> ThreadCounts {
        self.threads
    }

    pub fn env(&self) -> &LaunchEnv {
        &self.env
    }

    pub fn inference_command(&self) -> &CommandLine {
        &self.inference
    }

    pub fn bleu_command(&self) -> &CommandLine {
        &self.bleu
    }

    /// Run inference, then BLEU scoring, each to completion.
    ///
    /// Exit codes are reported rather than raised. BLEU still runs after a
    /// failed inference unless `run_bleu_even_on_failure` is off.
    pub fn run<E: Executor + ?Sized>(&self, executor: &mut E) -> Result<RunReport> {
        println!("{}", self.inference);

        let mut report = RunReport::default();
        let inference = executor.execute(self.invocation(Step::Inference, &self.inference))?;
        let proceed = inference.success() || self.config.run_bleu_even_on_failure;
        report.steps.push(inference);

        if proceed {
            report
                .steps
                .push(executor.execute(self.invocation(Step::Bleu, &self.bleu))?);
        } else {
            tracing::warn!("inference failed, skipping BLEU scoring");
            report.steps.push(StepOutcome::skipped(
                Step::Bleu,
                self.bleu.clone(),
                "inference failed",
            ));
        }
        Ok(report)
    }

    fn invocation<'a>(&'a self, step: Step, command: &'a CommandLine) -> Invocation<'a> {
        Invocation {
            step,
            command,
            env: &self.env,
            workdir: self.config.workdir.as_deref(),
        }
    }
}

fn translation_path(config: &LaunchConfig, model_args: &ModelArgs) -> String {
    let path: PathBuf = config.output_dir.join(&model_args.decode_to_file);
    path.display().to_string()
}
