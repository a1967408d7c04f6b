use anyhow::Context;
use serde_json::json;

use ltbench_core::{OutputMode, RunReport, StepStatus, SystemExecutor, TranslationLaunch};

use crate::cli::args::RunArgs;
use crate::exit_codes;

pub fn run(args: RunArgs) -> anyhow::Result<i32> {
    let config = args.launch_config().context("loading launch config")?;
    let launch = TranslationLaunch::new(config, &args.model_args)
        .context("assembling inference and BLEU commands")?;

    if args.dry_run {
        print_plan(&launch, args.json)?;
        return Ok(exit_codes::SUCCESS);
    }

    let output = if args.capture {
        OutputMode::Capture
    } else {
        OutputMode::Inherit
    };
    let report = launch.run(&mut SystemExecutor::new(output))?;

    if args.json {
        println!("{}", serde_json::to_string(&report)?);
    } else {
        print_summary(&report);
    }

    Ok(if report.all_succeeded() {
        exit_codes::SUCCESS
    } else {
        exit_codes::COMMAND_FAILED
    })
}

fn print_plan(launch: &TranslationLaunch, as_json: bool) -> anyhow::Result<()> {
    if as_json {
        let env: serde_json::Map<String, serde_json::Value> = launch
            .env()
            .iter()
            .map(|(k, v)| (k.to_string(), json!(v)))
            .collect();
        let plan = json!({
            "inference": launch.inference_command(),
            "bleu": launch.bleu_command(),
            "env": env,
        });
        println!("{}", serde_json::to_string(&plan)?);
        return Ok(());
    }

    for (key, value) in launch.env().iter() {
        println!("{key}={value}");
    }
    println!("{}", launch.inference_command());
    println!("{}", launch.bleu_command());
    Ok(())
}

fn print_summary(report: &RunReport) {
    for step in &report.steps {
        match &step.status {
            StepStatus::Exited { code, success } => {
                let code = code.map_or_else(|| "signal".to_string(), |c| c.to_string());
                let verdict = if *success { "ok" } else { "FAILED" };
                eprintln!("{:<10} {verdict} (exit {code})", step.step.as_str());
            }
            StepStatus::Skipped { reason } => {
                eprintln!("{:<10} skipped ({reason})", step.step.as_str());
            }
        }
    }
}
