#![warn(clippy::all, clippy::pedantic)]
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::unnecessary_literal_bound,
    clippy::module_name_repetitions,
    clippy::struct_field_names
)]

use anyhow::{Context, Result, bail};
use clap::Parser;
use std::fs::OpenOptions;
use std::sync::Mutex;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use stepwise::{Config, Plan, PlanRun, Solver};

mod cli;

use cli::{Cli, Commands};

fn init_logging(config: &Config, verbose: bool) -> Result<()> {
    let level = if verbose {
        Level::DEBUG
    } else {
        config.logging.level.parse().unwrap_or(Level::INFO)
    };
    let builder = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr);

    if let Some(path) = &config.logging.file {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("Failed to open log file {}", path.display()))?;
        let subscriber = builder
            .with_ansi(false)
            .with_writer(Mutex::new(file))
            .finish();
        tracing::subscriber::set_global_default(subscriber)?;
    } else {
        tracing::subscriber::set_global_default(builder.finish())?;
    }
    Ok(())
}

fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load_or_init()?,
    };
    config.apply_env_overrides();
    Ok(config)
}

fn print_run(run: &PlanRun) {
    for result in &run.results {
        match (&result.output, &result.error) {
            (Some(output), _) => println!(
                "  step {} ({}) ok after {} attempt(s): {output}",
                result.step_id, result.tool, result.attempts
            ),
            (None, Some(error)) => println!(
                "  step {} ({}) failed after {} attempt(s): {error}",
                result.step_id, result.tool, result.attempts
            ),
            (None, None) => println!("  step {} ({})", result.step_id, result.tool),
        }
    }
    for (id, state) in &run.states {
        if run.result(*id).is_none() {
            println!("  step {id} {state}");
        }
    }
    match &run.abort {
        Some(reason) => println!("Plan {} ({reason})", run.status),
        None => println!("Plan {}", run.status),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut config = load_config(&cli)?;
    init_logging(&config, cli.verbose)?;

    match cli.command {
        Commands::Solve {
            question,
            file,
            attachments,
            json,
        } => {
            let question = match (question, file) {
                (Some(question), _) => question,
                (None, Some(path)) => std::fs::read_to_string(&path)
                    .with_context(|| format!("Failed to read question from {}", path.display()))?,
                (None, None) => bail!("Provide a question or --file"),
            };
            let solver = Solver::from_config(&config)?;
            let report = solver.solve(&question, &attachments).await;
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!("Answer: {}", report.answer.as_deref().unwrap_or("(none)"));
                println!("Confidence: {:.2}", report.confidence);
                println!();
                println!("{}", report.explanation);
            }
        }
        Commands::Tools => {
            let solver = Solver::from_config(&config)?;
            for spec in solver.tools() {
                println!("{:<14} {}", spec.name, spec.description);
            }
        }
        Commands::Run {
            plan,
            continue_on_failure,
        } => {
            let raw = std::fs::read_to_string(&plan)
                .with_context(|| format!("Failed to read plan {}", plan.display()))?;
            let plan = Plan::from_json(&raw)?;
            config.execution.continue_on_failure |= continue_on_failure;
            let solver = Solver::from_config(&config)?;
            let run = solver.run_plan(&plan).await;
            println!("Run {}", run.run_id);
            print_run(&run);
        }
    }
    Ok(())
}
