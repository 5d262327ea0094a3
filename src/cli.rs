use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// `stepwise` - answer questions by planning and running tool steps.
#[derive(Parser, Debug)]
#[command(name = "stepwise")]
#[command(version)]
#[command(about = "Agentic question answering: analyze, plan, execute, answer.", long_about = None)]
pub struct Cli {
    /// Config file (defaults to ~/.stepwise/config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Log at debug level regardless of config
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Answer a question
    Solve {
        /// The question to answer
        question: Option<String>,

        /// Read the question from a file instead
        #[arg(short, long, conflicts_with = "question")]
        file: Option<PathBuf>,

        /// Files the question refers to
        #[arg(short, long, num_args = 1..)]
        attachments: Vec<String>,

        /// Print the full report as JSON
        #[arg(long)]
        json: bool,
    },

    /// List registered tools
    Tools,

    /// Execute a plan from a JSON file
    Run {
        /// Path to the plan JSON
        plan: PathBuf,

        /// Keep running steps whose dependencies failed
        #[arg(long)]
        continue_on_failure: bool,
    },
}
