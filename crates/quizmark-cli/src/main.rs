//! quizmark CLI: grade rosters of quiz answers from TOML files.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "quizmark", version, about = "Quiz attempt grading")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Grade every student of a roster against a quiz
    Grade {
        /// Path to the quiz catalog .toml
        #[arg(long)]
        quiz: PathBuf,

        /// Path to the roster .toml with student answers
        #[arg(long)]
        roster: PathBuf,

        /// Tenant (college) to grade under
        #[arg(long)]
        tenant: Option<i64>,

        /// Max concurrent attempts
        #[arg(long)]
        parallelism: Option<usize>,

        /// Output directory
        #[arg(long)]
        output: Option<PathBuf>,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Show statistics of a saved gradebook
    Stats {
        /// Gradebook JSON written by `quizmark grade`
        #[arg(long)]
        report: PathBuf,

        /// Output format: text, json
        #[arg(long, default_value = "text")]
        format: String,
    },

    /// Validate quiz catalog TOML files
    Validate {
        /// Path to a quiz file or directory
        #[arg(long)]
        quiz: PathBuf,
    },

    /// Create starter config, example quiz and roster
    Init,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("quizmark=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Grade {
            quiz,
            roster,
            tenant,
            parallelism,
            output,
            config,
        } => commands::grade::execute(quiz, roster, tenant, parallelism, output, config).await,
        Commands::Stats { report, format } => commands::stats::execute(report, format),
        Commands::Validate { quiz } => commands::validate::execute(quiz),
        Commands::Init => commands::init::execute(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}
