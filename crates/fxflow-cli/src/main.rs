//! fxflow CLI — run YAML-defined forex tool workflows.
//!
//! Thin driver over fxflow-core: argument parsing, logging setup, file
//! loading and the interactive console live here; everything else is core.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use fxflow_cli::commands;

/// fxflow — declarative workflows over forex analysis tools
#[derive(Parser)]
#[command(name = "fxflow", version, about = "fxflow — declarative workflows over forex analysis tools")]
pub struct Cli {
    /// Extra directory of tool definition files (*.yaml)
    #[arg(long, global = true, env = "FXFLOW_TOOLS_DIR")]
    tools_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute a workflow file
    Run {
        /// Path to the workflow YAML file
        file: PathBuf,
        /// Print every tool payload as it arrives
        #[arg(short, long)]
        verbose: bool,
        /// Prompt for INPUT steps even when parameters are given
        #[arg(short, long)]
        interactive: bool,
        /// Pre-supplied variable, e.g. `-p days=14` (repeatable)
        #[arg(short = 'p', long = "param", value_name = "KEY=VALUE")]
        params: Vec<String>,
    },

    /// Parse and check a workflow file without running it
    Validate {
        /// Path to the workflow YAML file
        file: PathBuf,
    },

    /// List registered tools
    Tools,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "fxflow_core=warn,fxflow_cli=info".into()),
        )
        .init();

    let tools_dir = cli.tools_dir.as_deref();
    let result = match cli.command {
        Some(Commands::Run {
            file,
            verbose,
            interactive,
            params,
        }) => {
            let args = commands::workflow::RunArgs {
                verbose,
                interactive,
                params,
            };
            commands::workflow::run(&file, args, tools_dir).await
        }
        Some(Commands::Validate { file }) => commands::workflow::validate(&file),
        Some(Commands::Tools) => commands::tools::list(tools_dir),
        None => {
            use clap::CommandFactory;
            Cli::command().print_help().ok();
            println!();
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
