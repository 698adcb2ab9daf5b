//! SOAP note evaluation CLI

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use soap_eval::{config::Config, reporting::print_console_report, runner::BatchRunner};

#[derive(Parser)]
#[command(name = "soap-eval")]
#[command(about = "Score generated SOAP notes against annotated reference consultations")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Configuration file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate every result file and write the report (default)
    Run,

    /// Write the default configuration as TOML
    InitConfig {
        /// Output path
        #[arg(short, long, default_value = "config/eval.toml")]
        output: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("soap_eval=debug,info")
    } else {
        EnvFilter::new("soap_eval=info,warn")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => run_evaluation(cli.config),
        Commands::InitConfig { output } => init_config(output),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run_evaluation(config_path: Option<PathBuf>) -> Result<(), Box<dyn std::error::Error>> {
    let config = match config_path {
        Some(path) => {
            let config = Config::from_file(&path)?;
            tracing::info!("Loaded configuration from {}", path.display());
            config
        }
        None => Config::load_or_default(),
    };

    let outcome = BatchRunner::new(&config)?.run()?;

    print_console_report(&outcome.rankings, &outcome.aggregated, &config.batch.primary_prompt);
    if !outcome.skipped.is_empty() {
        println!("Skipped {} result files (see warnings above)", outcome.skipped.len());
    }
    println!("Report: {}", outcome.report_path.display());
    println!("Data:   {}", outcome.data_path.display());
    Ok(())
}

fn init_config(output: PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::default();

    // Ensure parent directory exists
    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    config.save_toml(&output)?;
    println!("Configuration written to: {}", output.display());
    Ok(())
}
