//! Recast CLI
//!
//! Developer tool for authoring, validating and running transform definitions.

use anyhow::Result;
use clap::{Parser, Subcommand};
use recast_core::{Config, LogFormat};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

/// Recast - declarative record transforms
#[derive(Parser)]
#[command(name = "recast")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Project directory or recast.yaml path
    #[arg(short, long, default_value = "recast.yaml", env = "RECAST_CONFIG")]
    config: String,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a new Recast project
    Init {
        /// Directory to initialize (defaults to current directory)
        #[arg(default_value = ".")]
        path: String,

        /// Project name (defaults to directory name)
        #[arg(short, long)]
        name: Option<String>,
    },

    /// Validate transform definitions against their schemas
    Validate {
        /// Validate a single transform by name or id
        #[arg(short, long)]
        transform: Option<String>,
    },

    /// Run a transform over a JSONL file
    Run {
        /// Transform name or id
        #[arg(short, long)]
        transform: String,

        /// Input JSONL, relative to the project (defaults to data/input.jsonl)
        #[arg(short, long)]
        input: Option<String>,

        /// Output JSONL, relative to the project (defaults to stdout)
        #[arg(short, long)]
        output: Option<String>,

        /// Transform and validate without producing output
        #[arg(long)]
        dry_run: bool,

        /// Skip target schema validation
        #[arg(long)]
        no_validate: bool,
    },

    /// Preview a transform over sample records
    Preview {
        /// Transform name or id
        #[arg(short, long)]
        transform: String,

        /// Sample JSONL, relative to the project (defaults to data/input.jsonl)
        #[arg(short, long)]
        input: Option<String>,

        /// Maximum samples to process
        #[arg(short, long)]
        max_samples: Option<usize>,
    },

    /// List available transform functions
    Functions {
        /// Only list one category
        #[arg(long)]
        category: Option<String>,

        /// Print the catalog as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show project status
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging; the project may ask for JSON lines
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    let format = Config::load(&cli.config)
        .map(|config| config.project.logging.format)
        .unwrap_or_default();

    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Json => registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init(),
        LogFormat::Text => registry
            .with(fmt::layer().with_writer(std::io::stderr))
            .init(),
    }

    match cli.command {
        Commands::Init { path, name } => {
            commands::init::run(&path, name.as_deref()).await?;
        }
        Commands::Validate { transform } => {
            commands::validate::run(&cli.config, transform.as_deref()).await?;
        }
        Commands::Run {
            transform,
            input,
            output,
            dry_run,
            no_validate,
        } => {
            commands::run::run(
                &cli.config,
                &transform,
                input.as_deref(),
                output.as_deref(),
                dry_run,
                no_validate,
            )
            .await?;
        }
        Commands::Preview {
            transform,
            input,
            max_samples,
        } => {
            commands::preview::run(&cli.config, &transform, input.as_deref(), max_samples).await?;
        }
        Commands::Functions { category, json } => {
            commands::functions::run(category.as_deref(), json).await?;
        }
        Commands::Status => {
            commands::status::run(&cli.config).await?;
        }
    }

    Ok(())
}
