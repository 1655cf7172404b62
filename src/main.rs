//! Regreport CLI
//!
//! Loads the registration collection and prints the report:
//! - Numbered table of registrations, oldest first
//! - Registrations per day
//!
//! `RUST_LOG` overrides the configured log level.

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use regreport::config::{generate_default_config, Config, LoggingConfig};
use regreport::render::{render_csv, render_json, render_summary, render_table};
use regreport::{DocumentSource, FirestoreSource, JsonFileSource, ReportLoader};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "regreport")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Registration report: sorted sign-ups with per-day counts")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file (default: search standard locations)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table", global = true)]
    pub format: OutputFormat,

    /// Display locale (en-US, en-GB, es-ES)
    #[arg(long, global = true)]
    pub locale: Option<String>,

    /// Timezone for day boundaries (UTC or an offset like -03:00)
    #[arg(long, global = true)]
    pub timezone: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Load registrations and print the report
    Report {
        /// Read a JSON export instead of Firestore
        #[arg(long)]
        file: Option<PathBuf>,

        /// Collection to read (overrides config)
        #[arg(long)]
        collection: Option<String>,
    },

    /// Generate default config file
    Config {
        /// Output path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Table,
    Json,
    Csv,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Tracing is not up yet, so config errors go straight to stderr
    let loaded = match &cli.config {
        Some(path) => Config::load_with_env(path),
        None => Config::load_default(),
    };
    let mut config = match loaded {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };
    if let Some(locale) = &cli.locale {
        config.report.locale = locale.clone();
    }
    if let Some(timezone) = &cli.timezone {
        config.report.timezone = timezone.clone();
    }

    init_tracing(&config.logging);

    match cli.command {
        Commands::Report { file, collection } => {
            if let Some(collection) = collection {
                config.source.collection = collection;
            }
            let settings = config.report_settings()?;

            let source: Arc<dyn DocumentSource> = match file {
                Some(path) => Arc::new(JsonFileSource::new(path)),
                None => Arc::new(
                    FirestoreSource::new(config.source.firestore())
                        .context("Cannot create Firestore source")?,
                ),
            };

            let fields = settings.fields.clone();
            let loader = ReportLoader::new(source, settings);
            let report = match loader.load().await {
                Ok(report) => report,
                Err(e) => {
                    eprintln!("Failed to load registrations: {}", e);
                    std::process::exit(1);
                }
            };

            match cli.format {
                OutputFormat::Json => println!("{}", render_json(&report, &fields)?),
                OutputFormat::Csv => print!("{}", render_csv(&report, &fields)?),
                OutputFormat::Table => {
                    if report.is_empty() {
                        println!("No registrations found.");
                    } else {
                        print!("{}", render_table(&report));
                    }
                    println!();
                    print!("{}", render_summary(&report));
                    println!();
                    println!("Total: {}", report.len());
                }
            }
        }

        Commands::Config { output } => {
            let content = generate_default_config();
            match output {
                Some(path) => {
                    std::fs::write(&path, content)
                        .with_context(|| format!("Cannot write {:?}", path))?;
                    println!("Config written to {:?}", path);
                }
                None => print!("{}", content),
            }
        }
    }

    Ok(())
}

/// Logs go to stderr so report output stays clean on stdout
fn init_tracing(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("regreport={}", logging.level)));

    let registry = tracing_subscriber::registry().with(filter);

    if logging.format == "json" {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}
