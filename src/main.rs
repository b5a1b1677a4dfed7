use bank_etl::PipelineConfig;
use bank_etl::cli::{render_config, render_graph, run_pipeline, write_config};
use clap::{Parser, Subcommand, builder::styling};
use eyre::Result;
use owo_colors::OwoColorize;
use std::path::Path;

// CLI Styling
const STYLES: styling::Styles = styling::Styles::styled()
    .header(styling::AnsiColor::BrightWhite.on_default())
    .usage(styling::AnsiColor::BrightWhite.on_default())
    .literal(styling::AnsiColor::Green.on_default())
    .placeholder(styling::AnsiColor::Cyan.on_default());

/// Bank ETL: scrape the largest banks by market cap, convert to GBP/EUR/INR, and store as CSV and SQLite
#[derive(Parser)]
#[command(name = "banketl", version, styles = STYLES)]
struct Cli {
    /// The YAML configuration file; defaults apply when it does not exist
    #[arg(short, long, global = true, default_value = "banketl.yml")]
    config: String,

    /// The dotenv file to source BANKETL_* overrides from
    #[arg(short, long, global = true, default_value = ".env")]
    env: String,

    /// More verbose logging
    #[arg(long, global = true)]
    debug: bool,

    /// Command to execute
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Trigger one run of the pipeline
    Run,

    /// Print the task graph
    Graph {
        /// Print JSON instead of YAML
        #[arg(long)]
        json: bool,
    },

    /// Print the effective configuration
    Config {
        /// Write the configuration to this YAML file instead of printing it
        #[arg(short, long)]
        write: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    if Path::new(&cli.env).exists() {
        dotenvy::from_filename(&cli.env)?;
    }

    let log_level = match cli.debug {
        true => "debug",
        false => "info",
    };
    let env = env_logger::Env::default().filter_or("LOG_LEVEL", log_level);
    env_logger::Builder::from_env(env)
        .format_timestamp_millis()
        .init();

    let config = PipelineConfig::load(&cli.config)?;

    match cli.command {
        Commands::Run => {
            log::info!("Triggering {}", config.dag_id.cyan());
            let report = run_pipeline(config).await?;
            if !report.succeeded() {
                std::process::exit(1);
            }
        }
        Commands::Graph { json } => {
            println!("{}", render_graph(&config, json)?);
        }
        Commands::Config { write } => {
            log::debug!("Configuration file: {}", cli.config.bright_black());
            match write {
                Some(path) => write_config(&config, &path)?,
                None => print!("{}", render_config(&config)?),
            }
        }
    }

    Ok(())
}
