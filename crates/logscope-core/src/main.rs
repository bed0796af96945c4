//! Logscope CLI
//!
//! Command-line interface for the Logscope log analytics service.

use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::info;

use logscope::engine::Engine;
use logscope::{api::HttpServer, Config};

/// Logscope - log-file analytics for web service monitoring
#[derive(Parser)]
#[command(name = "logscope")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, global = true, env = "LOGSCOPE_CONFIG")]
    config: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the Logscope API server
    Serve {
        /// HTTP API port (overrides configuration)
        #[arg(long, env = "LOGSCOPE_HTTP_PORT")]
        port: Option<u16>,
    },

    /// Show log file health status
    Health,
}

#[tokio::main]
async fn main() -> ExitCode {
    // Pick up a local .env before anything reads the environment
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    // Load configuration
    let config = match Config::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error loading configuration: {e}");
            return ExitCode::FAILURE;
        }
    };

    init_logging(&config, cli.verbose);

    let result = match cli.command {
        Commands::Serve { port } => run_serve(config, port).await,
        Commands::Health => run_health(&config),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn init_logging(config: &Config, verbose: bool) {
    let log_level = if verbose {
        "debug"
    } else {
        config.logging.level.as_str()
    };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));

    if config.logging.format == "json" {
        tracing_subscriber::fmt().with_env_filter(env_filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }
}

async fn run_serve(config: Config, port: Option<u16>) -> anyhow::Result<()> {
    let port = port.unwrap_or(config.server.http_port);
    let addr = format!("{}:{}", config.server.host, port);

    info!(
        "Starting Logscope over {} on {}",
        config.log.path, addr
    );

    let engine = Arc::new(Engine::new(&config));
    HttpServer::new(engine).serve(&addr).await?;

    Ok(())
}

fn run_health(config: &Config) -> anyhow::Result<()> {
    let engine = Engine::new(config);
    let health = engine.health();
    println!("{}", serde_json::to_string_pretty(&health)?);
    Ok(())
}
