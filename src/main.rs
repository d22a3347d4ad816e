use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use forking_paths::{
    cli::{execute_command, SavesCommands},
    config::{Config, LogFormat},
    garden::{PathEngine, PipeNarrator},
    langbase::LangbaseClient,
    server::{AppState, McpServer},
    storage::SqliteStorage,
};

/// Walk the Garden of Forking Paths.
#[derive(Parser, Debug)]
#[command(name = "forking-paths", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the tool server on stdin/stdout (default)
    Serve,

    /// Inspect or remove saved journeys
    Saves {
        #[command(subcommand)]
        command: SavesCommands,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    init_logging(&config);

    let storage = match SqliteStorage::new(&config.database).await {
        Ok(s) => {
            info!(path = %config.database.path.display(), "Database initialized");
            s
        }
        Err(e) => {
            error!(error = %e, "Failed to initialize database");
            return Err(e.into());
        }
    };

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => serve(config, storage).await,
        Commands::Saves { command } => {
            let result = execute_command(command, &storage).await;
            if result.exit_code == 0 {
                println!("{}", result.message);
            } else {
                eprintln!("{}", result.message);
            }
            std::process::exit(result.exit_code);
        }
    }
}

async fn serve(config: Config, storage: SqliteStorage) -> anyhow::Result<()> {
    if let Err(e) = config.langbase.require_api_key() {
        error!(error = %e, "Cannot start the server");
        return Err(e.into());
    }

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "Forking paths server starting..."
    );

    let langbase = match LangbaseClient::new(&config.langbase, config.request.clone()) {
        Ok(c) => {
            info!(base_url = %config.langbase.base_url, "Langbase client initialized");
            c
        }
        Err(e) => {
            error!(error = %e, "Failed to initialize Langbase client");
            return Err(e.into());
        }
    };

    info!("Ensuring garden pipes exist...");
    if let Err(e) = langbase.ensure_garden_pipes(&config.pipes).await {
        error!(error = %e, "Failed to ensure garden pipes exist");
        return Err(e.into());
    }

    let narrator = PipeNarrator::new(langbase, &config.pipes);
    let engine = PathEngine::new(narrator).with_timeout(config.narration.timeout());
    let state = Arc::new(AppState::new(config, storage, engine));
    let server = McpServer::new(state);

    info!("Server ready, waiting for requests on stdin...");

    if let Err(e) = server.run().await {
        error!(error = %e, "Server error");
        return Err(e.into());
    }

    info!("Server shutdown complete");
    Ok(())
}

/// Logs go to stderr; stdout carries the protocol.
fn init_logging(config: &Config) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        LogFormat::Pretty => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }
}
