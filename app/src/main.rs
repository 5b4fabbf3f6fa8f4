use clap::{Parser, Subcommand};
use ly_config::Config;
use ly_core::telemetry;
use ly_db::Db;
use ly_external::{ContentRefresher, MusicCatalog, Providers};
use ly_obs::ObsState;
use ly_web::AppState;
use std::process;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Parser)]
#[command(name = "lyrica", version, about = "Music streaming backend")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand, PartialEq)]
enum Command {
    /// Run the API and observability servers (default)
    Serve,
    /// Fetch discover-page content from the providers
    FetchContent {
        /// Run a single pass and print the report
        #[arg(long)]
        once: bool,
    },
}

fn exit_on_error<T, E: std::fmt::Display>(result: Result<T, E>, what: &str) -> T {
    match result {
        Ok(value) => value,
        Err(e) => {
            tracing::error!("{}: {}", what, e);
            process::exit(1);
        }
    }
}

async fn open_database(config: &Config) -> Db {
    let db = exit_on_error(
        Db::connect(
            &config.database.path,
            config.database.pool_size,
            config.database.sqlite_wal,
        )
        .await,
        "Failed to initialize database",
    );
    exit_on_error(db.health_check().await, "Database health check failed");
    tracing::info!("Database initialized successfully");
    db
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Load configuration - exit with non-zero if invalid
    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            telemetry::init_tracing("development", "lyrica");
            tracing::error!("Failed to load configuration: {}", e);
            process::exit(1);
        }
    };
    telemetry::init_tracing(&config.environment, "lyrica");
    tracing::debug!(?config, "Configuration loaded successfully");

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(config).await,
        Command::FetchContent { once } => fetch_content(config, once).await,
    }
}

async fn serve(config: Config) {
    tracing::info!(
        host = %config.server.host,
        port = %config.server.port,
        obs_port = %config.server.obs_port,
        db_path = %config.database.path,
        "lyrica starting"
    );

    let db = open_database(&config).await;
    let obs_state = ObsState::new();
    let metrics = obs_state.metrics.clone();

    let providers = exit_on_error(
        Providers::from_config(&config.external),
        "Failed to build provider clients",
    );
    let catalog = MusicCatalog::new(providers.clone()).with_metrics(metrics.clone());
    let web_state = AppState::new(db.clone(), &config, catalog, metrics.clone());

    let cancel = CancellationToken::new();
    let refresher_task = if config.content.enabled {
        let refresher = ContentRefresher::new(db.clone(), providers, config.content.clone())
            .with_metrics(metrics);
        let token = cancel.clone();
        Some(tokio::spawn(async move { refresher.run(token).await }))
    } else {
        tracing::info!("Content refresher disabled");
        None
    };

    let obs_bind_addr = format!("0.0.0.0:{}", config.server.obs_port);
    let web_bind_addr = format!("{}:{}", config.server.host, config.server.port);

    obs_state.readiness.set_ready(true);

    let obs_future = ly_obs::start_server(&obs_bind_addr, obs_state.clone());
    let web_future = ly_web::start_server(&web_bind_addr, web_state);

    // Either server exiting stops the process
    let result = tokio::select! {
        obs_result = obs_future => {
            tracing::error!("Observability server exited");
            obs_result
        }
        web_result = web_future => {
            tracing::info!("Web server exited");
            web_result
        }
    };

    obs_state.readiness.set_ready(false);
    cancel.cancel();
    if let Some(task) = refresher_task {
        if let Err(e) = task.await {
            tracing::warn!("Content refresher task failed: {}", e);
        }
    }

    if let Err(e) = result {
        tracing::error!("Server error: {}", e);
        process::exit(1);
    }
}

async fn fetch_content(config: Config, once: bool) {
    let db = open_database(&config).await;
    let providers = exit_on_error(
        Providers::from_config(&config.external),
        "Failed to build provider clients",
    );
    let refresher = ContentRefresher::new(db, providers, config.content.clone());

    if once {
        let report = refresher.refresh_once().await;
        match serde_json::to_string_pretty(&report) {
            Ok(json) => println!("{}", json),
            Err(e) => tracing::warn!("Failed to render refresh report: {}", e),
        }
        return;
    }

    let cancel = CancellationToken::new();
    let token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Interrupt received, stopping refresher");
            token.cancel();
        }
    });
    refresher.run(cancel).await;
}
