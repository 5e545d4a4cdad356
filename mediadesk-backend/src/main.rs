use std::{process::ExitCode, sync::Arc};

use clap::Parser;
use mediadesk_backend::{build_app, cli::AppConfig, AppState};
use mediadesk_shared::AddrInfo;

use tokio::sync::RwLock;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = mediadesk_backend::cli::CliOpts::parse();

    let my_filter = match cli.debug {
        true => "mediadesk=debug,mediadesk_backend=debug,tower_http=debug",
        false => "mediadesk=info,mediadesk_backend=info,tower_http=info",
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| my_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from(&cli);
    info!(
        "Storing files in {} (cache {})",
        config.blob_path.display(),
        config.cache_path.display()
    );

    let appstate = match AppState::new(&config).await {
        Ok(state) => state,
        Err(err) => {
            error!("Failed to initialize application state: {:?}", err);
            return ExitCode::FAILURE;
        }
    };
    let shared_state = Arc::new(RwLock::new(appstate));

    let addrinfo = AddrInfo::from_env();

    let app = build_app(&shared_state);

    let listener = match tokio::net::TcpListener::bind(&addrinfo.as_addr()).await {
        Ok(val) => {
            info!("Listening on {}", addrinfo.as_url());
            val
        }
        Err(err) => {
            error!("Failed to bind to {}: {:?}", addrinfo.as_url(), err);
            return ExitCode::FAILURE;
        }
    };
    if let Err(err) = axum::serve(listener, app).await {
        error!("Server error: {:?}", err);
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}
