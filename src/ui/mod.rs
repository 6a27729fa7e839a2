use std::path::Path;

use axum::Router;
use tracing::{error, info, warn};

use crate::shared::logging;
use crate::ui::routes::create_router;
use crate::ui::state::UiState;

pub mod error;
pub mod handlers;
pub mod logging_middleware;
pub mod query;
pub mod routes;
pub mod state;

pub async fn run_server() -> anyhow::Result<()> {
    let log_dir = std::env::var("AZA_UI_LOG_DIR").unwrap_or_else(|_| "logs".to_string());
    let _log_guard = match logging::init_service_logging(Path::new(&log_dir), "aza_ui") {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {e}");
            None
        }
    };

    let host = std::env::var("AZA_UI_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
    let port = std::env::var("PORT").unwrap_or_else(|_| "4173".to_string());

    info!("Starting aza UI server...");
    let state = UiState::from_env()?;
    match &state.default_project {
        Some(project) => info!("Default project endpoint: {}", project),
        None => warn!("AZA_PROJECT is not set; requests must supply ?project=<endpoint>"),
    }
    if !state.dist_dir.join("index.html").exists() {
        warn!(
            "No index.html under {}; only the /api routes will be useful",
            state.dist_dir.display()
        );
    }

    let app: Router = create_router(state);

    let bind_addr = format!("{host}:{port}");
    info!("Binding aza UI to {}", bind_addr);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("aza ui listening on http://{}:{}", host, port);

    ctrlc::set_handler(move || {
        info!("Shutting down aza UI...");
        std::process::exit(0);
    })?;

    if let Err(e) = axum::serve(listener, app).await {
        error!("UI server error: {}", e);
        return Err(anyhow::anyhow!(e));
    }

    Ok(())
}
