use axum::{extract::State, routing::get, Router};
use std::sync::Arc;

use crate::config::ServerConfig;
use crate::engine::Engine;

const ACK: &str = "hai!";

/// Routes that trigger each cycle in the background
///
/// Cycle routes answer as soon as the cycle is spawned; its outcome is only
/// visible in the logs.
pub fn router(engine: Arc<Engine>) -> Router {
    Router::new()
        .route("/", get(liveness))
        .route(
            "/automate-screening",
            get(automate_screening).post(automate_screening),
        )
        .route(
            "/check-order-status",
            get(check_order_status).post(check_order_status),
        )
        .route("/check-stop-loss", get(check_stop_loss).post(check_stop_loss))
        .with_state(engine)
}

async fn liveness() -> &'static str {
    "Hello, World!"
}

async fn automate_screening(State(engine): State<Arc<Engine>>) -> &'static str {
    tracing::info!("Screening cycle triggered");
    tokio::spawn(async move {
        engine.run_screening().await;
    });
    ACK
}

async fn check_order_status(State(engine): State<Arc<Engine>>) -> &'static str {
    tracing::info!("Order status refresh triggered");
    tokio::spawn(async move {
        engine.run_status_refresh().await;
    });
    ACK
}

async fn check_stop_loss(State(engine): State<Arc<Engine>>) -> &'static str {
    tracing::info!("Stop-loss sweep triggered");
    tokio::spawn(async move {
        engine.run_stop_loss().await;
    });
    ACK
}

pub async fn serve(engine: Arc<Engine>, config: &ServerConfig) -> anyhow::Result<()> {
    let address = config.address();
    let listener = tokio::net::TcpListener::bind(&address).await?;
    tracing::info!("Listening on {}", address);
    axum::serve(listener, router(engine)).await?;
    Ok(())
}
