//! HTTP trigger for the evaluator, for schedulers that can only make requests.

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use serde_json::{json, Value};
use tokio::sync::Mutex;
use tracing::{error, info};

use crate::airtable::{SignalStore, TokenDirectory};
use crate::evaluator::ClosedSignalEvaluator;
use crate::prices::PriceHistory;

/// One evaluator per process; the mutex keeps overlapping requests from
/// running two batches at once.
pub struct AppState<S, P> {
    pub evaluator: Mutex<ClosedSignalEvaluator<S, P>>,
}

pub fn routes<S, P>(state: Arc<AppState<S, P>>) -> Router
where
    S: SignalStore + TokenDirectory + 'static,
    P: PriceHistory + 'static,
{
    Router::new()
        .route("/api/calculate-closed-signals", get(calculate_closed_signals::<S, P>))
        .route("/health", get(health))
        .with_state(state)
}

/// GET /api/calculate-closed-signals: run one batch.
pub async fn calculate_closed_signals<S, P>(
    State(state): State<Arc<AppState<S, P>>>,
) -> (StatusCode, Json<Value>)
where
    S: SignalStore + TokenDirectory + 'static,
    P: PriceHistory + 'static,
{
    let mut evaluator = state.evaluator.lock().await;
    match evaluator.run().await {
        Ok(report) => {
            info!(closed = report.closed, "triggered batch finished");
            (
                StatusCode::OK,
                Json(json!({ "success": true, "report": report })),
            )
        }
        Err(e) => {
            error!(error = %e, "triggered batch failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "success": false, "error": e.to_string() })),
            )
        }
    }
}

/// GET /health
pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

pub async fn serve<S, P>(evaluator: ClosedSignalEvaluator<S, P>, port: u16) -> anyhow::Result<()>
where
    S: SignalStore + TokenDirectory + 'static,
    P: PriceHistory + 'static,
{
    let state = Arc::new(AppState {
        evaluator: Mutex::new(evaluator),
    });
    let app = routes(state);

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
    info!(port, "trigger server starting");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
