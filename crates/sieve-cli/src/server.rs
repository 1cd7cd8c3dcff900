use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use axum::Router;
use policy_sieve::{Admission, NewRecord, Orchestrator, Record};
use serde_json::json;
use sieve_crawler::Fetcher;
use tokio::net::TcpListener;

use crate::config::ServerConfig;

pub fn router<F>(orchestrator: Arc<Orchestrator<F>>) -> Router
where
    F: Fetcher + 'static,
{
    Router::new()
        .route(
            "/monitor",
            post(monitor::<F>).fallback(method_not_allowed),
        )
        .route("/records", get(records::<F>))
        .with_state(orchestrator)
}

async fn monitor<F>(
    State(orchestrator): State<Arc<Orchestrator<F>>>,
    payload: Result<Json<NewRecord>, JsonRejection>,
) -> Response
where
    F: Fetcher + 'static,
{
    let Json(record) = match payload {
        Ok(payload) => payload,
        Err(e) => {
            log::warn!("Rejecting malformed request: {e}");
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({"error": "Bad request"})),
            )
                .into_response();
        }
    };

    let has_links = !record.policy_links.is_empty();
    match orchestrator.store().admit(record) {
        Admission::Duplicate => {
            log::info!("Status: Duplicate policies ignored");
            Json(json!({"status": "duplicate policies ignored"})).into_response()
        }
        Admission::Accepted(id) => {
            log::info!("Admitted record {id}");
            if has_links {
                orchestrator.run_pass().await;
            }
            log::debug!("Store: {:?}", orchestrator.store().stats());
            Json(json!({"status": "received"})).into_response()
        }
    }
}

async fn records<F>(State(orchestrator): State<Arc<Orchestrator<F>>>) -> Json<Vec<Record>>
where
    F: Fetcher + 'static,
{
    Json(orchestrator.store().records())
}

async fn method_not_allowed() -> impl IntoResponse {
    (
        StatusCode::METHOD_NOT_ALLOWED,
        Json(json!({"error": "Method not allowed"})),
    )
}

/// Binds the first available port of `config`.
pub async fn bind(config: &ServerConfig) -> anyhow::Result<TcpListener> {
    for port in &config.ports {
        match TcpListener::bind((config.host.as_str(), *port)).await {
            Ok(listener) => return Ok(listener),
            Err(e) => log::warn!("Port {port} busy or failed: {e}"),
        }
    }
    anyhow::bail!(
        "Couldn't bind any of ports {:?} on {}",
        config.ports,
        config.host
    )
}

pub async fn serve<F>(orchestrator: Arc<Orchestrator<F>>, config: &ServerConfig) -> anyhow::Result<()>
where
    F: Fetcher + 'static,
{
    let listener = bind(config).await?;
    log::info!("Server listening on {}", listener.local_addr()?);

    axum::serve(listener, router(orchestrator))
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
            log::info!("Interrupted, shutting down");
        })
        .await?;

    Ok(())
}
