use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use tracing::{error, info, warn};

use crate::core::{Config, PackageName};
use crate::internal::asyncx::block_on;
use crate::ops;
use crate::resolver::LATEST_TAG;
use crate::walker::Walker;

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub name: Option<String>,
    /// Version range to resolve, `latest` if omitted.
    pub version: Option<String>,
}

/// HTTP interface of the walker.
///
/// `GET /?name=<package>&version=<range>` responds with the resolved graph as JSON.
/// A missing or invalid name is rejected with `400 Bad Request`, and a walk aborted by a hard
/// failure results in `500 Internal Server Error`.
pub fn router(walker: Arc<Walker>) -> Router {
    Router::new()
        .route("/", get(list_handler))
        .with_state(walker)
}

/// Serve [`router`] on `bind` until interrupted with Ctrl+C.
pub fn serve(config: &Config, bind: SocketAddr) -> Result<()> {
    block_on(config, serve_async(config, bind))
}

pub async fn serve_async(config: &Config, bind: SocketAddr) -> Result<()> {
    let walker = Arc::new(ops::walker(config)?);
    let server = axum::Server::try_bind(&bind)
        .with_context(|| format!("failed to bind to {bind}"))?
        .serve(router(walker).into_make_service());
    info!("listening on http://{}", server.local_addr());

    server
        .with_graceful_shutdown(async {
            if let Err(err) = tokio::signal::ctrl_c().await {
                error!("failed to listen for Ctrl+C: {err}");
                std::future::pending::<()>().await;
            }
            info!("shutting down");
        })
        .await
        .context("server error")
}

async fn list_handler(
    State(walker): State<Arc<Walker>>,
    Query(query): Query<ListQuery>,
) -> Response {
    let Some(name) = query.name.as_deref().map(str::trim).filter(|n| !n.is_empty()) else {
        return (StatusCode::BAD_REQUEST, "missing `name` query parameter").into_response();
    };
    let package = match PackageName::try_new(name) {
        Ok(package) => package,
        Err(err) => {
            warn!("rejecting request: {err}");
            return (StatusCode::BAD_REQUEST, err.to_string()).into_response();
        }
    };
    let range = query
        .version
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .unwrap_or(LATEST_TAG);

    match walker.list(package, range).await {
        Ok(graph) => Json(graph).into_response(),
        Err(err) => {
            let err = anyhow::Error::new(err);
            error!("{err:#}");
            (StatusCode::INTERNAL_SERVER_ERROR, format!("{err:#}")).into_response()
        }
    }
}
