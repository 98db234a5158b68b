//! HTTP front door.
//!
//! A single route, `GET /`, reads the viewpoint from the query string, e.g.
//! `/?lat=32.71&lon=-117.16&alt=5000&hdg=1.4861&pit=-0.17453&rol=0.0`.
//!
//! | Outcome            | Status | Content-Type | Body                       |
//! |--------------------|--------|--------------|----------------------------|
//! | rendered           | 200    | image/png    | PNG bytes                  |
//! | invalid parameters | 400    | text/plain   | names the failing keys     |
//! | render failure     | 500    | text/plain   | `Server Error: <reason>`   |
//!
//! Every response, including 404/405 fallbacks, carries
//! `Access-Control-Allow-Origin: *` and a fixed `Access-Control-Allow-Headers`
//! list so the service can be called from any local web page.

use std::collections::HashMap;
use std::future::Future;
use std::io;

use axum::{
    extract::{Query, State},
    http::{header, HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use log::{error, info, warn};
use tower_http::cors::{Any, CorsLayer};
use tower_http::set_header::SetResponseHeaderLayer;

use crate::bridge::{RenderBridge, RenderResult};
use crate::viewpoint;

/// Request headers browsers may send cross-origin.
pub const ALLOWED_HEADERS: &str = "Origin, X-Requested-With, Content-Type, Accept";

/// Build the service router around a render bridge.
pub fn router(bridge: RenderBridge) -> Router {
    let preflight = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers([
            header::ORIGIN,
            HeaderName::from_static("x-requested-with"),
            header::CONTENT_TYPE,
            header::ACCEPT,
        ]);

    Router::new()
        .route("/", get(snapshot))
        .fallback(not_found)
        .with_state(bridge)
        .layer(preflight)
        .layer(SetResponseHeaderLayer::overriding(
            header::ACCESS_CONTROL_ALLOW_ORIGIN,
            HeaderValue::from_static("*"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::ACCESS_CONTROL_ALLOW_HEADERS,
            HeaderValue::from_static(ALLOWED_HEADERS),
        ))
}

/// Handle `GET /`: validate, render, respond.
pub async fn snapshot(
    State(bridge): State<RenderBridge>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let request = match viewpoint::validate(&params) {
        Ok(request) => request,
        Err(err) => {
            warn!("Rejected snapshot request: {}", err);
            return plain_text(StatusCode::BAD_REQUEST, err.to_string());
        }
    };

    match bridge.render(&request).await {
        RenderResult::Success { image_bytes, mime_type } => {
            info!(
                "Rendered lat={} lon={} alt={} ({} bytes)",
                request.latitude,
                request.longitude,
                request.altitude,
                image_bytes.len()
            );
            (
                StatusCode::OK,
                [
                    (header::CONTENT_TYPE, mime_type),
                    (header::CONTENT_LENGTH, image_bytes.len().to_string()),
                ],
                image_bytes,
            )
                .into_response()
        }
        RenderResult::Failure { message } => {
            error!(
                "Render failed for lat={} lon={} alt={}: {}",
                request.latitude, request.longitude, request.altitude, message
            );
            plain_text(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Server Error: {}", message),
            )
        }
    }
}

/// Resolve once `signal` fires, for use with graceful shutdown.
///
/// A signal that fails to install never resolves, so the server keeps running.
pub async fn shutdown_on<F>(signal: F)
where
    F: Future<Output = io::Result<()>>,
{
    match signal.await {
        Ok(()) => info!("Shutting down"),
        Err(err) => {
            error!("Failed to install shutdown signal handler: {}", err);
            std::future::pending::<()>().await
        }
    }
}

async fn not_found() -> Response {
    plain_text(StatusCode::NOT_FOUND, "Not Found".to_string())
}

fn plain_text(status: StatusCode, body: String) -> Response {
    (status, [(header::CONTENT_TYPE, "text/plain")], body).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn shutdown_follows_signal() {
        let done = tokio::time::timeout(Duration::from_secs(1), shutdown_on(async { Ok::<(), io::Error>(()) })).await;
        assert!(done.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn failed_signal_install_keeps_serving() {
        let failing = async { Err::<(), _>(io::Error::new(io::ErrorKind::Other, "no signal support")) };
        let done = tokio::time::timeout(Duration::from_secs(3600), shutdown_on(failing)).await;
        assert!(done.is_err(), "server would have shut down immediately");
    }
}
