//! Operational HTTP endpoints.
//!
//! - `/healthz` : liveness
//! - `/metrics` : Prometheus text format, first configured registry

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};

use crate::app_state::AppState;

const TEXT_FORMAT: &str = "text/plain; version=0.0.4; charset=utf-8";

pub async fn healthz() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

pub async fn metrics(State(state): State<AppState>) -> Response {
    let emitter = state.emitter();
    // sampling refreshes sysinfo synchronously
    let collected = tokio::task::spawn_blocking(move || emitter.collect()).await;

    match collected {
        Ok(Ok(report)) => match report.first() {
            Some(body) => (
                StatusCode::OK,
                [(header::CONTENT_TYPE, TEXT_FORMAT)],
                body.to_string(),
            )
                .into_response(),
            None => (StatusCode::NOT_FOUND, "no registries configured").into_response(),
        },
        Ok(Err(e)) => {
            tracing::error!(error = %e, "metrics collection failed");
            (StatusCode::INTERNAL_SERVER_ERROR, e.kind().as_str()).into_response()
        }
        Err(e) => {
            tracing::error!(error = %e, "metrics collection task failed");
            (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL").into_response()
        }
    }
}
