//! Axum-based HTTP surface for published outputs and the enable switch

use crate::driver::{DriverCommand, DriverSnapshot};
use crate::error::{CurtailError, Result};
use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};
use serde::Deserialize;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

mod logs;

#[derive(Clone)]
pub struct AppState {
    /// Commands forwarded to the control loop
    pub commands_tx: mpsc::UnboundedSender<DriverCommand>,
    /// Latest published driver snapshot
    pub snapshot_rx: watch::Receiver<Arc<DriverSnapshot>>,
    /// Log file served by the tail endpoint
    pub log_file: String,
}

#[derive(Debug, Deserialize)]
pub struct EnabledBody {
    pub enabled: bool,
}

async fn health() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

async fn status(State(state): State<AppState>) -> impl IntoResponse {
    let snapshot = state.snapshot_rx.borrow().clone();
    Json(snapshot.as_ref().clone())
}

/// The three published outputs of the controller
async fn outputs(State(state): State<AppState>) -> impl IntoResponse {
    let snapshot = state.snapshot_rx.borrow().clone();
    Json(serde_json::json!({
        "setpoint_watts": snapshot.setpoint_w,
        "setpoint_percent": snapshot.setpoint_percent,
        "measured_power_watts": snapshot.measured_power_w,
    }))
}

async fn get_enabled(State(state): State<AppState>) -> impl IntoResponse {
    let enabled = state.snapshot_rx.borrow().enabled;
    Json(serde_json::json!({ "enabled": enabled }))
}

async fn set_enabled(
    State(state): State<AppState>,
    Json(body): Json<EnabledBody>,
) -> impl IntoResponse {
    match state
        .commands_tx
        .send(DriverCommand::SetEnabled(body.enabled))
    {
        Ok(()) => (
            StatusCode::ACCEPTED,
            Json(serde_json::json!({"ok": true, "enabled": body.enabled})),
        ),
        Err(_) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(serde_json::json!({"ok": false, "error": "control loop is not running"})),
        ),
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/status", get(status))
        .route("/api/outputs", get(outputs))
        .route("/api/enabled", get(get_enabled).post(set_enabled))
        .route("/api/logs/tail", get(logs::logs_tail))
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Bind and serve the HTTP surface until the task is dropped
pub async fn serve(state: AppState, host: &str, port: u16) -> Result<()> {
    let router = build_router(state);

    let logger = crate::logging::get_logger("web");
    logger.info(&format!(
        "Starting web server; requested host={}, port={}",
        host, port
    ));

    let addr = match host.parse::<IpAddr>() {
        Ok(ip) => SocketAddr::new(ip, port),
        Err(_) => {
            logger.warn(&format!("Invalid host '{}'; falling back to 127.0.0.1", host));
            ([127, 0, 0, 1], port).into()
        }
    };

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| CurtailError::web(format!("Cannot bind {}: {}", addr, e)))?;
    let local_addr = listener.local_addr()?;
    logger.info(&format!(
        "Web server listening at http://{}:{} (API /api)",
        local_addr.ip(),
        local_addr.port()
    ));

    axum::serve(listener, router)
        .await
        .map_err(|e| CurtailError::web(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    fn test_state() -> (
        AppState,
        mpsc::UnboundedReceiver<DriverCommand>,
        watch::Sender<Arc<DriverSnapshot>>,
    ) {
        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let (snapshot_tx, snapshot_rx) =
            watch::channel(Arc::new(DriverSnapshot::initial(&Config::default())));
        let state = AppState {
            commands_tx,
            snapshot_rx,
            log_file: "/nonexistent/sunspec-curtail.log".to_string(),
        };
        (state, commands_rx, snapshot_tx)
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn health_ok() {
        let (state, _rx, _tx) = test_state();
        let response = build_router(state)
            .oneshot(
                Request::builder()
                    .uri("/api/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn status_reflects_latest_snapshot() {
        let (state, _rx, snapshot_tx) = test_state();
        let mut snapshot = DriverSnapshot::initial(&Config::default());
        snapshot.setpoint_w = Some(3010.0);
        snapshot.setpoint_percent = Some(60.2);
        snapshot.measured_power_w = Some(2800.0);
        snapshot_tx.send_replace(Arc::new(snapshot));

        let response = build_router(state.clone())
            .oneshot(
                Request::builder()
                    .uri("/api/status")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["setpoint_w"], 3010.0);

        let response = build_router(state)
            .oneshot(
                Request::builder()
                    .uri("/api/outputs")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let json = body_json(response).await;
        assert_eq!(json["setpoint_percent"], 60.2);
        assert_eq!(json["measured_power_watts"], 2800.0);
    }

    #[tokio::test]
    async fn enable_switch_forwards_command() {
        let (state, mut commands_rx, _tx) = test_state();
        let response = build_router(state)
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/enabled")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"enabled":false}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::ACCEPTED);
        assert!(matches!(
            commands_rx.try_recv(),
            Ok(DriverCommand::SetEnabled(false))
        ));
    }

    #[tokio::test]
    async fn enable_switch_without_loop_is_unavailable() {
        let (state, commands_rx, _tx) = test_state();
        drop(commands_rx);
        let response = build_router(state)
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/enabled")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"enabled":true}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn get_enabled_reads_snapshot() {
        let (state, _rx, _tx) = test_state();
        let response = build_router(state)
            .oneshot(
                Request::builder()
                    .uri("/api/enabled")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let json = body_json(response).await;
        assert_eq!(json["enabled"], false);
    }

    #[tokio::test]
    async fn missing_log_file_is_not_found() {
        let (state, _rx, _tx) = test_state();
        let response = build_router(state)
            .oneshot(
                Request::builder()
                    .uri("/api/logs/tail?lines=5")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
