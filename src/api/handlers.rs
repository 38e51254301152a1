//! HTTP handlers for the trigger gateway
//!
//! Trigger and loop-control endpoints answer 200 with result-as-data;
//! only the read pass-throughs map upstream failures to error statuses.

use std::collections::BTreeMap;
use std::time::Duration;

use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};

use crate::api::AppState;
use crate::error::AppError;
use crate::models::{DeviceStatus, TriggerResult};

// ============================================================================
// Request/Response types
// ============================================================================

#[derive(Deserialize, Default)]
pub struct TriggerRequest {
    pub reason: Option<String>,
}

#[derive(Deserialize, Default)]
pub struct AutoStartRequest {
    /// Interval in seconds; defaults to the configured value
    pub interval: Option<u64>,
}

#[derive(Serialize)]
pub struct AutoControlResponse {
    pub success: bool,
    pub message: String,
}

/// Gateway + upstream status
#[derive(Serialize)]
pub struct ServiceStatus {
    pub trigger_service: String,
    pub auto_trigger_running: bool,
    pub api_connection: String,
    pub nanos: DeviceStatus,
}

// ============================================================================
// Service info
// ============================================================================

/// GET / - Service banner with endpoint listing
pub async fn home() -> impl IntoResponse {
    Json(serde_json::json!({
        "service": "nano-trigger-gateway",
        "status": "running",
        "endpoints": {
            "POST /trigger/:device": "Trigger a single device",
            "POST /trigger/both": "Trigger the primary devices",
            "GET /status": "Service and upstream status",
            "POST /auto-start": "Start the auto-trigger loop",
            "POST /auto-stop": "Stop the auto-trigger loop",
            "GET /last/:device": "Last recorded trigger response",
            "GET /logs": "List upstream logs",
            "GET /logs/:filename": "Download a log file"
        }
    }))
}

/// GET /health - Liveness check
pub async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "nano-trigger-gateway",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// GET /status - Gateway status plus upstream connectivity.
/// Upstream failures are reported as data, never as a 5xx.
pub async fn service_status(State(state): State<AppState>) -> Json<ServiceStatus> {
    let (api_connection, nanos) = match state.client.status().await {
        Ok(nanos) => ("connected", nanos),
        Err(e) => {
            tracing::debug!("Upstream status unavailable: {}", e);
            ("disconnected", DeviceStatus::new())
        }
    };

    Json(ServiceStatus {
        trigger_service: "online".to_string(),
        auto_trigger_running: state.auto_trigger.is_running().await,
        api_connection: api_connection.to_string(),
        nanos,
    })
}

// ============================================================================
// Triggering
// ============================================================================

/// POST /trigger/:device - Trigger a single device
pub async fn trigger_device(
    State(state): State<AppState>,
    Path(device): Path<String>,
    body: Option<Json<TriggerRequest>>,
) -> Json<TriggerResult> {
    let reason = body
        .and_then(|Json(req)| req.reason)
        .unwrap_or_else(|| "API call".to_string());

    let result = state
        .client
        .trigger_device(&device, &reason, state.client.default_timeout_ms())
        .await;

    Json(result)
}

/// POST /trigger/both - Trigger the configured primary devices in order,
/// with the inter-device delay between calls
pub async fn trigger_both(
    State(state): State<AppState>,
    body: Option<Json<TriggerRequest>>,
) -> Json<BTreeMap<String, TriggerResult>> {
    let reason = body
        .and_then(|Json(req)| req.reason)
        .unwrap_or_else(|| "API call - both devices".to_string());

    let mut results = BTreeMap::new();
    let mut first = true;

    for device in &state.config.trigger.devices {
        if !first {
            tokio::time::sleep(state.client.inter_device_delay()).await;
        }
        first = false;

        let result = state
            .client
            .trigger_device(device, &reason, state.client.default_timeout_ms())
            .await;
        results.insert(device.clone(), result);
    }

    Json(results)
}

// ============================================================================
// Auto-trigger loop control
// ============================================================================

/// POST /auto-start - Start the interval loop
pub async fn auto_start(
    State(state): State<AppState>,
    body: Option<Json<AutoStartRequest>>,
) -> Json<AutoControlResponse> {
    let interval_secs = body
        .and_then(|Json(req)| req.interval)
        .unwrap_or(state.config.trigger.default_interval_secs);

    match state
        .auto_trigger
        .start(Duration::from_secs(interval_secs))
        .await
    {
        Ok(()) => Json(AutoControlResponse {
            success: true,
            message: format!("Auto-trigger started with {}s interval", interval_secs),
        }),
        Err(e) => Json(AutoControlResponse {
            success: false,
            message: e.to_string(),
        }),
    }
}

/// POST /auto-stop - Stop the interval loop (idempotent)
pub async fn auto_stop(State(state): State<AppState>) -> Json<AutoControlResponse> {
    let was_running = state.auto_trigger.stop().await;

    Json(AutoControlResponse {
        success: true,
        message: if was_running {
            "Auto-trigger stopped".to_string()
        } else {
            "Auto-trigger was not running".to_string()
        },
    })
}

// ============================================================================
// Upstream pass-throughs
// ============================================================================

/// GET /last/:device - Most recent trigger response for a device
pub async fn last_response(
    State(state): State<AppState>,
    Path(device): Path<String>,
) -> Result<Json<TriggerResult>, AppError> {
    Ok(Json(state.client.last_response(&device).await?))
}

/// GET /logs - List available upstream logs
pub async fn list_logs(
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, AppError> {
    let logs = state.client.list_logs().await?;
    Ok(Json(serde_json::json!({
        "success": true,
        "total": logs.len(),
        "logs": logs,
    })))
}

/// GET /logs/:filename - Download raw log content
pub async fn download_log(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> Result<String, AppError> {
    if filename.contains('/') || filename.contains("..") {
        return Err(AppError::BadRequest("invalid log filename".to_string()));
    }

    Ok(state.client.download_log(&filename).await?)
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use tower::ServiceExt;

    use crate::client::NanoClient;
    use crate::config::Config;
    use crate::trigger::AutoTrigger;

    /// Mock upstream where nano1 is connected and nano2 is not
    async fn spawn_upstream() -> String {
        use axum::routing::{get, post};
        use axum::Router;

        let app = Router::new()
            .route(
                "/status",
                get(|| async {
                    Json(serde_json::json!({
                        "success": true,
                        "nanos": {
                            "nano1": {"connected": true},
                            "nano2": {"connected": false}
                        }
                    }))
                }),
            )
            .route(
                "/get-nano/:id",
                post(|Path(id): Path<String>| async move {
                    Json(serde_json::json!({"success": true, "data": format!("payload from {}", id)}))
                }),
            );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        format!("http://{}", addr)
    }

    fn state_for(base_url: String) -> AppState {
        let mut config = Config::default();
        config.trigger.inter_device_delay_ms = 5;
        config.upstream.base_url = base_url;

        let client = Arc::new(NanoClient::new(&config.upstream.base_url, &config.trigger));
        AppState {
            auto_trigger: Arc::new(AutoTrigger::new(client.clone())),
            client,
            config: Arc::new(config),
        }
    }

    async fn test_state() -> AppState {
        state_for(spawn_upstream().await)
    }

    async fn post_json(state: AppState, uri: &str, body: &str) -> (StatusCode, serde_json::Value) {
        let app = crate::api::routes().with_state(state);
        let request = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn trigger_endpoint_answers_200_with_result_data() {
        let state = test_state().await;

        let (status, body) = post_json(state.clone(), "/trigger/nano1", r#"{"reason": "test"}"#).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);

        // Disconnected device: still 200, failure carried as data
        let (status, body) = post_json(state, "/trigger/nano2", "").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], "nano2 not connected");
    }

    #[tokio::test]
    async fn trigger_both_reports_per_device_results() {
        let state = test_state().await;

        let (status, body) = post_json(state, "/trigger/both", "").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["nano1"]["success"], true);
        assert_eq!(body["nano2"]["success"], false);
    }

    #[tokio::test]
    async fn auto_start_twice_fails_the_second_time() {
        let state = test_state().await;

        let (_, body) = post_json(state.clone(), "/auto-start", r#"{"interval": 60}"#).await;
        assert_eq!(body["success"], true);

        let (status, body) = post_json(state.clone(), "/auto-start", r#"{"interval": 60}"#).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], false);

        let (_, body) = post_json(state, "/auto-stop", "").await;
        assert_eq!(body["success"], true);
    }

    #[tokio::test]
    async fn auto_stop_when_idle_succeeds() {
        let state = test_state().await;

        let (status, body) = post_json(state, "/auto-stop", "").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["message"], "Auto-trigger was not running");
    }

    #[tokio::test]
    async fn status_endpoint_reports_upstream_and_loop_state() {
        let state = test_state().await;

        let app = crate::api::routes().with_state(state);
        let response = app
            .oneshot(Request::builder().uri("/status").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["trigger_service"], "online");
        assert_eq!(body["api_connection"], "connected");
        assert_eq!(body["auto_trigger_running"], false);
        assert_eq!(body["nanos"]["nano1"]["connected"], true);
    }

    #[tokio::test]
    async fn pass_through_maps_refused_upstream_to_502() {
        // Bind and immediately drop a listener to get a port nothing serves
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let state = state_for(format!("http://{}", addr));

        let app = crate::api::routes().with_state(state);
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/last/nano1")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["status"], 502);
        assert!(body["error"].as_str().unwrap().starts_with("connection failed"));
    }

    #[tokio::test]
    async fn pass_through_preserves_upstream_404() {
        use axum::routing::get;
        use axum::Router;

        let app_upstream = Router::new().route(
            "/logs/:filename",
            get(|| async {
                (
                    StatusCode::NOT_FOUND,
                    Json(serde_json::json!({"success": false, "error": "log not found"})),
                )
            }),
        );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app_upstream).await.unwrap();
        });

        let state = state_for(format!("http://{}", addr));

        let app = crate::api::routes().with_state(state);
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/logs/missing.json")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn download_log_rejects_path_traversal() {
        let state = test_state().await;

        let app = crate::api::routes().with_state(state);
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/logs/..%2Fsecrets")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
