//! Gateway health endpoint.

use axum::{extract::State, Json};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::server::GatewayState;

#[derive(Debug, Serialize)]
pub struct HealthReport {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
    pub cli: CliHealth,
    pub sessions: usize,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct CliHealth {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Handler for `GET /health`. Probes the CLI on every call; a broken engine
/// reports `degraded` in the body rather than an HTTP error, so monitors can
/// tell the gateway process from the tool behind it.
pub async fn get_health(State(state): State<GatewayState>) -> Json<HealthReport> {
    let cli = match state.engine.probe().await {
        Ok(version) => CliHealth {
            status: "healthy".to_string(),
            version: Some(version),
            error: None,
        },
        Err(e) => CliHealth {
            status: "unhealthy".to_string(),
            version: None,
            error: Some(e.to_string()),
        },
    };

    let status = if cli.status == "healthy" { "ok" } else { "degraded" };
    Json(HealthReport {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.started_at.elapsed().as_secs(),
        cli,
        sessions: state.sessions.len().await,
        timestamp: Utc::now(),
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use axum::http::Request;
    use http_body_util::BodyExt;
    use serde_json::Value;
    use tower::ServiceExt;

    use cligate_invoker::{CliInvoker, InvokerConfig};
    use cligate_session::{SessionStore, SessionStoreConfig};

    use crate::server::{build_router, GatewayState};

    fn state_with_command(command: &str) -> GatewayState {
        let invoker = CliInvoker::new(InvokerConfig {
            command: command.into(),
            args_current: vec![],
            args_general: vec![],
            timeout: Duration::from_secs(5),
        });
        GatewayState::new(
            Arc::new(invoker),
            SessionStore::new(SessionStoreConfig::default()),
        )
    }

    async fn fetch_health(state: GatewayState) -> Value {
        let response = build_router(state)
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .body(axum::body::Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), 200);
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn responsive_cli_reports_ok() {
        // `echo --version` exits zero, which is all the probe asks for.
        let json = fetch_health(state_with_command("echo")).await;
        assert_eq!(json["status"], "ok");
        assert_eq!(json["cli"]["status"], "healthy");
        assert_eq!(json["sessions"], 0);
    }

    #[tokio::test]
    async fn missing_cli_reports_degraded() {
        let json = fetch_health(state_with_command("/nonexistent/cligate-test-binary")).await;
        assert_eq!(json["status"], "degraded");
        assert_eq!(json["cli"]["status"], "unhealthy");
        assert!(json["cli"]["error"].as_str().unwrap().len() > 0);
    }
}
