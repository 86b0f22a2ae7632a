//! Invocation endpoint handlers.

use std::sync::Arc;

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::{info, warn};

use crate::batch::BatchEvent;
use crate::processor::BatchProcessor;
use crate::Config;

/// Header carrying the shared invocation token.
pub const AUTH_HEADER: &str = "x-custom-auth";

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub processor: Arc<BatchProcessor>,
}

impl AppState {
    pub fn new(config: Config, processor: BatchProcessor) -> Self {
        Self {
            config: Arc::new(config),
            processor: Arc::new(processor),
        }
    }
}

// =============================================================================
// Health Check
// =============================================================================

/// Health check response.
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// Health check endpoint.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

// =============================================================================
// Batch Invocation
// =============================================================================

/// Error response body.
#[derive(Serialize)]
pub struct StatusResponse {
    pub status: &'static str,
}

/// Batch invocation endpoint.
///
/// This endpoint:
/// 1. Verifies the X-Custom-Auth header (if a token is configured)
/// 2. Processes every record of the batch in order
/// 3. Returns the fixed invocation response
pub async fn invoke(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(event): Json<BatchEvent>,
) -> Response {
    info!(records = event.records.len(), "invoke_received");

    let provided = headers.get(AUTH_HEADER).and_then(|v| v.to_str().ok());

    match (provided, state.config.invoke_auth_token.as_deref()) {
        (Some(provided), Some(expected)) if provided == expected => {}
        (None, Some(_)) => {
            warn!("invoke_auth_missing");
            return unauthorized();
        }
        (Some(_), Some(_)) => {
            warn!("invoke_auth_invalid");
            return unauthorized();
        }
        (_, None) => {
            warn!("invoke_auth_not_configured");
        }
    }

    let result = state.processor.process(&event).await;

    info!(
        records = result.outcomes.len(),
        sent = result.sent(),
        "invoke_completed"
    );

    (StatusCode::OK, Json(result.response())).into_response()
}

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(StatusResponse {
            status: "unauthorized",
        }),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use axum::http::HeaderValue;

    use super::*;
    use crate::batch::{InvocationResponse, RawRecord};
    use crate::config::SmtpConfig;
    use crate::mailer::{DeliveryError, Mailer};
    use crate::process::OutgoingMail;

    #[derive(Default)]
    struct CountingMailer {
        sessions: AtomicUsize,
    }

    #[async_trait]
    impl Mailer for CountingMailer {
        async fn send(&self, _mail: OutgoingMail) -> Result<(), DeliveryError> {
            self.sessions.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn config(token: Option<&str>) -> Config {
        Config {
            smtp: SmtpConfig {
                host: "smtp.example.com".to_string(),
                port: 587,
                username: "user".to_string(),
                password: "secret".to_string(),
            },
            cloudamqp_url: "amqp://localhost:5672".to_string(),
            mail_queue: "mail_dispatch".to_string(),
            worker_prefetch: 1,
            port: 8080,
            invoke_auth_token: token.map(str::to_string),
        }
    }

    fn state(token: Option<&str>, mailer: &Arc<CountingMailer>) -> AppState {
        AppState::new(
            config(token),
            BatchProcessor::new(Arc::clone(mailer) as Arc<dyn Mailer>),
        )
    }

    fn event() -> BatchEvent {
        BatchEvent::new(vec![
            RawRecord::new(r#"{"to": "a@x.com", "origen": "b@x.com"}"#),
            RawRecord::new("garbage"),
        ])
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_invoke_returns_fixed_response() {
        let mailer = Arc::new(CountingMailer::default());

        let response = invoke(State(state(None, &mailer)), HeaderMap::new(), Json(event())).await;

        assert_eq!(response.status(), StatusCode::OK);
        let body: InvocationResponse = serde_json::from_value(body_json(response).await).unwrap();
        assert_eq!(body, InvocationResponse::processed());
        assert_eq!(mailer.sessions.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_invoke_with_valid_token() {
        let mailer = Arc::new(CountingMailer::default());
        let mut headers = HeaderMap::new();
        headers.insert(AUTH_HEADER, HeaderValue::from_static("s3cret"));

        let response = invoke(State(state(Some("s3cret"), &mailer)), headers, Json(event())).await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(mailer.sessions.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_invoke_rejects_missing_token() {
        let mailer = Arc::new(CountingMailer::default());

        let response =
            invoke(State(state(Some("s3cret"), &mailer)), HeaderMap::new(), Json(event())).await;

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_json(response).await["status"], "unauthorized");
        assert_eq!(mailer.sessions.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_invoke_rejects_wrong_token() {
        let mailer = Arc::new(CountingMailer::default());
        let mut headers = HeaderMap::new();
        headers.insert(AUTH_HEADER, HeaderValue::from_static("wrong"));

        let response = invoke(State(state(Some("s3cret"), &mailer)), headers, Json(event())).await;

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(mailer.sessions.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_health() {
        let Json(response) = health().await;
        assert_eq!(response.status, "ok");
    }
}
