//! Push-notification seam for incoming calls.
//!
//! `call:incoming` only reaches devices with an open socket; the push
//! sender covers backgrounded devices. Delivery is fire-and-forget and
//! best-effort: failures are logged, never surfaced to the caller.

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use tracing::info;

use lumen_core::config::push::PushConfig;
use lumen_core::error::AppError;
use lumen_core::result::AppResult;
use lumen_core::types::{CallId, UserId};

use crate::event::CallType;

/// Sends call push notifications to a user's registered devices.
#[async_trait]
pub trait PushSender: Send + Sync + std::fmt::Debug + 'static {
    /// Notifies the target user about an incoming call.
    async fn send_call_notification(
        &self,
        target_user_id: &UserId,
        call_id: CallId,
        call_type: CallType,
        caller_info: Option<&Value>,
    ) -> AppResult<()>;
}

/// Sender used when push is disabled; does nothing.
#[derive(Debug, Default)]
pub struct NoopPushSender;

#[async_trait]
impl PushSender for NoopPushSender {
    async fn send_call_notification(
        &self,
        _target_user_id: &UserId,
        _call_id: CallId,
        _call_type: CallType,
        _caller_info: Option<&Value>,
    ) -> AppResult<()> {
        Ok(())
    }
}

/// Request body sent to the push service.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CallPushRequest<'a> {
    target_user_id: &'a UserId,
    call_id: CallId,
    #[serde(rename = "type")]
    call_type: CallType,
    #[serde(skip_serializing_if = "Option::is_none")]
    caller_info: Option<&'a Value>,
}

/// Push sender backed by the platform's push service over HTTP.
#[derive(Debug)]
pub struct HttpPushSender {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
}

impl HttpPushSender {
    /// Creates a sender against the configured push endpoint.
    pub fn new(endpoint: &str, api_key: Option<String>, timeout: Duration) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::external(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint: endpoint.to_string(),
            api_key,
        })
    }
}

#[async_trait]
impl PushSender for HttpPushSender {
    async fn send_call_notification(
        &self,
        target_user_id: &UserId,
        call_id: CallId,
        call_type: CallType,
        caller_info: Option<&Value>,
    ) -> AppResult<()> {
        let body = CallPushRequest {
            target_user_id,
            call_id,
            call_type,
            caller_info,
        };

        let mut request = self.client.post(&self.endpoint).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        request
            .send()
            .await
            .map_err(|e| AppError::external(format!("Push request failed: {e}")))?
            .error_for_status()
            .map_err(|e| AppError::external(format!("Push service rejected request: {e}")))?;

        Ok(())
    }
}

/// Builds the configured push sender.
pub fn push_sender_from_config(
    config: &PushConfig,
) -> AppResult<std::sync::Arc<dyn PushSender>> {
    match (&config.enabled, &config.endpoint) {
        (true, Some(endpoint)) => {
            info!(endpoint = %endpoint, "Using HTTP push sender");
            Ok(std::sync::Arc::new(HttpPushSender::new(
                endpoint,
                config.api_key.clone(),
                Duration::from_secs(config.timeout_seconds),
            )?))
        }
        _ => Ok(std::sync::Arc::new(NoopPushSender)),
    }
}
