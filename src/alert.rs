//! Best-effort fatal-error alerting.
//!
//! When an alert webhook is configured, a fatal run pushes a small JSON
//! payload there before exiting. Delivery is strictly best-effort: an
//! unreachable webhook is logged and otherwise ignored, and it never
//! changes the exit code.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::BirdsyncError;

/// Timeout for the webhook request; an alert must not stall a dying run.
const ALERT_TIMEOUT_SECS: u64 = 10;

/// Alert payload pushed to the webhook.
#[derive(Debug, Serialize)]
pub struct AlertPayload {
    /// Host the agent runs on.
    pub host: String,
    /// Router handle of the failed run.
    pub handle: String,
    /// Rendered error message.
    pub error: String,
    /// Process exit code of the failed run.
    pub code: i32,
    /// When the failure occurred.
    pub timestamp: DateTime<Utc>,
}

impl AlertPayload {
    /// Builds the payload for a fatal error.
    pub fn new(handle: &str, error: &BirdsyncError) -> Self {
        let host = hostname::get()
            .ok()
            .and_then(|h| h.into_string().ok())
            .unwrap_or_else(|| "unknown".to_string());

        Self {
            host,
            handle: handle.to_string(),
            error: error.to_string(),
            code: error.exit_code(),
            timestamp: Utc::now(),
        }
    }
}

/// Pushes a fatal-error alert to the webhook, if one is configured.
pub async fn notify_fatal(alert_url: Option<&str>, handle: &str, error: &BirdsyncError) {
    let Some(url) = alert_url else {
        return;
    };

    let payload = AlertPayload::new(handle, error);
    debug!(url = %url, code = payload.code, "Sending fatal-error alert");

    let client = match reqwest::Client::builder()
        .timeout(Duration::from_secs(ALERT_TIMEOUT_SECS))
        .build()
    {
        Ok(client) => client,
        Err(e) => {
            warn!(error = %e, "Could not build alert HTTP client");
            return;
        }
    };

    match client.post(url).json(&payload).send().await {
        Ok(response) if response.status().is_success() => {
            debug!("Alert delivered");
        }
        Ok(response) => {
            warn!(status = %response.status(), "Alert webhook returned an error status");
        }
        Err(e) => {
            warn!(error = %e, "Could not deliver alert");
        }
    }
}
