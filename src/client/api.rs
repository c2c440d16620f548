//! Management API client.
//!
//! Three remote operations against an IXP-Manager-compatible controller,
//! all carrying the shared-secret API-key header. Lock acquisition and
//! config fetch are fatal on any error; the completion report retries
//! forever because by that point the daemon has already been reloaded
//! and the only remaining obligation is releasing the remote lock.

use std::path::Path;
use std::time::Duration;

use reqwest::Client;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::{BirdsyncError, Result};

/// Header carrying the shared-secret API key.
const API_KEY_HEADER: &str = "X-IXP-Manager-API-Key";

/// Default timeout for a single HTTP request.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Fixed delay between completion-report retries.
const REPORT_RETRY_DELAY: Duration = Duration::from_secs(60);

/// Client for the management API.
#[derive(Debug, Clone)]
pub struct ManagerClient {
    client: Client,
    base_url: String,
    api_key: String,
    report_retry_delay: Duration,
}

impl ManagerClient {
    /// Creates a client from the run configuration.
    pub fn new(config: &Config) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()
            .map_err(|e| {
                BirdsyncError::environment_with_source("failed to create HTTP client", e)
            })?;

        Ok(Self {
            client,
            base_url: config.api_url.clone(),
            api_key: config.api_key.clone(),
            report_retry_delay: REPORT_RETRY_DELAY,
        })
    }

    /// Asks the controller for the update lock on this router.
    ///
    /// Any HTTP or transport error means the router is not available for
    /// update right now; the run aborts immediately without retrying.
    pub async fn acquire_update_lock(&self, handle: &str) -> Result<()> {
        let url = format!("{}/api/v4/router/get-update-lock/{}", self.base_url, handle);
        debug!(url = %url, "Requesting remote update lock");

        self.client
            .post(&url)
            .header(API_KEY_HEADER, &self.api_key)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| BirdsyncError::remote_lock_unavailable(handle, e))?;

        info!(handle = %handle, "Remote update lock acquired");
        Ok(())
    }

    /// Fetches the generated configuration and writes it verbatim to the
    /// staging path.
    pub async fn fetch_config(&self, handle: &str, staging_path: &Path) -> Result<()> {
        let url = format!("{}/api/v4/router/gen-config/{}", self.base_url, handle);
        debug!(url = %url, staging = %staging_path.display(), "Fetching configuration");

        let response = self
            .client
            .get(&url)
            .header(API_KEY_HEADER, &self.api_key)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| BirdsyncError::fetch_with_source(&url, e))?;

        let body = response
            .bytes()
            .await
            .map_err(|e| BirdsyncError::fetch_with_source(&url, e))?;

        std::fs::write(staging_path, &body)?;

        info!(
            handle = %handle,
            bytes = body.len(),
            staging = %staging_path.display(),
            "Configuration staged"
        );
        Ok(())
    }

    /// Reports the completed update to the controller.
    ///
    /// Retried forever on a fixed backoff: the router is already correct,
    /// but the controller's lock must eventually be released, so this call
    /// never gives up on its own. Only an external kill ends the loop.
    pub async fn report_done(&self, handle: &str) {
        let url = format!("{}/api/v4/router/updated/{}", self.base_url, handle);

        loop {
            debug!(url = %url, "Reporting update completion");

            let result = self
                .client
                .post(&url)
                .header(API_KEY_HEADER, &self.api_key)
                .send()
                .await
                .and_then(|r| r.error_for_status());

            match result {
                Ok(_) => {
                    info!(handle = %handle, "Update reported to controller");
                    return;
                }
                Err(e) => {
                    warn!(
                        handle = %handle,
                        error = %e,
                        retry_in_secs = self.report_retry_delay.as_secs(),
                        "Could not inform controller of update, retrying"
                    );
                    tokio::time::sleep(self.report_retry_delay).await;
                }
            }
        }
    }
}
