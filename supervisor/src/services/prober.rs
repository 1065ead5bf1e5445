//! HTTP health probing for the companion service

use std::time::Duration;

use async_trait::async_trait;

use crate::traits::{HealthProber, ProbeOutcome};

/// Health prober backed by a shared reqwest client
#[derive(Clone)]
pub struct RealHealthProber {
    client: reqwest::Client,
}

impl RealHealthProber {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }
}

impl Default for RealHealthProber {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HealthProber for RealHealthProber {
    async fn probe_once(&self, url: &str, timeout: Duration) -> ProbeOutcome {
        let response = match self.client.get(url).timeout(timeout).send().await {
            Ok(response) => response,
            Err(e) => return ProbeOutcome::down(format!("request failed: {e}")),
        };

        let status = response.status();
        if !status.is_success() {
            return ProbeOutcome::down(format!("health endpoint returned {status}"));
        }

        // A non-JSON body is still a healthy answer; the payload is optional
        let payload = response.json::<serde_json::Value>().await.ok();
        ProbeOutcome::Up { payload }
    }

    async fn poll_until_ready(&self, url: &str, interval: Duration, ceiling: Duration) -> bool {
        let attempts = async {
            loop {
                if self.probe_once(url, interval).await.is_up() {
                    return;
                }
                tokio::time::sleep(interval).await;
            }
        };

        // The ceiling is enforced outside the loop so it holds even when
        // individual attempts resolve instantly.
        tokio::time::timeout(ceiling, attempts).await.is_ok()
    }
}
