use std::time::Duration;

use arkiva_application::{BackupNotice, Notifier};
use arkiva_core::{AppError, AppResult};
use async_trait::async_trait;

/// Notifier delivering run notices as an HTTP POST of a JSON object.
///
/// Any 2xx response counts as delivered. Server errors, 429, and
/// transport failures are retried with linear backoff up to the
/// attempt bound; other statuses fail immediately.
pub struct WebhookNotifier {
    http_client: reqwest::Client,
    webhook_url: String,
    max_attempts: u8,
    retry_backoff_ms: u64,
}

impl WebhookNotifier {
    /// Creates a webhook notifier.
    #[must_use]
    pub fn new(
        http_client: reqwest::Client,
        webhook_url: impl Into<String>,
        max_attempts: u8,
        retry_backoff_ms: u64,
    ) -> Self {
        Self {
            http_client,
            webhook_url: webhook_url.into(),
            max_attempts: max_attempts.max(1),
            retry_backoff_ms: retry_backoff_ms.max(50),
        }
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn notify(&self, notice: BackupNotice) -> AppResult<()> {
        let payload = serde_json::json!({
            "project": notice.project,
            "date": notice.date,
            "test": notice.test,
        });

        let mut attempt = 0_u8;
        let mut last_error: Option<String> = None;

        while attempt < self.max_attempts {
            attempt = attempt.saturating_add(1);
            let response = self
                .http_client
                .post(&self.webhook_url)
                .json(&payload)
                .send()
                .await;

            match response {
                Ok(response) if response.status().is_success() => return Ok(()),
                Ok(response)
                    if response.status().is_server_error()
                        || response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS =>
                {
                    last_error = Some(format!(
                        "transient HTTP status {} from webhook",
                        response.status()
                    ));
                }
                Ok(response) => {
                    let status = response.status();
                    let body = response
                        .text()
                        .await
                        .unwrap_or_else(|_| "<response body unavailable>".to_owned());
                    return Err(AppError::Notify(format!(
                        "webhook rejected notice with status {status}: {body}"
                    )));
                }
                Err(error) => {
                    last_error = Some(format!("webhook transport error: {error}"));
                }
            }

            if attempt < self.max_attempts {
                let delay = self.retry_backoff_ms.saturating_mul(u64::from(attempt));
                tokio::time::sleep(Duration::from_millis(delay)).await;
            }
        }

        Err(AppError::Notify(last_error.unwrap_or_else(|| {
            "webhook delivery exhausted retries".to_owned()
        })))
    }
}
