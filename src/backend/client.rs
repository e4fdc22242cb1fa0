//! reqwest-backed implementation of `BackendApi`.

use super::{BackendApi, PROBE_PATH, SUGGEST_PATH, TELEMETRY_PATH};
use crate::config::MonitorConfig;
use crate::error::{AppError, ClientError};
use crate::models::{DemoKind, SuggestionRequest};
use futures::future::{BoxFuture, FutureExt};
use serde_json::Value;
use std::time::Duration;

/// Longest response excerpt carried inside an error
const ERROR_BODY_LIMIT: usize = 200;

/// HTTP client bound to one backend host
#[derive(Clone, Debug)]
pub struct BackendClient {
    http: reqwest::Client,
    base_url: String,
}

impl BackendClient {
    /// Create a client for `base_url` (scheme + host + port, no trailing slash)
    pub fn new(base_url: impl Into<String>, timeout: Option<Duration>) -> Result<Self, ClientError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build()?;

        Ok(BackendClient {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Build a client from validated settings
    pub fn from_config(config: &MonitorConfig) -> Result<Self, AppError> {
        let base = config.backend_base()?;
        let client = BackendClient::new(base, config.request_timeout())?;
        log::info!(
            "[Backend] Client ready for {} (timeout: {:?})",
            client.base_url,
            config.request_timeout()
        );
        Ok(client)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get_json(http: reqwest::Client, url: String) -> Result<Value, ClientError> {
        log::debug!("[Backend] GET {}", url);
        let response = http.get(&url).send().await?;
        read_json(response).await
    }
}

/// Decode a response body as JSON regardless of HTTP status.
///
/// The backend reports failures as `{error}` with a 500 status; those bodies are
/// still meaningful and must reach the caller.
async fn read_json(response: reqwest::Response) -> Result<Value, ClientError> {
    let status = response.status();
    let body = response.text().await?;

    match serde_json::from_str::<Value>(&body) {
        Ok(value) => Ok(value),
        Err(e) if status.is_success() => Err(ClientError::InvalidBody {
            status: status.as_u16(),
            reason: e.to_string(),
        }),
        Err(_) => Err(ClientError::Http {
            status: status.as_u16(),
            body: excerpt(&body),
        }),
    }
}

fn excerpt(body: &str) -> String {
    if body.len() <= ERROR_BODY_LIMIT {
        return body.to_string();
    }
    let mut end = ERROR_BODY_LIMIT;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &body[..end])
}

impl BackendApi for BackendClient {
    fn fetch_telemetry(&self) -> BoxFuture<'static, Result<Value, ClientError>> {
        BackendClient::get_json(self.http.clone(), self.url(TELEMETRY_PATH)).boxed()
    }

    fn suggest_mitigation(
        &self,
        request: SuggestionRequest,
    ) -> BoxFuture<'static, Result<Value, ClientError>> {
        let http = self.http.clone();
        let url = self.url(SUGGEST_PATH);
        async move {
            log::debug!("[Backend] POST {} {:?}", url, request);
            let response = http.post(&url).json(&request).send().await?;
            read_json(response).await
        }
        .boxed()
    }

    fn trigger_demo(&self, kind: DemoKind) -> BoxFuture<'static, Result<Value, ClientError>> {
        let http = self.http.clone();
        let url = self.url(kind.path());
        async move {
            log::debug!("[Backend] POST {} (demo: {})", url, kind.as_str());
            let response = http
                .post(&url)
                .json(&serde_json::json!({}))
                .send()
                .await?;

            let status = response.status();
            let body = response.text().await?;
            if !status.is_success() {
                return Err(ClientError::Http {
                    status: status.as_u16(),
                    body: excerpt(&body),
                });
            }
            // The acknowledgement format is backend-defined; keep plain text as-is
            Ok(serde_json::from_str(&body).unwrap_or(Value::String(body)))
        }
        .boxed()
    }

    fn probe(&self) -> BoxFuture<'static, Result<Value, ClientError>> {
        BackendClient::get_json(self.http.clone(), self.url(PROBE_PATH)).boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_trimmed() {
        let client = BackendClient::new("http://localhost:5000/", None).unwrap();
        assert_eq!(client.base_url(), "http://localhost:5000");
        assert_eq!(client.url(TELEMETRY_PATH), "http://localhost:5000/telemetry_local");
    }

    #[test]
    fn test_excerpt_respects_char_boundaries() {
        let body = "é".repeat(300);
        let short = excerpt(&body);
        assert!(short.ends_with("..."));
        assert!(short.len() <= ERROR_BODY_LIMIT + 3);
    }

    #[test]
    fn test_from_config_requires_backend() {
        let config = MonitorConfig::default();
        assert!(matches!(
            BackendClient::from_config(&config),
            Err(AppError::Config(_))
        ));
    }

    #[tokio::test]
    async fn test_unreachable_host_is_transport_error() {
        let client =
            BackendClient::new("http://127.0.0.1:1", Some(Duration::from_secs(2))).unwrap();
        let result = client.fetch_telemetry().await;
        assert!(matches!(
            result,
            Err(ClientError::Transport(_)) | Err(ClientError::Timeout)
        ));
    }
}
