//! Command submission client
//!
//! Fire-and-forget POSTs to the backend (`/simulate_walker`,
//! `/simulate_donation`) plus the `/health` probe. Failures are recovered
//! locally by the caller (spawn the entity anyway), so nothing here is fatal;
//! a request is retried up to a fixed ceiling with linearly growing delay and
//! then surfaced with the server's error text.
//!
//! The retry schedule and the wire types are target-independent and tested;
//! the fetch driver itself only exists on wasm.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CommandError {
    #[error("request timeout")]
    Timeout,
    /// Non-2xx response, carrying the server's `message`/`error` text.
    #[error("{0}")]
    Rejected(String),
    #[error("network failure: {0}")]
    Network(String),
    #[error("bad response body: {0}")]
    BadResponse(#[from] serde_json::Error),
}

/// Body for both simulate endpoints.
#[derive(Debug, Clone, Serialize)]
pub struct CommandRequest {
    #[serde(rename = "type")]
    pub kind: String,
    pub user: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl CommandRequest {
    pub fn walker(user: impl Into<String>) -> Self {
        Self {
            kind: "walker".to_string(),
            user: user.into(),
            amount: None,
            message: None,
        }
    }

    pub fn donation(user: impl Into<String>, amount: f64, message: Option<String>) -> Self {
        Self {
            kind: "donation".to_string(),
            user: user.into(),
            amount: Some(amount),
            message,
        }
    }

    pub fn endpoint(&self) -> &'static str {
        if self.kind == "walker" {
            "/simulate_walker"
        } else {
            "/simulate_donation"
        }
    }
}

/// Success shape: `{status: "ok", event?: {...}}`.
#[derive(Debug, Clone, Deserialize)]
pub struct CommandResponse {
    pub status: String,
    #[serde(default)]
    pub event: Option<serde_json::Value>,
}

impl CommandResponse {
    pub fn is_ok(&self) -> bool {
        self.status == "ok"
    }

    /// A 2xx body still only counts as success when the server says `"ok"`.
    pub fn accepted(self) -> Result<Self, CommandError> {
        if self.is_ok() {
            Ok(self)
        } else {
            Err(CommandError::Rejected(format!(
                "server status {:?}",
                self.status
            )))
        }
    }
}

/// Error shape on non-2xx: `{message|error}`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl ErrorBody {
    /// The text to surface to the caller, falling back to the HTTP status.
    pub fn text(&self, http_status: u16) -> String {
        self.message
            .clone()
            .or_else(|| self.error.clone())
            .unwrap_or_else(|| format!("HTTP {http_status}"))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}

impl HealthResponse {
    pub fn is_healthy(&self) -> bool {
        self.status == "healthy"
    }
}

/// Bounded retries with linearly increasing delay: after attempt `n`
/// (1-based) fails, wait `base * n` before attempt `n + 1`.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay_ms: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 1000.0,
        }
    }
}

impl RetryPolicy {
    /// Delay before the attempt after `failed_attempt`, or None when the
    /// ceiling is reached and the error must be surfaced.
    pub fn delay_after(&self, failed_attempt: u32) -> Option<f64> {
        if failed_attempt < self.max_attempts {
            Some(self.base_delay_ms * failed_attempt as f64)
        } else {
            None
        }
    }
}

#[cfg(target_arch = "wasm32")]
pub use fetch::ApiClient;

#[cfg(target_arch = "wasm32")]
mod fetch {
    use super::*;
    use wasm_bindgen::prelude::*;
    use wasm_bindgen_futures::JsFuture;
    use web_sys::{AbortController, Request, RequestInit, RequestMode, Response};

    /// HTTP client for the command endpoints.
    pub struct ApiClient {
        base_url: String,
        timeout_ms: u32,
        retry: RetryPolicy,
    }

    impl ApiClient {
        pub fn new(base_url: impl Into<String>, timeout_ms: u32, retry: RetryPolicy) -> Self {
            Self {
                base_url: base_url.into(),
                timeout_ms,
                retry,
            }
        }

        /// POST a command, retrying per policy. Success requires status "ok".
        pub async fn submit(&self, cmd: &CommandRequest) -> Result<CommandResponse, CommandError> {
            let body = serde_json::to_string(cmd)?;
            let url = format!("{}{}", self.base_url, cmd.endpoint());
            let mut attempt = 1;
            loop {
                match self.post_once(&url, &body).await {
                    Ok(resp) => return Ok(resp),
                    Err(err) => match self.retry.delay_after(attempt) {
                        Some(delay) => {
                            log::warn!(
                                "command {} failed (attempt {attempt}): {err}, retrying in {delay}ms",
                                cmd.endpoint()
                            );
                            sleep_ms(delay).await;
                            attempt += 1;
                        }
                        None => return Err(err),
                    },
                }
            }
        }

        /// GET /health; true when the backend reports itself healthy.
        pub async fn health(&self) -> bool {
            let url = format!("{}/health", self.base_url);
            match self.fetch_json("GET", &url, None).await {
                Ok(value) => serde_json::from_value::<HealthResponse>(value)
                    .map(|h| h.is_healthy())
                    .unwrap_or(false),
                Err(err) => {
                    log::warn!("health probe failed: {err}");
                    false
                }
            }
        }

        async fn post_once(&self, url: &str, body: &str) -> Result<CommandResponse, CommandError> {
            let value = self.fetch_json("POST", url, Some(body)).await?;
            serde_json::from_value::<CommandResponse>(value)?.accepted()
        }

        async fn fetch_json(
            &self,
            method: &str,
            url: &str,
            body: Option<&str>,
        ) -> Result<serde_json::Value, CommandError> {
            let window = web_sys::window().ok_or_else(|| net_err("no window"))?;

            let controller = AbortController::new().map_err(|e| js_err(&e))?;
            let init = RequestInit::new();
            init.set_method(method);
            init.set_mode(RequestMode::Cors);
            init.set_signal(Some(&controller.signal()));
            if let Some(body) = body {
                init.set_body(&JsValue::from_str(body));
            }

            let request = Request::new_with_str_and_init(url, &init).map_err(|e| js_err(&e))?;
            request
                .headers()
                .set("Content-Type", "application/json")
                .map_err(|e| js_err(&e))?;

            // Abort the fetch when the timeout fires
            let abort = Closure::once_into_js(move || controller.abort());
            let timer = window
                .set_timeout_with_callback_and_timeout_and_arguments_0(
                    abort.unchecked_ref(),
                    self.timeout_ms as i32,
                )
                .map_err(|e| js_err(&e))?;

            let fetched = JsFuture::from(window.fetch_with_request(&request)).await;
            window.clear_timeout_with_handle(timer);

            let resp: Response = match fetched {
                Ok(v) => v.dyn_into().map_err(|_| net_err("not a Response"))?,
                // An aborted fetch rejects with an AbortError DOMException
                Err(e) => {
                    let text = format!("{e:?}");
                    return Err(if text.contains("AbortError") {
                        CommandError::Timeout
                    } else {
                        net_err(&text)
                    });
                }
            };

            let text = JsFuture::from(resp.text().map_err(|e| js_err(&e))?)
                .await
                .map_err(|e| js_err(&e))?
                .as_string()
                .unwrap_or_default();
            let value: serde_json::Value =
                serde_json::from_str(&text).unwrap_or(serde_json::Value::Null);

            if !resp.ok() {
                let err_body: ErrorBody =
                    serde_json::from_value(value).unwrap_or_default();
                return Err(CommandError::Rejected(err_body.text(resp.status())));
            }
            Ok(value)
        }
    }

    fn net_err(text: &str) -> CommandError {
        CommandError::Network(text.to_string())
    }

    fn js_err(value: &JsValue) -> CommandError {
        CommandError::Network(format!("{value:?}"))
    }

    async fn sleep_ms(ms: f64) {
        let promise = js_sys::Promise::new(&mut |resolve, _| {
            if let Some(window) = web_sys::window() {
                let _ = window
                    .set_timeout_with_callback_and_timeout_and_arguments_0(&resolve, ms as i32);
            }
        });
        let _ = JsFuture::from(promise).await;
    }
}
