//! SiliconFlow API client struct and builder.

use std::future::Future;
use std::time::Duration;

use rill_types::{ChatReply, ChatRequest, Endpoint, StreamHandle, TransportError};

use crate::error::{map_http_status, map_reqwest_error};
use crate::mapping::{RequestOptions, from_api_response, to_api_request};
use crate::streaming::stream_events;

/// Default model used when none is configured.
const DEFAULT_MODEL: &str = "Qwen/Qwen2.5-7B-Instruct";

/// Default SiliconFlow API base URL.
const DEFAULT_BASE_URL: &str = "https://api.siliconflow.cn/v1";

/// Default output token cap.
const DEFAULT_MAX_TOKENS: u32 = 4096;

/// Default sampling temperature.
const DEFAULT_TEMPERATURE: f64 = 0.7;

/// Default request timeout for the non-streaming path.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Client for the SiliconFlow chat-completions API.
///
/// Implements [`Endpoint`] for use anywhere an endpoint is accepted.
///
/// # Example
///
/// ```no_run
/// use rill_endpoint_siliconflow::SiliconFlow;
///
/// let endpoint = SiliconFlow::new("sk-...")
///     .model("Qwen/Qwen2.5-7B-Instruct")
///     .base_url("https://api.siliconflow.cn/v1");
/// ```
pub struct SiliconFlow {
    /// Opaque bearer credential (`SILICONFLOW_API_KEY`).
    pub(crate) api_key: String,
    /// Model identifier sent with every request.
    pub(crate) model: String,
    /// API base URL (override for testing or proxies).
    pub(crate) base_url: String,
    /// Output token cap.
    pub(crate) max_tokens: u32,
    /// Sampling temperature.
    pub(crate) temperature: f64,
    /// Timeout for the non-streaming request. Streams are not bounded
    /// here — the engine enforces an idle timeout between events.
    pub(crate) timeout: Duration,
    /// Shared HTTP client.
    pub(crate) client: reqwest::Client,
}

impl SiliconFlow {
    /// Create a new client with the given API key and the defaults the
    /// service documents: `Qwen/Qwen2.5-7B-Instruct`, 4096 max tokens,
    /// temperature 0.7, 60 second request timeout.
    #[must_use]
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: DEFAULT_MODEL.into(),
            base_url: DEFAULT_BASE_URL.into(),
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: DEFAULT_TEMPERATURE,
            timeout: DEFAULT_TIMEOUT,
            client: reqwest::Client::new(),
        }
    }

    /// Build a client from the environment.
    ///
    /// Reads `SILICONFLOW_API_KEY` (required), and optionally
    /// `TEXT_MODEL`, `MAX_TOKENS`, and `TEMPERATURE`.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Authentication`] if the API key
    /// variable is unset or empty.
    pub fn from_env() -> Result<Self, TransportError> {
        let api_key = std::env::var("SILICONFLOW_API_KEY")
            .ok()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| {
                TransportError::Authentication("SILICONFLOW_API_KEY is not set".into())
            })?;

        let mut client = Self::new(api_key);
        if let Ok(model) = std::env::var("TEXT_MODEL") {
            client = client.model(model);
        }
        if let Some(max_tokens) = std::env::var("MAX_TOKENS")
            .ok()
            .and_then(|v| v.parse().ok())
        {
            client = client.max_tokens(max_tokens);
        }
        if let Some(temperature) = std::env::var("TEMPERATURE")
            .ok()
            .and_then(|v| v.parse().ok())
        {
            client = client.temperature(temperature);
        }
        Ok(client)
    }

    /// Override the model.
    #[must_use]
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Override the API base URL.
    ///
    /// Useful for testing with a local mock server or an API proxy.
    #[must_use]
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Override the output token cap.
    #[must_use]
    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Override the sampling temperature.
    #[must_use]
    pub fn temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature;
        self
    }

    /// Override the non-streaming request timeout.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Build the chat-completions endpoint URL.
    pub(crate) fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    fn request_options(&self, stream: bool) -> RequestOptions<'_> {
        RequestOptions {
            model: &self.model,
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            stream,
        }
    }
}

impl Endpoint for SiliconFlow {
    /// Send a request and wait for the complete reply.
    ///
    /// Maps the [`ChatRequest`] to the API's JSON format, sends it with
    /// the bearer credential, and extracts the reply text.
    fn complete(
        &self,
        request: ChatRequest,
    ) -> impl Future<Output = Result<ChatReply, TransportError>> + Send {
        let url = self.completions_url();
        let body = to_api_request(&request, &self.request_options(false));
        let api_key = self.api_key.clone();
        let timeout = self.timeout;
        let http_client = self.client.clone();

        async move {
            tracing::debug!(url = %url, model = %body["model"], "sending chat request");

            let response = http_client
                .post(&url)
                .bearer_auth(&api_key)
                .header("content-type", "application/json")
                .timeout(timeout)
                .json(&body)
                .send()
                .await
                .map_err(|e| map_reqwest_error(e, timeout))?;

            let status = response.status();
            let response_text = response
                .text()
                .await
                .map_err(|e| map_reqwest_error(e, timeout))?;

            if !status.is_success() {
                return Err(map_http_status(status, &response_text));
            }

            let json: serde_json::Value = serde_json::from_str(&response_text)
                .map_err(|e| TransportError::InvalidResponse(format!("invalid JSON: {e}")))?;

            from_api_response(&json)
        }
    }

    /// Send a request and open an event stream over the reply.
    fn complete_stream(
        &self,
        request: ChatRequest,
    ) -> impl Future<Output = Result<StreamHandle, TransportError>> + Send {
        let url = self.completions_url();
        let body = to_api_request(&request, &self.request_options(true));
        let api_key = self.api_key.clone();
        let timeout = self.timeout;
        let http_client = self.client.clone();

        async move {
            tracing::debug!(url = %url, model = %body["model"], "sending streaming chat request");

            let response = http_client
                .post(&url)
                .bearer_auth(&api_key)
                .header("content-type", "application/json")
                .json(&body)
                .send()
                .await
                .map_err(|e| map_reqwest_error(e, timeout))?;

            let status = response.status();
            if !status.is_success() {
                let body_text = response
                    .text()
                    .await
                    .map_err(|e| map_reqwest_error(e, timeout))?;
                return Err(map_http_status(status, &body_text));
            }

            Ok(stream_events(response, timeout))
        }
    }
}
