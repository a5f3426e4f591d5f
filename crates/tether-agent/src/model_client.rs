//! HTTP adapter for the external model layer.
//!
//! Each step is one `POST` of the [`StepContext`] as JSON to
//! `copilot.modelEndpoint`; the response body is a [`StepOutput`].

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use tether_runtime::{ModelClient, ModelError, StepContext, StepOutput};
use tracing::{debug, instrument};

/// Per-request timeout.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Posts step contexts to a model service.
pub struct HttpModelClient {
    client: reqwest::Client,
    endpoint: Option<String>,
}

impl HttpModelClient {
    /// Create a client. With no endpoint every step fails without retry.
    pub fn new(endpoint: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint,
        }
    }

    /// Whether an endpoint is configured.
    pub fn is_configured(&self) -> bool {
        self.endpoint.is_some()
    }
}

fn classify_status(status: StatusCode, body: &str) -> ModelError {
    let message = format!("model endpoint returned {}: {body}", status.as_u16());
    if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
        ModelError::Transient(message)
    } else {
        ModelError::Fatal(message)
    }
}

fn classify_transport(err: &reqwest::Error) -> ModelError {
    if err.is_timeout() || err.is_connect() || err.is_request() {
        ModelError::Transient(err.to_string())
    } else {
        ModelError::Fatal(err.to_string())
    }
}

#[async_trait]
impl ModelClient for HttpModelClient {
    #[instrument(skip_all, fields(session_id = %ctx.session_id, step = ctx.step))]
    async fn run_step(&self, ctx: &StepContext) -> Result<StepOutput, ModelError> {
        let Some(endpoint) = self.endpoint.as_deref() else {
            return Err(ModelError::Fatal("copilot.modelEndpoint is not configured".into()));
        };

        let response = self
            .client
            .post(endpoint)
            .timeout(REQUEST_TIMEOUT)
            .json(ctx)
            .send()
            .await
            .map_err(|e| classify_transport(&e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_status(status, &body));
        }

        let output: StepOutput = response
            .json()
            .await
            .map_err(|e| ModelError::Fatal(format!("malformed step output: {e}")))?;
        debug!(
            deltas = output.deltas.len(),
            tool_calls = output.tool_calls.len(),
            done = output.done,
            "model step returned"
        );
        Ok(output)
    }
}
