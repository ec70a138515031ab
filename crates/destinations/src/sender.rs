//! HTTP dispatch shared by all destinations.

use std::time::{Duration, Instant};

use relay_core::{RelayError, RelayResult};
use serde_json::Value;
use tracing::{info, warn};

use crate::adapters::{OutboundBody, OutboundRequest};
use crate::outcome::DispatchOutcome;

/// Pooled HTTP client with a per-request timeout.
#[derive(Clone)]
pub struct HttpSender {
    client: reqwest::Client,
}

impl HttpSender {
    pub fn new(timeout: Duration) -> RelayResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RelayError::Internal(e.into()))?;
        Ok(Self { client })
    }

    /// POST the request. Never fails: transport and decode errors come back
    /// as [`DispatchOutcome::Failed`].
    pub async fn send(&self, request: OutboundRequest) -> DispatchOutcome {
        let platform = request.platform.as_str();
        let event_name = request.event_name.clone();
        let start = Instant::now();

        let result = self.post(request).await;

        metrics::histogram!("relay.dispatch.latency_ms", "platform" => platform)
            .record(start.elapsed().as_secs_f64() * 1000.0);

        match result {
            Ok((status_code, body)) => {
                info!(
                    platform,
                    event_name = %event_name,
                    status_code,
                    response = %body,
                    "Destination responded"
                );
                metrics::counter!("relay.dispatch.sent", "platform" => platform).increment(1);
                DispatchOutcome::Sent { status_code, body }
            }
            Err(e) => {
                warn!(platform, event_name = %event_name, error = %e, "Destination dispatch failed");
                metrics::counter!("relay.dispatch.failed", "platform" => platform).increment(1);
                DispatchOutcome::failed(e)
            }
        }
    }

    async fn post(&self, request: OutboundRequest) -> RelayResult<(u16, Value)> {
        let mut builder = self.client.post(&request.url);
        for (name, value) in &request.headers {
            builder = builder.header(*name, value);
        }
        builder = match request.body {
            OutboundBody::Json(ref payload) => builder.json(payload),
            OutboundBody::Form(ref fields) => builder.form(fields),
        };

        let response = builder
            .send()
            .await
            .map_err(|e| RelayError::Transport(e.to_string()))?;
        let status_code = response.status().as_u16();
        let body = response
            .json::<Value>()
            .await
            .map_err(|e| RelayError::Transport(e.to_string()))?;

        Ok((status_code, body))
    }
}
