//! `WidgetApi` over HTTP.
//!
//! Thin: builds the request, hands status and body text to
//! [`lifestyle_core::wire`] for decoding. No retries, no timeouts beyond
//! reqwest's defaults; the state machine decides what a failure means.

use std::collections::HashMap;

use async_trait::async_trait;
use lifestyle_core::api::{WidgetApi, EVENTS_ENDPOINT, LIKES_ENDPOINT, RENDERS_ENDPOINT};
use lifestyle_core::error::CoreError;
use lifestyle_core::types::{EventPayload, LikeState, Render, SessionId, TogglePayload};
use lifestyle_core::wire;
use lifestyle_core::WidgetConfig;
use reqwest::{Client, RequestBuilder};
use tracing::debug;
use url::Url;

#[derive(Clone)]
pub struct HttpApi {
    client: Client,
    base: Url,
    max_renders: usize,
}

impl HttpApi {
    pub fn new(config: &WidgetConfig) -> Result<Self, CoreError> {
        Self::with_client(Client::new(), config)
    }

    pub fn with_client(client: Client, config: &WidgetConfig) -> Result<Self, CoreError> {
        let base = Url::parse(&config.api_base)
            .map_err(|e| CoreError::InvalidConfig(format!("api_base {}: {e}", config.api_base)))?;
        if base.cannot_be_a_base() {
            return Err(CoreError::InvalidConfig(format!(
                "api_base {} cannot be a base",
                config.api_base
            )));
        }
        Ok(Self {
            client,
            base,
            max_renders: config.max_renders,
        })
    }

    /// `<api_base>/<name>`, whether or not the base ends in a slash.
    pub fn endpoint(&self, name: &str) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push(name);
        }
        url
    }

    pub fn renders_url(&self, sku: &str) -> Url {
        let mut url = self.endpoint(RENDERS_ENDPOINT);
        url.query_pairs_mut().append_pair("sku", sku);
        url
    }

    pub fn like_states_url(&self, render_ids: &[String], session: &SessionId) -> Url {
        let mut url = self.endpoint(LIKES_ENDPOINT);
        url.query_pairs_mut()
            .append_pair("sku_ids", &render_ids.join(","))
            .append_pair("session_id", session.as_str());
        url
    }

    /// Send and read the whole body. Only transport problems are errors
    /// here; status handling belongs to the decoder.
    async fn send(
        &self,
        endpoint: &str,
        request: RequestBuilder,
    ) -> Result<(u16, String), CoreError> {
        let transport = |e: reqwest::Error| CoreError::Transport {
            endpoint: endpoint.to_string(),
            message: e.to_string(),
        };
        let response = request.send().await.map_err(transport)?;
        let status = response.status().as_u16();
        let body = response.text().await.map_err(transport)?;
        debug!(endpoint, status, "response received");
        Ok((status, body))
    }
}

#[async_trait(?Send)]
impl WidgetApi for HttpApi {
    async fn fetch_renders(&self, sku: &str) -> Result<Vec<Render>, CoreError> {
        let request = self.client.get(self.renders_url(sku));
        let (status, body) = self.send(RENDERS_ENDPOINT, request).await?;
        wire::decode_renders(status, &body, self.max_renders)
    }

    async fn toggle_like(&self, payload: &TogglePayload) -> Result<LikeState, CoreError> {
        let request = self.client.post(self.endpoint(LIKES_ENDPOINT)).json(payload);
        let (status, body) = self.send(LIKES_ENDPOINT, request).await?;
        wire::decode_toggle(status, &body)
    }

    async fn like_states(
        &self,
        render_ids: &[String],
        session: &SessionId,
    ) -> Result<HashMap<String, LikeState>, CoreError> {
        let request = self.client.get(self.like_states_url(render_ids, session));
        let (status, body) = self.send(LIKES_ENDPOINT, request).await?;
        wire::decode_like_states(status, &body)
    }

    async fn log_event(&self, payload: &EventPayload) -> Result<(), CoreError> {
        let request = self.client.post(self.endpoint(EVENTS_ENDPOINT)).json(payload);
        let (status, _) = self.send(EVENTS_ENDPOINT, request).await?;
        wire::decode_event_ack(status)
    }
}
