use std::collections::HashMap;
use std::rc::Rc;

use async_trait::async_trait;

use crate::error::CoreError;
use crate::types::{EventPayload, LikeState, Render, SessionId, TogglePayload};

/// Endpoint names, relative to the configured API base.
pub const RENDERS_ENDPOINT: &str = "renders";
pub const EVENTS_ENDPOINT: &str = "events";
pub const LIKES_ENDPOINT: &str = "likes";

/// The server side of the widget, seen from the client.
///
/// The runtime is single-threaded and cooperative, so futures need not be
/// `Send`. Every method is one network round trip; none of them retry.
#[async_trait(?Send)]
pub trait WidgetApi {
    /// `GET /renders?sku=<code>`. At most a handful of renders, possibly none.
    async fn fetch_renders(&self, sku: &str) -> Result<Vec<Render>, CoreError>;

    /// `POST /likes`. Flips the like for (render, session) and returns the
    /// server's recount. Not idempotent: call once per genuine click.
    async fn toggle_like(&self, payload: &TogglePayload) -> Result<LikeState, CoreError>;

    /// `GET /likes?sku_ids=<csv>&session_id=<id>`.
    async fn like_states(
        &self,
        render_ids: &[String],
        session: &SessionId,
    ) -> Result<HashMap<String, LikeState>, CoreError>;

    /// `POST /events`.
    async fn log_event(&self, payload: &EventPayload) -> Result<(), CoreError>;
}

#[async_trait(?Send)]
impl<T: WidgetApi + ?Sized> WidgetApi for Rc<T> {
    async fn fetch_renders(&self, sku: &str) -> Result<Vec<Render>, CoreError> {
        (**self).fetch_renders(sku).await
    }

    async fn toggle_like(&self, payload: &TogglePayload) -> Result<LikeState, CoreError> {
        (**self).toggle_like(payload).await
    }

    async fn like_states(
        &self,
        render_ids: &[String],
        session: &SessionId,
    ) -> Result<HashMap<String, LikeState>, CoreError> {
        (**self).like_states(render_ids, session).await
    }

    async fn log_event(&self, payload: &EventPayload) -> Result<(), CoreError> {
        (**self).log_event(payload).await
    }
}
