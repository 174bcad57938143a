use std::fmt;

use serde::{Deserialize, Serialize};

/// Anonymous, storage-persisted visitor identity.
///
/// Opaque to everything except [`crate::session::SessionProvider`], which is
/// the only place one is minted. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    pub(crate) fn new(raw: String) -> Self {
        Self(raw)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A server-selected lifestyle image for a SKU.
///
/// Fields default to empty when the server omits them; responses are
/// untrusted input.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Render {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub image_url: String,
    #[serde(default)]
    pub alt_text: String,
}

/// Per-render like status as last confirmed by the server.
///
/// `liked` is this session's own like; `total` counts every session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LikeState {
    pub liked: bool,
    pub total: u64,
}

impl LikeState {
    pub fn new(liked: bool, total: u64) -> Self {
        Self { liked, total }
    }
}

/// Analytics event kinds accepted by the events endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventType {
    View,
    Like,
    Click,
}

impl EventType {
    pub fn as_str(self) -> &'static str {
        match self {
            EventType::View => "view",
            EventType::Like => "like",
            EventType::Click => "click",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Body of `POST /events`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EventPayload {
    pub sku_id: String,
    pub event_type: EventType,
    pub session_id: SessionId,
}

/// Body of `POST /likes`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TogglePayload {
    pub sku_id: String,
    pub session_id: SessionId,
}
