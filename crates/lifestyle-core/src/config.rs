use std::time::Duration;

use serde::Deserialize;

use crate::session::DEFAULT_SESSION_KEY;

/// Which toggles produce a `like` analytics event.
///
/// The events endpoint has no `unlike` kind, so a toggle back to unliked
/// either logs a `like`-tagged event or nothing at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LikeEventPolicy {
    /// One `like` event per successful toggle, whichever direction.
    #[default]
    EveryToggle,
    /// Only toggles that end in `liked = true`.
    LikedOnly,
}

impl LikeEventPolicy {
    pub fn should_log(self, liked: bool) -> bool {
        match self {
            LikeEventPolicy::EveryToggle => true,
            LikeEventPolicy::LikedOnly => liked,
        }
    }
}

/// Runtime configuration for the widget client.
///
/// Every field has a default, so a partial JSON file only overrides what it
/// names.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WidgetConfig {
    /// Base URL the API endpoints (`/renders`, `/events`, `/likes`) hang off.
    pub api_base: String,
    /// Origin serving the embeddable widget page. Also the only origin the
    /// parent-side bridge accepts messages from.
    pub widget_base: String,
    /// Durable storage key holding the session id.
    pub session_key: String,
    /// Upper bound on renders kept from a fetch.
    pub max_renders: usize,
    /// Pre-populate like states for fetched renders.
    pub hydrate_likes: bool,
    pub like_event_policy: LikeEventPolicy,
    /// Abort the renders fetch after this long. `None` waits forever.
    pub load_timeout_ms: Option<u64>,
}

impl Default for WidgetConfig {
    fn default() -> Self {
        Self {
            api_base: "https://shopify-widget.vercel.app/api".to_string(),
            widget_base: "https://shopify-widget.vercel.app".to_string(),
            session_key: DEFAULT_SESSION_KEY.to_string(),
            max_renders: 2,
            hydrate_likes: true,
            like_event_policy: LikeEventPolicy::default(),
            load_timeout_ms: None,
        }
    }
}

impl WidgetConfig {
    pub fn load_timeout(&self) -> Option<Duration> {
        self.load_timeout_ms.map(Duration::from_millis)
    }
}
