//! Anonymous visitor identity.
//!
//! One id per storage lifetime: read from a fixed key, minted and written
//! back when missing. Without durable storage every call mints a fresh id.

use tracing::debug;
use uuid::Uuid;

use crate::system::Persistence;
use crate::types::SessionId;

/// Storage key used when the configuration does not override it.
pub const DEFAULT_SESSION_KEY: &str = "shopify-widget-session";

/// Produces the [`SessionId`] for the current browser.
pub struct SessionProvider {
    key: String,
    storage: Option<Box<dyn Persistence>>,
}

impl SessionProvider {
    /// A provider backed by durable storage.
    pub fn persistent(key: impl Into<String>, storage: Box<dyn Persistence>) -> Self {
        Self {
            key: key.into(),
            storage: Some(storage),
        }
    }

    /// A provider for contexts with no durable storage. Ids are not stable.
    pub fn ephemeral() -> Self {
        Self {
            key: DEFAULT_SESSION_KEY.to_string(),
            storage: None,
        }
    }

    /// Return the stored id, minting and persisting one if absent or empty.
    ///
    /// Never touches the network. A failed write still returns the minted
    /// id; the next call will mint another.
    pub fn session_id(&mut self) -> SessionId {
        let Some(storage) = self.storage.as_mut() else {
            return SessionId::new(generate());
        };

        if let Some(existing) = storage.load(&self.key).filter(|s| !s.is_empty()) {
            return SessionId::new(existing);
        }

        let fresh = generate();
        if let Err(e) = storage.save(&self.key, &fresh) {
            debug!(key = %self.key, error = %e, "session id not persisted");
        }
        SessionId::new(fresh)
    }

    /// Forget the stored id. The next [`Self::session_id`] mints a new one.
    pub fn clear(&mut self) {
        if let Some(storage) = self.storage.as_mut() {
            if let Err(e) = storage.remove(&self.key) {
                debug!(key = %self.key, error = %e, "session id not cleared");
            }
        }
    }
}

/// Random version-4 UUID in 8-4-4-4-12 lowercase hex form.
fn generate() -> String {
    Uuid::new_v4().to_string()
}

/// Whether `s` is a hyphenated version-4 UUID.
pub fn is_v4_shaped(s: &str) -> bool {
    s.len() == 36
        && Uuid::try_parse(s).is_ok_and(|u| {
            u.get_version_num() == 4 && u.get_variant() == uuid::Variant::RFC4122
        })
}
