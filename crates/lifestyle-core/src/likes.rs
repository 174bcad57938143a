use std::collections::HashMap;

use tracing::warn;

use crate::api::WidgetApi;
use crate::error::CoreError;
use crate::types::{LikeState, SessionId, TogglePayload};

/// Request/response like toggling for one session.
///
/// Strict XOR on the server: a call flips the (render, session) like and
/// returns the recount. There is no local increment, no optimistic flip and
/// no retry; a failure after the request left leaves the caller unable to
/// know the server's state, so it is reported as-is.
pub struct LikeToggle<'a, A: ?Sized> {
    api: &'a A,
    session: &'a SessionId,
}

impl<'a, A: WidgetApi + ?Sized> LikeToggle<'a, A> {
    pub fn new(api: &'a A, session: &'a SessionId) -> Self {
        Self { api, session }
    }

    pub async fn toggle(&self, render_id: &str) -> Result<LikeState, CoreError> {
        let payload = TogglePayload {
            sku_id: render_id.to_string(),
            session_id: self.session.clone(),
        };
        self.api.toggle_like(&payload).await.inspect_err(|e| {
            warn!(render_id, error = %e, "failed to toggle like");
        })
    }
}

/// Confirmed like states for the renders of one widget mount.
#[derive(Debug, Default, Clone)]
pub struct LikeBook {
    states: HashMap<String, LikeState>,
}

impl LikeBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// State shown for a render; unknown renders show as unliked with zero.
    pub fn get(&self, render_id: &str) -> LikeState {
        self.states.get(render_id).copied().unwrap_or_default()
    }

    pub fn contains(&self, render_id: &str) -> bool {
        self.states.contains_key(render_id)
    }

    /// Replace a render's state wholesale with a toggle response.
    pub fn confirm(&mut self, render_id: &str, state: LikeState) {
        self.states.insert(render_id.to_string(), state);
    }

    /// Fill in states from a batched lookup for renders in `allowed`.
    ///
    /// Entries already confirmed by a toggle are newer than the lookup and
    /// are kept. Returns how many entries were added.
    pub fn hydrate(&mut self, lookup: HashMap<String, LikeState>, allowed: &[String]) -> usize {
        let mut added = 0;
        for (id, state) in lookup {
            if !allowed.contains(&id) || self.states.contains_key(&id) {
                continue;
            }
            self.states.insert(id, state);
            added += 1;
        }
        added
    }
}
