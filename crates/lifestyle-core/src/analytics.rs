use tracing::{debug, warn};

use crate::api::WidgetApi;
use crate::types::{EventPayload, EventType, SessionId};

/// Fire-and-forget event emission.
///
/// Failures are logged and dropped. Nothing is retried and nothing reaches
/// the UI, so delivery is at-most-once per call.
pub struct Analytics<'a, A: ?Sized> {
    api: &'a A,
    session: &'a SessionId,
}

impl<'a, A: WidgetApi + ?Sized> Analytics<'a, A> {
    pub fn new(api: &'a A, session: &'a SessionId) -> Self {
        Self { api, session }
    }

    /// Log `event` against `target_id`. Returns whether the server acked it.
    pub async fn log(&self, target_id: &str, event: EventType) -> bool {
        let payload = EventPayload {
            sku_id: target_id.to_string(),
            event_type: event,
            session_id: self.session.clone(),
        };
        match self.api.log_event(&payload).await {
            Ok(()) => {
                debug!(target_id, %event, "event logged");
                true
            }
            Err(e) => {
                warn!(target_id, %event, error = %e, "failed to log event");
                false
            }
        }
    }
}
