use thiserror::Error;

/// Errors produced by the widget runtime and its collaborators.
///
/// None of these ever escape to the host page: the state machine folds
/// critical-path failures into [`crate::WidgetLoadState::Errored`] and the
/// best-effort paths (analytics, like hydration) only log them.
#[derive(Debug, Error)]
pub enum CoreError {
    /// The request never produced a response (DNS, connection reset, ...).
    #[error("transport error on {endpoint}: {message}")]
    Transport { endpoint: String, message: String },

    /// The server answered with a non-2xx status.
    #[error("{endpoint} returned status {status}")]
    Status { endpoint: String, status: u16 },

    /// The server answered 2xx but the payload had a shape we cannot use.
    #[error("unexpected response from {endpoint}: {message}")]
    UnexpectedShape { endpoint: String, message: String },

    /// The configured load timeout elapsed before a response arrived.
    #[error("{endpoint} timed out after {millis}ms")]
    Timeout { endpoint: String, millis: u64 },

    /// An interaction arrived while the widget was not displaying renders.
    #[error("widget is not ready")]
    NotReady,

    /// A like was requested for a render this widget never displayed.
    #[error("unknown render: {0}")]
    UnknownRender(String),

    /// Durable storage could not be read or written.
    #[error("storage error: {0}")]
    Storage(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl CoreError {
    /// Short human-readable reason carried by `Errored(reason)`.
    pub fn reason(&self) -> String {
        match self {
            CoreError::Timeout { .. } => "timed out".to_string(),
            CoreError::Status { status, .. } => format!("status {status}"),
            other => other.to_string(),
        }
    }
}
