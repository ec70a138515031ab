use serde_json::{json, Value};

/// Status code recorded when a destination could not be reached or
/// answered with something other than JSON.
pub const SYNTHETIC_FAILURE_STATUS: u16 = 500;

/// Result of one destination dispatch.
#[derive(Debug, Clone, PartialEq)]
pub enum DispatchOutcome {
    /// The destination answered. Any HTTP status, body recorded verbatim.
    Sent { status_code: u16, body: Value },
    /// No credential, or the event is not tracked by this destination.
    NotConfigured,
    /// Transport, timeout or decode failure.
    Failed { status_code: u16, body: Value },
}

impl DispatchOutcome {
    pub fn failed(message: impl std::fmt::Display) -> Self {
        DispatchOutcome::Failed {
            status_code: SYNTHETIC_FAILURE_STATUS,
            body: json!({ "error": message.to_string() }),
        }
    }

    /// Status and body, or `None` when the destination was skipped.
    pub fn response(&self) -> Option<(u16, &Value)> {
        match self {
            DispatchOutcome::Sent { status_code, body }
            | DispatchOutcome::Failed { status_code, body } => Some((*status_code, body)),
            DispatchOutcome::NotConfigured => None,
        }
    }

    pub fn status_code(&self) -> Option<u16> {
        self.response().map(|(status, _)| status)
    }

    pub fn is_attempted(&self) -> bool {
        !matches!(self, DispatchOutcome::NotConfigured)
    }
}
