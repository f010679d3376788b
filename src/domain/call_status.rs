//! Remote call status classification
//!
//! The remote endpoint reports a loose status string per phone number.
//! The poller only cares whether a call is still in flight: `sent`,
//! `pending`, or a missing status all mean the remote is still working
//! on it; anything else counts as resolved.

use serde::{Deserialize, Serialize};

/// Known call status values reported by the remote dialer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CallStatus {
    /// Call request accepted, not yet dialed
    Sent,
    /// Call is dialing or in progress
    Pending,
    /// Call finished normally
    Completed,
    /// Call could not be completed
    Failed,
}

impl CallStatus {
    pub fn as_str(&self) -> &str {
        match self {
            CallStatus::Sent => "sent",
            CallStatus::Pending => "pending",
            CallStatus::Completed => "completed",
            CallStatus::Failed => "failed",
        }
    }

    /// Parse a status string; unknown values yield `None` and are
    /// treated as resolved by the caller.
    pub fn parse(value: &str) -> Option<CallStatus> {
        match value {
            "sent" => Some(CallStatus::Sent),
            "pending" => Some(CallStatus::Pending),
            "completed" => Some(CallStatus::Completed),
            "failed" => Some(CallStatus::Failed),
            _ => None,
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, CallStatus::Sent | CallStatus::Pending)
    }
}

/// Per-phone status record from the remote status endpoint.
///
/// Both status fields are optional; the endpoint historically reported
/// `call_status` and later added `recent_call_status`, which wins when
/// both are present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhoneCallStatus {
    #[serde(default)]
    pub phone_number: String,
    #[serde(default)]
    pub recent_call_status: Option<String>,
    #[serde(default)]
    pub call_status: Option<String>,
}

impl PhoneCallStatus {
    pub fn new(phone_number: impl Into<String>) -> Self {
        Self {
            phone_number: phone_number.into(),
            recent_call_status: None,
            call_status: None,
        }
    }

    pub fn with_status(phone_number: impl Into<String>, status: &str) -> Self {
        Self {
            phone_number: phone_number.into(),
            recent_call_status: Some(status.to_string()),
            call_status: None,
        }
    }

    fn effective_status(&self) -> Option<&str> {
        self.recent_call_status
            .as_deref()
            .or(self.call_status.as_deref())
    }

    /// A call is still pending when its status is `sent`, `pending`,
    /// or absent entirely. Any other reported value means the remote
    /// has finished with it.
    pub fn is_still_pending(&self) -> bool {
        match self.effective_status() {
            None => true,
            Some(value) => matches!(CallStatus::parse(value), Some(s) if s.is_pending()),
        }
    }
}

/// True when any queried phone number still has a call in flight.
/// A phone missing from the response counts as pending.
pub fn any_pending(queried: &[String], statuses: &[PhoneCallStatus]) -> bool {
    queried.iter().any(|phone| {
        match statuses.iter().find(|s| &s.phone_number == phone) {
            None => true,
            Some(status) => status.is_still_pending(),
        }
    })
}
