//! Patient and upload records as served by the remote API
//!
//! These are read-only projections of server state. The server owns
//! parsing, de-duplication, and persistence; this crate only displays
//! and filters them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One patient-invoice row from an uploaded spreadsheet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Patient {
    pub phone_number: String,
    pub patient_name: String,
    pub invoice_number: String,
    #[serde(default)]
    pub price: String,
    #[serde(default)]
    pub outstanding_amount: String,
    #[serde(default)]
    pub aging_bucket: String,
    #[serde(default)]
    pub notes: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link_requested: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link_sent: Option<String>,
    /// Estimated payment date, used by the calendar view
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_date: Option<String>,
}

/// Summary of one spreadsheet upload, as listed in the upload history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadSummary {
    pub id: i64,
    pub filename: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub uploaded_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub patient_count: u32,
    #[serde(default)]
    pub new_count: u32,
    #[serde(default)]
    pub updated_count: u32,
    #[serde(default)]
    pub error_count: u32,
}

impl UploadSummary {
    /// Human-facing name, falling back to the raw filename
    pub fn label(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.filename)
    }
}

/// One dispatched call within a batch-call outcome
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallAttempt {
    pub patient_name: String,
    pub phone_number: String,
    #[serde(default)]
    pub invoice_number: Option<String>,
    #[serde(default)]
    pub outstanding_amount: String,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
    pub success: bool,
    #[serde(default)]
    pub conversation_id: Option<String>,
}

/// Result of a batch-call dispatch, returned by the remote API
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchCallOutcome {
    #[serde(default)]
    pub total_attempted: u32,
    #[serde(default)]
    pub successful: u32,
    #[serde(default)]
    pub failed: u32,
    #[serde(default)]
    pub calls: Vec<CallAttempt>,
}
