//! Wire envelopes for the remote API
//!
//! The remote schema is owned by the server; these types stay tolerant
//! (defaulted collections, optional fields) so a partial response never
//! fails deserialization outright.

use crate::domain::call_status::PhoneCallStatus;
use crate::domain::patient::{BatchCallOutcome, CallAttempt, Patient, UploadSummary};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct PatientsResponse {
    #[serde(default)]
    pub patients: Vec<Patient>,
}

#[derive(Debug, Deserialize)]
pub struct UploadHistoryResponse {
    #[serde(default)]
    pub history: Vec<UploadSummary>,
}

#[derive(Debug, Deserialize)]
pub struct UploadResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    pub upload: Option<UploadSummary>,
}

#[derive(Debug, Deserialize)]
pub struct BatchCallResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    pub results: Option<BatchCallOutcome>,
}

#[derive(Debug, Deserialize)]
pub struct SingleCallResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    pub call: Option<CallAttempt>,
}

#[derive(Debug, Deserialize)]
pub struct CallStatusResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub statuses: Vec<PhoneCallStatus>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_call_status_response_tolerates_sparse_records() {
        let json = r#"{
            "success": true,
            "statuses": [
                {"phone_number": "555-0100", "recent_call_status": "completed"},
                {"phone_number": "555-0101"},
                {}
            ]
        }"#;

        let response: CallStatusResponse = serde_json::from_str(json).unwrap();
        assert!(response.success);
        assert_eq!(response.statuses.len(), 3);
        assert!(!response.statuses[0].is_still_pending());
        assert!(response.statuses[1].is_still_pending());
    }

    #[test]
    fn test_batch_call_response_without_results() {
        let json = r#"{"success": false, "message": "no patients in scope"}"#;
        let response: BatchCallResponse = serde_json::from_str(json).unwrap();
        assert!(!response.success);
        assert!(response.results.is_none());
    }
}
