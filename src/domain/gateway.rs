//! Gateway interfaces (ports) to the remote API and durable state
//!
//! These are defined in the domain layer as traits and implemented in
//! the infrastructure layer (adapters). Tests mock them with mockall.

use crate::domain::active_call::ActiveCallSnapshot;
use crate::domain::call_status::PhoneCallStatus;
use crate::domain::patient::{BatchCallOutcome, CallAttempt, Patient, UploadSummary};
use crate::domain::shared::result::Result;
use async_trait::async_trait;
use chrono::NaiveDate;

/// Remote invoice-calling API, one method per endpoint
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait InvoiceCallApi: Send + Sync {
    /// Upload a patient-invoice spreadsheet (CSV/XLSX); parsing happens
    /// server-side
    async fn upload_spreadsheet(&self, filename: &str, bytes: Vec<u8>) -> Result<UploadSummary>;

    /// All patients across every upload
    async fn fetch_patients(&self) -> Result<Vec<Patient>>;

    /// Patients from a single upload
    async fn fetch_patients_by_upload(&self, upload_id: i64) -> Result<Vec<Patient>>;

    /// Patients whose estimated payment date falls on `date`
    async fn fetch_patients_by_date(&self, date: NaiveDate) -> Result<Vec<Patient>>;

    /// Upload history with per-upload ingest counts
    async fn fetch_upload_history(&self) -> Result<Vec<UploadSummary>>;

    /// Dispatch automated calls to every patient in scope
    async fn start_batch_call(&self, upload_id: Option<i64>) -> Result<BatchCallOutcome>;

    /// Dispatch a single automated call
    async fn start_single_call(&self, phone_number: &str) -> Result<CallAttempt>;

    /// Current call status for the given phone numbers. Tolerates
    /// partial responses; phones may be missing from the result.
    async fn query_call_status(&self, phone_numbers: Vec<String>) -> Result<Vec<PhoneCallStatus>>;
}

/// Status-query port consumed by the poller. Kept separate from
/// [`InvoiceCallApi`] so the poller depends on exactly what it uses.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CallStatusGateway: Send + Sync {
    async fn query_call_status(&self, phone_numbers: Vec<String>) -> Result<Vec<PhoneCallStatus>>;
}

/// Patient-data reload port consumed by the poller
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PatientDataRefresher: Send + Sync {
    /// Re-fetch patient data for the given scope. `silent` suppresses
    /// user-facing loading indicators.
    async fn reload_patients(&self, upload_id: Option<i64>, silent: bool) -> Result<()>;

    /// The caller's current upload filter, read fresh on every tick
    fn selected_upload_id(&self) -> Option<i64>;
}

/// Durable session flags: best-effort restart hints, never
/// authoritative state. Failures here are logged and ignored.
#[cfg_attr(test, mockall::automock)]
pub trait SessionFlagStore: Send + Sync {
    fn set_calling_in_progress(&self, active: bool) -> Result<()>;
    fn clear_calling_in_progress(&self) -> Result<()>;
    fn calling_in_progress(&self) -> bool;

    fn save_active_calls(&self, snapshot: Vec<ActiveCallSnapshot>) -> Result<()>;
    fn load_active_calls(&self) -> Result<Vec<ActiveCallSnapshot>>;
    fn clear_active_calls(&self) -> Result<()>;
}
