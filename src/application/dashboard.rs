//! Dashboard orchestration: uploads, patient views, and batch calling
//!
//! `DashboardService` is the glue a rendering layer talks to. It owns
//! the current patient list, the upload history, the selected-upload
//! filter, and the active-call registry, and it drives the poller when
//! a batch call is dispatched. Rendering itself lives elsewhere; every
//! method here is a thin use case over the gateway ports.

use crate::domain::active_call::{ActiveCallRegistry, ActiveCallSnapshot, CallKey};
use crate::domain::gateway::{
    CallStatusGateway, InvoiceCallApi, PatientDataRefresher, SessionFlagStore,
};
use crate::domain::patient::{BatchCallOutcome, CallAttempt, Patient, UploadSummary};
use crate::domain::poller::{CallStatusPoller, PollerSettings, PollerState};
use crate::domain::shared::error::DomainError;
use crate::domain::shared::result::Result;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

/// Shared view state read by a rendering layer
#[derive(Debug, Default)]
pub struct DashboardState {
    patients: Mutex<Vec<Patient>>,
    uploads: Mutex<Vec<UploadSummary>>,
    selected_upload_id: Mutex<Option<i64>>,
    loading: AtomicBool,
}

impl DashboardState {
    pub fn patients(&self) -> Vec<Patient> {
        self.patients.lock().unwrap().clone()
    }

    pub fn uploads(&self) -> Vec<UploadSummary> {
        self.uploads.lock().unwrap().clone()
    }

    pub fn selected_upload_id(&self) -> Option<i64> {
        *self.selected_upload_id.lock().unwrap()
    }

    pub fn is_loading(&self) -> bool {
        self.loading.load(Ordering::SeqCst)
    }

    fn set_patients(&self, patients: Vec<Patient>) {
        *self.patients.lock().unwrap() = patients;
    }

    fn set_uploads(&self, uploads: Vec<UploadSummary>) {
        *self.uploads.lock().unwrap() = uploads;
    }

    fn set_selected_upload_id(&self, upload_id: Option<i64>) {
        *self.selected_upload_id.lock().unwrap() = upload_id;
    }
}

/// Reload port implementation: re-fetches patients for the current
/// scope and publishes them into the shared state
struct PatientRefresher {
    api: Arc<dyn InvoiceCallApi>,
    state: Arc<DashboardState>,
}

#[async_trait]
impl PatientDataRefresher for PatientRefresher {
    async fn reload_patients(&self, upload_id: Option<i64>, silent: bool) -> Result<()> {
        if !silent {
            self.state.loading.store(true, Ordering::SeqCst);
        }
        let result = match upload_id {
            Some(id) => self.api.fetch_patients_by_upload(id).await,
            None => self.api.fetch_patients().await,
        };
        if !silent {
            self.state.loading.store(false, Ordering::SeqCst);
        }
        let patients = result?;
        debug!(
            "Reloaded {} patients (scope: {:?}, silent: {})",
            patients.len(),
            upload_id,
            silent
        );
        self.state.set_patients(patients);
        Ok(())
    }

    fn selected_upload_id(&self) -> Option<i64> {
        self.state.selected_upload_id()
    }
}

/// Adapter narrowing the full API port to the poller's status query
struct ApiStatusGateway(Arc<dyn InvoiceCallApi>);

#[async_trait]
impl CallStatusGateway for ApiStatusGateway {
    async fn query_call_status(
        &self,
        phone_numbers: Vec<String>,
    ) -> Result<Vec<crate::domain::call_status::PhoneCallStatus>> {
        self.0.query_call_status(phone_numbers).await
    }
}

/// Orchestrates the dashboard use cases against the remote API
pub struct DashboardService {
    api: Arc<dyn InvoiceCallApi>,
    flags: Arc<dyn SessionFlagStore>,
    state: Arc<DashboardState>,
    registry: ActiveCallRegistry,
    refresher: Arc<PatientRefresher>,
    poller: Arc<CallStatusPoller>,
}

impl DashboardService {
    pub fn new(
        api: Arc<dyn InvoiceCallApi>,
        flags: Arc<dyn SessionFlagStore>,
        settings: PollerSettings,
    ) -> Self {
        let state = Arc::new(DashboardState::default());
        let registry = ActiveCallRegistry::new();

        // Best-effort restore of an interrupted session's in-flight
        // calls; the first tick's purge drops anything too old.
        if flags.calling_in_progress() {
            match flags.load_active_calls() {
                Ok(snapshot) => {
                    for entry in snapshot {
                        registry.insert(entry.key, entry.started_at);
                    }
                    if !registry.is_empty() {
                        info!(
                            "Restored {} in-flight calls from a previous session",
                            registry.len()
                        );
                    }
                }
                Err(e) => warn!("Failed to restore active-call snapshot: {}", e),
            }
        }

        let refresher = Arc::new(PatientRefresher {
            api: api.clone(),
            state: state.clone(),
        });
        let poller = Arc::new(CallStatusPoller::new(
            settings,
            registry.clone(),
            Arc::new(ApiStatusGateway(api.clone())),
            refresher.clone(),
            flags.clone(),
        ));

        Self {
            api,
            flags,
            state,
            registry,
            refresher,
            poller,
        }
    }

    pub fn state(&self) -> &DashboardState {
        &self.state
    }

    pub fn poller_state(&self) -> PollerState {
        self.poller.state()
    }

    /// In-flight calls for rendering per-row indicators
    pub fn active_calls(&self) -> Vec<(CallKey, DateTime<Utc>)> {
        self.registry.snapshot()
    }

    /// Re-fetch patients for the current scope
    pub async fn reload(&self, silent: bool) -> Result<()> {
        self.refresher
            .reload_patients(self.state.selected_upload_id(), silent)
            .await
    }

    /// Re-fetch the upload history list
    pub async fn refresh_uploads(&self) -> Result<()> {
        let uploads = self.api.fetch_upload_history().await?;
        debug!("Loaded {} uploads", uploads.len());
        self.state.set_uploads(uploads);
        Ok(())
    }

    /// Upload a spreadsheet and refresh both the history and the
    /// patient list
    pub async fn upload_spreadsheet(&self, filename: &str, bytes: Vec<u8>) -> Result<UploadSummary> {
        let summary = self.api.upload_spreadsheet(filename, bytes).await?;
        info!(
            "Uploaded {}: {} patients ({} new, {} updated, {} errors)",
            summary.filename,
            summary.patient_count,
            summary.new_count,
            summary.updated_count,
            summary.error_count
        );
        self.refresh_uploads().await?;
        self.reload(false).await?;
        Ok(summary)
    }

    /// Change the upload filter (`None` = all files) and reload
    pub async fn select_upload(&self, upload_id: Option<i64>) -> Result<()> {
        self.state.set_selected_upload_id(upload_id);
        self.reload(false).await
    }

    /// Patients whose estimated payment date falls on `date`; backs
    /// the calendar view and is not cached in the shared state
    pub async fn patients_for_date(&self, date: NaiveDate) -> Result<Vec<Patient>> {
        self.api.fetch_patients_by_date(date).await
    }

    /// Dispatch automated calls to every patient in the current scope,
    /// seed the active-call registry from the successful attempts, and
    /// start status polling
    pub async fn start_batch_call(&self) -> Result<BatchCallOutcome> {
        if self.poller.is_polling() || self.flags.calling_in_progress() {
            return Err(DomainError::InvalidOperation(
                "A batch-calling session is already in progress".to_string(),
            ));
        }

        let scope = self.state.selected_upload_id();
        let outcome = self.api.start_batch_call(scope).await?;
        info!(
            "Batch call dispatched: {} attempted, {} successful, {} failed",
            outcome.total_attempted, outcome.successful, outcome.failed
        );

        let now = Utc::now();
        let patients = self.state.patients();
        for attempt in outcome.calls.iter().filter(|c| c.success) {
            self.registry
                .insert(self.call_key_for(attempt, &patients), now);
        }
        self.persist_snapshot();

        if !self.registry.is_empty() {
            self.poller.begin_calling();
            self.poller.start();
        }
        Ok(outcome)
    }

    /// Dispatch a single call to one patient and poll it like a
    /// one-entry batch
    pub async fn call_patient(&self, patient: &Patient) -> Result<CallAttempt> {
        let attempt = self.api.start_single_call(&patient.phone_number).await?;
        if attempt.success {
            self.registry.insert(
                CallKey::new(&patient.phone_number, &patient.invoice_number),
                Utc::now(),
            );
            self.persist_snapshot();
            if !self.poller.is_polling() {
                self.poller.begin_calling();
                self.poller.start();
            }
        }
        Ok(attempt)
    }

    /// Resume polling after a restart that interrupted a batch call
    pub fn resume_if_interrupted(&self) {
        if self.flags.calling_in_progress() && !self.registry.is_empty() {
            info!("Resuming interrupted batch-calling session");
            self.poller.begin_calling();
            self.poller.start();
        }
    }

    /// Halt polling; safe to call at any time
    pub fn stop_calling(&self) {
        self.poller.stop();
    }

    /// Block until the current polling session ends
    pub async fn wait_for_calls(&self) {
        self.poller.wait_until_stopped().await;
    }

    /// The attempt's own invoice number when the server provides one,
    /// otherwise joined against the loaded patient list by phone
    fn call_key_for(&self, attempt: &CallAttempt, patients: &[Patient]) -> CallKey {
        let invoice = attempt
            .invoice_number
            .clone()
            .or_else(|| {
                patients
                    .iter()
                    .find(|p| p.phone_number == attempt.phone_number)
                    .map(|p| p.invoice_number.clone())
            })
            .unwrap_or_default();
        CallKey::new(&attempt.phone_number, invoice)
    }

    fn persist_snapshot(&self) {
        let snapshot = self
            .registry
            .snapshot()
            .into_iter()
            .map(|(key, started_at)| ActiveCallSnapshot { key, started_at })
            .collect();
        if let Err(e) = self.flags.save_active_calls(snapshot) {
            warn!("Failed to persist active-call snapshot: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::gateway::{MockInvoiceCallApi, MockSessionFlagStore};
    use mockall::predicate::eq;

    fn idle_flags() -> MockSessionFlagStore {
        let mut flags = MockSessionFlagStore::new();
        flags.expect_calling_in_progress().return_const(false);
        flags
    }

    fn patient(phone: &str, invoice: &str) -> Patient {
        Patient {
            phone_number: phone.to_string(),
            patient_name: "Test Patient".to_string(),
            invoice_number: invoice.to_string(),
            price: "100.00".to_string(),
            outstanding_amount: "40.00".to_string(),
            aging_bucket: "30-60".to_string(),
            notes: String::new(),
            link_requested: None,
            link_sent: None,
            estimated_date: None,
        }
    }

    fn attempt(phone: &str, success: bool) -> CallAttempt {
        CallAttempt {
            patient_name: "Test Patient".to_string(),
            phone_number: phone.to_string(),
            invoice_number: None,
            outstanding_amount: "40.00".to_string(),
            timestamp: None,
            success,
            conversation_id: success.then(|| "conv-1".to_string()),
        }
    }

    #[tokio::test]
    async fn test_select_upload_reloads_with_scope() {
        let mut api = MockInvoiceCallApi::new();
        api.expect_fetch_patients_by_upload()
            .with(eq(7))
            .times(1)
            .returning(|_| Ok(vec![patient("555-0100", "INV-1")]));

        let service = DashboardService::new(
            Arc::new(api),
            Arc::new(idle_flags()),
            PollerSettings::default(),
        );

        service.select_upload(Some(7)).await.unwrap();
        assert_eq!(service.state().selected_upload_id(), Some(7));
        assert_eq!(service.state().patients().len(), 1);
    }

    #[tokio::test]
    async fn test_batch_call_seeds_registry_from_successful_attempts() {
        let mut api = MockInvoiceCallApi::new();
        api.expect_fetch_patients().times(1).returning(|| {
            Ok(vec![patient("555-0100", "INV-1"), patient("555-0101", "INV-2")])
        });
        api.expect_start_batch_call()
            .with(eq(None::<i64>))
            .times(1)
            .returning(|_| {
                Ok(BatchCallOutcome {
                    total_attempted: 2,
                    successful: 1,
                    failed: 1,
                    calls: vec![attempt("555-0100", true), attempt("555-0101", false)],
                })
            });

        let mut flags = idle_flags();
        flags
            .expect_save_active_calls()
            .times(1)
            .returning(|_| Ok(()));
        flags
            .expect_set_calling_in_progress()
            .with(eq(true))
            .times(1)
            .returning(|_| Ok(()));
        flags
            .expect_clear_calling_in_progress()
            .returning(|| Ok(()));

        let service = DashboardService::new(
            Arc::new(api),
            Arc::new(flags),
            PollerSettings::default(),
        );

        service.reload(true).await.unwrap();
        let outcome = service.start_batch_call().await.unwrap();

        assert_eq!(outcome.successful, 1);
        let active = service.active_calls();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].0, CallKey::new("555-0100", "INV-1"));
        assert_eq!(service.poller_state(), PollerState::Polling);

        service.stop_calling();
    }

    #[tokio::test]
    async fn test_batch_call_rejected_while_session_active() {
        let mut api = MockInvoiceCallApi::new();
        api.expect_start_batch_call().never();

        let mut flags = MockSessionFlagStore::new();
        flags.expect_calling_in_progress().return_const(true);
        flags
            .expect_load_active_calls()
            .returning(|| Ok(Vec::new()));

        let service = DashboardService::new(
            Arc::new(api),
            Arc::new(flags),
            PollerSettings::default(),
        );

        let result = service.start_batch_call().await;
        assert!(matches!(result, Err(DomainError::InvalidOperation(_))));
    }

    #[tokio::test]
    async fn test_interrupted_session_restores_registry() {
        let api = MockInvoiceCallApi::new();

        let mut flags = MockSessionFlagStore::new();
        flags.expect_calling_in_progress().return_const(true);
        flags.expect_load_active_calls().times(1).returning(|| {
            Ok(vec![ActiveCallSnapshot {
                key: CallKey::new("555-0100", "INV-1"),
                started_at: Utc::now(),
            }])
        });
        flags
            .expect_set_calling_in_progress()
            .with(eq(true))
            .times(1)
            .returning(|_| Ok(()));
        flags
            .expect_clear_calling_in_progress()
            .returning(|| Ok(()));

        let service = DashboardService::new(
            Arc::new(api),
            Arc::new(flags),
            PollerSettings::default(),
        );

        assert_eq!(service.active_calls().len(), 1);

        service.resume_if_interrupted();
        assert_eq!(service.poller_state(), PollerState::Polling);
        service.stop_calling();
    }

    #[tokio::test]
    async fn test_single_call_failure_does_not_start_polling() {
        let mut api = MockInvoiceCallApi::new();
        api.expect_start_single_call()
            .withf(|phone| phone == "555-0100")
            .times(1)
            .returning(|_| Ok(attempt("555-0100", false)));

        let service = DashboardService::new(
            Arc::new(api),
            Arc::new(idle_flags()),
            PollerSettings::default(),
        );

        let result = service
            .call_patient(&patient("555-0100", "INV-1"))
            .await
            .unwrap();

        assert!(!result.success);
        assert!(service.active_calls().is_empty());
        assert_eq!(service.poller_state(), PollerState::Idle);
    }
}
