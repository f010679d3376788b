//! Call status poller - the batch-calling lifecycle state machine
//!
//! Once a batch call is dispatched, the remote dialer works through it
//! at its own pace. This poller owns the "calling in progress" state:
//! every tick it purges abandoned registry entries, queries remote call
//! status for the phones still outstanding, drops registry entries the
//! remote has finished with, keeps the patient view
//! fresh with periodic silent reloads, and decides when the session is
//! over (all calls resolved, registry drained, a hard ceiling reached,
//! or an explicit stop).
//!
//! The tick loop is one spawned task driven by a fixed-delay interval;
//! each tick's async work is awaited before the next tick fires, so
//! overlapping ticks cannot occur no matter how slow the remote is.

use crate::domain::active_call::ActiveCallRegistry;
use crate::domain::call_status::any_pending;
use crate::domain::gateway::{CallStatusGateway, PatientDataRefresher, SessionFlagStore};
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Poller lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollerState {
    /// No polling loop exists
    Idle,
    /// Tick loop is running
    Polling,
    /// All calls resolved; final reload in flight
    Draining,
    /// Session ended (resolution, timeout, or explicit stop)
    Stopped,
}

/// Why a polling session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// Every outstanding call reported a resolved status
    AllResolved,
    /// No calls remained in the registry at tick start
    EmptyRegistry,
    /// The tick ceiling was reached with calls still pending
    HardCeiling,
    /// `stop()` was called, or no session exists
    Manual,
}

impl StopReason {
    pub fn as_str(&self) -> &str {
        match self {
            StopReason::AllResolved => "all calls resolved",
            StopReason::EmptyRegistry => "no active calls",
            StopReason::HardCeiling => "tick ceiling reached",
            StopReason::Manual => "stopped",
        }
    }
}

/// Result of one tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Continue,
    Stopped(StopReason),
}

/// Tuning knobs for the polling loop, derived from configuration
#[derive(Debug, Clone)]
pub struct PollerSettings {
    /// Fixed delay between ticks
    pub interval: Duration,
    /// Hard ceiling: force-stop after this many ticks
    pub max_ticks: u32,
    /// Minimum ticks before an all-resolved result is trusted
    pub debounce_ticks: u32,
    /// Fallback reload cadence; keeps the UI moving when status
    /// queries fail repeatedly
    pub fallback_reload_every: u32,
    /// Opportunistic reload cadence while calls remain pending
    pub refresh_reload_every: u32,
    /// Registry entries older than this are treated as abandoned
    pub stale_after: ChronoDuration,
}

impl Default for PollerSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(2000),
            max_ticks: 60,
            debounce_ticks: 3,
            fallback_reload_every: 3,
            refresh_reload_every: 5,
            stale_after: ChronoDuration::minutes(10),
        }
    }
}

/// Ephemeral state of one batch-calling session. Created when a batch
/// call is initiated, destroyed when polling stops.
#[derive(Debug, Clone)]
pub struct CallingSession {
    pub id: Uuid,
    pub started_at: DateTime<Utc>,
    pub tick_count: u32,
    pub max_ticks: u32,
    pub interval: Duration,
}

impl CallingSession {
    fn new(settings: &PollerSettings) -> Self {
        Self {
            id: Uuid::new_v4(),
            started_at: Utc::now(),
            tick_count: 0,
            max_ticks: settings.max_ticks,
            interval: settings.interval,
        }
    }
}

/// The polling state machine. Shared behind an `Arc`; the spawned tick
/// loop holds a clone and all mutation goes through the shared handles,
/// so the loop always reads live values.
pub struct CallStatusPoller {
    settings: PollerSettings,
    registry: ActiveCallRegistry,
    status_gateway: Arc<dyn CallStatusGateway>,
    refresher: Arc<dyn PatientDataRefresher>,
    flags: Arc<dyn SessionFlagStore>,
    state: Mutex<PollerState>,
    session: Mutex<Option<CallingSession>>,
    calling_active: AtomicBool,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl CallStatusPoller {
    pub fn new(
        settings: PollerSettings,
        registry: ActiveCallRegistry,
        status_gateway: Arc<dyn CallStatusGateway>,
        refresher: Arc<dyn PatientDataRefresher>,
        flags: Arc<dyn SessionFlagStore>,
    ) -> Self {
        Self {
            settings,
            registry,
            status_gateway,
            refresher,
            flags,
            state: Mutex::new(PollerState::Idle),
            session: Mutex::new(None),
            calling_active: AtomicBool::new(false),
            task: Mutex::new(None),
        }
    }

    pub fn state(&self) -> PollerState {
        *self.state.lock().unwrap()
    }

    pub fn is_polling(&self) -> bool {
        matches!(self.state(), PollerState::Polling | PollerState::Draining)
    }

    pub fn registry(&self) -> &ActiveCallRegistry {
        &self.registry
    }

    /// Current session snapshot, if one exists
    pub fn session(&self) -> Option<CallingSession> {
        self.session.lock().unwrap().clone()
    }

    /// Mark a batch-calling session active. Must precede [`start`];
    /// `start()` without an active session is a no-op.
    ///
    /// [`start`]: CallStatusPoller::start
    pub fn begin_calling(&self) {
        self.calling_active.store(true, Ordering::SeqCst);
        *self.session.lock().unwrap() = Some(CallingSession::new(&self.settings));
    }

    /// Begin polling for the active session. Clears any stray tick
    /// loop first; does nothing if no session has been marked active.
    pub fn start(self: &Arc<Self>) {
        self.abort_task();

        if !self.calling_active.load(Ordering::SeqCst) {
            debug!("Poller start requested without an active calling session; ignoring");
            return;
        }

        {
            let mut session = self.session.lock().unwrap();
            match session.as_mut() {
                Some(s) => s.tick_count = 0,
                None => *session = Some(CallingSession::new(&self.settings)),
            }
        }

        if let Err(e) = self.flags.set_calling_in_progress(true) {
            warn!("Failed to persist calling-in-progress flag: {}", e);
        }
        *self.state.lock().unwrap() = PollerState::Polling;
        info!(
            "Call status polling started (interval: {:?}, ceiling: {} ticks)",
            self.settings.interval, self.settings.max_ticks
        );

        let poller = Arc::clone(self);
        let handle = tokio::spawn(async move {
            let mut timer = interval(poller.settings.interval);
            timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first interval tick fires immediately; skip it so the
            // first status check happens one full period after start.
            timer.tick().await;
            loop {
                timer.tick().await;
                if let TickOutcome::Stopped(reason) = poller.run_tick().await {
                    debug!("Polling loop exited: {}", reason.as_str());
                    break;
                }
            }
        });
        *self.task.lock().unwrap() = Some(handle);
    }

    /// Halt polling. Idempotent and always safe: aborting a finished
    /// or missing loop is a no-op, and the durable flag clear is
    /// harmless when nothing was ever started. In-flight remote calls
    /// are not aborted; their results are ignored once stopped.
    pub fn stop(&self) {
        self.abort_task();
        self.calling_active.store(false, Ordering::SeqCst);
        *self.session.lock().unwrap() = None;

        {
            let mut state = self.state.lock().unwrap();
            if matches!(*state, PollerState::Polling | PollerState::Draining) {
                *state = PollerState::Stopped;
                info!("Call status polling stopped: {}", StopReason::Manual.as_str());
            }
        }

        if let Err(e) = self.flags.clear_calling_in_progress() {
            warn!("Failed to clear calling-in-progress flag: {}", e);
        }
    }

    /// Wait for the tick loop to finish on its own. Used by callers
    /// that want to block until the batch completes or times out.
    pub async fn wait_until_stopped(&self) {
        let handle = self.task.lock().unwrap().take();
        if let Some(handle) = handle {
            let _ = handle.await;
        }
    }

    /// Execute one tick of the state machine. Public so tests (and a
    /// manual refresh) can drive ticks without a timer; the spawned
    /// loop calls this on every interval tick.
    pub async fn run_tick(&self) -> TickOutcome {
        let tick = {
            let mut session = self.session.lock().unwrap();
            match session.as_mut() {
                Some(s) => {
                    s.tick_count += 1;
                    s.tick_count
                }
                None => return TickOutcome::Stopped(StopReason::Manual),
            }
        };

        // Housekeeping runs on every tick regardless of what follows
        let purged = self
            .registry
            .purge_stale(Utc::now(), self.settings.stale_after);
        if purged > 0 {
            debug!("Purged {} abandoned call entries on tick {}", purged, tick);
        }

        let scope = self.refresher.selected_upload_id();

        if self.registry.is_empty() {
            debug!("No active calls remain on tick {}; stopping", tick);
            self.reload_silent(scope).await;
            self.finish(StopReason::EmptyRegistry);
            return TickOutcome::Stopped(StopReason::EmptyRegistry);
        }

        let phones = self.registry.distinct_phone_numbers();
        let mut all_resolved = false;
        match self.status_gateway.query_call_status(phones.clone()).await {
            Ok(statuses) => {
                all_resolved = !any_pending(&phones, &statuses);
                // An all-resolved report inside the debounce window is
                // not yet trusted, so the registry stays untouched too;
                // dropping the last entries early would let the
                // empty-registry exit bypass the debounce next tick.
                if !all_resolved || tick >= self.settings.debounce_ticks {
                    let resolved: Vec<String> = statuses
                        .iter()
                        .filter(|status| !status.is_still_pending())
                        .map(|status| status.phone_number.clone())
                        .collect();
                    let removed = self.registry.remove_phones(&resolved);
                    if removed > 0 {
                        debug!("Tick {}: {} call entries resolved", tick, removed);
                    }
                }
                debug!(
                    "Tick {}: {} phones queried, all_resolved={}",
                    tick,
                    phones.len(),
                    all_resolved
                );
            }
            Err(e) => {
                // Never fatal; the periodic reload below substitutes
                // for status-based decisioning while queries fail.
                warn!("Call status query failed on tick {}: {}", tick, e);
            }
        }

        // Periodic reloads fire regardless of the query outcome, at
        // most once per tick when the cadences coincide.
        if tick % self.settings.fallback_reload_every == 0
            || tick % self.settings.refresh_reload_every == 0
        {
            self.reload_silent(scope).await;
        }

        if all_resolved && tick >= self.settings.debounce_ticks {
            *self.state.lock().unwrap() = PollerState::Draining;
            info!("All calls resolved on tick {}; reloading before stop", tick);
            self.reload_silent(scope).await;
            self.finish(StopReason::AllResolved);
            return TickOutcome::Stopped(StopReason::AllResolved);
        }

        if tick >= self.settings.max_ticks {
            warn!(
                "Polling ceiling of {} ticks reached; forcing stop and clearing {} registry entries",
                self.settings.max_ticks,
                self.registry.len()
            );
            self.registry.clear();
            if let Err(e) = self.flags.clear_active_calls() {
                warn!("Failed to clear durable active-call mirror: {}", e);
            }
            self.finish(StopReason::HardCeiling);
            return TickOutcome::Stopped(StopReason::HardCeiling);
        }

        TickOutcome::Continue
    }

    async fn reload_silent(&self, upload_id: Option<i64>) {
        if let Err(e) = self.refresher.reload_patients(upload_id, true).await {
            warn!("Patient data reload failed: {}", e);
        }
    }

    fn finish(&self, reason: StopReason) {
        *self.session.lock().unwrap() = None;
        self.calling_active.store(false, Ordering::SeqCst);
        *self.state.lock().unwrap() = PollerState::Stopped;
        if let Err(e) = self.flags.clear_calling_in_progress() {
            warn!("Failed to clear calling-in-progress flag: {}", e);
        }
        info!("Call status polling stopped: {}", reason.as_str());
    }

    fn abort_task(&self) {
        if let Some(handle) = self.task.lock().unwrap().take() {
            handle.abort();
        }
    }
}

impl Drop for CallStatusPoller {
    fn drop(&mut self) {
        self.abort_task();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::active_call::CallKey;
    use crate::domain::call_status::PhoneCallStatus;
    use crate::domain::gateway::{
        MockCallStatusGateway, MockPatientDataRefresher, MockSessionFlagStore,
    };
    use std::sync::atomic::AtomicU32;

    fn default_flags() -> MockSessionFlagStore {
        let mut flags = MockSessionFlagStore::new();
        flags.expect_clear_calling_in_progress().returning(|| Ok(()));
        flags.expect_clear_active_calls().returning(|| Ok(()));
        flags
    }

    fn refresher_expecting(reloads: usize) -> MockPatientDataRefresher {
        let mut refresher = MockPatientDataRefresher::new();
        refresher.expect_selected_upload_id().return_const(None::<i64>);
        refresher
            .expect_reload_patients()
            .times(reloads)
            .returning(|_, _| Ok(()));
        refresher
    }

    fn build_poller(
        gateway: MockCallStatusGateway,
        refresher: MockPatientDataRefresher,
        flags: MockSessionFlagStore,
        registry: ActiveCallRegistry,
    ) -> Arc<CallStatusPoller> {
        Arc::new(CallStatusPoller::new(
            PollerSettings::default(),
            registry,
            Arc::new(gateway),
            Arc::new(refresher),
            Arc::new(flags),
        ))
    }

    fn seed_registry(phones: &[(&str, &str)]) -> ActiveCallRegistry {
        let registry = ActiveCallRegistry::new();
        for (phone, invoice) in phones {
            registry.insert(CallKey::new(*phone, *invoice), Utc::now());
        }
        registry
    }

    #[tokio::test]
    async fn test_empty_registry_reloads_once_and_stops() {
        let gateway = MockCallStatusGateway::new();
        let refresher = refresher_expecting(1);
        let poller = build_poller(
            gateway,
            refresher,
            default_flags(),
            ActiveCallRegistry::new(),
        );

        poller.begin_calling();
        let outcome = poller.run_tick().await;

        assert_eq!(outcome, TickOutcome::Stopped(StopReason::EmptyRegistry));
        assert_eq!(poller.state(), PollerState::Stopped);
        assert!(poller.session().is_none());
    }

    #[tokio::test]
    async fn test_stale_entries_purged_on_every_tick() {
        let registry = ActiveCallRegistry::new();
        registry.insert(
            CallKey::new("555-0199", "INV-OLD"),
            Utc::now() - ChronoDuration::minutes(11),
        );
        registry.insert(CallKey::new("555-0100", "INV-1"), Utc::now());

        let mut gateway = MockCallStatusGateway::new();
        gateway.expect_query_call_status().returning(|phones| {
            // Only the fresh phone should still be queried
            assert_eq!(phones, vec!["555-0100".to_string()]);
            Ok(vec![PhoneCallStatus::with_status("555-0100", "pending")])
        });
        let refresher = refresher_expecting(0);
        let poller = build_poller(gateway, refresher, default_flags(), registry.clone());

        poller.begin_calling();
        let outcome = poller.run_tick().await;

        assert_eq!(outcome, TickOutcome::Continue);
        assert_eq!(registry.len(), 1);
        assert!(!registry.contains(&CallKey::new("555-0199", "INV-OLD")));
    }

    #[tokio::test]
    async fn test_all_resolved_waits_for_debounce_then_stops() {
        let registry = seed_registry(&[("555-0100", "INV-1")]);
        let mut gateway = MockCallStatusGateway::new();
        gateway.expect_query_call_status().returning(|_| {
            Ok(vec![PhoneCallStatus::with_status("555-0100", "completed")])
        });
        // Tick 3: one periodic reload plus the final draining reload
        let refresher = refresher_expecting(2);
        let poller = build_poller(gateway, refresher, default_flags(), registry.clone());

        poller.begin_calling();
        // Resolution inside the debounce window leaves the registry
        // alone; otherwise the empty-registry exit would fire early.
        assert_eq!(poller.run_tick().await, TickOutcome::Continue);
        assert_eq!(registry.len(), 1);
        assert_eq!(poller.run_tick().await, TickOutcome::Continue);
        assert_eq!(registry.len(), 1);
        assert_eq!(
            poller.run_tick().await,
            TickOutcome::Stopped(StopReason::AllResolved)
        );
        assert_eq!(poller.state(), PollerState::Stopped);
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_resolved_calls_leave_registry_on_stop() {
        let registry = seed_registry(&[("555-0100", "INV-1"), ("555-0101", "INV-2")]);
        let mut gateway = MockCallStatusGateway::new();
        gateway.expect_query_call_status().returning(|phones| {
            Ok(phones
                .iter()
                .map(|p| PhoneCallStatus::with_status(p.clone(), "completed"))
                .collect())
        });
        let refresher = refresher_expecting(2);
        let poller = build_poller(gateway, refresher, default_flags(), registry.clone());

        poller.begin_calling();
        poller.run_tick().await;
        poller.run_tick().await;
        assert_eq!(
            poller.run_tick().await,
            TickOutcome::Stopped(StopReason::AllResolved)
        );
        // Nothing left reported as in flight once the session is over
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_resolved_phone_dropped_while_another_still_pending() {
        let registry = seed_registry(&[("555-0100", "INV-1"), ("555-0101", "INV-2")]);
        let mut gateway = MockCallStatusGateway::new();
        gateway.expect_query_call_status().returning(|_| {
            Ok(vec![
                PhoneCallStatus::with_status("555-0100", "completed"),
                PhoneCallStatus::with_status("555-0101", "pending"),
            ])
        });
        let refresher = refresher_expecting(0);
        let poller = build_poller(gateway, refresher, default_flags(), registry.clone());

        poller.begin_calling();
        assert_eq!(poller.run_tick().await, TickOutcome::Continue);
        assert_eq!(registry.len(), 1);
        assert!(!registry.contains(&CallKey::new("555-0100", "INV-1")));
        assert!(registry.contains(&CallKey::new("555-0101", "INV-2")));
    }

    #[tokio::test]
    async fn test_pending_through_tick_five_then_completed_on_six() {
        let registry = seed_registry(&[("555-0100", "inv1")]);
        let ticks = Arc::new(AtomicU32::new(0));
        let ticks_seen = ticks.clone();

        let mut gateway = MockCallStatusGateway::new();
        gateway.expect_query_call_status().returning(move |_| {
            let n = ticks_seen.fetch_add(1, Ordering::SeqCst) + 1;
            let status = if n <= 5 { "pending" } else { "completed" };
            Ok(vec![PhoneCallStatus::with_status("555-0100", status)])
        });
        // Periodic reloads on ticks 3, 5, 6 plus the draining reload
        let refresher = refresher_expecting(4);
        let poller = build_poller(gateway, refresher, default_flags(), registry);

        poller.begin_calling();
        for _ in 1..=5 {
            assert_eq!(poller.run_tick().await, TickOutcome::Continue);
            assert_eq!(poller.state(), PollerState::Idle);
        }
        assert_eq!(
            poller.run_tick().await,
            TickOutcome::Stopped(StopReason::AllResolved)
        );
    }

    #[tokio::test]
    async fn test_hard_ceiling_force_stops_and_clears_registry() {
        let registry = seed_registry(&[("555-0100", "INV-1"), ("555-0101", "INV-2")]);
        let mut gateway = MockCallStatusGateway::new();
        gateway.expect_query_call_status().returning(|phones| {
            Ok(phones
                .iter()
                .map(|p| PhoneCallStatus::with_status(p.clone(), "pending"))
                .collect())
        });
        // Ticks divisible by 3 or 5 up to 60: 28 periodic reloads
        let refresher = refresher_expecting(28);

        let mut flags = MockSessionFlagStore::new();
        flags
            .expect_clear_calling_in_progress()
            .times(1)
            .returning(|| Ok(()));
        flags
            .expect_clear_active_calls()
            .times(1)
            .returning(|| Ok(()));

        let poller = build_poller(gateway, refresher, flags, registry.clone());

        poller.begin_calling();
        for _ in 1..=59 {
            assert_eq!(poller.run_tick().await, TickOutcome::Continue);
        }
        assert_eq!(
            poller.run_tick().await,
            TickOutcome::Stopped(StopReason::HardCeiling)
        );
        assert!(registry.is_empty());
        assert_eq!(poller.state(), PollerState::Stopped);
    }

    #[tokio::test]
    async fn test_query_failures_never_stop_polling() {
        let registry = seed_registry(&[("555-0100", "INV-1")]);
        let mut gateway = MockCallStatusGateway::new();
        gateway
            .expect_query_call_status()
            .returning(|_| Err(crate::DomainError::StatusQuery("connection refused".into())));
        // Fallback reloads on ticks 3, 5, 6, 9, 10
        let refresher = refresher_expecting(5);
        let poller = build_poller(gateway, refresher, default_flags(), registry);

        poller.begin_calling();
        for _ in 1..=10 {
            assert_eq!(poller.run_tick().await, TickOutcome::Continue);
        }
    }

    #[tokio::test]
    async fn test_fallback_reload_fires_alongside_resolution_reload() {
        // Queries fail on ticks 1 and 2, succeed all-resolved on tick 3:
        // the tick-3 fallback reload fires in addition to the final one.
        let registry = seed_registry(&[("555-0100", "INV-1")]);
        let ticks = Arc::new(AtomicU32::new(0));
        let ticks_seen = ticks.clone();

        let mut gateway = MockCallStatusGateway::new();
        gateway.expect_query_call_status().returning(move |_| {
            let n = ticks_seen.fetch_add(1, Ordering::SeqCst) + 1;
            if n < 3 {
                Err(crate::DomainError::StatusQuery("timeout".into()))
            } else {
                Ok(vec![PhoneCallStatus::with_status("555-0100", "completed")])
            }
        });
        let refresher = refresher_expecting(2);
        let poller = build_poller(gateway, refresher, default_flags(), registry);

        poller.begin_calling();
        assert_eq!(poller.run_tick().await, TickOutcome::Continue);
        assert_eq!(poller.run_tick().await, TickOutcome::Continue);
        assert_eq!(
            poller.run_tick().await,
            TickOutcome::Stopped(StopReason::AllResolved)
        );
    }

    #[tokio::test]
    async fn test_stop_while_idle_is_a_noop() {
        let gateway = MockCallStatusGateway::new();
        let mut refresher = MockPatientDataRefresher::new();
        refresher.expect_reload_patients().never();

        let mut flags = MockSessionFlagStore::new();
        // Only the idempotent durable clear is allowed
        flags
            .expect_clear_calling_in_progress()
            .times(1)
            .returning(|| Ok(()));
        flags.expect_set_calling_in_progress().never();

        let poller = build_poller(gateway, refresher, flags, ActiveCallRegistry::new());

        poller.stop();
        assert_eq!(poller.state(), PollerState::Idle);
    }

    #[tokio::test]
    async fn test_start_without_active_session_does_nothing() {
        let gateway = MockCallStatusGateway::new();
        let refresher = MockPatientDataRefresher::new();
        let mut flags = MockSessionFlagStore::new();
        flags.expect_set_calling_in_progress().never();

        let poller = build_poller(gateway, refresher, flags, ActiveCallRegistry::new());

        poller.start();
        assert_eq!(poller.state(), PollerState::Idle);
        assert!(poller.session().is_none());
    }

    #[tokio::test]
    async fn test_start_resets_tick_counter_and_sets_flag() {
        let registry = seed_registry(&[("555-0100", "INV-1")]);
        let mut gateway = MockCallStatusGateway::new();
        gateway.expect_query_call_status().returning(|_| {
            Ok(vec![PhoneCallStatus::with_status("555-0100", "pending")])
        });
        let mut refresher = MockPatientDataRefresher::new();
        refresher.expect_selected_upload_id().return_const(None::<i64>);
        refresher.expect_reload_patients().returning(|_, _| Ok(()));

        let mut flags = default_flags();
        flags
            .expect_set_calling_in_progress()
            .times(1)
            .returning(|_| Ok(()));

        let poller = build_poller(gateway, refresher, flags, registry);

        poller.begin_calling();
        // Burn a few ticks before starting; start() must reset to zero
        poller.run_tick().await;
        poller.run_tick().await;

        poller.start();
        assert_eq!(poller.state(), PollerState::Polling);
        assert_eq!(poller.session().unwrap().tick_count, 0);

        poller.stop();
        assert_eq!(poller.state(), PollerState::Stopped);
        // A second stop is a no-op
        poller.stop();
        assert_eq!(poller.state(), PollerState::Stopped);
    }

    #[tokio::test]
    async fn test_run_tick_without_session_stops_immediately() {
        let gateway = MockCallStatusGateway::new();
        let refresher = MockPatientDataRefresher::new();
        let flags = MockSessionFlagStore::new();
        let poller = build_poller(gateway, refresher, flags, ActiveCallRegistry::new());

        assert_eq!(
            poller.run_tick().await,
            TickOutcome::Stopped(StopReason::Manual)
        );
    }
}
