//! Active-call registry: the set of calls believed to be in flight
//!
//! Keys are a composite of phone number and invoice number, replacing
//! the delimiter-encoded string key an earlier iteration used, so a
//! phone number containing the delimiter can never corrupt a key.
//! The registry handle is shared (`Arc<Mutex<..>>`) between the poller
//! and the application layer: every reader sees the current contents,
//! never a stale snapshot captured at setup time.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};

/// Composite key identifying one in-flight call
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CallKey {
    pub phone_number: String,
    pub invoice_number: String,
}

impl CallKey {
    pub fn new(phone_number: impl Into<String>, invoice_number: impl Into<String>) -> Self {
        Self {
            phone_number: phone_number.into(),
            invoice_number: invoice_number.into(),
        }
    }
}

impl fmt::Display for CallKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}|{}", self.phone_number, self.invoice_number)
    }
}

/// Durable snapshot entry for one registry row, mirrored best-effort
/// into the session store so a restart can resume an in-flight batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveCallSnapshot {
    pub key: CallKey,
    pub started_at: DateTime<Utc>,
}

/// Shared registry of in-flight calls, keyed by [`CallKey`] mapped to
/// call-initiation time. Cloning yields another handle to the same map.
#[derive(Debug, Clone, Default)]
pub struct ActiveCallRegistry {
    calls: Arc<Mutex<HashMap<CallKey, DateTime<Utc>>>>,
}

impl ActiveCallRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, key: CallKey, started_at: DateTime<Utc>) {
        self.calls.lock().unwrap().insert(key, started_at);
    }

    pub fn remove(&self, key: &CallKey) -> Option<DateTime<Utc>> {
        self.calls.lock().unwrap().remove(key)
    }

    pub fn contains(&self, key: &CallKey) -> bool {
        self.calls.lock().unwrap().contains_key(key)
    }

    pub fn started_at(&self, key: &CallKey) -> Option<DateTime<Utc>> {
        self.calls.lock().unwrap().get(key).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.calls.lock().unwrap().is_empty()
    }

    pub fn len(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn clear(&self) {
        self.calls.lock().unwrap().clear();
    }

    /// Current contents, for UI indicators and the durable mirror
    pub fn snapshot(&self) -> Vec<(CallKey, DateTime<Utc>)> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|(key, started_at)| (key.clone(), *started_at))
            .collect()
    }

    /// Distinct phone numbers with at least one outstanding call,
    /// sorted for a stable query order
    pub fn distinct_phone_numbers(&self) -> Vec<String> {
        let mut phones: Vec<String> = self
            .calls
            .lock()
            .unwrap()
            .keys()
            .map(|key| key.phone_number.clone())
            .collect();
        phones.sort();
        phones.dedup();
        phones
    }

    /// Remove every entry whose phone number appears in `phones`,
    /// across all invoices for that phone. Returns the removal count.
    pub fn remove_phones(&self, phones: &[String]) -> usize {
        if phones.is_empty() {
            return 0;
        }
        let mut calls = self.calls.lock().unwrap();
        let before = calls.len();
        calls.retain(|key, _| !phones.contains(&key.phone_number));
        before - calls.len()
    }

    /// Remove entries older than `max_age`; these are treated as
    /// abandoned. Runs on every poller tick. Returns the purge count.
    pub fn purge_stale(&self, now: DateTime<Utc>, max_age: Duration) -> usize {
        let mut calls = self.calls.lock().unwrap();
        let before = calls.len();
        calls.retain(|_, started_at| now.signed_duration_since(*started_at) <= max_age);
        before - calls.len()
    }
}
