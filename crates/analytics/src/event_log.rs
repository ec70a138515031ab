//! Bounded, newest-first event log.
//!
//! One [`DispatchRecord`] is appended per relayed event. The log never holds
//! more than its capacity; appends past the cap evict the oldest entries.
//! Readers get a snapshot taken under the same lock as append-and-evict, so a
//! partially evicted state is never observed.

use std::collections::VecDeque;

use chrono::{SecondsFormat, Utc};
use parking_lot::Mutex;
use relay_core::CanonicalEvent;
use relay_destinations::{DispatchOutcome, DispatchReport};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

/// Audit entry for one relayed event.
///
/// Destination fields are present only for destinations that were
/// configured and attempted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DispatchRecord {
    /// RFC 3339 UTC time the record was written.
    pub timestamp: String,
    pub event_name: String,
    pub event_id: Option<String>,
    /// The canonical event before any destination-specific sanitization.
    pub payload_sent: CanonicalEvent,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta_status_code: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta_response: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tiktok_status_code: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tiktok_response: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reddit_status_code: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reddit_response: Option<Value>,
    /// Producer tag for records not written by the ingress handler.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

impl DispatchRecord {
    pub fn new(event: &CanonicalEvent, report: &DispatchReport) -> Self {
        let (meta_status_code, meta_response) = split(&report.meta);
        let (tiktok_status_code, tiktok_response) = split(&report.tiktok);
        let (reddit_status_code, reddit_response) = split(&report.reddit);

        Self {
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true),
            event_name: event.event_name.to_string(),
            event_id: event.event_id.clone(),
            payload_sent: event.clone(),
            meta_status_code,
            meta_response,
            tiktok_status_code,
            tiktok_response,
            reddit_status_code,
            reddit_response,
            source: None,
        }
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }
}

fn split(outcome: &DispatchOutcome) -> (Option<u16>, Option<Value>) {
    match outcome.response() {
        Some((status, body)) => (Some(status), Some(body.clone())),
        None => (None, None),
    }
}

/// Fixed-capacity FIFO of dispatch records, shared across requests.
pub struct EventLog {
    records: Mutex<VecDeque<DispatchRecord>>,
    capacity: usize,
}

impl EventLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            records: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
        }
    }

    /// Append a record, evicting the oldest entries beyond capacity.
    pub fn append(&self, record: DispatchRecord) {
        let mut records = self.records.lock();
        records.push_back(record);

        let overflow = records.len().saturating_sub(self.capacity);
        if overflow > 0 {
            records.drain(..overflow);
            metrics::counter!("relay.event_log.evicted").increment(overflow as u64);
            debug!(evicted = overflow, "Event log trimmed to capacity");
        }
    }

    /// All entries, newest first.
    pub fn snapshot(&self) -> Vec<DispatchRecord> {
        let records = self.records.lock();
        records.iter().rev().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
