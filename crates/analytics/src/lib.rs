//! In-memory record of relay attempts and their per-destination outcomes.

pub mod event_log;

pub use event_log::{DispatchRecord, EventLog};
