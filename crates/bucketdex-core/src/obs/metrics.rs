use serde::{Deserialize, Serialize};
use std::{cell::RefCell, collections::BTreeMap};

///
/// EventState
/// Ephemeral, in-memory counters for index operations.
///

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct EventState {
    pub ops: EventOps,
    pub indexes: BTreeMap<String, IndexCounters>,
}

///
/// EventOps
///

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct EventOps {
    // Read path
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub store_queries: u64,
    pub store_buckets_found: u64,
    pub cache_sets: u64,

    // Write path
    pub invalidations: u64,

    // Degraded reads
    pub offset_misses: u64,
    pub shallow_misses: u64,
    pub decode_failures: u64,
    pub store_fallbacks: u64,
}

///
/// IndexCounters
/// Per-prefix counters.
///

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct IndexCounters {
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub store_queries: u64,
    pub invalidations: u64,
    pub offset_misses: u64,
}

/// Point-in-time snapshot of the event state.
pub type EventReport = EventState;

thread_local! {
    static EVENT_STATE: RefCell<EventState> = RefCell::new(EventState::default());
}

/// Borrow metrics immutably.
pub(crate) fn with_state<R>(f: impl FnOnce(&EventState) -> R) -> R {
    EVENT_STATE.with(|m| f(&m.borrow()))
}

/// Borrow metrics mutably.
pub(crate) fn with_state_mut<R>(f: impl FnOnce(&mut EventState) -> R) -> R {
    EVENT_STATE.with(|m| f(&mut m.borrow_mut()))
}

/// Per-prefix counters, created on first use.
pub(crate) fn index_entry<'a>(state: &'a mut EventState, prefix: &str) -> &'a mut IndexCounters {
    state.indexes.entry(prefix.to_string()).or_default()
}

/// Reset all counters (useful in tests).
pub(crate) fn reset_all() {
    with_state_mut(|m| *m = EventState::default());
}

#[must_use]
pub(crate) fn report() -> EventReport {
    with_state(Clone::clone)
}
