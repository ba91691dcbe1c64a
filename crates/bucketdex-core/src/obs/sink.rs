//! Metrics sink boundary.
//!
//! Index logic must not touch `obs::metrics` directly; all instrumentation
//! flows through `MetricsEvent` and `MetricsSink`.
use crate::obs::metrics::{self, EventReport};
use std::{cell::RefCell, rc::Rc};

thread_local! {
    static SINK_OVERRIDE: RefCell<Option<Rc<dyn MetricsSink>>> = RefCell::new(None);
}

///
/// MetricsEvent
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum MetricsEvent<'a> {
    CacheLookup {
        prefix: &'a str,
        hits: u64,
        misses: u64,
    },
    StoreQuery {
        prefix: &'a str,
        queries: u64,
        found: u64,
    },
    CacheSet {
        prefix: &'a str,
    },
    Invalidate {
        prefix: &'a str,
        keys: u64,
    },
    OffsetMiss {
        prefix: &'a str,
    },
    ShallowMiss {
        prefix: &'a str,
        dropped: u64,
    },
    DecodeFailure {
        key: &'a str,
    },
    StoreFallback {
        prefix: Option<&'a str>,
    },
}

///
/// MetricsSink
///

pub trait MetricsSink {
    fn record(&self, event: MetricsEvent<'_>);
}

///
/// GlobalMetricsSink
/// Default thread-local sink that writes into the global counters.
///

pub(crate) struct GlobalMetricsSink;

impl MetricsSink for GlobalMetricsSink {
    fn record(&self, event: MetricsEvent<'_>) {
        match event {
            MetricsEvent::CacheLookup {
                prefix,
                hits,
                misses,
            } => metrics::with_state_mut(|m| {
                m.ops.cache_hits = m.ops.cache_hits.saturating_add(hits);
                m.ops.cache_misses = m.ops.cache_misses.saturating_add(misses);
                let entry = metrics::index_entry(m, prefix);
                entry.cache_hits = entry.cache_hits.saturating_add(hits);
                entry.cache_misses = entry.cache_misses.saturating_add(misses);
            }),

            MetricsEvent::StoreQuery {
                prefix,
                queries,
                found,
            } => metrics::with_state_mut(|m| {
                m.ops.store_queries = m.ops.store_queries.saturating_add(queries);
                m.ops.store_buckets_found = m.ops.store_buckets_found.saturating_add(found);
                let entry = metrics::index_entry(m, prefix);
                entry.store_queries = entry.store_queries.saturating_add(queries);
            }),

            MetricsEvent::CacheSet { .. } => metrics::with_state_mut(|m| {
                m.ops.cache_sets = m.ops.cache_sets.saturating_add(1);
            }),

            MetricsEvent::Invalidate { prefix, keys } => metrics::with_state_mut(|m| {
                m.ops.invalidations = m.ops.invalidations.saturating_add(keys);
                let entry = metrics::index_entry(m, prefix);
                entry.invalidations = entry.invalidations.saturating_add(keys);
            }),

            MetricsEvent::OffsetMiss { prefix } => metrics::with_state_mut(|m| {
                m.ops.offset_misses = m.ops.offset_misses.saturating_add(1);
                let entry = metrics::index_entry(m, prefix);
                entry.offset_misses = entry.offset_misses.saturating_add(1);
            }),

            MetricsEvent::ShallowMiss { dropped, .. } => metrics::with_state_mut(|m| {
                m.ops.shallow_misses = m.ops.shallow_misses.saturating_add(dropped);
            }),

            MetricsEvent::DecodeFailure { .. } => metrics::with_state_mut(|m| {
                m.ops.decode_failures = m.ops.decode_failures.saturating_add(1);
            }),

            MetricsEvent::StoreFallback { .. } => metrics::with_state_mut(|m| {
                m.ops.store_fallbacks = m.ops.store_fallbacks.saturating_add(1);
            }),
        }
    }
}

pub(crate) const GLOBAL_METRICS_SINK: GlobalMetricsSink = GlobalMetricsSink;

pub(crate) fn record(event: MetricsEvent<'_>) {
    let installed = SINK_OVERRIDE.with(|cell| cell.borrow().clone());
    match installed {
        Some(sink) => sink.record(event),
        None => GLOBAL_METRICS_SINK.record(event),
    }
}

/// Snapshot the current metrics state.
#[must_use]
pub fn metrics_report() -> EventReport {
    metrics::report()
}

/// Reset all metrics state.
pub fn metrics_reset_all() {
    metrics::reset_all();
}

/// Run a closure with a temporary metrics sink override.
///
/// The previous sink is restored on every exit, including unwind.
pub fn with_metrics_sink<T>(sink: Rc<dyn MetricsSink>, f: impl FnOnce() -> T) -> T {
    struct Guard(Option<Rc<dyn MetricsSink>>);

    impl Drop for Guard {
        fn drop(&mut self) {
            let prev = self.0.take();
            SINK_OVERRIDE.with(|cell| {
                *cell.borrow_mut() = prev;
            });
        }
    }

    let prev = SINK_OVERRIDE.with(|cell| cell.borrow_mut().replace(sink));
    let _guard = Guard(prev);

    f()
}

///
/// TESTS
///
