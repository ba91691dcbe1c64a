//! Observability: index telemetry (metrics) and sink abstractions.
//!
//! Index logic records through `sink::record` only; nothing here may change
//! what an index returns.

pub(crate) mod metrics;
pub(crate) mod sink;

// re-exports
pub use metrics::{EventOps, EventReport, EventState, IndexCounters};
pub use sink::{MetricsEvent, MetricsSink, metrics_report, metrics_reset_all, with_metrics_sink};
