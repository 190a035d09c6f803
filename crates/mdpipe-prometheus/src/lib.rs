//! Prometheus metrics for mdpipe batches.
//!
//! [`PrometheusMetrics`] is a [`mdpipe_core::Subscribe`] implementation: hand
//! it to the scheduler and it keeps counters for every job event it sees.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use mdpipe_core::Subscribe;
//! use mdpipe_prometheus::PrometheusMetrics;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let metrics = PrometheusMetrics::new()?;
//! let subscriber: Arc<dyn Subscribe> = Arc::new(metrics.clone());
//! // Scheduler::new(executor, cfg).with_subscribers(vec![subscriber]) ...
//! # let _ = subscriber;
//!
//! let text = metrics.encode_text()?;
//! assert!(text.contains("mdpipe_jobs_running"));
//! # Ok(())
//! # }
//! ```
//!
//! ## Metrics
//! - `mdpipe_jobs_dispatched_total` - Counter
//! - `mdpipe_jobs_started_total` - Counter
//! - `mdpipe_jobs_completed_total{status}` - Counter
//! - `mdpipe_jobs_running` - Gauge
//! - `mdpipe_job_duration_seconds` - Histogram
//!
//! ## Export
//! A batch is short-lived, so nothing here serves `/metrics`. Dump
//! [`PrometheusMetrics::encode_text`] to a file for the node exporter's
//! textfile collector, or push it wherever your setup expects it.

mod backend;
pub use backend::PrometheusMetrics;

pub use prometheus::{Encoder, Registry, TextEncoder};
