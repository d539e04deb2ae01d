//! # Middleware Stack
//!
//! - [`metrics`]: Prometheus request metrics and the evaluation counters.

pub mod metrics;
