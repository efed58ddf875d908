//! # Middleware
//!
//! - [`metrics`]: HTTP request metrics and the dispute event counter sink.

pub mod metrics;
