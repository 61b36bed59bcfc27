//! Ride metrics and insights.
//!
//! This module turns a canonical [`RideTable`](crate::model::RideTable)
//! into the [`MetricsBundle`](types::MetricsBundle) consumed by the
//! dashboard, the charts and the PDF report, and derives the short
//! insight lines shown alongside it.

pub mod insights;
pub mod metrics;
pub mod types;
pub mod utility;

pub use insights::Insights;
pub use metrics::analyze;
pub use types::MetricsBundle;
