mod insights;
mod summary;
pub mod views;

pub use insights::{INSUFFICIENT_DATA, KEEP_MONITORING};
pub use summary::ReportAggregator;
pub use views::{
    ClassificationCounts, DimensionAggregate, DomainReport, Report, ReportMetrics, ReportRecord,
};
