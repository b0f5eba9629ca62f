//! Metric definitions and metric sets
//!
//! A [`Metric`] is a named, unit-typed quantity a pipeline can measure. A
//! [`MetricSet`] holds the metrics of one or more packages and is usually
//! loaded from a package's `metrics/` directory, where each `<package>.yaml`
//! maps metric names to their definitions:
//!
//! ```yaml
//! PA1:
//!   description: Photometric repeatability.
//!   unit: mmag
//!   tags: [photometry, srd]
//!   reference: {doc: LPM-17, page: 21}
//! ```

mod metric;
mod metric_set;

pub use metric::{Metric, Reference};
pub use metric_set::MetricSet;
