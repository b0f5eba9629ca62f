//! Measured values of metrics
//!
//! A [`Measurement`] reports one quantity for one metric, together with the
//! identifiers of the blobs that support it and free-form [`Notes`]. A
//! [`MeasurementSet`] holds at most one measurement per metric.

mod measurement;
mod measurement_set;
mod notes;

pub use measurement::Measurement;
pub use measurement_set::MeasurementSet;
pub use notes::Notes;
