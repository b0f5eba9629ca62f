//! Specifications and their evaluation against measurements.
//!
//! A specification is a named pass/fail rule for one metric at one level, such as
//! `validate_drp.PA1.design`. Two kinds exist:
//!
//! - [`ThresholdSpecification`] compares the measured quantity against a fixed
//!   threshold with an [`Operator`], after converting units.
//! - [`DependencySpecification`] carries named [`Datum`](crate::datum::Datum)
//!   dependencies and optionally compares the measurement against one of them.
//!
//! # Implementation Model
//!
//! [`Specification`] is a tagged union over the two kinds, each carrying the
//! shared [`SpecCommon`] attributes. The kind is chosen from the shape of the
//! resolved level document when a package is loaded. Level documents of a
//! package are resolved by the loader, which merges the shared `base` block or
//! the inherited levels with each level's own body.

mod dependency;
mod loader;
mod metadata_query;
mod spec_set;
mod specification;
mod threshold;

pub use dependency::{Comparison, DependencySpecification};
pub use metadata_query::MetadataQuery;
pub use spec_set::{SpecFilter, SpecificationSet};
pub use specification::{Outcome, SpecCommon, Specification};
pub use threshold::{Operator, ThresholdSpecification};
