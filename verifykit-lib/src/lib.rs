#![doc(hidden)]

//! Core library for verifykit
//!
//! This library holds the document model used to verify the output of
//! data-processing pipelines: unit-bearing metrics, pass/fail specifications
//! against those metrics, and jobs that bundle measurements, supporting data
//! blobs and provenance metadata for downstream reporting.
//!
//! # Module Organization
//!
//! - [`units`]: Units and quantities with dimension-aware conversion
//! - [`naming`]: Package-qualified metric and specification names
//! - [`datum`]: Labelled, unit-bearing values
//! - [`document`]: Package document sources and the recursive merge
//! - [`metrics`]: Metric definitions and metric sets
//! - [`specs`]: Specifications, their evaluation, and package loading
//! - [`blobs`]: Identified bundles of auxiliary data
//! - [`measurements`]: Measured values of metrics
//! - [`job`]: The top-level document and its JSON form
//! - [`report`]: Evaluating measurements against specifications
//! - `commands`: Command-line interface

pub type Result<T, E = Error> = core::result::Result<T, E>;

pub mod blobs;
pub mod datum;
pub mod document;
pub mod job;
pub mod measurements;
pub mod metrics;
pub mod naming;
pub mod report;
pub mod specs;
pub mod units;

mod error;

#[cfg(any(debug_assertions, test))]
pub mod commands;
#[cfg(not(any(debug_assertions, test)))]
mod commands;

pub use crate::commands::{Host, run};
pub use crate::error::Error;
