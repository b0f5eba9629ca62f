//! The top-level job document
//!
//! A [`Job`] gathers the measurements of one pipeline run with the metrics and
//! specifications that interpret them, the blobs that support them, and free-form
//! [`JobMetadata`] describing the run.
//!
//! # Implementation Model
//!
//! The job owns a [`BlobSet`](crate::blobs::BlobSet) arena and measurements hold
//! only blob identifiers. The JSON form mirrors this: the `blobs` section holds
//! each blob once and measurements list identifiers, so sharing survives a
//! round trip without copying blob data.
//!
//! ```text
//! {
//!   "measurements": [{"metric": "pkg.PA1", "identifier": "...", "value": 3.0, "unit": "mmag",
//!                     "blobs": ["<blob id>"], "notes": {}}],
//!   "metrics": [...],
//!   "specs": [...],
//!   "blobs": [{"identifier": "<blob id>", "name": "matched", "data": {...}}],
//!   "meta": {"filter": "r"}
//! }
//! ```

mod document;
mod metadata;

pub use document::Job;
pub use metadata::JobMetadata;
