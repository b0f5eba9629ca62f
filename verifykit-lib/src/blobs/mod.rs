//! Identified bundles of auxiliary data
//!
//! A [`Blob`] holds datums that give context to a measurement, such as a
//! summary of the matched catalog it was computed from. Blobs live in a
//! [`BlobSet`] arena owned by a job; measurements keep only the [`BlobId`]
//! of each blob they use.

mod blob;
mod blob_set;

pub use blob::{Blob, BlobId};
pub use blob_set::BlobSet;
