//! Package document sources and the recursive merge
//!
//! Metrics packages are trees of YAML documents. Everything that interprets
//! them goes through two pieces defined here:
//!
//! - [`merge`] and [`merge_all`], the override-merge used for multi-document
//!   metric files and for specification levels inheriting from one another,
//! - the [`PackageSource`] trait, which hands parsed documents to the loaders.
//!   [`FsPackage`] reads a package directory; [`MemoryPackage`] serves
//!   documents held in memory.
//!
//! # Implementation Model
//!
//! Documents are kept as [`serde_yaml::Value`] trees, whose mappings preserve
//! key order. Merging never mutates its inputs: the result is always a freshly
//! built value, so a document can be merged into many levels without copies
//! being taken by the caller.

mod merge;
mod source;

pub use merge::{merge, merge_all};
pub use source::{FsPackage, MemoryPackage, PackageSource, SourceDocument};
pub(crate) use source::parse_yaml_stream;

use serde::{Deserialize, Deserializer};
use std::collections::BTreeSet;

/// Deserialize tags written either as a single string or as a list of strings.
pub(crate) fn deserialize_tags<'de, D>(deserializer: D) -> Result<BTreeSet<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Tags {
        One(String),
        Many(Vec<String>),
        None(()),
    }

    Ok(match Tags::deserialize(deserializer)? {
        Tags::One(tag) => BTreeSet::from([tag]),
        Tags::Many(tags) => tags.into_iter().collect(),
        Tags::None(()) => BTreeSet::new(),
    })
}
