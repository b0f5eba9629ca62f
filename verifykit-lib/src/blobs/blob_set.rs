use super::{Blob, BlobId};
use crate::{Error, Result};
use core::fmt::{Display, Formatter, Result as FmtResult};
use serde_json::Value;
use std::collections::BTreeMap;

/// An arena of blobs addressed by identifier.
///
/// Measurements refer to blobs through their [`BlobId`], so one blob stored
/// here can back any number of measurements.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BlobSet {
    blobs: BTreeMap<BlobId, Blob>,
}

impl BlobSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `blob`, replacing any blob with the same identifier, and return its identifier.
    pub fn insert(&mut self, blob: Blob) -> BlobId {
        let id = blob.identifier().clone();
        let _ = self.blobs.insert(id.clone(), blob);
        id
    }

    /// # Errors
    ///
    /// Returns [`Error::Lookup`] when no blob has this identifier.
    pub fn get(&self, id: &BlobId) -> Result<&Blob> {
        self.blobs.get(id).ok_or_else(|| Error::lookup("blob", id))
    }

    /// # Errors
    ///
    /// Returns [`Error::Lookup`] when no blob has this identifier.
    pub fn get_mut(&mut self, id: &BlobId) -> Result<&mut Blob> {
        self.blobs.get_mut(id).ok_or_else(|| Error::lookup("blob", id))
    }

    /// The first blob, by identifier, whose name is `name`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Lookup`] when no blob has this name.
    pub fn get_by_name(&self, name: &str) -> Result<&Blob> {
        self.blobs
            .values()
            .find(|blob| blob.name() == name)
            .ok_or_else(|| Error::lookup("blob", name))
    }

    /// # Errors
    ///
    /// Returns [`Error::Lookup`] when no blob has this identifier.
    pub fn remove(&mut self, id: &BlobId) -> Result<Blob> {
        self.blobs.remove(id).ok_or_else(|| Error::lookup("blob", id))
    }

    #[must_use]
    pub fn contains(&self, id: &BlobId) -> bool {
        self.blobs.contains_key(id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.blobs.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.blobs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Blob> {
        self.blobs.values()
    }

    pub fn ids(&self) -> impl Iterator<Item = &BlobId> {
        self.blobs.keys()
    }

    /// Add every blob of `other`, replacing blobs with the same identifier.
    pub fn update(&mut self, other: &Self) {
        for blob in other.iter() {
            let _ = self.insert(blob.clone());
        }
    }

    #[must_use]
    pub fn to_json(&self) -> Value {
        Value::Array(self.iter().map(Blob::to_json).collect())
    }

    /// # Errors
    ///
    /// Fails when `value` is not an array of blob documents or when two documents
    /// share an identifier.
    pub fn from_json(value: &Value) -> Result<Self> {
        let items = value
            .as_array()
            .ok_or_else(|| Error::parse("blobs", "expected an array of blob documents"))?;

        let mut set = Self::new();
        for item in items {
            let blob = Blob::from_json(item)?;
            if set.contains(blob.identifier()) {
                return Err(Error::Duplicate {
                    kind: "blob",
                    key: blob.identifier().to_string(),
                });
            }
            let _ = set.insert(blob);
        }
        Ok(set)
    }
}

impl Display for BlobSet {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self.len() {
            0 => write!(f, "<BlobSet: empty>"),
            1 => write!(f, "<BlobSet: 1 Blob>"),
            n => write!(f, "<BlobSet: {n} Blobs>"),
        }
    }
}

impl<'a> IntoIterator for &'a BlobSet {
    type Item = &'a Blob;
    type IntoIter = std::collections::btree_map::Values<'a, BlobId, Blob>;

    fn into_iter(self) -> Self::IntoIter {
        self.blobs.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datum::Datum;
    use crate::units::Quantity;

    #[test]
    fn test_arena_lookup() {
        let mut set = BlobSet::new();
        let a = set.insert(Blob::new("photometry"));
        let b = set.insert(Blob::new("astrometry"));
        assert_eq!(set.len(), 2);
        assert_eq!(set.get(&a).unwrap().name(), "photometry");
        assert_eq!(set.get_by_name("astrometry").unwrap().identifier(), &b);
        assert!(matches!(set.get_by_name("missing"), Err(Error::Lookup { .. })));

        let _ = set.remove(&a).unwrap();
        assert!(!set.contains(&a));
        assert!(matches!(set.get(&a), Err(Error::Lookup { .. })));
    }

    #[test]
    fn test_mutation_through_arena() {
        let mut set = BlobSet::new();
        let id = set.insert(Blob::new("b"));
        let _ = set.get_mut(&id).unwrap().insert("n", Datum::from_quantity(Quantity::dimensionless(3.0))).unwrap();
        assert!(set.get(&id).unwrap().contains_key("n"));
    }

    #[test]
    fn test_json_roundtrip() {
        let mut set = BlobSet::new();
        let _ = set.insert(Blob::new("a"));
        let _ = set.insert(Blob::new("b"));
        let back = BlobSet::from_json(&set.to_json()).unwrap();
        assert_eq!(back, set);
        assert_eq!(back.to_string(), "<BlobSet: 2 Blobs>");
    }

    #[test]
    fn test_duplicate_identifiers_are_rejected() {
        let blob = Blob::new("a");
        let doc = Value::Array(vec![blob.to_json(), blob.to_json()]);
        assert!(matches!(BlobSet::from_json(&doc), Err(Error::Duplicate { .. })));
    }
}
