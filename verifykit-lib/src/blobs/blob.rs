use crate::datum::{Datum, DatumMap};
use crate::{Error, Result};
use core::fmt::{Display, Formatter, Result as FmtResult};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// The opaque identifier of a [`Blob`].
///
/// Fresh identifiers are random v4 UUIDs in their 32-digit hex form. Identifiers
/// read from a document are kept as written.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlobId(String);

impl BlobId {
    #[must_use]
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().simple().to_string())
    }

    /// # Errors
    ///
    /// Returns [`Error::Identifier`] when `text` is empty.
    pub fn parse(text: &str) -> Result<Self> {
        if text.is_empty() {
            return Err(Error::Identifier {
                name: String::new(),
                reason: "blob identifiers cannot be empty".to_string(),
            });
        }
        Ok(Self(text.to_string()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for BlobId {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(&self.0)
    }
}

/// A named, identified bundle of datums supporting one or more measurements.
///
/// Equality compares identifier, name and contents. Every new blob gets a fresh
/// identifier, so two blobs built with the same name and contents are still distinct.
#[derive(Debug, Clone, PartialEq)]
pub struct Blob {
    identifier: BlobId,
    name: String,
    data: DatumMap,
}

impl Blob {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            identifier: BlobId::generate(),
            name: name.into(),
            data: DatumMap::new(),
        }
    }

    /// # Errors
    ///
    /// Returns [`Error::InvalidKey`] when `key` is empty.
    pub fn with_datum(mut self, key: impl Into<String>, datum: Datum) -> Result<Self> {
        let _ = self.insert(key, datum)?;
        Ok(self)
    }

    #[must_use]
    pub const fn identifier(&self) -> &BlobId {
        &self.identifier
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub const fn data(&self) -> &DatumMap {
        &self.data
    }

    /// Store `datum` under `key`, returning the datum it replaced.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidKey`] when `key` is empty.
    pub fn insert(&mut self, key: impl Into<String>, datum: Datum) -> Result<Option<Datum>> {
        self.data.insert(key, datum)
    }

    /// Store a datum given in its document form.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Type`] when `value` is not a datum document and
    /// [`Error::InvalidKey`] when `key` is empty. The blob is unchanged on error.
    pub fn insert_json(&mut self, key: impl Into<String>, value: &Value) -> Result<Option<Datum>> {
        let datum = Datum::from_json(value)?;
        self.insert(key, datum)
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Datum> {
        self.data.get(key)
    }

    #[must_use]
    pub fn get_mut(&mut self, key: &str) -> Option<&mut Datum> {
        self.data.get_mut(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<Datum> {
        self.data.remove(key)
    }

    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.data.contains_key(key)
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.data.len()
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Datum)> {
        self.data.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.data.keys()
    }

    #[must_use]
    pub fn to_json(&self) -> Value {
        json!({
            "identifier": self.identifier,
            "name": self.name,
            "data": self.data.to_json(),
        })
    }

    /// Rebuild a blob from [`Blob::to_json`] output, keeping its identifier.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Parse`] when the document is malformed.
    pub fn from_json(value: &Value) -> Result<Self> {
        let doc = BlobDocument::deserialize(value).map_err(|e| Error::parse("blob", e))?;
        Ok(Self {
            identifier: BlobId::parse(&doc.identifier).map_err(|e| e.in_document("blob"))?,
            name: doc.name,
            data: doc.data,
        })
    }
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct BlobDocument {
    identifier: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    data: DatumMap,
}

impl Display for Blob {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "<Blob {} ({}): {} fields>", self.name, self.identifier, self.len())
    }
}
