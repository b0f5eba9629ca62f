//! Labelled, unit-bearing values
//!
//! A [`Datum`] is the value type stored in blobs, metric parameters,
//! specification dependencies and measurement notes. Its document form, shared
//! by YAML packages and JSON jobs, is:
//!
//! ```text
//! {value: <number | [numbers] | string | bool | null>, unit: <string>, label: <string>, description: <string>}
//! ```
//!
//! Only `value` is required. Text, flag and null values always carry the
//! dimensionless unit.

use crate::units::{Quantity, Unit};
use crate::{Error, Result};
use core::fmt::{Display, Formatter, Result as FmtResult};
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Number, Value};

/// The payload of a [`Datum`].
#[derive(Debug, Clone, PartialEq)]
pub enum DatumValue {
    Quantity(Quantity),
    Array(Vec<f64>, Unit),
    Text(String),
    Flag(bool),
    Null,
}

impl DatumValue {
    /// The unit of a numeric payload.
    #[must_use]
    pub const fn unit(&self) -> Option<&Unit> {
        match self {
            Self::Quantity(q) => Some(q.unit()),
            Self::Array(_, unit) => Some(unit),
            _ => None,
        }
    }

    fn to_json(&self) -> Value {
        match self {
            Self::Quantity(q) => number(q.value()),
            Self::Array(values, _) => Value::Array(values.iter().copied().map(number).collect()),
            Self::Text(text) => Value::String(text.clone()),
            Self::Flag(flag) => Value::Bool(*flag),
            Self::Null => Value::Null,
        }
    }

    fn from_json(value: &Value, unit: &str) -> Result<Self> {
        let parse_unit = || Unit::parse(unit);
        Ok(match value {
            // a NaN quantity is written as null next to its unit
            Value::Null if !unit.trim().is_empty() => Self::Quantity(Quantity::new(f64::NAN, parse_unit()?)),
            Value::Null => Self::Null,
            Value::Bool(flag) => Self::Flag(*flag),
            Value::String(text) => Self::Text(text.clone()),
            Value::Number(n) => Self::Quantity(Quantity::new(as_f64(n), parse_unit()?)),
            Value::Array(items) => {
                let values = items
                    .iter()
                    .map(|item| match item {
                        Value::Number(n) => Ok(as_f64(n)),
                        Value::Null => Ok(f64::NAN),
                        other => Err(Error::Type(format!("array datum values must be numbers, found {other}"))),
                    })
                    .collect::<Result<Vec<_>>>()?;
                Self::Array(values, parse_unit()?)
            }
            Value::Object(_) => return Err(Error::Type("a datum value cannot be a mapping".to_string())),
        })
    }
}

/// Non-finite numbers have no JSON form and are written as null.
fn number(value: f64) -> Value {
    Number::from_f64(value).map_or(Value::Null, Value::Number)
}

fn as_f64(n: &Number) -> f64 {
    n.as_f64().unwrap_or(f64::NAN)
}

impl Display for DatumValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            Self::Quantity(q) => write!(f, "{q}"),
            Self::Array(values, unit) => {
                write!(f, "{values:?}")?;
                if !unit.symbol().is_empty() {
                    write!(f, " {unit}")?;
                }
                Ok(())
            }
            Self::Text(text) => write!(f, "{text}"),
            Self::Flag(flag) => write!(f, "{flag}"),
            Self::Null => write!(f, "null"),
        }
    }
}

/// A value with an optional display label and description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "DatumDocument", into = "DatumDocument")]
pub struct Datum {
    value: DatumValue,
    label: Option<String>,
    description: Option<String>,
}

#[derive(Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct DatumDocument {
    value: Value,
    #[serde(default)]
    unit: Option<String>,
    #[serde(default)]
    label: Option<String>,
    #[serde(default)]
    description: Option<String>,
}

impl TryFrom<DatumDocument> for Datum {
    type Error = Error;

    fn try_from(doc: DatumDocument) -> Result<Self> {
        Ok(Self {
            value: DatumValue::from_json(&doc.value, doc.unit.as_deref().unwrap_or_default())?,
            label: doc.label,
            description: doc.description,
        })
    }
}

impl From<Datum> for DatumDocument {
    fn from(datum: Datum) -> Self {
        Self {
            value: datum.value.to_json(),
            unit: Some(datum.value.unit().map(|u| u.symbol().to_string()).unwrap_or_default()),
            label: datum.label,
            description: datum.description,
        }
    }
}

impl Datum {
    #[must_use]
    pub const fn new(value: DatumValue) -> Self {
        Self {
            value,
            label: None,
            description: None,
        }
    }

    #[must_use]
    pub const fn from_quantity(quantity: Quantity) -> Self {
        Self::new(DatumValue::Quantity(quantity))
    }

    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Give the datum `key` as its label unless it already has one.
    #[must_use]
    pub fn labelled_or(mut self, key: &str) -> Self {
        if self.label.is_none() {
            self.label = Some(key.to_string());
        }
        self
    }

    #[must_use]
    pub const fn value(&self) -> &DatumValue {
        &self.value
    }

    /// The scalar quantity held by this datum, if it holds one.
    #[must_use]
    pub const fn quantity(&self) -> Option<&Quantity> {
        match &self.value {
            DatumValue::Quantity(q) => Some(q),
            _ => None,
        }
    }

    #[must_use]
    pub const fn unit(&self) -> Option<&Unit> {
        self.value.unit()
    }

    #[must_use]
    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    #[must_use]
    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }

    /// Build a datum from its document form.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Type`] when `value` is not a datum document.
    pub fn from_json(value: &Value) -> Result<Self> {
        Self::deserialize(value).map_err(|e| Error::Type(format!("not a datum document: {e}")))
    }
}

impl From<Quantity> for Datum {
    fn from(quantity: Quantity) -> Self {
        Self::from_quantity(quantity)
    }
}

impl Display for Datum {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match &self.label {
            Some(label) => write!(f, "{label}: {}", self.value),
            None => write!(f, "{}", self.value),
        }
    }
}

/// Datums keyed by field name, kept in insertion order.
///
/// Used for blob contents, metric parameters, specification dependencies and
/// measurement notes. Inserting a datum without a label labels it with its key.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DatumMap {
    entries: Vec<(String, Datum)>,
}

impl DatumMap {
    #[must_use]
    pub const fn new() -> Self {
        Self { entries: Vec::new() }
    }

    /// Insert or replace the datum stored under `key`, returning the previous one.
    ///
    /// A replaced entry keeps its position.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidKey`] when `key` is empty.
    pub fn insert(&mut self, key: impl Into<String>, datum: Datum) -> Result<Option<Datum>> {
        let key = key.into();
        if key.is_empty() {
            return Err(Error::InvalidKey(key));
        }

        let datum = datum.labelled_or(&key);
        if let Some((_, existing)) = self.entries.iter_mut().find(|(k, _)| *k == key) {
            return Ok(Some(core::mem::replace(existing, datum)));
        }

        self.entries.push((key, datum));
        Ok(None)
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Datum> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, d)| d)
    }

    #[must_use]
    pub fn get_mut(&mut self, key: &str) -> Option<&mut Datum> {
        self.entries.iter_mut().find(|(k, _)| k == key).map(|(_, d)| d)
    }

    pub fn remove(&mut self, key: &str) -> Option<Datum> {
        let index = self.entries.iter().position(|(k, _)| k == key)?;
        Some(self.entries.remove(index).1)
    }

    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.iter().any(|(k, _)| k == key)
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Datum)> {
        self.entries.iter().map(|(k, d)| (k.as_str(), d))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    /// Copy every entry of `other` into this map, replacing entries with the same key.
    pub fn extend_from(&mut self, other: &Self) {
        for (key, datum) in &other.entries {
            if let Some((_, existing)) = self.entries.iter_mut().find(|(k, _)| k == key) {
                existing.clone_from(datum);
            } else {
                self.entries.push((key.clone(), datum.clone()));
            }
        }
    }

    #[must_use]
    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

impl Serialize for DatumMap {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, datum) in &self.entries {
            map.serialize_entry(key, datum)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for DatumMap {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct DatumMapVisitor;

        impl<'de> Visitor<'de> for DatumMapVisitor {
            type Value = DatumMap;

            fn expecting(&self, f: &mut Formatter<'_>) -> FmtResult {
                f.write_str("a mapping of field names to datum documents")
            }

            fn visit_unit<E>(self) -> Result<DatumMap, E>
            where
                E: serde::de::Error,
            {
                Ok(DatumMap::new())
            }

            fn visit_map<A>(self, mut access: A) -> Result<DatumMap, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut map = DatumMap::new();
                while let Some((key, datum)) = access.next_entry::<String, Datum>()? {
                    let _ = map.insert(key, datum).map_err(serde::de::Error::custom)?;
                }
                Ok(map)
            }
        }

        deserializer.deserialize_any(DatumMapVisitor)
    }
}
