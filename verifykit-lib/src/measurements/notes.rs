use crate::datum::{Datum, DatumMap};
use crate::naming::Name;
use crate::{Error, Result};

/// Free-form annotations of a measurement.
///
/// Keys are namespaced by the measured metric: inserting `"filter"` on a
/// measurement of `validate_drp.PA1` stores it as `"validate_drp.PA1.filter"`.
/// Lookups accept either form.
#[derive(Debug, Clone, PartialEq)]
pub struct Notes {
    prefix: String,
    entries: DatumMap,
}

impl Notes {
    pub(super) fn new(metric: &Name) -> Self {
        Self {
            prefix: format!("{metric}."),
            entries: DatumMap::new(),
        }
    }

    fn qualify(&self, key: &str) -> String {
        if key.starts_with(&self.prefix) {
            key.to_string()
        } else {
            format!("{}{key}", self.prefix)
        }
    }

    /// # Errors
    ///
    /// Returns [`Error::InvalidKey`] when `key` is empty.
    pub fn insert(&mut self, key: &str, datum: Datum) -> Result<Option<Datum>> {
        if key.is_empty() {
            return Err(Error::InvalidKey(String::new()));
        }
        self.entries.insert(self.qualify(key), datum)
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Datum> {
        self.entries.get(&self.qualify(key))
    }

    pub fn remove(&mut self, key: &str) -> Option<Datum> {
        let key = self.qualify(key);
        self.entries.remove(&key)
    }

    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(&self.qualify(key))
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries with their full, namespaced keys.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Datum)> {
        self.entries.iter()
    }

    pub(super) fn extend_from(&mut self, entries: &DatumMap) -> Result<()> {
        for (key, datum) in entries.iter() {
            let _ = self.insert(key, datum.clone())?;
        }
        Ok(())
    }

    pub(super) const fn as_map(&self) -> &DatumMap {
        &self.entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::units::Quantity;

    #[test]
    fn test_keys_are_namespaced() {
        let mut notes = Notes::new(&Name::parse("validate_drp.PA1").unwrap());
        let _ = notes.insert("filter", Datum::from_quantity(Quantity::dimensionless(1.0))).unwrap();
        let _ = notes
            .insert("validate_drp.PA1.nvisits", Datum::from_quantity(Quantity::dimensionless(4.0)))
            .unwrap();

        assert_eq!(notes.iter().map(|(k, _)| k).collect::<Vec<_>>(), ["validate_drp.PA1.filter", "validate_drp.PA1.nvisits"]);
        assert!(notes.contains_key("filter"));
        assert!(notes.contains_key("validate_drp.PA1.filter"));
        assert_eq!(notes.get("nvisits").unwrap().label(), Some("validate_drp.PA1.nvisits"));

        let _ = notes.remove("filter").unwrap();
        assert_eq!(notes.len(), 1);
        assert!(notes.insert("", Datum::from_quantity(Quantity::dimensionless(1.0))).is_err());
    }
}
