use super::Measurement;
use crate::blobs::BlobId;
use crate::metrics::MetricSet;
use crate::naming::{AsName, Name};
use crate::{Error, Result};
use core::fmt::{Display, Formatter, Result as FmtResult};
use serde_json::Value;
use std::collections::BTreeMap;

const LOG_TARGET: &str = "  measures";

/// Measurements keyed by the metric they measure.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeasurementSet {
    measurements: BTreeMap<Name, Measurement>,
}

impl MeasurementSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `measurement`, returning the measurement of the same metric it replaced.
    pub fn insert(&mut self, measurement: Measurement) -> Option<Measurement> {
        self.measurements.insert(measurement.metric_name().clone(), measurement)
    }

    /// # Errors
    ///
    /// Returns [`Error::Lookup`] when no measurement of this metric exists.
    pub fn get<N: AsName + ?Sized>(&self, name: &N) -> Result<&Measurement> {
        let name = name.as_name()?;
        self.measurements.get(name.as_ref()).ok_or_else(|| Error::lookup("measurement", name))
    }

    /// # Errors
    ///
    /// Returns [`Error::Lookup`] when no measurement of this metric exists.
    pub fn get_mut<N: AsName + ?Sized>(&mut self, name: &N) -> Result<&mut Measurement> {
        let name = name.as_name()?;
        self.measurements.get_mut(name.as_ref()).ok_or_else(|| Error::lookup("measurement", name))
    }

    #[must_use]
    pub fn contains<N: AsName + ?Sized>(&self, name: &N) -> bool {
        name.as_name().is_ok_and(|name| self.measurements.contains_key(name.as_ref()))
    }

    /// # Errors
    ///
    /// Returns [`Error::Lookup`] when no measurement of this metric exists.
    pub fn remove<N: AsName + ?Sized>(&mut self, name: &N) -> Result<Measurement> {
        let name = name.as_name()?;
        self.measurements.remove(name.as_ref()).ok_or_else(|| Error::lookup("measurement", name))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.measurements.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.measurements.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Measurement> {
        self.measurements.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Measurement> {
        self.measurements.values_mut()
    }

    pub fn names(&self) -> impl Iterator<Item = &Name> {
        self.measurements.keys()
    }

    /// Add every measurement of `other`, replacing measurements of the same metric.
    pub fn update(&mut self, other: &Self) {
        for measurement in other.iter() {
            let _ = self.insert(measurement.clone());
        }
    }

    /// Every blob referenced by these measurements, once each, in order of first reference.
    #[must_use]
    pub fn blob_ids(&self) -> Vec<&BlobId> {
        let mut ids: Vec<&BlobId> = Vec::new();
        for id in self.iter().flat_map(Measurement::blob_ids) {
            if !ids.contains(&id) {
                ids.push(id);
            }
        }
        ids
    }

    /// Bind each measurement to its metric definition from `metrics`.
    ///
    /// Measurements of metrics missing from `metrics` are left unbound.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnitMismatch`] when a measured quantity is not convertible to its metric's unit.
    pub fn refresh_metrics(&mut self, metrics: &MetricSet) -> Result<()> {
        for measurement in self.measurements.values_mut() {
            match metrics.get(measurement.metric_name()) {
                Ok(metric) => measurement.bind_metric(metric.clone())?,
                Err(_) => log::debug!(target: LOG_TARGET, "No definition for measured metric '{}'", measurement.metric_name()),
            }
        }
        Ok(())
    }

    #[must_use]
    pub fn to_json(&self) -> Value {
        Value::Array(self.iter().map(Measurement::to_json).collect())
    }

    /// # Errors
    ///
    /// Fails when `value` is not an array of measurement documents.
    pub fn from_json(value: &Value) -> Result<Self> {
        let items = value
            .as_array()
            .ok_or_else(|| Error::parse("measurements", "expected an array of measurement documents"))?;

        let mut set = Self::new();
        for item in items {
            let measurement = Measurement::from_json(item)?;
            if set.contains(measurement.metric_name()) {
                return Err(Error::Duplicate {
                    kind: "measurement",
                    key: measurement.metric_name().to_string(),
                });
            }
            let _ = set.insert(measurement);
        }
        Ok(set)
    }
}

impl Display for MeasurementSet {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self.len() {
            0 => write!(f, "<MeasurementSet: empty>"),
            1 => write!(f, "<MeasurementSet: 1 Measurement>"),
            n => write!(f, "<MeasurementSet: {n} Measurements>"),
        }
    }
}

impl<'a> IntoIterator for &'a MeasurementSet {
    type Item = &'a Measurement;
    type IntoIter = std::collections::btree_map::Values<'a, Name, Measurement>;

    fn into_iter(self) -> Self::IntoIter {
        self.measurements.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::MemoryPackage;
    use crate::units::{Quantity, Unit};

    fn measurement(name: &str, value: f64, unit: &str) -> Measurement {
        Measurement::new(Name::parse(name).unwrap())
            .unwrap()
            .with_quantity(Quantity::new(value, Unit::parse(unit).unwrap()))
    }

    #[test]
    fn test_keyed_by_metric() {
        let mut set = MeasurementSet::new();
        assert!(set.insert(measurement("pkg.PA1", 3.0, "mmag")).is_none());
        assert!(set.insert(measurement("pkg.PA1", 4.0, "mmag")).is_some());
        assert_eq!(set.len(), 1);
        assert!(set.contains("pkg.PA1"));
        assert!(!set.contains("pkg.PA2"));
        assert!((set.get("pkg.PA1").unwrap().quantity().unwrap().value() - 4.0).abs() < f64::EPSILON);
        assert!(matches!(set.get("pkg.PA2"), Err(Error::Lookup { .. })));
    }

    #[test]
    fn test_blob_ids_in_first_reference_order() {
        let shared = BlobId::generate();
        let only_b = BlobId::generate();
        let mut set = MeasurementSet::new();
        let _ = set.insert(measurement("pkg.A", 1.0, "").with_blob(shared.clone()));
        let _ = set.insert(measurement("pkg.B", 1.0, "").with_blob(only_b.clone()).with_blob(shared.clone()));
        assert_eq!(set.blob_ids(), [&shared, &only_b]);
    }

    #[test]
    fn test_refresh_metrics() {
        let metrics = MetricSet::from_source(&MemoryPackage::new().with_metrics("pkg", "PA1: {unit: mmag}\nAM1: {unit: mas}\n")).unwrap();

        let mut set = MeasurementSet::new();
        let _ = set.insert(measurement("pkg.PA1", 3.0, "mmag"));
        let _ = set.insert(measurement("pkg.unknown", 3.0, ""));
        set.refresh_metrics(&metrics).unwrap();
        assert!(set.get("pkg.PA1").unwrap().metric().is_some());
        assert!(set.get("pkg.unknown").unwrap().metric().is_none());

        let _ = set.insert(measurement("pkg.AM1", 3.0, "mmag"));
        assert!(matches!(set.refresh_metrics(&metrics), Err(Error::UnitMismatch { .. })));
    }

    #[test]
    fn test_json_rejects_duplicate_metrics() {
        let m = measurement("pkg.PA1", 3.0, "mmag");
        let doc = Value::Array(vec![m.to_json(), m.to_json()]);
        assert!(matches!(MeasurementSet::from_json(&doc), Err(Error::Duplicate { .. })));
    }
}
