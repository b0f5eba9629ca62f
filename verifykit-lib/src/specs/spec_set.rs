use super::loader::load_specifications;
use super::{Outcome, Specification};
use crate::document::{FsPackage, PackageSource};
use crate::job::JobMetadata;
use crate::measurements::{Measurement, MeasurementSet};
use crate::metrics::MetricSet;
use crate::naming::{AsName, Name};
use crate::report::Report;
use crate::{Error, Result};
use camino::Utf8Path;
use core::fmt::{Display, Formatter, Result as FmtResult};
use serde_json::Value;
use std::collections::BTreeMap;

/// Specifications keyed by their full `package.metric.level` name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SpecificationSet {
    specs: BTreeMap<Name, Specification>,
}

/// Selects which specifications of a set apply, see [`SpecificationSet::subset`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SpecFilter<'a> {
    /// Keep specifications of this package or metric.
    pub name: Option<&'a Name>,

    /// Keep specifications whose metadata query matches this job metadata.
    pub meta: Option<&'a JobMetadata>,

    /// Keep specifications whose metadata query has every term of this metadata.
    pub required_meta: Option<&'a JobMetadata>,

    /// Keep specifications carrying all of these tags.
    pub spec_tags: &'a [String],

    /// Keep specifications whose metric carries all of these tags.
    ///
    /// Metrics are looked up in [`SpecFilter::metrics`]. A specification whose metric
    /// is not found there is dropped whenever this list is non-empty.
    pub metric_tags: &'a [String],

    /// The metrics consulted by [`SpecFilter::metric_tags`].
    pub metrics: Option<&'a MetricSet>,
}

impl SpecificationSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Load and resolve every specification under `<path>/specs/`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PackageStructure`] when there is no `specs/` directory,
    /// [`Error::Parse`] naming the file for an invalid document, and
    /// [`Error::Resolution`] when a level inherits from an unknown level or from itself.
    pub fn load_metrics_package(path: impl AsRef<Utf8Path>) -> Result<Self> {
        Self::from_source(&FsPackage::new(path.as_ref()))
    }

    /// Build a set from the specification documents offered by `source`.
    ///
    /// # Errors
    ///
    /// Fails like [`SpecificationSet::load_metrics_package`].
    pub fn from_source(source: &impl PackageSource) -> Result<Self> {
        let mut set = Self::new();
        for spec in load_specifications(source)? {
            set.insert(spec)?;
        }
        Ok(set)
    }

    /// # Errors
    ///
    /// Returns [`Error::Duplicate`] when a specification with the same name is present.
    pub fn insert(&mut self, spec: Specification) -> Result<()> {
        if self.specs.contains_key(spec.name()) {
            return Err(Error::Duplicate {
                kind: "specification",
                key: spec.name().to_string(),
            });
        }

        let _ = self.specs.insert(spec.name().clone(), spec);
        Ok(())
    }

    /// Whether a specification has this name. Metric and package names are never contained.
    #[must_use]
    pub fn contains<N: AsName + ?Sized>(&self, name: &N) -> bool {
        name.as_name().is_ok_and(|name| self.specs.contains_key(name.as_ref()))
    }

    /// # Errors
    ///
    /// Returns [`Error::Lookup`] for unknown names and for names that are not
    /// specification names, such as a bare `package.metric`.
    pub fn get<N: AsName + ?Sized>(&self, name: &N) -> Result<&Specification> {
        let name = name.as_name()?;
        if !name.is_spec() {
            return Err(Error::lookup("specification", name));
        }

        self.specs.get(name.as_ref()).ok_or_else(|| Error::lookup("specification", name))
    }

    /// # Errors
    ///
    /// Returns [`Error::Lookup`] when no specification has this name.
    pub fn remove<N: AsName + ?Sized>(&mut self, name: &N) -> Result<Specification> {
        let name = name.as_name()?;
        self.specs.remove(name.as_ref()).ok_or_else(|| Error::lookup("specification", name))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.specs.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Specification> {
        self.specs.values()
    }

    pub fn names(&self) -> impl Iterator<Item = &Name> {
        self.specs.keys()
    }

    /// Add every specification of `other`, replacing those with the same name.
    pub fn update(&mut self, other: &Self) {
        for spec in other.iter() {
            let _ = self.specs.insert(spec.name().clone(), spec.clone());
        }
    }

    /// Whether `measurement` passes specification `spec_name`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Lookup`] for an unknown specification, and otherwise fails like
    /// [`Specification::check`].
    pub fn check<N: AsName + ?Sized>(&self, measurement: &Measurement, spec_name: &N) -> Result<bool> {
        self.get(spec_name)?.check(measurement)
    }

    /// # Errors
    ///
    /// Returns [`Error::Lookup`] for an unknown specification, and otherwise fails like
    /// [`Specification::evaluate`].
    pub fn evaluate<N: AsName + ?Sized>(&self, measurement: &Measurement, spec_name: &N) -> Result<Outcome> {
        self.get(spec_name)?.evaluate(measurement)
    }

    /// The specifications selected by every filter set in `filter`.
    #[must_use]
    pub fn subset(&self, filter: &SpecFilter<'_>) -> Self {
        let specs = self
            .specs
            .iter()
            .filter(|(name, _)| filter.name.is_none_or(|scope| scope == *name || scope.contains(name)))
            .filter(|(_, spec)| filter.meta.is_none_or(|meta| spec.query_metadata(meta, false)))
            .filter(|(_, spec)| filter.required_meta.is_none_or(|meta| spec.query_metadata(meta, true)))
            .filter(|(_, spec)| filter.spec_tags.iter().all(|tag| spec.tags().contains(tag)))
            .filter(|(_, spec)| filter.metric_tags.is_empty() || metric_has_tags(filter, spec))
            .map(|(name, spec)| (name.clone(), spec.clone()))
            .collect();

        Self { specs }
    }

    /// Check that every specification's metric is in `metrics` and that every
    /// threshold is expressed in a unit convertible to its metric's unit.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Lookup`] for a missing metric or [`Error::UnitMismatch`] for an
    /// incompatible threshold, naming the first offending specification.
    pub fn validate_against(&self, metrics: &MetricSet) -> Result<()> {
        for spec in self.iter() {
            let metric = metrics.get(spec.metric_name()).map_err(|_e| Error::Lookup {
                kind: "metric",
                key: format!("{} (required by {})", spec.metric_name(), spec.name()),
            })?;

            if let Some(threshold) = spec.threshold_quantity()
                && !metric.check_unit(threshold)
            {
                return Err(Error::UnitMismatch {
                    from: format!("{} (threshold of {})", threshold.unit().display_symbol(), spec.name()),
                    to: metric.unit().display_symbol().to_string(),
                });
            }
        }

        Ok(())
    }

    /// Evaluate `measurements` against the specifications selected by `filter`.
    #[must_use]
    pub fn report(&self, measurements: &MeasurementSet, filter: &SpecFilter<'_>) -> Report {
        Report::new(measurements, &self.subset(filter))
    }

    #[must_use]
    pub fn to_json(&self) -> Value {
        Value::Array(self.iter().map(Specification::to_json).collect())
    }

    /// # Errors
    ///
    /// Fails when `value` is not an array of specification documents.
    pub fn from_json(value: &Value) -> Result<Self> {
        let items = value
            .as_array()
            .ok_or_else(|| Error::parse("specs", "expected an array of specification documents"))?;

        let mut set = Self::new();
        for item in items {
            set.insert(Specification::from_json(item)?)?;
        }
        Ok(set)
    }
}

impl Display for SpecificationSet {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self.len() {
            0 => write!(f, "<SpecificationSet: empty>"),
            1 => write!(f, "<SpecificationSet: 1 Specification>"),
            n => write!(f, "<SpecificationSet: {n} Specifications>"),
        }
    }
}

fn metric_has_tags(filter: &SpecFilter<'_>, spec: &Specification) -> bool {
    filter
        .metrics
        .and_then(|metrics| metrics.get(spec.metric_name()).ok())
        .is_some_and(|metric| filter.metric_tags.iter().all(|tag| metric.tags().contains(tag)))
}

impl<'a> IntoIterator for &'a SpecificationSet {
    type Item = &'a Specification;
    type IntoIter = std::collections::btree_map::Values<'a, Name, Specification>;

    fn into_iter(self) -> Self::IntoIter {
        self.specs.values()
    }
}
