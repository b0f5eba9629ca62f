use super::{Comparison, DependencySpecification, MetadataQuery, Operator, ThresholdSpecification};
use crate::datum::DatumMap;
use crate::document::deserialize_tags;
use crate::job::JobMetadata;
use crate::measurements::Measurement;
use crate::naming::Name;
use crate::units::{Quantity, Unit};
use crate::{Error, Result};
use core::fmt::{Display, Formatter, Result as FmtResult};
use serde::Deserialize;
use serde_json::{Value, json};
use std::collections::{BTreeMap, BTreeSet};
use strum::Display as StrumDisplay;

const LOG_TARGET: &str = "     specs";

/// Result of evaluating a specification against a measurement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, StrumDisplay)]
pub enum Outcome {
    Pass,
    Fail,

    /// The measurement has no value, or its value is NaN.
    Unavailable,
}

/// Attributes shared by every kind of specification.
#[derive(Debug, Clone, PartialEq)]
pub struct SpecCommon {
    name: Name,
    metric: Name,
    tags: BTreeSet<String>,
    metadata_query: MetadataQuery,
}

impl SpecCommon {
    /// # Errors
    ///
    /// Returns [`Error::Identifier`] when `name` is not a specification name.
    pub fn new(name: Name) -> Result<Self> {
        if !name.is_spec() {
            return Err(Error::Identifier {
                name: name.to_string(),
                reason: "a specification name has the form package.metric.level".to_string(),
            });
        }

        Ok(Self {
            metric: name.metric_name()?,
            name,
            tags: BTreeSet::new(),
            metadata_query: MetadataQuery::default(),
        })
    }

    #[must_use]
    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags.extend(tags.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub fn with_metadata_query(mut self, metadata_query: MetadataQuery) -> Self {
        self.metadata_query = metadata_query;
        self
    }
}

/// A named pass/fail rule attached to a metric.
#[derive(Debug, Clone, PartialEq)]
pub enum Specification {
    Threshold(SpecCommon, ThresholdSpecification),
    Dependency(SpecCommon, DependencySpecification),
}

/// Shape shared by resolved YAML levels and JSON specification documents.
#[derive(Deserialize)]
struct SpecDocument {
    #[serde(default)]
    name: Option<Name>,
    #[serde(default, rename = "type")]
    kind: Option<String>,
    #[serde(default)]
    threshold: Option<ThresholdDocument>,
    #[serde(default)]
    operator: Option<Operator>,
    #[serde(default)]
    value: Option<f64>,
    #[serde(default)]
    unit: Option<String>,
    #[serde(default)]
    dependencies: Option<DatumMap>,
    #[serde(default)]
    compare_to: Option<String>,
    #[serde(default, deserialize_with = "deserialize_tags")]
    tags: BTreeSet<String>,
    #[serde(default)]
    metadata_query: Option<MetadataQuery>,
    #[serde(flatten)]
    extra: BTreeMap<String, Value>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct ThresholdDocument {
    #[serde(default)]
    operator: Option<Operator>,
    #[serde(default)]
    value: Option<f64>,
    #[serde(default)]
    unit: Option<String>,
}

impl Specification {
    /// # Errors
    ///
    /// Returns [`Error::Identifier`] when `name` is not a specification name.
    pub fn threshold(name: Name, threshold: Quantity, operator: Operator) -> Result<Self> {
        Ok(Self::Threshold(SpecCommon::new(name)?, ThresholdSpecification::new(threshold, operator)))
    }

    /// # Errors
    ///
    /// Returns [`Error::Identifier`] when `name` is not a specification name.
    pub fn dependency(name: Name, dependencies: DatumMap, comparison: Option<Comparison>) -> Result<Self> {
        Ok(Self::Dependency(SpecCommon::new(name)?, DependencySpecification::new(dependencies, comparison)))
    }

    #[must_use]
    pub fn with_tags<I, S>(self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.map_common(|common| common.with_tags(tags))
    }

    #[must_use]
    pub fn with_metadata_query(self, metadata_query: MetadataQuery) -> Self {
        self.map_common(|common| common.with_metadata_query(metadata_query))
    }

    fn map_common(self, f: impl FnOnce(SpecCommon) -> SpecCommon) -> Self {
        match self {
            Self::Threshold(common, spec) => Self::Threshold(f(common), spec),
            Self::Dependency(common, spec) => Self::Dependency(f(common), spec),
        }
    }

    #[must_use]
    pub const fn common(&self) -> &SpecCommon {
        match self {
            Self::Threshold(common, _) | Self::Dependency(common, _) => common,
        }
    }

    #[must_use]
    pub const fn name(&self) -> &Name {
        &self.common().name
    }

    /// Name of the metric this specification tests.
    #[must_use]
    pub const fn metric_name(&self) -> &Name {
        &self.common().metric
    }

    #[must_use]
    pub const fn tags(&self) -> &BTreeSet<String> {
        &self.common().tags
    }

    #[must_use]
    pub const fn metadata_query(&self) -> &MetadataQuery {
        &self.common().metadata_query
    }

    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::Threshold(..) => "threshold",
            Self::Dependency(..) => "dependency",
        }
    }

    /// The threshold quantity, when this is a threshold specification.
    #[must_use]
    pub const fn threshold_quantity(&self) -> Option<&Quantity> {
        match self {
            Self::Threshold(_, spec) => Some(spec.threshold()),
            Self::Dependency(..) => None,
        }
    }

    /// Whether this specification applies to a job with metadata `meta`.
    #[must_use]
    pub fn query_metadata(&self, meta: &JobMetadata, arg_driven: bool) -> bool {
        if arg_driven {
            self.metadata_query().matches_arg_driven(meta)
        } else {
            self.metadata_query().matches(meta)
        }
    }

    /// Whether `measurement` passes this specification.
    ///
    /// # Errors
    ///
    /// - [`Error::MeasurementUnavailable`] when the measurement has no value or a NaN value.
    /// - [`Error::UnitMismatch`] when the measurement's unit cannot be compared.
    /// - [`Error::NotEvaluable`] for a dependency specification without a comparison.
    pub fn check(&self, measurement: &Measurement) -> Result<bool> {
        let measured = measurement
            .quantity()
            .filter(|q| !q.is_nan())
            .ok_or_else(|| Error::MeasurementUnavailable(measurement.metric_name().to_string()))?;

        match self {
            Self::Threshold(_, spec) => spec.check_quantity(measured),
            Self::Dependency(common, spec) => spec
                .check_quantity(measured)?
                .ok_or_else(|| Error::NotEvaluable(common.name.to_string())),
        }
    }

    /// Evaluate `measurement`, reporting an unavailable measurement as an outcome rather than an error.
    ///
    /// # Errors
    ///
    /// Fails like [`Specification::check`] for anything other than an unavailable measurement.
    pub fn evaluate(&self, measurement: &Measurement) -> Result<Outcome> {
        match self.check(measurement) {
            Ok(true) => Ok(Outcome::Pass),
            Ok(false) => Ok(Outcome::Fail),
            Err(Error::MeasurementUnavailable(_)) => Ok(Outcome::Unavailable),
            Err(e) => Err(e),
        }
    }

    /// Build specification `name` from a resolved level document.
    ///
    /// A `threshold: {operator, value, unit}` block, or `operator` and `value` at the
    /// top level, make a threshold specification. A `dependencies` block makes a
    /// dependency specification, optionally compared through `operator` and `compare_to`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Type`] when the document matches neither shape.
    pub fn from_yaml(name: Name, doc: &serde_yaml::Value) -> Result<Self> {
        let doc: SpecDocument = serde_yaml::from_value(doc.clone()).map_err(|e| Error::Type(format!("specification '{name}': {e}")))?;
        Self::from_document(name, doc)
    }

    /// Build a specification from its JSON document.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Parse`] when the document is malformed.
    pub fn from_json(value: &Value) -> Result<Self> {
        const ORIGIN: &str = "specification document";

        let doc = SpecDocument::deserialize(value).map_err(|e| Error::parse(ORIGIN, e))?;
        let name = doc.name.clone().ok_or_else(|| Error::parse(ORIGIN, "missing 'name'"))?;
        Self::from_document(name, doc).map_err(|e| e.in_document(ORIGIN))
    }

    fn from_document(name: Name, doc: SpecDocument) -> Result<Self> {
        for key in doc.extra.keys() {
            log::warn!(target: LOG_TARGET, "Ignoring unknown key '{key}' in specification '{name}'");
        }

        let common = SpecCommon::new(name)?
            .with_tags(doc.tags)
            .with_metadata_query(doc.metadata_query.unwrap_or_default());
        let name = &common.name;

        let spec = if let Some(threshold) = doc.threshold {
            let (Some(operator), Some(value)) = (threshold.operator, threshold.value) else {
                return Err(Error::Type(format!("specification '{name}': a threshold needs both an operator and a value")));
            };
            let unit = Unit::parse(threshold.unit.as_deref().unwrap_or_default())?;
            Self::Threshold(common, ThresholdSpecification::new(Quantity::new(value, unit), operator))
        } else if let Some(dependencies) = doc.dependencies {
            let comparison = match (doc.operator, doc.compare_to) {
                (Some(operator), Some(compare_to)) => Some(Comparison { operator, compare_to }),
                (None, None) => None,
                _ => {
                    return Err(Error::Type(format!(
                        "specification '{name}': a dependency comparison needs both 'operator' and 'compare_to'"
                    )));
                }
            };
            Self::Dependency(common, DependencySpecification::new(dependencies, comparison))
        } else if let (Some(operator), Some(value)) = (doc.operator, doc.value) {
            let unit = Unit::parse(doc.unit.as_deref().unwrap_or_default())?;
            Self::Threshold(common, ThresholdSpecification::new(Quantity::new(value, unit), operator))
        } else {
            return Err(Error::Type(format!(
                "specification '{name}' defines neither a threshold (operator and value) nor dependencies"
            )));
        };

        if let Some(kind) = doc.kind
            && kind != spec.type_name()
        {
            return Err(Error::Type(format!(
                "specification '{}' is declared as '{kind}' but defines a {}",
                spec.name(),
                spec.type_name()
            )));
        }

        Ok(spec)
    }

    #[must_use]
    pub fn to_json(&self) -> Value {
        let common = self.common();
        let mut doc = json!({
            "name": common.name,
            "type": self.type_name(),
            "metadata_query": common.metadata_query,
            "tags": common.tags,
        });

        match self {
            Self::Threshold(_, spec) => {
                doc["threshold"] = json!({
                    "value": spec.threshold().value(),
                    "unit": spec.threshold().unit().symbol(),
                    "operator": spec.operator(),
                });
            }
            Self::Dependency(_, spec) => {
                doc["dependencies"] = spec.dependencies().to_json();
                if let Some(comparison) = spec.comparison() {
                    doc["operator"] = json!(comparison.operator);
                    doc["compare_to"] = json!(comparison.compare_to);
                }
            }
        }

        doc
    }
}

impl Display for Specification {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            Self::Threshold(_, spec) => write!(f, "{spec}"),
            Self::Dependency(_, spec) => match spec.comparison() {
                Some(comparison) => write!(f, "{} {}", comparison.operator, comparison.compare_to),
                None => {
                    let keys: Vec<&str> = spec.dependencies().keys().collect();
                    write!(f, "depends on {}", keys.join(", "))
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec_name() -> Name {
        Name::parse("pkg.PA1.design").unwrap()
    }

    fn yaml(text: &str) -> serde_yaml::Value {
        serde_yaml::from_str(text).unwrap()
    }

    fn measurement(value: f64, unit: &str) -> Measurement {
        Measurement::new(Name::parse("pkg.PA1").unwrap())
            .unwrap()
            .with_quantity(Quantity::new(value, Unit::parse(unit).unwrap()))
    }

    #[test]
    fn test_nested_threshold_block() {
        let spec = Specification::from_yaml(
            spec_name(),
            &yaml("threshold: {operator: '<', value: 5.0, unit: mmag}\ntags: [minimum]\n"),
        )
        .unwrap();
        assert_eq!(spec.type_name(), "threshold");
        assert_eq!(spec.metric_name().to_string(), "pkg.PA1");
        assert!(spec.tags().contains("minimum"));
        assert_eq!(spec.to_string(), "< 5 mmag");
    }

    #[test]
    fn test_flat_threshold() {
        let spec = Specification::from_yaml(spec_name(), &yaml("operator: '<='\nvalue: 10\nunit: marcsec\n")).unwrap();
        assert_eq!(spec.threshold_quantity().unwrap().unit().symbol(), "marcsec");
    }

    #[test]
    fn test_dependency_shape() {
        let doc = yaml("dependencies:\n  mag_limit: {value: 21.0, unit: mag}\noperator: '<'\ncompare_to: mag_limit\n");
        let spec = Specification::from_yaml(spec_name(), &doc).unwrap();
        assert_eq!(spec.type_name(), "dependency");
        assert!(spec.check(&measurement(20.0, "mag")).unwrap());
        assert_eq!(spec.to_string(), "< mag_limit");
    }

    #[test]
    fn test_unclassifiable_documents() {
        for text in ["tags: [x]\n", "threshold: {value: 3}\n", "dependencies: {}\noperator: '<'\n", "threshold: {operator: '~', value: 1}\n"] {
            assert!(Specification::from_yaml(spec_name(), &yaml(text)).is_err(), "{text:?} should be rejected");
        }
    }

    #[test]
    fn test_spec_name_required() {
        let err = Specification::threshold(Name::parse("pkg.PA1").unwrap(), Quantity::dimensionless(1.0), Operator::Lt).unwrap_err();
        assert!(matches!(err, Error::Identifier { .. }));
    }

    #[test]
    fn test_check_and_evaluate() {
        let spec = Specification::threshold(spec_name(), Quantity::new(5.0, Unit::parse("mmag").unwrap()), Operator::Lt).unwrap();

        assert_eq!(spec.evaluate(&measurement(3.0, "mmag")).unwrap(), Outcome::Pass);
        assert_eq!(spec.evaluate(&measurement(5.0, "mmag")).unwrap(), Outcome::Fail);
        assert_eq!(spec.evaluate(&measurement(7.0, "mmag")).unwrap(), Outcome::Fail);
        assert_eq!(spec.evaluate(&measurement(3000.0, "µmag")).unwrap(), Outcome::Pass);

        let nan = measurement(f64::NAN, "mmag");
        assert!(matches!(spec.check(&nan), Err(Error::MeasurementUnavailable(_))));
        assert_eq!(spec.evaluate(&nan).unwrap(), Outcome::Unavailable);

        let missing = Measurement::new(Name::parse("pkg.PA1").unwrap()).unwrap();
        assert_eq!(spec.evaluate(&missing).unwrap(), Outcome::Unavailable);

        assert!(matches!(spec.evaluate(&measurement(1.0, "arcsec")), Err(Error::UnitMismatch { .. })));
    }

    #[test]
    fn test_dependency_without_comparison_is_not_evaluable() {
        let spec = Specification::dependency(spec_name(), DatumMap::new(), None).unwrap();
        assert!(matches!(spec.check(&measurement(1.0, "mmag")), Err(Error::NotEvaluable(_))));
    }

    #[test]
    fn test_json_roundtrip() {
        let threshold = Specification::from_yaml(
            spec_name(),
            &yaml("threshold: {operator: '>=', value: 0.5, unit: ''}\nmetadata_query: {filter: r}\ntags: t\n"),
        )
        .unwrap();
        let doc = threshold.to_json();
        assert_eq!(doc["type"], json!("threshold"));
        assert_eq!(doc["threshold"]["operator"], json!(">="));
        assert_eq!(Specification::from_json(&doc).unwrap(), threshold);

        let dependency = Specification::from_yaml(
            Name::parse("pkg.PA1.stretch").unwrap(),
            &yaml("dependencies:\n  limit: {value: 3, unit: mmag}\noperator: '<'\ncompare_to: limit\n"),
        )
        .unwrap();
        assert_eq!(Specification::from_json(&dependency.to_json()).unwrap(), dependency);
    }

    #[test]
    fn test_declared_type_must_match_shape() {
        let doc = json!({"name": "pkg.PA1.design", "type": "dependency", "threshold": {"operator": "<", "value": 1, "unit": ""}});
        assert!(matches!(Specification::from_json(&doc), Err(Error::Parse { .. })));
    }

    #[test]
    fn test_query_metadata() {
        let spec = Specification::from_yaml(spec_name(), &yaml("operator: '<'\nvalue: 1\nmetadata_query: {filter: r}\n")).unwrap();
        let r: JobMetadata = [("filter", "r"), ("camera", "x")].into_iter().collect();
        let i: JobMetadata = [("filter", "i")].into_iter().collect();
        assert!(spec.query_metadata(&r, false));
        assert!(!spec.query_metadata(&i, false));
        assert!(!spec.query_metadata(&r, true));
    }
}
