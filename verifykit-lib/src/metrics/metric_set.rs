use super::Metric;
use crate::document::{FsPackage, PackageSource, merge_all, parse_yaml_stream};
use crate::naming::{AsName, Name};
use crate::{Error, Result};
use camino::Utf8Path;
use core::fmt::{Display, Formatter, Result as FmtResult};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;

const LOG_TARGET: &str = "   metrics";

/// Metrics keyed by name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetricSet {
    metrics: BTreeMap<Name, Metric>,
}

impl MetricSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Load every metric defined under `<path>/metrics/`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PackageStructure`] when there is no `metrics/` directory and
    /// [`Error::Parse`] naming the file when any metric document is invalid.
    pub fn load_metrics_package(path: impl AsRef<Utf8Path>) -> Result<Self> {
        Self::from_source(&FsPackage::new(path.as_ref()))
    }

    /// Load the metrics of a single package file, whose stem names the package.
    ///
    /// # Errors
    ///
    /// Fails when the file cannot be read or any metric document is invalid.
    pub fn load_single_package(path: impl AsRef<Utf8Path>) -> Result<Self> {
        let path = path.as_ref();
        let package = path
            .file_stem()
            .ok_or_else(|| Error::PackageStructure(format!("'{path}' has no file name")))?;
        let text = fs::read_to_string(path).map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let mut set = Self::new();
        set.load_document(path.as_str(), package, &parse_yaml_stream(path.as_str(), &text)?)?;
        Ok(set)
    }

    /// Build a set from the metric documents offered by `source`.
    ///
    /// # Errors
    ///
    /// Fails on the first document that does not describe valid metrics.
    pub fn from_source(source: &impl PackageSource) -> Result<Self> {
        let mut set = Self::new();
        for doc in source.metric_documents()? {
            set.load_document(&doc.origin, &doc.package, &doc.documents)?;
        }

        log::info!(target: LOG_TARGET, "Loaded {} metrics", set.len());
        Ok(set)
    }

    fn load_document(&mut self, origin: &str, package: &str, documents: &[serde_yaml::Value]) -> Result<()> {
        let merged = merge_all(documents);
        let serde_yaml::Value::Mapping(entries) = merged else {
            return Err(Error::parse(origin, "expected a mapping of metric names to definitions"));
        };

        let mut count = 0;
        for (key, body) in &entries {
            let metric_name = key
                .as_str()
                .ok_or_else(|| Error::parse(origin, format!("metric names must be strings, found {key:?}")))?;

            let name = Name::for_metric(package, metric_name).map_err(|e| e.in_document(origin))?;
            let metric = Metric::from_yaml(name, body).map_err(|e| e.in_document(origin))?;
            let _ = self.insert(metric);
            count += 1;
        }

        log::debug!(target: LOG_TARGET, "Parsed {count} metrics from '{origin}'");
        Ok(())
    }

    /// Insert `metric`, returning any metric it replaced.
    pub fn insert(&mut self, metric: Metric) -> Option<Metric> {
        self.metrics.insert(metric.name().clone(), metric)
    }

    /// # Errors
    ///
    /// Returns [`Error::Lookup`] when no metric has this name.
    pub fn get<N: AsName + ?Sized>(&self, name: &N) -> Result<&Metric> {
        let name = name.as_name()?;
        self.metrics.get(name.as_ref()).ok_or_else(|| Error::lookup("metric", name))
    }

    #[must_use]
    pub fn contains<N: AsName + ?Sized>(&self, name: &N) -> bool {
        name.as_name().is_ok_and(|name| self.metrics.contains_key(name.as_ref()))
    }

    /// # Errors
    ///
    /// Returns [`Error::Lookup`] when no metric has this name.
    pub fn remove<N: AsName + ?Sized>(&mut self, name: &N) -> Result<Metric> {
        let name = name.as_name()?;
        self.metrics.remove(name.as_ref()).ok_or_else(|| Error::lookup("metric", name))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.metrics.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.metrics.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Metric> {
        self.metrics.values()
    }

    pub fn names(&self) -> impl Iterator<Item = &Name> {
        self.metrics.keys()
    }

    /// Add every metric of `other`, replacing metrics with the same name.
    pub fn update(&mut self, other: &Self) {
        for metric in other.iter() {
            let _ = self.insert(metric.clone());
        }
    }

    /// Metrics in `package` (if given) that carry all of `tags`.
    ///
    /// With neither filter the subset is empty.
    #[must_use]
    pub fn subset(&self, package: Option<&str>, tags: &[&str]) -> Self {
        if package.is_none() && tags.is_empty() {
            return Self::new();
        }

        let metrics = self
            .metrics
            .iter()
            .filter(|(name, _)| package.is_none_or(|p| name.package() == p))
            .filter(|(_, metric)| tags.iter().all(|tag| metric.tags().contains(*tag)))
            .map(|(name, metric)| (name.clone(), metric.clone()))
            .collect();

        Self { metrics }
    }

    #[must_use]
    pub fn to_json(&self) -> Value {
        Value::Array(self.iter().map(Metric::to_json).collect())
    }

    /// # Errors
    ///
    /// Fails when `value` is not an array of metric documents.
    pub fn from_json(value: &Value) -> Result<Self> {
        let items = value
            .as_array()
            .ok_or_else(|| Error::parse("metrics", "expected an array of metric documents"))?;

        let mut set = Self::new();
        for item in items {
            let _ = set.insert(Metric::from_json(item)?);
        }
        Ok(set)
    }
}

impl Display for MetricSet {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self.len() {
            0 => write!(f, "<MetricSet: empty>"),
            1 => write!(f, "<MetricSet: 1 Metric>"),
            n => write!(f, "<MetricSet: {n} Metrics>"),
        }
    }
}

impl<'a> IntoIterator for &'a MetricSet {
    type Item = &'a Metric;
    type IntoIter = std::collections::btree_map::Values<'a, Name, Metric>;

    fn into_iter(self) -> Self::IntoIter {
        self.metrics.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::MemoryPackage;

    const PKG_YAML: &str = r"
PA1:
  description: Photometric repeatability
  unit: mmag
  tags: [photometry, srd]
AM1:
  description: Astrometric repeatability
  unit: marcsec
  tags: [astrometry, srd]
";

    fn sample() -> MetricSet {
        MetricSet::from_source(&MemoryPackage::new().with_metrics("validate_drp", PKG_YAML).with_metrics("other", "M:\n  unit: s\n")).unwrap()
    }

    #[test]
    fn test_from_source() {
        let set = sample();
        assert_eq!(set.len(), 3);
        assert!(set.contains("validate_drp.PA1"));
        assert!(set.contains(&Name::parse("other.M").unwrap()));
        assert!(!set.contains("validate_drp"));
        assert!(!set.contains("bad..name"));
        assert_eq!(set.get("validate_drp.AM1").unwrap().unit().symbol(), "marcsec");
        assert!(matches!(set.get("validate_drp.PF1"), Err(Error::Lookup { .. })));
        assert_eq!(set.to_string(), "<MetricSet: 3 Metrics>");
    }

    #[test]
    fn test_multi_document_files_merge() {
        let yaml = "PA1:\n  unit: mmag\n  tags: [a]\n---\nPA1:\n  description: later\n  tags: [b]\n";
        let set = MetricSet::from_source(&MemoryPackage::new().with_metrics("pkg", yaml)).unwrap();
        let metric = set.get("pkg.PA1").unwrap();
        assert_eq!(metric.description(), "later");
        assert_eq!(metric.tags().len(), 2);
    }

    #[test]
    fn test_bad_document_aborts_load_with_file_name() {
        let source = MemoryPackage::new()
            .with_metrics("good", "M:\n  unit: s\n")
            .with_metrics("bad", "M:\n  unit: furlong\n");
        let err = MetricSet::from_source(&source).unwrap_err();
        assert!(matches!(&err, Error::Parse { origin, .. } if origin == "metrics/bad.yaml"), "{err}");
    }

    #[test]
    fn test_subset() {
        let set = sample();
        assert_eq!(set.subset(Some("validate_drp"), &[]).len(), 2);
        assert_eq!(set.subset(None, &["astrometry"]).len(), 1);
        assert_eq!(set.subset(Some("other"), &["srd"]).len(), 0);
        assert!(set.subset(None, &[]).is_empty());
    }

    #[test]
    fn test_update_and_remove() {
        let mut set = sample();
        let mut extra = MetricSet::new();
        let _ = extra.insert(Metric::new(Name::parse("other.N").unwrap(), crate::units::Unit::dimensionless(), "").unwrap());
        set.update(&extra);
        assert_eq!(set.len(), 4);

        let _ = set.remove("other.N").unwrap();
        assert_eq!(set.len(), 3);
        assert!(set.remove("other.N").is_err());
    }

    #[test]
    fn test_display_counts() {
        assert_eq!(MetricSet::new().to_string(), "<MetricSet: empty>");
        let set = sample().subset(Some("other"), &[]);
        assert_eq!(set.to_string(), "<MetricSet: 1 Metric>");
    }

    #[test]
    fn test_json_roundtrip() {
        let set = sample();
        assert_eq!(MetricSet::from_json(&set.to_json()).unwrap(), set);
    }

    #[test]
    fn test_load_single_package() {
        let dir = tempfile::tempdir().unwrap();
        let path = camino::Utf8PathBuf::from_path_buf(dir.path().join("validate_drp.yaml")).unwrap();
        fs::write(&path, PKG_YAML).unwrap();

        let set = MetricSet::load_single_package(&path).unwrap();
        assert_eq!(set.names().map(ToString::to_string).collect::<Vec<_>>(), ["validate_drp.AM1", "validate_drp.PA1"]);
    }
}
