use crate::{Error, Result};
use camino::{Utf8Path, Utf8PathBuf};
use serde::Deserialize;
use serde_yaml::Value;
use std::fs;

const LOG_TARGET: &str = "   package";

const METRICS_DIR: &str = "metrics";
const SPECS_DIR: &str = "specs";

/// One parsed YAML file of a metrics package.
#[derive(Debug, Clone)]
pub struct SourceDocument {
    /// Where the document came from, used in error messages.
    pub origin: String,

    /// Package the document belongs to.
    pub package: String,

    /// File stem: the package name for metric files, the metric name for spec files.
    pub stem: String,

    /// Every YAML document in the file, in order.
    pub documents: Vec<Value>,
}

/// Supplies the parsed documents of a metrics package to the loaders.
pub trait PackageSource {
    /// Documents defining metrics, one per package.
    ///
    /// # Errors
    ///
    /// Fails when the package has no metric documents to offer or one does not parse.
    fn metric_documents(&self) -> Result<Vec<SourceDocument>>;

    /// Documents defining specifications, one per metric.
    ///
    /// # Errors
    ///
    /// Fails when the package has no specification documents to offer or one does not parse.
    fn spec_documents(&self) -> Result<Vec<SourceDocument>>;
}

/// A metrics package laid out on disk as `metrics/<pkg>.yaml` and `specs/<pkg>/**/<metric>.yaml`.
#[derive(Debug, Clone)]
pub struct FsPackage {
    root: Utf8PathBuf,
}

impl FsPackage {
    #[must_use]
    pub fn new(root: impl Into<Utf8PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    fn required_dir(&self, name: &str) -> Result<Utf8PathBuf> {
        let dir = self.root.join(name);
        if dir.is_dir() {
            Ok(dir)
        } else {
            Err(Error::PackageStructure(format!("'{}' has no {name}/ directory", self.root)))
        }
    }
}

impl PackageSource for FsPackage {
    fn metric_documents(&self) -> Result<Vec<SourceDocument>> {
        let dir = self.required_dir(METRICS_DIR)?;

        let mut files = Vec::new();
        for entry in dir.read_dir_utf8().map_err(|source| Error::Io { path: dir.clone(), source })? {
            let entry = entry.map_err(|source| Error::Io { path: dir.clone(), source })?;
            if entry.path().is_file() && is_yaml(entry.path()) {
                files.push(entry.into_path());
            }
        }
        files.sort();

        files
            .iter()
            .map(|path| {
                let stem = file_stem(path)?;
                read_document(path, &stem, stem.clone())
            })
            .collect()
    }

    fn spec_documents(&self) -> Result<Vec<SourceDocument>> {
        let dir = self.required_dir(SPECS_DIR)?;
        let mut docs = Vec::new();

        for entry in walkdir::WalkDir::new(&dir).follow_links(false).sort_by_file_name().min_depth(1) {
            let entry = entry.map_err(|e| Error::Io {
                path: dir.clone(),
                source: e.into(),
            })?;

            if entry.file_type().is_dir() {
                continue;
            }

            let Some(path) = Utf8Path::from_path(entry.path()) else {
                log::warn!(target: LOG_TARGET, "Skipping non UTF-8 path '{}'", entry.path().display());
                continue;
            };

            if !is_yaml(path) {
                continue;
            }

            let Ok(relative) = path.strip_prefix(&dir) else {
                continue;
            };

            let mut components = relative.components();
            let package = match (components.next(), components.next()) {
                (Some(package), Some(_)) => package.as_str().to_string(),
                _ => {
                    log::warn!(target: LOG_TARGET, "Skipping '{path}': specification files must live in a package directory");
                    continue;
                }
            };

            docs.push(read_document(path, &package, file_stem(path)?)?);
        }

        Ok(docs)
    }
}

fn is_yaml(path: &Utf8Path) -> bool {
    matches!(path.extension(), Some("yaml" | "yml"))
}

fn file_stem(path: &Utf8Path) -> Result<String> {
    path.file_stem()
        .map(str::to_string)
        .ok_or_else(|| Error::PackageStructure(format!("'{path}' has no file name")))
}

fn read_document(path: &Utf8Path, package: &str, stem: String) -> Result<SourceDocument> {
    log::debug!(target: LOG_TARGET, "Reading '{path}'");

    let text = fs::read_to_string(path).map_err(|source| Error::Io {
        path: path.to_path_buf(),
        source,
    })?;

    Ok(SourceDocument {
        origin: path.to_string(),
        package: package.to_string(),
        stem,
        documents: parse_yaml_stream(path.as_str(), &text)?,
    })
}

/// Parse every document of a YAML stream, skipping empty ones.
///
/// # Errors
///
/// Returns [`Error::Parse`] naming `origin` when the text is not valid YAML.
pub(crate) fn parse_yaml_stream(origin: &str, text: &str) -> Result<Vec<Value>> {
    let mut documents = Vec::new();
    for de in serde_yaml::Deserializer::from_str(text) {
        let value = Value::deserialize(de).map_err(|e| Error::parse(origin, e))?;
        if !value.is_null() {
            documents.push(value);
        }
    }

    Ok(documents)
}

/// A package held in memory, keyed the same way as an on-disk package.
#[derive(Debug, Clone, Default)]
pub struct MemoryPackage {
    metrics: Vec<(String, String)>,
    specs: Vec<(String, String, String)>,
}

impl MemoryPackage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add the YAML text of the metric file for `package`.
    #[must_use]
    pub fn with_metrics(mut self, package: &str, yaml: &str) -> Self {
        self.metrics.push((package.to_string(), yaml.to_string()));
        self
    }

    /// Add the YAML text of the specification file for `package.metric`.
    #[must_use]
    pub fn with_specs(mut self, package: &str, metric: &str, yaml: &str) -> Self {
        self.specs.push((package.to_string(), metric.to_string(), yaml.to_string()));
        self
    }
}

impl PackageSource for MemoryPackage {
    fn metric_documents(&self) -> Result<Vec<SourceDocument>> {
        self.metrics
            .iter()
            .map(|(package, yaml)| {
                let origin = format!("{METRICS_DIR}/{package}.yaml");
                Ok(SourceDocument {
                    documents: parse_yaml_stream(&origin, yaml)?,
                    origin,
                    package: package.clone(),
                    stem: package.clone(),
                })
            })
            .collect()
    }

    fn spec_documents(&self) -> Result<Vec<SourceDocument>> {
        self.specs
            .iter()
            .map(|(package, metric, yaml)| {
                let origin = format!("{SPECS_DIR}/{package}/{metric}.yaml");
                Ok(SourceDocument {
                    documents: parse_yaml_stream(&origin, yaml)?,
                    origin,
                    package: package.clone(),
                    stem: metric.clone(),
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utf8(dir: &tempfile::TempDir) -> Utf8PathBuf {
        Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap()
    }

    #[test]
    fn test_missing_directories_are_structure_errors() {
        let dir = tempfile::tempdir().unwrap();
        let package = FsPackage::new(utf8(&dir));
        assert!(matches!(package.metric_documents(), Err(Error::PackageStructure(_))));
        assert!(matches!(package.spec_documents(), Err(Error::PackageStructure(_))));
    }

    #[test]
    fn test_reads_metric_files_in_name_order() {
        let dir = tempfile::tempdir().unwrap();
        let root = utf8(&dir);
        fs::create_dir_all(root.join("metrics")).unwrap();
        fs::write(root.join("metrics/b_pkg.yaml"), "M2:\n  unit: s\n").unwrap();
        fs::write(root.join("metrics/a_pkg.yml"), "M1:\n  unit: mag\n---\nM1:\n  description: x\n").unwrap();
        fs::write(root.join("metrics/README.md"), "ignored").unwrap();

        let docs = FsPackage::new(root).metric_documents().unwrap();
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].package, "a_pkg");
        assert_eq!(docs[0].documents.len(), 2);
        assert_eq!(docs[1].stem, "b_pkg");
    }

    #[test]
    fn test_spec_files_are_grouped_by_package_directory() {
        let dir = tempfile::tempdir().unwrap();
        let root = utf8(&dir);
        fs::create_dir_all(root.join("specs/pkg/nested")).unwrap();
        fs::write(root.join("specs/pkg/PA1.yaml"), "design: {operator: '<', value: 1}\n").unwrap();
        fs::write(root.join("specs/pkg/nested/AM1.yaml"), "design: {operator: '<', value: 1}\n").unwrap();
        fs::write(root.join("specs/stray.yaml"), "design: {}\n").unwrap();

        let docs = FsPackage::new(root).spec_documents().unwrap();
        let names: Vec<_> = docs.iter().map(|d| format!("{}.{}", d.package, d.stem)).collect();
        assert_eq!(names, ["pkg.PA1", "pkg.AM1"]);
    }

    #[test]
    fn test_malformed_yaml_names_the_file() {
        let source = MemoryPackage::new().with_metrics("pkg", "a: [unclosed\n");
        let err = source.metric_documents().unwrap_err();
        assert!(matches!(&err, Error::Parse { origin, .. } if origin == "metrics/pkg.yaml"));
    }
}
