use super::JobMetadata;
use crate::blobs::{Blob, BlobId, BlobSet};
use crate::measurements::{Measurement, MeasurementSet};
use crate::metrics::MetricSet;
use crate::naming::AsName;
use crate::report::Report;
use crate::specs::{SpecFilter, SpecificationSet};
use crate::{Error, Result};
use camino::Utf8Path;
use serde::Deserialize;
use serde_json::{Value, json};
use std::fs;

const LOG_TARGET: &str = "       job";

/// The measurements of one pipeline run, with the definitions and data needed to interpret them.
///
/// Blobs are owned by the job and shared between measurements by identifier, so
/// changing a blob through [`Job::blob_mut`] is seen by every measurement that
/// refers to it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Job {
    meta: JobMetadata,
    measurements: MeasurementSet,
    metrics: MetricSet,
    specs: SpecificationSet,
    blobs: BlobSet,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct JobDocument {
    #[serde(default)]
    measurements: Value,
    #[serde(default)]
    metrics: Value,
    #[serde(default)]
    specs: Value,
    #[serde(default)]
    blobs: Value,
    #[serde(default)]
    meta: JobMetadata,
}

/// A missing or null section is an empty one.
fn section(value: Value) -> Value {
    if value.is_null() { Value::Array(Vec::new()) } else { value }
}

impl Job {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// An empty job carrying the metrics and specifications of the package at `path`.
    ///
    /// # Errors
    ///
    /// Fails like [`MetricSet::load_metrics_package`] and [`SpecificationSet::load_metrics_package`].
    pub fn load_metrics_package(path: impl AsRef<Utf8Path>) -> Result<Self> {
        let mut job = Self::new();
        job.reload_metrics_package(path)?;
        Ok(job)
    }

    /// Replace the job's metrics and specifications with those of the package at
    /// `path`, and rebind the measurements to the new metric definitions.
    ///
    /// # Errors
    ///
    /// Fails when the package cannot be loaded or a measurement's unit does not
    /// match its new metric definition. The job is unchanged on error.
    pub fn reload_metrics_package(&mut self, path: impl AsRef<Utf8Path>) -> Result<()> {
        let path = path.as_ref();
        let metrics = MetricSet::load_metrics_package(path)?;
        let specs = SpecificationSet::load_metrics_package(path)?;

        let mut measurements = self.measurements.clone();
        measurements.refresh_metrics(&metrics)?;

        log::info!(target: LOG_TARGET, "Loaded {} metrics and {} specifications from '{path}'", metrics.len(), specs.len());
        self.metrics = metrics;
        self.specs = specs;
        self.measurements = measurements;
        Ok(())
    }

    #[must_use]
    pub const fn meta(&self) -> &JobMetadata {
        &self.meta
    }

    pub const fn meta_mut(&mut self) -> &mut JobMetadata {
        &mut self.meta
    }

    #[must_use]
    pub const fn measurements(&self) -> &MeasurementSet {
        &self.measurements
    }

    #[must_use]
    pub const fn metrics(&self) -> &MetricSet {
        &self.metrics
    }

    pub const fn metrics_mut(&mut self) -> &mut MetricSet {
        &mut self.metrics
    }

    #[must_use]
    pub const fn specs(&self) -> &SpecificationSet {
        &self.specs
    }

    pub const fn specs_mut(&mut self) -> &mut SpecificationSet {
        &mut self.specs
    }

    #[must_use]
    pub const fn blobs(&self) -> &BlobSet {
        &self.blobs
    }

    /// Add `blob` to the job's arena, returning the identifier measurements refer to it by.
    pub fn insert_blob(&mut self, blob: Blob) -> BlobId {
        self.blobs.insert(blob)
    }

    /// # Errors
    ///
    /// Returns [`Error::Lookup`] when the job has no blob with this identifier.
    pub fn blob(&self, id: &BlobId) -> Result<&Blob> {
        self.blobs.get(id)
    }

    /// # Errors
    ///
    /// Returns [`Error::Lookup`] when the job has no blob with this identifier.
    pub fn blob_mut(&mut self, id: &BlobId) -> Result<&mut Blob> {
        self.blobs.get_mut(id)
    }

    /// Add `measurement`, replacing the measurement of the same metric.
    ///
    /// The measurement is bound to its metric when the job knows the metric.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Lookup`] when the measurement refers to a blob that is not
    /// in the job, and [`Error::UnitMismatch`] when its quantity does not fit its metric.
    pub fn insert_measurement(&mut self, mut measurement: Measurement) -> Result<Option<Measurement>> {
        for id in measurement.blob_ids() {
            if !self.blobs.contains(id) {
                return Err(Error::lookup("blob", id));
            }
        }

        if let Ok(metric) = self.metrics.get(measurement.metric_name()) {
            measurement.bind_metric(metric.clone())?;
        }

        Ok(self.measurements.insert(measurement))
    }

    /// Store `blob` in the job and link it to the measurement of `metric_name`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Lookup`] when there is no measurement of this metric.
    pub fn attach_blob<N: AsName + ?Sized>(&mut self, metric_name: &N, blob: Blob) -> Result<BlobId> {
        let measurement = self.measurements.get_mut(metric_name)?;
        let id = blob.identifier().clone();
        measurement.link_blob(id.clone());
        let _ = self.blobs.insert(blob);
        Ok(id)
    }

    /// # Errors
    ///
    /// Returns [`Error::Lookup`] when there is no measurement of this metric.
    pub fn measurement<N: AsName + ?Sized>(&self, metric_name: &N) -> Result<&Measurement> {
        self.measurements.get(metric_name)
    }

    /// # Errors
    ///
    /// Returns [`Error::Lookup`] when there is no measurement of this metric.
    pub fn measurement_mut<N: AsName + ?Sized>(&mut self, metric_name: &N) -> Result<&mut Measurement> {
        self.measurements.get_mut(metric_name)
    }

    /// Remove the measurement of `metric_name`. Blobs it referred to stay in the arena.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Lookup`] when there is no measurement of this metric.
    pub fn remove_measurement<N: AsName + ?Sized>(&mut self, metric_name: &N) -> Result<Measurement> {
        self.measurements.remove(metric_name)
    }

    /// Merge `other` into this job. Entries of `other` win on conflicts.
    pub fn update(&mut self, other: &Self) {
        self.meta.update(other.meta.iter().map(|(k, v)| (k.to_string(), v.clone())));
        self.blobs.update(&other.blobs);
        self.metrics.update(&other.metrics);
        self.specs.update(&other.specs);
        self.measurements.update(&other.measurements);
    }

    /// Evaluate the job's measurements against its specifications selected by `filter`.
    ///
    /// Metric tags in `filter` are checked against the job's metrics unless the
    /// filter names its own.
    #[must_use]
    pub fn report(&self, filter: &SpecFilter<'_>) -> Report {
        let filter = SpecFilter {
            metrics: filter.metrics.or(Some(&self.metrics)),
            ..*filter
        };
        self.specs.report(&self.measurements, &filter)
    }

    /// The JSON document of this job.
    ///
    /// Each blob referenced by a measurement is written once, in order of first
    /// reference; measurements list the identifiers of their blobs. Blobs that no
    /// measurement refers to are not written.
    #[must_use]
    pub fn to_json(&self) -> Value {
        let blobs: Vec<Value> = self
            .measurements
            .blob_ids()
            .into_iter()
            .filter_map(|id| self.blobs.get(id).ok())
            .map(Blob::to_json)
            .collect();

        json!({
            "measurements": self.measurements.to_json(),
            "metrics": self.metrics.to_json(),
            "specs": self.specs.to_json(),
            "blobs": blobs,
            "meta": self.meta,
        })
    }

    /// Rebuild a job from its JSON document.
    ///
    /// Blobs are read first so measurements can be checked against them; every
    /// measurement is bound to its metric when the document defines it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Parse`] for a malformed document and [`Error::Lookup`] when a
    /// measurement refers to a blob the document does not contain.
    pub fn from_json(value: &Value) -> Result<Self> {
        let doc = JobDocument::deserialize(value).map_err(|e| Error::parse("job", e))?;

        let blobs = BlobSet::from_json(&section(doc.blobs))?;
        let metrics = MetricSet::from_json(&section(doc.metrics))?;
        let specs = SpecificationSet::from_json(&section(doc.specs))?;
        let mut measurements = MeasurementSet::from_json(&section(doc.measurements))?;

        for measurement in measurements.iter() {
            if let Some(id) = measurement.blob_ids().iter().find(|id| !blobs.contains(id)) {
                return Err(Error::Lookup {
                    kind: "blob",
                    key: format!("{id} (referenced by {})", measurement.metric_name()),
                });
            }
        }
        measurements.refresh_metrics(&metrics)?;

        Ok(Self {
            meta: doc.meta,
            measurements,
            metrics,
            specs,
            blobs,
        })
    }

    /// Write the job's JSON document to `path`, creating parent directories as needed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] when the file cannot be written.
    pub fn write(&self, path: impl AsRef<Utf8Path>) -> Result<()> {
        let path = path.as_ref();
        let io_err = |source: std::io::Error| Error::Io {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent()
            && !parent.as_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(io_err)?;
        }

        let text = serde_json::to_string_pretty(&self.to_json()).map_err(|e| Error::parse(path.as_str(), e))?;
        fs::write(path, text).map_err(io_err)?;

        log::debug!(target: LOG_TARGET, "Wrote {} measurements to '{path}'", self.measurements.len());
        Ok(())
    }

    /// Read a job written by [`Job::write`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] when the file cannot be read, and fails like
    /// [`Job::from_json`] with errors naming the file.
    pub fn read(path: impl AsRef<Utf8Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let value: Value = serde_json::from_str(&text).map_err(|e| Error::parse(path.as_str(), e))?;
        Self::from_json(&value).map_err(|e| match e {
            Error::Parse { message, .. } => Error::parse(path.as_str(), message),
            other => other,
        })
    }
}
