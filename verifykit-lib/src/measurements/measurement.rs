use super::Notes;
use crate::blobs::BlobId;
use crate::datum::DatumMap;
use crate::metrics::Metric;
use crate::naming::Name;
use crate::units::{Quantity, Unit};
use crate::{Error, Result};
use core::fmt::{Display, Formatter, Result as FmtResult};
use serde::Deserialize;
use serde_json::{Number, Value, json};

/// A value measured for one metric.
///
/// A measurement refers to the blobs that support it by identifier; the blobs
/// themselves live in the owning [`Job`](crate::job::Job). Once a [`Metric`] is
/// bound, the measured quantity must be convertible to the metric's unit.
#[derive(Debug, Clone, PartialEq)]
pub struct Measurement {
    metric_name: Name,
    identifier: String,
    quantity: Option<Quantity>,
    metric: Option<Metric>,
    blobs: Vec<BlobId>,
    notes: Notes,
}

impl Measurement {
    /// # Errors
    ///
    /// Returns [`Error::Identifier`] when `metric_name` is not a metric name.
    pub fn new(metric_name: Name) -> Result<Self> {
        if !metric_name.is_metric() {
            return Err(Error::Identifier {
                name: metric_name.to_string(),
                reason: "a measurement is made of a package.metric".to_string(),
            });
        }

        Ok(Self {
            notes: Notes::new(&metric_name),
            metric_name,
            identifier: uuid::Uuid::new_v4().simple().to_string(),
            quantity: None,
            metric: None,
            blobs: Vec::new(),
        })
    }

    /// Set the measured quantity without checking it against a bound metric.
    ///
    /// Use [`Measurement::set_quantity`] once a metric is bound. A quantity that
    /// does not fit the bound metric is still written by [`Measurement::to_json`]
    /// in its own unit.
    #[must_use]
    pub fn with_quantity(mut self, quantity: Quantity) -> Self {
        self.quantity = Some(quantity);
        self
    }

    /// # Errors
    ///
    /// Fails like [`Measurement::bind_metric`].
    pub fn with_metric(mut self, metric: Metric) -> Result<Self> {
        self.bind_metric(metric)?;
        Ok(self)
    }

    #[must_use]
    pub fn with_blob(mut self, id: BlobId) -> Self {
        self.link_blob(id);
        self
    }

    #[must_use]
    pub const fn metric_name(&self) -> &Name {
        &self.metric_name
    }

    #[must_use]
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    #[must_use]
    pub const fn quantity(&self) -> Option<&Quantity> {
        self.quantity.as_ref()
    }

    #[must_use]
    pub const fn metric(&self) -> Option<&Metric> {
        self.metric.as_ref()
    }

    /// Replace the measured quantity.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnitMismatch`] when a metric is bound and `quantity` is not
    /// convertible to its unit. The measurement is unchanged on error.
    pub fn set_quantity(&mut self, quantity: Quantity) -> Result<()> {
        if let Some(metric) = &self.metric {
            check_unit(metric, &quantity)?;
        }
        self.quantity = Some(quantity);
        Ok(())
    }

    pub fn clear_quantity(&mut self) -> Option<Quantity> {
        self.quantity.take()
    }

    /// Bind the definition of the measured metric.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Identifier`] when `metric` has a different name, and
    /// [`Error::UnitMismatch`] when the current quantity is not convertible to
    /// the metric's unit.
    pub fn bind_metric(&mut self, metric: Metric) -> Result<()> {
        if metric.name() != &self.metric_name {
            return Err(Error::Identifier {
                name: metric.name().to_string(),
                reason: format!("cannot describe a measurement of '{}'", self.metric_name),
            });
        }

        if let Some(quantity) = &self.quantity {
            check_unit(&metric, quantity)?;
        }

        self.metric = Some(metric);
        Ok(())
    }

    #[must_use]
    pub fn blob_ids(&self) -> &[BlobId] {
        &self.blobs
    }

    /// Refer to blob `id`; a blob is referenced at most once.
    pub fn link_blob(&mut self, id: BlobId) {
        if !self.blobs.contains(&id) {
            self.blobs.push(id);
        }
    }

    /// Drop the reference to blob `id`, returning whether it was present.
    pub fn unlink_blob(&mut self, id: &BlobId) -> bool {
        let before = self.blobs.len();
        self.blobs.retain(|b| b != id);
        self.blobs.len() != before
    }

    #[must_use]
    pub const fn notes(&self) -> &Notes {
        &self.notes
    }

    pub const fn notes_mut(&mut self) -> &mut Notes {
        &mut self.notes
    }

    /// The quantity expressed in the bound metric's unit, or in its own unit when
    /// no metric is bound or the units are not convertible.
    fn normalized_quantity(&self) -> Option<Quantity> {
        let quantity = self.quantity.as_ref()?;
        let converted = self.metric.as_ref().and_then(|metric| quantity.convert_to(metric.unit()).ok());
        Some(converted.unwrap_or_else(|| quantity.clone()))
    }

    /// The JSON document of this measurement.
    ///
    /// The value is expressed in the bound metric's unit when it converts. A missing
    /// or NaN value is written as null.
    #[must_use]
    pub fn to_json(&self) -> Value {
        let quantity = self.normalized_quantity();
        let value = quantity
            .as_ref()
            .and_then(|q| Number::from_f64(q.value()))
            .map_or(Value::Null, Value::Number);
        let unit = quantity
            .as_ref()
            .map(Quantity::unit)
            .or_else(|| self.metric.as_ref().map(Metric::unit))
            .map_or(String::new(), |u| u.symbol().to_string());

        json!({
            "metric": self.metric_name,
            "identifier": self.identifier,
            "value": value,
            "unit": unit,
            "blobs": self.blobs,
            "notes": self.notes.as_map().to_json(),
        })
    }

    /// Rebuild a measurement from [`Measurement::to_json`] output.
    ///
    /// `blob_refs` is accepted in place of `blobs`. A null value leaves the quantity unset.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Parse`] when the document is malformed or names an unknown unit.
    pub fn from_json(value: &Value) -> Result<Self> {
        let doc = MeasurementDocument::deserialize(value).map_err(|e| Error::parse("measurement", e))?;
        Self::from_document(doc).map_err(|e| e.in_document("measurement"))
    }

    fn from_document(doc: MeasurementDocument) -> Result<Self> {
        let mut measurement = Self::new(doc.metric)?;
        if let Some(identifier) = doc.identifier.filter(|id| !id.is_empty()) {
            measurement.identifier = identifier;
        }

        if let Some(value) = doc.value {
            let unit = Unit::parse(doc.unit.as_deref().unwrap_or_default())?;
            measurement.quantity = Some(Quantity::new(value, unit));
        }

        for id in doc.blobs {
            measurement.link_blob(id);
        }
        measurement.notes.extend_from(&doc.notes)?;
        Ok(measurement)
    }
}

fn check_unit(metric: &Metric, quantity: &Quantity) -> Result<()> {
    if metric.check_unit(quantity) {
        Ok(())
    } else {
        Err(Error::UnitMismatch {
            from: quantity.unit().display_symbol().to_string(),
            to: metric.unit().display_symbol().to_string(),
        })
    }
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct MeasurementDocument {
    metric: Name,
    #[serde(default)]
    identifier: Option<String>,
    #[serde(default)]
    value: Option<f64>,
    #[serde(default)]
    unit: Option<String>,
    #[serde(default, alias = "blob_refs")]
    blobs: Vec<BlobId>,
    #[serde(default)]
    notes: DatumMap,
}

impl Display for Measurement {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match &self.quantity {
            Some(q) => write!(f, "{}: {q}", self.metric_name),
            None => write!(f, "{}: unavailable", self.metric_name),
        }
    }
}
