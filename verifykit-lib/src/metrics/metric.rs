use crate::datum::DatumMap;
use crate::document::deserialize_tags;
use crate::naming::Name;
use crate::units::{Quantity, Unit};
use crate::{Error, Result};
use core::fmt::{Display, Formatter, Result as FmtResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;

/// Where a metric is specified.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Reference {
    #[serde(default)]
    pub doc: Option<String>,
    #[serde(default)]
    pub page: Option<u32>,
    #[serde(default)]
    pub url: Option<String>,
}

/// A named quantity that a pipeline can measure.
#[derive(Debug, Clone, PartialEq)]
pub struct Metric {
    name: Name,
    unit: Unit,
    description: String,
    tags: BTreeSet<String>,
    reference: Reference,
    parameters: DatumMap,
}

/// Document form of a metric: the body of a YAML entry, or a JSON element with its `name`.
#[derive(Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct MetricDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    name: Option<Name>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    unit: Option<String>,
    #[serde(default, deserialize_with = "deserialize_tags")]
    tags: BTreeSet<String>,
    #[serde(default)]
    reference: Option<Reference>,
    #[serde(default, skip_serializing_if = "DatumMap::is_empty")]
    parameters: DatumMap,
}

impl Metric {
    /// # Errors
    ///
    /// Returns [`Error::Identifier`] when `name` is not a metric name.
    pub fn new(name: Name, unit: Unit, description: impl Into<String>) -> Result<Self> {
        if !name.is_metric() {
            return Err(Error::Identifier {
                name: name.to_string(),
                reason: "a metric name has the form package.metric".to_string(),
            });
        }

        Ok(Self {
            name,
            unit,
            description: description.into(),
            tags: BTreeSet::new(),
            reference: Reference::default(),
            parameters: DatumMap::new(),
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
    pub fn with_reference(mut self, reference: Reference) -> Self {
        self.reference = reference;
        self
    }

    #[must_use]
    pub fn with_parameters(mut self, parameters: DatumMap) -> Self {
        self.parameters = parameters;
        self
    }

    /// Build the metric `name` from the body of its YAML entry.
    ///
    /// A `name` key inside the body is ignored in favour of `name`.
    ///
    /// # Errors
    ///
    /// Fails when the body has unknown keys, lacks a unit, or names an unknown unit.
    pub fn from_yaml(name: Name, body: &serde_yaml::Value) -> Result<Self> {
        let doc: MetricDocument = serde_yaml::from_value(body.clone()).map_err(|e| Error::Type(format!("metric '{name}': {e}")))?;
        Self::from_document(name, doc)
    }

    /// Build a metric from its JSON document, which carries its own `name`.
    ///
    /// # Errors
    ///
    /// Fails when the document is malformed, lacks a name or unit, or names an unknown unit.
    pub fn from_json(value: &Value) -> Result<Self> {
        let doc = MetricDocument::deserialize(value).map_err(|e| Error::parse("metric document", e))?;
        let name = doc
            .name
            .clone()
            .ok_or_else(|| Error::parse("metric document", "missing 'name'"))?;
        Self::from_document(name, doc)
    }

    fn from_document(name: Name, doc: MetricDocument) -> Result<Self> {
        let unit = doc
            .unit
            .ok_or_else(|| Error::Type(format!("metric '{name}' has no unit")))?;
        let description = doc.description.unwrap_or_default().trim_end_matches('\n').to_string();

        Ok(Self::new(name, Unit::parse(&unit)?, description)?
            .with_tags(doc.tags)
            .with_reference(doc.reference.unwrap_or_default())
            .with_parameters(doc.parameters))
    }

    #[must_use]
    pub fn to_json(&self) -> Value {
        let doc = MetricDocument {
            name: Some(self.name.clone()),
            description: Some(self.description.clone()),
            unit: Some(self.unit.symbol().to_string()),
            tags: self.tags.clone(),
            reference: Some(self.reference.clone()),
            parameters: self.parameters.clone(),
        };

        serde_json::to_value(doc).unwrap_or(Value::Null)
    }

    #[must_use]
    pub const fn name(&self) -> &Name {
        &self.name
    }

    #[must_use]
    pub const fn unit(&self) -> &Unit {
        &self.unit
    }

    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    #[must_use]
    pub const fn tags(&self) -> &BTreeSet<String> {
        &self.tags
    }

    #[must_use]
    pub const fn reference(&self) -> &Reference {
        &self.reference
    }

    #[must_use]
    pub const fn parameters(&self) -> &DatumMap {
        &self.parameters
    }

    /// The reference as readable text, such as `LPM-17, p. 21, https://ls.st/LPM-17`.
    #[must_use]
    pub fn reference_text(&self) -> String {
        let Reference { doc, page, url } = &self.reference;
        let mut text = match (doc, page) {
            (Some(doc), Some(page)) => format!("{doc}, p. {page}"),
            (Some(doc), None) => doc.clone(),
            _ => String::new(),
        };

        match (doc, url) {
            (Some(_), Some(url)) => {
                text.push_str(", ");
                text.push_str(url);
            }
            (None, Some(url)) => text.clone_from(url),
            _ => {}
        }

        text
    }

    /// Whether `quantity` can be expressed in this metric's unit.
    #[must_use]
    pub fn check_unit(&self, quantity: &Quantity) -> bool {
        quantity.is_equivalent(&self.unit)
    }
}

impl Display for Metric {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{} ({}): {}", self.name, self.unit.display_symbol(), self.description)
    }
}
