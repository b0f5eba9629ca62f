use super::Operator;
use crate::datum::{Datum, DatumMap};
use crate::units::Quantity;
use crate::{Error, Result};

/// Compares a measurement against one of the specification's dependencies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comparison {
    pub operator: Operator,
    pub compare_to: String,
}

/// A specification whose test draws on named configuration values.
///
/// Dependencies are looked up explicitly with [`DependencySpecification::dependency`].
/// Without a [`Comparison`] the specification only carries its dependencies and
/// cannot be evaluated on its own.
#[derive(Debug, Clone, PartialEq)]
pub struct DependencySpecification {
    dependencies: DatumMap,
    comparison: Option<Comparison>,
}

impl DependencySpecification {
    #[must_use]
    pub const fn new(dependencies: DatumMap, comparison: Option<Comparison>) -> Self {
        Self { dependencies, comparison }
    }

    #[must_use]
    pub const fn dependencies(&self) -> &DatumMap {
        &self.dependencies
    }

    #[must_use]
    pub const fn comparison(&self) -> Option<&Comparison> {
        self.comparison.as_ref()
    }

    /// # Errors
    ///
    /// Returns [`Error::Lookup`] when no dependency has this key.
    pub fn dependency(&self, key: &str) -> Result<&Datum> {
        self.dependencies.get(key).ok_or_else(|| Error::lookup("dependency", key))
    }

    /// The quantity `measured` is compared against, when a comparison is configured.
    ///
    /// # Errors
    ///
    /// Fails when the comparison names a missing dependency or one without a scalar quantity.
    pub fn comparison_target(&self) -> Result<Option<(Operator, &Quantity)>> {
        let Some(comparison) = &self.comparison else {
            return Ok(None);
        };

        let datum = self.dependency(&comparison.compare_to)?;
        let quantity = datum
            .quantity()
            .ok_or_else(|| Error::Type(format!("dependency '{}' is not a scalar quantity", comparison.compare_to)))?;

        Ok(Some((comparison.operator, quantity)))
    }

    /// Whether `measured` passes the configured comparison, or `None` without one.
    ///
    /// # Errors
    ///
    /// Fails when the compared dependency is unusable or its unit does not match.
    pub fn check_quantity(&self, measured: &Quantity) -> Result<Option<bool>> {
        match self.comparison_target()? {
            Some((operator, target)) => Ok(Some(operator.compare(measured, target)?)),
            None => Ok(None),
        }
    }
}
