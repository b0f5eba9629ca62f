use super::Unit;
use crate::Result;
use core::fmt::{Display, Formatter, Result as FmtResult};

/// Relative tolerance for [`Quantity::approx_eq`].
const RELATIVE_TOLERANCE: f64 = 1e-7;

/// A value together with its unit.
#[derive(Debug, Clone, PartialEq)]
pub struct Quantity {
    value: f64,
    unit: Unit,
}

impl Quantity {
    #[must_use]
    pub const fn new(value: f64, unit: Unit) -> Self {
        Self { value, unit }
    }

    /// Shorthand for a value in the dimensionless unscaled unit.
    #[must_use]
    pub fn dimensionless(value: f64) -> Self {
        Self::new(value, Unit::dimensionless())
    }

    #[must_use]
    pub const fn value(&self) -> f64 {
        self.value
    }

    #[must_use]
    pub const fn unit(&self) -> &Unit {
        &self.unit
    }

    #[must_use]
    pub const fn is_nan(&self) -> bool {
        self.value.is_nan()
    }

    /// The numeric value expressed in `target`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::UnitMismatch`] when `target` is not equivalent to this quantity's unit.
    pub fn to(&self, target: &Unit) -> Result<f64> {
        Ok(self.value * self.unit.conversion_factor(target)?)
    }

    /// A new quantity expressed in `target`, carrying `target`'s symbol.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::UnitMismatch`] when `target` is not equivalent to this quantity's unit.
    pub fn convert_to(&self, target: &Unit) -> Result<Self> {
        Ok(Self::new(self.to(target)?, target.clone()))
    }

    #[must_use]
    pub fn is_equivalent(&self, unit: &Unit) -> bool {
        self.unit.is_equivalent(unit)
    }

    /// Approximate equality after converting `other` into this quantity's unit.
    ///
    /// Quantities in incompatible units are never approximately equal.
    #[must_use]
    pub fn approx_eq(&self, other: &Self) -> bool {
        let Ok(other_value) = other.to(&self.unit) else {
            return false;
        };

        if self.value == other_value {
            return true;
        }

        (self.value - other_value).abs() <= RELATIVE_TOLERANCE * other_value.abs()
    }
}

impl Display for Quantity {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        if self.unit.symbol().is_empty() {
            write!(f, "{}", self.value)
        } else {
            write!(f, "{} {}", self.value, self.unit)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    fn qty(value: f64, unit: &str) -> Quantity {
        Quantity::new(value, Unit::parse(unit).unwrap())
    }

    #[test]
    fn test_micro_to_milli_magnitudes() {
        let q = qty(3000.0, "µmag");
        let mmag = Unit::parse("mmag").unwrap();
        assert!((q.to(&mmag).unwrap() - 3.0).abs() < 1e-9);
        assert!(q.approx_eq(&qty(3.0, "mmag")));
    }

    #[test]
    fn test_convert_to_carries_target_symbol() {
        let converted = qty(1.5, "arcsec").convert_to(&Unit::parse("marcsec").unwrap()).unwrap();
        assert!((converted.value() - 1500.0).abs() < 1e-9);
        assert_eq!(converted.to_string(), "1500 marcsec");
    }

    #[test]
    fn test_incompatible_conversion_is_an_error() {
        let err = qty(1.0, "mag").to(&Unit::parse("s").unwrap()).unwrap_err();
        assert!(matches!(err, Error::UnitMismatch { .. }));
        assert!(!qty(1.0, "mag").approx_eq(&qty(1.0, "s")));
    }

    #[test]
    fn test_display_dimensionless() {
        assert_eq!(Quantity::dimensionless(0.25).to_string(), "0.25");
        assert_eq!(qty(5.0, "mmag").to_string(), "5 mmag");
    }

    #[test]
    fn test_nan_is_reported() {
        assert!(qty(f64::NAN, "mmag").is_nan());
        assert!(!qty(0.0, "mmag").is_nan());
    }
}
