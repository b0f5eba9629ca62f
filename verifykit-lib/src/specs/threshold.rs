use crate::units::Quantity;
use crate::Result;
use core::fmt::{Display, Formatter, Result as FmtResult};
use serde::{Deserialize, Serialize};
use strum::{Display as StrumDisplay, EnumIter, EnumString};

/// Comparison applied as `measurement OP threshold`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, EnumString, StrumDisplay, Serialize, Deserialize)]
pub enum Operator {
    #[strum(serialize = "<")]
    #[serde(rename = "<")]
    Lt,
    #[strum(serialize = "<=")]
    #[serde(rename = "<=")]
    Le,
    #[strum(serialize = ">")]
    #[serde(rename = ">")]
    Gt,
    #[strum(serialize = ">=")]
    #[serde(rename = ">=")]
    Ge,
    #[strum(serialize = "==")]
    #[serde(rename = "==")]
    Eq,
    #[strum(serialize = "!=")]
    #[serde(rename = "!=")]
    Ne,
}

impl Operator {
    #[must_use]
    #[expect(clippy::float_cmp, reason = "exact comparison is what the operator asks for")]
    pub fn apply(self, lhs: f64, rhs: f64) -> bool {
        match self {
            Self::Lt => lhs < rhs,
            Self::Le => lhs <= rhs,
            Self::Gt => lhs > rhs,
            Self::Ge => lhs >= rhs,
            Self::Eq => lhs == rhs,
            Self::Ne => lhs != rhs,
        }
    }

    /// Compare `measured` against `threshold` in the threshold's unit.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::UnitMismatch`] when the units are not convertible.
    pub fn compare(self, measured: &Quantity, threshold: &Quantity) -> Result<bool> {
        Ok(self.apply(measured.to(threshold.unit())?, threshold.value()))
    }
}

/// A pass/fail test of a measurement against a fixed quantity.
#[derive(Debug, Clone)]
pub struct ThresholdSpecification {
    threshold: Quantity,
    operator: Operator,
}

impl ThresholdSpecification {
    #[must_use]
    pub const fn new(threshold: Quantity, operator: Operator) -> Self {
        Self { threshold, operator }
    }

    #[must_use]
    pub const fn threshold(&self) -> &Quantity {
        &self.threshold
    }

    #[must_use]
    pub const fn operator(&self) -> Operator {
        self.operator
    }

    /// Whether `measured` satisfies `measured OP threshold`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::UnitMismatch`] when `measured` cannot be expressed in the threshold's unit.
    pub fn check_quantity(&self, measured: &Quantity) -> Result<bool> {
        self.operator.compare(measured, &self.threshold)
    }
}

impl PartialEq for ThresholdSpecification {
    fn eq(&self, other: &Self) -> bool {
        self.operator == other.operator && self.threshold.approx_eq(&other.threshold)
    }
}

impl Display for ThresholdSpecification {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{} {}", self.operator, self.threshold)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use crate::units::Unit;
    use core::str::FromStr;
    use strum::IntoEnumIterator;

    fn qty(value: f64, unit: &str) -> Quantity {
        Quantity::new(value, Unit::parse(unit).unwrap())
    }

    #[test]
    fn test_strict_less_than() {
        let spec = ThresholdSpecification::new(qty(5.0, "mmag"), Operator::Lt);
        assert!(spec.check_quantity(&qty(3.0, "mmag")).unwrap());
        assert!(!spec.check_quantity(&qty(5.0, "mmag")).unwrap());
        assert!(!spec.check_quantity(&qty(7.0, "mmag")).unwrap());
        assert!(spec.check_quantity(&qty(3000.0, "µmag")).unwrap());
    }

    #[test]
    fn test_incompatible_units() {
        let spec = ThresholdSpecification::new(qty(5.0, "mmag"), Operator::Lt);
        let err = spec.check_quantity(&qty(3.0, "arcsec")).unwrap_err();
        assert!(matches!(err, Error::UnitMismatch { .. }));
    }

    #[test]
    fn test_operator_strings() {
        for op in Operator::iter() {
            assert_eq!(Operator::from_str(&op.to_string()).unwrap(), op);
            let json = serde_json::to_string(&op).unwrap();
            assert_eq!(json, format!("\"{op}\""));
        }
        assert!(Operator::from_str("=<").is_err());
    }

    #[test]
    fn test_operator_semantics() {
        assert!(Operator::Le.apply(5.0, 5.0));
        assert!(Operator::Ge.apply(5.0, 5.0));
        assert!(!Operator::Gt.apply(5.0, 5.0));
        assert!(Operator::Eq.apply(2.0, 2.0));
        assert!(Operator::Ne.apply(2.0, 3.0));
    }

    #[test]
    fn test_display() {
        let spec = ThresholdSpecification::new(qty(5.0, "mmag"), Operator::Le);
        assert_eq!(spec.to_string(), "<= 5 mmag");
    }
}
