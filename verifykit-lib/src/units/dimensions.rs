use core::fmt::{Display, Formatter, Result as FmtResult};
use strum::{Display as StrumDisplay, EnumCount, EnumIter, IntoEnumIterator};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, EnumCount, StrumDisplay)]
#[strum(serialize_all = "snake_case")]
pub enum BaseDimension {
    Length,
    Time,
    Mass,
    Angle,
    Magnitude,
    Pixel,
    Count,
    Information,
}

/// Exponents of each [`BaseDimension`] making up a unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Dimensions([i8; BaseDimension::COUNT]);

impl Dimensions {
    pub const NONE: Self = Self([0; BaseDimension::COUNT]);

    #[must_use]
    pub const fn of(base: BaseDimension) -> Self {
        let mut exponents = [0; BaseDimension::COUNT];
        exponents[base as usize] = 1;
        Self(exponents)
    }

    #[must_use]
    pub const fn exponent(&self, base: BaseDimension) -> i8 {
        self.0[base as usize]
    }

    #[must_use]
    pub fn is_dimensionless(&self) -> bool {
        *self == Self::NONE
    }

    /// Combine with `other` raised to `power`, or `None` when an exponent leaves the `i8` range.
    #[must_use]
    pub fn combine(self, other: Self, power: i8) -> Option<Self> {
        let mut exponents = self.0;
        for (exponent, extra) in exponents.iter_mut().zip(other.0) {
            *exponent = exponent.checked_add(extra.checked_mul(power)?)?;
        }

        Some(Self(exponents))
    }
}

impl Display for Dimensions {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        if self.is_dimensionless() {
            return write!(f, "dimensionless");
        }

        let mut first = true;
        for base in BaseDimension::iter() {
            let exponent = self.exponent(base);
            if exponent == 0 {
                continue;
            }

            if !first {
                write!(f, " ")?;
            }
            first = false;

            if exponent == 1 {
                write!(f, "{base}")?;
            } else {
                write!(f, "{base}^{exponent}")?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_of_sets_single_exponent() {
        let dims = Dimensions::of(BaseDimension::Angle);
        assert_eq!(dims.exponent(BaseDimension::Angle), 1);
        assert_eq!(dims.exponent(BaseDimension::Time), 0);
        assert!(!dims.is_dimensionless());
    }

    #[test]
    fn test_combine_cancels_to_dimensionless() {
        let angle = Dimensions::of(BaseDimension::Angle);
        let ratio = angle.combine(angle, -1).unwrap();
        assert!(ratio.is_dimensionless());
    }

    #[test]
    fn test_display() {
        let dims = Dimensions::of(BaseDimension::Magnitude)
            .combine(Dimensions::of(BaseDimension::Angle), -2)
            .unwrap();
        assert_eq!(dims.to_string(), "angle^-2 magnitude");
        assert_eq!(Dimensions::NONE.to_string(), "dimensionless");
    }

    #[test]
    fn test_combine_overflow() {
        let time = Dimensions::of(BaseDimension::Time);
        let high = time.combine(time, 100).unwrap();
        assert_eq!(high.exponent(BaseDimension::Time), 101);
        assert!(high.combine(time, 100).is_none());
        assert!(Dimensions::NONE.combine(time, i8::MIN).is_some());
        assert!(time.combine(time, i8::MIN).is_some());
        assert!(Dimensions::NONE.combine(Dimensions::of(BaseDimension::Time).combine(time, -3).unwrap(), 100).is_none());
    }
}
