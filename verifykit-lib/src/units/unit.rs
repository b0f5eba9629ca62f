use super::{BaseDimension, Dimensions};
use crate::{Error, Result};
use compact_str::CompactString;
use core::f64::consts::PI;
use core::fmt::{Display, Formatter, Result as FmtResult};
use core::str::FromStr;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::sync::LazyLock;

/// Strings accepted for the dimensionless unscaled unit.
const DIMENSIONLESS_SYMBOLS: &[&str] = &["", "dimensionless_unscaled", "dimensionless"];

/// Relative tolerance used when comparing unit scales.
const SCALE_TOLERANCE: f64 = 1e-12;

static FACTOR_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?P<symbol>[^\d\s^+\-*/]+)\^?(?P<exponent>[+-]?\d+)?$").expect("valid unit factor pattern"));

struct NamedUnit {
    symbols: &'static [&'static str],
    scale: f64,
    dimension: Option<BaseDimension>,
    prefixable: bool,
}

const ARCSEC: f64 = PI / 648_000.0;

static NAMED_UNITS: &[NamedUnit] = &[
    NamedUnit { symbols: &["%", "percent"], scale: 0.01, dimension: None, prefixable: false },
    NamedUnit { symbols: &["rad"], scale: 1.0, dimension: Some(BaseDimension::Angle), prefixable: true },
    NamedUnit { symbols: &["deg"], scale: PI / 180.0, dimension: Some(BaseDimension::Angle), prefixable: false },
    NamedUnit { symbols: &["arcmin"], scale: PI / 10_800.0, dimension: Some(BaseDimension::Angle), prefixable: false },
    NamedUnit { symbols: &["arcsec"], scale: ARCSEC, dimension: Some(BaseDimension::Angle), prefixable: true },
    NamedUnit { symbols: &["mas"], scale: ARCSEC * 1e-3, dimension: Some(BaseDimension::Angle), prefixable: false },
    NamedUnit { symbols: &["mag"], scale: 1.0, dimension: Some(BaseDimension::Magnitude), prefixable: true },
    NamedUnit { symbols: &["s", "second"], scale: 1.0, dimension: Some(BaseDimension::Time), prefixable: true },
    NamedUnit { symbols: &["min"], scale: 60.0, dimension: Some(BaseDimension::Time), prefixable: false },
    NamedUnit { symbols: &["h", "hour"], scale: 3_600.0, dimension: Some(BaseDimension::Time), prefixable: false },
    NamedUnit { symbols: &["d", "day"], scale: 86_400.0, dimension: Some(BaseDimension::Time), prefixable: false },
    NamedUnit { symbols: &["yr", "year"], scale: 31_557_600.0, dimension: Some(BaseDimension::Time), prefixable: false },
    NamedUnit { symbols: &["m"], scale: 1.0, dimension: Some(BaseDimension::Length), prefixable: true },
    NamedUnit { symbols: &["pc"], scale: 3.085_677_581_491_367_3e16, dimension: Some(BaseDimension::Length), prefixable: true },
    NamedUnit { symbols: &["AU", "au"], scale: 1.495_978_707e11, dimension: Some(BaseDimension::Length), prefixable: false },
    NamedUnit { symbols: &["Angstrom"], scale: 1e-10, dimension: Some(BaseDimension::Length), prefixable: false },
    NamedUnit { symbols: &["g"], scale: 1e-3, dimension: Some(BaseDimension::Mass), prefixable: true },
    NamedUnit { symbols: &["pix", "pixel"], scale: 1.0, dimension: Some(BaseDimension::Pixel), prefixable: false },
    NamedUnit { symbols: &["ct", "count", "electron"], scale: 1.0, dimension: Some(BaseDimension::Count), prefixable: false },
    NamedUnit { symbols: &["byte"], scale: 1.0, dimension: Some(BaseDimension::Information), prefixable: true },
    NamedUnit { symbols: &["bit"], scale: 0.125, dimension: Some(BaseDimension::Information), prefixable: false },
];

static PREFIXES: &[(&str, i32)] = &[
    ("n", -9),
    ("u", -6),
    ("µ", -6),
    ("m", -3),
    ("c", -2),
    ("d", -1),
    ("k", 3),
    ("M", 6),
    ("G", 9),
];

/// A physical unit parsed from its string form.
///
/// Equality compares scale and dimensions, so `mas` equals `marcsec`.
#[derive(Debug, Clone)]
pub struct Unit {
    symbol: CompactString,
    scale: f64,
    dimensions: Dimensions,
}

impl Unit {
    /// Parse a unit string such as `mmag`, `arcsec2` or `mag / arcsec^2`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownUnit`] when any factor is not a known unit.
    pub fn parse(text: &str) -> Result<Self> {
        let trimmed = text.trim();
        if DIMENSIONLESS_SYMBOLS.contains(&trimmed) {
            return Ok(Self::dimensionless());
        }

        let unknown = || Error::UnknownUnit(text.to_string());
        let mut scale = 1.0;
        let mut dimensions = Dimensions::NONE;

        for (index, part) in trimmed.split('/').enumerate() {
            let sign: i8 = if index == 0 { 1 } else { -1 };
            let mut factors = part.split(|c: char| c.is_whitespace() || c == '*').filter(|f| !f.is_empty()).peekable();
            if factors.peek().is_none() {
                return Err(unknown());
            }

            for factor in factors {
                if factor == "1" {
                    continue;
                }

                let captures = FACTOR_PATTERN.captures(factor).ok_or_else(unknown)?;
                let (factor_scale, factor_dims) = lookup_symbol(&captures["symbol"]).ok_or_else(unknown)?;
                let exponent = match captures.name("exponent") {
                    Some(m) => m.as_str().parse::<i8>().ok().ok_or_else(unknown)?,
                    None => 1,
                };

                let power = exponent.checked_mul(sign).ok_or_else(unknown)?;
                scale *= factor_scale.powi(i32::from(power));
                dimensions = dimensions.combine(factor_dims, power).ok_or_else(unknown)?;
            }
        }

        Ok(Self {
            symbol: CompactString::from(trimmed),
            scale,
            dimensions,
        })
    }

    #[must_use]
    pub fn dimensionless() -> Self {
        Self {
            symbol: CompactString::const_new(""),
            scale: 1.0,
            dimensions: Dimensions::NONE,
        }
    }

    /// The unit as written, with the dimensionless unit rendered as an empty string.
    #[must_use]
    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    #[must_use]
    pub const fn scale(&self) -> f64 {
        self.scale
    }

    #[must_use]
    pub const fn dimensions(&self) -> Dimensions {
        self.dimensions
    }

    #[must_use]
    pub fn is_dimensionless(&self) -> bool {
        self.dimensions.is_dimensionless()
    }

    /// Whether values in this unit can be converted to `other`.
    #[must_use]
    pub fn is_equivalent(&self, other: &Self) -> bool {
        self.dimensions == other.dimensions
    }

    /// Factor that converts a value in this unit into `target`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnitMismatch`] when the units have different dimensions.
    pub fn conversion_factor(&self, target: &Self) -> Result<f64> {
        if !self.is_equivalent(target) {
            return Err(Error::UnitMismatch {
                from: self.display_symbol().to_string(),
                to: target.display_symbol().to_string(),
            });
        }

        Ok(self.scale / target.scale)
    }

    /// Symbol used in human-facing messages, naming the dimensionless unit explicitly.
    #[must_use]
    pub fn display_symbol(&self) -> &str {
        if self.symbol.is_empty() { "dimensionless_unscaled" } else { &self.symbol }
    }
}

fn lookup_symbol(symbol: &str) -> Option<(f64, Dimensions)> {
    let dims_of = |unit: &NamedUnit| unit.dimension.map_or(Dimensions::NONE, Dimensions::of);

    if let Some(unit) = NAMED_UNITS.iter().find(|u| u.symbols.contains(&symbol)) {
        return Some((unit.scale, dims_of(unit)));
    }

    PREFIXES.iter().find_map(|(prefix, exponent)| {
        let rest = symbol.strip_prefix(prefix)?;
        let unit = NAMED_UNITS.iter().find(|u| u.prefixable && u.symbols.contains(&rest))?;
        Some((unit.scale * 10f64.powi(*exponent), dims_of(unit)))
    })
}

impl PartialEq for Unit {
    fn eq(&self, other: &Self) -> bool {
        self.dimensions == other.dimensions && (self.scale - other.scale).abs() <= SCALE_TOLERANCE * self.scale.abs().max(other.scale.abs())
    }
}

impl Default for Unit {
    fn default() -> Self {
        Self::dimensionless()
    }
}

impl Display for Unit {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.symbol)
    }
}

impl FromStr for Unit {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl Serialize for Unit {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.symbol)
    }
}

impl<'de> Deserialize<'de> for Unit {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let text = Option::<String>::deserialize(deserializer)?.unwrap_or_default();
        Self::parse(&text).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit(text: &str) -> Unit {
        Unit::parse(text).unwrap()
    }

    #[test]
    fn test_dimensionless_spellings() {
        for text in ["", "  ", "dimensionless_unscaled", "dimensionless"] {
            let u = unit(text);
            assert!(u.is_dimensionless(), "{text:?} should be dimensionless");
            assert_eq!(u.symbol(), "");
        }
    }

    #[test]
    fn test_prefixed_magnitudes() {
        let mmag = unit("mmag");
        let umag = unit("umag");
        let micro = unit("µmag");
        assert!(mmag.is_equivalent(&unit("mag")));
        assert!((umag.conversion_factor(&mmag).unwrap() - 1e-3).abs() < 1e-15);
        assert_eq!(umag, micro);
    }

    #[test]
    fn test_milliarcsecond_aliases() {
        assert_eq!(unit("mas"), unit("marcsec"));
        let factor = unit("arcsec").conversion_factor(&unit("marcsec")).unwrap();
        assert!((factor - 1000.0).abs() < 1e-9);
    }

    #[test]
    fn test_compound_units() {
        let surface = unit("mag / arcsec^2");
        let alt = unit("mag arcsec-2");
        assert_eq!(surface, alt);
        assert_eq!(surface.dimensions().exponent(BaseDimension::Angle), -2);
        assert_eq!(surface.dimensions().exponent(BaseDimension::Magnitude), 1);

        let area = unit("arcsec2");
        assert_eq!(area.dimensions().exponent(BaseDimension::Angle), 2);

        let rate = unit("1 / s");
        assert_eq!(rate.dimensions().exponent(BaseDimension::Time), -1);
    }

    #[test]
    fn test_exact_symbols_win_over_prefixes() {
        // `min` is a minute, not milli-inch; `m` is a metre; `d` is a day
        assert_eq!(unit("min").scale(), 60.0);
        assert_eq!(unit("m").dimensions().exponent(BaseDimension::Length), 1);
        assert_eq!(unit("d").scale(), 86_400.0);
        assert!((unit("ms").scale() - 1e-3).abs() < 1e-18);
    }

    #[test]
    fn test_percent_is_dimensionless() {
        let pct = unit("%");
        assert!(pct.is_dimensionless());
        assert!((pct.conversion_factor(&Unit::dimensionless()).unwrap() - 0.01).abs() < 1e-15);
    }

    #[test]
    fn test_unknown_units() {
        for text in ["furlong", "mag /", "deg^x", "kdeg", "/ s"] {
            assert!(
                matches!(Unit::parse(text), Err(Error::UnknownUnit(_))),
                "{text:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_exponent_overflow_is_unknown_unit() {
        for text in ["s^100 s^100", "1 / s^-128"] {
            assert!(
                matches!(Unit::parse(text), Err(Error::UnknownUnit(_))),
                "{text:?} should be rejected"
            );
        }
        assert_eq!(unit("s^100 / s^100"), Unit::dimensionless());
    }

    #[test]
    fn test_conversion_between_incompatible_units() {
        let err = unit("mmag").conversion_factor(&unit("arcsec")).unwrap_err();
        assert!(matches!(err, Error::UnitMismatch { .. }));
        assert_eq!(err.to_string(), "unit 'mmag' is not convertible to 'arcsec'");
    }

    #[test]
    fn test_serde_roundtrip_keeps_symbol() {
        let json = serde_json::to_string(&unit("marcsec")).unwrap();
        assert_eq!(json, "\"marcsec\"");
        let back: Unit = serde_json::from_str(&json).unwrap();
        assert_eq!(back.symbol(), "marcsec");

        let null: Unit = serde_json::from_str("null").unwrap();
        assert!(null.is_dimensionless());
    }
}
