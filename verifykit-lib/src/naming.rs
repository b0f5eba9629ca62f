//! Package-qualified metric and specification names
//!
//! Every metric and specification is addressed by a dotted [`Name`]:
//!
//! - `pkg` names a package,
//! - `pkg.metric` names a metric inside that package,
//! - `pkg.metric.level` names one specification level of that metric.
//!
//! Names compare, order and hash by their components, which is the same as
//! comparing their canonical dotted strings. Collections keyed by names accept
//! either a [`Name`] or its string form through the [`AsName`] trait.

use crate::{Error, Result};
use compact_str::CompactString;
use core::fmt::{Display, Formatter, Result as FmtResult};
use core::str::FromStr;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::borrow::Cow;

/// A package, metric, or specification name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Name {
    package: CompactString,
    metric: Option<CompactString>,
    spec: Option<CompactString>,
}

impl Name {
    /// Parse a dotted name with one to three segments.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Identifier`] when the string is empty, has an empty or
    /// whitespace-bearing segment, or has more than three segments.
    pub fn parse(text: &str) -> Result<Self> {
        if text.is_empty() {
            return Err(invalid(text, "name is empty"));
        }

        let segments: Vec<&str> = text.split('.').collect();
        for segment in &segments {
            check_segment(text, segment)?;
        }

        match segments.as_slice() {
            [package] => Ok(Self::from_parts(package, None, None)),
            [package, metric] => Ok(Self::from_parts(package, Some(metric), None)),
            [package, metric, spec] => Ok(Self::from_parts(package, Some(metric), Some(spec))),
            _ => Err(invalid(text, "a name has at most three segments (package.metric.spec)")),
        }
    }

    /// # Errors
    ///
    /// Returns [`Error::Identifier`] when `package` is not a valid segment.
    pub fn for_package(package: &str) -> Result<Self> {
        check_segment(package, package)?;
        Ok(Self::from_parts(package, None, None))
    }

    /// # Errors
    ///
    /// Returns [`Error::Identifier`] when either argument is not a valid segment.
    pub fn for_metric(package: &str, metric: &str) -> Result<Self> {
        let full = format!("{package}.{metric}");
        check_segment(&full, package)?;
        check_segment(&full, metric)?;
        Ok(Self::from_parts(package, Some(metric), None))
    }

    /// # Errors
    ///
    /// Returns [`Error::Identifier`] when any argument is not a valid segment.
    pub fn for_spec(package: &str, metric: &str, spec: &str) -> Result<Self> {
        let full = format!("{package}.{metric}.{spec}");
        check_segment(&full, package)?;
        check_segment(&full, metric)?;
        check_segment(&full, spec)?;
        Ok(Self::from_parts(package, Some(metric), Some(spec)))
    }

    fn from_parts(package: &str, metric: Option<&str>, spec: Option<&str>) -> Self {
        Self {
            package: CompactString::from(package),
            metric: metric.map(CompactString::from),
            spec: spec.map(CompactString::from),
        }
    }

    #[must_use]
    pub fn package(&self) -> &str {
        &self.package
    }

    #[must_use]
    pub fn metric(&self) -> Option<&str> {
        self.metric.as_deref()
    }

    #[must_use]
    pub fn spec(&self) -> Option<&str> {
        self.spec.as_deref()
    }

    #[must_use]
    pub const fn is_package(&self) -> bool {
        self.metric.is_none()
    }

    /// Whether this names a metric itself, not one of its specifications.
    #[must_use]
    pub const fn is_metric(&self) -> bool {
        self.metric.is_some() && self.spec.is_none()
    }

    #[must_use]
    pub const fn is_spec(&self) -> bool {
        self.spec.is_some()
    }

    /// Whether a metric component is present, as it is for metric and specification names.
    #[must_use]
    pub const fn has_metric(&self) -> bool {
        self.metric.is_some()
    }

    /// The metric this name refers to, dropping any specification level.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Identifier`] for a bare package name.
    pub fn metric_name(&self) -> Result<Self> {
        match &self.metric {
            Some(metric) => Ok(Self {
                package: self.package.clone(),
                metric: Some(metric.clone()),
                spec: None,
            }),
            None => Err(invalid(&self.package, "a package name has no metric component")),
        }
    }

    #[must_use]
    pub fn package_name(&self) -> Self {
        Self {
            package: self.package.clone(),
            metric: None,
            spec: None,
        }
    }

    /// A specification name for level `spec` of this metric.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Identifier`] if this is not a metric name or `spec` is not a valid segment.
    pub fn with_spec(&self, spec: &str) -> Result<Self> {
        let metric = self.metric_name()?;
        check_segment(&format!("{metric}.{spec}"), spec)?;
        Ok(Self {
            spec: Some(CompactString::from(spec)),
            ..metric
        })
    }

    /// Whether `other` lives inside this name's scope.
    ///
    /// A package contains its metrics and specifications, a metric contains its
    /// specifications, and a specification contains nothing.
    #[must_use]
    pub fn contains(&self, other: &Self) -> bool {
        if self.is_spec() || self.package != other.package {
            return false;
        }

        match &self.metric {
            None => other.metric.is_some(),
            Some(metric) => other.metric.as_ref() == Some(metric) && other.spec.is_some(),
        }
    }

    /// The name without its package, such as `metric.level`.
    #[must_use]
    pub fn relative_name(&self) -> String {
        match (&self.metric, &self.spec) {
            (Some(metric), Some(spec)) => format!("{metric}.{spec}"),
            (Some(metric), None) => metric.to_string(),
            _ => String::new(),
        }
    }
}

fn invalid(name: &str, reason: &str) -> Error {
    Error::Identifier {
        name: name.to_string(),
        reason: reason.to_string(),
    }
}

fn check_segment(name: &str, segment: &str) -> Result<()> {
    if segment.is_empty() {
        return Err(invalid(name, "empty name segment"));
    }

    if segment.contains('.') {
        return Err(invalid(name, "a name segment cannot contain '.'"));
    }

    if segment.chars().any(char::is_whitespace) {
        return Err(invalid(name, "a name segment cannot contain whitespace"));
    }

    Ok(())
}

impl Display for Name {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.package)?;
        if let Some(metric) = &self.metric {
            write!(f, ".{metric}")?;
        }
        if let Some(spec) = &self.spec {
            write!(f, ".{spec}")?;
        }

        Ok(())
    }
}

impl FromStr for Name {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl PartialEq<str> for Name {
    fn eq(&self, other: &str) -> bool {
        Self::parse(other).is_ok_and(|parsed| parsed == *self)
    }
}

impl PartialEq<&str> for Name {
    fn eq(&self, other: &&str) -> bool {
        *self == **other
    }
}

impl Serialize for Name {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Name {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let text = String::deserialize(deserializer)?;
        Self::parse(&text).map_err(serde::de::Error::custom)
    }
}

/// Anything usable as a name key: a [`Name`] or its dotted string.
pub trait AsName {
    /// # Errors
    ///
    /// Returns [`Error::Identifier`] when a string is not a valid name.
    fn as_name(&self) -> Result<Cow<'_, Name>>;
}

impl AsName for Name {
    fn as_name(&self) -> Result<Cow<'_, Name>> {
        Ok(Cow::Borrowed(self))
    }
}

impl AsName for str {
    fn as_name(&self) -> Result<Cow<'_, Name>> {
        Name::parse(self).map(Cow::Owned)
    }
}

impl AsName for String {
    fn as_name(&self) -> Result<Cow<'_, Name>> {
        self.as_str().as_name()
    }
}

impl<T: AsName + ?Sized> AsName for &T {
    fn as_name(&self) -> Result<Cow<'_, Name>> {
        (**self).as_name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_parse_levels() {
        let pkg = Name::parse("validate_drp").unwrap();
        assert!(pkg.is_package());
        assert!(!pkg.is_metric());
        assert!(!pkg.is_spec());

        let metric = Name::parse("validate_drp.PA1").unwrap();
        assert!(metric.is_metric());
        assert_eq!(metric.metric(), Some("PA1"));

        let spec = Name::parse("validate_drp.PA1.design").unwrap();
        assert!(spec.is_spec());
        assert!(!spec.is_metric());
        assert_eq!(spec.spec(), Some("design"));
        assert_eq!(spec.to_string(), "validate_drp.PA1.design");
    }

    #[test]
    fn test_metric_name_takes_first_two_segments() {
        for text in ["pkg.m", "pkg.m.design", "a.b.c"] {
            let name = Name::parse(text).unwrap();
            assert!(name.has_metric());
            let metric = name.metric_name().unwrap();
            assert!(metric.is_metric());
            let expected: Vec<&str> = text.split('.').take(2).collect();
            assert_eq!(metric.to_string(), expected.join("."));
        }

        assert!(matches!(
            Name::parse("pkg").unwrap().metric_name(),
            Err(Error::Identifier { .. })
        ));
    }

    #[test]
    fn test_malformed_names() {
        for text in ["", ".", "pkg.", ".pkg", "pkg..metric", "a.b.c.d", "pkg.my metric"] {
            assert!(
                matches!(Name::parse(text), Err(Error::Identifier { .. })),
                "{text:?} should be rejected"
            );
        }

        assert!(Name::for_metric("pkg", "").is_err());
        assert!(Name::for_spec("pkg", "a.b", "design").is_err());
    }

    #[test]
    fn test_string_equality_and_hashing() {
        let name = Name::for_spec("pkg", "PA1", "design").unwrap();
        assert_eq!(name, "pkg.PA1.design");
        assert!(name != "pkg.PA1");
        assert!(name != "not..valid");

        let mut set = HashSet::new();
        let _ = set.insert(name.clone());
        assert!(set.contains(&Name::parse("pkg.PA1.design").unwrap()));
    }

    #[test]
    fn test_containment() {
        let pkg = Name::parse("pkg").unwrap();
        let metric = Name::parse("pkg.PA1").unwrap();
        let spec = Name::parse("pkg.PA1.design").unwrap();
        let other = Name::parse("pkg.PA2.design").unwrap();

        assert!(pkg.contains(&metric));
        assert!(pkg.contains(&spec));
        assert!(metric.contains(&spec));
        assert!(!metric.contains(&other));
        assert!(!metric.contains(&metric));
        assert!(!spec.contains(&spec));
        assert!(!Name::parse("other").unwrap().contains(&metric));
    }

    #[test]
    fn test_with_spec_and_relative_name() {
        let metric = Name::parse("pkg.PA1").unwrap();
        let spec = metric.with_spec("stretch").unwrap();
        assert_eq!(spec.relative_name(), "PA1.stretch");
        assert_eq!(metric.relative_name(), "PA1");
        assert!(Name::parse("pkg").unwrap().with_spec("design").is_err());
    }

    #[test]
    fn test_serde_as_string() {
        let name = Name::parse("pkg.PA1").unwrap();
        assert_eq!(serde_json::to_string(&name).unwrap(), "\"pkg.PA1\"");
        let back: Name = serde_json::from_str("\"pkg.PA1\"").unwrap();
        assert_eq!(back, name);
        assert!(serde_json::from_str::<Name>("\"pkg..x\"").is_err());
    }

    #[test]
    fn test_as_name_accepts_both_forms() {
        let name = Name::parse("pkg.PA1").unwrap();
        assert_eq!(*"pkg.PA1".as_name().unwrap(), name);
        assert_eq!(*name.as_name().unwrap(), name);
        assert!("pkg..".as_name().is_err());
    }
}
