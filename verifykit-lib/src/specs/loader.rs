//! Resolution of specification levels from package documents.
//!
//! Each specification document belongs to one metric and maps level names to
//! level bodies, with an optional shared `base` block:
//!
//! ```yaml
//! base:
//!   threshold: {operator: '<=', unit: mmag}
//!   tags: [photometry]
//! minimum:
//!   threshold: {value: 8.0}
//! design:
//!   threshold: {value: 5.0}
//! stretch:
//!   inherit: design
//!   threshold: {value: 3.0}
//! ```
//!
//! A level without `inherit` resolves to the base block merged with its body.
//! A level with `inherit` starts from the resolved documents of the levels it
//! names, merged left to right, and merges its body on top; the base block is
//! not applied again since the inherited levels already carry it.

use super::Specification;
use crate::document::{PackageSource, merge, merge_all};
use crate::naming::Name;
use crate::{Error, Result};
use serde_yaml::{Mapping, Value};
use std::collections::{BTreeMap, HashMap, HashSet};

const LOG_TARGET: &str = "     specs";

const BASE_KEY: &str = "base";
const INHERIT_KEY: &str = "inherit";

struct Level {
    origin: String,
    base: Option<Value>,
    body: Mapping,
    inherits: Vec<String>,
}

/// Load and resolve every specification offered by `source`.
pub(super) fn load_specifications(source: &impl PackageSource) -> Result<Vec<Specification>> {
    let mut levels = BTreeMap::new();
    for doc in source.spec_documents()? {
        let metric = Name::for_metric(&doc.package, &doc.stem).map_err(|e| e.in_document(&doc.origin))?;
        collect_levels(&doc.origin, &metric, &merge_all(&doc.documents), &mut levels)?;
    }

    let mut resolver = Resolver {
        levels: &levels,
        resolved: HashMap::new(),
        in_progress: HashSet::new(),
    };

    let mut specs = Vec::with_capacity(levels.len());
    for (name, level) in &levels {
        let doc = resolver.resolve(name)?;
        specs.push(Specification::from_yaml(name.clone(), &doc).map_err(|e| e.in_document(&level.origin))?);
    }

    log::info!(target: LOG_TARGET, "Resolved {} specifications", specs.len());
    Ok(specs)
}

fn collect_levels(origin: &str, metric: &Name, doc: &Value, levels: &mut BTreeMap<Name, Level>) -> Result<()> {
    let Value::Mapping(entries) = doc else {
        return Err(Error::parse(origin, "expected a mapping of specification levels"));
    };

    let base = entries.get(BASE_KEY).cloned();
    let mut count = 0;

    for (key, body) in entries {
        let level_name = key
            .as_str()
            .ok_or_else(|| Error::parse(origin, format!("level names must be strings, found {key:?}")))?;
        if level_name == BASE_KEY {
            continue;
        }

        let name = metric.with_spec(level_name).map_err(|e| e.in_document(origin))?;
        let mut body = match body {
            Value::Mapping(body) => body.clone(),
            Value::Null => Mapping::new(),
            _ => return Err(Error::parse(origin, format!("level '{level_name}' must be a mapping"))),
        };

        let inherits = match body.shift_remove(INHERIT_KEY) {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::String(parent)) => vec![parent],
            Some(Value::Sequence(parents)) => parents
                .iter()
                .map(|p| {
                    p.as_str()
                        .map(str::to_string)
                        .ok_or_else(|| Error::parse(origin, format!("level '{level_name}': inherited names must be strings")))
                })
                .collect::<Result<_>>()?,
            Some(_) => return Err(Error::parse(origin, format!("level '{level_name}': 'inherit' must be a name or list of names"))),
        };

        let level = Level {
            origin: origin.to_string(),
            base: base.clone(),
            body,
            inherits,
        };

        if levels.insert(name.clone(), level).is_some() {
            return Err(Error::Duplicate {
                kind: "specification",
                key: name.to_string(),
            }
            .in_document(origin));
        }
        count += 1;
    }

    log::debug!(target: LOG_TARGET, "Found {count} specification levels for '{metric}' in '{origin}'");
    Ok(())
}

struct Resolver<'a> {
    levels: &'a BTreeMap<Name, Level>,
    resolved: HashMap<Name, Value>,
    in_progress: HashSet<Name>,
}

impl Resolver<'_> {
    fn resolve(&mut self, name: &Name) -> Result<Value> {
        if let Some(doc) = self.resolved.get(name) {
            return Ok(doc.clone());
        }

        let levels = self.levels;
        let level = levels.get(name).ok_or_else(|| Error::Resolution {
            name: name.to_string(),
            reason: "no such specification".to_string(),
        })?;

        if !self.in_progress.insert(name.clone()) {
            return Err(Error::Resolution {
                name: name.to_string(),
                reason: "inheritance cycle".to_string(),
            });
        }

        let body = Value::Mapping(level.body.clone());
        let doc = if level.inherits.is_empty() {
            match &level.base {
                Some(base) => merge(base, &body),
                None => body,
            }
        } else {
            let mut doc = Value::Mapping(Mapping::new());
            for parent in &level.inherits {
                let parent_name = qualify(parent, name)?;
                if !levels.contains_key(&parent_name) {
                    return Err(Error::Resolution {
                        name: name.to_string(),
                        reason: format!("inherits unknown specification '{parent_name}'"),
                    });
                }

                let parent_doc = self.resolve(&parent_name).map_err(|e| match e {
                    Error::Resolution { reason, .. } if reason == "inheritance cycle" => Error::Resolution {
                        name: name.to_string(),
                        reason,
                    },
                    other => other,
                })?;
                doc = merge(&doc, &parent_doc);
            }
            merge(&doc, &body)
        };

        let _ = self.in_progress.remove(name);
        let _ = self.resolved.insert(name.clone(), doc.clone());
        Ok(doc)
    }
}

/// Qualify an inherited name relative to the level `current`.
///
/// `design` names a level of the same metric, `PA2.design` a level of another
/// metric in the same package, and `pkg.PA2.design` is already complete.
fn qualify(parent: &str, current: &Name) -> Result<Name> {
    let invalid = |reason: &str| Error::Resolution {
        name: current.to_string(),
        reason: format!("invalid inherited name '{parent}': {reason}"),
    };

    let segments: Vec<&str> = parent.split('.').collect();
    let metric = current.metric().unwrap_or_default();
    let result = match segments.as_slice() {
        [level] => Name::for_spec(current.package(), metric, level),
        [metric, level] => Name::for_spec(current.package(), metric, level),
        [package, metric, level] => Name::for_spec(package, metric, level),
        _ => return Err(invalid("expected level, metric.level or package.metric.level")),
    };

    result.map_err(|e| invalid(&e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::MemoryPackage;
    use crate::units::{Quantity, Unit};

    const PA1_YAML: &str = r"
base:
  threshold: {operator: '<=', unit: mmag}
  tags: [photometry]
minimum:
  threshold: {value: 8.0}
design:
  threshold: {value: 5.0}
  tags: [design]
stretch:
  inherit: design
  threshold: {value: 3.0}
";

    fn load(source: &MemoryPackage) -> Result<BTreeMap<String, Specification>> {
        Ok(load_specifications(source)?.into_iter().map(|s| (s.name().to_string(), s)).collect())
    }

    fn threshold_of(spec: &Specification) -> (f64, String) {
        let q = spec.threshold_quantity().unwrap();
        (q.value(), q.unit().symbol().to_string())
    }

    #[test]
    fn test_levels_merge_with_base() {
        let specs = load(&MemoryPackage::new().with_specs("pkg", "PA1", PA1_YAML)).unwrap();
        assert_eq!(specs.len(), 3);

        let minimum = &specs["pkg.PA1.minimum"];
        assert_eq!(threshold_of(minimum), (8.0, "mmag".to_string()));
        assert_eq!(minimum.tags().iter().collect::<Vec<_>>(), ["photometry"]);
    }

    #[test]
    fn test_inherit_does_not_reapply_base() {
        let specs = load(&MemoryPackage::new().with_specs("pkg", "PA1", PA1_YAML)).unwrap();
        let stretch = &specs["pkg.PA1.stretch"];
        assert_eq!(threshold_of(stretch), (3.0, "mmag".to_string()));
        assert_eq!(stretch.tags().len(), 2);

        let design = &specs["pkg.PA1.design"];
        let m = crate::measurements::Measurement::new(Name::parse("pkg.PA1").unwrap())
            .unwrap()
            .with_quantity(Quantity::new(4.0, Unit::parse("mmag").unwrap()));
        assert!(design.check(&m).unwrap());
        assert!(!stretch.check(&m).unwrap());
    }

    #[test]
    fn test_cross_metric_and_qualified_inheritance() {
        let source = MemoryPackage::new()
            .with_specs("pkg", "PA1", PA1_YAML)
            .with_specs("pkg", "PA2", "design:\n  inherit: PA1.minimum\n  tags: [pa2]\n")
            .with_specs("other", "M", "design:\n  inherit: [pkg.PA1.design, pkg.PA2.design]\n");
        let specs = load(&source).unwrap();

        assert_eq!(threshold_of(&specs["pkg.PA2.design"]), (8.0, "mmag".to_string()));
        let m = &specs["other.M.design"];
        assert_eq!(threshold_of(m), (8.0, "mmag".to_string()));
        assert!(m.tags().contains("pa2"));
        assert!(m.tags().contains("design"));
    }

    #[test]
    fn test_unknown_parent_is_a_resolution_error() {
        let source = MemoryPackage::new().with_specs("pkg", "PA1", "design:\n  inherit: missing\n  operator: '<'\n  value: 1\n");
        let err = load_specifications(&source).unwrap_err();
        assert!(matches!(&err, Error::Resolution { name, .. } if name == "pkg.PA1.design"), "{err}");
    }

    #[test]
    fn test_inheritance_cycle() {
        let yaml = "a:\n  inherit: b\n  operator: '<'\n  value: 1\nb:\n  inherit: a\n";
        let err = load_specifications(&MemoryPackage::new().with_specs("pkg", "M", yaml)).unwrap_err();
        assert!(matches!(&err, Error::Resolution { reason, .. } if reason == "inheritance cycle"), "{err}");
    }

    #[test]
    fn test_bad_level_names_the_file() {
        let source = MemoryPackage::new()
            .with_specs("pkg", "PA1", PA1_YAML)
            .with_specs("pkg", "PA2", "design:\n  tags: [nothing_to_check]\n");
        let err = load_specifications(&source).unwrap_err();
        assert!(matches!(&err, Error::Parse { origin, .. } if origin == "specs/pkg/PA2.yaml"), "{err}");
    }

    #[test]
    fn test_duplicate_levels_across_files() {
        let source = MemoryPackage::new()
            .with_specs("pkg", "PA1", "design: {operator: '<', value: 1}\n")
            .with_specs("pkg", "PA1", "design: {operator: '<', value: 2}\n");
        let err = load_specifications(&source).unwrap_err();
        assert!(matches!(err, Error::Parse { .. }));
    }

    #[test]
    fn test_qualify() {
        let current = Name::parse("pkg.PA1.stretch").unwrap();
        assert_eq!(qualify("design", &current).unwrap(), "pkg.PA1.design");
        assert_eq!(qualify("PA2.design", &current).unwrap(), "pkg.PA2.design");
        assert_eq!(qualify("x.PA2.design", &current).unwrap(), "x.PA2.design");
        assert!(qualify("a.b.c.d", &current).is_err());
        assert!(qualify("", &current).is_err());
    }
}
