use crate::job::JobMetadata;
use core::fmt::{Display, Formatter, Result as FmtResult};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Metadata terms a job must carry for a specification to apply.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MetadataQuery {
    terms: Map<String, Value>,
}

impl MetadataQuery {
    #[must_use]
    pub const fn new(terms: Map<String, Value>) -> Self {
        Self { terms }
    }

    #[must_use]
    pub const fn terms(&self) -> &Map<String, Value> {
        &self.terms
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Whether `meta` has every term of this query with an equal value.
    ///
    /// Extra keys in `meta` do not prevent a match, so an empty query matches anything.
    #[must_use]
    pub fn matches(&self, meta: &JobMetadata) -> bool {
        contains_all(meta.as_map(), &self.terms)
    }

    /// The reverse test: whether this query has every entry of `meta` with an equal value.
    #[must_use]
    pub fn matches_arg_driven(&self, meta: &JobMetadata) -> bool {
        contains_all(&self.terms, meta.as_map())
    }
}

fn contains_all(haystack: &Map<String, Value>, needles: &Map<String, Value>) -> bool {
    needles.iter().all(|(key, value)| haystack.get(key) == Some(value))
}

impl Display for MetadataQuery {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", Value::Object(self.terms.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn query(value: Value) -> MetadataQuery {
        serde_json::from_value(value).unwrap()
    }

    fn meta() -> JobMetadata {
        [("filter", "r"), ("camera", "MegaCam")].into_iter().collect()
    }

    #[test]
    fn test_default_mode() {
        assert!(!query(json!({"filter": "r", "camera": "SDSS"})).matches(&meta()));
        assert!(query(json!({"filter": "r"})).matches(&meta()));
        assert!(!query(json!({"filter": "r", "camera": "MegaCam", "photometric": true})).matches(&meta()));
        assert!(MetadataQuery::default().matches(&meta()));
    }

    #[test]
    fn test_arg_driven_mode() {
        assert!(query(json!({"filter": "r", "camera": "MegaCam", "photometric": true})).matches_arg_driven(&meta()));
        assert!(!query(json!({"filter": "r"})).matches_arg_driven(&meta()));
    }

    #[test]
    fn test_from_yaml() {
        let q: MetadataQuery = serde_yaml::from_str("filter_name: r\n").unwrap();
        assert_eq!(q.to_string(), r#"{"filter_name":"r"}"#);
    }
}
