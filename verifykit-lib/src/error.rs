use camino::Utf8PathBuf;

/// Errors raised by the verification document model.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A name string is empty or malformed, or has the wrong kind for its use.
    #[error("invalid name '{name}': {reason}")]
    Identifier { name: String, reason: String },

    /// A specification, metric, blob or measurement could not be found.
    #[error("{kind} '{key}' not found")]
    Lookup { kind: &'static str, key: String },

    /// A value of the wrong type was supplied.
    #[error("{0}")]
    Type(String),

    /// A mapping key is not usable as a field name.
    #[error("invalid key '{0}': keys must be non-empty strings")]
    InvalidKey(String),

    /// Two quantities were compared or converted across incompatible units.
    #[error("unit '{from}' is not convertible to '{to}'")]
    UnitMismatch { from: String, to: String },

    /// A unit string could not be resolved to a known unit.
    #[error("unknown unit '{0}'")]
    UnknownUnit(String),

    /// A metrics package lacks an expected directory or file.
    #[error("invalid package layout: {0}")]
    PackageStructure(String),

    /// A YAML or JSON document failed to parse or has an unexpected shape.
    #[error("could not parse {origin}: {message}")]
    Parse { origin: String, message: String },

    #[error("could not access '{path}'")]
    Io {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Specification inheritance could not be resolved.
    #[error("could not resolve specification '{name}': {reason}")]
    Resolution { name: String, reason: String },

    /// An item with the same key is already present.
    #[error("duplicate {kind} '{key}'")]
    Duplicate { kind: &'static str, key: String },

    /// The measurement has no usable value to compare.
    #[error("measurement of '{0}' is unavailable")]
    MeasurementUnavailable(String),

    /// The specification carries no comparison that could be evaluated.
    #[error("specification '{0}' defines no comparison")]
    NotEvaluable(String),
}

impl Error {
    pub(crate) fn lookup(kind: &'static str, key: impl ToString) -> Self {
        Self::Lookup { kind, key: key.to_string() }
    }

    pub(crate) fn parse(origin: impl Into<String>, message: impl ToString) -> Self {
        Self::Parse {
            origin: origin.into(),
            message: message.to_string(),
        }
    }

    /// Attach a document origin to an error raised while interpreting that document.
    #[must_use]
    pub(crate) fn in_document(self, origin: &str) -> Self {
        match self {
            Self::Parse { .. } | Self::Io { .. } | Self::PackageStructure(_) => self,
            other => Self::parse(origin, other),
        }
    }
}
