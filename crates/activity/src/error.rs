/// Crate-wide result type for decoding.
pub type Result<T> = std::result::Result<T, DecodeError>;

/// Reasons an inbound payload cannot be turned into an [`crate::Activity`].
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    /// The body is not valid JSON.
    #[error("malformed activity JSON: {0}")]
    Syntax(#[from] serde_json::Error),

    /// The body is valid JSON but not an object.
    #[error("activity payload must be a JSON object")]
    NotAnObject,

    /// A required discriminator is absent, empty, or not a string.
    #[error("missing discriminator `{0}`{hint}", hint = alias_hint(.0))]
    MissingDiscriminator(String),

    /// A discriminator carries a value no registered shape accepts.
    #[error("unknown discriminator `{field}` = {value:?}")]
    UnknownDiscriminator { field: String, value: String },

    /// A typed field is present but has the wrong shape.
    #[error("invalid field `{path}`: {source}")]
    InvalidField {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

impl DecodeError {
    #[must_use]
    pub fn missing(field: impl Into<String>) -> Self {
        Self::MissingDiscriminator(field.into())
    }

    #[must_use]
    pub fn unknown(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::UnknownDiscriminator {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Prefix the field path of an [`DecodeError::InvalidField`] or a
    /// discriminator error with the enclosing path segment.
    #[must_use]
    pub fn within(self, prefix: &str) -> Self {
        match self {
            Self::InvalidField { path, source } => Self::InvalidField {
                path: format!("{prefix}.{path}"),
                source,
            },
            Self::MissingDiscriminator(field) => {
                Self::MissingDiscriminator(format!("{prefix}.{field}"))
            },
            other => other,
        }
    }
}

/// `type` may also arrive as `kind`; say so when neither was found.
fn alias_hint(field: &str) -> &'static str {
    if field == "type" {
        " (or `kind`)"
    } else {
        ""
    }
}

/// Registration-time failures of the activity type registry.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("discriminator path already registered: {0}")]
    DuplicatePath(String),

    #[error("discriminator path must start with a `type` segment: {0}")]
    MissingRoot(String),
}
