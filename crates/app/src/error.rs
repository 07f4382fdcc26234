use teamwire_activity::DecodeError;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// A context was narrowed to a shape the decoded activity is not.
    #[error("cannot narrow {from} to {to}")]
    InvalidCast {
        from: &'static str,
        to: &'static str,
    },

    #[error("send failed: {source}")]
    SendFailure {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("turn cancelled")]
    Cancelled,

    #[error("{message}")]
    Unavailable { message: String },

    #[error("{message}")]
    Handler { message: String },

    #[error("{context}: {source}")]
    External {
        context: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl Error {
    #[must_use]
    pub fn handler(message: impl Into<String>) -> Self {
        Self::Handler {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn send_failure(source: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::SendFailure {
            source: Box::new(source),
        }
    }

    #[must_use]
    pub fn external(
        context: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::External {
            context: context.into(),
            source: Box::new(source),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

pub type Result<T> = std::result::Result<T, Error>;
