/// Convenience result type used across framescrub.
pub type ScrubResult<T> = Result<T, ScrubError>;

/// Top-level error taxonomy used by engine APIs.
///
/// Event handlers on [`crate::ScrubPlayer`] never return these; they only surface from
/// construction, configuration and loader plumbing.
#[derive(thiserror::Error, Debug)]
pub enum ScrubError {
    /// Invalid user-provided configuration or arguments.
    #[error("validation error: {0}")]
    Validation(String),

    /// A frame asset could not be fetched.
    #[error("load error: {0}")]
    Load(String),

    /// Frame bytes were fetched but could not be decoded.
    #[error("decode error: {0}")]
    Decode(String),

    /// Errors when serializing or deserializing data structures.
    #[error("serialization error: {0}")]
    Serde(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ScrubError {
    /// Build a [`ScrubError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a [`ScrubError::Load`] value.
    pub fn load(msg: impl Into<String>) -> Self {
        Self::Load(msg.into())
    }

    /// Build a [`ScrubError::Decode`] value.
    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }

    /// Build a [`ScrubError::Serde`] value.
    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
