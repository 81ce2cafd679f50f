//! Driver errors.

/// An error from a [`Driver`](crate::Driver) query.
#[derive(Debug, thiserror::Error)]
pub enum DriverError<E> {
    /// The chain source failed.
    #[error(transparent)]
    Source(E),
    /// The query argument could not be encoded into a cache key.
    #[error("failed to encode cache key: {0}")]
    CacheKey(#[source] serde_json::Error),
}

impl<E> DriverError<E> {
    /// Returns the source error, if that is what this is.
    pub const fn as_source(&self) -> Option<&E> {
        match self {
            Self::Source(err) => Some(err),
            Self::CacheKey(_) => None,
        }
    }
}
