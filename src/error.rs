use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Failures of the relay and claim paths.
///
/// A missed live delivery is deliberately absent: the message is already
/// persisted and the relay reports it as [`crate::chat::Delivery::Missed`].
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed or missing fields in a frame or request. Nothing was written.
    #[error("{0}")]
    Validation(String),

    /// The conditional claim matched no available listing.
    #[error("Item not found or already claimed")]
    NotClaimable,

    #[error("store failure: {0}")]
    Store(#[from] sqlx::Error),
}

impl Error {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }
}

pub(crate) fn require(field: &str, value: &str) -> Result<()> {
    if value.is_empty() {
        return Err(Error::validation(format!("{field} must not be empty")));
    }
    Ok(())
}
