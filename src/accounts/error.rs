use thiserror::Error;

use crate::store::StoreError;

/// Failures surfaced by [`super::AccountService`].
///
/// The `Display` text of each variant is what the caller sees.
/// `Internal` keeps its cause for the server log only.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("{0}")]
    Validation(&'static str),

    #[error("User with this email or username already exists")]
    DuplicateAccount,

    /// Same message for an unknown identifier and a wrong secret.
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Internal server error")]
    Internal(anyhow::Error),
}

impl From<StoreError> for AuthError {
    fn from(err: StoreError) -> Self {
        Self::Internal(anyhow::Error::new(err))
    }
}

impl From<anyhow::Error> for AuthError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err)
    }
}
