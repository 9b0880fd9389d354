use thiserror::Error;

/// Error type for signed token operations.
///
/// Expiry is deliberately absent: the signer knows nothing about it and
/// callers check the payload's embedded timestamp themselves.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenError {
    #[error("Failed to sign token: {0}")]
    SigningFailed(String),

    #[error("Token is malformed: {0}")]
    Malformed(String),

    #[error("Token signature does not match")]
    SignatureMismatch,
}
