use jsonwebtoken::decode;
use jsonwebtoken::encode;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::Algorithm;
use jsonwebtoken::DecodingKey;
use jsonwebtoken::EncodingKey;
use jsonwebtoken::Header;
use jsonwebtoken::Validation;
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::errors::TokenError;

/// Signs and verifies compact bearer tokens carrying a JSON payload.
///
/// Uses HS256 (HMAC with SHA-256). The payload type is chosen by the caller,
/// so each flow defines its own token shape.
pub struct TokenSigner {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    algorithm: Algorithm,
}

impl TokenSigner {
    /// Create a new signer bound to a secret key.
    ///
    /// # Arguments
    /// * `secret` - Secret key for signing tokens
    ///
    /// # Security Notes
    /// - The secret should be at least 256 bits (32 bytes) for HS256
    /// - Rotating the secret invalidates every outstanding token
    pub fn new(secret: &[u8]) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            algorithm: Algorithm::HS256,
        }
    }

    /// Sign a payload into a compact token.
    ///
    /// # Errors
    /// * `SigningFailed` - Payload serialization or signing failed
    pub fn sign<T: Serialize>(&self, payload: &T) -> Result<String, TokenError> {
        let header = Header::new(self.algorithm);

        encode(&header, payload, &self.encoding_key)
            .map_err(|e| TokenError::SigningFailed(e.to_string()))
    }

    /// Verify a token's signature and decode its payload.
    ///
    /// Registered claims such as `exp` are not validated here. A token whose
    /// embedded expiry has passed still verifies; the caller decides.
    ///
    /// # Errors
    /// * `SignatureMismatch` - Token was signed with another key or tampered with
    /// * `Malformed` - Token is structurally invalid or the payload does not decode
    pub fn verify<T: DeserializeOwned>(&self, token: &str) -> Result<T, TokenError> {
        let mut validation = Validation::new(self.algorithm);
        validation.required_spec_claims.clear();
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.validate_aud = false;

        decode::<T>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::InvalidSignature => TokenError::SignatureMismatch,
                _ => TokenError::Malformed(e.to_string()),
            })
    }
}
