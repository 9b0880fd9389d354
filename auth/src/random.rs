//! Cryptographically secure random tokens for one-time values such as
//! OAuth CSRF state.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use rand::rngs::OsRng;
use rand::RngCore;

/// Default token size in bytes (256 bits of entropy).
const DEFAULT_TOKEN_BYTES: usize = 32;

/// Generate a random token from OS entropy.
///
/// # Returns
/// A base64 URL-safe encoded string without padding
pub fn generate_secure_token() -> String {
    generate_secure_token_with_size(DEFAULT_TOKEN_BYTES)
}

/// Generate a random token with the given number of entropy bytes.
pub fn generate_secure_token_with_size(bytes: usize) -> String {
    let mut buffer = vec![0u8; bytes];
    OsRng.fill_bytes(&mut buffer);
    URL_SAFE_NO_PAD.encode(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokens_are_unique() {
        let token1 = generate_secure_token();
        let token2 = generate_secure_token();

        assert_ne!(token1, token2);
        // 32 bytes encode to 43 unpadded base64 characters
        assert_eq!(token1.len(), 43);
    }

    #[test]
    fn test_tokens_are_url_safe() {
        let token = generate_secure_token_with_size(64);

        assert!(token
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }
}
