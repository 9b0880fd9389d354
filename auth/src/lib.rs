//! Authentication utilities library
//!
//! Provides reusable authentication primitives:
//! - Password hashing (Argon2id)
//! - Signed bearer tokens (HS256)
//! - Secure random tokens
//!
//! Services define their own token payloads and storage, and adapt these
//! implementations.
//!
//! # Examples
//!
//! ## Password Hashing
//! ```
//! use auth::PasswordHasher;
//!
//! let hasher = PasswordHasher::new();
//! let hash = hasher.hash("my_password").unwrap();
//! let is_valid = hasher.verify("my_password", &hash).unwrap();
//! assert!(is_valid);
//! ```
//!
//! ## Signed Tokens
//! ```
//! use auth::TokenSigner;
//! use serde_json::json;
//!
//! let signer = TokenSigner::new(b"secret_key_at_least_32_bytes_long!");
//! let token = signer.sign(&json!({ "sub": "magic-link", "exp": 1 })).unwrap();
//! let payload: serde_json::Value = signer.verify(&token).unwrap();
//! assert_eq!(payload["sub"], "magic-link");
//! ```

pub mod password;
pub mod random;
pub mod token;

// Re-export commonly used items
pub use password::HashingParams;
pub use password::PasswordError;
pub use password::PasswordHasher;
pub use random::generate_secure_token;
pub use token::TokenError;
pub use token::TokenSigner;
