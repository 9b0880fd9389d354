use serde::Deserialize;

use crate::domain::errors::PasswordPolicyError;

/// Passwords rejected regardless of length or composition.
///
/// Compared case-insensitively against the whole password.
const COMMON_PASSWORDS: &[&str] = &[
    "123456",
    "123456789",
    "12345678",
    "1234567890",
    "password",
    "password1",
    "password123",
    "passw0rd",
    "p@ssw0rd",
    "p@ssword1",
    "qwerty",
    "qwerty123",
    "qwertyuiop",
    "abc123",
    "abcd1234",
    "111111",
    "123123",
    "iloveyou",
    "letmein",
    "letmein1!",
    "welcome",
    "welcome1",
    "welcome123",
    "admin",
    "admin123",
    "administrator",
    "monkey",
    "dragon",
    "football",
    "baseball",
    "sunshine",
    "princess",
    "trustno1",
    "changeme",
    "changeme123",
    "secret",
    "master",
    "superman",
    "starwars",
    "zaq12wsx",
    "1q2w3e4r",
    "1qaz2wsx",
];

/// Password strength requirements.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PasswordPolicy {
    pub min_length: usize,
    pub max_length: usize,
    /// Required count among lowercase, uppercase, digits and symbols.
    pub min_character_classes: usize,
}

impl Default for PasswordPolicy {
    fn default() -> Self {
        Self {
            min_length: 8,
            max_length: 128,
            min_character_classes: 3,
        }
    }
}

impl PasswordPolicy {
    /// Check a candidate password against the policy and the blocklist.
    ///
    /// # Errors
    /// * `TooShort` / `TooLong` - Length outside the policy bounds
    /// * `TooFewCharacterClasses` - Not enough distinct character classes
    /// * `Common` - Password is on the common-password blocklist
    pub fn validate(&self, password: &str) -> Result<(), PasswordPolicyError> {
        let length = password.chars().count();
        if length < self.min_length {
            return Err(PasswordPolicyError::TooShort {
                min: self.min_length,
                actual: length,
            });
        }
        if length > self.max_length {
            return Err(PasswordPolicyError::TooLong {
                max: self.max_length,
                actual: length,
            });
        }

        let classes = character_classes(password);
        if classes < self.min_character_classes {
            return Err(PasswordPolicyError::TooFewCharacterClasses {
                required: self.min_character_classes,
                actual: classes,
            });
        }

        let lowered = password.to_lowercase();
        if COMMON_PASSWORDS.contains(&lowered.as_str()) {
            return Err(PasswordPolicyError::Common);
        }

        Ok(())
    }
}

fn character_classes(password: &str) -> usize {
    let lower = password.chars().any(|c| c.is_lowercase());
    let upper = password.chars().any(|c| c.is_uppercase());
    let digit = password.chars().any(|c| c.is_numeric());
    let symbol = password.chars().any(|c| !c.is_alphanumeric());

    [lower, upper, digit, symbol].iter().filter(|&&x| x).count()
}
