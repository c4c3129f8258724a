//! ID, token and short-code generation utilities.

use rand::{Rng, distributions::Alphanumeric};
use ulid::Ulid;
use uuid::Uuid;

/// Length of a recipe short-link code.
pub const SHORT_CODE_LENGTH: usize = 6;

/// Generator for opaque identifiers.
#[derive(Debug, Clone, Default)]
pub struct IdGenerator {
    _private: (),
}

impl IdGenerator {
    /// Create a new ID generator.
    #[must_use]
    pub const fn new() -> Self {
        Self { _private: () }
    }

    /// Generate a new ULID-based ID.
    ///
    /// Used for uploaded file names so they sort by upload time.
    #[must_use]
    pub fn generate(&self) -> String {
        Ulid::new().to_string().to_lowercase()
    }

    /// Generate a cryptographically secure random access token.
    #[must_use]
    pub fn generate_token(&self) -> String {
        // Use UUID v4 for tokens (no time component for security)
        Uuid::new_v4().simple().to_string()
    }

    /// Generate a recipe short-link code of [`SHORT_CODE_LENGTH`] characters
    /// drawn from `[A-Za-z0-9]`.
    ///
    /// Uniqueness is not guaranteed; callers check the store and retry.
    #[must_use]
    pub fn generate_short_code(&self) -> String {
        rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(SHORT_CODE_LENGTH)
            .map(char::from)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_ulid() {
        let id_gen = IdGenerator::new();
        let id1 = id_gen.generate();
        let id2 = id_gen.generate();

        assert_eq!(id1.len(), 26);
        assert_ne!(id1, id2);
    }

    #[test]
    fn test_generate_token() {
        let id_gen = IdGenerator::new();
        let token = id_gen.generate_token();

        assert_eq!(token.len(), 32); // Simple UUID without hyphens
        assert_ne!(token, id_gen.generate_token());
    }

    #[test]
    fn test_short_code_alphabet_and_length() {
        let id_gen = IdGenerator::new();
        for _ in 0..100 {
            let code = id_gen.generate_short_code();
            assert_eq!(code.len(), SHORT_CODE_LENGTH);
            assert!(code.chars().all(|c| c.is_ascii_alphanumeric()));
        }
    }
}
