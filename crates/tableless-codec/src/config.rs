//! Encryption configuration for encrypted columns.

use std::fmt;

/// Salt mixed into key derivation when none is configured.
pub const DEFAULT_SALT: &str = "tableless encrypted column";

/// PBKDF2 rounds used when none are configured.
pub const DEFAULT_ITERATIONS: u32 = 65_536;

/// Key material for one encrypted column.
///
/// The secret is stretched with PBKDF2-HMAC-SHA256 into a cipher key and a
/// nonce key; the same secret, salt and iteration count always derive the
/// same keys, so stored columns stay readable across processes.
#[derive(Clone)]
pub struct EncryptionConfig {
    secret: String,
    salt: String,
    iterations: u32,
}

impl EncryptionConfig {
    /// Configuration with the default salt and iteration count.
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            salt: DEFAULT_SALT.to_string(),
            iterations: DEFAULT_ITERATIONS,
        }
    }

    /// Set the key-derivation salt.
    pub fn with_salt(mut self, salt: impl Into<String>) -> Self {
        self.salt = salt.into();
        self
    }

    /// Set the PBKDF2 round count (at least 1).
    pub fn with_iterations(mut self, iterations: u32) -> Self {
        self.iterations = iterations.max(1);
        self
    }

    pub fn secret(&self) -> &str {
        &self.secret
    }

    pub fn salt(&self) -> &str {
        &self.salt
    }

    pub fn iterations(&self) -> u32 {
        self.iterations
    }
}

impl fmt::Debug for EncryptionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncryptionConfig")
            .field("secret", &"<redacted>")
            .field("salt", &self.salt)
            .field("iterations", &self.iterations)
            .finish()
    }
}
