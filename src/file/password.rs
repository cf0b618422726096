//! One-way hashing of optional file passwords.
//!
//! Uses Argon2id; hashes are PHC strings carrying their own salt and
//! parameters, so verification keeps working if the cost is tuned later.

use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};
use rand_core::OsRng;
use tracing::warn;

use crate::{Result, ShareError};

/// Hashes and verifies file passwords.
#[derive(Debug, Clone)]
pub struct PasswordGuard {
    params: Params,
}

impl PasswordGuard {
    /// Create a guard with explicit Argon2 cost parameters.
    ///
    /// * `m_cost` - memory in KiB
    /// * `t_cost` - iterations
    /// * `p_cost` - parallelism
    pub fn with_params(m_cost: u32, t_cost: u32, p_cost: u32) -> Result<Self> {
        let params = Params::new(m_cost, t_cost, p_cost, None)
            .map_err(|e| ShareError::Config(format!("invalid Argon2 params: {e}")))?;
        Ok(Self { params })
    }

    fn argon2(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }

    /// Hash a plaintext password into a PHC string.
    pub fn hash(&self, plaintext: &str) -> Result<String> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = self
            .argon2()
            .hash_password(plaintext.as_bytes(), &salt)
            .map_err(|e| ShareError::Internal(format!("password hashing failed: {e}")))?;
        Ok(hash.to_string())
    }

    /// Check a plaintext password against a stored hash.
    ///
    /// A mismatch and an unparsable stored hash both yield `false`.
    pub fn verify(&self, plaintext: &str, hash: &str) -> bool {
        let parsed = match PasswordHash::new(hash) {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!("Stored password hash is malformed: {}", e);
                return false;
            }
        };

        // Parameters come from the parsed hash, not from self.params.
        Argon2::default()
            .verify_password(plaintext.as_bytes(), &parsed)
            .is_ok()
    }
}

impl Default for PasswordGuard {
    /// Argon2id with 19 MiB memory, 2 iterations, 1 lane.
    fn default() -> Self {
        Self {
            params: Params::new(19 * 1024, 2, 1, None).unwrap_or_default(),
        }
    }
}

/// Normalize an optional password field.
///
/// Blank input counts as "no password". Anything else must reach
/// `min_length` characters.
pub fn validate_optional_password(
    password: Option<&str>,
    min_length: usize,
) -> Result<Option<&str>> {
    match password {
        None => Ok(None),
        Some(p) if p.trim().is_empty() => Ok(None),
        Some(p) if p.chars().count() < min_length => Err(ShareError::WeakPassword { min_length }),
        Some(p) => Ok(Some(p)),
    }
}
