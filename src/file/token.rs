//! Download token generation.
//!
//! Tokens are random UUID v4 strings. Before handing one out the generator
//! asks the metadata store whether it is already taken and redraws on a
//! collision, up to [`MAX_TOKEN_ATTEMPTS`] times. The check does not reserve
//! the token; the store's UNIQUE index is the authoritative guard.

use std::future::Future;

use tracing::{debug, error, warn};
use uuid::Uuid;

use crate::{Result, ShareError};

/// Upper bound on draws per token request.
pub const MAX_TOKEN_ATTEMPTS: usize = 10;

/// Read-only uniqueness probe the generator runs against.
pub trait TokenLookup {
    /// Whether any record already holds `token`.
    fn token_exists(&self, token: &str) -> impl Future<Output = Result<bool>> + Send;
}

/// Issues unguessable, currently-unused download tokens.
#[derive(Debug, Clone)]
pub struct TokenGenerator {
    max_attempts: usize,
    draw: fn() -> String,
}

fn random_token() -> String {
    Uuid::new_v4().to_string()
}

impl TokenGenerator {
    /// Generator drawing random UUID v4 tokens.
    pub fn new() -> Self {
        Self {
            max_attempts: MAX_TOKEN_ATTEMPTS,
            draw: random_token,
        }
    }

    /// Replace the token source. Used to force collisions in tests.
    pub fn with_source(mut self, draw: fn() -> String) -> Self {
        self.draw = draw;
        self
    }

    /// Number of draws allowed per request.
    pub fn max_attempts(&self) -> usize {
        self.max_attempts
    }

    /// Draw a single token without checking uniqueness.
    pub fn draw(&self) -> String {
        (self.draw)()
    }

    /// Return the first draw `lookup` reports as unused.
    pub async fn generate_unique_token<L>(&self, lookup: &L) -> Result<String>
    where
        L: TokenLookup + Sync,
    {
        for attempt in 1..=self.max_attempts {
            let token = self.draw();
            if !lookup.token_exists(&token).await? {
                debug!("Generated unique token in {} attempt(s)", attempt);
                return Ok(token);
            }
            warn!(
                "Token collision detected on attempt {}/{}",
                attempt, self.max_attempts
            );
        }

        error!(
            "Failed to generate unique token after {} attempts",
            self.max_attempts
        );
        Err(ShareError::TokenGenerationFailed {
            attempts: self.max_attempts,
        })
    }
}

impl Default for TokenGenerator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Reports the first `collisions` probes as taken.
    struct CollidingLookup {
        collisions: usize,
        probes: AtomicUsize,
        seen: Mutex<Vec<String>>,
    }

    impl CollidingLookup {
        fn new(collisions: usize) -> Self {
            Self {
                collisions,
                probes: AtomicUsize::new(0),
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    impl TokenLookup for CollidingLookup {
        async fn token_exists(&self, token: &str) -> Result<bool> {
            self.seen.lock().unwrap().push(token.to_string());
            let n = self.probes.fetch_add(1, Ordering::SeqCst);
            Ok(n < self.collisions)
        }
    }

    struct FailingLookup;

    impl TokenLookup for FailingLookup {
        async fn token_exists(&self, _token: &str) -> Result<bool> {
            Err(ShareError::Database("connection lost".into()))
        }
    }

    #[tokio::test]
    async fn test_first_draw_wins_without_collision() {
        let lookup = CollidingLookup::new(0);
        let token = TokenGenerator::new()
            .generate_unique_token(&lookup)
            .await
            .unwrap();

        assert!(Uuid::parse_str(&token).is_ok());
        assert_eq!(lookup.probes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_retries_after_collisions() {
        let lookup = CollidingLookup::new(3);
        let token = TokenGenerator::new()
            .generate_unique_token(&lookup)
            .await
            .unwrap();

        assert_eq!(lookup.probes.load(Ordering::SeqCst), 4);
        let seen = lookup.seen.lock().unwrap();
        assert_eq!(seen.last().unwrap(), &token);
        // Each attempt is a fresh draw.
        let distinct: HashSet<_> = seen.iter().collect();
        assert_eq!(distinct.len(), 4);
    }

    #[tokio::test]
    async fn test_exhausted_attempts_fail() {
        let lookup = CollidingLookup::new(usize::MAX);
        let result = TokenGenerator::new().generate_unique_token(&lookup).await;

        assert!(matches!(
            result,
            Err(ShareError::TokenGenerationFailed { attempts: 10 })
        ));
        assert_eq!(lookup.probes.load(Ordering::SeqCst), MAX_TOKEN_ATTEMPTS);
    }

    #[tokio::test]
    async fn test_lookup_errors_propagate() {
        let result = TokenGenerator::new()
            .generate_unique_token(&FailingLookup)
            .await;
        assert!(matches!(result, Err(ShareError::Database(_))));
    }

    #[test]
    fn test_custom_source() {
        let generator = TokenGenerator::new().with_source(|| "fixed".to_string());
        assert_eq!(generator.draw(), "fixed");
    }

    #[test]
    fn test_draws_are_distinct() {
        let generator = TokenGenerator::new();
        let tokens: HashSet<String> = (0..1000).map(|_| generator.draw()).collect();
        assert_eq!(tokens.len(), 1000);
    }
}
