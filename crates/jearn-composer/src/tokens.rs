//! Short-lived memory of submission tokens, for echo suppression.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use uuid::Uuid;
use web_time::Instant;

use crate::collab::BroadcastChannel;
use crate::config::ComposerConfig;

/// Remembers idempotency tokens of recent submissions for a fixed window.
#[derive(Debug)]
pub struct RecentTokens {
    ttl: Duration,
    seen: Mutex<HashMap<Uuid, Instant>>,
}

impl RecentTokens {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            seen: Mutex::new(HashMap::new()),
        }
    }

    /// Window taken from the `[echo]` section.
    pub fn from_config(config: &ComposerConfig) -> Self {
        Self::new(config.token_ttl())
    }

    fn with_seen<R>(&self, f: impl FnOnce(&mut HashMap<Uuid, Instant>) -> R) -> R {
        let mut seen = match self.seen.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        f(&mut seen)
    }

    /// Remember `token`, dropping entries that have already expired.
    pub fn remember_at(&self, token: Uuid, now: Instant) {
        let ttl = self.ttl;
        self.with_seen(|seen| {
            seen.retain(|_, at| now.saturating_duration_since(*at) < ttl);
            seen.insert(token, now);
        });
    }

    /// True if `token` was remembered less than the window ago. Expired
    /// entries are dropped on the way.
    pub fn is_own_at(&self, token: &Uuid, now: Instant) -> bool {
        let ttl = self.ttl;
        self.with_seen(|seen| {
            seen.retain(|_, at| now.saturating_duration_since(*at) < ttl);
            seen.contains_key(token)
        })
    }

    /// Number of tokens currently held, expired or not.
    pub fn len(&self) -> usize {
        self.with_seen(|seen| seen.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_own(&self, token: &Uuid) -> bool {
        self.is_own_at(token, Instant::now())
    }
}

impl BroadcastChannel for RecentTokens {
    fn remember(&self, token: Uuid) {
        self.remember_at(token, Instant::now());
    }
}
