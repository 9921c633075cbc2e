//! Session-bound nonce tokens for the upload and remove endpoints.
//!
//! Tokens are an HMAC over `(time window, action, session)` truncated to a
//! short hex string. A token stays valid for the window it was minted in and
//! the one after it, so a page rendered just before a window rollover can
//! still submit.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::time::{SystemTime, UNIX_EPOCH};

type HmacSha256 = Hmac<Sha256>;

const NONCE_LEN: usize = 16;

#[derive(Clone)]
pub struct NonceService {
    secret: String,
    lifetime_seconds: u64,
}

impl NonceService {
    pub fn new(secret: impl Into<String>, lifetime_seconds: u64) -> Self {
        Self {
            secret: secret.into(),
            lifetime_seconds: lifetime_seconds.max(1),
        }
    }

    /// Creates a nonce for an action, bound to the caller's session token
    /// (empty string for anonymous sessions).
    pub fn create(&self, action: &str, session: &str) -> String {
        self.token_for_tick(self.current_tick(), action, session)
    }

    /// Verifies a nonce against the current and previous time window.
    pub fn verify(&self, token: &str, action: &str, session: &str) -> bool {
        if token.is_empty() {
            return false;
        }

        let tick = self.current_tick();

        // Constant-length hex comparison; both candidate windows are always
        // computed so timing does not reveal which one matched.
        let current = self.token_for_tick(tick, action, session);
        let previous = self.token_for_tick(tick.saturating_sub(1), action, session);

        constant_time_eq(token, &current) | constant_time_eq(token, &previous)
    }

    fn current_tick(&self) -> u64 {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);

        // Two ticks per lifetime, so a freshly minted token lives for at
        // least half a lifetime and at most a full one.
        now / (self.lifetime_seconds / 2).max(1)
    }

    fn token_for_tick(&self, tick: u64, action: &str, session: &str) -> String {
        let mut mac = HmacSha256::new_from_slice(self.secret.as_bytes())
            .expect("HMAC accepts keys of any length");
        mac.update(format!("{}|{}|{}", tick, action, session).as_bytes());

        let digest = hex::encode(mac.finalize().into_bytes());
        digest[..NONCE_LEN].to_string()
    }
}

fn constant_time_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    a.bytes().zip(b.bytes()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
