//! Admin authorization gate
//!
//! Ephemeral bearer tokens protecting the search/delete surface. The token
//! set is a process-wide map from opaque token to issuance time; liveness is
//! computed at lookup (`now - issued_at < ttl`) rather than by scheduled
//! deletion, which keeps expiry a pure function of time. Nothing survives a
//! restart, and multiple tokens may be live at once.

use rand::Rng;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::config::AdminConfig;
use crate::error::{Result, ServiceError};

pub struct AdminGate {
    username: String,
    password: String,
    ttl_secs: u64,
    tokens: Mutex<HashMap<String, u64>>,
}

impl AdminGate {
    pub fn new(config: &AdminConfig) -> Self {
        Self {
            username: config.username.clone(),
            password: config.password.clone(),
            ttl_secs: config.token_ttl_hours * 3600,
            tokens: Mutex::new(HashMap::new()),
        }
    }

    /// Check the supplied credentials and, on match, issue a fresh token.
    ///
    /// Login is the only insertion point, so it doubles as the sweep for
    /// entries whose TTL has elapsed.
    pub fn login(&self, username: &str, password: &str) -> Result<String> {
        if username != self.username || password != self.password {
            tracing::warn!("Failed admin login attempt");
            return Err(ServiceError::InvalidCredentials);
        }

        let token = generate_token();
        let now = unix_now();

        let mut tokens = self.tokens.lock().expect("token lock poisoned");
        tokens.retain(|_, issued_at| now - *issued_at < self.ttl_secs);
        tokens.insert(token.clone(), now);

        tracing::info!("Admin login successful");
        Ok(token)
    }

    /// Validate a `Bearer <token>` authorization header value.
    pub fn authorize(&self, bearer_header: Option<&str>) -> Result<()> {
        let token = bearer_header
            .and_then(|h| h.strip_prefix("Bearer "))
            .ok_or(ServiceError::Unauthorized)?;

        if self.is_valid(token) {
            Ok(())
        } else {
            Err(ServiceError::Unauthorized)
        }
    }

    fn is_valid(&self, token: &str) -> bool {
        let tokens = self.tokens.lock().expect("token lock poisoned");
        match tokens.get(token) {
            Some(issued_at) => unix_now() - issued_at < self.ttl_secs,
            None => false,
        }
    }
}

/// Generate an opaque 32-character alphanumeric token
fn generate_token() -> String {
    let mut rng = rand::thread_rng();
    (0..32)
        .map(|_| {
            let idx = rng.gen_range(0..62);
            match idx {
                0..=25 => (b'A' + idx) as char,
                26..=51 => (b'a' + (idx - 26)) as char,
                _ => (b'0' + (idx - 52)) as char,
            }
        })
        .collect()
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gate(ttl_hours: u64) -> AdminGate {
        AdminGate::new(&AdminConfig {
            username: "admin".to_string(),
            password: "cyber_admin_2026".to_string(),
            token_ttl_hours: ttl_hours,
        })
    }

    #[test]
    fn test_generate_token_shape() {
        let token1 = generate_token();
        let token2 = generate_token();

        assert_eq!(token1.len(), 32);
        assert_ne!(token1, token2);
        assert!(token1.chars().all(|c| c.is_alphanumeric()));
    }

    #[test]
    fn test_login_with_wrong_credentials() {
        let gate = gate(8);
        let err = gate.login("admin", "wrong").unwrap_err();
        assert!(matches!(err, ServiceError::InvalidCredentials));

        let err = gate.login("root", "cyber_admin_2026").unwrap_err();
        assert!(matches!(err, ServiceError::InvalidCredentials));
    }

    #[test]
    fn test_login_and_authorize_roundtrip() {
        let gate = gate(8);
        let token = gate.login("admin", "cyber_admin_2026").unwrap();

        gate.authorize(Some(&format!("Bearer {token}"))).unwrap();
    }

    #[test]
    fn test_authorize_rejects_bad_headers() {
        let gate = gate(8);
        let token = gate.login("admin", "cyber_admin_2026").unwrap();

        assert!(gate.authorize(None).is_err());
        assert!(gate.authorize(Some("Basic abc")).is_err());
        // Token alone, without the Bearer prefix
        assert!(gate.authorize(Some(&token)).is_err());
        assert!(gate.authorize(Some("Bearer not-a-real-token")).is_err());
    }

    #[test]
    fn test_token_expires_after_ttl() {
        let gate = gate(8);
        let token = gate.login("admin", "cyber_admin_2026").unwrap();

        // Backdate the issuance past the 8 hour TTL
        {
            let mut tokens = gate.tokens.lock().unwrap();
            *tokens.get_mut(&token).unwrap() = unix_now() - 8 * 3600 - 1;
        }

        assert!(gate.authorize(Some(&format!("Bearer {token}"))).is_err());
    }

    #[test]
    fn test_multiple_tokens_coexist() {
        let gate = gate(8);
        let token1 = gate.login("admin", "cyber_admin_2026").unwrap();
        let token2 = gate.login("admin", "cyber_admin_2026").unwrap();

        gate.authorize(Some(&format!("Bearer {token1}"))).unwrap();
        gate.authorize(Some(&format!("Bearer {token2}"))).unwrap();
    }

    #[test]
    fn test_login_sweeps_expired_tokens() {
        let gate = gate(8);
        let stale = gate.login("admin", "cyber_admin_2026").unwrap();
        {
            let mut tokens = gate.tokens.lock().unwrap();
            *tokens.get_mut(&stale).unwrap() = unix_now() - 9 * 3600;
        }

        gate.login("admin", "cyber_admin_2026").unwrap();

        let tokens = gate.tokens.lock().unwrap();
        assert!(!tokens.contains_key(&stale));
    }
}
