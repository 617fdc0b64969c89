//! Authentication sessions
//!
//! A session carries the single-ceremony challenge handed to the client.

use rand::rngs::OsRng;
use rand::RngCore;
use std::time::Duration;

use crate::store::ExpiringStore;

/// Random bytes drawn for each challenge and session identifier
pub const TOKEN_BYTES: usize = 16;

/// Default session lifetime (5 minutes)
pub const SESSION_TTL: Duration = Duration::from_secs(5 * 60);

/// A pending authentication ceremony
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub session_id: String,
    pub identity: String,
    pub credential_id: String,
    /// Hex-encoded challenge the authenticator must sign
    pub challenge: String,
}

impl Session {
    /// Start a session for `identity` with a fresh challenge and identifier
    pub fn generate(identity: impl Into<String>, credential_id: impl Into<String>) -> Self {
        Self {
            session_id: random_hex_token(),
            identity: identity.into(),
            credential_id: credential_id.into(),
            challenge: random_hex_token(),
        }
    }
}

/// Sessions keyed by session identifier
pub type SessionStore = ExpiringStore<String, Session>;

/// Hex string of [`TOKEN_BYTES`] bytes from the operating system CSPRNG
pub fn random_hex_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_shape() {
        let token = random_hex_token();
        assert_eq!(token.len(), TOKEN_BYTES * 2);
        assert!(token.bytes().all(|b| b.is_ascii_hexdigit()));
    }

    #[test]
    fn test_generated_sessions_are_independent() {
        let a = Session::generate("alice", "cred-1");
        let b = Session::generate("alice", "cred-1");
        assert_ne!(a.session_id, b.session_id);
        assert_ne!(a.challenge, b.challenge);
        assert_ne!(a.session_id, a.challenge);
        assert_eq!(a.identity, "alice");
        assert_eq!(a.credential_id, "cred-1");
    }
}
