//! Passgate Core - WebAuthn relying-party authentication core
//!
//! Verifies FIDO2/WebAuthn assertions signed with ECDSA P-256 against a
//! registered public key and a server-issued challenge, and enforces
//! replay protection through the authenticator's signature counter.
//!
//! # Features
//!
//! - Ordered assertion checks (curve point, client data, challenge, RP id,
//!   signature, counter) that collapse to a single valid/invalid verdict
//! - Expiring in-memory credential and session stores
//! - Atomic compare-and-update of the signature counter
//! - Challenges and session identifiers drawn from the OS CSPRNG
//!
//! # Example
//!
//! ```
//! use passgate_core::{AssertionRequest, RelyingParty, SoftAuthenticator};
//!
//! # fn example() -> passgate_core::Result<()> {
//! let rp = RelyingParty::default();
//! let mut authenticator = SoftAuthenticator::new("example.com");
//!
//! rp.register("alice", authenticator.public_key(), authenticator.credential_id())?;
//! let session = rp.issue_challenge("alice")?;
//!
//! let payload = authenticator
//!     .assert_hex(&session.challenge)
//!     .expect("session challenge is hex");
//! let request = AssertionRequest {
//!     identity: "alice".into(),
//!     session_id: session.session_id,
//!     payload,
//! };
//!
//! assert_eq!(rp.verify_assertion(b"example.com", &request)?, 2);
//! # Ok(())
//! # }
//! # example().unwrap();
//! ```

pub mod assertion;
pub mod credential;
pub mod error;
pub mod relying_party;
pub mod session;
pub mod simulator;
pub mod store;

// Re-export main types for convenience
pub use assertion::{
    AssertionPayload, AssertionVerifier, AuthenticatorData, VerificationError,
    VerificationPolicy, Verdict, MIN_AUTHENTICATOR_DATA_LEN,
};
pub use credential::{
    Credential, CredentialStore, PublicKeyCoordinates, CREDENTIAL_TTL, INITIAL_SIGN_COUNT,
};
pub use error::{PassgateError, Result};
pub use relying_party::{AssertionRequest, RelyingParty, RelyingPartyOptions};
pub use session::{random_hex_token, Session, SessionStore, SESSION_TTL};
pub use simulator::SoftAuthenticator;
pub use store::ExpiringStore;
