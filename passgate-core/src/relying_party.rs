//! Credential and session lifecycle
//!
//! [`RelyingParty`] owns the credential and session stores and runs the three
//! ceremonies: register a credential, issue a challenge, verify an assertion.

use std::time::Duration;

use crate::assertion::{AssertionPayload, AssertionVerifier, VerificationPolicy};
use crate::credential::{Credential, CredentialStore, PublicKeyCoordinates, CREDENTIAL_TTL};
use crate::error::{PassgateError, Result};
use crate::session::{Session, SessionStore, SESSION_TTL};

/// Store lifetimes and verification policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelyingPartyOptions {
    pub credential_ttl: Duration,
    pub session_ttl: Duration,
    pub policy: VerificationPolicy,
}

impl Default for RelyingPartyOptions {
    fn default() -> Self {
        Self {
            credential_ttl: CREDENTIAL_TTL,
            session_ttl: SESSION_TTL,
            policy: VerificationPolicy::default(),
        }
    }
}

/// Signed assertion submitted for an identity and session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssertionRequest {
    pub identity: String,
    pub session_id: String,
    pub payload: AssertionPayload,
}

/// Relying party state shared by every request handler
#[derive(Debug)]
pub struct RelyingParty {
    credentials: CredentialStore,
    sessions: SessionStore,
    verifier: AssertionVerifier,
}

impl Default for RelyingParty {
    fn default() -> Self {
        Self::new(RelyingPartyOptions::default())
    }
}

impl RelyingParty {
    pub fn new(options: RelyingPartyOptions) -> Self {
        Self {
            credentials: CredentialStore::new(options.credential_ttl),
            sessions: SessionStore::new(options.session_ttl),
            verifier: AssertionVerifier::new(options.policy),
        }
    }

    pub fn credentials(&self) -> &CredentialStore {
        &self.credentials
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    pub fn policy(&self) -> VerificationPolicy {
        self.verifier.policy()
    }

    /// Register a public key for a new identity.
    ///
    /// The key is stored as given; it is validated when first used.
    pub fn register(
        &self,
        identity: &str,
        public_key: PublicKeyCoordinates,
        credential_id: &str,
    ) -> Result<()> {
        if identity.is_empty() {
            return Err(PassgateError::InvalidInput("identity is empty".into()));
        }

        let credential = Credential::new(identity, public_key, credential_id);
        if !self
            .credentials
            .insert_if_absent(identity.to_string(), credential, Duration::ZERO)
        {
            tracing::info!(identity = %identity, "Registration refused: identity exists");
            return Err(PassgateError::Conflict(format!(
                "identity {identity} is already registered"
            )));
        }

        tracing::info!(identity = %identity, credential_id = %credential_id, "Credential registered");
        Ok(())
    }

    /// Issue a fresh challenge for a registered identity
    pub fn issue_challenge(&self, identity: &str) -> Result<Session> {
        let credential = self
            .credentials
            .get(identity)
            .ok_or_else(|| PassgateError::NotFound(format!("no credential for {identity}")))?;

        let session = Session::generate(identity, credential.credential_id);
        self.sessions
            .set(session.session_id.clone(), session.clone(), Duration::ZERO);

        tracing::info!(identity = %identity, session_id = %session.session_id, "Challenge issued");
        Ok(session)
    }

    /// Verify an assertion and persist the new signature counter.
    ///
    /// Unknown identities, unknown or expired sessions, failed checks and lost
    /// counter races all yield [`PassgateError::Rejected`].
    pub fn verify_assertion(&self, rp_id: &[u8], request: &AssertionRequest) -> Result<u32> {
        let Some(credential) = self.credentials.get(request.identity.as_str()) else {
            tracing::debug!(identity = %request.identity, "Assertion for unknown identity");
            return Err(PassgateError::Rejected);
        };

        let owned_by = |s: &Session| s.identity == credential.identity;
        let session = if self.policy().consume_sessions {
            self.sessions.take_if(request.session_id.as_str(), owned_by)
        } else {
            self.sessions
                .get(request.session_id.as_str())
                .filter(owned_by)
        };
        let Some(session) = session else {
            tracing::debug!(
                identity = %request.identity,
                session_id = %request.session_id,
                "Assertion for unknown or foreign session"
            );
            return Err(PassgateError::Rejected);
        };

        let verdict = self.verifier.verify(
            rp_id,
            credential.sign_count,
            &session.challenge,
            &credential.public_key,
            &request.payload,
        );
        if !verdict.valid {
            return Err(PassgateError::Rejected);
        }

        if !self.credentials.advance_sign_count(
            &credential.identity,
            credential.sign_count,
            verdict.sign_count,
        ) {
            tracing::warn!(
                identity = %request.identity,
                sign_count = verdict.sign_count,
                "Counter changed concurrently, assertion rejected"
            );
            return Err(PassgateError::Rejected);
        }

        tracing::info!(
            identity = %request.identity,
            sign_count = verdict.sign_count,
            "Assertion verified"
        );
        Ok(verdict.sign_count)
    }

    /// Drop expired credentials and sessions, returning how many were removed
    pub fn purge_expired(&self) -> usize {
        self.credentials.purge_expired() + self.sessions.purge_expired()
    }
}
