//! Software authenticator for tests and local tooling
//!
//! Produces assertion payloads the same way a platform authenticator would:
//! builds authenticator data for the relying party, wraps the challenge in
//! `clientDataJSON`, and signs `authenticatorData || SHA-256(clientDataJSON)`
//! with a P-256 key.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use p256::ecdsa::{signature::Signer as _, DerSignature, SigningKey};
use rand::rngs::OsRng;
use sha2::{Digest, Sha256};

use crate::assertion::{
    AssertionPayload, ASSERTION_CEREMONY, FLAG_USER_PRESENT, FLAG_USER_VERIFIED,
};
use crate::credential::{PublicKeyCoordinates, INITIAL_SIGN_COUNT};
use crate::session::random_hex_token;

/// In-process P-256 authenticator
#[derive(Clone)]
pub struct SoftAuthenticator {
    signing_key: SigningKey,
    rp_id: String,
    credential_id: String,
    flags: u8,
    sign_count: u32,
}

impl SoftAuthenticator {
    /// Authenticator with a fresh random key
    pub fn new(rp_id: impl Into<String>) -> Self {
        Self::with_key(rp_id, SigningKey::random(&mut OsRng))
    }

    /// Authenticator with a deterministic key derived from `seed`
    pub fn from_seed(rp_id: impl Into<String>, seed: [u8; 32]) -> Result<Self, p256::ecdsa::Error> {
        let signing_key = SigningKey::from_bytes(&seed.into())?;
        Ok(Self::with_key(rp_id, signing_key))
    }

    fn with_key(rp_id: impl Into<String>, signing_key: SigningKey) -> Self {
        Self {
            signing_key,
            rp_id: rp_id.into(),
            credential_id: random_hex_token(),
            flags: FLAG_USER_PRESENT | FLAG_USER_VERIFIED,
            sign_count: INITIAL_SIGN_COUNT,
        }
    }

    /// Override the authenticator data flags byte
    pub fn with_flags(mut self, flags: u8) -> Self {
        self.flags = flags;
        self
    }

    pub fn public_key(&self) -> PublicKeyCoordinates {
        PublicKeyCoordinates::from_verifying_key(self.signing_key.verifying_key())
    }

    pub fn credential_id(&self) -> &str {
        &self.credential_id
    }

    pub fn rp_id(&self) -> &str {
        &self.rp_id
    }

    pub fn sign_count(&self) -> u32 {
        self.sign_count
    }

    pub fn set_sign_count(&mut self, sign_count: u32) {
        self.sign_count = sign_count;
    }

    /// Increment the counter and sign an assertion over `challenge`
    pub fn assert(&mut self, challenge: &[u8]) -> AssertionPayload {
        self.sign_count = self.sign_count.wrapping_add(1);
        let origin = format!("https://{}", self.rp_id);
        let client_data = Self::client_data_json(ASSERTION_CEREMONY, challenge, &origin);
        let authenticator_data = self.authenticator_data(self.sign_count);
        self.sign_raw(&authenticator_data, &client_data)
    }

    /// Like [`assert`](Self::assert) for a hex-encoded session challenge
    pub fn assert_hex(&mut self, challenge: &str) -> Result<AssertionPayload, hex::FromHexError> {
        let challenge = hex::decode(challenge)?;
        Ok(self.assert(&challenge))
    }

    /// rpIdHash || flags || big-endian counter
    pub fn authenticator_data(&self, sign_count: u32) -> Vec<u8> {
        let mut data = Vec::with_capacity(37);
        data.extend_from_slice(&Sha256::digest(self.rp_id.as_bytes()));
        data.push(self.flags);
        data.extend_from_slice(&sign_count.to_be_bytes());
        data
    }

    /// Serialized `CollectedClientData`
    pub fn client_data_json(ceremony: &str, challenge: &[u8], origin: &str) -> Vec<u8> {
        let value = serde_json::json!({
            "type": ceremony,
            "challenge": URL_SAFE_NO_PAD.encode(challenge),
            "origin": origin,
            "crossOrigin": false
        });
        value.to_string().into_bytes()
    }

    /// Sign arbitrary authenticator data and client data bytes
    pub fn sign_raw(&self, authenticator_data: &[u8], client_data_json: &[u8]) -> AssertionPayload {
        let mut signed_data = Vec::with_capacity(authenticator_data.len() + 32);
        signed_data.extend_from_slice(authenticator_data);
        signed_data.extend_from_slice(&Sha256::digest(client_data_json));

        let signature: DerSignature = self.signing_key.sign(&signed_data);
        AssertionPayload {
            authenticator_data: hex::encode(authenticator_data),
            client_data_json: hex::encode(client_data_json),
            signature: hex::encode(signature.as_bytes()),
        }
    }
}

impl std::fmt::Debug for SoftAuthenticator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SoftAuthenticator")
            .field("rp_id", &self.rp_id)
            .field("credential_id", &self.credential_id)
            .field("flags", &self.flags)
            .field("sign_count", &self.sign_count)
            .finish_non_exhaustive()
    }
}
