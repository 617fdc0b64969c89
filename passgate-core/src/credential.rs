//! Registered credentials
//!
//! A credential binds an identity to a P-256 public key and tracks the
//! authenticator's signature counter.

use p256::ecdsa::VerifyingKey;
use p256::{EncodedPoint, FieldBytes};
use std::time::Duration;

use crate::store::ExpiringStore;

/// Counter assigned to a freshly registered credential
pub const INITIAL_SIGN_COUNT: u32 = 1;

/// Default credential lifetime (1 hour)
pub const CREDENTIAL_TTL: Duration = Duration::from_secs(60 * 60);

/// Length of a P-256 field element in hex characters
const COORDINATE_HEX_LEN: usize = 64;

/// Affine public key coordinates as submitted by the client
///
/// Both values are base-16 big integers without a radix prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicKeyCoordinates {
    pub x: String,
    pub y: String,
}

impl PublicKeyCoordinates {
    pub fn new(x: impl Into<String>, y: impl Into<String>) -> Self {
        Self {
            x: x.into(),
            y: y.into(),
        }
    }

    /// Build a verifying key, rejecting points that are not on P-256.
    ///
    /// Returns `None` for malformed hex, values wider than a field element,
    /// coordinates outside the field, or points off the curve.
    pub fn to_verifying_key(&self) -> Option<VerifyingKey> {
        let x = parse_coordinate(&self.x)?;
        let y = parse_coordinate(&self.y)?;
        let point = EncodedPoint::from_affine_coordinates(&x, &y, false);
        VerifyingKey::from_encoded_point(&point).ok()
    }

    /// Coordinates of an existing key, in the same hex form clients submit
    pub fn from_verifying_key(key: &VerifyingKey) -> Self {
        let point = key.to_encoded_point(false);
        // An uncompressed point always carries both coordinates.
        let x = point.x().map(hex::encode).unwrap_or_default();
        let y = point.y().map(hex::encode).unwrap_or_default();
        Self { x, y }
    }
}

/// Parse a base-16 big integer into a 32-byte big-endian field encoding
fn parse_coordinate(value: &str) -> Option<FieldBytes> {
    if value.is_empty() || !value.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    let digits = value.trim_start_matches('0');
    if digits.len() > COORDINATE_HEX_LEN {
        return None;
    }
    let padded = format!("{:0>width$}", digits, width = COORDINATE_HEX_LEN);
    let mut bytes = FieldBytes::default();
    hex::decode_to_slice(padded, &mut bytes).ok()?;
    Some(bytes)
}

/// A registered credential
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential {
    /// Unique identity (user name) owning this credential
    pub identity: String,
    /// Public key as submitted at registration
    pub public_key: PublicKeyCoordinates,
    /// Authenticator-assigned credential identifier
    pub credential_id: String,
    /// Last accepted signature counter
    pub sign_count: u32,
}

impl Credential {
    pub fn new(
        identity: impl Into<String>,
        public_key: PublicKeyCoordinates,
        credential_id: impl Into<String>,
    ) -> Self {
        Self {
            identity: identity.into(),
            public_key,
            credential_id: credential_id.into(),
            sign_count: INITIAL_SIGN_COUNT,
        }
    }
}

/// Credentials keyed by identity
pub type CredentialStore = ExpiringStore<String, Credential>;

impl CredentialStore {
    /// Advance a credential's counter from `expected` to `next`.
    ///
    /// Succeeds only if the stored counter still equals `expected` and `next`
    /// is strictly greater. The check and the write happen under the entry's
    /// exclusive lock, so concurrent verifications of the same assertion can
    /// advance the counter at most once.
    pub fn advance_sign_count(&self, identity: &str, expected: u32, next: u32) -> bool {
        self.update(identity, |credential| {
            if credential.sign_count == expected && next > expected {
                credential.sign_count = next;
                (true, true)
            } else {
                (false, false)
            }
        })
        .unwrap_or(false)
    }
}
