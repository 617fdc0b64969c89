//! WebAuthn assertion verification
//!
//! Checks a signed `navigator.credentials.get` response against a stored
//! P-256 public key, the server-issued challenge and the relying party id.
//!
//! The checks run in a fixed order and stop at the first failure:
//!
//! 1. public key point is on P-256
//! 2. hex decoding of signature, authenticator data and client data
//! 3. authenticator data is at least 37 bytes
//! 4. client data is UTF-8 and valid JSON
//! 5. client data has the expected structure
//! 6. ceremony type is `webauthn.get`
//! 7. challenge is unpadded base64url
//! 8. challenge equals the session challenge
//! 9. authenticator data fields (and the UP flag, if required by policy)
//! 10. `SHA-256(rp_id)` equals the rpIdHash
//! 11. DER ECDSA signature over `authenticatorData || SHA-256(clientDataJSON)`
//! 12. signature counter is strictly greater than the stored one
//!
//! Callers only ever see a [`Verdict`]; the failing step is logged at debug
//! level and otherwise discarded.

use std::fmt;

use base64::{
    alphabet,
    engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig},
    Engine,
};
use p256::ecdsa::{signature::Verifier as _, DerSignature};
use serde::de::{Deserialize, Deserializer, IgnoredAny, MapAccess, Visitor};
use sha2::{Digest, Sha256};

use crate::credential::PublicKeyCoordinates;

/// rpIdHash (32) + flags (1) + signCount (4)
pub const MIN_AUTHENTICATOR_DATA_LEN: usize = 37;

/// `clientDataJSON.type` of an authentication ceremony
pub const ASSERTION_CEREMONY: &str = "webauthn.get";

/// User Present bit of the authenticator data flags
pub const FLAG_USER_PRESENT: u8 = 0x01;

/// User Verified bit of the authenticator data flags
pub const FLAG_USER_VERIFIED: u8 = 0x04;

/// Reasons an assertion is refused, one per verification step
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VerificationError {
    #[error("stored public key is not a valid P-256 point")]
    InvalidPublicKey,

    #[error("{field} is not valid hex")]
    InvalidHex { field: &'static str },

    #[error("authenticator data is {0} bytes, need at least {min}", min = MIN_AUTHENTICATOR_DATA_LEN)]
    AuthenticatorDataTooShort(usize),

    #[error("client data is not UTF-8")]
    ClientDataNotUtf8,

    #[error("client data is not valid JSON")]
    ClientDataNotJson,

    #[error("client data has unexpected structure: {0}")]
    ClientDataStructure(String),

    #[error("ceremony type {0:?} is not {expected:?}", expected = ASSERTION_CEREMONY)]
    WrongCeremony(String),

    #[error("client challenge is not unpadded base64url")]
    ChallengeEncoding,

    #[error("client challenge does not match the session challenge")]
    ChallengeMismatch,

    #[error("user presence flag not set")]
    UserNotPresent,

    #[error("rpIdHash does not match the relying party id")]
    RpIdMismatch,

    #[error("signature is malformed or does not verify")]
    InvalidSignature,

    #[error("signature counter {received} does not exceed stored counter {previous}")]
    CounterNotIncreased { previous: u32, received: u32 },
}

/// Optional hardening beyond the baseline checks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VerificationPolicy {
    /// Require the User Present flag in the authenticator data
    pub require_user_presence: bool,
    /// Remove a session on first use instead of letting it live until expiry
    pub consume_sessions: bool,
}

impl VerificationPolicy {
    /// UP flag enforced and sessions single-use
    pub const fn hardened() -> Self {
        Self {
            require_user_presence: true,
            consume_sessions: true,
        }
    }

    /// No UP check and sessions reusable until they expire
    pub const fn compatible() -> Self {
        Self {
            require_user_presence: false,
            consume_sessions: false,
        }
    }
}

impl Default for VerificationPolicy {
    fn default() -> Self {
        Self::hardened()
    }
}

/// Hex-encoded fields of an authenticator assertion response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssertionPayload {
    pub authenticator_data: String,
    pub client_data_json: String,
    pub signature: String,
}

/// Outcome of a verification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Verdict {
    pub valid: bool,
    /// Counter to persist when `valid`; the previous counter otherwise
    pub sign_count: u32,
}

impl Verdict {
    fn accepted(sign_count: u32) -> Self {
        Self {
            valid: true,
            sign_count,
        }
    }

    fn rejected(previous: u32) -> Self {
        Self {
            valid: false,
            sign_count: previous,
        }
    }
}

/// Parsed fixed-size prefix of authenticator data
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthenticatorData<'a> {
    pub rp_id_hash: &'a [u8],
    pub flags: u8,
    pub sign_count: u32,
}

impl<'a> AuthenticatorData<'a> {
    /// Split authenticator data; trailing extension bytes are ignored.
    pub fn parse(bytes: &'a [u8]) -> Result<Self, VerificationError> {
        if bytes.len() < MIN_AUTHENTICATOR_DATA_LEN {
            return Err(VerificationError::AuthenticatorDataTooShort(bytes.len()));
        }
        let counter: [u8; 4] = [bytes[33], bytes[34], bytes[35], bytes[36]];
        Ok(Self {
            rp_id_hash: &bytes[..32],
            flags: bytes[32],
            sign_count: u32::from_be_bytes(counter),
        })
    }

    pub fn user_present(&self) -> bool {
        self.flags & FLAG_USER_PRESENT != 0
    }

    pub fn user_verified(&self) -> bool {
        self.flags & FLAG_USER_VERIFIED != 0
    }
}

/// Unpadded base64url that tolerates non-zero trailing bits in the last symbol
const CHALLENGE_ENGINE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new()
        .with_encode_padding(false)
        .with_decode_padding_mode(DecodePaddingMode::RequireNone)
        .with_decode_allow_trailing_bits(true),
);

/// `CollectedClientData` fields this verifier reads
///
/// Keys match ASCII case-insensitively and a repeated key overwrites the
/// earlier value. A `null` value leaves its field unset.
#[derive(Debug, Default)]
struct ClientData {
    ceremony: String,
    challenge: String,
    origin: Option<String>,
    cross_origin: Option<bool>,
}

impl<'de> Deserialize<'de> for ClientData {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(ClientDataVisitor)
    }
}

struct ClientDataVisitor;

impl<'de> Visitor<'de> for ClientDataVisitor {
    type Value = ClientData;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a client data object")
    }

    fn visit_unit<E: serde::de::Error>(self) -> Result<ClientData, E> {
        Ok(ClientData::default())
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<ClientData, A::Error> {
        let mut data = ClientData::default();
        while let Some(key) = map.next_key::<String>()? {
            if key.eq_ignore_ascii_case("type") {
                if let Some(value) = map.next_value::<Option<String>>()? {
                    data.ceremony = value;
                }
            } else if key.eq_ignore_ascii_case("challenge") {
                if let Some(value) = map.next_value::<Option<String>>()? {
                    data.challenge = value;
                }
            } else if key.eq_ignore_ascii_case("origin") {
                if let Some(value) = map.next_value::<Option<String>>()? {
                    data.origin = Some(value);
                }
            } else if key.eq_ignore_ascii_case("crossOrigin") {
                if let Some(value) = map.next_value::<Option<bool>>()? {
                    data.cross_origin = Some(value);
                }
            } else {
                map.next_value::<IgnoredAny>()?;
            }
        }
        Ok(data)
    }
}

/// Decode the client challenge; line breaks inside the value are skipped
fn decode_challenge(challenge: &str) -> Result<Vec<u8>, VerificationError> {
    let compact: String = challenge
        .chars()
        .filter(|c| !matches!(c, '\r' | '\n'))
        .collect();
    CHALLENGE_ENGINE
        .decode(compact)
        .map_err(|_| VerificationError::ChallengeEncoding)
}

/// Verifies assertions under a [`VerificationPolicy`]
#[derive(Debug, Clone, Copy, Default)]
pub struct AssertionVerifier {
    policy: VerificationPolicy,
}

impl AssertionVerifier {
    pub fn new(policy: VerificationPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> VerificationPolicy {
        self.policy
    }

    /// Verify an assertion, collapsing every failure into an invalid verdict.
    ///
    /// An invalid verdict carries `previous_count` unchanged; the caller must
    /// not persist anything in that case. This function never mutates state.
    pub fn verify(
        &self,
        rp_id: &[u8],
        previous_count: u32,
        expected_challenge: &str,
        public_key: &PublicKeyCoordinates,
        payload: &AssertionPayload,
    ) -> Verdict {
        match self.check(
            rp_id,
            previous_count,
            expected_challenge,
            public_key,
            payload,
        ) {
            Ok(sign_count) => Verdict::accepted(sign_count),
            Err(error) => {
                tracing::debug!(
                    error = %error,
                    rp_id = %String::from_utf8_lossy(rp_id),
                    "Assertion rejected"
                );
                Verdict::rejected(previous_count)
            }
        }
    }

    /// Run every check and return the new counter, or the first failure.
    pub fn check(
        &self,
        rp_id: &[u8],
        previous_count: u32,
        expected_challenge: &str,
        public_key: &PublicKeyCoordinates,
        payload: &AssertionPayload,
    ) -> Result<u32, VerificationError> {
        let verifying_key = public_key
            .to_verifying_key()
            .ok_or(VerificationError::InvalidPublicKey)?;

        let signature = decode_hex(&payload.signature, "signature")?;
        let authenticator_data = decode_hex(&payload.authenticator_data, "authenticator data")?;
        let client_data_json = decode_hex(&payload.client_data_json, "client data")?;

        if authenticator_data.len() < MIN_AUTHENTICATOR_DATA_LEN {
            return Err(VerificationError::AuthenticatorDataTooShort(
                authenticator_data.len(),
            ));
        }

        let client_data_text = std::str::from_utf8(&client_data_json)
            .map_err(|_| VerificationError::ClientDataNotUtf8)?;
        serde_json::from_str::<IgnoredAny>(client_data_text)
            .map_err(|_| VerificationError::ClientDataNotJson)?;

        let client_data: ClientData = serde_json::from_str(client_data_text)
            .map_err(|e| VerificationError::ClientDataStructure(e.to_string()))?;

        if client_data.ceremony != ASSERTION_CEREMONY {
            return Err(VerificationError::WrongCeremony(client_data.ceremony));
        }

        let client_challenge = decode_challenge(&client_data.challenge)?;
        let session_challenge = hex::decode(expected_challenge)
            .map_err(|_| VerificationError::ChallengeMismatch)?;
        if client_challenge != session_challenge {
            return Err(VerificationError::ChallengeMismatch);
        }

        let parsed = AuthenticatorData::parse(&authenticator_data)?;
        if self.policy.require_user_presence && !parsed.user_present() {
            return Err(VerificationError::UserNotPresent);
        }

        if Sha256::digest(rp_id)[..] != *parsed.rp_id_hash {
            return Err(VerificationError::RpIdMismatch);
        }

        let mut signed_data = Vec::with_capacity(authenticator_data.len() + 32);
        signed_data.extend_from_slice(&authenticator_data);
        signed_data.extend_from_slice(&Sha256::digest(&client_data_json));

        let signature = DerSignature::from_bytes(&signature)
            .map_err(|_| VerificationError::InvalidSignature)?;
        verifying_key
            .verify(&signed_data, &signature)
            .map_err(|_| VerificationError::InvalidSignature)?;

        if parsed.sign_count <= previous_count {
            return Err(VerificationError::CounterNotIncreased {
                previous: previous_count,
                received: parsed.sign_count,
            });
        }

        tracing::trace!(
            origin = client_data.origin.as_deref().unwrap_or(""),
            cross_origin = client_data.cross_origin.unwrap_or(false),
            user_verified = parsed.user_verified(),
            sign_count = parsed.sign_count,
            "Assertion verified"
        );

        Ok(parsed.sign_count)
    }
}

fn decode_hex(value: &str, field: &'static str) -> Result<Vec<u8>, VerificationError> {
    hex::decode(value).map_err(|_| VerificationError::InvalidHex { field })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulator::SoftAuthenticator;
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;

    const RP_ID: &str = "a.example";
    const CHALLENGE: &str = "00112233445566778899aabbccddeeff";

    fn authenticator() -> SoftAuthenticator {
        SoftAuthenticator::from_seed(RP_ID, [42u8; 32]).unwrap()
    }

    fn verifier() -> AssertionVerifier {
        AssertionVerifier::default()
    }

    fn flip_hex_byte(value: &str, index: usize) -> String {
        let mut bytes = hex::decode(value).unwrap();
        bytes[index] ^= 0x01;
        hex::encode(bytes)
    }

    #[test]
    fn test_valid_assertion() {
        let mut auth = authenticator();
        let payload = auth.assert_hex(CHALLENGE).unwrap();
        let verdict = verifier().verify(RP_ID.as_bytes(), 1, CHALLENGE, &auth.public_key(), &payload);
        assert_eq!(
            verdict,
            Verdict {
                valid: true,
                sign_count: 2
            }
        );
    }

    #[test]
    fn test_replay_rejected_by_counter() {
        let mut auth = authenticator();
        let payload = auth.assert_hex(CHALLENGE).unwrap();
        let key = auth.public_key();
        let first = verifier().verify(RP_ID.as_bytes(), 1, CHALLENGE, &key, &payload);
        assert!(first.valid);

        let second = verifier().verify(RP_ID.as_bytes(), first.sign_count, CHALLENGE, &key, &payload);
        assert_eq!(
            second,
            Verdict {
                valid: false,
                sign_count: 2
            }
        );
        assert_eq!(
            verifier().check(RP_ID.as_bytes(), 2, CHALLENGE, &key, &payload),
            Err(VerificationError::CounterNotIncreased {
                previous: 2,
                received: 2
            })
        );
    }

    fn field_mut(payload: &mut AssertionPayload, field: usize) -> &mut String {
        match field {
            0 => &mut payload.signature,
            1 => &mut payload.authenticator_data,
            _ => &mut payload.client_data_json,
        }
    }

    #[test]
    fn test_single_byte_tamper_rejected() {
        let mut auth = authenticator();
        let payload = auth.assert_hex(CHALLENGE).unwrap();
        let key = auth.public_key();

        for field in 0..3 {
            let len = field_mut(&mut payload.clone(), field).len() / 2;
            for index in 0..len {
                let mut tampered = payload.clone();
                let value = field_mut(&mut tampered, field);
                *value = flip_hex_byte(value, index);
                let verdict = verifier().verify(RP_ID.as_bytes(), 1, CHALLENGE, &key, &tampered);
                assert!(!verdict.valid, "field {} byte {} accepted", field, index);
                assert_eq!(verdict.sign_count, 1);
            }
        }
    }

    #[test]
    fn test_cross_rp_id_rejected() {
        let mut auth = authenticator();
        let payload = auth.assert_hex(CHALLENGE).unwrap();
        let result = verifier().check(b"b.example", 1, CHALLENGE, &auth.public_key(), &payload);
        assert_eq!(result, Err(VerificationError::RpIdMismatch));
    }

    #[test]
    fn test_challenge_mismatch_rejected() {
        let mut auth = authenticator();
        let payload = auth.assert_hex(CHALLENGE).unwrap();
        let other = "ffeeddccbbaa99887766554433221100";
        let result = verifier().check(RP_ID.as_bytes(), 1, other, &auth.public_key(), &payload);
        assert_eq!(result, Err(VerificationError::ChallengeMismatch));
    }

    #[test]
    fn test_wrong_key_rejected() {
        let mut auth = authenticator();
        let payload = auth.assert_hex(CHALLENGE).unwrap();
        let other = SoftAuthenticator::from_seed(RP_ID, [7u8; 32]).unwrap();
        let result = verifier().check(RP_ID.as_bytes(), 1, CHALLENGE, &other.public_key(), &payload);
        assert_eq!(result, Err(VerificationError::InvalidSignature));
    }

    #[test]
    fn test_invalid_public_key_rejected_first() {
        let mut auth = authenticator();
        let mut payload = auth.assert_hex(CHALLENGE).unwrap();
        payload.signature = "not hex".into();
        let key = PublicKeyCoordinates::new("1", "2");
        let result = verifier().check(RP_ID.as_bytes(), 1, CHALLENGE, &key, &payload);
        assert_eq!(result, Err(VerificationError::InvalidPublicKey));
    }

    #[test]
    fn test_invalid_hex_rejected() {
        let mut auth = authenticator();
        let mut payload = auth.assert_hex(CHALLENGE).unwrap();
        payload.client_data_json.push('z');
        let result = verifier().check(RP_ID.as_bytes(), 1, CHALLENGE, &auth.public_key(), &payload);
        assert_eq!(
            result,
            Err(VerificationError::InvalidHex {
                field: "client data"
            })
        );
    }

    #[test]
    fn test_short_authenticator_data_rejected() {
        let auth = authenticator();
        let client_data = SoftAuthenticator::client_data_json(
            ASSERTION_CEREMONY,
            &hex::decode(CHALLENGE).unwrap(),
            "https://a.example",
        );
        let payload = auth.sign_raw(&[0u8; 36], &client_data);
        let result = verifier().check(RP_ID.as_bytes(), 1, CHALLENGE, &auth.public_key(), &payload);
        assert_eq!(result, Err(VerificationError::AuthenticatorDataTooShort(36)));
    }

    #[test]
    fn test_extension_bytes_are_ignored() {
        let auth = authenticator();
        let client_data = SoftAuthenticator::client_data_json(
            ASSERTION_CEREMONY,
            &hex::decode(CHALLENGE).unwrap(),
            "https://a.example",
        );
        let mut data = auth.authenticator_data(5);
        data.extend_from_slice(&[0xa1, 0x01, 0x02]);
        let payload = auth.sign_raw(&data, &client_data);
        let result = verifier().check(RP_ID.as_bytes(), 1, CHALLENGE, &auth.public_key(), &payload);
        assert_eq!(result, Ok(5));
    }

    #[test]
    fn test_client_data_must_be_json_object() {
        let auth = authenticator();
        let data = auth.authenticator_data(2);
        let key = auth.public_key();

        let not_utf8 = auth.sign_raw(&data, &[0xff, 0xfe]);
        assert_eq!(
            verifier().check(RP_ID.as_bytes(), 1, CHALLENGE, &key, &not_utf8),
            Err(VerificationError::ClientDataNotUtf8)
        );

        let not_json = auth.sign_raw(&data, b"{\"type\":");
        assert_eq!(
            verifier().check(RP_ID.as_bytes(), 1, CHALLENGE, &key, &not_json),
            Err(VerificationError::ClientDataNotJson)
        );

        let wrong_shape = auth.sign_raw(&data, b"[1, 2, 3]");
        assert!(matches!(
            verifier().check(RP_ID.as_bytes(), 1, CHALLENGE, &key, &wrong_shape),
            Err(VerificationError::ClientDataStructure(_))
        ));
    }

    #[test]
    fn test_registration_ceremony_rejected() {
        let auth = authenticator();
        let client_data = SoftAuthenticator::client_data_json(
            "webauthn.create",
            &hex::decode(CHALLENGE).unwrap(),
            "https://a.example",
        );
        let payload = auth.sign_raw(&auth.authenticator_data(2), &client_data);
        assert_eq!(
            verifier().check(RP_ID.as_bytes(), 1, CHALLENGE, &auth.public_key(), &payload),
            Err(VerificationError::WrongCeremony("webauthn.create".into()))
        );
    }

    #[test]
    fn test_padded_challenge_rejected() {
        let auth = authenticator();
        let challenge = hex::decode(CHALLENGE).unwrap();
        let padded = base64::engine::general_purpose::URL_SAFE.encode(&challenge);
        let client_data = serde_json::to_vec(&serde_json::json!({
            "type": ASSERTION_CEREMONY,
            "challenge": padded,
            "origin": "https://a.example",
            "crossOrigin": false
        }))
        .unwrap();
        let payload = auth.sign_raw(&auth.authenticator_data(2), &client_data);
        assert_eq!(
            verifier().check(RP_ID.as_bytes(), 1, CHALLENGE, &auth.public_key(), &payload),
            Err(VerificationError::ChallengeEncoding)
        );
    }

    #[test]
    fn test_client_data_keys_are_lenient() {
        let auth = authenticator();
        let key = auth.public_key();
        let challenge = URL_SAFE_NO_PAD.encode(hex::decode(CHALLENGE).unwrap());

        // Later duplicate wins.
        let duplicate = format!(
            r#"{{"type":"webauthn.create","type":"webauthn.get","challenge":"{challenge}"}}"#
        );
        let payload = auth.sign_raw(&auth.authenticator_data(2), duplicate.as_bytes());
        assert_eq!(
            verifier().check(RP_ID.as_bytes(), 1, CHALLENGE, &key, &payload),
            Ok(2)
        );

        let capitalised = format!(
            r#"{{"Type":"webauthn.get","CHALLENGE":"{challenge}","Origin":null,"crossorigin":false}}"#
        );
        let payload = auth.sign_raw(&auth.authenticator_data(3), capitalised.as_bytes());
        assert_eq!(
            verifier().check(RP_ID.as_bytes(), 1, CHALLENGE, &key, &payload),
            Ok(3)
        );

        let wrong_type = format!(r#"{{"type":5,"challenge":"{challenge}"}}"#);
        let payload = auth.sign_raw(&auth.authenticator_data(2), wrong_type.as_bytes());
        assert!(matches!(
            verifier().check(RP_ID.as_bytes(), 1, CHALLENGE, &key, &payload),
            Err(VerificationError::ClientDataStructure(_))
        ));
    }

    #[test]
    fn test_challenge_trailing_bits_ignored() {
        const ALPHABET: &[u8] =
            b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789-_";
        let auth = authenticator();
        let mut challenge = URL_SAFE_NO_PAD
            .encode(hex::decode(CHALLENGE).unwrap())
            .into_bytes();

        // 16 bytes leave four unused bits in the final symbol.
        let last = challenge.len() - 1;
        let index = ALPHABET.iter().position(|c| *c == challenge[last]).unwrap();
        challenge[last] = ALPHABET[index | 0x01];
        let challenge = String::from_utf8(challenge).unwrap();

        let client_data = serde_json::to_vec(&serde_json::json!({
            "type": ASSERTION_CEREMONY,
            "challenge": challenge,
        }))
        .unwrap();
        let payload = auth.sign_raw(&auth.authenticator_data(2), &client_data);
        assert_eq!(
            verifier().check(RP_ID.as_bytes(), 1, CHALLENGE, &auth.public_key(), &payload),
            Ok(2)
        );
    }

    #[test]
    fn test_user_presence_policy() {
        let mut auth = authenticator().with_flags(0x00);
        let payload = auth.assert_hex(CHALLENGE).unwrap();
        let key = auth.public_key();

        assert_eq!(
            verifier().check(RP_ID.as_bytes(), 1, CHALLENGE, &key, &payload),
            Err(VerificationError::UserNotPresent)
        );

        let lenient = AssertionVerifier::new(VerificationPolicy::compatible());
        assert_eq!(
            lenient.check(RP_ID.as_bytes(), 1, CHALLENGE, &key, &payload),
            Ok(2)
        );
    }

    #[test]
    fn test_authenticator_data_parse() {
        let mut data = vec![0xaa; 32];
        data.push(FLAG_USER_PRESENT | FLAG_USER_VERIFIED);
        data.extend_from_slice(&0x0102_0304u32.to_be_bytes());
        let parsed = AuthenticatorData::parse(&data).unwrap();
        assert_eq!(parsed.rp_id_hash, &[0xaa; 32][..]);
        assert!(parsed.user_present());
        assert!(parsed.user_verified());
        assert_eq!(parsed.sign_count, 0x0102_0304);
    }
}
