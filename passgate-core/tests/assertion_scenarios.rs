//! End-to-end assertion scenarios.
//!
//! A deterministic software authenticator stands in for a browser + security
//! key pair. Each test drives the pure verifier or the full relying party the
//! way a login endpoint would.

use passgate_core::{
    AssertionPayload, AssertionRequest, AssertionVerifier, PassgateError, RelyingParty,
    SoftAuthenticator, Verdict,
};

const NETLIFY_RP_ID: &str = "webauthn.netlify.app";
const CHALLENGE: &str = "8c4ad6d9f2f0a4c1b6e3a7d512e09b3f";

fn fixed_authenticator(rp_id: &str) -> SoftAuthenticator {
    SoftAuthenticator::from_seed(rp_id, [0x5au8; 32]).expect("seed is a valid scalar")
}

fn fixed_assertion() -> (SoftAuthenticator, AssertionPayload) {
    let mut authenticator = fixed_authenticator(NETLIFY_RP_ID);
    let payload = authenticator.assert_hex(CHALLENGE).unwrap();
    (authenticator, payload)
}

#[test]
fn netlify_scenario_accepts_once_then_rejects_replay() {
    let (authenticator, payload) = fixed_assertion();
    let key = authenticator.public_key();
    let verifier = AssertionVerifier::default();

    let first = verifier.verify(NETLIFY_RP_ID.as_bytes(), 1, CHALLENGE, &key, &payload);
    assert_eq!(
        first,
        Verdict {
            valid: true,
            sign_count: 2
        }
    );

    let replay = verifier.verify(
        NETLIFY_RP_ID.as_bytes(),
        first.sign_count,
        CHALLENGE,
        &key,
        &payload,
    );
    assert_eq!(
        replay,
        Verdict {
            valid: false,
            sign_count: 2
        }
    );
}

#[test]
fn assertion_for_one_rp_fails_for_another() {
    let mut authenticator = fixed_authenticator("a.example");
    let payload = authenticator.assert_hex(CHALLENGE).unwrap();
    let key = authenticator.public_key();
    let verifier = AssertionVerifier::default();

    assert!(verifier.verify(b"a.example", 1, CHALLENGE, &key, &payload).valid);
    assert!(!verifier.verify(b"b.example", 1, CHALLENGE, &key, &payload).valid);
}

#[test]
fn stale_challenge_fails_even_with_valid_signature() {
    let rp = RelyingParty::default();
    let mut authenticator = SoftAuthenticator::new(NETLIFY_RP_ID);
    rp.register(
        "alice",
        authenticator.public_key(),
        authenticator.credential_id(),
    )
    .unwrap();

    let stale = rp.issue_challenge("alice").unwrap();
    let current = rp.issue_challenge("alice").unwrap();

    // Signed over the first challenge but submitted against the second session.
    let request = AssertionRequest {
        identity: "alice".into(),
        session_id: current.session_id.clone(),
        payload: authenticator.assert_hex(&stale.challenge).unwrap(),
    };
    assert_eq!(
        rp.verify_assertion(NETLIFY_RP_ID.as_bytes(), &request),
        Err(PassgateError::Rejected)
    );
    assert_eq!(rp.credentials().get("alice").unwrap().sign_count, 1);
}

#[test]
fn counter_tracks_authenticator_across_logins() {
    let rp = RelyingParty::default();
    let mut authenticator = SoftAuthenticator::new(NETLIFY_RP_ID);
    rp.register(
        "alice",
        authenticator.public_key(),
        authenticator.credential_id(),
    )
    .unwrap();

    // Authenticators may skip counter values between logins.
    for skip in [0u32, 3, 10] {
        let session = rp.issue_challenge("alice").unwrap();
        authenticator.set_sign_count(authenticator.sign_count() + skip);
        let request = AssertionRequest {
            identity: "alice".into(),
            session_id: session.session_id,
            payload: authenticator.assert_hex(&session.challenge).unwrap(),
        };
        let count = rp
            .verify_assertion(NETLIFY_RP_ID.as_bytes(), &request)
            .unwrap();
        assert_eq!(count, authenticator.sign_count());
        assert_eq!(rp.credentials().get("alice").unwrap().sign_count, count);
    }
}

#[test]
fn cloned_authenticator_is_detected() {
    let rp = RelyingParty::default();
    let mut original = fixed_authenticator(NETLIFY_RP_ID);
    let mut clone = original.clone();
    rp.register("alice", original.public_key(), original.credential_id())
        .unwrap();

    for _ in 0..3 {
        let session = rp.issue_challenge("alice").unwrap();
        let request = AssertionRequest {
            identity: "alice".into(),
            session_id: session.session_id,
            payload: original.assert_hex(&session.challenge).unwrap(),
        };
        rp.verify_assertion(NETLIFY_RP_ID.as_bytes(), &request)
            .unwrap();
    }

    // The clone's counter lags behind the original's.
    let session = rp.issue_challenge("alice").unwrap();
    let request = AssertionRequest {
        identity: "alice".into(),
        session_id: session.session_id,
        payload: clone.assert_hex(&session.challenge).unwrap(),
    };
    assert_eq!(
        rp.verify_assertion(NETLIFY_RP_ID.as_bytes(), &request),
        Err(PassgateError::Rejected)
    );
}
