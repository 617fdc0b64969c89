#![no_main]

//! Fuzz target for assertion verification
//!
//! Splits the input into authenticator data, client data and signature and
//! checks them against a fixed key. Garbage must never verify or panic.
//!
//! Run with: cargo +nightly fuzz run fuzz_verify

use libfuzzer_sys::fuzz_target;
use passgate_core::{AssertionPayload, AssertionVerifier, SoftAuthenticator};

const RP_ID: &str = "fuzz.example";
const CHALLENGE: &str = "00112233445566778899aabbccddeeff";

fuzz_target!(|data: &[u8]| {
    let Ok(authenticator) = SoftAuthenticator::from_seed(RP_ID, [0x11; 32]) else {
        return;
    };
    if data.len() < 2 {
        return;
    }

    let (auth_len, client_len) = (data[0] as usize, data[1] as usize);
    let rest = &data[2..];
    let auth_end = auth_len.min(rest.len());
    let client_end = (auth_end + client_len).min(rest.len());

    let payload = AssertionPayload {
        authenticator_data: hex::encode(&rest[..auth_end]),
        client_data_json: hex::encode(&rest[auth_end..client_end]),
        signature: hex::encode(&rest[client_end..]),
    };

    let verdict = AssertionVerifier::default().verify(
        RP_ID.as_bytes(),
        1,
        CHALLENGE,
        &authenticator.public_key(),
        &payload,
    );
    assert!(!verdict.valid);
    assert_eq!(verdict.sign_count, 1);
});
