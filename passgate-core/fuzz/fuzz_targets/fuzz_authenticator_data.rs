#![no_main]

//! Fuzz target for authenticator data parsing
//!
//! Run with: cargo +nightly fuzz run fuzz_authenticator_data

use libfuzzer_sys::fuzz_target;
use passgate_core::{AuthenticatorData, MIN_AUTHENTICATOR_DATA_LEN};

fuzz_target!(|data: &[u8]| {
    match AuthenticatorData::parse(data) {
        Ok(parsed) => {
            assert!(data.len() >= MIN_AUTHENTICATOR_DATA_LEN);
            assert_eq!(parsed.rp_id_hash, &data[..32]);
        }
        Err(_) => assert!(data.len() < MIN_AUTHENTICATOR_DATA_LEN),
    }
});
