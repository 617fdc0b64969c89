//! Example walking one login ceremony with debug tracing enabled.
//!
//! Run with: cargo run -p passgate-core --example login_trace

use passgate_core::{AssertionRequest, RelyingParty, SoftAuthenticator};
use tracing_subscriber::{fmt, EnvFilter};

const RP_ID: &str = "webauthn.netlify.app";

fn main() {
    fmt()
        .with_env_filter(EnvFilter::new("passgate_core=debug,info"))
        .with_target(true)
        .with_thread_ids(false)
        .init();

    println!("=== Passgate Login Trace ===\n");

    let rp = RelyingParty::default();
    let mut authenticator = SoftAuthenticator::new(RP_ID);
    println!("Authenticator: {:?}\n", authenticator);

    if let Err(e) = rp.register("alice", authenticator.public_key(), authenticator.credential_id()) {
        eprintln!("Registration failed: {}", e);
        return;
    }

    let session = match rp.issue_challenge("alice") {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Challenge failed: {}", e);
            return;
        }
    };
    println!("Session:   {}", session.session_id);
    println!("Challenge: {}\n", session.challenge);

    let payload = match authenticator.assert_hex(&session.challenge) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Challenge is not hex: {}", e);
            return;
        }
    };
    let request = AssertionRequest {
        identity: "alice".into(),
        session_id: session.session_id,
        payload,
    };

    match rp.verify_assertion(RP_ID.as_bytes(), &request) {
        Ok(count) => println!("\nAccepted, stored counter is now {}", count),
        Err(e) => println!("\nRejected: {}", e),
    }

    // Same payload again: the session is gone and the counter has moved on.
    match rp.verify_assertion(RP_ID.as_bytes(), &request) {
        Ok(count) => println!("Replay accepted?! counter {}", count),
        Err(e) => println!("Replay rejected: {}", e),
    }
}
