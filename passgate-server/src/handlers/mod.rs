//! HTTP request handlers
//!
//! This module contains all the request handlers for the API endpoints.

pub mod credential;
pub mod health;
pub mod session;
pub mod verify;

pub use crate::state::AppState;
pub use credential::{register_credential_handler, RegisterCredentialRequest};
pub use health::{health, ready, HealthResponse, ReadyResponse};
pub use session::{issue_challenge_handler, IssueChallengeRequest, SessionResponse};
pub use verify::{verify_handler, VerifyAssertionRequest};
