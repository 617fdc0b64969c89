//! Challenge issuing handler
//!
//! Handles POST /session requests that start an authentication ceremony.

use axum::{extract::rejection::JsonRejection, extract::State, Json};
use passgate_core::Session;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::ApiError;
use crate::state::AppState;

/// Request to start an authentication ceremony
#[derive(Debug, Deserialize, ToSchema)]
pub struct IssueChallengeRequest {
    #[serde(rename = "UserName")]
    #[schema(example = "alice")]
    pub user_name: String,
}

/// Session handed to the client; the challenge goes to `navigator.credentials.get`
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SessionResponse {
    #[serde(rename = "SessionID")]
    #[schema(example = "3f1c9a0e5b7d2468ace0134579bdf024")]
    pub session_id: String,
    /// Credential identifier to request from the authenticator
    #[serde(rename = "ID")]
    pub id: String,
    #[serde(rename = "UserName")]
    pub user_name: String,
    /// Hex-encoded 16-byte challenge
    #[serde(rename = "Challenge")]
    #[schema(example = "00112233445566778899aabbccddeeff")]
    pub challenge: String,
}

impl From<Session> for SessionResponse {
    fn from(session: Session) -> Self {
        Self {
            session_id: session.session_id,
            id: session.credential_id,
            user_name: session.identity,
            challenge: session.challenge,
        }
    }
}

/// Issue a challenge
///
/// Creates a session with a fresh random challenge for a registered identity.
#[utoipa::path(
    post,
    path = "/session",
    tag = "Authentication",
    request_body = IssueChallengeRequest,
    responses(
        (status = 200, description = "Session created", body = SessionResponse),
        (status = 400, description = "Malformed request body or unknown identity")
    )
)]
pub async fn issue_challenge_handler(
    State(state): State<AppState>,
    payload: Result<Json<IssueChallengeRequest>, JsonRejection>,
) -> Result<Json<SessionResponse>, ApiError> {
    let Json(req) = payload?;
    let session = state.relying_party.issue_challenge(&req.user_name)?;
    Ok(Json(session.into()))
}
