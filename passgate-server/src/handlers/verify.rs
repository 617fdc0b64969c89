//! Assertion verification handler
//!
//! Handles POST /verify requests carrying a signed WebAuthn assertion.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::{HeaderMap, Uri},
    Json,
};
use passgate_core::{AssertionPayload, AssertionRequest};
use serde::Deserialize;
use utoipa::ToSchema;

use crate::error::ApiError;
use crate::state::AppState;

/// Signed assertion from `navigator.credentials.get`, hex-encoded
#[derive(Debug, Deserialize, ToSchema)]
pub struct VerifyAssertionRequest {
    #[serde(rename = "UserName")]
    #[schema(example = "alice")]
    pub user_name: String,
    /// `authenticatorData` bytes as hex
    #[serde(rename = "AuthData")]
    pub auth_data: String,
    /// `clientDataJSON` bytes as hex
    #[serde(rename = "Clientjson")]
    pub client_json: String,
    /// DER-encoded ECDSA P-256 signature as hex
    #[serde(rename = "Signature")]
    pub signature: String,
    #[serde(rename = "SessionID")]
    pub session_id: String,
}

impl From<VerifyAssertionRequest> for AssertionRequest {
    fn from(req: VerifyAssertionRequest) -> Self {
        Self {
            identity: req.user_name,
            session_id: req.session_id,
            payload: AssertionPayload {
                authenticator_data: req.auth_data,
                client_data_json: req.client_json,
                signature: req.signature,
            },
        }
    }
}

/// Verify an assertion
///
/// Checks the assertion against the identity's credential and the session
/// challenge, using the serving host as relying party id. On success the
/// credential's signature counter is advanced.
///
/// Every failure returns the same `406` body, whatever the cause.
#[utoipa::path(
    post,
    path = "/verify",
    tag = "Authentication",
    request_body = VerifyAssertionRequest,
    responses(
        (status = 200, description = "Assertion accepted", body = String),
        (status = 400, description = "Malformed request body"),
        (status = 406, description = "Assertion rejected")
    )
)]
pub async fn verify_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    uri: Uri,
    payload: Result<Json<VerifyAssertionRequest>, JsonRejection>,
) -> Result<&'static str, ApiError> {
    let Json(req) = payload?;

    let rp_id = state
        .rp_id_for(&headers, &uri)
        .ok_or_else(|| ApiError::not_acceptable("no relying party id for request"))?;

    state
        .relying_party
        .verify_assertion(rp_id.as_bytes(), &req.into())?;

    Ok("OK Done")
}
