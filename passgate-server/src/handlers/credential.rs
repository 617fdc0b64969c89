//! Credential registration handler
//!
//! Handles POST /credential requests that bind a public key to a new identity.

use axum::{extract::rejection::JsonRejection, extract::State, Json};
use passgate_core::PublicKeyCoordinates;
use serde::Deserialize;
use utoipa::ToSchema;

use crate::error::ApiError;
use crate::state::AppState;

/// Request to register a credential
#[derive(Debug, Deserialize, ToSchema)]
pub struct RegisterCredentialRequest {
    /// Identity the credential belongs to
    #[serde(rename = "UserName")]
    #[schema(example = "alice")]
    pub user_name: String,
    /// Public key X coordinate, base-16 without prefix
    #[serde(rename = "Pubx")]
    pub pub_x: String,
    /// Public key Y coordinate, base-16 without prefix
    #[serde(rename = "Puby")]
    pub pub_y: String,
    /// Credential identifier assigned by the authenticator
    #[serde(rename = "ID")]
    pub id: String,
}

/// Register a credential
///
/// No attestation is checked: the submitted key is trusted as given and is
/// validated against the curve on first use.
#[utoipa::path(
    post,
    path = "/credential",
    tag = "Registration",
    request_body = RegisterCredentialRequest,
    responses(
        (status = 200, description = "Credential registered", body = String),
        (status = 400, description = "Malformed request body"),
        (status = 409, description = "Identity already registered")
    )
)]
pub async fn register_credential_handler(
    State(state): State<AppState>,
    payload: Result<Json<RegisterCredentialRequest>, JsonRejection>,
) -> Result<&'static str, ApiError> {
    let Json(req) = payload?;

    state.relying_party.register(
        &req.user_name,
        PublicKeyCoordinates::new(req.pub_x, req.pub_y),
        &req.id,
    )?;

    Ok("OK")
}
