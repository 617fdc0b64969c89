//! OpenAPI documentation configuration
//!
//! Generates OpenAPI 3.0 specification for the Passgate API.

use axum::Json;
use utoipa::OpenApi;

use crate::handlers::{
    HealthResponse, IssueChallengeRequest, ReadyResponse, RegisterCredentialRequest,
    SessionResponse, VerifyAssertionRequest,
};

/// Passgate API - OpenAPI Documentation
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Passgate",
        version = "0.1.0",
        description = r#"
## WebAuthn relying party

Passgate verifies FIDO2/WebAuthn login assertions signed with ECDSA P-256.

### How It Works

1. **Register** a public key for an identity via `POST /credential`
2. **Request a challenge** via `POST /session`
3. Have the authenticator sign the challenge with `navigator.credentials.get`
4. **Submit** the hex-encoded assertion via `POST /verify`

Every rejected assertion returns the same `406 Not Acceptable` response.
"#,
        license(name = "MIT OR Apache-2.0")
    ),
    servers(
        (url = "http://localhost:1323", description = "Local development server")
    ),
    tags(
        (name = "Registration", description = "Bind a P-256 public key to an identity"),
        (name = "Authentication", description = "Challenge issuing and assertion verification"),
        (name = "Health", description = "Service health and readiness endpoints")
    ),
    paths(
        crate::handlers::health::health,
        crate::handlers::health::ready,
        crate::handlers::credential::register_credential_handler,
        crate::handlers::session::issue_challenge_handler,
        crate::handlers::verify::verify_handler,
    ),
    components(
        schemas(
            HealthResponse,
            ReadyResponse,
            RegisterCredentialRequest,
            IssueChallengeRequest,
            SessionResponse,
            VerifyAssertionRequest,
        )
    )
)]
pub struct ApiDoc;

/// GET /api-docs/openapi.json - Generated OpenAPI document
pub async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
