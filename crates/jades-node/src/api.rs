//! HTTP API for signing, presenting, and verifying credentials.

use axum::{
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use axum::extract::State;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use x509_cert::Certificate;

use jades_core::{Alg, GeneralJws, Profile};
use jades_credentials::{CredentialError, Presenter, QualifyingMaterials, Signer, Verifier};
use jades_crypto::SigningKey;

/// Signing material shared by all requests.
pub struct AppState {
    pub certs: Vec<Certificate>,
    pub key: SigningKey,
    pub kid: String,
    pub default_alg: Alg,
}

// --- Request/response types ---

#[derive(Deserialize)]
pub struct SignRequest {
    pub payload: Value,
    /// JWS algorithm; the configured default when omitted.
    pub alg: Option<String>,
    pub disclosure_frame: Option<Value>,
    /// Signature profile (B-B, B-T, B-LT, B-LTA).
    pub profile: Option<String>,
    /// Opaque qualifying blobs for profiles beyond B-B.
    #[serde(default)]
    pub materials: QualifyingMaterials,
    /// Expiration in seconds from now.
    pub expires_in: Option<i64>,
}

#[derive(Deserialize)]
pub struct PresentRequest {
    pub credential: Value,
    pub presentation_frame: Option<Value>,
}

#[derive(Deserialize)]
pub struct VerifyRequest {
    pub credential: Value,
}

#[derive(Serialize)]
pub struct VerifyResponse {
    pub verified: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub headers: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_binding: Option<Value>,
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn bad_request(e: impl std::fmt::Display) -> ApiError {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse { error: e.to_string() }),
    )
}

// --- Handlers ---

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok".into() })
}

async fn handle_sign(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SignRequest>,
) -> Result<Json<GeneralJws>, ApiError> {
    let alg = match req.alg.as_deref() {
        Some(name) => Alg::parse(name).map_err(bad_request)?,
        None => state.default_alg,
    };

    let mut fields = Map::new();
    fields.insert("alg".into(), Value::String(alg.as_str().into()));
    fields.insert("typ".into(), Value::String("jades".into()));

    let mut signer = Signer::new(Some(req.payload));
    signer.set_protected_header(fields).map_err(bad_request)?;
    signer.set_x5c(&state.certs).map_err(bad_request)?;
    signer.set_signed_at(None).map_err(bad_request)?;
    if let Some(seconds) = req.expires_in {
        signer
            .set_issued_at(None)
            .map_err(bad_request)?
            .set_expiration_time(chrono_duration(seconds)?)
            .map_err(bad_request)?;
    }
    if let Some(frame) = req.disclosure_frame {
        signer.set_disclosure_frame(frame).map_err(bad_request)?;
    }
    if let Some(profile) = req.profile.as_deref() {
        let profile = Profile::parse(profile).map_err(bad_request)?;
        signer.set_profile(profile).map_err(bad_request)?;
        signer
            .set_qualifying_materials(req.materials)
            .map_err(bad_request)?;
    }

    let jws = signer.sign(&state.key, &state.kid).map_err(bad_request)?;
    Ok(Json(jws))
}

fn chrono_duration(seconds: i64) -> Result<chrono::Duration, ApiError> {
    chrono::Duration::try_seconds(seconds)
        .ok_or_else(|| bad_request("expires_in out of range"))
}

async fn handle_present(
    Json(req): Json<PresentRequest>,
) -> Result<Json<GeneralJws>, ApiError> {
    let credential: GeneralJws = serde_json::from_value(req.credential)
        .map_err(|e| bad_request(CredentialError::MalformedCredential(e.to_string())))?;
    let presented = Presenter::present(&credential, req.presentation_frame.as_ref())
        .map_err(bad_request)?;
    Ok(Json(presented))
}

async fn handle_verify(
    Json(req): Json<VerifyRequest>,
) -> Result<Json<VerifyResponse>, ApiError> {
    let credential: GeneralJws = serde_json::from_value(req.credential)
        .map_err(|e| bad_request(CredentialError::MalformedToken(e.to_string())))?;
    let outcome = Verifier::verify(&credential).map_err(bad_request)?;

    let headers = outcome
        .headers
        .map(|h| {
            serde_json::to_value(h.unprotected).map(|unprotected| {
                serde_json::json!({
                    "protected": h.protected,
                    "unprotected": unprotected,
                })
            })
        })
        .transpose()
        .map_err(bad_request)?;
    let key_binding = outcome
        .key_binding
        .map(|kb| serde_json::json!({"payload": kb.payload, "header": kb.header}));

    Ok(Json(VerifyResponse {
        verified: outcome.verified,
        payload: outcome.payload,
        headers,
        key_binding,
    }))
}

// --- Server ---

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/v1/health", get(handle_health))
        .route("/api/v1/credentials/sign", post(handle_sign))
        .route("/api/v1/credentials/present", post(handle_present))
        .route("/api/v1/credentials/verify", post(handle_verify))
        .with_state(state)
}

pub async fn start_api_server(listen_addr: SocketAddr, state: Arc<AppState>) -> anyhow::Result<()> {
    let app = build_router(state);
    let listener = tokio::net::TcpListener::bind(listen_addr).await?;
    tracing::info!(%listen_addr, "HTTP API server started");
    axum::serve(listener, app).await?;
    Ok(())
}
