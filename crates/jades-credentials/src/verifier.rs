//! Credential verification.
//!
//! Verification proceeds through fixed stages with no backtracking:
//! decode the protected header, resolve the algorithm against the embedded
//! certificate chain, check the raw signature with the leading
//! certificate's public key, and only then reconstruct the claim set from
//! the payload and the revealed disclosures.
//!
//! A failing signature is a normal `verified: false` outcome, not an
//! error; malformed input and unsupported algorithms abort with typed
//! failures instead.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde_json::Value;

use jades_core::{b64url_decode, b64url_decode_string, Alg, GeneralJws, UnprotectedHeader};
use jades_crypto::certs::{parse_certificate_der, spki_der};
use jades_crypto::reconstruct_claims;

use crate::error::CredentialError;

/// Decoded header set of the checked signature entry.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedHeaders {
    pub protected: Value,
    pub unprotected: UnprotectedHeader,
}

/// Decoded (not verified) key-binding JWT carried in the unprotected header.
#[derive(Debug, Clone, PartialEq)]
pub struct KeyBinding {
    pub payload: Value,
    pub header: Value,
}

/// Result of a verification call.
#[derive(Debug, Clone, PartialEq)]
pub struct VerificationOutcome {
    /// Whether the signature proved integrity against the leading
    /// certificate of `x5c`.
    pub verified: bool,
    /// Reconstructed claim set; present only on a positive result with an
    /// embedded payload.
    pub payload: Option<Value>,
    /// Decoded headers; present only on a positive result.
    pub headers: Option<DecodedHeaders>,
    /// Decoded key-binding JWT, when the unprotected header carries one.
    pub key_binding: Option<KeyBinding>,
}

impl VerificationOutcome {
    fn invalid() -> Self {
        Self {
            verified: false,
            payload: None,
            headers: None,
            key_binding: None,
        }
    }
}

/// Verifies credentials in General JSON Serialization or compact form.
pub struct Verifier;

impl Verifier {
    /// Verify a credential and reconstruct its trusted claim set.
    pub fn verify(credential: &GeneralJws) -> Result<VerificationOutcome, CredentialError> {
        // Stage 1: decode
        let entry = credential
            .signatures
            .first()
            .ok_or_else(|| CredentialError::MalformedToken("no signature entries".into()))?;
        let protected_json = b64url_decode_string(&entry.protected)
            .map_err(|e| CredentialError::MalformedToken(e.to_string()))?;
        let protected: Value = serde_json::from_str(&protected_json)
            .map_err(|e| CredentialError::MalformedToken(e.to_string()))?;

        // Stage 2: resolve algorithm and certificate chain
        let x5c = protected
            .get("x5c")
            .and_then(Value::as_array)
            .filter(|chain| !chain.is_empty())
            .ok_or(CredentialError::MissingCertificateChain)?;
        let alg_name = protected
            .get("alg")
            .and_then(Value::as_str)
            .ok_or_else(|| jades_core::CoreError::UnsupportedAlgorithm("<missing>".into()))?;
        let alg = Alg::parse(alg_name)?;

        // Stage 3: check the raw signature over the exact signing input.
        // Any failure here — including malformed certificate bytes — is the
        // normal negative outcome, not a fault.
        let signing_input = format!("{}.{}", entry.protected, credential.payload);
        if !signature_valid(alg, x5c, &signing_input, &entry.signature) {
            tracing::warn!(alg = %alg, "signature verification failed");
            return Ok(VerificationOutcome::invalid());
        }

        // Stage 4: reconstruct claims from payload and revealed disclosures
        let payload = decode_claims(&protected, credential, entry)?;
        let key_binding = entry
            .header
            .kb_jwt
            .as_deref()
            .map(decode_key_binding)
            .transpose()?;

        Ok(VerificationOutcome {
            verified: true,
            payload,
            headers: Some(DecodedHeaders {
                protected,
                unprotected: entry.header.clone(),
            }),
            key_binding,
        })
    }

    /// Verify from the credential's JSON-string form.
    pub fn verify_json(credential: &str) -> Result<VerificationOutcome, CredentialError> {
        let parsed: GeneralJws = serde_json::from_str(credential)
            .map_err(|e| CredentialError::MalformedToken(e.to_string()))?;
        Self::verify(&parsed)
    }

    /// Verify a compact-serialization token (`protected.payload.signature`).
    pub fn verify_compact(token: &str) -> Result<VerificationOutcome, CredentialError> {
        let parts: Vec<&str> = token.split('.').collect();
        let [protected, payload, signature]: [&str; 3] = parts
            .try_into()
            .map_err(|_| CredentialError::MalformedToken("expected three dot-separated segments".into()))?;
        let credential = GeneralJws {
            payload: payload.to_string(),
            signatures: vec![jades_core::SignatureEntry {
                protected: protected.to_string(),
                signature: signature.to_string(),
                header: UnprotectedHeader::default(),
            }],
        };
        Self::verify(&credential)
    }
}

fn signature_valid(alg: Alg, x5c: &[Value], signing_input: &str, signature_b64: &str) -> bool {
    let Some(leading) = x5c.first().and_then(Value::as_str) else {
        return false;
    };
    let Ok(der) = STANDARD.decode(leading) else {
        return false;
    };
    let Ok(cert) = parse_certificate_der(&der) else {
        return false;
    };
    let Ok(spki) = spki_der(&cert) else {
        return false;
    };
    let Ok(signature) = b64url_decode(signature_b64) else {
        return false;
    };
    jades_crypto::verify(alg, &spki, signing_input.as_bytes(), &signature).is_ok()
}

fn decode_claims(
    protected: &Value,
    credential: &GeneralJws,
    entry: &jades_core::SignatureEntry,
) -> Result<Option<Value>, CredentialError> {
    if credential.payload.is_empty() {
        // Detached payload: the signed content lives outside the token.
        return Ok(None);
    }
    let encoded = protected
        .get("b64")
        .and_then(Value::as_bool)
        .unwrap_or(true);
    let payload_json = if encoded {
        b64url_decode_string(&credential.payload)
            .map_err(|e| CredentialError::MalformedToken(e.to_string()))?
    } else {
        credential.payload.clone()
    };
    let payload: Value = serde_json::from_str(&payload_json)
        .map_err(|e| CredentialError::MalformedToken(e.to_string()))?;

    let empty = Vec::new();
    let disclosures = entry.header.disclosures.as_ref().unwrap_or(&empty);
    Ok(Some(reconstruct_claims(&payload, disclosures)?))
}

fn decode_key_binding(kb_jwt: &str) -> Result<KeyBinding, CredentialError> {
    let parts: Vec<&str> = kb_jwt.split('.').collect();
    if parts.len() < 2 {
        return Err(CredentialError::MalformedToken(
            "key-binding JWT must have header and payload segments".into(),
        ));
    }
    let header_json = b64url_decode_string(parts[0])
        .map_err(|e| CredentialError::MalformedToken(e.to_string()))?;
    let payload_json = b64url_decode_string(parts[1])
        .map_err(|e| CredentialError::MalformedToken(e.to_string()))?;
    Ok(KeyBinding {
        header: serde_json::from_str(&header_json)
            .map_err(|e| CredentialError::MalformedToken(e.to_string()))?,
        payload: serde_json::from_str(&payload_json)
            .map_err(|e| CredentialError::MalformedToken(e.to_string()))?,
    })
}
