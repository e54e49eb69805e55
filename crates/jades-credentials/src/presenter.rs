//! Holder-side presentation.
//!
//! Selects the disclosure subset to reveal for a verifier. Payload and
//! signature bytes are never altered; only the `disclosures` list in the
//! unprotected header shrinks.

use serde_json::Value;

use jades_core::{b64url_decode_string, GeneralJws};
use jades_crypto::select_disclosures;

use crate::error::CredentialError;

/// Produces reduced credentials from signed ones.
pub struct Presenter;

impl Presenter {
    /// Present a credential, revealing only the fields marked in the
    /// presentation frame. An absent frame — or an empty object, which is
    /// treated identically — reveals nothing beyond what the payload
    /// discloses unconditionally.
    pub fn present(
        credential: &GeneralJws,
        presentation_frame: Option<&Value>,
    ) -> Result<GeneralJws, CredentialError> {
        if credential.disclosure_count() == 0 {
            // No commitment scheme was applied; nothing to select.
            tracing::info!("credential has no selective-disclosure claims, returning as is");
            return Ok(credential.clone());
        }

        let payload = decode_payload(credential)?;
        let mut presented = credential.clone();
        for entry in &mut presented.signatures {
            let Some(tokens) = entry.header.disclosures.take() else { continue };
            let selected = select_disclosures(&payload, &tokens, presentation_frame)?;
            entry.header.disclosures = (!selected.is_empty()).then_some(selected);
        }
        Ok(presented)
    }

    /// Present from the credential's JSON-string form.
    pub fn present_json(
        credential: &str,
        presentation_frame: Option<&Value>,
    ) -> Result<GeneralJws, CredentialError> {
        let parsed: GeneralJws = serde_json::from_str(credential)
            .map_err(|e| CredentialError::MalformedCredential(e.to_string()))?;
        Self::present(&parsed, presentation_frame)
    }
}

/// Decode the committed payload of a credential (base64url or literal,
/// depending on the protected `b64` member of the first signature).
fn decode_payload(credential: &GeneralJws) -> Result<Value, CredentialError> {
    let entry = credential
        .signatures
        .first()
        .ok_or_else(|| CredentialError::MalformedCredential("no signature entries".into()))?;
    let protected_json = b64url_decode_string(&entry.protected)
        .map_err(|e| CredentialError::MalformedCredential(e.to_string()))?;
    let protected: Value = serde_json::from_str(&protected_json)
        .map_err(|e| CredentialError::MalformedCredential(e.to_string()))?;

    let encoded = protected
        .get("b64")
        .and_then(Value::as_bool)
        .unwrap_or(true);
    let payload_json = if encoded {
        b64url_decode_string(&credential.payload)
            .map_err(|e| CredentialError::MalformedCredential(e.to_string()))?
    } else {
        credential.payload.clone()
    };
    serde_json::from_str(&payload_json)
        .map_err(|e| CredentialError::MalformedCredential(e.to_string()))
}
