//! Encoding utilities — base64url without padding, as used for JWS
//! segments and disclosure digests (RFC 7515 appendix C).

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;

use crate::error::CoreError;

/// Encode bytes as base64url without padding.
pub fn b64url_encode(data: impl AsRef<[u8]>) -> String {
    URL_SAFE_NO_PAD.encode(data)
}

/// Decode a base64url string (no padding) into bytes.
pub fn b64url_decode(encoded: &str) -> Result<Vec<u8>, CoreError> {
    URL_SAFE_NO_PAD
        .decode(encoded)
        .map_err(|e| CoreError::Encoding(format!("invalid base64url: {}", e)))
}

/// Decode a base64url string into UTF-8 text.
pub fn b64url_decode_string(encoded: &str) -> Result<String, CoreError> {
    let bytes = b64url_decode(encoded)?;
    String::from_utf8(bytes).map_err(|e| CoreError::Encoding(format!("invalid utf-8: {}", e)))
}
