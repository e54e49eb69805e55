use sha2::{Digest, Sha256, Sha384, Sha512};

use jades_core::{b64url_encode, HashAlg};

/// SHA-256 hash (32 bytes).
pub fn sha256(data: &[u8]) -> [u8; 32] {
    Sha256::digest(data).into()
}

/// Hash arbitrary data with the digest backing a JWS algorithm.
pub fn digest(alg: HashAlg, data: &[u8]) -> Vec<u8> {
    match alg {
        HashAlg::Sha256 => Sha256::digest(data).to_vec(),
        HashAlg::Sha384 => Sha384::digest(data).to_vec(),
        HashAlg::Sha512 => Sha512::digest(data).to_vec(),
    }
}

/// Digest of an encoded disclosure token: base64url(SHA-256(ascii(token))).
///
/// This is the value stored in a payload `_sd` array; the credential's
/// `_sd_alg` claim names sha-256 accordingly.
pub fn disclosure_digest(encoded_token: &str) -> String {
    b64url_encode(sha256(encoded_token.as_bytes()))
}
