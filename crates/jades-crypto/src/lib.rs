//! JAdES Crypto — certificate utilities, raw JWS signing and verification,
//! and the selective-disclosure commitment engine.

pub mod certs;
pub mod disclosure;
pub mod error;
pub mod hashing;
pub mod keys;
pub mod signing;

pub use certs::{
    cert_to_base64_der, derive_key_id, parse_certificate_chain, sha256_thumbprint,
    sha512_thumbprint, spki_der, thumbprint_of_set,
};
pub use disclosure::{
    apply_disclosure_frame, reconstruct_claims, select_disclosures, Disclosure,
};
pub use error::CryptoError;
pub use hashing::{digest, disclosure_digest, sha256};
pub use keys::SigningKey;
pub use signing::{sign, verify};
