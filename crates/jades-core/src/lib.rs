//! JAdES Core — Shared types for the JAdES signature profile over an
//! SD-JWT General JSON Serialization.

pub mod encoding;
pub mod error;
pub mod types;

pub use encoding::{b64url_decode, b64url_decode_string, b64url_encode};
pub use error::CoreError;
pub use types::{
    Alg, ArchiveTimestamp, CertDigest, CertValue, EtsiUEntry, GeneralJws, HashAlg, Profile,
    RevocationValues, SigD, SignatureEntry, TimestampTokens, TstToken, UnprotectedHeader,
    HTTP_HEADERS_MECHANISM,
};
