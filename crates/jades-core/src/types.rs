use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::CoreError;

/// sigD mechanism URI that mandates `b64: false` in the protected header
/// (ETSI TS 119 182-1 section 5.1.10).
pub const HTTP_HEADERS_MECHANISM: &str = "http://uri.etsi.org/19182/HttpHeaders";

/// JWS signature algorithms accepted by this profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Alg {
    RS256,
    RS384,
    RS512,
    ES256,
    ES384,
    ES512,
    PS256,
    PS384,
    PS512,
}

/// Digest algorithm backing a JWS signature algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HashAlg {
    Sha256,
    Sha384,
    Sha512,
}

impl Alg {
    /// Fixed alg → digest mapping used when checking signatures.
    pub fn hash_alg(&self) -> HashAlg {
        match self {
            Self::RS256 | Self::ES256 | Self::PS256 => HashAlg::Sha256,
            Self::RS384 | Self::ES384 | Self::PS384 => HashAlg::Sha384,
            Self::RS512 | Self::ES512 | Self::PS512 => HashAlg::Sha512,
        }
    }

    /// Whether this is an RSA-family algorithm (PKCS#1 v1.5 or PSS).
    pub fn is_rsa(&self) -> bool {
        matches!(
            self,
            Self::RS256 | Self::RS384 | Self::RS512 | Self::PS256 | Self::PS384 | Self::PS512
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RS256 => "RS256",
            Self::RS384 => "RS384",
            Self::RS512 => "RS512",
            Self::ES256 => "ES256",
            Self::ES384 => "ES384",
            Self::ES512 => "ES512",
            Self::PS256 => "PS256",
            Self::PS384 => "PS384",
            Self::PS512 => "PS512",
        }
    }

    /// Parse a JWS `alg` header value.
    pub fn parse(value: &str) -> Result<Self, CoreError> {
        match value {
            "RS256" => Ok(Self::RS256),
            "RS384" => Ok(Self::RS384),
            "RS512" => Ok(Self::RS512),
            "ES256" => Ok(Self::ES256),
            "ES384" => Ok(Self::ES384),
            "ES512" => Ok(Self::ES512),
            "PS256" => Ok(Self::PS256),
            "PS384" => Ok(Self::PS384),
            "PS512" => Ok(Self::PS512),
            other => Err(CoreError::UnsupportedAlgorithm(other.to_string())),
        }
    }
}

impl fmt::Display for Alg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// JAdES signature profiles — increasing levels of long-term evidence
/// carried in the unprotected `etsiU` sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Profile {
    /// B-B: signature only.
    #[serde(rename = "B-B")]
    Baseline,
    /// B-T: adds a signature timestamp.
    #[serde(rename = "B-T")]
    Timestamped,
    /// B-LT: adds validation certificates and revocation material.
    #[serde(rename = "B-LT")]
    LongTerm,
    /// B-LTA: adds an archive timestamp.
    #[serde(rename = "B-LTA")]
    LongTermArchive,
}

impl Profile {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Baseline => "B-B",
            Self::Timestamped => "B-T",
            Self::LongTerm => "B-LT",
            Self::LongTermArchive => "B-LTA",
        }
    }

    pub fn parse(value: &str) -> Result<Self, CoreError> {
        match value {
            "B-B" => Ok(Self::Baseline),
            "B-T" => Ok(Self::Timestamped),
            "B-LT" => Ok(Self::LongTerm),
            "B-LTA" => Ok(Self::LongTermArchive),
            other => Err(CoreError::UnknownProfile(other.to_string())),
        }
    }
}

impl fmt::Display for Profile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// JWS payload-digest descriptor for detached signing
/// (ETSI TS 119 182-1 section 5.2.8).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SigD {
    /// Mechanism URI.
    #[serde(rename = "mId")]
    pub m_id: String,
    /// Mechanism parameters (e.g. referenced part names).
    pub pars: Vec<String>,
    /// Digest algorithm identifier for the referenced content.
    pub hash: String,
}

/// A certificate digest reference (`x5t#o` / `x5t#s` member shape).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CertDigest {
    #[serde(rename = "digAlg")]
    pub dig_alg: String,
    #[serde(rename = "digVal")]
    pub dig_val: String,
}

/// An RFC 3161 timestamp token, passed through as an opaque blob.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TstToken {
    pub val: String,
}

/// `sigTst` container: one or more timestamp tokens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimestampTokens {
    #[serde(rename = "tstTokens")]
    pub tst_tokens: Vec<TstToken>,
}

/// A trust-anchor or CA certificate blob inside `xVals`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CertValue {
    #[serde(rename = "x509Cert")]
    pub x509_cert: String,
}

/// `rVals` container: CRL and OCSP blobs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct RevocationValues {
    #[serde(rename = "crlVals", default, skip_serializing_if = "Vec::is_empty")]
    pub crl_vals: Vec<String>,
    #[serde(rename = "ocspVals", default, skip_serializing_if = "Vec::is_empty")]
    pub ocsp_vals: Vec<String>,
}

/// `arcTst` container: archive timestamp tokens plus the canonicalization
/// algorithm they were computed over.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveTimestamp {
    #[serde(rename = "tstTokens")]
    pub tst_tokens: Vec<TstToken>,
    #[serde(rename = "canonAlg")]
    pub canon_alg: String,
}

/// One element of the unprotected `etsiU` sequence. Externally tagged so
/// each element serializes as a single-member object, e.g. `{"sigTst": …}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EtsiUEntry {
    #[serde(rename = "sigTst")]
    SigTst(TimestampTokens),
    #[serde(rename = "xVals")]
    XVals(Vec<CertValue>),
    #[serde(rename = "rVals")]
    RVals(RevocationValues),
    #[serde(rename = "arcTst")]
    ArcTst(ArchiveTimestamp),
}

/// Unprotected header of one signature entry. Carries material that is not
/// covered by the signature: disclosure tokens, the key identifier, an
/// optional key-binding JWT, and the `etsiU` qualifying-property sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct UnprotectedHeader {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disclosures: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kid: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kb_jwt: Option<String>,

    #[serde(rename = "etsiU", default, skip_serializing_if = "Option::is_none")]
    pub etsi_u: Option<Vec<EtsiUEntry>>,
}

impl UnprotectedHeader {
    /// Number of disclosure tokens attached to this signature.
    pub fn disclosure_count(&self) -> usize {
        self.disclosures.as_ref().map_or(0, |d| d.len())
    }
}

/// One signature object of the General JSON Serialization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureEntry {
    /// base64url-encoded protected header.
    pub protected: String,
    /// base64url-encoded raw signature.
    pub signature: String,
    /// Unprotected header.
    #[serde(default)]
    pub header: UnprotectedHeader,
}

/// A JWS in General JSON Serialization form. This design signs with a
/// single key at a time, so `signatures` holds exactly one entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneralJws {
    /// base64url-encoded payload, the raw payload when `b64` is false, or
    /// the empty string in detached (`sigD`) mode.
    pub payload: String,
    pub signatures: Vec<SignatureEntry>,
}

impl GeneralJws {
    /// Total disclosure tokens across all signature entries.
    pub fn disclosure_count(&self) -> usize {
        self.signatures.iter().map(|s| s.header.disclosure_count()).sum()
    }
}
