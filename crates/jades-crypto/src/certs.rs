//! X.509 certificate utilities: PEM chain parsing, key identifiers, and
//! the thumbprint variants referenced from the protected header.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use x509_cert::der::{Decode, DecodePem, Encode};
use x509_cert::Certificate;

use jades_core::{b64url_encode, CertDigest, HashAlg};

use crate::error::CryptoError;
use crate::hashing::{digest, sha256};

const PEM_CERT_BEGIN: &str = "-----BEGIN CERTIFICATE-----";

/// Parse a PEM bundle into certificates in chain order (leaf first).
///
/// The bundle is split on certificate boundary markers; blank segments are
/// discarded and every remaining segment must parse as a valid X.509
/// structure.
pub fn parse_certificate_chain(pem: &str) -> Result<Vec<Certificate>, CryptoError> {
    let starts: Vec<usize> = pem.match_indices(PEM_CERT_BEGIN).map(|(i, _)| i).collect();
    if starts.is_empty() {
        return Err(CryptoError::MalformedCertificate(
            "no certificate boundary marker in PEM input".into(),
        ));
    }

    let mut certs = Vec::with_capacity(starts.len());
    for (n, &start) in starts.iter().enumerate() {
        let end = starts.get(n + 1).copied().unwrap_or(pem.len());
        let segment = pem[start..end].trim();
        let cert = Certificate::from_pem(segment.as_bytes()).map_err(|e| {
            CryptoError::MalformedCertificate(format!("certificate {} failed to parse: {}", n, e))
        })?;
        certs.push(cert);
    }
    Ok(certs)
}

/// Decode a single certificate from raw DER bytes.
pub fn parse_certificate_der(der: &[u8]) -> Result<Certificate, CryptoError> {
    Certificate::from_der(der).map_err(|e| CryptoError::MalformedCertificate(e.to_string()))
}

/// Raw DER bytes of a certificate.
pub fn cert_der(cert: &Certificate) -> Result<Vec<u8>, CryptoError> {
    cert.to_der()
        .map_err(|e| CryptoError::MalformedCertificate(e.to_string()))
}

/// Standard-base64 DER of a certificate, the `x5c` member encoding.
pub fn cert_to_base64_der(cert: &Certificate) -> Result<String, CryptoError> {
    Ok(STANDARD.encode(cert_der(cert)?))
}

/// DER-encoded SubjectPublicKeyInfo of a certificate.
pub fn spki_der(cert: &Certificate) -> Result<Vec<u8>, CryptoError> {
    cert.tbs_certificate
        .subject_public_key_info
        .to_der()
        .map_err(|e| CryptoError::MalformedCertificate(e.to_string()))
}

/// Deterministic key identifier for a certificate: the subject DN plus a
/// short SHA-256 fingerprint. Stable across calls for the same DER bytes.
pub fn derive_key_id(cert: &Certificate) -> Result<String, CryptoError> {
    let der = cert_der(cert)?;
    let fingerprint = sha256(&der);
    let subject = cert.tbs_certificate.subject.to_string();
    Ok(format!("{}#{}", subject, hex::encode(&fingerprint[..8])))
}

/// `x5t#256` value: base64url SHA-256 digest of the certificate DER.
pub fn sha256_thumbprint(cert: &Certificate) -> Result<String, CryptoError> {
    Ok(b64url_encode(sha256(&cert_der(cert)?)))
}

/// `x5t#o` value: sha-512 digest object over the certificate DER.
pub fn sha512_thumbprint(cert: &Certificate) -> Result<CertDigest, CryptoError> {
    let der = cert_der(cert)?;
    Ok(CertDigest {
        dig_alg: "sha-512".into(),
        dig_val: b64url_encode(digest(HashAlg::Sha512, &der)),
    })
}

/// `x5t#s` value: one sha-512 digest object per certificate. Requires at
/// least two certificates; use [`sha512_thumbprint`] for a single one.
pub fn thumbprint_of_set(certs: &[Certificate]) -> Result<Vec<CertDigest>, CryptoError> {
    if certs.len() < 2 {
        return Err(CryptoError::InsufficientCertificateCount {
            needed: 2,
            got: certs.len(),
        });
    }
    certs.iter().map(sha512_thumbprint).collect()
}
