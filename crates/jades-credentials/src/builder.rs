//! Protected-header builder.
//!
//! Assembles the JWS protected header under the ETSI TS 119 182-1
//! invariants. Setters validate eagerly and return the builder for
//! chaining; the header is frozen (base64url-encoded) at signing time and
//! immutable thereafter.

use chrono::{Duration, Utc};
use serde_json::{Map, Value};
use x509_cert::Certificate;

use jades_core::{b64url_encode, Alg, SigD, HTTP_HEADERS_MECHANISM};
use jades_crypto::certs::{cert_to_base64_der, sha256_thumbprint, sha512_thumbprint};
use jades_crypto::thumbprint_of_set;

use crate::error::CredentialError;

/// Mutable protected-header configuration.
#[derive(Debug, Clone, Default)]
pub struct HeaderBuilder {
    fields: Map<String, Value>,
}

impl HeaderBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the header map wholesale. The caller supplies at minimum a
    /// parseable `alg`; a `sigD` member with the HTTP-headers mechanism
    /// re-applies the `b64: false` invariant immediately.
    pub fn set_protected_header(
        &mut self,
        fields: Map<String, Value>,
    ) -> Result<&mut Self, CredentialError> {
        let alg = fields
            .get("alg")
            .and_then(Value::as_str)
            .ok_or_else(|| jades_core::CoreError::UnsupportedAlgorithm("<missing>".into()))?;
        Alg::parse(alg)?;
        self.fields = fields;
        if self.sig_d_forces_unencoded() {
            self.fields.insert("b64".into(), Value::Bool(false));
        }
        Ok(self)
    }

    /// `true` restores default JWS behavior (base64url-encoded payload) by
    /// removing the `b64` member; `false` marks the payload as used
    /// literally. When a `sigD` HTTP-headers descriptor is present the
    /// member stays pinned to `false` regardless of this call.
    pub fn set_b64(&mut self, enabled: bool) -> Result<&mut Self, CredentialError> {
        if enabled && !self.sig_d_forces_unencoded() {
            self.fields.shift_remove("b64");
        } else {
            self.fields.insert("b64".into(), Value::Bool(false));
        }
        Ok(self)
    }

    /// Set `iat`, defaulting to the current time in seconds.
    pub fn set_issued_at(&mut self, seconds: Option<i64>) -> Result<&mut Self, CredentialError> {
        let ts = seconds.unwrap_or_else(|| Utc::now().timestamp());
        self.fields.insert("iat".into(), Value::from(ts));
        Ok(self)
    }

    /// Set `signedAt`, defaulting to the current time in seconds.
    pub fn set_signed_at(&mut self, seconds: Option<i64>) -> Result<&mut Self, CredentialError> {
        let ts = seconds.unwrap_or_else(|| Utc::now().timestamp());
        self.fields.insert("signedAt".into(), Value::from(ts));
        Ok(self)
    }

    /// Set `exp` from a duration relative to `iat` (or now when `iat` is
    /// unset). Non-positive durations are rejected.
    pub fn set_expiration_time(&mut self, duration: Duration) -> Result<&mut Self, CredentialError> {
        let seconds = duration.num_seconds();
        if seconds <= 0 {
            return Err(CredentialError::InvalidExpiration(format!(
                "duration must be positive, got {}s",
                seconds
            )));
        }
        let base = self
            .fields
            .get("iat")
            .and_then(Value::as_i64)
            .unwrap_or_else(|| Utc::now().timestamp());
        self.fields.insert("exp".into(), Value::from(base + seconds));
        Ok(self)
    }

    /// Store the detached-payload digest descriptor. The HTTP-headers
    /// mechanism forces `b64: false` (ETSI TS 119 182-1 section 5.1.10).
    pub fn set_sig_d(&mut self, sig_d: SigD) -> Result<&mut Self, CredentialError> {
        let force_unencoded = sig_d.m_id == HTTP_HEADERS_MECHANISM;
        let value = serde_json::to_value(sig_d)
            .map_err(|e| CredentialError::MalformedToken(e.to_string()))?;
        self.fields.insert("sigD".into(), value);
        if force_unencoded {
            self.fields.insert("b64".into(), Value::Bool(false));
        }
        Ok(self)
    }

    pub fn set_jti(&mut self, jti: impl Into<String>) -> Result<&mut Self, CredentialError> {
        self.fields.insert("jti".into(), Value::String(jti.into()));
        Ok(self)
    }

    pub fn set_x5u(&mut self, uri: impl Into<String>) -> Result<&mut Self, CredentialError> {
        self.fields.insert("x5u".into(), Value::String(uri.into()));
        Ok(self)
    }

    /// Embed the certificate chain as standard-base64 DER (`x5c`).
    pub fn set_x5c(&mut self, certs: &[Certificate]) -> Result<&mut Self, CredentialError> {
        let encoded: Result<Vec<Value>, _> = certs
            .iter()
            .map(|cert| cert_to_base64_der(cert).map(Value::String))
            .collect();
        self.fields.insert("x5c".into(), Value::Array(encoded?));
        Ok(self)
    }

    /// SHA-256 thumbprint of a single certificate (`x5t#256`).
    pub fn set_x5t_s256(&mut self, cert: &Certificate) -> Result<&mut Self, CredentialError> {
        let thumb = sha256_thumbprint(cert)?;
        self.fields.insert("x5t#256".into(), Value::String(thumb));
        Ok(self)
    }

    /// sha-512 digest object of a single certificate (`x5t#o`).
    pub fn set_x5t_so(&mut self, cert: &Certificate) -> Result<&mut Self, CredentialError> {
        let digest = sha512_thumbprint(cert)?;
        let value = serde_json::to_value(digest)
            .map_err(|e| CredentialError::MalformedToken(e.to_string()))?;
        self.fields.insert("x5t#o".into(), value);
        Ok(self)
    }

    /// sha-512 digest objects over a certificate set (`x5t#s`). Requires at
    /// least two certificates; use [`Self::set_x5t_so`] for a single one.
    pub fn set_x5ts(&mut self, certs: &[Certificate]) -> Result<&mut Self, CredentialError> {
        let digests = thumbprint_of_set(certs)?;
        let value = serde_json::to_value(digests)
            .map_err(|e| CredentialError::MalformedToken(e.to_string()))?;
        self.fields.insert("x5t#s".into(), value);
        Ok(self)
    }

    pub fn set_cty(&mut self, cty: impl Into<String>) -> Result<&mut Self, CredentialError> {
        self.fields.insert("cty".into(), Value::String(cty.into()));
        Ok(self)
    }

    pub fn set_kid(&mut self, kid: impl Into<String>) -> Result<&mut Self, CredentialError> {
        self.fields.insert("kid".into(), Value::String(kid.into()));
        Ok(self)
    }

    /// The configured signature algorithm.
    pub fn alg(&self) -> Result<Alg, CredentialError> {
        let alg = self
            .fields
            .get("alg")
            .and_then(Value::as_str)
            .ok_or_else(|| jades_core::CoreError::UnsupportedAlgorithm("<missing>".into()))?;
        Ok(Alg::parse(alg)?)
    }

    /// Whether the payload is base64url-encoded (`b64` absent or true).
    pub fn payload_encoded(&self) -> bool {
        self.fields.get("b64").and_then(Value::as_bool).unwrap_or(true)
    }

    pub fn has_sig_d(&self) -> bool {
        self.fields.contains_key("sigD")
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// Freeze the header: serialize in insertion order and base64url-encode.
    pub fn encode(&self) -> Result<String, CredentialError> {
        let json = serde_json::to_string(&Value::Object(self.fields.clone()))
            .map_err(|e| CredentialError::MalformedToken(e.to_string()))?;
        Ok(b64url_encode(json))
    }

    fn sig_d_forces_unencoded(&self) -> bool {
        self.fields
            .get("sigD")
            .and_then(|v| v.get("mId"))
            .and_then(Value::as_str)
            .map(|m_id| m_id == HTTP_HEADERS_MECHANISM)
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jades_core::b64url_decode_string;
    use jades_crypto::parse_certificate_chain;
    use serde_json::json;

    const CHAIN_PEM: &str = include_str!("../testdata/chain.pem");

    fn base_fields() -> Map<String, Value> {
        let mut fields = Map::new();
        fields.insert("alg".into(), json!("RS256"));
        fields.insert("typ".into(), json!("jades"));
        fields
    }

    fn http_sig_d() -> SigD {
        SigD {
            m_id: HTTP_HEADERS_MECHANISM.into(),
            pars: vec!["(request-target)".into(), "digest".into()],
            hash: "S256".into(),
        }
    }

    #[test]
    fn test_set_protected_header_requires_alg() {
        let mut builder = HeaderBuilder::new();
        assert!(builder.set_protected_header(Map::new()).is_err());

        let mut bad = Map::new();
        bad.insert("alg".into(), json!("none"));
        assert!(builder.set_protected_header(bad).is_err());

        assert!(builder.set_protected_header(base_fields()).is_ok());
        assert_eq!(builder.alg().unwrap(), Alg::RS256);
    }

    #[test]
    fn test_b64_true_removes_member() {
        let mut builder = HeaderBuilder::new();
        builder.set_protected_header(base_fields()).unwrap();
        builder.set_b64(false).unwrap();
        assert!(!builder.payload_encoded());
        builder.set_b64(true).unwrap();
        assert!(builder.get("b64").is_none());
        assert!(builder.payload_encoded());
    }

    #[test]
    fn test_http_sig_d_forces_b64_false() {
        let mut builder = HeaderBuilder::new();
        builder.set_protected_header(base_fields()).unwrap();
        builder.set_sig_d(http_sig_d()).unwrap();
        assert_eq!(builder.get("b64"), Some(&json!(false)));
    }

    #[test]
    fn test_http_sig_d_invariant_survives_any_call_order() {
        // setB64(true) after setSigD must not lift the invariant
        let mut builder = HeaderBuilder::new();
        builder.set_protected_header(base_fields()).unwrap();
        builder.set_sig_d(http_sig_d()).unwrap();
        builder.set_b64(true).unwrap();
        assert_eq!(builder.get("b64"), Some(&json!(false)));

        // setB64 before setSigD is overridden by the descriptor
        let mut builder = HeaderBuilder::new();
        builder.set_protected_header(base_fields()).unwrap();
        builder.set_b64(true).unwrap();
        builder.set_sig_d(http_sig_d()).unwrap();
        assert_eq!(builder.get("b64"), Some(&json!(false)));
    }

    #[test]
    fn test_wholesale_replace_reapplies_sig_d_invariant() {
        let mut fields = base_fields();
        fields.insert("sigD".into(), serde_json::to_value(http_sig_d()).unwrap());
        let mut builder = HeaderBuilder::new();
        builder.set_protected_header(fields).unwrap();
        assert_eq!(builder.get("b64"), Some(&json!(false)));
    }

    #[test]
    fn test_non_http_sig_d_leaves_b64_alone() {
        let mut builder = HeaderBuilder::new();
        builder.set_protected_header(base_fields()).unwrap();
        builder
            .set_sig_d(SigD {
                m_id: "http://uri.etsi.org/19182/ObjectIdByURI".into(),
                pars: vec!["part1".into()],
                hash: "S256".into(),
            })
            .unwrap();
        assert!(builder.get("b64").is_none());
        assert!(builder.payload_encoded());
    }

    #[test]
    fn test_issued_at_explicit_and_default() {
        let mut builder = HeaderBuilder::new();
        builder.set_protected_header(base_fields()).unwrap();
        builder.set_issued_at(Some(1683000000)).unwrap();
        assert_eq!(builder.get("iat"), Some(&json!(1683000000)));

        builder.set_signed_at(None).unwrap();
        let now = Utc::now().timestamp();
        let signed_at = builder.get("signedAt").and_then(Value::as_i64).unwrap();
        assert!((now - signed_at).abs() < 5);
    }

    #[test]
    fn test_expiration_relative_to_iat() {
        let mut builder = HeaderBuilder::new();
        builder.set_protected_header(base_fields()).unwrap();
        builder.set_issued_at(Some(1683000000)).unwrap();
        builder.set_expiration_time(Duration::hours(1)).unwrap();
        assert_eq!(builder.get("exp"), Some(&json!(1683003600)));
    }

    #[test]
    fn test_expiration_rejects_non_positive() {
        let mut builder = HeaderBuilder::new();
        builder.set_protected_header(base_fields()).unwrap();
        assert!(matches!(
            builder.set_expiration_time(Duration::zero()),
            Err(CredentialError::InvalidExpiration(_))
        ));
        assert!(matches!(
            builder.set_expiration_time(Duration::seconds(-30)),
            Err(CredentialError::InvalidExpiration(_))
        ));
    }

    #[test]
    fn test_x5c_embeds_chain() {
        let certs = parse_certificate_chain(CHAIN_PEM).unwrap();
        let mut builder = HeaderBuilder::new();
        builder.set_protected_header(base_fields()).unwrap();
        builder.set_x5c(&certs).unwrap();
        let x5c = builder.get("x5c").and_then(Value::as_array).unwrap();
        assert_eq!(x5c.len(), 2);
    }

    #[test]
    fn test_x5ts_requires_two_certificates() {
        let certs = parse_certificate_chain(CHAIN_PEM).unwrap();
        let mut builder = HeaderBuilder::new();
        builder.set_protected_header(base_fields()).unwrap();
        assert!(builder.set_x5ts(&certs[..1]).is_err());
        builder.set_x5ts(&certs).unwrap();
        let set = builder.get("x5t#s").and_then(Value::as_array).unwrap();
        assert_eq!(set.len(), 2);
        assert_eq!(set[0]["digAlg"], "sha-512");
    }

    #[test]
    fn test_x5t_single_cert_variants() {
        let certs = parse_certificate_chain(CHAIN_PEM).unwrap();
        let mut builder = HeaderBuilder::new();
        builder.set_protected_header(base_fields()).unwrap();
        builder.set_x5t_s256(&certs[0]).unwrap();
        builder.set_x5t_so(&certs[0]).unwrap();
        assert!(builder.get("x5t#256").and_then(Value::as_str).is_some());
        assert_eq!(builder.get("x5t#o").unwrap()["digAlg"], "sha-512");
    }

    #[test]
    fn test_encode_preserves_insertion_order() {
        let mut builder = HeaderBuilder::new();
        builder.set_protected_header(base_fields()).unwrap();
        builder.set_kid("issuer#1").unwrap();
        builder.set_jti("urn:example:1").unwrap();
        let decoded = b64url_decode_string(&builder.encode().unwrap()).unwrap();
        let alg_pos = decoded.find("\"alg\"").unwrap();
        let kid_pos = decoded.find("\"kid\"").unwrap();
        let jti_pos = decoded.find("\"jti\"").unwrap();
        assert!(alg_pos < kid_pos && kid_pos < jti_pos);
    }

    #[test]
    fn test_opaque_string_setters() {
        let mut builder = HeaderBuilder::new();
        builder.set_protected_header(base_fields()).unwrap();
        builder
            .set_cty("vc+sd-jwt")
            .unwrap()
            .set_x5u("https://pki.example.com/chain.pem")
            .unwrap();
        assert_eq!(builder.get("cty"), Some(&json!("vc+sd-jwt")));
        assert_eq!(builder.get("x5u"), Some(&json!("https://pki.example.com/chain.pem")));
    }
}
