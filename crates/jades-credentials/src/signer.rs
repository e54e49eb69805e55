//! Credential signer.
//!
//! Orchestrates the header builder, the disclosure commitment engine, and
//! the raw signature primitive into a General JSON Serialization credential.
//! The signer is a two-state machine: `Configuring` accepts header and
//! disclosure configuration, `sign` transitions to `Signed`, and any
//! mutation afterwards fails with `AlreadySigned`.

use chrono::Duration;
use serde_json::{Map, Value};
use x509_cert::Certificate;

use jades_core::{
    b64url_encode, ArchiveTimestamp, CertValue, EtsiUEntry, GeneralJws, Profile,
    RevocationValues, SigD, SignatureEntry, TimestampTokens, TstToken, UnprotectedHeader,
};
use jades_crypto::{apply_disclosure_frame, SigningKey};

use crate::builder::HeaderBuilder;
use crate::error::CredentialError;

/// Opaque qualifying-property blobs supplied by external collaborators.
///
/// This engine never contacts a timestamp authority or fetches revocation
/// data; the caller provides ready-made values which are passed through to
/// the unprotected `etsiU` sequence unmodified.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct QualifyingMaterials {
    /// Base64 RFC 3161 timestamp token (`sigTst`), required from B-T up.
    pub signature_timestamp: Option<String>,
    /// Base64 trust-anchor and CA certificates (`xVals`), required from B-LT up.
    pub validation_certificates: Vec<String>,
    /// CRL/OCSP blobs (`rVals`), required from B-LT up.
    pub revocation_data: Option<RevocationValues>,
    /// Base64 archive timestamp token (`arcTst`), required for B-LTA.
    pub archive_timestamp: Option<String>,
    /// Canonicalization algorithm recorded alongside the archive timestamp.
    pub archive_canon_alg: Option<String>,
}

const DEFAULT_CANON_ALG: &str = "http://uri.etsi.org/19182/canon/json";

#[derive(Debug)]
enum SignerState {
    Configuring(Box<SignerConfig>),
    Signed,
}

#[derive(Debug, Default)]
struct SignerConfig {
    payload: Option<Value>,
    header: HeaderBuilder,
    disclosure_frame: Option<Value>,
    profile: Option<Profile>,
    materials: QualifyingMaterials,
}

/// Signs a payload (or detached content reference) into a `GeneralJws`.
#[derive(Debug)]
pub struct Signer {
    state: SignerState,
}

impl Signer {
    /// Create a signer. `None` selects detached mode (ETSI TS 119 182-1
    /// section 5.2.8): the payload is the empty string and a `sigD`
    /// descriptor must be configured before signing.
    pub fn new(payload: Option<Value>) -> Self {
        Self {
            state: SignerState::Configuring(Box::new(SignerConfig {
                payload,
                ..Default::default()
            })),
        }
    }

    fn config(&mut self) -> Result<&mut SignerConfig, CredentialError> {
        match &mut self.state {
            SignerState::Configuring(config) => Ok(config),
            SignerState::Signed => Err(CredentialError::AlreadySigned),
        }
    }

    pub fn set_protected_header(
        &mut self,
        fields: Map<String, Value>,
    ) -> Result<&mut Self, CredentialError> {
        self.config()?.header.set_protected_header(fields)?;
        Ok(self)
    }

    pub fn set_b64(&mut self, enabled: bool) -> Result<&mut Self, CredentialError> {
        self.config()?.header.set_b64(enabled)?;
        Ok(self)
    }

    pub fn set_issued_at(&mut self, seconds: Option<i64>) -> Result<&mut Self, CredentialError> {
        self.config()?.header.set_issued_at(seconds)?;
        Ok(self)
    }

    pub fn set_signed_at(&mut self, seconds: Option<i64>) -> Result<&mut Self, CredentialError> {
        self.config()?.header.set_signed_at(seconds)?;
        Ok(self)
    }

    pub fn set_expiration_time(&mut self, duration: Duration) -> Result<&mut Self, CredentialError> {
        self.config()?.header.set_expiration_time(duration)?;
        Ok(self)
    }

    pub fn set_sig_d(&mut self, sig_d: SigD) -> Result<&mut Self, CredentialError> {
        self.config()?.header.set_sig_d(sig_d)?;
        Ok(self)
    }

    pub fn set_jti(&mut self, jti: impl Into<String>) -> Result<&mut Self, CredentialError> {
        self.config()?.header.set_jti(jti)?;
        Ok(self)
    }

    pub fn set_x5u(&mut self, uri: impl Into<String>) -> Result<&mut Self, CredentialError> {
        self.config()?.header.set_x5u(uri)?;
        Ok(self)
    }

    pub fn set_x5c(&mut self, certs: &[Certificate]) -> Result<&mut Self, CredentialError> {
        self.config()?.header.set_x5c(certs)?;
        Ok(self)
    }

    pub fn set_x5t_s256(&mut self, cert: &Certificate) -> Result<&mut Self, CredentialError> {
        self.config()?.header.set_x5t_s256(cert)?;
        Ok(self)
    }

    pub fn set_x5t_so(&mut self, cert: &Certificate) -> Result<&mut Self, CredentialError> {
        self.config()?.header.set_x5t_so(cert)?;
        Ok(self)
    }

    pub fn set_x5ts(&mut self, certs: &[Certificate]) -> Result<&mut Self, CredentialError> {
        self.config()?.header.set_x5ts(certs)?;
        Ok(self)
    }

    pub fn set_cty(&mut self, cty: impl Into<String>) -> Result<&mut Self, CredentialError> {
        self.config()?.header.set_cty(cty)?;
        Ok(self)
    }

    pub fn set_kid(&mut self, kid: impl Into<String>) -> Result<&mut Self, CredentialError> {
        self.config()?.header.set_kid(kid)?;
        Ok(self)
    }

    /// Configure the disclosure frame. Fields selected by the frame are
    /// replaced by salted digest commitments at signing time; without a
    /// frame the payload is embedded as-is with no commitments.
    pub fn set_disclosure_frame(&mut self, frame: Value) -> Result<&mut Self, CredentialError> {
        self.config()?.disclosure_frame = Some(frame);
        Ok(self)
    }

    /// Select the signature profile. Profiles beyond B-B consume the
    /// corresponding [`QualifyingMaterials`].
    pub fn set_profile(&mut self, profile: Profile) -> Result<&mut Self, CredentialError> {
        self.config()?.profile = Some(profile);
        Ok(self)
    }

    /// Supply opaque timestamp/validation blobs for the selected profile.
    pub fn set_qualifying_materials(
        &mut self,
        materials: QualifyingMaterials,
    ) -> Result<&mut Self, CredentialError> {
        self.config()?.materials = materials;
        Ok(self)
    }

    /// Produce the signature and freeze the signer.
    ///
    /// Computes the committed payload, the frozen protected header, and the
    /// raw signature over `protected || "." || payload`, then assembles the
    /// unprotected header (disclosures, kid, profile `etsiU` sequence).
    pub fn sign(&mut self, key: &SigningKey, kid: &str) -> Result<GeneralJws, CredentialError> {
        let config = self.config()?;
        let jws = Self::sign_config(config, key, kid)?;
        // Freeze only on success; a failed attempt leaves the signer
        // configurable so the caller can correct the input.
        self.state = SignerState::Signed;
        Ok(jws)
    }

    fn sign_config(
        config: &mut SignerConfig,
        key: &SigningKey,
        kid: &str,
    ) -> Result<GeneralJws, CredentialError> {
        let alg = config.header.alg()?;

        let (payload_repr, disclosures) = match config.payload.clone() {
            Some(payload) => {
                let (effective_payload, tokens) = match config.disclosure_frame.as_ref() {
                    Some(frame) => {
                        let (committed, tokens) =
                            apply_disclosure_frame(&payload, Some(frame))?;
                        let tokens: Vec<String> =
                            tokens.iter().map(|d| d.encoded().to_string()).collect();
                        (committed, tokens)
                    }
                    None => (payload, Vec::new()),
                };
                let json = serde_json::to_string(&effective_payload)
                    .map_err(|e| CredentialError::MalformedToken(e.to_string()))?;
                let repr = if config.header.payload_encoded() {
                    b64url_encode(json)
                } else {
                    json
                };
                (repr, tokens)
            }
            None => {
                // Detached payload: the digest descriptor stands in for the
                // embedded content and the payload member is empty.
                if !config.header.has_sig_d() {
                    return Err(CredentialError::MissingSigD);
                }
                config.header.set_b64(false)?;
                (String::new(), Vec::new())
            }
        };

        let protected = config.header.encode()?;
        let signing_input = format!("{}.{}", protected, payload_repr);
        let raw_signature = jades_crypto::sign(alg, key, signing_input.as_bytes())?;

        let etsi_u = match config.profile {
            None | Some(Profile::Baseline) => None,
            Some(profile) => Some(build_etsi_u(profile, &config.materials)?),
        };

        let header = UnprotectedHeader {
            disclosures: (!disclosures.is_empty()).then_some(disclosures),
            kid: Some(kid.to_string()),
            kb_jwt: None,
            etsi_u,
        };

        tracing::info!(
            alg = %alg,
            kid = kid,
            profile = config.profile.map(|p| p.as_str()).unwrap_or("B-B"),
            disclosures = header.disclosure_count(),
            detached = payload_repr.is_empty(),
            "credential signed"
        );

        Ok(GeneralJws {
            payload: payload_repr,
            signatures: vec![SignatureEntry {
                protected,
                signature: b64url_encode(raw_signature),
                header,
            }],
        })
    }
}

/// Assemble the `etsiU` sequence for a profile, in the mandated
/// sigTst → xVals → rVals → arcTst order.
fn build_etsi_u(
    profile: Profile,
    materials: &QualifyingMaterials,
) -> Result<Vec<EtsiUEntry>, CredentialError> {
    let mut entries = Vec::new();

    // B-T and up: signature timestamp
    let tst = materials
        .signature_timestamp
        .as_ref()
        .ok_or(CredentialError::MissingQualifyingMaterial("sigTst"))?;
    entries.push(EtsiUEntry::SigTst(TimestampTokens {
        tst_tokens: vec![TstToken { val: tst.clone() }],
    }));
    if profile == Profile::Timestamped {
        return Ok(entries);
    }

    // B-LT and up: validation certificates and revocation data
    if materials.validation_certificates.is_empty() {
        return Err(CredentialError::MissingQualifyingMaterial("xVals"));
    }
    entries.push(EtsiUEntry::XVals(
        materials
            .validation_certificates
            .iter()
            .map(|cert| CertValue { x509_cert: cert.clone() })
            .collect(),
    ));
    let revocation = materials
        .revocation_data
        .as_ref()
        .ok_or(CredentialError::MissingQualifyingMaterial("rVals"))?;
    entries.push(EtsiUEntry::RVals(revocation.clone()));
    if profile == Profile::LongTerm {
        return Ok(entries);
    }

    // B-LTA: archive timestamp
    let arc = materials
        .archive_timestamp
        .as_ref()
        .ok_or(CredentialError::MissingQualifyingMaterial("arcTst"))?;
    entries.push(EtsiUEntry::ArcTst(ArchiveTimestamp {
        tst_tokens: vec![TstToken { val: arc.clone() }],
        canon_alg: materials
            .archive_canon_alg
            .clone()
            .unwrap_or_else(|| DEFAULT_CANON_ALG.to_string()),
    }));
    Ok(entries)
}
