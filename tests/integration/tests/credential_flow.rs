//! Integration test: Full credential lifecycle across crates.
//!
//! Tests the issuer → holder → verifier flow using jades-credentials and
//! jades-crypto together, against the fixture certificate chain.

use serde_json::{json, Map, Value};

use jades_core::{Alg, EtsiUEntry, GeneralJws, Profile, RevocationValues, SigD};
use jades_credentials::{Presenter, QualifyingMaterials, Signer, Verifier};
use jades_crypto::{derive_key_id, parse_certificate_chain, SigningKey};

const RSA_KEY_PEM: &str = include_str!("../testdata/rsa_key.pem");
const RSA_CERT_PEM: &str = include_str!("../testdata/rsa_cert.pem");
const EC_KEY_PEM: &str = include_str!("../testdata/ec_key.pem");
const EC_CERT_PEM: &str = include_str!("../testdata/ec_cert.pem");
const CHAIN_PEM: &str = include_str!("../testdata/chain.pem");

/// Helper: signer configured with the fixture chain and a driver's-license
/// payload, mirroring the issuance side of the system.
fn license_signer(alg: &str) -> Signer {
    let mut fields = Map::new();
    fields.insert("alg".into(), json!(alg));
    fields.insert("typ".into(), json!("jades"));

    let mut signer = Signer::new(Some(json!({
        "vct": "https://credentials.example.com/drivers_license",
        "given_name": "Jane",
        "family_name": "Doe",
        "license_number": "DL1"
    })));
    signer.set_protected_header(fields).unwrap();
    let cert_pem = if alg.starts_with("ES") { EC_CERT_PEM } else { RSA_CERT_PEM };
    let certs = parse_certificate_chain(cert_pem).unwrap();
    signer.set_x5c(&certs).unwrap();
    signer
}

fn signing_key(alg: &str) -> SigningKey {
    let pem = if alg.starts_with("ES") { EC_KEY_PEM } else { RSA_KEY_PEM };
    SigningKey::from_pkcs8_pem(pem).unwrap()
}

// =========================================================================
// Issuer → Holder → Verifier with selective disclosure
// =========================================================================

#[test]
fn test_sign_present_verify_selective_disclosure() {
    let mut signer = license_signer("RS256");
    signer
        .set_disclosure_frame(json!({"_sd": ["given_name", "family_name"]}))
        .unwrap();
    let credential = signer.sign(&signing_key("RS256"), "issuer-kid").unwrap();
    assert_eq!(credential.disclosure_count(), 2);

    // Holder reveals only the given name
    let presented =
        Presenter::present(&credential, Some(&json!({"given_name": true}))).unwrap();
    assert_eq!(presented.disclosure_count(), 1);

    // Verifier reconstructs the claim set
    let outcome = Verifier::verify(&presented).unwrap();
    assert!(outcome.verified);
    let payload = outcome.payload.unwrap();
    assert_eq!(payload["given_name"], "Jane");
    assert!(payload.get("family_name").is_none());
    // Non-disclosable field is always shown
    assert_eq!(payload["license_number"], "DL1");
}

#[test]
fn test_full_reveal_recovers_original_claims() {
    let mut signer = license_signer("RS256");
    signer
        .set_disclosure_frame(json!({"_sd": ["given_name", "family_name", "license_number"]}))
        .unwrap();
    let credential = signer.sign(&signing_key("RS256"), "issuer-kid").unwrap();

    let presented = Presenter::present(
        &credential,
        Some(&json!({"given_name": true, "family_name": true, "license_number": true})),
    )
    .unwrap();

    let outcome = Verifier::verify(&presented).unwrap();
    assert!(outcome.verified);
    let payload = outcome.payload.unwrap();
    assert_eq!(payload["given_name"], "Jane");
    assert_eq!(payload["family_name"], "Doe");
    assert_eq!(payload["license_number"], "DL1");
    assert_eq!(
        payload["vct"],
        "https://credentials.example.com/drivers_license"
    );
}

#[test]
fn test_es256_flow() {
    let mut signer = license_signer("ES256");
    signer.set_disclosure_frame(json!({"_sd": ["given_name"]})).unwrap();
    let credential = signer.sign(&signing_key("ES256"), "ec-kid").unwrap();

    let presented = Presenter::present(&credential, Some(&json!({"given_name": true}))).unwrap();
    let outcome = Verifier::verify(&presented).unwrap();
    assert!(outcome.verified);
    assert_eq!(outcome.payload.unwrap()["given_name"], "Jane");
}

#[test]
fn test_verify_json_string_form() {
    let mut signer = license_signer("RS256");
    signer.set_disclosure_frame(json!({"_sd": ["given_name"]})).unwrap();
    let credential = signer.sign(&signing_key("RS256"), "issuer-kid").unwrap();

    let serialized = serde_json::to_string(&credential).unwrap();
    let presented = Presenter::present_json(&serialized, Some(&json!({"given_name": true}))).unwrap();
    let outcome = Verifier::verify_json(&serde_json::to_string(&presented).unwrap()).unwrap();
    assert!(outcome.verified);
}

// =========================================================================
// Presentation edge cases
// =========================================================================

#[test]
fn test_present_empty_frame_equals_absent_frame() {
    let mut signer = license_signer("RS256");
    signer
        .set_disclosure_frame(json!({"_sd": ["given_name", "family_name"]}))
        .unwrap();
    let credential = signer.sign(&signing_key("RS256"), "issuer-kid").unwrap();

    let with_empty = Presenter::present(&credential, Some(&json!({}))).unwrap();
    let with_none = Presenter::present(&credential, None).unwrap();
    assert_eq!(with_empty, with_none);
}

#[test]
fn test_present_without_disclosures_returns_credential_unchanged() {
    let mut signer = license_signer("RS256");
    let credential = signer.sign(&signing_key("RS256"), "issuer-kid").unwrap();
    assert_eq!(credential.disclosure_count(), 0);

    let presented = Presenter::present(
        &credential,
        Some(&json!({"given_name": true, "family_name": true})),
    )
    .unwrap();
    assert_eq!(presented, credential);
}

// =========================================================================
// Tampering and error taxonomy
// =========================================================================

#[test]
fn test_tampered_signature_yields_false_not_error() {
    let mut signer = license_signer("RS256");
    let mut credential = signer.sign(&signing_key("RS256"), "issuer-kid").unwrap();

    let mut sig = jades_core::b64url_decode(&credential.signatures[0].signature).unwrap();
    sig[10] ^= 0xff;
    credential.signatures[0].signature = jades_core::b64url_encode(sig);

    let outcome = Verifier::verify(&credential).unwrap();
    assert!(!outcome.verified);
}

#[test]
fn test_missing_x5c_is_typed_error() {
    let mut fields = Map::new();
    fields.insert("alg".into(), json!("RS256"));
    let mut signer = Signer::new(Some(json!({"a": 1})));
    signer.set_protected_header(fields).unwrap();
    let credential = signer.sign(&signing_key("RS256"), "kid").unwrap();

    assert!(matches!(
        Verifier::verify(&credential),
        Err(jades_credentials::CredentialError::MissingCertificateChain)
    ));
}

#[test]
fn test_wrong_certificate_fails_verification() {
    // Sign with the RSA key but embed the EC certificate chain
    let mut fields = Map::new();
    fields.insert("alg".into(), json!("RS256"));
    let mut signer = Signer::new(Some(json!({"a": 1})));
    signer.set_protected_header(fields).unwrap();
    let ec_certs = parse_certificate_chain(EC_CERT_PEM).unwrap();
    signer.set_x5c(&ec_certs).unwrap();
    let credential = signer.sign(&signing_key("RS256"), "kid").unwrap();

    let outcome = Verifier::verify(&credential).unwrap();
    assert!(!outcome.verified);
}

// =========================================================================
// Profiles
// =========================================================================

#[test]
fn test_long_term_profile_etsi_u_contents() {
    let mut signer = license_signer("RS256");
    signer.set_profile(Profile::LongTerm).unwrap();
    signer
        .set_qualifying_materials(QualifyingMaterials {
            signature_timestamp: Some("dHN0".into()),
            validation_certificates: vec!["YW5jaG9y".into(), "Y2E=".into()],
            revocation_data: Some(RevocationValues {
                crl_vals: vec!["Y3Js".into()],
                ocsp_vals: vec!["b2NzcA==".into()],
            }),
            ..Default::default()
        })
        .unwrap();
    let credential = signer.sign(&signing_key("RS256"), "issuer-kid").unwrap();

    let etsi_u = credential.signatures[0].header.etsi_u.as_ref().unwrap();
    let sig_tst = etsi_u.iter().filter(|e| matches!(e, EtsiUEntry::SigTst(_))).count();
    let x_vals = etsi_u.iter().filter(|e| matches!(e, EtsiUEntry::XVals(_))).count();
    let r_vals = etsi_u.iter().filter(|e| matches!(e, EtsiUEntry::RVals(_))).count();
    let arc_tst = etsi_u.iter().filter(|e| matches!(e, EtsiUEntry::ArcTst(_))).count();
    assert_eq!((sig_tst, x_vals, r_vals, arc_tst), (1, 1, 1, 0));
    assert!(matches!(etsi_u[0], EtsiUEntry::SigTst(_)));
    assert!(matches!(etsi_u[1], EtsiUEntry::XVals(_)));
    assert!(matches!(etsi_u[2], EtsiUEntry::RVals(_)));

    // The profile material is unprotected — the signature still verifies
    let outcome = Verifier::verify(&credential).unwrap();
    assert!(outcome.verified);
}

// =========================================================================
// Detached payload (sigD)
// =========================================================================

#[test]
fn test_detached_credential_has_empty_payload_and_unencoded_marker() {
    let mut fields = Map::new();
    fields.insert("alg".into(), json!("RS256"));
    let mut signer = Signer::new(None);
    signer.set_protected_header(fields).unwrap();
    let certs = parse_certificate_chain(RSA_CERT_PEM).unwrap();
    signer.set_x5c(&certs).unwrap();
    signer
        .set_sig_d(SigD {
            m_id: jades_core::HTTP_HEADERS_MECHANISM.into(),
            pars: vec!["(request-target)".into(), "digest".into()],
            hash: "S256".into(),
        })
        .unwrap();
    let credential = signer.sign(&signing_key("RS256"), "issuer-kid").unwrap();

    assert_eq!(credential.payload, "");
    let protected: Value = serde_json::from_str(
        &jades_core::b64url_decode_string(&credential.signatures[0].protected).unwrap(),
    )
    .unwrap();
    assert_eq!(protected["b64"], json!(false));
    assert_eq!(protected["sigD"]["mId"], jades_core::HTTP_HEADERS_MECHANISM);

    // Signature covers `protected || "." || ""` and still verifies
    let outcome = Verifier::verify(&credential).unwrap();
    assert!(outcome.verified);
    assert!(outcome.payload.is_none());
}

// =========================================================================
// Certificate utilities against the fixture chain
// =========================================================================

#[test]
fn test_kid_derivation_is_stable_across_chain_loads() {
    let certs_a = parse_certificate_chain(CHAIN_PEM).unwrap();
    let certs_b = parse_certificate_chain(CHAIN_PEM).unwrap();
    assert_eq!(
        derive_key_id(&certs_a[0]).unwrap(),
        derive_key_id(&certs_b[0]).unwrap()
    );
}

#[test]
fn test_serialized_credential_roundtrip() {
    let mut signer = license_signer("RS256");
    signer.set_disclosure_frame(json!({"_sd": ["given_name"]})).unwrap();
    let credential = signer.sign(&signing_key("RS256"), "issuer-kid").unwrap();

    let json_str = serde_json::to_string(&credential).unwrap();
    let deserialized: GeneralJws = serde_json::from_str(&json_str).unwrap();
    assert_eq!(deserialized, credential);

    let outcome = Verifier::verify(&deserialized).unwrap();
    assert!(outcome.verified);
}

#[test]
fn test_alg_table_rejects_foreign_algorithms() {
    assert!(Alg::parse("HS256").is_err());
    assert!(Alg::parse("EdDSA").is_err());
    assert!(Alg::parse("RS256").is_ok());
}
