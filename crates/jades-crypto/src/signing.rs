//! Raw JWS signature computation and verification.
//!
//! Signatures are produced and checked in the JWS raw form: PKCS#1 v1.5 or
//! PSS octet strings for the RSA family, fixed-width `r || s` for the ECDSA
//! family.

use rsa::pkcs8::DecodePublicKey;
use rsa::signature::{RandomizedSigner, SignatureEncoding, Signer, Verifier};
use rsa::RsaPublicKey;
use sha2::{Sha256, Sha384, Sha512};

use jades_core::Alg;

use crate::error::CryptoError;
use crate::keys::SigningKey;

/// Sign `message` with `key` using the given JWS algorithm.
///
/// Fails with `KeyAlgorithmMismatch` when the key family cannot produce the
/// requested algorithm (e.g. an EC P-256 key asked for RS256).
pub fn sign(alg: Alg, key: &SigningKey, message: &[u8]) -> Result<Vec<u8>, CryptoError> {
    match (alg, key) {
        (Alg::RS256, SigningKey::Rsa(k)) => {
            Ok(rsa::pkcs1v15::SigningKey::<Sha256>::new(k.clone()).sign(message).to_vec())
        }
        (Alg::RS384, SigningKey::Rsa(k)) => {
            Ok(rsa::pkcs1v15::SigningKey::<Sha384>::new(k.clone()).sign(message).to_vec())
        }
        (Alg::RS512, SigningKey::Rsa(k)) => {
            Ok(rsa::pkcs1v15::SigningKey::<Sha512>::new(k.clone()).sign(message).to_vec())
        }
        (Alg::PS256, SigningKey::Rsa(k)) => {
            let sk = rsa::pss::BlindedSigningKey::<Sha256>::new(k.clone());
            Ok(sk.sign_with_rng(&mut rand::thread_rng(), message).to_vec())
        }
        (Alg::PS384, SigningKey::Rsa(k)) => {
            let sk = rsa::pss::BlindedSigningKey::<Sha384>::new(k.clone());
            Ok(sk.sign_with_rng(&mut rand::thread_rng(), message).to_vec())
        }
        (Alg::PS512, SigningKey::Rsa(k)) => {
            let sk = rsa::pss::BlindedSigningKey::<Sha512>::new(k.clone());
            Ok(sk.sign_with_rng(&mut rand::thread_rng(), message).to_vec())
        }
        (Alg::ES256, SigningKey::EcP256(k)) => {
            let sig: p256::ecdsa::Signature = k.sign(message);
            Ok(sig.to_vec())
        }
        (Alg::ES384, SigningKey::EcP384(k)) => {
            let sig: p384::ecdsa::Signature = k.sign(message);
            Ok(sig.to_vec())
        }
        (Alg::ES512, SigningKey::EcP521(k)) => {
            let sig: p521::ecdsa::Signature = k.sign(message);
            Ok(sig.to_vec())
        }
        _ => Err(CryptoError::KeyAlgorithmMismatch(alg.to_string())),
    }
}

/// Verify a raw JWS signature over `message` against a certificate's
/// DER-encoded SubjectPublicKeyInfo.
pub fn verify(alg: Alg, spki: &[u8], message: &[u8], signature: &[u8]) -> Result<(), CryptoError> {
    if alg.is_rsa() {
        let key = RsaPublicKey::from_public_key_der(spki)
            .map_err(|e| CryptoError::InvalidKey(e.to_string()))?;
        return verify_rsa(alg, key, message, signature);
    }

    match alg {
        Alg::ES256 => {
            let key = p256::ecdsa::VerifyingKey::from_public_key_der(spki)
                .map_err(|e| CryptoError::InvalidKey(e.to_string()))?;
            let sig = p256::ecdsa::Signature::from_slice(signature)
                .map_err(|_| CryptoError::SignatureVerificationFailed)?;
            key.verify(message, &sig)
                .map_err(|_| CryptoError::SignatureVerificationFailed)
        }
        Alg::ES384 => {
            let key = p384::ecdsa::VerifyingKey::from_public_key_der(spki)
                .map_err(|e| CryptoError::InvalidKey(e.to_string()))?;
            let sig = p384::ecdsa::Signature::from_slice(signature)
                .map_err(|_| CryptoError::SignatureVerificationFailed)?;
            key.verify(message, &sig)
                .map_err(|_| CryptoError::SignatureVerificationFailed)
        }
        Alg::ES512 => {
            // p521 0.13's ECDSA `VerifyingKey` does not expose SPKI decode directly;
            // decode via `PublicKey` (same SPKI bytes) and rebuild from the point.
            use p521::elliptic_curve::sec1::ToEncodedPoint;
            let pk = p521::PublicKey::from_public_key_der(spki)
                .map_err(|e| CryptoError::InvalidKey(e.to_string()))?;
            let key = p521::ecdsa::VerifyingKey::from_encoded_point(&pk.to_encoded_point(false))
                .map_err(|e| CryptoError::InvalidKey(e.to_string()))?;
            let sig = p521::ecdsa::Signature::from_slice(signature)
                .map_err(|_| CryptoError::SignatureVerificationFailed)?;
            key.verify(message, &sig)
                .map_err(|_| CryptoError::SignatureVerificationFailed)
        }
        _ => unreachable!("RSA algorithms handled above"),
    }
}

fn verify_rsa(
    alg: Alg,
    key: RsaPublicKey,
    message: &[u8],
    signature: &[u8],
) -> Result<(), CryptoError> {
    let failed = |_| CryptoError::SignatureVerificationFailed;
    match alg {
        Alg::RS256 => rsa::pkcs1v15::VerifyingKey::<Sha256>::new(key)
            .verify(message, &rsa::pkcs1v15::Signature::try_from(signature).map_err(failed)?)
            .map_err(failed),
        Alg::RS384 => rsa::pkcs1v15::VerifyingKey::<Sha384>::new(key)
            .verify(message, &rsa::pkcs1v15::Signature::try_from(signature).map_err(failed)?)
            .map_err(failed),
        Alg::RS512 => rsa::pkcs1v15::VerifyingKey::<Sha512>::new(key)
            .verify(message, &rsa::pkcs1v15::Signature::try_from(signature).map_err(failed)?)
            .map_err(failed),
        Alg::PS256 => rsa::pss::VerifyingKey::<Sha256>::new(key)
            .verify(message, &rsa::pss::Signature::try_from(signature).map_err(failed)?)
            .map_err(failed),
        Alg::PS384 => rsa::pss::VerifyingKey::<Sha384>::new(key)
            .verify(message, &rsa::pss::Signature::try_from(signature).map_err(failed)?)
            .map_err(failed),
        Alg::PS512 => rsa::pss::VerifyingKey::<Sha512>::new(key)
            .verify(message, &rsa::pss::Signature::try_from(signature).map_err(failed)?)
            .map_err(failed),
        _ => unreachable!("EC algorithms handled by caller"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::certs::{parse_certificate_chain, spki_der};

    const RSA_KEY_PEM: &str = include_str!("../testdata/rsa_key.pem");
    const RSA_CERT_PEM: &str = include_str!("../testdata/rsa_cert.pem");
    const EC_KEY_PEM: &str = include_str!("../testdata/ec_key.pem");
    const EC_CERT_PEM: &str = include_str!("../testdata/ec_cert.pem");

    fn rsa_spki() -> Vec<u8> {
        let certs = parse_certificate_chain(RSA_CERT_PEM).unwrap();
        spki_der(&certs[0]).unwrap()
    }

    fn ec_spki() -> Vec<u8> {
        let certs = parse_certificate_chain(EC_CERT_PEM).unwrap();
        spki_der(&certs[0]).unwrap()
    }

    #[test]
    fn test_rs256_roundtrip() {
        let key = SigningKey::from_pkcs8_pem(RSA_KEY_PEM).unwrap();
        let sig = sign(Alg::RS256, &key, b"header.payload").unwrap();
        assert!(verify(Alg::RS256, &rsa_spki(), b"header.payload", &sig).is_ok());
    }

    #[test]
    fn test_ps256_roundtrip() {
        let key = SigningKey::from_pkcs8_pem(RSA_KEY_PEM).unwrap();
        let sig = sign(Alg::PS256, &key, b"header.payload").unwrap();
        assert!(verify(Alg::PS256, &rsa_spki(), b"header.payload", &sig).is_ok());
    }

    #[test]
    fn test_rs512_roundtrip() {
        let key = SigningKey::from_pkcs8_pem(RSA_KEY_PEM).unwrap();
        let sig = sign(Alg::RS512, &key, b"input").unwrap();
        assert!(verify(Alg::RS512, &rsa_spki(), b"input", &sig).is_ok());
    }

    #[test]
    fn test_es256_roundtrip() {
        let key = SigningKey::from_pkcs8_pem(EC_KEY_PEM).unwrap();
        let sig = sign(Alg::ES256, &key, b"header.payload").unwrap();
        assert_eq!(sig.len(), 64);
        assert!(verify(Alg::ES256, &ec_spki(), b"header.payload", &sig).is_ok());
    }

    #[test]
    fn test_verify_tampered_message_fails() {
        let key = SigningKey::from_pkcs8_pem(EC_KEY_PEM).unwrap();
        let sig = sign(Alg::ES256, &key, b"original").unwrap();
        assert!(verify(Alg::ES256, &ec_spki(), b"tampered", &sig).is_err());
    }

    #[test]
    fn test_verify_tampered_signature_fails() {
        let key = SigningKey::from_pkcs8_pem(RSA_KEY_PEM).unwrap();
        let mut sig = sign(Alg::RS256, &key, b"message").unwrap();
        sig[0] ^= 0x01;
        assert!(verify(Alg::RS256, &rsa_spki(), b"message", &sig).is_err());
    }

    #[test]
    fn test_key_algorithm_mismatch() {
        let ec_key = SigningKey::from_pkcs8_pem(EC_KEY_PEM).unwrap();
        assert!(matches!(
            sign(Alg::RS256, &ec_key, b"x"),
            Err(CryptoError::KeyAlgorithmMismatch(_))
        ));
        let rsa_key = SigningKey::from_pkcs8_pem(RSA_KEY_PEM).unwrap();
        assert!(matches!(
            sign(Alg::ES384, &rsa_key, b"x"),
            Err(CryptoError::KeyAlgorithmMismatch(_))
        ));
    }

    #[test]
    fn test_verify_wrong_key_family() {
        let key = SigningKey::from_pkcs8_pem(RSA_KEY_PEM).unwrap();
        let sig = sign(Alg::RS256, &key, b"message").unwrap();
        // EC SPKI cannot validate an RSA signature
        assert!(verify(Alg::RS256, &ec_spki(), b"message", &sig).is_err());
    }
}
