/// Cryptographic layer errors.
#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    #[error("malformed certificate: {0}")]
    MalformedCertificate(String),

    #[error("at least {needed} certificates are required, got {got}")]
    InsufficientCertificateCount { needed: usize, got: usize },

    #[error("invalid private key: {0}")]
    InvalidKey(String),

    #[error("key does not match algorithm {0}")]
    KeyAlgorithmMismatch(String),

    #[error("signature verification failed")]
    SignatureVerificationFailed,

    #[error("disclosure digest not found in payload commitments: {0}")]
    DisclosureMismatch(String),

    #[error("invalid disclosure frame: {0}")]
    InvalidDisclosureFrame(String),

    #[error("malformed disclosure token: {0}")]
    MalformedDisclosure(String),

    #[error("core error: {0}")]
    Core(#[from] jades_core::CoreError),

    #[error("serialization error: {0}")]
    Serialization(String),
}
