/// Credential engine errors.
#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    #[error("invalid expiration: {0}")]
    InvalidExpiration(String),

    #[error("malformed credential: {0}")]
    MalformedCredential(String),

    #[error("malformed token: {0}")]
    MalformedToken(String),

    #[error("x5c certificate chain is missing in the protected header")]
    MissingCertificateChain,

    #[error("signer has already produced a signature")]
    AlreadySigned,

    #[error("detached signing requires a sigD digest descriptor")]
    MissingSigD,

    #[error("profile requires qualifying material: {0}")]
    MissingQualifyingMaterial(&'static str),

    #[error("core error: {0}")]
    Core(#[from] jades_core::CoreError),

    #[error("crypto error: {0}")]
    Crypto(#[from] jades_crypto::CryptoError),
}
