/// Core protocol errors.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("unsupported JWS algorithm: {0}")]
    UnsupportedAlgorithm(String),

    #[error("unknown signature profile: {0}")]
    UnknownProfile(String),

    #[error("encoding error: {0}")]
    Encoding(String),
}
