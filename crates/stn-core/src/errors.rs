/// Failures of the decryption engine.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CryptoError {
    #[error("key must be 64 hex characters encoding 32 bytes")]
    KeyFormat,

    #[error("payload is not valid base64 or not block aligned")]
    PayloadFormat,

    #[error("ciphertext too short")]
    ShortCiphertext,
}

/// Core error type for the relay.
///
/// Adapter crates map their specific errors into this type so the HTTP layer
/// and the bot loop can handle failures consistently (status code vs reply).
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    /// Unknown public id and disabled subscription share this error.
    #[error("invalid UUID or not subscribed")]
    NotFoundOrUnauthorized,

    #[error("not subscribed")]
    NotSubscribed,

    #[error("validation error: {0}")]
    Validation(String),

    #[error("crypto error: {0}")]
    Crypto(#[from] CryptoError),

    #[error("external error: {0}")]
    External(String),

    #[error("entropy source unavailable: {0}")]
    Entropy(String),

    #[error("store error: {0}")]
    Store(String),
}

pub type Result<T> = std::result::Result<T, Error>;
