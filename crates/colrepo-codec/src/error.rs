/// Errors from encoding or decoding documents.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// The value could not be encoded as JSON.
    #[error("encode error: {0}")]
    Encode(#[source] serde_json::Error),

    /// The document is malformed or does not match the requested type.
    #[error("decode error: {0}")]
    Decode(#[source] serde_json::Error),

    /// The document's discriminator names a shape the requested type does
    /// not register.
    #[error("document shape {found:?} is not registered for {expected}")]
    UnregisteredShape { found: String, expected: &'static str },

    /// The discriminator field is present but is not a string.
    #[error("discriminator must be a string, found {0}")]
    InvalidDiscriminator(String),
}

/// Result alias for codec operations.
pub type CodecResult<T> = Result<T, CodecError>;
