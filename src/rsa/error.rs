use thiserror::Error;

#[derive(Debug, Error)]
pub enum RsaError {
    #[error("Invalid key length `{0}` bits, at least 16 bits are required")]
    InvalidKeyLength(usize),

    #[error("Key generation failed: {0}")]
    KeyGenerationFailed(String),

    #[error("Value is not invertible by the given modulus")]
    NotInvertible,

    #[error("Invalid key data: {0}")]
    InvalidKeyData(String),

    #[error("Malformed key string: {0}")]
    MalformedKeyString(String),

    #[error("Missing parameter `{0}`")]
    MissingParameter(&'static str),

    #[error("Invalid ciphertext length `{len}` bytes, must be a multiple of `{block}` bytes")]
    InvalidCiphertextLength { len: usize, block: usize },

    #[error("Padding check failed: {0}")]
    PaddingCheckFailed(&'static str),

    #[error("Message too long: `{len}` bytes, at most `{max}` bytes fit in one block")]
    MessageTooLong { len: usize, max: usize },

    #[error("Truncated input: need `{need}` bytes at offset `{pos}`, `{have}` available")]
    TruncatedInput { pos: usize, need: usize, have: usize },

    #[error("Unexpected ASN.1 tag {found:#x}, expected {expected:#x}")]
    UnexpectedTag { expected: u32, found: u32 },

    #[error("ASN.1 tag {0:#x} must be constructed")]
    NotConstructed(u32),

    #[error("PEM marker `{0}` not found")]
    PemMarkerNotFound(&'static str),

    #[error("Modulus, public and private exponent do not form a key pair")]
    InconsistentKeyTriple,

    #[error("Invalid base64 data: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T, E = RsaError> = std::result::Result<T, E>;
