use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InvoiceError {
    #[error("Malformed amount: {0}")]
    MalformedAmount(String),
    #[error("Parsing failed with malformed HRP: {0}")]
    MalformedHrp(String),
    #[error("Unknown currency: {0}")]
    UnknownCurrency(String),
    #[error("Too short data part: {0} groups")]
    TooShortDataPart(usize),
    /// A tagged field declares more payload groups than remain in the data part.
    #[error("Truncated tagged field at offset {offset}: need {needed} groups, {available} left")]
    TruncatedTag {
        offset: usize,
        needed: usize,
        available: usize,
    },
    #[error("Malformed routing hint: {0} bytes is not a multiple of the 51-byte hop size")]
    MalformedRouteHint(usize),
    #[error("Malformed tagged field: {0}")]
    MalformedTag(String),
    #[error("Unknown address type: {0}")]
    UnknownAddressType(String),
    #[error("Network mismatch: expected `{expected}`, found `{found}`")]
    NetworkMismatch { expected: String, found: String },
    #[error("Unsupported witness version: {0}")]
    UnsupportedWitnessVersion(u8),
    #[error("Invalid witness program length {length} for version {version}")]
    InvalidWitnessProgram { version: u8, length: usize },
    #[error("Non-zero or oversized padding in 5-bit group data")]
    PaddingError,
    #[error("Bad checksum")]
    BadChecksum,
    #[error("Bad charset: {0}")]
    BadCharset(String),
    #[error("Bech32 error: {0}")]
    Bech32Error(bech32::Error),
    #[error("Invalid signature: {0}")]
    SignatureInvalid(String),
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),
    /// Wraps a failure raised while decoding the payload of a single tagged field.
    #[error("Invalid `{tag}` field at offset {offset}: {cause}")]
    InvalidTaggedField {
        tag: char,
        offset: usize,
        cause: Box<InvoiceError>,
    },
}

impl InvoiceError {
    /// Strips any tagged field context and returns the underlying error.
    pub fn root_cause(&self) -> &InvoiceError {
        match self {
            InvoiceError::InvalidTaggedField { cause, .. } => cause.root_cause(),
            other => other,
        }
    }

    pub(crate) fn in_field(self, tag: char, offset: usize) -> InvoiceError {
        InvoiceError::InvalidTaggedField {
            tag,
            offset,
            cause: Box::new(self),
        }
    }
}

impl From<bech32::Error> for InvoiceError {
    fn from(err: bech32::Error) -> Self {
        match err {
            bech32::Error::InvalidChecksum => InvoiceError::BadChecksum,
            bech32::Error::InvalidChar(c) => {
                InvoiceError::BadCharset(format!("invalid character `{}`", c))
            }
            bech32::Error::MixedCase => InvoiceError::BadCharset("mixed case".to_string()),
            bech32::Error::InvalidPadding => InvoiceError::PaddingError,
            other => InvoiceError::Bech32Error(other),
        }
    }
}
