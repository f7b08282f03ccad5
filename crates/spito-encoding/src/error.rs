use thiserror::Error;

/// Errors returned by alphabet construction, encoding and decoding.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EncodingError {
    #[error("cannot decode an empty string")]
    EmptyInput,
    #[error("invalid character {character:?} at position {position}")]
    InvalidCharacter { character: char, position: usize },
    #[error("decoded value does not fit in 64 bits")]
    Overflow,
    #[error("value {value} does not fit in {width} characters")]
    SegmentOverflow { value: u64, width: usize },
    #[error("expected {expected} characters, got {actual}")]
    InvalidLength { expected: usize, actual: usize },
    #[error("invalid alphabet: {0}")]
    InvalidAlphabet(String),
}
