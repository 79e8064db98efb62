use thiserror::Error;

/// Errors produced when a value cannot be canonicalized deterministically.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CanonicalizationError {
    #[error("mapping keys must be strings, found {0}")]
    NonStringKey(String),

    #[error("bytes-like values are not allowed; encode explicitly as a string")]
    BytesNotAllowed,

    #[error("unsupported type for canonicalization: {0}; provide an explicit map or sequence")]
    UnsupportedType(String),

    #[error("non-finite float {0} has no canonical form")]
    NonFiniteFloat(String),

    #[error("cannot canonicalize: {0}")]
    Custom(String),
}

impl serde::ser::Error for CanonicalizationError {
    fn custom<T: std::fmt::Display>(msg: T) -> Self {
        Self::Custom(msg.to_string())
    }
}
