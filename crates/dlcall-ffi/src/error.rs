//! Error type shared by library loading, symbol lookup and signature checks.

use thiserror::Error;

use crate::parser::ParseError;

#[derive(Debug, Error)]
pub enum FfiError {
    #[error("failed to load library '{path}': {source}")]
    Load {
        path: String,
        #[source]
        source: libloading::Error,
    },

    #[error("invalid function name: {0:?}")]
    InvalidSymbolName(String),

    #[error("function '{name}' not found in '{path}': {source}")]
    SymbolNotFound {
        name: String,
        path: String,
        #[source]
        source: libloading::Error,
    },

    #[error("no signature declared for '{0}'")]
    MissingSignature(String),

    #[error("signature mismatch for '{name}': expected `{expected}`, declared `{declared}`")]
    SignatureMismatch {
        name: String,
        expected: String,
        declared: String,
    },

    #[error("invalid argument for '{function}': {message}")]
    InvalidArgument { function: String, message: String },

    #[error("signature file: {0}")]
    Signature(#[from] ParseError),
}

pub type Result<T> = std::result::Result<T, FfiError>;
