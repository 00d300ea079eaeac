use std::{io, str::Utf8Error};

use quick_xml::events::attributes::AttrError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// A value was rejected when constructing or mutating a map entity.
    #[error("validation failed: {0}")]
    Validation(String),

    /// A decode call failed. `position` is the byte offset of the reader when
    /// the failure was noticed.
    #[error("decoding failed at byte {position}: {cause}")]
    Decoding {
        position: usize,
        #[source]
        cause: DecodeCause,
    },

    #[error("io error: {0}")]
    Io(#[from] io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum DecodeCause {
    #[error("malformed xml: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("malformed attribute: {0}")]
    Attribute(#[from] AttrError),

    #[error("invalid utf-8: {0}")]
    Utf8(#[from] Utf8Error),

    #[error("attribute '{name}' has value {value:?}, expected {expected}")]
    InvalidAttribute {
        name: String,
        value: String,
        expected: &'static str,
    },

    #[error("missing required attribute '{0}'")]
    MissingAttribute(String),

    #[error("{0}")]
    Malformed(String),

    #[error("element rejected: {0}")]
    Rejected(#[source] Box<Error>),
}

impl Error {
    pub fn validation(message: impl Into<String>) -> Self {
        Error::Validation(message.into())
    }

    pub fn decoding(position: usize, cause: impl Into<DecodeCause>) -> Self {
        Error::Decoding {
            position,
            cause: cause.into(),
        }
    }

    /// Wraps an error raised while handling the element at `position`.
    /// Decoding errors already carry their own position and are kept as they are.
    pub fn at_position(self, position: usize) -> Self {
        match self {
            err @ Error::Decoding { .. } => err,
            other => Error::Decoding {
                position,
                cause: DecodeCause::Rejected(Box::new(other)),
            },
        }
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Error::Validation(_))
    }

    pub fn is_decoding(&self) -> bool {
        matches!(self, Error::Decoding { .. })
    }

    pub fn position(&self) -> Option<usize> {
        match self {
            Error::Decoding { position, .. } => Some(*position),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
