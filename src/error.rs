use std::fmt;

use amf::{DecodingError, EncodingError};
use thiserror::Error;

/// Envelope field that was being read when decoding failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvelopeField {
    Version,
    HeaderCount,
    MessageCount,
    HeaderName,
    MustUnderstand,
    TargetUri,
    ResponseUri,
    Length,
    Data,
}

impl fmt::Display for EnvelopeField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EnvelopeField::Version => "version",
            EnvelopeField::HeaderCount => "header count",
            EnvelopeField::MessageCount => "message count",
            EnvelopeField::HeaderName => "name",
            EnvelopeField::MustUnderstand => "must-understand flag",
            EnvelopeField::TargetUri => "target URI",
            EnvelopeField::ResponseUri => "response URI",
            EnvelopeField::Length => "length",
            EnvelopeField::Data => "data",
        };
        f.write_str(name)
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EnvelopeDecodingError {
    #[error("Failed to decode envelope {field}.")]
    Preamble {
        field: EnvelopeField,
        #[source]
        source: DecodingError,
    },

    #[error("Failed to decode {field} of header {index}.")]
    Header {
        index: usize,
        field: EnvelopeField,
        #[source]
        source: DecodingError,
    },

    #[error("Failed to decode {field} of message {index}.")]
    Message {
        index: usize,
        field: EnvelopeField,
        #[source]
        source: DecodingError,
    },
}

impl EnvelopeDecodingError {
    /// Codec error behind this failure.
    pub fn decoding_error(&self) -> &DecodingError {
        match self {
            EnvelopeDecodingError::Preamble { source, .. }
            | EnvelopeDecodingError::Header { source, .. }
            | EnvelopeDecodingError::Message { source, .. } => source,
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EnvelopeEncodingError {
    #[error("Too many headers: {0}")]
    TooManyHeaders(usize),

    #[error("Too many messages: {0}")]
    TooManyMessages(usize),

    #[error("Header name or URI too long: {0} bytes")]
    StringTooLong(usize),

    #[error("Failed to encode data of header {index}.")]
    Header {
        index: usize,
        #[source]
        source: EncodingError,
    },

    #[error("Failed to encode data of message {index}.")]
    Message {
        index: usize,
        #[source]
        source: EncodingError,
    },
}
