//! Remoting envelope: a version word, a list of headers and a list of
//! messages, each carrying one AMF encoded value.

use amf::{AmfValue, ClassMapper};
use bytes::Bytes;

use crate::error::{EnvelopeDecodingError, EnvelopeEncodingError};

mod decoding;
mod encoding;

#[cfg(test)]
mod envelope_tests;

/// Written in place of the header and message length, readers do not rely on it.
const UNKNOWN_LENGTH: u32 = u32::MAX;

/// Marker preceding AMF3 message data in version 3 envelopes.
const AMF3_SWITCH: u8 = 0x11;

#[derive(Debug, Clone, PartialEq)]
pub struct Header {
    pub name: String,
    pub must_understand: bool,
    pub data: AmfValue,
}

impl Header {
    pub fn new(name: impl Into<String>, must_understand: bool, data: AmfValue) -> Self {
        Self {
            name: name.into(),
            must_understand,
            data,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub target_uri: String,
    pub response_uri: String,
    pub data: AmfValue,
}

impl Message {
    pub fn new(
        target_uri: impl Into<String>,
        response_uri: impl Into<String>,
        data: AmfValue,
    ) -> Self {
        Self {
            target_uri: target_uri.into(),
            response_uri: response_uri.into(),
            data,
        }
    }

    /// Successful reply to `request`, targets `<response URI>/onResult`.
    pub fn result(request: &Message, data: AmfValue) -> Self {
        Self::new(format!("{}/onResult", request.response_uri), "", data)
    }

    /// Failure reply to `request`, targets `<response URI>/onStatus`.
    pub fn status(request: &Message, data: AmfValue) -> Self {
        Self::new(format!("{}/onStatus", request.response_uri), "", data)
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Envelope {
    /// 0 for AMF0 message data, 3 for AMF3.
    pub amf_version: u16,
    pub headers: Vec<Header>,
    pub messages: Vec<Message>,
}

impl Envelope {
    pub fn new(amf_version: u16) -> Self {
        Self {
            amf_version,
            ..Default::default()
        }
    }

    /// Empty reply with the version of `request`.
    pub fn response_to(request: &Envelope) -> Self {
        Self::new(request.amf_version)
    }

    pub fn header(&self, name: &str) -> Option<&Header> {
        self.headers.iter().find(|header| header.name == name)
    }

    /// Decodes a whole envelope, every header and message value with fresh caches.
    ///
    /// Message data that is a one-element array around a Flex messaging
    /// object is replaced with that object.
    pub fn decode(
        envelope_bytes: Bytes,
        mapper: &dyn ClassMapper,
    ) -> Result<Self, EnvelopeDecodingError> {
        decoding::decode_envelope(envelope_bytes, mapper)
    }

    pub fn encode(&self, mapper: &dyn ClassMapper) -> Result<Bytes, EnvelopeEncodingError> {
        encoding::encode_envelope(self, mapper)
    }
}
