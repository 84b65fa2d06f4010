use bytes::{Bytes, BytesMut};

use crate::{AmfReader, AmfValue, ClassMapper, DecodingError, EncodingError};

mod decoding;
mod encoding;

#[cfg(test)]
mod amf3_tests;

pub(crate) use decoding::Amf3DecoderState;
pub(crate) use encoding::Amf3EncoderState;

const UNDEFINED: u8 = 0x00;
const NULL: u8 = 0x01;
const FALSE: u8 = 0x02;
const TRUE: u8 = 0x03;
const INTEGER: u8 = 0x04;
const DOUBLE: u8 = 0x05;
const STRING: u8 = 0x06;
const XML_DOC: u8 = 0x07;
const DATE: u8 = 0x08;
const ARRAY: u8 = 0x09;
const OBJECT: u8 = 0x0A;
const XML: u8 = 0x0B;
const BYTE_ARRAY: u8 = 0x0C;
const VECTOR_INT: u8 = 0x0D;
const VECTOR_UINT: u8 = 0x0E;
const VECTOR_DOUBLE: u8 = 0x0F;
const VECTOR_OBJECT: u8 = 0x10;
const DICTIONARY: u8 = 0x11;

const U28_MAX: u32 = (1 << 28) - 1;
const U29_MASK: u32 = (1 << 29) - 1;

const I29_MAX: i32 = (1 << 28) - 1;
const I29_MIN: i32 = -(1 << 28);

/// Shape shared by all instances of one AMF3 class.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Trait {
    /// Empty for anonymous objects.
    pub class_name: String,
    pub members: Vec<String>,
    pub externalizable: bool,
    pub dynamic: bool,
}

impl Trait {
    /// Anonymous shape without sealed members, decoded as a plain key-value object.
    fn is_plain_object(&self) -> bool {
        self.class_name.is_empty() && !self.externalizable && self.members.is_empty()
    }
}

/// Decodes one top-level AMF3 value with fresh string, object and trait caches.
pub fn decode_amf3(
    reader: &mut AmfReader,
    mapper: &dyn ClassMapper,
) -> Result<AmfValue, DecodingError> {
    Amf3DecoderState::new(reader, mapper).decode_value()
}

/// Decodes a buffer holding a sequence of independent top-level AMF3 values.
pub fn decode_amf3_values(
    amf_bytes: Bytes,
    mapper: &dyn ClassMapper,
) -> Result<Vec<AmfValue>, DecodingError> {
    let mut reader = AmfReader::new(amf_bytes);
    let mut amf_values = vec![];
    while reader.has_remaining() {
        amf_values.push(decode_amf3(&mut reader, mapper)?);
    }
    Ok(amf_values)
}

/// Appends one top-level AMF3 value to `buf` with fresh caches.
pub fn encode_amf3(
    buf: &mut BytesMut,
    value: &AmfValue,
    mapper: &dyn ClassMapper,
) -> Result<(), EncodingError> {
    Amf3EncoderState::new(buf, mapper).put_value(value)
}

pub fn encode_amf3_values(
    amf_values: &[AmfValue],
    mapper: &dyn ClassMapper,
) -> Result<Bytes, EncodingError> {
    let mut buf = BytesMut::new();
    for value in amf_values {
        encode_amf3(&mut buf, value, mapper)?;
    }
    Ok(buf.freeze())
}
