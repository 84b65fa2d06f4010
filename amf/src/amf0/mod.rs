use bytes::{Bytes, BytesMut};

use crate::{AmfReader, AmfValue, ClassMapper, DecodingError, EncodingError};

mod decoding;
mod encoding;


use decoding::Amf0DecoderState;
use encoding::Amf0EncoderState;

const NUMBER: u8 = 0x00;
const BOOLEAN: u8 = 0x01;
const STRING: u8 = 0x02;
const OBJECT: u8 = 0x03;
const MOVIECLIP: u8 = 0x04;
const NULL: u8 = 0x05;
const UNDEFINED: u8 = 0x06;
const REFERENCE: u8 = 0x07;
const ECMA_ARRAY: u8 = 0x08;
const OBJECT_END: u8 = 0x09;
const STRICT_ARRAY: u8 = 0x0A;
const DATE: u8 = 0x0B;
const LONG_STRING: u8 = 0x0C;
const UNSUPPORTED: u8 = 0x0D;
const RECORDSET: u8 = 0x0E;
const XML_DOC: u8 = 0x0F;
const TYPED_OBJECT: u8 = 0x10;
const AVMPLUS_OBJECT: u8 = 0x11;

/// Decodes one top-level AMF0 value with a fresh reference cache.
pub fn decode_amf0(
    reader: &mut AmfReader,
    mapper: &dyn ClassMapper,
) -> Result<AmfValue, DecodingError> {
    Amf0DecoderState::new(reader, mapper).decode_value()
}

/// Decode AMF0 encoded values.
///
/// `amf_bytes` must include whole AMF0 values, every one of them is decoded
/// with its own reference cache.
pub fn decode_amf0_values(
    amf_bytes: Bytes,
    mapper: &dyn ClassMapper,
) -> Result<Vec<AmfValue>, DecodingError> {
    let mut reader = AmfReader::new(amf_bytes);
    let mut amf_values = vec![];
    while reader.has_remaining() {
        amf_values.push(decode_amf0(&mut reader, mapper)?);
    }
    Ok(amf_values)
}

/// Appends one top-level AMF0 value to `buf` with a fresh reference cache.
pub fn encode_amf0(
    buf: &mut BytesMut,
    value: &AmfValue,
    mapper: &dyn ClassMapper,
) -> Result<(), EncodingError> {
    Amf0EncoderState::new(buf, mapper).put_value(value)
}

pub fn encode_amf0_values(
    amf_values: &[AmfValue],
    mapper: &dyn ClassMapper,
) -> Result<Bytes, EncodingError> {
    let mut buf = BytesMut::new();
    for value in amf_values {
        encode_amf0(&mut buf, value, mapper)?;
    }
    Ok(buf.freeze())
}
