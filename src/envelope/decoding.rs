use amf::{AmfReader, AmfValue, ClassMapper, DecodingError, decode_amf0};
use bytes::Bytes;
use tracing::debug;

use crate::{
    envelope::{Envelope, Header, Message},
    error::{EnvelopeDecodingError, EnvelopeField},
};

pub(super) fn decode_envelope(
    envelope_bytes: Bytes,
    mapper: &dyn ClassMapper,
) -> Result<Envelope, EnvelopeDecodingError> {
    let preamble_err = |field: EnvelopeField| {
        move |source: DecodingError| EnvelopeDecodingError::Preamble { field, source }
    };

    let mut reader = AmfReader::new(envelope_bytes);
    let amf_version = reader
        .read_u16()
        .map_err(preamble_err(EnvelopeField::Version))?;

    let header_count = reader
        .read_u16()
        .map_err(preamble_err(EnvelopeField::HeaderCount))?;
    let mut headers = Vec::with_capacity(header_count as usize);
    for index in 0..header_count as usize {
        let header = decode_header(&mut reader, mapper).map_err(|(field, source)| {
            EnvelopeDecodingError::Header {
                index,
                field,
                source,
            }
        })?;
        headers.push(header);
    }

    let message_count = reader
        .read_u16()
        .map_err(preamble_err(EnvelopeField::MessageCount))?;
    let mut messages = Vec::with_capacity(message_count as usize);
    for index in 0..message_count as usize {
        let message = decode_message(&mut reader, mapper).map_err(|(field, source)| {
            EnvelopeDecodingError::Message {
                index,
                field,
                source,
            }
        })?;
        messages.push(message);
    }

    debug!(
        amf_version,
        headers = headers.len(),
        messages = messages.len(),
        trailing_bytes = reader.remaining(),
        "Decoded envelope."
    );
    Ok(Envelope {
        amf_version,
        headers,
        messages,
    })
}

type FieldResult<T> = Result<T, (EnvelopeField, DecodingError)>;

fn field<T>(field: EnvelopeField, result: Result<T, DecodingError>) -> FieldResult<T> {
    result.map_err(|err| (field, err))
}

fn decode_header(reader: &mut AmfReader, mapper: &dyn ClassMapper) -> FieldResult<Header> {
    let name = field(EnvelopeField::HeaderName, reader.read_short_string())?;
    let must_understand = field(EnvelopeField::MustUnderstand, reader.read_u8())? != 0;
    let _length = field(EnvelopeField::Length, reader.read_u32())?;
    let data = field(EnvelopeField::Data, decode_amf0(reader, mapper))?;

    Ok(Header {
        name,
        must_understand,
        data,
    })
}

fn decode_message(reader: &mut AmfReader, mapper: &dyn ClassMapper) -> FieldResult<Message> {
    let target_uri = field(EnvelopeField::TargetUri, reader.read_short_string())?;
    let response_uri = field(EnvelopeField::ResponseUri, reader.read_short_string())?;
    let _length = field(EnvelopeField::Length, reader.read_u32())?;
    // Version 3 data starts with the AMF3 switch marker, decoded like any other AMF0 value.
    let data = field(EnvelopeField::Data, decode_amf0(reader, mapper))?;

    Ok(Message {
        target_uri,
        response_uri,
        data: unwrap_flex_message(data),
    })
}

/// Flex clients send `[RemotingMessage]`, the message data is the inner object.
fn unwrap_flex_message(data: AmfValue) -> AmfValue {
    let inner = match data.as_array() {
        Some(array) => match array.borrow().as_slice() {
            [inner @ AmfValue::TypedObject(object)] if object.borrow().is_abstract_message() => {
                Some(inner.clone())
            }
            _ => None,
        },
        None => None,
    };
    inner.unwrap_or(data)
}
