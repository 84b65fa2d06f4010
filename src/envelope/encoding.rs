use amf::{ClassMapper, encode_amf0, encode_amf3};
use bytes::{BufMut, Bytes, BytesMut};
use tracing::debug;

use crate::{
    envelope::{AMF3_SWITCH, Envelope, UNKNOWN_LENGTH},
    error::EnvelopeEncodingError,
};

pub(super) fn encode_envelope(
    envelope: &Envelope,
    mapper: &dyn ClassMapper,
) -> Result<Bytes, EnvelopeEncodingError> {
    let mut buf = BytesMut::new();
    buf.put_u16(envelope.amf_version);

    let header_count = u16::try_from(envelope.headers.len())
        .map_err(|_| EnvelopeEncodingError::TooManyHeaders(envelope.headers.len()))?;
    buf.put_u16(header_count);
    for (index, header) in envelope.headers.iter().enumerate() {
        put_short_string(&mut buf, &header.name)?;
        buf.put_u8(header.must_understand.into());
        buf.put_u32(UNKNOWN_LENGTH);
        // Headers are AMF0 regardless of the envelope version.
        encode_amf0(&mut buf, &header.data, mapper)
            .map_err(|source| EnvelopeEncodingError::Header { index, source })?;
    }

    let message_count = u16::try_from(envelope.messages.len())
        .map_err(|_| EnvelopeEncodingError::TooManyMessages(envelope.messages.len()))?;
    buf.put_u16(message_count);
    for (index, message) in envelope.messages.iter().enumerate() {
        put_short_string(&mut buf, &message.target_uri)?;
        put_short_string(&mut buf, &message.response_uri)?;
        buf.put_u32(UNKNOWN_LENGTH);

        let result = match envelope.amf_version {
            3 => {
                buf.put_u8(AMF3_SWITCH);
                encode_amf3(&mut buf, &message.data, mapper)
            }
            _ => encode_amf0(&mut buf, &message.data, mapper),
        };
        result.map_err(|source| EnvelopeEncodingError::Message { index, source })?;
    }

    debug!(
        amf_version = envelope.amf_version,
        headers = envelope.headers.len(),
        messages = envelope.messages.len(),
        size = buf.len(),
        "Encoded envelope."
    );
    Ok(buf.freeze())
}

fn put_short_string(buf: &mut BytesMut, s: &str) -> Result<(), EnvelopeEncodingError> {
    let len = u16::try_from(s.len()).map_err(|_| EnvelopeEncodingError::StringTooLong(s.len()))?;
    buf.put_u16(len);
    buf.put_slice(s.as_bytes());
    Ok(())
}
