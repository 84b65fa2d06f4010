use amf::{AmfObject, AmfValue, DecodingError, GenericClassMapper};
use bytes::{BufMut, Bytes, BytesMut};

use super::{AMF3_SWITCH, Envelope, Header, Message};
use crate::error::{EnvelopeDecodingError, EnvelopeEncodingError, EnvelopeField};

fn round_trip(envelope: &Envelope) -> Envelope {
    let encoded = envelope.encode(&GenericClassMapper).unwrap();
    Envelope::decode(encoded, &GenericClassMapper).unwrap()
}

fn remoting_message(operation: &str) -> AmfValue {
    AmfValue::typed_object(
        AmfObject::new("flex.messaging.messages.RemotingMessage")
            .with_property("operation", operation)
            .with_property("body", AmfValue::array(vec![])),
    )
}

#[test]
fn test_single_message() {
    let mut request = BytesMut::new();
    request.put_slice(&[0x00, 0x00, 0x00, 0x00, 0x00, 0x01]);
    request.put_slice(&[0x00, 0x01, b'x']);
    request.put_u16(11);
    request.put_slice(b"/1/onResult");
    request.put_slice(&[0xFF, 0xFF, 0xFF, 0xFF, 0x01, 0x01]);
    let request = request.freeze();

    let envelope = Envelope::decode(request.clone(), &GenericClassMapper).unwrap();
    assert_eq!(envelope.amf_version, 0);
    assert!(envelope.headers.is_empty());
    assert_eq!(
        envelope.messages,
        vec![Message::new("x", "/1/onResult", AmfValue::Boolean(true))]
    );

    let encoded = envelope.encode(&GenericClassMapper).unwrap();
    assert_eq!(encoded, request);
    assert_eq!(Envelope::decode(encoded, &GenericClassMapper).unwrap(), envelope);
}

#[test]
fn test_headers_and_messages() {
    let mut envelope = Envelope::new(0);
    envelope.headers.push(Header::new(
        "Credentials",
        true,
        AmfValue::object([
            ("userid", AmfValue::string("ann")),
            ("password", AmfValue::string("secret")),
        ]),
    ));
    envelope.headers.push(Header::new("DSId", false, AmfValue::string("nil")));
    envelope.messages.push(Message::new(
        "echoService.echo",
        "/1",
        AmfValue::array(vec![AmfValue::Number(1.0), AmfValue::string("a")]),
    ));
    envelope.messages.push(Message::new("null", "/2", AmfValue::Null));

    let decoded = round_trip(&envelope);
    assert_eq!(decoded, envelope);
    assert_eq!(
        decoded.header("DSId").map(|header| &header.data),
        Some(&AmfValue::string("nil"))
    );
    assert!(decoded.header("Missing").is_none());
}

#[test]
fn test_amf3_messages() {
    let mut envelope = Envelope::new(3);
    envelope.headers.push(Header::new("DSId", false, AmfValue::string("nil")));
    envelope
        .messages
        .push(Message::new("x", "/1", AmfValue::array(vec![AmfValue::Integer(5)])));

    let encoded = envelope.encode(&GenericClassMapper).unwrap();
    let data_offset = encoded.len() - 5;
    assert_eq!(encoded[data_offset - 1], AMF3_SWITCH);
    assert_eq!(&encoded[data_offset..], &[0x09, 0x03, 0x01, 0x04, 0x05]);

    assert_eq!(Envelope::decode(encoded, &GenericClassMapper).unwrap(), envelope);
}

#[test]
fn test_flex_message_is_unwrapped() {
    let mut envelope = Envelope::new(3);
    envelope.messages.push(Message::new(
        "null",
        "/1",
        AmfValue::array(vec![remoting_message("echo")]),
    ));

    let decoded = round_trip(&envelope);
    assert_eq!(decoded.messages[0].data, remoting_message("echo"));
}

#[test]
fn test_other_arrays_are_kept() {
    let two_messages = AmfValue::array(vec![remoting_message("a"), remoting_message("b")]);
    let plain_object = AmfValue::array(vec![AmfValue::typed_object(
        AmfObject::new("com.example.Person").with_property("name", "Ann"),
    )]);

    let mut envelope = Envelope::new(3);
    envelope
        .messages
        .push(Message::new("a", "/1", two_messages.clone()));
    envelope
        .messages
        .push(Message::new("b", "/2", plain_object.clone()));

    let decoded = round_trip(&envelope);
    assert_eq!(decoded.messages[0].data, two_messages);
    assert_eq!(decoded.messages[1].data, plain_object);
}

#[test]
fn test_responses() {
    let request = Message::new("echoService.echo", "/3", AmfValue::Null);

    let result = Message::result(&request, AmfValue::string("pong"));
    assert_eq!(result.target_uri, "/3/onResult");
    assert_eq!(result.response_uri, "");
    assert_eq!(result.data, AmfValue::string("pong"));

    let status = Message::status(&request, AmfValue::Null);
    assert_eq!(status.target_uri, "/3/onStatus");

    let mut request_envelope = Envelope::new(3);
    request_envelope.messages.push(request);
    let response = Envelope::response_to(&request_envelope);
    assert_eq!(response, Envelope::new(3));
}

#[test]
fn test_truncated_message_data() {
    let request = Bytes::from_static(&[
        0x00, 0x00, 0x00, 0x00, 0x00, 0x01, 0x00, 0x01, b'x', 0x00, 0x00, 0xFF, 0xFF, 0xFF,
        0xFF, 0x02, 0x00, 0x0A, b'a',
    ]);

    let err = Envelope::decode(request, &GenericClassMapper).unwrap_err();
    assert_eq!(
        err,
        EnvelopeDecodingError::Message {
            index: 0,
            field: EnvelopeField::Data,
            source: DecodingError::IncompleteData {
                offset: 18,
                needed: 10,
                remaining: 1,
            },
        }
    );
}

#[test]
fn test_missing_message_count() {
    let err = Envelope::decode(Bytes::from_static(&[0x00, 0x03, 0x00, 0x00]), &GenericClassMapper)
        .unwrap_err();

    assert_eq!(
        err,
        EnvelopeDecodingError::Preamble {
            field: EnvelopeField::MessageCount,
            source: DecodingError::IncompleteData {
                offset: 4,
                needed: 2,
                remaining: 0,
            },
        }
    );
    assert!(matches!(
        err.decoding_error(),
        DecodingError::IncompleteData { .. }
    ));
}

#[test]
fn test_header_name_too_long() {
    let mut envelope = Envelope::new(0);
    envelope
        .headers
        .push(Header::new("h".repeat(70_000), false, AmfValue::Null));

    assert_eq!(
        envelope.encode(&GenericClassMapper),
        Err(EnvelopeEncodingError::StringTooLong(70_000))
    );
}
