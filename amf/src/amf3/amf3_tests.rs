use bytes::{Bytes, BytesMut};

use super::*;
use crate::{
    AmfDate, AmfFormat, AmfObject, AmfReader, AmfValue, CacheKind, ClassMapper, DecodingError,
    EncodingError, GenericClassMapper, MAX_NESTING_DEPTH, UnresolvedClass,
};

struct KnownClassesOnly;

impl ClassMapper for KnownClassesOnly {
    fn resolve(&self, class_name: &str) -> Result<AmfObject, UnresolvedClass> {
        match class_name {
            "com.example.Known" => Ok(AmfObject::new(class_name)),
            _ => Err(UnresolvedClass {
                class_name: class_name.to_string(),
            }),
        }
    }
}

fn encode(value: &AmfValue) -> Bytes {
    let mut encoder = Amf3EncoderState::new(BytesMut::new(), &GenericClassMapper);
    encoder.put_value(value).unwrap();
    encoder.buf.freeze()
}

fn decode(amf3_bytes: &[u8]) -> Result<AmfValue, DecodingError> {
    let mut reader = AmfReader::new(Bytes::copy_from_slice(amf3_bytes));
    let mut decoder = Amf3DecoderState::new(&mut reader, &GenericClassMapper);
    decoder.decode_value()
}

fn round_trip(value: &AmfValue) -> AmfValue {
    decode(&encode(value)).unwrap()
}

#[test]
fn test_string() {
    let sample_string = AmfValue::string("kremówki");
    assert_eq!(round_trip(&sample_string), sample_string);

    let empty = AmfValue::string("");
    assert_eq!(encode(&empty), Bytes::from_static(&[STRING, 0x01]));
    assert_eq!(round_trip(&empty), empty);
}

#[test]
fn test_integer() {
    let mut encoder = Amf3EncoderState::new(BytesMut::new(), &GenericClassMapper);
    let sample_pos = AmfValue::Integer(2137);
    let sample_neg = AmfValue::Integer(-2137);

    encoder.put_value(&sample_pos).unwrap();
    encoder.put_value(&sample_neg).unwrap();
    let mut reader = AmfReader::new(encoder.buf.freeze());

    let mut decoder = Amf3DecoderState::new(&mut reader, &GenericClassMapper);
    let decoded_pos = decoder.decode_value().unwrap();
    let decoded_neg = decoder.decode_value().unwrap();

    assert_eq!(decoded_pos, sample_pos);
    assert_eq!(decoded_neg, sample_neg);
}

#[test]
fn test_integer_boundaries() {
    let samples = [
        0,
        0x7F,
        0x80,
        0x3FFF,
        0x4000,
        0x1F_FFFF,
        0x20_0000,
        0x0FFF_FFFF,
        -0x1000_0000,
        -1,
    ];

    for sample in samples {
        let value = AmfValue::Integer(sample);
        assert_eq!(round_trip(&value), value, "integer {sample}");
    }
}

#[test]
fn test_nan_decodes_as_null() {
    assert_eq!(round_trip(&AmfValue::Number(f64::NAN)), AmfValue::Null);
    assert_eq!(round_trip(&AmfValue::Number(-0.5)), AmfValue::Number(-0.5));
}

#[test]
fn test_xml_and_xml_doc() {
    let xml = AmfValue::xml("<a>Sample XML</a>");
    assert_eq!(round_trip(&xml), xml);

    let legacy_xml_doc = [XML_DOC, 0x07, b'<', b'a', b'>'];
    assert_eq!(decode(&legacy_xml_doc).unwrap(), AmfValue::xml("<a>"));
}

#[test]
fn test_date() {
    let date = AmfValue::date(AmfDate::from_millis(1_700_000_000_000.0));
    let decoded = round_trip(&AmfValue::array(vec![date.clone(), date.clone()]));

    let decoded = decoded.as_array().unwrap().borrow();
    assert_eq!(decoded[0], date);
    assert!(decoded[0].ptr_eq(&decoded[1]));
}

#[test]
fn test_array() {
    let dense = AmfValue::array(vec![
        AmfValue::Integer(2137),
        AmfValue::string("kremówki"),
        AmfValue::Null,
        AmfValue::Boolean(true),
    ]);
    assert_eq!(round_trip(&dense), dense);
}

#[test]
fn test_repeated_string_is_written_as_reference() {
    let array = AmfValue::array(vec![AmfValue::string("abc"), AmfValue::string("abc")]);

    let expected = Bytes::from_static(&[
        ARRAY, 0x05, 0x01, STRING, 0x07, b'a', b'b', b'c', STRING, 0x00,
    ]);
    assert_eq!(encode(&array), expected);

    let decoded = decode(&expected).unwrap();
    assert_eq!(decoded, array);
    let decoded = decoded.as_array().unwrap().borrow();
    assert!(decoded[0].ptr_eq(&decoded[1]));
}

#[test]
fn test_mixed_array() {
    let amf3_bytes = [
        ARRAY, 0x03, 0x03, b'k', INTEGER, 0x05, 0x01, STRING, 0x03, b'v',
    ];

    let expected = AmfValue::object([
        ("k", AmfValue::Integer(5)),
        ("0", AmfValue::string("v")),
    ]);
    assert_eq!(decode(&amf3_bytes).unwrap(), expected);
}

#[test]
fn test_object() {
    let anonymous = AmfValue::object([
        ("Integer", AmfValue::Integer(2137)),
        ("String", AmfValue::string("kremówki")),
    ]);
    assert_eq!(round_trip(&anonymous), anonymous);

    let person = AmfValue::typed_object(
        AmfObject::new("com.example.Person")
            .with_property("name", "Ann")
            .with_property("tags", AmfValue::array(vec![]))
            .with_dynamic_property("age", 41),
    );
    assert_eq!(round_trip(&person), person);

    let sealed = AmfValue::typed_object(AmfObject::new("com.example.Point").with_property("x", 1.5));
    let decoded = round_trip(&sealed);
    assert_eq!(decoded, sealed);
    assert!(!decoded.as_typed_object().unwrap().borrow().is_dynamic());
}

#[test]
fn test_object_keeps_member_order() {
    let amf3_bytes = [
        OBJECT, 0x0B, 0x01, 0x09, b'z', b'e', b't', b'a', INTEGER, 0x01, 0x0B, b'a', b'l', b'p',
        b'h', b'a', INTEGER, 0x02, 0x01,
    ];

    let decoded = decode(&amf3_bytes).unwrap();
    let keys: Vec<String> = decoded.as_object().unwrap().borrow().keys().cloned().collect();
    assert_eq!(keys, ["zeta", "alpha"]);
    assert_eq!(encode(&decoded), Bytes::copy_from_slice(&amf3_bytes));
}

#[test]
fn test_empty_dynamic_member_name() {
    let object = AmfValue::object([("", AmfValue::Null)]);
    let mut encoder = Amf3EncoderState::new(BytesMut::new(), &GenericClassMapper);

    assert_eq!(
        encoder.put_value(&object),
        Err(EncodingError::EmptyDynamicMemberName)
    );
}

#[test]
fn test_shared_object_keeps_identity() {
    let shared = AmfValue::object([("a", AmfValue::Integer(1))]);
    let decoded = round_trip(&AmfValue::array(vec![shared.clone(), shared]));

    let decoded = decoded.as_array().unwrap().borrow();
    assert!(decoded[0].ptr_eq(&decoded[1]));
}

#[test]
fn test_equal_but_distinct_objects_are_not_merged() {
    let first = AmfValue::object([("a", AmfValue::Integer(1))]);
    let second = AmfValue::object([("a", AmfValue::Integer(1))]);
    let decoded = round_trip(&AmfValue::array(vec![first, second]));

    let decoded = decoded.as_array().unwrap().borrow();
    assert_eq!(decoded[0], decoded[1]);
    assert!(!decoded[0].ptr_eq(&decoded[1]));
}

#[test]
fn test_self_reference() {
    let array = AmfValue::array(vec![]);
    array.as_array().unwrap().borrow_mut().push(array.clone());

    let amf3_bytes = encode(&array);
    assert_eq!(amf3_bytes, Bytes::from_static(&[ARRAY, 0x03, 0x01, ARRAY, 0x00]));
    array.as_array().unwrap().borrow_mut().clear();

    let decoded = decode(&amf3_bytes).unwrap();
    let inner = decoded.as_array().unwrap().borrow()[0].clone();
    assert!(inner.ptr_eq(&decoded));
    decoded.as_array().unwrap().borrow_mut().clear();
}

#[test]
fn test_trait_is_sent_once() {
    let point = |x: f64| AmfValue::typed_object(AmfObject::new("com.example.Point").with_property("x", x));
    let points = AmfValue::array(vec![point(1.0), point(2.0)]);

    let mut reader = AmfReader::new(encode(&points));
    let mut decoder = Amf3DecoderState::new(&mut reader, &GenericClassMapper);
    let decoded = decoder.decode_value().unwrap();

    assert_eq!(decoded, points);
    assert_eq!(decoder.traits.len(), 1);
}

#[test]
fn test_externalizable_object() {
    let collection = AmfValue::typed_object(
        AmfObject::new("flex.messaging.io.ArrayCollection")
            .with_external(AmfValue::array(vec![AmfValue::Integer(1)])),
    );

    let decoded = round_trip(&collection);
    assert_eq!(decoded, collection);
    assert!(decoded.as_typed_object().unwrap().borrow().is_externalizable());
}

#[test]
fn test_unresolved_class_falls_back_to_generic_instance() {
    let unknown = AmfValue::typed_object(AmfObject::new("com.example.Unknown").with_property("id", 7));
    let known = AmfValue::typed_object(AmfObject::new("com.example.Known").with_property("id", 8));
    let amf3_bytes = encode(&AmfValue::array(vec![unknown.clone(), known.clone()]));

    let mut reader = AmfReader::new(amf3_bytes);
    let decoded = decode_amf3(&mut reader, &KnownClassesOnly).unwrap();

    assert_eq!(decoded, AmfValue::array(vec![unknown, known]));
}

#[test]
fn test_byte_array() {
    let byte_array = AmfValue::byte_array(Bytes::from_static(&[0xDE, 0xAD, 0xBE, 0xEF]));
    assert_eq!(round_trip(&byte_array), byte_array);
}

#[test]
fn test_dictionary() {
    let dictionary = AmfValue::dictionary(vec![
        (AmfValue::string("key"), AmfValue::Integer(1)),
        (
            AmfValue::object([("nested", AmfValue::Boolean(true))]),
            AmfValue::string("value"),
        ),
    ]);
    assert_eq!(round_trip(&dictionary), dictionary);
}

#[test]
fn test_dictionary_duplicate_key_overwrites() {
    let amf3_bytes = [
        DICTIONARY, 0x05, 0x00, STRING, 0x03, b'a', INTEGER, 0x01, STRING, 0x00, INTEGER, 0x02,
    ];

    let expected = AmfValue::dictionary(vec![(AmfValue::string("a"), AmfValue::Integer(2))]);
    assert_eq!(decode(&amf3_bytes).unwrap(), expected);
}

#[test]
fn test_large_dictionary_with_repeated_keys() {
    let entries = (0..5000)
        .map(|i| (AmfValue::Integer(i % 1000), AmfValue::Integer(i)))
        .collect();
    let decoded = round_trip(&AmfValue::dictionary(entries));

    let expected = (0..1000)
        .map(|i| (AmfValue::Integer(i), AmfValue::Integer(4000 + i)))
        .collect();
    assert_eq!(decoded, AmfValue::dictionary(expected));
}

#[test]
fn test_vectors_decode_as_arrays() {
    let int_vector = [
        VECTOR_INT, 0x05, 0x00, 0x00, 0x00, 0x00, 0x01, 0xFF, 0xFF, 0xFF, 0xFF,
    ];
    assert_eq!(
        decode(&int_vector).unwrap(),
        AmfValue::array(vec![AmfValue::Integer(1), AmfValue::Integer(-1)])
    );

    let uint_vector = [VECTOR_UINT, 0x03, 0x01, 0xFF, 0xFF, 0xFF, 0xFF];
    assert_eq!(
        decode(&uint_vector).unwrap(),
        AmfValue::array(vec![AmfValue::Number(u32::MAX as f64)])
    );

    let object_vector = [VECTOR_OBJECT, 0x05, 0x00, 0x01, STRING, 0x03, b'x', NULL];
    assert_eq!(
        decode(&object_vector).unwrap(),
        AmfValue::array(vec![AmfValue::string("x"), AmfValue::Null])
    );
}

#[test]
fn test_dangling_reference() {
    assert_eq!(
        decode(&[OBJECT, 0x02]),
        Err(DecodingError::DanglingReference {
            cache: CacheKind::Object,
            index: 1,
            len: 0,
        })
    );
    assert_eq!(
        decode(&[STRING, 0x00]),
        Err(DecodingError::DanglingReference {
            cache: CacheKind::String,
            index: 0,
            len: 0,
        })
    );
}

#[test]
fn test_invalid_marker() {
    assert_eq!(
        decode(&[0x12]),
        Err(DecodingError::InvalidMarker {
            format: AmfFormat::Amf3,
            marker: 0x12,
            offset: 0,
        })
    );
}

#[test]
fn test_nesting_limit() {
    let nested = |depth: usize| {
        let mut amf3_bytes = [ARRAY, 0x03, 0x01].repeat(depth);
        amf3_bytes.push(NULL);
        amf3_bytes
    };

    assert!(decode(&nested(MAX_NESTING_DEPTH - 1)).is_ok());
    assert_eq!(
        decode(&nested(200_000)),
        Err(DecodingError::NestingTooDeep {
            offset: MAX_NESTING_DEPTH * 3,
        })
    );
}

#[test]
fn test_truncated_double() {
    assert_eq!(
        decode(&[DOUBLE, 0x00, 0x00]),
        Err(DecodingError::IncompleteData {
            offset: 1,
            needed: 8,
            remaining: 2,
        })
    );
}

#[test]
fn test_each_top_level_value_has_fresh_caches() {
    let values = [AmfValue::string("abc"), AmfValue::string("abc")];
    let amf3_bytes = encode_amf3_values(&values, &GenericClassMapper).unwrap();

    assert_eq!(
        amf3_bytes,
        Bytes::from_static(&[STRING, 0x07, b'a', b'b', b'c', STRING, 0x07, b'a', b'b', b'c'])
    );
    assert_eq!(
        decode_amf3_values(amf3_bytes, &GenericClassMapper).unwrap(),
        values.to_vec()
    );
}
