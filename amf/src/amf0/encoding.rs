use std::collections::HashMap;

use bytes::{BufMut, BytesMut};
use indexmap::IndexMap;
use tracing::trace;

use crate::{
    AmfDate, AmfObject, AmfValue, ClassMapper, EncodingError, amf0::*, amf3::Amf3EncoderState,
};

pub(super) struct Amf0EncoderState<'a> {
    buf: &'a mut BytesMut,
    mapper: &'a dyn ClassMapper,
    // Written complexes are kept alive so their addresses stay unique.
    complexes: Vec<AmfValue>,
    complex_indices: HashMap<*const (), usize>,
}

impl<'a> Amf0EncoderState<'a> {
    pub(super) fn new(buf: &'a mut BytesMut, mapper: &'a dyn ClassMapper) -> Self {
        Self {
            buf,
            mapper,
            complexes: vec![],
            complex_indices: HashMap::new(),
        }
    }

    pub(super) fn put_value(&mut self, value: &AmfValue) -> Result<(), EncodingError> {
        match value {
            AmfValue::Null => self.put_null(),
            AmfValue::Boolean(b) => self.put_bool(*b),
            AmfValue::Number(n) => self.put_number(*n),
            // No integer type in AMF0.
            AmfValue::Integer(i) => self.put_number(*i as f64),
            AmfValue::String(s) => self.put_string(s)?,
            AmfValue::Xml(xml) => self.put_xml_doc(xml)?,
            AmfValue::Date(date) => self.put_date(date),
            AmfValue::Array(array) => {
                if !self.put_reference(value) {
                    self.put_strict_array(&array.borrow())?;
                }
            }
            AmfValue::Object(map) => {
                if !self.put_reference(value) {
                    self.put_object(&map.borrow())?;
                }
            }
            AmfValue::TypedObject(object) => {
                let object = object.borrow();
                if object.is_externalizable() {
                    self.put_avmplus_object(value)?;
                } else if !self.put_reference(value) {
                    self.put_typed_object(&object)?;
                }
            }
            AmfValue::ByteArray(_) | AmfValue::Dictionary(_) => self.put_avmplus_object(value)?,
        };
        Ok(())
    }

    fn put_number(&mut self, n: f64) {
        self.buf.put_u8(NUMBER);
        self.buf.put_f64(n);
    }

    fn put_bool(&mut self, b: bool) {
        self.buf.put_u8(BOOLEAN);
        self.buf.put_u8(b.into());
    }

    fn put_null(&mut self) {
        self.buf.put_u8(NULL);
    }

    /// Short string marker up to `u16::MAX` bytes, long string marker above.
    fn put_string(&mut self, s: &str) -> Result<(), EncodingError> {
        if s.len() <= u16::MAX as usize {
            self.buf.put_u8(STRING);
            self.buf.put_u16(s.len() as u16);
            self.buf.put_slice(s.as_bytes());
            return Ok(());
        }

        self.buf.put_u8(LONG_STRING);
        self.put_long_string_raw(s)
    }

    fn put_xml_doc(&mut self, xml: &str) -> Result<(), EncodingError> {
        self.buf.put_u8(XML_DOC);
        self.put_long_string_raw(xml)
    }

    fn put_long_string_raw(&mut self, s: &str) -> Result<(), EncodingError> {
        if s.len() > u32::MAX as usize {
            return Err(EncodingError::StringTooLong(s.len()));
        }
        self.buf.put_u32(s.len() as u32);
        self.buf.put_slice(s.as_bytes());
        Ok(())
    }

    fn put_date(&mut self, date: &AmfDate) {
        self.buf.put_u8(DATE);
        self.buf.put_f64(date.millis());
        // timezone, ignored by readers
        self.buf.put_i16(0);
    }

    fn put_strict_array(&mut self, arr: &[AmfValue]) -> Result<(), EncodingError> {
        if arr.len() > u32::MAX as usize {
            return Err(EncodingError::ArrayTooLong(arr.len()));
        }
        self.buf.put_u8(STRICT_ARRAY);
        self.buf.put_u32(arr.len() as u32);
        for value in arr {
            self.put_value(value)?;
        }
        Ok(())
    }

    fn put_object(&mut self, map: &IndexMap<String, AmfValue>) -> Result<(), EncodingError> {
        self.buf.put_u8(OBJECT);
        self.put_keyval_pairs(map.iter())
    }

    fn put_typed_object(&mut self, object: &AmfObject) -> Result<(), EncodingError> {
        match self.mapper.class_name_for(object) {
            Some(class_name) => {
                self.buf.put_u8(TYPED_OBJECT);
                self.put_key(&class_name)?;
            }
            None => self.buf.put_u8(OBJECT),
        }

        let properties = self.mapper.properties_of(object);
        let dynamic_properties = object.dynamic_properties.iter().flatten();
        self.put_keyval_pairs(
            properties
                .iter()
                .chain(dynamic_properties)
                .map(|(key, value)| (key, value)),
        )
    }

    /// `value` has no AMF0 form, it is written as one AMF3 value.
    fn put_avmplus_object(&mut self, value: &AmfValue) -> Result<(), EncodingError> {
        trace!("Switching to AMF3.");
        self.buf.put_u8(AVMPLUS_OBJECT);
        let mut amf3_encoder = Amf3EncoderState::new(&mut *self.buf, self.mapper);
        amf3_encoder.put_value(value)
    }

    fn put_keyval_pairs<'v, I>(&mut self, pairs: I) -> Result<(), EncodingError>
    where
        I: Iterator<Item = (&'v String, &'v AmfValue)>,
    {
        for (key, value) in pairs {
            self.put_key(key)?;
            self.put_value(value)?;
        }
        self.put_object_end();
        Ok(())
    }

    fn put_key(&mut self, key: &str) -> Result<(), EncodingError> {
        if key.len() > u16::MAX as usize {
            return Err(EncodingError::StringTooLong(key.len()));
        }
        self.buf.put_u16(key.len() as u16);
        self.buf.put_slice(key.as_bytes());
        Ok(())
    }

    fn put_object_end(&mut self) {
        self.buf.put_u8(0x00);
        self.buf.put_u8(0x00);
        self.buf.put_u8(OBJECT_END);
    }

    /// Writes a reference marker for a complex value that was already written.
    ///
    /// Indices above `u16::MAX` cannot be referenced, such values are written
    /// inline again and take a new slot, the same way a reader counts them.
    fn put_reference(&mut self, value: &AmfValue) -> bool {
        let Some(identity) = value.identity() else {
            return false;
        };

        match self.complex_indices.get(&identity).copied() {
            Some(idx) => {
                if let Ok(idx) = u16::try_from(idx) {
                    self.buf.put_u8(REFERENCE);
                    self.buf.put_u16(idx);
                    return true;
                }
            }
            None => {
                self.complex_indices.insert(identity, self.complexes.len());
            }
        }
        self.complexes.push(value.clone());
        false
    }
}
