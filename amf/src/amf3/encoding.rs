use std::collections::HashMap;

use bytes::{BufMut, Bytes};
use indexmap::IndexMap;

use crate::{AmfDate, AmfObject, AmfValue, ClassMapper, EncodingError, amf3::*};

const MAX_SEALED_COUNT: usize = (1 << 25) - 1;
const MAX_TRAIT_REFERENCE: usize = (1 << 27) - 1;

pub(crate) struct Amf3EncoderState<'a, T> {
    pub(super) buf: T,
    mapper: &'a dyn ClassMapper,
    strings: HashMap<String, usize>,
    traits: HashMap<Trait, usize>,
    // Encoded complexes stay alive until the encoder is dropped, so their
    // addresses cannot be reused by a later value.
    complexes: Vec<AmfValue>,
    complex_indices: HashMap<*const (), usize>,
}

impl<'a, T> Amf3EncoderState<'a, T>
where
    T: BufMut,
{
    pub(crate) fn new(buf: T, mapper: &'a dyn ClassMapper) -> Self {
        Self {
            buf,
            mapper,
            strings: HashMap::new(),
            traits: HashMap::new(),
            complexes: vec![],
            complex_indices: HashMap::new(),
        }
    }

    pub(crate) fn put_value(&mut self, amf3_value: &AmfValue) -> Result<(), EncodingError> {
        match amf3_value {
            AmfValue::Null => self.put_null(),
            AmfValue::Boolean(b) => self.put_boolean(*b),
            AmfValue::Number(d) => self.put_double(*d),
            AmfValue::Integer(i) => self.put_integer(*i),
            AmfValue::String(s) => self.put_string(s)?,
            AmfValue::Xml(x) => self.put_xml_doc(amf3_value, x)?,
            AmfValue::Date(d) => self.put_date(amf3_value, d),
            AmfValue::Array(array) => self.put_array(amf3_value, &array.borrow())?,
            AmfValue::Object(map) => self.put_anonymous_object(amf3_value, &map.borrow())?,
            AmfValue::TypedObject(object) => self.put_object(amf3_value, &object.borrow())?,
            AmfValue::ByteArray(ba) => self.put_byte_array(amf3_value, ba)?,
            AmfValue::Dictionary(entries) => {
                self.put_dictionary(amf3_value, &entries.borrow())?
            }
        }
        Ok(())
    }

    fn put_marker(&mut self, marker: u8) {
        self.buf.put_u8(marker);
    }

    fn put_null(&mut self) {
        self.put_marker(NULL);
    }

    fn put_boolean(&mut self, b: bool) {
        match b {
            false => self.put_marker(FALSE),
            true => self.put_marker(TRUE),
        }
    }

    /// Integers outside of the 29-bit range are written as doubles.
    fn put_integer(&mut self, i: i32) {
        if !(I29_MIN..=I29_MAX).contains(&i) {
            self.put_double(i as f64);
            return;
        }

        self.put_marker(INTEGER);
        self.put_u29(i as u32);
    }

    fn put_double(&mut self, d: f64) {
        self.put_marker(DOUBLE);
        self.buf.put_f64(d);
    }

    fn put_string(&mut self, s: &str) -> Result<(), EncodingError> {
        self.put_marker(STRING);
        self.put_string_raw(s)
    }

    fn put_string_raw(&mut self, s: &str) -> Result<(), EncodingError> {
        if s.is_empty() {
            self.put_u29(0b1);
            return Ok(());
        }
        if let Some(idx) = self.strings.get(s).copied() {
            self.put_u29((idx as u32) << 1);
            return Ok(());
        }
        if s.len() > U28_MAX as usize {
            return Err(EncodingError::StringTooLong(s.len()));
        }

        if self.strings.len() <= U28_MAX as usize {
            self.strings.insert(s.to_owned(), self.strings.len());
        }
        self.put_u29(((s.len() as u32) << 1) | 0b1);
        self.buf.put_slice(s.as_bytes());
        Ok(())
    }

    fn put_xml_doc(&mut self, value: &AmfValue, xd: &str) -> Result<(), EncodingError> {
        if xd.len() > U28_MAX as usize {
            return Err(EncodingError::StringTooLong(xd.len()));
        }
        self.put_marker(XML_DOC);
        if self.put_complex_reference(value) {
            return Ok(());
        }
        self.put_u29(((xd.len() as u32) << 1) | 0b1);
        self.buf.put_slice(xd.as_bytes());
        Ok(())
    }

    fn put_date(&mut self, value: &AmfValue, date: &AmfDate) {
        self.put_marker(DATE);
        if self.put_complex_reference(value) {
            return;
        }

        // For date the only necessary information is if it is a value (`U29D` set to 1). Remaining
        // bits are insignificant, they are set to 0 so the whole value is encoded in 1 byte
        // only.
        self.put_u29(0b1);
        self.buf.put_f64(date.millis());
    }

    fn put_array(&mut self, value: &AmfValue, dense: &[AmfValue]) -> Result<(), EncodingError> {
        if dense.len() > U28_MAX as usize {
            return Err(EncodingError::ArrayTooLong(dense.len()));
        }

        self.put_marker(ARRAY);
        if self.put_complex_reference(value) {
            return Ok(());
        }
        self.put_u29(((dense.len() as u32) << 1) | 0b1);
        // empty associative part
        self.put_string_raw("")?;
        for val in dense {
            self.put_value(val)?;
        }
        Ok(())
    }

    fn put_anonymous_object(
        &mut self,
        value: &AmfValue,
        map: &IndexMap<String, AmfValue>,
    ) -> Result<(), EncodingError> {
        self.put_marker(OBJECT);
        if self.put_complex_reference(value) {
            return Ok(());
        }

        self.put_trait(Trait {
            class_name: String::new(),
            members: vec![],
            externalizable: false,
            dynamic: true,
        })?;
        self.put_dynamic_members(map.iter())
    }

    fn put_object(&mut self, value: &AmfValue, object: &AmfObject) -> Result<(), EncodingError> {
        self.put_marker(OBJECT);
        if self.put_complex_reference(value) {
            return Ok(());
        }

        let class_name = self.mapper.class_name_for(object).unwrap_or_default();

        if let Some(payload) = &object.external {
            self.put_trait(Trait {
                class_name,
                members: vec![],
                externalizable: true,
                dynamic: false,
            })?;
            return self.put_value(payload);
        }

        let sealed = self.mapper.properties_of(object);
        self.put_trait(Trait {
            class_name,
            members: sealed.iter().map(|(key, _)| key.clone()).collect(),
            externalizable: false,
            dynamic: object.is_dynamic(),
        })?;

        for (_, v) in &sealed {
            self.put_value(v)?;
        }
        if let Some(dynamic) = &object.dynamic_properties {
            self.put_dynamic_members(dynamic.iter().map(|(k, v)| (k, v)))?;
        }
        Ok(())
    }

    fn put_dynamic_members<'v, I>(&mut self, members: I) -> Result<(), EncodingError>
    where
        I: Iterator<Item = (&'v String, &'v AmfValue)>,
    {
        for (k, v) in members {
            if k.is_empty() {
                return Err(EncodingError::EmptyDynamicMemberName);
            }
            self.put_string_raw(k)?;
            self.put_value(v)?;
        }
        self.put_string_raw("")
    }

    fn put_trait(&mut self, amf_trait: Trait) -> Result<(), EncodingError> {
        if let Some(idx) = self.traits.get(&amf_trait).copied() {
            self.put_u29(((idx as u32) << 2) | 0b01);
            return Ok(());
        }

        let sealed_count = amf_trait.members.len();
        if sealed_count > MAX_SEALED_COUNT {
            return Err(EncodingError::TooManyEntries(sealed_count));
        }

        let mut u29o = ((sealed_count as u32) << 4) | 0b0011;
        if amf_trait.externalizable {
            u29o |= 0b0100;
        }
        if amf_trait.dynamic {
            u29o |= 0b1000;
        }

        self.put_u29(u29o);
        self.put_string_raw(&amf_trait.class_name)?;
        for member in &amf_trait.members {
            self.put_string_raw(member)?;
        }

        if self.traits.len() <= MAX_TRAIT_REFERENCE {
            let idx = self.traits.len();
            self.traits.insert(amf_trait, idx);
        }
        Ok(())
    }

    fn put_byte_array(&mut self, value: &AmfValue, ba: &Bytes) -> Result<(), EncodingError> {
        if ba.len() > U28_MAX as usize {
            return Err(EncodingError::ByteArrayTooLong(ba.len()));
        }

        self.put_marker(BYTE_ARRAY);
        if self.put_complex_reference(value) {
            return Ok(());
        }
        self.put_u29(((ba.len() as u32) << 1) | 0b1);
        self.buf.put_slice(ba);
        Ok(())
    }

    fn put_dictionary(
        &mut self,
        value: &AmfValue,
        entries: &[(AmfValue, AmfValue)],
    ) -> Result<(), EncodingError> {
        if entries.len() > U28_MAX as usize {
            return Err(EncodingError::TooManyEntries(entries.len()));
        }

        self.put_marker(DICTIONARY);
        if self.put_complex_reference(value) {
            return Ok(());
        }
        self.put_u29(((entries.len() as u32) << 1) | 0b1);
        // weak keys
        self.put_u29(0);
        for (key, value) in entries {
            self.put_value(key)?;
            self.put_value(value)?;
        }
        Ok(())
    }

    /// Writes a back-reference header if `value` was already written by this
    /// encoder, otherwise registers it under the next object index.
    fn put_complex_reference(&mut self, value: &AmfValue) -> bool {
        let Some(identity) = value.identity() else {
            return false;
        };

        if let Some(idx) = self.complex_indices.get(&identity).copied() {
            self.put_u29((idx as u32) << 1);
            return true;
        }

        let idx = self.complexes.len();
        if idx <= U28_MAX as usize {
            self.complex_indices.insert(identity, idx);
        }
        self.complexes.push(value.clone());
        false
    }

    /// Masks `value` to 29 bits, negative integers end up in two's complement.
    fn put_u29(&mut self, value: u32) {
        let mut u29 = value & U29_MASK;

        match u29 {
            0..0x80 => {
                self.buf.put_u8(u29 as u8);
            }
            0x80..0x4000 => {
                let second = (u29 & 0x7F) as u8;
                u29 >>= 7;
                let first = 0x80 | (u29 & 0x7F) as u8;
                self.buf.put_slice(&[first, second]);
            }
            0x4000..0x20_0000 => {
                let third = (u29 & 0x7F) as u8;
                u29 >>= 7;
                let second = 0x80 | (u29 & 0x7F) as u8;
                u29 >>= 7;
                let first = 0x80 | (u29 & 0x7F) as u8;
                self.buf.put_slice(&[first, second, third]);
            }
            _ => {
                let fourth = (u29 & 0xFF) as u8;
                u29 >>= 8;
                let third = 0x80 | (u29 & 0x7F) as u8;
                u29 >>= 7;
                let second = 0x80 | (u29 & 0x7F) as u8;
                u29 >>= 7;
                let first = 0x80 | (u29 & 0x7F) as u8;
                self.buf.put_slice(&[first, second, third, fourth]);
            }
        }
    }
}
