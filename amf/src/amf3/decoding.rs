use std::{
    cell::RefCell,
    collections::{HashMap, hash_map::Entry},
    rc::Rc,
};

use indexmap::IndexMap;
use tracing::trace;

use crate::{
    AmfDate, AmfFormat, AmfObject, AmfReader, AmfValue, CacheKind, ClassMapper, DecodingError,
    MAX_NESTING_DEPTH, amf3::*, class_mapper::resolve_or_generic,
};

pub(crate) struct Amf3DecoderState<'a> {
    reader: &'a mut AmfReader,
    mapper: &'a dyn ClassMapper,
    strings: Vec<Rc<str>>,
    pub(super) traits: Vec<Rc<Trait>>,
    complexes: Vec<AmfValue>,
    depth: usize,
}

impl<'a> Amf3DecoderState<'a> {
    pub(crate) fn new(reader: &'a mut AmfReader, mapper: &'a dyn ClassMapper) -> Self {
        Self::nested(reader, mapper, 0)
    }

    /// Decoder for a value found `depth` levels deep inside an AMF0 value.
    pub(crate) fn nested(
        reader: &'a mut AmfReader,
        mapper: &'a dyn ClassMapper,
        depth: usize,
    ) -> Self {
        Self {
            reader,
            mapper,
            strings: vec![],
            traits: vec![],
            complexes: vec![],
            depth,
        }
    }

    pub(crate) fn decode_value(&mut self) -> Result<AmfValue, DecodingError> {
        let offset = self.reader.position();
        if self.depth >= MAX_NESTING_DEPTH {
            return Err(DecodingError::NestingTooDeep { offset });
        }

        self.depth += 1;
        let value = self.decode_marked(offset);
        self.depth -= 1;
        value
    }

    fn decode_marked(&mut self, offset: usize) -> Result<AmfValue, DecodingError> {
        let marker = self.reader.read_u8()?;

        match marker {
            UNDEFINED | NULL => Ok(AmfValue::Null),
            FALSE => Ok(AmfValue::Boolean(false)),
            TRUE => Ok(AmfValue::Boolean(true)),
            INTEGER => Ok(AmfValue::Integer(self.decode_i29()?)),
            DOUBLE => self.decode_double(),
            STRING => Ok(AmfValue::String(self.decode_string_raw()?)),
            XML_DOC | XML => self.decode_xml(),
            DATE => self.decode_date(),
            ARRAY => self.decode_array(),
            OBJECT => self.decode_object(),
            BYTE_ARRAY => self.decode_byte_array(),
            VECTOR_INT => self.decode_vector(|decoder| {
                Ok(AmfValue::Integer(decoder.reader.read_i32()?))
            }),
            VECTOR_UINT => self.decode_vector(|decoder| {
                Ok(AmfValue::Number(decoder.reader.read_u32()? as f64))
            }),
            VECTOR_DOUBLE => self.decode_vector(|decoder| {
                let double = decoder.reader.read_f64()?;
                Ok(fold_nan(double))
            }),
            VECTOR_OBJECT => self.decode_object_vec(),
            DICTIONARY => self.decode_dictionary(),
            _ => Err(DecodingError::InvalidMarker {
                format: AmfFormat::Amf3,
                marker,
                offset,
            }),
        }
    }

    fn decode_double(&mut self) -> Result<AmfValue, DecodingError> {
        let double = self.reader.read_f64()?;
        Ok(fold_nan(double))
    }

    fn decode_xml(&mut self) -> Result<AmfValue, DecodingError> {
        self.decode_complex(|decoder, size| {
            let xml = decoder.reader.read_utf8(size)?;
            let amf_value = AmfValue::xml(xml);
            decoder.complexes.push(amf_value.clone());
            Ok(amf_value)
        })
    }

    fn decode_date(&mut self) -> Result<AmfValue, DecodingError> {
        self.decode_complex(|decoder, _| {
            let millis = decoder.reader.read_f64()?;
            let amf_value = AmfValue::date(AmfDate::from_millis(millis));
            decoder.complexes.push(amf_value.clone());
            Ok(amf_value)
        })
    }

    fn decode_array(&mut self) -> Result<AmfValue, DecodingError> {
        self.decode_complex(|decoder, dense_len| {
            let first_key = decoder.decode_string_raw()?;

            if first_key.is_empty() {
                let capacity = dense_len.min(decoder.reader.remaining());
                let array = Rc::new(RefCell::new(Vec::with_capacity(capacity)));
                decoder.complexes.push(AmfValue::Array(array.clone()));
                for _ in 0..dense_len {
                    let value = decoder.decode_value()?;
                    array.borrow_mut().push(value);
                }
                return Ok(AmfValue::Array(array));
            }

            // Associative part ends with the empty key, the dense part follows
            // and is stored under decimal index keys.
            let map = Rc::new(RefCell::new(IndexMap::new()));
            decoder.complexes.push(AmfValue::Object(map.clone()));
            let mut key = first_key;
            while !key.is_empty() {
                let value = decoder.decode_value()?;
                map.borrow_mut().insert(key.to_string(), value);
                key = decoder.decode_string_raw()?;
            }
            for index in 0..dense_len {
                let value = decoder.decode_value()?;
                map.borrow_mut().insert(index.to_string(), value);
            }
            Ok(AmfValue::Object(map))
        })
    }

    fn decode_object(&mut self) -> Result<AmfValue, DecodingError> {
        self.decode_complex(|decoder, u28| {
            let amf_trait = decoder.decode_object_trait(u28)?;

            if amf_trait.is_plain_object() {
                let map = Rc::new(RefCell::new(IndexMap::new()));
                decoder.complexes.push(AmfValue::Object(map.clone()));
                if amf_trait.dynamic {
                    let pairs = decoder.decode_pairs()?;
                    map.borrow_mut().extend(pairs);
                }
                return Ok(AmfValue::Object(map));
            }

            let instance = resolve_or_generic(decoder.mapper, &amf_trait.class_name);
            let object = Rc::new(RefCell::new(instance));
            decoder.complexes.push(AmfValue::TypedObject(object.clone()));

            if amf_trait.externalizable {
                trace!(class_name = %amf_trait.class_name, "Reading externalizable payload.");
                let payload = decoder.decode_value()?;
                object.borrow_mut().external = Some(payload);
                return Ok(AmfValue::TypedObject(object));
            }

            let mut static_properties = Vec::with_capacity(amf_trait.members.len());
            for key in &amf_trait.members {
                let value = decoder.decode_value()?;
                static_properties.push((key.clone(), value));
            }
            let dynamic_properties = match amf_trait.dynamic {
                true => Some(decoder.decode_pairs()?),
                false => None,
            };

            populate(decoder.mapper, &object, static_properties, dynamic_properties);
            Ok(AmfValue::TypedObject(object))
        })
    }

    fn decode_byte_array(&mut self) -> Result<AmfValue, DecodingError> {
        self.decode_complex(|decoder, size| {
            let byte_array = decoder.reader.read_bytes(size)?;
            let amf_value = AmfValue::byte_array(byte_array);

            decoder.complexes.push(amf_value.clone());
            Ok(amf_value)
        })
    }

    /// Vectors of int, uint and double: fixed-length flag, then big-endian items.
    fn decode_vector<F>(&mut self, mut decode_item: F) -> Result<AmfValue, DecodingError>
    where
        F: FnMut(&mut Self) -> Result<AmfValue, DecodingError>,
    {
        self.decode_complex(|decoder, item_count| {
            let _fixed_length = decoder.reader.read_u8()?;
            let capacity = item_count.min(decoder.reader.remaining());
            let array = Rc::new(RefCell::new(Vec::with_capacity(capacity)));
            decoder.complexes.push(AmfValue::Array(array.clone()));

            for _ in 0..item_count {
                let item = decode_item(decoder)?;
                array.borrow_mut().push(item);
            }
            Ok(AmfValue::Array(array))
        })
    }

    fn decode_object_vec(&mut self) -> Result<AmfValue, DecodingError> {
        self.decode_complex(|decoder, item_count| {
            let _fixed_length = decoder.reader.read_u8()?;
            let _type_name = decoder.decode_string_raw()?;
            let capacity = item_count.min(decoder.reader.remaining());
            let array = Rc::new(RefCell::new(Vec::with_capacity(capacity)));
            decoder.complexes.push(AmfValue::Array(array.clone()));

            for _ in 0..item_count {
                let item = decoder.decode_value()?;
                array.borrow_mut().push(item);
            }
            Ok(AmfValue::Array(array))
        })
    }

    fn decode_dictionary(&mut self) -> Result<AmfValue, DecodingError> {
        self.decode_complex(|decoder, entries_count| {
            let _weak_keys = decoder.decode_u29()?;

            let dictionary = Rc::new(RefCell::new(Vec::new()));
            decoder
                .complexes
                .push(AmfValue::Dictionary(dictionary.clone()));

            // Position of every key in `dictionary`, a repeated key overwrites the value.
            let mut positions: HashMap<_, usize> = HashMap::new();
            for _ in 0..entries_count {
                let key = decoder.decode_value()?;
                let value = decoder.decode_value()?;

                let mut entries = dictionary.borrow_mut();
                match positions.entry(key.dictionary_key()) {
                    Entry::Occupied(position) => entries[*position.get()].1 = value,
                    Entry::Vacant(position) => {
                        position.insert(entries.len());
                        entries.push((key, value));
                    }
                }
            }
            Ok(AmfValue::Dictionary(dictionary))
        })
    }

    /// Reads the ref-header shared by complex values and either resolves the
    /// back-reference or hands the inline length to `decode`.
    fn decode_complex<F>(&mut self, decode: F) -> Result<AmfValue, DecodingError>
    where
        F: FnOnce(&mut Self, usize) -> Result<AmfValue, DecodingError>,
    {
        let u29 = self.decode_u29()?;
        let has_value = (u29 & 0b1) == 1;
        let u28 = (u29 >> 1) as usize;

        match has_value {
            true => decode(self, u28),
            false => self
                .complexes
                .get(u28)
                .cloned()
                .ok_or(DecodingError::DanglingReference {
                    cache: CacheKind::Object,
                    index: u28,
                    len: self.complexes.len(),
                }),
        }
    }

    // U29 layout: AMF3 format document, sections 1.3.1 and 3.6
    fn decode_u29(&mut self) -> Result<u32, DecodingError> {
        let mut result: u32 = 0;

        for _ in 0..3 {
            let byte = self.reader.read_u8()?;
            result = (result << 7) | (byte & 0x7F) as u32;
            if byte & 0x80 == 0 {
                return Ok(result);
            }
        }

        // Fourth byte carries a full 8 bits.
        let byte = self.reader.read_u8()?;
        Ok((result << 8) | byte as u32)
    }

    fn decode_i29(&mut self) -> Result<i32, DecodingError> {
        let u29 = self.decode_u29()?;
        if u29 > I29_MAX as u32 {
            Ok((u29 as i32) - (1 << 29))
        } else {
            Ok(u29 as i32)
        }
    }

    fn decode_string_raw(&mut self) -> Result<Rc<str>, DecodingError> {
        let u29 = self.decode_u29()?;
        let has_value = (u29 & 0b1) == 1;
        let u28 = (u29 >> 1) as usize;

        if !has_value {
            return self
                .strings
                .get(u28)
                .cloned()
                .ok_or(DecodingError::DanglingReference {
                    cache: CacheKind::String,
                    index: u28,
                    len: self.strings.len(),
                });
        }

        // The empty string is never cached.
        if u28 == 0 {
            return Ok(Rc::from(""));
        }

        let string: Rc<str> = self.reader.read_utf8(u28)?.into();
        self.strings.push(string.clone());
        Ok(string)
    }

    fn decode_pairs(&mut self) -> Result<Vec<(String, AmfValue)>, DecodingError> {
        let mut pairs = vec![];
        loop {
            let key = self.decode_string_raw()?;
            if key.is_empty() {
                return Ok(pairs);
            }

            let value = self.decode_value()?;
            pairs.push((key.to_string(), value));
        }
    }

    fn decode_object_trait(&mut self, u28: usize) -> Result<Rc<Trait>, DecodingError> {
        // AMF3 format document, section 3.12
        const TRAIT_HAS_VALUE_FLAG: usize = 0b001;
        const TRAIT_EXTERNALIZABLE_FLAG: usize = 0b010;
        const DYNAMIC_MEMBERS_FLAG: usize = 0b100;

        if (u28 & TRAIT_HAS_VALUE_FLAG) == 0 {
            let trait_idx = u28 >> 1;
            return self
                .traits
                .get(trait_idx)
                .cloned()
                .ok_or(DecodingError::DanglingReference {
                    cache: CacheKind::Trait,
                    index: trait_idx,
                    len: self.traits.len(),
                });
        }

        let externalizable = (u28 & TRAIT_EXTERNALIZABLE_FLAG) != 0;
        let dynamic = (u28 & DYNAMIC_MEMBERS_FLAG) != 0;
        let sealed_members = u28 >> 3;

        let class_name = self.decode_string_raw()?.to_string();
        let mut members = Vec::with_capacity(sealed_members.min(self.reader.remaining()));
        for _ in 0..sealed_members {
            members.push(self.decode_string_raw()?.to_string());
        }

        let amf_trait = Rc::new(Trait {
            class_name,
            members,
            externalizable,
            dynamic,
        });

        self.traits.push(amf_trait.clone());
        Ok(amf_trait)
    }
}

fn fold_nan(double: f64) -> AmfValue {
    match double.is_nan() {
        true => AmfValue::Null,
        false => AmfValue::Number(double),
    }
}

fn populate(
    mapper: &dyn ClassMapper,
    object: &RefCell<AmfObject>,
    static_properties: Vec<(String, AmfValue)>,
    dynamic_properties: Option<Vec<(String, AmfValue)>>,
) {
    mapper.populate(
        &mut object.borrow_mut(),
        static_properties,
        dynamic_properties,
    );
}
