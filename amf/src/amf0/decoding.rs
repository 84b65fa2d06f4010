use std::{cell::RefCell, rc::Rc};

use indexmap::IndexMap;

use tracing::{debug, trace, warn};

use crate::{
    AmfDate, AmfFormat, AmfReader, AmfValue, CacheKind, ClassMapper, DecodingError,
    MAX_NESTING_DEPTH, amf0::*, amf3::Amf3DecoderState, class_mapper::resolve_or_generic,
};

/// Object member whose key and value marker were read, the value itself was not.
struct PendingMember {
    key: String,
    key_offset: usize,
    marker: u8,
    marker_offset: usize,
}

pub(super) struct Amf0DecoderState<'a> {
    reader: &'a mut AmfReader,
    mapper: &'a dyn ClassMapper,
    // Object, ECMA array, strict array and typed object, in order of appearance.
    complexes: Vec<AmfValue>,
    depth: usize,
}

impl<'a> Amf0DecoderState<'a> {
    pub(super) fn new(reader: &'a mut AmfReader, mapper: &'a dyn ClassMapper) -> Self {
        Self {
            reader,
            mapper,
            complexes: vec![],
            depth: 0,
        }
    }

    pub(super) fn decode_value(&mut self) -> Result<AmfValue, DecodingError> {
        let offset = self.reader.position();
        let marker = self.reader.read_u8()?;
        self.decode_marked(marker, offset)
    }

    fn decode_marked(&mut self, marker: u8, offset: usize) -> Result<AmfValue, DecodingError> {
        if self.depth >= MAX_NESTING_DEPTH {
            return Err(DecodingError::NestingTooDeep { offset });
        }

        self.depth += 1;
        let value = self.decode_by_marker(marker, offset);
        self.depth -= 1;
        value
    }

    fn decode_by_marker(&mut self, marker: u8, offset: usize) -> Result<AmfValue, DecodingError> {
        match marker {
            NUMBER => self.decode_number(),
            BOOLEAN => Ok(AmfValue::Boolean(self.reader.read_u8()? != 0)),
            STRING => Ok(AmfValue::string(self.reader.read_short_string()?)),
            OBJECT => self.decode_object(),
            NULL | UNDEFINED | UNSUPPORTED => Ok(AmfValue::Null),
            REFERENCE => self.decode_reference(),
            ECMA_ARRAY => self.decode_ecma_array(),
            STRICT_ARRAY => self.decode_strict_array(),
            DATE => self.decode_date(),
            LONG_STRING => Ok(AmfValue::string(self.reader.read_long_string()?)),
            XML_DOC => Ok(AmfValue::xml(self.reader.read_long_string()?)),
            TYPED_OBJECT => self.decode_typed_object(),
            AVMPLUS_OBJECT => {
                trace!(offset, "Switching to AMF3.");
                Amf3DecoderState::nested(self.reader, self.mapper, self.depth).decode_value()
            }
            // Never written by Flash Player.
            MOVIECLIP | RECORDSET => Err(DecodingError::ReservedMarker { marker, offset }),
            _ => Err(DecodingError::InvalidMarker {
                format: AmfFormat::Amf0,
                marker,
                offset,
            }),
        }
    }

    fn decode_number(&mut self) -> Result<AmfValue, DecodingError> {
        let number = self.reader.read_f64()?;
        match number.is_nan() {
            true => Ok(AmfValue::Null),
            false => Ok(AmfValue::Number(number)),
        }
    }

    fn decode_object(&mut self) -> Result<AmfValue, DecodingError> {
        let map = Rc::new(RefCell::new(IndexMap::new()));
        self.complexes.push(AmfValue::Object(map.clone()));

        while let Some(member) = self.next_member()? {
            let value = self.decode_marked(member.marker, member.marker_offset)?;
            map.borrow_mut().insert(member.key, value);
        }
        Ok(AmfValue::Object(map))
    }

    fn decode_typed_object(&mut self) -> Result<AmfValue, DecodingError> {
        let class_name = self.reader.read_short_string()?;
        let object = Rc::new(RefCell::new(resolve_or_generic(self.mapper, &class_name)));
        self.complexes.push(AmfValue::TypedObject(object.clone()));

        let mut properties = vec![];
        while let Some(member) = self.next_member()? {
            let value = self.decode_marked(member.marker, member.marker_offset)?;
            properties.push((member.key, value));
        }

        self.mapper.populate(&mut object.borrow_mut(), properties, None);
        Ok(AmfValue::TypedObject(object))
    }

    fn decode_reference(&mut self) -> Result<AmfValue, DecodingError> {
        let idx = self.reader.read_u16()? as usize;
        self.complexes
            .get(idx)
            .cloned()
            .ok_or(DecodingError::DanglingReference {
                cache: CacheKind::Reference,
                index: idx,
                len: self.complexes.len(),
            })
    }

    /// ECMA arrays whose first key is an index decode to a sparse array,
    /// anything else to a key-value object.
    fn decode_ecma_array(&mut self) -> Result<AmfValue, DecodingError> {
        // Count is not reliable, the object end marker terminates the array.
        let _array_size = self.reader.read_u32()?;

        let Some(first) = self.next_member()? else {
            let array = AmfValue::array(vec![]);
            self.complexes.push(array.clone());
            return Ok(array);
        };

        match parse_index(&first.key) {
            Some(_) => self.decode_sparse_array(first),
            None => {
                let map = Rc::new(RefCell::new(IndexMap::new()));
                self.complexes.push(AmfValue::Object(map.clone()));

                let mut member = Some(first);
                while let Some(PendingMember {
                    key,
                    marker,
                    marker_offset,
                    ..
                }) = member
                {
                    let value = self.decode_marked(marker, marker_offset)?;
                    map.borrow_mut().insert(key, value);
                    member = self.next_member()?;
                }
                Ok(AmfValue::Object(map))
            }
        }
    }

    fn decode_sparse_array(&mut self, first: PendingMember) -> Result<AmfValue, DecodingError> {
        let array = Rc::new(RefCell::new(Vec::new()));
        self.complexes.push(AmfValue::Array(array.clone()));

        let mut member = Some(first);
        while let Some(PendingMember {
            key,
            key_offset,
            marker,
            marker_offset,
        }) = member
        {
            let index = parse_index(&key);
            if let Some(index) = index {
                let added = index
                    .saturating_add(1)
                    .saturating_sub(array.borrow().len() as u64);
                if !self.reader.reserve_sparse_slots(added) {
                    return Err(DecodingError::SparseIndexTooLarge {
                        index,
                        offset: key_offset,
                    });
                }
            }

            let value = self.decode_marked(marker, marker_offset)?;
            match index {
                Some(index) => {
                    let index = index as usize;
                    let mut array = array.borrow_mut();
                    if array.len() <= index {
                        array.resize(index + 1, AmfValue::Null);
                    }
                    array[index] = value;
                }
                None => warn!(key = %key, key_offset, "Dropping non-index key of a sparse array."),
            }
            member = self.next_member()?;
        }
        Ok(AmfValue::Array(array))
    }

    fn decode_strict_array(&mut self) -> Result<AmfValue, DecodingError> {
        let size = self.reader.read_u32()? as usize;
        let array = Rc::new(RefCell::new(Vec::with_capacity(
            size.min(self.reader.remaining()),
        )));
        self.complexes.push(AmfValue::Array(array.clone()));

        for _ in 0..size {
            let value = self.decode_value()?;
            array.borrow_mut().push(value);
        }
        Ok(AmfValue::Array(array))
    }

    fn decode_date(&mut self) -> Result<AmfValue, DecodingError> {
        let millis = self.reader.read_f64()?;
        let timezone_offset = self.reader.read_i16()?;
        if timezone_offset != 0 {
            debug!(timezone_offset, "Ignoring date timezone offset.");
        }

        Ok(AmfValue::date(AmfDate::from_millis(millis)))
    }

    /// Reads the next member key and value marker, `None` at the object end marker.
    fn next_member(&mut self) -> Result<Option<PendingMember>, DecodingError> {
        let key_offset = self.reader.position();
        let key = self.reader.read_short_string()?;
        let marker_offset = self.reader.position();
        let marker = self.reader.read_u8()?;

        if marker == OBJECT_END {
            return Ok(None);
        }
        Ok(Some(PendingMember {
            key,
            key_offset,
            marker,
            marker_offset,
        }))
    }
}

/// Index for keys in canonical decimal form ("0", "17"), `None` otherwise ("01", "-1", "foo").
fn parse_index(key: &str) -> Option<u64> {
    key.parse::<u64>()
        .ok()
        .filter(|index| index.to_string() == key)
}
