use std::fmt;

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AmfFormat {
    Amf0,
    Amf3,
}

impl fmt::Display for AmfFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AmfFormat::Amf0 => f.write_str("AMF0"),
            AmfFormat::Amf3 => f.write_str("AMF3"),
        }
    }
}

/// Table a back-reference points into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheKind {
    /// AMF0 complex values (objects, typed objects, ECMA and strict arrays).
    Reference,
    String,
    Object,
    Trait,
}

impl fmt::Display for CacheKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheKind::Reference => f.write_str("AMF0 reference"),
            CacheKind::String => f.write_str("AMF3 string"),
            CacheKind::Object => f.write_str("AMF3 object"),
            CacheKind::Trait => f.write_str("AMF3 trait"),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DecodingError {
    #[error("Unknown {format} marker 0x{marker:02X} at offset {offset}")]
    InvalidMarker {
        format: AmfFormat,
        marker: u8,
        offset: usize,
    },

    #[error("Insufficient data at offset {offset}: needed {needed} bytes, {remaining} remaining")]
    IncompleteData {
        offset: usize,
        needed: usize,
        remaining: usize,
    },

    #[error("{cache} reference {index} out of bounds ({len} cached entries)")]
    DanglingReference {
        cache: CacheKind,
        index: usize,
        len: usize,
    },

    #[error("Invalid UTF-8 string at offset {offset}")]
    InvalidUtf8 { offset: usize },

    #[error("Reserved AMF0 marker 0x{marker:02X} at offset {offset}")]
    ReservedMarker { marker: u8, offset: usize },

    #[error("Sparse array index {index} at offset {offset} is too large")]
    SparseIndexTooLarge { index: u64, offset: usize },

    #[error("Value at offset {offset} is nested too deeply")]
    NestingTooDeep { offset: usize },
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EncodingError {
    #[error("String too long: {0} bytes")]
    StringTooLong(usize),

    #[error("Array too long: {0} elements")]
    ArrayTooLong(usize),

    #[error("Byte array too long: {0} bytes")]
    ByteArrayTooLong(usize),

    #[error("Too many entries: {0}")]
    TooManyEntries(usize),

    #[error("Dynamic member name must not be empty")]
    EmptyDynamicMemberName,
}

/// Returned by a [`ClassMapper`](crate::ClassMapper) that does not know a wire class name.
///
/// Never aborts a decode: the codec falls back to a generic instance.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unresolved class: {class_name}")]
pub struct UnresolvedClass {
    pub class_name: String,
}
