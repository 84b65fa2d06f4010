//! AMF0 and AMF3 codecs.
//!
//! Every top-level decode or encode call owns its reference caches, nested
//! values share them. Typed objects go through a [`ClassMapper`].

pub mod amf0;
pub mod amf3;

mod class_mapper;
mod error;
mod reader;
mod value;

pub use amf0::{decode_amf0, decode_amf0_values, encode_amf0, encode_amf0_values};
pub use amf3::{Trait, decode_amf3, decode_amf3_values, encode_amf3, encode_amf3_values};
pub use class_mapper::{ClassMapper, GenericClassMapper};
pub use error::{AmfFormat, CacheKind, DecodingError, EncodingError, UnresolvedClass};
pub use indexmap::IndexMap;
pub use reader::AmfReader;
pub use value::{AmfDate, AmfObject, AmfValue, Shared};

/// Deepest chain of nested values a decoder accepts.
pub(crate) const MAX_NESTING_DEPTH: usize = 256;
