use std::{
    cell::RefCell,
    rc::Rc,
    time::{Duration, SystemTime, UNIX_EPOCH},
};

use bytes::Bytes;
use indexmap::IndexMap;

/// Handle to a complex value owned by a reference cache.
///
/// Back-references resolve to a clone of the handle, so every occurrence of a
/// cached value observes the same instance.
pub type Shared<T> = Rc<RefCell<T>>;

/// Decoded AMF0/AMF3 value.
///
/// Graphs with cycles (an object containing itself) can be decoded and
/// encoded, but `Debug` and `PartialEq` recurse into them without end; compare
/// such values with [`AmfValue::ptr_eq`].
#[derive(Debug, Clone, PartialEq)]
pub enum AmfValue {
    /// Null, undefined, unsupported and NaN.
    Null,
    Boolean(bool),
    Number(f64),
    /// AMF3 29-bit signed integer.
    Integer(i32),
    String(Rc<str>),
    Xml(Rc<str>),
    Date(Rc<AmfDate>),
    Array(Shared<Vec<AmfValue>>),
    /// Anonymous object or associative array, members in wire order.
    Object(Shared<IndexMap<String, AmfValue>>),
    TypedObject(Shared<AmfObject>),
    ByteArray(Rc<Bytes>),
    Dictionary(Shared<Vec<(AmfValue, AmfValue)>>),
}

impl AmfValue {
    pub fn string(s: impl Into<Rc<str>>) -> Self {
        AmfValue::String(s.into())
    }

    pub fn xml(s: impl Into<Rc<str>>) -> Self {
        AmfValue::Xml(s.into())
    }

    pub fn date(date: AmfDate) -> Self {
        AmfValue::Date(Rc::new(date))
    }

    pub fn array(values: Vec<AmfValue>) -> Self {
        AmfValue::Array(Rc::new(RefCell::new(values)))
    }

    pub fn object<K, I>(pairs: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, AmfValue)>,
    {
        let map = pairs.into_iter().map(|(k, v)| (k.into(), v)).collect();
        AmfValue::Object(Rc::new(RefCell::new(map)))
    }

    pub fn typed_object(object: AmfObject) -> Self {
        AmfValue::TypedObject(Rc::new(RefCell::new(object)))
    }

    pub fn byte_array(bytes: impl Into<Bytes>) -> Self {
        AmfValue::ByteArray(Rc::new(bytes.into()))
    }

    pub fn dictionary(entries: Vec<(AmfValue, AmfValue)>) -> Self {
        AmfValue::Dictionary(Rc::new(RefCell::new(entries)))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, AmfValue::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            AmfValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            AmfValue::Number(n) => Some(*n),
            AmfValue::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            AmfValue::String(s) | AmfValue::Xml(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&Shared<Vec<AmfValue>>> {
        match self {
            AmfValue::Array(array) => Some(array),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&Shared<IndexMap<String, AmfValue>>> {
        match self {
            AmfValue::Object(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_typed_object(&self) -> Option<&Shared<AmfObject>> {
        match self {
            AmfValue::TypedObject(object) => Some(object),
            _ => None,
        }
    }

    /// True when both values are the same cached instance.
    ///
    /// Scalars never share an instance and always compare as `false`.
    pub fn ptr_eq(&self, other: &AmfValue) -> bool {
        match (self.identity(), other.identity()) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }

    /// Address of the shared allocation behind a cacheable value.
    pub(crate) fn identity(&self) -> Option<*const ()> {
        match self {
            AmfValue::Null
            | AmfValue::Boolean(_)
            | AmfValue::Number(_)
            | AmfValue::Integer(_) => None,
            AmfValue::String(s) | AmfValue::Xml(s) => Some(Rc::as_ptr(s).cast()),
            AmfValue::Date(date) => Some(Rc::as_ptr(date).cast()),
            AmfValue::Array(array) => Some(Rc::as_ptr(array).cast()),
            AmfValue::Object(map) => Some(Rc::as_ptr(map).cast()),
            AmfValue::TypedObject(object) => Some(Rc::as_ptr(object).cast()),
            AmfValue::ByteArray(bytes) => Some(Rc::as_ptr(bytes).cast()),
            AmfValue::Dictionary(dict) => Some(Rc::as_ptr(dict).cast()),
        }
    }

    /// Hashable dictionary key: complex values by identity, scalars by value.
    pub(crate) fn dictionary_key(&self) -> DictionaryKey {
        match self {
            AmfValue::Null => DictionaryKey::Null,
            AmfValue::Boolean(b) => DictionaryKey::Boolean(*b),
            // -0.0 and 0.0 are one key
            AmfValue::Number(n) if *n == 0.0 => DictionaryKey::Number(0),
            AmfValue::Number(n) => DictionaryKey::Number(n.to_bits()),
            AmfValue::Integer(i) => DictionaryKey::Integer(*i),
            AmfValue::String(s) => DictionaryKey::String(s.clone()),
            complex => complex
                .identity()
                .map_or(DictionaryKey::Null, DictionaryKey::Instance),
        }
    }
}

#[derive(Debug, PartialEq, Eq, Hash)]
pub(crate) enum DictionaryKey {
    Null,
    Boolean(bool),
    Number(u64),
    Integer(i32),
    String(Rc<str>),
    Instance(*const ()),
}

impl From<bool> for AmfValue {
    fn from(b: bool) -> Self {
        AmfValue::Boolean(b)
    }
}

impl From<f64> for AmfValue {
    fn from(n: f64) -> Self {
        AmfValue::Number(n)
    }
}

impl From<i32> for AmfValue {
    fn from(i: i32) -> Self {
        AmfValue::Integer(i)
    }
}

impl From<&str> for AmfValue {
    fn from(s: &str) -> Self {
        AmfValue::String(s.into())
    }
}

impl From<String> for AmfValue {
    fn from(s: String) -> Self {
        AmfValue::String(s.into())
    }
}

impl From<AmfObject> for AmfValue {
    fn from(object: AmfObject) -> Self {
        AmfValue::typed_object(object)
    }
}

/// Point in time as carried on the wire: milliseconds since the Unix epoch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AmfDate {
    millis: f64,
}

impl AmfDate {
    pub fn from_millis(millis: f64) -> Self {
        Self { millis }
    }

    pub fn from_secs_f64(secs: f64) -> Self {
        Self {
            millis: secs * 1000.0,
        }
    }

    pub fn millis(&self) -> f64 {
        self.millis
    }

    pub fn as_secs_f64(&self) -> f64 {
        self.millis / 1000.0
    }

    pub fn to_system_time(&self) -> Option<SystemTime> {
        if !self.millis.is_finite() {
            return None;
        }
        let offset = Duration::try_from_secs_f64(self.as_secs_f64().abs()).ok()?;
        if self.millis >= 0.0 {
            UNIX_EPOCH.checked_add(offset)
        } else {
            UNIX_EPOCH.checked_sub(offset)
        }
    }
}

impl From<SystemTime> for AmfDate {
    fn from(time: SystemTime) -> Self {
        match time.duration_since(UNIX_EPOCH) {
            Ok(after) => AmfDate::from_secs_f64(after.as_secs_f64()),
            Err(before) => AmfDate::from_secs_f64(-before.duration().as_secs_f64()),
        }
    }
}

// https://github.com/apache/flex-blazeds - flex.messaging.messages
const ABSTRACT_MESSAGE_CLASSES: [&str; 8] = [
    "flex.messaging.messages.RemotingMessage",
    "flex.messaging.messages.CommandMessage",
    "flex.messaging.messages.AcknowledgeMessage",
    "flex.messaging.messages.AsyncMessage",
    "flex.messaging.messages.ErrorMessage",
    "DSA",
    "DSC",
    "DSK",
];

/// Typed object instance produced by a [`ClassMapper`](crate::ClassMapper).
///
/// `properties` are the sealed members in trait order. `dynamic_properties` is
/// `Some` exactly when the instance is dynamic. `external` holds the payload
/// of an externalizable instance, which is opaque to the codec.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AmfObject {
    pub class_name: Option<String>,
    pub properties: Vec<(String, AmfValue)>,
    pub dynamic_properties: Option<Vec<(String, AmfValue)>>,
    pub external: Option<AmfValue>,
}

impl AmfObject {
    /// Instance of the given class; an empty name makes an anonymous instance.
    pub fn new(class_name: impl Into<String>) -> Self {
        let class_name: String = class_name.into();
        Self {
            class_name: (!class_name.is_empty()).then_some(class_name),
            ..Default::default()
        }
    }

    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn with_property(mut self, name: impl Into<String>, value: impl Into<AmfValue>) -> Self {
        self.properties.push((name.into(), value.into()));
        self
    }

    pub fn with_dynamic_property(
        mut self,
        name: impl Into<String>,
        value: impl Into<AmfValue>,
    ) -> Self {
        self.dynamic_properties
            .get_or_insert_with(Vec::new)
            .push((name.into(), value.into()));
        self
    }

    pub fn with_external(mut self, payload: AmfValue) -> Self {
        self.external = Some(payload);
        self
    }

    pub fn is_dynamic(&self) -> bool {
        self.dynamic_properties.is_some()
    }

    pub fn is_externalizable(&self) -> bool {
        self.external.is_some()
    }

    /// Sealed member first, then dynamic.
    pub fn get(&self, name: &str) -> Option<&AmfValue> {
        self.properties
            .iter()
            .chain(self.dynamic_properties.iter().flatten())
            .find(|(key, _)| key == name)
            .map(|(_, value)| value)
    }

    /// Replaces an existing member, or appends a new sealed one.
    pub fn set(&mut self, name: impl Into<String>, value: AmfValue) {
        let name = name.into();
        let existing = self
            .properties
            .iter_mut()
            .chain(self.dynamic_properties.iter_mut().flatten())
            .find(|(key, _)| *key == name);
        match existing {
            Some((_, slot)) => *slot = value,
            None => self.properties.push((name, value)),
        }
    }

    /// Flex messaging envelope object (`RemotingMessage`, `CommandMessage`, ...).
    pub fn is_abstract_message(&self) -> bool {
        match self.class_name.as_deref() {
            Some(name) if ABSTRACT_MESSAGE_CLASSES.contains(&name) => true,
            _ => self.get("messageId").is_some() && self.get("body").is_some(),
        }
    }
}
