use tracing::warn;

use crate::{AmfObject, AmfValue, UnresolvedClass};

/// Maps wire class names to host instances and back.
///
/// The codec only talks to this trait; the host application decides which
/// class names it understands. Only [`ClassMapper::resolve`] is required, the
/// remaining methods default to storing and reading the generic instance data.
pub trait ClassMapper {
    /// Fresh instance for `class_name` (empty for anonymous objects).
    ///
    /// An error does not fail the decode, the codec falls back to
    /// [`AmfObject::new`] with the wire name.
    fn resolve(&self, class_name: &str) -> Result<AmfObject, UnresolvedClass>;

    fn populate(
        &self,
        object: &mut AmfObject,
        static_properties: Vec<(String, AmfValue)>,
        dynamic_properties: Option<Vec<(String, AmfValue)>>,
    ) {
        object.properties = static_properties;
        object.dynamic_properties = dynamic_properties;
    }

    fn class_name_for(&self, object: &AmfObject) -> Option<String> {
        object.class_name.clone()
    }

    /// Sealed members in the order they are written to the wire.
    fn properties_of(&self, object: &AmfObject) -> Vec<(String, AmfValue)> {
        object.properties.clone()
    }
}

/// Resolves every class name to a generic instance carrying that name.
#[derive(Debug, Default, Clone, Copy)]
pub struct GenericClassMapper;

impl ClassMapper for GenericClassMapper {
    fn resolve(&self, class_name: &str) -> Result<AmfObject, UnresolvedClass> {
        Ok(AmfObject::new(class_name))
    }
}

pub(crate) fn resolve_or_generic(mapper: &dyn ClassMapper, class_name: &str) -> AmfObject {
    match mapper.resolve(class_name) {
        Ok(object) => object,
        Err(err) => {
            warn!(%err, class_name, "Falling back to a generic instance.");
            AmfObject::new(class_name)
        }
    }
}
