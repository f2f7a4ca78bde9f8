//! Field definitions for Tabula schemas.

use crate::error::{Error, Result};
use crate::types::{EnumId, FieldId, ObjectKind, SchemaId, TypeTag};
use crate::value::ValueCell;
use alloc::format;
use alloc::string::String;
use serde::{Deserialize, Serialize};

/// What an `Enum`, `Flags` or `TableRef` field points at, resolved when the
/// field is defined.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FieldTarget {
    Enum(EnumId),
    Table(SchemaId),
}

/// A field (column) definition.
///
/// `id` never changes once assigned; rows, accessors and generated code all
/// refer to fields by id, never by name or position.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FieldDefinition {
    id: FieldId,
    name: String,
    type_tag: TypeTag,
    is_array: bool,
    enum_ref: Option<EnumId>,
    table_ref: Option<SchemaId>,
    default_value: ValueCell,
}

impl FieldDefinition {
    pub(crate) fn new(
        id: FieldId,
        name: String,
        type_tag: TypeTag,
        is_array: bool,
        target: Option<FieldTarget>,
    ) -> Self {
        let (enum_ref, table_ref) = match target {
            Some(FieldTarget::Enum(e)) => (Some(e), None),
            Some(FieldTarget::Table(t)) => (None, Some(t)),
            None => (None, None),
        };
        Self {
            id,
            name,
            type_tag,
            is_array,
            enum_ref,
            table_ref,
            default_value: ValueCell::default_for(type_tag, is_array),
        }
    }

    #[inline]
    pub fn id(&self) -> FieldId {
        self.id
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn type_tag(&self) -> TypeTag {
        self.type_tag
    }

    #[inline]
    pub fn is_array(&self) -> bool {
        self.is_array
    }

    /// Referenced enum define for `Enum` and `Flags` fields.
    #[inline]
    pub fn enum_ref(&self) -> Option<EnumId> {
        self.enum_ref
    }

    /// Referenced schema for `TableRef` fields.
    #[inline]
    pub fn table_ref(&self) -> Option<SchemaId> {
        self.table_ref
    }

    /// Template cell for new rows. Copy it before storing it anywhere.
    #[inline]
    pub fn default_value(&self) -> &ValueCell {
        &self.default_value
    }

    /// Returns a fresh zero-valued cell of this field's shape.
    pub fn zero_cell(&self) -> ValueCell {
        ValueCell::default_for(self.type_tag, self.is_array)
    }

    /// Checks that `value` can be stored in this field: same slot, exactly one
    /// element for scalar fields, and matching object kinds for object fields.
    pub fn check_value(&self, value: &ValueCell) -> Result<()> {
        let expected = self.type_tag.slot_kind();
        if value.slot_kind() != expected {
            return Err(Error::type_mismatch(expected, value.slot_kind()));
        }
        if !self.is_array && value.size() != 1 {
            return Err(Error::invalid_operation(format!(
                "field {} holds one value, got {}",
                self.name,
                value.size()
            )));
        }
        if let TypeTag::ObjectRef(kind) = self.type_tag {
            if kind != ObjectKind::Any {
                if let Some(bad) = value.objects()?.iter().find(|o| o.kind != kind) {
                    return Err(Error::invalid_operation(format!(
                        "field {} holds {:?} objects, got {:?}",
                        self.name, kind, bad.kind
                    )));
                }
            }
        }
        Ok(())
    }

    pub(crate) fn set_name(&mut self, name: String) {
        self.name = name;
    }

    pub(crate) fn set_default_value(&mut self, value: ValueCell) {
        self.default_value = value;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::ObjectRef;
    use alloc::string::ToString;
    use alloc::vec;

    #[test]
    fn test_field_targets() {
        let f = FieldDefinition::new(
            FieldId(1),
            "Rarity".to_string(),
            TypeTag::Enum,
            false,
            Some(FieldTarget::Enum(EnumId(3))),
        );
        assert_eq!(f.enum_ref(), Some(EnumId(3)));
        assert_eq!(f.table_ref(), None);

        let f = FieldDefinition::new(
            FieldId(2),
            "Owner".to_string(),
            TypeTag::TableRef,
            false,
            Some(FieldTarget::Table(SchemaId(9))),
        );
        assert_eq!(f.table_ref(), Some(SchemaId(9)));
        assert_eq!(f.enum_ref(), None);
    }

    #[test]
    fn test_default_shape() {
        let f = FieldDefinition::new(FieldId(1), "Tags".to_string(), TypeTag::String, true, None);
        assert_eq!(f.default_value().size(), 0);
        assert!(f.default_value().matches_tag(TypeTag::String));
        assert_eq!(f.zero_cell(), *f.default_value());
    }

    #[test]
    fn test_check_value() {
        let hp = FieldDefinition::new(FieldId(1), "Hp".to_string(), TypeTag::Int, false, None);
        assert!(hp.check_value(&ValueCell::Ints(vec![7])).is_ok());
        assert!(matches!(
            hp.check_value(&ValueCell::Ints(vec![])),
            Err(Error::InvalidOperation { .. })
        ));
        assert!(matches!(
            hp.check_value(&ValueCell::Ints(vec![1, 2, 3])),
            Err(Error::InvalidOperation { .. })
        ));
        assert!(matches!(
            hp.check_value(&ValueCell::Floats(vec![1.0])),
            Err(Error::TypeMismatch { .. })
        ));

        let drops = FieldDefinition::new(FieldId(2), "Drops".to_string(), TypeTag::Int, true, None);
        assert!(drops.check_value(&ValueCell::Ints(vec![])).is_ok());
        assert!(drops.check_value(&ValueCell::Ints(vec![1, 2, 3])).is_ok());

        let icon_tag = TypeTag::ObjectRef(ObjectKind::Sprite);
        let icon = FieldDefinition::new(FieldId(3), "Icon".to_string(), icon_tag, false, None);
        let sprite = ValueCell::Objects(vec![ObjectRef::new(ObjectKind::Sprite, "g1")]);
        let sound = ValueCell::Objects(vec![ObjectRef::new(ObjectKind::Audio, "g2")]);
        assert!(icon.check_value(&sprite).is_ok());
        assert!(matches!(icon.check_value(&sound), Err(Error::InvalidOperation { .. })));

        let any_tag = TypeTag::ObjectRef(ObjectKind::Any);
        let any = FieldDefinition::new(FieldId(4), "Asset".to_string(), any_tag, false, None);
        assert!(any.check_value(&sound).is_ok());
    }
}
