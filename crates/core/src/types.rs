//! Type tags and identifiers for Tabula schemas.
//!
//! A field's `TypeTag` fully determines which storage slot its value cells use,
//! so the tag is the single source of truth for reads, writes and defaults.

use core::fmt;
use serde::{Deserialize, Serialize};

/// Stable identifier of a field inside one schema. Never reused.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FieldId(pub u32);

/// Stable identifier of a schema inside a catalog.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SchemaId(pub u32);

/// Stable identifier of an enum define inside an enum registry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EnumId(pub u32);

impl fmt::Display for FieldId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "field#{}", self.0)
    }
}

impl fmt::Display for SchemaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "schema#{}", self.0)
    }
}

impl fmt::Display for EnumId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "enum#{}", self.0)
    }
}

/// Kind of host object an object reference points at.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ObjectKind {
    Sprite,
    Entity,
    Audio,
    Any,
}

/// Logical type of a field.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TypeTag {
    /// UTF-8 string
    String,
    /// 32-bit signed integer
    Int,
    /// 32-bit float
    Float,
    /// Boolean
    Bool,
    /// Single value of an enum define, stored as the value's stable key
    Enum,
    /// Bit set over an enum define's values
    Flags,
    /// Opaque reference to a host object
    ObjectRef(ObjectKind),
    /// Two float components, serialized into the string slot
    Vector2,
    /// Three float components, serialized into the string slot
    Vector3,
    /// Two integer components, serialized into the string slot
    Vector2Int,
    /// Three integer components, serialized into the string slot
    Vector3Int,
    /// RGBA color, serialized into the string slot
    Color,
    /// Key of a row in another table, resolved at read time
    TableRef,
}

/// The storage slot a value cell uses.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SlotKind {
    Strings,
    Ints,
    Floats,
    Bools,
    Objects,
}

impl TypeTag {
    /// Returns the slot a cell of this type is stored in.
    pub fn slot_kind(&self) -> SlotKind {
        match self {
            TypeTag::String
            | TypeTag::Vector2
            | TypeTag::Vector3
            | TypeTag::Vector2Int
            | TypeTag::Vector3Int
            | TypeTag::Color
            | TypeTag::TableRef => SlotKind::Strings,
            TypeTag::Int | TypeTag::Enum | TypeTag::Flags => SlotKind::Ints,
            TypeTag::Float => SlotKind::Floats,
            TypeTag::Bool => SlotKind::Bools,
            TypeTag::ObjectRef(_) => SlotKind::Objects,
        }
    }

    /// Returns whether values of this type are serialized into the string slot.
    pub fn is_complex(&self) -> bool {
        matches!(
            self,
            TypeTag::Vector2
                | TypeTag::Vector3
                | TypeTag::Vector2Int
                | TypeTag::Vector3Int
                | TypeTag::Color
        )
    }

    /// Returns whether a field of this type may be designated as the key.
    pub fn can_be_key(&self) -> bool {
        matches!(self, TypeTag::Int | TypeTag::String | TypeTag::Enum)
    }

    /// Returns whether this type carries an enum reference.
    pub fn needs_enum(&self) -> bool {
        matches!(self, TypeTag::Enum | TypeTag::Flags)
    }

    /// Returns whether this type carries a referenced table.
    pub fn needs_table(&self) -> bool {
        matches!(self, TypeTag::TableRef)
    }
}

impl fmt::Display for SlotKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SlotKind::Strings => "strings",
            SlotKind::Ints => "ints",
            SlotKind::Floats => "floats",
            SlotKind::Bools => "bools",
            SlotKind::Objects => "objects",
        };
        f.write_str(name)
    }
}
