//! Tabula Core - Core types for the Tabula embedded table store.
//!
//! This crate provides the foundational, storage-independent pieces:
//!
//! - `TypeTag`: the closed set of field types and the slot each one uses
//! - `ValueCell`: the storage unit for one logical value (scalar or array)
//! - `complex`: vector and color payloads serialized into string cells
//! - `schema`: field definitions, key designation and `SchemaBuilder`
//! - `EnumRegistry`: stably keyed enumerations with renameable labels
//! - `Error`: error types shared by every Tabula crate
//!
//! # Example
//!
//! ```rust
//! use tabula_core::{EnumRegistry, SchemaId, TypeTag, ValueCell};
//! use tabula_core::schema::SchemaBuilder;
//!
//! let mut enums = EnumRegistry::new();
//! let rarity = enums.add_define("Rarity").unwrap();
//! enums.add_value(rarity, "Common").unwrap();
//! enums.add_value(rarity, "Rare").unwrap();
//!
//! let schema = SchemaBuilder::new("Item")
//!     .unwrap()
//!     .add_field("id", TypeTag::Int)
//!     .unwrap()
//!     .add_enum_field("rarity", rarity)
//!     .unwrap()
//!     .key("id")
//!     .unwrap()
//!     .build(SchemaId(1));
//!
//! assert_eq!(schema.key_field().unwrap().name(), "Id");
//! assert_eq!(enums.index_for_key(rarity, 2).unwrap(), 1);
//!
//! let mut cell = ValueCell::default_for(TypeTag::Int, false);
//! cell.set_int(7).unwrap();
//! assert_eq!(cell.as_int().unwrap(), 7);
//! ```

#![no_std]

extern crate alloc;

pub mod complex;
mod enums;
mod error;
mod naming;
pub mod schema;
mod types;
mod value;

pub use complex::{Color, Complex, Vector2, Vector2Int, Vector3, Vector3Int};
pub use enums::{
    EnumDefine, EnumLookup, EnumRegistry, EnumValue, FLAGS_ALL_LABEL, FLAGS_NONE_LABEL,
    MAX_FLAG_KEY, UNDEFINED_LABEL,
};
pub use error::{Error, Result};
pub use naming::normalize_name;
pub use types::{EnumId, FieldId, ObjectKind, SchemaId, SlotKind, TypeTag};
pub use value::{ObjectRef, ValueCell};
