//! Tabula Runtime - Typed record access for the Tabula embedded table store.
//!
//! This crate is the read side used by the host application:
//!
//! - `RowAccessor`: typed getters and setters over one row of a row store
//! - `Record`, `Keyed`, `IntKeyed`, `StringKeyed`: the contract record types
//!   (usually generated from a schema) implement
//! - `RuntimeIndex`: loads tables into per-type record lists and answers key
//!   lookups over them
//!
//! # Example
//!
//! ```rust
//! use std::cell::RefCell;
//! use std::rc::Rc;
//! use tabula_core::schema::SchemaBuilder;
//! use tabula_core::{FieldId, SchemaId, TypeTag};
//! use tabula_runtime::{Keyed, Record, RowAccessor, RuntimeIndex};
//! use tabula_storage::RowStore;
//!
//! struct Item(RowAccessor);
//!
//! impl Record for Item {
//!     const CLASS_NAME: &'static str = "Item";
//!     fn bind(accessor: RowAccessor) -> Self {
//!         Item(accessor)
//!     }
//!     fn accessor(&self) -> &RowAccessor {
//!         &self.0
//!     }
//! }
//!
//! impl Keyed for Item {
//!     type Key = i32;
//! }
//!
//! let schema = SchemaBuilder::new("Item")
//!     .unwrap()
//!     .add_field("id", TypeTag::Int)
//!     .unwrap()
//!     .key("id")
//!     .unwrap()
//!     .auto_increment(true)
//!     .build(SchemaId(1));
//! let mut store = RowStore::new("Items", Rc::new(RefCell::new(schema)));
//! store.add_row(None).unwrap();
//! store.add_row(None).unwrap();
//!
//! let mut index = RuntimeIndex::new();
//! index.register::<Item>();
//! index.set_data(&[Rc::new(RefCell::new(store))]).unwrap();
//!
//! let item = index.find::<Item>(2).unwrap().unwrap();
//! assert_eq!(item.accessor().int(FieldId(1)).unwrap(), 2);
//! assert!(index.find::<Item>(3).unwrap().is_none());
//! ```

#![no_std]

extern crate alloc;

pub mod accessor;
pub mod index;
pub mod record;

pub use accessor::{EnumBinding, RowAccessor};
pub use index::RuntimeIndex;
pub use record::{IntKeyed, Keyed, Record, RecordKey, StringKeyed};
