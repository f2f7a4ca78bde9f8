//! Tabula Storage - Storage layer for the Tabula embedded table store.
//!
//! This crate provides the storage layer including:
//!
//! - `RowStore`: column-oriented row storage bound to one schema
//! - `Catalog`: schemas, their bound row stores and the enum registry, with
//!   every schema edit propagated to the stores
//! - `ExtendSource`: externally owned array columns kept row-aligned
//! - `TableLookup`: key-based resolution of `TableRef` values across tables
//!
//! # Example
//!
//! ```rust
//! use tabula_storage::Catalog;
//! use tabula_core::TypeTag;
//!
//! let mut catalog = Catalog::new();
//! let schema = catalog.create_schema("Item").unwrap();
//! let id = schema.borrow().id();
//! let key = catalog.add_field(id, "id", TypeTag::Int, false, None).unwrap();
//! catalog.set_key(id, key).unwrap();
//! schema.borrow_mut().set_auto_increment(true);
//!
//! let table = catalog.create_table("Weapons", id).unwrap();
//! table.borrow_mut().add_row(None).unwrap();
//! table.borrow_mut().add_row(None).unwrap();
//!
//! let name = catalog.add_field(id, "name", TypeTag::String, false, None).unwrap();
//! assert_eq!(table.borrow().row_count(), 2);
//! assert_eq!(table.borrow().cell(name, 1).unwrap().as_str().unwrap(), "");
//! assert_eq!(table.borrow().max_key().unwrap(), 2);
//! ```

#![no_std]

extern crate alloc;

use alloc::rc::Rc;
use core::cell::RefCell;
use tabula_core::schema::Schema;
use tabula_core::EnumRegistry;

pub mod catalog;
pub mod extend;
pub mod lookup;
pub mod row_store;

pub use catalog::Catalog;
pub use extend::{ArrayColumns, ExtendSource};
pub use lookup::{RowLocation, TableLookup};
pub use row_store::{move_order, RowStore};

/// Shared handle to a schema. Many row stores may be bound to one schema.
pub type SchemaHandle = Rc<RefCell<Schema>>;

/// Shared handle to a row store.
pub type TableHandle = Rc<RefCell<RowStore>>;

/// Shared handle to an enum registry.
pub type EnumHandle = Rc<RefCell<EnumRegistry>>;
