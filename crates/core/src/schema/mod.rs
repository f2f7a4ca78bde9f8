//! Schema module for Tabula.
//!
//! A schema is the mutable description of a table's shape: ordered field
//! definitions, default values and the key designation.

mod field;
mod table;

pub use field::{FieldDefinition, FieldTarget};
pub use table::{Schema, SchemaBuilder};
