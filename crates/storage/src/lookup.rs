//! Resolution of `TableRef` keys to rows.

use crate::TableHandle;
use alloc::vec::Vec;
use tabula_core::{Result, SchemaId};

/// A row inside a specific table.
#[derive(Clone, Debug)]
pub struct RowLocation {
    pub table: TableHandle,
    pub row: usize,
}

impl RowLocation {
    pub fn new(table: TableHandle, row: usize) -> Self {
        Self { table, row }
    }
}

impl PartialEq for RowLocation {
    fn eq(&self, other: &Self) -> bool {
        alloc::rc::Rc::ptr_eq(&self.table, &other.table) && self.row == other.row
    }
}

/// Something that can enumerate the tables bound to a schema.
///
/// Implemented by the editing-side catalog and the runtime index, so that
/// `TableRef` values resolve the same way in both.
pub trait TableLookup {
    /// Returns every table bound to `schema`, in load order.
    fn tables_for_schema(&self, schema: SchemaId) -> Vec<TableHandle>;

    /// Finds the first row whose key equals `key` across the tables bound to
    /// `schema`. Tables are scanned in load order.
    fn find_by_key(&self, schema: SchemaId, key: &str) -> Result<Option<RowLocation>> {
        for table in self.tables_for_schema(schema) {
            let found = table.borrow().find_row_by_key(key)?;
            if let Some(row) = found {
                return Ok(Some(RowLocation::new(table, row)));
            }
        }
        Ok(None)
    }
}
