//! RuntimeIndex - keyed lookup over loaded tables.
//!
//! This module provides the `RuntimeIndex` struct: an explicit, host-owned
//! store that materializes every row of the loaded tables as a record of the
//! type registered for the table's schema, and answers key lookups over them.
//!
//! The index is unloaded until the first `set_data` or `set_enum` call and
//! stays loaded until `reset`. Loading is additive.

use crate::accessor::{EnumBinding, RowAccessor};
use crate::record::{Keyed, Record};
use alloc::boxed::Box;
use alloc::rc::Rc;
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use core::any::{Any, TypeId};
use hashbrown::HashMap;
use tabula_core::{Result, SchemaId};
use tabula_storage::{EnumHandle, TableHandle, TableLookup};

/// Type-erased operations on one record type's bucket (`Vec<T>`).
struct Factory {
    type_id: TypeId,
    new_bucket: fn() -> Box<dyn Any>,
    push: fn(&mut dyn Any, RowAccessor),
    drop_table: fn(&mut dyn Any, &TableHandle) -> usize,
    len: fn(&dyn Any) -> usize,
}

impl Factory {
    fn of<T: Record>() -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            new_bucket: new_bucket::<T>,
            push: push_record::<T>,
            drop_table: drop_table_records::<T>,
            len: bucket_len::<T>,
        }
    }
}

fn new_bucket<T: Record>() -> Box<dyn Any> {
    Box::new(Vec::<T>::new())
}

fn push_record<T: Record>(bucket: &mut dyn Any, accessor: RowAccessor) {
    if let Some(records) = bucket.downcast_mut::<Vec<T>>() {
        records.push(T::bind(accessor));
    }
}

fn drop_table_records<T: Record>(bucket: &mut dyn Any, table: &TableHandle) -> usize {
    match bucket.downcast_mut::<Vec<T>>() {
        Some(records) => {
            let before = records.len();
            records.retain(|r| !Rc::ptr_eq(r.accessor().table(), table));
            before - records.len()
        }
        None => 0,
    }
}

fn bucket_len<T: Record>(bucket: &dyn Any) -> usize {
    bucket.downcast_ref::<Vec<T>>().map_or(0, Vec::len)
}

/// Keyed lookup over loaded tables.
pub struct RuntimeIndex {
    /// Schema class name → record factory.
    factories: HashMap<String, Factory>,
    /// Record type → `Vec<T>` of loaded records.
    buckets: HashMap<TypeId, Box<dyn Any>>,
    /// Loaded tables in load order, without duplicates.
    tables: Vec<TableHandle>,
    enums: EnumBinding,
    loaded: bool,
}

impl RuntimeIndex {
    /// Creates an unloaded index with no registered record types.
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
            buckets: HashMap::new(),
            tables: Vec::new(),
            enums: EnumBinding::new(),
            loaded: false,
        }
    }

    /// Registers `T` as the record type for schemas named `T::CLASS_NAME`.
    ///
    /// Registering another type under the same class name replaces the
    /// previous factory; records already loaded are kept.
    pub fn register<T: Record>(&mut self) -> &mut Self {
        self.factories
            .insert(T::CLASS_NAME.to_string(), Factory::of::<T>());
        self
    }

    /// Returns whether a record type is registered for `class_name`.
    pub fn is_registered(&self, class_name: &str) -> bool {
        self.factories.contains_key(class_name)
    }

    /// Loads every row of `tables` as records of the registered types.
    ///
    /// Repeated calls accumulate; loading the same table twice yields two
    /// records per row. Tables whose schema has no registered type are skipped.
    /// Returns the number of records created.
    pub fn set_data(&mut self, tables: &[TableHandle]) -> Result<usize> {
        let mut created = 0;
        let mut skipped = 0;
        for table in tables {
            let (class_name, rows) = {
                let store = table.borrow();
                store.check_rectangular()?;
                (store.schema_name(), store.row_count())
            };
            let factory = match self.factories.get(&class_name) {
                Some(factory) => factory,
                None => {
                    tracing::warn!(class = %class_name, table = %table.borrow().name(), "no record type registered, table skipped");
                    skipped += 1;
                    continue;
                }
            };
            let bucket = self
                .buckets
                .entry(factory.type_id)
                .or_insert_with(factory.new_bucket);
            for row in 0..rows {
                (factory.push)(
                    &mut **bucket,
                    RowAccessor::with_enums(table.clone(), row, self.enums.clone()),
                );
            }
            created += rows;
            if !self.tables.iter().any(|t| Rc::ptr_eq(t, table)) {
                self.tables.push(table.clone());
            }
        }
        self.loaded = true;
        tracing::info!(tables = tables.len(), skipped, records = created, "runtime data loaded");
        Ok(created)
    }

    /// Binds the enum registry used by every record, loaded or not yet loaded.
    pub fn set_enum(&mut self, enums: EnumHandle) {
        let defines = enums.borrow().defines().len();
        self.enums.set(enums);
        self.loaded = true;
        tracing::info!(defines, "runtime enums bound");
    }

    /// Returns the bound enum registry.
    pub fn enums(&self) -> Option<EnumHandle> {
        self.enums.get()
    }

    /// Removes every record that reads from one of `tables`.
    ///
    /// Tables are matched by handle identity. Returns the number of records
    /// removed.
    pub fn remove_data(&mut self, tables: &[TableHandle]) -> usize {
        let mut removed = 0;
        for table in tables {
            for factory in self.factories.values() {
                if let Some(bucket) = self.buckets.get_mut(&factory.type_id) {
                    removed += (factory.drop_table)(&mut **bucket, table);
                }
            }
            self.tables.retain(|t| !Rc::ptr_eq(t, table));
        }
        tracing::info!(tables = tables.len(), records = removed, "runtime data removed");
        removed
    }

    /// Drops every record, loaded table and the enum binding.
    ///
    /// Registered record types are kept. Records handed out earlier keep the
    /// registry they were created with.
    pub fn reset(&mut self) {
        self.buckets.clear();
        self.tables.clear();
        self.enums = EnumBinding::new();
        self.loaded = false;
    }

    /// Returns whether `set_data` or `set_enum` has been called since creation
    /// or the last `reset`.
    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    /// Returns the total number of loaded records.
    pub fn len(&self) -> usize {
        self.factories
            .values()
            .filter_map(|f| self.buckets.get(&f.type_id).map(|b| (f.len)(&**b)))
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the loaded tables in load order.
    pub fn tables(&self) -> &[TableHandle] {
        &self.tables
    }

    /// Returns every loaded record of type `T`, or an empty slice.
    pub fn all<T: Record>(&self) -> &[T] {
        self.buckets
            .get(&TypeId::of::<T>())
            .and_then(|b| b.downcast_ref::<Vec<T>>())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Returns the first loaded record of type `T` whose key equals `key`.
    ///
    /// Linear scan in load order.
    pub fn find<T: Keyed>(&self, key: impl Into<T::Key>) -> Result<Option<&T>> {
        let key = key.into();
        for record in self.all::<T>() {
            if record.key()? == key {
                return Ok(Some(record));
            }
        }
        Ok(None)
    }

    /// Returns every loaded record of type `T` whose key is in `keys`, in load
    /// order.
    pub fn find_many<T: Keyed>(&self, keys: &[T::Key]) -> Result<Vec<&T>> {
        let mut found = Vec::new();
        for record in self.all::<T>() {
            if keys.contains(&record.key()?) {
                found.push(record);
            }
        }
        Ok(found)
    }
}

impl Default for RuntimeIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl TableLookup for RuntimeIndex {
    fn tables_for_schema(&self, schema: SchemaId) -> Vec<TableHandle> {
        self.tables
            .iter()
            .filter(|t| t.borrow().schema_id() == schema)
            .cloned()
            .collect()
    }
}
