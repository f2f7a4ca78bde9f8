//! Catalog management for Tabula.
//!
//! This module provides the `Catalog` struct which owns the schemas, the row
//! stores bound to them and the enum registry, and keeps them consistent: every
//! schema edit is propagated to each bound store, and removals cascade across
//! schemas.

use crate::lookup::TableLookup;
use crate::row_store::RowStore;
use crate::{EnumHandle, SchemaHandle, TableHandle};
use alloc::collections::BTreeMap;
use alloc::format;
use alloc::rc::Rc;
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use core::cell::RefCell;
use tabula_core::schema::{FieldTarget, Schema};
use tabula_core::{EnumId, EnumRegistry, Error, FieldId, Result, SchemaId, TypeTag, ValueCell};

/// Owner of schemas, their row stores and the enum registry.
pub struct Catalog {
    enums: EnumHandle,
    schemas: BTreeMap<SchemaId, SchemaHandle>,
    /// Tables in creation order.
    tables: Vec<TableHandle>,
    next_schema_id: u32,
}

impl Catalog {
    /// Creates an empty catalog with an empty enum registry.
    pub fn new() -> Self {
        Self::with_enums(Rc::new(RefCell::new(EnumRegistry::new())))
    }

    /// Creates an empty catalog around an existing enum registry.
    pub fn with_enums(enums: EnumHandle) -> Self {
        Self {
            enums,
            schemas: BTreeMap::new(),
            tables: Vec::new(),
            next_schema_id: 1,
        }
    }

    /// Returns the shared enum registry.
    pub fn enums(&self) -> EnumHandle {
        self.enums.clone()
    }

    // --- schemas ---

    fn check_schema_name(&self, name: &str, ignore: Option<SchemaId>) -> Result<String> {
        let name = tabula_core::normalize_name(name)?;
        if self
            .schemas
            .iter()
            .any(|(id, s)| s.borrow().name() == name && Some(*id) != ignore)
        {
            return Err(Error::duplicate_name(name));
        }
        Ok(name)
    }

    /// Creates an empty schema and returns its handle.
    pub fn create_schema(&mut self, name: &str) -> Result<SchemaHandle> {
        let name = self.check_schema_name(name, None)?;
        let id = SchemaId(self.next_schema_id);
        let schema = Schema::new(id, &name)?;
        self.insert_schema(schema)
    }

    /// Adds a schema built elsewhere, typically by `SchemaBuilder`.
    ///
    /// The schema's id must be nonzero and unused, and its name unique. Enum
    /// and table targets of its fields must exist in this catalog.
    pub fn add_schema(&mut self, schema: Schema) -> Result<SchemaHandle> {
        if schema.id().0 == 0 || self.schemas.contains_key(&schema.id()) {
            return Err(Error::invalid_operation(format!(
                "schema id {} is unavailable",
                schema.id()
            )));
        }
        self.check_schema_name(schema.name(), None)?;
        for field in schema.fields() {
            self.check_target(field.type_tag(), target_of(field.enum_ref(), field.table_ref()), Some(schema.id()))?;
        }
        self.insert_schema(schema)
    }

    fn insert_schema(&mut self, schema: Schema) -> Result<SchemaHandle> {
        let id = schema.id();
        tracing::debug!(schema = %schema.name(), id = id.0, "schema added");
        let handle = Rc::new(RefCell::new(schema));
        self.schemas.insert(id, handle.clone());
        self.next_schema_id = self.next_schema_id.max(id.0 + 1);
        Ok(handle)
    }

    /// Gets a schema by id.
    pub fn schema(&self, id: SchemaId) -> Option<SchemaHandle> {
        self.schemas.get(&id).cloned()
    }

    /// Gets a schema by class name.
    pub fn schema_by_name(&self, name: &str) -> Option<SchemaHandle> {
        self.schemas
            .values()
            .find(|s| s.borrow().name() == name)
            .cloned()
    }

    fn require_schema(&self, id: SchemaId) -> Result<SchemaHandle> {
        self.schema(id).ok_or_else(|| Error::schema_id_not_found(id))
    }

    /// Returns all schemas ordered by id.
    pub fn schemas(&self) -> Vec<SchemaHandle> {
        self.schemas.values().cloned().collect()
    }

    /// Returns the number of schemas.
    pub fn schema_count(&self) -> usize {
        self.schemas.len()
    }

    /// Renames a schema. Class names are unique within the catalog.
    pub fn rename_schema(&mut self, id: SchemaId, new_name: &str) -> Result<()> {
        let name = self.check_schema_name(new_name, Some(id))?;
        self.require_schema(id)?.borrow_mut().rename(&name)
    }

    /// Drops a schema, its bound tables, and every `TableRef` field in other
    /// schemas that targets it.
    pub fn drop_schema(&mut self, id: SchemaId) -> Result<()> {
        let schema = self.require_schema(id)?;
        let bound = self.tables_for(id);
        self.tables.retain(|t| !bound.iter().any(|b| Rc::ptr_eq(b, t)));
        self.schemas.remove(&id);

        let referencing: Vec<(SchemaId, Vec<FieldId>)> = self
            .schemas
            .iter()
            .map(|(sid, s)| (*sid, s.borrow().fields_referencing_table(id)))
            .filter(|(_, fields)| !fields.is_empty())
            .collect();
        for (sid, fields) in referencing {
            for field in fields {
                self.remove_field(sid, field)?;
            }
        }
        tracing::debug!(schema = %schema.borrow().name(), tables = bound.len(), "schema dropped");
        Ok(())
    }

    // --- tables ---

    /// Creates an empty table bound to `schema`.
    pub fn create_table(&mut self, name: &str, schema: SchemaId) -> Result<TableHandle> {
        let schema = self.require_schema(schema)?;
        if self.table(name).is_some() {
            return Err(Error::duplicate_name(name));
        }
        let handle = Rc::new(RefCell::new(RowStore::new(name, schema)));
        self.tables.push(handle.clone());
        Ok(handle)
    }

    /// Adds an existing table. Its schema must belong to this catalog.
    pub fn add_table(&mut self, table: TableHandle) -> Result<()> {
        let (name, schema) = {
            let store = table.borrow();
            (store.name().to_string(), store.schema())
        };
        let id = schema.borrow().id();
        match self.schemas.get(&id) {
            Some(own) if Rc::ptr_eq(own, &schema) => {}
            _ => return Err(Error::schema_id_not_found(id)),
        }
        if self.table(&name).is_some() {
            return Err(Error::duplicate_name(name));
        }
        table.borrow().check_rectangular()?;
        self.tables.push(table);
        Ok(())
    }

    /// Removes a table from the catalog.
    pub fn drop_table(&mut self, name: &str) -> Result<TableHandle> {
        let pos = self
            .tables
            .iter()
            .position(|t| t.borrow().name() == name)
            .ok_or_else(|| Error::table_not_found(name))?;
        Ok(self.tables.remove(pos))
    }

    /// Gets a table by name.
    pub fn table(&self, name: &str) -> Option<TableHandle> {
        self.tables
            .iter()
            .find(|t| t.borrow().name() == name)
            .cloned()
    }

    /// Returns all tables in creation order.
    pub fn tables(&self) -> &[TableHandle] {
        &self.tables
    }

    /// Returns the tables bound to `schema` in creation order.
    pub fn tables_for(&self, schema: SchemaId) -> Vec<TableHandle> {
        self.tables
            .iter()
            .filter(|t| t.borrow().schema_id() == schema)
            .cloned()
            .collect()
    }

    /// Returns the total row count across all tables.
    pub fn total_row_count(&self) -> usize {
        self.tables.iter().map(|t| t.borrow().row_count()).sum()
    }

    /// Verifies every table against its schema.
    pub fn check_consistency(&self) -> Result<()> {
        for table in &self.tables {
            table.borrow().check_rectangular()?;
        }
        Ok(())
    }

    // --- fields ---

    fn check_target(
        &self,
        type_tag: TypeTag,
        target: Option<FieldTarget>,
        own: Option<SchemaId>,
    ) -> Result<()> {
        match target {
            Some(FieldTarget::Enum(define)) => {
                if self.enums.borrow().define(define).is_none() {
                    return Err(Error::EnumNotFound { define });
                }
            }
            Some(FieldTarget::Table(schema)) => {
                if Some(schema) != own && !self.schemas.contains_key(&schema) {
                    return Err(Error::schema_id_not_found(schema));
                }
            }
            None => {}
        }
        if (type_tag.needs_enum() || type_tag.needs_table()) && target.is_none() {
            return Err(Error::invalid_operation(format!(
                "{:?} fields need a target",
                type_tag
            )));
        }
        Ok(())
    }

    /// Adds a field to a schema and a column to every table bound to it.
    ///
    /// Existing rows receive a fresh copy of the field default.
    pub fn add_field(
        &mut self,
        schema: SchemaId,
        name: &str,
        type_tag: TypeTag,
        is_array: bool,
        target: Option<FieldTarget>,
    ) -> Result<FieldId> {
        let handle = self.require_schema(schema)?;
        self.check_target(type_tag, target, Some(schema))?;
        let field = handle.borrow_mut().add_field(name, type_tag, is_array, target)?;
        for table in self.tables_for(schema) {
            let mut store = table.borrow_mut();
            store.add_field(field)?;
            store.mark_dirty();
        }
        Ok(field)
    }

    /// Adds a field whose enum or table target is given by name.
    ///
    /// `Enum` and `Flags` resolve `target` against enum define names,
    /// `TableRef` against schema class names.
    pub fn add_field_with_target(
        &mut self,
        schema: SchemaId,
        name: &str,
        type_tag: TypeTag,
        is_array: bool,
        target: Option<&str>,
    ) -> Result<FieldId> {
        let resolved = match target {
            Some(target) => Some(self.resolve_target(type_tag, target)?),
            None => None,
        };
        self.add_field(schema, name, type_tag, is_array, resolved)
    }

    /// Resolves a target name for a field of `type_tag`.
    pub fn resolve_target(&self, type_tag: TypeTag, target: &str) -> Result<FieldTarget> {
        if type_tag.needs_enum() {
            let enums = self.enums.borrow();
            let define = enums.define_by_name(target).ok_or_else(|| {
                Error::invalid_operation(format!("Enum not found: {}", target))
            })?;
            Ok(FieldTarget::Enum(define.id()))
        } else if type_tag.needs_table() {
            let schema = self
                .schema_by_name(target)
                .ok_or_else(|| Error::schema_not_found(target))?;
            let id = schema.borrow().id();
            Ok(FieldTarget::Table(id))
        } else {
            Err(Error::invalid_operation(format!(
                "{:?} fields take no target",
                type_tag
            )))
        }
    }

    /// Removes a field from a schema and its column from every bound table.
    ///
    /// Removing the key field clears the key designation.
    pub fn remove_field(&mut self, schema: SchemaId, field: FieldId) -> Result<()> {
        let handle = self.require_schema(schema)?;
        handle.borrow_mut().remove_field(field)?;
        for table in self.tables_for(schema) {
            table.borrow_mut().remove_field(field);
        }
        Ok(())
    }

    /// Renames a field. Ids and stored data are unaffected.
    pub fn rename_field(&mut self, schema: SchemaId, field: FieldId, new_name: &str) -> Result<()> {
        self.require_schema(schema)?
            .borrow_mut()
            .rename_field(field, new_name)
    }

    /// Moves a field to a new display position.
    pub fn move_field(&mut self, schema: SchemaId, field: FieldId, to_index: usize) -> Result<()> {
        self.require_schema(schema)?
            .borrow_mut()
            .move_field(field, to_index)
    }

    /// Toggles the key designation of a schema.
    pub fn set_key(&mut self, schema: SchemaId, field: FieldId) -> Result<Option<FieldId>> {
        self.require_schema(schema)?.borrow_mut().set_key(field)
    }

    /// Replaces a field default and, if `broadcast` is set, overwrites that
    /// field in every row of every bound table.
    pub fn update_default_value(
        &mut self,
        schema: SchemaId,
        field: FieldId,
        value: ValueCell,
        broadcast: bool,
    ) -> Result<()> {
        self.require_schema(schema)?
            .borrow_mut()
            .update_default_value(field, value)?;
        if broadcast {
            for table in self.tables_for(schema) {
                table.borrow_mut().update_default(field)?;
            }
        }
        Ok(())
    }

    // --- enums ---

    /// Adds an enum define.
    pub fn add_enum_define(&mut self, name: &str) -> Result<EnumId> {
        self.enums.borrow_mut().add_define(name)
    }

    /// Removes an enum define and every field, in any schema, that uses it.
    pub fn remove_enum_define(&mut self, define: EnumId) -> Result<()> {
        if self.enums.borrow().define(define).is_none() {
            return Err(Error::EnumNotFound { define });
        }
        let referencing: Vec<(SchemaId, Vec<FieldId>)> = self
            .schemas
            .iter()
            .map(|(sid, s)| (*sid, s.borrow().fields_referencing_enum(define)))
            .filter(|(_, fields)| !fields.is_empty())
            .collect();
        let mut removed = 0usize;
        for (sid, fields) in referencing {
            for field in fields {
                self.remove_field(sid, field)?;
                removed += 1;
            }
        }
        self.enums.borrow_mut().remove_define(define)?;
        tracing::debug!(define = define.0, fields = removed, "enum define cascade");
        Ok(())
    }

    // --- dirty state ---

    /// Returns whether any schema, table or the enum registry changed.
    pub fn is_dirty(&self) -> bool {
        self.enums.borrow().is_dirty()
            || self.schemas.values().any(|s| s.borrow().is_dirty())
            || self.tables.iter().any(|t| t.borrow().is_dirty())
    }

    /// Clears dirty state everywhere, typically after the host saved.
    pub fn clear_dirty(&mut self) {
        self.enums.borrow_mut().clear_dirty();
        for schema in self.schemas.values() {
            schema.borrow_mut().clear_dirty();
        }
        for table in &self.tables {
            table.borrow_mut().clear_dirty();
        }
    }
}

fn target_of(enum_ref: Option<EnumId>, table_ref: Option<SchemaId>) -> Option<FieldTarget> {
    enum_ref
        .map(FieldTarget::Enum)
        .or_else(|| table_ref.map(FieldTarget::Table))
}

impl Default for Catalog {
    fn default() -> Self {
        Self::new()
    }
}

impl TableLookup for Catalog {
    fn tables_for_schema(&self, schema: SchemaId) -> Vec<TableHandle> {
        self.tables_for(schema)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;
    use tabula_core::schema::SchemaBuilder;

    fn item_catalog() -> (Catalog, SchemaId) {
        let mut catalog = Catalog::new();
        let schema = catalog.create_schema("item").unwrap();
        let id = schema.borrow().id();
        catalog.add_field(id, "id", TypeTag::Int, false, None).unwrap();
        catalog.add_field(id, "name", TypeTag::String, false, None).unwrap();
        catalog.set_key(id, FieldId(1)).unwrap();
        (catalog, id)
    }

    #[test]
    fn test_create_schema() {
        let (catalog, id) = item_catalog();
        assert_eq!(id, SchemaId(1));
        let schema = catalog.schema_by_name("Item").unwrap();
        assert_eq!(schema.borrow().fields().len(), 2);
        assert_eq!(catalog.schema_count(), 1);
    }

    #[test]
    fn test_duplicate_schema_name() {
        let (mut catalog, _) = item_catalog();
        assert!(matches!(
            catalog.create_schema("Item").unwrap_err(),
            Error::DuplicateName { .. }
        ));
        assert!(matches!(
            catalog.create_schema("9lives").unwrap_err(),
            Error::InvalidName { .. }
        ));
        assert_eq!(catalog.schema_count(), 1);
    }

    #[test]
    fn test_add_schema_from_builder() {
        let mut catalog = Catalog::new();
        let schema = SchemaBuilder::new("Monster")
            .unwrap()
            .add_field("id", TypeTag::Int)
            .unwrap()
            .build(SchemaId(7));
        catalog.add_schema(schema.clone()).unwrap();
        assert!(catalog.add_schema(schema).is_err());
        // next generated id continues after the highest known one
        let next = catalog.create_schema("Npc").unwrap();
        assert_eq!(next.borrow().id(), SchemaId(8));
    }

    #[test]
    fn test_add_schema_checks_targets() {
        let mut catalog = Catalog::new();
        let schema = SchemaBuilder::new("Monster")
            .unwrap()
            .add_enum_field("kind", EnumId(4))
            .unwrap()
            .build(SchemaId(1));
        assert!(matches!(
            catalog.add_schema(schema).unwrap_err(),
            Error::EnumNotFound { .. }
        ));
    }

    #[test]
    fn test_add_field_propagates() {
        let (mut catalog, id) = item_catalog();
        let a = catalog.create_table("Weapons", id).unwrap();
        let b = catalog.create_table("Armors", id).unwrap();
        a.borrow_mut().add_row(None).unwrap();
        a.borrow_mut().add_row(None).unwrap();

        let hp = catalog.add_field(id, "hp", TypeTag::Int, false, None).unwrap();
        assert_eq!(a.borrow().cell(hp, 1).unwrap().as_int().unwrap(), 0);
        assert!(b.borrow().has_column(hp));
        catalog.check_consistency().unwrap();

        assert_eq!(catalog.total_row_count(), 2);
        b.borrow_mut().add_row(None).unwrap();
        assert_eq!(catalog.total_row_count(), 3);
    }

    #[test]
    fn test_remove_key_field_cascade() {
        let (mut catalog, id) = item_catalog();
        let table = catalog.create_table("Weapons", id).unwrap();
        table.borrow_mut().add_row(None).unwrap();

        catalog.remove_field(id, FieldId(1)).unwrap();
        assert!(!table.borrow().has_column(FieldId(1)));
        assert!(catalog.schema(id).unwrap().borrow().key_field().is_none());
        catalog.check_consistency().unwrap();
    }

    #[test]
    fn test_rename_round_trip_keeps_data() {
        let (mut catalog, id) = item_catalog();
        let table = catalog.create_table("Weapons", id).unwrap();
        table.borrow_mut().add_row(None).unwrap();
        table
            .borrow_mut()
            .cell_mut(FieldId(2), 0)
            .unwrap()
            .set_string("Sword")
            .unwrap();

        catalog.rename_field(id, FieldId(2), "title").unwrap();
        catalog.rename_field(id, FieldId(2), "name").unwrap();
        assert_eq!(
            table.borrow().cell(FieldId(2), 0).unwrap().as_str().unwrap(),
            "Sword"
        );
    }

    #[test]
    fn test_update_default_broadcast() {
        let (mut catalog, id) = item_catalog();
        let table = catalog.create_table("Weapons", id).unwrap();
        table.borrow_mut().add_row(None).unwrap();

        catalog
            .update_default_value(id, FieldId(2), ValueCell::from_string("Unnamed"), false)
            .unwrap();
        assert_eq!(table.borrow().cell(FieldId(2), 0).unwrap().as_str().unwrap(), "");

        catalog
            .update_default_value(id, FieldId(2), ValueCell::from_string("Unnamed"), true)
            .unwrap();
        assert_eq!(
            table.borrow().cell(FieldId(2), 0).unwrap().as_str().unwrap(),
            "Unnamed"
        );
    }

    #[test]
    fn test_enum_define_cascade() {
        let (mut catalog, id) = item_catalog();
        let rarity = catalog.add_enum_define("Rarity").unwrap();
        let field = catalog
            .add_field_with_target(id, "rarity", TypeTag::Enum, false, Some("Rarity"))
            .unwrap();
        let table = catalog.create_table("Weapons", id).unwrap();
        table.borrow_mut().add_row(None).unwrap();
        assert!(table.borrow().has_column(field));

        catalog.remove_enum_define(rarity).unwrap();
        assert!(catalog.schema(id).unwrap().borrow().field(field).is_none());
        assert!(!table.borrow().has_column(field));
        assert!(catalog.enums().borrow().define(rarity).is_none());
        catalog.check_consistency().unwrap();
    }

    #[test]
    fn test_target_resolution() {
        let (mut catalog, id) = item_catalog();
        assert!(catalog
            .add_field_with_target(id, "kind", TypeTag::Enum, false, Some("Missing"))
            .is_err());
        assert!(catalog
            .add_field_with_target(id, "kind", TypeTag::Enum, false, None)
            .is_err());
        assert!(catalog
            .add_field_with_target(id, "owner", TypeTag::TableRef, false, Some("Nobody"))
            .is_err());
        let owner = catalog
            .add_field_with_target(id, "parent", TypeTag::TableRef, false, Some("Item"))
            .unwrap();
        let schema = catalog.schema(id).unwrap();
        assert_eq!(schema.borrow().field(owner).unwrap().table_ref(), Some(id));
    }

    #[test]
    fn test_drop_schema_cascade() {
        let (mut catalog, item) = item_catalog();
        let shop = catalog.create_schema("Shop").unwrap();
        let shop_id = shop.borrow().id();
        let sells = catalog
            .add_field(shop_id, "sells", TypeTag::TableRef, false, Some(FieldTarget::Table(item)))
            .unwrap();
        catalog.create_table("Weapons", item).unwrap();
        let shops = catalog.create_table("Shops", shop_id).unwrap();

        catalog.drop_schema(item).unwrap();
        assert!(catalog.schema(item).is_none());
        assert!(catalog.table("Weapons").is_none());
        assert!(!shops.borrow().has_column(sells));
        assert!(shop.borrow().field(sells).is_none());
        catalog.check_consistency().unwrap();
    }

    #[test]
    fn test_tables() {
        let (mut catalog, id) = item_catalog();
        catalog.create_table("Weapons", id).unwrap();
        assert!(catalog.create_table("Weapons", id).is_err());
        assert!(catalog.create_table("Other", SchemaId(42)).is_err());
        catalog.create_table("Armors", id).unwrap();

        let names: Vec<String> = catalog
            .tables_for(id)
            .iter()
            .map(|t| t.borrow().name().to_string())
            .collect();
        assert_eq!(names, vec!["Weapons", "Armors"]);

        catalog.drop_table("Weapons").unwrap();
        assert!(catalog.drop_table("Weapons").is_err());
        assert_eq!(catalog.tables().len(), 1);
    }

    #[test]
    fn test_add_foreign_table_rejected() {
        let (mut catalog, _) = item_catalog();
        let (other, other_id) = item_catalog();
        let schema = other.schema(other_id).unwrap();
        let table = Rc::new(RefCell::new(RowStore::new("Foreign", schema)));
        assert!(catalog.add_table(table).is_err());
    }

    #[test]
    fn test_find_by_key_across_tables() {
        let (mut catalog, id) = item_catalog();
        let a = catalog.create_table("Weapons", id).unwrap();
        let b = catalog.create_table("Armors", id).unwrap();
        for (table, key) in [(&a, 1), (&b, 2)] {
            let mut store = table.borrow_mut();
            let row = store.add_row(None).unwrap();
            store.cell_mut(FieldId(1), row).unwrap().set_int(key).unwrap();
        }

        let hit = catalog.find_by_key(id, "2").unwrap().unwrap();
        assert!(Rc::ptr_eq(&hit.table, &b));
        assert_eq!(hit.row, 0);
        assert!(catalog.find_by_key(id, "3").unwrap().is_none());
    }

    #[test]
    fn test_dirty_tracking() {
        let (mut catalog, id) = item_catalog();
        assert!(catalog.is_dirty());
        catalog.clear_dirty();
        assert!(!catalog.is_dirty());

        let table = catalog.create_table("Weapons", id).unwrap();
        assert!(!catalog.is_dirty());
        table.borrow_mut().add_row(None).unwrap();
        assert!(catalog.is_dirty());
    }
}
