//! Schema (table definition) for Tabula.

use super::field::{FieldDefinition, FieldTarget};
use crate::error::{Error, Result};
use crate::naming::normalize_name;
use crate::types::{EnumId, FieldId, SchemaId, TypeTag};
use crate::value::ValueCell;
use alloc::string::String;
use alloc::vec::Vec;
use serde::{Deserialize, Serialize};

/// An ordered list of field definitions with an optional key field.
///
/// A schema only describes shape. Propagating field changes into the row
/// stores bound to it is the catalog's job.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    id: SchemaId,
    /// Class name; record types are matched against it at load time.
    name: String,
    fields: Vec<FieldDefinition>,
    key_id: Option<FieldId>,
    auto_increment: bool,
    /// Highest field id ever assigned, so ids are never reused.
    last_field_id: u32,
    #[serde(skip)]
    dirty: bool,
}

impl Schema {
    /// Creates an empty schema.
    pub fn new(id: SchemaId, name: &str) -> Result<Self> {
        Ok(Self {
            id,
            name: normalize_name(name)?,
            fields: Vec::new(),
            key_id: None,
            auto_increment: false,
            last_field_id: 0,
            dirty: false,
        })
    }

    #[inline]
    pub fn id(&self) -> SchemaId {
        self.id
    }

    /// Returns the class name.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn set_id(&mut self, id: SchemaId) {
        self.id = id;
    }

    /// Renames the schema. Callers must check uniqueness across the catalog.
    pub fn rename(&mut self, new_name: &str) -> Result<()> {
        self.name = normalize_name(new_name)?;
        self.dirty = true;
        Ok(())
    }

    /// Returns the fields in display order.
    #[inline]
    pub fn fields(&self) -> &[FieldDefinition] {
        &self.fields
    }

    /// Returns the field ids in display order.
    pub fn field_ids(&self) -> Vec<FieldId> {
        self.fields.iter().map(|f| f.id()).collect()
    }

    /// Gets a field by id.
    pub fn field(&self, id: FieldId) -> Option<&FieldDefinition> {
        self.fields.iter().find(|f| f.id() == id)
    }

    /// Gets a field by id, failing with `FieldNotFound`.
    pub fn require_field(&self, id: FieldId) -> Result<&FieldDefinition> {
        self.field(id)
            .ok_or_else(|| Error::field_not_found(self.name.as_str(), id))
    }

    /// Gets a field by name.
    pub fn field_by_name(&self, name: &str) -> Option<&FieldDefinition> {
        self.fields.iter().find(|f| f.name() == name)
    }

    /// Gets the display position of a field.
    pub fn field_index(&self, id: FieldId) -> Option<usize> {
        self.fields.iter().position(|f| f.id() == id)
    }

    fn field_mut(&mut self, id: FieldId) -> Result<&mut FieldDefinition> {
        let schema = self.name.as_str();
        match self.fields.iter_mut().find(|f| f.id() == id) {
            Some(f) => Ok(f),
            None => Err(Error::field_not_found(schema, id)),
        }
    }

    fn check_field_name(&self, name: &str, ignore: Option<FieldId>) -> Result<String> {
        let name = normalize_name(name)?;
        if self
            .fields
            .iter()
            .any(|f| f.name() == name && Some(f.id()) != ignore)
        {
            return Err(Error::duplicate_name(name));
        }
        Ok(name)
    }

    /// Adds a field and returns its id.
    ///
    /// `Enum`/`Flags` fields require an enum target and `TableRef` fields a
    /// table target; other types take none.
    pub fn add_field(
        &mut self,
        name: &str,
        type_tag: TypeTag,
        is_array: bool,
        target: Option<FieldTarget>,
    ) -> Result<FieldId> {
        let name = self.check_field_name(name, None)?;
        match (type_tag, target) {
            (TypeTag::Enum | TypeTag::Flags, Some(FieldTarget::Enum(_))) => {}
            (TypeTag::TableRef, Some(FieldTarget::Table(_))) => {}
            (t, None) if !t.needs_enum() && !t.needs_table() => {}
            (t, target) => {
                return Err(Error::invalid_operation(alloc::format!(
                    "field {} of type {:?} cannot take target {:?}",
                    name,
                    t,
                    target
                )))
            }
        }

        let next = self
            .fields
            .iter()
            .map(|f| f.id().0)
            .max()
            .unwrap_or(0)
            .max(self.last_field_id)
            + 1;
        let id = FieldId(next);
        self.last_field_id = next;
        tracing::debug!(schema = %self.name, field = id.0, name = %name, "field added");
        self.fields
            .push(FieldDefinition::new(id, name, type_tag, is_array, target));
        self.dirty = true;
        Ok(id)
    }

    /// Removes a field. Clears the key designation if it was the key.
    pub fn remove_field(&mut self, id: FieldId) -> Result<FieldDefinition> {
        let pos = self
            .field_index(id)
            .ok_or_else(|| Error::field_not_found(self.name.as_str(), id))?;
        let removed = self.fields.remove(pos);
        if self.key_id == Some(id) {
            self.key_id = None;
        }
        tracing::debug!(schema = %self.name, field = id.0, "field removed");
        self.dirty = true;
        Ok(removed)
    }

    /// Renames a field. Its id and stored data are unaffected.
    pub fn rename_field(&mut self, id: FieldId, new_name: &str) -> Result<()> {
        let name = self.check_field_name(new_name, Some(id))?;
        self.field_mut(id)?.set_name(name);
        self.dirty = true;
        Ok(())
    }

    /// Moves a field to a new display position. Ids are unaffected.
    pub fn move_field(&mut self, id: FieldId, to_index: usize) -> Result<()> {
        let from = self
            .field_index(id)
            .ok_or_else(|| Error::field_not_found(self.name.as_str(), id))?;
        let to = to_index.min(self.fields.len() - 1);
        let field = self.fields.remove(from);
        self.fields.insert(to, field);
        self.dirty = true;
        Ok(())
    }

    /// Returns the key field id.
    #[inline]
    pub fn key_id(&self) -> Option<FieldId> {
        self.key_id
    }

    /// Returns the key field.
    pub fn key_field(&self) -> Option<&FieldDefinition> {
        self.key_id.and_then(|id| self.field(id))
    }

    /// Toggles key designation on `id`.
    ///
    /// Setting the current key again clears it. Returns the resulting key.
    pub fn set_key(&mut self, id: FieldId) -> Result<Option<FieldId>> {
        if self.key_id == Some(id) {
            self.key_id = None;
            self.dirty = true;
            return Ok(None);
        }
        let field = self.require_field(id)?;
        if !field.type_tag().can_be_key() {
            return Err(Error::InvalidKeyField {
                field: id,
                reason: "key fields must be Int, String or Enum",
            });
        }
        if field.is_array() {
            return Err(Error::InvalidKeyField {
                field: id,
                reason: "key fields cannot be arrays",
            });
        }
        self.key_id = Some(id);
        self.dirty = true;
        Ok(self.key_id)
    }

    /// Clears the key designation.
    pub fn clear_key(&mut self) {
        if self.key_id.take().is_some() {
            self.dirty = true;
        }
    }

    /// Returns whether new rows get `max(key) + 1` as their key.
    #[inline]
    pub fn auto_increment(&self) -> bool {
        self.auto_increment
    }

    pub fn set_auto_increment(&mut self, value: bool) {
        self.auto_increment = value;
        self.dirty = true;
    }

    /// Replaces a field's default value.
    ///
    /// Only the template changes here; broadcasting into existing rows is done
    /// by the catalog.
    pub fn update_default_value(&mut self, id: FieldId, value: ValueCell) -> Result<()> {
        let field = self.field_mut(id)?;
        field.check_value(&value)?;
        field.set_default_value(value);
        self.dirty = true;
        Ok(())
    }

    /// Returns ids of fields that reference the given enum define.
    pub fn fields_referencing_enum(&self, define: EnumId) -> Vec<FieldId> {
        self.fields
            .iter()
            .filter(|f| f.enum_ref() == Some(define))
            .map(|f| f.id())
            .collect()
    }

    /// Returns ids of fields that reference the given schema.
    pub fn fields_referencing_table(&self, schema: SchemaId) -> Vec<FieldId> {
        self.fields
            .iter()
            .filter(|f| f.table_ref() == Some(schema))
            .map(|f| f.id())
            .collect()
    }

    #[inline]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub fn clear_dirty(&mut self) {
        self.dirty = false;
    }
}

/// Builder for creating schemas.
pub struct SchemaBuilder {
    schema: Schema,
}

impl SchemaBuilder {
    /// Creates a new schema builder.
    pub fn new(name: &str) -> Result<Self> {
        Ok(Self {
            schema: Schema::new(SchemaId(0), name)?,
        })
    }

    /// Adds a scalar field.
    pub fn add_field(mut self, name: &str, type_tag: TypeTag) -> Result<Self> {
        self.schema.add_field(name, type_tag, false, None)?;
        Ok(self)
    }

    /// Adds an array-valued field.
    pub fn add_array_field(mut self, name: &str, type_tag: TypeTag) -> Result<Self> {
        self.schema.add_field(name, type_tag, true, None)?;
        Ok(self)
    }

    /// Adds an enum field over `define`.
    pub fn add_enum_field(mut self, name: &str, define: EnumId) -> Result<Self> {
        self.schema
            .add_field(name, TypeTag::Enum, false, Some(FieldTarget::Enum(define)))?;
        Ok(self)
    }

    /// Adds a flags field over `define`.
    pub fn add_flags_field(mut self, name: &str, define: EnumId) -> Result<Self> {
        self.schema
            .add_field(name, TypeTag::Flags, false, Some(FieldTarget::Enum(define)))?;
        Ok(self)
    }

    /// Adds a field holding keys of rows in `schema`.
    pub fn add_table_ref_field(mut self, name: &str, schema: SchemaId) -> Result<Self> {
        self.schema.add_field(
            name,
            TypeTag::TableRef,
            false,
            Some(FieldTarget::Table(schema)),
        )?;
        Ok(self)
    }

    /// Sets a default value for a field added earlier.
    pub fn default_value(mut self, name: &str, value: ValueCell) -> Result<Self> {
        let id = self.field_id(name)?;
        self.schema.update_default_value(id, value)?;
        Ok(self)
    }

    /// Designates the key field.
    pub fn key(mut self, name: &str) -> Result<Self> {
        let id = self.field_id(name)?;
        self.schema.key_id = None;
        self.schema.set_key(id)?;
        Ok(self)
    }

    /// Enables key auto-increment for new rows.
    pub fn auto_increment(mut self, value: bool) -> Self {
        self.schema.auto_increment = value;
        self
    }

    fn field_id(&self, name: &str) -> Result<FieldId> {
        let name = normalize_name(name)?;
        self.schema
            .field_by_name(&name)
            .map(|f| f.id())
            .ok_or_else(|| Error::invalid_operation(alloc::format!("Field not found: {}", name)))
    }

    /// Builds the schema with the given id.
    pub fn build(mut self, id: SchemaId) -> Schema {
        self.schema.set_id(id);
        self.schema.dirty = false;
        self.schema
    }
}
