//! Typed per-row views over a row store.

use alloc::format;
use alloc::rc::Rc;
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use core::cell::RefCell;
use core::fmt;
use tabula_core::{
    Complex, EnumId, Error, FieldId, ObjectRef, Result, SchemaId, SlotKind, TypeTag, ValueCell,
};
use tabula_storage::{EnumHandle, TableHandle, TableLookup};

/// The enum registry slot shared by a runtime index and every accessor it
/// created. Binding a registry later makes it visible to existing accessors.
#[derive(Clone, Default)]
pub struct EnumBinding(Rc<RefCell<Option<EnumHandle>>>);

impl EnumBinding {
    /// Creates an unbound slot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a slot already bound to `enums`.
    pub fn bound(enums: EnumHandle) -> Self {
        Self(Rc::new(RefCell::new(Some(enums))))
    }

    pub fn set(&self, enums: EnumHandle) {
        *self.0.borrow_mut() = Some(enums);
    }

    pub fn get(&self) -> Option<EnumHandle> {
        self.0.borrow().clone()
    }

    pub fn is_bound(&self) -> bool {
        self.0.borrow().is_some()
    }
}

impl fmt::Debug for EnumBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("EnumBinding").field(&self.is_bound()).finish()
    }
}

#[derive(Clone, Copy)]
struct FieldInfo {
    tag: TypeTag,
    enum_ref: Option<EnumId>,
    table_ref: Option<SchemaId>,
}

/// Typed view of one row of a row store.
///
/// Holds no data of its own; every read and write goes through the store, so
/// an accessor sees edits made by anyone else sharing the table handle.
#[derive(Clone)]
pub struct RowAccessor {
    table: TableHandle,
    row: usize,
    enums: EnumBinding,
}

impl RowAccessor {
    /// Wraps `row` of `table` without an enum registry.
    pub fn new(table: TableHandle, row: usize) -> Self {
        Self::with_enums(table, row, EnumBinding::new())
    }

    pub fn with_enums(table: TableHandle, row: usize, enums: EnumBinding) -> Self {
        Self { table, row, enums }
    }

    #[inline]
    pub fn table(&self) -> &TableHandle {
        &self.table
    }

    #[inline]
    pub fn row(&self) -> usize {
        self.row
    }

    pub fn enums(&self) -> &EnumBinding {
        &self.enums
    }

    fn info(&self, field: FieldId) -> Result<FieldInfo> {
        let schema = self.table.borrow().schema();
        let schema = schema.borrow();
        let def = schema.require_field(field)?;
        Ok(FieldInfo {
            tag: def.type_tag(),
            enum_ref: def.enum_ref(),
            table_ref: def.table_ref(),
        })
    }

    /// Looks up `field` and checks it has a type `accepts` allows.
    fn typed(
        &self,
        field: FieldId,
        wanted: TypeTag,
        accepts: impl Fn(TypeTag) -> bool,
    ) -> Result<FieldInfo> {
        let info = self.info(field)?;
        if accepts(info.tag) {
            return Ok(info);
        }
        if info.tag.slot_kind() != wanted.slot_kind() {
            Err(Error::type_mismatch(wanted.slot_kind(), info.tag.slot_kind()))
        } else {
            Err(Error::invalid_operation(format!(
                "{} is {:?}, read as {:?}",
                field, info.tag, wanted
            )))
        }
    }

    fn exact(&self, field: FieldId, wanted: TypeTag) -> Result<FieldInfo> {
        self.typed(field, wanted, |t| t == wanted)
    }

    fn read<R>(&self, field: FieldId, f: impl FnOnce(&ValueCell) -> Result<R>) -> Result<R> {
        let store = self.table.borrow();
        f(store.cell(field, self.row)?)
    }

    fn write<R>(&self, field: FieldId, f: impl FnOnce(&mut ValueCell) -> Result<R>) -> Result<R> {
        let mut store = self.table.borrow_mut();
        f(store.cell_mut(field, self.row)?)
    }

    fn registry(&self, field: FieldId) -> Result<EnumHandle> {
        self.enums
            .get()
            .ok_or(Error::MissingEnumRegistry { field })
    }

    fn define_of(field: FieldId, info: FieldInfo) -> Result<EnumId> {
        info.enum_ref
            .ok_or_else(|| Error::inconsistency(format!("{} has no enum define", field)))
    }

    /// Returns a copy of the raw cell.
    pub fn cell(&self, field: FieldId) -> Result<ValueCell> {
        self.read(field, |c| Ok(c.copy()))
    }

    // --- scalars ---

    pub fn int(&self, field: FieldId) -> Result<i32> {
        self.exact(field, TypeTag::Int)?;
        self.read(field, ValueCell::as_int)
    }

    pub fn float(&self, field: FieldId) -> Result<f32> {
        self.exact(field, TypeTag::Float)?;
        self.read(field, ValueCell::as_float)
    }

    pub fn bool(&self, field: FieldId) -> Result<bool> {
        self.exact(field, TypeTag::Bool)?;
        self.read(field, ValueCell::as_bool)
    }

    pub fn string(&self, field: FieldId) -> Result<String> {
        self.exact(field, TypeTag::String)?;
        self.read(field, |c| c.as_str().map(ToString::to_string))
    }

    pub fn object(&self, field: FieldId) -> Result<ObjectRef> {
        self.typed(field, TypeTag::ObjectRef(tabula_core::ObjectKind::Any), |t| {
            matches!(t, TypeTag::ObjectRef(_))
        })?;
        self.read(field, |c| c.as_object().cloned())
    }

    /// Decodes a vector or color field.
    pub fn complex<T: Complex>(&self, field: FieldId) -> Result<T> {
        self.exact(field, T::TAG)?;
        self.read(field, ValueCell::to_complex::<T>)
    }

    // --- arrays ---

    pub fn ints(&self, field: FieldId) -> Result<Vec<i32>> {
        self.exact(field, TypeTag::Int)?;
        self.read(field, |c| c.ints().map(<[i32]>::to_vec))
    }

    pub fn floats(&self, field: FieldId) -> Result<Vec<f32>> {
        self.exact(field, TypeTag::Float)?;
        self.read(field, |c| c.floats().map(<[f32]>::to_vec))
    }

    pub fn bools(&self, field: FieldId) -> Result<Vec<bool>> {
        self.exact(field, TypeTag::Bool)?;
        self.read(field, |c| c.bools().map(<[bool]>::to_vec))
    }

    pub fn strings(&self, field: FieldId) -> Result<Vec<String>> {
        self.exact(field, TypeTag::String)?;
        self.read(field, |c| c.strings().map(<[String]>::to_vec))
    }

    pub fn objects(&self, field: FieldId) -> Result<Vec<ObjectRef>> {
        self.typed(field, TypeTag::ObjectRef(tabula_core::ObjectKind::Any), |t| {
            matches!(t, TypeTag::ObjectRef(_))
        })?;
        self.read(field, |c| c.objects().map(<[ObjectRef]>::to_vec))
    }

    pub fn complex_array<T: Complex>(&self, field: FieldId) -> Result<Vec<T>> {
        self.exact(field, T::TAG)?;
        self.read(field, |c| (0..c.size()).map(|i| c.complex_at::<T>(i)).collect())
    }

    // --- enums and flags ---

    /// Returns the stored (stable) key of an enum field.
    pub fn enum_key(&self, field: FieldId) -> Result<i32> {
        self.exact(field, TypeTag::Enum)?;
        self.read(field, ValueCell::as_int)
    }

    /// Returns the display index of an enum field's value.
    ///
    /// Orphaned keys resolve to index 0. Fails with `MissingEnumRegistry` when
    /// no registry is bound.
    pub fn enum_index(&self, field: FieldId) -> Result<usize> {
        let info = self.exact(field, TypeTag::Enum)?;
        let enums = self.registry(field)?;
        let key = self.read(field, ValueCell::as_int)?;
        let index = enums.borrow().index_for_key(Self::define_of(field, info)?, key);
        index
    }

    /// Returns the display indexes of an enum array field.
    pub fn enum_indexes(&self, field: FieldId) -> Result<Vec<usize>> {
        let info = self.exact(field, TypeTag::Enum)?;
        let enums = self.registry(field)?;
        let define = Self::define_of(field, info)?;
        let keys = self.read(field, |c| c.ints().map(<[i32]>::to_vec))?;
        let enums = enums.borrow();
        keys.into_iter()
            .map(|k| enums.index_for_key(define, k))
            .collect()
    }

    /// Returns the display name of an enum field's value, or `"undefined"`.
    pub fn enum_name(&self, field: FieldId) -> Result<String> {
        let info = self.exact(field, TypeTag::Enum)?;
        let enums = self.registry(field)?;
        let key = self.read(field, ValueCell::as_int)?;
        let name = enums
            .borrow()
            .display_name_for_key(Self::define_of(field, info)?, key);
        name
    }

    /// Returns the raw bit set of a flags field.
    pub fn flags(&self, field: FieldId) -> Result<i32> {
        self.exact(field, TypeTag::Flags)?;
        self.read(field, ValueCell::as_int)
    }

    /// Returns whether the flags value with stable `key` is set.
    pub fn has_flag(&self, field: FieldId, key: u32) -> Result<bool> {
        let bit = tabula_core::EnumRegistry::flag_bit(key);
        Ok(bit != 0 && self.flags(field)? & bit == bit)
    }

    /// Renders a flags field as a label such as `"Fire, Ice"`.
    pub fn flags_label(&self, field: FieldId) -> Result<String> {
        let info = self.exact(field, TypeTag::Flags)?;
        let enums = self.registry(field)?;
        let value = self.read(field, ValueCell::as_int)?;
        let label = enums
            .borrow()
            .flags_label(Self::define_of(field, info)?, value);
        label
    }

    // --- table references ---

    /// Returns the stored key of a `TableRef` field.
    pub fn table_ref_key(&self, field: FieldId) -> Result<String> {
        self.exact(field, TypeTag::TableRef)?;
        self.read(field, |c| c.as_str().map(ToString::to_string))
    }

    /// Resolves a `TableRef` field against the tables `lookup` knows about.
    ///
    /// An empty key and a key with no matching row both yield `None`.
    pub fn table_ref(&self, field: FieldId, lookup: &dyn TableLookup) -> Result<Option<RowAccessor>> {
        let info = self.exact(field, TypeTag::TableRef)?;
        let schema = info
            .table_ref
            .ok_or_else(|| Error::inconsistency(format!("{} has no referenced table", field)))?;
        let key = self.table_ref_key(field)?;
        if key.is_empty() {
            return Ok(None);
        }
        Ok(lookup
            .find_by_key(schema, &key)?
            .map(|loc| RowAccessor::with_enums(loc.table, loc.row, self.enums.clone())))
    }

    // --- keys ---

    fn key_field(&self) -> Result<(FieldId, TypeTag)> {
        let schema = self.table.borrow().schema();
        let schema = schema.borrow();
        schema
            .key_field()
            .map(|f| (f.id(), f.type_tag()))
            .ok_or_else(|| Error::invalid_operation(format!("schema {} has no key field", schema.name())))
    }

    /// Returns the key of an `Int` or `Enum` keyed row.
    pub fn key_int(&self) -> Result<i32> {
        let (field, tag) = self.key_field()?;
        if tag.slot_kind() != SlotKind::Ints {
            return Err(Error::type_mismatch(SlotKind::Ints, tag.slot_kind()));
        }
        self.read(field, ValueCell::as_int)
    }

    /// Returns the key of a `String` keyed row.
    pub fn key_string(&self) -> Result<String> {
        let (field, tag) = self.key_field()?;
        if tag.slot_kind() != SlotKind::Strings {
            return Err(Error::type_mismatch(SlotKind::Strings, tag.slot_kind()));
        }
        self.read(field, |c| c.as_str().map(ToString::to_string))
    }

    // --- setters ---

    pub fn set_int(&self, field: FieldId, value: i32) -> Result<()> {
        self.exact(field, TypeTag::Int)?;
        self.write(field, |c| c.set_int(value))
    }

    pub fn set_float(&self, field: FieldId, value: f32) -> Result<()> {
        self.exact(field, TypeTag::Float)?;
        self.write(field, |c| c.set_float(value))
    }

    pub fn set_bool(&self, field: FieldId, value: bool) -> Result<()> {
        self.exact(field, TypeTag::Bool)?;
        self.write(field, |c| c.set_bool(value))
    }

    pub fn set_string(&self, field: FieldId, value: impl Into<String>) -> Result<()> {
        self.exact(field, TypeTag::String)?;
        self.write(field, |c| c.set_string(value))
    }

    pub fn set_object(&self, field: FieldId, value: ObjectRef) -> Result<()> {
        self.typed(field, TypeTag::ObjectRef(value.kind), |t| {
            matches!(t, TypeTag::ObjectRef(_))
        })?;
        self.write(field, |c| c.set_object(value))
    }

    pub fn set_complex<T: Complex>(&self, field: FieldId, value: &T) -> Result<()> {
        self.exact(field, T::TAG)?;
        self.write(field, |c| c.set_complex(value))
    }

    /// Stores the key of the value at display `index`.
    pub fn set_enum_index(&self, field: FieldId, index: usize) -> Result<()> {
        let info = self.exact(field, TypeTag::Enum)?;
        let enums = self.registry(field)?;
        let key = enums
            .borrow()
            .key_at_index(Self::define_of(field, info)?, index)?;
        self.write(field, |c| c.set_int(key as i32))
    }

    pub fn set_enum_key(&self, field: FieldId, key: i32) -> Result<()> {
        self.exact(field, TypeTag::Enum)?;
        self.write(field, |c| c.set_int(key))
    }

    pub fn set_flags(&self, field: FieldId, value: i32) -> Result<()> {
        self.exact(field, TypeTag::Flags)?;
        self.write(field, |c| c.set_int(value))
    }

    pub fn set_table_ref_key(&self, field: FieldId, key: impl Into<String>) -> Result<()> {
        self.exact(field, TypeTag::TableRef)?;
        self.write(field, |c| c.set_string(key))
    }

    /// Replaces the raw cell. The cell must fit the field's type.
    pub fn set_cell(&self, field: FieldId, value: ValueCell) -> Result<()> {
        self.table.borrow_mut().set_cell(field, self.row, value)
    }
}

impl fmt::Debug for RowAccessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RowAccessor")
            .field("table", &self.table.borrow().name())
            .field("row", &self.row)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;
    use tabula_core::schema::SchemaBuilder;
    use tabula_core::{Color, EnumRegistry, ObjectKind, Vector2};
    use tabula_storage::RowStore;

    const ID: FieldId = FieldId(1);
    const NAME: FieldId = FieldId(2);
    const RARITY: FieldId = FieldId(3);
    const ELEMENTS: FieldId = FieldId(4);
    const POS: FieldId = FieldId(5);
    const ICON: FieldId = FieldId(6);
    const SCORES: FieldId = FieldId(7);

    fn setup() -> (TableHandle, EnumHandle, EnumId, EnumId) {
        let mut enums = EnumRegistry::new();
        let rarity = enums.add_define("Rarity").unwrap();
        enums.add_value(rarity, "Common").unwrap();
        enums.add_value(rarity, "Rare").unwrap();
        let element = enums.add_define("Element").unwrap();
        enums.set_flags(element, true).unwrap();
        enums.add_value(element, "Fire").unwrap();
        enums.add_value(element, "Ice").unwrap();
        enums.add_value(element, "Wind").unwrap();

        let schema = SchemaBuilder::new("Item")
            .unwrap()
            .add_field("id", TypeTag::Int)
            .unwrap()
            .add_field("name", TypeTag::String)
            .unwrap()
            .add_enum_field("rarity", rarity)
            .unwrap()
            .add_flags_field("elements", element)
            .unwrap()
            .add_field("pos", TypeTag::Vector2)
            .unwrap()
            .add_field("icon", TypeTag::ObjectRef(ObjectKind::Sprite))
            .unwrap()
            .add_array_field("scores", TypeTag::Int)
            .unwrap()
            .key("id")
            .unwrap()
            .build(SchemaId(1));
        let mut store = RowStore::new("Items", Rc::new(RefCell::new(schema)));
        store.add_row(None).unwrap();
        (
            Rc::new(RefCell::new(store)),
            Rc::new(RefCell::new(enums)),
            rarity,
            element,
        )
    }

    #[test]
    fn test_scalar_round_trip() {
        let (table, _, _, _) = setup();
        let row = RowAccessor::new(table, 0);
        row.set_int(ID, 7).unwrap();
        row.set_string(NAME, "Sword").unwrap();
        row.set_complex(POS, &Vector2::new(1.5, -2.0)).unwrap();
        row.set_object(ICON, ObjectRef::new(ObjectKind::Sprite, "abc")).unwrap();

        assert_eq!(row.int(ID).unwrap(), 7);
        assert_eq!(row.key_int().unwrap(), 7);
        assert_eq!(row.string(NAME).unwrap(), "Sword");
        assert_eq!(row.complex::<Vector2>(POS).unwrap(), Vector2::new(1.5, -2.0));
        assert_eq!(row.object(ICON).unwrap().guid, "abc");
    }

    #[test]
    fn test_wrong_type() {
        let (table, _, _, _) = setup();
        let row = RowAccessor::new(table, 0);
        assert!(matches!(row.float(ID).unwrap_err(), Error::TypeMismatch { .. }));
        assert!(matches!(
            row.int(RARITY).unwrap_err(),
            Error::InvalidOperation { .. }
        ));
        assert!(row.complex::<Color>(POS).is_err());
        assert!(matches!(row.key_string().unwrap_err(), Error::TypeMismatch { .. }));
        assert!(matches!(
            row.int(FieldId(99)).unwrap_err(),
            Error::FieldNotFound { .. }
        ));
    }

    #[test]
    fn test_missing_enum_registry() {
        let (table, _, _, _) = setup();
        let row = RowAccessor::new(table, 0);
        assert_eq!(
            row.enum_index(RARITY).unwrap_err(),
            Error::MissingEnumRegistry { field: RARITY }
        );
        assert!(row.flags_label(ELEMENTS).is_err());
        // the raw key needs no registry
        assert_eq!(row.enum_key(RARITY).unwrap(), 0);
    }

    #[test]
    fn test_enum_access() {
        let (table, enums, _, _) = setup();
        let row = RowAccessor::with_enums(table, 0, EnumBinding::bound(enums));
        row.set_enum_index(RARITY, 1).unwrap();
        assert_eq!(row.enum_key(RARITY).unwrap(), 2);
        assert_eq!(row.enum_index(RARITY).unwrap(), 1);
        assert_eq!(row.enum_name(RARITY).unwrap(), "Rare");

        // orphaned key degrades instead of failing
        row.set_enum_key(RARITY, 99).unwrap();
        assert_eq!(row.enum_index(RARITY).unwrap(), 0);
        assert_eq!(row.enum_name(RARITY).unwrap(), "undefined");
    }

    #[test]
    fn test_enum_rename_keeps_rows() {
        let (table, enums, rarity, _) = setup();
        let row = RowAccessor::with_enums(table, 0, EnumBinding::bound(enums.clone()));
        row.set_enum_index(RARITY, 1).unwrap();
        enums.borrow_mut().rename_value(rarity, 1, "Epic").unwrap();
        assert_eq!(row.enum_name(RARITY).unwrap(), "Epic");
        assert_eq!(row.enum_key(RARITY).unwrap(), 2);
    }

    #[test]
    fn test_flags() {
        let (table, enums, _, _) = setup();
        let row = RowAccessor::with_enums(table, 0, EnumBinding::bound(enums));
        assert_eq!(row.flags_label(ELEMENTS).unwrap(), "None");
        row.set_flags(ELEMENTS, 0b101).unwrap();
        assert!(row.has_flag(ELEMENTS, 1).unwrap());
        assert!(!row.has_flag(ELEMENTS, 2).unwrap());
        assert_eq!(row.flags_label(ELEMENTS).unwrap(), "Fire, Wind");
        row.set_flags(ELEMENTS, 0b111).unwrap();
        assert_eq!(row.flags_label(ELEMENTS).unwrap(), "All");
    }

    #[test]
    fn test_binding_after_creation() {
        let (table, enums, _, _) = setup();
        let binding = EnumBinding::new();
        let row = RowAccessor::with_enums(table, 0, binding.clone());
        assert!(row.enum_index(RARITY).is_err());
        binding.set(enums);
        assert_eq!(row.enum_index(RARITY).unwrap(), 0);
    }

    #[test]
    fn test_array_field() {
        let (table, _, _, _) = setup();
        let row = RowAccessor::new(table.clone(), 0);
        assert!(row.ints(SCORES).unwrap().is_empty());
        {
            let mut store = table.borrow_mut();
            let cell = store.cell_mut(SCORES, 0).unwrap();
            cell.add_element(TypeTag::Int).unwrap();
            cell.add_element(TypeTag::Int).unwrap();
            cell.set_int_at(1, 9).unwrap();
        }
        assert_eq!(row.ints(SCORES).unwrap(), vec![0, 9]);
    }

    #[test]
    fn test_row_out_of_range() {
        let (table, _, _, _) = setup();
        let row = RowAccessor::new(table.clone(), 0);
        table.borrow_mut().remove_rows(&[0]).unwrap();
        assert_eq!(row.int(ID).unwrap_err(), Error::row_out_of_range(0, 0));
    }
}
