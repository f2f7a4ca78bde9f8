//! Value cells for Tabula tables.
//!
//! A `ValueCell` is the storage unit for one logical value: a scalar is a cell
//! with exactly one element, an array field is a cell with one element per
//! array entry. Which slot a cell uses is decided by the field's `TypeTag` and
//! never changes for the lifetime of the field.

use crate::complex::{self, Complex};
use crate::error::{Error, Result};
use crate::types::{ObjectKind, SlotKind, TypeTag};
use alloc::string::String;
use alloc::vec;
use alloc::vec::Vec;
use serde::{Deserialize, Serialize};

/// Reference to an object owned by the host (sprite, entity, audio clip...).
///
/// The store never dereferences it; an empty `guid` means "no object".
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObjectRef {
    pub kind: ObjectKind,
    pub guid: String,
}

impl ObjectRef {
    /// Creates a reference to the object with the given guid.
    pub fn new(kind: ObjectKind, guid: impl Into<String>) -> Self {
        Self {
            kind,
            guid: guid.into(),
        }
    }

    /// Creates an empty reference.
    pub fn none(kind: ObjectKind) -> Self {
        Self {
            kind,
            guid: String::new(),
        }
    }

    /// Returns true if this reference points at nothing.
    #[inline]
    pub fn is_none(&self) -> bool {
        self.guid.is_empty()
    }
}

/// One logical value, stored in exactly one typed slot.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum ValueCell {
    Strings(Vec<String>),
    Ints(Vec<i32>),
    Floats(Vec<f32>),
    Bools(Vec<bool>),
    Objects(Vec<ObjectRef>),
}

impl ValueCell {
    /// Creates the zero value for a field of the given type.
    ///
    /// Scalars get one zero element, arrays start empty.
    pub fn default_for(tag: TypeTag, is_array: bool) -> Self {
        let len = if is_array { 0 } else { 1 };
        match tag {
            TypeTag::ObjectRef(kind) => ValueCell::Objects(vec![ObjectRef::none(kind); len]),
            _ => match tag.slot_kind() {
                SlotKind::Strings => ValueCell::Strings(vec![String::new(); len]),
                SlotKind::Ints => ValueCell::Ints(vec![0; len]),
                SlotKind::Floats => ValueCell::Floats(vec![0.0; len]),
                SlotKind::Bools => ValueCell::Bools(vec![false; len]),
                SlotKind::Objects => ValueCell::Objects(vec![ObjectRef::none(ObjectKind::Any); len]),
            },
        }
    }

    pub fn from_int(value: i32) -> Self {
        ValueCell::Ints(vec![value])
    }

    pub fn from_float(value: f32) -> Self {
        ValueCell::Floats(vec![value])
    }

    pub fn from_bool(value: bool) -> Self {
        ValueCell::Bools(vec![value])
    }

    pub fn from_string(value: impl Into<String>) -> Self {
        ValueCell::Strings(vec![value.into()])
    }

    pub fn from_object(value: ObjectRef) -> Self {
        ValueCell::Objects(vec![value])
    }

    /// Creates a scalar cell holding a serialized complex payload.
    pub fn from_complex<T: Complex>(value: &T) -> Result<Self> {
        Ok(ValueCell::Strings(vec![complex::to_complex(value)?]))
    }

    /// Returns the slot this cell uses.
    pub fn slot_kind(&self) -> SlotKind {
        match self {
            ValueCell::Strings(_) => SlotKind::Strings,
            ValueCell::Ints(_) => SlotKind::Ints,
            ValueCell::Floats(_) => SlotKind::Floats,
            ValueCell::Bools(_) => SlotKind::Bools,
            ValueCell::Objects(_) => SlotKind::Objects,
        }
    }

    /// Returns whether this cell has the shape a field of `tag` requires.
    pub fn matches_tag(&self, tag: TypeTag) -> bool {
        self.slot_kind() == tag.slot_kind()
    }

    /// Returns the number of elements in the active slot.
    pub fn size(&self) -> usize {
        match self {
            ValueCell::Strings(v) => v.len(),
            ValueCell::Ints(v) => v.len(),
            ValueCell::Floats(v) => v.len(),
            ValueCell::Bools(v) => v.len(),
            ValueCell::Objects(v) => v.len(),
        }
    }

    /// Returns a fully independent copy of this cell.
    ///
    /// Defaults must be copied before they are placed into a row.
    pub fn copy(&self) -> Self {
        self.clone()
    }

    /// Removes every element, keeping the slot.
    pub fn clear(&mut self) {
        match self {
            ValueCell::Strings(v) => v.clear(),
            ValueCell::Ints(v) => v.clear(),
            ValueCell::Floats(v) => v.clear(),
            ValueCell::Bools(v) => v.clear(),
            ValueCell::Objects(v) => v.clear(),
        }
    }

    /// Appends one zero element of the slot selected by `tag`.
    pub fn add_element(&mut self, tag: TypeTag) -> Result<()> {
        self.expect_slot(tag.slot_kind())?;
        match (self, tag) {
            (ValueCell::Objects(v), TypeTag::ObjectRef(kind)) => v.push(ObjectRef::none(kind)),
            (ValueCell::Strings(v), _) => v.push(String::new()),
            (ValueCell::Ints(v), _) => v.push(0),
            (ValueCell::Floats(v), _) => v.push(0.0),
            (ValueCell::Bools(v), _) => v.push(false),
            (ValueCell::Objects(v), _) => v.push(ObjectRef::none(ObjectKind::Any)),
        }
        Ok(())
    }

    /// Removes the element at `index` from the slot selected by `tag`.
    pub fn remove_element_at(&mut self, tag: TypeTag, index: usize) -> Result<()> {
        self.expect_slot(tag.slot_kind())?;
        let len = self.size();
        if index >= len {
            return Err(Error::element_out_of_range(index, len));
        }
        match self {
            ValueCell::Strings(v) => {
                v.remove(index);
            }
            ValueCell::Ints(v) => {
                v.remove(index);
            }
            ValueCell::Floats(v) => {
                v.remove(index);
            }
            ValueCell::Bools(v) => {
                v.remove(index);
            }
            ValueCell::Objects(v) => {
                v.remove(index);
            }
        }
        Ok(())
    }

    fn expect_slot(&self, expected: SlotKind) -> Result<()> {
        let got = self.slot_kind();
        if got == expected {
            Ok(())
        } else {
            Err(Error::type_mismatch(expected, got))
        }
    }

    // --- ints ---

    pub fn ints(&self) -> Result<&[i32]> {
        match self {
            ValueCell::Ints(v) => Ok(v),
            other => Err(Error::type_mismatch(SlotKind::Ints, other.slot_kind())),
        }
    }

    pub fn int_at(&self, index: usize) -> Result<i32> {
        let v = self.ints()?;
        v.get(index)
            .copied()
            .ok_or_else(|| Error::element_out_of_range(index, v.len()))
    }

    pub fn as_int(&self) -> Result<i32> {
        self.int_at(0)
    }

    pub fn set_int_at(&mut self, index: usize, value: i32) -> Result<()> {
        match self {
            ValueCell::Ints(v) => set_slot(v, index, value),
            other => Err(Error::type_mismatch(SlotKind::Ints, other.slot_kind())),
        }
    }

    pub fn set_int(&mut self, value: i32) -> Result<()> {
        self.set_int_at(0, value)
    }

    // --- floats ---

    pub fn floats(&self) -> Result<&[f32]> {
        match self {
            ValueCell::Floats(v) => Ok(v),
            other => Err(Error::type_mismatch(SlotKind::Floats, other.slot_kind())),
        }
    }

    pub fn float_at(&self, index: usize) -> Result<f32> {
        let v = self.floats()?;
        v.get(index)
            .copied()
            .ok_or_else(|| Error::element_out_of_range(index, v.len()))
    }

    pub fn as_float(&self) -> Result<f32> {
        self.float_at(0)
    }

    pub fn set_float_at(&mut self, index: usize, value: f32) -> Result<()> {
        match self {
            ValueCell::Floats(v) => set_slot(v, index, value),
            other => Err(Error::type_mismatch(SlotKind::Floats, other.slot_kind())),
        }
    }

    pub fn set_float(&mut self, value: f32) -> Result<()> {
        self.set_float_at(0, value)
    }

    // --- bools ---

    pub fn bools(&self) -> Result<&[bool]> {
        match self {
            ValueCell::Bools(v) => Ok(v),
            other => Err(Error::type_mismatch(SlotKind::Bools, other.slot_kind())),
        }
    }

    pub fn bool_at(&self, index: usize) -> Result<bool> {
        let v = self.bools()?;
        v.get(index)
            .copied()
            .ok_or_else(|| Error::element_out_of_range(index, v.len()))
    }

    pub fn as_bool(&self) -> Result<bool> {
        self.bool_at(0)
    }

    pub fn set_bool_at(&mut self, index: usize, value: bool) -> Result<()> {
        match self {
            ValueCell::Bools(v) => set_slot(v, index, value),
            other => Err(Error::type_mismatch(SlotKind::Bools, other.slot_kind())),
        }
    }

    pub fn set_bool(&mut self, value: bool) -> Result<()> {
        self.set_bool_at(0, value)
    }

    // --- strings ---

    pub fn strings(&self) -> Result<&[String]> {
        match self {
            ValueCell::Strings(v) => Ok(v),
            other => Err(Error::type_mismatch(SlotKind::Strings, other.slot_kind())),
        }
    }

    pub fn str_at(&self, index: usize) -> Result<&str> {
        let v = self.strings()?;
        v.get(index)
            .map(String::as_str)
            .ok_or_else(|| Error::element_out_of_range(index, v.len()))
    }

    pub fn as_str(&self) -> Result<&str> {
        self.str_at(0)
    }

    pub fn set_string_at(&mut self, index: usize, value: impl Into<String>) -> Result<()> {
        match self {
            ValueCell::Strings(v) => set_slot(v, index, value.into()),
            other => Err(Error::type_mismatch(SlotKind::Strings, other.slot_kind())),
        }
    }

    pub fn set_string(&mut self, value: impl Into<String>) -> Result<()> {
        self.set_string_at(0, value)
    }

    // --- objects ---

    pub fn objects(&self) -> Result<&[ObjectRef]> {
        match self {
            ValueCell::Objects(v) => Ok(v),
            other => Err(Error::type_mismatch(SlotKind::Objects, other.slot_kind())),
        }
    }

    pub fn object_at(&self, index: usize) -> Result<&ObjectRef> {
        let v = self.objects()?;
        v.get(index)
            .ok_or_else(|| Error::element_out_of_range(index, v.len()))
    }

    pub fn as_object(&self) -> Result<&ObjectRef> {
        self.object_at(0)
    }

    pub fn set_object_at(&mut self, index: usize, value: ObjectRef) -> Result<()> {
        match self {
            ValueCell::Objects(v) => set_slot(v, index, value),
            other => Err(Error::type_mismatch(SlotKind::Objects, other.slot_kind())),
        }
    }

    pub fn set_object(&mut self, value: ObjectRef) -> Result<()> {
        self.set_object_at(0, value)
    }

    // --- complex payloads ---

    /// Decodes the complex payload at `index` of the string slot.
    pub fn complex_at<T: Complex>(&self, index: usize) -> Result<T> {
        complex::from_complex(self.str_at(index)?)
    }

    /// Decodes the scalar complex payload. An empty string yields `T::default()`.
    pub fn to_complex<T: Complex>(&self) -> Result<T> {
        self.complex_at(0)
    }

    /// Encodes `value` into the string slot at `index`.
    pub fn set_complex_at<T: Complex>(&mut self, index: usize, value: &T) -> Result<()> {
        let payload = complex::to_complex(value)?;
        self.set_string_at(index, payload)
    }

    pub fn set_complex<T: Complex>(&mut self, value: &T) -> Result<()> {
        self.set_complex_at(0, value)
    }
}

/// Writes `value` at `index`. Writing element 0 of an empty cell appends it,
/// so scalar setters work on freshly created array cells too.
fn set_slot<T>(slot: &mut Vec<T>, index: usize, value: T) -> Result<()> {
    if index < slot.len() {
        slot[index] = value;
        Ok(())
    } else if index == 0 && slot.is_empty() {
        slot.push(value);
        Ok(())
    } else {
        Err(Error::element_out_of_range(index, slot.len()))
    }
}
