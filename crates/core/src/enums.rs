//! Enum registry for Tabula.
//!
//! Each enum define is a list of `(key, display name)` pairs. Keys are
//! assigned once and never reassigned, so rows store keys while display names
//! stay freely renameable. A stored key whose value was removed is "orphaned":
//! lenient lookups resolve it to index 0 and log a warning instead of failing.

use crate::error::{Error, Result};
use crate::naming::normalize_name;
use crate::types::EnumId;
use alloc::rc::Rc;
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use core::cell::RefCell;
use hashbrown::HashMap;
use serde::{Deserialize, Serialize};

/// Label for a key with no matching value.
pub const UNDEFINED_LABEL: &str = "undefined";
/// Label for a flags value with no bits set.
pub const FLAGS_NONE_LABEL: &str = "None";
/// Label for a flags value with every defined bit set.
pub const FLAGS_ALL_LABEL: &str = "All";
/// Flags defines map keys to bits `1 << (key - 1)`, so 32 keys at most.
pub const MAX_FLAG_KEY: u32 = 32;

/// One value of an enum define.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnumValue {
    pub key: u32,
    pub display_name: String,
}

/// A named enumeration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnumDefine {
    id: EnumId,
    name: String,
    is_flags: bool,
    values: Vec<EnumValue>,
    /// Highest key ever assigned, so removed keys are never handed out again.
    #[serde(default)]
    last_key: u32,
}

impl EnumDefine {
    #[inline]
    pub fn id(&self) -> EnumId {
        self.id
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn is_flags(&self) -> bool {
        self.is_flags
    }

    #[inline]
    pub fn values(&self) -> &[EnumValue] {
        &self.values
    }

    fn next_key(&self) -> u32 {
        self.values
            .iter()
            .map(|v| v.key)
            .max()
            .unwrap_or(0)
            .max(self.last_key)
            + 1
    }
}

/// Resolved lookup tables for one define.
#[derive(Debug)]
pub struct EnumLookup {
    names: Vec<String>,
    keys: Vec<u32>,
    index_by_key: HashMap<u32, usize>,
    key_by_name: HashMap<String, u32>,
}

impl EnumLookup {
    fn build(define: &EnumDefine) -> Self {
        let mut index_by_key = HashMap::with_capacity(define.values.len());
        let mut key_by_name = HashMap::with_capacity(define.values.len());
        for (i, v) in define.values.iter().enumerate() {
            index_by_key.insert(v.key, i);
            key_by_name.insert(v.display_name.clone(), v.key);
        }
        Self {
            names: define.values.iter().map(|v| v.display_name.clone()).collect(),
            keys: define.values.iter().map(|v| v.key).collect(),
            index_by_key,
            key_by_name,
        }
    }

    /// Display names in value order.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Keys in value order.
    pub fn keys(&self) -> &[u32] {
        &self.keys
    }

    fn index_of(&self, key: i32) -> Option<usize> {
        u32::try_from(key)
            .ok()
            .and_then(|k| self.index_by_key.get(&k).copied())
    }
}

/// Registry of enum defines.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct EnumRegistry {
    defines: Vec<EnumDefine>,
    #[serde(skip)]
    cache: RefCell<HashMap<EnumId, Rc<EnumLookup>>>,
    #[serde(skip)]
    dirty: bool,
}

impl Clone for EnumRegistry {
    fn clone(&self) -> Self {
        Self {
            defines: self.defines.clone(),
            cache: RefCell::new(HashMap::new()),
            dirty: self.dirty,
        }
    }
}

impl EnumRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns all defines in creation order.
    pub fn defines(&self) -> &[EnumDefine] {
        &self.defines
    }

    /// Gets a define by id.
    pub fn define(&self, id: EnumId) -> Option<&EnumDefine> {
        self.defines.iter().find(|d| d.id == id)
    }

    /// Gets a define by name.
    pub fn define_by_name(&self, name: &str) -> Option<&EnumDefine> {
        self.defines.iter().find(|d| d.name == name)
    }

    fn define_mut(&mut self, id: EnumId) -> Result<&mut EnumDefine> {
        self.defines
            .iter_mut()
            .find(|d| d.id == id)
            .ok_or(Error::EnumNotFound { define: id })
    }

    fn get(&self, id: EnumId) -> Result<&EnumDefine> {
        self.define(id).ok_or(Error::EnumNotFound { define: id })
    }

    /// Returns whether the registry changed since the last `clear_dirty`.
    #[inline]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn clear_dirty(&mut self) {
        self.dirty = false;
    }

    fn touch(&mut self) {
        self.cache.borrow_mut().clear();
        self.dirty = true;
    }

    fn check_define_name(&self, name: &str, ignore: Option<EnumId>) -> Result<String> {
        let name = normalize_name(name)?;
        if self
            .defines
            .iter()
            .any(|d| d.name == name && Some(d.id) != ignore)
        {
            return Err(Error::duplicate_name(name));
        }
        Ok(name)
    }

    /// Adds an empty define and returns its id.
    pub fn add_define(&mut self, name: &str) -> Result<EnumId> {
        let name = self.check_define_name(name, None)?;
        let id = EnumId(self.defines.iter().map(|d| d.id.0).max().map_or(1, |m| m + 1));
        tracing::debug!(define = id.0, name = %name, "enum define added");
        self.defines.push(EnumDefine {
            id,
            name,
            is_flags: false,
            values: Vec::new(),
            last_key: 0,
        });
        self.touch();
        Ok(id)
    }

    /// Renames a define. Its id and values are unaffected.
    pub fn rename(&mut self, id: EnumId, new_name: &str) -> Result<()> {
        let name = self.check_define_name(new_name, Some(id))?;
        self.define_mut(id)?.name = name;
        self.touch();
        Ok(())
    }

    /// Removes a define.
    ///
    /// Fields referencing it are not touched here; `Catalog::remove_enum_define`
    /// performs that cascade.
    pub fn remove_define(&mut self, id: EnumId) -> Result<EnumDefine> {
        let pos = self
            .defines
            .iter()
            .position(|d| d.id == id)
            .ok_or(Error::EnumNotFound { define: id })?;
        let removed = self.defines.remove(pos);
        tracing::debug!(define = id.0, name = %removed.name, "enum define removed");
        self.touch();
        Ok(removed)
    }

    /// Marks a define as a flags (bit set) enumeration.
    pub fn set_flags(&mut self, id: EnumId, is_flags: bool) -> Result<()> {
        let define = self.define_mut(id)?;
        if is_flags && define.values.iter().any(|v| v.key > MAX_FLAG_KEY) {
            return Err(Error::invalid_operation(
                "flags defines support at most 32 values",
            ));
        }
        define.is_flags = is_flags;
        self.touch();
        Ok(())
    }

    /// Appends a value and returns its newly assigned key.
    pub fn add_value(&mut self, id: EnumId, display_name: &str) -> Result<u32> {
        let display_name = normalize_name(display_name)?;
        let define = self.define_mut(id)?;
        if define.values.iter().any(|v| v.display_name == display_name) {
            return Err(Error::duplicate_name(display_name));
        }
        let key = define.next_key();
        if define.is_flags && key > MAX_FLAG_KEY {
            return Err(Error::invalid_operation(
                "flags defines support at most 32 values",
            ));
        }
        define.last_key = key;
        define.values.push(EnumValue { key, display_name });
        self.touch();
        Ok(key)
    }

    /// Removes the value at `index`. Rows still holding its key become orphaned.
    pub fn remove_value(&mut self, id: EnumId, index: usize) -> Result<EnumValue> {
        let define = self.define_mut(id)?;
        if index >= define.values.len() {
            return Err(Error::element_out_of_range(index, define.values.len()));
        }
        let removed = define.values.remove(index);
        self.touch();
        Ok(removed)
    }

    /// Renames the value at `index`. Its key is unaffected.
    pub fn rename_value(&mut self, id: EnumId, index: usize, new_name: &str) -> Result<()> {
        let new_name = normalize_name(new_name)?;
        let define = self.define_mut(id)?;
        if define
            .values
            .iter()
            .enumerate()
            .any(|(i, v)| i != index && v.display_name == new_name)
        {
            return Err(Error::duplicate_name(new_name));
        }
        let len = define.values.len();
        let value = define
            .values
            .get_mut(index)
            .ok_or_else(|| Error::element_out_of_range(index, len))?;
        value.display_name = new_name;
        self.touch();
        Ok(())
    }

    /// Returns the cached lookup tables for a define.
    pub fn lookup(&self, id: EnumId) -> Result<Rc<EnumLookup>> {
        if let Some(hit) = self.cache.borrow().get(&id) {
            return Ok(hit.clone());
        }
        let lookup = Rc::new(EnumLookup::build(self.get(id)?));
        self.cache.borrow_mut().insert(id, lookup.clone());
        Ok(lookup)
    }

    /// Returns the display names of a define in value order.
    pub fn get_display_names(&self, id: EnumId) -> Result<Vec<String>> {
        Ok(self.lookup(id)?.names.clone())
    }

    /// Returns the key of the value with the given display name.
    pub fn key_for_display_name(&self, id: EnumId, name: &str) -> Result<u32> {
        self.lookup(id)?
            .key_by_name
            .get(name)
            .copied()
            .ok_or_else(|| Error::EnumValueNotFound {
                define: id,
                value: name.to_string(),
            })
    }

    /// Returns the display index of a stored key.
    ///
    /// Orphaned keys resolve to index 0 and are logged.
    pub fn index_for_key(&self, id: EnumId, key: i32) -> Result<usize> {
        match self.try_index_for_key(id, key) {
            Err(Error::OrphanedEnumKey { .. }) => {
                tracing::warn!(define = id.0, key, "orphaned enum key, falling back to index 0");
                Ok(0)
            }
            other => other,
        }
    }

    /// Returns the display index of a stored key, failing on orphaned keys.
    pub fn try_index_for_key(&self, id: EnumId, key: i32) -> Result<usize> {
        self.lookup(id)?
            .index_of(key)
            .ok_or(Error::OrphanedEnumKey { define: id, key })
    }

    /// Returns the key stored for the value at a display index.
    pub fn key_at_index(&self, id: EnumId, index: usize) -> Result<u32> {
        let lookup = self.lookup(id)?;
        lookup
            .keys
            .get(index)
            .copied()
            .ok_or_else(|| Error::element_out_of_range(index, lookup.keys.len()))
    }

    /// Returns the display name for a stored key, or `"undefined"` if orphaned.
    pub fn display_name_for_key(&self, id: EnumId, key: i32) -> Result<String> {
        let lookup = self.lookup(id)?;
        Ok(match lookup.index_of(key) {
            Some(i) => lookup.names[i].clone(),
            None => {
                tracing::warn!(define = id.0, key, "orphaned enum key");
                UNDEFINED_LABEL.to_string()
            }
        })
    }

    /// Returns the bit a flags value with `key` occupies.
    pub fn flag_bit(key: u32) -> i32 {
        if key == 0 || key > MAX_FLAG_KEY {
            0
        } else {
            (1u32 << (key - 1)) as i32
        }
    }

    /// Returns the value with every defined bit of a define set.
    pub fn all_flags(&self, id: EnumId) -> Result<i32> {
        Ok(self
            .lookup(id)?
            .keys
            .iter()
            .fold(0i32, |acc, &k| acc | Self::flag_bit(k)))
    }

    /// Renders a flags value as a human readable label.
    ///
    /// `0` renders as `"None"`, every defined bit (or `-1`) as `"All"`,
    /// anything else as the set values' names joined with `", "`.
    pub fn flags_label(&self, id: EnumId, value: i32) -> Result<String> {
        if value == 0 {
            return Ok(FLAGS_NONE_LABEL.to_string());
        }
        let all = self.all_flags(id)?;
        if value == -1 || (all != 0 && value & all == all) {
            return Ok(FLAGS_ALL_LABEL.to_string());
        }
        let lookup = self.lookup(id)?;
        let parts: Vec<&str> = lookup
            .keys
            .iter()
            .zip(lookup.names.iter())
            .filter(|(&k, _)| value & Self::flag_bit(k) != 0)
            .map(|(_, n)| n.as_str())
            .collect();
        if parts.is_empty() {
            return Ok(UNDEFINED_LABEL.to_string());
        }
        Ok(parts.join(", "))
    }
}
