//! Row storage for Tabula.
//!
//! This module provides the `RowStore` struct which holds the data of one table
//! column by column. Every column is keyed by field id and is either fixed (one
//! cell shared by all rows) or per-row (exactly one cell per row). Structural
//! edits validate first and mutate second, so the rectangularity invariant
//! holds after every call, successful or not.

use crate::extend::ExtendSource;
use crate::SchemaHandle;
use alloc::boxed::Box;
use alloc::collections::BTreeMap;
use alloc::format;
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use tabula_core::schema::Schema;
use tabula_core::{Error, FieldId, Result, SchemaId, SlotKind, TypeTag, ValueCell};

/// Storage of one field.
#[derive(Clone, Debug, PartialEq)]
enum Column {
    /// One cell read by every row.
    Fixed(ValueCell),
    /// One cell per row.
    PerRow(Vec<ValueCell>),
}

/// Reorders `items` so that new position `i` holds old item `order[i]`.
pub(crate) fn permute<T>(items: Vec<T>, order: &[usize]) -> Vec<T> {
    let mut slots: Vec<Option<T>> = items.into_iter().map(Some).collect();
    order
        .iter()
        .filter_map(|&i| slots.get_mut(i).and_then(Option::take))
        .collect()
}

/// Computes the row order produced by moving `sources` before `insert_index`.
///
/// The block keeps the order the sources were given in (duplicates ignored).
/// Rows are conceptually removed high-to-low, and the insertion point shifts
/// down by the number of removed rows that sat strictly before it.
pub fn move_order(row_count: usize, insert_index: usize, sources: &[usize]) -> Vec<usize> {
    let mut block: Vec<usize> = Vec::with_capacity(sources.len());
    for &s in sources {
        if !block.contains(&s) {
            block.push(s);
        }
    }
    let remaining: Vec<usize> = (0..row_count).filter(|i| !block.contains(i)).collect();
    let before = block.iter().filter(|&&s| s < insert_index).count();
    let at = insert_index.saturating_sub(before).min(remaining.len());

    let mut order = Vec::with_capacity(row_count);
    order.extend_from_slice(&remaining[..at]);
    order.extend_from_slice(&block);
    order.extend_from_slice(&remaining[at..]);
    order
}

/// Column-oriented storage for one table bound to a schema.
#[derive(Debug)]
pub struct RowStore {
    name: String,
    schema: SchemaHandle,
    columns: BTreeMap<FieldId, Column>,
    row_count: usize,
    extension: Option<Box<dyn ExtendSource>>,
    dirty: bool,
}

impl RowStore {
    /// Creates an empty store with one column per field of `schema`.
    pub fn new(name: impl Into<String>, schema: SchemaHandle) -> Self {
        let columns = schema
            .borrow()
            .fields()
            .iter()
            .map(|f| (f.id(), Column::PerRow(Vec::new())))
            .collect();
        Self {
            name: name.into(),
            schema,
            columns,
            row_count: 0,
            extension: None,
            dirty: false,
        }
    }

    /// Returns the table name.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the schema this store is bound to.
    pub fn schema(&self) -> SchemaHandle {
        self.schema.clone()
    }

    /// Returns the id of the bound schema.
    pub fn schema_id(&self) -> SchemaId {
        self.schema.borrow().id()
    }

    /// Returns the class name of the bound schema.
    pub fn schema_name(&self) -> String {
        self.schema.borrow().name().to_string()
    }

    /// Returns the number of rows.
    #[inline]
    pub fn row_count(&self) -> usize {
        self.row_count
    }

    /// Returns true if the store has no rows.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.row_count == 0
    }

    /// Returns whether a column exists for `field`.
    pub fn has_column(&self, field: FieldId) -> bool {
        self.columns.contains_key(&field)
    }

    /// Returns the field ids that have a column.
    pub fn column_ids(&self) -> Vec<FieldId> {
        self.columns.keys().copied().collect()
    }

    /// Returns whether `field` is stored as one shared cell.
    pub fn is_fixed(&self, field: FieldId) -> bool {
        matches!(self.columns.get(&field), Some(Column::Fixed(_)))
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

    fn check_row(&self, row: usize) -> Result<()> {
        if row < self.row_count {
            Ok(())
        } else {
            Err(Error::row_out_of_range(row, self.row_count))
        }
    }

    fn missing_column(&self, field: FieldId) -> Error {
        let schema = self.schema.borrow();
        if schema.field(field).is_some() {
            Error::inconsistency(format!(
                "table {} has no column for {} declared by {}",
                self.name,
                field,
                schema.name()
            ))
        } else {
            Error::field_not_found(schema.name(), field)
        }
    }

    /// Verifies that the columns match the schema's fields one to one.
    fn ensure_columns(&self, schema: &Schema) -> Result<()> {
        if schema.fields().len() != self.columns.len()
            || schema.fields().iter().any(|f| !self.columns.contains_key(&f.id()))
        {
            return Err(Error::inconsistency(format!(
                "table {} columns {:?} do not match schema {} fields {:?}",
                self.name,
                self.column_ids(),
                schema.name(),
                schema.field_ids()
            )));
        }
        Ok(())
    }

    /// Verifies the rectangularity invariant and the schema pairing.
    pub fn check_rectangular(&self) -> Result<()> {
        self.ensure_columns(&self.schema.borrow())?;
        for (id, column) in &self.columns {
            if let Column::PerRow(cells) = column {
                if cells.len() != self.row_count {
                    return Err(Error::inconsistency(format!(
                        "column {} of table {} has {} cells for {} rows",
                        id,
                        self.name,
                        cells.len(),
                        self.row_count
                    )));
                }
            }
        }
        if let Some(ext) = &self.extension {
            if ext.row_count() != self.row_count {
                return Err(Error::inconsistency(format!(
                    "extension of table {} has {} rows, table has {}",
                    self.name,
                    ext.row_count(),
                    self.row_count
                )));
            }
        }
        Ok(())
    }

    // --- cells ---

    /// Gets the cell of `field` at `row`.
    pub fn cell(&self, field: FieldId, row: usize) -> Result<&ValueCell> {
        self.check_row(row)?;
        match self.columns.get(&field) {
            Some(Column::Fixed(cell)) => Ok(cell),
            Some(Column::PerRow(cells)) => cells
                .get(row)
                .ok_or_else(|| Error::inconsistency(format!("column {} is ragged", field))),
            None => Err(self.missing_column(field)),
        }
    }

    /// Gets the mutable cell of `field` at `row`.
    ///
    /// For a fixed field this is the shared cell, so a write affects every row.
    pub fn cell_mut(&mut self, field: FieldId, row: usize) -> Result<&mut ValueCell> {
        self.check_row(row)?;
        if !self.columns.contains_key(&field) {
            return Err(self.missing_column(field));
        }
        self.dirty = true;
        match self.columns.get_mut(&field) {
            Some(Column::Fixed(cell)) => Ok(cell),
            Some(Column::PerRow(cells)) => cells
                .get_mut(row)
                .ok_or_else(|| Error::inconsistency(format!("column {} is ragged", field))),
            None => Err(Error::inconsistency(format!("column {} vanished", field))),
        }
    }

    /// Replaces the cell of `field` at `row`. The cell must fit the field's type.
    pub fn set_cell(&mut self, field: FieldId, row: usize, value: ValueCell) -> Result<()> {
        self.schema.borrow().require_field(field)?.check_value(&value)?;
        *self.cell_mut(field, row)? = value;
        Ok(())
    }

    // --- columns ---

    /// Adds a column for `field`, backfilling one default cell per existing row.
    ///
    /// No-op if the column already exists.
    pub fn add_field(&mut self, field: FieldId) -> Result<()> {
        if self.columns.contains_key(&field) {
            return Ok(());
        }
        let default = self.schema.borrow().require_field(field)?.default_value().copy();
        let cells = (0..self.row_count).map(|_| default.copy()).collect();
        self.columns.insert(field, Column::PerRow(cells));
        self.dirty = true;
        tracing::debug!(table = %self.name, field = field.0, rows = self.row_count, "column added");
        Ok(())
    }

    /// Drops the column of `field`. Returns whether a column was removed.
    pub fn remove_field(&mut self, field: FieldId) -> bool {
        let removed = self.columns.remove(&field).is_some();
        if removed {
            self.dirty = true;
            tracing::debug!(table = %self.name, field = field.0, "column removed");
        }
        removed
    }

    /// Switches `field` between a shared cell and per-row cells.
    ///
    /// Fixing keeps row 0's value (or the default when empty); unfixing copies
    /// the shared value into every row.
    pub fn set_fixed(&mut self, field: FieldId, fixed: bool) -> Result<()> {
        let default = self.schema.borrow().require_field(field)?.default_value().copy();
        let row_count = self.row_count;
        let column = match self.columns.get_mut(&field) {
            Some(column) => column,
            None => return Err(self.missing_column(field)),
        };
        let next = match (&*column, fixed) {
            (Column::PerRow(cells), true) => {
                Column::Fixed(cells.first().map(ValueCell::copy).unwrap_or(default))
            }
            (Column::Fixed(cell), false) => {
                Column::PerRow((0..row_count).map(|_| cell.copy()).collect())
            }
            _ => return Ok(()),
        };
        *column = next;
        self.dirty = true;
        Ok(())
    }

    /// Overwrites every row's cell of `field` with the schema default.
    ///
    /// This is a destructive broadcast; existing values are lost.
    pub fn update_default(&mut self, field: FieldId) -> Result<()> {
        let default = self.schema.borrow().require_field(field)?.default_value().copy();
        match self.columns.get_mut(&field) {
            Some(Column::Fixed(cell)) => *cell = default,
            Some(Column::PerRow(cells)) => {
                for cell in cells.iter_mut() {
                    *cell = default.copy();
                }
            }
            None => return Err(self.missing_column(field)),
        }
        self.dirty = true;
        tracing::debug!(table = %self.name, field = field.0, rows = self.row_count, "default broadcast");
        Ok(())
    }

    // --- rows ---

    /// Appends a row and returns its index.
    ///
    /// Each per-row column receives a copy of `copy_from`'s cell, or the
    /// field default. With auto-increment on an `Int` key, a fresh row gets
    /// `max(key) + 1` (at least 1) as its key.
    pub fn add_row(&mut self, copy_from: Option<usize>) -> Result<usize> {
        if let Some(src) = copy_from {
            self.check_row(src)?;
        }
        let schema_rc = self.schema.clone();
        let schema = schema_rc.borrow();
        self.ensure_columns(&schema)?;

        let auto_key = match schema.key_field() {
            Some(key) if copy_from.is_none() && schema.auto_increment() && key.type_tag() == TypeTag::Int => {
                let next = self.max_key()?.checked_add(1).ok_or_else(|| {
                    Error::invalid_operation(format!("{}: key space exhausted", self.name))
                })?;
                Some((key.id(), next.max(1)))
            }
            _ => None,
        };

        for field in schema.fields() {
            if let Some(Column::PerRow(cells)) = self.columns.get_mut(&field.id()) {
                let cell = match copy_from {
                    Some(src) => cells[src].copy(),
                    None => field.default_value().copy(),
                };
                cells.push(cell);
            }
        }
        let row = self.row_count;
        self.row_count += 1;

        if let Some((key_id, value)) = auto_key {
            if let Some(Column::PerRow(cells)) = self.columns.get_mut(&key_id) {
                cells[row].set_int(value)?;
            }
        }
        if let Some(ext) = self.extension.as_mut() {
            ext.push_row();
        }
        self.dirty = true;
        tracing::debug!(table = %self.name, row, copied = copy_from.is_some(), "row added");
        Ok(row)
    }

    /// Removes the rows at `indexes`.
    ///
    /// Indexes are applied high-to-low whatever order they are passed in, and
    /// all columns plus the linked extension are pruned together. Nothing is
    /// removed if any index is out of range.
    pub fn remove_rows(&mut self, indexes: &[usize]) -> Result<()> {
        let mut sorted: Vec<usize> = indexes.to_vec();
        sorted.sort_unstable_by(|a, b| b.cmp(a));
        sorted.dedup();
        if let Some(&max) = sorted.first() {
            self.check_row(max)?;
        }
        for &index in &sorted {
            for column in self.columns.values_mut() {
                if let Column::PerRow(cells) = column {
                    cells.remove(index);
                }
            }
            if let Some(ext) = self.extension.as_mut() {
                ext.remove_row(index);
            }
        }
        self.row_count -= sorted.len();
        self.dirty = true;
        tracing::debug!(table = %self.name, removed = sorted.len(), rows = self.row_count, "rows removed");
        Ok(())
    }

    /// Replaces every per-row cell at `index` with a fresh zero-valued cell.
    ///
    /// Data loss is intended; callers confirm before invoking.
    pub fn reset_row(&mut self, index: usize) -> Result<()> {
        self.check_row(index)?;
        let schema_rc = self.schema.clone();
        let schema = schema_rc.borrow();
        self.ensure_columns(&schema)?;
        for field in schema.fields() {
            if let Some(Column::PerRow(cells)) = self.columns.get_mut(&field.id()) {
                cells[index] = field.zero_cell();
            }
        }
        self.dirty = true;
        tracing::debug!(table = %self.name, row = index, "row reset");
        Ok(())
    }

    /// Moves the rows at `sources` to just before the row at `insert_index`.
    ///
    /// Equivalent to cutting the selected rows (in the order given) and pasting
    /// them as a block. `insert_index == row_count` moves them to the end.
    pub fn insert(&mut self, insert_index: usize, sources: &[usize]) -> Result<()> {
        if insert_index > self.row_count {
            return Err(Error::row_out_of_range(insert_index, self.row_count));
        }
        for &s in sources {
            self.check_row(s)?;
        }
        if sources.is_empty() {
            return Ok(());
        }
        let order = move_order(self.row_count, insert_index, sources);
        self.reorder(&order)?;
        tracing::debug!(table = %self.name, insert_index, moved = sources.len(), "rows moved");
        Ok(())
    }

    /// Reorders all rows so that new row `i` is old row `order[i]`.
    pub fn reorder(&mut self, order: &[usize]) -> Result<()> {
        let mut seen = alloc::vec![false; self.row_count];
        if order.len() != self.row_count {
            return Err(Error::invalid_operation(format!(
                "row order has {} entries for {} rows",
                order.len(),
                self.row_count
            )));
        }
        for &i in order {
            match seen.get_mut(i) {
                Some(slot) if !*slot => *slot = true,
                _ => {
                    return Err(Error::invalid_operation(format!(
                        "row order is not a permutation: {:?}",
                        order
                    )))
                }
            }
        }
        for column in self.columns.values_mut() {
            if let Column::PerRow(cells) = column {
                *cells = permute(core::mem::take(cells), order);
            }
        }
        if let Some(ext) = self.extension.as_mut() {
            ext.relocate(order);
        }
        self.dirty = true;
        Ok(())
    }

    // --- keys ---

    /// Returns the largest integer stored in the key field, or 0.
    ///
    /// Also 0 when there is no key field or the key is not integer-backed.
    pub fn max_key(&self) -> Result<i32> {
        let key_id = match self.schema.borrow().key_field() {
            Some(f) if f.type_tag().slot_kind() == SlotKind::Ints => f.id(),
            _ => return Ok(0),
        };
        let mut max: Option<i32> = None;
        for row in 0..self.row_count {
            let v = self.cell(key_id, row)?.as_int()?;
            max = Some(max.map_or(v, |m| m.max(v)));
        }
        Ok(max.unwrap_or(0))
    }

    /// Returns the key of `row` rendered as a string, if the schema has a key.
    pub fn key_string(&self, row: usize) -> Result<Option<String>> {
        let key_id = match self.schema.borrow().key_id() {
            Some(id) => id,
            None => return Ok(None),
        };
        let cell = self.cell(key_id, row)?;
        Ok(Some(match cell {
            ValueCell::Strings(_) => cell.as_str()?.to_string(),
            _ => cell.as_int()?.to_string(),
        }))
    }

    /// Finds the first row whose key field equals `key`.
    ///
    /// String keys compare textually; integer and enum keys compare against
    /// `key` parsed as an integer. Linear scan.
    pub fn find_row_by_key(&self, key: &str) -> Result<Option<usize>> {
        let key_id = match self.schema.borrow().key_id() {
            Some(id) => id,
            None => return Ok(None),
        };
        let parsed = key.trim().parse::<i32>().ok();
        for row in 0..self.row_count {
            let cell = self.cell(key_id, row)?;
            let hit = match cell {
                ValueCell::Strings(_) => cell.as_str()? == key,
                ValueCell::Ints(_) => parsed == Some(cell.as_int()?),
                _ => false,
            };
            if hit {
                return Ok(Some(row));
            }
        }
        Ok(None)
    }

    // --- extension ---

    /// Links an external array source. Its row count must match the table.
    pub fn attach_extension(&mut self, source: Box<dyn ExtendSource>) -> Result<()> {
        if source.row_count() != self.row_count {
            return Err(Error::inconsistency(format!(
                "extension has {} rows, table {} has {}",
                source.row_count(),
                self.name,
                self.row_count
            )));
        }
        self.extension = Some(source);
        Ok(())
    }

    /// Unlinks and returns the external array source.
    pub fn detach_extension(&mut self) -> Option<Box<dyn ExtendSource>> {
        self.extension.take()
    }

    /// Returns the linked external array source.
    pub fn extension(&self) -> Option<&dyn ExtendSource> {
        self.extension.as_deref()
    }
}
