//! Externally owned array columns linked to a row store.
//!
//! Some integrations keep extra array-valued data per row outside the schema.
//! A row store can carry one such source and keeps it row-aligned: every row
//! added, removed or moved is mirrored into the source.

use alloc::collections::BTreeMap;
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use core::fmt;
use tabula_core::{Error, Result, TypeTag, ValueCell};

/// A value source that reports a row count and exposes named array properties.
pub trait ExtendSource: fmt::Debug {
    /// Number of rows the source holds.
    fn row_count(&self) -> usize;

    /// Names of the array-valued properties the source exposes.
    fn array_properties(&self) -> Vec<String>;

    /// Element count of `property` at `row`, or `None` if either is unknown.
    fn element_count(&self, property: &str, row: usize) -> Option<usize>;

    /// Appends an empty row.
    fn push_row(&mut self);

    /// Removes the row at `index`.
    fn remove_row(&mut self, index: usize);

    /// Reorders rows so that new row `i` is old row `order[i]`.
    ///
    /// `order` is always a permutation of `0..row_count()`.
    fn relocate(&mut self, order: &[usize]);
}

/// In-memory `ExtendSource` holding one array cell per row per property.
#[derive(Clone, Debug, Default)]
pub struct ArrayColumns {
    rows: usize,
    properties: BTreeMap<String, (TypeTag, Vec<ValueCell>)>,
}

impl ArrayColumns {
    /// Creates a source with `rows` rows and no properties.
    pub fn new(rows: usize) -> Self {
        Self {
            rows,
            properties: BTreeMap::new(),
        }
    }

    /// Adds an array property; every row starts with an empty array.
    pub fn add_property(&mut self, name: impl Into<String>, tag: TypeTag) -> Result<()> {
        let name = name.into();
        if self.properties.contains_key(&name) {
            return Err(Error::duplicate_name(name));
        }
        let cells = (0..self.rows)
            .map(|_| ValueCell::default_for(tag, true))
            .collect();
        self.properties.insert(name, (tag, cells));
        Ok(())
    }

    /// Gets the array cell of `property` at `row`.
    pub fn cell(&self, property: &str, row: usize) -> Result<&ValueCell> {
        let (_, cells) = self.property(property)?;
        cells
            .get(row)
            .ok_or_else(|| Error::row_out_of_range(row, self.rows))
    }

    /// Gets the mutable array cell of `property` at `row`.
    pub fn cell_mut(&mut self, property: &str, row: usize) -> Result<&mut ValueCell> {
        let rows = self.rows;
        let (_, cells) = self
            .properties
            .get_mut(property)
            .ok_or_else(|| Error::invalid_operation(alloc::format!("Unknown property: {}", property)))?;
        cells
            .get_mut(row)
            .ok_or_else(|| Error::row_out_of_range(row, rows))
    }

    /// Returns the element type of a property.
    pub fn property_type(&self, property: &str) -> Result<TypeTag> {
        self.property(property).map(|(tag, _)| *tag)
    }

    fn property(&self, property: &str) -> Result<&(TypeTag, Vec<ValueCell>)> {
        self.properties
            .get(property)
            .ok_or_else(|| Error::invalid_operation(alloc::format!("Unknown property: {}", property)))
    }
}

impl ExtendSource for ArrayColumns {
    fn row_count(&self) -> usize {
        self.rows
    }

    fn array_properties(&self) -> Vec<String> {
        self.properties.keys().map(|k| k.to_string()).collect()
    }

    fn element_count(&self, property: &str, row: usize) -> Option<usize> {
        self.properties
            .get(property)
            .and_then(|(_, cells)| cells.get(row))
            .map(|c| c.size())
    }

    fn push_row(&mut self) {
        for (tag, cells) in self.properties.values_mut() {
            cells.push(ValueCell::default_for(*tag, true));
        }
        self.rows += 1;
    }

    fn remove_row(&mut self, index: usize) {
        if index >= self.rows {
            return;
        }
        for (_, cells) in self.properties.values_mut() {
            cells.remove(index);
        }
        self.rows -= 1;
    }

    fn relocate(&mut self, order: &[usize]) {
        for (_, cells) in self.properties.values_mut() {
            *cells = crate::row_store::permute(core::mem::take(cells), order);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_array_columns_rows() {
        let mut ext = ArrayColumns::new(2);
        ext.add_property("Drops", TypeTag::Int).unwrap();
        assert_eq!(ext.row_count(), 2);
        assert_eq!(ext.element_count("Drops", 1), Some(0));
        assert!(ext.add_property("Drops", TypeTag::Int).is_err());
        assert_eq!(ext.array_properties(), ["Drops"]);

        ext.cell_mut("Drops", 1).unwrap().add_element(TypeTag::Int).unwrap();
        ext.push_row();
        assert_eq!(ext.row_count(), 3);
        assert_eq!(ext.element_count("Drops", 1), Some(1));

        ext.remove_row(0);
        assert_eq!(ext.row_count(), 2);
        assert_eq!(ext.element_count("Drops", 0), Some(1));
        assert_eq!(ext.element_count("Missing", 0), None);
    }

    #[test]
    fn test_array_columns_relocate() {
        let mut ext = ArrayColumns::new(3);
        ext.add_property("Drops", TypeTag::Int).unwrap();
        for row in 0..3 {
            let cell = ext.cell_mut("Drops", row).unwrap();
            for _ in 0..row {
                cell.add_element(TypeTag::Int).unwrap();
            }
        }
        ext.relocate(&[2, 0, 1]);
        assert_eq!(ext.element_count("Drops", 0), Some(2));
        assert_eq!(ext.element_count("Drops", 1), Some(0));
        assert_eq!(ext.element_count("Drops", 2), Some(1));
        assert_eq!(ext.property_type("Drops").unwrap(), TypeTag::Int);
    }
}
