//! Property-based tests for tabula-runtime using proptest.

use proptest::prelude::*;
use std::cell::RefCell;
use std::rc::Rc;
use tabula_core::schema::SchemaBuilder;
use tabula_core::{FieldId, SchemaId, TypeTag};
use tabula_runtime::{Keyed, Record, RowAccessor, RuntimeIndex};
use tabula_storage::{RowStore, TableHandle};

struct Item(RowAccessor);

impl Record for Item {
    const CLASS_NAME: &'static str = "Item";

    fn bind(accessor: RowAccessor) -> Self {
        Item(accessor)
    }

    fn accessor(&self) -> &RowAccessor {
        &self.0
    }
}

impl Keyed for Item {
    type Key = i32;
}

fn table(keys: &[i32]) -> TableHandle {
    let schema = SchemaBuilder::new("Item")
        .unwrap()
        .add_field("id", TypeTag::Int)
        .unwrap()
        .key("id")
        .unwrap()
        .build(SchemaId(1));
    let mut store = RowStore::new("Items", Rc::new(RefCell::new(schema)));
    for &key in keys {
        let row = store.add_row(None).unwrap();
        store.cell_mut(FieldId(1), row).unwrap().set_int(key).unwrap();
    }
    Rc::new(RefCell::new(store))
}

proptest! {
    /// `find` returns the first row holding the key, across several loads.
    #[test]
    fn find_returns_first_match(
        batches in prop::collection::vec(prop::collection::vec(-20i32..20, 0..10), 1..4),
        probe in -25i32..25,
    ) {
        let mut index = RuntimeIndex::new();
        index.register::<Item>();
        let tables: Vec<TableHandle> = batches.iter().map(|keys| table(keys)).collect();
        for t in &tables {
            index.set_data(std::slice::from_ref(t)).unwrap();
        }

        let expected = batches
            .iter()
            .enumerate()
            .flat_map(|(t, keys)| keys.iter().enumerate().map(move |(r, &k)| (t, r, k)))
            .find(|&(_, _, k)| k == probe);
        let found = index.find::<Item>(probe).unwrap();
        match (expected, found) {
            (None, None) => {}
            (Some((t, r, _)), Some(item)) => {
                prop_assert!(Rc::ptr_eq(item.accessor().table(), &tables[t]));
                prop_assert_eq!(item.accessor().row(), r);
            }
            (e, f) => prop_assert!(false, "expected {:?}, found {:?}", e, f.map(|i| i.accessor().row())),
        }

        let total: usize = batches.iter().map(Vec::len).sum();
        prop_assert_eq!(index.len(), total);
    }
}
