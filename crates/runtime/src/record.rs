//! The contract between generated record types and the runtime index.
//!
//! A record type wraps a `RowAccessor` and exposes one typed property per
//! field. Its `CLASS_NAME` must equal the class name of the schema it was
//! generated from; the index uses it to route loaded tables to factories.

use crate::accessor::RowAccessor;
use alloc::string::String;
use tabula_core::Result;

/// A typed view over rows of one schema.
pub trait Record: Sized + 'static {
    /// Class name of the schema this type reads.
    const CLASS_NAME: &'static str;

    /// Wraps one row.
    fn bind(accessor: RowAccessor) -> Self;

    /// Returns the wrapped row.
    fn accessor(&self) -> &RowAccessor;
}

/// A key value that can be read from a row's key field.
pub trait RecordKey: Clone + PartialEq + core::fmt::Debug {
    fn read(accessor: &RowAccessor) -> Result<Self>;
}

impl RecordKey for i32 {
    fn read(accessor: &RowAccessor) -> Result<Self> {
        accessor.key_int()
    }
}

impl RecordKey for String {
    fn read(accessor: &RowAccessor) -> Result<Self> {
        accessor.key_string()
    }
}

/// A record whose schema declares a key field.
pub trait Keyed: Record {
    type Key: RecordKey;

    /// Reads this row's key.
    fn key(&self) -> Result<Self::Key> {
        Self::Key::read(self.accessor())
    }
}

/// Records keyed by an `Int` (or `Enum`) field.
pub trait IntKeyed: Keyed<Key = i32> {}

impl<T: Keyed<Key = i32>> IntKeyed for T {}

/// Records keyed by a `String` field.
pub trait StringKeyed: Keyed<Key = String> {}

impl<T: Keyed<Key = String>> StringKeyed for T {}
