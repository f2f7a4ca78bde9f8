//! Error types for Tabula.

use crate::types::{EnumId, FieldId, SchemaId, SlotKind};
use alloc::string::String;
use core::fmt;

/// Result type alias for Tabula operations.
pub type Result<T> = core::result::Result<T, Error>;

/// Error types for Tabula operations.
///
/// `FieldNotFound`, `SchemaInconsistency` and `RowIndexOutOfRange` mean a
/// schema and a row store went out of sync; callers should treat them as bugs.
/// Naming errors are returned before any state is touched.
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// Field id not declared by the schema.
    FieldNotFound {
        schema: String,
        field: FieldId,
    },
    /// Row store and schema disagree about structure.
    SchemaInconsistency {
        message: String,
    },
    /// Row index past the end of a table.
    RowIndexOutOfRange {
        index: usize,
        len: usize,
    },
    /// Element index past the end of an array cell.
    ElementIndexOutOfRange {
        index: usize,
        len: usize,
    },
    /// Enum-typed field read before an enum registry was supplied.
    MissingEnumRegistry {
        field: FieldId,
    },
    /// Stored enum key with no matching value.
    OrphanedEnumKey {
        define: EnumId,
        key: i32,
    },
    /// Name already taken.
    DuplicateName {
        name: String,
    },
    /// Name violates the naming rules.
    InvalidName {
        name: String,
        reason: &'static str,
    },
    /// Cell slot does not match the expected slot.
    TypeMismatch {
        expected: SlotKind,
        got: SlotKind,
    },
    /// Field cannot be designated as the key.
    InvalidKeyField {
        field: FieldId,
        reason: &'static str,
    },
    /// Enum define not found.
    EnumNotFound {
        define: EnumId,
    },
    /// Enum value not found.
    EnumValueNotFound {
        define: EnumId,
        value: String,
    },
    /// Schema not found.
    SchemaNotFound {
        name: String,
    },
    /// Table not found.
    TableNotFound {
        name: String,
    },
    /// Complex payload could not be decoded.
    Codec {
        message: String,
    },
    /// Invalid operation.
    InvalidOperation {
        message: String,
    },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::FieldNotFound { schema, field } => {
                write!(f, "Field {} not declared by schema {}", field, schema)
            }
            Error::SchemaInconsistency { message } => {
                write!(f, "Schema inconsistency: {}", message)
            }
            Error::RowIndexOutOfRange { index, len } => {
                write!(f, "Row index {} out of range (row count {})", index, len)
            }
            Error::ElementIndexOutOfRange { index, len } => {
                write!(f, "Element index {} out of range (size {})", index, len)
            }
            Error::MissingEnumRegistry { field } => {
                write!(f, "No enum registry bound while reading {}", field)
            }
            Error::OrphanedEnumKey { define, key } => {
                write!(f, "Key {} has no value in {}", key, define)
            }
            Error::DuplicateName { name } => write!(f, "Name already exists: {}", name),
            Error::InvalidName { name, reason } => {
                write!(f, "Invalid name {:?}: {}", name, reason)
            }
            Error::TypeMismatch { expected, got } => {
                write!(f, "Type mismatch: expected {} slot, got {} slot", expected, got)
            }
            Error::InvalidKeyField { field, reason } => {
                write!(f, "{} cannot be the key field: {}", field, reason)
            }
            Error::EnumNotFound { define } => write!(f, "Enum define not found: {}", define),
            Error::EnumValueNotFound { define, value } => {
                write!(f, "Value {} not found in {}", value, define)
            }
            Error::SchemaNotFound { name } => write!(f, "Schema not found: {}", name),
            Error::TableNotFound { name } => write!(f, "Table not found: {}", name),
            Error::Codec { message } => write!(f, "Complex value codec error: {}", message),
            Error::InvalidOperation { message } => write!(f, "Invalid operation: {}", message),
        }
    }
}

impl Error {
    /// Creates a field not found error.
    pub fn field_not_found(schema: impl Into<String>, field: FieldId) -> Self {
        Error::FieldNotFound {
            schema: schema.into(),
            field,
        }
    }

    /// Creates a schema inconsistency error.
    pub fn inconsistency(message: impl Into<String>) -> Self {
        Error::SchemaInconsistency {
            message: message.into(),
        }
    }

    /// Creates a row index error.
    pub fn row_out_of_range(index: usize, len: usize) -> Self {
        Error::RowIndexOutOfRange { index, len }
    }

    /// Creates an element index error.
    pub fn element_out_of_range(index: usize, len: usize) -> Self {
        Error::ElementIndexOutOfRange { index, len }
    }

    /// Creates a type mismatch error.
    pub fn type_mismatch(expected: SlotKind, got: SlotKind) -> Self {
        Error::TypeMismatch { expected, got }
    }

    /// Creates a duplicate name error.
    pub fn duplicate_name(name: impl Into<String>) -> Self {
        Error::DuplicateName { name: name.into() }
    }

    /// Creates an invalid name error.
    pub fn invalid_name(name: impl Into<String>, reason: &'static str) -> Self {
        Error::InvalidName {
            name: name.into(),
            reason,
        }
    }

    /// Creates a schema not found error.
    pub fn schema_not_found(name: impl Into<String>) -> Self {
        Error::SchemaNotFound { name: name.into() }
    }

    /// Creates a schema not found error from an id.
    pub fn schema_id_not_found(id: SchemaId) -> Self {
        Error::SchemaNotFound {
            name: alloc::format!("{}", id),
        }
    }

    /// Creates a table not found error.
    pub fn table_not_found(name: impl Into<String>) -> Self {
        Error::TableNotFound { name: name.into() }
    }

    /// Creates a codec error.
    pub fn codec(message: impl Into<String>) -> Self {
        Error::Codec {
            message: message.into(),
        }
    }

    /// Creates an invalid operation error.
    pub fn invalid_operation(message: impl Into<String>) -> Self {
        Error::InvalidOperation {
            message: message.into(),
        }
    }

    /// Returns true for errors that mean a schema and its stores are out of sync.
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            Error::FieldNotFound { .. }
                | Error::SchemaInconsistency { .. }
                | Error::RowIndexOutOfRange { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::ToString;

    #[test]
    fn test_error_display() {
        let err = Error::type_mismatch(SlotKind::Ints, SlotKind::Strings);
        assert!(err.to_string().contains("Type mismatch"));

        let err = Error::row_out_of_range(7, 3);
        assert!(err.to_string().contains('7'));

        let err = Error::field_not_found("Item", FieldId(4));
        assert!(err.to_string().contains("field#4"));
        assert!(err.to_string().contains("Item"));
    }

    #[test]
    fn test_structural_class() {
        assert!(Error::row_out_of_range(1, 0).is_structural());
        assert!(Error::inconsistency("ragged column").is_structural());
        assert!(!Error::duplicate_name("Hp").is_structural());
        assert!(!Error::OrphanedEnumKey {
            define: EnumId(1),
            key: 99
        }
        .is_structural());
    }
}
