//! Property-based tests for tabula-core using proptest.

use proptest::prelude::*;
use tabula_core::schema::Schema;
use tabula_core::{
    Color, EnumRegistry, Error, SchemaId, TypeTag, ValueCell, Vector2, Vector2Int, Vector3,
    Vector3Int,
};

// Any finite f32 round-trips exactly; NaN and infinities are rejected on encode.
fn float() -> impl Strategy<Value = f32> {
    any::<f32>()
}

fn finite(values: &[f32]) -> bool {
    values.iter().all(|v| v.is_finite())
}

proptest! {
    /// Vector2 payloads survive an encode/decode cycle.
    #[test]
    fn vector2_roundtrip(x in float(), y in float()) {
        let v = Vector2::new(x, y);
        match ValueCell::from_complex(&v) {
            Ok(cell) => {
                prop_assert!(finite(&[x, y]));
                prop_assert_eq!(cell.to_complex::<Vector2>().unwrap(), v);
            }
            Err(err) => {
                prop_assert!(!finite(&[x, y]));
                prop_assert!(matches!(err, Error::Codec { .. }), "expected Error::Codec, got {:?}", err);
            }
        }
    }

    /// Vector3 payloads survive an encode/decode cycle.
    #[test]
    fn vector3_roundtrip(x in float(), y in float(), z in float()) {
        let v = Vector3::new(x, y, z);
        match ValueCell::from_complex(&v) {
            Ok(cell) => {
                prop_assert!(finite(&[x, y, z]));
                prop_assert_eq!(cell.to_complex::<Vector3>().unwrap(), v);
            }
            Err(err) => {
                prop_assert!(!finite(&[x, y, z]));
                prop_assert!(matches!(err, Error::Codec { .. }), "expected Error::Codec, got {:?}", err);
            }
        }
    }

    /// Integer vectors survive an encode/decode cycle over the full range.
    #[test]
    fn int_vectors_roundtrip(x in any::<i32>(), y in any::<i32>(), z in any::<i32>()) {
        let v2 = Vector2Int::new(x, y);
        let v3 = Vector3Int::new(x, y, z);
        let c2 = ValueCell::from_complex(&v2).unwrap();
        let c3 = ValueCell::from_complex(&v3).unwrap();
        prop_assert_eq!(c2.to_complex::<Vector2Int>().unwrap(), v2);
        prop_assert_eq!(c3.to_complex::<Vector3Int>().unwrap(), v3);
    }

    /// Colors survive an encode/decode cycle.
    #[test]
    fn color_roundtrip(r in float(), g in float(), b in float(), a in float()) {
        let c = Color::rgba(r, g, b, a);
        let mut cell = ValueCell::default_for(TypeTag::Color, true);
        cell.add_element(TypeTag::Color).unwrap();
        if finite(&[r, g, b, a]) {
            cell.set_complex_at(0, &c).unwrap();
            prop_assert_eq!(cell.complex_at::<Color>(0).unwrap(), c);
        } else {
            prop_assert!(cell.set_complex_at(0, &c).is_err());
            prop_assert_eq!(cell.complex_at::<Color>(0).unwrap(), Color::default());
        }
    }

    /// Mutating a copy never changes the original.
    #[test]
    fn copy_is_independent(values in prop::collection::vec(any::<i32>(), 1..20), x in any::<i32>()) {
        let original = ValueCell::Ints(values.clone());
        let mut copy = original.copy();
        copy.set_int_at(0, x).unwrap();
        copy.add_element(TypeTag::Int).unwrap();
        prop_assert_eq!(original.ints().unwrap(), values.as_slice());
        prop_assert_eq!(copy.size(), values.len() + 1);
    }

    /// Renaming a field and renaming it back keeps its id and position.
    #[test]
    fn field_rename_roundtrip(suffix in "[a-z0-9]{1,8}") {
        let mut schema = Schema::new(SchemaId(1), "Item").unwrap();
        let hp = schema.add_field("hp", TypeTag::Int, false, None).unwrap();
        schema.add_field("mp", TypeTag::Int, false, None).unwrap();
        let before = schema.fields().to_vec();

        schema.rename_field(hp, &format!("Health{}", suffix)).unwrap();
        prop_assert_eq!(schema.field(hp).unwrap().id(), hp);
        schema.rename_field(hp, "hp").unwrap();
        prop_assert_eq!(schema.fields(), before.as_slice());
    }

    /// Enum keys are assigned once and survive any removal pattern.
    #[test]
    fn enum_keys_stable(count in 1usize..12, removals in prop::collection::vec(0usize..12, 0..6)) {
        let mut reg = EnumRegistry::new();
        let id = reg.add_define("Kind").unwrap();
        let mut keys = Vec::new();
        for i in 0..count {
            keys.push(reg.add_value(id, &format!("V{}", i)).unwrap());
        }
        for r in removals {
            let len = reg.define(id).unwrap().values().len();
            if len > 0 {
                let removed = reg.remove_value(id, r % len).unwrap();
                keys.retain(|&k| k != removed.key);
            }
        }
        let remaining: Vec<u32> = reg.define(id).unwrap().values().iter().map(|v| v.key).collect();
        prop_assert_eq!(&remaining, &keys);
        for (i, &k) in keys.iter().enumerate() {
            prop_assert_eq!(reg.index_for_key(id, k as i32).unwrap(), i);
        }
        let next = reg.add_value(id, "Fresh").unwrap();
        prop_assert_eq!(next as usize, count + 1);
    }
}
