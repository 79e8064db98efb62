//! The canonical string encoder.

use serde::Serialize;

use crate::error::CanonicalizationError;
use crate::ser::to_value;
use crate::value::Value;

/// Deterministically encode a value into its canonical string form.
///
/// Two values that are structurally equal always encode to the same string,
/// regardless of map insertion order or set iteration order.
pub fn canonicalize(value: &Value) -> Result<String, CanonicalizationError> {
    let mut out = String::new();
    write_value(value, &mut out)?;
    Ok(out)
}

/// Convert any `Serialize` type through [`to_value`] and encode it.
///
/// Sequences are encoded in iteration order, so unordered collections such
/// as `HashSet` must be converted to [`Value::Set`] first.
pub fn canonicalize_serialize<T: Serialize + ?Sized>(
    value: &T,
) -> Result<String, CanonicalizationError> {
    canonicalize(&to_value(value)?)
}

fn write_value(value: &Value, out: &mut String) -> Result<(), CanonicalizationError> {
    match value {
        Value::Null => out.push_str("null"),
        Value::Bool(true) => out.push_str("true"),
        Value::Bool(false) => out.push_str("false"),
        Value::Int(i) => out.push_str(&i.to_string()),
        Value::UInt(u) => out.push_str(&u.to_string()),
        Value::Float(f) => out.push_str(&normalize_float(*f)?),
        Value::Str(s) => write_str(s, out)?,
        Value::List(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_value(item, out)?;
            }
            out.push(']');
        }
        Value::Set(items) => {
            // Sort the canonical strings, not the raw elements.
            let mut encoded = items
                .iter()
                .map(canonicalize)
                .collect::<Result<Vec<_>, _>>()?;
            encoded.sort();
            encoded.dedup();
            out.push('[');
            for (i, item) in encoded.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_str(item, out)?;
            }
            out.push(']');
        }
        Value::Map(map) => {
            out.push('{');
            for (i, (key, item)) in map.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_str(key, out)?;
                out.push(':');
                write_value(item, out)?;
            }
            out.push('}');
        }
    }
    Ok(())
}

fn write_str(s: &str, out: &mut String) -> Result<(), CanonicalizationError> {
    let quoted =
        serde_json::to_string(s).map_err(|e| CanonicalizationError::Custom(e.to_string()))?;
    out.push_str(&quoted);
    Ok(())
}

/// Round-trip through 17 significant digits, then print positionally.
///
/// `f64`'s `Display` never switches to exponent notation, and the shortest
/// round-trip digits are stable across platforms. A missing fractional part
/// is appended so floats never read back as integers.
fn normalize_float(f: f64) -> Result<String, CanonicalizationError> {
    if !f.is_finite() {
        return Err(CanonicalizationError::NonFiniteFloat(f.to_string()));
    }
    let rounded: f64 = format!("{f:.16e}")
        .parse()
        .map_err(|e: std::num::ParseFloatError| CanonicalizationError::Custom(e.to_string()))?;
    let mut s = rounded.to_string();
    if !s.contains('.') {
        s.push_str(".0");
    }
    Ok(s)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    use proptest::prelude::*;

    fn c(v: &Value) -> String {
        canonicalize(v).unwrap()
    }

    #[test]
    fn primitives() {
        assert_eq!(c(&Value::Null), "null");
        assert_eq!(c(&Value::Bool(true)), "true");
        assert_eq!(c(&Value::Int(-42)), "-42");
        assert_eq!(c(&Value::UInt(u64::MAX)), "18446744073709551615");
        assert_eq!(c(&Value::from("hi")), "\"hi\"");
    }

    #[test]
    fn booleans_are_not_integers() {
        assert_ne!(c(&Value::Bool(true)), c(&Value::Int(1)));
        assert_ne!(c(&Value::Bool(false)), c(&Value::Int(0)));
    }

    #[test]
    fn maps_sort_keys_without_whitespace() {
        let v = Value::map([("b", Value::Int(2)), ("a", Value::Int(1)), ("Z", Value::Null)]);
        assert_eq!(c(&v), r#"{"Z":null,"a":1,"b":2}"#);
    }

    #[test]
    fn nested_structures() {
        let v = Value::map([
            ("list", Value::list([Value::Int(3), Value::from("x")])),
            ("inner", Value::map([("k", Value::Bool(false))])),
        ]);
        assert_eq!(c(&v), r#"{"inner":{"k":false},"list":[3,"x"]}"#);
    }

    #[test]
    fn floats_are_positional_with_fraction() {
        assert_eq!(c(&Value::Float(1.0)), "1.0");
        assert_eq!(c(&Value::Float(0.1)), "0.1");
        assert_eq!(c(&Value::Float(-2.5)), "-2.5");
        assert_eq!(c(&Value::Float(1e20)), "100000000000000000000.0");
        assert_eq!(c(&Value::Float(1e-7)), "0.0000001");
        assert_eq!(c(&Value::Float(-0.0)), "-0.0");
    }

    #[test]
    fn float_and_int_stay_distinct() {
        assert_ne!(c(&Value::Float(1.0)), c(&Value::Int(1)));
    }

    #[test]
    fn non_finite_floats_are_rejected() {
        for f in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            assert!(matches!(
                canonicalize(&Value::Float(f)),
                Err(CanonicalizationError::NonFiniteFloat(_))
            ));
        }
    }

    #[test]
    fn nested_non_finite_float_is_rejected() {
        let v = Value::map([("x", Value::list([Value::Float(f64::NAN)]))]);
        assert!(canonicalize(&v).is_err());
    }

    #[test]
    fn strings_are_escaped() {
        assert_eq!(c(&Value::from("a\"b\\c\n")), r#""a\"b\\c\n""#);
        assert_eq!(c(&Value::from("\u{1}")), r#""\u0001""#);
        assert_eq!(c(&Value::from("héllo")), "\"héllo\"");
    }

    #[test]
    fn sets_sort_canonical_strings() {
        let a = Value::set([Value::Int(2), Value::from("a"), Value::Int(10)]);
        let b = Value::set([Value::Int(10), Value::Int(2), Value::from("a")]);
        assert_eq!(c(&a), c(&b));
        // The quote byte sorts before digits.
        assert_eq!(c(&a), r#"["\"a\"","10","2"]"#);
    }

    #[test]
    fn sets_deduplicate_by_canonical_form() {
        let v = Value::set([Value::Int(1), Value::Int(1), Value::from(1u64)]);
        assert_eq!(c(&v), r#"["1"]"#);
    }

    #[test]
    fn set_differs_from_list() {
        let set = Value::set([Value::Int(1)]);
        let list = Value::list([Value::Int(1)]);
        assert_ne!(c(&set), c(&list));
    }

    #[test]
    fn sets_of_maps_ignore_order() {
        let m1 = Value::map([("k", Value::Int(1))]);
        let m2 = Value::map([("k", Value::Int(2))]);
        let a = Value::set([m1.clone(), m2.clone()]);
        let b = Value::set([m2, m1]);
        assert_eq!(c(&a), c(&b));
    }

    fn arb_value() -> impl Strategy<Value = Value> {
        let leaf = prop_oneof![
            Just(Value::Null),
            any::<bool>().prop_map(Value::Bool),
            any::<i64>().prop_map(Value::Int),
            (-1.0e12f64..1.0e12).prop_map(Value::Float),
            "[a-z0-9 ]{0,8}".prop_map(Value::Str),
        ];
        leaf.prop_recursive(3, 32, 6, |inner| {
            prop_oneof![
                prop::collection::vec(inner.clone(), 0..6).prop_map(Value::List),
                prop::collection::vec(inner.clone(), 0..6).prop_map(Value::Set),
                prop::collection::btree_map("[a-z]{1,4}", inner, 0..6).prop_map(Value::Map),
            ]
        })
    }

    proptest! {
        #[test]
        fn encoding_is_deterministic(v in arb_value()) {
            prop_assert_eq!(canonicalize(&v).unwrap(), canonicalize(&v.clone()).unwrap());
        }

        #[test]
        fn set_order_is_irrelevant(items in prop::collection::vec(arb_value(), 0..6)) {
            let mut reversed = items.clone();
            reversed.reverse();
            prop_assert_eq!(
                canonicalize(&Value::Set(items)).unwrap(),
                canonicalize(&Value::Set(reversed)).unwrap()
            );
        }

        #[test]
        fn map_insertion_order_is_irrelevant(entries in prop::collection::vec(("[a-z]{1,4}", any::<i64>()), 0..12)) {
            let forward: BTreeMap<String, Value> =
                entries.iter().map(|(k, v)| (k.clone(), Value::Int(*v))).collect();
            let backward: BTreeMap<String, Value> =
                entries.iter().rev().map(|(k, v)| (k.clone(), Value::Int(*v))).collect();
            // Later duplicates win on insert, so compare only when keys are unique.
            prop_assume!(forward.len() == entries.len());
            prop_assert_eq!(
                canonicalize(&Value::Map(forward)).unwrap(),
                canonicalize(&Value::Map(backward)).unwrap()
            );
        }

        #[test]
        fn floats_round_trip(f in -1.0e15f64..1.0e15) {
            let s = canonicalize(&Value::Float(f)).unwrap();
            let back: f64 = s.parse().unwrap();
            prop_assert_eq!(back, f);
        }
    }
}
