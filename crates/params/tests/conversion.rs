use partlib_params::{ParameterType, ParamsError, Value};
use proptest::prelude::*;
use serde_json::json;

fn reconvert(ty: ParameterType, value: &Value) -> Value {
    let serialized = serde_json::to_value(value).expect("serialize");
    ty.convert("p", &serialized).expect("reconvert")
}

proptest! {
    #[test]
    fn proptest_lengths_roundtrip(v in 0.0f64..1.0e6) {
        for ty in [ParameterType::LengthMm, ParameterType::LengthIn] {
            let value = ty.convert("l", &json!(v)).unwrap();
            prop_assert_eq!(&value, &Value::Number(v));
            prop_assert_eq!(reconvert(ty, &value), value);
        }
    }

    #[test]
    fn proptest_negative_lengths_fail(v in -1.0e6f64..-1.0e-9) {
        for ty in [ParameterType::LengthMm, ParameterType::LengthIn] {
            let is_negative_length = matches!(
                ty.convert("l", &json!(v)),
                Err(ParamsError::NegativeLength { .. })
            );
            prop_assert!(is_negative_length);
        }
    }

    #[test]
    fn proptest_angles_within_bounds(v in -360.0f64..=360.0) {
        let value = ParameterType::AngleDeg.convert("a", &json!(v)).unwrap();
        prop_assert_eq!(reconvert(ParameterType::AngleDeg, &value), value);
    }

    #[test]
    fn proptest_angles_out_of_bounds(v in 360.0001f64..1.0e6, negative in any::<bool>()) {
        let v = if negative { -v } else { v };
        let out_of_range = matches!(
            ParameterType::AngleDeg.convert("a", &json!(v)),
            Err(ParamsError::AngleOutOfRange { .. })
        );
        prop_assert!(out_of_range);
    }

    #[test]
    fn proptest_numbers_from_text(v in -1.0e6f64..1.0e6) {
        let value = ParameterType::Number.convert("n", &json!(v.to_string())).unwrap();
        prop_assert_eq!(&value, &Value::Number(v));
        prop_assert_eq!(reconvert(ParameterType::Number, &value), value);
    }

    #[test]
    fn proptest_strings_roundtrip(s in "[A-Za-z0-9 _.-]{0,24}") {
        prop_assume!(s != "None");
        for ty in [ParameterType::String, ParameterType::TableIndex] {
            let value = ty.convert("s", &json!(s)).unwrap();
            prop_assert_eq!(&value, &Value::Str(s.clone()));
            prop_assert_eq!(reconvert(ty, &value), value);
        }
    }

    #[test]
    fn proptest_bools_roundtrip(b in any::<bool>()) {
        let value = ParameterType::Bool.convert("b", &json!(b.to_string())).unwrap();
        prop_assert_eq!(&value, &Value::Bool(b));
        prop_assert_eq!(reconvert(ParameterType::Bool, &value), value);
    }
}

#[test]
fn angle_boundaries_are_inclusive() {
    for v in [360.0, -360.0] {
        assert_eq!(
            ParameterType::AngleDeg.convert("a", &json!(v)).unwrap(),
            Value::Number(v)
        );
    }
}

#[test]
fn null_roundtrips_for_every_type() {
    for ty in ParameterType::ALL {
        let value = ty.convert("p", &json!("None")).unwrap();
        assert_eq!(reconvert(ty, &value), Value::Null);
    }
}
