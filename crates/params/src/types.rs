use crate::error::{ParamsError, Result};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

/// Raw, unconverted value as it appears in a declaration
pub type RawValue = serde_json::Value;

/// The kinds a parameter can be declared as
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ParameterType {
    LengthMm,
    LengthIn,
    Number,
    Bool,
    TableIndex,
    String,
    AngleDeg,
}

static BOOL_DOMAIN: [Value; 2] = [Value::Bool(true), Value::Bool(false)];

impl ParameterType {
    pub const ALL: [Self; 7] = [
        Self::LengthMm,
        Self::LengthIn,
        Self::Number,
        Self::Bool,
        Self::TableIndex,
        Self::String,
        Self::AngleDeg,
    ];

    /// Name used in declarations
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::LengthMm => "Length (mm)",
            Self::LengthIn => "Length (in)",
            Self::Number => "Number",
            Self::Bool => "Bool",
            Self::TableIndex => "Table Index",
            Self::String => "String",
            Self::AngleDeg => "Angle (deg)",
        }
    }

    /// Built-in default value for a free parameter of this type
    #[must_use]
    pub fn default_value(self) -> Value {
        match self {
            Self::LengthMm => Value::Number(10.0),
            Self::LengthIn | Self::Number => Value::Number(1.0),
            Self::Bool => Value::Bool(false),
            Self::TableIndex | Self::String => Value::Str(String::new()),
            Self::AngleDeg => Value::Number(0.0),
        }
    }

    /// Whether values of this type come from a finite set
    #[must_use]
    pub const fn is_discrete(self) -> bool {
        matches!(self, Self::Bool | Self::TableIndex)
    }

    /// Fixed enumeration of all values, for types that have one.
    ///
    /// Table Index is discrete but its domain depends on the tables, so it
    /// has no fixed enumeration.
    #[must_use]
    pub fn enumeration(self) -> Option<&'static [Value]> {
        match self {
            Self::Bool => Some(&BOOL_DOMAIN),
            _ => None,
        }
    }

    const fn is_numeric(self) -> bool {
        matches!(
            self,
            Self::LengthMm | Self::LengthIn | Self::Number | Self::AngleDeg
        )
    }

    /// Convert a raw declaration value into a typed value.
    ///
    /// The literal string `"None"` converts to [`Value::Null`] for every type.
    pub fn convert(self, parameter: &str, raw: &RawValue) -> Result<Value> {
        match raw {
            RawValue::Null => return Ok(Value::Null),
            RawValue::String(s) if s == "None" => return Ok(Value::Null),
            RawValue::Array(_) | RawValue::Object(_) => {
                return Err(ParamsError::invalid_value(
                    parameter,
                    format!("expected a scalar for {}, got {raw}", self.as_str()),
                ));
            }
            _ => {}
        }

        if self.is_numeric() {
            let value = match raw {
                RawValue::Number(n) => n.as_f64(),
                RawValue::String(s) => s.trim().parse::<f64>().ok(),
                _ => None,
            }
            .filter(|value| value.is_finite())
            .ok_or_else(|| {
                ParamsError::invalid_value(
                    parameter,
                    format!("expected a finite number, got {raw}"),
                )
            })?;
            return self.check_range(parameter, value).map(Value::Number);
        }

        match self {
            Self::Bool => match raw {
                RawValue::Bool(b) => Ok(Value::Bool(*b)),
                RawValue::String(s) if s == "true" => Ok(Value::Bool(true)),
                RawValue::String(s) if s == "false" => Ok(Value::Bool(false)),
                _ => Err(ParamsError::invalid_value(
                    parameter,
                    format!("unknown value for bool: {raw}"),
                )),
            },
            _ => Ok(Value::Str(match raw {
                RawValue::String(s) => s.clone(),
                other => other.to_string(),
            })),
        }
    }

    fn check_range(self, parameter: &str, value: f64) -> Result<f64> {
        match self {
            Self::LengthMm | Self::LengthIn if value < 0.0 => Err(ParamsError::NegativeLength {
                parameter: parameter.to_string(),
                value,
            }),
            Self::AngleDeg if value.abs() > 360.0 => Err(ParamsError::AngleOutOfRange {
                parameter: parameter.to_string(),
                value,
            }),
            _ => Ok(value),
        }
    }
}

impl FromStr for ParameterType {
    type Err = ParamsError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| ParamsError::UnknownType(s.to_string()))
    }
}

impl fmt::Display for ParameterType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A converted, typed parameter value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Bool(bool),
    Number(f64),
    Str(String),
}

impl Value {
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    #[must_use]
    pub const fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    /// String form used when this value selects a table row or column
    #[must_use]
    pub fn as_key(&self) -> Cow<'_, str> {
        match self {
            Self::Str(s) => Cow::Borrowed(s),
            other => Cow::Owned(other.to_string()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("None"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Number(n) => write!(f, "{n}"),
            Self::Str(s) => f.write_str(s),
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_type_names_roundtrip() {
        for ty in ParameterType::ALL {
            assert_eq!(ty.as_str().parse::<ParameterType>().unwrap(), ty);
        }
        assert_eq!(
            "Mass (kg)".parse::<ParameterType>(),
            Err(ParamsError::UnknownType("Mass (kg)".into()))
        );
    }

    #[test]
    fn test_none_is_null_for_every_type() {
        for ty in ParameterType::ALL {
            assert_eq!(ty.convert("p", &json!("None")).unwrap(), Value::Null);
        }
    }

    #[test]
    fn test_numbers_from_strings_and_numbers() {
        assert_eq!(
            ParameterType::LengthMm.convert("d", &json!("5.5")).unwrap(),
            Value::Number(5.5)
        );
        assert_eq!(
            ParameterType::Number.convert("n", &json!(-3)).unwrap(),
            Value::Number(-3.0)
        );
        assert!(ParameterType::Number.convert("n", &json!("abc")).is_err());
        assert!(ParameterType::Number.convert("n", &json!(true)).is_err());
    }

    #[test]
    fn test_non_finite_numbers_are_rejected() {
        for raw in ["NaN", "inf", "-infinity"] {
            let err = ParameterType::Number.convert("n", &json!(raw)).unwrap_err();
            assert!(matches!(err, ParamsError::InvalidValue { .. }));
        }
        assert!(ParameterType::AngleDeg.convert("a", &json!("nan")).is_err());
    }

    #[test]
    fn test_length_must_not_be_negative() {
        let err = ParameterType::LengthIn.convert("l", &json!(-0.5)).unwrap_err();
        assert!(matches!(err, ParamsError::NegativeLength { .. }));
        assert!(ParameterType::LengthMm.convert("l", &json!(0)).is_ok());
    }

    #[test]
    fn test_angle_bounds() {
        assert!(ParameterType::AngleDeg.convert("a", &json!(360)).is_ok());
        assert!(ParameterType::AngleDeg.convert("a", &json!("-360")).is_ok());
        assert!(matches!(
            ParameterType::AngleDeg.convert("a", &json!(360.5)),
            Err(ParamsError::AngleOutOfRange { .. })
        ));
    }

    #[test]
    fn test_bool_literals() {
        assert_eq!(
            ParameterType::Bool.convert("b", &json!("true")).unwrap(),
            Value::Bool(true)
        );
        assert_eq!(
            ParameterType::Bool.convert("b", &json!(false)).unwrap(),
            Value::Bool(false)
        );
        assert!(ParameterType::Bool.convert("b", &json!("yes")).is_err());
        assert!(ParameterType::Bool.convert("b", &json!(1)).is_err());
    }

    #[test]
    fn test_strings_are_stringified() {
        assert_eq!(
            ParameterType::TableIndex.convert("key", &json!(3)).unwrap(),
            Value::Str("3".into())
        );
        assert!(ParameterType::String.convert("s", &json!([1])).is_err());
    }

    #[test]
    fn test_key_form() {
        assert_eq!(Value::from("M3").as_key(), "M3");
        assert_eq!(Value::Number(3.0).as_key(), "3");
        assert_eq!(Value::Null.as_key(), "None");
    }
}
