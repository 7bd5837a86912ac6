use crate::error::{ParamsError, Result};
use crate::table::{Table2DDeclaration, TableDeclaration};
use crate::types::RawValue;
use serde::{Deserialize, Deserializer};
use std::collections::BTreeMap;

const PARAMETERS_MANDATORY: &[&str] = &["types"];
const PARAMETERS_OPTIONAL: &[&str] = &[
    "literal",
    "free",
    "tables",
    "tables2d",
    "defaults",
    "common",
    "description",
];
const TABLE_MANDATORY: &[&str] = &["index", "columns", "data"];
const TABLE2D_MANDATORY: &[&str] = &["rowindex", "colindex", "columns", "result", "data"];

/// Declarative description of the parameters of a part.
///
/// Usually obtained from [`Declaration::from_value`], which checks the field
/// names before deserializing. Type names and cell values stay raw here, they
/// are validated when a [`ParameterSet`](crate::ParameterSet) is built.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Declaration {
    /// Type name for every parameter
    pub types: BTreeMap<String, String>,
    /// Parameters with a fixed value
    pub literal: BTreeMap<String, RawValue>,
    /// Parameters supplied per catalog entry, in declaration order
    pub free: Vec<String>,
    #[serde(deserialize_with = "one_or_many")]
    pub tables: Vec<TableDeclaration>,
    #[serde(deserialize_with = "one_or_many")]
    pub tables2d: Vec<Table2DDeclaration>,
    /// Overrides of the built-in defaults of free parameters
    pub defaults: BTreeMap<String, RawValue>,
    /// Explicit catalog entries, one selector per free parameter
    pub common: Option<Vec<Vec<RawValue>>>,
    pub description: BTreeMap<String, String>,
}

impl Declaration {
    /// Check field names and deserialize a declaration
    pub fn from_value(value: RawValue) -> Result<Self> {
        let map = value
            .as_object()
            .ok_or_else(|| ParamsError::malformed("parameters", "expected a mapping"))?;
        check_schema(map, "parameters", PARAMETERS_MANDATORY, PARAMETERS_OPTIONAL)?;

        for table in one_or_many_values(map.get("tables")) {
            check_element(table, "table", TABLE_MANDATORY)?;
        }
        for table in one_or_many_values(map.get("tables2d")) {
            check_element(table, "table2d", TABLE2D_MANDATORY)?;
        }

        serde_json::from_value(value).map_err(|err| ParamsError::malformed("parameters", err))
    }

    /// Parse a declaration from JSON text
    pub fn from_json_str(text: &str) -> Result<Self> {
        let value: RawValue =
            serde_json::from_str(text).map_err(|err| ParamsError::malformed("parameters", err))?;
        Self::from_value(value)
    }
}

/// Verify that a mapping has all mandatory and no unknown fields
pub fn check_schema(
    map: &serde_json::Map<String, RawValue>,
    element: &str,
    mandatory: &[&str],
    optional: &[&str],
) -> Result<()> {
    if let Some(field) = map
        .keys()
        .find(|key| !mandatory.contains(&key.as_str()) && !optional.contains(&key.as_str()))
    {
        return Err(ParamsError::UnknownField {
            element: element.to_string(),
            field: field.clone(),
        });
    }

    let missing: Vec<String> = mandatory
        .iter()
        .filter(|field| !map.contains_key(**field))
        .map(|field| (*field).to_string())
        .collect();
    if !missing.is_empty() {
        return Err(ParamsError::MissingField {
            element: element.to_string(),
            fields: missing,
        });
    }
    Ok(())
}

fn check_element(value: &RawValue, element: &str, mandatory: &[&str]) -> Result<()> {
    let map = value
        .as_object()
        .ok_or_else(|| ParamsError::malformed(element, "expected a mapping"))?;
    check_schema(map, element, mandatory, &[])
}

fn one_or_many_values(value: Option<&RawValue>) -> Vec<&RawValue> {
    match value {
        None => Vec::new(),
        Some(RawValue::Array(items)) => items.iter().collect(),
        Some(single) => vec![single],
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

fn one_or_many<'de, D, T>(deserializer: D) -> std::result::Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(item) => vec![item],
        OneOrMany::Many(items) => items,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_minimal_declaration() {
        let decl = Declaration::from_value(json!({"types": {}})).unwrap();
        assert!(decl.free.is_empty());
        assert!(decl.tables.is_empty());
        assert!(decl.common.is_none());
    }

    #[test]
    fn test_types_are_mandatory() {
        let err = Declaration::from_value(json!({"free": ["a"]})).unwrap_err();
        assert_eq!(
            err,
            ParamsError::MissingField {
                element: "parameters".into(),
                fields: vec!["types".into()],
            }
        );
    }

    #[test]
    fn test_unknown_top_level_field() {
        let err = Declaration::from_value(json!({"types": {}, "colour": "red"})).unwrap_err();
        assert_eq!(
            err,
            ParamsError::UnknownField {
                element: "parameters".into(),
                field: "colour".into(),
            }
        );
    }

    #[test]
    fn test_single_table_or_list() {
        let table = json!({"index": "size", "columns": ["d1"], "data": {"M3": [3]}});
        let single = Declaration::from_value(json!({"types": {}, "tables": table.clone()})).unwrap();
        let list = Declaration::from_value(json!({"types": {}, "tables": [table.clone(), table]}))
            .unwrap();
        assert_eq!(single.tables.len(), 1);
        assert_eq!(list.tables.len(), 2);
    }

    #[test]
    fn test_nested_table_schema() {
        let err = Declaration::from_value(json!({
            "types": {},
            "tables2d": {"rowindex": "a", "colindex": "b", "columns": [], "data": {}}
        }))
        .unwrap_err();
        assert_eq!(
            err,
            ParamsError::MissingField {
                element: "table2d".into(),
                fields: vec!["result".into()],
            }
        );

        let err = Declaration::from_value(json!({
            "types": {},
            "tables": {"index": "a", "columns": [], "data": {}, "rows": 3}
        }))
        .unwrap_err();
        assert!(matches!(err, ParamsError::UnknownField { field, .. } if field == "rows"));
    }

    #[test]
    fn test_wrong_shape_is_schema_error() {
        let err = Declaration::from_value(json!({"types": {}, "free": "a"})).unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::Schema);
    }
}
