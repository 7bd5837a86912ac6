use crate::error::{ParamsError, Result};
use crate::types::{ParameterType, RawValue, Value};
use serde::Deserialize;
use std::collections::BTreeMap;

/// Declared type of every parameter, by name
pub type TypeMap = BTreeMap<String, ParameterType>;

fn type_of(types: &TypeMap, parameter: &str) -> Result<ParameterType> {
    types
        .get(parameter)
        .copied()
        .ok_or_else(|| ParamsError::MissingType(parameter.to_string()))
}

/// Table as declared, with unconverted cells
#[derive(Debug, Clone, Deserialize)]
pub struct TableDeclaration {
    pub index: String,
    pub columns: Vec<String>,
    pub data: BTreeMap<String, Vec<RawValue>>,
}

impl TableDeclaration {
    /// Names of all parameters this table mentions
    pub fn parameters(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.index.as_str()).chain(self.columns.iter().map(String::as_str))
    }

    /// Check row lengths and convert every cell to its column's type
    pub fn normalize_and_check_types(&self, types: &TypeMap) -> Result<Table> {
        let col_types = self
            .columns
            .iter()
            .map(|col| type_of(types, col))
            .collect::<Result<Vec<_>>>()?;

        let mut data = BTreeMap::new();
        for (key, row) in &self.data {
            if row.len() != self.columns.len() {
                return Err(ParamsError::RowLength {
                    table: self.index.clone(),
                    key: key.clone(),
                    expected: self.columns.len(),
                    found: row.len(),
                });
            }
            let values = row
                .iter()
                .zip(self.columns.iter().zip(&col_types))
                .map(|(raw, (col, ty))| ty.convert(col, raw))
                .collect::<Result<Vec<_>>>()?;
            data.insert(key.clone(), values);
        }

        log::trace!(
            "Normalized table {} ({} rows, {} columns)",
            self.index,
            data.len(),
            self.columns.len()
        );

        Ok(Table {
            index: self.index.clone(),
            columns: self.columns.clone(),
            data,
        })
    }
}

/// Lookup of a row of values by a single key
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    index: String,
    columns: Vec<String>,
    data: BTreeMap<String, Vec<Value>>,
}

impl Table {
    /// Parameter whose value selects the row
    #[must_use]
    pub fn index(&self) -> &str {
        &self.index
    }

    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Row keys in string order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.data.keys().map(String::as_str)
    }

    /// Look up the values of all columns for a row key
    pub fn get_values(&self, key: &str) -> Result<BTreeMap<String, Value>> {
        let row = self.data.get(key).ok_or_else(|| ParamsError::MissingRow {
            table: self.index.clone(),
            key: key.to_string(),
        })?;
        Ok(self.columns.iter().cloned().zip(row.iter().cloned()).collect())
    }
}

/// 2D table as declared, with unconverted cells
#[derive(Debug, Clone, Deserialize)]
pub struct Table2DDeclaration {
    pub rowindex: String,
    pub colindex: String,
    pub result: String,
    pub columns: Vec<String>,
    pub data: BTreeMap<String, Vec<RawValue>>,
}

impl Table2DDeclaration {
    /// Reject tables that should have been ordinary tables
    pub fn check(&self) -> Result<()> {
        if self.rowindex == self.colindex {
            return Err(ParamsError::DegenerateTable2D(self.rowindex.clone()));
        }
        Ok(())
    }

    /// Names of all parameters this table mentions
    pub fn parameters(&self) -> impl Iterator<Item = &str> {
        [
            self.rowindex.as_str(),
            self.colindex.as_str(),
            self.result.as_str(),
        ]
        .into_iter()
    }

    /// Check row lengths and convert every cell to the result's type
    pub fn normalize_and_check_types(&self, types: &TypeMap) -> Result<Table2D> {
        self.check()?;
        let result_type = type_of(types, &self.result)?;
        let name = table2d_name(&self.rowindex, &self.colindex);

        let mut data = BTreeMap::new();
        for (key, row) in &self.data {
            if row.len() != self.columns.len() {
                return Err(ParamsError::RowLength {
                    table: name,
                    key: key.clone(),
                    expected: self.columns.len(),
                    found: row.len(),
                });
            }
            let values = row
                .iter()
                .map(|raw| result_type.convert(&self.result, raw))
                .collect::<Result<Vec<_>>>()?;
            data.insert(key.clone(), values);
        }

        log::trace!("Normalized 2D table {name} ({} rows)", data.len());

        Ok(Table2D {
            rowindex: self.rowindex.clone(),
            colindex: self.colindex.clone(),
            result: self.result.clone(),
            columns: self.columns.clone(),
            data,
        })
    }
}

fn table2d_name(rowindex: &str, colindex: &str) -> String {
    format!("{rowindex}/{colindex}")
}

/// Lookup of a single value by a row and a column key
#[derive(Debug, Clone, PartialEq)]
pub struct Table2D {
    rowindex: String,
    colindex: String,
    result: String,
    columns: Vec<String>,
    data: BTreeMap<String, Vec<Value>>,
}

impl Table2D {
    #[must_use]
    pub fn rowindex(&self) -> &str {
        &self.rowindex
    }

    #[must_use]
    pub fn colindex(&self) -> &str {
        &self.colindex
    }

    /// Parameter that receives the looked up value
    #[must_use]
    pub fn result(&self) -> &str {
        &self.result
    }

    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Row keys in string order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.data.keys().map(String::as_str)
    }

    /// Look up the result for a row and column key
    pub fn get_value(&self, row: &str, col: &str) -> Result<BTreeMap<String, Value>> {
        let name = || table2d_name(&self.rowindex, &self.colindex);
        let position = self
            .columns
            .iter()
            .position(|c| c == col)
            .ok_or_else(|| ParamsError::MissingColumn {
                table: name(),
                key: col.to_string(),
            })?;
        let values = self.data.get(row).ok_or_else(|| ParamsError::MissingRow {
            table: name(),
            key: row.to_string(),
        })?;
        let value = values.get(position).cloned().unwrap_or(Value::Null);
        Ok(BTreeMap::from([(self.result.clone(), value)]))
    }
}
