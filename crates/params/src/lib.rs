//! # Part Library Parameters
//!
//! Resolves declarative descriptions of parametrized parts into concrete,
//! fully specified parameter sets, one per catalog entry.
//!
//! ## Architecture
//!
//! ```text
//! Declaration (types, literal, free, tables, tables2d, defaults, common)
//!     │
//!     ├──> Schema check (known fields only)
//!     │
//!     ├──> Type registry → typed literals and table cells
//!     │
//!     ├──> Derived data
//!     │    ├─> Choices of every free Table Index (intersection of keys, sorted)
//!     │    ├─> Defaults of every free parameter
//!     │    └─> Common combinations (lazy cartesian expansion)
//!     │
//!     └──> collect(free values) → value of every parameter
//! ```
//!
//! ## Example
//!
//! ```rust
//! use partlib_params::{ParameterSet, Value};
//! use serde_json::json;
//!
//! let params = ParameterSet::from_value(json!({
//!     "types": {"size": "Table Index", "d1": "Length (mm)", "l": "Length (mm)"},
//!     "free": ["size", "l"],
//!     "common": [[":", [10, 20]]],
//!     "tables": {"index": "size", "columns": ["d1"], "data": {"M3": [3], "M4": [4]}}
//! }))
//! .unwrap();
//!
//! for combination in params.combinations().unwrap() {
//!     let values = params.collect_combination(&combination).unwrap();
//!     println!("{} x {}: d1 = {}", values["size"], values["l"], values["d1"]);
//! }
//! assert_eq!(params.choices("size").unwrap(), ["M3", "M4"]);
//! assert_eq!(params.default_of("l"), Some(&Value::Number(10.0)));
//! ```

mod combinations;
mod declaration;
mod error;
mod parameters;
mod sorting;
mod table;
mod types;

pub use combinations::{Combination, Combinations, Selector};
pub use declaration::{check_schema, Declaration};
pub use error::{ErrorKind, ParamsError, Result};
pub use parameters::ParameterSet;
pub use sorting::{Lexicographical, Numerical, SortingSet, SortingStrategy};
pub use table::{Table, Table2D, Table2DDeclaration, TableDeclaration, TypeMap};
pub use types::{ParameterType, RawValue, Value};
