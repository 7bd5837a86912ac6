use thiserror::Error;

/// Result type for parameter resolution
pub type Result<T> = std::result::Result<T, ParamsError>;

/// Coarse classification of a [`ParamsError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Unknown or missing field in a declaration
    Schema,
    /// Type declarations are missing, unknown or inconsistent
    Type,
    /// A raw value or table shape is malformed
    Value,
    /// A table key, row or column is absent
    Lookup,
    /// A declared parameter could not be resolved
    Completeness,
}

/// Errors that can occur while building or resolving a parameter set
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParamsError {
    /// Field not recognised for this element
    #[error("Unknown field in {element}: {field}")]
    UnknownField { element: String, field: String },

    /// Mandatory fields absent from this element
    #[error("Missing fields in {element}: {}", .fields.join(", "))]
    MissingField {
        element: String,
        fields: Vec<String>,
    },

    /// Field present but with the wrong shape
    #[error("Malformed {element}: {message}")]
    MalformedField { element: String, message: String },

    /// Common-combination selector is neither ":" nor a list of values
    #[error("Invalid selector for parameter {parameter}: {selector}")]
    InvalidSelector { parameter: String, selector: String },

    #[error("Unknown type: {0}")]
    UnknownType(String),

    #[error("Missing type for parameter: {0}")]
    MissingType(String),

    #[error("Unknown parameter: {0}")]
    UnknownParameter(String),

    #[error("Table index {parameter} must be of type Table Index, not {found}")]
    TableIndexType { parameter: String, found: String },

    #[error("Default given for non-free parameter: {0}")]
    NonFreeDefault(String),

    #[error("Parameter is not free: {0}")]
    NotFree(String),

    /// Free Table Index parameter that no table is indexed by
    #[error("Free parameter {0} has type Table Index but no table is indexed by it")]
    UnindexedParameter(String),

    /// Wildcard selector used for a parameter without a finite domain
    #[error("Wildcard used for parameter {0} which has no finite domain")]
    ContinuousWildcard(String),

    #[error("Incompatible types for parameter {parameter}: {left} and {right}")]
    IncompatibleType {
        parameter: String,
        left: String,
        right: String,
    },

    #[error("Incompatible defaults for parameter {parameter}: {left} and {right}")]
    IncompatibleDefault {
        parameter: String,
        left: String,
        right: String,
    },

    #[error("Incompatible descriptions for parameter {parameter}: {left} and {right}")]
    IncompatibleDescription {
        parameter: String,
        left: String,
        right: String,
    },

    /// Raw value could not be converted to the declared type
    #[error("Invalid value for parameter {parameter}: {message}")]
    InvalidValue { parameter: String, message: String },

    #[error("Negative length for parameter {parameter}: {value}")]
    NegativeLength { parameter: String, value: f64 },

    #[error("Angle for parameter {parameter} must be within [-360, 360]: {value}")]
    AngleOutOfRange { parameter: String, value: f64 },

    #[error("Row {key} of table {table} has {found} values, expected {expected}")]
    RowLength {
        table: String,
        key: String,
        expected: usize,
        found: usize,
    },

    /// 2D table whose row and column index coincide
    #[error("Row and column index of 2D table are both {0}, use an ordinary table")]
    DegenerateTable2D(String),

    #[error("Default {value} for parameter {parameter} is not one of its choices")]
    InvalidTableIndex { parameter: String, value: String },

    #[error("No common choices left for parameter: {0}")]
    EmptyChoices(String),

    #[error("Common combination has {found} selectors, expected {expected}")]
    CommonArity { expected: usize, found: usize },

    #[error("Key {key} not found in table {table}")]
    MissingRow { table: String, key: String },

    #[error("Column {key} not found in table {table}")]
    MissingColumn { table: String, key: String },

    #[error("Parameter value not collected: {0}")]
    Incomplete(String),

    /// No finite set of combinations exists without an explicit common list
    #[error("Combinations cannot be enumerated, parameter {0} has no finite domain")]
    NotEnumerable(String),
}

impl ParamsError {
    /// Create an invalid value error
    pub fn invalid_value(parameter: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidValue {
            parameter: parameter.into(),
            message: message.into(),
        }
    }

    /// Create a malformed field error
    pub fn malformed(element: impl Into<String>, message: impl ToString) -> Self {
        Self::MalformedField {
            element: element.into(),
            message: message.to_string(),
        }
    }

    /// Create an incompatible type error
    pub fn incompatible_type(
        parameter: impl Into<String>,
        left: impl ToString,
        right: impl ToString,
    ) -> Self {
        Self::IncompatibleType {
            parameter: parameter.into(),
            left: left.to_string(),
            right: right.to_string(),
        }
    }

    /// Which taxonomy class this error belongs to
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::UnknownField { .. }
            | Self::MissingField { .. }
            | Self::MalformedField { .. }
            | Self::InvalidSelector { .. } => ErrorKind::Schema,
            Self::UnknownType(_)
            | Self::MissingType(_)
            | Self::UnknownParameter(_)
            | Self::TableIndexType { .. }
            | Self::NonFreeDefault(_)
            | Self::NotFree(_)
            | Self::UnindexedParameter(_)
            | Self::ContinuousWildcard(_)
            | Self::IncompatibleType { .. }
            | Self::IncompatibleDefault { .. }
            | Self::IncompatibleDescription { .. } => ErrorKind::Type,
            Self::InvalidValue { .. }
            | Self::NegativeLength { .. }
            | Self::AngleOutOfRange { .. }
            | Self::RowLength { .. }
            | Self::DegenerateTable2D(_)
            | Self::InvalidTableIndex { .. }
            | Self::EmptyChoices(_)
            | Self::CommonArity { .. } => ErrorKind::Value,
            Self::MissingRow { .. } | Self::MissingColumn { .. } => ErrorKind::Lookup,
            Self::Incomplete(_) | Self::NotEnumerable(_) => ErrorKind::Completeness,
        }
    }
}
