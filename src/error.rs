//! Error types for value coercion and row projection.

use std::fmt;

/// Result type for coercion operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Coarse classification of an [`Error`], stable across wrapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Text does not match the canonical pattern for the target type.
    Format,
    /// Numeric or enum value outside the declared domain.
    OutOfRange,
    /// Structured document does not match the target type.
    Structural,
    /// No conversion path between source and target.
    TypeMismatch,
    /// Row width does not match the shape built for the result set.
    Shape,
    /// Failure reported by the database driver.
    Driver,
}

/// Coercion errors with structured context.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// Text does not match the canonical format of `target`.
    #[error("'{text}' is not a valid {target}: {reason}")]
    Format {
        text: String,
        target: &'static str,
        reason: String,
    },

    /// Value lies outside the domain of `target`.
    #[error("'{value}' is not a valid value for {target}")]
    OutOfRange { value: String, target: &'static str },

    /// JSON document could not be mapped onto `target`.
    #[error("cannot read {target} from JSON: {source}")]
    Structural {
        target: &'static str,
        #[source]
        source: serde_json::Error,
    },

    /// No conversion exists from `from` to `to`.
    #[error("cannot convert {from} to {to}")]
    TypeMismatch { from: &'static str, to: &'static str },

    /// Row width differs from the shape.
    #[error("row has {actual} values, shape expects {expected}")]
    ColumnCount { expected: usize, actual: usize },

    /// Failure while assigning a column to a property.
    #[error("column '{column}': {source}")]
    Column {
        column: String,
        #[source]
        source: Box<Error>,
    },

    /// SQLite driver error.
    #[cfg(feature = "sqlite")]
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

impl Error {
    /// Create a format error.
    pub fn format(text: impl Into<String>, target: &'static str, reason: impl fmt::Display) -> Self {
        Self::Format {
            text: text.into(),
            target,
            reason: reason.to_string(),
        }
    }

    /// Create an out-of-range error.
    pub fn out_of_range(value: impl fmt::Display, target: &'static str) -> Self {
        Self::OutOfRange {
            value: value.to_string(),
            target,
        }
    }

    /// Create a structural error from a JSON failure.
    pub fn structural(target: &'static str, source: serde_json::Error) -> Self {
        Self::Structural { target, source }
    }

    /// Create a structural error with a custom message.
    pub fn structural_msg(target: &'static str, msg: impl fmt::Display) -> Self {
        Self::Structural {
            target,
            source: <serde_json::Error as serde::de::Error>::custom(msg),
        }
    }

    /// Create a type mismatch error.
    pub fn type_mismatch(from: &'static str, to: &'static str) -> Self {
        Self::TypeMismatch { from, to }
    }

    /// Attach the column name the error was raised for.
    pub fn in_column(self, column: impl Into<String>) -> Self {
        Self::Column {
            column: column.into(),
            source: Box::new(self),
        }
    }

    /// Classification of the error, looking through column context.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Format { .. } => ErrorKind::Format,
            Self::OutOfRange { .. } => ErrorKind::OutOfRange,
            Self::Structural { .. } => ErrorKind::Structural,
            Self::TypeMismatch { .. } => ErrorKind::TypeMismatch,
            Self::ColumnCount { .. } => ErrorKind::Shape,
            Self::Column { source, .. } => source.kind(),
            #[cfg(feature = "sqlite")]
            Self::Sqlite(_) => ErrorKind::Driver,
        }
    }
}
