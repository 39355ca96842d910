//! Result rows returned by the execution surface.

use crate::value::Value;
use quarry_core::{QuarryError, QuarryResult};

/// One result row: column names paired with their values, in select order.
///
/// # Examples
///
/// ```
/// use quarry_db::row::Row;
/// use quarry_db::value::Value;
///
/// let row = Row::from_pairs([("aggregate".to_string(), Value::Int(3))]);
/// assert_eq!(row.get::<i64>("aggregate").unwrap(), 3);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    cells: Vec<(String, Value)>,
}

impl Row {
    /// Creates a row from `(column, value)` pairs.
    pub fn from_pairs(cells: impl IntoIterator<Item = (String, Value)>) -> Self {
        Self {
            cells: cells.into_iter().collect(),
        }
    }

    /// Returns the column names.
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.cells.iter().map(|(name, _)| name.as_str())
    }

    /// Returns the number of columns.
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Returns `true` if the row has no columns.
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Gets a typed value by column name.
    ///
    /// # Errors
    ///
    /// Returns an error if the column does not exist or the value cannot be
    /// converted to the requested type.
    pub fn get<T: FromValue>(&self, column: &str) -> QuarryResult<T> {
        let value = self.get_value(column).ok_or_else(|| {
            QuarryError::DoesNotExist(format!("Column '{column}' not found in row"))
        })?;
        T::from_value(value)
    }

    /// Gets a typed value by column index.
    ///
    /// # Errors
    ///
    /// Returns an error if the index is out of bounds or the value cannot be
    /// converted to the requested type.
    pub fn get_by_index<T: FromValue>(&self, idx: usize) -> QuarryResult<T> {
        let (_, value) = self.cells.get(idx).ok_or_else(|| {
            QuarryError::DoesNotExist(format!(
                "Column index {idx} out of bounds (row has {} columns)",
                self.cells.len()
            ))
        })?;
        T::from_value(value)
    }

    /// Returns a reference to the raw value at the given column name.
    pub fn get_value(&self, column: &str) -> Option<&Value> {
        self.cells
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value)
    }
}

/// Trait for converting a [`Value`] to a concrete Rust type.
pub trait FromValue: Sized {
    /// Attempts to convert a value reference to this type.
    ///
    /// # Errors
    ///
    /// Returns an error when the value holds an incompatible variant.
    fn from_value(value: &Value) -> QuarryResult<Self>;
}

fn mismatch(expected: &str, value: &Value) -> QuarryError {
    QuarryError::DatabaseError(format!("Expected {expected}, got {value:?}"))
}

impl FromValue for i64 {
    fn from_value(value: &Value) -> QuarryResult<Self> {
        value.as_int().ok_or_else(|| mismatch("Int", value))
    }
}

impl FromValue for i32 {
    fn from_value(value: &Value) -> QuarryResult<Self> {
        let wide = value.as_int().ok_or_else(|| mismatch("Int", value))?;
        Self::try_from(wide)
            .map_err(|e| QuarryError::DatabaseError(format!("Int value out of i32 range: {e}")))
    }
}

impl FromValue for f64 {
    fn from_value(value: &Value) -> QuarryResult<Self> {
        value.as_float().ok_or_else(|| mismatch("Float", value))
    }
}

impl FromValue for bool {
    fn from_value(value: &Value) -> QuarryResult<Self> {
        match value {
            Value::Bool(b) => Ok(*b),
            Value::Int(i) => Ok(*i != 0),
            _ => Err(mismatch("Bool", value)),
        }
    }
}

impl FromValue for String {
    fn from_value(value: &Value) -> QuarryResult<Self> {
        match value {
            Value::String(s) => Ok(s.clone()),
            _ => Err(mismatch("String", value)),
        }
    }
}

impl FromValue for Value {
    fn from_value(value: &Value) -> QuarryResult<Self> {
        Ok(value.clone())
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: &Value) -> QuarryResult<Self> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }
}
