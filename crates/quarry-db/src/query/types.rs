//! Clause node types making up a query AST.
//!
//! Each clause list on a [`Builder`] holds one of the enums defined here. The
//! grammar matches on them exhaustively, so adding a variant forces every
//! render site to handle it.

use std::sync::Arc;

use quarry_core::{QuarryError, QuarryResult};

use crate::query::builder::Builder;
use crate::value::Value;

/// The boolean connective joining a predicate to the one rendered before it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Logic {
    /// `and`
    And,
    /// `or`
    Or,
}

impl Logic {
    /// Returns the SQL keyword for this connective.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::And => "and",
            Self::Or => "or",
        }
    }
}

/// The SQL function a date-part predicate applies to its column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatePart {
    /// `date(col)`, compared against `YYYY-MM-DD`.
    Date,
    /// `time(col)`, compared against `HH:MM:SS`.
    Time,
    /// `day(col)`, compared against a two-digit day.
    Day,
    /// `month(col)`, compared against a two-digit month.
    Month,
    /// `year(col)`, compared against a four-digit year.
    Year,
}

impl DatePart {
    /// Returns the SQL function name.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Date => "date",
            Self::Time => "time",
            Self::Day => "day",
            Self::Month => "month",
            Self::Year => "year",
        }
    }

    /// The `chrono` format string used to render a temporal value.
    pub const fn format(self) -> &'static str {
        match self {
            Self::Date => "%Y-%m-%d",
            Self::Time => "%H:%M:%S",
            Self::Day => "%d",
            Self::Month => "%m",
            Self::Year => "%Y",
        }
    }

    /// Formats `value` for comparison against this part.
    ///
    /// Strings are used verbatim. A date can be formatted into every part but
    /// `time`; a time only into `time`; a datetime into all of them.
    ///
    /// # Errors
    ///
    /// Returns [`QuarryError::UnsupportedValueType`] for any other value.
    pub fn format_value(self, value: Value) -> QuarryResult<String> {
        match (self, value) {
            (_, Value::String(s)) => Ok(s),
            (_, Value::DateTime(dt)) => Ok(dt.format(self.format()).to_string()),
            (Self::Time, Value::Time(t)) => Ok(t.format(self.format()).to_string()),
            (Self::Date | Self::Day | Self::Month | Self::Year, Value::Date(d)) => {
                Ok(d.format(self.format()).to_string())
            }
            (part, other) => Err(QuarryError::UnsupportedValueType(format!(
                "cannot compare {} against {}()",
                other.type_name(),
                part.as_str()
            ))),
        }
    }
}

/// A single filter condition in a WHERE, HAVING or ON clause.
#[derive(Debug, Clone)]
pub enum Predicate {
    /// `col op ?` with one bound scalar.
    Comparison {
        logic: Logic,
        column: String,
        operator: String,
        value: Value,
    },
    /// `col op other_col`; nothing is bound.
    ColumnComparison {
        logic: Logic,
        first: String,
        operator: String,
        second: String,
    },
    /// `col is null` / `col is not null`.
    Null {
        logic: Logic,
        column: String,
        negated: bool,
    },
    /// A literal fragment. Its bindings live in the registry, not here.
    Raw { logic: Logic, sql: String },
    /// `col in (?, ...)` / `col not in (?, ...)`.
    In {
        logic: Logic,
        column: String,
        negated: bool,
        values: Vec<Value>,
    },
    /// `col between ? and ?` / `col not between ? and ?`.
    Between {
        logic: Logic,
        column: String,
        negated: bool,
        bounds: [Value; 2],
    },
    /// `part(col) op ?` with a pre-formatted value.
    DatePart {
        logic: Logic,
        column: String,
        operator: String,
        part: DatePart,
        value: Value,
    },
    /// A parenthesised group holding another AST's WHERE predicates.
    Nested { logic: Logic, query: Arc<Builder> },
    /// `col op (select ...)`.
    Sub {
        logic: Logic,
        column: String,
        operator: String,
        query: Arc<Builder>,
    },
}

impl Predicate {
    /// Builds a null check from an equality operator.
    ///
    /// # Errors
    ///
    /// Returns [`QuarryError::IllegalNullOperator`] unless `operator` is `=`
    /// or `!=`.
    pub fn null(logic: Logic, column: &str, operator: &str) -> QuarryResult<Self> {
        let negated = match operator {
            "=" => false,
            "!=" => true,
            other => {
                return Err(QuarryError::IllegalNullOperator(format!(
                    "`{column}` {other} null"
                )))
            }
        };
        Ok(Self::Null {
            logic,
            column: column.to_string(),
            negated,
        })
    }

    /// The connective joining this predicate to the previous one.
    pub const fn logic(&self) -> Logic {
        match self {
            Self::Comparison { logic, .. }
            | Self::ColumnComparison { logic, .. }
            | Self::Null { logic, .. }
            | Self::Raw { logic, .. }
            | Self::In { logic, .. }
            | Self::Between { logic, .. }
            | Self::DatePart { logic, .. }
            | Self::Nested { logic, .. }
            | Self::Sub { logic, .. } => *logic,
        }
    }

    /// The left-hand column, if the predicate has one.
    pub fn column(&self) -> Option<&str> {
        match self {
            Self::Comparison { column, .. }
            | Self::Null { column, .. }
            | Self::In { column, .. }
            | Self::Between { column, .. }
            | Self::DatePart { column, .. }
            | Self::Sub { column, .. } => Some(column),
            Self::ColumnComparison { first, .. } => Some(first),
            Self::Raw { .. } | Self::Nested { .. } => None,
        }
    }

    /// The SQL operator as rendered.
    pub fn operator(&self) -> &str {
        match self {
            Self::Comparison { operator, .. }
            | Self::ColumnComparison { operator, .. }
            | Self::DatePart { operator, .. }
            | Self::Sub { operator, .. } => operator,
            Self::Null { negated, .. } => {
                if *negated {
                    "is not"
                } else {
                    "is"
                }
            }
            Self::In { negated, .. } => {
                if *negated {
                    "not in"
                } else {
                    "in"
                }
            }
            Self::Between { negated, .. } => {
                if *negated {
                    "not between"
                } else {
                    "between"
                }
            }
            Self::Raw { .. } | Self::Nested { .. } => "",
        }
    }

    /// The values this predicate renders a placeholder for, in order.
    ///
    /// Raw, nested and sub-query predicates return an empty slice: their
    /// bindings are recorded in the owning builder's registry instead.
    pub fn values(&self) -> &[Value] {
        match self {
            Self::Comparison { value, .. } | Self::DatePart { value, .. } => {
                std::slice::from_ref(value)
            }
            Self::In { values, .. } => values,
            Self::Between { bounds, .. } => bounds,
            Self::ColumnComparison { .. }
            | Self::Null { .. }
            | Self::Raw { .. }
            | Self::Nested { .. }
            | Self::Sub { .. } => &[],
        }
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Ascending.
    Asc,
    /// Descending.
    Desc,
}

impl Direction {
    /// `asc` (any case) is ascending; anything else is descending.
    pub fn parse(direction: &str) -> Self {
        if direction.eq_ignore_ascii_case("asc") {
            Self::Asc
        } else {
            Self::Desc
        }
    }

    /// Returns the SQL keyword.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }
}

/// One ORDER BY entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderNode {
    /// A quoted column and its direction.
    Column { column: String, direction: Direction },
    /// A raw expression, rendered verbatim.
    Raw(String),
}

/// One entry in the select list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectColumn {
    /// Quoted on render.
    Column(String),
    /// Emitted verbatim (raw expressions and aliased sub-selects).
    Raw(String),
}

/// The table a query reads from or a join attaches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableRef {
    /// Quoted on render.
    Table(String),
    /// Emitted verbatim (raw expressions and aliased sub-queries).
    Raw(String),
}

/// An aggregate function applied to one column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Aggregate {
    /// The SQL function name, e.g. `count`.
    pub function: String,
    /// The column the function is applied to.
    pub column: String,
}

/// A query appended with `union` or `union all`.
#[derive(Debug, Clone)]
pub struct Union {
    /// The member query.
    pub query: Arc<Builder>,
    /// `union all` when set, plain `union` otherwise.
    pub all: bool,
}

/// A row lock requested for the selected rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lock {
    /// `for update`
    ForUpdate,
    /// A shared read lock.
    Shared,
}
