//! The join sub-builder.

use std::ops::{Deref, DerefMut};

use quarry_core::QuarryResult;

use crate::query::builder::Builder;
use crate::query::types::TableRef;
use crate::value::Value;

/// The type of SQL join.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinType {
    /// `inner join`
    Inner,
    /// `left join`
    Left,
    /// `right join`
    Right,
    /// `cross join`
    Cross,
}

impl JoinType {
    /// Returns the SQL keyword preceding `join`.
    pub const fn sql_keyword(self) -> &'static str {
        match self {
            Self::Inner => "inner",
            Self::Left => "left",
            Self::Right => "right",
            Self::Cross => "cross",
        }
    }
}

/// One join of a query.
///
/// A join is a full [`Builder`] (reachable through `Deref`) whose WHERE list
/// renders as the `on` clause. Its own joins render nested inside it, and
/// every value it binds is merged into the parent's `join` bindings when it is
/// attached.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use quarry_db::grammar::Grammar;
/// use quarry_db::query::Builder;
///
/// let mut q = Builder::new(Arc::new(Grammar::mysql()));
/// q.from("users")
///     .left_join_with("posts", |join| {
///         join.on("users.id", "=", "posts.user_id")
///             .where_eq("posts.published", true)?;
///         Ok(())
///     })
///     .unwrap();
/// assert_eq!(
///     q.to_sql(),
///     "select * from `users` left join `posts` on `users`.`id` = `posts`.`user_id` and `posts`.`published` = ?"
/// );
/// ```
#[derive(Debug, Clone)]
pub struct JoinClause {
    join_type: JoinType,
    query: Builder,
}

impl JoinClause {
    /// Creates an empty join sharing the parent's grammar.
    pub(crate) fn new(parent: &Builder, join_type: JoinType, table: TableRef) -> Self {
        let mut query = parent.for_sub_query();
        query.table = Some(table);
        Self { join_type, query }
    }

    /// The kind of join.
    pub const fn join_type(&self) -> JoinType {
        self.join_type
    }

    /// Adds an `and`-connected column comparison to the `on` clause.
    pub fn on(&mut self, first: &str, operator: &str, second: &str) -> &mut Self {
        self.query.where_column(first, operator, second);
        self
    }

    /// Adds an `or`-connected column comparison to the `on` clause.
    pub fn or_on(&mut self, first: &str, operator: &str, second: &str) -> &mut Self {
        self.query.or_where_column(first, operator, second);
        self
    }

    /// Adds a parenthesised group of conditions to the `on` clause.
    pub fn on_nested<F>(&mut self, callback: F) -> QuarryResult<&mut Self>
    where
        F: FnOnce(&mut Builder) -> QuarryResult<()>,
    {
        self.query.where_nested(callback)?;
        Ok(self)
    }

    /// Like [`on_nested`](Self::on_nested), connected with `or`.
    pub fn or_on_nested<F>(&mut self, callback: F) -> QuarryResult<&mut Self>
    where
        F: FnOnce(&mut Builder) -> QuarryResult<()>,
    {
        self.query.or_where_nested(callback)?;
        Ok(self)
    }

    /// Every value bound inside the join, in category order.
    pub(crate) fn flat_bindings(&self) -> Vec<Value> {
        self.query.raw_bindings().flatten()
    }
}

impl Deref for JoinClause {
    type Target = Builder;

    fn deref(&self) -> &Builder {
        &self.query
    }
}

impl DerefMut for JoinClause {
    fn deref_mut(&mut self) -> &mut Builder {
        &mut self.query
    }
}
