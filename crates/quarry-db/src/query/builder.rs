//! The fluent query builder.
//!
//! A [`Builder`] accumulates clauses through chained calls and is compiled by
//! its [`Grammar`]. Calls that can reject their input return
//! `QuarryResult<&mut Builder>`, so chains read the same with `?` in between.
//!
//! A builder is meant to be owned and mutated by one caller at a time. Nested,
//! join, sub-query and union builders are frozen once they are attached to a
//! parent.

use std::sync::Arc;

use quarry_core::logging::statement_span;
use quarry_core::{QuarryError, QuarryResult};

use crate::executor::{ExecResult, Executor};
use crate::grammar::Grammar;
use crate::query::bindings::{BindingKind, Bindings};
use crate::query::join::{JoinClause, JoinType};
use crate::query::types::{
    Aggregate, DatePart, Direction, Lock, Logic, OrderNode, Predicate, SelectColumn, TableRef,
    Union,
};
use crate::row::Row;
use crate::value::Value;

/// A sub-query argument: literal SQL or another builder.
#[derive(Debug, Clone)]
pub enum SubQuery {
    /// A raw SQL string, used verbatim.
    Raw(String),
    /// A builder, rendered with the parent's grammar.
    Query(Builder),
}

impl From<&str> for SubQuery {
    fn from(sql: &str) -> Self {
        Self::Raw(sql.to_string())
    }
}

impl From<String> for SubQuery {
    fn from(sql: String) -> Self {
        Self::Raw(sql)
    }
}

impl From<Builder> for SubQuery {
    fn from(query: Builder) -> Self {
        Self::Query(query)
    }
}

/// A SQL query under construction.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use quarry_db::grammar::Grammar;
/// use quarry_db::query::Builder;
/// use quarry_db::value::Value;
///
/// let mut q = Builder::new(Arc::new(Grammar::mysql()));
/// q.from("users").where_eq("id", 1).unwrap().or_where_eq("id", 2).unwrap();
///
/// assert_eq!(q.to_sql(), "select * from `users` where `id` = ? or `id` = ?");
/// assert_eq!(q.get_bindings(), vec![Value::Int(1), Value::Int(2)]);
/// ```
#[derive(Debug, Clone)]
pub struct Builder {
    grammar: Arc<Grammar>,
    pub(crate) table: Option<TableRef>,
    pub(crate) columns: Vec<SelectColumn>,
    pub(crate) aggregate: Option<Aggregate>,
    pub(crate) joins: Vec<Arc<JoinClause>>,
    pub(crate) wheres: Vec<Predicate>,
    pub(crate) groups: Vec<String>,
    pub(crate) havings: Vec<Predicate>,
    pub(crate) orders: Vec<OrderNode>,
    pub(crate) limit: Option<u64>,
    pub(crate) offset: Option<u64>,
    pub(crate) unions: Vec<Union>,
    pub(crate) union_orders: Vec<OrderNode>,
    pub(crate) union_limit: Option<u64>,
    pub(crate) union_offset: Option<u64>,
    pub(crate) lock: Option<Lock>,
    bindings: Bindings,
}

impl Builder {
    /// Creates an empty builder compiled by `grammar`.
    pub fn new(grammar: Arc<Grammar>) -> Self {
        Self {
            grammar,
            table: None,
            columns: Vec::new(),
            aggregate: None,
            joins: Vec::new(),
            wheres: Vec::new(),
            groups: Vec::new(),
            havings: Vec::new(),
            orders: Vec::new(),
            limit: None,
            offset: None,
            unions: Vec::new(),
            union_orders: Vec::new(),
            union_limit: None,
            union_offset: None,
            lock: None,
            bindings: Bindings::new(),
        }
    }

    /// The grammar this builder compiles with.
    pub fn grammar(&self) -> &Arc<Grammar> {
        &self.grammar
    }

    /// The table being queried, if one is set.
    pub fn table(&self) -> Option<&TableRef> {
        self.table.as_ref()
    }

    /// The selected columns, in select order.
    pub fn columns(&self) -> &[SelectColumn] {
        &self.columns
    }

    /// The aggregate replacing the column list, if any.
    pub fn aggregate(&self) -> Option<&Aggregate> {
        self.aggregate.as_ref()
    }

    /// The WHERE predicates, in insertion order.
    pub fn wheres(&self) -> &[Predicate] {
        &self.wheres
    }

    /// The HAVING predicates, in insertion order.
    pub fn havings(&self) -> &[Predicate] {
        &self.havings
    }

    /// The joins, in insertion order.
    pub fn joins(&self) -> &[Arc<JoinClause>] {
        &self.joins
    }

    /// The binding registry, grouped by clause.
    pub fn raw_bindings(&self) -> &Bindings {
        &self.bindings
    }

    // ── select / from ──────────────────────────────────────────────────

    /// Adds columns to the select list.
    pub fn select(&mut self, columns: &[&str]) -> &mut Self {
        self.columns
            .extend(columns.iter().map(|c| SelectColumn::Column((*c).to_string())));
        self
    }

    /// Adds a raw select expression with its bindings.
    pub fn select_raw(&mut self, expression: &str, bindings: Vec<Value>) -> &mut Self {
        self.columns.push(SelectColumn::Raw(expression.to_string()));
        self.bindings.extend(BindingKind::Select, bindings);
        self
    }

    /// Selects `(sub-query) as alias`.
    pub fn select_sub(
        &mut self,
        query: impl Into<SubQuery>,
        alias: &str,
    ) -> QuarryResult<&mut Self> {
        let (sql, bindings) = self.create_sub(query.into())?;
        let expression = format!("({sql}) as {}", self.grammar.wrap(alias));
        Ok(self.select_raw(&expression, bindings))
    }

    /// Selects a sub-query built by `callback`, aliased as `alias`.
    pub fn select_sub_with<F>(&mut self, alias: &str, callback: F) -> QuarryResult<&mut Self>
    where
        F: FnOnce(&mut Self) -> QuarryResult<()>,
    {
        let mut sub = self.for_sub_query();
        callback(&mut sub)?;
        self.select_sub(sub, alias)
    }

    /// Sets the table to select from.
    pub fn from(&mut self, table: &str) -> &mut Self {
        self.table = Some(TableRef::Table(table.to_string()));
        self
    }

    /// Sets a raw FROM expression with its bindings.
    pub fn from_raw(&mut self, expression: &str, bindings: Vec<Value>) -> &mut Self {
        self.table = Some(TableRef::Raw(expression.to_string()));
        self.bindings.extend(BindingKind::From, bindings);
        self
    }

    /// Selects from `(sub-query) as alias`.
    pub fn from_sub(&mut self, query: impl Into<SubQuery>, alias: &str) -> QuarryResult<&mut Self> {
        let (sql, bindings) = self.create_sub(query.into())?;
        let expression = format!("({sql}) as {}", self.grammar.wrap(alias));
        Ok(self.from_raw(&expression, bindings))
    }

    /// Selects from a sub-query built by `callback`, aliased as `alias`.
    pub fn from_sub_with<F>(&mut self, alias: &str, callback: F) -> QuarryResult<&mut Self>
    where
        F: FnOnce(&mut Self) -> QuarryResult<()>,
    {
        let mut sub = self.for_sub_query();
        callback(&mut sub)?;
        self.from_sub(sub, alias)
    }

    // ── where ──────────────────────────────────────────────────────────

    /// Adds `column operator ?`.
    ///
    /// A null value turns `=` / `!=` into `is null` / `is not null` and binds
    /// nothing.
    ///
    /// # Errors
    ///
    /// [`QuarryError::IllegalNullOperator`] for a null value with any other
    /// operator, [`QuarryError::UnsupportedValueType`] for a non-scalar value.
    pub fn where_(
        &mut self,
        column: &str,
        operator: &str,
        value: impl Into<Value>,
    ) -> QuarryResult<&mut Self> {
        let predicate = Self::comparison(Logic::And, column, operator, value.into())?;
        Ok(self.push_predicate(BindingKind::Where, predicate))
    }

    /// Adds `column = ?`.
    pub fn where_eq(&mut self, column: &str, value: impl Into<Value>) -> QuarryResult<&mut Self> {
        self.where_(column, "=", value)
    }

    /// Adds `or column operator ?`.
    pub fn or_where(
        &mut self,
        column: &str,
        operator: &str,
        value: impl Into<Value>,
    ) -> QuarryResult<&mut Self> {
        let predicate = Self::comparison(Logic::Or, column, operator, value.into())?;
        Ok(self.push_predicate(BindingKind::Where, predicate))
    }

    /// Adds `or column = ?`.
    pub fn or_where_eq(&mut self, column: &str, value: impl Into<Value>) -> QuarryResult<&mut Self> {
        self.or_where(column, "=", value)
    }

    /// Adds a parenthesised group built by `callback`.
    ///
    /// The callback receives a fresh builder on the same table. Nothing is
    /// added when it adds no conditions.
    pub fn where_nested<F>(&mut self, callback: F) -> QuarryResult<&mut Self>
    where
        F: FnOnce(&mut Self) -> QuarryResult<()>,
    {
        self.push_nested(Logic::And, callback)
    }

    /// Like [`where_nested`](Self::where_nested), connected with `or`.
    pub fn or_where_nested<F>(&mut self, callback: F) -> QuarryResult<&mut Self>
    where
        F: FnOnce(&mut Self) -> QuarryResult<()>,
    {
        self.push_nested(Logic::Or, callback)
    }

    /// Adds `column operator (select ...)` with the sub-select built by `callback`.
    pub fn where_sub<F>(&mut self, column: &str, operator: &str, callback: F) -> QuarryResult<&mut Self>
    where
        F: FnOnce(&mut Self) -> QuarryResult<()>,
    {
        self.push_sub(Logic::And, column, operator, callback)
    }

    /// Like [`where_sub`](Self::where_sub), connected with `or`.
    pub fn or_where_sub<F>(
        &mut self,
        column: &str,
        operator: &str,
        callback: F,
    ) -> QuarryResult<&mut Self>
    where
        F: FnOnce(&mut Self) -> QuarryResult<()>,
    {
        self.push_sub(Logic::Or, column, operator, callback)
    }

    /// Compares two columns; nothing is bound.
    pub fn where_column(&mut self, first: &str, operator: &str, second: &str) -> &mut Self {
        self.push_column_comparison(Logic::And, first, operator, second)
    }

    /// Like [`where_column`](Self::where_column), connected with `or`.
    pub fn or_where_column(&mut self, first: &str, operator: &str, second: &str) -> &mut Self {
        self.push_column_comparison(Logic::Or, first, operator, second)
    }

    /// Adds a literal condition and its bindings.
    pub fn where_raw(&mut self, sql: &str, bindings: Vec<Value>) -> &mut Self {
        self.push_raw(BindingKind::Where, Logic::And, sql, bindings)
    }

    /// Adds a raw predicate connected with `or`.
    pub fn or_where_raw(&mut self, sql: &str, bindings: Vec<Value>) -> &mut Self {
        self.push_raw(BindingKind::Where, Logic::Or, sql, bindings)
    }

    /// Adds `column is null`.
    pub fn where_null(&mut self, column: &str) -> &mut Self {
        self.push_null(Logic::And, column, false)
    }

    /// Adds `or column is null`.
    pub fn or_where_null(&mut self, column: &str) -> &mut Self {
        self.push_null(Logic::Or, column, false)
    }

    /// Adds `column is not null`.
    pub fn where_not_null(&mut self, column: &str) -> &mut Self {
        self.push_null(Logic::And, column, true)
    }

    /// Adds `or column is not null`.
    pub fn or_where_not_null(&mut self, column: &str) -> &mut Self {
        self.push_null(Logic::Or, column, true)
    }

    /// Adds `column in (?, ...)`.
    pub fn where_in<I, V>(&mut self, column: &str, values: I) -> QuarryResult<&mut Self>
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.push_in(Logic::And, column, values, false)
    }

    /// Like [`where_in`](Self::where_in), connected with `or`.
    pub fn or_where_in<I, V>(&mut self, column: &str, values: I) -> QuarryResult<&mut Self>
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.push_in(Logic::Or, column, values, false)
    }

    /// Adds `column not in (?, ...)`. Every value must be a scalar.
    pub fn where_not_in<I, V>(&mut self, column: &str, values: I) -> QuarryResult<&mut Self>
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.push_in(Logic::And, column, values, true)
    }

    /// Like [`where_not_in`](Self::where_not_in), connected with `or`.
    pub fn or_where_not_in<I, V>(&mut self, column: &str, values: I) -> QuarryResult<&mut Self>
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.push_in(Logic::Or, column, values, true)
    }

    /// Adds `column in (select ...)` with the sub-select built by `callback`.
    pub fn where_in_sub<F>(&mut self, column: &str, callback: F) -> QuarryResult<&mut Self>
    where
        F: FnOnce(&mut Self) -> QuarryResult<()>,
    {
        self.push_sub(Logic::And, column, "in", callback)
    }

    /// Adds `column not in (select ...)` with the sub-query built by `callback`.
    pub fn where_not_in_sub<F>(&mut self, column: &str, callback: F) -> QuarryResult<&mut Self>
    where
        F: FnOnce(&mut Self) -> QuarryResult<()>,
    {
        self.push_sub(Logic::And, column, "not in", callback)
    }

    /// Adds `column between ? and ?`.
    pub fn where_between(
        &mut self,
        column: &str,
        low: impl Into<Value>,
        high: impl Into<Value>,
    ) -> QuarryResult<&mut Self> {
        self.push_between(Logic::And, column, [low.into(), high.into()], false)
    }

    /// Adds `or column between ? and ?`.
    pub fn or_where_between(
        &mut self,
        column: &str,
        low: impl Into<Value>,
        high: impl Into<Value>,
    ) -> QuarryResult<&mut Self> {
        self.push_between(Logic::Or, column, [low.into(), high.into()], false)
    }

    /// Adds `column not between ? and ?`.
    pub fn where_not_between(
        &mut self,
        column: &str,
        low: impl Into<Value>,
        high: impl Into<Value>,
    ) -> QuarryResult<&mut Self> {
        self.push_between(Logic::And, column, [low.into(), high.into()], true)
    }

    /// Adds `or column not between ? and ?`.
    pub fn or_where_not_between(
        &mut self,
        column: &str,
        low: impl Into<Value>,
        high: impl Into<Value>,
    ) -> QuarryResult<&mut Self> {
        self.push_between(Logic::Or, column, [low.into(), high.into()], true)
    }

    /// Adds `date(column) operator ?`; see [`DatePart::format_value`] for the
    /// accepted values.
    pub fn where_date(
        &mut self,
        column: &str,
        operator: &str,
        value: impl Into<Value>,
    ) -> QuarryResult<&mut Self> {
        self.push_date(Logic::And, DatePart::Date, column, operator, value.into())
    }

    /// Like [`where_date`](Self::where_date), connected with `or`.
    pub fn or_where_date(
        &mut self,
        column: &str,
        operator: &str,
        value: impl Into<Value>,
    ) -> QuarryResult<&mut Self> {
        self.push_date(Logic::Or, DatePart::Date, column, operator, value.into())
    }

    /// Adds `time(column) operator ?`.
    pub fn where_time(
        &mut self,
        column: &str,
        operator: &str,
        value: impl Into<Value>,
    ) -> QuarryResult<&mut Self> {
        self.push_date(Logic::And, DatePart::Time, column, operator, value.into())
    }

    /// Like [`where_time`](Self::where_time), connected with `or`.
    pub fn or_where_time(
        &mut self,
        column: &str,
        operator: &str,
        value: impl Into<Value>,
    ) -> QuarryResult<&mut Self> {
        self.push_date(Logic::Or, DatePart::Time, column, operator, value.into())
    }

    /// Adds `day(column) operator ?`.
    pub fn where_day(
        &mut self,
        column: &str,
        operator: &str,
        value: impl Into<Value>,
    ) -> QuarryResult<&mut Self> {
        self.push_date(Logic::And, DatePart::Day, column, operator, value.into())
    }

    /// Like [`where_day`](Self::where_day), connected with `or`.
    pub fn or_where_day(
        &mut self,
        column: &str,
        operator: &str,
        value: impl Into<Value>,
    ) -> QuarryResult<&mut Self> {
        self.push_date(Logic::Or, DatePart::Day, column, operator, value.into())
    }

    /// Adds `month(column) operator ?`.
    pub fn where_month(
        &mut self,
        column: &str,
        operator: &str,
        value: impl Into<Value>,
    ) -> QuarryResult<&mut Self> {
        self.push_date(Logic::And, DatePart::Month, column, operator, value.into())
    }

    /// Like [`where_month`](Self::where_month), connected with `or`.
    pub fn or_where_month(
        &mut self,
        column: &str,
        operator: &str,
        value: impl Into<Value>,
    ) -> QuarryResult<&mut Self> {
        self.push_date(Logic::Or, DatePart::Month, column, operator, value.into())
    }

    /// Adds `year(column) operator ?`.
    pub fn where_year(
        &mut self,
        column: &str,
        operator: &str,
        value: impl Into<Value>,
    ) -> QuarryResult<&mut Self> {
        self.push_date(Logic::And, DatePart::Year, column, operator, value.into())
    }

    /// Like [`where_year`](Self::where_year), connected with `or`.
    pub fn or_where_year(
        &mut self,
        column: &str,
        operator: &str,
        value: impl Into<Value>,
    ) -> QuarryResult<&mut Self> {
        self.push_date(Logic::Or, DatePart::Year, column, operator, value.into())
    }

    // ── group / having ─────────────────────────────────────────────────

    /// Appends columns to the `group by` list.
    pub fn group_by(&mut self, columns: &[&str]) -> &mut Self {
        self.groups.extend(columns.iter().map(|c| (*c).to_string()));
        self
    }

    /// Adds `column operator ?` to the HAVING clause.
    pub fn having(
        &mut self,
        column: &str,
        operator: &str,
        value: impl Into<Value>,
    ) -> QuarryResult<&mut Self> {
        let predicate = Self::comparison(Logic::And, column, operator, value.into())?;
        Ok(self.push_predicate(BindingKind::Having, predicate))
    }

    /// Like [`having`](Self::having), connected with `or`.
    pub fn or_having(
        &mut self,
        column: &str,
        operator: &str,
        value: impl Into<Value>,
    ) -> QuarryResult<&mut Self> {
        let predicate = Self::comparison(Logic::Or, column, operator, value.into())?;
        Ok(self.push_predicate(BindingKind::Having, predicate))
    }

    /// Adds a raw HAVING predicate with its bindings.
    pub fn having_raw(&mut self, sql: &str, bindings: Vec<Value>) -> &mut Self {
        self.push_raw(BindingKind::Having, Logic::And, sql, bindings)
    }

    /// Adds a raw HAVING predicate connected with `or`.
    pub fn or_having_raw(&mut self, sql: &str, bindings: Vec<Value>) -> &mut Self {
        self.push_raw(BindingKind::Having, Logic::Or, sql, bindings)
    }

    // ── order / limit / offset ─────────────────────────────────────────

    /// Orders by `column`. `direction` is `asc` (any case) or anything else
    /// for descending. After a union this orders the combined result.
    pub fn order_by(&mut self, column: &str, direction: &str) -> &mut Self {
        self.push_order(OrderNode::Column {
            column: column.to_string(),
            direction: Direction::parse(direction),
        })
    }

    /// Orders by `column` descending.
    pub fn order_by_desc(&mut self, column: &str) -> &mut Self {
        self.order_by(column, "desc")
    }

    /// Orders by a raw expression with its bindings.
    pub fn order_by_raw(&mut self, sql: &str, bindings: Vec<Value>) -> &mut Self {
        let kind = if self.unions.is_empty() {
            BindingKind::Order
        } else {
            BindingKind::UnionOrder
        };
        self.bindings.extend(kind, bindings);
        self.push_order(OrderNode::Raw(sql.to_string()))
    }

    /// Caps the number of rows. Zero renders no LIMIT clause.
    pub fn limit(&mut self, limit: u64) -> &mut Self {
        if self.unions.is_empty() {
            self.limit = Some(limit);
        } else {
            self.union_limit = Some(limit);
        }
        self
    }

    /// Skips rows. Zero renders no OFFSET clause.
    pub fn offset(&mut self, offset: u64) -> &mut Self {
        if self.unions.is_empty() {
            self.offset = Some(offset);
        } else {
            self.union_offset = Some(offset);
        }
        self
    }

    // ── unions / locks ─────────────────────────────────────────────────

    /// Appends `union (query)`.
    ///
    /// # Errors
    ///
    /// [`QuarryError::IllegalSubquery`] if `query` targets another dialect.
    pub fn union(&mut self, query: Self) -> QuarryResult<&mut Self> {
        self.push_union(query, false)
    }

    /// Appends `union all (query)`.
    pub fn union_all(&mut self, query: Self) -> QuarryResult<&mut Self> {
        self.push_union(query, true)
    }

    /// Unions the query built by `callback`.
    pub fn union_with<F>(&mut self, callback: F) -> QuarryResult<&mut Self>
    where
        F: FnOnce(&mut Self) -> QuarryResult<()>,
    {
        let mut query = self.for_sub_query();
        callback(&mut query)?;
        self.push_union(query, false)
    }

    /// Like [`union_with`](Self::union_with), keeping duplicates.
    pub fn union_all_with<F>(&mut self, callback: F) -> QuarryResult<&mut Self>
    where
        F: FnOnce(&mut Self) -> QuarryResult<()>,
    {
        let mut query = self.for_sub_query();
        callback(&mut query)?;
        self.push_union(query, true)
    }

    /// Locks the selected rows for update, where the dialect supports it.
    pub fn lock_for_update(&mut self) -> &mut Self {
        self.lock = Some(Lock::ForUpdate);
        self
    }

    /// Takes a shared lock on the selected rows, where the dialect supports it.
    pub fn shared_lock(&mut self) -> &mut Self {
        self.lock = Some(Lock::Shared);
        self
    }

    // ── joins ──────────────────────────────────────────────────────────

    /// Adds `inner join table on first operator second`.
    pub fn join(&mut self, table: &str, first: &str, operator: &str, second: &str) -> &mut Self {
        self.join_on(JoinType::Inner, TableRef::Table(table.to_string()), first, operator, second)
    }

    /// Adds `left join table on first operator second`.
    pub fn left_join(&mut self, table: &str, first: &str, operator: &str, second: &str) -> &mut Self {
        self.join_on(JoinType::Left, TableRef::Table(table.to_string()), first, operator, second)
    }

    /// Adds `right join table on first operator second`.
    pub fn right_join(&mut self, table: &str, first: &str, operator: &str, second: &str) -> &mut Self {
        self.join_on(JoinType::Right, TableRef::Table(table.to_string()), first, operator, second)
    }

    /// Adds an inner join configured by `callback`.
    pub fn join_with<F>(&mut self, table: &str, callback: F) -> QuarryResult<&mut Self>
    where
        F: FnOnce(&mut JoinClause) -> QuarryResult<()>,
    {
        self.join_using(JoinType::Inner, TableRef::Table(table.to_string()), callback)
    }

    /// Adds a left join configured by `callback`.
    pub fn left_join_with<F>(&mut self, table: &str, callback: F) -> QuarryResult<&mut Self>
    where
        F: FnOnce(&mut JoinClause) -> QuarryResult<()>,
    {
        self.join_using(JoinType::Left, TableRef::Table(table.to_string()), callback)
    }

    /// Adds a right join configured by `callback`.
    pub fn right_join_with<F>(&mut self, table: &str, callback: F) -> QuarryResult<&mut Self>
    where
        F: FnOnce(&mut JoinClause) -> QuarryResult<()>,
    {
        self.join_using(JoinType::Right, TableRef::Table(table.to_string()), callback)
    }

    /// Adds `inner join table on column operator ?` with a bound value.
    pub fn join_where(
        &mut self,
        table: &str,
        column: &str,
        operator: &str,
        value: impl Into<Value>,
    ) -> QuarryResult<&mut Self> {
        let value = value.into();
        self.join_using(JoinType::Inner, TableRef::Table(table.to_string()), |join| {
            join.where_(column, operator, value).map(|_| ())
        })
    }

    /// Like [`join_where`](Self::join_where), as a left join.
    pub fn left_join_where(
        &mut self,
        table: &str,
        column: &str,
        operator: &str,
        value: impl Into<Value>,
    ) -> QuarryResult<&mut Self> {
        let value = value.into();
        self.join_using(JoinType::Left, TableRef::Table(table.to_string()), |join| {
            join.where_(column, operator, value).map(|_| ())
        })
    }

    /// Like [`join_where`](Self::join_where), as a right join.
    pub fn right_join_where(
        &mut self,
        table: &str,
        column: &str,
        operator: &str,
        value: impl Into<Value>,
    ) -> QuarryResult<&mut Self> {
        let value = value.into();
        self.join_using(JoinType::Right, TableRef::Table(table.to_string()), |join| {
            join.where_(column, operator, value).map(|_| ())
        })
    }

    /// Joins `(sub-query) as alias on first operator second`.
    pub fn join_sub(
        &mut self,
        query: impl Into<SubQuery>,
        alias: &str,
        first: &str,
        operator: &str,
        second: &str,
    ) -> QuarryResult<&mut Self> {
        self.join_sub_on(JoinType::Inner, query.into(), alias, first, operator, second)
    }

    /// Left-joins `(sub-query) as alias`.
    pub fn left_join_sub(
        &mut self,
        query: impl Into<SubQuery>,
        alias: &str,
        first: &str,
        operator: &str,
        second: &str,
    ) -> QuarryResult<&mut Self> {
        self.join_sub_on(JoinType::Left, query.into(), alias, first, operator, second)
    }

    /// Right-joins `(sub-query) as alias`.
    pub fn right_join_sub(
        &mut self,
        query: impl Into<SubQuery>,
        alias: &str,
        first: &str,
        operator: &str,
        second: &str,
    ) -> QuarryResult<&mut Self> {
        self.join_sub_on(JoinType::Right, query.into(), alias, first, operator, second)
    }

    /// Adds `cross join table` with no `on` clause.
    pub fn cross_join(&mut self, table: &str) -> &mut Self {
        let join = JoinClause::new(self, JoinType::Cross, TableRef::Table(table.to_string()));
        self.attach_join(join)
    }

    /// Adds `cross join table on first operator second`.
    pub fn cross_join_on(&mut self, table: &str, first: &str, operator: &str, second: &str) -> &mut Self {
        self.join_on(JoinType::Cross, TableRef::Table(table.to_string()), first, operator, second)
    }

    // ── compilation ────────────────────────────────────────────────────

    /// Renders the select statement.
    pub fn to_sql(&self) -> String {
        self.grammar.compile_select(self)
    }

    /// The values matching the placeholders of [`to_sql`](Self::to_sql), in order.
    pub fn get_bindings(&self) -> Vec<Value> {
        self.grammar.prepare_bindings_for_select(self)
    }

    /// A copy of this query selecting `function(column) as aggregate`.
    ///
    /// The receiver is left untouched. Sub-queries held by the copy are shared,
    /// not duplicated.
    pub fn aggregate_query(&self, function: &str, column: &str) -> Self {
        let mut clone = self.clone();
        clone.columns = vec![SelectColumn::Column(column.to_string())];
        clone.bindings.clear(BindingKind::Select);
        clone.aggregate = Some(Aggregate {
            function: function.to_string(),
            column: column.to_string(),
        });
        clone
    }

    /// Renders an insert of `rows`. Returns `None` when there are no rows.
    ///
    /// Columns come from the first row; later rows are read by column name,
    /// with missing columns bound as null.
    pub fn to_insert_sql(&self, rows: &[Vec<(&str, Value)>]) -> Option<(String, Vec<Value>)> {
        let first = rows.first()?;
        let columns: Vec<&str> = first.iter().map(|(column, _)| *column).collect();
        let mut bindings = Vec::with_capacity(columns.len() * rows.len());
        for row in rows {
            for column in &columns {
                let value = row
                    .iter()
                    .find(|(name, _)| name == column)
                    .map_or(Value::Null, |(_, value)| value.clone());
                bindings.push(value);
            }
        }
        let sql = self.grammar.compile_insert(self, &columns, rows.len());
        Some((sql, bindings))
    }

    /// Renders an update assigning `values` in the given order. Returns
    /// `None` when there is nothing to assign.
    pub fn to_update_sql(&self, values: &[(&str, Value)]) -> Option<(String, Vec<Value>)> {
        if values.is_empty() {
            return None;
        }
        let columns: Vec<&str> = values.iter().map(|(column, _)| *column).collect();
        let sql = self.grammar.compile_update(self, &columns);
        let assigned = values.iter().map(|(_, value)| value.clone()).collect();
        Some((sql, self.grammar.prepare_bindings_for_update(self, assigned)))
    }

    /// Renders a delete of the matching rows.
    pub fn to_delete_sql(&self) -> (String, Vec<Value>) {
        (
            self.grammar.compile_delete(self),
            self.grammar.prepare_bindings_for_delete(self),
        )
    }

    /// Renders `truncate table <t>`.
    pub fn to_truncate_sql(&self) -> String {
        self.grammar.compile_truncate(self)
    }

    // ── execution ──────────────────────────────────────────────────────

    /// Runs the select and returns its rows.
    pub fn get(&self, executor: &dyn Executor) -> QuarryResult<Vec<Row>> {
        let sql = self.to_sql();
        let bindings = self.get_bindings();
        let _span = statement_span("select").entered();
        tracing::debug!(sql = %sql, bindings = bindings.len(), "executing select");
        executor.select(&sql, &bindings)
    }

    /// `count(column)` over this query.
    pub fn count(&self, executor: &dyn Executor, column: &str) -> QuarryResult<Value> {
        self.run_aggregate(executor, "count", column)
    }

    /// `min(column)` over this query.
    pub fn min(&self, executor: &dyn Executor, column: &str) -> QuarryResult<Value> {
        self.run_aggregate(executor, "min", column)
    }

    /// `max(column)` over this query.
    pub fn max(&self, executor: &dyn Executor, column: &str) -> QuarryResult<Value> {
        self.run_aggregate(executor, "max", column)
    }

    /// `sum(column)` over this query.
    pub fn sum(&self, executor: &dyn Executor, column: &str) -> QuarryResult<Value> {
        self.run_aggregate(executor, "sum", column)
    }

    /// `avg(column)` over this query.
    pub fn avg(&self, executor: &dyn Executor, column: &str) -> QuarryResult<Value> {
        self.run_aggregate(executor, "avg", column)
    }

    /// Inserts `rows` into the table. An empty slice runs nothing.
    pub fn insert(
        &self,
        executor: &dyn Executor,
        rows: &[Vec<(&str, Value)>],
    ) -> QuarryResult<ExecResult> {
        let Some((sql, bindings)) = self.to_insert_sql(rows) else {
            tracing::debug!("insert called without rows; nothing to do");
            return Ok(ExecResult::default());
        };
        let _span = statement_span("insert").entered();
        tracing::debug!(sql = %sql, bindings = bindings.len(), "executing insert");
        executor.insert(&sql, &bindings)
    }

    /// Updates the matching rows and returns how many were affected. An
    /// empty `values` slice runs nothing.
    pub fn update(&self, executor: &dyn Executor, values: &[(&str, Value)]) -> QuarryResult<u64> {
        let Some((sql, bindings)) = self.to_update_sql(values) else {
            tracing::debug!("update called without values; nothing to do");
            return Ok(0);
        };
        let _span = statement_span("update").entered();
        tracing::debug!(sql = %sql, bindings = bindings.len(), "executing update");
        executor.update(&sql, &bindings)
    }

    /// Deletes the matching rows and returns how many were affected.
    pub fn delete(&self, executor: &dyn Executor) -> QuarryResult<u64> {
        let (sql, bindings) = self.to_delete_sql();
        let _span = statement_span("delete").entered();
        tracing::debug!(sql = %sql, bindings = bindings.len(), "executing delete");
        executor.delete(&sql, &bindings)
    }

    /// Runs `truncate table <t>`. Backends without a TRUNCATE statement,
    /// such as SQLite, report an execution error; use [`delete`](Self::delete)
    /// with no conditions there.
    pub fn truncate(&self, executor: &dyn Executor) -> QuarryResult<ExecResult> {
        let sql = self.to_truncate_sql();
        let _span = statement_span("truncate").entered();
        tracing::debug!(sql = %sql, "executing truncate");
        executor.statement(&sql, &[])
    }

    // ── internals ──────────────────────────────────────────────────────

    /// A fresh builder on the same table, for nested conditions.
    pub(crate) fn for_nested_where(&self) -> Self {
        let mut query = self.for_sub_query();
        query.table.clone_from(&self.table);
        query
    }

    /// A fresh builder sharing only the grammar.
    pub(crate) fn for_sub_query(&self) -> Self {
        Self::new(Arc::clone(&self.grammar))
    }

    fn run_aggregate(&self, executor: &dyn Executor, function: &str, column: &str) -> QuarryResult<Value> {
        let rows = self.aggregate_query(function, column).get(executor)?;
        Ok(rows
            .first()
            .and_then(|row| row.get_value("aggregate").cloned())
            .unwrap_or(Value::Null))
    }

    fn comparison(logic: Logic, column: &str, operator: &str, value: Value) -> QuarryResult<Predicate> {
        if value.is_null() {
            return Predicate::null(logic, column, operator);
        }
        Ok(Predicate::Comparison {
            logic,
            column: column.to_string(),
            operator: operator.to_string(),
            value: Self::scalar(value)?,
        })
    }

    fn scalar(value: Value) -> QuarryResult<Value> {
        if value.is_scalar() {
            Ok(value)
        } else {
            Err(QuarryError::UnsupportedValueType(format!(
                "{} cannot be used as a predicate value",
                value.type_name()
            )))
        }
    }

    /// Appends a predicate and binds the values it renders placeholders for.
    fn push_predicate(&mut self, kind: BindingKind, predicate: Predicate) -> &mut Self {
        self.bindings.extend(kind, predicate.values().iter().cloned());
        if kind == BindingKind::Having {
            self.havings.push(predicate);
        } else {
            self.wheres.push(predicate);
        }
        self
    }

    fn push_column_comparison(&mut self, logic: Logic, first: &str, operator: &str, second: &str) -> &mut Self {
        self.push_predicate(
            BindingKind::Where,
            Predicate::ColumnComparison {
                logic,
                first: first.to_string(),
                operator: operator.to_string(),
                second: second.to_string(),
            },
        )
    }

    fn push_raw(&mut self, kind: BindingKind, logic: Logic, sql: &str, bindings: Vec<Value>) -> &mut Self {
        self.bindings.extend(kind, bindings);
        self.push_predicate(
            kind,
            Predicate::Raw {
                logic,
                sql: sql.to_string(),
            },
        )
    }

    fn push_null(&mut self, logic: Logic, column: &str, negated: bool) -> &mut Self {
        self.push_predicate(
            BindingKind::Where,
            Predicate::Null {
                logic,
                column: column.to_string(),
                negated,
            },
        )
    }

    fn push_in<I, V>(&mut self, logic: Logic, column: &str, values: I, negated: bool) -> QuarryResult<&mut Self>
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let values = values
            .into_iter()
            .map(|value| Self::scalar(value.into()))
            .collect::<QuarryResult<Vec<_>>>()?;
        Ok(self.push_predicate(
            BindingKind::Where,
            Predicate::In {
                logic,
                column: column.to_string(),
                negated,
                values,
            },
        ))
    }

    fn push_between(
        &mut self,
        logic: Logic,
        column: &str,
        [low, high]: [Value; 2],
        negated: bool,
    ) -> QuarryResult<&mut Self> {
        let bounds = [Self::scalar(low)?, Self::scalar(high)?];
        Ok(self.push_predicate(
            BindingKind::Where,
            Predicate::Between {
                logic,
                column: column.to_string(),
                negated,
                bounds,
            },
        ))
    }

    fn push_date(
        &mut self,
        logic: Logic,
        part: DatePart,
        column: &str,
        operator: &str,
        value: Value,
    ) -> QuarryResult<&mut Self> {
        let formatted = part.format_value(value)?;
        Ok(self.push_predicate(
            BindingKind::Where,
            Predicate::DatePart {
                logic,
                column: column.to_string(),
                operator: operator.to_string(),
                part,
                value: Value::String(formatted),
            },
        ))
    }

    fn push_nested<F>(&mut self, logic: Logic, callback: F) -> QuarryResult<&mut Self>
    where
        F: FnOnce(&mut Self) -> QuarryResult<()>,
    {
        let mut nested = self.for_nested_where();
        callback(&mut nested)?;
        if nested.wheres.is_empty() {
            return Ok(self);
        }
        self.bindings.extend(
            BindingKind::Where,
            nested.bindings.get(BindingKind::Where).iter().cloned(),
        );
        Ok(self.push_predicate(
            BindingKind::Where,
            Predicate::Nested {
                logic,
                query: Arc::new(nested),
            },
        ))
    }

    fn push_sub<F>(&mut self, logic: Logic, column: &str, operator: &str, callback: F) -> QuarryResult<&mut Self>
    where
        F: FnOnce(&mut Self) -> QuarryResult<()>,
    {
        let mut sub = self.for_sub_query();
        callback(&mut sub)?;
        self.bindings.extend(BindingKind::Where, sub.get_bindings());
        Ok(self.push_predicate(
            BindingKind::Where,
            Predicate::Sub {
                logic,
                column: column.to_string(),
                operator: operator.to_string(),
                query: Arc::new(sub),
            },
        ))
    }

    fn push_order(&mut self, node: OrderNode) -> &mut Self {
        if self.unions.is_empty() {
            self.orders.push(node);
        } else {
            self.union_orders.push(node);
        }
        self
    }

    fn push_union(&mut self, query: Self, all: bool) -> QuarryResult<&mut Self> {
        self.check_dialect(&query)?;
        self.bindings.extend(BindingKind::Union, query.get_bindings());
        self.unions.push(Union {
            query: Arc::new(query),
            all,
        });
        Ok(self)
    }

    fn join_on(
        &mut self,
        join_type: JoinType,
        table: TableRef,
        first: &str,
        operator: &str,
        second: &str,
    ) -> &mut Self {
        let mut join = JoinClause::new(self, join_type, table);
        join.on(first, operator, second);
        self.attach_join(join)
    }

    fn join_using<F>(&mut self, join_type: JoinType, table: TableRef, callback: F) -> QuarryResult<&mut Self>
    where
        F: FnOnce(&mut JoinClause) -> QuarryResult<()>,
    {
        let mut join = JoinClause::new(self, join_type, table);
        callback(&mut join)?;
        Ok(self.attach_join(join))
    }

    fn join_sub_on(
        &mut self,
        join_type: JoinType,
        query: SubQuery,
        alias: &str,
        first: &str,
        operator: &str,
        second: &str,
    ) -> QuarryResult<&mut Self> {
        let (sql, bindings) = self.create_sub(query)?;
        let table = TableRef::Raw(format!("({sql}) as {}", self.grammar.wrap(alias)));
        self.bindings.extend(BindingKind::Join, bindings);
        Ok(self.join_on(join_type, table, first, operator, second))
    }

    fn attach_join(&mut self, join: JoinClause) -> &mut Self {
        self.bindings.extend(BindingKind::Join, join.flat_bindings());
        self.joins.push(Arc::new(join));
        self
    }

    /// Renders a sub-query argument into SQL text and its bindings.
    fn create_sub(&self, query: SubQuery) -> QuarryResult<(String, Vec<Value>)> {
        match query {
            SubQuery::Raw(sql) if sql.trim().is_empty() => Err(QuarryError::IllegalSubquery(
                "raw sub-query is empty".to_string(),
            )),
            SubQuery::Raw(sql) => Ok((sql, Vec::new())),
            SubQuery::Query(query) => {
                self.check_dialect(&query)?;
                Ok((query.to_sql(), query.get_bindings()))
            }
        }
    }

    fn check_dialect(&self, other: &Self) -> QuarryResult<()> {
        let (ours, theirs) = (self.grammar.dialect(), other.grammar.dialect());
        if ours == theirs {
            Ok(())
        } else {
            Err(QuarryError::IllegalSubquery(format!(
                "a {theirs} query cannot be embedded in a {ours} query"
            )))
        }
    }
}
