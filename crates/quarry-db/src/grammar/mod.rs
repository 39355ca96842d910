//! SQL grammars.
//!
//! A [`Grammar`] renders a [`Builder`] into SQL text. Select statements run
//! through an ordered list of [`SelectComponent`] steps; each step renders a
//! fragment or an empty string, empty fragments are dropped and the rest are
//! joined with single spaces.
//!
//! The base grammar is dialect-agnostic. Dialect-specific steps live in
//! submodules and are selected by [`Dialect`]:
//!
//! - **Generic**: no unions or locks, plain UPDATE/DELETE.
//! - **MySQL**: parenthesised unions, row locks, join-aware DELETE and
//!   trailing ORDER/LIMIT on UPDATE/DELETE.

mod mysql;

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use quarry_core::{ConnectionSettings, QuarryError, QuarryResult};

use crate::query::bindings::BindingKind;
use crate::query::builder::Builder;
use crate::query::join::JoinClause;
use crate::query::types::{Lock, OrderNode, Predicate, SelectColumn, TableRef};
use crate::value::Value;

/// The SQL dialect family a grammar renders for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dialect {
    /// Base rendering only.
    Generic,
    /// MySQL / MariaDB.
    MySql,
}

impl Dialect {
    /// Maps a configured driver name to a dialect.
    ///
    /// # Errors
    ///
    /// Returns [`QuarryError::ConfigurationError`] for an unknown driver.
    pub fn from_driver(driver: &str) -> QuarryResult<Self> {
        match driver.to_ascii_lowercase().as_str() {
            "mysql" | "mariadb" => Ok(Self::MySql),
            "generic" | "sqlite" | "sqlite3" => Ok(Self::Generic),
            other => Err(QuarryError::ConfigurationError(format!(
                "Unsupported database driver: {other}"
            ))),
        }
    }

    /// The dialect's configuration name.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Generic => "generic",
            Self::MySql => "mysql",
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Dialect {
    type Err = QuarryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_driver(s)
    }
}

/// One named step of the select pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SelectComponent {
    /// `select fn(col) as aggregate`
    Aggregate,
    /// `select cols`, skipped when an aggregate is set.
    Columns,
    /// `from table`
    From,
    /// Joins and their `on` clauses.
    Joins,
    /// `where ...`
    Wheres,
    /// `group by ...`
    Groups,
    /// `having ...`
    Havings,
    /// `order by ...`
    Orders,
    /// `limit n`
    Limit,
    /// `offset n`
    Offset,
    /// Unions; wraps the text rendered so far.
    Unions,
    /// Row lock clause.
    Lock,
}

impl SelectComponent {
    /// The base pipeline, in render order.
    ///
    /// The base grammar renders nothing for the union step; the MySQL
    /// pipeline moves it last so it wraps the whole base select.
    pub const BASE: [Self; 12] = [
        Self::Aggregate,
        Self::Columns,
        Self::From,
        Self::Joins,
        Self::Wheres,
        Self::Groups,
        Self::Havings,
        Self::Orders,
        Self::Limit,
        Self::Offset,
        Self::Unions,
        Self::Lock,
    ];
}

/// Which optional clauses an UPDATE or DELETE renders.
#[derive(Debug, Clone, Copy, Default)]
struct MutationShape {
    joins: bool,
    order_and_limit: bool,
}

/// Renders builders into SQL for one dialect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grammar {
    dialect: Dialect,
    placeholder: String,
    quote: char,
    select_components: Vec<SelectComponent>,
}

impl Default for Grammar {
    fn default() -> Self {
        Self::new()
    }
}

impl Grammar {
    /// The base grammar: `?` placeholders, backtick quoting.
    pub fn new() -> Self {
        Self {
            dialect: Dialect::Generic,
            placeholder: "?".to_string(),
            quote: '`',
            select_components: SelectComponent::BASE.to_vec(),
        }
    }

    /// The grammar for `dialect` with its default settings.
    pub fn for_dialect(dialect: Dialect) -> Self {
        match dialect {
            Dialect::Generic => Self::new(),
            Dialect::MySql => Self::mysql(),
        }
    }

    /// Builds the grammar a configured connection should use.
    pub fn from_settings(settings: &ConnectionSettings) -> QuarryResult<Self> {
        let grammar = Self::for_dialect(Dialect::from_driver(&settings.driver)?);
        Ok(match &settings.placeholder {
            Some(symbol) => grammar.with_placeholder(symbol),
            None => grammar,
        })
    }

    /// Replaces the placeholder symbol, e.g. `$` or `%s`.
    #[must_use]
    pub fn with_placeholder(mut self, symbol: &str) -> Self {
        self.placeholder = symbol.to_string();
        self
    }

    /// Replaces the identifier quote character.
    #[must_use]
    pub const fn with_quote(mut self, quote: char) -> Self {
        self.quote = quote;
        self
    }

    /// Replaces the select pipeline.
    #[must_use]
    pub fn with_select_components(mut self, components: Vec<SelectComponent>) -> Self {
        self.select_components = components;
        self
    }

    /// The dialect this grammar renders.
    pub const fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// The placeholder symbol.
    pub fn placeholder(&self) -> &str {
        &self.placeholder
    }

    /// The identifier quote character.
    pub const fn quote(&self) -> char {
        self.quote
    }

    /// The select pipeline, in render order.
    pub fn select_components(&self) -> &[SelectComponent] {
        &self.select_components
    }

    // ── select ─────────────────────────────────────────────────────────

    /// Renders a select statement.
    ///
    /// Each step appends its fragment to the text rendered so far, except
    /// [`SelectComponent::Unions`], which receives that text and may wrap it.
    pub fn compile_select(&self, query: &Builder) -> String {
        self.select_components
            .iter()
            .fold(String::new(), |sql, component| {
                self.compile_component(query, *component, sql)
            })
    }

    fn compile_component(&self, query: &Builder, component: SelectComponent, sql: String) -> String {
        let fragment = match component {
            SelectComponent::Aggregate => self.compile_aggregate(query),
            SelectComponent::Columns => self.compile_columns(query),
            SelectComponent::From => self.compile_from(query),
            SelectComponent::Joins => self.compile_joins(&query.joins),
            SelectComponent::Wheres => self.compile_conditions("where", &query.wheres),
            SelectComponent::Groups => self.compile_groups(&query.groups),
            SelectComponent::Havings => self.compile_conditions("having", &query.havings),
            SelectComponent::Orders => self.compile_orders(&query.orders),
            SelectComponent::Limit => compile_limit(query.limit),
            SelectComponent::Offset => compile_offset(query.offset),
            SelectComponent::Unions => return self.compile_unions(query, sql),
            SelectComponent::Lock => self.compile_lock(query.lock),
        };
        concatenate([sql, fragment])
    }

    /// The binding categories whose placeholders `component` renders.
    fn component_bindings(
        &self,
        query: &Builder,
        component: SelectComponent,
    ) -> &'static [BindingKind] {
        match component {
            SelectComponent::Columns if query.aggregate.is_none() => &[BindingKind::Select],
            SelectComponent::From => &[BindingKind::From],
            SelectComponent::Joins => &[BindingKind::Join],
            SelectComponent::Wheres => &[BindingKind::Where],
            SelectComponent::Havings => &[BindingKind::Having],
            SelectComponent::Orders => &[BindingKind::Order],
            SelectComponent::Unions if self.renders_unions(query) => {
                &[BindingKind::Union, BindingKind::UnionOrder]
            }
            _ => &[],
        }
    }

    /// The union step. The base grammar has no union syntax and passes the
    /// select through untouched.
    fn compile_unions(&self, query: &Builder, sql: String) -> String {
        if self.renders_unions(query) {
            self.compile_union_select(query, &sql)
        } else {
            sql
        }
    }

    fn renders_unions(&self, query: &Builder) -> bool {
        self.dialect == Dialect::MySql && !query.unions.is_empty()
    }

    fn compile_aggregate(&self, query: &Builder) -> String {
        query.aggregate.as_ref().map_or_else(String::new, |aggregate| {
            format!(
                "select {}({}) as aggregate",
                aggregate.function,
                self.wrap(&aggregate.column)
            )
        })
    }

    fn compile_columns(&self, query: &Builder) -> String {
        if query.aggregate.is_some() {
            return String::new();
        }
        if query.columns.is_empty() {
            return "select *".to_string();
        }
        let columns: Vec<String> = query
            .columns
            .iter()
            .map(|column| match column {
                SelectColumn::Column(name) => self.wrap(name),
                SelectColumn::Raw(expression) => expression.clone(),
            })
            .collect();
        format!("select {}", columns.join(", "))
    }

    fn compile_from(&self, query: &Builder) -> String {
        query
            .table
            .as_ref()
            .map_or_else(String::new, |table| format!("from {}", self.wrap_table(table)))
    }

    /// Renders joins, each followed by its own nested joins and `on` list.
    fn compile_joins(&self, joins: &[Arc<JoinClause>]) -> String {
        joins
            .iter()
            .map(|join| {
                let mut sql = format!(
                    "{} join {}",
                    join.join_type().sql_keyword(),
                    join.table().map_or_else(String::new, |t| self.wrap_table(t))
                );
                let nested = self.compile_joins(join.joins());
                if !nested.is_empty() {
                    sql.push(' ');
                    sql.push_str(&nested);
                }
                let on = self.compile_conditions("on", join.wheres());
                if !on.is_empty() {
                    sql.push(' ');
                    sql.push_str(&on);
                }
                sql
            })
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Renders `prefix <predicates>`, or nothing for an empty list.
    fn compile_conditions(&self, prefix: &str, predicates: &[Predicate]) -> String {
        if predicates.is_empty() {
            return String::new();
        }
        format!(
            "{prefix} {}",
            remove_leading_boolean(&self.compile_predicates(predicates))
        )
    }

    /// Renders each predicate with its connective, space separated.
    fn compile_predicates(&self, predicates: &[Predicate]) -> String {
        predicates
            .iter()
            .map(|predicate| {
                format!(
                    "{} {}",
                    predicate.logic().as_str(),
                    self.compile_predicate(predicate)
                )
            })
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn compile_predicate(&self, predicate: &Predicate) -> String {
        match predicate {
            Predicate::Comparison {
                column, operator, ..
            } => format!("{} {operator} {}", self.wrap(column), self.placeholder),
            Predicate::ColumnComparison {
                first,
                operator,
                second,
                ..
            } => format!("{} {operator} {}", self.wrap(first), self.wrap(second)),
            Predicate::Null { column, .. } => {
                format!("{} {} null", self.wrap(column), predicate.operator())
            }
            Predicate::Raw { sql, .. } => sql.clone(),
            Predicate::In { column, values, .. } => format!(
                "{} {} ({})",
                self.wrap(column),
                predicate.operator(),
                self.parameterize(values.len(), ", ")
            ),
            Predicate::Between { column, .. } => format!(
                "{} {} {}",
                self.wrap(column),
                predicate.operator(),
                self.parameterize(2, " and ")
            ),
            Predicate::DatePart {
                column,
                operator,
                part,
                ..
            } => format!(
                "{}({}) {operator} {}",
                part.as_str(),
                self.wrap(column),
                self.placeholder
            ),
            Predicate::Nested { query, .. } => format!(
                "({})",
                remove_leading_boolean(&self.compile_predicates(&query.wheres))
            ),
            Predicate::Sub {
                column,
                operator,
                query,
                ..
            } => format!(
                "{} {operator} ({})",
                self.wrap(column),
                self.compile_select(query)
            ),
        }
    }

    fn compile_groups(&self, groups: &[String]) -> String {
        if groups.is_empty() {
            return String::new();
        }
        format!("group by {}", self.columnize(groups))
    }

    fn compile_orders(&self, orders: &[OrderNode]) -> String {
        if orders.is_empty() {
            return String::new();
        }
        let rendered: Vec<String> = orders
            .iter()
            .map(|order| match order {
                OrderNode::Column { column, direction } => {
                    format!("{} {}", self.wrap(column), direction.as_str())
                }
                OrderNode::Raw(sql) => sql.clone(),
            })
            .collect();
        format!("order by {}", rendered.join(", "))
    }

    fn compile_lock(&self, lock: Option<Lock>) -> String {
        match (self.dialect, lock) {
            (Dialect::MySql, Some(lock)) => mysql::compile_lock(lock).to_string(),
            _ => String::new(),
        }
    }

    // ── mutating statements ────────────────────────────────────────────

    /// Renders `insert into t(cols) values (?, ...), ...` for `rows` rows.
    pub fn compile_insert(&self, query: &Builder, columns: &[&str], rows: usize) -> String {
        let group = format!("({})", self.parameterize(columns.len(), ", "));
        format!(
            "insert into {}({}) values {}",
            self.table_of(query),
            self.columnize(columns),
            vec![group; rows].join(", ")
        )
    }

    /// Renders `update t [joins] set c = ?, ... [where]`, followed by
    /// `order by` / `limit` where the dialect allows it.
    ///
    /// `columns` must not be empty.
    pub fn compile_update(&self, query: &Builder, columns: &[&str]) -> String {
        let shape = self.update_shape();
        let assignments: Vec<String> = columns
            .iter()
            .map(|column| format!("{} = {}", self.wrap(column), self.placeholder))
            .collect();
        let mut parts = vec![format!("update {}", self.table_of(query))];
        if shape.joins {
            parts.push(self.compile_joins(&query.joins));
        }
        parts.push(format!("set {}", assignments.join(", ")));
        parts.push(self.compile_conditions("where", &query.wheres));
        if shape.order_and_limit {
            parts.extend(self.compile_order_and_limit(query));
        }
        concatenate(parts)
    }

    /// Renders `delete from t [where]`, with joins or a trailing
    /// `order by` / `limit` where the dialect allows them.
    pub fn compile_delete(&self, query: &Builder) -> String {
        let shape = self.delete_shape(query);
        let mut parts = vec![format!("delete from {}", self.table_of(query))];
        if shape.joins {
            parts.push(self.compile_joins(&query.joins));
        }
        parts.push(self.compile_conditions("where", &query.wheres));
        if shape.order_and_limit {
            parts.extend(self.compile_order_and_limit(query));
        }
        concatenate(parts)
    }

    fn update_shape(&self) -> MutationShape {
        MutationShape {
            joins: true,
            order_and_limit: self.dialect == Dialect::MySql,
        }
    }

    fn delete_shape(&self, query: &Builder) -> MutationShape {
        match self.dialect {
            Dialect::Generic => MutationShape::default(),
            Dialect::MySql => mysql::delete_shape(query),
        }
    }

    /// Renders `truncate table <t>`.
    pub fn compile_truncate(&self, query: &Builder) -> String {
        format!("truncate table {}", self.table_of(query))
    }

    /// Renders `SAVEPOINT name`.
    pub fn compile_savepoint(&self, name: &str) -> String {
        format!("SAVEPOINT {name}")
    }

    /// Renders `ROLLBACK TO SAVEPOINT name`.
    pub fn compile_savepoint_rollback(&self, name: &str) -> String {
        format!("ROLLBACK TO SAVEPOINT {name}")
    }

    // ── bindings ───────────────────────────────────────────────────────

    /// The bindings of [`compile_select`](Self::compile_select), in
    /// placeholder order. The categories follow the select pipeline, so a
    /// reordered or shortened pipeline still binds what it renders.
    pub fn prepare_bindings_for_select(&self, query: &Builder) -> Vec<Value> {
        let bindings = query.raw_bindings();
        self.select_components
            .iter()
            .flat_map(|component| self.component_bindings(query, *component))
            .flat_map(|kind| bindings.get(*kind).iter().cloned())
            .collect()
    }

    /// The bindings of [`compile_update`](Self::compile_update): the table,
    /// the joins, the assigned `values`, the where clause, then the trailing
    /// order when rendered.
    pub fn prepare_bindings_for_update(&self, query: &Builder, values: Vec<Value>) -> Vec<Value> {
        self.prepare_mutation_bindings(query, self.update_shape(), values)
    }

    /// The bindings of [`compile_delete`](Self::compile_delete), in
    /// placeholder order.
    pub fn prepare_bindings_for_delete(&self, query: &Builder) -> Vec<Value> {
        self.prepare_mutation_bindings(query, self.delete_shape(query), Vec::new())
    }

    fn prepare_mutation_bindings(
        &self,
        query: &Builder,
        shape: MutationShape,
        values: Vec<Value>,
    ) -> Vec<Value> {
        let bindings = query.raw_bindings();
        let mut prepared = bindings.get(BindingKind::From).to_vec();
        if shape.joins {
            prepared.extend_from_slice(bindings.get(BindingKind::Join));
        }
        prepared.extend(values);
        prepared.extend_from_slice(bindings.get(BindingKind::Where));
        if shape.order_and_limit {
            prepared.extend_from_slice(bindings.get(BindingKind::Order));
        }
        prepared
    }

    // ── identifiers ────────────────────────────────────────────────────

    /// Quotes an identifier. Dotted names are quoted per segment; `*` is
    /// left alone.
    pub fn wrap(&self, identifier: &str) -> String {
        identifier
            .split('.')
            .map(|segment| {
                if segment == "*" {
                    segment.to_string()
                } else {
                    format!("{q}{segment}{q}", q = self.quote)
                }
            })
            .collect::<Vec<_>>()
            .join(".")
    }

    /// Quotes a named table; raw tables are emitted verbatim.
    pub fn wrap_table(&self, table: &TableRef) -> String {
        match table {
            TableRef::Table(name) => self.wrap(name),
            TableRef::Raw(expression) => expression.clone(),
        }
    }

    /// Wraps and comma-joins a column list.
    pub fn columnize<S: AsRef<str>>(&self, columns: &[S]) -> String {
        columns
            .iter()
            .map(|column| self.wrap(column.as_ref()))
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// `count` placeholders joined by `separator`.
    pub fn parameterize(&self, count: usize, separator: &str) -> String {
        vec![self.placeholder.as_str(); count].join(separator)
    }

    fn table_of(&self, query: &Builder) -> String {
        query
            .table
            .as_ref()
            .map_or_else(String::new, |table| self.wrap_table(table))
    }

    fn compile_order_and_limit(&self, query: &Builder) -> [String; 2] {
        [self.compile_orders(&query.orders), compile_limit(query.limit)]
    }
}

fn compile_limit(limit: Option<u64>) -> String {
    match limit {
        Some(limit) if limit > 0 => format!("limit {limit}"),
        _ => String::new(),
    }
}

fn compile_offset(offset: Option<u64>) -> String {
    match offset {
        Some(offset) if offset > 0 => format!("offset {offset}"),
        _ => String::new(),
    }
}

/// Joins the non-empty fragments with single spaces.
fn concatenate(fragments: impl IntoIterator<Item = String>) -> String {
    fragments
        .into_iter()
        .filter(|fragment| !fragment.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Strips the connective of the first rendered predicate.
///
/// This is a plain prefix test: anything starting with `and` loses four
/// characters and anything starting with `or` loses three.
pub fn remove_leading_boolean(sql: &str) -> &str {
    if sql.starts_with("and") {
        sql.get(4..).unwrap_or("")
    } else if sql.starts_with("or") {
        sql.get(3..).unwrap_or("")
    } else {
        sql
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    fn generic() -> Builder {
        Builder::new(Arc::new(Grammar::new()))
    }

    fn table(name: &str) -> Builder {
        let mut q = generic();
        q.from(name);
        q
    }

    fn assert_placeholders_match(q: &Builder) {
        assert_eq!(
            q.to_sql().matches('?').count(),
            q.get_bindings().len(),
            "placeholder mismatch in {}",
            q.to_sql()
        );
    }

    // ── dialects and configuration ──

    #[test]
    fn test_dialect_from_driver() {
        assert_eq!(Dialect::from_driver("mysql").unwrap(), Dialect::MySql);
        assert_eq!(Dialect::from_driver("MariaDB").unwrap(), Dialect::MySql);
        assert_eq!(Dialect::from_driver("sqlite").unwrap(), Dialect::Generic);
        assert_eq!("generic".parse::<Dialect>().unwrap(), Dialect::Generic);
        assert!(matches!(
            Dialect::from_driver("oracle"),
            Err(QuarryError::ConfigurationError(_))
        ));
        assert_eq!(Dialect::MySql.to_string(), "mysql");
    }

    #[test]
    fn test_from_settings_applies_placeholder() {
        let settings = ConnectionSettings {
            driver: "sqlite".into(),
            placeholder: Some("$".into()),
            ..ConnectionSettings::default()
        };
        let grammar = Grammar::from_settings(&settings).unwrap();
        assert_eq!(grammar.dialect(), Dialect::Generic);
        assert_eq!(grammar.placeholder(), "$");

        let grammar = Grammar::from_settings(&ConnectionSettings::default()).unwrap();
        assert_eq!(grammar, Grammar::mysql());
    }

    #[test]
    fn test_custom_quote_and_placeholder() {
        let grammar = Grammar::new().with_quote('"').with_placeholder("%s");
        let mut q = Builder::new(Arc::new(grammar));
        q.from("users").where_eq("users.id", 1).unwrap();
        assert_eq!(q.to_sql(), r#"select * from "users" where "users"."id" = %s"#);
    }

    #[test]
    fn test_custom_select_components() {
        let grammar = Grammar::new().with_select_components(vec![
            SelectComponent::Columns,
            SelectComponent::From,
            SelectComponent::Limit,
        ]);
        let mut q = Builder::new(Arc::new(grammar));
        q.from("users").where_eq("id", 1).unwrap().limit(3);
        assert_eq!(q.to_sql(), "select * from `users` limit 3");
        // no where step, so nothing is bound for it
        assert!(q.get_bindings().is_empty());
    }

    // ── identifiers ──

    #[test]
    fn test_wrap() {
        let g = Grammar::new();
        assert_eq!(g.wrap("id"), "`id`");
        assert_eq!(g.wrap("users.id"), "`users`.`id`");
        assert_eq!(g.wrap("*"), "*");
        assert_eq!(g.wrap("users.*"), "`users`.*");
        assert_eq!(g.wrap_table(&TableRef::Raw("users as u".into())), "users as u");
        assert_eq!(g.columnize(&["a", "b.c"]), "`a`, `b`.`c`");
        assert_eq!(g.parameterize(3, ", "), "?, ?, ?");
        assert_eq!(g.parameterize(0, ", "), "");
    }

    #[test]
    fn test_remove_leading_boolean_is_a_prefix_strip() {
        assert_eq!(remove_leading_boolean("and `a` = ?"), "`a` = ?");
        assert_eq!(remove_leading_boolean("or `a` = ?"), "`a` = ?");
        assert_eq!(remove_leading_boolean("`a` = ?"), "`a` = ?");
        // mis-trims words that merely start with the connective
        assert_eq!(remove_leading_boolean("android = 1"), "oid = 1");
        assert_eq!(remove_leading_boolean("and"), "");
    }

    // ── select pipeline ──

    #[test]
    fn test_select_star_by_default() {
        assert_eq!(table("users").to_sql(), "select * from `users`");
    }

    #[test]
    fn test_or_where() {
        let mut q = table("users");
        q.where_eq("id", 1).unwrap().or_where_eq("id", 2).unwrap();
        assert_eq!(q.to_sql(), "select * from `users` where `id` = ? or `id` = ?");
        assert_eq!(q.get_bindings(), vec![Value::Int(1), Value::Int(2)]);
    }

    #[test]
    fn test_first_predicate_drops_or_connective() {
        let mut q = table("users");
        q.or_where_eq("id", 1).unwrap().where_eq("active", true).unwrap();
        assert_eq!(
            q.to_sql(),
            "select * from `users` where `id` = ? and `active` = ?"
        );
    }

    #[test]
    fn test_where_in() {
        let mut q = table("users");
        q.where_in("id", [1, 2, 3]).unwrap();
        assert_eq!(q.to_sql(), "select * from `users` where `id` in (?, ?, ?)");
        assert_eq!(
            q.get_bindings(),
            vec![Value::Int(1), Value::Int(2), Value::Int(3)]
        );

        let mut q = table("users");
        q.where_not_in("id", Vec::<i64>::new()).unwrap();
        assert_eq!(q.to_sql(), "select * from `users` where `id` not in ()");
        assert_placeholders_match(&q);
    }

    #[test]
    fn test_nested_where() {
        let mut q = table("a");
        q.where_eq("x", 1)
            .unwrap()
            .where_nested(|inner| {
                inner.where_eq("y", 2)?.or_where_eq("z", 3)?;
                Ok(())
            })
            .unwrap();
        assert_eq!(
            q.to_sql(),
            "select * from `a` where `x` = ? and (`y` = ? or `z` = ?)"
        );
        assert_eq!(
            q.get_bindings(),
            vec![Value::Int(1), Value::Int(2), Value::Int(3)]
        );
    }

    #[test]
    fn test_predicate_variants_render() {
        let mut q = table("events");
        q.where_between("id", 1, 10)
            .unwrap()
            .or_where_not_between("id", 20, 30)
            .unwrap()
            .where_column("starts_at", "<", "ends_at")
            .where_null("cancelled_at")
            .or_where_not_null("confirmed_at")
            .where_raw("price > ? * 2", vec![Value::Int(5)])
            .where_date("starts_at", ">=", "2024-01-01")
            .unwrap()
            .where_year("starts_at", "=", "2024")
            .unwrap();
        assert_eq!(
            q.to_sql(),
            "select * from `events` where `id` between ? and ? \
             or `id` not between ? and ? \
             and `starts_at` < `ends_at` \
             and `cancelled_at` is null \
             or `confirmed_at` is not null \
             and price > ? * 2 \
             and date(`starts_at`) >= ? \
             and year(`starts_at`) = ?"
        );
        assert_placeholders_match(&q);
    }

    #[test]
    fn test_correlated_sub_renders_its_connective() {
        let mut q = table("users");
        q.where_eq("active", true)
            .unwrap()
            .or_where_sub("id", "=", |sub| {
                sub.select(&["user_id"])
                    .from("orders")
                    .where_("total", ">", 100)?;
                Ok(())
            })
            .unwrap();
        assert_eq!(
            q.to_sql(),
            "select * from `users` where `active` = ? or `id` = \
             (select `user_id` from `orders` where `total` > ?)"
        );
        assert_eq!(q.get_bindings(), vec![Value::Bool(true), Value::Int(100)]);
    }

    #[test]
    fn test_select_sub_and_from_sub() {
        let mut latest = generic();
        latest.select_raw("max(created_at)", vec![]).from("posts").where_eq("draft", false).unwrap();

        let mut q = generic();
        q.select(&["u.name"])
            .select_sub(latest, "latest")
            .unwrap()
            .from_sub_with("u", |sub| {
                sub.from("users").where_eq("active", true)?;
                Ok(())
            })
            .unwrap();
        assert_eq!(
            q.to_sql(),
            "select `u`.`name`, (select max(created_at) from `posts` where `draft` = ?) as `latest` \
             from (select * from `users` where `active` = ?) as `u`"
        );
        assert_eq!(q.get_bindings(), vec![Value::Bool(false), Value::Bool(true)]);
    }

    #[test]
    fn test_joins() {
        let mut q = table("users");
        q.join("posts", "users.id", "=", "posts.user_id")
            .left_join_where("profiles", "profiles.public", "=", true)
            .unwrap()
            .cross_join("tags")
            .cross_join_on("roles", "roles.id", "=", "users.role_id")
            .right_join_with("teams", |join| {
                join.on("teams.id", "=", "users.team_id")
                    .or_on("teams.owner_id", "=", "users.id");
                Ok(())
            })
            .unwrap();
        assert_eq!(
            q.to_sql(),
            "select * from `users` \
             inner join `posts` on `users`.`id` = `posts`.`user_id` \
             left join `profiles` on `profiles`.`public` = ? \
             cross join `tags` \
             cross join `roles` on `roles`.`id` = `users`.`role_id` \
             right join `teams` on `teams`.`id` = `users`.`team_id` or `teams`.`owner_id` = `users`.`id`"
        );
        assert_eq!(q.get_bindings(), vec![Value::Bool(true)]);
    }

    #[test]
    fn test_nested_joins_render_inside_their_join() {
        let mut q = table("users");
        q.left_join_with("posts", |join| {
            join.join_where("comments", "comments.flagged", "=", true)?;
            join.on("posts.user_id", "=", "users.id")
                .where_eq("posts.draft", false)?;
            Ok(())
        })
        .unwrap()
        .where_eq("users.active", true)
        .unwrap();
        assert_eq!(
            q.to_sql(),
            "select * from `users` left join `posts` \
             inner join `comments` on `comments`.`flagged` = ? \
             on `posts`.`user_id` = `users`.`id` and `posts`.`draft` = ? \
             where `users`.`active` = ?"
        );
        assert_eq!(
            q.get_bindings(),
            vec![Value::Bool(true), Value::Bool(false), Value::Bool(true)]
        );
    }

    #[test]
    fn test_join_sub() {
        let mut totals = generic();
        totals
            .select(&["user_id"])
            .select_raw("sum(amount) as total", vec![])
            .from("orders")
            .where_eq("paid", true)
            .unwrap()
            .group_by(&["user_id"]);

        let mut q = table("users");
        q.join_sub(totals, "t", "t.user_id", "=", "users.id")
            .unwrap()
            .where_("t.total", ">", 50)
            .unwrap();
        assert_eq!(
            q.to_sql(),
            "select * from `users` inner join (select `user_id`, sum(amount) as total from `orders` \
             where `paid` = ? group by `user_id`) as `t` on `t`.`user_id` = `users`.`id` \
             where `t`.`total` > ?"
        );
        assert_eq!(q.get_bindings(), vec![Value::Bool(true), Value::Int(50)]);
    }

    #[test]
    fn test_group_having_order_limit_offset() {
        let mut q = table("orders");
        q.select(&["user_id"])
            .select_raw("count(*) as n", vec![])
            .group_by(&["user_id", "status"])
            .having("n", ">", 2)
            .unwrap()
            .or_having_raw("sum(total) > ?", vec![Value::Int(500)])
            .order_by("user_id", "ASC")
            .order_by_desc("n")
            .order_by_raw("field(status, ?, ?)", vec![Value::from("a"), Value::from("b")])
            .limit(10)
            .offset(20);
        assert_eq!(
            q.to_sql(),
            "select `user_id`, count(*) as n from `orders` group by `user_id`, `status` \
             having `n` > ? or sum(total) > ? \
             order by `user_id` asc, `n` desc, field(status, ?, ?) limit 10 offset 20"
        );
        assert_eq!(
            q.get_bindings(),
            vec![Value::Int(2), Value::Int(500), Value::from("a"), Value::from("b")]
        );
    }

    #[test]
    fn test_zero_limit_and_offset_render_nothing() {
        let mut q = table("users");
        q.limit(0).offset(0);
        assert_eq!(q.to_sql(), "select * from `users`");
    }

    #[test]
    fn test_generic_grammar_ignores_unions_and_locks() {
        let mut other = table("admins");
        other.where_eq("root", true).unwrap();
        let mut q = table("users");
        q.union(other).unwrap().lock_for_update();
        assert_eq!(q.to_sql(), "select * from `users`");
        assert!(q.get_bindings().is_empty());
    }

    #[test]
    fn test_aggregate_replaces_columns() {
        let mut q = table("users");
        q.select(&["name"]);
        let sum = q.aggregate_query("sum", "users.credits");
        assert_eq!(
            sum.to_sql(),
            "select sum(`users`.`credits`) as aggregate from `users`"
        );
    }

    // ── mutating statements ──

    #[test]
    fn test_insert_sql() {
        let q = table("users");
        let (sql, bindings) = q
            .to_insert_sql(&[
                vec![("name", Value::from("a")), ("age", Value::Int(1))],
                vec![("name", Value::from("b")), ("age", Value::Int(2))],
            ])
            .unwrap();
        assert_eq!(sql, "insert into `users`(`name`, `age`) values (?, ?), (?, ?)");
        assert_eq!(bindings.len(), 4);
        assert!(q.to_insert_sql(&[]).is_none());
    }

    #[test]
    fn test_update_binding_order() {
        let mut q = table("users");
        q.join_where("teams", "teams.active", "=", true)
            .unwrap()
            .where_eq("users.id", 9)
            .unwrap()
            .order_by("id", "asc")
            .limit(1);
        let (sql, bindings) = q
            .to_update_sql(&[("users.name", Value::from("x")), ("users.age", Value::Int(3))])
            .unwrap();
        // the base grammar renders no ORDER BY / LIMIT on update
        assert_eq!(
            sql,
            "update `users` inner join `teams` on `teams`.`active` = ? \
             set `users`.`name` = ?, `users`.`age` = ? where `users`.`id` = ?"
        );
        assert_eq!(
            bindings,
            vec![Value::Bool(true), Value::from("x"), Value::Int(3), Value::Int(9)]
        );
    }

    #[test]
    fn test_delete_sql() {
        let mut q = table("users");
        q.where_eq("id", 1).unwrap();
        let (sql, bindings) = q.to_delete_sql();
        assert_eq!(sql, "delete from `users` where `id` = ?");
        assert_eq!(bindings, vec![Value::Int(1)]);

        let (sql, bindings) = table("users").to_delete_sql();
        assert_eq!(sql, "delete from `users`");
        assert!(bindings.is_empty());
    }

    fn assert_mutation_placeholders_match((sql, bindings): &(String, Vec<Value>)) {
        assert_eq!(sql.matches('?').count(), bindings.len(), "placeholder mismatch in {sql}");
    }

    #[test]
    fn test_mutations_bind_only_rendered_clauses() {
        let mut q = table("t");
        q.where_eq("id", 1)
            .unwrap()
            .order_by_raw("field(id, ?)", vec![Value::Int(9)])
            .having_raw("count(*) > ?", vec![Value::Int(2)]);

        let delete = q.to_delete_sql();
        assert_eq!(delete.0, "delete from `t` where `id` = ?");
        assert_eq!(delete.1, vec![Value::Int(1)]);

        let update = q.to_update_sql(&[("a", Value::Int(5))]).unwrap();
        assert_eq!(update.0, "update `t` set `a` = ? where `id` = ?");
        assert_eq!(update.1, vec![Value::Int(5), Value::Int(1)]);
    }

    #[test]
    fn test_mutation_placeholders_match_bindings() {
        let mut plain = table("t");
        plain.where_in("id", [1, 2]).unwrap();

        let mut joined = table("t");
        joined
            .join_where("u", "u.k", "=", 3)
            .unwrap()
            .where_eq("id", 1)
            .unwrap()
            .order_by_raw("field(id, ?)", vec![Value::Int(9)]);

        let mut raw = Builder::new(Arc::new(Grammar::new()));
        raw.from_raw("t indexed by (?)", vec![Value::from("ix")])
            .join_where("u", "u.k", "=", 3)
            .unwrap()
            .where_between("n", 1, 5)
            .unwrap();

        for q in [&plain, &joined, &raw] {
            assert_mutation_placeholders_match(&q.to_delete_sql());
            assert_mutation_placeholders_match(
                &q.to_update_sql(&[("a", Value::Int(5)), ("b", Value::Null)]).unwrap(),
            );
        }

        let (_, bindings) = raw.to_update_sql(&[("a", Value::Int(5))]).unwrap();
        assert_eq!(
            bindings,
            vec![
                Value::from("ix"),
                Value::Int(3),
                Value::Int(5),
                Value::Int(1),
                Value::Int(5)
            ]
        );
    }

    #[test]
    fn test_truncate_and_savepoints() {
        let g = Grammar::new();
        assert_eq!(table("logs").to_truncate_sql(), "truncate table `logs`");
        assert_eq!(g.compile_savepoint("trans2"), "SAVEPOINT trans2");
        assert_eq!(
            g.compile_savepoint_rollback("trans2"),
            "ROLLBACK TO SAVEPOINT trans2"
        );
    }

    #[test]
    fn test_placeholders_always_match_bindings() {
        let mut q = table("t");
        q.select_raw("coalesce(a, ?) as a", vec![Value::Int(0)])
            .join_where("u", "u.k", "=", "v")
            .unwrap()
            .where_in("id", [1, 2])
            .unwrap()
            .where_nested(|inner| {
                inner
                    .where_between("x", 1, 2)?
                    .or_where_month("created", "=", "03")?
                    .where_in_sub("y", |sub| {
                        sub.select(&["y"]).from("z").where_eq("w", 4)?;
                        Ok(())
                    })?;
                Ok(())
            })
            .unwrap()
            .having_raw("count(*) > ?", vec![Value::Int(1)]);
        assert_placeholders_match(&q);
        assert_eq!(q.get_bindings().len(), 9);
    }
}
