//! MySQL rendering.
//!
//! MySQL renders unions by parenthesising each select, so its union step runs
//! last and wraps the finished base select. UPDATE and DELETE also accept
//! trailing `order by` / `limit` clauses.

use std::fmt::Write;

use super::{
    compile_limit, compile_offset, concatenate, Dialect, Grammar, MutationShape, SelectComponent,
};
use crate::query::builder::Builder;
use crate::query::types::Lock;

impl Grammar {
    /// The MySQL grammar: `?` placeholders, backtick quoting, and the union
    /// step moved to the end of the select pipeline.
    pub fn mysql() -> Self {
        let mut components: Vec<SelectComponent> = SelectComponent::BASE
            .into_iter()
            .filter(|component| *component != SelectComponent::Unions)
            .collect();
        components.push(SelectComponent::Unions);
        Self {
            dialect: Dialect::MySql,
            placeholder: "?".to_string(),
            quote: '`',
            select_components: components,
        }
    }

    /// Renders `(<base>) union [all] (<member>) ...` followed by the
    /// union-level order, limit and offset.
    pub(super) fn compile_union_select(&self, query: &Builder, base: &str) -> String {
        let mut sql = format!("({base})");
        for union in &query.unions {
            let keyword = if union.all { "union all" } else { "union" };
            // Writing to a String cannot fail.
            let _ = write!(sql, " {keyword} ({})", self.compile_select(&union.query));
        }
        let trailing = concatenate([
            self.compile_orders(&query.union_orders),
            compile_limit(query.union_limit),
            compile_offset(query.union_offset),
        ]);
        if !trailing.is_empty() {
            sql.push(' ');
            sql.push_str(&trailing);
        }
        sql
    }
}

/// With joins: `delete from t <joins> [where]`. Without: `delete from t
/// [where] [order by] [limit]`.
pub(super) fn delete_shape(query: &Builder) -> MutationShape {
    let joined = !query.joins.is_empty();
    MutationShape {
        joins: joined,
        order_and_limit: !joined,
    }
}

pub(super) const fn compile_lock(lock: Lock) -> &'static str {
    match lock {
        Lock::ForUpdate => "for update",
        Lock::Shared => "lock in share mode",
    }
}
