//! The per-clause binding registry.
//!
//! Values are recorded under the clause that renders their placeholders.
//! Flattening walks the categories in [`BindingKind::ALL`] order, which is the
//! order those clauses appear in a rendered select.

use crate::value::Value;

/// The clause a bound value belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum BindingKind {
    /// Raw select expressions and select sub-queries.
    Select,
    /// Raw tables and from sub-queries.
    From,
    /// Join conditions and join sub-queries.
    Join,
    /// WHERE predicates.
    Where,
    /// HAVING predicates.
    Having,
    /// Raw order expressions.
    Order,
    /// Union member queries.
    Union,
    /// Raw order bindings added after the first union.
    UnionOrder,
}

impl BindingKind {
    /// Every category, in render order.
    pub const ALL: [Self; 8] = [
        Self::Select,
        Self::From,
        Self::Join,
        Self::Where,
        Self::Having,
        Self::Order,
        Self::Union,
        Self::UnionOrder,
    ];

    const fn slot(self) -> usize {
        self as usize
    }
}

/// Bound values grouped by clause, each group in append order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Bindings {
    slots: [Vec<Value>; 8],
}

impl Bindings {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends one value to a category.
    pub fn push(&mut self, kind: BindingKind, value: Value) {
        self.slots[kind.slot()].push(value);
    }

    /// Appends several values to a category, keeping their order.
    pub fn extend(&mut self, kind: BindingKind, values: impl IntoIterator<Item = Value>) {
        self.slots[kind.slot()].extend(values);
    }

    /// The values recorded for one category.
    pub fn get(&self, kind: BindingKind) -> &[Value] {
        &self.slots[kind.slot()]
    }

    /// Drops every value recorded for one category.
    pub fn clear(&mut self, kind: BindingKind) {
        self.slots[kind.slot()].clear();
    }

    /// All values, category by category.
    pub fn flatten(&self) -> Vec<Value> {
        self.flatten_except(&[])
    }

    /// All values except those in the `except` categories.
    pub fn flatten_except(&self, except: &[BindingKind]) -> Vec<Value> {
        BindingKind::ALL
            .iter()
            .filter(|kind| !except.contains(kind))
            .flat_map(|kind| self.get(*kind).iter().cloned())
            .collect()
    }

    /// Total number of recorded values.
    pub fn len(&self) -> usize {
        self.slots.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.iter().all(Vec::is_empty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flatten_uses_category_order() {
        let mut bindings = Bindings::new();
        bindings.push(BindingKind::Order, Value::Int(6));
        bindings.push(BindingKind::Where, Value::Int(4));
        bindings.push(BindingKind::Select, Value::Int(1));
        bindings.extend(BindingKind::Join, [Value::Int(2), Value::Int(3)]);
        bindings.push(BindingKind::Having, Value::Int(5));

        let flat: Vec<i64> = bindings
            .flatten()
            .iter()
            .filter_map(Value::as_int)
            .collect();
        assert_eq!(flat, vec![1, 2, 3, 4, 5, 6]);
        assert_eq!(bindings.len(), 6);
    }

    #[test]
    fn test_flatten_except() {
        let mut bindings = Bindings::new();
        bindings.push(BindingKind::Select, Value::from("s"));
        bindings.push(BindingKind::Join, Value::from("j"));
        bindings.push(BindingKind::Where, Value::from("w"));

        let rest = bindings.flatten_except(&[BindingKind::Select, BindingKind::Join]);
        assert_eq!(rest, vec![Value::from("w")]);
    }

    #[test]
    fn test_clear_and_empty() {
        let mut bindings = Bindings::new();
        assert!(bindings.is_empty());
        bindings.push(BindingKind::Select, Value::Null);
        assert!(!bindings.is_empty());
        bindings.clear(BindingKind::Select);
        assert!(bindings.is_empty());
        assert!(bindings.get(BindingKind::Union).is_empty());
    }
}
