//! Query construction.
//!
//! - [`builder`] - the fluent [`Builder`]
//! - [`join`] - the join sub-builder
//! - [`types`] - predicate and clause node types
//! - [`bindings`] - the per-clause binding registry

pub mod bindings;
pub mod builder;
pub mod join;
pub mod types;

pub use bindings::{BindingKind, Bindings};
pub use builder::{Builder, SubQuery};
pub use join::{JoinClause, JoinType};
pub use types::{
    Aggregate, DatePart, Direction, Lock, Logic, OrderNode, Predicate, SelectColumn, TableRef,
    Union,
};
