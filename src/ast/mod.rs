//! Immutable query-expression model.
//!
//! Nodes are shared as [`ExprRef`] (`Arc<Expr>`) so rewriters can return the
//! original allocation when nothing changed.

pub mod assignments;
pub mod builders;
pub mod expr;
pub mod operators;
pub mod query;
pub mod types;
pub mod values;

pub use assignments::*;
pub use expr::*;
pub use operators::*;
pub use query::*;
pub use types::*;
pub use values::*;
