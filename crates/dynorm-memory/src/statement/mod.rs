//! PartiQL statements and update expressions understood by the memory store.
//!
//! Only the dialect the mapping layer emits is supported:
//!
//! - `SELECT <* | a, b> FROM <table | "table"> [WHERE <condition>]` where a
//!   condition combines `attr <op> literal` comparisons with `AND`, `OR`,
//!   `NOT` and parentheses (`AND` binds tighter than `OR`);
//! - update expressions made of `SET #a = :a, ...` and `REMOVE #b, ...`.

pub mod ast;
pub mod evaluator;
pub mod parser;

pub use ast::{
    AttributeRef, CompareOp, Condition, LogicalOp, Operand, Projection, SelectStatement,
    UpdateAction,
};
pub use evaluator::{EvalContext, apply_update};
pub use parser::{StatementError, parse_select, parse_update};
