//! Syntax tree for statements and update expressions.

use std::fmt;

use dynorm_model::AttributeValue;

/// A parsed `SELECT` statement.
#[derive(Debug, Clone)]
pub struct SelectStatement {
    /// Attributes to return.
    pub projection: Projection,
    /// Target table name.
    pub table: String,
    /// Optional `WHERE` condition.
    pub condition: Option<Condition>,
}

/// The select list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Projection {
    /// `*`
    All,
    /// An explicit attribute list.
    Attributes(Vec<String>),
}

/// A boolean condition over one item.
#[derive(Debug, Clone)]
pub enum Condition {
    /// `left op right`
    Compare {
        /// Left-hand operand.
        left: Operand,
        /// Comparison operator.
        op: CompareOp,
        /// Right-hand operand.
        right: Operand,
    },
    /// `left AND right` or `left OR right`.
    Logical {
        /// Logical operator.
        op: LogicalOp,
        /// Left-hand condition.
        left: Box<Condition>,
        /// Right-hand condition.
        right: Box<Condition>,
    },
    /// `NOT condition`
    Not(Box<Condition>),
}

/// Comparison operand.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    /// A top-level attribute of the item.
    Attribute(String),
    /// A literal written in the statement.
    Literal(AttributeValue),
    /// The n-th `?` placeholder.
    Parameter(usize),
}

/// Comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    /// `=`
    Eq,
    /// `<>` or `!=`
    Ne,
    /// `<`
    Lt,
    /// `<=`
    Le,
    /// `>`
    Gt,
    /// `>=`
    Ge,
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Eq => "=",
            Self::Ne => "<>",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
        })
    }
}

/// Logical operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
    /// `AND`
    And,
    /// `OR`
    Or,
}

/// Attribute reference inside an update expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttributeRef {
    /// A bare attribute name.
    Name(String),
    /// A `#placeholder` resolved through `ExpressionAttributeNames`.
    Placeholder(String),
}

/// One clause of an update expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateAction {
    /// `SET attr = :value`
    Set {
        /// Target attribute.
        attribute: AttributeRef,
        /// `:value` placeholder name, without the colon.
        value: String,
    },
    /// `REMOVE attr`
    Remove {
        /// Target attribute.
        attribute: AttributeRef,
    },
}
