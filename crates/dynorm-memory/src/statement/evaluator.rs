//! Evaluates parsed conditions and update actions against an item.

use std::cmp::Ordering;
use std::collections::HashMap;

use dynorm_model::AttributeValue;

use super::ast::{AttributeRef, CompareOp, Condition, LogicalOp, Operand, Projection, UpdateAction};
use super::parser::StatementError;
use crate::storage::compare_numbers;

/// An item together with the values bound to its statement.
#[derive(Debug)]
pub struct EvalContext<'a> {
    /// The item being evaluated.
    pub item: &'a HashMap<String, AttributeValue>,
    /// `?` parameters, in order.
    pub parameters: &'a [AttributeValue],
}

impl EvalContext<'_> {
    /// Evaluate a condition.
    ///
    /// A comparison that references a missing attribute is false, as are
    /// ordering comparisons between values of different types.
    pub fn evaluate(&self, condition: &Condition) -> Result<bool, StatementError> {
        match condition {
            Condition::Compare { left, op, right } => {
                let (Some(l), Some(r)) = (self.resolve(left)?, self.resolve(right)?) else {
                    return Ok(false);
                };
                Ok(compare_values(l, *op, r))
            }
            Condition::Logical { op, left, right } => match op {
                LogicalOp::And => Ok(self.evaluate(left)? && self.evaluate(right)?),
                LogicalOp::Or => Ok(self.evaluate(left)? || self.evaluate(right)?),
            },
            Condition::Not(inner) => self.evaluate(inner).map(|v| !v),
        }
    }

    fn resolve<'o>(
        &'o self,
        operand: &'o Operand,
    ) -> Result<Option<&'o AttributeValue>, StatementError> {
        match operand {
            Operand::Attribute(name) => Ok(self.item.get(name)),
            Operand::Literal(value) => Ok(Some(value)),
            Operand::Parameter(index) => self
                .parameters
                .get(*index)
                .map(Some)
                .ok_or(StatementError::MissingParameter),
        }
    }

    /// Copy the projected attributes of the item.
    #[must_use]
    pub fn project(&self, projection: &Projection) -> HashMap<String, AttributeValue> {
        match projection {
            Projection::All => self.item.clone(),
            Projection::Attributes(names) => names
                .iter()
                .filter_map(|name| self.item.get(name).map(|v| (name.clone(), v.clone())))
                .collect(),
        }
    }
}

fn compare_values(left: &AttributeValue, op: CompareOp, right: &AttributeValue) -> bool {
    let ordering = match (left, right) {
        (AttributeValue::S(a), AttributeValue::S(b)) => Some(a.as_bytes().cmp(b.as_bytes())),
        (AttributeValue::N(a), AttributeValue::N(b)) => Some(compare_numbers(a, b)),
        (AttributeValue::B(a), AttributeValue::B(b)) => Some(a.as_ref().cmp(b.as_ref())),
        _ => None,
    };

    match (op, ordering) {
        (CompareOp::Eq, Some(o)) => o == Ordering::Equal,
        (CompareOp::Ne, Some(o)) => o != Ordering::Equal,
        (CompareOp::Eq, None) => left == right,
        (CompareOp::Ne, None) => left != right,
        (CompareOp::Lt, Some(o)) => o == Ordering::Less,
        (CompareOp::Le, Some(o)) => o != Ordering::Greater,
        (CompareOp::Gt, Some(o)) => o == Ordering::Greater,
        (CompareOp::Ge, Some(o)) => o != Ordering::Less,
        (_, None) => false,
    }
}

/// Apply update actions to an item in place.
#[allow(clippy::implicit_hasher)]
pub fn apply_update(
    item: &mut HashMap<String, AttributeValue>,
    actions: &[UpdateAction],
    names: &HashMap<String, String>,
    values: &HashMap<String, AttributeValue>,
) -> Result<(), StatementError> {
    for action in actions {
        match action {
            UpdateAction::Set { attribute, value } => {
                let name = resolve_name(attribute, names)?;
                let value = values
                    .get(&format!(":{value}"))
                    .ok_or_else(|| StatementError::UnresolvedValue(value.clone()))?;
                item.insert(name.to_owned(), value.clone());
            }
            UpdateAction::Remove { attribute } => {
                let name = resolve_name(attribute, names)?;
                item.remove(name);
            }
        }
    }
    Ok(())
}

fn resolve_name<'a>(
    attribute: &'a AttributeRef,
    names: &'a HashMap<String, String>,
) -> Result<&'a str, StatementError> {
    match attribute {
        AttributeRef::Name(name) => Ok(name),
        AttributeRef::Placeholder(placeholder) => names
            .get(&format!("#{placeholder}"))
            .map(String::as_str)
            .ok_or_else(|| StatementError::UnresolvedName(placeholder.clone())),
    }
}
