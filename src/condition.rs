//! Value-comparison predicates attached to fields.

use crate::error::Error;
use crate::selector::ResolveCtx;
use crate::value::{render_tuple, Value};

/// A predicate over a field's generated value.
///
/// A field carries at most one merged condition. Repeated not-equals
/// constraints fold into a not-in-set; every other combination of kinds on the
/// same field is an inconsistency error.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// The value equals the operand.
    Eq(Value),
    /// The value differs from the operand.
    Neq(Value),
    /// The value is below the operand; `strict` excludes equality.
    Lt {
        /// Upper endpoint.
        value: Value,
        /// Whether the endpoint itself is excluded.
        strict: bool,
    },
    /// The value is above the operand; `strict` excludes equality.
    Gt {
        /// Lower endpoint.
        value: Value,
        /// Whether the endpoint itself is excluded.
        strict: bool,
    },
    /// The value is one of the operands.
    In(Vec<Value>),
    /// The value is none of the operands.
    NotIn(Vec<Value>),
}

impl Condition {
    /// Merges a later constraint into this one.
    ///
    /// Only the not-equals family is closed under merge; any other pairing
    /// cannot hold on a single field and is reported against `field`.
    pub fn merge(self, other: Condition, field: &str) -> Result<Condition, Error> {
        match (self, other) {
            (Condition::Neq(a), Condition::Neq(b)) => Ok(Condition::NotIn(vec![a, b])),
            (Condition::NotIn(mut values), Condition::Neq(b)) => {
                values.push(b);
                Ok(Condition::NotIn(values))
            }
            (Condition::Neq(a), Condition::NotIn(values)) => {
                let mut merged = vec![a];
                merged.extend(values);
                Ok(Condition::NotIn(merged))
            }
            (Condition::NotIn(mut values), Condition::NotIn(more)) => {
                values.extend(more);
                Ok(Condition::NotIn(values))
            }
            (a, b) => Err(Error::InconsistentConstraints {
                field: field.to_owned(),
                detail: format!("cannot combine {} with {}", a.kind(), b.kind()),
            }),
        }
    }

    /// Short kind name, for diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Condition::Eq(_) => "equals",
            Condition::Neq(_) => "not-equals",
            Condition::Lt { .. } => "less-than",
            Condition::Gt { .. } => "greater-than",
            Condition::In(_) => "in-set",
            Condition::NotIn(_) => "not-in-set",
        }
    }

    /// Renders the `assume` statement rejecting samples that violate this
    /// predicate.
    pub(crate) fn filter_stmt(
        &self,
        field: &str,
        ws: &str,
        ctx: &ResolveCtx<'_>,
    ) -> Result<String, Error> {
        match self {
            Condition::Eq(value) => {
                Ok(format!("{ws}assume({field} == {})", value.render(ctx)?))
            }
            Condition::Neq(value) => {
                Ok(format!("{ws}assume({field} != {})", value.render(ctx)?))
            }
            Condition::Lt { value, strict } => {
                let op = if *strict { "<" } else { "<=" };
                Ok(format!("{ws}assume({field} {op} {})", value.render(ctx)?))
            }
            Condition::Gt { value, strict } => {
                let op = if *strict { ">" } else { ">=" };
                Ok(format!("{ws}assume({field} {op} {})", value.render(ctx)?))
            }
            Condition::In(values) => Ok(format!(
                "{ws}assume({field} in {})",
                render_tuple(values, ctx)?
            )),
            Condition::NotIn(values) => {
                let clauses = values
                    .iter()
                    .map(|v| Ok(format!("{field} != {}", v.render(ctx)?)))
                    .collect::<Result<Vec<_>, Error>>()?;
                Ok(format!("{ws}assume({})", clauses.join(" and ")))
            }
        }
    }
}
