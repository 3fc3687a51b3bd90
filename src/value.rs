//! Constraint values: literals and cross-field selectors.

use crate::error::Error;
use crate::ros::RosType;
use crate::selector::{ResolveCtx, ResolvedRef, Selector};

/// A value usable in a field constraint.
///
/// Literals are checked against the field's declared scalar kind when the
/// constraint is attached; selectors are checked against their resolved result
/// type. Time and duration fields have no literal form and accept only
/// selector values.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Boolean literal.
    Bool(bool),
    /// Integer literal.
    Int(i128),
    /// Float literal.
    Float(f64),
    /// String literal.
    String(String),
    /// Reference to a previously generated field.
    Selector(Selector),
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v as i128)
    }
}

impl From<i128> for Value {
    fn from(v: i128) -> Self {
        Value::Int(v)
    }
}

impl From<u64> for Value {
    fn from(v: u64) -> Self {
        Value::Int(v as i128)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_owned())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<Selector> for Value {
    fn from(v: Selector) -> Self {
        Value::Selector(v)
    }
}

impl Value {
    /// Checks that this value can constrain a field of the given kind.
    pub(crate) fn check(&self, ros_type: &RosType, field: &str) -> Result<(), Error> {
        let invalid = || Error::InvalidValue {
            field: field.to_owned(),
            expected: ros_type.name(),
            value: format!("{self:?}"),
        };
        if let Value::Selector(selector) = self {
            if selector.ros_type() == ros_type {
                return Ok(());
            }
            return Err(invalid());
        }
        match ros_type {
            // Integer 0/1 doubles as a boolean literal.
            RosType::Bool => match self {
                Value::Bool(_) | Value::Int(0) | Value::Int(1) => Ok(()),
                _ => Err(invalid()),
            },
            RosType::String => match self {
                Value::String(_) => Ok(()),
                _ => Err(invalid()),
            },
            RosType::Int(int) => match self {
                Value::Int(v) => {
                    let (lo, hi) = int.bounds();
                    if *v >= lo && *v <= hi {
                        Ok(())
                    } else {
                        Err(invalid())
                    }
                }
                _ => Err(invalid()),
            },
            RosType::Float(float) => match self {
                Value::Float(v) => {
                    let (lo, hi) = float.bounds();
                    if v.is_finite() && *v >= lo && *v <= hi {
                        Ok(())
                    } else {
                        Err(invalid())
                    }
                }
                _ => Err(invalid()),
            },
            // No literal form exists for these kinds.
            RosType::Time | RosType::Duration | RosType::Message(_) => Err(invalid()),
        }
    }

    /// Literal numeric magnitude, for bound narrowing comparisons.
    pub(crate) fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(v) => Some(*v as f64),
            Value::Float(v) => Some(*v),
            _ => None,
        }
    }

    /// Renders this value as backend text, resolving selector references.
    pub(crate) fn render(&self, ctx: &ResolveCtx<'_>) -> Result<String, Error> {
        match self {
            Value::Bool(true) => Ok("True".to_owned()),
            Value::Bool(false) => Ok("False".to_owned()),
            Value::Int(v) => Ok(v.to_string()),
            Value::Float(v) => Ok(format!("{v:?}")),
            Value::String(v) => Ok(quote(v)),
            Value::Selector(selector) => match selector.resolve(ctx)? {
                ResolvedRef::One(name) => Ok(name),
                ResolvedRef::Many(names) => Ok(tuple_text(&names)),
            },
        }
    }
}

/// Renders a pool of values as a backend tuple literal.
///
/// A pool holding exactly one all-elements selector flattens to the element
/// references themselves, so membership means "one of the array's elements".
pub(crate) fn render_tuple(values: &[Value], ctx: &ResolveCtx<'_>) -> Result<String, Error> {
    if let [Value::Selector(selector)] = values {
        if let ResolvedRef::Many(names) = selector.resolve(ctx)? {
            return Ok(tuple_text(&names));
        }
    }
    let rendered = values
        .iter()
        .map(|v| v.render(ctx))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(tuple_text(&rendered))
}

fn tuple_text(items: &[String]) -> String {
    // Single-element tuples need the trailing comma.
    if items.len() == 1 {
        format!("({},)", items[0])
    } else {
        format!("({})", items.join(", "))
    }
}

fn quote(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('"');
    for c in text.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if (c as u32) < 0x20 => out.push_str(&format!("\\x{:02x}", c as u32)),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}
