//! Cross-field references: paths from the root of a strategy tree to a
//! previously generated value or set of values.

use std::collections::BTreeMap;

use crate::error::Error;
use crate::field::{FieldGen, RepState};
use crate::ros::RosType;

/// One step of a selector path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectorStep {
    /// Descend into the named field of a record.
    Field(String),
    /// Select every element of a fixed-length array.
    All,
    /// Select one arbitrary element of a fixed-length array.
    Any,
}

impl SelectorStep {
    /// A field-name step.
    pub fn field(name: &str) -> Self {
        SelectorStep::Field(name.to_owned())
    }
}

/// A reference to a field of the tree being rendered.
///
/// Selectors are built with [`crate::MsgStrategy::selector`], which validates
/// the path shape against the tree and the type table and records the
/// referenced value's scalar kind. At render time the reference resolves to
/// the name of an already-emitted field; a target that has not been emitted
/// yet raises the retryable [`Error::Unresolved`], which is what drives the
/// resolution fixpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct Selector {
    steps: Vec<SelectorStep>,
    ros_type: RosType,
}

impl Selector {
    pub(crate) fn new(steps: Vec<SelectorStep>, ros_type: RosType) -> Self {
        Self { steps, ros_type }
    }

    /// Scalar kind of the referenced value.
    pub fn ros_type(&self) -> &RosType {
        &self.ros_type
    }

    /// The path steps.
    pub fn steps(&self) -> &[SelectorStep] {
        &self.steps
    }

    /// Resolves this reference against the tree being rendered.
    pub(crate) fn resolve(&self, ctx: &ResolveCtx<'_>) -> Result<ResolvedRef, Error> {
        let mut steps = self.steps.iter();
        let first = match steps.next() {
            Some(SelectorStep::Field(name)) => name,
            _ => {
                return Err(Error::InvalidSelector(
                    "selector must start with a field name".to_owned(),
                ))
            }
        };
        let node = ctx.fields.get(first).ok_or_else(|| {
            Error::InvalidSelector(format!("unknown root field '{first}'"))
        })?;
        let mut targets = vec![Target {
            node,
            name: format!("{}.{}", ctx.var_name, first),
            covered: false,
        }];
        for target in &mut targets {
            target.visit()?;
        }

        for step in steps {
            match step {
                SelectorStep::Field(name) => {
                    for target in &mut targets {
                        target.node = target.node.composite_child(name).ok_or_else(|| {
                            Error::InvalidSelector(format!(
                                "'{}' has no field '{name}'",
                                target.name
                            ))
                        })?;
                        target.name = format!("{}.{name}", target.name);
                        target.visit()?;
                    }
                }
                SelectorStep::All => {
                    let mut forked = Vec::new();
                    for target in &targets {
                        let elems = target.node.array_elems().ok_or_else(|| {
                            Error::InvalidSelector(format!(
                                "'{}' is not a fixed-length array",
                                target.name
                            ))
                        })?;
                        for (k, elem) in elems.iter().enumerate() {
                            let mut next = Target {
                                node: elem,
                                name: format!("{}[{k}]", target.name),
                                covered: target.covered,
                            };
                            next.visit()?;
                            forked.push(next);
                        }
                    }
                    targets = forked;
                }
                SelectorStep::Any => {
                    for target in &mut targets {
                        let state = target.node.rep_state().ok_or_else(|| {
                            Error::InvalidSelector(format!(
                                "'{}' is not a fixed-length array",
                                target.name
                            ))
                        })?;
                        match state {
                            RepState::NotRequested => {
                                return Err(Error::InvalidSelector(format!(
                                    "'{}' has no pending element selection",
                                    target.name
                                )))
                            }
                            RepState::Pending => {
                                return Err(Error::Unresolved {
                                    field: target.name.clone(),
                                })
                            }
                            RepState::Placed(k) => {
                                let elems = target
                                    .node
                                    .array_elems()
                                    .expect("fixed array has elements");
                                target.node = &elems[k];
                                target.name = format!("{}[{k}]", target.name);
                                target.visit()?;
                            }
                        }
                    }
                }
            }
        }

        for target in &targets {
            if target.node.is_array() {
                return Err(Error::InvalidSelector(format!(
                    "'{}' is an array; select an element or all elements",
                    target.name
                )));
            }
        }
        let mut names: Vec<String> = targets.into_iter().map(|t| t.name).collect();
        if names.len() == 1 {
            Ok(ResolvedRef::One(names.remove(0)))
        } else {
            Ok(ResolvedRef::Many(names))
        }
    }
}

/// Context for resolving selectors: the tree being rendered.
pub(crate) struct ResolveCtx<'a> {
    /// Name of the instance variable of the strategy being rendered.
    pub var_name: &'a str,
    /// Root field nodes of the tree being rendered.
    pub fields: &'a BTreeMap<String, FieldGen>,
}

/// A resolved reference: one field, or every element of an array.
pub(crate) enum ResolvedRef {
    /// A single field reference.
    One(String),
    /// References to each element of a fixed-length array.
    Many(Vec<String>),
}

struct Target<'a> {
    node: &'a FieldGen,
    name: String,
    covered: bool,
}

impl Target<'_> {
    /// Checks that the value this node stands for is available, and records
    /// when the node's whole subtree was emitted as one statement (so
    /// descendants carry no emission flags of their own).
    fn visit(&mut self) -> Result<(), Error> {
        if !self.covered {
            if !self.node.emitted() {
                return Err(Error::Unresolved {
                    field: self.name.clone(),
                });
            }
            if self.node.covers_subtree() {
                self.covered = true;
            }
        }
        Ok(())
    }
}
