//! Field-generator nodes: the polymorphic tree from which strategy code is
//! rendered.
//!
//! The node hierarchy is a closed set of variants, so every operation matches
//! exhaustively and an unsupported constraint is a typed error instead of a
//! runtime surprise. A node is owned exclusively by its parent; the tree is a
//! strict hierarchy.

use std::collections::BTreeMap;

use crate::condition::Condition;
use crate::error::Error;
use crate::render::RenderConfig;
use crate::ros::{msg_strategy_name, Arity, RosType, TypeTable, TypeToken};
use crate::selector::{ResolveCtx, SelectorStep};
use crate::value::{render_tuple, Value};

/// One step when navigating to a field of a strategy tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathStep {
    /// Descend into the named field of a record.
    Field(String),
    /// Descend into one element of a fixed-length array.
    Index(usize),
    /// Descend into the "any one index" representative of a fixed-length
    /// array, creating it if necessary.
    Any,
}

impl PathStep {
    /// A field-name step.
    pub fn field(name: &str) -> Self {
        PathStep::Field(name.to_owned())
    }

    /// An element-index step.
    pub fn index(i: usize) -> Self {
        PathStep::Index(i)
    }

    /// An "any one index" step.
    pub fn any() -> Self {
        PathStep::Any
    }
}

impl From<&str> for PathStep {
    fn from(name: &str) -> Self {
        PathStep::Field(name.to_owned())
    }
}

impl From<usize> for PathStep {
    fn from(i: usize) -> Self {
        PathStep::Index(i)
    }
}

/// Address segment used by the resolution driver's worklist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Seg {
    /// Record field by name.
    Field(String),
    /// Array element by position.
    Index(usize),
}

/// Placement state of a fixed-length array's "any one index" representative.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RepState {
    /// No "any one index" selection was requested.
    NotRequested,
    /// Requested, but the array has not been rendered yet.
    Pending,
    /// Placed at the given element position.
    Placed(usize),
}

/// A field-generator node.
///
/// Each variant owns its subtree and its constraint state, and can emit its
/// own generator-binding statement plus any derived filter statements.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldGen {
    /// Boolean, string, time, or duration field.
    Scalar(ScalarField),
    /// Integer or float field.
    Numeric(NumericField),
    /// Record field.
    Composite(CompositeField),
    /// Array field of fixed length.
    FixedArray(FixedArrayField),
    /// Array field of sampled length.
    VarArray(VarArrayField),
}

/// State of a non-numeric scalar field.
#[derive(Debug, Clone, PartialEq)]
pub struct ScalarField {
    field_name: String,
    ros_type: RosType,
    emitted: bool,
    filters_emitted: bool,
    constant: Option<Value>,
    pool: Option<Vec<Value>>,
    condition: Option<Condition>,
}

/// Inclusive-or-strict endpoint of a numeric bound refinement.
#[derive(Debug, Clone, PartialEq)]
struct Bound {
    value: Value,
    strict: bool,
}

/// State of an integer or float field.
#[derive(Debug, Clone, PartialEq)]
pub struct NumericField {
    field_name: String,
    ros_type: RosType,
    emitted: bool,
    filters_emitted: bool,
    constant: Option<Value>,
    pool: Option<Vec<Value>>,
    condition: Option<Condition>,
    lower: Option<Bound>,
    upper: Option<Bound>,
}

/// State of a record field.
///
/// Children are materialized from the type table the first time any
/// descendant is touched; an untouched record renders as one draw from the
/// type's own strategy.
#[derive(Debug, Clone, PartialEq)]
pub struct CompositeField {
    field_name: String,
    ros_type: RosType,
    emitted: bool,
    filters_emitted: bool,
    materialized: bool,
    children: BTreeMap<String, FieldGen>,
}

/// State of a fixed-length array field.
#[derive(Debug, Clone, PartialEq)]
pub struct FixedArrayField {
    field_name: String,
    len: usize,
    template: Box<FieldGen>,
    elems: Vec<FieldGen>,
    representative: Option<Box<FieldGen>>,
    rep_index: Option<usize>,
    emitted: bool,
    filters_emitted: bool,
}

/// State of a variable-length array field.
///
/// One template node stands for every element; constraints broadcast to the
/// template apply uniformly.
#[derive(Debug, Clone, PartialEq)]
pub struct VarArrayField {
    field_name: String,
    template: Box<FieldGen>,
    emitted: bool,
    filters_emitted: bool,
}

/// A constraint operation, before dispatch to a node variant.
#[derive(Debug, Clone)]
enum Op {
    Eq(Value),
    Neq(Value),
    Lt(Value, bool),
    Gt(Value, bool),
    InSet(Vec<Value>),
    NotIn(Vec<Value>),
}

impl Op {
    fn name(&self) -> &'static str {
        match self {
            Op::Eq(_) => "equals",
            Op::Neq(_) => "not-equals",
            Op::Lt(_, true) => "less-than",
            Op::Lt(_, false) => "less-or-equal",
            Op::Gt(_, true) => "greater-than",
            Op::Gt(_, false) => "greater-or-equal",
            Op::InSet(_) => "in-set",
            Op::NotIn(_) => "not-in-set",
        }
    }
}

impl FieldGen {
    /// Builds the default node for a declared field.
    pub(crate) fn from_token(field_name: &str, token: &TypeToken) -> FieldGen {
        match token.arity {
            Arity::Scalar => Self::scalar_node(field_name, token.ros_type.clone()),
            Arity::FixedArray(len) => {
                let template = Self::scalar_node(field_name, token.ros_type.clone());
                let elems = (0..len).map(|_| template.clone()).collect();
                FieldGen::FixedArray(FixedArrayField {
                    field_name: field_name.to_owned(),
                    len,
                    template: Box::new(template),
                    elems,
                    representative: None,
                    rep_index: None,
                    emitted: false,
                    filters_emitted: false,
                })
            }
            Arity::VarArray => FieldGen::VarArray(VarArrayField {
                field_name: field_name.to_owned(),
                template: Box::new(Self::scalar_node(field_name, token.ros_type.clone())),
                emitted: false,
                filters_emitted: false,
            }),
        }
    }

    fn scalar_node(field_name: &str, ros_type: RosType) -> FieldGen {
        if ros_type.is_numeric() {
            FieldGen::Numeric(NumericField {
                field_name: field_name.to_owned(),
                ros_type,
                emitted: false,
                filters_emitted: false,
                constant: None,
                pool: None,
                condition: None,
                lower: None,
                upper: None,
            })
        } else if ros_type.is_message() {
            FieldGen::Composite(CompositeField {
                field_name: field_name.to_owned(),
                ros_type,
                emitted: false,
                filters_emitted: false,
                materialized: false,
                children: BTreeMap::new(),
            })
        } else {
            FieldGen::Scalar(ScalarField {
                field_name: field_name.to_owned(),
                ros_type,
                emitted: false,
                filters_emitted: false,
                constant: None,
                pool: None,
                condition: None,
            })
        }
    }

    /// The declared field name (without any parent prefix or index).
    pub fn field_name(&self) -> &str {
        match self {
            FieldGen::Scalar(f) => &f.field_name,
            FieldGen::Numeric(f) => &f.field_name,
            FieldGen::Composite(f) => &f.field_name,
            FieldGen::FixedArray(f) => &f.field_name,
            FieldGen::VarArray(f) => &f.field_name,
        }
    }

    /// The scalar kind of this field, or of its elements for arrays.
    pub fn ros_type(&self) -> &RosType {
        match self {
            FieldGen::Scalar(f) => &f.ros_type,
            FieldGen::Numeric(f) => &f.ros_type,
            FieldGen::Composite(f) => &f.ros_type,
            FieldGen::FixedArray(f) => f.template.ros_type(),
            FieldGen::VarArray(f) => f.template.ros_type(),
        }
    }

    /// Returns `true` while no constraint or selection has been attached
    /// anywhere in this node's subtree.
    pub fn is_default(&self) -> bool {
        match self {
            FieldGen::Scalar(f) => {
                f.constant.is_none() && f.pool.is_none() && f.condition.is_none()
            }
            FieldGen::Numeric(f) => {
                f.constant.is_none()
                    && f.pool.is_none()
                    && f.condition.is_none()
                    && f.lower.is_none()
                    && f.upper.is_none()
            }
            FieldGen::Composite(f) => f.children.values().all(FieldGen::is_default),
            FieldGen::FixedArray(f) => {
                f.representative.is_none()
                    && f.rep_index.is_none()
                    && f.elems.iter().all(FieldGen::is_default)
            }
            FieldGen::VarArray(f) => f.template.is_default(),
        }
    }

    pub(crate) fn emitted(&self) -> bool {
        match self {
            FieldGen::Scalar(f) => f.emitted,
            FieldGen::Numeric(f) => f.emitted,
            FieldGen::Composite(f) => f.emitted,
            FieldGen::FixedArray(f) => f.emitted,
            FieldGen::VarArray(f) => f.emitted,
        }
    }

    /// Returns `true` if this node is an array of either kind.
    pub fn is_array(&self) -> bool {
        matches!(self, FieldGen::FixedArray(_) | FieldGen::VarArray(_))
    }

    /// True when emitting this node's binding covers its whole subtree, so
    /// descendants never carry emission flags of their own.
    pub(crate) fn covers_subtree(&self) -> bool {
        match self {
            FieldGen::Composite(_) => self.is_default(),
            FieldGen::VarArray(_) => true,
            _ => false,
        }
    }

    pub(crate) fn composite_child(&self, name: &str) -> Option<&FieldGen> {
        match self {
            FieldGen::Composite(f) => f.children.get(name),
            _ => None,
        }
    }

    pub(crate) fn array_elems(&self) -> Option<&[FieldGen]> {
        match self {
            FieldGen::FixedArray(f) => Some(&f.elems),
            _ => None,
        }
    }

    pub(crate) fn rep_state(&self) -> Option<RepState> {
        match self {
            FieldGen::FixedArray(f) => Some(if let Some(k) = f.rep_index {
                RepState::Placed(k)
            } else if f.representative.is_some() {
                RepState::Pending
            } else {
                RepState::NotRequested
            }),
            _ => None,
        }
    }

    // ------------------------------------------------------------------
    // Constraint mutators
    // ------------------------------------------------------------------

    /// Fixes the generated value.
    pub fn eq(&mut self, value: impl Into<Value>) -> Result<(), Error> {
        self.apply(Op::Eq(value.into()))
    }

    /// Excludes one value.
    pub fn neq(&mut self, value: impl Into<Value>) -> Result<(), Error> {
        self.apply(Op::Neq(value.into()))
    }

    /// Bounds the value strictly from above. Numeric fields only.
    pub fn lt(&mut self, value: impl Into<Value>) -> Result<(), Error> {
        self.apply(Op::Lt(value.into(), true))
    }

    /// Bounds the value from above. Numeric fields only.
    pub fn lte(&mut self, value: impl Into<Value>) -> Result<(), Error> {
        self.apply(Op::Lt(value.into(), false))
    }

    /// Bounds the value strictly from below. Numeric fields only.
    pub fn gt(&mut self, value: impl Into<Value>) -> Result<(), Error> {
        self.apply(Op::Gt(value.into(), true))
    }

    /// Bounds the value from below. Numeric fields only.
    pub fn gte(&mut self, value: impl Into<Value>) -> Result<(), Error> {
        self.apply(Op::Gt(value.into(), false))
    }

    /// Draws the value from a finite pool.
    pub fn in_set<I, V>(&mut self, values: I) -> Result<(), Error>
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.apply(Op::InSet(values.into_iter().map(Into::into).collect()))
    }

    /// Excludes a set of values.
    pub fn not_in<I, V>(&mut self, values: I) -> Result<(), Error>
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.apply(Op::NotIn(values.into_iter().map(Into::into).collect()))
    }

    fn apply(&mut self, op: Op) -> Result<(), Error> {
        match self {
            FieldGen::Scalar(f) => f.apply(op),
            FieldGen::Numeric(f) => f.apply(op),
            FieldGen::Composite(f) => Err(Error::UnsupportedOperation {
                field: f.field_name.clone(),
                operation: op.name(),
            }),
            // Arrays broadcast the constraint to every element.
            FieldGen::FixedArray(f) => {
                for elem in &mut f.elems {
                    elem.apply(op.clone())?;
                }
                Ok(())
            }
            FieldGen::VarArray(f) => f.template.apply(op),
        }
    }

    // ------------------------------------------------------------------
    // Navigation
    // ------------------------------------------------------------------

    /// Descends one navigation step, materializing record children and the
    /// array representative as needed.
    pub(crate) fn step_mut(
        &mut self,
        step: &PathStep,
        table: &TypeTable,
    ) -> Result<&mut FieldGen, Error> {
        match step {
            PathStep::Field(name) => match self {
                FieldGen::Composite(f) => f.child_mut(name, table),
                other => Err(Error::InvalidSelector(format!(
                    "'{}' is not a record field",
                    other.field_name()
                ))),
            },
            PathStep::Index(i) => match self {
                FieldGen::FixedArray(f) => {
                    let len = f.len;
                    let field = f.field_name.clone();
                    f.elems.get_mut(*i).ok_or_else(move || {
                        Error::InvalidSelector(format!(
                            "index {i} out of bounds for '{field}' of length {len}"
                        ))
                    })
                }
                FieldGen::VarArray(f) => Err(Error::UnsupportedOperation {
                    field: f.field_name.clone(),
                    operation: "indexing a variable-length array",
                }),
                other => Err(Error::InvalidSelector(format!(
                    "'{}' is not an array field",
                    other.field_name()
                ))),
            },
            PathStep::Any => match self {
                FieldGen::FixedArray(f) => f.any_index(),
                FieldGen::VarArray(f) => Err(Error::UnsupportedOperation {
                    field: f.field_name.clone(),
                    operation: "any-index selection on a variable-length array",
                }),
                other => Err(Error::InvalidSelector(format!(
                    "'{}' is not an array field",
                    other.field_name()
                ))),
            },
        }
    }

    /// Validates a selector path through this node, materializing the fields
    /// it traverses, and returns the referenced value's scalar kind.
    pub(crate) fn selector_walk(
        &mut self,
        steps: &[SelectorStep],
        table: &TypeTable,
    ) -> Result<RosType, Error> {
        let Some((step, rest)) = steps.split_first() else {
            if self.is_array() {
                return Err(Error::InvalidSelector(format!(
                    "'{}' is an array; select an element or all elements",
                    self.field_name()
                )));
            }
            return Ok(self.ros_type().clone());
        };
        match step {
            SelectorStep::Field(name) => match self {
                FieldGen::Composite(f) => f.child_mut(name, table)?.selector_walk(rest, table),
                other => Err(Error::InvalidSelector(format!(
                    "'{}' is not a record field",
                    other.field_name()
                ))),
            },
            SelectorStep::All => match self {
                FieldGen::FixedArray(f) => {
                    if f.elems.is_empty() {
                        return f.template.selector_walk(rest, table);
                    }
                    let mut result = None;
                    for elem in &mut f.elems {
                        result = Some(elem.selector_walk(rest, table)?);
                    }
                    Ok(result.expect("array has elements"))
                }
                FieldGen::VarArray(f) => Err(Error::InvalidSelector(format!(
                    "all-elements selection is not supported on variable-length array '{}'",
                    f.field_name
                ))),
                other => Err(Error::InvalidSelector(format!(
                    "'{}' is not an array field",
                    other.field_name()
                ))),
            },
            SelectorStep::Any => match self {
                FieldGen::FixedArray(f) => f.any_index()?.selector_walk(rest, table),
                FieldGen::VarArray(f) => Err(Error::UnsupportedOperation {
                    field: f.field_name.clone(),
                    operation: "any-index selection on a variable-length array",
                }),
                other => Err(Error::InvalidSelector(format!(
                    "'{}' is not an array field",
                    other.field_name()
                ))),
            },
        }
    }

    /// Descends one worklist segment.
    pub(crate) fn descend(&self, seg: &Seg) -> Option<&FieldGen> {
        match seg {
            Seg::Field(name) => self.composite_child(name),
            Seg::Index(i) => self.array_elems().and_then(|elems| elems.get(*i)),
        }
    }

    /// Mutable variant of [`FieldGen::descend`].
    pub(crate) fn descend_mut(&mut self, seg: &Seg) -> Option<&mut FieldGen> {
        match (self, seg) {
            (FieldGen::Composite(f), Seg::Field(name)) => f.children.get_mut(name),
            (FieldGen::FixedArray(f), Seg::Index(i)) => f.elems.get_mut(*i),
            _ => None,
        }
    }

    /// Worklist segments for this node's directly rendered children.
    ///
    /// Record fields rendered as one draw and variable-length arrays have no
    /// separately rendered children.
    pub(crate) fn child_segs(&self) -> Vec<Seg> {
        match self {
            FieldGen::Composite(f) if !self.is_default() => {
                f.children.keys().cloned().map(Seg::Field).collect()
            }
            FieldGen::FixedArray(f) => (0..f.elems.len()).map(Seg::Index).collect(),
            _ => Vec::new(),
        }
    }

    // ------------------------------------------------------------------
    // Emission
    // ------------------------------------------------------------------

    /// Renders the generator-binding statement for this node alone.
    ///
    /// Fails with the retryable [`Error::Unresolved`] when a selector value
    /// references a field that has not been emitted yet. Does not mutate the
    /// node; the caller commits success with [`FieldGen::mark_emitted`].
    pub(crate) fn binding_stmt(
        &self,
        name: &str,
        level: usize,
        loop_depth: usize,
        cfg: &RenderConfig,
        ctx: &ResolveCtx<'_>,
        custom: &BTreeMap<String, String>,
    ) -> Result<String, Error> {
        assert!(!self.emitted(), "field '{name}' has already been rendered");
        let ws = cfg.ws(level);
        match self {
            FieldGen::Scalar(f) => {
                value_binding(name, &ws, &f.constant, &f.pool, cfg, ctx, || {
                    format!("draw({}())", f.ros_type.strategy_name())
                })
            }
            FieldGen::Numeric(f) => {
                let default = || -> Result<String, Error> {
                    let mut args = Vec::new();
                    if let Some(bound) = &f.lower {
                        args.push(format!("min_value={}", bound.value.render(ctx)?));
                    }
                    if let Some(bound) = &f.upper {
                        args.push(format!("max_value={}", bound.value.render(ctx)?));
                    }
                    Ok(format!(
                        "draw({}({}))",
                        f.ros_type.strategy_name(),
                        args.join(", ")
                    ))
                };
                if f.constant.is_some() || f.pool.is_some() {
                    value_binding(name, &ws, &f.constant, &f.pool, cfg, ctx, String::new)
                } else {
                    Ok(format!("{ws}{name} = {}", default()?))
                }
            }
            FieldGen::Composite(f) => {
                if self.is_default() {
                    let msg_type = f.msg_type();
                    let strategy = custom
                        .get(msg_type)
                        .cloned()
                        .unwrap_or_else(|| msg_strategy_name(msg_type));
                    Ok(format!("{ws}{name} = draw({strategy}())"))
                } else {
                    let (pkg, msg) = split_msg_type(f.msg_type());
                    Ok(format!("{ws}{name} = {pkg}.{msg}()"))
                }
            }
            FieldGen::FixedArray(f) => {
                if f.representative.is_some() && f.free_slot().is_none() {
                    return Err(Error::NoFreeIndex {
                        field: name.to_owned(),
                    });
                }
                Ok(format!(
                    "{ws}{name} = draw({}.lists(min_size={len}, max_size={len}))",
                    cfg.module,
                    len = f.len
                ))
            }
            FieldGen::VarArray(f) => {
                if loop_depth >= cfg.max_depth {
                    return Err(Error::DepthExceeded {
                        field: name.to_owned(),
                    });
                }
                let var = cfg.loop_var(loop_depth);
                let elem_name = format!("{name}[{var}]");
                // The whole block is emitted at once: with a sampled length
                // there is no outer loop iteration to return to, so element
                // bindings and filters inline here.
                let body =
                    f.template
                        .subtree_stmts(&elem_name, level + 1, loop_depth + 1, cfg, ctx, custom)?;
                let mut block = format!(
                    "{ws}{name} = draw({}.lists(min_size=0, max_size={}))\n\
                     {ws}for {var} in range(len({name})):\n",
                    cfg.module, cfg.max_array_len
                );
                block.push_str(&body.join("\n"));
                Ok(block)
            }
        }
    }

    /// Renders the filter statements derived from this node's constraints.
    ///
    /// Independent of [`FieldGen::binding_stmt`] so a whole tree's bindings
    /// can be emitted before any of its filters. Does not mutate the node; the
    /// caller commits with [`FieldGen::mark_filters_emitted`].
    pub(crate) fn filter_stmts(
        &self,
        name: &str,
        level: usize,
        cfg: &RenderConfig,
        ctx: &ResolveCtx<'_>,
    ) -> Result<Vec<String>, Error> {
        let ws = cfg.ws(level);
        let mut stmts = Vec::new();
        match self {
            FieldGen::Scalar(f) => {
                if let Some(condition) = &f.condition {
                    stmts.push(condition.filter_stmt(name, &ws, ctx)?);
                }
            }
            FieldGen::Numeric(f) => {
                if let Some(bound) = &f.lower {
                    let cond = Condition::Gt {
                        value: bound.value.clone(),
                        strict: bound.strict,
                    };
                    stmts.push(cond.filter_stmt(name, &ws, ctx)?);
                }
                if let Some(bound) = &f.upper {
                    let cond = Condition::Lt {
                        value: bound.value.clone(),
                        strict: bound.strict,
                    };
                    stmts.push(cond.filter_stmt(name, &ws, ctx)?);
                }
                if let Some(condition) = &f.condition {
                    stmts.push(condition.filter_stmt(name, &ws, ctx)?);
                }
            }
            // Children carry their own filters; array templates inline theirs
            // inside the binding block.
            FieldGen::Composite(_) | FieldGen::FixedArray(_) | FieldGen::VarArray(_) => {}
        }
        Ok(stmts)
    }

    /// Renders this node and its descendants as one uninterrupted block,
    /// bindings and filters together.
    pub(crate) fn subtree_stmts(
        &self,
        name: &str,
        level: usize,
        loop_depth: usize,
        cfg: &RenderConfig,
        ctx: &ResolveCtx<'_>,
        custom: &BTreeMap<String, String>,
    ) -> Result<Vec<String>, Error> {
        let mut stmts = vec![self.binding_stmt(name, level, loop_depth, cfg, ctx, custom)?];
        match self {
            FieldGen::Scalar(_) | FieldGen::Numeric(_) => {
                stmts.extend(self.filter_stmts(name, level, cfg, ctx)?);
            }
            FieldGen::Composite(f) => {
                if !self.is_default() {
                    for (child_name, child) in &f.children {
                        let full = format!("{name}.{child_name}");
                        stmts.extend(
                            child.subtree_stmts(&full, level, loop_depth, cfg, ctx, custom)?,
                        );
                    }
                }
            }
            FieldGen::FixedArray(f) => {
                // Mirror the placement `mark_emitted` will perform.
                let place_at = if f.representative.is_some() {
                    f.free_slot()
                } else {
                    None
                };
                for (i, elem) in f.elems.iter().enumerate() {
                    let node = match (&f.representative, place_at) {
                        (Some(rep), Some(k)) if k == i => rep.as_ref(),
                        _ => elem,
                    };
                    let full = format!("{name}[{i}]");
                    stmts.extend(node.subtree_stmts(&full, level, loop_depth, cfg, ctx, custom)?);
                }
            }
            // The binding already is the whole block.
            FieldGen::VarArray(_) => {}
        }
        Ok(stmts)
    }

    /// Marks this node's binding as emitted, performing the deferred
    /// representative placement for fixed-length arrays and covering the whole
    /// template subtree for variable-length arrays.
    pub(crate) fn mark_emitted(&mut self) {
        match self {
            FieldGen::Scalar(f) => f.emitted = true,
            FieldGen::Numeric(f) => f.emitted = true,
            FieldGen::Composite(f) => f.emitted = true,
            FieldGen::FixedArray(f) => {
                f.emitted = true;
                f.place_representative();
            }
            FieldGen::VarArray(f) => {
                f.emitted = true;
                f.filters_emitted = true;
                f.template.mark_subtree_emitted();
            }
        }
    }

    /// Marks this node's filters as emitted.
    pub(crate) fn mark_filters_emitted(&mut self) {
        match self {
            FieldGen::Scalar(f) => f.filters_emitted = true,
            FieldGen::Numeric(f) => f.filters_emitted = true,
            FieldGen::Composite(f) => f.filters_emitted = true,
            FieldGen::FixedArray(f) => f.filters_emitted = true,
            FieldGen::VarArray(f) => f.filters_emitted = true,
        }
    }

    fn mark_subtree_emitted(&mut self) {
        self.mark_emitted();
        self.mark_filters_emitted();
        match self {
            FieldGen::Composite(f) => {
                for child in f.children.values_mut() {
                    child.mark_subtree_emitted();
                }
            }
            FieldGen::FixedArray(f) => {
                for elem in &mut f.elems {
                    elem.mark_subtree_emitted();
                }
            }
            _ => {}
        }
    }
}

impl ScalarField {
    fn apply(&mut self, op: Op) -> Result<(), Error> {
        match op {
            Op::Eq(v) => apply_eq(
                &mut self.constant,
                &self.pool,
                &mut self.condition,
                &self.ros_type,
                &self.field_name,
                v,
            ),
            Op::Neq(v) => apply_neq(
                &mut self.condition,
                &self.ros_type,
                &self.field_name,
                v,
            ),
            Op::InSet(values) => apply_in_set(
                &self.constant,
                &mut self.pool,
                &mut self.condition,
                &self.ros_type,
                &self.field_name,
                values,
            ),
            Op::NotIn(values) => apply_not_in(
                &mut self.condition,
                &self.ros_type,
                &self.field_name,
                values,
            ),
            op @ (Op::Lt(..) | Op::Gt(..)) => Err(Error::UnsupportedOperation {
                field: self.field_name.clone(),
                operation: op.name(),
            }),
        }
    }
}

impl NumericField {
    fn apply(&mut self, op: Op) -> Result<(), Error> {
        match op {
            Op::Eq(v) => apply_eq(
                &mut self.constant,
                &self.pool,
                &mut self.condition,
                &self.ros_type,
                &self.field_name,
                v,
            ),
            Op::Neq(v) => apply_neq(
                &mut self.condition,
                &self.ros_type,
                &self.field_name,
                v,
            ),
            Op::InSet(values) => apply_in_set(
                &self.constant,
                &mut self.pool,
                &mut self.condition,
                &self.ros_type,
                &self.field_name,
                values,
            ),
            Op::NotIn(values) => apply_not_in(
                &mut self.condition,
                &self.ros_type,
                &self.field_name,
                values,
            ),
            Op::Lt(v, strict) => {
                v.check(&self.ros_type, &self.field_name)?;
                narrow(&mut self.upper, v, strict, false);
                Ok(())
            }
            Op::Gt(v, strict) => {
                v.check(&self.ros_type, &self.field_name)?;
                narrow(&mut self.lower, v, strict, true);
                Ok(())
            }
        }
    }
}

impl CompositeField {
    fn msg_type(&self) -> &str {
        match &self.ros_type {
            RosType::Message(t) => t,
            // Composite nodes are only built for message kinds.
            _ => unreachable!("composite field with non-message type"),
        }
    }

    fn child_mut(&mut self, name: &str, table: &TypeTable) -> Result<&mut FieldGen, Error> {
        if !self.materialized {
            let msg_type = self.msg_type().to_owned();
            let decl = table
                .get(&msg_type)
                .ok_or_else(|| Error::UnknownType(msg_type.clone()))?;
            for (field, token) in decl {
                self.children
                    .insert(field.clone(), FieldGen::from_token(field, token));
            }
            self.materialized = true;
        }
        let msg_type = self.msg_type().to_owned();
        self.children.get_mut(name).ok_or_else(|| Error::UnknownField {
            msg_type,
            field: name.to_owned(),
        })
    }
}

impl FixedArrayField {
    /// Lowest element position still in default state.
    fn free_slot(&self) -> Option<usize> {
        self.elems.iter().position(FieldGen::is_default)
    }

    fn place_representative(&mut self) {
        if let Some(rep) = self.representative.take() {
            let slot = self
                .free_slot()
                .expect("placement feasibility checked before commit");
            self.elems[slot] = *rep;
            self.rep_index = Some(slot);
        }
    }

    fn any_index(&mut self) -> Result<&mut FieldGen, Error> {
        if self.len == 0 {
            return Err(Error::UnsupportedOperation {
                field: self.field_name.clone(),
                operation: "any-index selection on an empty array",
            });
        }
        if let Some(k) = self.rep_index {
            return Ok(&mut self.elems[k]);
        }
        if self.representative.is_none() {
            self.representative = Some(self.template.clone());
        }
        Ok(self
            .representative
            .as_mut()
            .expect("representative just created"))
    }
}

fn split_msg_type(msg_type: &str) -> (&str, &str) {
    msg_type
        .split_once('/')
        .expect("message type names are validated as 'pkg/Name'")
}

fn value_binding(
    name: &str,
    ws: &str,
    constant: &Option<Value>,
    pool: &Option<Vec<Value>>,
    cfg: &RenderConfig,
    ctx: &ResolveCtx<'_>,
    default: impl FnOnce() -> String,
) -> Result<String, Error> {
    if let Some(value) = constant {
        Ok(format!("{ws}{name} = {}", value.render(ctx)?))
    } else if let Some(values) = pool {
        Ok(format!(
            "{ws}{name} = draw({}.sampled_from({}))",
            cfg.module,
            render_tuple(values, ctx)?
        ))
    } else {
        Ok(format!("{ws}{name} = {}", default()))
    }
}

fn apply_eq(
    constant: &mut Option<Value>,
    pool: &Option<Vec<Value>>,
    condition: &mut Option<Condition>,
    ros_type: &RosType,
    field: &str,
    value: Value,
) -> Result<(), Error> {
    value.check(ros_type, field)?;
    if constant.is_some() || pool.is_some() {
        return Err(Error::InconsistentConstraints {
            field: field.to_owned(),
            detail: "the generated value is already constrained".to_owned(),
        });
    }
    set_condition(condition, Condition::Eq(value.clone()), field)?;
    *constant = Some(value);
    Ok(())
}

fn apply_neq(
    condition: &mut Option<Condition>,
    ros_type: &RosType,
    field: &str,
    value: Value,
) -> Result<(), Error> {
    value.check(ros_type, field)?;
    set_condition(condition, Condition::Neq(value), field)
}

fn apply_in_set(
    constant: &Option<Value>,
    pool: &mut Option<Vec<Value>>,
    condition: &mut Option<Condition>,
    ros_type: &RosType,
    field: &str,
    values: Vec<Value>,
) -> Result<(), Error> {
    if values.is_empty() {
        return Err(Error::InvalidValue {
            field: field.to_owned(),
            expected: "a non-empty set of values".to_owned(),
            value: "()".to_owned(),
        });
    }
    for value in &values {
        value.check(ros_type, field)?;
    }
    if constant.is_some() || pool.is_some() {
        return Err(Error::InconsistentConstraints {
            field: field.to_owned(),
            detail: "the generated value is already constrained".to_owned(),
        });
    }
    set_condition(condition, Condition::In(values.clone()), field)?;
    *pool = Some(values);
    Ok(())
}

fn apply_not_in(
    condition: &mut Option<Condition>,
    ros_type: &RosType,
    field: &str,
    values: Vec<Value>,
) -> Result<(), Error> {
    for value in &values {
        value.check(ros_type, field)?;
    }
    set_condition(condition, Condition::NotIn(values), field)
}

fn set_condition(
    slot: &mut Option<Condition>,
    condition: Condition,
    field: &str,
) -> Result<(), Error> {
    let merged = match slot {
        None => condition,
        Some(existing) => existing.clone().merge(condition, field)?,
    };
    *slot = Some(merged);
    Ok(())
}

/// Narrows one bound endpoint. A new literal endpoint wins only when it is
/// narrower than the old one (or equally placed but stricter); a non-literal
/// endpoint always replaces, as no order exists to compare by.
fn narrow(slot: &mut Option<Bound>, value: Value, strict: bool, is_lower: bool) {
    let replace = match (&*slot, value.as_f64()) {
        (None, _) => true,
        (Some(_), None) => true,
        (Some(old), Some(new)) => match old.value.as_f64() {
            None => true,
            Some(existing) => {
                let narrower = if is_lower {
                    new > existing
                } else {
                    new < existing
                };
                narrower || (new == existing && strict && !old.strict)
            }
        },
    };
    if replace {
        *slot = Some(Bound { value, strict });
    }
}
