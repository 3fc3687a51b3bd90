//! Per-type strategy trees and the dependency-resolution driver.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::trace;

use crate::error::Error;
use crate::field::{FieldGen, PathStep, Seg};
use crate::render::RenderConfig;
use crate::ros::TypeTable;
use crate::selector::{ResolveCtx, Selector, SelectorStep};

/// A generator tree for one message type.
///
/// Default trees are built by the registry, one per type, and render with only
/// the built-in type bounds. Custom trees start empty: fields materialize when
/// constraints or selectors touch them, and the registry back-fills every
/// untouched field from the default tree before rendering.
///
/// Rendering happens at most once per tree; a second render is a programming
/// error and panics.
#[derive(Debug, Clone)]
pub struct MsgStrategy {
    msg_type: String,
    name: String,
    fields: BTreeMap<String, FieldGen>,
    table: Arc<TypeTable>,
    emitted: bool,
}

enum Pass {
    Bindings,
    Filters,
}

impl MsgStrategy {
    pub(crate) fn new_default(msg_type: &str, table: Arc<TypeTable>) -> Self {
        let mut fields = BTreeMap::new();
        if let Some(decl) = table.get(msg_type) {
            for (field, token) in decl {
                fields.insert(field.clone(), FieldGen::from_token(field, token));
            }
        }
        Self {
            msg_type: msg_type.to_owned(),
            name: crate::ros::msg_strategy_name(msg_type),
            fields,
            table,
            emitted: false,
        }
    }

    pub(crate) fn new_custom(msg_type: &str, name: String, table: Arc<TypeTable>) -> Self {
        Self {
            msg_type: msg_type.to_owned(),
            name,
            fields: BTreeMap::new(),
            table,
            emitted: false,
        }
    }

    /// The name of the emitted procedure.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The message type this tree generates.
    pub fn msg_type(&self) -> &str {
        &self.msg_type
    }

    /// Returns `true` while no constraint or selection has been attached
    /// anywhere in the tree.
    pub fn is_default(&self) -> bool {
        self.fields.values().all(FieldGen::is_default)
    }

    /// Iterates over the tree's field nodes in name order.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &FieldGen)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Looks up one field node.
    pub fn field(&self, name: &str) -> Option<&FieldGen> {
        self.fields.get(name)
    }

    /// Navigates to a field of this tree, materializing untouched records and
    /// array representatives along the path.
    ///
    /// The path starts with a field name and may continue through record
    /// fields, fixed-array element indices, and "any one index" steps.
    pub fn field_mut(&mut self, path: &[PathStep]) -> Result<&mut FieldGen, Error> {
        let table = Arc::clone(&self.table);
        let Some((first, rest)) = path.split_first() else {
            return Err(Error::InvalidSelector("empty field path".to_owned()));
        };
        let PathStep::Field(name) = first else {
            return Err(Error::InvalidSelector(
                "field path must start with a field name".to_owned(),
            ));
        };
        let mut node = self.root_field_mut(name)?;
        for step in rest {
            node = node.step_mut(step, &table)?;
        }
        Ok(node)
    }

    /// Builds a selector referencing a field of this tree.
    ///
    /// The path is validated against the tree and the type table, the fields
    /// it traverses are materialized, and an "any one index" step registers
    /// the array's representative so rendering can place it. The returned
    /// selector can then be used as a constraint value on another field of the
    /// same tree.
    pub fn selector(&mut self, steps: Vec<SelectorStep>) -> Result<Selector, Error> {
        let table = Arc::clone(&self.table);
        let Some((first, rest)) = steps.split_first() else {
            return Err(Error::InvalidSelector("empty selector path".to_owned()));
        };
        let SelectorStep::Field(name) = first else {
            return Err(Error::InvalidSelector(
                "selector must start with a field name".to_owned(),
            ));
        };
        let name = name.clone();
        let node = self.root_field_mut(&name)?;
        let ros_type = node.selector_walk(rest, &table)?;
        Ok(Selector::new(steps, ros_type))
    }

    fn root_field_mut(&mut self, name: &str) -> Result<&mut FieldGen, Error> {
        if !self.fields.contains_key(name) {
            let token = self.table.field(&self.msg_type, name)?.clone();
            self.fields
                .insert(name.to_owned(), FieldGen::from_token(name, &token));
        }
        Ok(self
            .fields
            .get_mut(name)
            .expect("field present or just inserted"))
    }

    pub(crate) fn adopt_missing_from(&mut self, default: &MsgStrategy) {
        for (name, node) in &default.fields {
            if !self.fields.contains_key(name) {
                self.fields.insert(name.clone(), node.clone());
            }
        }
    }

    /// Renders the strategy procedure, resolving field dependencies.
    ///
    /// Equivalent to rendering through the registry for a tree that references
    /// no group-local strategies.
    pub fn render(&mut self, cfg: &RenderConfig) -> Result<String, Error> {
        self.render_with(cfg, &BTreeMap::new())
    }

    /// Renders with a map from message type to group-local strategy name, so
    /// record fields whose type has a custom tree in the same group draw from
    /// it instead of the default.
    pub(crate) fn render_with(
        &mut self,
        cfg: &RenderConfig,
        custom: &BTreeMap<String, String>,
    ) -> Result<String, Error> {
        assert!(
            !self.emitted,
            "strategy '{}' has already been rendered",
            self.name
        );
        let mut body = Vec::new();
        self.run_pass(Pass::Bindings, &mut body, cfg, custom)?;
        self.run_pass(Pass::Filters, &mut body, cfg, custom)?;
        self.emitted = true;

        let (pkg, msg) = self
            .msg_type
            .split_once('/')
            .expect("message type names are validated as 'pkg/Name'");
        let ws0 = cfg.ws(0);
        let ws1 = cfg.ws(1);
        let mut out = format!(
            "{ws0}@{}.composite\n{ws0}def {}(draw):\n{ws1}{} = {pkg}.{msg}()\n",
            cfg.module, self.name, cfg.var_name
        );
        for line in &body {
            out.push_str(line);
            out.push('\n');
        }
        out.push_str(&format!("{ws1}return {}", cfg.var_name));
        Ok(out)
    }

    /// One worklist fixpoint over the tree.
    ///
    /// Each round attempts every queued node; a success appends the node's
    /// children for the next round, an unresolved reference re-enqueues the
    /// node unchanged. A round that renders nothing means the remaining nodes
    /// wait on each other: a cycle.
    fn run_pass(
        &mut self,
        pass: Pass,
        body: &mut Vec<String>,
        cfg: &RenderConfig,
        custom: &BTreeMap<String, String>,
    ) -> Result<(), Error> {
        let mut queue: Vec<Vec<Seg>> = self
            .fields
            .keys()
            .map(|name| vec![Seg::Field(name.clone())])
            .collect();
        let mut done = 0usize;
        let mut round = 0usize;
        while !queue.is_empty() {
            let before = done;
            let mut next: Vec<Vec<Seg>> = Vec::new();
            for path in queue {
                let name = self.full_name(&cfg.var_name, &path);
                let attempt = {
                    let ctx = ResolveCtx {
                        var_name: &cfg.var_name,
                        fields: &self.fields,
                    };
                    let node = self.node(&path).expect("worklist paths stay valid");
                    match pass {
                        Pass::Bindings => node
                            .binding_stmt(&name, 1, 0, cfg, &ctx, custom)
                            .map(|stmt| vec![stmt]),
                        Pass::Filters => node.filter_stmts(&name, 1, cfg, &ctx),
                    }
                };
                match attempt {
                    Ok(stmts) => {
                        body.extend(stmts);
                        done += 1;
                        let node = self.node_mut(&path).expect("worklist paths stay valid");
                        match pass {
                            Pass::Bindings => node.mark_emitted(),
                            Pass::Filters => node.mark_filters_emitted(),
                        }
                        let node = self.node(&path).expect("worklist paths stay valid");
                        for seg in node.child_segs() {
                            let mut child = path.clone();
                            child.push(seg);
                            next.push(child);
                        }
                    }
                    Err(err) if err.is_unresolved() => next.push(path),
                    Err(err) => return Err(err),
                }
            }
            if done == before {
                let unresolved = next
                    .iter()
                    .map(|path| self.full_name(&cfg.var_name, path))
                    .collect();
                return Err(Error::CyclicDependency { unresolved });
            }
            round += 1;
            trace!(
                strategy = %self.name,
                round,
                rendered = done,
                pending = next.len(),
                "resolution round"
            );
            queue = next;
        }
        Ok(())
    }

    fn node(&self, path: &[Seg]) -> Option<&FieldGen> {
        let (first, rest) = path.split_first()?;
        let Seg::Field(name) = first else { return None };
        let mut node = self.fields.get(name)?;
        for seg in rest {
            node = node.descend(seg)?;
        }
        Some(node)
    }

    fn node_mut(&mut self, path: &[Seg]) -> Option<&mut FieldGen> {
        let (first, rest) = path.split_first()?;
        let Seg::Field(name) = first else { return None };
        let mut node = self.fields.get_mut(name)?;
        for seg in rest {
            node = node.descend_mut(seg)?;
        }
        Some(node)
    }

    fn full_name(&self, var: &str, path: &[Seg]) -> String {
        let mut name = var.to_owned();
        for seg in path {
            match seg {
                Seg::Field(field) => {
                    name.push('.');
                    name.push_str(field);
                }
                Seg::Index(i) => {
                    name.push('[');
                    name.push_str(&i.to_string());
                    name.push(']');
                }
            }
        }
        name
    }
}
