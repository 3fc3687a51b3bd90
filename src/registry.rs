//! The strategy registry: default trees for every known type, plus named
//! groups of constraint-augmented custom trees.

use std::collections::BTreeMap;
use std::collections::VecDeque;
use std::sync::Arc;

use tracing::debug;

use crate::builtin::BuiltinStrategy;
use crate::error::Error;
use crate::render::RenderConfig;
use crate::ros::{RosType, TypeTable, HEADER_TYPE};
use crate::strategy::MsgStrategy;

/// A top-level strategy definition: a built-in scalar sampler or a message
/// tree.
#[derive(Debug, Clone)]
pub enum TopStrategy {
    /// A built-in scalar strategy.
    Builtin(BuiltinStrategy),
    /// A message generator tree.
    Msg(MsgStrategy),
}

impl TopStrategy {
    /// Name of the emitted procedure.
    pub fn name(&self) -> String {
        match self {
            TopStrategy::Builtin(builtin) => builtin.name(),
            TopStrategy::Msg(strategy) => strategy.name().to_owned(),
        }
    }

    /// Renders the strategy definition.
    pub fn render(&mut self, cfg: &RenderConfig) -> Result<String, Error> {
        match self {
            TopStrategy::Builtin(builtin) => Ok(builtin.render(cfg)),
            TopStrategy::Msg(strategy) => strategy.render(cfg),
        }
    }
}

/// Registry of generator strategies over one type table.
///
/// Construction builds a default tree for every type in the table, next to
/// the built-in scalar strategies. Custom trees are created on demand under a
/// named group, mutated by attaching constraints and selectors to their
/// fields, completed once with [`StrategyMap::complete_custom_strategies`],
/// and then rendered.
#[derive(Debug)]
pub struct StrategyMap {
    table: Arc<TypeTable>,
    defaults: BTreeMap<String, TopStrategy>,
    custom: BTreeMap<String, BTreeMap<String, MsgStrategy>>,
}

impl StrategyMap {
    /// Builds the registry: built-in strategies plus one default tree per
    /// declared message type.
    pub fn new(table: TypeTable) -> Self {
        let table = Arc::new(table);
        let mut defaults = BTreeMap::new();
        for (key, builtin) in BuiltinStrategy::all() {
            defaults.insert(key, TopStrategy::Builtin(builtin));
        }
        for (msg_type, _) in table.iter() {
            defaults.insert(
                msg_type.clone(),
                TopStrategy::Msg(MsgStrategy::new_default(msg_type, Arc::clone(&table))),
            );
        }
        debug!(
            types = table.len(),
            strategies = defaults.len(),
            "built default strategies"
        );
        Self {
            table,
            defaults,
            custom: BTreeMap::new(),
        }
    }

    /// The type table this registry was built over.
    pub fn table(&self) -> &TypeTable {
        &self.table
    }

    /// Looks up the default strategy for a type name (builtin or message).
    pub fn default_strategy(&self, ros_type: &str) -> Option<&TopStrategy> {
        self.defaults.get(ros_type)
    }

    /// Looks up a custom tree.
    pub fn get_custom(&self, group: &str, msg_type: &str) -> Option<&MsgStrategy> {
        self.custom.get(group)?.get(msg_type)
    }

    /// Mutable access to a custom tree, for attaching constraints.
    pub fn get_custom_mut(&mut self, group: &str, msg_type: &str) -> Option<&mut MsgStrategy> {
        self.custom.get_mut(group)?.get_mut(msg_type)
    }

    /// Creates one fresh, unconstrained custom tree for `msg_type` under
    /// `group`.
    ///
    /// Errors when the type is unknown or the (group, type) pair already
    /// exists.
    pub fn make_custom(&mut self, group: &str, msg_type: &str) -> Result<&mut MsgStrategy, Error> {
        if !self.table.contains(msg_type) {
            return Err(Error::UnknownType(msg_type.to_owned()));
        }
        let entry = self.custom.entry(group.to_owned()).or_default();
        if entry.contains_key(msg_type) {
            return Err(Error::AlreadyDefined {
                group: group.to_owned(),
                msg_type: msg_type.to_owned(),
            });
        }
        let name = custom_name(group, msg_type);
        let strategy = MsgStrategy::new_custom(msg_type, name, Arc::clone(&self.table));
        Ok(entry.entry(msg_type.to_owned()).or_insert(strategy))
    }

    /// Creates custom trees for `msg_type` and the whole transitive closure of
    /// record types reachable from it, breadth-first over the type table.
    ///
    /// Use this when constraints must later be attached to dependencies at
    /// arbitrary depth, not only the root: record fields of the group's trees
    /// then draw from the group-local strategies. Types already present in the
    /// group are reused, not recreated; only an already-present root is a
    /// redefinition error.
    pub fn make_custom_tree(
        &mut self,
        group: &str,
        msg_type: &str,
    ) -> Result<&mut MsgStrategy, Error> {
        if self
            .custom
            .get(group)
            .is_some_and(|entry| entry.contains_key(msg_type))
        {
            return Err(Error::AlreadyDefined {
                group: group.to_owned(),
                msg_type: msg_type.to_owned(),
            });
        }
        let mut queue = VecDeque::from([msg_type.to_owned()]);
        while let Some(current) = queue.pop_front() {
            if !self.table.contains(&current) {
                return Err(Error::UnknownType(current));
            }
            let entry = self.custom.entry(group.to_owned()).or_default();
            if entry.contains_key(&current) {
                continue;
            }
            let name = custom_name(group, &current);
            entry.insert(
                current.clone(),
                MsgStrategy::new_custom(&current, name, Arc::clone(&self.table)),
            );
            debug!(group, msg_type = %current, "created custom strategy");
            let decl = self
                .table
                .get(&current)
                .expect("presence checked above");
            for token in decl.values() {
                if let RosType::Message(dep) = &token.ros_type {
                    if dep != HEADER_TYPE {
                        queue.push_back(dep.clone());
                    }
                }
            }
        }
        Ok(self
            .custom
            .get_mut(group)
            .and_then(|entry| entry.get_mut(msg_type))
            .expect("root created by the walk"))
    }

    /// Back-fills every untouched field of every custom tree with a clone of
    /// the matching default field node.
    ///
    /// Invoke once, after all constraints are attached and before rendering;
    /// afterwards each custom tree's field set is a superset (by name) of the
    /// default's.
    pub fn complete_custom_strategies(&mut self) {
        let mut inherited = 0usize;
        for strategies in self.custom.values_mut() {
            for (msg_type, strategy) in strategies.iter_mut() {
                if let Some(TopStrategy::Msg(default)) = self.defaults.get(msg_type) {
                    let before = strategy.fields().count();
                    strategy.adopt_missing_from(default);
                    inherited += strategy.fields().count() - before;
                }
            }
        }
        debug!(fields = inherited, "completed custom strategies");
    }

    /// Renders the default strategy for a type name.
    pub fn render_default(&mut self, ros_type: &str, cfg: &RenderConfig) -> Result<String, Error> {
        self.defaults
            .get_mut(ros_type)
            .ok_or_else(|| Error::UnknownType(ros_type.to_owned()))?
            .render(cfg)
    }

    /// Renders a custom tree. Record fields whose type has a custom tree in
    /// the same group draw from the group-local strategy.
    pub fn render_custom(
        &mut self,
        group: &str,
        msg_type: &str,
        cfg: &RenderConfig,
    ) -> Result<String, Error> {
        let names: BTreeMap<String, String> = self
            .custom
            .get(group)
            .map(|entry| {
                entry
                    .iter()
                    .map(|(ty, strategy)| (ty.clone(), strategy.name().to_owned()))
                    .collect()
            })
            .unwrap_or_default();
        let strategy = self
            .custom
            .get_mut(group)
            .and_then(|entry| entry.get_mut(msg_type))
            .ok_or_else(|| Error::UnknownType(msg_type.to_owned()))?;
        strategy.render_with(cfg, &names)
    }
}

fn custom_name(group: &str, msg_type: &str) -> String {
    format!("{group}_{}", msg_type.replace('/', "_"))
}
