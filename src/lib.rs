#![deny(missing_docs)]
//! msg-smith: randomized-value generator synthesis for robot message types.
//!
//! Given a table of message type definitions (nested records with scalar,
//! numeric, composite, and array-typed fields), this crate builds, for every
//! type, a generator tree that respects the built-in type bounds, and on
//! demand named custom trees that additionally satisfy user constraints:
//! equality, inequality, ordering, set membership, and cross-field selector
//! references. Each tree renders to a ready-to-run generator procedure for a
//! hypothesis-style randomized-testing backend.
//!
//! # Key pieces
//!
//! - [`TypeTable`]: the validated type universe, consumed once at registry
//!   construction.
//! - [`StrategyMap`]: the registry of default and custom strategies.
//! - [`MsgStrategy`]: one generator tree; fields are reached with
//!   [`MsgStrategy::field_mut`] and constrained through the mutators on
//!   [`FieldGen`].
//! - [`Selector`]: a cross-field reference, built with
//!   [`MsgStrategy::selector`]; rendering orders field emission so every
//!   referenced field is generated before the field that references it, and
//!   reports genuine reference cycles as [`Error::CyclicDependency`].
//!
//! # Example
//!
//! ```ignore
//! use msg_smith::{RenderConfig, StrategyMap, TypeTable, TypeToken};
//!
//! let table = TypeTable::new(entries)?;
//! let mut registry = StrategyMap::new(table);
//!
//! let tree = registry.make_custom("m", "pkg/Msg")?;
//! tree.field_mut(&["count".into()])?.gte(1i64)?;
//! registry.complete_custom_strategies();
//!
//! let code = registry.render_custom("m", "pkg/Msg", &RenderConfig::default())?;
//! ```

mod builtin;
mod condition;
mod error;
mod field;
mod registry;
mod render;
mod ros;
mod selector;
mod strategy;
mod value;

pub use builtin::BuiltinStrategy;
pub use condition::Condition;
pub use error::Error;
pub use field::{FieldGen, PathStep};
pub use registry::{StrategyMap, TopStrategy};
pub use render::RenderConfig;
pub use ros::{Arity, FloatType, IntType, RosType, TypeTable, TypeToken};
pub use selector::{Selector, SelectorStep};
pub use strategy::MsgStrategy;
pub use value::Value;
