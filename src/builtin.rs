//! Built-in scalar strategies: bound tables and emission templates for the
//! kinds every type universe starts from.

use crate::render::RenderConfig;
use crate::ros::{FloatType, IntType};

/// A built-in scalar strategy definition.
///
/// Numeric strategies render helper procedures that accept bound refinements
/// and validate them against the kind's absolute range at generation time, so
/// an impossible bound configuration is rejected when a sample is requested
/// rather than crashing strategy setup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuiltinStrategy {
    /// Boolean sampler.
    Bool,
    /// Bounded byte-string sampler.
    String,
    /// Instant built from two unsigned 32-bit draws.
    Time,
    /// Offset built from two signed 32-bit draws.
    Duration,
    /// The standard header record: a stamp and a frame id.
    Header,
    /// Bounded integer sampler for one width alias.
    Int(IntType),
    /// Bounded float sampler for one width.
    Float(FloatType),
}

impl BuiltinStrategy {
    /// Every built-in strategy, keyed by the type name it samples.
    pub(crate) fn all() -> Vec<(String, BuiltinStrategy)> {
        let mut out = vec![
            ("bool".to_owned(), BuiltinStrategy::Bool),
            ("string".to_owned(), BuiltinStrategy::String),
            ("time".to_owned(), BuiltinStrategy::Time),
            ("duration".to_owned(), BuiltinStrategy::Duration),
            ("std_msgs/Header".to_owned(), BuiltinStrategy::Header),
        ];
        for int in IntType::ALL {
            out.push((int.name().to_owned(), BuiltinStrategy::Int(int)));
        }
        for float in FloatType::ALL {
            out.push((float.name().to_owned(), BuiltinStrategy::Float(float)));
        }
        out
    }

    /// Name of the emitted procedure.
    pub fn name(&self) -> String {
        match self {
            BuiltinStrategy::Bool => "ros_bool".to_owned(),
            BuiltinStrategy::String => "ros_string".to_owned(),
            BuiltinStrategy::Time => "ros_time".to_owned(),
            BuiltinStrategy::Duration => "ros_duration".to_owned(),
            BuiltinStrategy::Header => "std_msgs_Header".to_owned(),
            BuiltinStrategy::Int(int) => format!("ros_{}", int.name()),
            BuiltinStrategy::Float(float) => format!("ros_{}", float.name()),
        }
    }

    /// Renders the strategy definition.
    pub fn render(&self, cfg: &RenderConfig) -> String {
        let ws = cfg.ws(0);
        let tab = " ".repeat(cfg.tab_size);
        let module = &cfg.module;
        match self {
            BuiltinStrategy::Bool => format!(
                "{ws}def ros_bool():\n\
                 {ws}{tab}return {module}.booleans()"
            ),
            BuiltinStrategy::String => format!(
                "{ws}def ros_string():\n\
                 {ws}{tab}return {module}.binary(min_size=0, max_size={})",
                cfg.max_string_len
            ),
            BuiltinStrategy::Time => format!(
                "{ws}@{module}.composite\n\
                 {ws}def ros_time(draw):\n\
                 {ws}{tab}secs = draw({module}.integers(min_value=0, max_value=4294967295))\n\
                 {ws}{tab}nsecs = draw({module}.integers(min_value=0, max_value=4294967295))\n\
                 {ws}{tab}return rospy.Time(secs, nsecs)"
            ),
            BuiltinStrategy::Duration => format!(
                "{ws}@{module}.composite\n\
                 {ws}def ros_duration(draw):\n\
                 {ws}{tab}secs = draw({module}.integers(min_value=-2147483648, max_value=2147483647))\n\
                 {ws}{tab}nsecs = draw({module}.integers(min_value=-2147483648, max_value=2147483647))\n\
                 {ws}{tab}return rospy.Duration(secs, nsecs)"
            ),
            BuiltinStrategy::Header => format!(
                "{ws}@{module}.composite\n\
                 {ws}def std_msgs_Header(draw):\n\
                 {ws}{tab}msg = std_msgs.Header()\n\
                 {ws}{tab}msg.stamp = draw(ros_time())\n\
                 {ws}{tab}msg.frame_id = draw(ros_string())\n\
                 {ws}{tab}return msg"
            ),
            BuiltinStrategy::Int(int) => {
                let (lo, hi) = int.bounds();
                let name = int.name();
                format!(
                    "{ws}def ros_{name}(min_value={lo}, max_value={hi}):\n\
                     {ws}{tab}if min_value < {lo} or max_value > {hi} or min_value > max_value:\n\
                     {ws}{tab}{tab}raise ValueError(\"values out of bounds: {{}}, {{}}\".format(min_value, max_value))\n\
                     {ws}{tab}return {module}.integers(min_value=min_value, max_value=max_value)"
                )
            }
            BuiltinStrategy::Float(float) => {
                let (lo, hi) = float.bounds();
                let name = float.name();
                let width = float.width();
                format!(
                    "{ws}def ros_{name}(min_value={lo:?}, max_value={hi:?}):\n\
                     {ws}{tab}if min_value < {lo:?} or max_value > {hi:?} or min_value > max_value:\n\
                     {ws}{tab}{tab}raise ValueError(\"values out of bounds: {{}}, {{}}\".format(min_value, max_value))\n\
                     {ws}{tab}return {module}.floats(min_value=min_value, max_value=max_value, width={width})"
                )
            }
        }
    }
}
