//! Rendering parameters for emitted generator code.

/// Controls the surface syntax of emitted strategies.
///
/// The emitted code targets a hypothesis-style randomized-testing backend: a
/// module exposing bounded numeric, string, boolean, and collection samplers,
/// a `draw` effect to bind sampled values, and an `assume` predicate to reject
/// unsuitable samples. Everything configurable here is cosmetic or a cap; the
/// statement ordering contracts are fixed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderConfig {
    /// Name of the backend module providing the samplers.
    pub module: String,
    /// Name of the instance variable built by each strategy.
    pub var_name: String,
    /// Base indentation of the emitted procedure, in spaces.
    pub indent: usize,
    /// Width of one indentation step, in spaces.
    pub tab_size: usize,
    /// Length cap for variable-length arrays.
    pub max_array_len: usize,
    /// Length cap for sampled strings.
    pub max_string_len: usize,
    /// Cap on inline nesting depth when array templates render their subtrees.
    pub max_depth: usize,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            module: "strategies".to_owned(),
            var_name: "msg".to_owned(),
            indent: 0,
            tab_size: 4,
            max_array_len: 256,
            max_string_len: 256,
            max_depth: 64,
        }
    }
}

impl RenderConfig {
    /// Whitespace for the given nesting level, counted from the procedure
    /// header.
    pub(crate) fn ws(&self, level: usize) -> String {
        " ".repeat(self.indent + level * self.tab_size)
    }

    /// Loop variable for the given array nesting depth: `i`, `i1`, `i2`, ...
    pub(crate) fn loop_var(&self, depth: usize) -> String {
        if depth == 0 {
            "i".to_owned()
        } else {
            format!("i{depth}")
        }
    }
}
