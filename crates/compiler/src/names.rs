//! Deterministic generation of fresh value names.

use std::collections::HashMap;

/// Mints names of the form `prefix_N`, counting per prefix from zero.
///
/// One generator is scoped to one lowering run, so running the engine twice
/// over the same input yields byte-identical output.
#[derive(Debug, Default)]
pub struct NameGen {
    /// The next free number for each prefix.
    counters: HashMap<String, usize>,
}

impl NameGen {
    /// Creates a generator with every counter at zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Produces the next free name for `prefix`.
    pub fn fresh(&mut self, prefix: &str) -> String {
        let counter = self.counters.entry(prefix.to_string()).or_insert(0);
        let name = format!("{prefix}_{counter}");
        *counter += 1;
        name
    }
}
