//! Packet-processing elements.
//!
//! An element groups the functions reachable from its packet entry point
//! together with the state slots carved out of its state struct. Each slot
//! is described by a variable minted in the entry function's arena, typed
//! as a state pointer and tagged with the slot index.

use std::collections::BTreeMap;

use crate::id::{FuncId, VarId};

/// A lowered packet-processing element.
#[derive(Clone, Debug)]
pub struct Element {
    /// The element's class name.
    pub name: String,

    /// Every function belonging to the element, entry point included.
    pub funcs: Vec<FuncId>,

    /// The function packets enter the element through.
    pub entry_func: FuncId,

    /// The element's state slots, keyed by slot index.
    ///
    /// Each value is the describing variable in the entry function's arena.
    pub states: BTreeMap<usize, VarId>,
}

impl Element {
    /// Creates an element called `name` with `entry_func` as its packet
    /// entry point.
    #[must_use]
    pub fn new(name: impl Into<String>, entry_func: FuncId) -> Self {
        Self {
            name:  name.into(),
            funcs: vec![entry_func],
            entry_func,
            states: BTreeMap::new(),
        }
    }

    /// Registers `func` as belonging to this element, once.
    pub fn add_func(&mut self, func: FuncId) {
        if !self.funcs.contains(&func) {
            self.funcs.push(func);
        }
    }

    /// Records `var` as the descriptor of the state slot at `index`.
    ///
    /// # Panics
    ///
    /// - If a descriptor for `index` was already recorded.
    pub fn add_state(&mut self, index: usize, var: VarId) {
        let previous = self.states.insert(index, var);
        assert!(
            previous.is_none(),
            "internal consistency error: state slot {index} added twice"
        );
    }
}
