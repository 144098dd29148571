//! The lowered module: functions, elements and the shared type store.

use std::collections::BTreeMap;

use crate::{element::Element, function::Function, id::FuncId, types::TypeStore};

/// A module of lowered functions and the elements assembled from them.
#[derive(Clone, Debug, Default)]
pub struct Module {
    /// The types shared by every function in the module.
    pub types: TypeStore,

    /// The function arena.
    funcs: Vec<Function>,

    /// The identifier of each function, by name.
    mapping: BTreeMap<String, FuncId>,

    /// The lowered elements, by class name.
    pub elements: BTreeMap<String, Element>,
}

impl Module {
    /// Creates an empty module.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `func` to the module and indexes it by name.
    ///
    /// # Panics
    ///
    /// - If a function of the same name already exists.
    pub fn add_function(&mut self, func: Function) -> FuncId {
        let id = FuncId::from_index(self.funcs.len());
        let previous = self.mapping.insert(func.name.clone(), id);
        assert!(
            previous.is_none(),
            "internal consistency error: function `{}` added twice",
            func.name
        );
        self.funcs.push(func);
        id
    }

    /// Gets the function referenced by `id`.
    ///
    /// # Panics
    ///
    /// - If `id` does not come from this module.
    #[must_use]
    pub fn func(&self, id: FuncId) -> &Function {
        self.funcs
            .get(id.index())
            .expect("internal consistency error: function id out of range")
    }

    /// Gets the function referenced by `id` mutably.
    ///
    /// # Panics
    ///
    /// - If `id` does not come from this module.
    pub fn func_mut(&mut self, id: FuncId) -> &mut Function {
        self.funcs
            .get_mut(id.index())
            .expect("internal consistency error: function id out of range")
    }

    /// Iterates over all functions with their identifiers.
    pub fn funcs(&self) -> impl Iterator<Item = (FuncId, &Function)> {
        self.funcs
            .iter()
            .enumerate()
            .map(|(i, f)| (FuncId::from_index(i), f))
    }

    /// Looks up a function by name.
    #[must_use]
    pub fn lookup(&self, name: &str) -> Option<FuncId> {
        self.mapping.get(name).copied()
    }

    /// Gets the number of functions in the module.
    #[must_use]
    pub fn n_funcs(&self) -> usize {
        self.funcs.len()
    }
}
