//! The lowering context and the passes that run inside it.
//!
//! One [`LowerCtx`] spans one run of the engine over one [`IrStore`]. It
//! owns the module being built together with every piece of cross-function
//! bookkeeping: the type memo, the symbol-to-function mapping, the parsed
//! data layouts and the fresh-name generator. The passes themselves live in
//! the submodules, split the way the work splits:
//!
//! - [`types`] turns native type descriptors into HIR types.
//! - [`function`] assembles function skeletons and drives the three body
//!   passes.
//! - [`inst`] holds the per-instruction visitor.
//! - [`element`] discovers call graphs and assembles elements.

pub mod element;
pub mod function;
pub mod inst;
pub mod types;

use std::collections::{hash_map::Entry, HashMap};

use clift_errors::lower::Result;
use clift_hir::{FuncId, Function, Module, Type, TypeId};
use clift_llvm::{demangle, symbols, DataLayout, IrStore, LlvmFunction, LlvmTypeId};
use tracing::debug;

use crate::{
    builtins::{BuiltinRegistry, BuiltinSpec, BuiltinType},
    names::NameGen,
    patterns::ContainerPatterns,
};

/// The shared state of one lowering run.
///
/// A context lowers any number of elements out of one store. The type memo
/// and the symbol mapping span the whole run, so a function reachable from
/// two elements is lowered exactly once and shared.
pub struct LowerCtx<'a> {
    /// The store the native modules were loaded into.
    pub(crate) store: &'a IrStore,

    /// The module being built.
    pub(crate) module: Module,

    /// The HIR type each native descriptor lowered to, keyed by module
    /// index and native identifier.
    pub(crate) type_memo: HashMap<(usize, LlvmTypeId), TypeId>,

    /// The parsed data layout of each module consulted so far.
    pub(crate) layouts: HashMap<usize, DataLayout>,

    /// The HIR function registered for each native symbol.
    pub(crate) symbol_map: HashMap<String, FuncId>,

    /// The registry of recognized runtime functions.
    pub(crate) builtins: BuiltinRegistry,

    /// The type-name patterns consulted during type lowering.
    pub(crate) patterns: ContainerPatterns,

    /// The generator for fresh value names.
    pub(crate) names: NameGen,
}

impl<'a> LowerCtx<'a> {
    /// Creates a context lowering out of `store`.
    #[must_use]
    pub fn new(store: &'a IrStore, patterns: ContainerPatterns, builtins: BuiltinRegistry) -> Self {
        Self {
            store,
            module:     Module::new(),
            type_memo:  HashMap::new(),
            layouts:    HashMap::new(),
            symbol_map: HashMap::new(),
            builtins,
            patterns,
            names: NameGen::new(),
        }
    }

    /// Consumes the context, yielding the module it built.
    #[must_use]
    pub fn finish(self) -> Module {
        self.module
    }

    /// Gets the parsed data layout of the module at `index`, parsing it on
    /// first use.
    ///
    /// # Errors
    ///
    /// - [`clift_errors::load::Error::InvalidDataLayoutSpecification`] if
    ///   the module's layout string does not parse.
    pub(crate) fn native_layout(&mut self, index: usize) -> Result<&DataLayout> {
        match self.layouts.entry(index) {
            Entry::Occupied(slot) => Ok(slot.into_mut()),
            Entry::Vacant(slot) => {
                let layout = DataLayout::new(&self.store.module(index).data_layout)?;
                Ok(slot.insert(layout))
            }
        }
    }

    /// Gets the HIR function for the native function `native` of the module
    /// at `index`, registering a parameter-complete skeleton on first
    /// sight. Bodies are filled in separately, so a function can be
    /// referenced long before it is lowered.
    ///
    /// # Errors
    ///
    /// - Any type-lowering error raised by the signature.
    pub(crate) fn register_native(
        &mut self,
        index: usize,
        native: &LlvmFunction,
    ) -> Result<FuncId> {
        if let Some(id) = self.symbol_map.get(&native.name) {
            return Ok(*id);
        }

        let ret = self.lower_type(index, native.ret)?;
        let name = self.pick_name(&native.name);
        let mut func = Function::new(&name, ret);
        for (position, param) in native.params.iter().enumerate() {
            let ty = self.lower_type(index, param.ty)?;
            if param.name.is_empty() {
                func.add_param(format!("arg{position}"), ty);
            } else {
                func.add_param(&param.name, ty);
            }
        }

        let id = self.module.add_function(func);
        self.symbol_map.insert(native.name.clone(), id);
        debug!("registered `{}` as @{name}", native.name);
        Ok(id)
    }

    /// Gets the HIR function for the built-in `spec`, materializing it on
    /// first use.
    pub(crate) fn materialize_builtin(&mut self, spec: &BuiltinSpec) -> FuncId {
        if let Some(id) = self.module.lookup(&spec.name) {
            return id;
        }

        let ret = self.builtin_type(spec.ret);
        let mut func = Function::new(&spec.name, ret);
        for (position, &param) in spec.params.iter().enumerate() {
            let ty = self.builtin_type(param);
            func.add_param(format!("arg{position}"), ty);
        }
        func.is_built_in = true;

        debug!("materialized built-in `{}`", spec.name);
        self.module.add_function(func)
    }

    /// Lowers one type of the built-in vocabulary.
    fn builtin_type(&mut self, ty: BuiltinType) -> TypeId {
        match ty {
            BuiltinType::BytePtr => {
                let byte = self.module.types.int_type(8);
                self.module.types.add(Type::Pointer { pointee: byte })
            }
            BuiltinType::Int { bits } => self.module.types.int_type(bits),
            BuiltinType::Packet => self.module.types.add(Type::Packet { is_input: true }),
            BuiltinType::Void => self.module.types.add(Type::Void),
        }
    }

    /// Chooses the readable HIR name for the native symbol `symbol`.
    ///
    /// Demangled names lose their argument lists, so two overloads of one
    /// method collide; the first loser falls back to its full demangled
    /// signature, and any later one to a freshly numbered name.
    fn pick_name(&mut self, symbol: &str) -> String {
        let pretty = demangle::try_demangle(symbol);
        let base = symbols::strip_function_parens(&pretty);
        if self.module.lookup(base).is_none() {
            return base.to_string();
        }
        if self.module.lookup(&pretty).is_none() {
            return pretty;
        }
        loop {
            let candidate = self.names.fresh(base);
            if self.module.lookup(&candidate).is_none() {
                return candidate;
            }
        }
    }
}
