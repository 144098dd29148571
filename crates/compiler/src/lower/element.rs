//! Element assembly.
//!
//! An element is lowered by walking the call graph from its push entry and
//! lowering every function it can reach, then carving the element's class
//! struct into state slots. Slots are described by variables in the entry
//! function's arena, typed as state pointers, so later passes can tell
//! state access apart from ordinary memory traffic.

use std::collections::{HashSet, VecDeque};

use clift_errors::{load, lower::Result};
use clift_hir::{Element, FuncId, Type, Var};
use clift_llvm::{Callee, LlvmFunction, LlvmInst, LlvmType};
use itertools::Itertools;
use tracing::{debug, info};

use crate::lower::LowerCtx;

impl<'a> LowerCtx<'a> {
    /// Lowers the element called `name` and records it in the output module.
    ///
    /// Every function reachable from the element's entry point through plain
    /// calls is lowered along with it. Calls the built-in registry claims
    /// stop the walk, so the runtime below the element is never pulled in.
    ///
    /// # Errors
    ///
    /// - [`load::Error::UnknownElement`] if no loaded module defines an
    ///   element called `name`.
    /// - Any error lowering a reachable function can produce.
    pub fn lower_element(&mut self, name: &str) -> Result<()> {
        let store = self.store;
        let Some((entry_module, entry)) = store.find_element_entry(name) else {
            return Err(load::Error::UnknownElement(name.to_string()).into());
        };
        info!("lowering element `{name}`");

        // Everything reachable is registered before any body is lowered, so
        // calls between element functions always resolve.
        let reachable = self.reachable_functions(entry_module, entry);
        let mut ids = Vec::with_capacity(reachable.len());
        for &(index, native) in &reachable {
            ids.push(self.register_native(index, native)?);
        }

        // A function can be reachable from more than one element; its body
        // is only lowered the first time.
        for (&(index, native), &id) in reachable.iter().zip(&ids) {
            if self.module.func(id).is_declaration() {
                self.lower_body(index, id, native)?;
            }
        }

        // The reachable set starts with the entry function itself.
        let mut element = Element::new(name, ids[0]);
        for &id in &ids[1..] {
            element.add_func(id);
        }
        self.attach_state(&mut element, entry_module, ids[0])?;

        info!(
            "element `{name}` lowered: {} functions, {} state slots",
            element.funcs.len(),
            element.states.len()
        );
        self.module.elements.insert(name.to_string(), element);
        Ok(())
    }

    /// Collects the functions reachable from `entry` through plain symbol
    /// calls, entry first, skipping anything the built-in registry claims.
    fn reachable_functions(
        &self,
        entry_module: usize,
        entry: &'a LlvmFunction,
    ) -> Vec<(usize, &'a LlvmFunction)> {
        let store = self.store;
        let mut order = vec![(entry_module, entry)];
        let mut seen = HashSet::from([entry.name.as_str()]);
        let mut work = VecDeque::from([entry]);

        while let Some(native) = work.pop_front() {
            let callees = native
                .blocks
                .iter()
                .flat_map(|block| &block.insts)
                .filter_map(|inst| match inst {
                    LlvmInst::Call { callee: Callee::Symbol(symbol), .. } => Some(symbol.as_str()),
                    _ => None,
                })
                .unique();
            for symbol in callees {
                if seen.contains(symbol) || self.builtins.match_symbol(symbol).is_some() {
                    continue;
                }
                let Some((index, found)) = store.find_function(symbol) else {
                    continue;
                };
                seen.insert(symbol);
                order.push((index, found));
                work.push_back(found);
            }
        }

        order
    }

    /// Carves the fields of the element's class struct into state slots on
    /// the entry function. Slot indexes are field indexes, so the slot after
    /// the element base is slot 1.
    fn attach_state(&mut self, element: &mut Element, module: usize, entry: FuncId) -> Result<()> {
        let store = self.store;
        let types = &store.module(module).types;
        let class_name = format!("class.{}", element.name);

        let mut class_fields = None;
        for id in types.ids() {
            let LlvmType::Struct { name: Some(name), fields, .. } = types.get(id) else {
                continue;
            };
            if *name == class_name {
                class_fields = Some(fields);
                break;
            }
        }
        let Some(fields) = class_fields else {
            debug!("element `{}` defines no class struct; it carries no state", element.name);
            return Ok(());
        };

        for (index, &field) in fields.iter().enumerate() {
            let is_base = matches!(
                types.get(field),
                LlvmType::Struct { name: Some(name), .. } | LlvmType::Opaque { name }
                    if self.patterns.is_element_base(name)
            );
            // The leading element-base field is the shared header, not state.
            if index == 0 && is_base {
                continue;
            }

            self.lower_type(module, field)?;

            let slot_name = format!("{}::state{index}", element.name);
            let ty = self.module.types.add(Type::StatePtr {
                name: slot_name.clone(),
            });
            let var = Var {
                state_slot: Some(index),
                ..Var::new(slot_name, ty)
            };
            let id = self.module.func_mut(entry).add_var(var);
            element.add_state(index, id);
        }

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use clift_errors::{load, lower::Error};
    use clift_hir::{Module, Type};
    use clift_llvm::IrStore;
    use clift_test_input::{classifier_module, counter_module, malformed_module, BROKEN_PUSH};
    use pretty_assertions::assert_eq;

    use crate::{builtins::BuiltinRegistry, lower::LowerCtx, patterns::ContainerPatterns};

    fn lower_one(store: &IrStore, name: &str) -> clift_errors::lower::Result<Module> {
        let mut ctx = LowerCtx::new(
            store,
            ContainerPatterns::default(),
            BuiltinRegistry::default(),
        );
        ctx.lower_element(name)?;
        Ok(ctx.finish())
    }

    // Successes

    #[test]
    fn lowers_a_counter_element_end_to_end() -> anyhow::Result<()> {
        let mut store = IrStore::new();
        store.add_module("counter.json", counter_module())?;
        let module = lower_one(&store, "Counter")?;

        let element = &module.elements["Counter"];
        let entry = module.lookup("Counter::push").expect("the entry is lowered");
        assert_eq!(element.entry_func, entry);
        assert_eq!(element.funcs, vec![entry]);

        // The i64 after the element base becomes slot 1.
        assert_eq!(element.states.len(), 1);
        let slot = element.states[&1];
        let var = module.func(entry).var(slot);
        assert_eq!(var.name, "Counter::state1");
        assert_eq!(var.state_slot, Some(1));
        assert!(matches!(module.types.get(var.ty), Type::StatePtr { .. }));

        // The packet calls were intercepted by the built-in registry.
        let length = module.lookup("Packet::length").expect("the built-in exists");
        assert!(module.func(length).is_built_in);
        assert!(module.func(entry).callees.contains(&length));
        Ok(())
    }

    #[test]
    fn reaches_helper_functions_through_calls() -> anyhow::Result<()> {
        let mut store = IrStore::new();
        store.add_module("classifier.json", classifier_module())?;
        let module = lower_one(&store, "Classifier")?;

        let element = &module.elements["Classifier"];
        assert_eq!(element.funcs.len(), 2);
        assert!(element.states.is_empty());

        let tag = module.lookup("Classifier::tag").expect("the helper is reachable");
        assert!(element.funcs.contains(&tag));
        assert!(!module.func(tag).is_declaration());
        Ok(())
    }

    // Failures

    #[test]
    fn unknown_elements_are_rejected() {
        let store = IrStore::new();
        let result = lower_one(&store, "Ghost");
        assert!(matches!(
            result,
            Err(Error::Load(load::Error::UnknownElement(name))) if name == "Ghost"
        ));
    }

    #[test]
    fn malformed_bodies_fail_the_element() -> anyhow::Result<()> {
        let mut store = IrStore::new();
        store.add_module("broken.json", malformed_module())?;

        let result = lower_one(&store, "Broken");
        assert!(matches!(
            result,
            Err(Error::MalformedFunction(symbol, _)) if symbol == BROKEN_PUSH
        ));
        Ok(())
    }
}
