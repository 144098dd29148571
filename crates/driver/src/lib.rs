//! The compiler driver, responsible for plumbing together the various
//! portions of the lowering process.
//!
//! The driver owns no state of its own. It wires the module store from
//! [`clift_llvm`], the lowering engine from [`clift_compiler`] and the
//! printer from [`clift_hir`] into the coarse operations the command-line
//! interface works in terms of: loading a set of inputs and lowering every
//! element they define, together with rendering helpers for the result.

#![warn(clippy::all, clippy::cargo, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)] // Allows for better API naming
#![allow(clippy::multiple_crate_versions)] // Enforced by our dependencies

use std::path::PathBuf;

use clift_compiler::LoweringBuilder;
use clift_errors::{load, lower};
use clift_hir::{Element, FunctionPrinter, Module};
use clift_llvm::IrStore;
use itertools::Itertools;
use tracing::info;

/// Loads every path in `inputs` into a fresh module store.
///
/// A path naming a file is read as a single serialized module. A path naming
/// a directory is scanned for `.json` module files, walking into
/// subdirectories when `recursive` is set.
///
/// # Errors
///
/// - [`load::Error`] if an input cannot be read or parsed, or if it clashes
///   with an already-loaded module or element.
pub fn load_inputs(inputs: &[PathBuf], recursive: bool) -> load::Result<IrStore> {
    let mut store = IrStore::new();
    for input in inputs {
        if input.is_dir() {
            store.load_directory(input, recursive)?;
        } else {
            store.load_file(input)?;
        }
    }

    info!(
        "{} modules loaded defining {} elements",
        store.n_modules(),
        store.elements().len()
    );

    Ok(store)
}

/// Lowers every element discovered in `store`, using the default builtin
/// and container-recognition tables.
///
/// # Errors
///
/// - [`lower::Error`] if any element body steps outside the supported
///   instruction set or refers to symbols that cannot be resolved.
pub fn lower_store(store: &IrStore) -> lower::Result<Module> {
    LoweringBuilder::new(store).build().run()
}

/// Renders `element` as a header line naming its state slots, followed by
/// every function lowered for it.
#[must_use]
pub fn render_element(module: &Module, element: &Element) -> String {
    let entry = module.func(element.entry_func);
    let mut header = format!("element {}", element.name);
    if !element.states.is_empty() {
        let slots = element
            .states
            .iter()
            .map(|(index, var)| format!("state {index} = %{}", entry.var(*var).name))
            .join(", ");
        header.push_str(&format!(" [{slots}]"));
    }

    let funcs = element
        .funcs
        .iter()
        .map(|func| FunctionPrinter::new(module, *func).to_string())
        .join("\n");

    format!("{header}\n\n{funcs}")
}

/// Renders every element of `module` in name order, followed by the
/// signatures of the built-in and declared functions they reference.
#[must_use]
pub fn render_module(module: &Module) -> String {
    let elements = module
        .elements
        .values()
        .map(|element| render_element(module, element));
    let declarations = module
        .funcs()
        .filter(|(_, func)| func.is_declaration())
        .map(|(id, _)| FunctionPrinter::new(module, id).to_string());

    elements.chain(declarations).join("\n")
}

/// Renders the single lowered function named `name`, if the module has one.
#[must_use]
pub fn render_function(module: &Module, name: &str) -> Option<String> {
    let func = module.lookup(name)?;
    Some(FunctionPrinter::new(module, func).to_string())
}
