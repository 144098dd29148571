//! The store of loaded modules, together with the element and function
//! indexes built over them.
//!
//! Elements are discovered by demangling every defined function and looking
//! for the push-entry signature `X::push(int, Packet*)`. The class qualifier
//! `X` becomes the element name, and must be unique across all loaded
//! modules. Plain functions may be defined in more than one module, in which
//! case the later definition wins, matching how a linker would resolve them.

use std::{collections::HashMap, path::Path};

use bimap::BiMap;
use clift_errors::load::{Error, Result};
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::{
    demangle,
    module::{LlvmFunction, LlvmModule},
};

/// The demangled signature suffix that identifies an element's entry
/// function.
const PUSH_SIGNATURE: &str = "::push(int, Packet*)";

/// The set of loaded modules and the indexes used to find elements and
/// functions across them.
#[derive(Debug, Default)]
pub struct IrStore {
    /// The loaded modules, in load order.
    modules: Vec<LlvmModule>,

    /// The source each module was loaded from, to reject double loads.
    sources: HashMap<String, usize>,

    /// Element names and the mangled symbols of their entry functions.
    elements: BiMap<String, String>,

    /// The module that defines each symbol. Later definitions win.
    functions: HashMap<String, usize>,
}

impl IrStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `module` to the store, indexing its definitions. The `source` is
    /// an arbitrary identifier for where the module came from, usually a file
    /// path.
    ///
    /// # Errors
    ///
    /// - [`Error::DuplicateModule`] if a module has already been added under
    ///   `source`.
    /// - [`Error::DuplicateElement`] if the module defines an element that a
    ///   previously added module also defines. The store is left unchanged in
    ///   this case.
    pub fn add_module(&mut self, source: &str, module: LlvmModule) -> Result<()> {
        if self.sources.contains_key(source) {
            return Err(Error::DuplicateModule(source.to_string()));
        }

        // Discover elements before touching the indexes, so a rejected module
        // leaves the store untouched.
        let mut new_elements = Vec::new();
        for func in module.defined_functions() {
            let Some(demangled) = demangle::demangle(&func.name) else {
                continue;
            };
            let Some(element) = demangled.strip_suffix(PUSH_SIGNATURE) else {
                continue;
            };
            let already_known = self.elements.contains_left(element)
                || new_elements.iter().any(|(name, _)| name == element);
            if already_known {
                return Err(Error::DuplicateElement(element.to_string()));
            }
            new_elements.push((element.to_string(), func.name.clone()));
        }

        let index = self.modules.len();
        for func in module.defined_functions() {
            if self.functions.insert(func.name.clone(), index).is_some() {
                debug!(
                    "function `{}` is defined in more than one module; the later one wins",
                    func.name
                );
            }
        }
        for (element, symbol) in new_elements {
            debug!("element `{element}` enters through `{symbol}`");
            self.elements.insert(element, symbol);
        }

        self.sources.insert(source.to_string(), index);
        self.modules.push(module);

        Ok(())
    }

    /// Loads the module in the file at `path` and adds it to the store.
    ///
    /// # Errors
    ///
    /// - [`Error::IOError`] if the file cannot be read.
    /// - [`Error::ParseError`] if the file does not contain a valid
    ///   serialized module.
    /// - Any error [`Self::add_module`] can produce.
    pub fn load_file(&mut self, path: &Path) -> Result<()> {
        let module = LlvmModule::read_from_file(path)?;
        info!("loaded module `{}` from {}", module.name, path.display());
        self.add_module(&path.display().to_string(), module)
    }

    /// Loads every `.json` module file in the directory at `path`, walking
    /// into subdirectories when `recursive` is set.
    ///
    /// # Errors
    ///
    /// - [`Error::IOError`] if the directory cannot be walked.
    /// - Any error [`Self::load_file`] can produce.
    pub fn load_directory(&mut self, path: &Path, recursive: bool) -> Result<()> {
        let mut walker = WalkDir::new(path).sort_by_file_name();
        if !recursive {
            walker = walker.max_depth(1);
        }

        for entry in walker {
            let entry = entry.map_err(std::io::Error::from)?;
            let is_module = entry.file_type().is_file()
                && entry.path().extension().is_some_and(|ext| ext == "json");
            if is_module {
                self.load_file(entry.path())?;
            }
        }

        Ok(())
    }

    /// Gets the number of loaded modules.
    #[must_use]
    pub fn n_modules(&self) -> usize {
        self.modules.len()
    }

    /// Gets the module at `index`.
    ///
    /// # Panics
    ///
    /// - If `index` is not the index of a loaded module.
    #[must_use]
    pub fn module(&self, index: usize) -> &LlvmModule {
        &self.modules[index]
    }

    /// Iterates over the loaded modules in load order.
    pub fn modules(&self) -> impl Iterator<Item = &LlvmModule> {
        self.modules.iter()
    }

    /// Lists the discovered elements and their entry symbols, sorted by
    /// element name.
    #[must_use]
    pub fn elements(&self) -> Vec<(&str, &str)> {
        let mut elements = self
            .elements
            .iter()
            .map(|(name, symbol)| (name.as_str(), symbol.as_str()))
            .collect::<Vec<_>>();
        elements.sort_unstable();
        elements
    }

    /// Finds the entry function of the element called `name`, along with the
    /// index of the module that defines it.
    #[must_use]
    pub fn find_element_entry(&self, name: &str) -> Option<(usize, &LlvmFunction)> {
        let symbol = self.elements.get_by_left(name)?;
        self.find_function(symbol)
    }

    /// Finds the definition of `symbol`, along with the index of the module
    /// that defines it.
    #[must_use]
    pub fn find_function(&self, symbol: &str) -> Option<(usize, &LlvmFunction)> {
        let index = *self.functions.get(symbol)?;
        let func = self.modules[index].function(symbol)?;
        Some((index, func))
    }

    /// Gets the name of the element whose entry function is `symbol`, if
    /// there is one.
    #[must_use]
    pub fn entry_element(&self, symbol: &str) -> Option<&str> {
        self.elements.get_by_right(symbol).map(String::as_str)
    }
}
