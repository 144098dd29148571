//! The in-memory representation of one serialized module, as produced by the
//! extraction step that runs over compiled element bitcode.
//!
//! Modules are stored on disk as JSON documents. Reading one restores the
//! type table's deduplication index, which is not part of the serialized
//! form, so a freshly read module behaves identically to a freshly built one.

use std::{
    collections::BTreeMap,
    fs::File,
    io::{BufReader, BufWriter, Read, Write},
    path::Path,
    str::FromStr,
};

use clift_errors::load::{Error, Result};
use serde::{Deserialize, Serialize};

use crate::{
    inst::LlvmInst,
    types::{LlvmTypeId, TypeTable},
};

/// A formal parameter of a function.
#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub struct LlvmParam {
    pub name: String,
    pub ty:   LlvmTypeId,
}

/// A basic block: a label and the instructions that run under it.
#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub struct LlvmBlock {
    pub label: String,
    pub insts: Vec<LlvmInst>,
}

/// A function, which is a declaration when it has no blocks.
#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub struct LlvmFunction {
    /// The mangled symbol name of the function.
    pub name: String,

    pub params: Vec<LlvmParam>,
    pub ret:    LlvmTypeId,
    pub blocks: Vec<LlvmBlock>,
}

impl LlvmFunction {
    /// Checks whether this function is a declaration without a body.
    #[must_use]
    pub fn is_declaration(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Gets the block with the given label, if it exists.
    #[must_use]
    pub fn block(&self, label: &str) -> Option<&LlvmBlock> {
        self.blocks.iter().find(|block| block.label == label)
    }
}

/// A module-level global variable.
///
/// `ty` is the type of the stored value; a reference to the global from an
/// instruction has pointer-to-`ty` type.
#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub struct LlvmGlobal {
    pub name: String,
    pub ty:   LlvmTypeId,
}

/// One serialized module.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct LlvmModule {
    /// The name of the translation unit this module came from.
    pub name: String,

    /// The target data layout string, in LLVM's `-`-separated format.
    pub data_layout: String,

    /// The types referenced anywhere in this module.
    pub types: TypeTable,

    /// The module's global variables, keyed by name.
    pub globals: BTreeMap<String, LlvmGlobal>,

    /// The module's functions, declarations included.
    pub functions: Vec<LlvmFunction>,
}

impl LlvmModule {
    /// Creates a new, empty module.
    #[must_use]
    pub fn new(name: &str, data_layout: &str) -> Self {
        Self {
            name: name.to_owned(),
            data_layout: data_layout.to_owned(),
            ..Self::default()
        }
    }

    /// Reads a module from the provided `reader`.
    ///
    /// # Errors
    ///
    /// - [`Error::ParseError`] if the stream does not contain a valid
    ///   serialized module.
    pub fn read(reader: impl Read) -> Result<Self> {
        let mut module: Self = serde_json::from_reader(reader)?;
        module.types.rebuild_intern_index();

        Ok(module)
    }

    /// Reads a module from the file at `path`.
    ///
    /// # Errors
    ///
    /// - [`Error::IOError`] if the file cannot be opened.
    /// - [`Error::ParseError`] if the file does not contain a valid
    ///   serialized module.
    pub fn read_from_file(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        Self::read(BufReader::new(file))
    }

    /// Writes the module to the provided `writer`.
    ///
    /// # Errors
    ///
    /// - [`Error::ParseError`] if the module cannot be serialized.
    pub fn write(&self, writer: impl Write) -> Result<()> {
        serde_json::to_writer_pretty(writer, self)?;

        Ok(())
    }

    /// Writes the module to the file at `path`.
    ///
    /// # Errors
    ///
    /// - [`Error::IOError`] if the file cannot be created.
    /// - [`Error::ParseError`] if the module cannot be serialized.
    pub fn write_to_file(&self, path: &Path) -> Result<()> {
        let file = File::create(path)?;
        self.write(BufWriter::new(file))
    }

    /// Gets the function with the given mangled `symbol` name, if the module
    /// contains one.
    #[must_use]
    pub fn function(&self, symbol: &str) -> Option<&LlvmFunction> {
        self.functions.iter().find(|func| func.name == symbol)
    }

    /// Iterates over the functions that have bodies in this module.
    pub fn defined_functions(&self) -> impl Iterator<Item = &LlvmFunction> {
        self.functions.iter().filter(|func| !func.is_declaration())
    }
}

impl FromStr for LlvmModule {
    type Err = Error;

    fn from_str(encoded: &str) -> Result<Self> {
        Self::read(encoded.as_bytes())
    }
}

#[cfg(test)]
mod test {
    use anyhow::Result;
    use pretty_assertions::assert_eq;

    use crate::{
        inst::{LlvmInst, LlvmValue},
        module::{LlvmBlock, LlvmFunction, LlvmModule, LlvmParam},
    };

    fn counter_module() -> LlvmModule {
        let mut module = LlvmModule::new("counter.cc", "e-m:e-i64:64-S128");
        let i32 = module.types.int_type(32);
        let void = module.types.void_type();
        let packet = module.types.declare_struct("class.Packet");
        let packet_ptr = module.types.pointer_to(packet);

        module.functions.push(LlvmFunction {
            name:   "_ZN7Counter4pushEiP6Packet".into(),
            params: vec![
                LlvmParam {
                    name: "port".into(),
                    ty:   i32,
                },
                LlvmParam {
                    name: "p".into(),
                    ty:   packet_ptr,
                },
            ],
            ret:    void,
            blocks: vec![LlvmBlock {
                label: "entry".into(),
                insts: vec![LlvmInst::Ret { value: None }],
            }],
        });
        module.functions.push(LlvmFunction {
            name:   "_ZN6Packet4killEv".into(),
            params: vec![LlvmParam {
                name: "this".into(),
                ty:   packet_ptr,
            }],
            ret:    void,
            blocks: Vec::new(),
        });

        module
    }

    // Successes

    #[test]
    fn can_round_trip_a_module() -> Result<()> {
        let module = counter_module();
        let mut encoded = Vec::new();
        module.write(&mut encoded)?;

        let decoded = LlvmModule::read(encoded.as_slice())?;
        assert_eq!(decoded, module);

        // Interning still works after a round trip.
        let mut decoded = decoded;
        let before = decoded.types.len();
        decoded.types.int_type(32);
        assert_eq!(decoded.types.len(), before);

        Ok(())
    }

    #[test]
    fn finds_functions_by_symbol() {
        let module = counter_module();

        assert!(module.function("_ZN7Counter4pushEiP6Packet").is_some());
        assert!(module.function("_ZN7Counter4pullEv").is_none());
        assert_eq!(module.defined_functions().count(), 1);
    }

    #[test]
    fn declarations_have_no_body() {
        let module = counter_module();
        let kill = module
            .function("_ZN6Packet4killEv")
            .expect("the declaration is present");

        assert!(kill.is_declaration());
    }

    // Failures

    #[test]
    fn rejects_malformed_input() {
        assert!("not a module".parse::<LlvmModule>().is_err());
    }
}
