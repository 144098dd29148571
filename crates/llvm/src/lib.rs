//! A deliberately partial model of the slice of LLVM IR that packet-processing
//! elements compile down to, together with the store that loads serialized
//! modules and discovers the elements defined in them.
//!
//! The model is context-free: modules are plain data read from JSON, with
//! types interned per module and values named symbolically. This keeps the
//! lowering passes independent of any particular LLVM installation or
//! version.

#![warn(clippy::all, clippy::cargo, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)] // Allows for better API naming
#![allow(clippy::multiple_crate_versions)] // Enforced by our dependencies

pub mod data_layout;
pub mod demangle;
pub mod inst;
pub mod module;
pub mod store;
pub mod symbols;
pub mod types;

pub use data_layout::DataLayout;
pub use inst::{Callee, CastOp, IcmpCond, LlvmInst, LlvmValue};
pub use module::{LlvmBlock, LlvmFunction, LlvmGlobal, LlvmModule, LlvmParam};
pub use store::IrStore;
pub use types::{LlvmType, LlvmTypeId, TypeTable};
