//! The intermediate representation that packet-processing elements are
//! lowered into.
//!
//! A [`Module`] owns a shared [`TypeStore`] and an arena of [`Function`]s,
//! with [`Element`]s grouping the functions reachable from each packet
//! entry point. Within a function, variables, operations and blocks live in
//! flat arenas indexed by small typed identifiers, so the whole structure
//! is plain data: no interior references, cheap to clone, trivially
//! shippable between threads.
//!
//! The representation is deliberately small. Arithmetic is a closed
//! operator set, control flow lives on blocks rather than in the operation
//! stream, and everything packet-specific is expressed through dedicated
//! operations annotated with [`Note`]s.

#![warn(clippy::all, clippy::cargo, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)] // Allows for better API naming
#![allow(clippy::multiple_crate_versions)] // Enforced by our dependencies

pub mod block;
pub mod element;
pub mod function;
pub mod id;
pub mod module;
pub mod operation;
pub mod pktlayout;
pub mod print;
pub mod types;
pub mod value;

pub use block::{BasicBlock, CondBranch};
pub use element::Element;
pub use function::Function;
pub use id::{BlockId, FuncId, OpId, TypeId, VarId};
pub use module::Module;
pub use operation::{ArithKind, CmpCond, Note, OpKind, Operation};
pub use pktlayout::{HeaderField, HeaderLayout, PacketLayout};
pub use print::{DefaultOpPrinter, FunctionPrinter, OpPrinter};
pub use types::{StructField, Type, TypeStore};
pub use value::{Var, VarUse};
