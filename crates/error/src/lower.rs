//! Error types and utilities to do with lowering LLVM functions into the
//! packet-processing HIR.

use thiserror::Error;

/// The result type for use in the lowering engine.
pub type Result<T> = std::result::Result<T, Error>;

/// This error type is for use during the process of lowering LLVM IR to the
/// packet-processing HIR.
#[derive(Debug, Error)]
pub enum Error {
    /// Emitted when an `alloca` requests an element count that is not a
    /// compile-time constant, as stack allocations of dynamic extent have no
    /// HIR counterpart.
    #[error("The alloca `{_0}` has a dynamic element count")]
    DynamicAlloca(String),

    /// An error raised by the module store while the lowering engine was
    /// consulting it.
    #[error(transparent)]
    Load(#[from] crate::load::Error),

    /// Emitted when a function body does not satisfy the structural
    /// assumptions of the lowering engine.
    #[error("Malformed function `{_0}`: {_1}")]
    MalformedFunction(String, String),

    /// Emitted when we encounter an integer arithmetic opcode that we do not
    /// recognize.
    #[error("The arithmetic opcode `{_0}` is not supported")]
    UnknownArithOpcode(String),

    /// Emitted when a call targets a symbol that is neither a recognized
    /// builtin nor a function defined by any loaded module.
    #[error("Call to unknown function `{_0}`")]
    UnknownCallee(String),

    /// Emitted when a module contains an inline assembly fragment that the
    /// lowering engine has no translation for.
    #[error("The inline assembly `{_0}` is not supported")]
    UnknownInlineAsm(String),

    /// Emitted when we encounter an LLVM instruction that we do not support.
    #[error("The LLVM instruction `{_0}` is not supported")]
    UnsupportedInstruction(String),

    /// Emitted when we encounter an LLVM type that we do not support.
    #[error("The LLVM type {_0} is not supported")]
    UnsupportedType(String),
}
