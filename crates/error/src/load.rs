//! Error types and utilities to do with loading serialized LLVM modules from
//! disk and registering them in the module store.

use thiserror::Error;

/// The result type for use when loading modules.
pub type Result<T> = std::result::Result<T, Error>;

/// This error type is for use during the process of reading serialized LLVM
/// modules and building the module store that the lowering engine consumes.
#[derive(Debug, Error)]
pub enum Error {
    /// Emitted when two loaded modules both define a packet-processing
    /// element with the same name.
    #[error("The element `{_0}` is defined by more than one loaded module")]
    DuplicateElement(String),

    /// Emitted when a module is registered under a path that the store has
    /// already loaded.
    #[error("A module has already been loaded from `{_0}`")]
    DuplicateModule(String),

    #[error("`{_0}` with invalid segment `{_1}` could not be parsed as an LLVM data layout")]
    InvalidDataLayoutSpecification(String, String),

    /// An error when doing IO while loading modules.
    #[error(transparent)]
    IOError(#[from] std::io::Error),

    /// An error encountered when deserializing a module from its on-disk
    /// representation.
    #[error("Could not parse serialized module: {_0}")]
    ParseError(#[from] serde_json::Error),

    /// Emitted when a requested element is not defined by any loaded module.
    #[error("No loaded module defines the element `{_0}`")]
    UnknownElement(String),

    /// Emitted when a requested function is not defined by any loaded module.
    #[error("No loaded module defines the function `{_0}`")]
    UnknownFunction(String),
}
