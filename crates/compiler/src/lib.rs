//! This library implements the engine that lowers serialized
//! [LLVM IR](https://llvm.org/docs/LangRef.html) extracted from compiled
//! packet-processing elements into the HIR defined by [`clift_hir`], so that
//! element push paths can be analyzed and transformed independently of the
//! toolchain that produced them.
//!
//! # Process Overview
//!
//! While more information can be found in the module-level documentation of
//! each part of this codebase, a brief overview of the lowering process can
//! be stated as follows:
//!
//! 1. We discover an element's entry function in the module store and walk
//!    the call graph to collect every function reachable from it.
//! 2. We translate the native types and instructions of those functions into
//!    the HIR's closed vocabulary, canonicalizing shapes the HIR does not
//!    keep (mirrored comparisons, switches, pointer-preserving casts) as we
//!    go.
//! 3. We assemble the element itself: the lowered functions, plus one state
//!    slot per field of the element's class struct.
//!
//! Calls into the element runtime are not followed. The [`builtins`]
//! registry recognizes them by symbol or by inline-assembly template and
//! replaces each with a declared built-in function, so a lowered element
//! ends at a small, explicit runtime boundary.

#![warn(clippy::all, clippy::cargo, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)] // Allows for better API naming
#![allow(clippy::multiple_crate_versions)] // Enforced by our dependencies

pub mod builtins;
pub mod lower;
pub mod names;
pub mod patterns;

use clift_errors::lower::Result;
use clift_hir::Module;
use clift_llvm::IrStore;

use crate::{builtins::BuiltinRegistry, lower::LowerCtx, patterns::ContainerPatterns};

/// Handles the lowering of loaded element modules to a [`Module`] of
/// packet-processing HIR.
///
/// Lowering is driven by the elements discovered in the store: each one is
/// walked from its push entry and everything reachable from there is
/// translated. Two kinds of call boundary shape the result:
///
/// 1. **Plain calls** between functions defined in the loaded modules are
///    followed, so an element's helper functions arrive together with its
///    entry point and calls between them always resolve.
/// 2. **Runtime calls** that the configured [`BuiltinRegistry`] claims are
///    cut off and replaced with declared built-in functions, keeping the
///    runtime below the element out of the output.
///
/// The compiled form of an element is free to spell a runtime operation as
/// a mangled symbol or as an inline-assembly fragment; both spellings
/// resolve through the same registry.
pub struct Lowering<'a> {
    /// The store of loaded modules to lower elements from.
    pub store: &'a IrStore,

    /// The patterns classifying the runtime's container and class types.
    pub patterns: ContainerPatterns,

    /// The registry of runtime calls to cut off and replace.
    pub builtins: BuiltinRegistry,
}

/// The basic operations required of the lowering engine.
impl<'a> Lowering<'a> {
    /// Constructs a new lowering over the provided `store`, classifying
    /// types through `patterns` and runtime calls through `builtins`.
    #[must_use]
    pub fn new(store: &'a IrStore, patterns: ContainerPatterns, builtins: BuiltinRegistry) -> Self {
        Self {
            store,
            patterns,
            builtins,
        }
    }

    /// Lowers every element discovered in the store into one HIR module.
    ///
    /// Note that this consumes the lowering, as the classification tables
    /// move into the run.
    ///
    /// # Errors
    ///
    /// - [`clift_errors::lower::Error`] if lowering any discovered element
    ///   fails.
    pub fn run(self) -> Result<Module> {
        let elements = self.store.elements();
        let mut ctx = LowerCtx::new(self.store, self.patterns, self.builtins);
        for (name, _) in elements {
            ctx.lower_element(name)?;
        }
        Ok(ctx.finish())
    }
}

/// Allows for building a [`Lowering`] instance while retaining the defaults
/// for fields that do not need to be customized.
pub struct LoweringBuilder<'a> {
    /// The store of loaded modules to lower elements from.
    store: &'a IrStore,

    /// The patterns classifying the runtime's container and class types.
    patterns: Option<ContainerPatterns>,

    /// The registry of runtime calls to cut off and replace.
    builtins: Option<BuiltinRegistry>,
}

impl<'a> LoweringBuilder<'a> {
    /// Creates a new lowering builder wrapping the provided store.
    ///
    /// The lowering's container patterns and built-in registry will be left
    /// as default unless specified otherwise by calling
    /// [`Self::with_patterns`] and [`Self::with_builtins`] respectively.
    ///
    /// # API Style
    ///
    /// Please note that the API for the builder consumes `self` and is hence
    /// designed to have calls chained in the "fluent" API style.
    #[must_use]
    pub fn new(store: &'a IrStore) -> Self {
        let patterns = None;
        let builtins = None;
        Self {
            store,
            patterns,
            builtins,
        }
    }

    /// Specifies the container and class patterns for the lowering.
    ///
    /// # API Style
    ///
    /// Please note that the API for the builder consumes `self` and is hence
    /// designed to have calls chained in the "fluent" API style.
    #[must_use]
    pub fn with_patterns(mut self, patterns: ContainerPatterns) -> Self {
        self.patterns = Some(patterns);
        self
    }

    /// Specifies the built-in registry for the lowering.
    ///
    /// # API Style
    ///
    /// Please note that the API for the builder consumes `self` and is hence
    /// designed to have calls chained in the "fluent" API style.
    #[must_use]
    pub fn with_builtins(mut self, builtins: BuiltinRegistry) -> Self {
        self.builtins = Some(builtins);
        self
    }

    /// Builds a lowering from the specified configuration.
    ///
    /// # API Style
    ///
    /// Please note that the API for the builder consumes `self` and is hence
    /// designed to have calls chained in the "fluent" API style.
    #[must_use]
    pub fn build(self) -> Lowering<'a> {
        Lowering::new(
            self.store,
            self.patterns.unwrap_or_default(),
            self.builtins.unwrap_or_default(),
        )
    }
}
