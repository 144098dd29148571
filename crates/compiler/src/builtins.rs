//! The registry of runtime functions the engine recognizes.
//!
//! Element code leans on a small runtime vocabulary: packet accessors, the
//! output-port push helper, the chatter logger, a handful of compiler
//! intrinsics and inline-assembly fragments. None of these carry a body
//! worth lowering, so the registry instead describes their signatures and
//! the engine materializes a built-in function for each on first use.
//!
//! Resolution tries exact symbol rules first and prefix rules second, so an
//! overloaded intrinsic family like `llvm.memcpy.*` needs only one entry.
//! Inline assembly is matched by template substring, as the surrounding
//! constraint syntax varies between compiler versions.

use std::collections::BTreeMap;

/// The types a built-in signature can mention.
///
/// Built-ins deal in packets and scalars only, which keeps this vocabulary
/// deliberately far smaller than the full HIR one.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum BuiltinType {
    /// A pointer to raw bytes.
    BytePtr,

    /// An integer of the given width.
    Int { bits: u32 },

    /// An input packet handle.
    Packet,

    /// No value.
    Void,
}

/// The signature of one recognized runtime function.
#[derive(Clone, Debug, PartialEq)]
pub struct BuiltinSpec {
    /// The readable name the built-in is materialized under.
    pub name: String,

    /// The parameter types.
    pub params: Vec<BuiltinType>,

    /// The return type.
    pub ret: BuiltinType,

    /// Set when call sites skip argument translation entirely, as they do
    /// for variadic loggers and assert failures whose arguments carry no
    /// packet-processing meaning.
    pub skip_args: bool,
}

/// The table mapping native symbols to built-in signatures.
#[derive(Clone, Debug)]
pub struct BuiltinRegistry {
    /// Exact-symbol rules.
    by_symbol: BTreeMap<String, BuiltinSpec>,

    /// Symbol-prefix rules, tried after the exact rules.
    prefix_rules: Vec<(String, BuiltinSpec)>,

    /// Inline-assembly rules, matched by template substring.
    asm_rules: Vec<(String, BuiltinSpec)>,
}

impl BuiltinRegistry {
    /// Creates a registry with no rules at all.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            by_symbol:    BTreeMap::new(),
            prefix_rules: Vec::new(),
            asm_rules:    Vec::new(),
        }
    }

    /// Registers an exact-symbol rule, replacing any previous rule for the
    /// same symbol.
    pub fn register(&mut self, symbol: impl Into<String>, spec: BuiltinSpec) {
        self.by_symbol.insert(symbol.into(), spec);
    }

    /// Registers a symbol-prefix rule.
    pub fn register_prefix(&mut self, prefix: impl Into<String>, spec: BuiltinSpec) {
        self.prefix_rules.push((prefix.into(), spec));
    }

    /// Registers an inline-assembly rule matching any template that
    /// contains `needle`.
    pub fn register_asm(&mut self, needle: impl Into<String>, spec: BuiltinSpec) {
        self.asm_rules.push((needle.into(), spec));
    }

    /// Finds the rule for the symbol `symbol`, exact rules first.
    #[must_use]
    pub fn match_symbol(&self, symbol: &str) -> Option<&BuiltinSpec> {
        if let Some(spec) = self.by_symbol.get(symbol) {
            return Some(spec);
        }
        self.prefix_rules
            .iter()
            .find(|(prefix, _)| symbol.starts_with(prefix.as_str()))
            .map(|(_, spec)| spec)
    }

    /// Finds the rule for the inline-assembly template `template`.
    #[must_use]
    pub fn match_asm(&self, template: &str) -> Option<&BuiltinSpec> {
        self.asm_rules
            .iter()
            .find(|(needle, _)| template.contains(needle.as_str()))
            .map(|(_, spec)| spec)
    }
}

impl Default for BuiltinRegistry {
    /// The vocabulary of the packet-processing runtime the engine targets.
    fn default() -> Self {
        use BuiltinType::{BytePtr, Int, Packet, Void};

        let mut registry = Self::empty();
        registry.register(
            "_ZNK6Packet4dataEv",
            spec("Packet::data", &[Packet], BytePtr),
        );
        registry.register(
            "_ZNK6Packet6lengthEv",
            spec("Packet::length", &[Packet], Int { bits: 32 }),
        );
        registry.register("_ZN6Packet4killEv", spec("Packet::kill", &[Packet], Void));
        registry.register(
            "_ZNK7Element6outputEi",
            spec("Element::output", &[BytePtr, Int { bits: 32 }], BytePtr),
        );
        registry.register(
            "_ZNK7Element4Port4pushEP6Packet",
            spec("Element::Port::push", &[BytePtr, Packet], Void),
        );
        registry.register("_Z13click_chatterPKcz", opaque_call("click_chatter"));
        registry.register("__assert_fail", opaque_call("__assert_fail"));
        registry.register_prefix(
            "llvm.memcpy",
            spec(
                "llvm.memcpy",
                &[BytePtr, BytePtr, Int { bits: 64 }, Int { bits: 1 }],
                Void,
            ),
        );

        // The byteswap idiom used for 16-bit network byte order fields.
        let bswap = spec("bswap16", &[Int { bits: 16 }], Int { bits: 16 });
        registry.register_asm("rorw $8", bswap.clone());
        registry.register_asm("rolw $8", bswap);

        registry
    }
}

/// A built-in whose call sites translate their arguments as usual.
fn spec(name: &str, params: &[BuiltinType], ret: BuiltinType) -> BuiltinSpec {
    BuiltinSpec {
        name:   name.into(),
        params: params.to_vec(),
        ret,
        skip_args: false,
    }
}

/// A built-in that is kept only as a call marker: its arguments are dropped
/// and it returns nothing.
fn opaque_call(name: &str) -> BuiltinSpec {
    BuiltinSpec {
        name:      name.into(),
        params:    Vec::new(),
        ret:       BuiltinType::Void,
        skip_args: true,
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use crate::builtins::{spec, BuiltinRegistry, BuiltinSpec, BuiltinType};

    fn name_of(found: Option<&BuiltinSpec>) -> Option<&str> {
        found.map(|spec| spec.name.as_str())
    }

    #[test]
    fn recognizes_the_default_runtime_vocabulary() {
        let registry = BuiltinRegistry::default();

        assert_eq!(
            name_of(registry.match_symbol("_ZN6Packet4killEv")),
            Some("Packet::kill")
        );
        assert_eq!(
            name_of(registry.match_symbol("llvm.memcpy.p0i8.p0i8.i64")),
            Some("llvm.memcpy")
        );
        assert_eq!(registry.match_symbol("_ZN7Counter4pushEiP6Packet"), None);
    }

    #[test]
    fn exact_rules_win_over_prefix_rules() {
        let mut registry = BuiltinRegistry::empty();
        registry.register_prefix("llvm.memcpy", spec("generic", &[], BuiltinType::Void));
        registry.register(
            "llvm.memcpy.p0i8.p0i8.i32",
            spec("exact", &[], BuiltinType::Void),
        );

        assert_eq!(
            name_of(registry.match_symbol("llvm.memcpy.p0i8.p0i8.i32")),
            Some("exact")
        );
        assert_eq!(
            name_of(registry.match_symbol("llvm.memcpy.p0i8.p0i8.i64")),
            Some("generic")
        );
    }

    #[test]
    fn inline_assembly_matches_by_substring() {
        let registry = BuiltinRegistry::default();

        assert_eq!(
            name_of(registry.match_asm("rorw $8, ${0:w}")),
            Some("bswap16")
        );
        assert_eq!(registry.match_asm("nop"), None);
    }

    #[test]
    fn variadic_helpers_skip_their_arguments() {
        let registry = BuiltinRegistry::default();

        let chatter = registry
            .match_symbol("_Z13click_chatterPKcz")
            .expect("the chatter logger is registered");
        assert!(chatter.skip_args);
        assert!(chatter.params.is_empty());
    }
}
