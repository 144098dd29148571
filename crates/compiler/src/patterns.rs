//! Name patterns for recognizing runtime and container classes.
//!
//! The native modules spell runtime types as named structs: `class.Packet`,
//! `class.Element`, `class.Vector` and so on, with the emitter appending
//! numeric suffixes such as `class.Vector.0` when a name is reused. Which
//! names mean what is a property of the runtime the elements were compiled
//! against, not of the engine, so the mapping lives in a table that callers
//! can replace wholesale when targeting a different runtime version.

/// The type-name patterns consulted during type lowering.
#[derive(Clone, Debug)]
pub struct ContainerPatterns {
    /// Name prefixes that lower to an opaque type without ever inspecting
    /// the struct body.
    pub opaque_prefixes: Vec<String>,

    /// The name of the common element base class.
    pub element_base: String,

    /// The packet class names, each tagged with whether it names an input
    /// packet.
    pub packet_names: Vec<(String, bool)>,

    /// The name prefix of the vector container template.
    pub vector_prefix: String,

    /// The name prefix of the map container template.
    pub map_prefix: String,
}

impl Default for ContainerPatterns {
    fn default() -> Self {
        Self {
            opaque_prefixes: vec!["class.Timer".into(), "class.String".into()],
            element_base:    "class.Element".into(),
            packet_names:    vec![
                ("class.Packet".into(), true),
                ("class.WritablePacket".into(), false),
            ],
            vector_prefix:   "class.Vector".into(),
            map_prefix:      "class.HashMap".into(),
        }
    }
}

impl ContainerPatterns {
    /// Checks whether `name` is a type the engine must not look inside.
    #[must_use]
    pub fn is_opaque(&self, name: &str) -> bool {
        self.opaque_prefixes.iter().any(|prefix| name.starts_with(prefix.as_str()))
    }

    /// Checks whether `name` is the element base class.
    #[must_use]
    pub fn is_element_base(&self, name: &str) -> bool {
        matches_exact(name, &self.element_base)
    }

    /// Gets whether `name` is a packet class, and if so whether it is the
    /// input flavor.
    #[must_use]
    pub fn packet_kind(&self, name: &str) -> Option<bool> {
        self.packet_names
            .iter()
            .find(|(candidate, _)| matches_exact(name, candidate))
            .map(|(_, is_input)| *is_input)
    }

    /// Checks whether `name` is an instantiation of the vector container.
    #[must_use]
    pub fn is_vector(&self, name: &str) -> bool {
        name.starts_with(self.vector_prefix.as_str())
    }

    /// Checks whether `name` is an instantiation of the map container.
    #[must_use]
    pub fn is_map(&self, name: &str) -> bool {
        name.starts_with(self.map_prefix.as_str())
    }
}

/// Checks whether `name` is `pattern` itself, or `pattern` followed by one
/// of the deduplication suffixes the native emitter appends, such as the
/// `.0` in `class.Packet.0`.
fn matches_exact(name: &str, pattern: &str) -> bool {
    match name.strip_prefix(pattern) {
        Some("") => true,
        Some(rest) => rest.starts_with('.'),
        None => false,
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use crate::patterns::ContainerPatterns;

    #[test]
    fn deduplication_suffixes_do_not_defeat_matching() {
        let patterns = ContainerPatterns::default();

        assert!(patterns.is_element_base("class.Element"));
        assert!(patterns.is_element_base("class.Element.2"));
        assert!(!patterns.is_element_base("class.ElementFilter"));
        assert_eq!(patterns.packet_kind("class.Packet.0"), Some(true));
        assert_eq!(patterns.packet_kind("class.WritablePacket"), Some(false));
        assert_eq!(patterns.packet_kind("class.PacketBatch"), None);
    }

    #[test]
    fn container_templates_match_by_prefix() {
        let patterns = ContainerPatterns::default();

        assert!(patterns.is_vector("class.Vector"));
        assert!(patterns.is_vector("class.Vector.4"));
        assert!(patterns.is_map("class.HashMap.1"));
        assert!(!patterns.is_map("class.Vector"));
        assert!(patterns.is_opaque("class.Timer"));
        assert!(!patterns.is_opaque("class.Counter"));
    }
}
