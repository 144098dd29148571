//! An interned model of the LLVM types that occur in the modules we process.
//!
//! Types are stored in a table and referred to by [`LlvmTypeId`]. The table
//! deduplicates the structural kinds (void, integers, floats, pointers and
//! arrays), so requesting `i32` twice yields the same identifier both times.
//! Named structs are deliberately _not_ deduplicated: they are declared as
//! placeholders first and have their bodies filled in later, which mirrors the
//! declare-then-define order in which they appear in a textual module.
//!
//! This model is deliberately partial. It covers the slice of the LLVM type
//! system that packet-processing elements compile down to, and nothing more.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// A reference to a type stored in a [`TypeTable`].
///
/// Identifiers are only meaningful for the table that produced them.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct LlvmTypeId(u32);

impl LlvmTypeId {
    /// Gets the position of the referenced type in its table.
    #[must_use]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// A single LLVM type, with any child types referred to by identifier.
///
/// Struct and opaque names are stored without the leading `%` sigil, so the
/// type written `%class.Counter` in a module has the name `class.Counter`
/// here.
#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub enum LlvmType {
    /// An array of `count` elements, each of type `element`.
    Array { element: LlvmTypeId, count: u64 },

    /// A floating-point type of the given bit width.
    Float { bits: u32 },

    /// An integer type of the given bit width.
    Int { bits: u32 },

    /// A named struct that has been declared but whose body is unknown.
    ///
    /// This is both the placeholder state of a struct between
    /// [`TypeTable::declare_struct`] and [`TypeTable::define_struct`], and the
    /// final state of structs whose bodies never appear in the module.
    Opaque { name: String },

    /// A pointer to a value of type `pointee`.
    Pointer { pointee: LlvmTypeId },

    /// A struct type; `name` is `None` for literal structs.
    Struct {
        name:   Option<String>,
        fields: Vec<LlvmTypeId>,
        packed: bool,
    },

    /// The void type.
    Void,
}

/// The table of types belonging to one module.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct TypeTable {
    /// The stored types, in the order they were created.
    types: Vec<LlvmType>,

    /// The deduplication index over the structural kinds in `types`.
    ///
    /// Struct and opaque types never appear here, as their entries in `types`
    /// can be redefined in place and the index would go stale.
    #[serde(skip)]
    interned: HashMap<LlvmType, LlvmTypeId>,
}

impl TypeTable {
    /// Creates an empty type table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Gets the type referenced by `id`.
    ///
    /// # Panics
    ///
    /// - If `id` does not come from this table.
    #[must_use]
    pub fn get(&self, id: LlvmTypeId) -> &LlvmType {
        &self.types[id.index()]
    }

    /// Gets the number of types in the table.
    #[must_use]
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// Checks if the table contains no types.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Iterates over all identifiers in the table.
    pub fn ids(&self) -> impl Iterator<Item = LlvmTypeId> + '_ {
        (0..self.types.len()).map(|index| {
            LlvmTypeId(
                u32::try_from(index)
                    .expect("internal consistency error: type table overflowed the id space"),
            )
        })
    }

    /// Gets the identifier for the void type.
    pub fn void_type(&mut self) -> LlvmTypeId {
        self.intern(LlvmType::Void)
    }

    /// Gets the identifier for the integer type of width `bits`.
    pub fn int_type(&mut self, bits: u32) -> LlvmTypeId {
        self.intern(LlvmType::Int { bits })
    }

    /// Gets the identifier for the floating-point type of width `bits`.
    pub fn float_type(&mut self, bits: u32) -> LlvmTypeId {
        self.intern(LlvmType::Float { bits })
    }

    /// Gets the identifier for the type of pointers to `pointee`.
    pub fn pointer_to(&mut self, pointee: LlvmTypeId) -> LlvmTypeId {
        self.intern(LlvmType::Pointer { pointee })
    }

    /// Gets the identifier for the type of arrays of `count` elements of
    /// type `element`.
    pub fn array_of(&mut self, element: LlvmTypeId, count: u64) -> LlvmTypeId {
        self.intern(LlvmType::Array { element, count })
    }

    /// Declares the named struct `name` without a body, returning its
    /// identifier.
    ///
    /// The body can be filled in later with [`Self::define_struct`]. A struct
    /// that is never defined stays opaque.
    pub fn declare_struct(&mut self, name: impl Into<String>) -> LlvmTypeId {
        self.push(LlvmType::Opaque { name: name.into() })
    }

    /// Fills in the body of the struct previously declared as `id`.
    ///
    /// # Panics
    ///
    /// - If `id` does not refer to a struct declared with
    ///   [`Self::declare_struct`] that is still opaque.
    pub fn define_struct(&mut self, id: LlvmTypeId, fields: Vec<LlvmTypeId>, packed: bool) {
        let LlvmType::Opaque { name } = &self.types[id.index()] else {
            panic!("internal consistency error: type {id:?} is not an opaque struct declaration");
        };
        let name = Some(name.clone());
        self.types[id.index()] = LlvmType::Struct {
            name,
            fields,
            packed,
        };
    }

    /// Creates a literal (unnamed) struct type.
    pub fn literal_struct(&mut self, fields: Vec<LlvmTypeId>, packed: bool) -> LlvmTypeId {
        self.push(LlvmType::Struct {
            name: None,
            fields,
            packed,
        })
    }

    /// Steps through aggregate types from `base`, taking the field at each
    /// index for structs and the element type for arrays.
    ///
    /// Returns `None` if any step does not resolve, such as an index past the
    /// end of a struct or a step into a non-aggregate.
    #[must_use]
    pub fn drill(&self, base: LlvmTypeId, indices: &[u32]) -> Option<LlvmTypeId> {
        let mut current = base;
        for &index in indices {
            current = match self.get(current) {
                LlvmType::Struct { fields, .. } => *fields.get(index as usize)?,
                LlvmType::Array { element, .. } => *element,
                _ => return None,
            };
        }
        Some(current)
    }

    /// Renders the type referenced by `id` the way a textual module would
    /// spell it.
    ///
    /// # Panics
    ///
    /// - If `id` does not come from this table.
    #[must_use]
    pub fn display(&self, id: LlvmTypeId) -> String {
        match self.get(id) {
            LlvmType::Void => "void".into(),
            LlvmType::Int { bits } => format!("i{bits}"),
            LlvmType::Float { bits } => match bits {
                16 => "half".into(),
                32 => "float".into(),
                64 => "double".into(),
                80 => "x86_fp80".into(),
                128 => "fp128".into(),
                _ => format!("f{bits}"),
            },
            LlvmType::Pointer { pointee } => format!("{}*", self.display(*pointee)),
            LlvmType::Array { element, count } => {
                format!("[{count} x {}]", self.display(*element))
            }
            LlvmType::Struct {
                name: Some(name), ..
            }
            | LlvmType::Opaque { name } => format!("%{name}"),
            LlvmType::Struct { fields, packed, .. } => {
                let fields = fields
                    .iter()
                    .map(|field| self.display(*field))
                    .collect::<Vec<_>>()
                    .join(", ");
                if *packed {
                    format!("<{{ {fields} }}>")
                } else {
                    format!("{{ {fields} }}")
                }
            }
        }
    }

    /// Rebuilds the deduplication index from the stored types.
    ///
    /// This must be called after deserializing a table, as the index is not
    /// part of the serialized form. The first occurrence of each structural
    /// kind wins, matching the order in which building the table interned
    /// them.
    pub fn rebuild_intern_index(&mut self) {
        self.interned.clear();
        for (index, ty) in self.types.iter().enumerate() {
            if matches!(ty, LlvmType::Struct { .. } | LlvmType::Opaque { .. }) {
                continue;
            }
            let id = LlvmTypeId(
                u32::try_from(index)
                    .expect("internal consistency error: type table overflowed the id space"),
            );
            self.interned.entry(ty.clone()).or_insert(id);
        }
    }

    /// Gets the identifier for `ty`, creating it only if no identical type is
    /// already stored.
    fn intern(&mut self, ty: LlvmType) -> LlvmTypeId {
        if let Some(id) = self.interned.get(&ty) {
            return *id;
        }
        let id = self.push(ty.clone());
        self.interned.insert(ty, id);
        id
    }

    /// Appends `ty` to the table unconditionally.
    fn push(&mut self, ty: LlvmType) -> LlvmTypeId {
        let id = LlvmTypeId(
            u32::try_from(self.types.len())
                .expect("internal consistency error: type table overflowed the id space"),
        );
        self.types.push(ty);
        id
    }
}
