//! The type system of the lowered IR.
//!
//! Types live in a [`TypeStore`] and are referred to by [`TypeId`]. Integer
//! types are canonicalized through a width cache, so every request for `i32`
//! yields the same identifier. Struct types are created as empty shells and
//! have their bodies filled in afterwards, which lets self-referential state
//! structs be built without special cases.
//!
//! A type is either *sized*, meaning values of it occupy a known number of
//! bytes, or *abstract*, meaning it only ever appears behind an opaque
//! handle: element state, packet handles, runtime containers.

use std::collections::HashMap;

use crate::id::TypeId;

/// The number of bytes a pointer occupies on our targets.
const POINTER_BYTES: u64 = 8;

/// One field of a struct type: the field's type and its byte offset from the
/// start of the struct.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct StructField {
    pub ty:     TypeId,
    pub offset: u64,
}

/// A single type, with any child types referred to by identifier.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Type {
    /// An array of `count` values of type `element`.
    Array { element: TypeId, count: u64 },

    /// The base part every element's state struct starts with.
    ElementBase,

    /// A floating-point type of the given bit width.
    Float { bits: u32 },

    /// An integer type of the given bit width.
    Int { bits: u32 },

    /// A runtime map container from `key` to `value`.
    Map { key: TypeId, value: TypeId },

    /// A type we cannot inspect further, identified by name.
    Opaque { name: String },

    /// A packet handle. `is_input` distinguishes the packet an element was
    /// invoked on from packets it creates itself.
    Packet { is_input: bool },

    /// A pointer to a value of type `pointee`.
    Pointer { pointee: TypeId },

    /// A handle to the element state slot called `name`.
    StatePtr { name: String },

    /// A struct with known fields at known byte offsets.
    ///
    /// `size` stays `None` between [`TypeStore::make_struct`] and
    /// [`TypeStore::set_struct_body`]; querying the size of such a shell is
    /// an error.
    Struct {
        name:   String,
        fields: Vec<StructField>,
        size:   Option<u64>,
    },

    /// A runtime vector container of `element` values.
    Vector { element: TypeId },

    /// The void type.
    Void,
}

/// The table of types belonging to one module.
#[derive(Clone, Debug, Default)]
pub struct TypeStore {
    /// The stored types, in creation order.
    types: Vec<Type>,

    /// The canonical identifier for each integer width seen so far.
    int_cache: HashMap<u32, TypeId>,
}

impl TypeStore {
    /// Creates an empty type store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Gets the type referenced by `id`.
    ///
    /// # Panics
    ///
    /// - If `id` does not come from this store.
    #[must_use]
    pub fn get(&self, id: TypeId) -> &Type {
        self.types
            .get(id.index())
            .expect("internal consistency error: type id out of range")
    }

    /// Gets the number of types in the store.
    #[must_use]
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// Checks if the store contains no types.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Adds `ty` to the store. Integer types are canonicalized: adding
    /// `Int { bits }` twice yields the same identifier both times. All other
    /// types are appended as given.
    pub fn add(&mut self, ty: Type) -> TypeId {
        match ty {
            Type::Int { bits } => self.int_type(bits),
            other => self.push(other),
        }
    }

    /// Gets the canonical identifier for the integer type of width `bits`.
    pub fn int_type(&mut self, bits: u32) -> TypeId {
        if let Some(id) = self.int_cache.get(&bits) {
            return *id;
        }
        let id = self.push(Type::Int { bits });
        self.int_cache.insert(bits, id);
        id
    }

    /// Creates an empty struct shell called `name`, to be completed later
    /// with [`Self::set_struct_body`].
    pub fn make_struct(&mut self, name: impl Into<String>) -> TypeId {
        self.push(Type::Struct {
            name:   name.into(),
            fields: Vec::new(),
            size:   None,
        })
    }

    /// Fills in the fields and total byte size of the struct shell `id`.
    ///
    /// # Panics
    ///
    /// - If `id` does not refer to a struct.
    pub fn set_struct_body(&mut self, id: TypeId, fields: Vec<StructField>, n_bytes: u64) {
        let index = id.index();
        let Some(Type::Struct { fields: f, size, .. }) = self.types.get_mut(index) else {
            panic!("internal consistency error: type {id:?} is not a struct");
        };
        *f = fields;
        *size = Some(n_bytes);
    }

    /// Computes the number of bytes a value of the type referenced by `id`
    /// occupies. Abstract types, which never appear by value, report zero.
    ///
    /// # Panics
    ///
    /// - If `id` refers to a struct whose body has not been set.
    #[must_use]
    pub fn num_bytes(&self, id: TypeId) -> u64 {
        match self.get(id) {
            Type::Int { bits } | Type::Float { bits } => u64::from(*bits).div_ceil(8),
            Type::Pointer { .. } | Type::Packet { .. } => POINTER_BYTES,
            Type::Array { element, count } => self.num_bytes(*element) * count,
            Type::Struct { size, .. } => size
                .expect("internal consistency error: struct size queried before it was set"),
            Type::ElementBase
            | Type::Map { .. }
            | Type::Opaque { .. }
            | Type::StatePtr { .. }
            | Type::Vector { .. }
            | Type::Void => 0,
        }
    }

    /// Checks whether values of the type referenced by `id` occupy a known
    /// number of bytes.
    #[must_use]
    pub fn sized(&self, id: TypeId) -> bool {
        matches!(
            self.get(id),
            Type::Int { .. }
                | Type::Float { .. }
                | Type::Pointer { .. }
                | Type::Packet { .. }
                | Type::Struct { .. }
                | Type::Array { .. }
        )
    }

    /// Renders the type referenced by `id`.
    ///
    /// # Panics
    ///
    /// - If `id` does not come from this store.
    #[must_use]
    pub fn display(&self, id: TypeId) -> String {
        match self.get(id) {
            Type::Void => "void".into(),
            Type::Int { bits } => format!("i{bits}"),
            Type::Float { bits } => format!("f{bits}"),
            Type::Pointer { pointee } => format!("{}*", self.display(*pointee)),
            Type::StatePtr { name } => format!("state-ptr-{name}"),
            Type::Packet { .. } => "Packet".into(),
            Type::Struct { name, .. } => name.clone(),
            Type::Array { element, count } => {
                format!("[{}*{count}]", self.display(*element))
            }
            Type::ElementBase => "ElementBase".into(),
            Type::Vector { element } => format!("Vector<{}>", self.display(*element)),
            Type::Map { key, value } => {
                format!("Map<{},{}>", self.display(*key), self.display(*value))
            }
            Type::Opaque { name } => format!("opaque<{name}>"),
        }
    }

    fn push(&mut self, ty: Type) -> TypeId {
        let id = TypeId::from_index(self.types.len());
        self.types.push(ty);
        id
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use crate::types::{StructField, Type, TypeStore};

    #[test]
    fn canonicalizes_integer_widths() {
        let mut types = TypeStore::new();
        let a = types.int_type(32);
        let b = types.add(Type::Int { bits: 32 });
        let c = types.int_type(8);

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(types.len(), 2);
    }

    #[test]
    fn struct_shells_are_completed_in_place() {
        let mut types = TypeStore::new();
        let ty = types.int_type(64);
        let state = types.make_struct("Counter");
        let Type::Struct { fields, size, .. } = types.get(state) else {
            panic!("the shell is not a struct");
        };
        assert!(fields.is_empty());
        assert_eq!(*size, None);

        types.set_struct_body(
            state,
            vec![StructField { ty, offset: 0 }, StructField { ty, offset: 8 }],
            16,
        );

        assert_eq!(types.num_bytes(state), 16);
        let Type::Struct { fields, .. } = types.get(state) else {
            panic!("the shell did not become a struct");
        };
        assert_eq!(fields.len(), 2);
    }

    #[test]
    #[should_panic = "struct size queried before it was set"]
    fn querying_an_unset_struct_size_is_fatal() {
        let mut types = TypeStore::new();
        let shell = types.make_struct("Counter");
        let _ = types.num_bytes(shell);
    }

    #[test]
    fn computes_value_sizes() {
        let mut types = TypeStore::new();
        let int16 = types.int_type(16);
        let int8 = types.int_type(8);
        let mac = types.add(Type::Array {
            element: int8,
            count:   6,
        });
        let ptr = types.add(Type::Pointer { pointee: int16 });
        let state_ptr = types.add(Type::StatePtr {
            name: "Counter::state0".into(),
        });

        assert_eq!(types.num_bytes(int16), 2);
        assert_eq!(types.num_bytes(mac), 6);
        assert_eq!(types.num_bytes(ptr), 8);
        assert_eq!(types.num_bytes(state_ptr), 0);
        assert!(types.sized(mac));
        assert!(!types.sized(state_ptr));
    }

    #[test]
    fn displays_types_in_ir_spelling() {
        let mut types = TypeStore::new();
        let void = types.add(Type::Void);
        let int32 = types.int_type(32);
        let int8 = types.int_type(8);
        let byte_ptr = types.add(Type::Pointer { pointee: int8 });
        let arr = types.add(Type::Array {
            element: int32,
            count:   4,
        });
        let vec = types.add(Type::Vector { element: int32 });
        let map = types.add(Type::Map {
            key:   int32,
            value: int8,
        });
        let packet = types.add(Type::Packet { is_input: true });
        let state = types.add(Type::StatePtr {
            name: "Counter::state0".into(),
        });
        let base = types.add(Type::ElementBase);
        let opaque = types.add(Type::Opaque {
            name: "class.Timer".into(),
        });

        assert_eq!(types.display(void), "void");
        assert_eq!(types.display(int32), "i32");
        assert_eq!(types.display(byte_ptr), "i8*");
        assert_eq!(types.display(arr), "[i32*4]");
        assert_eq!(types.display(vec), "Vector<i32>");
        assert_eq!(types.display(map), "Map<i32,i8>");
        assert_eq!(types.display(packet), "Packet");
        assert_eq!(types.display(state), "state-ptr-Counter::state0");
        assert_eq!(types.display(base), "ElementBase");
        assert_eq!(types.display(opaque), "opaque<class.Timer>");
    }
}
