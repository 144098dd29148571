//! Lowering of native type descriptors into HIR types.
//!
//! Every rule funnels through [`LowerCtx::lower_type`], which memoizes per
//! native identity: lowering the same descriptor of the same module twice
//! yields the same [`TypeId`]. Name rules run before structural rules, so a
//! runtime class is recognized whether or not its body was captured in the
//! module. Anything floating-point is rejected outright, as no element the
//! engine targets computes on floats.

use clift_errors::lower::{Error, Result};
use clift_hir::{StructField, Type, TypeId};
use clift_llvm::{LlvmType, LlvmTypeId, TypeTable};

use crate::lower::LowerCtx;

impl LowerCtx<'_> {
    /// Lowers the native type `id` of the module at `index`.
    ///
    /// # Errors
    ///
    /// - [`Error::UnsupportedType`] for floating-point types and for
    ///   container classes whose captured layout does not match the shape
    ///   the runtime gives them.
    /// - [`clift_errors::load::Error::InvalidDataLayoutSpecification`] if
    ///   the module's data layout is needed but does not parse.
    pub(crate) fn lower_type(&mut self, index: usize, id: LlvmTypeId) -> Result<TypeId> {
        if let Some(lowered) = self.type_memo.get(&(index, id)) {
            return Ok(*lowered);
        }

        let store = self.store;
        let lowered = match store.module(index).types.get(id) {
            LlvmType::Struct { name: Some(name), .. } | LlvmType::Opaque { name } => {
                return self.lower_named(index, id, name);
            }
            LlvmType::Struct { name: None, .. } => return self.lower_struct(index, id),
            LlvmType::Void => self.module.types.add(Type::Void),
            LlvmType::Int { bits } => self.module.types.int_type(*bits),
            LlvmType::Float { .. } => {
                return Err(Error::UnsupportedType(store.module(index).types.display(id)));
            }
            LlvmType::Pointer { pointee } => {
                let pointee = self.lower_type(index, *pointee)?;
                self.module.types.add(Type::Pointer { pointee })
            }
            LlvmType::Array { element, count } => {
                let count = *count;
                let element = self.lower_type(index, *element)?;
                self.module.types.add(Type::Array { element, count })
            }
        };

        self.type_memo.insert((index, id), lowered);
        Ok(lowered)
    }

    /// Dispatches a named struct or bodiless declaration on its name.
    fn lower_named(&mut self, index: usize, id: LlvmTypeId, name: &str) -> Result<TypeId> {
        let lowered = if self.patterns.is_opaque(name) {
            let name = strip_class_prefix(name).to_string();
            self.module.types.add(Type::Opaque { name })
        } else if self.patterns.is_element_base(name) {
            self.module.types.add(Type::ElementBase)
        } else if let Some(is_input) = self.patterns.packet_kind(name) {
            self.module.types.add(Type::Packet { is_input })
        } else if self.patterns.is_vector(name) {
            self.lower_vector(index, id)?
        } else if self.patterns.is_map(name) {
            self.lower_map(index, id)?
        } else if matches!(self.store.module(index).types.get(id), LlvmType::Struct { .. }) {
            return self.lower_struct(index, id);
        } else {
            // A declaration nothing is known about stays opaque.
            let name = strip_class_prefix(name).to_string();
            self.module.types.add(Type::Opaque { name })
        };

        self.type_memo.insert((index, id), lowered);
        Ok(lowered)
    }

    /// Lowers a struct with no recognized container name.
    ///
    /// The struct shell is created and memoized before any field is
    /// visited, so a struct that refers to itself through a pointer
    /// terminates. Field offsets and the total size come from the module's
    /// own data layout.
    fn lower_struct(&mut self, index: usize, id: LlvmTypeId) -> Result<TypeId> {
        let store = self.store;
        let types = &store.module(index).types;
        let LlvmType::Struct { name, fields, packed } = types.get(id) else {
            panic!("internal consistency error: type {id:?} is not a struct");
        };

        let pretty = match name {
            Some(name) => strip_class_prefix(name).to_string(),
            None => self.names.fresh("struct"),
        };
        let shell = self.module.types.make_struct(pretty);
        self.type_memo.insert((index, id), shell);

        let mut lowered = Vec::with_capacity(fields.len());
        for &field in fields {
            lowered.push(self.lower_type(index, field)?);
        }

        let layout = self.native_layout(index)?.struct_layout(types, fields, *packed);
        let with_offsets = lowered
            .into_iter()
            .zip(layout.offsets)
            .map(|(ty, offset)| StructField { ty, offset })
            .collect();
        self.module.types.set_struct_body(shell, with_offsets, layout.size);

        Ok(shell)
    }

    /// Lowers a vector container by drilling to its element type, which
    /// hangs off the leading data-pointer field.
    fn lower_vector(&mut self, index: usize, id: LlvmTypeId) -> Result<TypeId> {
        let types = &self.store.module(index).types;
        let element = vector_element(types, id).ok_or_else(|| unexpected_shape(types, id))?;
        let element = self.lower_type(index, element)?;
        Ok(self.module.types.add(Type::Vector { element }))
    }

    /// Lowers a map container by drilling to its key and value types, the
    /// first two fields of the bucket type behind its leading pointer.
    fn lower_map(&mut self, index: usize, id: LlvmTypeId) -> Result<TypeId> {
        let types = &self.store.module(index).types;
        let (key, value) = map_key_value(types, id).ok_or_else(|| unexpected_shape(types, id))?;
        let key = self.lower_type(index, key)?;
        let value = self.lower_type(index, value)?;
        Ok(self.module.types.add(Type::Map { key, value }))
    }
}

/// The error for a container class whose captured layout does not have the
/// shape the runtime gives it.
fn unexpected_shape(types: &TypeTable, id: LlvmTypeId) -> Error {
    Error::UnsupportedType(types.display(id))
}

/// Finds the element type of a vector container.
fn vector_element(types: &TypeTable, id: LlvmTypeId) -> Option<LlvmTypeId> {
    let LlvmType::Struct { fields, .. } = types.get(id) else {
        return None;
    };
    let LlvmType::Pointer { pointee } = types.get(*fields.first()?) else {
        return None;
    };
    Some(*pointee)
}

/// Finds the key and value types of a map container.
fn map_key_value(types: &TypeTable, id: LlvmTypeId) -> Option<(LlvmTypeId, LlvmTypeId)> {
    let LlvmType::Struct { fields, .. } = types.get(id) else {
        return None;
    };
    let LlvmType::Pointer { pointee } = types.get(*fields.first()?) else {
        return None;
    };
    let LlvmType::Struct { fields: bucket, .. } = types.get(*pointee) else {
        return None;
    };
    match bucket.as_slice() {
        [key, value, ..] => Some((*key, *value)),
        _ => None,
    }
}

/// Strips the `class.` or `struct.` namespace prefix native struct names
/// carry.
fn strip_class_prefix(name: &str) -> &str {
    name.strip_prefix("class.")
        .or_else(|| name.strip_prefix("struct."))
        .unwrap_or(name)
}

#[cfg(test)]
mod test {
    use clift_hir::Type;
    use clift_llvm::{IrStore, LlvmModule};
    use clift_test_input::DATA_LAYOUT;
    use pretty_assertions::assert_eq;

    use crate::{builtins::BuiltinRegistry, lower::LowerCtx, patterns::ContainerPatterns};

    fn fresh_ctx(store: &IrStore) -> LowerCtx<'_> {
        LowerCtx::new(
            store,
            ContainerPatterns::default(),
            BuiltinRegistry::default(),
        )
    }

    #[test]
    fn integer_widths_share_one_type_across_modules() -> anyhow::Result<()> {
        let mut store = IrStore::new();
        let mut natives = Vec::new();
        for name in ["a", "b"] {
            let mut module = LlvmModule::new(name, DATA_LAYOUT);
            natives.push(module.types.int_type(32));
            store.add_module(&format!("{name}.json"), module)?;
        }

        let mut ctx = fresh_ctx(&store);
        let a = ctx.lower_type(0, natives[0])?;
        let b = ctx.lower_type(1, natives[1])?;
        assert_eq!(a, b);
        Ok(())
    }

    #[test]
    fn memoization_is_per_native_identity() -> anyhow::Result<()> {
        let mut module = LlvmModule::new("memo.click", DATA_LAYOUT);
        let int64 = module.types.int_type(64);
        let ptr = module.types.pointer_to(int64);
        let mut store = IrStore::new();
        store.add_module("memo.json", module)?;

        let mut ctx = fresh_ctx(&store);
        let first = ctx.lower_type(0, ptr)?;
        let second = ctx.lower_type(0, ptr)?;
        assert_eq!(first, second);
        Ok(())
    }

    #[test]
    fn runtime_classes_are_recognized_by_name() -> anyhow::Result<()> {
        let mut module = LlvmModule::new("names.click", DATA_LAYOUT);
        let packet = module.types.declare_struct("class.Packet");
        let writable = module.types.declare_struct("class.WritablePacket");
        let base = module.types.declare_struct("class.Element");
        let timer = module.types.declare_struct("class.Timer");
        let mut store = IrStore::new();
        store.add_module("names.json", module)?;

        let mut ctx = fresh_ctx(&store);
        let packet = ctx.lower_type(0, packet)?;
        let writable = ctx.lower_type(0, writable)?;
        let base = ctx.lower_type(0, base)?;
        let timer = ctx.lower_type(0, timer)?;
        let module = ctx.finish();

        assert_eq!(*module.types.get(packet), Type::Packet { is_input: true });
        assert_eq!(
            *module.types.get(writable),
            Type::Packet { is_input: false }
        );
        assert_eq!(*module.types.get(base), Type::ElementBase);
        assert_eq!(
            *module.types.get(timer),
            Type::Opaque {
                name: "Timer".into()
            }
        );
        Ok(())
    }

    #[test]
    fn containers_are_drilled_to_their_payload_types() -> anyhow::Result<()> {
        let mut module = LlvmModule::new("containers.click", DATA_LAYOUT);
        let int16 = module.types.int_type(16);
        let int32 = module.types.int_type(32);
        let int64 = module.types.int_type(64);

        let data = module.types.pointer_to(int32);
        let vector = module.types.declare_struct("class.Vector");
        module.types.define_struct(vector, vec![data, int32, int32], false);

        let bucket = module.types.declare_struct("struct.HashMap_Bucket");
        let bucket_ptr = module.types.pointer_to(bucket);
        module.types.define_struct(bucket, vec![int16, int64, bucket_ptr], false);
        let map = module.types.declare_struct("class.HashMap");
        module.types.define_struct(map, vec![bucket_ptr, int32], false);

        let mut store = IrStore::new();
        store.add_module("containers.json", module)?;

        let mut ctx = fresh_ctx(&store);
        let vector = ctx.lower_type(0, vector)?;
        let map = ctx.lower_type(0, map)?;
        let module = ctx.finish();

        let Type::Vector { element } = *module.types.get(vector) else {
            panic!("not a vector");
        };
        assert_eq!(*module.types.get(element), Type::Int { bits: 32 });

        let Type::Map { key, value } = *module.types.get(map) else {
            panic!("not a map");
        };
        assert_eq!(*module.types.get(key), Type::Int { bits: 16 });
        assert_eq!(*module.types.get(value), Type::Int { bits: 64 });
        Ok(())
    }

    #[test]
    fn self_referential_structs_terminate() -> anyhow::Result<()> {
        let mut module = LlvmModule::new("recursive.click", DATA_LAYOUT);
        let int32 = module.types.int_type(32);
        let node = module.types.declare_struct("struct.Node");
        let next = module.types.pointer_to(node);
        module.types.define_struct(node, vec![next, int32], false);
        let mut store = IrStore::new();
        store.add_module("recursive.json", module)?;

        let mut ctx = fresh_ctx(&store);
        let node = ctx.lower_type(0, node)?;
        let module = ctx.finish();

        let Type::Struct { name, fields, size } = module.types.get(node) else {
            panic!("not a struct");
        };
        assert_eq!(name, "Node");
        assert_eq!(*size, Some(16));
        assert_eq!(fields[0].offset, 0);
        assert_eq!(fields[1].offset, 8);
        let Type::Pointer { pointee } = *module.types.get(fields[0].ty) else {
            panic!("not a pointer");
        };
        assert_eq!(pointee, node);
        Ok(())
    }

    #[test]
    fn floats_are_rejected() -> anyhow::Result<()> {
        let mut module = LlvmModule::new("floats.click", DATA_LAYOUT);
        let double = module.types.float_type(64);
        let mut store = IrStore::new();
        store.add_module("floats.json", module)?;

        let mut ctx = fresh_ctx(&store);
        let result = ctx.lower_type(0, double);
        assert!(matches!(
            result,
            Err(clift_errors::lower::Error::UnsupportedType(_))
        ));
        Ok(())
    }
}
