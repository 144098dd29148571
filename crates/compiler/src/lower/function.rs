//! Assembly of function bodies.
//!
//! A body is built in three passes. The first creates one HIR block per
//! native block. The second creates a typed placeholder variable for every
//! value-producing instruction. Only then does the third pass visit the
//! instructions, so a forward reference, a phi reaching back into a loop
//! and a branch to a later block all resolve without any fixups.

use std::collections::HashMap;

use clift_errors::lower::{Error, Result};
use clift_hir::{BasicBlock, BlockId, FuncId, Type, TypeId, Var, VarId};
use clift_llvm::{LlvmFunction, LlvmInst, LlvmType, LlvmTypeId, LlvmValue, TypeTable};
use tracing::debug;

use crate::lower::LowerCtx;

/// The per-function state of the instruction visitor.
pub(crate) struct FuncCx<'a, 'ctx> {
    /// The run-wide lowering context.
    pub(crate) ctx: &'a mut LowerCtx<'ctx>,

    /// The index of the native module the function comes from.
    pub(crate) index: usize,

    /// The function being filled in.
    pub(crate) func: FuncId,

    /// The mangled native name, kept for diagnostics.
    pub(crate) native_name: String,

    /// The variable each native value resolves to.
    pub(crate) value_map: HashMap<LlvmValue, VarId>,

    /// The block each native label resolves to.
    pub(crate) block_map: HashMap<String, BlockId>,
}

impl LowerCtx<'_> {
    /// Lowers the body of `native` into the registered function `func`.
    ///
    /// # Errors
    ///
    /// - [`Error::MalformedFunction`] if the body breaks a structural rule,
    ///   such as a block without a terminator or a use of an undefined
    ///   value.
    /// - Any error from the instruction visitor.
    pub(crate) fn lower_body(
        &mut self,
        index: usize,
        func: FuncId,
        native: &LlvmFunction,
    ) -> Result<()> {
        debug!("lowering the body of `{}`", native.name);

        let mut cx = FuncCx {
            ctx: self,
            index,
            func,
            native_name: native.name.clone(),
            value_map: HashMap::new(),
            block_map: HashMap::new(),
        };
        cx.seed_params(native);
        cx.allocate_blocks(native);
        cx.allocate_results(native)?;
        cx.lower_insts(native)?;

        self.module.func_mut(func).update_uses();
        Ok(())
    }
}

impl FuncCx<'_, '_> {
    /// Builds the error for a structural defect of the native function.
    pub(crate) fn malformed(&self, why: impl Into<String>) -> Error {
        Error::MalformedFunction(self.native_name.clone(), why.into())
    }

    /// The type table of the native module being lowered.
    pub(crate) fn native_types(&self) -> &TypeTable {
        &self.ctx.store.module(self.index).types
    }

    /// Seeds the value map with the parameter variables minted at
    /// registration time.
    fn seed_params(&mut self, native: &LlvmFunction) {
        let params = self.ctx.module.func(self.func).params.clone();
        for (param, var) in native.params.iter().zip(params) {
            self.value_map.insert(LlvmValue::Local(param.name.clone()), var);
        }
    }

    /// Pass one: creates one empty block per native block, in order, and
    /// marks the first as the entry.
    fn allocate_blocks(&mut self, native: &LlvmFunction) {
        let func = self.ctx.module.func_mut(self.func);
        for block in &native.blocks {
            let id = func.add_block(BasicBlock::new(&block.label));
            self.block_map.insert(block.label.clone(), id);
        }
        func.entry_block = native.blocks.first().map(|block| self.block_map[&block.label]);
    }

    /// Pass two: creates a typed placeholder variable for every
    /// value-producing instruction, so later instructions can refer to
    /// earlier ones and phis can refer to anything at all.
    fn allocate_results(&mut self, native: &LlvmFunction) -> Result<()> {
        for inst in native.blocks.iter().flat_map(|block| &block.insts) {
            let Some(result) = inst.result() else {
                continue;
            };
            let Some(ty) = self.result_type(inst)? else {
                continue;
            };
            let var = Var::new(result, ty);
            let var = self.ctx.module.func_mut(self.func).add_var(var);
            self.value_map.insert(LlvmValue::Local(result.to_string()), var);
        }
        Ok(())
    }

    /// Pass three: dispatches every instruction to the visitor, then checks
    /// that each block ended up terminated.
    fn lower_insts(&mut self, native: &LlvmFunction) -> Result<()> {
        for block in &native.blocks {
            let id = self.block_map[&block.label];
            for inst in &block.insts {
                self.lower_inst(id, inst)?;
            }
            if !self.ctx.module.func(self.func).block(id).is_terminated() {
                return Err(self.malformed(format!("block `{}` lacks a terminator", block.label)));
            }
        }
        Ok(())
    }

    /// The HIR type of the value `inst` produces, or `None` when it
    /// produces nothing.
    fn result_type(&mut self, inst: &LlvmInst) -> Result<Option<TypeId>> {
        let index = self.index;
        let ty = match inst {
            LlvmInst::Alloca { ty, .. } => {
                let pointee = self.ctx.lower_type(index, *ty)?;
                Some(self.ctx.module.types.add(Type::Pointer { pointee }))
            }
            LlvmInst::Binary { ty, .. }
            | LlvmInst::InsertValue { ty, .. }
            | LlvmInst::Load { ty, .. }
            | LlvmInst::Phi { ty, .. }
            | LlvmInst::Select { ty, .. } => Some(self.ctx.lower_type(index, *ty)?),
            LlvmInst::ICmp { .. } => Some(self.ctx.module.types.int_type(1)),
            LlvmInst::Cast { to, .. } => Some(self.ctx.lower_type(index, *to)?),
            LlvmInst::ExtractValue { ty, indices, .. } => {
                let native = self.native_types().drill(*ty, indices).ok_or_else(|| {
                    self.malformed("an extraction drills past the aggregate's fields")
                })?;
                Some(self.ctx.lower_type(index, native)?)
            }
            LlvmInst::Gep { base_ty, indices, .. } => {
                let target = self.gep_target(*base_ty, indices)?;
                let pointee = self.ctx.lower_type(index, target)?;
                Some(self.ctx.module.types.add(Type::Pointer { pointee }))
            }
            LlvmInst::Call { ret, .. } => {
                if matches!(self.native_types().get(*ret), LlvmType::Void) {
                    None
                } else {
                    Some(self.ctx.lower_type(index, *ret)?)
                }
            }
            _ => None,
        };
        Ok(ty)
    }

    /// The native type a `getelementptr` resolves to. The first index steps
    /// within the base allocation and never changes the type; every later
    /// index drills into an aggregate.
    fn gep_target(&self, base: LlvmTypeId, indices: &[LlvmValue]) -> Result<LlvmTypeId> {
        let types = self.native_types();
        let mut current = base;
        for index in indices.iter().skip(1) {
            current = match types.get(current) {
                LlvmType::Struct { fields, .. } => {
                    let LlvmValue::ConstInt { value, .. } = index else {
                        return Err(self.malformed("a struct field index is not a constant"));
                    };
                    *usize::try_from(*value)
                        .ok()
                        .and_then(|field| fields.get(field))
                        .ok_or_else(|| {
                            self.malformed(format!("the field index {value} is out of range"))
                        })?
                }
                LlvmType::Array { element, .. } => *element,
                _ => {
                    return Err(self.malformed("an address computation drills into a scalar"));
                }
            };
        }
        Ok(current)
    }
}
