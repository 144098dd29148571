//! The per-instruction visitor.
//!
//! Each handler turns one native instruction into at most a handful of HIR
//! operations or edges. The instruction set is closed on purpose: element
//! push paths are integer-and-pointer straight-line code with modest
//! control flow, and anything outside that vocabulary is rejected rather
//! than approximated.

use clift_errors::lower::{Error, Result};
use clift_hir::{ArithKind, BlockId, CmpCond, CondBranch, FuncId, Note, OpKind, Type, Var, VarId};
use clift_llvm::{demangle, Callee, CastOp, IcmpCond, LlvmInst, LlvmType, LlvmTypeId, LlvmValue};

use crate::lower::function::FuncCx;

impl FuncCx<'_, '_> {
    /// Lowers one instruction into `block`.
    pub(crate) fn lower_inst(&mut self, block: BlockId, inst: &LlvmInst) -> Result<()> {
        match inst {
            LlvmInst::Alloca { result, ty, count } => self.lower_alloca(block, result, *ty, count),
            LlvmInst::Binary { result, op, lhs, rhs, .. } => {
                self.lower_binary(block, result, op, lhs, rhs)
            }
            LlvmInst::ICmp { result, cond, lhs, rhs, .. } => {
                self.lower_icmp(block, result, *cond, lhs, rhs)
            }
            LlvmInst::Cast { result, op, value, .. } => self.lower_cast(block, result, *op, value),
            LlvmInst::Load { result, ptr, .. } => self.lower_load(block, result, ptr),
            LlvmInst::Store { value, ptr, .. } => self.lower_store(block, value, ptr),
            LlvmInst::Gep { result, base_ty, base, indices } => {
                self.lower_gep(block, result, *base_ty, base, indices)
            }
            LlvmInst::ExtractValue { result, base, indices, .. } => {
                self.lower_extract(block, result, base, indices)
            }
            LlvmInst::InsertValue { result, base, value, indices, .. } => {
                self.lower_insert(block, result, base, value, indices)
            }
            LlvmInst::Phi { result, incoming, .. } => self.lower_phi(block, result, incoming),
            LlvmInst::Select { result, cond, if_true, if_false, .. } => {
                self.lower_select(block, result, cond, if_true, if_false)
            }
            LlvmInst::Call { result, callee, args, .. } => {
                self.lower_call(block, result.as_deref(), callee, args)
            }
            LlvmInst::Br { dest } => self.lower_br(block, dest),
            LlvmInst::CondBr { cond, if_true, if_false } => {
                self.lower_cond_br(block, cond, if_true, if_false)
            }
            LlvmInst::Switch { value, ty, default, cases } => {
                self.lower_switch(block, value, *ty, default, cases)
            }
            LlvmInst::Ret { value } => self.lower_ret(block, value.as_ref()),
            LlvmInst::Unreachable => self.lower_unreachable(block),
        }
    }

    /// Resolves `value` to a variable. Constants, undefined values, null
    /// pointers and global references are synthesized on first sight and
    /// reused afterwards; a local must already have a defining variable.
    pub(crate) fn value(&mut self, value: &LlvmValue) -> Result<VarId> {
        if let Some(var) = self.value_map.get(value) {
            return Ok(*var);
        }

        let var = match value {
            LlvmValue::Local(name) => {
                return Err(self.malformed(format!("use of undefined local `%{name}`")));
            }
            LlvmValue::ConstInt { bits, value } => {
                let ty = self.ctx.module.types.int_type(*bits);
                Var::constant(ty, *value)
            }
            LlvmValue::Null { ty } => {
                let ty = self.ctx.lower_type(self.index, *ty)?;
                Var::constant(ty, 0)
            }
            LlvmValue::Undef { ty } => {
                let ty = self.ctx.lower_type(self.index, *ty)?;
                Var::undef(ty)
            }
            LlvmValue::Global(symbol) => {
                let global = self
                    .ctx
                    .store
                    .module(self.index)
                    .globals
                    .get(symbol)
                    .ok_or_else(|| self.malformed(format!("use of unknown global `@{symbol}`")))?;
                let pointee = self.ctx.lower_type(self.index, global.ty)?;
                let ty = self.ctx.module.types.add(Type::Pointer { pointee });
                Var::new(demangle::try_demangle(symbol), ty)
            }
        };

        let id = self.ctx.module.func_mut(self.func).add_var(var);
        self.value_map.insert(value.clone(), id);
        Ok(id)
    }

    /// Resolves a native label through the block map.
    fn block(&self, label: &str) -> Result<BlockId> {
        self.block_map
            .get(label)
            .copied()
            .ok_or_else(|| self.malformed(format!("branch to unknown block `{label}`")))
    }

    /// Resolves the local `name` to the placeholder minted for it.
    fn local(&self, name: &str) -> Result<VarId> {
        self.value_map
            .get(&LlvmValue::Local(name.to_string()))
            .copied()
            .ok_or_else(|| self.malformed(format!("use of undefined local `%{name}`")))
    }

    fn lower_alloca(
        &mut self,
        block: BlockId,
        result: &str,
        ty: LlvmTypeId,
        count: &LlvmValue,
    ) -> Result<()> {
        // Stack slots must be static: a data-dependent element count has no
        // place in a push path.
        let LlvmValue::ConstInt { value, .. } = count else {
            return Err(Error::DynamicAlloca(result.to_string()));
        };
        let count = u64::try_from(*value).map_err(|_| Error::DynamicAlloca(result.to_string()))?;

        let allocated = self.ctx.lower_type(self.index, ty)?;
        let kind = OpKind::Alloca { allocated, count };
        let out = self.local(result)?;
        let func = self.ctx.module.func_mut(self.func);
        func.append_op(block, kind, vec![], vec![out]);
        Ok(())
    }

    fn lower_binary(
        &mut self,
        block: BlockId,
        result: &str,
        op: &str,
        lhs: &LlvmValue,
        rhs: &LlvmValue,
    ) -> Result<()> {
        let kind = arith_kind(op).ok_or_else(|| Error::UnknownArithOpcode(op.to_string()))?;
        let args = vec![self.value(lhs)?, self.value(rhs)?];
        let out = self.local(result)?;
        let func = self.ctx.module.func_mut(self.func);
        func.append_op(block, OpKind::Arith(kind), args, vec![out]);
        Ok(())
    }

    fn lower_icmp(
        &mut self,
        block: BlockId,
        result: &str,
        cond: IcmpCond,
        lhs: &LlvmValue,
        rhs: &LlvmValue,
    ) -> Result<()> {
        // Greater-than predicates are mirrored into the less-than family by
        // swapping the operands.
        let (cond, lhs, rhs) = match cond {
            IcmpCond::Eq => (CmpCond::Eq, lhs, rhs),
            IcmpCond::Ne => (CmpCond::Ne, lhs, rhs),
            IcmpCond::Sge => (CmpCond::Sle, rhs, lhs),
            IcmpCond::Sgt => (CmpCond::Slt, rhs, lhs),
            IcmpCond::Sle => (CmpCond::Sle, lhs, rhs),
            IcmpCond::Slt => (CmpCond::Slt, lhs, rhs),
            IcmpCond::Uge => (CmpCond::Ule, rhs, lhs),
            IcmpCond::Ugt => (CmpCond::Ult, rhs, lhs),
            IcmpCond::Ule => (CmpCond::Ule, lhs, rhs),
            IcmpCond::Ult => (CmpCond::Ult, lhs, rhs),
        };
        let args = vec![self.value(lhs)?, self.value(rhs)?];
        let out = self.local(result)?;
        let func = self.ctx.module.func_mut(self.func);
        func.append_op(block, OpKind::Arith(ArithKind::Cmp(cond)), args, vec![out]);
        Ok(())
    }

    fn lower_cast(
        &mut self,
        block: BlockId,
        result: &str,
        op: CastOp,
        value: &LlvmValue,
    ) -> Result<()> {
        let kind = match op {
            CastOp::Trunc => OpKind::Arith(ArithKind::Trunc),
            CastOp::SExt => OpKind::Arith(ArithKind::SExt),
            CastOp::ZExt => OpKind::Arith(ArithKind::ZExt),
            CastOp::Bitcast | CastOp::IntToPtr | CastOp::PtrToInt => OpKind::Bitcast,
        };
        let args = vec![self.value(value)?];
        let out = self.local(result)?;
        let func = self.ctx.module.func_mut(self.func);
        func.append_op(block, kind, args, vec![out]);
        Ok(())
    }

    fn lower_load(&mut self, block: BlockId, result: &str, ptr: &LlvmValue) -> Result<()> {
        let ptr = self.value(ptr)?;
        let out = self.local(result)?;
        let func = self.ctx.module.func_mut(self.func);
        func.append_op(block, OpKind::Load, vec![ptr], vec![out]);
        Ok(())
    }

    fn lower_store(&mut self, block: BlockId, value: &LlvmValue, ptr: &LlvmValue) -> Result<()> {
        let args = vec![self.value(value)?, self.value(ptr)?];
        let func = self.ctx.module.func_mut(self.func);
        func.append_op(block, OpKind::Store, args, vec![]);
        Ok(())
    }

    fn lower_gep(
        &mut self,
        block: BlockId,
        result: &str,
        base_ty: LlvmTypeId,
        base: &LlvmValue,
        indices: &[LlvmValue],
    ) -> Result<()> {
        let lowered = self.ctx.lower_type(self.index, base_ty)?;
        let mut args = vec![self.value(base)?];
        for index in indices {
            args.push(self.value(index)?);
        }
        let out = self.local(result)?;
        let func = self.ctx.module.func_mut(self.func);
        func.append_op(block, OpKind::Gep { base: lowered }, args, vec![out]);
        Ok(())
    }

    fn lower_extract(
        &mut self,
        block: BlockId,
        result: &str,
        base: &LlvmValue,
        indices: &[u32],
    ) -> Result<()> {
        let args = vec![self.value(base)?];
        let out = self.local(result)?;
        let kind = OpKind::StructGet {
            indices: indices.to_vec(),
        };
        let func = self.ctx.module.func_mut(self.func);
        func.append_op(block, kind, args, vec![out]);
        Ok(())
    }

    fn lower_insert(
        &mut self,
        block: BlockId,
        result: &str,
        base: &LlvmValue,
        value: &LlvmValue,
        indices: &[u32],
    ) -> Result<()> {
        let args = vec![self.value(base)?, self.value(value)?];
        let out = self.local(result)?;
        let kind = OpKind::StructSet {
            indices: indices.to_vec(),
        };
        let func = self.ctx.module.func_mut(self.func);
        func.append_op(block, kind, args, vec![out]);
        Ok(())
    }

    fn lower_phi(
        &mut self,
        block: BlockId,
        result: &str,
        incoming: &[(LlvmValue, String)],
    ) -> Result<()> {
        let mut args = Vec::with_capacity(incoming.len());
        let mut preds = Vec::with_capacity(incoming.len());
        for (value, label) in incoming {
            args.push(self.value(value)?);
            preds.push(self.block(label)?);
        }
        let out = self.local(result)?;
        let func = self.ctx.module.func_mut(self.func);
        func.append_op(block, OpKind::Phi { incoming: preds }, args, vec![out]);
        Ok(())
    }

    fn lower_select(
        &mut self,
        block: BlockId,
        result: &str,
        cond: &LlvmValue,
        if_true: &LlvmValue,
        if_false: &LlvmValue,
    ) -> Result<()> {
        let args = vec![self.value(cond)?, self.value(if_true)?, self.value(if_false)?];
        let out = self.local(result)?;
        let func = self.ctx.module.func_mut(self.func);
        func.append_op(block, OpKind::Select, args, vec![out]);
        Ok(())
    }

    fn lower_br(&mut self, block: BlockId, dest: &str) -> Result<()> {
        let dest = self.block(dest)?;
        self.ctx.module.func_mut(self.func).block_mut(block).default_next = Some(dest);
        Ok(())
    }

    fn lower_cond_br(
        &mut self,
        block: BlockId,
        cond: &LlvmValue,
        if_true: &str,
        if_false: &str,
    ) -> Result<()> {
        let cond = self.value(cond)?;
        let target = self.block(if_true)?;
        let fallthrough = self.block(if_false)?;

        let current = self.ctx.module.func_mut(self.func).block_mut(block);
        current.branches.push(CondBranch { cond, target });
        current.default_next = Some(fallthrough);
        Ok(())
    }

    /// Expands a switch into a chain of equality tests, one conditional
    /// branch per case, falling through to the default.
    fn lower_switch(
        &mut self,
        block: BlockId,
        value: &LlvmValue,
        ty: LlvmTypeId,
        default: &str,
        cases: &[(i64, String)],
    ) -> Result<()> {
        let &LlvmType::Int { bits } = self.native_types().get(ty) else {
            return Err(self.malformed("a switch scrutinee is not an integer"));
        };
        let scrutinee = self.value(value)?;

        for &(case, ref label) in cases {
            let target = self.block(label)?;
            let against = self.value(&LlvmValue::ConstInt { bits, value: case })?;
            let name = self.ctx.names.fresh("switch_cmp");
            let bool_ty = self.ctx.module.types.int_type(1);

            let func = self.ctx.module.func_mut(self.func);
            let out = func.add_var(Var::new(name, bool_ty));
            let compare = OpKind::Arith(ArithKind::Cmp(CmpCond::Eq));
            func.append_op(block, compare, vec![scrutinee, against], vec![out]);
            let branch = CondBranch { cond: out, target };
            func.block_mut(block).branches.push(branch);
        }

        let fallthrough = self.block(default)?;
        self.ctx.module.func_mut(self.func).block_mut(block).default_next = Some(fallthrough);
        Ok(())
    }

    fn lower_ret(&mut self, block: BlockId, value: Option<&LlvmValue>) -> Result<()> {
        let returned = value.map(|value| self.value(value)).transpose()?;
        let current = self.ctx.module.func_mut(self.func).block_mut(block);
        current.is_return = true;
        current.ret_val = returned;
        Ok(())
    }

    /// An unreachable terminator marks the block as an error exit but still
    /// leaves an operation behind, so the printed form shows where the
    /// source promised not to go.
    fn lower_unreachable(&mut self, block: BlockId) -> Result<()> {
        let func = self.ctx.module.func_mut(self.func);
        func.block_mut(block).is_err = true;
        func.append_op(block, OpKind::Unreachable, vec![], vec![]);
        Ok(())
    }

    fn lower_call(
        &mut self,
        block: BlockId,
        result: Option<&str>,
        callee: &Callee,
        args: &[(LlvmTypeId, LlvmValue)],
    ) -> Result<()> {
        let (target, skip_args, symbol) = match callee {
            Callee::Symbol(symbol) => {
                // Debug-info and lifetime intrinsics carry no runtime
                // behavior.
                if symbol.starts_with("llvm.dbg.") || symbol.starts_with("llvm.lifetime.") {
                    return Ok(());
                }
                match self.ctx.builtins.match_symbol(symbol).cloned() {
                    Some(spec) => {
                        let id = self.ctx.materialize_builtin(&spec);
                        (id, spec.skip_args, symbol.clone())
                    }
                    None => (self.resolve_callee(symbol)?, false, symbol.clone()),
                }
            }
            Callee::Asm { template } => {
                let spec = self
                    .ctx
                    .builtins
                    .match_asm(template)
                    .cloned()
                    .ok_or_else(|| Error::UnknownInlineAsm(template.clone()))?;
                (self.ctx.materialize_builtin(&spec), spec.skip_args, template.clone())
            }
        };

        let mut lowered_args = Vec::new();
        if !skip_args {
            for (_, value) in args {
                lowered_args.push(self.value(value)?);
            }
        }

        // A call naming a result can still produce nothing, when the callee
        // returns void.
        let mut results = Vec::new();
        if let Some(name) = result {
            if let Some(out) = self.value_map.get(&LlvmValue::Local(name.to_string())) {
                results.push(*out);
            }
        }

        let kind = OpKind::FuncCall { callee: target };
        let func = self.ctx.module.func_mut(self.func);
        let call = func.append_op(block, kind, lowered_args, results);
        func.op_mut(call).note = Some(Note::CallInfo { symbol });
        func.add_callee(target);
        Ok(())
    }

    /// Resolves a call to anything the built-in registry did not claim. The
    /// function table is closed over the loaded modules, so an unresolved
    /// callee is fatal rather than an implicit declaration.
    fn resolve_callee(&mut self, symbol: &str) -> Result<FuncId> {
        if let Some(id) = self.ctx.symbol_map.get(symbol) {
            return Ok(*id);
        }
        if let Some((index, native)) = self.ctx.store.find_function(symbol) {
            return self.ctx.register_native(index, native);
        }
        if symbol.starts_with("llvm.") {
            return Err(Error::UnsupportedInstruction(symbol.to_string()));
        }
        Err(Error::UnknownCallee(symbol.to_string()))
    }
}

/// The fixed name table for the integer and bitwise opcodes.
fn arith_kind(op: &str) -> Option<ArithKind> {
    Some(match op {
        "add" => ArithKind::Add,
        "sub" => ArithKind::Sub,
        "mul" => ArithKind::Mul,
        "sdiv" => ArithKind::DivS,
        "udiv" => ArithKind::DivU,
        "srem" => ArithKind::RemS,
        "urem" => ArithKind::RemU,
        "and" => ArithKind::And,
        "or" => ArithKind::Or,
        "xor" => ArithKind::Xor,
        "shl" => ArithKind::Shl,
        "lshr" => ArithKind::LshR,
        "ashr" => ArithKind::AshR,
        _ => return None,
    })
}

#[cfg(test)]
mod test {
    use clift_errors::lower::Error;
    use clift_hir::{ArithKind, CmpCond, Module, Note, OpKind};
    use clift_llvm::{
        Callee, IcmpCond, IrStore, LlvmBlock, LlvmFunction, LlvmInst, LlvmModule, LlvmParam,
        LlvmValue,
    };
    use clift_test_input::DATA_LAYOUT;
    use pretty_assertions::assert_eq;

    use crate::{builtins::BuiltinRegistry, lower::LowerCtx, patterns::ContainerPatterns};

    /// Wraps the instructions produced by `build` in a single
    /// `void f(i32 a, i32 b)` function and lowers it.
    fn lower_snippet(
        build: impl FnOnce(&mut LlvmModule) -> Vec<LlvmInst>,
    ) -> clift_errors::lower::Result<Module> {
        let mut module = LlvmModule::new("snippet.click", DATA_LAYOUT);
        let insts = build(&mut module);
        let void = module.types.void_type();
        let int32 = module.types.int_type(32);
        module.functions.push(LlvmFunction {
            name:   "f".into(),
            params: vec![
                LlvmParam {
                    name: "a".into(),
                    ty:   int32,
                },
                LlvmParam {
                    name: "b".into(),
                    ty:   int32,
                },
            ],
            ret:    void,
            blocks: vec![LlvmBlock {
                label: "entry".into(),
                insts,
            }],
        });

        let mut store = IrStore::new();
        store.add_module("snippet.json", module)?;
        let mut ctx = LowerCtx::new(
            &store,
            ContainerPatterns::default(),
            BuiltinRegistry::default(),
        );
        let (index, native) = store.find_function("f").expect("the snippet is defined");
        let id = ctx.register_native(index, native)?;
        ctx.lower_body(index, id, native)?;
        Ok(ctx.finish())
    }

    fn local(name: &str) -> LlvmValue {
        LlvmValue::Local(name.into())
    }

    // Successes

    #[test]
    fn greater_than_comparisons_are_mirrored() -> anyhow::Result<()> {
        let module = lower_snippet(|module| {
            let int32 = module.types.int_type(32);
            vec![
                LlvmInst::ICmp {
                    result: "c".into(),
                    cond:   IcmpCond::Sgt,
                    ty:     int32,
                    lhs:    local("a"),
                    rhs:    local("b"),
                },
                LlvmInst::Ret { value: None },
            ]
        })?;

        let func = module.func(module.lookup("f").expect("registered"));
        let (_, cmp) = func
            .ops()
            .find(|(_, op)| matches!(op.kind, OpKind::Arith(ArithKind::Cmp(_))))
            .expect("the comparison survives");
        assert_eq!(cmp.kind, OpKind::Arith(ArithKind::Cmp(CmpCond::Slt)));
        assert_eq!(func.var(cmp.args[0]).name, "b");
        assert_eq!(func.var(cmp.args[1]).name, "a");
        Ok(())
    }

    #[test]
    fn switches_become_equality_chains() -> anyhow::Result<()> {
        let module = lower_snippet(|module| {
            let int32 = module.types.int_type(32);
            vec![LlvmInst::Switch {
                value:   local("a"),
                ty:      int32,
                default: "entry".into(),
                cases:   vec![(0, "entry".into()), (7, "entry".into())],
            }]
        })?;

        let func = module.func(module.lookup("f").expect("registered"));
        let entry = func.entry_block.expect("the function has a body");
        let compares = func
            .ops()
            .filter(|(_, op)| op.kind == OpKind::Arith(ArithKind::Cmp(CmpCond::Eq)))
            .count();
        assert_eq!(compares, 2);
        assert_eq!(func.block(entry).branches.len(), 2);
        assert!(func.block(entry).default_next.is_some());

        let first_cond = func.block(entry).branches[0].cond;
        assert_eq!(func.var(first_cond).name, "switch_cmp_0");
        Ok(())
    }

    #[test]
    fn debug_intrinsics_vanish() -> anyhow::Result<()> {
        let module = lower_snippet(|module| {
            let void = module.types.void_type();
            vec![
                LlvmInst::Call {
                    result: None,
                    callee: Callee::Symbol("llvm.dbg.value".into()),
                    ret:    void,
                    args:   Vec::new(),
                },
                LlvmInst::Ret { value: None },
            ]
        })?;

        let func = module.func(module.lookup("f").expect("registered"));
        assert_eq!(func.ops().count(), 0);
        Ok(())
    }

    #[test]
    fn byteswap_assembly_is_recognized() -> anyhow::Result<()> {
        let module = lower_snippet(|module| {
            let int32 = module.types.int_type(32);
            vec![
                LlvmInst::Call {
                    result: Some("swapped".into()),
                    callee: Callee::Asm {
                        template: "rorw $8, ${0:w}".into(),
                    },
                    ret:    int32,
                    args:   vec![(int32, local("a"))],
                },
                LlvmInst::Ret { value: None },
            ]
        })?;

        let swap = module.lookup("bswap16").expect("the built-in exists");
        assert!(module.func(swap).is_built_in);

        let func = module.func(module.lookup("f").expect("registered"));
        let (_, call) = func
            .ops()
            .find(|(_, op)| matches!(op.kind, OpKind::FuncCall { .. }))
            .expect("the call survives");
        assert_eq!(
            call.note,
            Some(Note::CallInfo {
                symbol: "rorw $8, ${0:w}".into()
            })
        );
        Ok(())
    }

    #[test]
    fn unreachable_marks_an_error_exit_and_keeps_an_op() -> anyhow::Result<()> {
        let module = lower_snippet(|_| vec![LlvmInst::Unreachable])?;

        let func = module.func(module.lookup("f").expect("registered"));
        let entry = func.entry_block.expect("the function has a body");
        assert!(func.block(entry).is_err);
        assert_eq!(func.ops().count(), 1);
        Ok(())
    }

    // Failures

    #[test]
    fn dynamic_allocas_are_rejected() {
        let result = lower_snippet(|module| {
            let int32 = module.types.int_type(32);
            vec![
                LlvmInst::Alloca {
                    result: "slot".into(),
                    ty:     int32,
                    count:  local("a"),
                },
                LlvmInst::Ret { value: None },
            ]
        });
        assert!(matches!(result, Err(Error::DynamicAlloca(name)) if name == "slot"));
    }

    #[test]
    fn unknown_arithmetic_opcodes_are_rejected() {
        let result = lower_snippet(|module| {
            let int32 = module.types.int_type(32);
            vec![
                LlvmInst::Binary {
                    result: "x".into(),
                    op:     "fadd".into(),
                    ty:     int32,
                    lhs:    local("a"),
                    rhs:    local("b"),
                },
                LlvmInst::Ret { value: None },
            ]
        });
        assert!(matches!(result, Err(Error::UnknownArithOpcode(op)) if op == "fadd"));
    }

    #[test]
    fn unknown_callees_are_fatal() {
        let result = lower_snippet(|module| {
            let void = module.types.void_type();
            vec![
                LlvmInst::Call {
                    result: None,
                    callee: Callee::Symbol("_ZN5Magic6appearEv".into()),
                    ret:    void,
                    args:   Vec::new(),
                },
                LlvmInst::Ret { value: None },
            ]
        });
        assert!(matches!(result, Err(Error::UnknownCallee(_))));
    }

    #[test]
    fn unclaimed_intrinsics_are_unsupported() {
        let result = lower_snippet(|module| {
            let void = module.types.void_type();
            vec![
                LlvmInst::Call {
                    result: None,
                    callee: Callee::Symbol("llvm.fshl.i32".into()),
                    ret:    void,
                    args:   Vec::new(),
                },
                LlvmInst::Ret { value: None },
            ]
        });
        assert!(matches!(result, Err(Error::UnsupportedInstruction(_))));
    }

    #[test]
    fn unknown_assembly_templates_are_fatal() {
        let result = lower_snippet(|module| {
            let int32 = module.types.int_type(32);
            vec![
                LlvmInst::Call {
                    result: None,
                    callee: Callee::Asm {
                        template: "cpuid".into(),
                    },
                    ret:    int32,
                    args:   vec![(int32, local("a"))],
                },
                LlvmInst::Ret { value: None },
            ]
        });
        assert!(matches!(result, Err(Error::UnknownInlineAsm(template)) if template == "cpuid"));
    }

    #[test]
    fn loads_never_synthesize_their_pointer() {
        let result = lower_snippet(|module| {
            let int32 = module.types.int_type(32);
            vec![
                LlvmInst::Load {
                    result: "x".into(),
                    ty:     int32,
                    ptr:    local("missing"),
                },
                LlvmInst::Ret { value: None },
            ]
        });
        assert!(matches!(result, Err(Error::MalformedFunction(_, why)) if why.contains("missing")));
    }
}
