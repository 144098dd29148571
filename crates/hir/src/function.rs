//! Functions as arenas of variables, operations and blocks.
//!
//! A [`Function`] owns three flat arenas indexed by [`VarId`], [`OpId`] and
//! [`BlockId`]. Identifiers are plain indices, so cloning a function yields
//! an isomorphic copy in which every identifier remains valid. Operations
//! are only ever created through [`Function::append_op`], which keeps the
//! op's parent block and the result variables' provenance consistent.

use crate::{
    block::BasicBlock,
    id::{BlockId, FuncId, OpId, TypeId, VarId},
    operation::{OpKind, Operation},
    value::{Var, VarUse},
};

/// One lowered function.
#[derive(Clone, Debug)]
pub struct Function {
    /// The function's name, as shown to the user.
    pub name: String,

    /// The variable arena.
    vars: Vec<Var>,

    /// The operation arena.
    ops: Vec<Operation>,

    /// The block arena.
    blocks: Vec<BasicBlock>,

    /// The block execution starts in, once one exists.
    pub entry_block: Option<BlockId>,

    /// The parameter variables, in declaration order.
    pub params: Vec<VarId>,

    /// The parameter types, matching `params` positionally.
    pub arg_types: Vec<TypeId>,

    /// The type of the returned value.
    pub ret_type: TypeId,

    /// Every function this one calls, without duplicates.
    pub callees: Vec<FuncId>,

    /// Set if the function is a built-in known to the lowering engine
    /// rather than one lowered from input.
    pub is_built_in: bool,
}

impl Function {
    /// Creates an empty function called `name` returning `ret_type`.
    #[must_use]
    pub fn new(name: impl Into<String>, ret_type: TypeId) -> Self {
        Self {
            name:        name.into(),
            vars:        Vec::new(),
            ops:         Vec::new(),
            blocks:      Vec::new(),
            entry_block: None,
            params:      Vec::new(),
            arg_types:   Vec::new(),
            ret_type,
            callees:     Vec::new(),
            is_built_in: false,
        }
    }

    /// Adds `var` to the function.
    pub fn add_var(&mut self, var: Var) -> VarId {
        let id = VarId::from_index(self.vars.len());
        self.vars.push(var);
        id
    }

    /// Adds a parameter called `name` of type `ty`, registering it in the
    /// parameter lists.
    pub fn add_param(&mut self, name: impl Into<String>, ty: TypeId) -> VarId {
        let var = Var {
            is_param: true,
            ..Var::new(name, ty)
        };
        let id = self.add_var(var);
        self.params.push(id);
        self.arg_types.push(ty);
        id
    }

    /// Gets the variable referenced by `id`.
    ///
    /// # Panics
    ///
    /// - If `id` does not come from this function.
    #[must_use]
    pub fn var(&self, id: VarId) -> &Var {
        self.vars
            .get(id.index())
            .expect("internal consistency error: variable id out of range")
    }

    /// Gets the variable referenced by `id` mutably.
    ///
    /// # Panics
    ///
    /// - If `id` does not come from this function.
    pub fn var_mut(&mut self, id: VarId) -> &mut Var {
        self.vars
            .get_mut(id.index())
            .expect("internal consistency error: variable id out of range")
    }

    /// Iterates over all variables with their identifiers.
    pub fn vars(&self) -> impl Iterator<Item = (VarId, &Var)> {
        self.vars
            .iter()
            .enumerate()
            .map(|(i, v)| (VarId::from_index(i), v))
    }

    /// Adds `block` to the function.
    pub fn add_block(&mut self, block: BasicBlock) -> BlockId {
        let id = BlockId::from_index(self.blocks.len());
        self.blocks.push(block);
        id
    }

    /// Gets the block referenced by `id`.
    ///
    /// # Panics
    ///
    /// - If `id` does not come from this function.
    #[must_use]
    pub fn block(&self, id: BlockId) -> &BasicBlock {
        self.blocks
            .get(id.index())
            .expect("internal consistency error: block id out of range")
    }

    /// Gets the block referenced by `id` mutably.
    ///
    /// # Panics
    ///
    /// - If `id` does not come from this function.
    pub fn block_mut(&mut self, id: BlockId) -> &mut BasicBlock {
        self.blocks
            .get_mut(id.index())
            .expect("internal consistency error: block id out of range")
    }

    /// Iterates over all blocks with their identifiers.
    pub fn blocks(&self) -> impl Iterator<Item = (BlockId, &BasicBlock)> {
        self.blocks
            .iter()
            .enumerate()
            .map(|(i, b)| (BlockId::from_index(i), b))
    }

    /// Appends an operation of `kind` to the end of `block`, consuming
    /// `args` and defining `results`. The result variables' provenance is
    /// set to the new operation.
    ///
    /// # Panics
    ///
    /// - If `block` or any of the variables do not come from this function.
    pub fn append_op(
        &mut self,
        block: BlockId,
        kind: OpKind,
        args: Vec<VarId>,
        results: Vec<VarId>,
    ) -> OpId {
        let id = OpId::from_index(self.ops.len());
        for result in &results {
            self.var_mut(*result).src_op = Some(id);
        }
        self.ops.push(Operation {
            kind,
            args,
            results,
            parent: block,
            note:   None,
        });
        self.block_mut(block).ops.push(id);
        id
    }

    /// Gets the operation referenced by `id`.
    ///
    /// # Panics
    ///
    /// - If `id` does not come from this function.
    #[must_use]
    pub fn op(&self, id: OpId) -> &Operation {
        self.ops
            .get(id.index())
            .expect("internal consistency error: operation id out of range")
    }

    /// Gets the operation referenced by `id` mutably.
    ///
    /// # Panics
    ///
    /// - If `id` does not come from this function.
    pub fn op_mut(&mut self, id: OpId) -> &mut Operation {
        self.ops
            .get_mut(id.index())
            .expect("internal consistency error: operation id out of range")
    }

    /// Iterates over all operations with their identifiers.
    pub fn ops(&self) -> impl Iterator<Item = (OpId, &Operation)> {
        self.ops
            .iter()
            .enumerate()
            .map(|(i, o)| (OpId::from_index(i), o))
    }

    /// Registers `callee` as called by this function, once.
    pub fn add_callee(&mut self, callee: FuncId) {
        if !self.callees.contains(&callee) {
            self.callees.push(callee);
        }
    }

    /// Recomputes every variable's use list from scratch, from the
    /// operation arguments and the branch conditions.
    pub fn update_uses(&mut self) {
        for var in &mut self.vars {
            var.uses.clear();
        }

        let mut uses: Vec<(VarId, VarUse)> = Vec::new();
        for (id, op) in self.ops() {
            uses.extend(op.args.iter().map(|arg| (*arg, VarUse::Op(id))));
        }
        for (id, block) in self.blocks() {
            let conds = block.branches.iter();
            uses.extend(conds.map(|branch| (branch.cond, VarUse::BranchCond(id))));
        }

        for (var, site) in uses {
            self.var_mut(var).uses.push(site);
        }
    }

    /// Drops every operation's annotation.
    pub fn clear_notes(&mut self) {
        for op in &mut self.ops {
            op.note = None;
        }
    }

    /// Checks if the function has no body.
    #[must_use]
    pub fn is_declaration(&self) -> bool {
        self.blocks.is_empty()
    }
}
