//! The instruction model for serialized modules.
//!
//! Each [`LlvmInst`] mirrors one LLVM instruction closely enough that the
//! lowering passes can reconstruct its semantics, while staying independent
//! of any particular LLVM version. Operands are [`LlvmValue`]s, which name
//! locals and globals symbolically rather than by reference, exactly as the
//! textual form of a module does.

use serde::{Deserialize, Serialize};

use crate::types::LlvmTypeId;

/// An operand of an instruction.
#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub enum LlvmValue {
    /// An integer constant of the given bit width.
    ConstInt { bits: u32, value: i64 },

    /// A reference to the module-level global `@name`.
    Global(String),

    /// A reference to the local value `%name` defined elsewhere in the
    /// enclosing function.
    Local(String),

    /// The null pointer constant of pointer type `ty`.
    Null { ty: LlvmTypeId },

    /// The undefined value of type `ty`.
    Undef { ty: LlvmTypeId },
}

/// The condition codes of the `icmp` instruction.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub enum IcmpCond {
    Eq,
    Ne,
    Sge,
    Sgt,
    Sle,
    Slt,
    Uge,
    Ugt,
    Ule,
    Ult,
}

/// The cast instructions we model.
///
/// Pointer-integer casts are listed separately from `bitcast` in the source
/// modules, but all three are value-preserving at this level.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub enum CastOp {
    Bitcast,
    IntToPtr,
    PtrToInt,
    SExt,
    Trunc,
    ZExt,
}

/// The target of a call instruction.
#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub enum Callee {
    /// A call through an inline assembly template.
    Asm { template: String },

    /// A direct call to the symbol `name`.
    Symbol(String),
}

/// A single instruction.
///
/// Block labels in terminators and phi nodes refer to the `label` field of
/// the blocks in the enclosing function.
#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub enum LlvmInst {
    /// Reserves stack space for `count` values of type `ty`.
    Alloca {
        result: String,
        ty:     LlvmTypeId,
        count:  LlvmValue,
    },

    /// An integer or bitwise operation, identified by its opcode name such
    /// as `add` or `lshr`.
    Binary {
        result: String,
        op:     String,
        ty:     LlvmTypeId,
        lhs:    LlvmValue,
        rhs:    LlvmValue,
    },

    /// An unconditional branch.
    Br { dest: String },

    /// A direct, assembly or intrinsic call.
    Call {
        result: Option<String>,
        callee: Callee,
        ret:    LlvmTypeId,
        args:   Vec<(LlvmTypeId, LlvmValue)>,
    },

    /// A value-preserving or width-changing cast to type `to`.
    Cast {
        result: String,
        op:     CastOp,
        to:     LlvmTypeId,
        value:  LlvmValue,
    },

    /// A two-way conditional branch on the boolean `cond`.
    CondBr {
        cond:     LlvmValue,
        if_true:  String,
        if_false: String,
    },

    /// Reads the field of the aggregate value `base` selected by `indices`.
    ExtractValue {
        result:  String,
        ty:      LlvmTypeId,
        base:    LlvmValue,
        indices: Vec<u32>,
    },

    /// Computes the address of a member of the object `base` points to.
    ///
    /// `base_ty` is the pointee type of `base`, and the first index steps
    /// over the pointer itself, as in the source form.
    Gep {
        result:  String,
        base_ty: LlvmTypeId,
        base:    LlvmValue,
        indices: Vec<LlvmValue>,
    },

    /// An integer comparison producing an `i1`.
    ICmp {
        result: String,
        cond:   IcmpCond,
        ty:     LlvmTypeId,
        lhs:    LlvmValue,
        rhs:    LlvmValue,
    },

    /// Builds a copy of the aggregate `base` with one field replaced.
    InsertValue {
        result:  String,
        ty:      LlvmTypeId,
        base:    LlvmValue,
        value:   LlvmValue,
        indices: Vec<u32>,
    },

    /// Reads a value of type `ty` from the address `ptr`.
    Load {
        result: String,
        ty:     LlvmTypeId,
        ptr:    LlvmValue,
    },

    /// Merges values flowing in from predecessor blocks.
    Phi {
        result:   String,
        ty:       LlvmTypeId,
        incoming: Vec<(LlvmValue, String)>,
    },

    /// Returns from the function, optionally with a value.
    Ret { value: Option<LlvmValue> },

    /// Chooses between two values based on the boolean `cond`.
    Select {
        result:   String,
        ty:       LlvmTypeId,
        cond:     LlvmValue,
        if_true:  LlvmValue,
        if_false: LlvmValue,
    },

    /// Writes `value` of type `ty` to the address `ptr`.
    Store {
        ty:    LlvmTypeId,
        value: LlvmValue,
        ptr:   LlvmValue,
    },

    /// A multi-way branch on an integer value.
    Switch {
        value:   LlvmValue,
        ty:      LlvmTypeId,
        default: String,
        cases:   Vec<(i64, String)>,
    },

    /// Marks the current location as unreachable.
    Unreachable,
}

impl LlvmInst {
    /// Gets the name of the local this instruction defines, if it defines
    /// one.
    #[must_use]
    pub fn result(&self) -> Option<&str> {
        match self {
            LlvmInst::Alloca { result, .. }
            | LlvmInst::Binary { result, .. }
            | LlvmInst::Cast { result, .. }
            | LlvmInst::ExtractValue { result, .. }
            | LlvmInst::Gep { result, .. }
            | LlvmInst::ICmp { result, .. }
            | LlvmInst::InsertValue { result, .. }
            | LlvmInst::Load { result, .. }
            | LlvmInst::Phi { result, .. }
            | LlvmInst::Select { result, .. } => Some(result),
            LlvmInst::Call { result, .. } => result.as_deref(),
            LlvmInst::Br { .. }
            | LlvmInst::CondBr { .. }
            | LlvmInst::Ret { .. }
            | LlvmInst::Store { .. }
            | LlvmInst::Switch { .. }
            | LlvmInst::Unreachable => None,
        }
    }

    /// Checks whether this instruction ends a basic block.
    #[must_use]
    pub fn is_terminator(&self) -> bool {
        matches!(
            self,
            LlvmInst::Br { .. }
                | LlvmInst::CondBr { .. }
                | LlvmInst::Ret { .. }
                | LlvmInst::Switch { .. }
                | LlvmInst::Unreachable
        )
    }

    /// Gets the opcode name of this instruction, for use in diagnostics.
    #[must_use]
    pub fn opcode(&self) -> &str {
        match self {
            LlvmInst::Alloca { .. } => "alloca",
            LlvmInst::Binary { op, .. } => op,
            LlvmInst::Br { .. } | LlvmInst::CondBr { .. } => "br",
            LlvmInst::Call { .. } => "call",
            LlvmInst::Cast { op, .. } => match op {
                CastOp::Bitcast => "bitcast",
                CastOp::IntToPtr => "inttoptr",
                CastOp::PtrToInt => "ptrtoint",
                CastOp::SExt => "sext",
                CastOp::Trunc => "trunc",
                CastOp::ZExt => "zext",
            },
            LlvmInst::ExtractValue { .. } => "extractvalue",
            LlvmInst::Gep { .. } => "getelementptr",
            LlvmInst::ICmp { .. } => "icmp",
            LlvmInst::InsertValue { .. } => "insertvalue",
            LlvmInst::Load { .. } => "load",
            LlvmInst::Phi { .. } => "phi",
            LlvmInst::Ret { .. } => "ret",
            LlvmInst::Select { .. } => "select",
            LlvmInst::Store { .. } => "store",
            LlvmInst::Switch { .. } => "switch",
            LlvmInst::Unreachable => "unreachable",
        }
    }
}
