//! Operations and the closed set of operation kinds.
//!
//! An [`Operation`] is one step of a basic block: a kind, the variables it
//! consumes, and the variables it defines. Control flow never appears here;
//! branches and returns live on the blocks themselves.

use crate::id::{BlockId, FuncId, TypeId, VarId};

/// The comparison predicates that survive lowering. Signed and unsigned
/// greater-than forms are canonicalized away by swapping operands, so only
/// the less-than family remains.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CmpCond {
    Eq,
    Ne,
    Sle,
    Slt,
    Ule,
    Ult,
}

impl CmpCond {
    /// Gets the suffix this predicate prints with.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            CmpCond::Eq => "eq",
            CmpCond::Ne => "ne",
            CmpCond::Sle => "sle",
            CmpCond::Slt => "slt",
            CmpCond::Ule => "ule",
            CmpCond::Ult => "ult",
        }
    }
}

/// The arithmetic and bitwise operators, including the integer resizing
/// casts, which behave like unary arithmetic.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ArithKind {
    Add,
    And,
    AshR,
    Cmp(CmpCond),
    DivS,
    DivU,
    LshR,
    Mul,
    Or,
    RemS,
    RemU,
    SExt,
    Shl,
    Sub,
    Trunc,
    Xor,
    ZExt,
}

impl ArithKind {
    /// Gets the mnemonic this operator prints as.
    #[must_use]
    pub fn name(self) -> String {
        match self {
            ArithKind::Add => "add".into(),
            ArithKind::And => "and".into(),
            ArithKind::AshR => "ashr".into(),
            ArithKind::Cmp(cond) => format!("cmp.{}", cond.name()),
            ArithKind::DivS => "div.s".into(),
            ArithKind::DivU => "div.u".into(),
            ArithKind::LshR => "lshr".into(),
            ArithKind::Mul => "mul".into(),
            ArithKind::Or => "or".into(),
            ArithKind::RemS => "rem.s".into(),
            ArithKind::RemU => "rem.u".into(),
            ArithKind::SExt => "sext".into(),
            ArithKind::Shl => "shl".into(),
            ArithKind::Sub => "sub".into(),
            ArithKind::Trunc => "trunc".into(),
            ArithKind::Xor => "xor".into(),
            ArithKind::ZExt => "zext".into(),
        }
    }
}

/// What an operation does. The set is closed: lowering either produces one
/// of these kinds or rejects the input function.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum OpKind {
    /// Reserves stack space for `count` values of the `allocated` type,
    /// yielding a pointer to it.
    Alloca { allocated: TypeId, count: u64 },

    /// Applies an arithmetic or bitwise operator to the arguments.
    Arith(ArithKind),

    /// Reinterprets the sole argument at the result's type.
    Bitcast,

    /// Calls another lowered function with the arguments.
    FuncCall { callee: FuncId },

    /// Computes an address from a base pointer of type `base` and index
    /// arguments.
    Gep { base: TypeId },

    /// Reads the value behind the sole pointer argument.
    Load,

    /// Merges one value per predecessor block, positionally matched with the
    /// arguments.
    Phi { incoming: Vec<BlockId> },

    /// Strips the outermost header from the packet argument.
    PktDecap,

    /// Prepends a header to the packet argument.
    PktEncap,

    /// Reads a header field of the packet argument.
    PktHdrLoad,

    /// Writes a header field of the packet argument.
    PktHdrStore,

    /// Chooses between the second and third argument by the first.
    Select,

    /// Writes the first argument through the second, a pointer.
    Store,

    /// Reads the field at `indices` out of the aggregate argument.
    StructGet { indices: Vec<u32> },

    /// Replaces the field at `indices` of the aggregate argument, yielding
    /// the updated aggregate.
    StructSet { indices: Vec<u32> },

    /// Marks a path the source promises is never taken.
    Unreachable,
}

impl OpKind {
    /// Checks whether removing an operation of this kind would change the
    /// program even when its results are unused.
    #[must_use]
    pub fn has_side_effect(&self) -> bool {
        matches!(
            self,
            OpKind::Store
                | OpKind::FuncCall { .. }
                | OpKind::PktHdrStore
                | OpKind::PktEncap
                | OpKind::PktDecap
                | OpKind::Unreachable
        )
    }
}

/// Extra information attached to an operation by the lowering passes.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Note {
    /// The symbol a call was resolved from.
    CallInfo { symbol: String },

    /// The packet header and field a load or store was matched to.
    PktField { header: String, field: String },

    /// The element state slot an access was matched to.
    StateRef { slot: usize },
}

/// One operation in a basic block.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Operation {
    /// What the operation does.
    pub kind: OpKind,

    /// The variables the operation consumes, in positional order.
    pub args: Vec<VarId>,

    /// The variables the operation defines.
    pub results: Vec<VarId>,

    /// The block the operation belongs to.
    pub parent: BlockId,

    /// An annotation attached by lowering, if any.
    pub note: Option<Note>,
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use crate::operation::{ArithKind, CmpCond, OpKind};

    #[test]
    fn arith_mnemonics_distinguish_signedness() {
        assert_eq!(ArithKind::DivS.name(), "div.s");
        assert_eq!(ArithKind::DivU.name(), "div.u");
        assert_eq!(ArithKind::RemS.name(), "rem.s");
        assert_eq!(ArithKind::Cmp(CmpCond::Ule).name(), "cmp.ule");
        assert_eq!(ArithKind::ZExt.name(), "zext");
    }

    #[test]
    fn side_effects_are_recognized() {
        assert!(OpKind::Store.has_side_effect());
        assert!(OpKind::PktHdrStore.has_side_effect());
        assert!(OpKind::Unreachable.has_side_effect());
        assert!(!OpKind::Load.has_side_effect());
        assert!(!OpKind::Arith(ArithKind::Add).has_side_effect());
        assert!(!OpKind::Select.has_side_effect());
    }
}
