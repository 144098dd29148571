//! Basic blocks and their outgoing edges.
//!
//! Control flow is a property of the block, not of its operations. A block
//! carries an ordered list of conditional branches followed by an optional
//! unconditional default, or it ends the function as a return or an error
//! exit.

use crate::id::{BlockId, OpId, VarId};

/// One conditional edge out of a block: if `cond` holds, control moves to
/// `target`.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct CondBranch {
    pub cond:   VarId,
    pub target: BlockId,
}

/// A basic block.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct BasicBlock {
    /// The block's label.
    pub name: String,

    /// The operations of the block, in execution order.
    pub ops: Vec<OpId>,

    /// The conditional branches out of the block, tested in order.
    pub branches: Vec<CondBranch>,

    /// Where control goes when no conditional branch fires.
    pub default_next: Option<BlockId>,

    /// Set if the block returns from the function.
    pub is_return: bool,

    /// Set if reaching the block is an error exit.
    pub is_err: bool,

    /// The returned value, if the block returns one.
    pub ret_val: Option<VarId>,
}

impl BasicBlock {
    /// Creates an empty, unterminated block called `name`.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name:         name.into(),
            ops:          Vec::new(),
            branches:     Vec::new(),
            default_next: None,
            is_return:    false,
            is_err:       false,
            ret_val:      None,
        }
    }

    /// Gets every block control can move to from this one, conditional
    /// targets first.
    #[must_use]
    pub fn successors(&self) -> Vec<BlockId> {
        let mut targets: Vec<BlockId> = self.branches.iter().map(|b| b.target).collect();
        targets.extend(self.default_next);
        targets
    }

    /// Checks if the block has an ending: a default successor, a return, or
    /// an error exit.
    #[must_use]
    pub fn is_terminated(&self) -> bool {
        self.is_return || self.is_err || self.default_next.is_some()
    }
}
