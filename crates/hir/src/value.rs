//! Variables and their use sites.
//!
//! Every value flowing through a function is a [`Var`] held in that
//! function's arena. Constants and undefined values are variables too, with
//! the corresponding flag set, so operations only ever refer to [`VarId`]s.

use crate::id::{BlockId, OpId, TypeId};

/// One place a variable is consumed.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum VarUse {
    /// The variable is an argument of the given operation.
    Op(OpId),

    /// The variable is the condition of a conditional branch out of the
    /// given block.
    BranchCond(BlockId),
}

/// A variable in a function.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Var {
    /// The variable's type.
    pub ty: TypeId,

    /// The variable's name, without any leading sigil.
    pub name: String,

    /// The constant value, if this variable is a known integer constant.
    pub const_val: Option<i64>,

    /// Set if this variable stands for an undefined value.
    pub is_undef: bool,

    /// Set if this variable is a parameter of its function.
    pub is_param: bool,

    /// The element state slot this variable gives access to, if any.
    pub state_slot: Option<usize>,

    /// The operation that produces this variable, if any.
    pub src_op: Option<OpId>,

    /// Every place this variable is consumed. Maintained by
    /// [`crate::function::Function::update_uses`].
    pub uses: Vec<VarUse>,
}

impl Var {
    /// Creates a plain variable called `name` of type `ty`.
    #[must_use]
    pub fn new(name: impl Into<String>, ty: TypeId) -> Self {
        Self {
            ty,
            name:       name.into(),
            const_val:  None,
            is_undef:   false,
            is_param:   false,
            state_slot: None,
            src_op:     None,
            uses:       Vec::new(),
        }
    }

    /// Creates a constant variable of type `ty` holding `value`. The decimal
    /// rendering of the value doubles as the variable's name.
    #[must_use]
    pub fn constant(ty: TypeId, value: i64) -> Self {
        Self {
            const_val: Some(value),
            ..Self::new(value.to_string(), ty)
        }
    }

    /// Creates an undefined variable of type `ty`.
    #[must_use]
    pub fn undef(ty: TypeId) -> Self {
        Self {
            is_undef: true,
            ..Self::new("undef", ty)
        }
    }

    /// Checks if this variable is a known constant.
    #[must_use]
    pub fn is_const(&self) -> bool {
        self.const_val.is_some()
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use crate::{id::TypeId, value::Var};

    fn some_type() -> TypeId {
        TypeId::from_index(0)
    }

    #[test]
    fn constants_are_named_after_their_value() {
        let var = Var::constant(some_type(), -7);
        assert_eq!(var.name, "-7");
        assert_eq!(var.const_val, Some(-7));
        assert!(var.is_const());
        assert!(!var.is_undef);
    }

    #[test]
    fn plain_variables_carry_no_value() {
        let var = Var::new("tmp3", some_type());
        assert_eq!(var.name, "tmp3");
        assert!(!var.is_const());
        assert!(var.uses.is_empty());
        assert!(var.src_op.is_none());
    }

    #[test]
    fn undef_variables_are_flagged() {
        let var = Var::undef(some_type());
        assert!(var.is_undef);
        assert!(!var.is_const());
    }
}
