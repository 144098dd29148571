//! The identifier types used to refer into the IR's arenas.
//!
//! Every entity lives in an arena on its owner: variables, operations and
//! blocks on their [`crate::Function`], functions and types on their
//! [`crate::Module`]. Identifiers are plain indices wrapped for type safety,
//! and are only meaningful for the arena that minted them.

/// Declares an arena identifier newtype.
macro_rules! arena_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
        pub struct $name(u32);

        impl $name {
            /// Wraps an arena index.
            ///
            /// # Panics
            ///
            /// - If `index` does not fit the identifier's representation.
            #[must_use]
            pub(crate) fn from_index(index: usize) -> Self {
                Self(
                    u32::try_from(index)
                        .expect("internal consistency error: arena overflowed the id space"),
                )
            }

            /// Gets the position of the referenced entity in its arena.
            #[must_use]
            pub fn index(self) -> usize {
                self.0 as usize
            }
        }
    };
}

arena_id! {
    /// A reference to a type in a [`crate::TypeStore`].
    TypeId
}

arena_id! {
    /// A reference to a variable in its owning function.
    VarId
}

arena_id! {
    /// A reference to an operation in its owning function.
    OpId
}

arena_id! {
    /// A reference to a basic block in its owning function.
    BlockId
}

arena_id! {
    /// A reference to a function in its owning module.
    FuncId
}
