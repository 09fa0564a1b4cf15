//! Identity handles.
//!
//! Every node, argument, symbolic placeholder and lambda cell receives a
//! unique number when it is created. Numbers are drawn from process-wide
//! monotonic counters and are never reused, so an identifier that was seen
//! once can never alias a different object later, even after the original
//! object has been dropped.

use std::fmt::{Display, Formatter};
use std::sync::atomic::{AtomicU64, Ordering};

macro_rules! identifier {
    ($(#[$meta:meta])* $name:ident, $counter:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
        pub struct $name(u64);

        static $counter: AtomicU64 = AtomicU64::new(1);

        impl $name {
            /// Allocate a fresh, never used before, identifier.
            pub(crate) fn fresh() -> Self {
                Self($counter.fetch_add(1, Ordering::Relaxed))
            }

            /// Return the raw number.
            pub const fn get(self) -> u64 {
                self.0
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
                write!(f, concat!($prefix, "{}"), self.0)
            }
        }
    };
}

identifier!(
    /// Identity of an interned expression node.
    ///
    /// Node ids double as the total order used to put the operands of
    /// commutative operators into canonical order.
    NodeId,
    NEXT_NODE,
    "@"
);

identifier!(
    /// Identity of an argument placeholder (a lambda parameter or a list-case binder).
    ArgId,
    NEXT_ARG,
    "$"
);

identifier!(
    /// Identity of a symbolic placeholder whose value a solver chooses.
    VarId,
    NEXT_VAR,
    "?"
);

identifier!(
    /// Identity of a self-referential lambda cell.
    LambdaId,
    NEXT_LAMBDA,
    "λ"
);

#[cfg(test)]
mod tests {
    use super::*;

    use test_log::test;

    #[test]
    fn test_fresh_ids_are_increasing() {
        let a = NodeId::fresh();
        let b = NodeId::fresh();
        assert!(a < b);
        assert_ne!(a, b);
    }

    #[test]
    fn test_display() {
        let v = VarId(7);
        assert_eq!(v.to_string(), "?7");
        let x = ArgId(3);
        assert_eq!(x.to_string(), "$3");
        assert_eq!(NodeId(12).to_string(), "@12");
    }
}
