use thiserror::Error;

use crate::reference::{ArgId, LambdaId, NodeId};

/// Errors raised while building, rewriting or interpreting expressions.
///
/// Construction errors are reported before anything is interned, so a
/// malformed node never enters a hash-cons table.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ExprError {
    #[error("type mismatch in {op}: expected {expected}, found {found}")]
    TypeMismatch {
        op: &'static str,
        expected: String,
        found: String,
    },

    #[error("{op} is not supported over type {ty}")]
    UnsupportedType { op: &'static str, ty: String },

    #[error("type {ty} has no field `{field}`")]
    UnknownField { ty: String, field: String },

    #[error("duplicate field `{field}` in object {object}")]
    DuplicateField { object: String, field: String },

    #[error("object {object} has {expected} fields, got {found}")]
    FieldCount {
        object: String,
        expected: usize,
        found: usize,
    },

    #[error("cannot cast {from} to {to}")]
    InvalidCast { from: String, to: String },

    #[error("argument {0} is not bound in the current environment")]
    UnboundArgument(ArgId),

    #[error("lambda {0} is applied before its body is assigned")]
    UnclosedLambda(LambdaId),

    #[error("lambda {0} already has a body")]
    LambdaAlreadyClosed(LambdaId),

    #[error("value {value} bound to {name} does not have type {expected}")]
    BindingType {
        name: String,
        value: String,
        expected: String,
    },

    #[error("transformer rewrote {node} of type {expected} into type {found}")]
    TransformerType {
        node: NodeId,
        expected: String,
        found: String,
    },
}

pub type Result<T, E = ExprError> = std::result::Result<T, E>;

impl ExprError {
    pub(crate) fn mismatch(op: &'static str, expected: impl ToString, found: impl ToString) -> Self {
        ExprError::TypeMismatch {
            op,
            expected: expected.to_string(),
            found: found.to_string(),
        }
    }

    pub(crate) fn unsupported(op: &'static str, ty: impl ToString) -> Self {
        ExprError::UnsupportedType {
            op,
            ty: ty.to_string(),
        }
    }
}
