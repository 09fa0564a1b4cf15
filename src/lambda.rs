//! Self-referential lambda cells.
//!
//! A recursive operation over unbounded data is represented by a finite DAG
//! whose body refers back to the cell that contains it:
//!
//! 1. allocate an open cell with [`Lambda::new`];
//! 2. build a body that applies the cell wherever the recursive call occurs;
//! 3. close the cell with [`Lambda::close`], exactly once.
//!
//! After step 3 the cell is frozen. [`Lambda::define`] performs the three
//! steps in one go.
//!
//! A recursive cell owns its body and the body owns an application of the
//! cell, so such cells are never freed. They are meant to be built once and
//! shared, see [`definitions`][crate::definitions].

use std::fmt;
use std::sync::{Arc, OnceLock};

use log::debug;

use crate::error::{ExprError, Result};
use crate::interpreter::{interpret, Environment};
use crate::node::{intern, mk_argument, tables, Expr, ExprKind};
use crate::reference::{ArgId, LambdaId};
use crate::types::Type;
use crate::value::Value;

struct LambdaCell {
    id: LambdaId,
    argument: Expr,
    ret: Type,
    body: OnceLock<Expr>,
}

/// Shared handle to a lambda cell. Equality is by identity.
#[derive(Clone)]
pub struct Lambda(Arc<LambdaCell>);

impl Lambda {
    /// Allocate an open cell taking `arg` and returning `ret`.
    pub fn new(arg: Type, ret: Type) -> Self {
        Self::with_argument(mk_argument(arg), ret)
    }

    fn with_argument(argument: Expr, ret: Type) -> Self {
        let id = LambdaId::fresh();
        debug!("new lambda {}({}: {}) -> {}", id, argument, argument.ty(), ret);
        Self(Arc::new(LambdaCell {
            id,
            argument,
            ret,
            body: OnceLock::new(),
        }))
    }

    /// Allocate a cell, build its body from the open cell and its argument, and close it.
    pub fn define<F>(arg: Type, ret: Type, build: F) -> Result<Self>
    where
        F: FnOnce(&Lambda, &Expr) -> Result<Expr>,
    {
        let lambda = Lambda::new(arg, ret);
        let body = build(&lambda, lambda.argument())?;
        lambda.close(body)?;
        Ok(lambda)
    }

    /// Build a non-recursive function; the return type is the body type.
    pub fn function<F>(arg: Type, build: F) -> Result<Self>
    where
        F: FnOnce(&Expr) -> Result<Expr>,
    {
        let argument = mk_argument(arg);
        let body = build(&argument)?;
        let lambda = Lambda::with_argument(argument, body.ty().clone());
        lambda.close(body)?;
        Ok(lambda)
    }

    pub fn id(&self) -> LambdaId {
        self.0.id
    }

    /// The argument node the body refers to.
    pub fn argument(&self) -> &Expr {
        &self.0.argument
    }

    pub fn argument_id(&self) -> ArgId {
        match self.0.argument.kind() {
            ExprKind::Argument(arg) => *arg,
            _ => unreachable!("lambda argument is always an argument node"),
        }
    }

    pub fn argument_type(&self) -> &Type {
        self.0.argument.ty()
    }

    pub fn return_type(&self) -> &Type {
        &self.0.ret
    }

    pub fn body(&self) -> Option<&Expr> {
        self.0.body.get()
    }

    pub fn is_closed(&self) -> bool {
        self.0.body.get().is_some()
    }

    /// Assign the body. Fails if the cell is already closed or the body has the wrong type.
    pub fn close(&self, body: Expr) -> Result<()> {
        if body.ty() != &self.0.ret {
            return Err(ExprError::mismatch("lambda body", &self.0.ret, body.ty()));
        }
        debug!("close lambda {} with body {}", self.id(), body.id());
        self.0
            .body
            .set(body)
            .map_err(|_| ExprError::LambdaAlreadyClosed(self.id()))
    }

    /// Interpret the body with the argument bound to `value`.
    pub fn evaluate(&self, value: Value) -> Result<Value> {
        let body = self.body().ok_or(ExprError::UnclosedLambda(self.id()))?;
        let env = Environment::new().with_argument(self.argument_id(), value);
        interpret(body, &env)
    }
}

impl PartialEq for Lambda {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for Lambda {}

impl fmt::Debug for Lambda {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Lambda")
            .field("id", &self.id())
            .field("argument", &self.argument_id())
            .field("ret", &self.0.ret)
            .field("closed", &self.is_closed())
            .finish()
    }
}

/// Apply `lambda` to `arg`. The cell may still be open.
pub fn mk_apply(lambda: &Lambda, arg: &Expr) -> Result<Expr> {
    debug!("mk_apply(lambda = {}, arg = {})", lambda.id(), arg.id());
    if arg.ty() != lambda.argument_type() {
        return Err(ExprError::mismatch("apply", lambda.argument_type(), arg.ty()));
    }
    let lambda = lambda.clone();
    let ty = lambda.return_type().clone();
    let arg = arg.clone();
    Ok(intern(&tables().apply, (lambda.id(), arg.id()), ty, || {
        ExprKind::Apply(lambda, arg)
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    use test_log::test;

    use crate::arith::{mk_add, mk_leq, mk_sub};
    use crate::logic::mk_if;
    use crate::node::mk_int;
    use crate::types::IntType;

    fn i32_ty() -> Type {
        Type::int(IntType::I32)
    }

    #[test]
    fn test_function_evaluate() {
        let f = Lambda::function(i32_ty(), |x| {
            let one = mk_int(IntType::I32, 1);
            let zero = mk_int(IntType::I32, 0);
            mk_if(&mk_leq(x, &zero)?, &mk_add(x, &one)?, &mk_sub(x, &one)?)
        })
        .unwrap();

        assert_eq!(f.evaluate(Value::i32(5)).unwrap(), Value::i32(4));
        assert_eq!(f.evaluate(Value::i32(-3)).unwrap(), Value::i32(-2));
        assert_eq!(f.return_type(), &i32_ty());
    }

    #[test]
    fn test_close_twice_fails() {
        let f = Lambda::new(i32_ty(), i32_ty());
        f.close(f.argument().clone()).unwrap();
        let res = f.close(mk_int(IntType::I32, 0));
        assert_eq!(res, Err(ExprError::LambdaAlreadyClosed(f.id())));
    }

    #[test]
    fn test_close_wrong_type_fails() {
        let f = Lambda::new(i32_ty(), Type::Bool);
        let res = f.close(mk_int(IntType::I32, 0));
        assert!(matches!(res, Err(ExprError::TypeMismatch { .. })));
        assert!(!f.is_closed());
    }

    #[test]
    fn test_evaluate_open_fails() {
        let f = Lambda::new(i32_ty(), i32_ty());
        assert_eq!(f.evaluate(Value::i32(0)), Err(ExprError::UnclosedLambda(f.id())));
    }

    #[test]
    fn test_apply_interning() {
        let f = Lambda::new(i32_ty(), i32_ty());
        let x = mk_int(IntType::I32, 3);
        let a = mk_apply(&f, &x).unwrap();
        let b = mk_apply(&f, &x).unwrap();
        assert_eq!(a, b);

        // Same shape, different cell.
        let g = Lambda::new(i32_ty(), i32_ty());
        assert_ne!(a, mk_apply(&g, &x).unwrap());
    }

    #[test]
    fn test_apply_wrong_argument_type() {
        let f = Lambda::new(i32_ty(), i32_ty());
        let res = mk_apply(&f, &mk_int(IntType::U8, 1));
        assert!(matches!(res, Err(ExprError::TypeMismatch { .. })));
    }
}
