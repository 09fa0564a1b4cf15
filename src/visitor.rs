//! Visitor and transformer dispatch over the node family.
//!
//! A [`Visitor`] computes an arbitrary result from a node; a [`Transformer`]
//! rewrites a node into another node of the same value type. Both traits have
//! one required method per node kind and no defaults, so an analysis that
//! forgets a kind does not compile.
//!
//! Dispatch is a single `match` over [`ExprKind`] in [`Expr::accept`] and
//! [`Expr::accept_transformer`]; the node kinds know nothing about the
//! analyses built on top of them.

use log::trace;

use crate::error::{ExprError, Result};
use crate::lambda::Lambda;
use crate::node::{ArithOp, CmpOp, Expr, ExprKind, ListCase};
use crate::reference::{ArgId, VarId};
use crate::value::Value;

/// An analysis producing an `R` from each node, threading a parameter `P`.
///
/// Every method receives the visited node itself followed by its fields.
/// Recursion into children is up to the implementation.
pub trait Visitor<P, R> {
    fn visit_constant(&mut self, expr: &Expr, value: &Value, param: P) -> R;
    fn visit_arbitrary(&mut self, expr: &Expr, var: VarId, param: P) -> R;
    fn visit_argument(&mut self, expr: &Expr, arg: ArgId, param: P) -> R;
    fn visit_not(&mut self, expr: &Expr, f: &Expr, param: P) -> R;
    fn visit_and(&mut self, expr: &Expr, f: &Expr, g: &Expr, param: P) -> R;
    fn visit_or(&mut self, expr: &Expr, f: &Expr, g: &Expr, param: P) -> R;
    fn visit_arith(&mut self, expr: &Expr, op: ArithOp, f: &Expr, g: &Expr, param: P) -> R;
    fn visit_bit_not(&mut self, expr: &Expr, f: &Expr, param: P) -> R;
    fn visit_equal(&mut self, expr: &Expr, f: &Expr, g: &Expr, param: P) -> R;
    fn visit_compare(&mut self, expr: &Expr, op: CmpOp, f: &Expr, g: &Expr, param: P) -> R;
    fn visit_if(&mut self, expr: &Expr, guard: &Expr, t: &Expr, e: &Expr, param: P) -> R;
    fn visit_get_field(&mut self, expr: &Expr, obj: &Expr, index: usize, param: P) -> R;
    fn visit_with_field(&mut self, expr: &Expr, obj: &Expr, index: usize, value: &Expr, param: P) -> R;
    fn visit_create_object(&mut self, expr: &Expr, fields: &[Expr], param: P) -> R;
    fn visit_list_empty(&mut self, expr: &Expr, param: P) -> R;
    fn visit_list_cons(&mut self, expr: &Expr, head: &Expr, tail: &Expr, param: P) -> R;
    fn visit_list_case(&mut self, expr: &Expr, case: &ListCase, param: P) -> R;
    fn visit_apply(&mut self, expr: &Expr, lambda: &Lambda, arg: &Expr, param: P) -> R;
    fn visit_cast(&mut self, expr: &Expr, f: &Expr, param: P) -> R;
}

/// A structure-preserving rewrite.
///
/// Each method must return a node of the same value type as `expr`;
/// [`Expr::accept_transformer`] rejects anything else.
pub trait Transformer {
    fn transform_constant(&mut self, expr: &Expr, value: &Value) -> Result<Expr>;
    fn transform_arbitrary(&mut self, expr: &Expr, var: VarId) -> Result<Expr>;
    fn transform_argument(&mut self, expr: &Expr, arg: ArgId) -> Result<Expr>;
    fn transform_not(&mut self, expr: &Expr, f: &Expr) -> Result<Expr>;
    fn transform_and(&mut self, expr: &Expr, f: &Expr, g: &Expr) -> Result<Expr>;
    fn transform_or(&mut self, expr: &Expr, f: &Expr, g: &Expr) -> Result<Expr>;
    fn transform_arith(&mut self, expr: &Expr, op: ArithOp, f: &Expr, g: &Expr) -> Result<Expr>;
    fn transform_bit_not(&mut self, expr: &Expr, f: &Expr) -> Result<Expr>;
    fn transform_equal(&mut self, expr: &Expr, f: &Expr, g: &Expr) -> Result<Expr>;
    fn transform_compare(&mut self, expr: &Expr, op: CmpOp, f: &Expr, g: &Expr) -> Result<Expr>;
    fn transform_if(&mut self, expr: &Expr, guard: &Expr, t: &Expr, e: &Expr) -> Result<Expr>;
    fn transform_get_field(&mut self, expr: &Expr, obj: &Expr, index: usize) -> Result<Expr>;
    fn transform_with_field(&mut self, expr: &Expr, obj: &Expr, index: usize, value: &Expr) -> Result<Expr>;
    fn transform_create_object(&mut self, expr: &Expr, fields: &[Expr]) -> Result<Expr>;
    fn transform_list_empty(&mut self, expr: &Expr) -> Result<Expr>;
    fn transform_list_cons(&mut self, expr: &Expr, head: &Expr, tail: &Expr) -> Result<Expr>;
    fn transform_list_case(&mut self, expr: &Expr, case: &ListCase) -> Result<Expr>;
    fn transform_apply(&mut self, expr: &Expr, lambda: &Lambda, arg: &Expr) -> Result<Expr>;
    fn transform_cast(&mut self, expr: &Expr, f: &Expr) -> Result<Expr>;
}

impl Expr {
    /// Dispatch to the `visitor` method matching this node's kind.
    pub fn accept<P, R, V>(&self, visitor: &mut V, param: P) -> R
    where
        V: Visitor<P, R> + ?Sized,
    {
        match self.kind() {
            ExprKind::Constant(value) => visitor.visit_constant(self, value, param),
            ExprKind::Arbitrary(var) => visitor.visit_arbitrary(self, *var, param),
            ExprKind::Argument(arg) => visitor.visit_argument(self, *arg, param),
            ExprKind::Not(f) => visitor.visit_not(self, f, param),
            ExprKind::And(f, g) => visitor.visit_and(self, f, g, param),
            ExprKind::Or(f, g) => visitor.visit_or(self, f, g, param),
            ExprKind::Arith(op, f, g) => visitor.visit_arith(self, *op, f, g, param),
            ExprKind::BitNot(f) => visitor.visit_bit_not(self, f, param),
            ExprKind::Equal(f, g) => visitor.visit_equal(self, f, g, param),
            ExprKind::Compare(op, f, g) => visitor.visit_compare(self, *op, f, g, param),
            ExprKind::If(guard, t, e) => visitor.visit_if(self, guard, t, e, param),
            ExprKind::GetField(obj, index) => visitor.visit_get_field(self, obj, *index, param),
            ExprKind::WithField(obj, index, value) => visitor.visit_with_field(self, obj, *index, value, param),
            ExprKind::CreateObject(fields) => visitor.visit_create_object(self, fields, param),
            ExprKind::ListEmpty => visitor.visit_list_empty(self, param),
            ExprKind::ListCons(head, tail) => visitor.visit_list_cons(self, head, tail, param),
            ExprKind::ListCase(case) => visitor.visit_list_case(self, case, param),
            ExprKind::Apply(lambda, arg) => visitor.visit_apply(self, lambda, arg, param),
            ExprKind::Cast(f) => visitor.visit_cast(self, f, param),
        }
    }

    /// Dispatch to the `transformer` method matching this node's kind and
    /// check that the rewritten node keeps this node's value type.
    pub fn accept_transformer<T>(&self, transformer: &mut T) -> Result<Expr>
    where
        T: Transformer + ?Sized,
    {
        let res = match self.kind() {
            ExprKind::Constant(value) => transformer.transform_constant(self, value),
            ExprKind::Arbitrary(var) => transformer.transform_arbitrary(self, *var),
            ExprKind::Argument(arg) => transformer.transform_argument(self, *arg),
            ExprKind::Not(f) => transformer.transform_not(self, f),
            ExprKind::And(f, g) => transformer.transform_and(self, f, g),
            ExprKind::Or(f, g) => transformer.transform_or(self, f, g),
            ExprKind::Arith(op, f, g) => transformer.transform_arith(self, *op, f, g),
            ExprKind::BitNot(f) => transformer.transform_bit_not(self, f),
            ExprKind::Equal(f, g) => transformer.transform_equal(self, f, g),
            ExprKind::Compare(op, f, g) => transformer.transform_compare(self, *op, f, g),
            ExprKind::If(guard, t, e) => transformer.transform_if(self, guard, t, e),
            ExprKind::GetField(obj, index) => transformer.transform_get_field(self, obj, *index),
            ExprKind::WithField(obj, index, value) => transformer.transform_with_field(self, obj, *index, value),
            ExprKind::CreateObject(fields) => transformer.transform_create_object(self, fields),
            ExprKind::ListEmpty => transformer.transform_list_empty(self),
            ExprKind::ListCons(head, tail) => transformer.transform_list_cons(self, head, tail),
            ExprKind::ListCase(case) => transformer.transform_list_case(self, case),
            ExprKind::Apply(lambda, arg) => transformer.transform_apply(self, lambda, arg),
            ExprKind::Cast(f) => transformer.transform_cast(self, f),
        }?;

        if res.ty() != self.ty() {
            return Err(ExprError::TransformerType {
                node: self.id(),
                expected: self.ty().to_string(),
                found: res.ty().to_string(),
            });
        }
        trace!("transform {} => {}", self.id(), res.id());
        Ok(res)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use test_log::test;

    use crate::arith::mk_add;
    use crate::logic::{mk_and, mk_not};
    use crate::node::{mk_arbitrary, mk_bool, mk_int};
    use crate::types::{IntType, Type};

    /// Counts nodes by kind name, without sharing.
    struct KindCounter {
        seen: Vec<&'static str>,
    }

    impl KindCounter {
        fn walk(&mut self, expr: &Expr) {
            expr.accept(self, ());
        }

        fn walk_all(&mut self, exprs: &[&Expr]) {
            for e in exprs {
                self.walk(e);
            }
        }
    }

    impl Visitor<(), ()> for KindCounter {
        fn visit_constant(&mut self, _: &Expr, _: &Value, _: ()) {
            self.seen.push("const");
        }
        fn visit_arbitrary(&mut self, _: &Expr, _: VarId, _: ()) {
            self.seen.push("arbitrary");
        }
        fn visit_argument(&mut self, _: &Expr, _: ArgId, _: ()) {
            self.seen.push("arg");
        }
        fn visit_not(&mut self, _: &Expr, f: &Expr, _: ()) {
            self.seen.push("not");
            self.walk(f);
        }
        fn visit_and(&mut self, _: &Expr, f: &Expr, g: &Expr, _: ()) {
            self.seen.push("and");
            self.walk_all(&[f, g]);
        }
        fn visit_or(&mut self, _: &Expr, f: &Expr, g: &Expr, _: ()) {
            self.seen.push("or");
            self.walk_all(&[f, g]);
        }
        fn visit_arith(&mut self, _: &Expr, _: ArithOp, f: &Expr, g: &Expr, _: ()) {
            self.seen.push("arith");
            self.walk_all(&[f, g]);
        }
        fn visit_bit_not(&mut self, _: &Expr, f: &Expr, _: ()) {
            self.seen.push("bitnot");
            self.walk(f);
        }
        fn visit_equal(&mut self, _: &Expr, f: &Expr, g: &Expr, _: ()) {
            self.seen.push("eq");
            self.walk_all(&[f, g]);
        }
        fn visit_compare(&mut self, _: &Expr, _: CmpOp, f: &Expr, g: &Expr, _: ()) {
            self.seen.push("cmp");
            self.walk_all(&[f, g]);
        }
        fn visit_if(&mut self, _: &Expr, guard: &Expr, t: &Expr, e: &Expr, _: ()) {
            self.seen.push("if");
            self.walk_all(&[guard, t, e]);
        }
        fn visit_get_field(&mut self, _: &Expr, obj: &Expr, _: usize, _: ()) {
            self.seen.push("get");
            self.walk(obj);
        }
        fn visit_with_field(&mut self, _: &Expr, obj: &Expr, _: usize, value: &Expr, _: ()) {
            self.seen.push("with");
            self.walk_all(&[obj, value]);
        }
        fn visit_create_object(&mut self, _: &Expr, fields: &[Expr], _: ()) {
            self.seen.push("create");
            for f in fields {
                self.walk(f);
            }
        }
        fn visit_list_empty(&mut self, _: &Expr, _: ()) {
            self.seen.push("nil");
        }
        fn visit_list_cons(&mut self, _: &Expr, head: &Expr, tail: &Expr, _: ()) {
            self.seen.push("cons");
            self.walk_all(&[head, tail]);
        }
        fn visit_list_case(&mut self, _: &Expr, case: &ListCase, _: ()) {
            self.seen.push("case");
            self.walk_all(&[&case.list, &case.empty, &case.cons]);
        }
        fn visit_apply(&mut self, _: &Expr, _: &Lambda, arg: &Expr, _: ()) {
            self.seen.push("apply");
            self.walk(arg);
        }
        fn visit_cast(&mut self, _: &Expr, f: &Expr, _: ()) {
            self.seen.push("cast");
            self.walk(f);
        }
    }

    #[test]
    fn test_visitor_dispatch() {
        let x = mk_arbitrary(Type::Bool);
        let y = mk_arbitrary(Type::Bool);
        let f = mk_and(&x, &mk_not(&y).unwrap()).unwrap();

        let mut counter = KindCounter { seen: Vec::new() };
        counter.walk(&f);
        counter.seen.sort();
        assert_eq!(counter.seen, vec!["and", "arbitrary", "arbitrary", "not"]);
    }

    /// Replaces every node by a constant `true`, whatever its type.
    struct Broken;

    impl Transformer for Broken {
        fn transform_constant(&mut self, _: &Expr, _: &Value) -> Result<Expr> {
            Ok(mk_bool(true))
        }
        fn transform_arbitrary(&mut self, _: &Expr, _: VarId) -> Result<Expr> {
            Ok(mk_bool(true))
        }
        fn transform_argument(&mut self, _: &Expr, _: ArgId) -> Result<Expr> {
            Ok(mk_bool(true))
        }
        fn transform_not(&mut self, _: &Expr, _: &Expr) -> Result<Expr> {
            Ok(mk_bool(true))
        }
        fn transform_and(&mut self, _: &Expr, _: &Expr, _: &Expr) -> Result<Expr> {
            Ok(mk_bool(true))
        }
        fn transform_or(&mut self, _: &Expr, _: &Expr, _: &Expr) -> Result<Expr> {
            Ok(mk_bool(true))
        }
        fn transform_arith(&mut self, _: &Expr, _: ArithOp, _: &Expr, _: &Expr) -> Result<Expr> {
            Ok(mk_bool(true))
        }
        fn transform_bit_not(&mut self, _: &Expr, _: &Expr) -> Result<Expr> {
            Ok(mk_bool(true))
        }
        fn transform_equal(&mut self, _: &Expr, _: &Expr, _: &Expr) -> Result<Expr> {
            Ok(mk_bool(true))
        }
        fn transform_compare(&mut self, _: &Expr, _: CmpOp, _: &Expr, _: &Expr) -> Result<Expr> {
            Ok(mk_bool(true))
        }
        fn transform_if(&mut self, _: &Expr, _: &Expr, _: &Expr, _: &Expr) -> Result<Expr> {
            Ok(mk_bool(true))
        }
        fn transform_get_field(&mut self, _: &Expr, _: &Expr, _: usize) -> Result<Expr> {
            Ok(mk_bool(true))
        }
        fn transform_with_field(&mut self, _: &Expr, _: &Expr, _: usize, _: &Expr) -> Result<Expr> {
            Ok(mk_bool(true))
        }
        fn transform_create_object(&mut self, _: &Expr, _: &[Expr]) -> Result<Expr> {
            Ok(mk_bool(true))
        }
        fn transform_list_empty(&mut self, _: &Expr) -> Result<Expr> {
            Ok(mk_bool(true))
        }
        fn transform_list_cons(&mut self, _: &Expr, _: &Expr, _: &Expr) -> Result<Expr> {
            Ok(mk_bool(true))
        }
        fn transform_list_case(&mut self, _: &Expr, _: &ListCase) -> Result<Expr> {
            Ok(mk_bool(true))
        }
        fn transform_apply(&mut self, _: &Expr, _: &Lambda, _: &Expr) -> Result<Expr> {
            Ok(mk_bool(true))
        }
        fn transform_cast(&mut self, _: &Expr, _: &Expr) -> Result<Expr> {
            Ok(mk_bool(true))
        }
    }

    #[test]
    fn test_transformer_type_is_checked() {
        let b = mk_arbitrary(Type::Bool);
        assert_eq!(b.accept_transformer(&mut Broken).unwrap(), mk_bool(true));

        let x = mk_arbitrary(Type::int(IntType::I32));
        let sum = mk_add(&x, &mk_int(IntType::I32, 1)).unwrap();
        let res = sum.accept_transformer(&mut Broken);
        assert!(matches!(res, Err(ExprError::TransformerType { node, .. }) if node == sum.id()));
    }
}
