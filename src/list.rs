//! Lists: construction and case split.
//!
//! A case split binds two fresh argument nodes, the head and the tail, and
//! evaluates its cons branch with both bound. Recursion over a list is
//! expressed by applying a [`Lambda`][crate::lambda::Lambda] to the tail
//! inside the cons branch.

use log::debug;

use crate::error::{ExprError, Result};
use crate::node::{check_type, intern, mk_argument, tables, Expr, ExprKind, ListCase};
use crate::types::Type;
use crate::value::Value;

fn element_of(op: &'static str, list: &Expr) -> Result<Type> {
    list.ty()
        .element()
        .cloned()
        .ok_or_else(|| ExprError::unsupported(op, list.ty()))
}

/// The empty list of `element`s.
pub fn mk_list_empty(element: Type) -> Expr {
    let ty = Type::list(element);
    intern(&tables().list_empty, ty.clone(), ty, || ExprKind::ListEmpty)
}

/// The list with first element `head` followed by `tail`.
pub fn mk_list_cons(head: &Expr, tail: &Expr) -> Result<Expr> {
    debug!("mk_list_cons(head = {}, tail = {})", head.id(), tail.id());
    let element = element_of("cons", tail)?;
    check_type("cons", head, &element)?;

    let ty = tail.ty().clone();
    let (head, tail) = (head.clone(), tail.clone());
    Ok(intern(&tables().list_cons, (head.id(), tail.id()), ty, || {
        ExprKind::ListCons(head, tail)
    }))
}

/// The list holding `items` in order.
pub fn mk_list(element: Type, items: &[Expr]) -> Result<Expr> {
    items
        .iter()
        .rev()
        .try_fold(mk_list_empty(element), |tail, head| mk_list_cons(head, &tail))
}

/// Case split over `list`: `empty` if it has no elements, otherwise the result
/// of `cons` applied to fresh head and tail arguments.
pub fn mk_list_case<F>(list: &Expr, empty: &Expr, cons: F) -> Result<Expr>
where
    F: FnOnce(&Expr, &Expr) -> Result<Expr>,
{
    let element = element_of("case", list)?;
    let head = mk_argument(element);
    let tail = mk_argument(list.ty().clone());
    let body = cons(&head, &tail)?;
    mk_list_case_bound(list, empty, &head, &tail, &body)
}

/// Case split with explicitly supplied head and tail arguments.
///
/// `head` and `tail` must be argument nodes of the element and list type.
pub fn mk_list_case_bound(list: &Expr, empty: &Expr, head: &Expr, tail: &Expr, cons: &Expr) -> Result<Expr> {
    debug!("mk_list_case(list = {}, empty = {}, cons = {})", list.id(), empty.id(), cons.id());
    let element = element_of("case", list)?;
    if head.arg_id().is_none() {
        return Err(ExprError::mismatch("case head", "argument", head.kind().name()));
    }
    if tail.arg_id().is_none() {
        return Err(ExprError::mismatch("case tail", "argument", tail.kind().name()));
    }
    check_type("case head", head, &element)?;
    check_type("case tail", tail, list.ty())?;
    if empty.ty() != cons.ty() {
        return Err(ExprError::mismatch("case", empty.ty(), cons.ty()));
    }

    let is_empty = match list.kind() {
        ExprKind::ListEmpty => true,
        ExprKind::Constant(Value::List { items, .. }) => items.is_empty(),
        _ => false,
    };
    if is_empty {
        debug!("case([], E, C) => E");
        return Ok(empty.clone());
    }

    let ty = empty.ty().clone();
    let case = ListCase {
        list: list.clone(),
        empty: empty.clone(),
        head: head.clone(),
        tail: tail.clone(),
        cons: cons.clone(),
    };
    let key = (list.id(), empty.id(), head.id(), tail.id(), cons.id());
    Ok(intern(&tables().list_case, key, ty, || ExprKind::ListCase(case)))
}
