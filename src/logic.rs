//! Boolean connectives, equality and conditionals.

use log::debug;

use crate::error::{ExprError, Result};
use crate::node::{check_type, intern, mk_bool, ordered, tables, Expr, ExprKind};
use crate::types::Type;

fn is_negation_of(f: &Expr, g: &Expr) -> bool {
    matches!(f.kind(), ExprKind::Not(inner) if inner == g) || matches!(g.kind(), ExprKind::Not(inner) if inner == f)
}

pub fn mk_not(f: &Expr) -> Result<Expr> {
    debug!("mk_not(f = {})", f.id());
    check_type("not", f, &Type::Bool)?;

    if let Some(b) = f.as_bool() {
        debug!("not(const) => const");
        return Ok(mk_bool(!b));
    }
    if let ExprKind::Not(inner) = f.kind() {
        debug!("not(not(F)) => F");
        return Ok(inner.clone());
    }

    let f = f.clone();
    Ok(intern(&tables().not, f.id(), Type::Bool, || ExprKind::Not(f)))
}

pub fn mk_and(f: &Expr, g: &Expr) -> Result<Expr> {
    debug!("mk_and(f = {}, g = {})", f.id(), g.id());
    check_type("and", f, &Type::Bool)?;
    check_type("and", g, &Type::Bool)?;

    match (f.as_bool(), g.as_bool()) {
        (Some(false), _) | (_, Some(false)) => {
            debug!("and(0,G) => 0");
            return Ok(mk_bool(false));
        }
        (Some(true), _) => {
            debug!("and(1,G) => G");
            return Ok(g.clone());
        }
        (_, Some(true)) => {
            debug!("and(F,1) => F");
            return Ok(f.clone());
        }
        _ => {}
    }
    if f == g {
        debug!("and(F,F) => F");
        return Ok(f.clone());
    }
    if is_negation_of(f, g) {
        debug!("and(F,~F) => 0");
        return Ok(mk_bool(false));
    }

    let (f, g) = ordered(f, g);
    let (f, g) = (f.clone(), g.clone());
    Ok(intern(&tables().and, (f.id(), g.id()), Type::Bool, || ExprKind::And(f, g)))
}

pub fn mk_or(f: &Expr, g: &Expr) -> Result<Expr> {
    debug!("mk_or(f = {}, g = {})", f.id(), g.id());
    check_type("or", f, &Type::Bool)?;
    check_type("or", g, &Type::Bool)?;

    match (f.as_bool(), g.as_bool()) {
        (Some(true), _) | (_, Some(true)) => {
            debug!("or(1,G) => 1");
            return Ok(mk_bool(true));
        }
        (Some(false), _) => {
            debug!("or(0,G) => G");
            return Ok(g.clone());
        }
        (_, Some(false)) => {
            debug!("or(F,0) => F");
            return Ok(f.clone());
        }
        _ => {}
    }
    if f == g {
        debug!("or(F,F) => F");
        return Ok(f.clone());
    }
    if is_negation_of(f, g) {
        debug!("or(F,~F) => 1");
        return Ok(mk_bool(true));
    }

    let (f, g) = ordered(f, g);
    let (f, g) = (f.clone(), g.clone());
    Ok(intern(&tables().or, (f.id(), g.id()), Type::Bool, || ExprKind::Or(f, g)))
}

/// `f -> g`, encoded as `~f | g`.
pub fn mk_implies(f: &Expr, g: &Expr) -> Result<Expr> {
    mk_or(&mk_not(f)?, g)
}

pub fn mk_and_many<'a>(exprs: impl IntoIterator<Item = &'a Expr>) -> Result<Expr> {
    let mut res = mk_bool(true);
    for e in exprs {
        res = mk_and(&res, e)?;
    }
    Ok(res)
}

pub fn mk_or_many<'a>(exprs: impl IntoIterator<Item = &'a Expr>) -> Result<Expr> {
    let mut res = mk_bool(false);
    for e in exprs {
        res = mk_or(&res, e)?;
    }
    Ok(res)
}

/// Structural equality. Supported over every type except lists.
pub fn mk_eq(f: &Expr, g: &Expr) -> Result<Expr> {
    debug!("mk_eq(f = {}, g = {})", f.id(), g.id());
    if f.ty() != g.ty() {
        return Err(ExprError::mismatch("eq", f.ty(), g.ty()));
    }
    if matches!(f.ty(), Type::List(_)) {
        return Err(ExprError::unsupported("eq", f.ty()));
    }

    if f == g {
        debug!("eq(F,F) => 1");
        return Ok(mk_bool(true));
    }
    if let (Some(a), Some(b)) = (f.as_constant(), g.as_constant()) {
        debug!("eq(const,const) => const");
        return Ok(mk_bool(a == b));
    }
    if f.ty().is_bool() {
        // eq(F,1) => F and eq(F,0) => ~F
        match (f.as_bool(), g.as_bool()) {
            (Some(true), _) => return Ok(g.clone()),
            (_, Some(true)) => return Ok(f.clone()),
            (Some(false), _) => return mk_not(g),
            (_, Some(false)) => return mk_not(f),
            _ => {}
        }
    }

    let (f, g) = ordered(f, g);
    let (f, g) = (f.clone(), g.clone());
    Ok(intern(&tables().equal, (f.id(), g.id()), Type::Bool, || ExprKind::Equal(f, g)))
}

/// Conditional `if guard then t else e`.
pub fn mk_if(guard: &Expr, t: &Expr, e: &Expr) -> Result<Expr> {
    debug!("mk_if(guard = {}, t = {}, e = {})", guard.id(), t.id(), e.id());
    check_type("if", guard, &Type::Bool)?;
    if t.ty() != e.ty() {
        return Err(ExprError::mismatch("if", t.ty(), e.ty()));
    }

    if let Some(b) = guard.as_bool() {
        debug!("if(const,T,E) => T or E");
        return Ok(if b { t.clone() } else { e.clone() });
    }
    if t == e {
        debug!("if(G,T,T) => T");
        return Ok(t.clone());
    }
    if let ExprKind::Not(inner) = guard.kind() {
        debug!("if(~G,T,E) => if(G,E,T)");
        return mk_if(inner, e, t);
    }
    if t.ty().is_bool() {
        match (t.as_bool(), e.as_bool()) {
            (Some(true), Some(false)) => {
                debug!("if(G,1,0) => G");
                return Ok(guard.clone());
            }
            (Some(false), Some(true)) => {
                debug!("if(G,0,1) => ~G");
                return mk_not(guard);
            }
            _ => {}
        }
    }

    let ty = t.ty().clone();
    let (guard, t, e) = (guard.clone(), t.clone(), e.clone());
    Ok(intern(&tables().ite, (guard.id(), t.id(), e.id()), ty, || ExprKind::If(guard, t, e)))
}
