//! Integer arithmetic, comparisons and casts.
//!
//! All operators here require both operands to have the same integer type
//! (fixed-width or `BigInt`). Fixed-width results wrap modulo `2^width`.

use log::debug;

use crate::error::{ExprError, Result};
use crate::node::{intern, mk_bool, mk_constant, ordered, tables, ArithOp, CmpOp, Expr, ExprKind};
use crate::types::Type;
use crate::value::Value;

fn check_integers(op: &'static str, a: &Expr, b: &Expr) -> Result<()> {
    if a.ty() != b.ty() {
        return Err(ExprError::mismatch(op, a.ty(), b.ty()));
    }
    if !a.ty().is_integer() {
        return Err(ExprError::unsupported(op, a.ty()));
    }
    Ok(())
}

fn is_zero(e: &Expr) -> bool {
    match (e.as_constant(), Value::zero(e.ty())) {
        (Some(value), Some(zero)) => *value == zero,
        _ => false,
    }
}

fn is_one(e: &Expr) -> bool {
    match (e.as_constant(), Value::one(e.ty())) {
        (Some(value), Some(one)) => *value == one,
        _ => false,
    }
}

fn zero_of(e: &Expr) -> Result<Expr> {
    // Only called after `check_integers`.
    Value::zero(e.ty())
        .map(mk_constant)
        .ok_or_else(|| ExprError::unsupported("zero", e.ty()))
}

pub fn mk_arith(op: ArithOp, f: &Expr, g: &Expr) -> Result<Expr> {
    debug!("mk_arith(op = {:?}, f = {}, g = {})", op, f.id(), g.id());
    check_integers(op.symbol(), f, g)?;

    if let (Some(a), Some(b)) = (f.as_constant(), g.as_constant()) {
        if let Some(res) = Value::arith(op, a, b) {
            debug!("{}(const,const) => const", op.symbol());
            return Ok(mk_constant(res));
        }
    }

    match op {
        ArithOp::Add | ArithOp::BitOr | ArithOp::BitXor => {
            if is_zero(g) {
                debug!("F {} 0 => F", op.symbol());
                return Ok(f.clone());
            }
            if is_zero(f) {
                debug!("0 {} G => G", op.symbol());
                return Ok(g.clone());
            }
        }
        ArithOp::Sub => {
            if is_zero(g) {
                debug!("F - 0 => F");
                return Ok(f.clone());
            }
        }
        ArithOp::Mul => {
            if is_zero(f) || is_zero(g) {
                debug!("F * 0 => 0");
                return zero_of(f);
            }
            if is_one(g) {
                debug!("F * 1 => F");
                return Ok(f.clone());
            }
            if is_one(f) {
                debug!("1 * G => G");
                return Ok(g.clone());
            }
        }
        ArithOp::BitAnd => {
            if is_zero(f) || is_zero(g) {
                debug!("F & 0 => 0");
                return zero_of(f);
            }
        }
    }

    if f == g {
        match op {
            ArithOp::Sub | ArithOp::BitXor => {
                debug!("F {} F => 0", op.symbol());
                return zero_of(f);
            }
            ArithOp::BitAnd | ArithOp::BitOr => {
                debug!("F {} F => F", op.symbol());
                return Ok(f.clone());
            }
            _ => {}
        }
    }

    let (f, g) = if op.is_commutative() { ordered(f, g) } else { (f, g) };
    let ty = f.ty().clone();
    let (f, g) = (f.clone(), g.clone());
    Ok(intern(&tables().arith, (op, f.id(), g.id()), ty, || ExprKind::Arith(op, f, g)))
}

pub fn mk_add(f: &Expr, g: &Expr) -> Result<Expr> {
    mk_arith(ArithOp::Add, f, g)
}

pub fn mk_sub(f: &Expr, g: &Expr) -> Result<Expr> {
    mk_arith(ArithOp::Sub, f, g)
}

pub fn mk_mul(f: &Expr, g: &Expr) -> Result<Expr> {
    mk_arith(ArithOp::Mul, f, g)
}

pub fn mk_bit_and(f: &Expr, g: &Expr) -> Result<Expr> {
    mk_arith(ArithOp::BitAnd, f, g)
}

pub fn mk_bit_or(f: &Expr, g: &Expr) -> Result<Expr> {
    mk_arith(ArithOp::BitOr, f, g)
}

pub fn mk_bit_xor(f: &Expr, g: &Expr) -> Result<Expr> {
    mk_arith(ArithOp::BitXor, f, g)
}

pub fn mk_bit_not(f: &Expr) -> Result<Expr> {
    debug!("mk_bit_not(f = {})", f.id());
    if !f.ty().is_integer() {
        return Err(ExprError::unsupported("~", f.ty()));
    }

    if let Some(res) = f.as_constant().and_then(Value::bit_not) {
        debug!("~const => const");
        return Ok(mk_constant(res));
    }
    if let ExprKind::BitNot(inner) = f.kind() {
        debug!("~~F => F");
        return Ok(inner.clone());
    }

    let ty = f.ty().clone();
    let f = f.clone();
    Ok(intern(&tables().bit_not, f.id(), ty, || ExprKind::BitNot(f)))
}

/// Ordering comparison. `>` and `>=` are stored as `<` and `<=` with swapped operands.
pub fn mk_compare(op: CmpOp, f: &Expr, g: &Expr) -> Result<Expr> {
    debug!("mk_compare(op = {:?}, f = {}, g = {})", op, f.id(), g.id());
    check_integers(op.symbol(), f, g)?;

    if let (Some(a), Some(b)) = (f.as_constant(), g.as_constant()) {
        if let Some(res) = Value::compare(op, a, b) {
            debug!("{}(const,const) => const", op.symbol());
            return Ok(mk_bool(res));
        }
    }
    if f == g {
        debug!("F {} F => {}", op.symbol(), op.is_reflexive());
        return Ok(mk_bool(op.is_reflexive()));
    }

    let (op, f, g) = match op {
        CmpOp::Gt => (CmpOp::Lt, g, f),
        CmpOp::Geq => (CmpOp::Leq, g, f),
        _ => (op, f, g),
    };
    let (f, g) = (f.clone(), g.clone());
    Ok(intern(&tables().compare, (op, f.id(), g.id()), Type::Bool, || {
        ExprKind::Compare(op, f, g)
    }))
}

pub fn mk_lt(f: &Expr, g: &Expr) -> Result<Expr> {
    mk_compare(CmpOp::Lt, f, g)
}

pub fn mk_leq(f: &Expr, g: &Expr) -> Result<Expr> {
    mk_compare(CmpOp::Leq, f, g)
}

pub fn mk_gt(f: &Expr, g: &Expr) -> Result<Expr> {
    mk_compare(CmpOp::Gt, f, g)
}

pub fn mk_geq(f: &Expr, g: &Expr) -> Result<Expr> {
    mk_compare(CmpOp::Geq, f, g)
}

/// Convert an integer expression to another integer type.
pub fn mk_cast(f: &Expr, target: &Type) -> Result<Expr> {
    debug!("mk_cast(f = {}, target = {})", f.id(), target);
    if !f.ty().is_integer() || !target.is_integer() {
        return Err(ExprError::InvalidCast {
            from: f.ty().to_string(),
            to: target.to_string(),
        });
    }

    if f.ty() == target {
        debug!("cast(F: T, T) => F");
        return Ok(f.clone());
    }
    if let Some(res) = f.as_constant().and_then(|value| value.cast(target)) {
        debug!("cast(const) => const");
        return Ok(mk_constant(res));
    }

    let f = f.clone();
    Ok(intern(&tables().cast, (f.id(), target.clone()), target.clone(), || {
        ExprKind::Cast(f)
    }))
}
