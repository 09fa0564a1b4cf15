//! Standard recursive operations over lists.
//!
//! Each operation is defined once per element type (and, for the
//! higher-order ones, once per function lambda) as a self-referential
//! [`Lambda`], and cached in a process-wide table. Every call site then
//! shares that one definition, and building `length(xs)` a thousand times
//! adds a thousand application nodes but no new cells.
//!
//! Operations with two inputs take a single [`Pair`][ObjectSchema::pair]
//! argument.
//!
//! Cached definitions are never freed.

use std::sync::{Mutex, MutexGuard, OnceLock, PoisonError};

use log::debug;
use rustc_hash::FxHashMap;

use crate::arith::mk_add;
use crate::error::{ExprError, Result};
use crate::lambda::{mk_apply, Lambda};
use crate::list::{mk_list_case, mk_list_cons, mk_list_empty};
use crate::logic::{mk_eq, mk_if, mk_or};
use crate::node::{mk_bool, mk_int, Expr};
use crate::object::{mk_create_object, mk_get_field};
use crate::reference::LambdaId;
use crate::types::{IntType, ObjectSchema, Type};

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Operation {
    Length,
    Append,
    /// Reverse the first list onto the second.
    ReverseOnto,
    Reverse,
    Contains,
    Map,
    Filter,
    Fold,
}

#[derive(Debug, Clone, Eq, PartialEq, Hash)]
struct DefinitionKey {
    op: Operation,
    element: Type,
    function: Option<LambdaId>,
}

static DEFINITIONS: OnceLock<Mutex<FxHashMap<DefinitionKey, Lambda>>> = OnceLock::new();

fn definitions() -> MutexGuard<'static, FxHashMap<DefinitionKey, Lambda>> {
    DEFINITIONS
        .get_or_init(Default::default)
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
}

/// Number of cached definitions.
pub fn definition_count() -> usize {
    definitions().len()
}

/// Return the cached definition for `key`, building it on a miss.
///
/// The definition is built outside the lock, so builders may request other
/// definitions. If two threads race, the first one to finish wins.
fn cached<F>(key: DefinitionKey, build: F) -> Result<Lambda>
where
    F: FnOnce() -> Result<Lambda>,
{
    if let Some(lambda) = definitions().get(&key) {
        return Ok(lambda.clone());
    }
    debug!("building {:?} over {}", key.op, key.element);
    let lambda = build()?;
    Ok(definitions().entry(key).or_insert(lambda).clone())
}

fn key(op: Operation, element: &Type, function: Option<&Lambda>) -> DefinitionKey {
    DefinitionKey {
        op,
        element: element.clone(),
        function: function.map(Lambda::id),
    }
}

fn element_of(op: &'static str, xs: &Expr) -> Result<Type> {
    xs.ty().element().cloned().ok_or_else(|| ExprError::unsupported(op, xs.ty()))
}

fn pair(first: &Expr, second: &Expr) -> Result<Expr> {
    let schema = ObjectSchema::pair(first.ty().clone(), second.ty().clone());
    mk_create_object(&schema, &[first.clone(), second.clone()])
}

fn unpair(p: &Expr) -> Result<(Expr, Expr)> {
    Ok((mk_get_field(p, "item1")?, mk_get_field(p, "item2")?))
}

fn check_function(op: &'static str, f: &Lambda, arg: &Type, ret: &Type) -> Result<()> {
    if f.argument_type() != arg {
        return Err(ExprError::mismatch(op, arg, f.argument_type()));
    }
    if f.return_type() != ret {
        return Err(ExprError::mismatch(op, ret, f.return_type()));
    }
    Ok(())
}

// ─── Definitions ─────────────────────────────────────────────────────────────

/// `length : [T] -> u32`.
pub fn length_definition(element: &Type) -> Result<Lambda> {
    cached(key(Operation::Length, element, None), || {
        let list = Type::list(element.clone());
        Lambda::define(list, Type::int(IntType::U32), |length, xs| {
            let zero = mk_int(IntType::U32, 0);
            let one = mk_int(IntType::U32, 1);
            mk_list_case(xs, &zero, |_, tail| mk_add(&one, &mk_apply(length, tail)?))
        })
    })
}

/// `append : Pair([T], [T]) -> [T]`.
pub fn append_definition(element: &Type) -> Result<Lambda> {
    cached(key(Operation::Append, element, None), || {
        let list = Type::list(element.clone());
        let arg = Type::pair(list.clone(), list.clone());
        Lambda::define(arg, list, |append, p| {
            let (xs, ys) = unpair(p)?;
            mk_list_case(&xs, &ys, |head, tail| {
                let rest = mk_apply(append, &pair(tail, &ys)?)?;
                mk_list_cons(head, &rest)
            })
        })
    })
}

/// `reverse_onto : Pair([T], [T]) -> [T]`, moving the elements of the first
/// list, in reverse order, in front of the second.
pub fn reverse_onto_definition(element: &Type) -> Result<Lambda> {
    cached(key(Operation::ReverseOnto, element, None), || {
        let list = Type::list(element.clone());
        let arg = Type::pair(list.clone(), list.clone());
        Lambda::define(arg, list, |reverse_onto, p| {
            let (xs, acc) = unpair(p)?;
            mk_list_case(&xs, &acc, |head, tail| {
                let acc = mk_list_cons(head, &acc)?;
                mk_apply(reverse_onto, &pair(tail, &acc)?)
            })
        })
    })
}

/// `reverse : [T] -> [T]`.
pub fn reverse_definition(element: &Type) -> Result<Lambda> {
    cached(key(Operation::Reverse, element, None), || {
        let onto = reverse_onto_definition(element)?;
        Lambda::function(Type::list(element.clone()), |xs| {
            mk_apply(&onto, &pair(xs, &mk_list_empty(element.clone()))?)
        })
    })
}

/// `contains : Pair([T], T) -> bool`.
pub fn contains_definition(element: &Type) -> Result<Lambda> {
    cached(key(Operation::Contains, element, None), || {
        let arg = Type::pair(Type::list(element.clone()), element.clone());
        Lambda::define(arg, Type::Bool, |contains, p| {
            let (xs, x) = unpair(p)?;
            mk_list_case(&xs, &mk_bool(false), |head, tail| {
                let rest = mk_apply(contains, &pair(tail, &x)?)?;
                mk_or(&mk_eq(head, &x)?, &rest)
            })
        })
    })
}

/// `map f : [A] -> [B]` for `f : A -> B`.
pub fn map_definition(f: &Lambda) -> Result<Lambda> {
    let element = f.argument_type().clone();
    cached(key(Operation::Map, &element, Some(f)), || {
        let target = f.return_type().clone();
        Lambda::define(Type::list(element.clone()), Type::list(target.clone()), |map, xs| {
            mk_list_case(xs, &mk_list_empty(target.clone()), |head, tail| {
                mk_list_cons(&mk_apply(f, head)?, &mk_apply(map, tail)?)
            })
        })
    })
}

/// `filter p : [T] -> [T]` for `p : T -> bool`.
pub fn filter_definition(p: &Lambda) -> Result<Lambda> {
    let element = p.argument_type().clone();
    check_function("filter", p, &element, &Type::Bool)?;
    cached(key(Operation::Filter, &element, Some(p)), || {
        let list = Type::list(element.clone());
        Lambda::define(list.clone(), list, |filter, xs| {
            mk_list_case(xs, &mk_list_empty(element.clone()), |head, tail| {
                let rest = mk_apply(filter, tail)?;
                mk_if(&mk_apply(p, head)?, &mk_list_cons(head, &rest)?, &rest)
            })
        })
    })
}

/// `fold f : Pair([A], B) -> B` for `f : Pair(A, B) -> B`, folding from the right.
pub fn fold_definition(element: &Type, f: &Lambda) -> Result<Lambda> {
    let acc = f.return_type().clone();
    check_function("fold", f, &Type::pair(element.clone(), acc.clone()), &acc)?;
    cached(key(Operation::Fold, element, Some(f)), || {
        let arg = Type::pair(Type::list(element.clone()), acc.clone());
        Lambda::define(arg, acc, |fold, p| {
            let (xs, init) = unpair(p)?;
            mk_list_case(&xs, &init, |head, tail| {
                let rest = mk_apply(fold, &pair(tail, &init)?)?;
                mk_apply(f, &pair(head, &rest)?)
            })
        })
    })
}

// ─── Call sites ──────────────────────────────────────────────────────────────

/// Number of elements of `xs`, as a `u32`.
pub fn length(xs: &Expr) -> Result<Expr> {
    let element = element_of("length", xs)?;
    mk_apply(&length_definition(&element)?, xs)
}

/// `xs` followed by `ys`.
pub fn append(xs: &Expr, ys: &Expr) -> Result<Expr> {
    let element = element_of("append", xs)?;
    if xs.ty() != ys.ty() {
        return Err(ExprError::mismatch("append", xs.ty(), ys.ty()));
    }
    mk_apply(&append_definition(&element)?, &pair(xs, ys)?)
}

/// The elements of `xs` in reverse order, followed by `acc`.
pub fn reverse_onto(xs: &Expr, acc: &Expr) -> Result<Expr> {
    let element = element_of("reverse", xs)?;
    if xs.ty() != acc.ty() {
        return Err(ExprError::mismatch("reverse", xs.ty(), acc.ty()));
    }
    mk_apply(&reverse_onto_definition(&element)?, &pair(xs, acc)?)
}

pub fn reverse(xs: &Expr) -> Result<Expr> {
    let element = element_of("reverse", xs)?;
    mk_apply(&reverse_definition(&element)?, xs)
}

/// Whether `x` is an element of `xs`.
pub fn contains(xs: &Expr, x: &Expr) -> Result<Expr> {
    let element = element_of("contains", xs)?;
    if x.ty() != &element {
        return Err(ExprError::mismatch("contains", &element, x.ty()));
    }
    mk_apply(&contains_definition(&element)?, &pair(xs, x)?)
}

pub fn map(xs: &Expr, f: &Lambda) -> Result<Expr> {
    let element = element_of("map", xs)?;
    if f.argument_type() != &element {
        return Err(ExprError::mismatch("map", &element, f.argument_type()));
    }
    mk_apply(&map_definition(f)?, xs)
}

pub fn filter(xs: &Expr, p: &Lambda) -> Result<Expr> {
    let element = element_of("filter", xs)?;
    if p.argument_type() != &element {
        return Err(ExprError::mismatch("filter", &element, p.argument_type()));
    }
    mk_apply(&filter_definition(p)?, xs)
}

/// `f(x1, f(x2, ... f(xn, init)))`.
pub fn fold(xs: &Expr, init: &Expr, f: &Lambda) -> Result<Expr> {
    let element = element_of("fold", xs)?;
    mk_apply(&fold_definition(&element, f)?, &pair(xs, init)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    use test_log::test;

    use crate::arith::{mk_add, mk_lt, mk_mul};
    use crate::interpreter::{interpret, Environment};
    use crate::node::mk_arbitrary;
    use crate::object::mk_get_field;
    use crate::value::Value;

    fn i16_ty() -> Type {
        Type::int(IntType::I16)
    }

    fn list_value(items: &[i16]) -> Value {
        Value::list(i16_ty(), items.iter().map(|&i| Value::int(IntType::I16, i as i128)).collect()).unwrap()
    }

    fn eval_on(e: &Expr, xs: &Expr, items: &[i16]) -> Value {
        let env = Environment::new().with_arbitrary(xs.var_id().unwrap(), list_value(items));
        interpret(e, &env).unwrap()
    }

    #[test]
    fn test_length_is_cached() {
        let a = length_definition(&i16_ty()).unwrap();
        let b = length_definition(&i16_ty()).unwrap();
        assert_eq!(a, b);
        assert!(a.is_closed());

        let xs = mk_arbitrary(Type::list(i16_ty()));
        let n = length(&xs).unwrap();
        assert_eq!(n.ty(), &Type::int(IntType::U32));
        assert_eq!(eval_on(&n, &xs, &[]), Value::u32(0));
        assert_eq!(eval_on(&n, &xs, &[3, 1, 4, 1, 5]), Value::u32(5));
    }

    #[test]
    fn test_append_and_reverse() {
        let xs = mk_arbitrary(Type::list(i16_ty()));
        let ys = mk_arbitrary(Type::list(i16_ty()));
        let zs = append(&xs, &reverse(&ys).unwrap()).unwrap();
        let env = Environment::new()
            .with_arbitrary(xs.var_id().unwrap(), list_value(&[1, 2]))
            .with_arbitrary(ys.var_id().unwrap(), list_value(&[3, 4, 5]));
        assert_eq!(interpret(&zs, &env).unwrap(), list_value(&[1, 2, 5, 4, 3]));
    }

    #[test]
    fn test_contains() {
        let xs = mk_arbitrary(Type::list(i16_ty()));
        let x = mk_arbitrary(i16_ty());
        let e = contains(&xs, &x).unwrap();
        let env = |x_value: i16| {
            Environment::new()
                .with_arbitrary(xs.var_id().unwrap(), list_value(&[7, -2, 9]))
                .with_arbitrary(x.var_id().unwrap(), Value::int(IntType::I16, x_value as i128))
        };
        assert_eq!(interpret(&e, &env(9)).unwrap(), Value::Bool(true));
        assert_eq!(interpret(&e, &env(8)).unwrap(), Value::Bool(false));
    }

    #[test]
    fn test_map_filter_fold() {
        let xs = mk_arbitrary(Type::list(i16_ty()));
        let double = Lambda::function(i16_ty(), |x| mk_add(x, x)).unwrap();
        let positive = Lambda::function(i16_ty(), |x| mk_lt(&mk_int(IntType::I16, 0), x)).unwrap();
        let product = Lambda::function(Type::pair(i16_ty(), i16_ty()), |p| {
            mk_mul(&mk_get_field(p, "item1")?, &mk_get_field(p, "item2")?)
        })
        .unwrap();

        let doubled = map(&xs, &double).unwrap();
        assert_eq!(eval_on(&doubled, &xs, &[1, -2, 3]), list_value(&[2, -4, 6]));

        let kept = filter(&xs, &positive).unwrap();
        assert_eq!(eval_on(&kept, &xs, &[1, -2, 3, 0]), list_value(&[1, 3]));

        let prod = fold(&xs, &mk_int(IntType::I16, 1), &product).unwrap();
        assert_eq!(eval_on(&prod, &xs, &[2, 3, -4]), Value::int(IntType::I16, -24));
        assert_eq!(eval_on(&prod, &xs, &[]), Value::int(IntType::I16, 1));

        // Same function, same definition.
        assert_eq!(map_definition(&double).unwrap(), map_definition(&double).unwrap());
    }

    #[test]
    fn test_fold_is_right_fold() {
        // f(x, acc) = x - 2 * acc distinguishes the fold direction.
        let xs = mk_arbitrary(Type::list(i16_ty()));
        let f = Lambda::function(Type::pair(i16_ty(), i16_ty()), |p| {
            let x = mk_get_field(p, "item1")?;
            let acc = mk_get_field(p, "item2")?;
            crate::arith::mk_sub(&x, &mk_add(&acc, &acc)?)
        })
        .unwrap();
        let e = fold(&xs, &mk_int(IntType::I16, 0), &f).unwrap();
        // 1 - 2 * (2 - 2 * (3 - 2 * 0)) = 1 - 2 * (2 - 6) = 9
        assert_eq!(eval_on(&e, &xs, &[1, 2, 3]), Value::int(IntType::I16, 9));
    }

    #[test]
    fn test_definition_errors() {
        let b = mk_arbitrary(Type::Bool);
        assert!(matches!(length(&b), Err(ExprError::UnsupportedType { .. })));

        let xs = mk_arbitrary(Type::list(i16_ty()));
        let ys = mk_arbitrary(Type::list(Type::Bool));
        assert!(matches!(append(&xs, &ys), Err(ExprError::TypeMismatch { .. })));

        let not_a_predicate = Lambda::function(i16_ty(), |x| Ok(x.clone())).unwrap();
        assert!(matches!(filter(&xs, &not_a_predicate), Err(ExprError::TypeMismatch { .. })));

        // Equality over lists is unsupported, so is membership in a list of lists.
        let xss = mk_arbitrary(Type::list(Type::list(Type::Bool)));
        assert!(contains(&xss, &ys).is_err());
    }
}
