//! End-to-end scenarios over the public API.
//!
//! Tests cover interning, reclamation, simplification and recursive definitions.

use zen_rs::arith::{mk_add, mk_bit_not, mk_leq, mk_mul, mk_sub};
use zen_rs::definitions::{append, length, length_definition};
use zen_rs::interpreter::{interpret, Environment};
use zen_rs::list::mk_list;
use zen_rs::logic::{mk_and, mk_if, mk_not, mk_or};
use zen_rs::node::{mk_arbitrary, mk_int, table_stats, Expr, ExprKind};
use zen_rs::rewrite::simplify;
use zen_rs::types::{IntType, Type};
use zen_rs::value::Value;

fn i32_ty() -> Type {
    Type::int(IntType::I32)
}

fn i32_list(items: &[i32]) -> Value {
    Value::list(i32_ty(), items.iter().map(|&i| Value::i32(i)).collect()).unwrap()
}

// ─── Interning ─────────────────────────────────────────────────────────────────

#[test]
fn equal_requests_share_a_node() {
    let x = mk_arbitrary(i32_ty());
    let one = mk_int(IntType::I32, 1);

    let a = mk_add(&x, &one).unwrap();
    let b = mk_add(&x, &mk_int(IntType::I32, 1)).unwrap();
    assert_eq!(a.id(), b.id());
    assert_eq!(a, b);
}

#[test]
fn commutative_operands_are_ordered() {
    let x = mk_arbitrary(i32_ty());
    let y = mk_arbitrary(i32_ty());
    assert_eq!(mk_add(&x, &y).unwrap(), mk_add(&y, &x).unwrap());
    assert_eq!(mk_mul(&x, &y).unwrap(), mk_mul(&y, &x).unwrap());
    assert_ne!(mk_sub(&x, &y).unwrap(), mk_sub(&y, &x).unwrap());

    let p = mk_arbitrary(Type::Bool);
    let q = mk_arbitrary(Type::Bool);
    assert_eq!(mk_and(&p, &q).unwrap(), mk_and(&q, &p).unwrap());
    assert_eq!(mk_or(&p, &q).unwrap(), mk_or(&q, &p).unwrap());
}

#[test]
fn construction_is_deterministic() {
    let x = mk_arbitrary(i32_ty());
    let build = |x: &Expr| {
        let two = mk_int(IntType::I32, 2);
        let a = mk_mul(x, &two).unwrap();
        let b = mk_sub(&a, x).unwrap();
        mk_if(&mk_leq(&b, &two).unwrap(), &a, &b).unwrap()
    };
    let first = build(&x);
    let second = build(&x);
    assert_eq!(first.id(), second.id());
    assert_eq!(first.to_string(), second.to_string());
}

#[test]
fn construction_is_thread_safe() {
    let x = mk_arbitrary(i32_ty());
    let y = mk_arbitrary(i32_ty());

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let (x, y) = (x.clone(), y.clone());
            std::thread::spawn(move || {
                (0..500)
                    .map(|i| {
                        let c = mk_int(IntType::I32, i);
                        mk_mul(&mk_add(&x, &c).unwrap(), &mk_sub(&y, &c).unwrap()).unwrap()
                    })
                    .collect::<Vec<Expr>>()
            })
        })
        .collect();
    let results: Vec<Vec<Expr>> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    for other in &results[1..] {
        for (a, b) in results[0].iter().zip(other) {
            assert!(Expr::ptr_eq(a, b));
        }
    }
}

// ─── Reclamation ───────────────────────────────────────────────────────────────

#[test]
fn dropped_nodes_are_reclaimed() {
    let x = mk_arbitrary(Type::int(IntType::U64));
    let f = mk_bit_not(&x).unwrap();
    let old = f.id();
    assert_eq!(Expr::strong_count(&f), 1);
    drop(f);

    // The key is the same, but the node is a new one.
    let g = mk_bit_not(&x).unwrap();
    assert_ne!(g.id(), old);
}

#[test]
fn tables_stay_bounded_under_churn() {
    for _ in 0..10_000 {
        let x = mk_arbitrary(Type::int(IntType::U64));
        let _ = mk_bit_not(&x).unwrap();
    }
    let stats = table_stats();
    let (_, bit_not) = stats.iter().find(|(name, _)| *name == "bitnot").unwrap();
    assert!(bit_not.compactions > 0);
    assert!(bit_not.slots < 10_000 / 2, "slots = {}", bit_not.slots);
}

// ─── Simplification ────────────────────────────────────────────────────────────

#[test]
fn simplification_preserves_meaning() {
    let x = mk_arbitrary(i32_ty());
    let p = mk_arbitrary(Type::Bool);
    let zero = mk_int(IntType::I32, 0);
    let one = mk_int(IntType::I32, 1);

    let guard = mk_or(&mk_not(&p).unwrap(), &mk_leq(&x, &zero).unwrap()).unwrap();
    let body = mk_add(&mk_mul(&x, &one).unwrap(), &zero).unwrap();
    let e = mk_if(&guard, &body, &mk_sub(&x, &one).unwrap()).unwrap();
    let s = simplify(&e).unwrap();

    for xv in [-3, 0, 7] {
        for pv in [false, true] {
            let env = Environment::new()
                .with_arbitrary(x.var_id().unwrap(), Value::i32(xv))
                .with_arbitrary(p.var_id().unwrap(), Value::bool(pv));
            assert_eq!(interpret(&e, &env).unwrap(), interpret(&s, &env).unwrap());
        }
    }
}

#[test]
fn conditional_decrement() {
    let x = mk_arbitrary(i32_ty());
    let zero = mk_int(IntType::I32, 0);
    let one = mk_int(IntType::I32, 1);
    let f = mk_if(
        &mk_leq(&x, &zero).unwrap(),
        &mk_add(&x, &one).unwrap(),
        &mk_sub(&x, &one).unwrap(),
    )
    .unwrap();

    let run = |v: i32| {
        let env = Environment::new().with_arbitrary(x.var_id().unwrap(), Value::i32(v));
        interpret(&f, &env).unwrap()
    };
    assert_eq!(run(5), Value::i32(4));
    assert_eq!(run(-3), Value::i32(-2));
}

// ─── Recursive definitions ─────────────────────────────────────────────────────

#[test]
fn append_keeps_order() {
    let xs = mk_arbitrary(Type::list(i32_ty()));
    let ys = mk_arbitrary(Type::list(i32_ty()));
    let zs = append(&xs, &ys).unwrap();

    let env = Environment::new()
        .with_arbitrary(xs.var_id().unwrap(), i32_list(&[1, 2, 3]))
        .with_arbitrary(ys.var_id().unwrap(), i32_list(&[4, 5, 6, 7]));
    let result = interpret(&zs, &env).unwrap();
    assert_eq!(result, i32_list(&[1, 2, 3, 4, 5, 6, 7]));
    assert_eq!(interpret(&length(&zs).unwrap(), &env).unwrap(), Value::u32(7));
}

#[test]
fn length_definition_is_shared() {
    let element = Type::int(IntType::I8);
    let definition = length_definition(&element).unwrap();

    let lists: Vec<Expr> = [0usize, 1, 3]
        .iter()
        .map(|&n| {
            let items: Vec<Expr> = (0..n).map(|i| mk_int(IntType::I8, i as i128)).collect();
            mk_list(element.clone(), &items).unwrap()
        })
        .collect();

    for (list, expected) in lists.iter().zip([0u32, 1, 3]) {
        let n = length(list).unwrap();
        match n.kind() {
            ExprKind::Apply(lambda, _) => assert_eq!(lambda, &definition),
            kind => panic!("expected an application, got {}", kind.name()),
        }
        assert_eq!(interpret(&n, &Environment::new()).unwrap(), Value::u32(expected));
    }

    assert_eq!(length_definition(&element).unwrap(), definition);
}

#[test]
fn long_lists_do_not_exhaust_the_stack() {
    let xs = mk_arbitrary(Type::list(i32_ty()));
    let ys = mk_arbitrary(Type::list(i32_ty()));
    let n = length(&append(&xs, &ys).unwrap()).unwrap();

    let items: Vec<i32> = (0..2_000).collect();
    let env = Environment::new()
        .with_arbitrary(xs.var_id().unwrap(), i32_list(&items))
        .with_arbitrary(ys.var_id().unwrap(), i32_list(&items));
    assert_eq!(interpret(&n, &env).unwrap(), Value::u32(4_000));
}
