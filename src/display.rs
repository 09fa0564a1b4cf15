//! Textual rendering of expressions.
//!
//! Expressions print as trees, so a heavily shared DAG would print in
//! exponential size. Below [`MAX_DEPTH`] levels, subexpressions are elided
//! and printed as their node id.

use std::fmt;

use crate::lambda::Lambda;
use crate::node::{ArithOp, CmpOp, Expr, ListCase};
use crate::reference::{ArgId, VarId};
use crate::value::Value;
use crate::visitor::Visitor;

pub const MAX_DEPTH: usize = 8;

struct Printer<'a, 'b> {
    f: &'a mut fmt::Formatter<'b>,
}

impl Printer<'_, '_> {
    fn child(&mut self, expr: &Expr, depth: usize) -> fmt::Result {
        if depth >= MAX_DEPTH {
            write!(self.f, "{}", expr.id())
        } else {
            expr.accept(self, depth + 1)
        }
    }

    fn binary(&mut self, f: &Expr, op: &str, g: &Expr, depth: usize) -> fmt::Result {
        write!(self.f, "(")?;
        self.child(f, depth)?;
        write!(self.f, " {} ", op)?;
        self.child(g, depth)?;
        write!(self.f, ")")
    }
}

fn field_name(obj: &Expr, index: usize) -> String {
    obj.ty()
        .schema()
        .and_then(|schema| schema.field(index))
        .map(|field| field.name.clone())
        .unwrap_or_else(|| format!("#{}", index))
}

impl Visitor<usize, fmt::Result> for Printer<'_, '_> {
    fn visit_constant(&mut self, _: &Expr, value: &Value, _: usize) -> fmt::Result {
        write!(self.f, "{}", value)
    }

    fn visit_arbitrary(&mut self, _: &Expr, var: VarId, _: usize) -> fmt::Result {
        write!(self.f, "{}", var)
    }

    fn visit_argument(&mut self, _: &Expr, arg: ArgId, _: usize) -> fmt::Result {
        write!(self.f, "{}", arg)
    }

    fn visit_not(&mut self, _: &Expr, f: &Expr, depth: usize) -> fmt::Result {
        write!(self.f, "!")?;
        self.child(f, depth)
    }

    fn visit_and(&mut self, _: &Expr, f: &Expr, g: &Expr, depth: usize) -> fmt::Result {
        self.binary(f, "&&", g, depth)
    }

    fn visit_or(&mut self, _: &Expr, f: &Expr, g: &Expr, depth: usize) -> fmt::Result {
        self.binary(f, "||", g, depth)
    }

    fn visit_arith(&mut self, _: &Expr, op: ArithOp, f: &Expr, g: &Expr, depth: usize) -> fmt::Result {
        self.binary(f, op.symbol(), g, depth)
    }

    fn visit_bit_not(&mut self, _: &Expr, f: &Expr, depth: usize) -> fmt::Result {
        write!(self.f, "~")?;
        self.child(f, depth)
    }

    fn visit_equal(&mut self, _: &Expr, f: &Expr, g: &Expr, depth: usize) -> fmt::Result {
        self.binary(f, "==", g, depth)
    }

    fn visit_compare(&mut self, _: &Expr, op: CmpOp, f: &Expr, g: &Expr, depth: usize) -> fmt::Result {
        self.binary(f, op.symbol(), g, depth)
    }

    fn visit_if(&mut self, _: &Expr, guard: &Expr, t: &Expr, e: &Expr, depth: usize) -> fmt::Result {
        write!(self.f, "(if ")?;
        self.child(guard, depth)?;
        write!(self.f, " then ")?;
        self.child(t, depth)?;
        write!(self.f, " else ")?;
        self.child(e, depth)?;
        write!(self.f, ")")
    }

    fn visit_get_field(&mut self, _: &Expr, obj: &Expr, index: usize, depth: usize) -> fmt::Result {
        self.child(obj, depth)?;
        write!(self.f, ".{}", field_name(obj, index))
    }

    fn visit_with_field(&mut self, _: &Expr, obj: &Expr, index: usize, value: &Expr, depth: usize) -> fmt::Result {
        write!(self.f, "(")?;
        self.child(obj, depth)?;
        write!(self.f, " with {} = ", field_name(obj, index))?;
        self.child(value, depth)?;
        write!(self.f, ")")
    }

    fn visit_create_object(&mut self, expr: &Expr, fields: &[Expr], depth: usize) -> fmt::Result {
        write!(self.f, "{}{{", expr.ty())?;
        for (i, field) in fields.iter().enumerate() {
            if i > 0 {
                write!(self.f, ", ")?;
            }
            write!(self.f, "{} = ", field_name(expr, i))?;
            self.child(field, depth)?;
        }
        write!(self.f, "}}")
    }

    fn visit_list_empty(&mut self, _: &Expr, _: usize) -> fmt::Result {
        write!(self.f, "[]")
    }

    fn visit_list_cons(&mut self, _: &Expr, head: &Expr, tail: &Expr, depth: usize) -> fmt::Result {
        self.binary(head, "::", tail, depth)
    }

    fn visit_list_case(&mut self, _: &Expr, case: &ListCase, depth: usize) -> fmt::Result {
        write!(self.f, "(case ")?;
        self.child(&case.list, depth)?;
        write!(self.f, " of [] => ")?;
        self.child(&case.empty, depth)?;
        write!(self.f, " | ")?;
        self.binary(&case.head, "::", &case.tail, depth)?;
        write!(self.f, " => ")?;
        self.child(&case.cons, depth)?;
        write!(self.f, ")")
    }

    fn visit_apply(&mut self, _: &Expr, lambda: &Lambda, arg: &Expr, depth: usize) -> fmt::Result {
        write!(self.f, "{}(", lambda.id())?;
        self.child(arg, depth)?;
        write!(self.f, ")")
    }

    fn visit_cast(&mut self, expr: &Expr, f: &Expr, depth: usize) -> fmt::Result {
        write!(self.f, "(")?;
        self.child(f, depth)?;
        write!(self.f, " as {})", expr.ty())
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.accept(&mut Printer { f }, 0)
    }
}

impl fmt::Display for Lambda {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}: {} -> {}", self.id(), self.argument_id(), self.argument_type(), self.return_type())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::arith::{mk_add, mk_cast, mk_leq};
    use crate::logic::{mk_if, mk_not};
    use crate::node::{mk_arbitrary, mk_int};
    use crate::object::mk_get_field;
    use crate::types::{IntType, ObjectSchema, Type};

    #[test]
    fn test_display_arith() {
        let x = mk_arbitrary(Type::int(IntType::I32));
        let one = mk_int(IntType::I32, 1);
        let e = mk_add(&x, &one).unwrap();
        let s = e.to_string();
        assert!(s.contains(&x.var_id().unwrap().to_string()));
        assert!(s.contains("1i32"));
        assert!(s.contains(" + "));
    }

    #[test]
    fn test_display_if() {
        let x = mk_arbitrary(Type::int(IntType::I8));
        let zero = mk_int(IntType::I8, 0);
        let g = mk_leq(&x, &zero).unwrap();
        let e = mk_if(&g, &x, &zero).unwrap();
        assert_eq!(e.to_string(), format!("(if ({} <= 0i8) then {} else 0i8)", x, x));
        assert_eq!(mk_not(&mk_arbitrary(Type::Bool)).unwrap().to_string().chars().next(), Some('!'));
    }

    #[test]
    fn test_display_fields() {
        let schema = ObjectSchema::new("P", [("a", Type::int(IntType::U8))]).unwrap();
        let p = mk_arbitrary(Type::object(&schema));
        let e = mk_cast(&mk_get_field(&p, "a").unwrap(), &Type::BigInt).unwrap();
        assert_eq!(e.to_string(), format!("({}.a as bigint)", p));
    }

    #[test]
    fn test_deep_sharing_is_elided() {
        let x = mk_arbitrary(Type::int(IntType::U64));
        let mut e = x.clone();
        for _ in 0..64 {
            e = mk_add(&e, &e).unwrap();
        }
        let s = e.to_string();
        assert!(s.len() < 100_000, "len = {}", s.len());
    }
}
