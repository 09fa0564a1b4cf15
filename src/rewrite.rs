//! Structure-preserving rewrites through the smart constructors.
//!
//! A [`Rewriter`] rebuilds an expression bottom-up, re-running every
//! construction rule on the way. It can substitute expressions for symbolic
//! placeholders and arguments, and it can unfold case splits over lists
//! whose shape is known statically.
//!
//! Lambda bodies are not rewritten: an application keeps its lambda and
//! only its argument is rebuilt. A body may read arguments bound by its
//! caller, so a case split is not unfolded while a lambda body reachable from
//! its cons branch refers to the case binders.

use log::debug;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::arith::{mk_arith, mk_bit_not, mk_cast, mk_compare};
use crate::error::{ExprError, Result};
use crate::lambda::{mk_apply, Lambda};
use crate::list::{mk_list_case_bound, mk_list_cons, mk_list_empty};
use crate::logic::{mk_and, mk_eq, mk_if, mk_not, mk_or};
use crate::node::{mk_constant, ArithOp, CmpOp, Expr, ExprKind, ListCase};
use crate::object::{mk_create_object, mk_get_field_at, mk_with_field_at};
use crate::reference::{ArgId, LambdaId, NodeId, VarId};
use crate::types::Type;
use crate::value::Value;
use crate::visitor::Transformer;

#[derive(Default)]
pub struct Rewriter {
    arbitraries: FxHashMap<VarId, Expr>,
    arguments: FxHashMap<ArgId, Expr>,
    unfold: bool,
    memo: FxHashMap<NodeId, Expr>,
}

impl Rewriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace `placeholder` (a symbolic placeholder or an argument) by `replacement`.
    pub fn bind(&mut self, placeholder: &Expr, replacement: &Expr) -> Result<()> {
        if placeholder.ty() != replacement.ty() {
            return Err(ExprError::mismatch("substitute", placeholder.ty(), replacement.ty()));
        }
        match placeholder.kind() {
            ExprKind::Arbitrary(var) => {
                self.arbitraries.insert(*var, replacement.clone());
            }
            ExprKind::Argument(arg) => {
                self.arguments.insert(*arg, replacement.clone());
            }
            other => return Err(ExprError::mismatch("substitute", "placeholder", other.name())),
        }
        self.memo.clear();
        Ok(())
    }

    /// Unfold case splits over lists of known shape.
    pub fn with_unfolding(mut self, unfold: bool) -> Self {
        self.unfold = unfold;
        self
    }

    pub fn rewrite(&mut self, expr: &Expr) -> Result<Expr> {
        if let Some(res) = self.memo.get(&expr.id()) {
            return Ok(res.clone());
        }
        let res = expr.accept_transformer(self)?;
        self.memo.insert(expr.id(), res.clone());
        Ok(res)
    }

    /// A rewriter with the same bindings plus the ones a case unfolding adds.
    fn child(&self, bindings: [(ArgId, Expr); 2]) -> Self {
        let mut arguments = self.arguments.clone();
        arguments.extend(bindings);
        Self {
            arbitraries: self.arbitraries.clone(),
            arguments,
            unfold: self.unfold,
            memo: FxHashMap::default(),
        }
    }
}

/// The head and tail of a list whose shape is known statically.
fn split(list: &Expr) -> Option<(Expr, Expr)> {
    match list.kind() {
        ExprKind::ListCons(head, tail) => Some((head.clone(), tail.clone())),
        ExprKind::Constant(Value::List { element, items }) => {
            let (head, tail) = items.split_first()?;
            let tail = Value::List {
                element: element.clone(),
                items: tail,
            };
            Some((mk_constant(head.clone()), mk_constant(tail)))
        }
        _ => None,
    }
}

/// Whether the body of a lambda applied somewhere below `expr` refers to one of `args`.
fn read_by_lambda(expr: &Expr, args: [ArgId; 2]) -> bool {
    let mut visited = FxHashSet::<(NodeId, bool)>::default();
    let mut lambdas = FxHashSet::<LambdaId>::default();
    // The flag marks nodes inside some lambda body.
    let mut stack = vec![(expr.clone(), false)];

    while let Some((expr, in_body)) = stack.pop() {
        if !visited.insert((expr.id(), in_body)) {
            continue;
        }
        match expr.kind() {
            ExprKind::Argument(arg) if in_body && args.contains(arg) => return true,
            ExprKind::Apply(lambda, _) => {
                if let Some(body) = lambda.body() {
                    if lambdas.insert(lambda.id()) {
                        stack.push((body.clone(), true));
                    }
                }
            }
            _ => {}
        }
        stack.extend(expr.kind().children().into_iter().map(|child| (child.clone(), in_body)));
    }
    false
}

impl Transformer for Rewriter {
    fn transform_constant(&mut self, expr: &Expr, _: &Value) -> Result<Expr> {
        Ok(expr.clone())
    }

    fn transform_arbitrary(&mut self, expr: &Expr, var: VarId) -> Result<Expr> {
        Ok(self.arbitraries.get(&var).unwrap_or(expr).clone())
    }

    fn transform_argument(&mut self, expr: &Expr, arg: ArgId) -> Result<Expr> {
        Ok(self.arguments.get(&arg).unwrap_or(expr).clone())
    }

    fn transform_not(&mut self, _: &Expr, f: &Expr) -> Result<Expr> {
        let f = self.rewrite(f)?;
        mk_not(&f)
    }

    fn transform_and(&mut self, _: &Expr, f: &Expr, g: &Expr) -> Result<Expr> {
        let f = self.rewrite(f)?;
        let g = self.rewrite(g)?;
        mk_and(&f, &g)
    }

    fn transform_or(&mut self, _: &Expr, f: &Expr, g: &Expr) -> Result<Expr> {
        let f = self.rewrite(f)?;
        let g = self.rewrite(g)?;
        mk_or(&f, &g)
    }

    fn transform_arith(&mut self, _: &Expr, op: ArithOp, f: &Expr, g: &Expr) -> Result<Expr> {
        let f = self.rewrite(f)?;
        let g = self.rewrite(g)?;
        mk_arith(op, &f, &g)
    }

    fn transform_bit_not(&mut self, _: &Expr, f: &Expr) -> Result<Expr> {
        let f = self.rewrite(f)?;
        mk_bit_not(&f)
    }

    fn transform_equal(&mut self, _: &Expr, f: &Expr, g: &Expr) -> Result<Expr> {
        let f = self.rewrite(f)?;
        let g = self.rewrite(g)?;
        mk_eq(&f, &g)
    }

    fn transform_compare(&mut self, _: &Expr, op: CmpOp, f: &Expr, g: &Expr) -> Result<Expr> {
        let f = self.rewrite(f)?;
        let g = self.rewrite(g)?;
        mk_compare(op, &f, &g)
    }

    fn transform_if(&mut self, _: &Expr, guard: &Expr, t: &Expr, e: &Expr) -> Result<Expr> {
        let guard = self.rewrite(guard)?;
        // A constant guard makes the other branch dead.
        match guard.as_bool() {
            Some(true) => self.rewrite(t),
            Some(false) => self.rewrite(e),
            None => {
                let t = self.rewrite(t)?;
                let e = self.rewrite(e)?;
                mk_if(&guard, &t, &e)
            }
        }
    }

    fn transform_get_field(&mut self, _: &Expr, obj: &Expr, index: usize) -> Result<Expr> {
        let obj = self.rewrite(obj)?;
        mk_get_field_at(&obj, index)
    }

    fn transform_with_field(&mut self, _: &Expr, obj: &Expr, index: usize, value: &Expr) -> Result<Expr> {
        let obj = self.rewrite(obj)?;
        let value = self.rewrite(value)?;
        mk_with_field_at(&obj, index, &value)
    }

    fn transform_create_object(&mut self, expr: &Expr, fields: &[Expr]) -> Result<Expr> {
        let schema = expr
            .ty()
            .schema()
            .cloned()
            .ok_or_else(|| ExprError::unsupported("create", expr.ty()))?;
        let fields = fields.iter().map(|f| self.rewrite(f)).collect::<Result<Vec<_>>>()?;
        mk_create_object(&schema, &fields)
    }

    fn transform_list_empty(&mut self, expr: &Expr) -> Result<Expr> {
        match expr.ty() {
            Type::List(element) => Ok(mk_list_empty((**element).clone())),
            ty => Err(ExprError::unsupported("nil", ty)),
        }
    }

    fn transform_list_cons(&mut self, _: &Expr, head: &Expr, tail: &Expr) -> Result<Expr> {
        let head = self.rewrite(head)?;
        let tail = self.rewrite(tail)?;
        mk_list_cons(&head, &tail)
    }

    fn transform_list_case(&mut self, _: &Expr, case: &ListCase) -> Result<Expr> {
        let list = self.rewrite(&case.list)?;

        if self.unfold {
            if let (Some((head, tail)), Some(head_arg), Some(tail_arg)) =
                (split(&list), case.head.arg_id(), case.tail.arg_id())
            {
                if read_by_lambda(&case.cons, [head_arg, tail_arg]) {
                    debug!("case(H :: T, E, C) kept: binders are read by a lambda body");
                    let empty = self.rewrite(&case.empty)?;
                    let cons = self.rewrite(&case.cons)?;
                    return mk_list_case_bound(&list, &empty, &case.head, &case.tail, &cons);
                }
                debug!("case(H :: T, E, C) => C[H, T]");
                let mut child = self.child([(head_arg, head), (tail_arg, tail)]);
                return child.rewrite(&case.cons);
            }
        }

        let empty = self.rewrite(&case.empty)?;
        let cons = self.rewrite(&case.cons)?;
        mk_list_case_bound(&list, &empty, &case.head, &case.tail, &cons)
    }

    fn transform_apply(&mut self, _: &Expr, lambda: &Lambda, arg: &Expr) -> Result<Expr> {
        let arg = self.rewrite(arg)?;
        mk_apply(lambda, &arg)
    }

    fn transform_cast(&mut self, expr: &Expr, f: &Expr) -> Result<Expr> {
        let f = self.rewrite(f)?;
        mk_cast(&f, expr.ty())
    }
}

/// Replace placeholders by expressions, given as `(placeholder, replacement)` pairs.
pub fn substitute(expr: &Expr, bindings: &[(Expr, Expr)]) -> Result<Expr> {
    let mut rewriter = Rewriter::new();
    for (placeholder, replacement) in bindings {
        rewriter.bind(placeholder, replacement)?;
    }
    rewriter.rewrite(expr)
}

/// Re-apply all construction rules and unfold case splits over known lists.
pub fn simplify(expr: &Expr) -> Result<Expr> {
    Rewriter::new().with_unfolding(true).rewrite(expr)
}
