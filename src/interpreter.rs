//! Memoized interpreter.
//!
//! The interpreter walks the DAG under an [`Environment`] and caches every
//! result by `(node, environment)`. Shared subexpressions are therefore
//! evaluated once per distinct environment, however many parents reach them.
//!
//! Lambda applications and list cases bind arguments in a child environment
//! that extends the caller's. Child environments are represented as frames of
//! a per-call arena, and equal frames (same parent, argument and value) are
//! given the same [`EnvId`], so repeated calls with equal arguments hit the
//! cache. A bound list is identified by its shared storage rather than by its
//! items, so binding the tail of a list costs O(1).
//!
//! Evaluation recurses once per nesting level of the evaluated terms, and
//! recursive definitions nest once per list item. The stack is grown on demand.

use std::fmt;

use log::{debug, trace};
use rustc_hash::FxHashMap;

use crate::cache::HashMapCache;
use crate::error::{ExprError, Result};
use crate::lambda::Lambda;
use crate::node::{ArithOp, CmpOp, Expr, ListCase};
use crate::reference::{ArgId, NodeId, VarId};
use crate::types::Type;
use crate::value::{ListItems, Value};
use crate::visitor::Visitor;

/// Bindings supplied by the caller: argument values and, when replaying a
/// solver model, values of symbolic placeholders.
#[derive(Debug, Clone, Default)]
pub struct Environment {
    arguments: FxHashMap<ArgId, Value>,
    arbitraries: FxHashMap<VarId, Value>,
}

impl Environment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_argument(mut self, arg: ArgId, value: Value) -> Self {
        self.bind(arg, value);
        self
    }

    pub fn with_arbitrary(mut self, var: VarId, value: Value) -> Self {
        self.assign(var, value);
        self
    }

    pub fn bind(&mut self, arg: ArgId, value: Value) {
        self.arguments.insert(arg, value);
    }

    pub fn assign(&mut self, var: VarId, value: Value) {
        self.arbitraries.insert(var, value);
    }

    pub fn argument(&self, arg: ArgId) -> Option<&Value> {
        self.arguments.get(&arg)
    }

    pub fn arbitrary(&self, var: VarId) -> Option<&Value> {
        self.arbitraries.get(&var)
    }
}

#[derive(Debug, Clone)]
pub struct InterpreterConfig {
    /// The initial cache holds `2^cache_bits` entries.
    pub cache_bits: usize,
    /// Disable to re-evaluate every occurrence of a shared subexpression.
    pub memoize: bool,
}

impl Default for InterpreterConfig {
    fn default() -> Self {
        Self {
            cache_bits: 10,
            memoize: true,
        }
    }
}

impl InterpreterConfig {
    /// # Panics
    ///
    /// Building an [`Interpreter`] panics if `cache_bits` is above 31.
    pub fn with_cache_bits(mut self, cache_bits: usize) -> Self {
        self.cache_bits = cache_bits;
        self
    }

    pub fn with_memoize(mut self, memoize: bool) -> Self {
        self.memoize = memoize;
        self
    }
}

/// Identity of an environment within one interpreter.
///
/// `EnvId::ROOT` is the caller's environment; every other id names a frame.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct EnvId(u32);

impl EnvId {
    pub const ROOT: EnvId = EnvId(0);
}

impl fmt::Display for EnvId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "env{}", self.0)
    }
}

struct Frame {
    parent: EnvId,
    arg: ArgId,
    value: Value,
}

/// A bound value as it takes part in frame identity.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
enum Binding {
    Value(Value),
    /// Storage and start of a list view.
    List(usize, usize),
}

impl Binding {
    fn of(value: &Value) -> Self {
        match value {
            Value::List { items, .. } => {
                let (storage, start) = items.storage_key();
                Binding::List(storage, start)
            }
            other => Binding::Value(other.clone()),
        }
    }
}

/// Minimum stack left before `eval` switches to a new segment.
const RED_ZONE: usize = 64 * 1024;
/// Size of every new stack segment.
const STACK_SEGMENT: usize = 2 * 1024 * 1024;

pub struct Interpreter<'a> {
    env: &'a Environment,
    config: InterpreterConfig,
    /// `frames[i]` is the frame of `EnvId(i + 1)`.
    frames: Vec<Frame>,
    frame_ids: FxHashMap<(EnvId, ArgId, Binding), EnvId>,
    cache: HashMapCache<(NodeId, EnvId), Value>,
}

impl<'a> Interpreter<'a> {
    pub fn new(env: &'a Environment) -> Self {
        Self::with_config(env, InterpreterConfig::default())
    }

    pub fn with_config(env: &'a Environment, config: InterpreterConfig) -> Self {
        let cache = HashMapCache::new(config.cache_bits);
        Self {
            env,
            config,
            frames: Vec::new(),
            frame_ids: FxHashMap::default(),
            cache,
        }
    }

    pub fn config(&self) -> &InterpreterConfig {
        &self.config
    }

    pub fn cache_hits(&self) -> usize {
        self.cache.hits()
    }

    pub fn cache_misses(&self) -> usize {
        self.cache.misses()
    }

    /// Number of cached `(node, environment)` results.
    pub fn cache_size(&self) -> usize {
        self.cache.len()
    }

    /// Number of child environments created so far.
    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    /// Evaluate `expr` in the caller's environment.
    pub fn evaluate(&mut self, expr: &Expr) -> Result<Value> {
        let res = self.eval(expr, EnvId::ROOT);
        debug!(
            "evaluate({}): {} hits, {} misses, {} frames",
            expr.id(),
            self.cache.hits(),
            self.cache.misses(),
            self.frames.len()
        );
        res
    }

    fn eval(&mut self, expr: &Expr, env: EnvId) -> Result<Value> {
        stacker::maybe_grow(RED_ZONE, STACK_SEGMENT, || self.eval_node(expr, env))
    }

    fn eval_node(&mut self, expr: &Expr, env: EnvId) -> Result<Value> {
        if self.config.memoize {
            let key = (expr.id(), env);
            if let Some(res) = self.cache.get(&key) {
                trace!("cache hit for {} in {}", expr.id(), env);
                return Ok(res.clone());
            }
            let res = expr.accept(self, env)?;
            self.cache.insert(key, res.clone());
            Ok(res)
        } else {
            expr.accept(self, env)
        }
    }

    /// The child of `parent` binding `arg` to `value`.
    fn extend(&mut self, parent: EnvId, arg: ArgId, value: Value) -> EnvId {
        let key = (parent, arg, Binding::of(&value));
        if let Some(&id) = self.frame_ids.get(&key) {
            return id;
        }
        self.frames.push(Frame { parent, arg, value });
        let id = EnvId(self.frames.len() as u32);
        self.frame_ids.insert(key, id);
        id
    }

    fn lookup(&self, mut env: EnvId, arg: ArgId) -> Option<&Value> {
        while env != EnvId::ROOT {
            let frame = &self.frames[env.0 as usize - 1];
            if frame.arg == arg {
                return Some(&frame.value);
            }
            env = frame.parent;
        }
        self.env.argument(arg)
    }

    fn eval_bool(&mut self, op: &'static str, expr: &Expr, env: EnvId) -> Result<bool> {
        let value = self.eval(expr, env)?;
        value.as_bool().ok_or_else(|| ExprError::mismatch(op, Type::Bool, value.ty()))
    }
}

/// Evaluate `expr` under `env` with a fresh interpreter.
pub fn interpret(expr: &Expr, env: &Environment) -> Result<Value> {
    Interpreter::new(env).evaluate(expr)
}

fn check_binding(name: impl ToString, value: &Value, expected: &Type) -> Result<()> {
    if &value.ty() == expected {
        Ok(())
    } else {
        Err(ExprError::BindingType {
            name: name.to_string(),
            value: value.to_string(),
            expected: expected.to_string(),
        })
    }
}

fn object_fields(op: &'static str, expr: &Expr, value: Value) -> Result<Vec<Value>> {
    match value {
        Value::Object { fields, .. } => Ok(fields),
        other => Err(ExprError::mismatch(op, expr.ty(), other.ty())),
    }
}

fn field_error(expr: &Expr, index: usize) -> ExprError {
    ExprError::UnknownField {
        ty: expr.ty().to_string(),
        field: format!("#{}", index),
    }
}

impl Visitor<EnvId, Result<Value>> for Interpreter<'_> {
    fn visit_constant(&mut self, _: &Expr, value: &Value, _: EnvId) -> Result<Value> {
        Ok(value.clone())
    }

    fn visit_arbitrary(&mut self, expr: &Expr, var: VarId, _: EnvId) -> Result<Value> {
        match self.env.arbitrary(var) {
            Some(value) => {
                check_binding(var, value, expr.ty())?;
                Ok(value.clone())
            }
            None => Ok(Value::default_for(expr.ty())),
        }
    }

    fn visit_argument(&mut self, expr: &Expr, arg: ArgId, env: EnvId) -> Result<Value> {
        let value = self.lookup(env, arg).ok_or(ExprError::UnboundArgument(arg))?;
        check_binding(arg, value, expr.ty())?;
        Ok(value.clone())
    }

    fn visit_not(&mut self, _: &Expr, f: &Expr, env: EnvId) -> Result<Value> {
        Ok(Value::Bool(!self.eval_bool("not", f, env)?))
    }

    fn visit_and(&mut self, _: &Expr, f: &Expr, g: &Expr, env: EnvId) -> Result<Value> {
        // Both operands are evaluated.
        let a = self.eval_bool("and", f, env)?;
        let b = self.eval_bool("and", g, env)?;
        Ok(Value::Bool(a && b))
    }

    fn visit_or(&mut self, _: &Expr, f: &Expr, g: &Expr, env: EnvId) -> Result<Value> {
        let a = self.eval_bool("or", f, env)?;
        let b = self.eval_bool("or", g, env)?;
        Ok(Value::Bool(a || b))
    }

    fn visit_arith(&mut self, expr: &Expr, op: ArithOp, f: &Expr, g: &Expr, env: EnvId) -> Result<Value> {
        let a = self.eval(f, env)?;
        let b = self.eval(g, env)?;
        Value::arith(op, &a, &b).ok_or_else(|| ExprError::unsupported(op.symbol(), expr.ty()))
    }

    fn visit_bit_not(&mut self, expr: &Expr, f: &Expr, env: EnvId) -> Result<Value> {
        let a = self.eval(f, env)?;
        a.bit_not().ok_or_else(|| ExprError::unsupported("~", expr.ty()))
    }

    fn visit_equal(&mut self, _: &Expr, f: &Expr, g: &Expr, env: EnvId) -> Result<Value> {
        let a = self.eval(f, env)?;
        let b = self.eval(g, env)?;
        Ok(Value::Bool(a == b))
    }

    fn visit_compare(&mut self, _: &Expr, op: CmpOp, f: &Expr, g: &Expr, env: EnvId) -> Result<Value> {
        let a = self.eval(f, env)?;
        let b = self.eval(g, env)?;
        Value::compare(op, &a, &b)
            .map(Value::Bool)
            .ok_or_else(|| ExprError::unsupported(op.symbol(), f.ty()))
    }

    fn visit_if(&mut self, _: &Expr, guard: &Expr, t: &Expr, e: &Expr, env: EnvId) -> Result<Value> {
        // Only the selected branch is evaluated.
        if self.eval_bool("if", guard, env)? {
            self.eval(t, env)
        } else {
            self.eval(e, env)
        }
    }

    fn visit_get_field(&mut self, _: &Expr, obj: &Expr, index: usize, env: EnvId) -> Result<Value> {
        let value = self.eval(obj, env)?;
        let mut fields = object_fields("get", obj, value)?;
        if index >= fields.len() {
            return Err(field_error(obj, index));
        }
        Ok(fields.swap_remove(index))
    }

    fn visit_with_field(&mut self, expr: &Expr, obj: &Expr, index: usize, value: &Expr, env: EnvId) -> Result<Value> {
        let base = self.eval(obj, env)?;
        let value = self.eval(value, env)?;
        let schema = expr.ty().schema().cloned().ok_or_else(|| ExprError::unsupported("with", expr.ty()))?;
        let mut fields = object_fields("with", obj, base)?;
        let slot = fields.get_mut(index).ok_or_else(|| field_error(obj, index))?;
        *slot = value;
        Ok(Value::Object { schema, fields })
    }

    fn visit_create_object(&mut self, expr: &Expr, fields: &[Expr], env: EnvId) -> Result<Value> {
        let schema = expr.ty().schema().cloned().ok_or_else(|| ExprError::unsupported("create", expr.ty()))?;
        let values = fields.iter().map(|f| self.eval(f, env)).collect::<Result<Vec<_>>>()?;
        Value::object(&schema, values)
    }

    fn visit_list_empty(&mut self, expr: &Expr, _: EnvId) -> Result<Value> {
        match expr.ty() {
            Type::List(element) => Ok(Value::List {
                element: (**element).clone(),
                items: ListItems::empty(),
            }),
            ty => Err(ExprError::unsupported("nil", ty)),
        }
    }

    fn visit_list_cons(&mut self, expr: &Expr, head: &Expr, tail: &Expr, env: EnvId) -> Result<Value> {
        let head = self.eval(head, env)?;
        match self.eval(tail, env)? {
            Value::List { element, items } => {
                let items = std::iter::once(head).chain(items.iter().cloned()).collect();
                Ok(Value::List { element, items })
            }
            other => Err(ExprError::mismatch("cons", expr.ty(), other.ty())),
        }
    }

    fn visit_list_case(&mut self, _: &Expr, case: &ListCase, env: EnvId) -> Result<Value> {
        let (element, items) = match self.eval(&case.list, env)? {
            Value::List { element, items } => (element, items),
            other => return Err(ExprError::mismatch("case", case.list.ty(), other.ty())),
        };
        let Some((head, tail)) = items.split_first() else {
            return self.eval(&case.empty, env);
        };

        let head_arg = case
            .head
            .arg_id()
            .ok_or_else(|| ExprError::mismatch("case head", "argument", case.head.kind().name()))?;
        let tail_arg = case
            .tail
            .arg_id()
            .ok_or_else(|| ExprError::mismatch("case tail", "argument", case.tail.kind().name()))?;

        let (head, tail) = (head.clone(), Value::List { element, items: tail });
        let child = self.extend(env, head_arg, head);
        let child = self.extend(child, tail_arg, tail);
        self.eval(&case.cons, child)
    }

    fn visit_apply(&mut self, _: &Expr, lambda: &Lambda, arg: &Expr, env: EnvId) -> Result<Value> {
        let value = self.eval(arg, env)?;
        let body = lambda.body().ok_or(ExprError::UnclosedLambda(lambda.id()))?;
        let child = self.extend(env, lambda.argument_id(), value);
        self.eval(body, child)
    }

    fn visit_cast(&mut self, expr: &Expr, f: &Expr, env: EnvId) -> Result<Value> {
        let value = self.eval(f, env)?;
        value.cast(expr.ty()).ok_or_else(|| ExprError::InvalidCast {
            from: f.ty().to_string(),
            to: expr.ty().to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use test_log::test;

    use crate::arith::{mk_add, mk_mul};
    use crate::lambda::mk_apply;
    use crate::logic::{mk_and, mk_if};
    use crate::node::{mk_arbitrary, mk_argument, mk_bool, mk_int};
    use crate::types::IntType;

    #[test]
    fn test_unbound_argument() {
        let a = mk_argument(Type::Bool);
        let f = mk_and(&a, &mk_arbitrary(Type::Bool)).unwrap();
        let res = interpret(&f, &Environment::new());
        assert_eq!(res, Err(ExprError::UnboundArgument(a.arg_id().unwrap())));

        let env = Environment::new().with_argument(a.arg_id().unwrap(), Value::Bool(true));
        assert_eq!(interpret(&f, &env).unwrap(), Value::Bool(false));
    }

    #[test]
    fn test_binding_type() {
        let x = mk_arbitrary(Type::int(IntType::I32));
        let env = Environment::new().with_arbitrary(x.var_id().unwrap(), Value::Bool(true));
        assert!(matches!(interpret(&x, &env), Err(ExprError::BindingType { .. })));
    }

    #[test]
    fn test_unassigned_arbitrary_is_default() {
        let x = mk_arbitrary(Type::int(IntType::I32));
        let y = mk_add(&x, &mk_int(IntType::I32, 3)).unwrap();
        assert_eq!(interpret(&y, &Environment::new()).unwrap(), Value::i32(3));
    }

    #[test]
    fn test_determinism() {
        let x = mk_arbitrary(Type::int(IntType::I64));
        let sq = mk_mul(&x, &x).unwrap();
        let e = mk_if(&mk_bool(true), &sq, &x).unwrap();
        let env = Environment::new().with_arbitrary(x.var_id().unwrap(), Value::i64(-12));
        let first = interpret(&e, &env).unwrap();
        let second = interpret(&e, &env).unwrap();
        assert_eq!(first, Value::i64(144));
        assert_eq!(first, second);
    }

    #[test]
    fn test_shared_subexpressions_are_cached() {
        // x + x + x + ... built as a chain of doublings shares every level.
        let x = mk_arbitrary(Type::int(IntType::U64));
        let mut e = x.clone();
        for _ in 0..40 {
            e = mk_add(&e, &e).unwrap();
        }
        let env = Environment::new().with_arbitrary(x.var_id().unwrap(), Value::int(IntType::U64, 1));

        let mut interpreter = Interpreter::new(&env);
        let value = interpreter.evaluate(&e).unwrap();
        assert_eq!(value, Value::int(IntType::U64, 1 << 40));
        // Each level is computed once and hit once.
        assert_eq!(interpreter.cache_misses(), 41);
        assert_eq!(interpreter.cache_hits(), 40);
        assert_eq!(interpreter.cache_size(), 41);
    }

    #[test]
    fn test_without_memoization() {
        let x = mk_arbitrary(Type::int(IntType::U8));
        let mut e = x.clone();
        for _ in 0..4 {
            e = mk_add(&e, &e).unwrap();
        }
        let env = Environment::new().with_arbitrary(x.var_id().unwrap(), Value::u8(1));
        let config = InterpreterConfig::default().with_memoize(false).with_cache_bits(2);
        let mut interpreter = Interpreter::with_config(&env, config);
        assert_eq!(interpreter.evaluate(&e).unwrap(), Value::u8(16));
        assert_eq!(interpreter.cache_hits(), 0);
        assert_eq!(interpreter.cache_misses(), 0);
        assert_eq!(interpreter.cache_size(), 0);
    }

    #[test]
    fn test_long_list_recursion() {
        let u32_ty = Type::int(IntType::U32);
        let xs = mk_arbitrary(Type::list(u32_ty.clone()));
        let e = crate::definitions::length(&xs).unwrap();

        let n = 5_000;
        let items = Value::list(u32_ty, (0..n).map(Value::u32).collect()).unwrap();
        let env = Environment::new().with_arbitrary(xs.var_id().unwrap(), items);
        let mut interpreter = Interpreter::new(&env);
        assert_eq!(interpreter.evaluate(&e).unwrap(), Value::u32(n));
        // One frame for each call and two for each case step.
        assert_eq!(interpreter.frame_count(), 3 * n as usize + 1);
    }

    #[test]
    fn test_equal_frames_are_shared() {
        let f = crate::lambda::Lambda::function(Type::int(IntType::I32), |x| mk_add(x, x)).unwrap();
        let three = mk_int(IntType::I32, 3);
        let a = mk_apply(&f, &three).unwrap();
        let b = mk_apply(&f, &mk_add(&mk_int(IntType::I32, 1), &mk_int(IntType::I32, 2)).unwrap()).unwrap();
        // Both arguments fold to the same constant, so both applications intern to one node.
        assert_eq!(a, b);

        let y = mk_arbitrary(Type::int(IntType::I32));
        let c = mk_apply(&f, &y).unwrap();
        let sum = mk_add(&a, &c).unwrap();
        let env = Environment::new().with_arbitrary(y.var_id().unwrap(), Value::i32(3));
        let mut interpreter = Interpreter::new(&env);
        assert_eq!(interpreter.evaluate(&sum).unwrap(), Value::i32(12));
        // `f 3` and `f y` with y = 3 run in the same frame.
        assert_eq!(interpreter.frame_count(), 1);
    }
}
