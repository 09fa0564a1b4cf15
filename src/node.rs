//! Expression nodes and the hash-cons tables that canonicalize them.
//!
//! An [`Expr`] is a shared handle to an immutable [`ExprNode`]. Nodes are
//! only ever created through the `mk_*` smart constructors, which funnel
//! every request through the per-kind table in [`tables`]. Consequently two
//! handles are equal exactly when they point to the same node, and
//! equality, hashing and ordering of handles are all by node identity.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, OnceLock};

use log::debug;

use crate::error::{ExprError, Result};
use crate::lambda::Lambda;
use crate::reference::{ArgId, LambdaId, NodeId, VarId};
use crate::table::{HashConsTable, TableStats};
use crate::types::{IntType, Type};
use crate::value::Value;

/// Binary arithmetic and bitwise operators.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
    BitAnd,
    BitOr,
    BitXor,
}

impl ArithOp {
    pub fn is_commutative(self) -> bool {
        !matches!(self, ArithOp::Sub)
    }

    pub fn symbol(self) -> &'static str {
        match self {
            ArithOp::Add => "+",
            ArithOp::Sub => "-",
            ArithOp::Mul => "*",
            ArithOp::BitAnd => "&",
            ArithOp::BitOr => "|",
            ArithOp::BitXor => "^",
        }
    }
}

/// Ordering comparisons over integer types.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum CmpOp {
    Lt,
    Leq,
    Gt,
    Geq,
}

impl CmpOp {
    pub fn symbol(self) -> &'static str {
        match self {
            CmpOp::Lt => "<",
            CmpOp::Leq => "<=",
            CmpOp::Gt => ">",
            CmpOp::Geq => ">=",
        }
    }

    /// Whether `x op x` holds.
    pub fn is_reflexive(self) -> bool {
        matches!(self, CmpOp::Leq | CmpOp::Geq)
    }
}

/// Case split over a list.
///
/// `head` and `tail` are argument nodes created for this case only; `cons`
/// may refer to them and is evaluated with both bound.
#[derive(Debug, Clone)]
pub struct ListCase {
    pub list: Expr,
    pub empty: Expr,
    pub head: Expr,
    pub tail: Expr,
    pub cons: Expr,
}

/// The closed set of node kinds.
#[derive(Debug, Clone)]
pub enum ExprKind {
    Constant(Value),
    /// Symbolic placeholder for a value a solver chooses.
    Arbitrary(VarId),
    /// Placeholder bound by a lambda application or a list case.
    Argument(ArgId),
    Not(Expr),
    And(Expr, Expr),
    Or(Expr, Expr),
    Arith(ArithOp, Expr, Expr),
    BitNot(Expr),
    Equal(Expr, Expr),
    Compare(CmpOp, Expr, Expr),
    If(Expr, Expr, Expr),
    GetField(Expr, usize),
    WithField(Expr, usize, Expr),
    /// Fields in schema order; the schema is the node type.
    CreateObject(Vec<Expr>),
    /// Empty list; the element type comes from the node type.
    ListEmpty,
    ListCons(Expr, Expr),
    ListCase(ListCase),
    Apply(Lambda, Expr),
    /// Integer conversion to the node type.
    Cast(Expr),
}

impl ExprKind {
    /// Direct children, in field order. Lambda bodies are not children.
    pub fn children(&self) -> Vec<&Expr> {
        match self {
            ExprKind::Constant(_) | ExprKind::Arbitrary(_) | ExprKind::Argument(_) | ExprKind::ListEmpty => vec![],
            ExprKind::Not(e) | ExprKind::BitNot(e) | ExprKind::Cast(e) | ExprKind::GetField(e, _) => vec![e],
            ExprKind::And(a, b)
            | ExprKind::Or(a, b)
            | ExprKind::Arith(_, a, b)
            | ExprKind::Equal(a, b)
            | ExprKind::Compare(_, a, b)
            | ExprKind::WithField(a, _, b)
            | ExprKind::ListCons(a, b) => vec![a, b],
            ExprKind::If(a, b, c) => vec![a, b, c],
            ExprKind::CreateObject(fields) => fields.iter().collect(),
            ExprKind::ListCase(case) => vec![&case.list, &case.empty, &case.head, &case.tail, &case.cons],
            ExprKind::Apply(_, arg) => vec![arg],
        }
    }

    /// Short name of the kind, used in logs and graph labels.
    pub fn name(&self) -> &'static str {
        match self {
            ExprKind::Constant(_) => "const",
            ExprKind::Arbitrary(_) => "arbitrary",
            ExprKind::Argument(_) => "arg",
            ExprKind::Not(_) => "not",
            ExprKind::And(..) => "and",
            ExprKind::Or(..) => "or",
            ExprKind::Arith(..) => "arith",
            ExprKind::BitNot(_) => "bitnot",
            ExprKind::Equal(..) => "eq",
            ExprKind::Compare(..) => "cmp",
            ExprKind::If(..) => "if",
            ExprKind::GetField(..) => "get",
            ExprKind::WithField(..) => "with",
            ExprKind::CreateObject(_) => "create",
            ExprKind::ListEmpty => "nil",
            ExprKind::ListCons(..) => "cons",
            ExprKind::ListCase(_) => "case",
            ExprKind::Apply(..) => "apply",
            ExprKind::Cast(_) => "cast",
        }
    }
}

/// An immutable expression node.
#[derive(Debug)]
pub struct ExprNode {
    id: NodeId,
    ty: Type,
    kind: ExprKind,
}

impl ExprNode {
    fn new(ty: Type, kind: ExprKind) -> Self {
        Self {
            id: NodeId::fresh(),
            ty,
            kind,
        }
    }
}

/// Shared handle to a canonical expression node.
#[derive(Clone)]
pub struct Expr(Arc<ExprNode>);

impl Expr {
    pub fn id(&self) -> NodeId {
        self.0.id
    }

    pub fn ty(&self) -> &Type {
        &self.0.ty
    }

    pub fn kind(&self) -> &ExprKind {
        &self.0.kind
    }

    pub fn as_constant(&self) -> Option<&Value> {
        match self.kind() {
            ExprKind::Constant(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        self.as_constant().and_then(Value::as_bool)
    }

    pub fn is_constant(&self) -> bool {
        matches!(self.kind(), ExprKind::Constant(_))
    }

    pub fn arg_id(&self) -> Option<ArgId> {
        match self.kind() {
            ExprKind::Argument(arg) => Some(*arg),
            _ => None,
        }
    }

    pub fn var_id(&self) -> Option<VarId> {
        match self.kind() {
            ExprKind::Arbitrary(var) => Some(*var),
            _ => None,
        }
    }

    /// Number of strong handles to this node.
    pub fn strong_count(this: &Expr) -> usize {
        Arc::strong_count(&this.0)
    }

    /// Whether both handles point to the same node.
    pub fn ptr_eq(this: &Expr, other: &Expr) -> bool {
        Arc::ptr_eq(&this.0, &other.0)
    }
}

impl PartialEq for Expr {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for Expr {}

impl Hash for Expr {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id().hash(state);
    }
}

impl PartialOrd for Expr {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Expr {
    fn cmp(&self, other: &Self) -> Ordering {
        self.id().cmp(&other.id())
    }
}

impl fmt::Debug for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Expr({}: {} = {})", self.id(), self.ty(), self)
    }
}

// ─── Tables ──────────────────────────────────────────────────────────────────

type Table<K> = HashConsTable<K, ExprNode>;

/// One hash-cons table per node kind, keyed by child identities and literal parameters.
pub(crate) struct Tables {
    pub constant: Table<Value>,
    pub not: Table<NodeId>,
    pub and: Table<(NodeId, NodeId)>,
    pub or: Table<(NodeId, NodeId)>,
    pub arith: Table<(ArithOp, NodeId, NodeId)>,
    pub bit_not: Table<NodeId>,
    pub equal: Table<(NodeId, NodeId)>,
    pub compare: Table<(CmpOp, NodeId, NodeId)>,
    pub ite: Table<(NodeId, NodeId, NodeId)>,
    pub get_field: Table<(NodeId, usize)>,
    pub with_field: Table<(NodeId, usize, NodeId)>,
    pub create_object: Table<(Type, Vec<NodeId>)>,
    pub list_empty: Table<Type>,
    pub list_cons: Table<(NodeId, NodeId)>,
    pub list_case: Table<(NodeId, NodeId, NodeId, NodeId, NodeId)>,
    pub apply: Table<(LambdaId, NodeId)>,
    pub cast: Table<(NodeId, Type)>,
}

static TABLES: OnceLock<Tables> = OnceLock::new();

pub(crate) fn tables() -> &'static Tables {
    TABLES.get_or_init(|| Tables {
        constant: Table::new(),
        not: Table::new(),
        and: Table::new(),
        or: Table::new(),
        arith: Table::new(),
        bit_not: Table::new(),
        equal: Table::new(),
        compare: Table::new(),
        ite: Table::new(),
        get_field: Table::new(),
        with_field: Table::new(),
        create_object: Table::new(),
        list_empty: Table::new(),
        list_cons: Table::new(),
        list_case: Table::new(),
        apply: Table::new(),
        cast: Table::new(),
    })
}

/// Per-kind statistics of all hash-cons tables.
pub fn table_stats() -> Vec<(&'static str, TableStats)> {
    let t = tables();
    vec![
        ("const", t.constant.stats()),
        ("not", t.not.stats()),
        ("and", t.and.stats()),
        ("or", t.or.stats()),
        ("arith", t.arith.stats()),
        ("bitnot", t.bit_not.stats()),
        ("eq", t.equal.stats()),
        ("cmp", t.compare.stats()),
        ("if", t.ite.stats()),
        ("get", t.get_field.stats()),
        ("with", t.with_field.stats()),
        ("create", t.create_object.stats()),
        ("nil", t.list_empty.stats()),
        ("cons", t.list_cons.stats()),
        ("case", t.list_case.stats()),
        ("apply", t.apply.stats()),
        ("cast", t.cast.stats()),
    ]
}

/// Return the canonical node for `key` in `table`, building it on demand.
pub(crate) fn intern<K, F>(table: &Table<K>, key: K, ty: Type, kind: F) -> Expr
where
    K: Hash + Eq,
    F: FnOnce() -> ExprKind,
{
    Expr(table.get_or_create(key, || Arc::new(ExprNode::new(ty, kind()))))
}

pub(crate) fn check_type(op: &'static str, expr: &Expr, expected: &Type) -> Result<()> {
    if expr.ty() == expected {
        Ok(())
    } else {
        Err(ExprError::mismatch(op, expected, expr.ty()))
    }
}

/// Order the operands of a commutative operator by node identity.
pub(crate) fn ordered<'a>(lhs: &'a Expr, rhs: &'a Expr) -> (&'a Expr, &'a Expr) {
    if lhs.id() <= rhs.id() {
        (lhs, rhs)
    } else {
        (rhs, lhs)
    }
}

// ─── Leaves ──────────────────────────────────────────────────────────────────

pub fn mk_constant(value: Value) -> Expr {
    let ty = value.ty();
    intern(&tables().constant, value.clone(), ty, || ExprKind::Constant(value))
}

pub fn mk_bool(value: bool) -> Expr {
    mk_constant(Value::Bool(value))
}

pub fn mk_true() -> Expr {
    mk_bool(true)
}

pub fn mk_false() -> Expr {
    mk_bool(false)
}

/// Integer constant of the given type, wrapped modulo `2^width`.
pub fn mk_int(ty: IntType, value: i128) -> Expr {
    mk_constant(Value::int(ty, value))
}

/// A fresh symbolic placeholder of type `ty`.
///
/// Every call yields a distinct placeholder, so these nodes bypass interning.
pub fn mk_arbitrary(ty: Type) -> Expr {
    let var = VarId::fresh();
    debug!("mk_arbitrary(ty = {}) -> {}", ty, var);
    Expr(Arc::new(ExprNode::new(ty, ExprKind::Arbitrary(var))))
}

/// A fresh argument placeholder of type `ty`.
///
/// Arguments only have meaning under an environment that binds them, see
/// [`Environment`][crate::interpreter::Environment].
pub fn mk_argument(ty: Type) -> Expr {
    let arg = ArgId::fresh();
    debug!("mk_argument(ty = {}) -> {}", ty, arg);
    Expr(Arc::new(ExprNode::new(ty, ExprKind::Argument(arg))))
}
