//! # zen-rs: hash-consed symbolic expressions
//!
//! **`zen-rs`** builds, canonicalizes and evaluates a small typed expression language whose
//! leaves stand for not-yet-known program inputs. Expressions are meant to be handed to external
//! reasoning engines (solvers, decision-diagram encoders, code generators), each of which is just
//! another [`Visitor`][crate::visitor::Visitor] over the same shared graph.
//!
//! ## Key Features
//!
//! - **Hash Consing**: Every node is built through a `mk_*` smart constructor and interned in a
//!   per-kind [table][crate::table::HashConsTable]. Structurally equal requests yield the *same*
//!   node, so equality and hashing of [`Expr`][crate::node::Expr] handles are by identity.
//! - **Weak Tables**: Tables hold only weak handles. Dropped nodes are reclaimed immediately and
//!   their slots are reused or compacted away.
//! - **Simplification at Construction**: Constant folding, identities, idempotence and
//!   commutative reordering are applied before interning.
//! - **Memoized Interpreter**: [`interpret`][crate::interpreter::interpret] evaluates a DAG in time
//!   linear in its size per distinct environment.
//! - **Recursive Definitions**: Self-referential [`Lambda`][crate::lambda::Lambda] cells give a
//!   finite representation to recursion over lists. Standard operations are built once per
//!   element type, see [`definitions`].
//!
//! ## Basic Usage
//!
//! ```rust
//! use zen_rs::arith::{mk_add, mk_leq, mk_sub};
//! use zen_rs::interpreter::{interpret, Environment};
//! use zen_rs::logic::mk_if;
//! use zen_rs::node::{mk_arbitrary, mk_int};
//! use zen_rs::types::{IntType, Type};
//! use zen_rs::value::Value;
//!
//! // 1. Create a symbolic input
//! let x = mk_arbitrary(Type::int(IntType::I32));
//!
//! // 2. Build: if x <= 0 then x + 1 else x - 1
//! let zero = mk_int(IntType::I32, 0);
//! let one = mk_int(IntType::I32, 1);
//! let f = mk_if(&mk_leq(&x, &zero)?, &mk_add(&x, &one)?, &mk_sub(&x, &one)?)?;
//!
//! // 3. Structurally equal requests give the same node
//! assert_eq!(f, mk_if(&mk_leq(&x, &zero)?, &mk_add(&one, &x)?, &mk_sub(&x, &one)?)?);
//!
//! // 4. Evaluate with x = 5
//! let env = Environment::new().with_arbitrary(x.var_id().unwrap(), Value::i32(5));
//! assert_eq!(interpret(&f, &env)?, Value::i32(4));
//! # Ok::<(), zen_rs::error::ExprError>(())
//! ```
//!
//! ## Core Components
//!
//! - **[`node`]**: The node family, the hash-cons tables and the leaf constructors.
//! - **[`logic`]**, **[`arith`]**, **[`object`]**, **[`list`]**, **[`lambda`]**: Smart constructors.
//! - **[`visitor`]**: Visitor and transformer dispatch.
//! - **[`interpreter`]**: The memoized interpreter.
//! - **[`rewrite`]**: Substitution and simplification.
//! - **[`dot`]**, **[`inspect`]**: Visualization and debugging helpers.

pub mod arith;
pub mod cache;
pub mod definitions;
pub mod display;
pub mod dot;
pub mod error;
pub mod inspect;
pub mod interpreter;
pub mod lambda;
pub mod list;
pub mod logic;
pub mod node;
pub mod object;
pub mod reference;
pub mod rewrite;
pub mod shape;
pub mod table;
pub mod types;
pub mod value;
pub mod visitor;
