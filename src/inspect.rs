//! Helpers for exploring expression DAGs.
//!
//! Traversals follow [`ExprKind::children`] and do not enter lambda bodies.

use std::fmt;

use rustc_hash::FxHashSet;

use crate::node::{Expr, ExprKind};
use crate::reference::NodeId;

pub use crate::node::table_stats;

/// All distinct nodes reachable from `roots`, children before parents.
pub fn descendants<'a>(roots: impl IntoIterator<Item = &'a Expr>) -> Vec<Expr> {
    let mut visited = FxHashSet::<NodeId>::default();
    let mut result = Vec::new();
    let mut stack: Vec<(Expr, bool)> = roots.into_iter().map(|e| (e.clone(), false)).collect();
    stack.reverse();

    while let Some((expr, expanded)) = stack.pop() {
        if expanded {
            result.push(expr);
            continue;
        }
        if !visited.insert(expr.id()) {
            continue;
        }
        let children: Vec<Expr> = expr.kind().children().into_iter().cloned().collect();
        stack.push((expr, true));
        for child in children.into_iter().rev() {
            if !visited.contains(&child.id()) {
                stack.push((child, false));
            }
        }
    }
    result
}

/// Number of distinct nodes in the DAG rooted at `expr`.
pub fn size(expr: &Expr) -> usize {
    descendants([expr]).len()
}

/// Symbolic placeholders reachable from `roots`, in the order they are first reached.
pub fn arbitraries<'a>(roots: impl IntoIterator<Item = &'a Expr>) -> Vec<Expr> {
    descendants(roots)
        .into_iter()
        .filter(|e| matches!(e.kind(), ExprKind::Arbitrary(_)))
        .collect()
}

/// One line per node of a DAG, for debugging.
#[derive(Debug, Clone)]
pub struct DagDump {
    pub root: Expr,
    pub nodes: Vec<Expr>,
}

impl DagDump {
    pub fn new(root: &Expr) -> Self {
        Self {
            root: root.clone(),
            nodes: descendants([root]),
        }
    }
}

impl fmt::Display for DagDump {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "DAG (root = {}, {} nodes):", self.root.id(), self.nodes.len())?;
        for node in &self.nodes {
            write!(f, "  {}: {} {}", node.id(), node.ty(), node.kind().name())?;
            for child in node.kind().children() {
                write!(f, " {}", child.id())?;
            }
            if let ExprKind::Apply(lambda, _) = node.kind() {
                write!(f, " [{}]", lambda.id())?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
