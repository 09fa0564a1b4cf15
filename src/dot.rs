//! Expression DAG to DOT (Graphviz) conversion.
//!
//! The generated DOT output follows these conventions:
//! - **Leaves** (constants, symbolic placeholders, arguments) are rendered at the bottom (sink rank)
//! - **Operators** are labeled with their kind and operator symbol
//! - **Edges** point from a node to its children, labeled with the child position
//!   when the operator is not commutative
//! - **Root nodes** are rendered as rectangles at the top (source rank)
//!
//! Shared subexpressions appear once, with one incoming edge per parent.
//!
//! # Examples
//!
//! ```
//! use zen_rs::arith::mk_add;
//! use zen_rs::dot::to_dot;
//! use zen_rs::node::{mk_arbitrary, mk_int};
//! use zen_rs::types::{IntType, Type};
//!
//! let x = mk_arbitrary(Type::int(IntType::I32));
//! let f = mk_add(&x, &mk_int(IntType::I32, 1)).unwrap();
//!
//! let dot = to_dot(&[f]).unwrap();
//! // Write to file and render with: dot -Tpng output.dot -o output.png
//! ```

use std::fmt::Write as _;

use crate::inspect::descendants;
use crate::node::{Expr, ExprKind};

/// Configuration options for DOT output generation.
///
/// Use `DotConfig::default()` for standard settings.
///
/// ```
/// use zen_rs::dot::{to_dot_with_config, DotConfig};
/// use zen_rs::node::mk_arbitrary;
/// use zen_rs::types::Type;
///
/// let x = mk_arbitrary(Type::Bool);
/// let config = DotConfig {
///     show_types: false,
///     ..DotConfig::default()
/// };
/// let dot = to_dot_with_config(&[x], &config).unwrap();
/// ```
#[derive(Debug, Clone)]
pub struct DotConfig {
    /// Shape for operator nodes (default: "ellipse")
    pub node_shape: &'static str,
    /// Shape for leaves (default: "box")
    pub leaf_shape: &'static str,
    /// Shape for root nodes (default: "rect")
    pub root_shape: &'static str,
    /// Style for edges into lambda applications' arguments (default: "dashed")
    pub apply_edge_style: &'static str,
    /// Whether to append the value type to each label (default: true)
    pub show_types: bool,
}

impl Default for DotConfig {
    fn default() -> Self {
        Self {
            node_shape: "ellipse",
            leaf_shape: "box",
            root_shape: "rect",
            apply_edge_style: "dashed",
            show_types: true,
        }
    }
}

fn label(expr: &Expr) -> String {
    match expr.kind() {
        ExprKind::Constant(value) => value.to_string(),
        ExprKind::Arbitrary(var) => var.to_string(),
        ExprKind::Argument(arg) => arg.to_string(),
        ExprKind::Arith(op, ..) => op.symbol().to_string(),
        ExprKind::Compare(op, ..) => op.symbol().to_string(),
        ExprKind::GetField(obj, index) | ExprKind::WithField(obj, index, _) => {
            let field = obj
                .ty()
                .schema()
                .and_then(|s| s.field(*index))
                .map_or_else(|| format!("#{}", index), |f| f.name.clone());
            format!("{} {}", expr.kind().name(), field)
        }
        ExprKind::Apply(lambda, _) => format!("apply {}", lambda.id()),
        kind => kind.name().to_string(),
    }
}

fn is_leaf(expr: &Expr) -> bool {
    matches!(
        expr.kind(),
        ExprKind::Constant(_) | ExprKind::Arbitrary(_) | ExprKind::Argument(_) | ExprKind::ListEmpty
    )
}

fn is_commutative(expr: &Expr) -> bool {
    match expr.kind() {
        ExprKind::And(..) | ExprKind::Or(..) | ExprKind::Equal(..) => true,
        ExprKind::Arith(op, ..) => op.is_commutative(),
        _ => false,
    }
}

/// Converts the DAG rooted at `roots` to DOT format.
pub fn to_dot(roots: &[Expr]) -> Result<String, std::fmt::Error> {
    to_dot_with_config(roots, &DotConfig::default())
}

/// Converts the DAG rooted at `roots` to DOT format with custom configuration.
pub fn to_dot_with_config(roots: &[Expr], config: &DotConfig) -> Result<String, std::fmt::Error> {
    let mut dot = String::new();
    writeln!(dot, "digraph {{")?;
    writeln!(dot, "node [shape={}];", config.node_shape)?;

    let all_nodes = descendants(roots);

    let escape = |s: String| s.replace('\\', "\\\\").replace('"', "\\\"");
    let full_label = |e: &Expr| {
        if config.show_types {
            escape(format!("{}: {}", label(e), e.ty()))
        } else {
            escape(label(e))
        }
    };

    // Leaves at the bottom
    writeln!(dot, "{{ rank=sink")?;
    for e in all_nodes.iter().filter(|e| is_leaf(e)) {
        writeln!(dot, "n{} [shape={}, label=\"{}\"];", e.id().get(), config.leaf_shape, full_label(e))?;
    }
    writeln!(dot, "}}")?;

    for e in all_nodes.iter().filter(|e| !is_leaf(e)) {
        writeln!(dot, "n{} [label=\"{}\"];", e.id().get(), full_label(e))?;
    }

    for e in all_nodes.iter() {
        let children = e.kind().children();
        let labeled = children.len() > 1 && !is_commutative(e);
        for (i, child) in children.iter().enumerate() {
            write!(dot, "n{} -> n{}", e.id().get(), child.id().get())?;
            if matches!(e.kind(), ExprKind::Apply(..)) {
                write!(dot, " [style={}]", config.apply_edge_style)?;
            } else if labeled {
                write!(dot, " [label=\"{}\"]", i)?;
            }
            writeln!(dot, ";")?;
        }
    }

    // Roots at the top
    writeln!(dot, "{{ rank=source")?;
    for (i, _) in roots.iter().enumerate() {
        writeln!(dot, "r{} [shape={}, label=\"r{}\"];", i, config.root_shape, i)?;
    }
    writeln!(dot, "}}")?;
    for (i, root) in roots.iter().enumerate() {
        writeln!(dot, "r{} -> n{};", i, root.id().get())?;
    }

    writeln!(dot, "}}")?;
    Ok(dot)
}

#[cfg(test)]
mod tests {
    use super::*;

    use test_log::test;

    use crate::arith::{mk_add, mk_sub};
    use crate::definitions::append;
    use crate::node::{mk_arbitrary, mk_int};
    use crate::types::{IntType, Type};

    #[test]
    fn test_to_dot_basic() {
        let x = mk_arbitrary(Type::int(IntType::I32));
        let f = mk_sub(&x, &mk_int(IntType::I32, 1)).unwrap();

        let dot = to_dot(&[f.clone()]).unwrap();
        assert!(dot.starts_with("digraph {"));
        assert!(dot.ends_with("}\n"));
        assert!(dot.contains(&format!("r0 -> n{};", f.id().get())));
        assert!(dot.contains("[label=\"0\"]"));
    }

    #[test]
    fn test_shared_nodes_appear_once() {
        let x = mk_arbitrary(Type::int(IntType::I32));
        let f = mk_add(&x, &x).unwrap();
        let g = mk_sub(&f, &x).unwrap();
        let dot = to_dot(&[f, g]).unwrap();
        let decl = format!("n{} [shape=box", x.id().get());
        assert_eq!(dot.matches(&decl).count(), 1);
    }

    #[test]
    fn test_to_dot_with_config() {
        let xs = mk_arbitrary(Type::list(Type::Bool));
        let ys = mk_arbitrary(Type::list(Type::Bool));
        let zs = append(&xs, &ys).unwrap();

        let config = DotConfig {
            show_types: false,
            apply_edge_style: "bold",
            ..DotConfig::default()
        };
        let dot = to_dot_with_config(&[zs], &config).unwrap();
        assert!(dot.contains("style=bold"));
        assert!(!dot.contains(": [bool]"));
    }

    /// Helper test to write a DOT file for manual inspection (disabled by default)
    #[test]
    #[ignore]
    fn test_write_dot_file() {
        let xs = mk_arbitrary(Type::list(Type::Bool));
        let ys = mk_arbitrary(Type::list(Type::Bool));
        let zs = append(&xs, &ys).unwrap();
        let dot = to_dot(&[zs]).unwrap();
        std::fs::write("test_output.dot", &dot).unwrap();
        println!("DOT output:\n{}", dot);
    }
}
