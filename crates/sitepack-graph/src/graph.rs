//! The build graph: every module reachable from the entry point.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use crate::module::ModuleNode;

/// Mapping from canonical module path to module node, rooted at one entry.
///
/// Cycles are tolerated: discovery visits each module once, and ordering
/// skips back-edges instead of erroring, so `a importing b importing a`
/// neither loops nor fails.
#[derive(Debug)]
pub struct BuildGraph {
    modules: HashMap<PathBuf, ModuleNode>,
    entry: PathBuf,
}

impl BuildGraph {
    /// Create an empty graph rooted at `entry`.
    pub fn new(entry: PathBuf) -> Self {
        Self {
            modules: HashMap::new(),
            entry,
        }
    }

    /// Add a module to the graph.
    pub fn insert(&mut self, node: ModuleNode) {
        self.modules.insert(node.path.clone(), node);
    }

    /// Get a module node by path.
    pub fn get(&self, path: &Path) -> Option<&ModuleNode> {
        self.modules.get(path)
    }

    /// Check if the graph contains a module.
    pub fn contains(&self, path: &Path) -> bool {
        self.modules.contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// The entry point module.
    pub fn entry(&self) -> &Path {
        &self.entry
    }

    /// Deterministic dependencies-first ordering for bundle assembly:
    /// depth-first post-order from the entry, following each module's
    /// references in source order, first visit wins. The entry is always
    /// last; cycle back-edges are skipped by the visited check.
    pub fn emit_order(&self) -> Vec<PathBuf> {
        let mut visited = HashSet::new();
        let mut order = Vec::with_capacity(self.modules.len());
        self.visit(&self.entry, &mut visited, &mut order);
        order
    }

    fn visit(&self, path: &Path, visited: &mut HashSet<PathBuf>, order: &mut Vec<PathBuf>) {
        if !visited.insert(path.to_path_buf()) {
            return;
        }

        if let Some(node) = self.modules.get(path) {
            for dep in node.dependencies() {
                self.visit(dep, visited, order);
            }
            order.push(path.to_path_buf());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::module::{ImportClause, ImportRef};
    use crate::Span;

    fn node(path: &str, deps: &[&str]) -> ModuleNode {
        let mut n = ModuleNode::new(PathBuf::from(path), String::new());
        for dep in deps {
            n.imports.push(ImportRef {
                span: Span::new(0, 0, 0),
                specifier: format!("./{}", dep),
                specifier_span: Span::new(0, 0, 0),
                clause: ImportClause::default(),
                dynamic: false,
                type_only: false,
                resolved: Some(PathBuf::from(dep)),
            });
        }
        n
    }

    #[test]
    fn test_simple_chain() {
        // c imports b, b imports a
        let mut graph = BuildGraph::new(PathBuf::from("c.ts"));
        graph.insert(node("a.ts", &[]));
        graph.insert(node("b.ts", &["a.ts"]));
        graph.insert(node("c.ts", &["b.ts"]));

        let order = graph.emit_order();
        assert_eq!(
            order,
            vec![
                PathBuf::from("a.ts"),
                PathBuf::from("b.ts"),
                PathBuf::from("c.ts"),
            ]
        );
    }

    #[test]
    fn test_diamond_dependency() {
        // Diamond: d -> b,c; b,c -> a. Every module appears exactly once,
        // dependencies before dependents.
        let mut graph = BuildGraph::new(PathBuf::from("d.ts"));
        graph.insert(node("a.ts", &[]));
        graph.insert(node("b.ts", &["a.ts"]));
        graph.insert(node("c.ts", &["a.ts"]));
        graph.insert(node("d.ts", &["b.ts", "c.ts"]));

        let order = graph.emit_order();
        assert_eq!(order.len(), 4);

        let pos = |p: &str| order.iter().position(|x| x == Path::new(p)).unwrap();
        assert!(pos("a.ts") < pos("b.ts"));
        assert!(pos("a.ts") < pos("c.ts"));
        assert!(pos("b.ts") < pos("d.ts"));
        assert!(pos("c.ts") < pos("d.ts"));
        assert_eq!(pos("d.ts"), 3);
    }

    #[test]
    fn test_cycle_is_tolerated() {
        // a imports b, b imports a. Ordering must terminate, include both
        // modules once, and keep the entry last.
        let mut graph = BuildGraph::new(PathBuf::from("a.ts"));
        graph.insert(node("a.ts", &["b.ts"]));
        graph.insert(node("b.ts", &["a.ts"]));

        let order = graph.emit_order();
        assert_eq!(order, vec![PathBuf::from("b.ts"), PathBuf::from("a.ts")]);
    }

    #[test]
    fn test_self_import_is_tolerated() {
        let mut graph = BuildGraph::new(PathBuf::from("a.ts"));
        graph.insert(node("a.ts", &["a.ts"]));

        assert_eq!(graph.emit_order(), vec![PathBuf::from("a.ts")]);
    }

    #[test]
    fn test_order_is_deterministic() {
        let build = || {
            let mut graph = BuildGraph::new(PathBuf::from("main.ts"));
            graph.insert(node("main.ts", &["x.ts", "y.ts"]));
            graph.insert(node("x.ts", &["shared.ts"]));
            graph.insert(node("y.ts", &["shared.ts"]));
            graph.insert(node("shared.ts", &[]));
            graph.emit_order()
        };

        assert_eq!(build(), build());
    }
}
