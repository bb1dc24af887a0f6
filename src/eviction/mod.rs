// ============================================================================
// Cache Eviction Walker
// ============================================================================
//
// Depth-first, children-before-parent traversal of the materialized part of
// an object graph. An explicit stack replaces recursion so deep batch graphs
// cannot exhaust the call stack, and a visited set keyed by node identity
// makes the walk terminate on cyclic or shared references.
//
// ============================================================================

use crate::core::{EntityKey, Result};
use crate::entity::Entity;
use std::collections::HashSet;
use std::hash::Hash;

/// A node whose already-materialized neighbours can be listed without
/// loading anything.
pub trait GraphNode: Sized {
    type Key: Eq + Hash + Clone;

    fn node_key(&self) -> Self::Key;

    fn materialized_children(&self) -> Vec<Self>;
}

impl GraphNode for Entity {
    type Key = EntityKey;

    fn node_key(&self) -> EntityKey {
        self.key()
    }

    fn materialized_children(&self) -> Vec<Entity> {
        self.materialized_relations()
    }
}

enum Frame<N> {
    Enter(N),
    Exit(N),
}

/// Visit every node reachable from `root` exactly once, children first.
///
/// Returns the number of nodes visited. The first error from `visit` stops
/// the walk; nodes visited before it stay visited.
pub fn walk_post_order<N, F>(root: N, mut visit: F) -> Result<usize>
where
    N: GraphNode,
    F: FnMut(&N) -> Result<()>,
{
    let mut visited: HashSet<N::Key> = HashSet::new();
    let mut stack = vec![Frame::Enter(root)];
    let mut count = 0;

    while let Some(frame) = stack.pop() {
        match frame {
            Frame::Enter(node) => {
                if !visited.insert(node.node_key()) {
                    continue;
                }
                let children = node.materialized_children();
                stack.push(Frame::Exit(node));
                // Reversed so children are visited in declaration order.
                for child in children.into_iter().rev() {
                    if !visited.contains(&child.node_key()) {
                        stack.push(Frame::Enter(child));
                    }
                }
            }
            Frame::Exit(node) => {
                visit(&node)?;
                count += 1;
            }
        }
    }

    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::DbError;
    use std::collections::HashMap;
    use std::rc::Rc;

    type Adjacency = Rc<HashMap<&'static str, Vec<&'static str>>>;

    /// Adjacency-list node so tests can build arbitrary cyclic shapes.
    #[derive(Clone)]
    struct TestNode {
        name: &'static str,
        graph: Adjacency,
    }

    impl GraphNode for TestNode {
        type Key = &'static str;

        fn node_key(&self) -> &'static str {
            self.name
        }

        fn materialized_children(&self) -> Vec<TestNode> {
            self.graph
                .get(self.name)
                .map(|names| {
                    names
                        .iter()
                        .map(|name| TestNode {
                            name: *name,
                            graph: Rc::clone(&self.graph),
                        })
                        .collect()
                })
                .unwrap_or_default()
        }
    }

    fn graph(edges: Vec<(&'static str, Vec<&'static str>)>) -> Adjacency {
        Rc::new(edges.into_iter().collect())
    }

    fn order(root: &'static str, graph: Adjacency) -> Vec<&'static str> {
        let mut seen = Vec::new();
        walk_post_order(TestNode { name: root, graph }, |node| {
            seen.push(node.name);
            Ok(())
        })
        .unwrap();
        seen
    }

    #[test]
    fn test_children_before_parent() {
        let g = graph(vec![("item", vec!["b1", "b2"]), ("b1", vec!["s1"]), ("b2", vec!["s2"])]);
        assert_eq!(order("item", g), vec!["s1", "b1", "s2", "b2", "item"]);
    }

    #[test]
    fn test_cycle_terminates_and_visits_once() {
        let g = graph(vec![
            ("collection", vec!["template"]),
            ("template", vec!["bundle"]),
            ("bundle", vec!["collection"]),
        ]);
        let seen = order("collection", g);
        assert_eq!(seen, vec!["bundle", "template", "collection"]);
    }

    #[test]
    fn test_shared_node_visited_once() {
        let g = graph(vec![
            ("community", vec!["logo", "collection"]),
            ("collection", vec!["logo"]),
        ]);
        let seen = order("community", g);
        assert_eq!(seen.iter().filter(|n| **n == "logo").count(), 1);
        assert_eq!(seen.len(), 3);
        assert_eq!(seen.last(), Some(&"community"));
    }

    #[test]
    fn test_self_reference() {
        let g = graph(vec![("a", vec!["a"])]);
        assert_eq!(order("a", g), vec!["a"]);
    }

    #[test]
    fn test_deep_chain_does_not_recurse() {
        let names: Vec<&'static str> = (0..50_000)
            .map(|i| &*Box::leak(format!("n{}", i).into_boxed_str()))
            .collect();
        let mut edges = HashMap::new();
        for pair in names.windows(2) {
            edges.insert(pair[0], vec![pair[1]]);
        }
        let count = walk_post_order(
            TestNode {
                name: names[0],
                graph: Rc::new(edges),
            },
            |_| Ok(()),
        )
        .unwrap();
        assert_eq!(count, names.len());
    }

    #[test]
    fn test_visit_error_stops_walk() {
        let g = graph(vec![("root", vec!["a", "b"])]);
        let mut seen = Vec::new();
        let result = walk_post_order(TestNode { name: "root", graph: g }, |node| {
            if node.name == "b" {
                return Err(DbError::StorageError("evict failed".into()));
            }
            seen.push(node.name);
            Ok(())
        });
        assert!(result.is_err());
        assert_eq!(seen, vec!["a"]);
    }
}
