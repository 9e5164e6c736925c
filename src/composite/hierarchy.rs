//! Hierarchical result flattening.
//!
//! Some model types are tree-shaped: each instance exposes zero or more
//! same-typed children. For those, a composite fetch should deliver every
//! node reachable from the top-level results, not just the roots. Types
//! declare the capability by implementing [`HierarchicalModel`]; the
//! builder resolves once per aggregation call whether flattening applies
//! (see [`CompositeModelBuilder::hierarchical`]).
//!
//! [`CompositeModelBuilder::hierarchical`]: super::CompositeModelBuilder::hierarchical

/// A model type whose instances expose same-typed children.
///
/// The child relation is trusted to be tree-shaped; the flattener only
/// guards against nontermination, it does not verify the shape.
pub trait HierarchicalModel: Sized {
    /// Returns this node's direct children.
    fn children(&self) -> Vec<Self>;
}

/// Expands top-level results into the full set of reachable nodes.
///
/// The output contains every top-level node plus every node reachable by
/// repeatedly following the child relation, each included exactly once.
/// Membership is what matters; the output order carries no meaning.
///
/// Visiting each node exactly once (checked by equality) keeps the
/// traversal terminating even if a model erroneously contains a cycle.
/// Flattening an already-flattened set yields the same set.
pub fn flatten_hierarchy<T>(top_level: Vec<T>) -> Vec<T>
where
    T: HierarchicalModel + PartialEq,
{
    let mut flattened: Vec<T> = Vec::new();
    let mut pending = top_level;

    while let Some(node) = pending.pop() {
        if flattened.contains(&node) {
            continue;
        }
        pending.extend(node.children());
        flattened.push(node);
    }

    flattened
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Debug, PartialEq)]
    struct ProjectNode {
        name: &'static str,
        children: Vec<ProjectNode>,
    }

    impl ProjectNode {
        fn leaf(name: &'static str) -> Self {
            Self {
                name,
                children: Vec::new(),
            }
        }

        fn with_children(name: &'static str, children: Vec<ProjectNode>) -> Self {
            Self { name, children }
        }
    }

    impl HierarchicalModel for ProjectNode {
        fn children(&self) -> Vec<Self> {
            self.children.clone()
        }
    }

    fn names(nodes: &[ProjectNode]) -> Vec<&'static str> {
        let mut names: Vec<_> = nodes.iter().map(|n| n.name).collect();
        names.sort_unstable();
        names
    }

    #[test]
    fn test_leaves_pass_through() {
        let flattened = flatten_hierarchy(vec![
            ProjectNode::leaf("a"),
            ProjectNode::leaf("b"),
            ProjectNode::leaf("c"),
        ]);
        assert_eq!(names(&flattened), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_root_with_two_children_yields_three_nodes() {
        let root = ProjectNode::with_children(
            "root",
            vec![ProjectNode::leaf("child1"), ProjectNode::leaf("child2")],
        );

        let flattened = flatten_hierarchy(vec![root]);
        assert_eq!(names(&flattened), vec!["child1", "child2", "root"]);
    }

    #[test]
    fn test_nested_hierarchy_fully_expanded() {
        let root = ProjectNode::with_children(
            "root",
            vec![ProjectNode::with_children(
                "mid",
                vec![ProjectNode::leaf("leaf")],
            )],
        );

        let flattened = flatten_hierarchy(vec![root]);
        assert_eq!(names(&flattened), vec!["leaf", "mid", "root"]);
    }

    #[test]
    fn test_flattening_is_idempotent() {
        let root = ProjectNode::with_children(
            "root",
            vec![ProjectNode::leaf("child1"), ProjectNode::leaf("child2")],
        );

        let once = flatten_hierarchy(vec![root]);
        let twice = flatten_hierarchy(once.clone());
        assert_eq!(names(&once), names(&twice));
        assert_eq!(once.len(), twice.len());
    }

    #[test]
    fn test_duplicate_nodes_collapse() {
        let shared = ProjectNode::leaf("shared");
        let a = ProjectNode::with_children("a", vec![shared.clone()]);
        let b = ProjectNode::with_children("b", vec![shared]);

        let flattened = flatten_hierarchy(vec![a, b]);
        assert_eq!(names(&flattened), vec!["a", "b", "shared"]);
    }

    #[test]
    fn test_empty_input_yields_empty_output() {
        let flattened: Vec<ProjectNode> = flatten_hierarchy(Vec::new());
        assert!(flattened.is_empty());
    }
}
