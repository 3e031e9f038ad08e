//! `DependencyGraph`. Acyclicity is an invariant of *construction*, not
//! something checked after the fact: a `DependencyGraph`
//! is only ever built by `DependencyResolver::resolve`, which never records a
//! rule until every one of its dependencies is already recorded, so no
//! recorded edge can ever point forward into an unfinished part of the
//! traversal.

use std::collections::HashMap;
use std::sync::Arc;

use crate::rule::BuiltRule;
use crate::target_name::TargetName;

#[derive(Clone)]
pub struct DependencyGraph {
    nodes: HashMap<TargetName, Arc<dyn BuiltRule>>,
    edges: HashMap<TargetName, Vec<TargetName>>,
    /// Insertion order, which by construction is always a valid post-order
    /// (every dependency appears before its dependents) — the same ordering
    /// `Query`'s referenced-files filter walks bottom-up.
    build_order: Vec<TargetName>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        DependencyGraph {
            nodes: HashMap::new(),
            edges: HashMap::new(),
            build_order: Vec::new(),
        }
    }

    /// Records one freshly built rule. The caller (`DependencyResolver`) is
    /// responsible for only calling this once every dependency of `built` has
    /// already been recorded.
    pub fn record(&mut self, built: Arc<dyn BuiltRule>) {
        let target = built.target().clone();
        if self.nodes.contains_key(&target) {
            return;
        }
        let dep_targets = built.deps().iter().map(|d| d.target().clone()).collect();
        self.edges.insert(target.clone(), dep_targets);
        self.nodes.insert(target.clone(), built);
        self.build_order.push(target);
    }

    pub fn contains(&self, target: &TargetName) -> bool {
        self.nodes.contains_key(target)
    }

    pub fn get(&self, target: &TargetName) -> Option<&Arc<dyn BuiltRule>> {
        self.nodes.get(target)
    }

    pub fn deps_of(&self, target: &TargetName) -> &[TargetName] {
        self.edges.get(target).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn nodes(&self) -> impl Iterator<Item = &TargetName> {
        self.nodes.keys()
    }

    /// Every node in the order it was resolved: dependencies always precede
    /// their dependents.
    pub fn build_order(&self) -> &[TargetName] {
        &self.build_order
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

impl Default for DependencyGraph {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::paths::BasePath;
    use crate::rule::GenericBuiltRule;
    use crate::target_name::ParseContext;
    use crate::target_name::TargetNameParser;

    fn target(s: &str) -> TargetName {
        TargetNameParser::new("BUCK")
            .parse(s, &ParseContext::for_base_path(BasePath::root()))
            .unwrap()
    }

    #[test]
    fn record_adds_node_and_edges() {
        let mut graph = DependencyGraph::new();
        let dep: Arc<dyn BuiltRule> = Arc::new(GenericBuiltRule::new(target("//foo:dep"), "generic_library", vec![], vec![]));
        graph.record(dep.clone());
        let parent: Arc<dyn BuiltRule> = Arc::new(GenericBuiltRule::new(
            target("//foo:parent"),
            "generic_library",
            vec![],
            vec![dep.clone()],
        ));
        graph.record(parent);

        assert_eq!(graph.len(), 2);
        assert_eq!(graph.deps_of(&target("//foo:parent")), &[target("//foo:dep")]);
        assert_eq!(graph.build_order(), &[target("//foo:dep"), target("//foo:parent")]);
    }

    #[test]
    fn record_is_idempotent_for_diamonds() {
        let mut graph = DependencyGraph::new();
        let dep: Arc<dyn BuiltRule> = Arc::new(GenericBuiltRule::new(target("//foo:dep"), "generic_library", vec![], vec![]));
        graph.record(dep.clone());
        graph.record(dep);
        assert_eq!(graph.len(), 1);
        assert_eq!(graph.build_order().len(), 1);
    }
}
