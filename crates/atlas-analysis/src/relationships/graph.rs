//! Index-based dependency graph over schema objects
//!
//! Edges point from the dependent object to the object it depends on, so
//! a node's `referenced_by` set is its incoming neighbourhood.

use atlas_core::result::relationships::importance;
use atlas_core::{DependencyNode, ForeignKey, ObjectDependency, ObjectType, RelationshipGraph};
use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;
use std::collections::{HashMap, HashSet, VecDeque};

/// Arena of dependency nodes keyed case-insensitively by canonical key
#[derive(Default)]
pub struct ObjectGraph {
    graph: DiGraph<DependencyNode, ()>,
    index: HashMap<String, NodeIndex>,
}

impl ObjectGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    /// Add a node unless its key already exists; returns its index either way
    pub fn add_node(&mut self, node: DependencyNode) -> NodeIndex {
        let lookup = node.key.to_lowercase();
        if let Some(&idx) = self.index.get(&lookup) {
            return idx;
        }
        let idx = self.graph.add_node(node);
        self.index.insert(lookup, idx);
        idx
    }

    pub fn find(&self, key: &str) -> Option<NodeIndex> {
        self.index.get(&key.to_lowercase()).copied()
    }

    /// Record that `from` depends on `to`; self edges are ignored
    pub fn add_edge(&mut self, from: NodeIndex, to: NodeIndex) {
        if from != to {
            self.graph.update_edge(from, to, ());
        }
    }

    /// Declared foreign keys as table-to-table edges
    pub fn add_foreign_keys(&mut self, foreign_keys: &[ForeignKey]) {
        for fk in foreign_keys {
            let from = self.add_node(DependencyNode::new(
                &fk.from_schema,
                &fk.from_table,
                ObjectType::Table,
            ));
            let to = self.add_node(DependencyNode::new(
                &fk.to_schema,
                &fk.to_table,
                ObjectType::Table,
            ));
            self.add_edge(from, to);
        }
    }

    /// Object dependencies; cross-database targets become `External` nodes
    pub fn add_dependencies(&mut self, dependencies: &[ObjectDependency]) {
        for dep in dependencies {
            let from = self.add_node(DependencyNode::new(
                &dep.from_schema,
                &dep.from_name,
                dep.from_type,
            ));
            let target = match (&dep.to_database, dep.is_cross_database) {
                (Some(db), true) => DependencyNode::external(db, &dep.to_schema, &dep.to_name),
                _ => DependencyNode::new(&dep.to_schema, &dep.to_name, dep.to_type),
            };
            let to = self.add_node(target);
            self.add_edge(from, to);
        }
    }

    /// Every node reachable from `start` over `referenced_by` edges.
    ///
    /// Each node is visited once; `start` itself is included only when a
    /// cycle leads back to it.
    pub fn transitive_impact(&self, start: NodeIndex) -> Vec<String> {
        let mut visited: HashSet<NodeIndex> = HashSet::new();
        let mut queue: VecDeque<NodeIndex> = VecDeque::new();
        queue.extend(self.graph.neighbors_directed(start, Direction::Incoming));

        while let Some(idx) = queue.pop_front() {
            if !visited.insert(idx) {
                continue;
            }
            for next in self.graph.neighbors_directed(idx, Direction::Incoming) {
                if !visited.contains(&next) {
                    queue.push_back(next);
                }
            }
        }

        let mut keys: Vec<String> = visited
            .into_iter()
            .map(|idx| self.graph[idx].key.clone())
            .collect();
        keys.sort();
        keys.dedup();
        keys
    }

    /// Fill adjacency, impact and importance on every node and emit them
    /// sorted by importance.
    pub fn into_nodes(self) -> Vec<DependencyNode> {
        let impacts: Vec<Vec<String>> = self
            .graph
            .node_indices()
            .map(|idx| self.transitive_impact(idx))
            .collect();

        let mut nodes = Vec::with_capacity(self.graph.node_count());
        for (idx, impact) in self.graph.node_indices().zip(impacts) {
            let mut node = self.graph[idx].clone();
            node.depends_on = self
                .graph
                .neighbors_directed(idx, Direction::Outgoing)
                .map(|n| self.graph[n].key.clone())
                .collect();
            node.referenced_by = self
                .graph
                .neighbors_directed(idx, Direction::Incoming)
                .map(|n| self.graph[n].key.clone())
                .collect();
            node.importance_score = importance(node.referenced_by.len(), impact.len());
            node.transitive_impact = impact;
            nodes.push(node);
        }

        let mut graph = RelationshipGraph {
            nodes,
            ..Default::default()
        };
        graph.sort_nodes();
        graph.nodes
    }
}

/// Groups of nodes that depend on each other in a cycle, each sorted by key
pub fn dependency_cycles(graph: &RelationshipGraph) -> Vec<Vec<String>> {
    let mut arena: DiGraph<&str, ()> = DiGraph::new();
    let mut index: HashMap<String, NodeIndex> = HashMap::new();
    for node in &graph.nodes {
        let idx = arena.add_node(node.key.as_str());
        index.insert(node.key.to_lowercase(), idx);
    }
    for node in &graph.nodes {
        let Some(&from) = index.get(&node.key.to_lowercase()) else {
            continue;
        };
        for target in &node.depends_on {
            if let Some(&to) = index.get(&target.to_lowercase()) {
                arena.update_edge(from, to, ());
            }
        }
    }

    let mut cycles: Vec<Vec<String>> = tarjan_scc(&arena)
        .into_iter()
        .filter(|scc| scc.len() > 1)
        .map(|scc| {
            let mut keys: Vec<String> = scc.iter().map(|&i| arena[i].to_string()).collect();
            keys.sort();
            keys
        })
        .collect();
    cycles.sort();
    cycles
}

#[cfg(test)]
mod tests {
    use super::*;
    use atlas_core::DependencySource;

    fn dep(from: &str, to: &str) -> ObjectDependency {
        ObjectDependency {
            database: None,
            from_schema: "dbo".into(),
            from_name: from.into(),
            from_type: ObjectType::View,
            to_schema: "dbo".into(),
            to_name: to.into(),
            to_type: ObjectType::View,
            to_database: None,
            is_cross_database: false,
            source: DependencySource::Text,
        }
    }

    fn build(deps: &[ObjectDependency]) -> Vec<DependencyNode> {
        let mut graph = ObjectGraph::new();
        graph.add_dependencies(deps);
        graph.into_nodes()
    }

    fn node<'a>(nodes: &'a [DependencyNode], key: &str) -> &'a DependencyNode {
        nodes.iter().find(|n| n.key == key).unwrap()
    }

    #[test]
    fn test_chain_impact_and_importance() {
        // c -> b -> a
        let nodes = build(&[dep("b", "a"), dep("c", "b")]);
        let a = node(&nodes, "dbo.a");
        assert_eq!(a.transitive_impact, vec!["dbo.b", "dbo.c"]);
        assert_eq!(a.importance_score, 4.0);
        assert_eq!(nodes[0].key, "dbo.a");
        assert!(node(&nodes, "dbo.c").transitive_impact.is_empty());
    }

    #[test]
    fn test_cycle_terminates_and_includes_start() {
        let nodes = build(&[dep("a", "b"), dep("b", "a"), dep("c", "a")]);
        let a = node(&nodes, "dbo.a");
        assert_eq!(a.transitive_impact, vec!["dbo.a", "dbo.b", "dbo.c"]);
    }

    #[test]
    fn test_duplicate_edges_case_insensitive() {
        let mut upper = dep("B", "A");
        upper.from_schema = "DBO".into();
        let nodes = build(&[dep("b", "a"), upper, dep("a", "a")]);
        assert_eq!(nodes.len(), 2);
        let a = node(&nodes, "dbo.a");
        assert_eq!(a.referenced_by.len(), 1);
        assert!(a.depends_on.is_empty());
    }

    #[test]
    fn test_external_target_node() {
        let mut remote = dep("v", "Rates");
        remote.to_database = Some("Shared".into());
        remote.is_cross_database = true;
        remote.to_type = ObjectType::External;
        let nodes = build(&[remote]);
        let ext = node(&nodes, "Shared.dbo.Rates");
        assert_eq!(ext.object_type, ObjectType::External);
        assert_eq!(ext.external_database.as_deref(), Some("Shared"));
        assert!(node(&nodes, "dbo.v").depends_on.contains("Shared.dbo.Rates"));
    }

    #[test]
    fn test_dependency_cycles() {
        let nodes = build(&[dep("a", "b"), dep("b", "a"), dep("c", "a")]);
        let graph = RelationshipGraph {
            nodes,
            ..Default::default()
        };
        assert_eq!(dependency_cycles(&graph), vec![vec!["dbo.a", "dbo.b"]]);
    }
}
