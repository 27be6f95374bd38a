//! Analyzer dependency DAG and execution-order resolution
//!
//! The dependency table is plain data (`analyzer -> [analyzers it needs]`);
//! the scheduler never branches on analyzer names itself.

use crate::error::{CoreError, CoreResult};
use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use std::collections::{BTreeMap, HashMap, HashSet};

/// Built-in analyzer names
pub const SCHEMA: &str = "schema";
pub const PROFILING: &str = "profiling";
pub const RELATIONSHIPS: &str = "relationships";
pub const QUALITY: &str = "quality";
pub const USAGE: &str = "usage";
pub const INDEXING: &str = "indexing";

/// The built-in dependency table.
pub fn default_dependencies() -> BTreeMap<String, Vec<String>> {
    let table: [(&str, &[&str]); 6] = [
        (SCHEMA, &[]),
        (PROFILING, &[SCHEMA]),
        (RELATIONSHIPS, &[SCHEMA]),
        (QUALITY, &[SCHEMA, RELATIONSHIPS]),
        (USAGE, &[SCHEMA, PROFILING, RELATIONSHIPS]),
        (INDEXING, &[SCHEMA]),
    ];
    table
        .iter()
        .map(|(name, deps)| {
            (
                name.to_string(),
                deps.iter().map(|d| d.to_string()).collect(),
            )
        })
        .collect()
}

/// A directed acyclic graph of analyzer dependencies
#[derive(Debug, Clone)]
pub struct AnalyzerDag {
    /// Edges run from dependency to dependent
    graph: DiGraph<String, ()>,

    /// Map from analyzer name to node index
    node_map: HashMap<String, NodeIndex>,

    /// Declared dependencies, in declaration order
    dependencies: BTreeMap<String, Vec<String>>,
}

impl AnalyzerDag {
    /// Create a new empty DAG
    pub fn new() -> Self {
        Self {
            graph: DiGraph::new(),
            node_map: HashMap::new(),
            dependencies: BTreeMap::new(),
        }
    }

    /// Build the DAG from the built-in dependency table
    pub fn with_defaults() -> Self {
        // The built-in table is acyclic and closed over its own names.
        match Self::build(&default_dependencies()) {
            Ok(dag) => dag,
            Err(e) => unreachable!("built-in analyzer table is invalid: {e}"),
        }
    }

    /// Add an analyzer to the DAG
    pub fn add_analyzer(&mut self, name: &str) -> CoreResult<NodeIndex> {
        if let Some(&idx) = self.node_map.get(name) {
            return Ok(idx);
        }
        if name.is_empty() {
            return Err(CoreError::EmptyName {
                context: "analyzer name in DAG".into(),
            });
        }
        let idx = self.graph.add_node(name.to_string());
        self.node_map.insert(name.to_string(), idx);
        self.dependencies.entry(name.to_string()).or_default();
        Ok(idx)
    }

    /// Add a dependency edge (`from` depends on `to`)
    pub fn add_dependency(&mut self, from: &str, to: &str) -> CoreResult<()> {
        let from_idx = self.add_analyzer(from)?;
        let to_idx = self.add_analyzer(to)?;
        // Edge goes from dependency to dependent so toposort yields dependencies first
        self.graph.update_edge(to_idx, from_idx, ());
        let deps = self.dependencies.entry(from.to_string()).or_default();
        if !deps.iter().any(|d| d == to) {
            deps.push(to.to_string());
        }
        Ok(())
    }

    /// Build the DAG from a map of analyzer name -> dependencies
    ///
    /// Every dependency must itself be a key of the map.
    pub fn build(dependencies: &BTreeMap<String, Vec<String>>) -> CoreResult<Self> {
        let mut dag = Self::new();

        for name in dependencies.keys() {
            dag.add_analyzer(name)?;
        }

        for (name, deps) in dependencies {
            for dep in deps {
                if !dependencies.contains_key(dep) {
                    return Err(CoreError::UnknownAnalyzer { name: dep.clone() });
                }
                dag.add_dependency(name, dep)?;
            }
        }

        dag.validate()?;

        Ok(dag)
    }

    /// Validate the DAG has no cycles
    pub fn validate(&self) -> CoreResult<()> {
        match toposort(&self.graph, None) {
            Ok(_) => Ok(()),
            Err(cycle) => Err(CoreError::CircularDependency {
                cycle: self.find_cycle_path(cycle.node_id()),
            }),
        }
    }

    /// Find a cycle path starting from a node for error reporting
    fn find_cycle_path(&self, start: NodeIndex) -> String {
        let mut path: Vec<String> = vec![self.graph[start].clone()];
        let mut current = start;
        let mut visited = HashSet::new();
        visited.insert(current);

        while let Some(edge) = self.graph.edges(current).next() {
            let target = edge.target();
            path.push(self.graph[target].clone());

            if target == start || visited.contains(&target) {
                break;
            }

            visited.insert(target);
            current = target;
        }

        path.join(" -> ")
    }

    /// Get analyzers in topological order (dependencies first)
    pub fn topological_order(&self) -> CoreResult<Vec<String>> {
        match toposort(&self.graph, None) {
            Ok(indices) => Ok(indices
                .into_iter()
                .map(|idx| self.graph[idx].clone())
                .collect()),
            Err(cycle) => Err(CoreError::CircularDependency {
                cycle: self.find_cycle_path(cycle.node_id()),
            }),
        }
    }

    /// Check if an analyzer exists in the DAG
    pub fn contains(&self, name: &str) -> bool {
        self.node_map.contains_key(name)
    }

    /// All analyzer names, sorted
    pub fn analyzers(&self) -> Vec<String> {
        self.dependencies.keys().cloned().collect()
    }

    /// Direct dependencies of an analyzer, in declaration order
    pub fn dependencies(&self, name: &str) -> &[String] {
        self.dependencies
            .get(name)
            .map(|d| d.as_slice())
            .unwrap_or(&[])
    }

    /// Direct dependents of an analyzer
    pub fn dependents(&self, name: &str) -> Vec<String> {
        let Some(&idx) = self.node_map.get(name) else {
            return Vec::new();
        };
        let mut out: Vec<String> = self
            .graph
            .edges_directed(idx, petgraph::Direction::Outgoing)
            .map(|e| self.graph[e.target()].clone())
            .collect();
        out.sort();
        out
    }

    /// The inverse dependency map used for invalidation
    pub fn dependents_map(&self) -> BTreeMap<String, Vec<String>> {
        self.dependencies
            .keys()
            .map(|name| (name.clone(), self.dependents(name)))
            .collect()
    }

    /// All analyzers that transitively depend on `name`, sorted
    pub fn transitive_dependents(&self, name: &str) -> Vec<String> {
        let Some(&start) = self.node_map.get(name) else {
            return Vec::new();
        };
        let mut visited = HashSet::new();
        let mut stack = vec![start];
        while let Some(idx) = stack.pop() {
            for edge in self
                .graph
                .edges_directed(idx, petgraph::Direction::Outgoing)
            {
                if visited.insert(edge.target()) {
                    stack.push(edge.target());
                }
            }
        }
        let mut out: Vec<String> = visited
            .into_iter()
            .map(|idx| self.graph[idx].clone())
            .collect();
        out.sort();
        out
    }

    /// `name` plus everything that transitively depends on it
    pub fn invalidation_set(&self, name: &str) -> Vec<String> {
        let mut set = vec![name.to_string()];
        set.extend(self.transitive_dependents(name));
        set
    }

    /// Resolve the execution list for `name`.
    ///
    /// Depth-first: unsatisfied dependencies are resolved before their
    /// dependents, analyzers already queued are skipped, and `name` is
    /// appended only when it is not satisfied itself. An empty list means
    /// everything is up to date.
    pub fn resolve<F>(&self, name: &str, is_satisfied: F) -> CoreResult<Vec<String>>
    where
        F: Fn(&str) -> bool,
    {
        if !self.contains(name) {
            return Err(CoreError::UnknownAnalyzer {
                name: name.to_string(),
            });
        }
        let mut order = Vec::new();
        let mut queued = HashSet::new();
        self.resolve_into(name, &is_satisfied, &mut order, &mut queued);
        Ok(order)
    }

    fn resolve_into<F>(
        &self,
        name: &str,
        is_satisfied: &F,
        order: &mut Vec<String>,
        queued: &mut HashSet<String>,
    ) where
        F: Fn(&str) -> bool,
    {
        for dep in self.dependencies(name) {
            if !is_satisfied(dep) && !queued.contains(dep) {
                self.resolve_into(dep, is_satisfied, order, queued);
            }
        }
        if !is_satisfied(name) && queued.insert(name.to_string()) {
            order.push(name.to_string());
        }
    }

    /// Full execution plan for a set of analyzers starting from nothing,
    /// dependencies first, each analyzer once.
    pub fn execution_plan<S: AsRef<str>>(&self, names: &[S]) -> CoreResult<Vec<String>> {
        let mut plan: Vec<String> = Vec::new();
        for name in names {
            for step in self.resolve(name.as_ref(), |_| false)? {
                if !plan.contains(&step) {
                    plan.push(step);
                }
            }
        }
        Ok(plan)
    }
}

impl Default for AnalyzerDag {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "dag_test.rs"]
mod tests;
