//! Relationship graph: declared and inferred links plus object dependencies

use crate::result::schema::{ForeignKey, ObjectType};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};

/// Importance of a node: direct references count double
pub fn importance(direct: usize, transitive: usize) -> f64 {
    2.0 * direct as f64 + transitive as f64
}

/// A foreign-key-like link inferred from naming conventions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImplicitRelationship {
    #[serde(default)]
    pub database: Option<String>,
    pub from_schema: String,
    pub from_table: String,
    pub from_column: String,
    pub to_schema: String,
    pub to_table: String,
    pub to_column: String,
    /// Confidence in `[0, 1]`
    pub confidence: f64,
    pub reason: String,
}

/// Where an object dependency was learned from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DependencySource {
    /// The engine's own dependency catalog
    Catalog,
    /// Parsed out of object definition text
    Text,
    /// Synonym base-object resolution
    Synonym,
    /// Trigger parent table
    Trigger,
}

/// One object depending on another
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectDependency {
    #[serde(default)]
    pub database: Option<String>,
    pub from_schema: String,
    pub from_name: String,
    pub from_type: ObjectType,
    pub to_schema: String,
    pub to_name: String,
    pub to_type: ObjectType,
    #[serde(default)]
    pub to_database: Option<String>,
    #[serde(default)]
    pub is_cross_database: bool,
    pub source: DependencySource,
}

impl ObjectDependency {
    /// `schema.name` of the dependent object
    pub fn from_key(&self) -> String {
        format!("{}.{}", self.from_schema, self.from_name)
    }

    /// `[database.]schema.name` of the target
    pub fn to_full_name(&self) -> String {
        match &self.to_database {
            Some(db) => format!("{}.{}.{}", db, self.to_schema, self.to_name),
            None => format!("{}.{}", self.to_schema, self.to_name),
        }
    }

    /// Case-insensitive identity used for de-duplication
    pub fn identity(&self) -> (String, String) {
        (
            self.from_key().to_lowercase(),
            self.to_full_name().to_lowercase(),
        )
    }
}

/// One schema object in the dependency graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DependencyNode {
    #[serde(default)]
    pub database: Option<String>,
    pub schema: String,
    pub name: String,
    pub object_type: ObjectType,
    /// Canonical key (`schema.name`, or `database.schema.name` once qualified)
    pub key: String,
    #[serde(default)]
    pub depends_on: BTreeSet<String>,
    #[serde(default)]
    pub referenced_by: BTreeSet<String>,
    /// Everything reachable through `referenced_by`, sorted
    #[serde(default)]
    pub transitive_impact: Vec<String>,
    #[serde(default)]
    pub importance_score: f64,
    /// Set when the object lives in a database outside this analysis
    #[serde(default)]
    pub external_database: Option<String>,
}

impl DependencyNode {
    pub fn new(schema: &str, name: &str, object_type: ObjectType) -> Self {
        Self {
            database: None,
            schema: schema.to_string(),
            name: name.to_string(),
            object_type,
            key: crate::sql_utils::object_key(None, schema, name),
            depends_on: BTreeSet::new(),
            referenced_by: BTreeSet::new(),
            transitive_impact: Vec::new(),
            importance_score: 0.0,
            external_database: None,
        }
    }

    /// Placeholder node for an object in another database
    pub fn external(database: &str, schema: &str, name: &str) -> Self {
        let mut node = Self::new(schema, name, ObjectType::External);
        node.key = crate::sql_utils::object_key(Some(database), schema, name);
        node.external_database = Some(database.to_string());
        node
    }
}

/// Output of the relationships analyzer
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RelationshipGraph {
    #[serde(default)]
    pub explicit: Vec<ForeignKey>,
    #[serde(default)]
    pub implicit: Vec<ImplicitRelationship>,
    #[serde(default)]
    pub dependencies: Vec<ObjectDependency>,
    /// Nodes sorted by importance, descending
    #[serde(default)]
    pub nodes: Vec<DependencyNode>,
}

impl RelationshipGraph {
    /// Importance descending, then key ascending
    pub fn sort_nodes(&mut self) {
        self.nodes.sort_by(|a, b| {
            b.importance_score
                .total_cmp(&a.importance_score)
                .then_with(|| a.key.cmp(&b.key))
        });
    }

    /// Find a node by key, case-insensitively
    pub fn node(&self, key: &str) -> Option<&DependencyNode> {
        self.nodes.iter().find(|n| n.key.eq_ignore_ascii_case(key))
    }

    /// Re-create `External` placeholders for dependency targets that no
    /// longer have a node, tagged with the database of the dependent.
    pub fn restore_placeholders(&mut self) {
        let present: HashSet<String> = self.nodes.iter().map(|n| n.key.to_lowercase()).collect();
        let mut restored: Vec<DependencyNode> = Vec::new();
        for node in &self.nodes {
            for target in &node.depends_on {
                let lookup = target.to_lowercase();
                if present.contains(&lookup)
                    || restored.iter().any(|r| r.key.to_lowercase() == lookup)
                {
                    continue;
                }
                let Some(dep) = self
                    .dependencies
                    .iter()
                    .find(|d| d.to_full_name().to_lowercase() == lookup)
                else {
                    continue;
                };
                let Some(db) = dep.to_database.as_deref() else {
                    continue;
                };
                let mut placeholder = DependencyNode::external(db, &dep.to_schema, &dep.to_name);
                placeholder.database = node.database.clone();
                restored.push(placeholder);
            }
        }
        self.nodes.extend(restored);
    }

    /// Collapse nodes sharing a key (case-insensitively) into one.
    ///
    /// A real object wins over an `External` placeholder; otherwise the
    /// first node is kept. Adjacency sets are unioned. Returns the number of
    /// nodes removed.
    pub fn fold_duplicate_nodes(&mut self) -> usize {
        let before = self.nodes.len();
        let mut slots: HashMap<String, usize> = HashMap::new();
        let mut folded: Vec<DependencyNode> = Vec::with_capacity(before);
        for node in std::mem::take(&mut self.nodes) {
            let lookup = node.key.to_lowercase();
            let Some(&slot) = slots.get(&lookup) else {
                slots.insert(lookup, folded.len());
                folded.push(node);
                continue;
            };
            let kept = &mut folded[slot];
            let absorbed = if kept.object_type == ObjectType::External
                && node.object_type != ObjectType::External
            {
                std::mem::replace(kept, node)
            } else {
                node
            };
            kept.depends_on.extend(absorbed.depends_on);
            kept.referenced_by.extend(absorbed.referenced_by);
        }
        self.nodes = folded;
        before - self.nodes.len()
    }

    /// Recompute `referenced_by`, transitive impact and importance from
    /// every node's `depends_on`, then re-sort.
    pub fn rebuild_impact(&mut self) {
        let index: HashMap<String, usize> = self
            .nodes
            .iter()
            .enumerate()
            .map(|(i, n)| (n.key.to_lowercase(), i))
            .collect();

        let mut incoming: Vec<BTreeSet<usize>> = vec![BTreeSet::new(); self.nodes.len()];
        for (from, node) in self.nodes.iter().enumerate() {
            for target in &node.depends_on {
                match index.get(&target.to_lowercase()) {
                    Some(&to) if to != from => {
                        incoming[to].insert(from);
                    }
                    _ => {}
                }
            }
        }

        let impacts: Vec<Vec<String>> = (0..self.nodes.len())
            .map(|start| {
                let mut visited: HashSet<usize> = HashSet::new();
                let mut queue: VecDeque<usize> = incoming[start].iter().copied().collect();
                while let Some(idx) = queue.pop_front() {
                    if visited.insert(idx) {
                        queue.extend(incoming[idx].iter().copied().filter(|n| !visited.contains(n)));
                    }
                }
                let mut keys: Vec<String> =
                    visited.into_iter().map(|i| self.nodes[i].key.clone()).collect();
                keys.sort();
                keys.dedup();
                keys
            })
            .collect();

        let referenced: Vec<BTreeSet<String>> = incoming
            .iter()
            .map(|from| from.iter().map(|&i| self.nodes[i].key.clone()).collect())
            .collect();
        for ((node, referenced_by), impact) in self.nodes.iter_mut().zip(referenced).zip(impacts) {
            node.importance_score = importance(referenced_by.len(), impact.len());
            node.referenced_by = referenced_by;
            node.transitive_impact = impact;
        }
        self.sort_nodes();
    }

    /// Find a node by its schema, name and optional database
    pub fn node_for(&self, database: Option<&str>, schema: &str, name: &str) -> Option<&DependencyNode> {
        self.nodes.iter().find(|n| {
            n.schema.eq_ignore_ascii_case(schema)
                && n.name.eq_ignore_ascii_case(name)
                && match (database, n.database.as_deref()) {
                    (Some(a), Some(b)) => a.eq_ignore_ascii_case(b),
                    _ => true,
                }
        })
    }
}
