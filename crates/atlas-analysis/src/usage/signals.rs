//! Built-in usage signals

use crate::context::AnalysisContext;
use crate::error::AnalyzeResult;
use async_trait::async_trait;
use atlas_core::ObjectType;
use regex::Regex;
use std::collections::HashMap;
use std::sync::OnceLock;

/// One weighted piece of evidence about an object's use
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub schema: String,
    pub name: String,
    pub object_type: ObjectType,
    /// In `[-1, 1]`; positive means "in use"
    pub weight: f64,
    pub evidence: String,
}

impl Observation {
    pub fn new(
        schema: &str,
        name: &str,
        object_type: ObjectType,
        weight: f64,
        evidence: impl Into<String>,
    ) -> Self {
        Self {
            schema: schema.to_string(),
            name: name.to_string(),
            object_type,
            weight: weight.clamp(-1.0, 1.0),
            evidence: evidence.into(),
        }
    }
}

/// An independent source of usage observations
#[async_trait]
pub trait UsageSignal: Send + Sync {
    fn name(&self) -> &'static str;

    async fn evaluate(&self, ctx: &AnalysisContext<'_>) -> AnalyzeResult<Vec<Observation>>;
}

/// Table read/write and routine execution counters from the engine
pub struct TelemetrySignal;

#[async_trait]
impl UsageSignal for TelemetrySignal {
    fn name(&self) -> &'static str {
        "telemetry"
    }

    async fn evaluate(&self, ctx: &AnalysisContext<'_>) -> AnalyzeResult<Vec<Observation>> {
        let provider = ctx.provider();
        let tables = provider.table_usage_stats().await?;
        let routines = provider.routine_usage_stats().await?;

        let mut observations = Vec::with_capacity(tables.len() + routines.len());
        for t in tables {
            let (weight, evidence) = if t.reads > 0 {
                (1.0, format!("{} reads since last restart", t.reads))
            } else if t.writes > 0 {
                (-0.5, format!("written {} times but never read", t.writes))
            } else {
                (-1.0, "no reads or writes recorded".to_string())
            };
            observations.push(Observation::new(
                &t.schema,
                &t.table,
                ObjectType::Table,
                weight,
                evidence,
            ));
        }
        for r in routines {
            let (weight, evidence) = if r.execution_count > 0 {
                (1.0, format!("executed {} times", r.execution_count))
            } else {
                (-1.0, "never executed".to_string())
            };
            observations.push(Observation::new(
                &r.schema,
                &r.name,
                r.object_type,
                weight,
                evidence,
            ));
        }
        Ok(observations)
    }
}

/// Empty tables lean unused; populated ones lean slightly active
pub struct RowCountSignal;

#[async_trait]
impl UsageSignal for RowCountSignal {
    fn name(&self) -> &'static str {
        "row_count"
    }

    async fn evaluate(&self, ctx: &AnalysisContext<'_>) -> AnalyzeResult<Vec<Observation>> {
        // Profiles carry counts already; fall back to asking the provider.
        let counts: Vec<(String, String, i64)> = match &ctx.prior().profiles {
            Some(profiles) => profiles
                .iter()
                .filter_map(|p| p.row_count.map(|n| (p.schema.clone(), p.table.clone(), n)))
                .collect(),
            None => ctx
                .provider()
                .table_row_counts()
                .await?
                .into_iter()
                .map(|c| (c.schema, c.table, c.row_count))
                .collect(),
        };

        Ok(counts
            .into_iter()
            .map(|(schema, table, rows)| {
                if rows == 0 {
                    Observation::new(&schema, &table, ObjectType::Table, -0.5, "table is empty")
                } else {
                    Observation::new(
                        &schema,
                        &table,
                        ObjectType::Table,
                        0.1,
                        format!("{} rows", rows),
                    )
                }
            })
            .collect())
    }
}

/// Objects referenced by others are in use; isolated objects lean unused
pub struct OrphanSignal;

#[async_trait]
impl UsageSignal for OrphanSignal {
    fn name(&self) -> &'static str {
        "orphan"
    }

    async fn evaluate(&self, ctx: &AnalysisContext<'_>) -> AnalyzeResult<Vec<Observation>> {
        let Some(graph) = ctx.relationships() else {
            return Ok(Vec::new());
        };
        let mut observations = Vec::new();
        for node in graph
            .nodes
            .iter()
            .filter(|n| n.object_type != ObjectType::External)
        {
            if !node.referenced_by.is_empty() {
                observations.push(Observation::new(
                    &node.schema,
                    &node.name,
                    node.object_type,
                    0.5,
                    format!("referenced by {} objects", node.referenced_by.len()),
                ));
            } else if node.depends_on.is_empty() {
                observations.push(Observation::new(
                    &node.schema,
                    &node.name,
                    node.object_type,
                    -0.3,
                    "no dependencies in either direction",
                ));
            }
        }
        Ok(observations)
    }
}

fn abandoned_name_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r"(?i)(^|[_\-.])(bak|backup|old|tmp|temp|test|copy|archive)([_\-.]|\d|$)|[_\-]?(19|20)\d{2}[_\-]?(0[1-9]|1[0-2])([_\-]?\d{2})?$",
        )
        .expect("valid regex literal")
    })
}

/// Whether a name looks like a backup, scratch or dated copy
pub fn looks_abandoned(name: &str) -> bool {
    abandoned_name_pattern().is_match(name)
}

/// Names like `Orders_bak` or `Sales_20230115` lean unused
pub struct NamingSignal;

#[async_trait]
impl UsageSignal for NamingSignal {
    fn name(&self) -> &'static str {
        "naming"
    }

    async fn evaluate(&self, ctx: &AnalysisContext<'_>) -> AnalyzeResult<Vec<Observation>> {
        let Some(inventory) = ctx.schema() else {
            return Ok(Vec::new());
        };
        let objects = inventory
            .tables
            .iter()
            .map(|t| (&t.schema, &t.name, ObjectType::Table))
            .chain(inventory.views.iter().map(|v| (&v.schema, &v.name, ObjectType::View)))
            .chain(
                inventory
                    .procedures
                    .iter()
                    .map(|r| (&r.schema, &r.name, ObjectType::Procedure)),
            )
            .chain(
                inventory
                    .functions
                    .iter()
                    .map(|r| (&r.schema, &r.name, ObjectType::Function)),
            );

        Ok(objects
            .filter(|(_, name, _)| looks_abandoned(name))
            .map(|(schema, name, object_type)| {
                Observation::new(schema, name, object_type, -0.5, "name suggests a backup or scratch copy")
            })
            .collect())
    }
}

/// Running mean of observations for one object
#[derive(Debug, Default)]
pub(crate) struct Tally {
    pub sum: f64,
    pub count: usize,
    pub evidence: Vec<String>,
}

/// Group observations case-insensitively by `(schema.name, type)`
pub(crate) fn tally(
    observations: impl IntoIterator<Item = (&'static str, Observation)>,
) -> HashMap<(String, ObjectType), Tally> {
    let mut groups: HashMap<(String, ObjectType), Tally> = HashMap::new();
    for (signal, obs) in observations {
        let key = (
            format!("{}.{}", obs.schema, obs.name).to_lowercase(),
            obs.object_type,
        );
        let entry = groups.entry(key).or_default();
        entry.sum += obs.weight;
        entry.count += 1;
        entry.evidence.push(format!("{}: {}", signal, obs.evidence));
    }
    groups
}
