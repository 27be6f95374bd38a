//! Merge rules for combining per-database fragments into one aggregate
//!
//! Three granularities are used:
//! - fan-out: every database's rows are stamped and appended
//! - targeted refresh: rows tagged with one database are replaced
//! - full server refresh: a section is replaced when the incoming one is non-empty

use super::indexing::IndexAnalysis;
use super::profile::TableProfile;
use super::quality::QualityIssue;
use super::relationships::RelationshipGraph;
use super::schema::SchemaInventory;
use super::usage::UsageAnalysis;
use super::{stamp_rows, AnalysisResult, DatabaseScoped, Section, SectionData};

/// Database-aware row operations over one section payload
pub trait SectionRows: Sized {
    fn is_empty(&self) -> bool;

    /// Concatenate `other`'s rows onto `self`
    fn append(&mut self, other: Self);

    /// Tag every row with `database`
    fn stamp_database(&mut self, database: &str);

    /// Keep only rows for which `keep(row.database)` holds
    fn retain_rows(&mut self, keep: &dyn Fn(Option<&str>) -> bool);

    /// Drop every row tagged with `database`
    fn remove_database(&mut self, database: &str) {
        self.retain_rows(&|db| !db.is_some_and(|d| d.eq_ignore_ascii_case(database)));
    }

    /// Copy of the rows tagged with `database`
    fn rows_for_database(&self, database: &str) -> Self
    where
        Self: Clone,
    {
        let mut copy = self.clone();
        copy.retain_rows(&|db| db.is_some_and(|d| d.eq_ignore_ascii_case(database)));
        copy
    }
}

fn retain_vec<T: DatabaseScoped>(rows: &mut Vec<T>, keep: &dyn Fn(Option<&str>) -> bool) {
    rows.retain(|r| keep(r.database()));
}

impl SectionRows for SchemaInventory {
    fn is_empty(&self) -> bool {
        self.object_count() == 0
            && self.sequences.is_empty()
            && self.user_types.is_empty()
            && self.foreign_keys.is_empty()
            && self.indexes.is_empty()
    }

    fn append(&mut self, other: Self) {
        self.tables.extend(other.tables);
        self.views.extend(other.views);
        self.procedures.extend(other.procedures);
        self.functions.extend(other.functions);
        self.triggers.extend(other.triggers);
        self.synonyms.extend(other.synonyms);
        self.sequences.extend(other.sequences);
        self.user_types.extend(other.user_types);
        self.jobs.extend(other.jobs);
        self.foreign_keys.extend(other.foreign_keys);
        self.indexes.extend(other.indexes);
    }

    fn stamp_database(&mut self, database: &str) {
        stamp_rows(&mut self.tables, database);
        stamp_rows(&mut self.views, database);
        stamp_rows(&mut self.procedures, database);
        stamp_rows(&mut self.functions, database);
        stamp_rows(&mut self.triggers, database);
        stamp_rows(&mut self.synonyms, database);
        stamp_rows(&mut self.sequences, database);
        stamp_rows(&mut self.user_types, database);
        stamp_rows(&mut self.jobs, database);
        stamp_rows(&mut self.foreign_keys, database);
        stamp_rows(&mut self.indexes, database);
    }

    fn retain_rows(&mut self, keep: &dyn Fn(Option<&str>) -> bool) {
        retain_vec(&mut self.tables, keep);
        retain_vec(&mut self.views, keep);
        retain_vec(&mut self.procedures, keep);
        retain_vec(&mut self.functions, keep);
        retain_vec(&mut self.triggers, keep);
        retain_vec(&mut self.synonyms, keep);
        retain_vec(&mut self.sequences, keep);
        retain_vec(&mut self.user_types, keep);
        retain_vec(&mut self.jobs, keep);
        retain_vec(&mut self.foreign_keys, keep);
        retain_vec(&mut self.indexes, keep);
    }
}

impl SectionRows for Vec<TableProfile> {
    fn is_empty(&self) -> bool {
        <[TableProfile]>::is_empty(self)
    }

    fn append(&mut self, other: Self) {
        self.extend(other);
    }

    fn stamp_database(&mut self, database: &str) {
        stamp_rows(self, database);
    }

    fn retain_rows(&mut self, keep: &dyn Fn(Option<&str>) -> bool) {
        retain_vec(self, keep);
    }
}

impl SectionRows for Vec<QualityIssue> {
    fn is_empty(&self) -> bool {
        <[QualityIssue]>::is_empty(self)
    }

    fn append(&mut self, other: Self) {
        self.extend(other);
    }

    fn stamp_database(&mut self, database: &str) {
        stamp_rows(self, database);
    }

    fn retain_rows(&mut self, keep: &dyn Fn(Option<&str>) -> bool) {
        retain_vec(self, keep);
    }
}

impl SectionRows for RelationshipGraph {
    fn is_empty(&self) -> bool {
        self.explicit.is_empty()
            && self.implicit.is_empty()
            && self.dependencies.is_empty()
            && self.nodes.is_empty()
    }

    fn append(&mut self, other: Self) {
        self.explicit.extend(other.explicit);
        self.implicit.extend(other.implicit);
        self.dependencies.extend(other.dependencies);
        self.nodes.extend(other.nodes);
        self.sort_nodes();
    }

    fn stamp_database(&mut self, database: &str) {
        stamp_rows(&mut self.explicit, database);
        stamp_rows(&mut self.implicit, database);
        stamp_rows(&mut self.dependencies, database);
        stamp_rows(&mut self.nodes, database);
    }

    fn retain_rows(&mut self, keep: &dyn Fn(Option<&str>) -> bool) {
        retain_vec(&mut self.explicit, keep);
        retain_vec(&mut self.implicit, keep);
        retain_vec(&mut self.dependencies, keep);
        retain_vec(&mut self.nodes, keep);
    }
}

impl SectionRows for UsageAnalysis {
    fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    fn append(&mut self, other: Self) {
        self.objects.extend(other.objects);
        for signal in other.skipped_signals {
            if !self.skipped_signals.contains(&signal) {
                self.skipped_signals.push(signal);
            }
        }
        self.sort_objects();
    }

    fn stamp_database(&mut self, database: &str) {
        stamp_rows(&mut self.objects, database);
    }

    fn retain_rows(&mut self, keep: &dyn Fn(Option<&str>) -> bool) {
        retain_vec(&mut self.objects, keep);
    }
}

impl SectionRows for IndexAnalysis {
    fn is_empty(&self) -> bool {
        self.inventory.is_empty() && self.recommendations.is_empty()
    }

    fn append(&mut self, other: Self) {
        // Telemetry is reported as available only if every contributor had it
        let had_rows = !self.inventory.is_empty();
        self.telemetry_available = if had_rows {
            self.telemetry_available && other.telemetry_available
        } else {
            other.telemetry_available
        };
        self.inventory.extend(other.inventory);
        self.recommendations.extend(other.recommendations);
    }

    fn stamp_database(&mut self, database: &str) {
        stamp_rows(&mut self.inventory, database);
        stamp_rows(&mut self.recommendations, database);
    }

    fn retain_rows(&mut self, keep: &dyn Fn(Option<&str>) -> bool) {
        retain_vec(&mut self.inventory, keep);
        retain_vec(&mut self.recommendations, keep);
    }
}

/// Dispatch a `SectionRows` call across the `SectionData` variants
macro_rules! each_variant {
    ($data:expr, $v:ident => $body:expr) => {
        match $data {
            SectionData::Schema($v) => $body,
            SectionData::Profiles($v) => $body,
            SectionData::Relationships($v) => $body,
            SectionData::Quality($v) => $body,
            SectionData::Usage($v) => $body,
            SectionData::Indexes($v) => $body,
        }
    };
}

impl SectionRows for SectionData {
    fn is_empty(&self) -> bool {
        each_variant!(self, v => SectionRows::is_empty(v))
    }

    /// Appends only when both sides hold the same section; a mismatched
    /// `other` is dropped.
    fn append(&mut self, other: Self) {
        match (self, other) {
            (SectionData::Schema(a), SectionData::Schema(b)) => a.append(b),
            (SectionData::Profiles(a), SectionData::Profiles(b)) => SectionRows::append(a, b),
            (SectionData::Relationships(a), SectionData::Relationships(b)) => a.append(b),
            (SectionData::Quality(a), SectionData::Quality(b)) => SectionRows::append(a, b),
            (SectionData::Usage(a), SectionData::Usage(b)) => a.append(b),
            (SectionData::Indexes(a), SectionData::Indexes(b)) => a.append(b),
            (a, b) => log::warn!(
                "Ignoring merge of section '{}' into '{}'",
                b.section(),
                a.section()
            ),
        }
    }

    fn stamp_database(&mut self, database: &str) {
        each_variant!(self, v => v.stamp_database(database))
    }

    fn retain_rows(&mut self, keep: &dyn Fn(Option<&str>) -> bool) {
        each_variant!(self, v => v.retain_rows(keep))
    }
}

/// Fan-out merge: stamp every section of `fragment` with `database` and
/// append it onto the aggregate's corresponding section.
pub fn append_database(aggregate: &mut AnalysisResult, mut fragment: AnalysisResult, database: &str) {
    for section in Section::ALL {
        let Some(mut incoming) = fragment.take_section(section) else {
            continue;
        };
        incoming.stamp_database(database);
        match aggregate.take_section(section) {
            Some(mut existing) => {
                existing.append(incoming);
                aggregate.put_section(existing);
            }
            None => aggregate.put_section(incoming),
        }
        aggregate.mark_completed(database, section);
    }
}

/// Targeted merge: for each of `sections` present in `fragment`, remove the
/// aggregate's rows tagged with `database` and append the fresh rows.
///
/// Applying the same fragment twice leaves the aggregate unchanged.
pub fn replace_database(
    aggregate: &mut AnalysisResult,
    mut fragment: AnalysisResult,
    database: &str,
    sections: &[Section],
) {
    for &section in sections {
        let Some(mut incoming) = fragment.take_section(section) else {
            continue;
        };
        incoming.stamp_database(database);
        match aggregate.take_section(section) {
            Some(mut existing) => {
                existing.remove_database(database);
                existing.append(incoming);
                aggregate.put_section(existing);
            }
            None => aggregate.put_section(incoming),
        }
        aggregate.mark_completed(database, section);
    }
}

/// Remove `database`'s rows from the given sections, keeping the sections,
/// and mark them as not yet run for that database.
pub fn clear_database(aggregate: &mut AnalysisResult, database: &str, sections: &[Section]) {
    for &section in sections {
        if let Some(mut existing) = aggregate.take_section(section) {
            existing.remove_database(database);
            aggregate.put_section(existing);
        }
    }
    aggregate.forget_completed(database, sections);
}

/// Seed a single-database working result from an aggregate.
///
/// A section is copied when `database` completed it, even with no rows, or
/// when it holds rows for `database`. Any other section is seen as not yet
/// run.
pub fn extract_database(aggregate: &AnalysisResult, database: &str) -> AnalysisResult {
    let mut seeded = AnalysisResult::for_database(database);
    for section in Section::ALL {
        let rows = match section {
            Section::Schema => aggregate
                .schema
                .as_ref()
                .map(|s| SectionData::Schema(s.rows_for_database(database))),
            Section::Profiles => aggregate
                .profiles
                .as_ref()
                .map(|s| SectionData::Profiles(s.rows_for_database(database))),
            Section::Relationships => aggregate
                .relationships
                .as_ref()
                .map(|s| SectionData::Relationships(s.rows_for_database(database))),
            Section::Quality => aggregate
                .quality_issues
                .as_ref()
                .map(|s| SectionData::Quality(s.rows_for_database(database))),
            Section::Usage => aggregate
                .usage
                .as_ref()
                .map(|s| SectionData::Usage(s.rows_for_database(database))),
            Section::Indexes => aggregate
                .indexes
                .as_ref()
                .map(|s| SectionData::Indexes(s.rows_for_database(database))),
        };
        if let Some(rows) =
            rows.filter(|r| aggregate.is_completed(database, section) || !r.is_empty())
        {
            seeded.put_section(rows);
        }
    }
    seeded
}

/// Full-server merge: each section of `incoming` replaces the existing one
/// when non-empty; sections the incoming run did not supply survive.
///
/// Retained sections are pruned of rows belonging to databases the fresh
/// enumeration no longer reports (neither analyzed nor failed).
pub fn replace_sections_if_nonempty(existing: &mut AnalysisResult, mut incoming: AnalysisResult) {
    let mut seen: Vec<String> = incoming.databases.clone();
    seen.extend(incoming.failed_databases.iter().map(|f| f.database.clone()));

    let is_seen = |db: &str| seen.iter().any(|s| s.eq_ignore_ascii_case(db));

    let mut completed = std::mem::take(&mut existing.completed);
    completed.retain(|db, _| is_seen(db.as_str()));
    for section in Section::ALL {
        let replaced = match incoming.take_section(section) {
            Some(fresh) if !fresh.is_empty() || !existing.has_section(section) => {
                existing.put_section(fresh);
                true
            }
            _ => {
                if let Some(mut kept) = existing.take_section(section) {
                    kept.retain_rows(&|db| db.map_or(true, is_seen));
                    existing.put_section(kept);
                }
                false
            }
        };
        if replaced {
            for done in completed.values_mut() {
                done.remove(&section);
            }
            for (db, done) in &incoming.completed {
                if done.contains(&section) {
                    completed.entry(db.clone()).or_default().insert(section);
                }
            }
        }
    }
    completed.retain(|_, done| !done.is_empty());
    existing.completed = completed;

    existing.target = incoming.target;
    existing.generated_at = incoming.generated_at;
    existing.server_mode = incoming.server_mode;
    existing.databases = incoming.databases;
    existing.failed_databases = incoming.failed_databases;
}

/// Clear externality on dependencies and nodes whose database was itself
/// analyzed, then restore unique node keys across the merged graph.
///
/// A placeholder for an object that was analyzed is folded into the real
/// node, and adjacency, transitive impact and importance are recomputed
/// over the whole aggregate. Returns the number of dependencies
/// reclassified.
pub fn reclassify_external(result: &mut AnalysisResult) -> usize {
    let analyzed: Vec<String> = result.databases.clone();
    let is_analyzed = |db: &str| analyzed.iter().any(|a| a.eq_ignore_ascii_case(db));

    let Some(graph) = result.relationships.as_mut() else {
        return 0;
    };

    graph.restore_placeholders();
    let mut changed = 0;
    for dep in graph.dependencies.iter_mut() {
        if dep.is_cross_database && dep.to_database.as_deref().is_some_and(is_analyzed) {
            dep.is_cross_database = false;
            changed += 1;
        }
    }
    for node in graph.nodes.iter_mut() {
        if node.external_database.as_deref().is_some_and(is_analyzed) {
            node.external_database = None;
        }
    }
    let folded = graph.fold_duplicate_nodes();
    if folded > 0 {
        log::debug!("Folded {} duplicate dependency node(s)", folded);
    }
    graph.rebuild_impact();
    changed
}

#[cfg(test)]
#[path = "merge_test.rs"]
mod tests;
