//! Object dependencies from catalog metadata, definition text and synonyms

use atlas_core::catalog::CatalogDependency;
use atlas_core::{DependencySource, ObjectDependency, ObjectType, SchemaInventory};
use atlas_sql::{extract_references, view_references, MultipartName, ObjectReference, SqlDialect};
use std::collections::{HashMap, HashSet};

/// Pseudo-schema that job nodes live under
pub const JOB_SCHEMA: &str = "jobs";

/// A resolved dependency target
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Target {
    pub schema: String,
    pub name: String,
    pub object_type: ObjectType,
    /// Set for objects outside the current database
    pub database: Option<String>,
}

#[derive(Debug, Clone)]
struct Entry {
    schema: String,
    name: String,
    object_type: ObjectType,
}

/// Name lookup over every object of one schema inventory
pub(crate) struct ObjectLookup {
    by_key: HashMap<String, Entry>,
    by_name: HashMap<String, Vec<Entry>>,
}

impl ObjectLookup {
    pub fn new(inventory: &SchemaInventory) -> Self {
        let mut lookup = Self {
            by_key: HashMap::new(),
            by_name: HashMap::new(),
        };
        for t in &inventory.tables {
            lookup.insert(&t.schema, &t.name, ObjectType::Table);
        }
        for v in &inventory.views {
            lookup.insert(&v.schema, &v.name, ObjectType::View);
        }
        for p in &inventory.procedures {
            lookup.insert(&p.schema, &p.name, ObjectType::Procedure);
        }
        for f in &inventory.functions {
            lookup.insert(&f.schema, &f.name, ObjectType::Function);
        }
        for t in &inventory.triggers {
            lookup.insert(&t.schema, &t.name, ObjectType::Trigger);
        }
        for s in &inventory.synonyms {
            lookup.insert(&s.schema, &s.name, ObjectType::Synonym);
        }
        lookup
    }

    fn insert(&mut self, schema: &str, name: &str, object_type: ObjectType) {
        let key = format!("{}.{}", schema, name).to_lowercase();
        if self.by_key.contains_key(&key) {
            return;
        }
        let entry = Entry {
            schema: schema.to_string(),
            name: name.to_string(),
            object_type,
        };
        self.by_name
            .entry(name.to_lowercase())
            .or_default()
            .push(entry.clone());
        self.by_key.insert(key, entry);
    }

    /// Find a local object; a bare name prefers `default_schema` when ambiguous
    pub fn find(&self, schema: Option<&str>, name: &str, default_schema: &str) -> Option<Target> {
        let entry = match schema {
            Some(schema) => self.by_key.get(&format!("{}.{}", schema, name).to_lowercase()),
            None => {
                let candidates = self.by_name.get(&name.to_lowercase())?;
                candidates
                    .iter()
                    .find(|e| e.schema.eq_ignore_ascii_case(default_schema))
                    .or_else(|| candidates.first())
            }
        }?;
        Some(Target {
            schema: entry.schema.clone(),
            name: entry.name.clone(),
            object_type: entry.object_type,
            database: None,
        })
    }

    /// Resolve a written name relative to the referencing object.
    ///
    /// `current` is the analyzed database; `context` is the database the
    /// text executes in when that differs (job steps). Names that cannot
    /// be found locally resolve to `None`.
    pub fn resolve(
        &self,
        reference: &MultipartName,
        default_schema: &str,
        current: Option<&str>,
        context: Option<&str>,
    ) -> Option<Target> {
        let is_current = |db: &str| current.is_some_and(|c| c.eq_ignore_ascii_case(db));

        if reference.len() == 4 {
            let server = reference.server().unwrap_or_default();
            let database = reference.database().unwrap_or_default();
            return Some(external(
                format!("{}.{}", server, database),
                reference.schema(),
                reference.object(),
            ));
        }

        let explicit_db = reference.database();
        let database = explicit_db.or(context).filter(|db| !is_current(*db));
        match database {
            Some(db) => Some(external(db.to_string(), reference.schema(), reference.object())),
            None => self.find(reference.schema(), reference.object(), default_schema),
        }
    }
}

fn external(database: String, schema: Option<&str>, name: &str) -> Target {
    Target {
        schema: schema.unwrap_or_default().to_string(),
        name: name.to_string(),
        object_type: ObjectType::External,
        database: Some(database),
    }
}

/// Collects dependencies in precedence order, keeping the first of each identity
pub(crate) struct DependencyCollector<'a> {
    lookup: &'a ObjectLookup,
    database: Option<&'a str>,
    seen: HashSet<(String, String)>,
    dependencies: Vec<ObjectDependency>,
}

impl<'a> DependencyCollector<'a> {
    pub fn new(lookup: &'a ObjectLookup, database: Option<&'a str>) -> Self {
        Self {
            lookup,
            database,
            seen: HashSet::new(),
            dependencies: Vec::new(),
        }
    }

    pub fn finish(self) -> Vec<ObjectDependency> {
        self.dependencies
    }

    fn push(
        &mut self,
        from: (&str, &str, ObjectType),
        to: Target,
        source: DependencySource,
    ) {
        let (from_schema, from_name, from_type) = from;
        let is_cross_database = to.database.is_some();
        if !is_cross_database
            && from_schema.eq_ignore_ascii_case(&to.schema)
            && from_name.eq_ignore_ascii_case(&to.name)
        {
            return;
        }
        let dependency = ObjectDependency {
            database: None,
            from_schema: from_schema.to_string(),
            from_name: from_name.to_string(),
            from_type,
            to_schema: to.schema,
            to_name: to.name,
            to_type: to.object_type,
            to_database: to.database,
            is_cross_database,
            source,
        };
        if self.seen.insert(dependency.identity()) {
            self.dependencies.push(dependency);
        }
    }

    /// Engine-reported dependencies, taken as exact
    pub fn add_catalog(&mut self, rows: &[CatalogDependency]) {
        for row in rows {
            let foreign = row
                .to_database
                .as_deref()
                .filter(|db| !self.database.is_some_and(|c| c.eq_ignore_ascii_case(db)));
            let target = match foreign {
                Some(db) => external(db.to_string(), Some(&row.to_schema), &row.to_name),
                None => Target {
                    schema: row.to_schema.clone(),
                    name: row.to_name.clone(),
                    object_type: row.to_type,
                    database: None,
                },
            };
            self.push(
                (&row.from_schema, &row.from_name, row.from_type),
                target,
                DependencySource::Catalog,
            );
        }
    }

    /// Resolve extracted references from one object's text
    pub fn add_references(
        &mut self,
        from: (&str, &str, ObjectType),
        references: &[ObjectReference],
        context: Option<&str>,
    ) {
        for reference in references {
            let default_schema = if from.2 == ObjectType::Job { "" } else { from.0 };
            if let Some(target) =
                self.lookup
                    .resolve(&reference.name, default_schema, self.database, context)
            {
                self.push(from, target, DependencySource::Text);
            }
        }
    }

    /// Add every text-derived edge in the inventory
    pub fn add_definitions(&mut self, inventory: &SchemaInventory, dialect: &dyn SqlDialect) {
        for view in &inventory.views {
            if let Some(sql) = &view.definition {
                let refs = view_references(dialect, sql);
                self.add_references((&view.schema, &view.name, ObjectType::View), &refs, None);
            }
        }
        let routines = inventory
            .procedures
            .iter()
            .map(|r| (r, ObjectType::Procedure))
            .chain(inventory.functions.iter().map(|r| (r, ObjectType::Function)));
        for (routine, object_type) in routines {
            if let Some(sql) = &routine.definition {
                let refs = extract_references(sql);
                self.add_references((&routine.schema, &routine.name, object_type), &refs, None);
            }
        }
        for trigger in &inventory.triggers {
            let from = (trigger.schema.as_str(), trigger.name.as_str(), ObjectType::Trigger);
            let parent = MultipartName::parse(&trigger.parent_table)
                .ok()
                .and_then(|name| self.lookup.resolve(&name, &trigger.schema, self.database, None));
            if let Some(parent) = parent {
                self.push(from, parent, DependencySource::Trigger);
            }
            if let Some(sql) = &trigger.definition {
                self.add_references(from, &extract_references(sql), None);
            }
        }
        for job in &inventory.jobs {
            for step in &job.steps {
                let refs = extract_references(&step.command);
                self.add_references(
                    (JOB_SCHEMA, &job.name, ObjectType::Job),
                    &refs,
                    step.database.as_deref(),
                );
            }
        }
    }

    /// Synonym base objects, cross-database when the base names another database
    pub fn add_synonyms(&mut self, inventory: &SchemaInventory) {
        for synonym in &inventory.synonyms {
            let Ok(base) = MultipartName::parse(&synonym.base_object) else {
                log::debug!(
                    "Unparseable synonym target {} for {}.{}",
                    synonym.base_object,
                    synonym.schema,
                    synonym.name
                );
                continue;
            };
            let target = self
                .lookup
                .resolve(&base, &synonym.schema, self.database, None);
            if let Some(target) = target {
                self.push(
                    (&synonym.schema, &synonym.name, ObjectType::Synonym),
                    target,
                    DependencySource::Synonym,
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{routine, sales_inventory, table_with};
    use atlas_core::{JobInfo, JobStep, SynonymInfo, TriggerInfo};
    use atlas_sql::dialect_for_engine;

    fn collect(inventory: &SchemaInventory, database: Option<&str>) -> Vec<ObjectDependency> {
        let lookup = ObjectLookup::new(inventory);
        let dialect = dialect_for_engine("mssql");
        let mut collector = DependencyCollector::new(&lookup, database);
        collector.add_definitions(inventory, dialect.as_ref());
        collector.add_synonyms(inventory);
        collector.finish()
    }

    fn edge<'a>(deps: &'a [ObjectDependency], from: &str, to: &str) -> Option<&'a ObjectDependency> {
        deps.iter()
            .find(|d| d.from_name == from && d.to_name == to)
    }

    #[test]
    fn test_view_and_procedure_references() {
        let deps = collect(&sales_inventory(), Some("Sales"));
        let customers = edge(&deps, "vCustomerOrders", "Customers").unwrap();
        assert_eq!(customers.to_type, ObjectType::Table);
        assert!(!customers.is_cross_database);
        assert!(edge(&deps, "vCustomerOrders", "Orders").is_some());

        let view = edge(&deps, "usp_Report", "vCustomerOrders").unwrap();
        assert_eq!(view.to_type, ObjectType::View);
        let exec = edge(&deps, "usp_Report", "usp_Audit").unwrap();
        assert_eq!(exec.to_type, ObjectType::Procedure);
        assert!(deps.iter().all(|d| d.source == DependencySource::Text));
    }

    #[test]
    fn test_three_and_four_part_names() {
        let mut inventory = sales_inventory();
        inventory.procedures.push(routine(
            "dbo",
            "usp_Sync",
            "CREATE PROCEDURE dbo.usp_Sync AS
             INSERT INTO x SELECT * FROM Sales.dbo.Orders;
             SELECT * FROM Shared.dbo.Currencies;
             SELECT * FROM [LINKED].Warehouse.dbo.Stock;",
        ));
        let deps = collect(&inventory, Some("Sales"));

        let local = edge(&deps, "usp_Sync", "Orders").unwrap();
        assert!(!local.is_cross_database);
        assert_eq!(local.to_database, None);

        let shared = edge(&deps, "usp_Sync", "Currencies").unwrap();
        assert!(shared.is_cross_database);
        assert_eq!(shared.to_type, ObjectType::External);
        assert_eq!(shared.to_database.as_deref(), Some("Shared"));

        let linked = edge(&deps, "usp_Sync", "Stock").unwrap();
        assert!(linked.is_cross_database);
        assert_eq!(linked.to_database.as_deref(), Some("LINKED.Warehouse"));
    }

    #[test]
    fn test_unknown_and_self_references_skipped() {
        let inventory = SchemaInventory {
            tables: vec![table_with("dbo", "Log", &[("Id", "int", true)])],
            procedures: vec![routine(
                "dbo",
                "usp_Loop",
                "CREATE PROCEDURE dbo.usp_Loop AS EXEC dbo.usp_Loop; SELECT * FROM sys.objects; SELECT * FROM Log",
            )],
            ..Default::default()
        };
        let deps = collect(&inventory, Some("Sales"));
        assert_eq!(deps.len(), 1);
        assert_eq!(deps[0].to_name, "Log");
    }

    #[test]
    fn test_bare_name_prefers_referencing_schema() {
        let inventory = SchemaInventory {
            tables: vec![
                table_with("audit", "Events", &[("Id", "int", true)]),
                table_with("dbo", "Events", &[("Id", "int", true)]),
            ],
            procedures: vec![routine("audit", "usp_Read", "SELECT * FROM Events")],
            ..Default::default()
        };
        let deps = collect(&inventory, Some("Sales"));
        assert_eq!(deps[0].to_schema, "audit");
    }

    #[test]
    fn test_triggers_jobs_and_synonyms() {
        let mut inventory = sales_inventory();
        inventory.triggers.push(TriggerInfo {
            database: None,
            schema: "dbo".into(),
            name: "trg_Orders".into(),
            parent_table: "dbo.Orders".into(),
            definition: Some("CREATE TRIGGER trg_Orders ON dbo.Orders AFTER INSERT AS EXEC dbo.usp_Audit".into()),
        });
        inventory.jobs.push(JobInfo {
            database: None,
            name: "Nightly".into(),
            enabled: true,
            steps: vec![
                JobStep {
                    name: "report".into(),
                    database: Some("Sales".into()),
                    command: "EXEC dbo.usp_Report".into(),
                },
                JobStep {
                    name: "purge".into(),
                    database: Some("Archive".into()),
                    command: "DELETE x FROM dbo.OldOrders x".into(),
                },
            ],
        });
        inventory.synonyms.push(SynonymInfo {
            database: None,
            schema: "dbo".into(),
            name: "RemoteRates".into(),
            base_object: "[Shared].[dbo].[Rates]".into(),
        });
        inventory.synonyms.push(SynonymInfo {
            database: None,
            schema: "dbo".into(),
            name: "Clients".into(),
            base_object: "dbo.Customers".into(),
        });
        let deps = collect(&inventory, Some("Sales"));

        let parent = edge(&deps, "trg_Orders", "Orders").unwrap();
        assert_eq!(parent.source, DependencySource::Trigger);
        assert!(edge(&deps, "trg_Orders", "usp_Audit").is_some());

        let report = edge(&deps, "Nightly", "usp_Report").unwrap();
        assert_eq!(report.from_schema, JOB_SCHEMA);
        assert!(!report.is_cross_database);
        let purge = edge(&deps, "Nightly", "OldOrders").unwrap();
        assert_eq!(purge.to_database.as_deref(), Some("Archive"));

        let remote = edge(&deps, "RemoteRates", "Rates").unwrap();
        assert_eq!(remote.source, DependencySource::Synonym);
        assert!(remote.is_cross_database);
        let local = edge(&deps, "Clients", "Customers").unwrap();
        assert!(!local.is_cross_database);
        assert_eq!(local.to_type, ObjectType::Table);
    }

    #[test]
    fn test_catalog_rows_take_precedence() {
        let inventory = sales_inventory();
        let lookup = ObjectLookup::new(&inventory);
        let mut collector = DependencyCollector::new(&lookup, Some("Sales"));
        collector.add_catalog(&[
            CatalogDependency {
                from_schema: "dbo".into(),
                from_name: "vCustomerOrders".into(),
                from_type: ObjectType::View,
                to_schema: "dbo".into(),
                to_name: "Customers".into(),
                to_type: ObjectType::Table,
                to_database: None,
            },
            CatalogDependency {
                from_schema: "dbo".into(),
                from_name: "usp_Report".into(),
                from_type: ObjectType::Procedure,
                to_schema: "dbo".into(),
                to_name: "Rates".into(),
                to_type: ObjectType::Table,
                to_database: Some("Shared".into()),
            },
        ]);
        let dialect = dialect_for_engine("mssql");
        collector.add_definitions(&inventory, dialect.as_ref());
        let deps = collector.finish();

        let customers: Vec<_> = deps
            .iter()
            .filter(|d| d.from_name == "vCustomerOrders" && d.to_name == "Customers")
            .collect();
        assert_eq!(customers.len(), 1);
        assert_eq!(customers[0].source, DependencySource::Catalog);

        let rates = edge(&deps, "usp_Report", "Rates").unwrap();
        assert!(rates.is_cross_database);
        assert_eq!(rates.to_type, ObjectType::External);
    }
}
