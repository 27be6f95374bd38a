use super::*;

fn position(order: &[String], name: &str) -> usize {
    order.iter().position(|n| n == name).unwrap()
}

#[test]
fn test_default_table_builds() {
    let dag = AnalyzerDag::with_defaults();
    assert_eq!(
        dag.analyzers(),
        vec![INDEXING, PROFILING, QUALITY, RELATIONSHIPS, SCHEMA, USAGE]
    );
    assert_eq!(dag.dependencies(USAGE), &[SCHEMA, PROFILING, RELATIONSHIPS]);
}

#[test]
fn test_resolve_with_nothing_satisfied_orders_dependencies_first() {
    let dag = AnalyzerDag::with_defaults();
    for name in dag.analyzers() {
        let order = dag.resolve(&name, |_| false).unwrap();
        assert_eq!(order.last().unwrap(), &name);
        let target = position(&order, &name);
        for dep in dag.dependencies(&name) {
            assert!(position(&order, dep) < target, "{dep} must precede {name}");
        }
    }
}

#[test]
fn test_resolve_usage_from_scratch() {
    let dag = AnalyzerDag::with_defaults();
    let order = dag.resolve(USAGE, |_| false).unwrap();
    assert_eq!(order, vec![SCHEMA, PROFILING, RELATIONSHIPS, USAGE]);
}

#[test]
fn test_resolve_skips_satisfied_dependencies() {
    let dag = AnalyzerDag::with_defaults();
    let order = dag
        .resolve(QUALITY, |n| n == SCHEMA || n == RELATIONSHIPS)
        .unwrap();
    assert_eq!(order, vec![QUALITY]);
}

#[test]
fn test_resolve_up_to_date_is_empty() {
    let dag = AnalyzerDag::with_defaults();
    let order = dag.resolve(INDEXING, |_| true).unwrap();
    assert!(order.is_empty());
}

#[test]
fn test_resolve_unknown_analyzer() {
    let dag = AnalyzerDag::with_defaults();
    let err = dag.resolve("lineage", |_| false).unwrap_err();
    assert!(matches!(err, CoreError::UnknownAnalyzer { name } if name == "lineage"));
}

#[test]
fn test_invalidation_set_for_schema_covers_everything() {
    let dag = AnalyzerDag::with_defaults();
    let mut set = dag.invalidation_set(SCHEMA);
    set.sort();
    assert_eq!(
        set,
        vec![INDEXING, PROFILING, QUALITY, RELATIONSHIPS, SCHEMA, USAGE]
    );
}

#[test]
fn test_invalidation_set_for_relationships() {
    let dag = AnalyzerDag::with_defaults();
    assert_eq!(
        dag.invalidation_set(RELATIONSHIPS),
        vec![RELATIONSHIPS, QUALITY, USAGE]
    );
}

#[test]
fn test_leaf_has_no_dependents() {
    let dag = AnalyzerDag::with_defaults();
    assert!(dag.transitive_dependents(USAGE).is_empty());
    assert_eq!(dag.dependents(PROFILING), vec![USAGE]);
}

#[test]
fn test_dependents_map_is_inverse() {
    let dag = AnalyzerDag::with_defaults();
    let inverse = dag.dependents_map();
    assert_eq!(
        inverse[SCHEMA],
        vec![INDEXING, PROFILING, QUALITY, RELATIONSHIPS, USAGE]
    );
    assert_eq!(inverse[RELATIONSHIPS], vec![QUALITY, USAGE]);
}

#[test]
fn test_execution_plan_unions_without_duplicates() {
    let dag = AnalyzerDag::with_defaults();
    let plan = dag.execution_plan(&[QUALITY, INDEXING]).unwrap();
    assert_eq!(plan, vec![SCHEMA, RELATIONSHIPS, QUALITY, INDEXING]);
}

#[test]
fn test_circular_dependency() {
    let mut deps = BTreeMap::new();
    deps.insert("a".to_string(), vec!["b".to_string()]);
    deps.insert("b".to_string(), vec!["c".to_string()]);
    deps.insert("c".to_string(), vec!["a".to_string()]);

    let result = AnalyzerDag::build(&deps);
    assert!(matches!(
        result.unwrap_err(),
        CoreError::CircularDependency { .. }
    ));
}

#[test]
fn test_dependency_on_undeclared_analyzer() {
    let mut deps = BTreeMap::new();
    deps.insert("a".to_string(), vec!["ghost".to_string()]);
    let err = AnalyzerDag::build(&deps).unwrap_err();
    assert!(matches!(err, CoreError::UnknownAnalyzer { name } if name == "ghost"));
}

#[test]
fn test_custom_table_extends_defaults() {
    let mut deps = default_dependencies();
    deps.insert(
        "lineage".to_string(),
        vec![RELATIONSHIPS.to_string(), USAGE.to_string()],
    );
    let dag = AnalyzerDag::build(&deps).unwrap();
    let order = dag.topological_order().unwrap();
    assert!(position(&order, USAGE) < position(&order, "lineage"));
    assert!(dag.invalidation_set(PROFILING).contains(&"lineage".to_string()));
}
