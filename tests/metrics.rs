use polydep::core::metrics::{importance_score, strongly_connected_components};
use polydep::core::ModuleMetrics;
use polydep::facts::{ComplexityMetrics, Definition, DefinitionKind, FileFacts, Import};
use polydep::Graph;

fn module(graph: &Graph, name: &str, imports: &[&str]) {
    let mut facts = FileFacts::new(&format!("{name}.ts"), name, "typescript");
    for target in imports {
        facts = facts.with_import(Import::new(target));
    }
    graph.add_file(&facts);
}

fn metrics_for<'a>(metrics: &'a [ModuleMetrics], name: &str) -> &'a ModuleMetrics {
    metrics.iter().find(|m| m.module == name).unwrap()
}

#[test]
fn cycle_members_share_depth_and_dependents_sit_one_above() {
    let graph = Graph::new();
    module(&graph, "a", &["b"]);
    module(&graph, "b", &["c"]);
    module(&graph, "c", &["a", "leaf"]);
    module(&graph, "leaf", &[]);
    module(&graph, "top", &["a"]);

    let metrics = graph.compute_module_metrics();
    let names: Vec<&str> = metrics.iter().map(|m| m.module.as_str()).collect();
    assert_eq!(names, vec!["a", "b", "c", "leaf", "top"]);

    let depth_a = metrics_for(&metrics, "a").depth;
    assert_eq!(depth_a, 1);
    assert_eq!(metrics_for(&metrics, "b").depth, depth_a);
    assert_eq!(metrics_for(&metrics, "c").depth, depth_a);
    assert_eq!(metrics_for(&metrics, "top").depth, depth_a + 1);
    assert_eq!(metrics_for(&metrics, "leaf").depth, 0);

    let c = metrics_for(&metrics, "c");
    assert!(c.in_cycle);
    assert_eq!(c.component_size, 3);
    assert_eq!(c.fan_out, 2);
    assert_eq!(c.fan_in, 1);
    assert_eq!(metrics_for(&metrics, "a").fan_in, 2);
    assert_eq!(
        metrics_for(&metrics, "a").component,
        metrics_for(&metrics, "b").component
    );
    assert!(!metrics_for(&metrics, "top").in_cycle);
}

#[test]
fn isolated_module_reports_zeros() {
    let graph = Graph::new();
    module(&graph, "alone", &["somewhere/external"]);

    let metrics = graph.compute_module_metrics();
    assert_eq!(metrics.len(), 1);
    let alone = &metrics[0];
    assert_eq!((alone.depth, alone.fan_in, alone.fan_out), (0, 0, 0));
    assert_eq!(alone.component_size, 1);
    assert!(!alone.in_cycle);
}

#[test]
fn importance_weights_fan_in_and_entrypoint_names() {
    assert_eq!(importance_score("util", 3, 2, 4), 3.0 * 2.0 + 2.0 + 2.0);
    assert_eq!(importance_score("PaymentService", 0, 0, 0), 10.0);
    assert!(importance_score("api/gateway", 1, 1, 1) > importance_score("helpers", 1, 1, 1));
}

#[test]
fn scc_handles_self_loops_and_orders_sinks_first() {
    // 0 -> 1 -> 2 -> 1, 3 -> 3
    let adjacency = vec![vec![1], vec![2], vec![1], vec![3]];
    let components = strongly_connected_components(&adjacency);

    let mut sizes: Vec<usize> = components.iter().map(Vec::len).collect();
    sizes.sort_unstable();
    assert_eq!(sizes, vec![1, 1, 2]);

    let position = |node: usize| components.iter().position(|c| c.contains(&node)).unwrap();
    assert!(position(1) < position(0));
    assert_eq!(position(1), position(2));
}

#[test]
fn top_complexity_lists_only_callables_by_score() {
    let graph = Graph::new();
    let busy = ComplexityMetrics {
        branches: 10,
        nesting: 4,
        loc: 200,
        ..ComplexityMetrics::default()
    };
    graph.add_file(
        &FileFacts::new("billing.ts", "billing", "typescript")
            .with_definition(Definition::new("Invoice", DefinitionKind::Class).with_score(500))
            .with_definition(Definition::new("total", DefinitionKind::Method).with_complexity(busy))
            .with_definition(Definition::new("format", DefinitionKind::Function).with_score(3)),
    );
    graph.add_file(
        &FileFacts::new("audit.ts", "audit", "typescript")
            .with_definition(Definition::new("format", DefinitionKind::Function).with_score(3)),
    );

    let top = graph.top_complexity(2);
    assert_eq!(top.len(), 2);
    assert_eq!(top[0].name, "total");
    assert_eq!(top[0].score, 20 + 8 + 20);
    assert_eq!((top[1].module.as_str(), top[1].name.as_str()), ("audit", "format"));

    assert_eq!(graph.top_complexity(10).len(), 3);
    assert_eq!(graph.get_module("billing").unwrap().max_complexity, 500);
}
