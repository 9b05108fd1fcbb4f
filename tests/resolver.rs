use polydep::config::{BridgeConfig, ProjectConfig};
use polydep::facts::{Definition, DefinitionKind, FileFacts, Import, Reference, ReferenceContext};
use polydep::resolver::{BridgeEvidence, SymbolMatch};
use polydep::core::FileLoader;
use polydep::{ConfidenceTier, Graph, Resolution, Resolver};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

fn go_function(path: &str, module: &str, name: &str) -> FileFacts {
    FileFacts::new(path, module, "go")
        .with_definition(Definition::new(name, DefinitionKind::Function).exported())
}

fn checkout(references: &[&str]) -> FileFacts {
    let mut facts = FileFacts::new("checkout/cart.py", "checkout", "python");
    for (line, name) in references.iter().enumerate() {
        facts = facts.with_reference(Reference::new(name, line as u32 + 1));
    }
    facts
}

fn bridge(source: &str, target: &str, reason: &str, references: &[&str]) -> BridgeConfig {
    BridgeConfig {
        source: source.to_string(),
        target: target.to_string(),
        reason: reason.to_string(),
        references: references.iter().map(|r| r.to_string()).collect(),
    }
}

#[test]
fn reports_only_the_missing_qualified_reference() {
    let graph = Graph::new();
    graph.add_file(&go_function("modA/a.go", "modA", "FuncA"));
    graph.add_file(
        &FileFacts::new("modB/b.go", "modB", "go")
            .with_import(Import::new("modA"))
            .with_reference(Reference::new("modA.FuncA", 3))
            .with_reference(Reference::new("modA.FuncMissing", 4)),
    );

    let resolver = Resolver::new(&graph);
    let unresolved = resolver.find_unresolved();

    assert_eq!(unresolved.len(), 1);
    assert_eq!(unresolved[0].reference.name, "modA.FuncMissing");
    assert_eq!(unresolved[0].file, "modB/b.go");
    assert_eq!(unresolved[0].module, "modB");
    assert_eq!(unresolved[0].confidence, ReferenceContext::None.confidence());
}

#[test]
fn close_candidates_are_never_guessed() {
    let graph = Graph::new();
    graph.add_file(&go_function("billing/charge.go", "billing", "ChargeCard"));
    graph.add_file(&go_function("payments/charge.go", "payments", "ChargeCard"));
    graph.add_file(&checkout(&["billing_client.charge_card"]));

    let resolver = Resolver::new(&graph);
    let file = graph.get_file("checkout/cart.py").unwrap();
    assert_eq!(resolver.resolve(&file, &file.references[0]), Resolution::Unresolved);
    assert_eq!(resolver.find_unresolved().len(), 1);
}

#[test]
fn a_lone_candidate_resolves_probabilistically() {
    let graph = Graph::new();
    graph.add_file(&go_function("billing/charge.go", "billing", "ChargeCard"));
    graph.add_file(&checkout(&["billing_client.charge_card"]));

    let resolver = Resolver::new(&graph);
    let file = graph.get_file("checkout/cart.py").unwrap();
    assert_eq!(
        resolver.resolve(&file, &file.references[0]),
        Resolution::Probabilistic(SymbolMatch {
            module: "billing".to_string(),
            name: "ChargeCard".to_string(),
            file: "billing/charge.go".to_string(),
            language: "go".to_string(),
            score: 11,
        })
    );
    assert!(resolver.find_unresolved().is_empty());
}

#[test]
fn import_evidence_breaks_a_tie() {
    let graph = Graph::new();
    graph.add_file(&go_function("billing/charge.go", "billing", "ChargeCard"));
    graph.add_file(&go_function("payments/charge.go", "payments", "ChargeCard"));
    graph.add_file(
        &checkout(&["billing_client.charge_card"])
            .with_import(Import::new("billing").with_alias("billing_client")),
    );

    let resolver = Resolver::new(&graph);
    let file = graph.get_file("checkout/cart.py").unwrap();
    match resolver.resolve(&file, &file.references[0]) {
        Resolution::Probabilistic(found) => {
            assert_eq!(found.module, "billing");
            assert_eq!(found.score, 15);
        }
        other => panic!("expected a probabilistic match, got {other:?}"),
    }
}

#[test]
fn pipeline_stages_classify_common_references() {
    let graph = Graph::new();
    graph.add_file(
        &FileFacts::new("shop/models.py", "shop.models", "python")
            .with_definition(Definition::new("Order", DefinitionKind::Class).exported()),
    );
    graph.add_file(&FileFacts::new("shop/sub/x.py", "shop.models.sub", "python"));
    graph.add_file(
        &FileFacts::new("shop/util.py", "shop", "python")
            .with_definition(Definition::new("helper", DefinitionKind::Function)),
    );
    let views = FileFacts::new("shop/views.py", "shop", "python")
        .with_import(Import::new("shop.models").with_items(&["Order"]))
        .with_import(Import::new("numpy").with_alias("np"))
        .with_import(Import::new("shop.models"))
        .with_local("cache")
        .with_reference(Reference::new("self.save", 1))
        .with_reference(Reference::new("cache.get", 2))
        .with_reference(Reference::new("os.path.join", 3))
        .with_reference(Reference::new("helper()", 4))
        .with_reference(Reference::new("Order.objects.get", 5))
        .with_reference(Reference::new("np.array", 6))
        .with_reference(Reference::new("models.sub.run", 7))
        .with_reference(Reference::new("len", 8))
        .with_reference(Reference::new("*cache", 9))
        .with_reference(Reference::new("ctypes.CDLL", 10));
    graph.add_file(&views);

    let resolver = Resolver::new(&graph);
    let stages: Vec<Resolution> = views
        .references
        .iter()
        .map(|reference| resolver.resolve(&views, reference))
        .collect();

    assert_eq!(stages[0], Resolution::Local);
    assert_eq!(stages[1], Resolution::Local);
    assert_eq!(stages[2], Resolution::Stdlib);
    assert_eq!(stages[3], Resolution::Qualified);
    assert_eq!(stages[4], Resolution::Qualified);
    assert_eq!(stages[5], Resolution::Qualified);
    assert_eq!(stages[6], Resolution::Qualified);
    assert_eq!(stages[7], Resolution::Builtin);
    assert_eq!(stages[8], Resolution::Local);
    assert_eq!(stages[9], Resolution::Bridge { target: None });
    assert!(resolver.find_unresolved().is_empty());
}

#[test]
fn unexported_members_of_other_modules_do_not_resolve_by_path() {
    let graph = Graph::new();
    graph.add_file(
        &FileFacts::new("core/a.go", "core", "go")
            .with_definition(Definition::new("internal", DefinitionKind::Function)),
    );
    graph.add_file(
        &FileFacts::new("app/main.go", "app", "go")
            .with_import(Import::new("core"))
            .with_reference(Reference::new("core.Missing", 1))
            .with_reference(Reference::new("unknownThing", 2)),
    );

    let resolver = Resolver::new(&graph);
    let unresolved = resolver.find_unresolved();
    // bare names that fail every stage are not reported
    assert_eq!(unresolved.len(), 1);
    assert_eq!(unresolved[0].reference.name, "core.Missing");
}

#[test]
fn tagged_service_reference_names_a_likely_target() {
    let graph = Graph::new();
    graph.add_file(
        &FileFacts::new("payments/server.go", "payments", "go")
            .with_definition(Definition::new("PaymentServer", DefinitionKind::Class).exported()),
    );
    let file = checkout(&[]).with_reference(
        Reference::new("PaymentServiceStub", 1).with_context(ReferenceContext::ServiceBridge),
    );
    graph.add_file(&file);

    let resolver = Resolver::new(&graph);
    match resolver.resolve(&file, &file.references[0]) {
        Resolution::Bridge {
            target: Some(target),
        } => {
            assert_eq!(target.name, "PaymentServer");
            assert_eq!(target.score, 8);
        }
        other => panic!("expected a bridge with a target, got {other:?}"),
    }
}

#[test]
fn explicit_bridges_short_circuit_resolution() {
    let graph = Graph::new();
    graph.add_file(&checkout(&["lib.charge_card", "billing_client.refund", "other.call"]));

    let config = ProjectConfig {
        bridges: vec![
            bridge("python:checkout*", "go:billing", "cgo wrapper", &["charge_*"]),
            bridge("python:*", "go:billing.*", "generated client", &[]),
        ],
        ..ProjectConfig::default()
    };
    let resolver = Resolver::with_config(&graph, &config).unwrap();
    let file = graph.get_file("checkout/cart.py").unwrap();

    assert_eq!(
        resolver.resolve(&file, &file.references[0]),
        Resolution::ExplicitBridge {
            reason: "cgo wrapper".to_string()
        }
    );
    assert_eq!(
        resolver.resolve(&file, &file.references[1]),
        Resolution::ExplicitBridge {
            reason: "generated client".to_string()
        }
    );
    assert_eq!(resolver.resolve(&file, &file.references[2]), Resolution::Unresolved);
}

#[test]
fn malformed_bridge_configuration_is_rejected() {
    let graph = Graph::new();
    let config = ProjectConfig {
        bridges: vec![bridge("no-language-here", "go:billing", "", &[])],
        ..ProjectConfig::default()
    };
    let err = Resolver::with_config(&graph, &config).err().unwrap();
    assert_eq!(err.kind(), polydep::ErrorKind::Config);
}

#[test]
fn excluded_patterns_count_as_local() {
    let graph = Graph::new();
    graph.add_file(&checkout(&["generated_pb.Thing", "other.Thing"]));

    let mut config = ProjectConfig::default();
    config.resolver.excluded_patterns = vec!["generated_*".to_string()];
    let resolver = Resolver::with_config(&graph, &config).unwrap();

    let unresolved = resolver.find_unresolved();
    assert_eq!(unresolved.len(), 1);
    assert_eq!(unresolved[0].reference.name, "other.Thing");
}

#[test]
fn resolver_works_on_a_snapshot() {
    let graph = Graph::new();
    graph.add_file(&go_function("modA/a.go", "modA", "FuncA"));
    graph.add_file(
        &FileFacts::new("modB/b.go", "modB", "go")
            .with_import(Import::new("modA"))
            .with_reference(Reference::new("modA.FuncB", 1)),
    );
    let before = Resolver::new(&graph);

    graph.add_file(&go_function("modA/b.go", "modA", "FuncB"));
    let after = Resolver::new(&graph);

    assert_eq!(before.find_unresolved().len(), 1);
    assert!(after.find_unresolved().is_empty());
}

/// Adds a file to the graph the first time it is asked to load one.
struct MutatingLoader {
    graph: Arc<Graph>,
    fired: AtomicBool,
}

impl FileLoader for MutatingLoader {
    fn load(&self, path: &str) -> anyhow::Result<Option<FileFacts>> {
        if !self.fired.swap(true, Ordering::SeqCst) {
            self.graph.add_file(&go_function("late/l.go", "late", "Late"));
        }
        Ok(Some(go_function(path, "modA", "FuncA")))
    }
}

#[test]
fn writes_during_loader_fill_stay_out_of_the_snapshot() {
    let graph = Arc::new(Graph::new());
    graph.add_file(&go_function("modA/a.go", "modA", "FuncA"));
    graph.set_cache_capacity(0);
    graph.set_loader(Some(Arc::new(MutatingLoader {
        graph: graph.clone(),
        fired: AtomicBool::new(false),
    }) as Arc<dyn FileLoader>));

    let resolver = Resolver::new(&graph);

    let paths: Vec<&str> = resolver.files().iter().map(|f| f.path.as_str()).collect();
    assert_eq!(paths, vec!["modA/a.go"]);
    let modules: Vec<&str> = resolver
        .symbols()
        .records()
        .iter()
        .map(|record| record.module.as_str())
        .collect();
    assert_eq!(modules, vec!["modA"]);

    // the write landed in the live graph
    assert!(graph.get_module("late").is_some());
    graph.set_loader(None);
}

#[test]
fn unused_imports_are_tiered_by_binding_kind() {
    let graph = Graph::new();
    graph.add_file(
        &checkout(&["json.dumps", "List", "yaml_config.load"])
            .with_import(Import::new("json").with_location(1))
            .with_import(Import::new("numpy").with_alias("np").with_location(2))
            .with_import(Import::new("typing").with_items(&["List", "Dict as D"]).with_location(3))
            .with_import(Import::new("os.path").with_location(4))
            .with_import(Import::new("yaml").with_location(5))
            .with_import(Import::new("sideeffect").with_alias("_").with_location(6))
            .with_import(Import::new("helpers").with_items(&["*"]).with_location(7)),
    );

    let resolver = Resolver::new(&graph);
    let unused: Vec<(String, ConfidenceTier)> = resolver
        .find_unused_imports()
        .into_iter()
        .map(|import| (import.name, import.confidence))
        .collect();

    assert_eq!(
        unused,
        vec![
            ("np".to_string(), ConfidenceTier::High),
            ("D".to_string(), ConfidenceTier::High),
            ("path".to_string(), ConfidenceTier::Medium),
            ("yaml".to_string(), ConfidenceTier::Low),
        ]
    );
}

#[test]
fn bridge_tagged_files_lower_unused_confidence() {
    let graph = Graph::new();
    graph.add_file(
        &checkout(&[])
            .with_import(Import::new("numpy").with_alias("np"))
            .with_reference(Reference::new("lib.call", 1).with_context(ReferenceContext::FfiBridge)),
    );

    let unused = Resolver::new(&graph).find_unused_imports();
    assert_eq!(unused.len(), 1);
    assert_eq!(unused[0].module, "numpy");
    assert_eq!(unused[0].confidence, ConfidenceTier::Low);
}

#[test]
fn probable_bridges_are_assessed_and_tiered() {
    let graph = Graph::new();
    graph.add_file(
        &FileFacts::new("payments/server.go", "payments", "go")
            .with_definition(Definition::new("PaymentServer", DefinitionKind::Class).exported()),
    );
    graph.add_file(
        &checkout(&["json.dumps"])
            .with_import(Import::new("payments_pb2").with_items(&["PaymentServiceStub"]))
            .with_reference(
                Reference::new("PaymentServiceStub", 2).with_context(ReferenceContext::ServiceBridge),
            )
            .with_reference(Reference::new("ctypes.CDLL", 3))
            .with_reference(Reference::new("wrapper.charge", 4)),
    );

    let config = ProjectConfig {
        bridges: vec![bridge("python:checkout", "go:payments", "shared lib", &["*.charge"])],
        ..ProjectConfig::default()
    };
    let resolver = Resolver::with_config(&graph, &config).unwrap();
    let bridges = resolver.find_probable_bridges();

    let names: Vec<&str> = bridges.iter().map(|b| b.reference.name.as_str()).collect();
    assert_eq!(names, vec!["PaymentServiceStub", "ctypes.CDLL", "wrapper.charge"]);

    let service = &bridges[0];
    assert_eq!(
        service.evidence,
        vec![
            BridgeEvidence::ContextTag,
            BridgeEvidence::ImportEvidence,
            BridgeEvidence::UniqueCrossLanguageCandidate,
        ]
    );
    assert_eq!(service.score, 9);
    assert_eq!(service.tier, ConfidenceTier::High);

    assert_eq!(bridges[1].tier, ConfidenceTier::Low);

    let explicit = &bridges[2];
    assert_eq!(explicit.evidence, vec![BridgeEvidence::ExplicitBridge]);
    assert_eq!(explicit.tier, ConfidenceTier::High);
    assert_eq!(explicit.bridge_reason.as_deref(), Some("shared lib"));
}

#[test]
fn tier_thresholds_follow_configuration() {
    assert_eq!(ConfidenceTier::from_score(8, 8, 5), ConfidenceTier::High);
    assert_eq!(ConfidenceTier::from_score(5, 8, 5), ConfidenceTier::Medium);
    assert_eq!(ConfidenceTier::from_score(4, 8, 5), ConfidenceTier::Low);
    assert_eq!(ConfidenceTier::from_score(9, 12, 9), ConfidenceTier::Medium);
    assert!(ConfidenceTier::High > ConfidenceTier::Low);
}
