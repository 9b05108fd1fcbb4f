use polydep::facts::{Definition, DefinitionKind, FileFacts, Import};
use polydep::{ErrorKind, Graph};

fn build() -> Graph {
    let graph = Graph::new();
    graph.add_file(
        &FileFacts::new("store/db.py", "store", "python")
            .with_definition(Definition::new("connect", DefinitionKind::Function).exported())
            .with_definition(Definition::new("Pool", DefinitionKind::Class).exported())
            .with_definition(Definition::new("_retry", DefinitionKind::Function)),
    );
    graph.add_file(
        &FileFacts::new("repo/users.py", "repo", "python").with_import(Import::new("store")),
    );
    graph.add_file(
        &FileFacts::new("api/routes.py", "api", "python").with_import(Import::new("repo")),
    );
    graph.add_file(
        &FileFacts::new("cli/main.py", "cli", "python")
            .with_import(Import::new("api"))
            .with_import(Import::new("store")),
    );
    graph
}

#[test]
fn impact_separates_direct_and_transitive_importers() {
    let graph = build();
    let report = graph.analyze_impact("store/db.py").unwrap();

    assert_eq!(report.module, "store");
    assert_eq!(report.file, "store/db.py");
    assert_eq!(report.direct_importers, vec!["cli", "repo"]);
    assert_eq!(report.transitive_importers, vec!["api"]);
    assert_eq!(report.total_importers(), 3);
    assert_eq!(report.exported_symbols, vec!["Pool", "connect"]);
    assert_eq!(report.externally_used_symbols, report.exported_symbols);
}

#[test]
fn impact_accepts_a_module_name() {
    let graph = build();
    let report = graph.analyze_impact("repo").unwrap();

    assert_eq!(report.target, "repo");
    assert_eq!(report.file, "repo/users.py");
    assert_eq!(report.direct_importers, vec!["api"]);
    assert_eq!(report.transitive_importers, vec!["cli"]);
}

#[test]
fn exports_without_importers_are_not_externally_used() {
    let graph = Graph::new();
    graph.add_file(
        &FileFacts::new("solo.py", "solo", "python")
            .with_definition(Definition::new("public_api", DefinitionKind::Function).exported()),
    );

    let report = graph.analyze_impact("solo.py").unwrap();
    assert_eq!(report.exported_symbols, vec!["public_api"]);
    assert!(report.externally_used_symbols.is_empty());
    assert_eq!(report.total_importers(), 0);
}

#[test]
fn unknown_target_is_not_found() {
    let graph = build();
    let err = graph.analyze_impact("nowhere.py").unwrap_err();

    assert!(err.is_not_found());
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert!(err.to_string().contains("nowhere.py"));
}

#[test]
fn removed_file_is_no_longer_a_target() {
    let graph = build();
    graph.remove_file("cli/main.py");

    assert!(graph.analyze_impact("cli/main.py").is_err());
    let report = graph.analyze_impact("store").unwrap();
    assert_eq!(report.direct_importers, vec!["repo"]);
    assert_eq!(report.transitive_importers, vec!["api"]);
}
