use criterion::{black_box, criterion_group, criterion_main, Criterion};
use polydep::facts::{ComplexityMetrics, Definition, DefinitionKind, FileFacts, Import, Reference};
use polydep::{Graph, Resolver};

fn synthetic_file(idx: usize, modules: usize) -> FileFacts {
    let module = format!("pkg{}", idx % modules);
    let mut facts = FileFacts::new(&format!("src/{module}/file_{idx}.py"), &module, "python");

    // each module imports the next two, with an occasional back edge to form cycles
    for step in 1..=2 {
        facts = facts.with_import(Import::new(&format!("pkg{}", (idx + step) % modules)));
    }
    if idx % 17 == 0 {
        facts = facts.with_import(Import::new(&format!("pkg{}", idx.saturating_sub(3) % modules)));
    }

    for def in 0..5 {
        facts = facts.with_definition(
            Definition::new(&format!("Func{idx}_{def}"), DefinitionKind::Function)
                .exported()
                .with_complexity(ComplexityMetrics {
                    branches: (def * 3) as u32,
                    nesting: def as u32,
                    params: 2,
                    loc: 40,
                    score: None,
                }),
        );
    }

    let target = (idx + 1) % modules;
    facts
        .with_reference(Reference::new(&format!("pkg{target}.Func{}_0", idx + 1), 10))
        .with_reference(Reference::new(&format!("pkg{target}.Missing{idx}"), 11))
        .with_reference(Reference::new("os.path.join", 12))
}

fn build_graph(files: usize, modules: usize) -> Graph {
    let graph = Graph::new();
    for idx in 0..files {
        graph.add_file(&synthetic_file(idx, modules));
    }
    graph
}

fn benchmark_graph(c: &mut Criterion) {
    let mut group = c.benchmark_group("graph");
    let files: Vec<FileFacts> = (0..1_000).map(|idx| synthetic_file(idx, 200)).collect();

    group.bench_function("add_1000_files", |b| {
        b.iter(|| {
            let graph = Graph::new();
            for facts in &files {
                graph.add_file(black_box(facts));
            }
            black_box(graph.module_count())
        });
    });

    let graph = build_graph(1_000, 200);
    group.bench_function("re_add_single_file", |b| {
        b.iter(|| graph.add_file(black_box(&files[500])));
    });

    group.finish();
}

fn benchmark_queries(c: &mut Criterion) {
    let mut group = c.benchmark_group("queries");
    let graph = build_graph(2_000, 400);

    group.bench_function("detect_cycles", |b| b.iter(|| black_box(graph.detect_cycles())));
    group.bench_function("module_metrics", |b| {
        b.iter(|| black_box(graph.compute_module_metrics()))
    });
    group.bench_function("invalidate_transitive", |b| {
        b.iter(|| black_box(graph.invalidate_transitive("src/pkg0/file_0.py")))
    });
    group.bench_function("analyze_impact", |b| {
        b.iter(|| black_box(graph.analyze_impact("pkg7")))
    });

    group.finish();
}

fn benchmark_resolver(c: &mut Criterion) {
    let mut group = c.benchmark_group("resolver");
    let graph = build_graph(2_000, 400);

    group.bench_function("build", |b| b.iter(|| black_box(Resolver::new(&graph).symbols().len())));

    let resolver = Resolver::new(&graph);
    group.bench_function("find_unresolved", |b| {
        b.iter(|| black_box(resolver.find_unresolved()))
    });
    group.bench_function("find_unused_imports", |b| {
        b.iter(|| black_box(resolver.find_unused_imports()))
    });

    group.finish();
}

criterion_group!(benches, benchmark_graph, benchmark_queries, benchmark_resolver);
criterion_main!(benches);
