use criterion::{black_box, criterion_group, criterion_main, Criterion};
use file_court::court::{Corpus, FileCourt};
use file_court::lang::ExtractorRegistry;
use file_court::resolver::{DependencyGraphBuilder, SourceFile};
use file_court::semantics::SemanticAnalyzer;
use file_court::CourtConfig;
use std::collections::BTreeSet;
use std::path::Path;

/// A layered service: every module imports the previous two, every tenth
/// one is a stale copy and each package gets a doc page.
fn synthetic_repo(modules: usize) -> Vec<SourceFile> {
    let mut files = vec![SourceFile::from_content(
        "main.py",
        "import service_0\nimport service_1\n\nif __name__ == \"__main__\":\n    service_0.run()\n",
    )];
    for i in 0..modules {
        let mut body = String::new();
        for dep in [i + 1, i + 2] {
            if dep < modules {
                body.push_str(&format!("import service_{}\n", dep));
            }
        }
        body.push_str(&format!(
            "\n\"\"\"Service {} handles invoice records and caches customer data.\"\"\"\n\n\
             def run():\n    return load_records_{}()\n\n\
             def load_records_{}():\n    return [{}]\n",
            i, i, i, i
        ));
        let name = if i % 10 == 9 {
            format!("service_{}_old.py", i)
        } else {
            format!("service_{}.py", i)
        };
        files.push(SourceFile::from_content(name, body));
        if i % 5 == 0 {
            files.push(SourceFile::from_content(
                format!("docs/service_{}.md", i),
                format!("# Service {}\n\nLoads invoice records for [service](../service_{}.py).\n", i, i),
            ));
        }
    }
    files
}

fn entry_points() -> BTreeSet<String> {
    ["main.py".to_string()].into()
}

fn bench_graph(c: &mut Criterion) {
    let files = synthetic_repo(200);
    let registry = ExtractorRegistry::new();

    c.bench_function("dependency_graph_200_modules", |b| {
        b.iter(|| {
            let graph = DependencyGraphBuilder::new(&registry).build(black_box(&files));
            black_box(graph.orphaned_files(&entry_points()));
            black_box(graph.circular_dependencies());
        });
    });
}

fn bench_semantics(c: &mut Criterion) {
    let files = synthetic_repo(200);
    let registry = ExtractorRegistry::new();

    c.bench_function("semantic_index_200_modules", |b| {
        b.iter(|| black_box(SemanticAnalyzer::new(&registry).analyze(black_box(&files))));
    });

    let index = SemanticAnalyzer::new(&registry).analyze(&files);
    c.bench_function("semantic_report_200_modules", |b| {
        b.iter(|| black_box(index.report()));
    });
}

fn bench_court(c: &mut Criterion) {
    c.bench_function("full_court_100_modules", |b| {
        b.iter(|| {
            let corpus = Corpus::from_files(Path::new("."), synthetic_repo(100), entry_points(), None);
            let mut court = FileCourt::with_corpus(CourtConfig::new("."), corpus);
            black_box(court.convene().len());
        });
    });
}

criterion_group!(benches, bench_graph, bench_semantics, bench_court);
criterion_main!(benches);
