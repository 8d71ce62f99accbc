use file_court::lang::ExtractorRegistry;
use file_court::resolver::{discover_files, DependencyGraph, DependencyGraphBuilder, FileClassifier, SourceFile};
use std::collections::BTreeSet;
use std::fs;
use tempfile::TempDir;

fn build(files: &[SourceFile]) -> DependencyGraph {
    let registry = ExtractorRegistry::new();
    DependencyGraphBuilder::new(&registry).build(files)
}

fn set(items: &[&str]) -> BTreeSet<String> {
    items.iter().map(|s| s.to_string()).collect()
}

#[test]
fn test_python_imports_resolve_to_repository_files() {
    let files = vec![
        SourceFile::from_content("main.py", "import billing\nfrom pkg.tax import rate\n\nbilling.run()\n"),
        SourceFile::from_content("billing.py", "def run():\n    return 1\n"),
        SourceFile::from_content("pkg/__init__.py", ""),
        SourceFile::from_content("pkg/tax.py", "rate = 0.2\n"),
        SourceFile::from_content("unused.py", "import os\n"),
    ];
    let graph = build(&files);

    assert_eq!(graph.node_count(), 5);
    assert!(graph.dependencies("main.py").contains("billing.py"));
    assert!(graph.dependencies("main.py").contains("pkg/tax.py"));
    assert!(graph.dependents("billing.py").contains("main.py"));
    // Standard library imports never create edges.
    assert_eq!(graph.dependency_count("unused.py"), 0);
}

#[test]
fn test_relative_imports_stay_inside_their_package() {
    let files = vec![
        SourceFile::from_content("a/core/helpers.py", "def run():\n    return 0\n"),
        SourceFile::from_content("pkg/core/engine.py", "from .helpers import run\nfrom .. import settings\n"),
        SourceFile::from_content("pkg/core/helpers.py", "def run():\n    return 1\n"),
        SourceFile::from_content("pkg/settings/__init__.py", "DEBUG = False\n"),
    ];
    let graph = build(&files);

    assert_eq!(
        graph.dependencies("pkg/core/engine.py"),
        set(&["pkg/core/helpers.py", "pkg/settings/__init__.py"])
    );
    assert_eq!(graph.dependent_count("a/core/helpers.py"), 0);
}

#[test]
fn test_script_requires_probe_extensions() {
    let files = vec![
        SourceFile::from_content("web/app.js", "const utils = require('./utils');\nimport api from '../shared/api';\n"),
        SourceFile::from_content("web/utils.js", "module.exports = {};\n"),
        SourceFile::from_content("shared/api.ts", "export default {};\n"),
        SourceFile::from_content("web/lodash.js", "// vendored\n"),
    ];
    let graph = build(&files);

    assert_eq!(graph.dependencies("web/app.js"), set(&["shared/api.ts", "web/utils.js"]));
    assert_eq!(graph.dependent_count("web/lodash.js"), 0);
}

#[test]
fn test_markdown_links_are_edges() {
    let files = vec![
        SourceFile::from_content("README.md", "# Project\n\nSee [usage](docs/usage.md).\n"),
        SourceFile::from_content("docs/usage.md", "Back to the [readme](../README.md).\n"),
        SourceFile::from_content("docs/external.md", "[site](https://example.com/page.md)\n"),
    ];
    let graph = build(&files);

    assert!(graph.dependencies("README.md").contains("docs/usage.md"));
    assert!(graph.dependencies("docs/usage.md").contains("README.md"));
    assert_eq!(graph.dependency_count("docs/external.md"), 0);
}

#[test]
fn test_unresolved_references_add_no_nodes() {
    let files = vec![SourceFile::from_content("main.py", "import numpy\nimport missing_module\n")];
    let graph = build(&files);
    assert_eq!(graph.node_count(), 1);
    assert_eq!(graph.edge_count(), 0);
}

#[test]
fn test_orphans_respect_entry_points() {
    let files = vec![
        SourceFile::from_content("a.py", "import b\n"),
        SourceFile::from_content("b.py", "import c\n"),
        SourceFile::from_content("c.py", "x = 1\n"),
        SourceFile::from_content("d.py", "y = 2\n"),
    ];
    let graph = build(&files);

    assert_eq!(graph.orphaned_files(&set(&["a.py"])), set(&["d.py"]));
    // Nothing is reachable without an entry point.
    assert_eq!(graph.orphaned_files(&BTreeSet::new()).len(), 4);
    // Entry points also match by bare file name.
    assert_eq!(graph.orphaned_files(&set(&["b.py"])), set(&["a.py", "d.py"]));
}

#[test]
fn test_cycles_reported_once() {
    let files = vec![
        SourceFile::from_content("a.py", "import b\n"),
        SourceFile::from_content("b.py", "import c\n"),
        SourceFile::from_content("c.py", "import a\n"),
    ];
    let graph = build(&files);
    let cycles = graph.circular_dependencies();

    assert_eq!(cycles.len(), 1);
    let cycle = &cycles[0];
    assert_eq!(cycle.first(), cycle.last());
    assert_eq!(cycle.len(), 4);
    for name in ["a.py", "b.py", "c.py"] {
        assert!(cycle.iter().any(|p| p == name), "{} missing from {:?}", name, cycle);
    }
}

#[test]
fn test_most_depended_upon_ranking() {
    let files = vec![
        SourceFile::from_content("a.py", "import core\nimport helpers\n"),
        SourceFile::from_content("b.py", "import core\n"),
        SourceFile::from_content("c.py", "import core\nimport helpers\n"),
        SourceFile::from_content("core.py", "x = 1\n"),
        SourceFile::from_content("helpers.py", "y = 1\n"),
    ];
    let graph = build(&files);
    let ranked = graph.most_depended_upon(2);

    assert_eq!(ranked, vec![("core.py".to_string(), 3), ("helpers.py".to_string(), 2)]);
}

#[test]
fn test_graph_is_deterministic() {
    let files = vec![
        SourceFile::from_content("main.py", "import a\nimport b\n"),
        SourceFile::from_content("a.py", "import b\n"),
        SourceFile::from_content("b.py", "import a\n"),
        SourceFile::from_content("README.md", "[main](main.py)\n"),
    ];
    let first = build(&files);
    let second = build(&files);

    assert_eq!(first.to_dot(&BTreeSet::new()), second.to_dot(&BTreeSet::new()));
    assert_eq!(first.circular_dependencies(), second.circular_dependencies());
}

#[test]
fn test_dot_highlights_orphans() {
    let files = vec![
        SourceFile::from_content("main.py", "import lib\n"),
        SourceFile::from_content("lib.py", "x = 1\n"),
        SourceFile::from_content("stray.py", "y = 2\n"),
    ];
    let graph = build(&files);
    let orphans = graph.orphaned_files(&set(&["main.py"]));
    let dot = graph.to_dot(&orphans);

    assert!(dot.starts_with("digraph Dependencies {"));
    assert!(dot.contains("\"stray.py\" [fillcolor=red];"));
    assert!(dot.contains("\"lib.py\" [fillcolor=lightblue];"));
    assert!(dot.contains("\"main.py\" -> \"lib.py\";"));
}

#[test]
fn test_discovery_skips_quarantine_and_protected_paths() {
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    fs::create_dir_all(root.join("src")).unwrap();
    fs::create_dir_all(root.join("quarantine/s1")).unwrap();
    fs::create_dir_all(root.join("node_modules/pkg")).unwrap();
    fs::write(root.join("src/app.py"), "print('hi')\n").unwrap();
    fs::write(root.join("quarantine/s1/old.py"), "x = 1\n").unwrap();
    fs::write(root.join("node_modules/pkg/index.js"), "").unwrap();
    fs::write(root.join("LICENSE"), "MIT").unwrap();
    fs::write(root.join("logo.png"), [0u8, 1, 2]).unwrap();

    let files = discover_files(root, &FileClassifier::new());
    let paths: Vec<&str> = files.iter().map(|f| f.path.as_str()).collect();
    assert_eq!(paths, vec!["src/app.py"]);
}
