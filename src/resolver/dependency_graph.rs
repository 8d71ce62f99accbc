use super::discovery::SourceFile;
use super::file_classifier::FileClassifier;
use crate::lang::{ExtractorRegistry, Reference};
use log::info;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};

/// Suffixes tried when a path-like reference omits its extension.
pub const PROBE_EXTENSIONS: &[&str] = &[
    "", ".py", ".js", ".ts", ".jsx", ".tsx", ".mjs", ".json", ".yaml", ".yml", ".md", "/index.js",
];

/// File-level dependency graph. Every discovered file is a node; an edge
/// `a -> b` means `a` references `b` and `b` is an in-repo file.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    forward: BTreeMap<String, BTreeSet<String>>,
    reverse: BTreeMap<String, BTreeSet<String>>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(&mut self, path: &str) {
        self.forward.entry(path.to_string()).or_default();
        self.reverse.entry(path.to_string()).or_default();
    }

    /// Self edges are ignored.
    pub fn add_edge(&mut self, from: &str, to: &str) {
        if from == to {
            return;
        }
        self.add_node(from);
        self.add_node(to);
        if let Some(deps) = self.forward.get_mut(from) {
            deps.insert(to.to_string());
        }
        if let Some(users) = self.reverse.get_mut(to) {
            users.insert(from.to_string());
        }
    }

    pub fn contains(&self, path: &str) -> bool {
        self.forward.contains_key(path)
    }

    pub fn files(&self) -> impl Iterator<Item = &String> {
        self.forward.keys()
    }

    pub fn node_count(&self) -> usize {
        self.forward.len()
    }

    pub fn edge_count(&self) -> usize {
        self.forward.values().map(|d| d.len()).sum()
    }

    /// Files `path` depends on.
    pub fn dependencies(&self, path: &str) -> BTreeSet<String> {
        self.forward.get(path).cloned().unwrap_or_default()
    }

    /// Files that depend on `path`.
    pub fn dependents(&self, path: &str) -> BTreeSet<String> {
        self.reverse.get(path).cloned().unwrap_or_default()
    }

    pub fn dependency_count(&self, path: &str) -> usize {
        self.forward.get(path).map_or(0, |d| d.len())
    }

    pub fn dependent_count(&self, path: &str) -> usize {
        self.reverse.get(path).map_or(0, |d| d.len())
    }

    fn is_entry_point(path: &str, entry_points: &BTreeSet<String>) -> bool {
        let name = path.rsplit('/').next().unwrap_or(path);
        entry_points.contains(path) || entry_points.contains(name)
    }

    /// Files unreachable from any entry point. Entry points match either
    /// by repository-relative path or by file name.
    pub fn orphaned_files(&self, entry_points: &BTreeSet<String>) -> BTreeSet<String> {
        let mut reachable: HashSet<&str> = HashSet::new();
        let mut queue: VecDeque<&str> = self
            .forward
            .keys()
            .filter(|p| Self::is_entry_point(p, entry_points))
            .map(|p| p.as_str())
            .collect();

        while let Some(current) = queue.pop_front() {
            if !reachable.insert(current) {
                continue;
            }
            if let Some(deps) = self.forward.get(current) {
                for dep in deps {
                    if !reachable.contains(dep.as_str()) {
                        queue.push_back(dep);
                    }
                }
            }
        }

        self.forward
            .keys()
            .filter(|p| !reachable.contains(p.as_str()))
            .cloned()
            .collect()
    }

    /// Every back edge found by a depth-first traversal closes a cycle,
    /// reported as the path slice from the repeated node plus the node
    /// itself (`[a, b, a]`).
    pub fn circular_dependencies(&self) -> Vec<Vec<String>> {
        let mut cycles = Vec::new();
        let mut visited: HashSet<&str> = HashSet::new();

        for start in self.forward.keys() {
            if visited.contains(start.as_str()) {
                continue;
            }
            // (node, index of the next neighbor to visit)
            let mut stack: Vec<(&str, usize)> = vec![(start.as_str(), 0)];
            let mut path: Vec<&str> = vec![start.as_str()];
            let mut on_path: HashSet<&str> = HashSet::from([start.as_str()]);
            visited.insert(start.as_str());

            while let Some((node, next)) = stack.last_mut() {
                let neighbors = match self.forward.get(*node) {
                    Some(n) => n,
                    None => {
                        stack.pop();
                        continue;
                    }
                };
                match neighbors.iter().nth(*next) {
                    Some(neighbor) => {
                        *next += 1;
                        let neighbor = neighbor.as_str();
                        if on_path.contains(neighbor) {
                            if let Some(idx) = path.iter().position(|p| *p == neighbor) {
                                let mut cycle: Vec<String> =
                                    path[idx..].iter().map(|s| s.to_string()).collect();
                                cycle.push(neighbor.to_string());
                                cycles.push(cycle);
                            }
                        } else if visited.insert(neighbor) {
                            stack.push((neighbor, 0));
                            path.push(neighbor);
                            on_path.insert(neighbor);
                        }
                    }
                    None => {
                        let node = *node;
                        stack.pop();
                        path.pop();
                        on_path.remove(node);
                    }
                }
            }
        }

        cycles
    }

    /// Files with the most dependents, highest first.
    pub fn most_depended_upon(&self, limit: usize) -> Vec<(String, usize)> {
        let mut ranked: Vec<(String, usize)> = self
            .reverse
            .iter()
            .filter(|(_, users)| !users.is_empty())
            .map(|(path, users)| (path.clone(), users.len()))
            .collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        ranked.truncate(limit);
        ranked
    }

    /// Graphviz rendering with orphans highlighted.
    pub fn to_dot(&self, orphaned: &BTreeSet<String>) -> String {
        let mut out = String::from("digraph Dependencies {\n");
        out.push_str("  rankdir=LR;\n");
        out.push_str("  node [shape=box, style=filled];\n\n");

        for path in self.forward.keys() {
            let color = if orphaned.contains(path) {
                "red"
            } else {
                match FileClassifier::extension(path).as_str() {
                    "py" | "js" | "ts" | "jsx" | "tsx" | "mjs" | "cjs" => "lightblue",
                    "md" | "rst" | "txt" => "lightyellow",
                    "json" => "lightgreen",
                    _ => "white",
                }
            };
            out.push_str(&format!("  \"{}\" [fillcolor={}];\n", path, color));
        }
        out.push('\n');
        for (from, deps) in &self.forward {
            for to in deps {
                out.push_str(&format!("  \"{}\" -> \"{}\";\n", from, to));
            }
        }
        out.push_str("}\n");
        out
    }
}

/// Builds a [`DependencyGraph`] from discovered files.
pub struct DependencyGraphBuilder<'a> {
    registry: &'a ExtractorRegistry,
    known: HashSet<String>,
    /// File name and stem -> path
    file_index: HashMap<String, String>,
    /// Dotted module path (and each dotted suffix) -> path
    module_index: HashMap<String, String>,
}

impl<'a> DependencyGraphBuilder<'a> {
    pub fn new(registry: &'a ExtractorRegistry) -> Self {
        Self {
            registry,
            known: HashSet::new(),
            file_index: HashMap::new(),
            module_index: HashMap::new(),
        }
    }

    fn index_files(&mut self, files: &[SourceFile]) {
        for file in files {
            self.known.insert(file.path.clone());
            self.file_index.insert(file.file_name().to_string(), file.path.clone());
            self.file_index.insert(file.stem().to_string(), file.path.clone());

            if file.extension == "py" {
                let without_ext = &file.path[..file.path.len() - 3];
                let parts: Vec<&str> = without_ext.split('/').collect();
                let parts: Vec<&str> = match parts.last() {
                    Some(&"__init__") if parts.len() > 1 => parts[..parts.len() - 1].to_vec(),
                    _ => parts,
                };
                for start in 0..parts.len() {
                    self.module_index
                        .entry(parts[start..].join("."))
                        .or_insert_with(|| file.path.clone());
                }
            }
        }
    }

    /// Lexically join `token` onto `base`, rejecting paths that climb out
    /// of the repository.
    fn join(base: &str, token: &str) -> Option<String> {
        let mut parts: Vec<&str> = base.split('/').filter(|p| !p.is_empty()).collect();
        for piece in token.split('/') {
            match piece {
                "" | "." => {}
                ".." => {
                    parts.pop()?;
                }
                other => parts.push(other),
            }
        }
        if parts.is_empty() {
            None
        } else {
            Some(parts.join("/"))
        }
    }

    fn probe(&self, candidate: &str) -> Option<String> {
        PROBE_EXTENSIONS
            .iter()
            .map(|ext| format!("{}{}", candidate, ext))
            .find(|p| self.known.contains(p))
    }

    fn lookup_name(&self, token: &str) -> Option<String> {
        if let Some(path) = self.module_index.get(token) {
            return Some(path.clone());
        }
        if let Some(path) = self.file_index.get(token) {
            return Some(path.clone());
        }
        PROBE_EXTENSIONS[1..]
            .iter()
            .find_map(|ext| self.file_index.get(&format!("{}{}", token, ext)))
            .cloned()
    }

    /// Resolve one reference made by `source` to an in-repo path.
    pub fn resolve(&self, source: &SourceFile, reference: &Reference) -> Option<String> {
        let resolved = match reference {
            Reference::RelativeModule(path) => [format!("{}.py", path), format!("{}/__init__.py", path)]
                .into_iter()
                .find(|p| self.known.contains(p)),
            Reference::Path(token) => {
                let relative = Self::join(source.parent(), token).and_then(|p| self.probe(&p));
                if token.starts_with('.') {
                    relative
                } else {
                    relative
                        .or_else(|| Self::join("", token).and_then(|p| self.probe(&p)))
                        .or_else(|| self.lookup_name(token.rsplit('/').next().unwrap_or(token)))
                }
            }
            Reference::Module(token) => {
                if token.starts_with('.') {
                    Self::join(source.parent(), token).and_then(|p| self.probe(&p))
                } else {
                    self.lookup_name(token)
                }
            }
        };
        resolved.filter(|p| p != &source.path)
    }

    pub fn build(mut self, files: &[SourceFile]) -> DependencyGraph {
        self.index_files(files);

        let mut graph = DependencyGraph::new();
        for file in files {
            graph.add_node(&file.path);
        }
        for file in files {
            for reference in self.registry.references(file) {
                if let Some(target) = self.resolve(file, &reference) {
                    graph.add_edge(&file.path, &target);
                }
            }
        }

        info!(
            "Dependency graph built: {} files, {} edges",
            graph.node_count(),
            graph.edge_count()
        );
        graph
    }
}
