use parking_lot::RwLock;
use petgraph::graph::{DiGraph, NodeIndex};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use super::cache::{FileCache, FileLoader};
use crate::config::{CacheConfig, DEFAULT_CACHE_CAPACITY};
use crate::facts::{Definition, FileFacts, Import, Location};

/// A definition as retained by its module, stamped with where it came from.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DefinitionEntry {
    pub definition: Definition,
    pub module: String,
    pub file: String,
    pub language: String,
}

impl DefinitionEntry {
    pub fn score(&self) -> u32 {
        self.definition.complexity_score()
    }

    fn rank_key(&self) -> (u32, u32, u32, u32, u32) {
        let c = &self.definition.complexity;
        (self.score(), c.loc, c.branches, c.params, c.nesting)
    }

    /// Total order used to keep one definition per (module, name): higher
    /// score, LOC, branches, params, nesting win in that order; the
    /// lexicographically smaller file wins a full tie.
    fn outranks(&self, other: &DefinitionEntry) -> bool {
        match self.rank_key().cmp(&other.rank_key()) {
            Ordering::Greater => true,
            Ordering::Less => false,
            Ordering::Equal => self.file < other.file,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ImportEdge {
    pub from: String,
    pub to: String,
    pub file: String,
    pub location: Location,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Module {
    pub name: String,
    pub files: BTreeSet<String>,
    pub languages: BTreeSet<String>,
    pub exports: BTreeMap<String, DefinitionEntry>,
    pub definitions: BTreeMap<String, DefinitionEntry>,
    /// Keyed by target module; a later file importing the same target
    /// replaces the attribution.
    pub imports: BTreeMap<String, ImportEdge>,
    pub max_complexity: u32,
}

impl Module {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }

    fn clear_contributions(&mut self) {
        self.languages.clear();
        self.exports.clear();
        self.definitions.clear();
        self.imports.clear();
        self.max_complexity = 0;
    }

    fn contribute(&mut self, path: &str, index: &FileIndex) {
        if !index.language.is_empty() {
            self.languages.insert(index.language.clone());
        }

        for definition in &index.definitions {
            let entry = DefinitionEntry {
                definition: definition.clone(),
                module: self.name.clone(),
                file: path.to_string(),
                language: index.language.clone(),
            };
            self.max_complexity = self.max_complexity.max(entry.score());
            if definition.exported {
                merge_preferred(&mut self.exports, entry.clone());
            }
            merge_preferred(&mut self.definitions, entry);
        }

        for import in &index.imports {
            let target = import.module.trim();
            if target.is_empty() || target == self.name {
                continue;
            }
            self.imports.insert(
                target.to_string(),
                ImportEdge {
                    from: self.name.clone(),
                    to: target.to_string(),
                    file: path.to_string(),
                    location: import.location,
                },
            );
        }
    }
}

fn merge_preferred(table: &mut BTreeMap<String, DefinitionEntry>, entry: DefinitionEntry) {
    match table.get(&entry.definition.name) {
        Some(current) if !entry.outranks(current) => {}
        _ => {
            table.insert(entry.definition.name.clone(), entry);
        }
    }
}

/// A consistent copy of the graph's modules and full file facts.
#[derive(Debug, Clone, Default)]
pub struct GraphSnapshot {
    pub modules: BTreeMap<String, Module>,
    pub files: Vec<FileFacts>,
}

impl GraphSnapshot {
    /// Retained definitions per module, in the shape the symbol table consumes.
    pub fn definitions(&self) -> BTreeMap<String, BTreeMap<String, DefinitionEntry>> {
        self.modules
            .iter()
            .map(|(name, module)| (name.clone(), module.definitions.clone()))
            .collect()
    }
}

/// The structural part of a file the graph needs to re-derive its module.
/// Full facts (references, local names) live in the cache.
#[derive(Debug, Clone)]
pub(crate) struct FileIndex {
    pub module: String,
    pub language: String,
    pub imports: Vec<Import>,
    pub definitions: Vec<Definition>,
}

impl FileIndex {
    fn from_facts(facts: &FileFacts) -> Self {
        Self {
            module: facts.module_name().to_string(),
            language: facts.language.clone(),
            imports: facts.imports.clone(),
            definitions: facts.definitions.clone(),
        }
    }
}

pub(crate) struct GraphState {
    pub modules: BTreeMap<String, Module>,
    pub files: HashMap<String, FileIndex>,
    /// Reverse import index, restricted to targets that are live modules.
    pub imported_by: HashMap<String, BTreeSet<String>>,
    pub dirty: BTreeSet<String>,
    pub cache: FileCache<String, FileFacts>,
    pub loader: Option<Arc<dyn FileLoader>>,
}

impl GraphState {
    fn new(capacity: usize) -> Self {
        Self {
            modules: BTreeMap::new(),
            files: HashMap::new(),
            imported_by: HashMap::new(),
            dirty: BTreeSet::new(),
            cache: FileCache::new(capacity),
            loader: None,
        }
    }

    fn apply_file(&mut self, path: &str, index: FileIndex) {
        let module_name = index.module.clone();
        if !self.modules.contains_key(&module_name) {
            self.modules
                .insert(module_name.clone(), Module::new(&module_name));
            self.derive_importers(&module_name);
            tracing::debug!(module = %module_name, "module created");
        }

        if let Some(module) = self.modules.get_mut(&module_name) {
            module.files.insert(path.to_string());
            module.contribute(path, &index);
        }
        self.files.insert(path.to_string(), index);
        self.link_reverse(&module_name);
    }

    /// Drop every trace of `path`. Returns false when it was not tracked.
    fn retract_file(&mut self, path: &str) -> bool {
        let Some(index) = self.files.remove(path) else {
            return false;
        };
        let module_name = index.module;

        let now_empty = match self.modules.get_mut(&module_name) {
            Some(module) => {
                module.files.remove(path);
                module.files.is_empty()
            }
            None => return true,
        };

        if now_empty {
            self.purge_module(&module_name);
        } else {
            self.rebuild_module(&module_name);
        }
        true
    }

    fn purge_module(&mut self, name: &str) {
        let Some(module) = self.modules.remove(name) else {
            return;
        };
        for target in module.imports.keys() {
            self.unlink_reverse(target, name);
        }
        self.imported_by.remove(name);
        tracing::debug!(module = %name, "module purged");
    }

    /// Re-derive exports, definitions and edges from the remaining member
    /// files rather than subtracting the removed file's share.
    fn rebuild_module(&mut self, name: &str) {
        let Some(module) = self.modules.get_mut(name) else {
            return;
        };
        let previous: BTreeSet<String> = module.imports.keys().cloned().collect();

        module.clear_contributions();
        let members: Vec<String> = module.files.iter().cloned().collect();
        for path in &members {
            if let Some(index) = self.files.get(path) {
                module.contribute(path, index);
            }
        }

        let current: BTreeSet<String> = module.imports.keys().cloned().collect();
        for stale in previous.difference(&current) {
            self.unlink_reverse(stale, name);
        }
        self.link_reverse(name);
        tracing::debug!(module = %name, files = members.len(), "module rebuilt");
    }

    fn link_reverse(&mut self, name: &str) {
        let Some(module) = self.modules.get(name) else {
            return;
        };
        let targets: Vec<String> = module
            .imports
            .keys()
            .filter(|target| self.modules.contains_key(*target))
            .cloned()
            .collect();
        for target in targets {
            self.imported_by
                .entry(target)
                .or_default()
                .insert(name.to_string());
        }
    }

    fn unlink_reverse(&mut self, target: &str, source: &str) {
        if let Some(importers) = self.imported_by.get_mut(target) {
            importers.remove(source);
            if importers.is_empty() {
                self.imported_by.remove(target);
            }
        }
    }

    /// Cached facts for every tracked file, plus the paths the cache has lost.
    fn split_cached(&self) -> (Vec<FileFacts>, Vec<String>) {
        let mut found = Vec::with_capacity(self.files.len());
        let mut missing = Vec::new();
        for path in self.files.keys() {
            match self.cache.peek(path) {
                Some(facts) => found.push(facts),
                None => missing.push(path.clone()),
            }
        }
        (found, missing)
    }

    /// A module that (re)appears picks up edges other modules already hold.
    fn derive_importers(&mut self, name: &str) {
        let importers: BTreeSet<String> = self
            .modules
            .values()
            .filter(|module| module.imports.contains_key(name))
            .map(|module| module.name.clone())
            .collect();
        if !importers.is_empty() {
            self.imported_by.insert(name.to_string(), importers);
        }
    }
}

/// The module dependency graph: file membership, per-module symbol tables,
/// import edges and their reverse index, behind a single reader/writer lock.
///
/// Every accessor returns an owned copy. The file cache lives inside the
/// locked state, so the graph lock is always taken before the cache lock.
pub struct Graph {
    pub(crate) state: RwLock<GraphState>,
}

impl Default for Graph {
    fn default() -> Self {
        Self::new()
    }
}

impl Graph {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(GraphState::new(DEFAULT_CACHE_CAPACITY)),
        }
    }

    pub fn with_config(config: &CacheConfig) -> Self {
        Self {
            state: RwLock::new(GraphState::new(config.capacity)),
        }
    }

    /// Ingest a file, replacing whatever an earlier version at the same path contributed.
    pub fn add_file(&self, file: &FileFacts) {
        let facts = file.clone();
        let path = facts.path.clone();
        let index = FileIndex::from_facts(&facts);

        let mut state = self.state.write();
        if state.retract_file(&path) {
            tracing::debug!(path = %path, "replacing tracked file");
        }
        state.apply_file(&path, index);
        state.cache.put(path.clone(), facts);
        tracing::debug!(path = %path, modules = state.modules.len(), "file added");
    }

    pub fn remove_file(&self, path: &str) -> bool {
        let mut state = self.state.write();
        if !state.retract_file(path) {
            return false;
        }
        state.cache.evict(&path.to_string());
        tracing::debug!(path = %path, "file removed");
        true
    }

    pub fn get_module(&self, name: &str) -> Option<Module> {
        self.state.read().modules.get(name).cloned()
    }

    pub fn modules(&self) -> BTreeMap<String, Module> {
        self.state.read().modules.clone()
    }

    pub fn module_names(&self) -> Vec<String> {
        self.state.read().modules.keys().cloned().collect()
    }

    pub fn module_of(&self, path: &str) -> Option<String> {
        self.state
            .read()
            .files
            .get(path)
            .map(|index| index.module.clone())
    }

    pub fn file_paths(&self) -> Vec<String> {
        let state = self.state.read();
        let mut paths: Vec<String> = state.files.keys().cloned().collect();
        paths.sort();
        paths
    }

    pub fn file_count(&self) -> usize {
        self.state.read().files.len()
    }

    pub fn module_count(&self) -> usize {
        self.state.read().modules.len()
    }

    /// Full facts for a tracked file. A cache miss falls back to the loader,
    /// called with no lock held.
    pub fn get_file(&self, path: &str) -> Option<FileFacts> {
        let key = path.to_string();
        let loader = {
            let state = self.state.read();
            if !state.files.contains_key(path) {
                return None;
            }
            if let Some(facts) = state.cache.get(&key) {
                return Some(facts);
            }
            state.loader.clone()?
        };

        let facts = load_quietly(loader.as_ref(), path)?;
        let state = self.state.write();
        if state.files.contains_key(path) {
            state.cache.put(key, facts.clone());
        }
        Some(facts)
    }

    /// Full facts for every tracked file that is cached or loadable, sorted by path.
    pub fn get_all_files(&self) -> Vec<FileFacts> {
        let (found, missing, loader) = {
            let state = self.state.read();
            let (found, missing) = state.split_cached();
            (found, missing, state.loader.clone())
        };
        self.fill_missing(found, missing, loader)
    }

    /// Modules and file facts captured under one read guard. Only the loader
    /// fill of uncached files runs after the guard is released, and it is
    /// restricted to paths the snapshot already tracked.
    pub fn snapshot(&self) -> GraphSnapshot {
        let (modules, found, missing, loader) = {
            let state = self.state.read();
            let (found, missing) = state.split_cached();
            (state.modules.clone(), found, missing, state.loader.clone())
        };
        let files = self.fill_missing(found, missing, loader);
        GraphSnapshot { modules, files }
    }

    fn fill_missing(
        &self,
        mut found: Vec<FileFacts>,
        missing: Vec<String>,
        loader: Option<Arc<dyn FileLoader>>,
    ) -> Vec<FileFacts> {
        if !missing.is_empty() {
            match loader {
                Some(loader) => {
                    let loaded: Vec<FileFacts> = missing
                        .iter()
                        .filter_map(|path| {
                            load_quietly(loader.as_ref(), path).filter(|facts| facts.path == *path)
                        })
                        .collect();
                    let state = self.state.write();
                    for facts in &loaded {
                        if state.files.contains_key(&facts.path) {
                            state.cache.put(facts.path.clone(), facts.clone());
                        }
                    }
                    found.extend(loaded);
                }
                None => {
                    tracing::warn!(
                        missing = missing.len(),
                        "evicted files skipped, no loader configured"
                    );
                }
            }
        }

        found.sort_by(|a, b| a.path.cmp(&b.path));
        found
    }

    pub fn get_imports(&self) -> BTreeMap<String, Vec<ImportEdge>> {
        self.state
            .read()
            .modules
            .iter()
            .map(|(name, module)| (name.clone(), module.imports.values().cloned().collect()))
            .collect()
    }

    /// Modules that import `module` directly, sorted.
    pub fn importers_of(&self, module: &str) -> Vec<String> {
        self.state
            .read()
            .imported_by
            .get(module)
            .map(|importers| importers.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn get_definitions(&self) -> BTreeMap<String, BTreeMap<String, DefinitionEntry>> {
        self.state
            .read()
            .modules
            .iter()
            .map(|(name, module)| (name.clone(), module.definitions.clone()))
            .collect()
    }

    pub fn get_exports(&self) -> BTreeMap<String, BTreeMap<String, DefinitionEntry>> {
        self.state
            .read()
            .modules
            .iter()
            .map(|(name, module)| (name.clone(), module.exports.clone()))
            .collect()
    }

    pub fn mark_dirty<I, S>(&self, paths: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut state = self.state.write();
        state.dirty.extend(paths.into_iter().map(Into::into));
    }

    /// Drain the dirty set; a second call returns nothing until new marks arrive.
    pub fn get_dirty(&self) -> Vec<String> {
        let mut state = self.state.write();
        std::mem::take(&mut state.dirty).into_iter().collect()
    }

    pub fn set_loader(&self, loader: Option<Arc<dyn FileLoader>>) {
        self.state.write().loader = loader;
    }

    pub fn set_cache_capacity(&self, capacity: usize) {
        self.state.write().cache.set_capacity(capacity);
    }

    pub fn cache_len(&self) -> usize {
        self.state.read().cache.len()
    }

    /// Petgraph snapshot of the live modules and the edges between them.
    pub fn module_graph(&self) -> ModuleGraph {
        let state = self.state.read();
        ModuleGraph::from_modules(&state.modules)
    }
}

fn load_quietly(loader: &dyn FileLoader, path: &str) -> Option<FileFacts> {
    match loader.load(path) {
        Ok(Some(facts)) => Some(facts),
        Ok(None) => {
            tracing::debug!(path = %path, "loader has no facts");
            None
        }
        Err(err) => {
            tracing::warn!(path = %path, error = %err, "loader failed");
            None
        }
    }
}

/// Modules that still have files, as petgraph nodes in name order, with an
/// edge for every import whose target is also live.
#[derive(Debug, Clone)]
pub struct ModuleGraph {
    pub graph: DiGraph<String, ()>,
    indices: HashMap<String, NodeIndex>,
}

impl ModuleGraph {
    pub(crate) fn from_modules(modules: &BTreeMap<String, Module>) -> Self {
        let mut graph = DiGraph::with_capacity(modules.len(), modules.len() * 2);
        let mut indices = HashMap::with_capacity(modules.len());

        for (name, module) in modules {
            if module.files.is_empty() {
                continue;
            }
            indices.insert(name.clone(), graph.add_node(name.clone()));
        }

        for (name, module) in modules {
            let Some(&source) = indices.get(name) else {
                continue;
            };
            for target in module.imports.keys() {
                if let Some(&target_idx) = indices.get(target) {
                    graph.add_edge(source, target_idx, ());
                }
            }
        }

        Self { graph, indices }
    }

    pub fn index_of(&self, name: &str) -> Option<NodeIndex> {
        self.indices.get(name).copied()
    }

    pub fn name(&self, index: NodeIndex) -> &str {
        &self.graph[index]
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Outgoing neighbours per node, sorted by module name. Nodes are
    /// inserted in name order, so index order is name order.
    pub fn adjacency(&self) -> Vec<Vec<usize>> {
        let mut adjacency = vec![Vec::new(); self.graph.node_count()];
        for edge in self.graph.raw_edges() {
            adjacency[edge.source().index()].push(edge.target().index());
        }
        for neighbours in &mut adjacency {
            neighbours.sort_unstable();
            neighbours.dedup();
        }
        adjacency
    }

    pub fn reverse_adjacency(&self) -> Vec<Vec<usize>> {
        let mut reverse = vec![Vec::new(); self.graph.node_count()];
        for edge in self.graph.raw_edges() {
            reverse[edge.target().index()].push(edge.source().index());
        }
        for neighbours in &mut reverse {
            neighbours.sort_unstable();
            neighbours.dedup();
        }
        reverse
    }
}
