use petgraph::graph::NodeIndex;
use std::collections::{BTreeSet, HashSet, VecDeque};

use super::graph::{Graph, ModuleGraph};

impl Graph {
    /// Depth-first search from every unvisited module; each back edge to a
    /// module still on the DFS path yields the path slice from that module to
    /// the current one. Overlapping cycles in dense regions are all reported.
    ///
    /// Uses an explicit frame stack so chains of thousands of modules do not
    /// depend on thread stack size.
    pub fn detect_cycles(&self) -> Vec<Vec<String>> {
        let module_graph = self.module_graph();
        let adjacency = module_graph.adjacency();
        let node_count = adjacency.len();

        let mut visited = vec![false; node_count];
        let mut on_stack = vec![false; node_count];
        let mut position = vec![usize::MAX; node_count];
        let mut path: Vec<usize> = Vec::new();
        let mut cycles = Vec::new();

        for start in 0..node_count {
            if visited[start] {
                continue;
            }

            // (node, next neighbour to explore)
            let mut frames: Vec<(usize, usize)> = vec![(start, 0)];
            visited[start] = true;
            on_stack[start] = true;
            position[start] = path.len();
            path.push(start);

            while let Some(&(node, next)) = frames.last() {
                match adjacency[node].get(next) {
                    Some(&successor) => {
                        if let Some(top) = frames.last_mut() {
                            top.1 += 1;
                        }
                        if on_stack[successor] {
                            let cycle: Vec<String> = path[position[successor]..]
                                .iter()
                                .map(|&idx| module_name(&module_graph, idx))
                                .collect();
                            cycles.push(cycle);
                        } else if !visited[successor] {
                            visited[successor] = true;
                            on_stack[successor] = true;
                            position[successor] = path.len();
                            path.push(successor);
                            frames.push((successor, 0));
                        }
                    }
                    None => {
                        frames.pop();
                        on_stack[node] = false;
                        position[node] = usize::MAX;
                        path.pop();
                    }
                }
            }
        }

        tracing::debug!(cycles = cycles.len(), "cycle detection finished");
        cycles
    }

    /// Shortest import path from `from` to `to`, visiting neighbours in name
    /// order so ties resolve the same way every time.
    pub fn find_import_chain(&self, from: &str, to: &str) -> Option<Vec<String>> {
        if from == to {
            return Some(vec![from.to_string()]);
        }

        let module_graph = self.module_graph();
        let source = module_graph.index_of(from)?.index();
        let target = module_graph.index_of(to)?.index();
        let adjacency = module_graph.adjacency();

        let mut parent = vec![usize::MAX; adjacency.len()];
        let mut seen = vec![false; adjacency.len()];
        let mut queue = VecDeque::from([source]);
        seen[source] = true;

        while let Some(node) = queue.pop_front() {
            if node == target {
                let mut chain = vec![node];
                let mut cursor = node;
                while parent[cursor] != usize::MAX {
                    cursor = parent[cursor];
                    chain.push(cursor);
                }
                chain.reverse();
                return Some(
                    chain
                        .into_iter()
                        .map(|idx| module_name(&module_graph, idx))
                        .collect(),
                );
            }
            for &successor in &adjacency[node] {
                if !seen[successor] {
                    seen[successor] = true;
                    parent[successor] = node;
                    queue.push_back(successor);
                }
            }
        }

        None
    }

    /// Every file whose module transitively imports the module of
    /// `changed_file`, including that module's own files, sorted. An
    /// untracked path only invalidates itself.
    pub fn invalidate_transitive(&self, changed_file: &str) -> Vec<String> {
        let state = self.state.read();
        let Some(origin) = state.files.get(changed_file).map(|index| index.module.clone()) else {
            return vec![changed_file.to_string()];
        };

        let mut seen: HashSet<String> = HashSet::from([origin.clone()]);
        let mut queue = VecDeque::from([origin]);
        let mut files = BTreeSet::new();

        while let Some(current) = queue.pop_front() {
            if let Some(module) = state.modules.get(&current) {
                files.extend(module.files.iter().cloned());
            }
            if let Some(importers) = state.imported_by.get(&current) {
                for importer in importers {
                    if seen.insert(importer.clone()) {
                        queue.push_back(importer.clone());
                    }
                }
            }
        }

        files.into_iter().collect()
    }
}

fn module_name(module_graph: &ModuleGraph, idx: usize) -> String {
    module_graph.name(NodeIndex::new(idx)).to_string()
}
