use petgraph::graph::NodeIndex;
use serde::{Deserialize, Serialize};

use super::graph::{Graph, ModuleGraph};
use crate::facts::DefinitionKind;

/// Modules whose names contain one of these are treated as entry points.
const ENTRYPOINT_KEYWORDS: &[&str] = &["api", "gateway", "handler", "server", "service"];
const ENTRYPOINT_BONUS: f64 = 10.0;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModuleMetrics {
    pub module: String,
    pub files: usize,
    pub fan_in: usize,
    pub fan_out: usize,
    /// Longest path from this module's component to a sink in the condensed graph.
    pub depth: usize,
    pub component: usize,
    pub component_size: usize,
    pub in_cycle: bool,
    pub complexity: u32,
    pub importance: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ComplexityEntry {
    pub module: String,
    pub name: String,
    pub file: String,
    pub kind: DefinitionKind,
    pub score: u32,
}

pub fn importance_score(module: &str, fan_in: usize, fan_out: usize, complexity: u32) -> f64 {
    let lowered = module.to_lowercase();
    let bonus = if ENTRYPOINT_KEYWORDS
        .iter()
        .any(|keyword| lowered.contains(keyword))
    {
        ENTRYPOINT_BONUS
    } else {
        0.0
    };
    fan_in as f64 * 2.0 + fan_out as f64 + complexity as f64 * 0.5 + bonus
}

impl Graph {
    /// Fan-in/out, SCC membership, condensed-DAG depth and importance for
    /// every module that still has files, sorted by module name.
    pub fn compute_module_metrics(&self) -> Vec<ModuleMetrics> {
        let (module_graph, details) = {
            let state = self.state.read();
            let module_graph = ModuleGraph::from_modules(&state.modules);
            let details: Vec<(usize, u32)> = (0..module_graph.node_count())
                .map(|idx| {
                    let name = module_graph.name(NodeIndex::new(idx));
                    state
                        .modules
                        .get(name)
                        .map(|module| (module.files.len(), module.max_complexity))
                        .unwrap_or((0, 0))
                })
                .collect();
            (module_graph, details)
        };

        let adjacency = module_graph.adjacency();
        let reverse = module_graph.reverse_adjacency();
        let components = strongly_connected_components(&adjacency);

        let mut component_of = vec![0usize; adjacency.len()];
        for (component_id, members) in components.iter().enumerate() {
            for &member in members {
                component_of[member] = component_id;
            }
        }

        // Tarjan emits components sinks-first, so every successor component
        // already has its depth when we reach the component that points at it.
        let mut depth = vec![0usize; components.len()];
        for (component_id, members) in components.iter().enumerate() {
            let mut longest = 0;
            for &member in members {
                for &successor in &adjacency[member] {
                    let target = component_of[successor];
                    if target != component_id {
                        longest = longest.max(depth[target] + 1);
                    }
                }
            }
            depth[component_id] = longest;
        }

        (0..adjacency.len())
            .map(|idx| {
                let name = module_graph
                    .name(NodeIndex::new(idx))
                    .to_string();
                let (files, complexity) = details[idx];
                let fan_in = reverse[idx].len();
                let fan_out = adjacency[idx].len();
                let component = component_of[idx];
                let component_size = components[component].len();
                ModuleMetrics {
                    importance: importance_score(&name, fan_in, fan_out, complexity),
                    module: name,
                    files,
                    fan_in,
                    fan_out,
                    depth: depth[component],
                    component,
                    component_size,
                    in_cycle: component_size > 1,
                    complexity,
                }
            })
            .collect()
    }

    /// The `n` most complex functions and methods across all modules.
    pub fn top_complexity(&self, n: usize) -> Vec<ComplexityEntry> {
        let mut entries: Vec<ComplexityEntry> = {
            let state = self.state.read();
            state
                .modules
                .values()
                .flat_map(|module| module.definitions.values())
                .filter(|entry| entry.definition.kind.is_callable())
                .map(|entry| ComplexityEntry {
                    module: entry.module.clone(),
                    name: entry.definition.name.clone(),
                    file: entry.file.clone(),
                    kind: entry.definition.kind,
                    score: entry.score(),
                })
                .collect()
        };

        entries.sort_by(|a, b| {
            b.score
                .cmp(&a.score)
                .then_with(|| a.module.cmp(&b.module))
                .then_with(|| a.name.cmp(&b.name))
                .then_with(|| a.file.cmp(&b.file))
        });
        entries.truncate(n);
        entries
    }
}

/// Tarjan's algorithm with an explicit call stack. Components come out in
/// reverse topological order of the condensed graph.
pub fn strongly_connected_components(adjacency: &[Vec<usize>]) -> Vec<Vec<usize>> {
    const UNVISITED: usize = usize::MAX;

    let node_count = adjacency.len();
    let mut next_index = 0;
    let mut index = vec![UNVISITED; node_count];
    let mut lowlink = vec![0usize; node_count];
    let mut on_stack = vec![false; node_count];
    let mut stack: Vec<usize> = Vec::new();
    let mut components = Vec::new();

    for root in 0..node_count {
        if index[root] != UNVISITED {
            continue;
        }

        let mut calls: Vec<(usize, usize)> = vec![(root, 0)];
        index[root] = next_index;
        lowlink[root] = next_index;
        next_index += 1;
        stack.push(root);
        on_stack[root] = true;

        while let Some(&(node, next)) = calls.last() {
            if let Some(&successor) = adjacency[node].get(next) {
                if let Some(top) = calls.last_mut() {
                    top.1 += 1;
                }
                if index[successor] == UNVISITED {
                    index[successor] = next_index;
                    lowlink[successor] = next_index;
                    next_index += 1;
                    stack.push(successor);
                    on_stack[successor] = true;
                    calls.push((successor, 0));
                } else if on_stack[successor] {
                    lowlink[node] = lowlink[node].min(index[successor]);
                }
                continue;
            }

            calls.pop();
            if let Some(&(parent, _)) = calls.last() {
                lowlink[parent] = lowlink[parent].min(lowlink[node]);
            }

            if lowlink[node] == index[node] {
                let mut component = Vec::new();
                while let Some(member) = stack.pop() {
                    on_stack[member] = false;
                    component.push(member);
                    if member == node {
                        break;
                    }
                }
                component.sort_unstable();
                components.push(component);
            }
        }
    }

    components
}
