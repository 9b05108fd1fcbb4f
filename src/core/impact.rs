use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, VecDeque};

use super::graph::Graph;
use crate::error::{Error, Result};

/// Who is affected when a file or module changes.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ImpactReport {
    pub target: String,
    pub module: String,
    pub file: String,
    pub direct_importers: Vec<String>,
    /// Importers reached through more than one hop, excluding direct ones.
    pub transitive_importers: Vec<String>,
    pub exported_symbols: Vec<String>,
    /// Empty unless something imports the module.
    pub externally_used_symbols: Vec<String>,
}

impl ImpactReport {
    pub fn total_importers(&self) -> usize {
        self.direct_importers.len() + self.transitive_importers.len()
    }
}

impl Graph {
    /// Impact of changing `path`, which may name a tracked file or a module
    /// (resolved through its lexicographically first file).
    pub fn analyze_impact(&self, path: &str) -> Result<ImpactReport> {
        let state = self.state.read();

        let (module_name, file) = match state.files.get(path) {
            Some(index) => (index.module.clone(), path.to_string()),
            None => {
                let first_file = state
                    .modules
                    .get(path)
                    .and_then(|module| module.files.iter().next().cloned())
                    .ok_or_else(|| Error::not_found(path))?;
                (path.to_string(), first_file)
            }
        };
        let module = state
            .modules
            .get(&module_name)
            .ok_or_else(|| Error::not_found(path))?;

        let direct: BTreeSet<String> = state
            .imported_by
            .get(&module_name)
            .cloned()
            .unwrap_or_default();

        let mut reached: BTreeSet<String> = BTreeSet::new();
        let mut queue: VecDeque<&str> = VecDeque::from([module_name.as_str()]);
        while let Some(current) = queue.pop_front() {
            if let Some(importers) = state.imported_by.get(current) {
                for importer in importers {
                    if importer != &module_name && reached.insert(importer.clone()) {
                        queue.push_back(importer.as_str());
                    }
                }
            }
        }

        let transitive: Vec<String> = reached.difference(&direct).cloned().collect();
        let exported_symbols: Vec<String> = module.exports.keys().cloned().collect();
        let externally_used_symbols = if reached.is_empty() {
            Vec::new()
        } else {
            exported_symbols.clone()
        };

        Ok(ImpactReport {
            target: path.to_string(),
            module: module_name.clone(),
            file,
            direct_importers: direct.into_iter().collect(),
            transitive_importers: transitive,
            exported_symbols,
            externally_used_symbols,
        })
    }
}
