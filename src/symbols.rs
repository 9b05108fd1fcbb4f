//! Universal symbol table: every retained definition in the graph, indexed
//! by a language-neutral canonical name and, for RPC-shaped symbols, by a
//! service key that folds client/server/servicer siblings together.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use crate::core::{DefinitionEntry, Graph};
use crate::facts::{Definition, DefinitionKind};

const SERVICE_MARKERS: &[&str] = &[
    "grpc", "thrift", "rpc", "route", "endpoint", "handler", "service", "servicer", "server",
];
const SERVICE_DECORATOR_MARKERS: &[&str] = &["grpc", "thrift", "route", "api"];
const SERVICE_SUFFIXES: &[&str] = &[
    "service", "servicer", "server", "client", "stub", "handler", "endpoint", "api", "rpc",
];

/// Lowercase and drop everything that is not alphanumeric.
pub fn canonicalize(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Canonical name with role suffixes stripped until none applies, e.g.
/// `UserServiceClient`, `UserServicer` and `user_service` all become `user`.
pub fn service_key(name: &str) -> String {
    let mut key = canonicalize(name);
    loop {
        let stripped = SERVICE_SUFFIXES.iter().find_map(|suffix| {
            if key.ends_with(suffix) && key.len() > suffix.len() + 2 {
                Some(key[..key.len() - suffix.len()].to_string())
            } else {
                None
            }
        });
        match stripped {
            Some(shorter) => key = shorter,
            None => return key,
        }
    }
}

pub fn is_service_definition(definition: &Definition) -> bool {
    let texts = [
        Some(definition.name.as_str()),
        Some(definition.qualified_name.as_str()),
        definition.signature.as_deref(),
        definition.type_hint.as_deref(),
    ];
    let mentions_service = texts.iter().flatten().any(|text| {
        let lowered = text.to_lowercase();
        SERVICE_MARKERS.iter().any(|marker| lowered.contains(marker))
    });
    if mentions_service {
        return true;
    }

    let decorated = definition.decorators.iter().any(|decorator| {
        let lowered = decorator.to_lowercase();
        SERVICE_DECORATOR_MARKERS
            .iter()
            .any(|marker| lowered.contains(marker))
    });
    if decorated {
        return true;
    }

    matches!(
        definition.kind,
        DefinitionKind::Interface | DefinitionKind::Class
    ) && service_key(&definition.name) != canonicalize(&definition.name)
}

/// Read-only projection of a retained definition.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SymbolRecord {
    pub name: String,
    pub qualified_name: String,
    pub canonical: String,
    pub module: String,
    pub language: String,
    pub file: String,
    pub kind: DefinitionKind,
    pub exported: bool,
    pub visibility: Option<String>,
    pub scope: Option<String>,
    pub signature: Option<String>,
    pub is_service: bool,
}

impl SymbolRecord {
    fn from_entry(entry: &DefinitionEntry) -> Self {
        let definition = &entry.definition;
        Self {
            name: definition.name.clone(),
            qualified_name: definition.qualified_name.clone(),
            canonical: canonicalize(&definition.name),
            module: entry.module.clone(),
            language: entry.language.clone(),
            file: entry.file.clone(),
            kind: definition.kind,
            exported: definition.exported,
            visibility: definition.visibility.clone(),
            scope: definition.scope.clone(),
            signature: definition.signature.clone(),
            is_service: is_service_definition(definition),
        }
    }

    pub fn is_public(&self) -> bool {
        self.exported
            || self
                .visibility
                .as_deref()
                .is_some_and(|v| v.eq_ignore_ascii_case("public"))
    }
}

#[derive(Debug, Clone, Default)]
pub struct UniversalSymbolTable {
    records: Vec<SymbolRecord>,
    by_canonical: HashMap<String, Vec<usize>>,
    by_service_key: HashMap<String, Vec<usize>>,
}

impl UniversalSymbolTable {
    pub fn build(graph: &Graph) -> Self {
        Self::from_definitions(&graph.get_definitions())
    }

    pub fn from_definitions(
        definitions: &BTreeMap<String, BTreeMap<String, DefinitionEntry>>,
    ) -> Self {
        let mut table = Self::default();

        for entry in definitions.values().flat_map(|table| table.values()) {
            let record = SymbolRecord::from_entry(entry);
            let idx = table.records.len();

            let mut keys = vec![record.canonical.clone()];
            let qualified = canonicalize(&record.qualified_name);
            if !qualified.is_empty() && qualified != record.canonical {
                keys.push(qualified);
            }
            for key in keys.into_iter().filter(|key| !key.is_empty()) {
                table.by_canonical.entry(key).or_default().push(idx);
            }

            if record.is_service {
                let key = service_key(&record.name);
                if !key.is_empty() {
                    table.by_service_key.entry(key).or_default().push(idx);
                }
            }

            table.records.push(record);
        }

        table
    }

    pub fn lookup(&self, canonical: &str) -> Vec<&SymbolRecord> {
        self.resolve_indices(self.by_canonical.get(canonical))
    }

    pub fn lookup_service(&self, key: &str) -> Vec<&SymbolRecord> {
        self.resolve_indices(self.by_service_key.get(key))
    }

    pub(crate) fn canonical_indices(&self, canonical: &str) -> &[usize] {
        self.by_canonical
            .get(canonical)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub(crate) fn service_indices(&self, key: &str) -> &[usize] {
        self.by_service_key
            .get(key)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn record(&self, idx: usize) -> Option<&SymbolRecord> {
        self.records.get(idx)
    }

    pub fn records(&self) -> &[SymbolRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn resolve_indices(&self, indices: Option<&Vec<usize>>) -> Vec<&SymbolRecord> {
        indices
            .map(|indices| indices.iter().filter_map(|&idx| self.records.get(idx)).collect())
            .unwrap_or_default()
    }
}
