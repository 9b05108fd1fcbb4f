//! Reference resolution over one graph snapshot.
//!
//! Each reference runs an ordered pipeline and the first stage that accepts it
//! wins: local names, cross-language bridges, the standard library, qualified
//! lookups through the owning module and the file's imports, builtins, and
//! finally the probabilistic scorer in [`scoring`].

pub mod bridges;
pub mod languages;
pub mod scoring;

use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

use crate::config::{ProjectConfig, ResolverConfig};
use crate::core::{Graph, Module};
use crate::error::{Error, Result};
use crate::facts::{FileFacts, Import, Location, Reference, ReferenceContext};
use crate::symbols::UniversalSymbolTable;

pub use bridges::{BridgeRegistry, Endpoint, ExplicitBridge};
pub use languages::Language;
pub use scoring::{BridgeAssessment, BridgeEvidence, SymbolMatch};

const SIGILS: &[char] = &['*', '&', '@', '!', '~'];
const SEPARATORS: &[char] = &['.', ':', '/', '-', '>'];

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ConfidenceTier {
    Low,
    Medium,
    High,
}

impl ConfidenceTier {
    pub fn from_score(score: i32, high: i32, medium: i32) -> Self {
        if score >= high {
            ConfidenceTier::High
        } else if score >= medium {
            ConfidenceTier::Medium
        } else {
            ConfidenceTier::Low
        }
    }
}

/// The pipeline stage that accepted a reference.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "stage", rename_all = "snake_case")]
pub enum Resolution {
    Local,
    ExplicitBridge { reason: String },
    Bridge { target: Option<SymbolMatch> },
    Stdlib,
    Qualified,
    Builtin,
    Probabilistic(SymbolMatch),
    Unresolved,
}

impl Resolution {
    pub fn is_resolved(&self) -> bool {
        !matches!(self, Resolution::Unresolved)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UnresolvedReference {
    pub file: String,
    pub module: String,
    pub language: String,
    pub reference: Reference,
    pub confidence: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UnusedImport {
    pub file: String,
    pub language: String,
    pub module: String,
    /// The alias, item or base name the import bound.
    pub name: String,
    pub location: Location,
    pub confidence: ConfidenceTier,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BindingKind<'a> {
    Alias,
    Item { original: &'a str },
    Base,
    Full,
}

/// A name an import makes visible in the importing file.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Binding<'a> {
    pub name: &'a str,
    pub slot: usize,
    pub kind: BindingKind<'a>,
    import: &'a Import,
}

impl<'a> Binding<'a> {
    fn new(name: &'a str, slot: usize, kind: BindingKind<'a>, import: &'a Import) -> Self {
        Self {
            name,
            slot,
            kind,
            import,
        }
    }

    fn is_explicit(&self) -> bool {
        matches!(self.kind, BindingKind::Alias | BindingKind::Item { .. })
    }
}

fn bindings_for(slot: usize, import: &Import) -> Vec<Binding<'_>> {
    let alias = import.alias.as_deref().map(str::trim).filter(|alias| !alias.is_empty());
    if matches!(alias, Some("_") | Some(".")) || import.module.trim().is_empty() {
        return Vec::new();
    }
    if import.items.iter().any(|item| item.trim() == "*") {
        return Vec::new();
    }

    let mut bindings: Vec<Binding<'_>> = import
        .item_bindings()
        .map(|(original, bound)| Binding::new(bound, slot, BindingKind::Item { original }, import))
        .collect();
    if let Some(alias) = alias {
        bindings.push(Binding::new(alias, slot, BindingKind::Alias, import));
    }
    if bindings.is_empty() {
        let full = import.module.trim();
        let base = import.base_name();
        bindings.push(Binding::new(base, slot, BindingKind::Base, import));
        if full != base {
            bindings.push(Binding::new(full, slot, BindingKind::Full, import));
        }
    }
    bindings
}

/// Per-file view the pipeline stages share.
pub(crate) struct FileContext<'a> {
    pub file: &'a FileFacts,
    pub module: &'a str,
    pub language: Language,
    locals: HashSet<&'a str>,
    bindings: Vec<Binding<'a>>,
    own: Option<&'a Module>,
}

impl<'a> FileContext<'a> {
    pub fn same_language(&self, other: &str) -> bool {
        let other = other.trim();
        if self.file.language.trim().eq_ignore_ascii_case(other) {
            return true;
        }
        self.language != Language::Other && Language::from_name(other) == self.language
    }

    pub fn is_local(&self, name: &str) -> bool {
        self.locals.contains(name)
    }

    pub fn module_defines(&self, name: &str) -> bool {
        self.own
            .is_some_and(|module| module.definitions.contains_key(name))
    }

    pub fn bindings(&self) -> &[Binding<'a>] {
        &self.bindings
    }

    pub fn bindings_named<'s>(&'s self, name: &'s str) -> impl Iterator<Item = &'s Binding<'a>> + 's {
        self.bindings
            .iter()
            .filter(move |binding| binding.name == name)
    }

    pub fn import(&self, binding: &Binding<'a>) -> &'a Import {
        binding.import
    }
}

/// Strips leading pointer, reference and decorator sigils.
pub(crate) fn strip_sigils(name: &str) -> &str {
    name.trim().trim_start_matches(SIGILS).trim_start()
}

/// The identifier a reference starts with: `a` for `a.b.c()`, `a::b` and `a[0]`.
pub(crate) fn leading_identifier(name: &str) -> &str {
    let end = name
        .find(|c: char| !(c.is_alphanumeric() || c == '_' || c == '$'))
        .unwrap_or(name.len());
    &name[..end]
}

/// Last non-empty segment after splitting on separators, brackets and parens.
pub(crate) fn leaf_segment(name: &str) -> Option<&str> {
    name.split(|c: char| {
        matches!(
            c,
            '.' | ':' | '/' | '(' | ')' | '[' | ']' | '<' | '>' | '-'
        )
    })
    .map(str::trim)
    .filter(|segment| !segment.is_empty())
    .last()
}

/// The remainder of `name` after `prefix` and a separator. A call or index on
/// the prefix itself yields an empty remainder.
fn strip_qualifier<'n>(name: &'n str, prefix: &str) -> Option<&'n str> {
    if prefix.is_empty() {
        return None;
    }
    let rest = name.strip_prefix(prefix)?;
    if rest.is_empty() || rest.starts_with(&['(', '['][..]) {
        return Some("");
    }
    let trimmed = rest.trim_start_matches(SEPARATORS);
    if trimmed.len() == rest.len() {
        None
    } else {
        Some(trimmed)
    }
}

fn build_excluded(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = GlobBuilder::new(pattern)
            .literal_separator(false)
            .build()
            .map_err(|err| Error::Config(format!("invalid excluded pattern `{pattern}`: {err}")))?;
        builder.add(glob);
    }
    builder
        .build()
        .map_err(|err| Error::Config(format!("invalid excluded patterns: {err}")))
}

/// Resolves references against a snapshot of the graph taken at construction.
/// Later graph mutations are not observed.
pub struct Resolver {
    files: Vec<FileFacts>,
    modules: BTreeMap<String, Module>,
    symbols: UniversalSymbolTable,
    bridges: BridgeRegistry,
    excluded: GlobSet,
    config: ResolverConfig,
}

impl Resolver {
    pub fn new(graph: &Graph) -> Self {
        let snapshot = graph.snapshot();
        Self {
            symbols: UniversalSymbolTable::from_definitions(&snapshot.definitions()),
            files: snapshot.files,
            modules: snapshot.modules,
            bridges: BridgeRegistry::default(),
            excluded: GlobSet::empty(),
            config: ResolverConfig::default(),
        }
    }

    pub fn with_config(graph: &Graph, config: &ProjectConfig) -> Result<Self> {
        let mut resolver = Self::new(graph);
        resolver.bridges = BridgeRegistry::from_config(&config.bridges)?;
        resolver.excluded = build_excluded(&config.resolver.excluded_patterns)?;
        resolver.config = config.resolver.clone();
        tracing::debug!(
            bridges = resolver.bridges.len(),
            excluded = config.resolver.excluded_patterns.len(),
            "resolver configured"
        );
        Ok(resolver)
    }

    pub fn symbols(&self) -> &UniversalSymbolTable {
        &self.symbols
    }

    pub fn files(&self) -> &[FileFacts] {
        &self.files
    }

    pub(crate) fn context<'a>(&'a self, file: &'a FileFacts) -> FileContext<'a> {
        let module = file.module_name();
        FileContext {
            file,
            module,
            language: Language::from_name(&file.language),
            locals: file.local_names.iter().map(|name| name.trim()).collect(),
            bindings: file
                .imports
                .iter()
                .enumerate()
                .flat_map(|(slot, import)| bindings_for(slot, import))
                .collect(),
            own: self.modules.get(module),
        }
    }

    /// Classifies one reference made in `file`.
    pub fn resolve(&self, file: &FileFacts, reference: &Reference) -> Resolution {
        let ctx = self.context(file);
        self.resolve_in(&ctx, reference)
    }

    fn resolve_in(&self, ctx: &FileContext<'_>, reference: &Reference) -> Resolution {
        let name = strip_sigils(&reference.name);
        if name.is_empty() {
            return Resolution::Local;
        }
        let head = leading_identifier(name);

        if self.is_local(ctx, head, name) {
            return Resolution::Local;
        }

        if let Some(bridge) = self.bridges.find(&ctx.file.language, ctx.module, reference) {
            return Resolution::ExplicitBridge {
                reason: bridge.reason.clone(),
            };
        }
        if let Some(context) = self.bridge_context(ctx, reference) {
            return Resolution::Bridge {
                target: self.probabilistic_match(ctx, name, context),
            };
        }

        if ctx.language.is_stdlib(head, name) {
            return Resolution::Stdlib;
        }
        if self.resolve_qualified(ctx, head, name) {
            return Resolution::Qualified;
        }
        if ctx.language.is_builtin(head, name) {
            return Resolution::Builtin;
        }

        match self.probabilistic_match(ctx, name, reference.context) {
            Some(found) => Resolution::Probabilistic(found),
            None => Resolution::Unresolved,
        }
    }

    fn is_local(&self, ctx: &FileContext<'_>, head: &str, name: &str) -> bool {
        ctx.is_local(head)
            || ctx.is_local(name)
            || languages::SELF_RECEIVERS.contains(&head)
            || self.excluded.is_match(name)
            || (!head.is_empty() && self.excluded.is_match(head))
    }

    /// Bridge kind of a reference: its own tag, or a heuristic call prefix.
    pub(crate) fn bridge_context(
        &self,
        ctx: &FileContext<'_>,
        reference: &Reference,
    ) -> Option<ReferenceContext> {
        if reference.context.is_bridge() {
            return Some(reference.context);
        }
        ctx.language.bridge_hint(strip_sigils(&reference.name))
    }

    fn resolve_qualified(&self, ctx: &FileContext<'_>, head: &str, name: &str) -> bool {
        if ctx.module_defines(head) || ctx.module_defines(name) {
            return true;
        }
        if let Some(rest) = strip_qualifier(name, ctx.module) {
            if self.module_member(ctx, ctx.module, rest) {
                return true;
            }
        }

        for binding in ctx.bindings() {
            let Some(rest) = strip_qualifier(name, binding.name) else {
                continue;
            };
            let target = binding.import.module.trim();
            let found = match binding.kind {
                BindingKind::Item { original } => {
                    self.module_member(ctx, target, original)
                }
                BindingKind::Alias | BindingKind::Base | BindingKind::Full => {
                    self.module_member(ctx, target, rest)
                }
            };
            if found {
                return true;
            }
        }

        // `import a.b` also makes `a.b.c.f` reachable through the full dotted path.
        ctx.file.imports.iter().any(|import| {
            let target = import.module.trim();
            strip_qualifier(name, target).is_some_and(|rest| self.module_member(ctx, target, rest))
        })
    }

    /// Whether `path` (member, chained calls allowed) names something in
    /// `module`. Unknown modules are external and trusted.
    fn module_member(&self, ctx: &FileContext<'_>, module: &str, path: &str) -> bool {
        let member = leading_identifier(path);
        if member.is_empty() {
            return true;
        }
        let Some(target) = self.modules.get(module) else {
            return true;
        };

        let visible = if module == ctx.module {
            target.definitions.contains_key(member)
        } else {
            target.exports.contains_key(member)
        };
        visible || self.has_submodule(module, member)
    }

    fn has_submodule(&self, module: &str, member: &str) -> bool {
        [".", "/", "::"]
            .iter()
            .any(|sep| self.modules.contains_key(&format!("{module}{sep}{member}")))
    }

    /// Unqualified misses are treated as local-tracking gaps and not reported.
    fn looks_qualified(ctx: &FileContext<'_>, head: &str, name: &str) -> bool {
        name.contains(SEPARATORS) || ctx.bindings_named(head).next().is_some()
    }

    /// Every qualified-looking reference no stage accepted, ordered by file
    /// and position.
    pub fn find_unresolved(&self) -> Vec<UnresolvedReference> {
        let mut unresolved: Vec<UnresolvedReference> = self
            .files
            .par_iter()
            .flat_map_iter(|file| {
                let ctx = self.context(file);
                file.references
                    .iter()
                    .filter(|reference| {
                        let name = strip_sigils(&reference.name);
                        !self.resolve_in(&ctx, reference).is_resolved()
                            && Self::looks_qualified(&ctx, leading_identifier(name), name)
                    })
                    .map(|reference| UnresolvedReference {
                        file: file.path.clone(),
                        module: ctx.module.to_string(),
                        language: file.language.clone(),
                        reference: reference.clone(),
                        confidence: reference.context.confidence(),
                    })
                    .collect::<Vec<_>>()
            })
            .collect();

        unresolved.sort_by(|a, b| {
            a.file
                .cmp(&b.file)
                .then_with(|| a.reference.location.cmp(&b.reference.location))
                .then_with(|| a.reference.name.cmp(&b.reference.name))
        });
        tracing::info!(
            files = self.files.len(),
            unresolved = unresolved.len(),
            "reference resolution finished"
        );
        unresolved
    }

    /// Imports none of whose bound names any reference uses.
    pub fn find_unused_imports(&self) -> Vec<UnusedImport> {
        let mut unused: Vec<UnusedImport> = self
            .files
            .par_iter()
            .flat_map_iter(|file| self.unused_in(file))
            .collect();

        unused.sort_by(|a, b| {
            a.file
                .cmp(&b.file)
                .then_with(|| a.location.cmp(&b.location))
                .then_with(|| a.name.cmp(&b.name))
        });
        tracing::info!(unused = unused.len(), "unused import scan finished");
        unused
    }

    fn unused_in(&self, file: &FileFacts) -> Vec<UnusedImport> {
        let ctx = self.context(file);
        let names: Vec<&str> = file
            .references
            .iter()
            .map(|reference| strip_sigils(&reference.name))
            .collect();
        let bridged = file
            .references
            .iter()
            .any(|reference| reference.context.is_bridge());
        let used = |bound: &str| {
            names
                .iter()
                .any(|name| leading_identifier(name) == bound || strip_qualifier(name, bound).is_some())
        };

        let mut report = Vec::new();
        let mut slots: BTreeMap<usize, Vec<&Binding<'_>>> = BTreeMap::new();
        for binding in ctx.bindings() {
            slots.entry(binding.slot).or_default().push(binding);
        }

        for bindings in slots.into_values() {
            let Some(import) = bindings.first().map(|binding| binding.import) else {
                continue;
            };
            // Item lists are reported per item; other bindings stand or fall together.
            let groups: Vec<Vec<&Binding<'_>>> = if bindings
                .iter()
                .any(|binding| matches!(binding.kind, BindingKind::Item { .. }))
            {
                bindings.into_iter().map(|binding| vec![binding]).collect()
            } else {
                vec![bindings]
            };

            for group in groups {
                if group.iter().any(|binding| used(binding.name)) {
                    continue;
                }
                let Some(first) = group.first() else {
                    continue;
                };
                let mentioned = group
                    .iter()
                    .any(|binding| names.iter().any(|name| name.contains(binding.name)));
                let confidence = if mentioned || bridged {
                    ConfidenceTier::Low
                } else if first.is_explicit() {
                    ConfidenceTier::High
                } else {
                    ConfidenceTier::Medium
                };
                report.push(UnusedImport {
                    file: file.path.clone(),
                    language: file.language.clone(),
                    module: import.module.trim().to_string(),
                    name: first.name.to_string(),
                    location: import.location,
                    confidence,
                });
            }
        }
        report
    }

    /// Assessments for every reference that carries a bridge hint or matches
    /// a declared bridge.
    pub fn find_probable_bridges(&self) -> Vec<BridgeAssessment> {
        let mut assessments: Vec<BridgeAssessment> = self
            .files
            .par_iter()
            .flat_map_iter(|file| {
                let ctx = self.context(file);
                file.references
                    .iter()
                    .filter(|reference| {
                        self.bridge_context(&ctx, reference).is_some()
                            || self
                                .bridges
                                .find(&file.language, ctx.module, reference)
                                .is_some()
                    })
                    .map(|reference| self.assess_in(&ctx, reference))
                    .collect::<Vec<_>>()
            })
            .collect();

        assessments.sort_by(|a, b| {
            a.file
                .cmp(&b.file)
                .then_with(|| a.reference.location.cmp(&b.reference.location))
                .then_with(|| a.reference.name.cmp(&b.reference.name))
        });
        assessments
    }
}
