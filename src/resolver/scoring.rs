use serde::{Deserialize, Serialize};

use super::{leaf_segment, leading_identifier, strip_sigils, ConfidenceTier, FileContext, Resolver};
use crate::facts::{FileFacts, Reference, ReferenceContext};
use crate::symbols::{canonicalize, service_key, SymbolRecord};

/// Required lead of the best candidate over the runner-up.
pub const MIN_MARGIN: i32 = 2;

const EXACT_NAME: i32 = 8;
const LEAF_NAME: i32 = 6;
const QUALIFIED_NAME: i32 = 6;
const QUALIFIED_LEAF: i32 = 4;
const SAME_MODULE: i32 = 5;
const SAME_LANGUAGE: i32 = 2;
const PUBLIC: i32 = 1;
const IMPORT_ALIAS: i32 = 4;
const SERVICE_ALIGNMENT: i32 = 5;
const FFI_PLAIN_TARGET: i32 = 1;
const CROSS_LANGUAGE: i32 = 2;

/// Minimum winning score for a reference used in `context`.
pub fn acceptance_threshold(context: ReferenceContext) -> i32 {
    match context {
        ReferenceContext::FfiBridge | ReferenceContext::ProcessBridge => 7,
        ReferenceContext::ServiceBridge => 6,
        _ => 8,
    }
}

/// The definition a reference was matched to, with the winning score.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SymbolMatch {
    pub module: String,
    pub name: String,
    pub file: String,
    pub language: String,
    pub score: i32,
}

impl SymbolMatch {
    fn from_record(record: &SymbolRecord, score: i32) -> Self {
        Self {
            module: record.module.clone(),
            name: record.name.clone(),
            file: record.file.clone(),
            language: record.language.clone(),
            score,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum BridgeEvidence {
    ExplicitBridge,
    ContextTag,
    ImportEvidence,
    UniqueCrossLanguageCandidate,
    AmbiguousCandidates,
    LocalConflict,
    StdlibConflict,
}

impl BridgeEvidence {
    pub fn weight(self) -> i32 {
        match self {
            BridgeEvidence::ExplicitBridge => 10,
            BridgeEvidence::ContextTag => 4,
            BridgeEvidence::ImportEvidence => 3,
            BridgeEvidence::UniqueCrossLanguageCandidate => 2,
            BridgeEvidence::AmbiguousCandidates => -2,
            BridgeEvidence::LocalConflict => -4,
            BridgeEvidence::StdlibConflict => -3,
        }
    }
}

/// How likely a reference is to cross a language boundary. Reporting only;
/// it never decides whether the reference resolves.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BridgeAssessment {
    pub file: String,
    pub reference: Reference,
    pub score: i32,
    pub tier: ConfidenceTier,
    pub evidence: Vec<BridgeEvidence>,
    pub bridge_reason: Option<String>,
}

impl Resolver {
    /// Canonical lookup on the whole name, then on its leaf; service
    /// references also pull in everything sharing the leaf's service key.
    pub(crate) fn gather_candidates(&self, name: &str, context: ReferenceContext) -> Vec<usize> {
        let stripped = strip_sigils(name);
        let leaf = leaf_segment(stripped).unwrap_or(stripped);

        let mut candidates: Vec<usize> = self.symbols.canonical_indices(&canonicalize(stripped)).to_vec();
        if candidates.is_empty() {
            candidates = self.symbols.canonical_indices(&canonicalize(leaf)).to_vec();
        }
        if context == ReferenceContext::ServiceBridge {
            for &idx in self.symbols.service_indices(&service_key(leaf)) {
                if !candidates.contains(&idx) {
                    candidates.push(idx);
                }
            }
        }
        candidates
    }

    pub(crate) fn score_candidate(
        &self,
        ctx: &FileContext<'_>,
        name: &str,
        context: ReferenceContext,
        record: &SymbolRecord,
    ) -> i32 {
        let stripped = strip_sigils(name);
        let leaf = leaf_segment(stripped).unwrap_or(stripped);
        let canonical_name = canonicalize(stripped);
        let canonical_leaf = canonicalize(leaf);
        let canonical_qualified = canonicalize(&record.qualified_name);
        let qualified_leaf = leaf_segment(&record.qualified_name)
            .map(canonicalize)
            .unwrap_or_default();

        let mut score = 0;
        if record.canonical == canonical_name {
            score += EXACT_NAME;
        }
        if record.canonical == canonical_leaf {
            score += LEAF_NAME;
        }
        if !canonical_qualified.is_empty() && canonical_qualified == canonical_name {
            score += QUALIFIED_NAME;
        }
        if !qualified_leaf.is_empty() && qualified_leaf == canonical_leaf {
            score += QUALIFIED_LEAF;
        }
        if record.module == ctx.module {
            score += SAME_MODULE;
        }
        if ctx.same_language(&record.language) {
            score += SAME_LANGUAGE;
        }
        if record.is_public() {
            score += PUBLIC;
        }

        let head = leading_identifier(stripped);
        if ctx
            .bindings_named(head)
            .any(|binding| ctx.import(binding).module.trim() == record.module)
        {
            score += IMPORT_ALIAS;
        }

        match context {
            ReferenceContext::ServiceBridge if record.is_service => score += SERVICE_ALIGNMENT,
            ReferenceContext::FfiBridge | ReferenceContext::ProcessBridge if !record.is_service => {
                score += FFI_PLAIN_TARGET
            }
            _ => {}
        }

        if context.is_bridge() && !ctx.same_language(&record.language) {
            score += CROSS_LANGUAGE;
        }

        score
    }

    /// Best-scoring candidate, provided it clears the threshold for
    /// `context` and leads the runner-up by at least [`MIN_MARGIN`].
    pub(crate) fn probabilistic_match(
        &self,
        ctx: &FileContext<'_>,
        name: &str,
        context: ReferenceContext,
    ) -> Option<SymbolMatch> {
        let mut scored: Vec<(i32, &SymbolRecord)> = self
            .gather_candidates(name, context)
            .into_iter()
            .filter_map(|idx| self.symbols.record(idx))
            .map(|record| (self.score_candidate(ctx, name, context, record), record))
            .collect();

        scored.sort_by(|(score_a, a), (score_b, b)| {
            score_b
                .cmp(score_a)
                .then_with(|| a.module.cmp(&b.module))
                .then_with(|| a.name.cmp(&b.name))
                .then_with(|| a.file.cmp(&b.file))
        });

        let (best_score, best) = *scored.first()?;
        if best_score < acceptance_threshold(context) {
            return None;
        }
        if let Some(&(runner_up, _)) = scored.get(1) {
            if best_score - runner_up < MIN_MARGIN {
                tracing::debug!(
                    reference = %name,
                    best = best_score,
                    runner_up,
                    "ambiguous candidates, declining to resolve"
                );
                return None;
            }
        }
        Some(SymbolMatch::from_record(best, best_score))
    }

    /// Weigh the evidence that `reference` in `file` crosses a language boundary.
    pub fn assess_bridge_reference(&self, file: &FileFacts, reference: &Reference) -> BridgeAssessment {
        let ctx = self.context(file);
        self.assess_in(&ctx, reference)
    }

    pub(crate) fn assess_in(
        &self,
        ctx: &FileContext<'_>,
        reference: &Reference,
    ) -> BridgeAssessment {
        let stripped = strip_sigils(&reference.name);
        let head = leading_identifier(stripped);
        let leaf = leaf_segment(stripped).unwrap_or(stripped);
        let mut evidence = Vec::new();

        let explicit = self.bridges.find(&ctx.file.language, ctx.module, reference);
        if explicit.is_some() {
            evidence.push(BridgeEvidence::ExplicitBridge);
        }
        if reference.context.is_bridge() {
            evidence.push(BridgeEvidence::ContextTag);
        }
        if ctx.bindings_named(head).next().is_some() {
            evidence.push(BridgeEvidence::ImportEvidence);
        }

        let context = self.bridge_context(ctx, reference).unwrap_or(reference.context);
        let cross_language = self
            .gather_candidates(&reference.name, context)
            .into_iter()
            .filter_map(|idx| self.symbols.record(idx))
            .filter(|record| !ctx.same_language(&record.language))
            .count();
        match cross_language {
            0 => {}
            1 => evidence.push(BridgeEvidence::UniqueCrossLanguageCandidate),
            _ => evidence.push(BridgeEvidence::AmbiguousCandidates),
        }

        if ctx.is_local(head) || ctx.module_defines(head) || ctx.module_defines(leaf) {
            evidence.push(BridgeEvidence::LocalConflict);
        }
        if ctx.language.is_stdlib(head, stripped) {
            evidence.push(BridgeEvidence::StdlibConflict);
        }

        let score = evidence.iter().map(|item| item.weight()).sum();
        BridgeAssessment {
            file: ctx.file.path.clone(),
            reference: reference.clone(),
            score,
            tier: ConfidenceTier::from_score(
                score,
                self.config.high_confidence_threshold,
                self.config.medium_confidence_threshold,
            ),
            evidence,
            bridge_reason: explicit.map(|bridge| bridge.reason.clone()),
        }
    }
}
