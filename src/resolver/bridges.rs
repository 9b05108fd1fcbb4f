use globset::{GlobBuilder, GlobMatcher};

use crate::config::BridgeConfig;
use crate::error::{Error, Result};
use crate::facts::Reference;
use crate::symbols::canonicalize;

/// One side of a bridge: `<language>:<module-pattern>`, `*` allowed in both parts.
#[derive(Debug, Clone)]
pub struct Endpoint {
    pub language: String,
    pub pattern: String,
    matcher: GlobMatcher,
}

impl Endpoint {
    pub fn parse(endpoint: &str) -> Result<Self> {
        let (language, pattern) = endpoint
            .split_once(':')
            .ok_or_else(|| Error::Config(format!("bridge endpoint `{endpoint}` lacks `<language>:`")))?;
        let language = language.trim().to_lowercase();
        let pattern = pattern.trim();
        if language.is_empty() || pattern.is_empty() {
            return Err(Error::Config(format!("bridge endpoint `{endpoint}` is incomplete")));
        }
        Ok(Self {
            language,
            pattern: pattern.to_string(),
            matcher: compile_glob(pattern)?,
        })
    }

    pub fn matches(&self, language: &str, module: &str) -> bool {
        (self.language == "*" || self.language.eq_ignore_ascii_case(language.trim()))
            && self.matcher.is_match(module)
    }

    /// Last concrete path segment of the module pattern, used when a bridge
    /// declares no reference patterns of its own.
    fn inferred_segment(&self) -> Option<String> {
        self.pattern
            .rsplit(&['.', '/', ':', '\\'][..])
            .map(|segment| canonicalize(&segment.replace('*', "")))
            .find(|segment| !segment.is_empty())
    }
}

#[derive(Debug, Clone)]
enum ReferencePattern {
    Literal(GlobMatcher),
    Inferred(String),
}

impl ReferencePattern {
    fn matches(&self, reference: &Reference) -> bool {
        match self {
            ReferencePattern::Literal(matcher) => {
                matcher.is_match(&reference.name)
                    || super::leaf_segment(&reference.name)
                        .is_some_and(|leaf| matcher.is_match(leaf))
            }
            ReferencePattern::Inferred(segment) => canonicalize(&reference.name).contains(segment),
        }
    }
}

/// A project-declared cross-language link.
#[derive(Debug, Clone)]
pub struct ExplicitBridge {
    pub source: Endpoint,
    pub target: Endpoint,
    pub reason: String,
    patterns: Vec<ReferencePattern>,
}

impl ExplicitBridge {
    pub fn from_config(config: &BridgeConfig) -> Result<Self> {
        let source = Endpoint::parse(&config.source)?;
        let target = Endpoint::parse(&config.target)?;

        let patterns = if config.references.is_empty() {
            target
                .inferred_segment()
                .map(ReferencePattern::Inferred)
                .into_iter()
                .collect()
        } else {
            config
                .references
                .iter()
                .map(|pattern| compile_glob(pattern).map(ReferencePattern::Literal))
                .collect::<Result<Vec<_>>>()?
        };

        Ok(Self {
            source,
            target,
            reason: config.reason.clone(),
            patterns,
        })
    }

    pub fn matches(&self, language: &str, module: &str, reference: &Reference) -> bool {
        self.source.matches(language, module)
            && self.patterns.iter().any(|pattern| pattern.matches(reference))
    }
}

#[derive(Debug, Clone, Default)]
pub struct BridgeRegistry {
    bridges: Vec<ExplicitBridge>,
}

impl BridgeRegistry {
    pub fn from_config(configs: &[BridgeConfig]) -> Result<Self> {
        let bridges = configs
            .iter()
            .map(ExplicitBridge::from_config)
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { bridges })
    }

    pub fn find(&self, language: &str, module: &str, reference: &Reference) -> Option<&ExplicitBridge> {
        self.bridges
            .iter()
            .find(|bridge| bridge.matches(language, module, reference))
    }

    pub fn len(&self) -> usize {
        self.bridges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bridges.is_empty()
    }
}

pub(crate) fn compile_glob(pattern: &str) -> Result<GlobMatcher> {
    GlobBuilder::new(pattern)
        .case_insensitive(true)
        .build()
        .map(|glob| glob.compile_matcher())
        .map_err(|err| Error::Config(format!("invalid pattern `{pattern}`: {err}")))
}
