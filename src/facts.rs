use serde::{Deserialize, Serialize};

/// Module name used for files that arrive without one.
pub const DEFAULT_MODULE: &str = ".";

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Location {
    pub line: u32,
    pub column: u32,
}

impl Location {
    pub fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }

    pub fn line(line: u32) -> Self {
        Self { line, column: 0 }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum DefinitionKind {
    Function,
    Method,
    Class,
    Type,
    Interface,
    Variable,
    Constant,
}

impl DefinitionKind {
    pub fn is_callable(self) -> bool {
        matches!(self, DefinitionKind::Function | DefinitionKind::Method)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DefinitionKind::Function => "function",
            DefinitionKind::Method => "method",
            DefinitionKind::Class => "class",
            DefinitionKind::Type => "type",
            DefinitionKind::Interface => "interface",
            DefinitionKind::Variable => "variable",
            DefinitionKind::Constant => "constant",
        }
    }
}

/// Raw complexity inputs for a definition. `score` is filled by the extractor
/// when it already knows the answer; otherwise the graph derives one.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ComplexityMetrics {
    #[serde(default)]
    pub branches: u32,
    #[serde(default)]
    pub nesting: u32,
    #[serde(default)]
    pub params: u32,
    #[serde(default)]
    pub loc: u32,
    #[serde(default)]
    pub score: Option<u32>,
}

impl ComplexityMetrics {
    /// Precomputed score, or `branches*2 + nesting*2 + params + loc/10`
    /// clamped to at least 1. Saturates at `u32::MAX`.
    pub fn effective_score(&self) -> u32 {
        if let Some(score) = self.score {
            return score;
        }
        let derived = self
            .branches
            .saturating_mul(2)
            .saturating_add(self.nesting.saturating_mul(2))
            .saturating_add(self.params)
            .saturating_add(self.loc / 10);
        derived.max(1)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Definition {
    pub name: String,
    #[serde(default)]
    pub qualified_name: String,
    pub kind: DefinitionKind,
    #[serde(default)]
    pub location: Location,
    #[serde(default)]
    pub exported: bool,
    #[serde(default)]
    pub visibility: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
    #[serde(default)]
    pub signature: Option<String>,
    #[serde(default)]
    pub type_hint: Option<String>,
    #[serde(default)]
    pub decorators: Vec<String>,
    #[serde(default)]
    pub complexity: ComplexityMetrics,
}

impl Definition {
    pub fn new(name: &str, kind: DefinitionKind) -> Self {
        Self {
            name: name.to_string(),
            qualified_name: name.to_string(),
            kind,
            location: Location::default(),
            exported: false,
            visibility: None,
            scope: None,
            signature: None,
            type_hint: None,
            decorators: Vec::new(),
            complexity: ComplexityMetrics::default(),
        }
    }

    pub fn exported(mut self) -> Self {
        self.exported = true;
        self.visibility = Some("public".to_string());
        self
    }

    pub fn with_qualified_name(mut self, qualified_name: &str) -> Self {
        self.qualified_name = qualified_name.to_string();
        self
    }

    pub fn with_location(mut self, line: u32) -> Self {
        self.location = Location::line(line);
        self
    }

    pub fn with_signature(mut self, signature: &str) -> Self {
        self.signature = Some(signature.to_string());
        self
    }

    pub fn with_type_hint(mut self, type_hint: &str) -> Self {
        self.type_hint = Some(type_hint.to_string());
        self
    }

    pub fn with_decorator(mut self, decorator: &str) -> Self {
        self.decorators.push(decorator.to_string());
        self
    }

    pub fn with_complexity(mut self, complexity: ComplexityMetrics) -> Self {
        self.complexity = complexity;
        self
    }

    pub fn with_score(mut self, score: u32) -> Self {
        self.complexity.score = Some(score);
        self
    }

    pub fn complexity_score(&self) -> u32 {
        self.complexity.effective_score()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Import {
    pub module: String,
    #[serde(default)]
    pub raw: String,
    #[serde(default)]
    pub alias: Option<String>,
    #[serde(default)]
    pub items: Vec<String>,
    #[serde(default)]
    pub relative: bool,
    #[serde(default)]
    pub location: Location,
}

impl Import {
    pub fn new(module: &str) -> Self {
        Self {
            module: module.to_string(),
            raw: module.to_string(),
            ..Self::default()
        }
    }

    pub fn with_alias(mut self, alias: &str) -> Self {
        self.alias = Some(alias.to_string());
        self
    }

    pub fn with_items(mut self, items: &[&str]) -> Self {
        self.items = items.iter().map(|item| item.to_string()).collect();
        self
    }

    pub fn with_location(mut self, line: u32) -> Self {
        self.location = Location::line(line);
        self
    }

    /// Last path segment of the imported module (`a/b/c`, `a.b.c`, `a::b::c` -> `c`).
    pub fn base_name(&self) -> &str {
        self.module
            .rsplit(&['.', '/', ':', '\\'][..])
            .find(|segment| !segment.is_empty())
            .unwrap_or(self.module.as_str())
    }

    /// Names bound in the importing file by an item list, honoring `Y as Z`.
    pub fn item_bindings(&self) -> impl Iterator<Item = (&str, &str)> {
        self.items.iter().filter_map(|item| {
            let item = item.trim();
            if item.is_empty() || item == "*" {
                return None;
            }
            match item.split_once(" as ") {
                Some((original, bound)) => Some((original.trim(), bound.trim())),
                None => Some((item, item)),
            }
        })
    }
}

/// What a reference is used for. Bridge tags come from extractors that
/// recognised an FFI call, a spawned process, or an RPC/service client.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(from = "String", into = "String")]
pub enum ReferenceContext {
    #[default]
    None,
    FfiBridge,
    ProcessBridge,
    ServiceBridge,
    TypeUsage,
    Call,
    Definition,
}

impl ReferenceContext {
    pub fn as_str(self) -> &'static str {
        match self {
            ReferenceContext::None => "",
            ReferenceContext::FfiBridge => "ffi_bridge",
            ReferenceContext::ProcessBridge => "process_bridge",
            ReferenceContext::ServiceBridge => "service_bridge",
            ReferenceContext::TypeUsage => "type",
            ReferenceContext::Call => "call",
            ReferenceContext::Definition => "definition",
        }
    }

    pub fn is_bridge(self) -> bool {
        matches!(
            self,
            ReferenceContext::FfiBridge
                | ReferenceContext::ProcessBridge
                | ReferenceContext::ServiceBridge
        )
    }

    /// How much an unresolved reference with this tag is worth trusting.
    pub fn confidence(self) -> f32 {
        match self {
            ReferenceContext::Definition => 0.95,
            ReferenceContext::Call => 0.9,
            ReferenceContext::TypeUsage => 0.85,
            ReferenceContext::None => 0.8,
            ReferenceContext::ServiceBridge => 0.7,
            ReferenceContext::FfiBridge => 0.6,
            ReferenceContext::ProcessBridge => 0.5,
        }
    }
}

impl From<String> for ReferenceContext {
    fn from(tag: String) -> Self {
        match tag.as_str() {
            "ffi_bridge" => ReferenceContext::FfiBridge,
            "process_bridge" => ReferenceContext::ProcessBridge,
            "service_bridge" => ReferenceContext::ServiceBridge,
            "type" => ReferenceContext::TypeUsage,
            "call" => ReferenceContext::Call,
            "definition" => ReferenceContext::Definition,
            _ => ReferenceContext::None,
        }
    }
}

impl From<ReferenceContext> for String {
    fn from(context: ReferenceContext) -> Self {
        context.as_str().to_string()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Reference {
    pub name: String,
    #[serde(default)]
    pub location: Location,
    #[serde(default)]
    pub context: ReferenceContext,
}

impl Reference {
    pub fn new(name: &str, line: u32) -> Self {
        Self {
            name: name.to_string(),
            location: Location::line(line),
            context: ReferenceContext::None,
        }
    }

    pub fn with_context(mut self, context: ReferenceContext) -> Self {
        self.context = context;
        self
    }
}

/// Structural facts extracted from one source file.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct FileFacts {
    pub path: String,
    #[serde(default)]
    pub module: String,
    #[serde(default)]
    pub language: String,
    #[serde(default)]
    pub package: Option<String>,
    #[serde(default)]
    pub imports: Vec<Import>,
    #[serde(default)]
    pub definitions: Vec<Definition>,
    #[serde(default)]
    pub references: Vec<Reference>,
    #[serde(default)]
    pub local_names: Vec<String>,
}

impl FileFacts {
    pub fn new(path: &str, module: &str, language: &str) -> Self {
        Self {
            path: path.to_string(),
            module: module.to_string(),
            language: language.to_string(),
            ..Self::default()
        }
    }

    pub fn with_import(mut self, import: Import) -> Self {
        self.imports.push(import);
        self
    }

    pub fn with_definition(mut self, definition: Definition) -> Self {
        self.definitions.push(definition);
        self
    }

    pub fn with_reference(mut self, reference: Reference) -> Self {
        self.references.push(reference);
        self
    }

    pub fn with_local(mut self, name: &str) -> Self {
        self.local_names.push(name.to_string());
        self
    }

    /// Owning module, falling back to [`DEFAULT_MODULE`].
    pub fn module_name(&self) -> &str {
        let module = self.module.trim();
        if module.is_empty() {
            DEFAULT_MODULE
        } else {
            module
        }
    }
}
