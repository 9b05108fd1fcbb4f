//! # POLYDEP
//!
//! Cross-language dependency graph engine for static analysis.
//!
//! POLYDEP consumes per-file facts (imports, definitions, references) produced by
//! language extractors and maintains an incrementally updated module graph.
//!
//! ## Queries
//!
//! - **Cycles**: import cycles, shortest import chains, transitive invalidation
//! - **Metrics**: fan-in/fan-out, SCC-aware depth, complexity hotspots
//! - **Impact**: direct and transitive importers of a file or module
//! - **Resolution**: unresolved references, unused imports and probable
//!   cross-language bridges (FFI, subprocess, RPC)
//!
//! ## Supported Languages
//!
//! Python, Go, Rust, TypeScript, JavaScript, Java, C, C++, C#

pub mod config;
pub mod core;
pub mod error;
pub mod facts;
pub mod resolver;
pub mod symbols;

pub use crate::config::ProjectConfig;
pub use crate::core::{FactStore, FileLoader, Graph, ImpactReport, ModuleMetrics};
pub use crate::error::{Error, ErrorKind, Result};
pub use crate::facts::{
    Definition, DefinitionKind, FileFacts, Import, Location, Reference, ReferenceContext,
};
pub use crate::resolver::{
    ConfidenceTier, Resolution, Resolver, UnresolvedReference, UnusedImport,
};
pub use crate::symbols::UniversalSymbolTable;
