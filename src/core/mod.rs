pub mod cache;
pub mod cycles;
pub mod graph;
pub mod impact;
pub mod metrics;

pub use cache::{FactStore, FileCache, FileLoader};
pub use graph::{DefinitionEntry, Graph, GraphSnapshot, ImportEdge, Module, ModuleGraph};
pub use impact::ImpactReport;
pub use metrics::{ComplexityEntry, ModuleMetrics};
