//! Import, reconciliation and analysis services

pub mod analyzer;
pub mod import_orchestrator;
pub mod reconciler;

pub use analyzer::{analyze, AnalysisSummary, AnalyzeError};
pub use import_orchestrator::{ImportError, ImportOrchestrator, ImportSummary};
pub use reconciler::{ReconcileError, Reconciled, Reconciler};
