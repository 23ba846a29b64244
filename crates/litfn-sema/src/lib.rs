#![deny(clippy::unwrap_used)]
//! Semantic analysis of literal functions: scope construction, capture validation, label and
//! `__func__` rules, and folding of identical instances.

mod analyzer;
pub mod capture;
mod config;
pub mod dedup;
mod report;
pub mod scope;
mod session;
mod suggest;

#[cfg(test)]
mod scope_tests;

pub use analyzer::Analyzer;
pub use capture::{verdict, DeclClass, RegisterPolicy, Usage, Verdict};
pub use config::{AnalysisConfig, ConfigError};
pub use dedup::{InstanceTable, LiteralRef, UnitId};
pub use report::{ReferenceUse, ResolvedLiteral, UnitReport};
pub use scope::{DeclId, DeclKind, FrameId, ScopeId, ScopeKind, ScopeTree, Storage};
pub use session::{Session, SessionError};
