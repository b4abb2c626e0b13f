#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    missing_docs,
    rust_2018_idioms
)]

//! Diagnosis suggestion: given observed phenotypes, rank plausible disorders.

/// Ranking capability consumed by the service.
#[path = "../ranker.rs"]
pub mod ranker;

/// Information-content based reference ranker.
#[path = "../engine.rs"]
pub mod engine;

/// Input resolution, ordering and truncation around a ranker.
#[path = "../service.rs"]
pub mod service;

/// In-process entry point for script callers.
#[path = "../script.rs"]
pub mod script;

pub use engine::InformationContentRanker;
pub use ranker::{DiagnosisRanker, ScoredDiagnosis};
pub use script::DiagnosisScriptService;
pub use service::{DiagnosisService, ResolvedPhenotypes};

#[cfg(test)]
#[path = "../fixtures.rs"]
mod fixtures;
