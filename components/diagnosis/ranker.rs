use std::collections::BTreeSet;

use phenotips_vocabulary::VocabularyTerm;
use serde::{Deserialize, Serialize};

/// A candidate disorder and its plausibility score (higher is more plausible).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredDiagnosis {
    /// Disease vocabulary term.
    pub term: VocabularyTerm,
    /// Plausibility; only positive finite scores are reported to callers.
    pub score: f64,
}

/// Anything able to rank disorders for a set of phenotype ids.
///
/// Implementations receive primary ids already validated against the phenotype
/// vocabulary. `limit` is a hint; ordering, de-duplication and truncation are
/// enforced again by [`crate::DiagnosisService`].
pub trait DiagnosisRanker: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Scores candidate disorders.
    fn rank(&self, phenotypes: &BTreeSet<String>, limit: usize) -> Vec<ScoredDiagnosis>;
}
