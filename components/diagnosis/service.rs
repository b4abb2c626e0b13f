use std::{
    cmp::Ordering,
    collections::{BTreeSet, HashMap},
    fmt,
    sync::Arc,
};

use phenotips_vocabulary::{LabelMatcher, TermId, Vocabulary, VocabularyTerm};
use serde::{Deserialize, Serialize};
use serde_json::json;
use shared_logging::{JsonLogger, LogLevel, LogRecord};

use crate::ranker::{DiagnosisRanker, ScoredDiagnosis};

const LOG_MODULE: &str = "diagnosis.service";

/// Outcome of mapping caller input onto the phenotype vocabulary.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedPhenotypes {
    /// Primary ids used as ranking input.
    pub ids: BTreeSet<String>,
    /// Standard ids that were malformed or unknown.
    pub dropped: Vec<String>,
    /// Free-text entries without a matching label.
    pub unmatched: Vec<String>,
}

/// Enforces the suggestion contract around an injected [`DiagnosisRanker`].
///
/// The service validates input terms and maps free text onto vocabulary labels. It
/// removes duplicate candidates and sorts by descending score, breaking ties on the
/// ascending term id. The result never has more than `limit` entries. It never
/// mutates anything.
#[derive(Clone)]
pub struct DiagnosisService {
    phenotypes: Arc<Vocabulary>,
    matcher: Arc<LabelMatcher>,
    ranker: Arc<dyn DiagnosisRanker>,
    logger: Option<Arc<JsonLogger>>,
}

impl fmt::Debug for DiagnosisService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DiagnosisService")
            .field("vocabulary", &self.phenotypes.name())
            .field("ranker", &self.ranker.name())
            .finish_non_exhaustive()
    }
}

impl DiagnosisService {
    /// Creates a service over the phenotype vocabulary and a ranking engine.
    #[must_use]
    pub fn new(phenotypes: Arc<Vocabulary>, ranker: Arc<dyn DiagnosisRanker>) -> Self {
        let matcher = Arc::new(LabelMatcher::new(&phenotypes));
        Self {
            phenotypes,
            matcher,
            ranker,
            logger: None,
        }
    }

    /// Replaces the free-text matcher.
    #[must_use]
    pub fn with_matcher(mut self, matcher: LabelMatcher) -> Self {
        self.matcher = Arc::new(matcher);
        self
    }

    /// Attaches a structured logger.
    #[must_use]
    pub fn with_logger(mut self, logger: Arc<JsonLogger>) -> Self {
        self.logger = Some(logger);
        self
    }

    /// Suggests at most `limit` diagnoses, most plausible first.
    #[must_use]
    pub fn suggest(
        &self,
        standard_terms: &[String],
        free_text_terms: &[String],
        limit: usize,
    ) -> Vec<VocabularyTerm> {
        self.suggest_scored(standard_terms, free_text_terms, limit)
            .into_iter()
            .map(|scored| scored.term)
            .collect()
    }

    /// Like [`Self::suggest`] but keeps the scores.
    #[must_use]
    pub fn suggest_scored(
        &self,
        standard_terms: &[String],
        free_text_terms: &[String],
        limit: usize,
    ) -> Vec<ScoredDiagnosis> {
        if limit == 0 {
            return Vec::new();
        }
        let resolved = self.resolve(standard_terms, free_text_terms);
        let results = if resolved.ids.is_empty() {
            Vec::new()
        } else {
            finalize(self.ranker.rank(&resolved.ids, limit), limit)
        };
        self.log(
            LogLevel::Debug,
            "diagnosis.suggest",
            json!({
                "ranker": self.ranker.name(),
                "standard": standard_terms.len(),
                "free_text": free_text_terms.len(),
                "resolved": resolved.ids.len(),
                "dropped": resolved.dropped,
                "unmatched": resolved.unmatched.len(),
                "limit": limit,
                "results": results.len(),
            }),
        );
        results
    }

    /// Maps standard ids and free text onto primary phenotype ids.
    ///
    /// Alternative ids resolve to their primary term. Obsolete terms follow their
    /// first `replaced_by` pointer when it resolves; otherwise they are dropped.
    #[must_use]
    pub fn resolve(&self, standard_terms: &[String], free_text_terms: &[String]) -> ResolvedPhenotypes {
        let mut resolved = ResolvedPhenotypes::default();
        for raw in standard_terms {
            match self.resolve_standard(raw) {
                Some(id) => {
                    resolved.ids.insert(id);
                }
                None => resolved.dropped.push(raw.clone()),
            }
        }
        for text in free_text_terms {
            match self.matcher.best_match(text) {
                Some(hit) => {
                    resolved.ids.insert(hit.id);
                }
                None => resolved.unmatched.push(text.clone()),
            }
        }
        resolved
    }

    fn resolve_standard(&self, raw: &str) -> Option<String> {
        let id = TermId::parse(raw).ok()?;
        let term = self.phenotypes.get(id.as_str())?;
        if !term.obsolete {
            return Some(term.id.clone());
        }
        term.values("replaced_by")
            .first()
            .and_then(|replacement| self.phenotypes.get(replacement))
            .filter(|replacement| !replacement.obsolete)
            .map(|replacement| replacement.id.clone())
    }

    fn log(&self, level: LogLevel, message: &str, fields: serde_json::Value) {
        if let Some(logger) = &self.logger {
            let _ = logger.log(&LogRecord::new(LOG_MODULE, level, message).with_fields(&fields));
        }
    }
}

/// Drops non-positive and non-finite scores, keeps the best score per term, orders and truncates.
fn finalize(ranked: Vec<ScoredDiagnosis>, limit: usize) -> Vec<ScoredDiagnosis> {
    let mut best: HashMap<String, ScoredDiagnosis> = HashMap::new();
    for candidate in ranked
        .into_iter()
        .filter(|candidate| candidate.score.is_finite() && candidate.score > 0.0)
    {
        match best.get(&candidate.term.id) {
            Some(existing) if existing.score >= candidate.score => {}
            _ => {
                best.insert(candidate.term.id.clone(), candidate);
            }
        }
    }
    let mut ordered: Vec<ScoredDiagnosis> = best.into_values().collect();
    ordered.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.term.id.cmp(&b.term.id))
    });
    ordered.truncate(limit);
    ordered
}
