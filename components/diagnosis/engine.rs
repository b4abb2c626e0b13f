use std::{
    cmp::Ordering,
    collections::{BTreeSet, HashMap},
    sync::Arc,
};

use phenotips_vocabulary::{Vocabulary, VocabularyTerm, SYMPTOM_PROPERTY};

use crate::ranker::{DiagnosisRanker, ScoredDiagnosis};

#[derive(Debug, Clone)]
struct DiseaseProfile {
    term: VocabularyTerm,
    closure: BTreeSet<String>,
}

/// Ranks disorders by semantic similarity between the query phenotypes and each
/// disorder's annotated phenotypes.
///
/// A phenotype term `t` carries information content `IC(t) = ln(N / n(t))`, where `N`
/// is the number of annotated disorders and `n(t)` the number whose annotations
/// include `t` or a descendant of `t`. For every query term, the best shared ancestor
/// with the disorder's annotations contributes its IC. The score is the mean
/// contribution over query terms.
#[derive(Debug, Clone)]
pub struct InformationContentRanker {
    phenotypes: Arc<Vocabulary>,
    diseases: Vec<DiseaseProfile>,
    information_content: HashMap<String, f64>,
}

impl InformationContentRanker {
    /// Precomputes annotation closures and information content.
    ///
    /// Obsolete disorders and disorders without any resolvable annotation are ignored.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn new(phenotypes: Arc<Vocabulary>, diseases: &Vocabulary) -> Self {
        let profiles: Vec<DiseaseProfile> = diseases
            .terms()
            .filter(|term| !term.obsolete)
            .filter_map(|term| {
                let closure =
                    phenotypes.closure(term.values(SYMPTOM_PROPERTY).iter().map(String::as_str));
                (!closure.is_empty()).then(|| DiseaseProfile {
                    term: term.clone(),
                    closure,
                })
            })
            .collect();

        let mut counts: HashMap<&str, usize> = HashMap::new();
        for profile in &profiles {
            for id in &profile.closure {
                *counts.entry(id.as_str()).or_default() += 1;
            }
        }
        let total = profiles.len() as f64;
        let information_content = counts
            .into_iter()
            .map(|(id, count)| (id.to_string(), (total / count as f64).ln()))
            .collect();

        Self {
            phenotypes,
            diseases: profiles,
            information_content,
        }
    }

    /// Number of disorders that can be ranked.
    #[must_use]
    pub fn disease_count(&self) -> usize {
        self.diseases.len()
    }

    /// Information content of a phenotype term; `0.0` for unannotated terms.
    #[must_use]
    pub fn information_content(&self, id: &str) -> f64 {
        self.information_content.get(id).copied().unwrap_or(0.0)
    }

    fn best_shared(&self, query_ancestors: &BTreeSet<String>, profile: &DiseaseProfile) -> f64 {
        query_ancestors
            .iter()
            .filter(|id| profile.closure.contains(*id))
            .map(|id| self.information_content(id))
            .fold(0.0, f64::max)
    }
}

impl DiagnosisRanker for InformationContentRanker {
    fn name(&self) -> &str {
        "information-content"
    }

    #[allow(clippy::cast_precision_loss)]
    fn rank(&self, phenotypes: &BTreeSet<String>, limit: usize) -> Vec<ScoredDiagnosis> {
        let queries: Vec<BTreeSet<String>> = phenotypes
            .iter()
            .map(|id| self.phenotypes.ancestors(id))
            .filter(|ancestors| !ancestors.is_empty())
            .collect();
        if queries.is_empty() || limit == 0 {
            return Vec::new();
        }
        let query_count = queries.len() as f64;

        let mut scored: Vec<ScoredDiagnosis> = self
            .diseases
            .iter()
            .filter_map(|profile| {
                let total: f64 = queries
                    .iter()
                    .map(|ancestors| self.best_shared(ancestors, profile))
                    .sum();
                let score = total / query_count;
                (score > 0.0).then(|| ScoredDiagnosis {
                    term: profile.term.clone(),
                    score,
                })
            })
            .collect();

        scored.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.term.id.cmp(&b.term.id))
        });
        scored.truncate(limit);
        scored
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;

    fn ranker() -> InformationContentRanker {
        InformationContentRanker::new(fixtures::phenotypes(), &fixtures::diseases())
    }

    fn query(ids: &[&str]) -> BTreeSet<String> {
        ids.iter().map(|id| (*id).to_string()).collect()
    }

    #[test]
    fn root_terms_carry_no_information() {
        let ranker = ranker();
        assert_eq!(ranker.disease_count(), 5);
        assert!(ranker.information_content("HP:0000118").abs() < 1e-12);
        assert!((ranker.information_content("HP:0002066") - 5f64.ln()).abs() < 1e-12);
        assert!((ranker.information_content("HP:0001251") - 2.5f64.ln()).abs() < 1e-12);
    }

    #[test]
    fn specific_match_outranks_shared_ancestor() {
        let ranked = ranker().rank(&query(&["HP:0002066"]), 10);
        let ids: Vec<_> = ranked.iter().map(|s| s.term.id.as_str()).collect();
        assert_eq!(ids, vec!["OMIM:208900", "OMIM:606353"]);
        assert!(ranked[0].score > ranked[1].score);
    }

    #[test]
    fn equal_scores_order_by_id_and_respect_limit() {
        let ranked = ranker().rank(&query(&["HP:0000518"]), 2);
        let ids: Vec<_> = ranked.iter().map(|s| s.term.id.as_str()).collect();
        assert_eq!(ids, vec!["OMIM:100000", "OMIM:100001"]);
    }

    #[test]
    fn unknown_or_uninformative_queries_rank_nothing() {
        let ranker = ranker();
        assert!(ranker.rank(&query(&["HP:9999999"]), 5).is_empty());
        assert!(ranker.rank(&query(&["HP:0000118"]), 5).is_empty());
        assert!(ranker.rank(&query(&["HP:0002066"]), 0).is_empty());
    }
}
