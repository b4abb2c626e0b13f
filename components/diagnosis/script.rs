use std::sync::Arc;

use phenotips_vocabulary::VocabularyTerm;

use crate::service::DiagnosisService;

/// Diagnosis suggestions for callers that pass loosely typed arguments.
///
/// The limit arrives as a signed integer; anything non-positive yields an empty list.
#[derive(Debug, Clone)]
pub struct DiagnosisScriptService {
    service: Arc<DiagnosisService>,
}

impl DiagnosisScriptService {
    /// Wraps a shared diagnosis service.
    #[must_use]
    pub const fn new(service: Arc<DiagnosisService>) -> Self {
        Self { service }
    }

    /// Returns up to `limit` suggested disorders for the given phenotypes.
    #[must_use]
    pub fn get(
        &self,
        phenotypes: &[String],
        nonstandard_phenotypes: &[String],
        limit: i32,
    ) -> Vec<VocabularyTerm> {
        match usize::try_from(limit) {
            Ok(limit) if limit > 0 => self.service.suggest(phenotypes, nonstandard_phenotypes, limit),
            _ => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{engine::InformationContentRanker, fixtures};

    fn script() -> DiagnosisScriptService {
        let phenotypes = fixtures::phenotypes();
        let ranker = InformationContentRanker::new(phenotypes.clone(), &fixtures::diseases());
        DiagnosisScriptService::new(Arc::new(DiagnosisService::new(phenotypes, Arc::new(ranker))))
    }

    #[test]
    fn non_positive_limits_return_empty() {
        let script = script();
        let terms = vec!["HP:0002066".to_string()];
        assert!(script.get(&terms, &[], 0).is_empty());
        assert!(script.get(&terms, &[], -3).is_empty());
    }

    #[test]
    fn mixes_standard_and_free_text_input() {
        let script = script();
        let results = script.get(
            &["HP:0000518".to_string()],
            &["arachnodactyly".to_string()],
            2,
        );
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].id, "OMIM:154700");
    }
}
