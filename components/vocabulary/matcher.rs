use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

use crate::vocabulary::Vocabulary;

const DEFAULT_MIN_SIMILARITY: f64 = 0.5;

/// A free-text hit against a vocabulary label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelMatch {
    /// Primary id of the matched term.
    pub id: String,
    /// The label (name or synonym) that matched best.
    pub label: String,
    /// 1.0 for an exact normalized match, token Jaccard similarity otherwise.
    pub similarity: f64,
}

#[derive(Debug, Clone)]
struct LabelEntry {
    term_id: String,
    label: String,
    tokens: BTreeSet<String>,
}

/// Maps free text onto non-obsolete vocabulary terms by their names and synonyms.
#[derive(Debug, Clone)]
pub struct LabelMatcher {
    entries: Vec<LabelEntry>,
    exact: HashMap<String, usize>,
    by_token: HashMap<String, Vec<usize>>,
    min_similarity: f64,
}

impl LabelMatcher {
    /// Indexes every label of every non-obsolete term.
    #[must_use]
    pub fn new(vocabulary: &Vocabulary) -> Self {
        let mut entries: Vec<LabelEntry> = Vec::new();
        let mut exact: HashMap<String, usize> = HashMap::new();
        let mut by_token: HashMap<String, Vec<usize>> = HashMap::new();

        for term in vocabulary.terms().filter(|term| !term.obsolete) {
            for label in term.labels() {
                let normalized = normalize(label);
                if normalized.is_empty() {
                    continue;
                }
                let idx = entries.len();
                let tokens: BTreeSet<String> =
                    normalized.split(' ').map(str::to_string).collect();
                for token in &tokens {
                    by_token.entry(token.clone()).or_default().push(idx);
                }
                exact
                    .entry(normalized)
                    .and_modify(|existing| {
                        if term.id < entries[*existing].term_id {
                            *existing = idx;
                        }
                    })
                    .or_insert(idx);
                entries.push(LabelEntry {
                    term_id: term.id.clone(),
                    label: label.to_string(),
                    tokens,
                });
            }
        }

        Self {
            entries,
            exact,
            by_token,
            min_similarity: DEFAULT_MIN_SIMILARITY,
        }
    }

    /// Overrides the minimum token similarity for non-exact matches.
    #[must_use]
    pub fn with_min_similarity(mut self, min_similarity: f64) -> Self {
        self.min_similarity = min_similarity.clamp(0.0, 1.0);
        self
    }

    /// Best single term for `text`, or `None` when nothing clears the threshold.
    #[must_use]
    pub fn best_match(&self, text: &str) -> Option<LabelMatch> {
        self.search(text, 1).into_iter().next()
    }

    /// Up to `limit` distinct terms ordered by similarity, then by ascending id.
    #[must_use]
    pub fn search(&self, text: &str, limit: usize) -> Vec<LabelMatch> {
        let normalized = normalize(text);
        if normalized.is_empty() || limit == 0 {
            return Vec::new();
        }
        if let Some(&idx) = self.exact.get(&normalized) {
            let entry = &self.entries[idx];
            let mut hits = vec![LabelMatch {
                id: entry.term_id.clone(),
                label: entry.label.clone(),
                similarity: 1.0,
            }];
            if limit > 1 {
                hits.extend(
                    self.fuzzy(&normalized)
                        .into_iter()
                        .filter(|hit| hit.id != entry.term_id)
                        .take(limit - 1),
                );
            }
            return hits;
        }
        let mut hits = self.fuzzy(&normalized);
        hits.truncate(limit);
        hits
    }

    fn fuzzy(&self, normalized: &str) -> Vec<LabelMatch> {
        let query: BTreeSet<String> = normalized.split(' ').map(str::to_string).collect();
        let candidates: BTreeSet<usize> = query
            .iter()
            .filter_map(|token| self.by_token.get(token))
            .flatten()
            .copied()
            .collect();

        let mut best: HashMap<&str, LabelMatch> = HashMap::new();
        for idx in candidates {
            let entry = &self.entries[idx];
            let similarity = jaccard(&query, &entry.tokens);
            if similarity < self.min_similarity {
                continue;
            }
            let replace = best
                .get(entry.term_id.as_str())
                .map_or(true, |current| similarity > current.similarity);
            if replace {
                best.insert(
                    entry.term_id.as_str(),
                    LabelMatch {
                        id: entry.term_id.clone(),
                        label: entry.label.clone(),
                        similarity,
                    },
                );
            }
        }

        let mut hits: Vec<LabelMatch> = best.into_values().collect();
        hits.sort_by(|a, b| {
            b.similarity
                .total_cmp(&a.similarity)
                .then_with(|| a.id.cmp(&b.id))
        });
        hits
    }
}

/// Lowercases, maps punctuation to spaces and collapses whitespace.
fn normalize(text: &str) -> String {
    let mut spaced = String::with_capacity(text.len());
    for c in text.chars() {
        if c.is_alphanumeric() {
            spaced.extend(c.to_lowercase());
        } else {
            spaced.push(' ');
        }
    }
    spaced.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[allow(clippy::cast_precision_loss)]
fn jaccard(a: &BTreeSet<String>, b: &BTreeSet<String>) -> f64 {
    let shared = a.intersection(b).count();
    let union = a.len() + b.len() - shared;
    if union == 0 {
        0.0
    } else {
        shared as f64 / union as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::term::VocabularyTerm;

    fn vocabulary() -> Vocabulary {
        let mut retired = VocabularyTerm::new("HP:0000002", "Ataxic gait");
        retired.obsolete = true;
        Vocabulary::new(
            "hpo",
            vec![
                VocabularyTerm::new("HP:0002066", "Gait ataxia").with_synonym("Ataxic gait"),
                VocabularyTerm::new("HP:0001251", "Ataxia"),
                VocabularyTerm::new("HP:0001250", "Seizure").with_synonym("Epileptic seizure"),
                VocabularyTerm::new("HP:0002069", "Bilateral tonic-clonic seizure"),
                retired,
            ],
        )
    }

    #[test]
    fn exact_label_or_synonym_wins() {
        let matcher = LabelMatcher::new(&vocabulary());
        let hit = matcher.best_match("  ataxic GAIT ").unwrap();
        assert_eq!(hit.id, "HP:0002066");
        assert!((hit.similarity - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn fuzzy_match_respects_threshold() {
        let matcher = LabelMatcher::new(&vocabulary());
        let hit = matcher.best_match("tonic-clonic seizure, bilateral").unwrap();
        assert_eq!(hit.id, "HP:0002069");
        assert!(matcher.best_match("completely unrelated words").is_none());
    }

    #[test]
    fn ties_break_on_ascending_id() {
        let matcher = LabelMatcher::new(&vocabulary()).with_min_similarity(0.3);
        let hits = matcher.search("seizure ataxia", 5);
        let ids: Vec<_> = hits.iter().map(|h| h.id.as_str()).collect();
        assert_eq!(ids, vec!["HP:0001250", "HP:0001251", "HP:0002066"]);
    }

    #[test]
    fn blank_text_matches_nothing() {
        let matcher = LabelMatcher::new(&vocabulary());
        assert!(matcher.search(" -- ", 3).is_empty());
        assert!(matcher.search("ataxia", 0).is_empty());
    }

    #[test]
    fn case_folding_covers_non_ascii_labels() {
        let vocabulary = Vocabulary::new(
            "hpo",
            vec![VocabularyTerm::new("HP:0000969", "Ödem").with_synonym("Œdème généralisé")],
        );
        let matcher = LabelMatcher::new(&vocabulary);
        assert_eq!(matcher.best_match("ÖDEM").unwrap().id, "HP:0000969");
        assert_eq!(matcher.best_match("ödem").unwrap().id, "HP:0000969");
        assert_eq!(matcher.best_match("œdème GÉNÉRALISÉ").unwrap().id, "HP:0000969");
    }
}
