use std::collections::{BTreeSet, HashMap};

use indexmap::IndexMap;

use crate::term::VocabularyTerm;

/// Immutable, named index over a set of terms.
#[derive(Debug, Clone)]
pub struct Vocabulary {
    name: String,
    terms: IndexMap<String, VocabularyTerm>,
    alt_index: HashMap<String, String>,
}

impl Vocabulary {
    /// Builds the index. Later duplicates of an id replace earlier ones.
    #[must_use]
    pub fn new(name: impl Into<String>, terms: impl IntoIterator<Item = VocabularyTerm>) -> Self {
        let mut index = IndexMap::new();
        for term in terms {
            index.insert(term.id.clone(), term);
        }
        let mut alt_index = HashMap::new();
        for term in index.values() {
            for alt in &term.alt_ids {
                if !index.contains_key(alt) {
                    alt_index.insert(alt.clone(), term.id.clone());
                }
            }
        }
        Self {
            name: name.into(),
            terms: index,
            alt_index,
        }
    }

    /// Vocabulary name, e.g. `hpo`.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of primary terms.
    #[must_use]
    pub fn len(&self) -> usize {
        self.terms.len()
    }

    /// True when no term is loaded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Maps a primary or alternative id to the primary id.
    #[must_use]
    pub fn resolve_id(&self, id: &str) -> Option<&str> {
        if let Some((key, _)) = self.terms.get_key_value(id) {
            return Some(key.as_str());
        }
        self.alt_index.get(id).map(String::as_str)
    }

    /// Looks a term up by primary or alternative id.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&VocabularyTerm> {
        self.resolve_id(id).and_then(|primary| self.terms.get(primary))
    }

    /// Iterates terms in load order.
    pub fn terms(&self) -> impl Iterator<Item = &VocabularyTerm> {
        self.terms.values()
    }

    /// The term itself plus every transitive is-a ancestor known to this vocabulary.
    ///
    /// Unknown ids yield an empty set. Cycles and dangling parent references are tolerated.
    #[must_use]
    pub fn ancestors(&self, id: &str) -> BTreeSet<String> {
        let mut seen = BTreeSet::new();
        let Some(start) = self.resolve_id(id) else {
            return seen;
        };
        let mut stack = vec![start.to_string()];
        while let Some(current) = stack.pop() {
            if !seen.insert(current.clone()) {
                continue;
            }
            if let Some(term) = self.terms.get(&current) {
                for parent in &term.parents {
                    if let Some(primary) = self.resolve_id(parent) {
                        if !seen.contains(primary) {
                            stack.push(primary.to_string());
                        }
                    }
                }
            }
        }
        seen
    }

    /// Union of [`Self::ancestors`] over several ids.
    #[must_use]
    pub fn closure<'a>(&self, ids: impl IntoIterator<Item = &'a str>) -> BTreeSet<String> {
        ids.into_iter()
            .flat_map(|id| self.ancestors(id))
            .collect()
    }
}
