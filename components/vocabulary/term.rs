use std::{fmt, str::FromStr};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::VocabularyError;

/// Property key under which disease terms list their annotated phenotypes.
pub const SYMPTOM_PROPERTY: &str = "actual_symptom";

/// Validated `<PREFIX>:<code>` identifier such as `HP:0002066`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TermId(String);

impl TermId {
    /// Parses and validates a raw identifier. Surrounding whitespace is ignored.
    pub fn parse(raw: &str) -> Result<Self, VocabularyError> {
        let trimmed = raw.trim();
        let Some((prefix, code)) = trimmed.split_once(':') else {
            return Err(VocabularyError::InvalidTermId(raw.to_string()));
        };
        let mut prefix_chars = prefix.chars();
        let prefix_ok = prefix_chars
            .next()
            .is_some_and(|c| c.is_ascii_uppercase())
            && prefix_chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
        let code_ok = !code.is_empty() && code.chars().all(|c| c.is_ascii_alphanumeric());
        if prefix_ok && code_ok {
            Ok(Self(trimmed.to_string()))
        } else {
            Err(VocabularyError::InvalidTermId(raw.to_string()))
        }
    }

    /// Ontology prefix, e.g. `HP`.
    #[must_use]
    pub fn prefix(&self) -> &str {
        self.0.split_once(':').map_or("", |(prefix, _)| prefix)
    }

    /// Local code, e.g. `0002066`.
    #[must_use]
    pub fn code(&self) -> &str {
        self.0.split_once(':').map_or("", |(_, code)| code)
    }

    /// Full identifier.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TermId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for TermId {
    type Err = VocabularyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for TermId {
    type Error = VocabularyError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<TermId> for String {
    fn from(value: TermId) -> Self {
        value.0
    }
}

/// A concept node of a controlled vocabulary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VocabularyTerm {
    /// Primary identifier.
    pub id: String,
    /// Preferred label.
    pub name: String,
    /// Textual definition.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub definition: Option<String>,
    /// Alternative labels.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub synonyms: Vec<String>,
    /// Direct is-a parents.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parents: Vec<String>,
    /// Secondary identifiers merged into this term.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub alt_ids: Vec<String>,
    /// Whether the term was retired from the vocabulary.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub obsolete: bool,
    /// Additional multi-valued fields (e.g. `actual_symptom`, `xref`).
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub properties: IndexMap<String, Vec<String>>,
}

impl VocabularyTerm {
    /// Creates a bare term.
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            definition: None,
            synonyms: Vec::new(),
            parents: Vec::new(),
            alt_ids: Vec::new(),
            obsolete: false,
            properties: IndexMap::new(),
        }
    }

    /// Adds an is-a parent.
    #[must_use]
    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.parents.push(parent.into());
        self
    }

    /// Adds a synonym.
    #[must_use]
    pub fn with_synonym(mut self, synonym: impl Into<String>) -> Self {
        self.synonyms.push(synonym.into());
        self
    }

    /// Appends a value to a multi-valued property.
    #[must_use]
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.push_property(key, value);
        self
    }

    /// Appends a value to a multi-valued property, skipping duplicates.
    pub fn push_property(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let value = value.into();
        let values = self.properties.entry(key.into()).or_default();
        if !values.contains(&value) {
            values.push(value);
        }
    }

    /// Values stored under `key`, empty when absent.
    #[must_use]
    pub fn values(&self, key: &str) -> &[String] {
        self.properties.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    /// All labels the term is known by: name first, then synonyms.
    pub fn labels(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.name.as_str()).chain(self.synonyms.iter().map(String::as_str))
    }
}
