use std::{collections::HashSet, fmt};

use serde::{Deserialize, Serialize};

/// A consent the platform can ask patients for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsentDefinition {
    /// Stable identifier used in URLs.
    pub id: String,
    /// Short human-readable label.
    pub label: String,
    /// Longer explanation shown to the patient.
    #[serde(default)]
    pub description: String,
    /// Whether the record cannot be used without this consent.
    #[serde(default)]
    pub required: bool,
}

impl ConsentDefinition {
    /// Creates an optional consent.
    #[must_use]
    pub fn new(id: impl Into<String>, label: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            description: description.into(),
            required: false,
        }
    }

    /// Marks the consent as required.
    #[must_use]
    pub const fn required(mut self) -> Self {
        self.required = true;
        self
    }
}

/// State of one consent on one record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsentStatus {
    /// Granted.
    Yes,
    /// Explicitly revoked.
    No,
    /// Never granted nor revoked.
    #[default]
    NotSet,
}

impl ConsentStatus {
    /// Whether the consent counts as given.
    #[must_use]
    pub const fn is_granted(self) -> bool {
        matches!(self, Self::Yes)
    }
}

impl fmt::Display for ConsentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Yes => "yes",
            Self::No => "no",
            Self::NotSet => "not_set",
        })
    }
}

/// A consent definition joined with a record's status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsentView {
    /// Identifier.
    pub id: String,
    /// Label.
    pub label: String,
    /// Description.
    pub description: String,
    /// Whether the consent is required.
    pub required: bool,
    /// Current status on the record.
    pub status: ConsentStatus,
}

impl ConsentView {
    /// Joins a definition with a status.
    #[must_use]
    pub fn new(definition: &ConsentDefinition, status: ConsentStatus) -> Self {
        Self {
            id: definition.id.clone(),
            label: definition.label.clone(),
            description: definition.description.clone(),
            required: definition.required,
            status,
        }
    }
}

/// The configured consents, in display order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsentRegistry {
    definitions: Vec<ConsentDefinition>,
}

impl Default for ConsentRegistry {
    fn default() -> Self {
        Self::new(default_definitions())
    }
}

impl ConsentRegistry {
    /// Creates a registry; later duplicates of an id are ignored.
    #[must_use]
    pub fn new(definitions: Vec<ConsentDefinition>) -> Self {
        let mut seen = HashSet::new();
        let definitions = definitions
            .into_iter()
            .filter(|definition| seen.insert(definition.id.clone()))
            .collect();
        Self { definitions }
    }

    /// Looks up a definition.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&ConsentDefinition> {
        self.definitions.iter().find(|definition| definition.id == id)
    }

    /// All definitions in display order.
    pub fn definitions(&self) -> impl Iterator<Item = &ConsentDefinition> + '_ {
        self.definitions.iter()
    }

    /// Number of definitions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    /// Whether no consent is configured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}

/// Consents offered when nothing is configured.
#[must_use]
pub fn default_definitions() -> Vec<ConsentDefinition> {
    vec![
        ConsentDefinition::new(
            "real_consent",
            "Real patient",
            "The record describes a real patient whose data may be stored.",
        )
        .required(),
        ConsentDefinition::new(
            "genetic",
            "Genetic data",
            "Genotype information may be entered and stored.",
        ),
        ConsentDefinition::new(
            "share_history",
            "Medical history",
            "Medical and family history may be shared with collaborators.",
        ),
        ConsentDefinition::new(
            "share_images",
            "Medical images",
            "Photographs and medical images may be shared with collaborators.",
        ),
        ConsentDefinition::new(
            "matching",
            "Matching",
            "The record may be used to find similar patients.",
        ),
    ]
}
