#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    missing_docs,
    rust_2018_idioms
)]

//! Controlled vocabularies used by phenotype capture and diagnosis suggestion.

/// Errors raised while parsing identifiers or loading vocabulary files.
#[path = "../error.rs"]
pub mod error;

/// Term identifiers and the term model.
#[path = "../term.rs"]
pub mod term;

/// OBO flat-file loader.
#[path = "../obo.rs"]
pub mod obo;

/// HPO disease annotation (HPOA) loader.
#[path = "../annotations.rs"]
pub mod annotations;

/// In-memory vocabulary index with ontology closure.
#[path = "../vocabulary.rs"]
pub mod vocabulary;

/// Free-text to term matching.
#[path = "../matcher.rs"]
pub mod matcher;

pub use annotations::{load_hpoa, parse_hpoa};
pub use error::VocabularyError;
pub use matcher::{LabelMatch, LabelMatcher};
pub use obo::{load_obo, parse_obo};
pub use term::{TermId, VocabularyTerm, SYMPTOM_PROPERTY};
pub use vocabulary::Vocabulary;
