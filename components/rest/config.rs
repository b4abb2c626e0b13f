use std::{
    collections::HashSet,
    fs,
    net::SocketAddr,
    path::{Path, PathBuf},
};

use anyhow::{bail, Context, Result};
use phenotips_patient_access::{consent::default_definitions, AccessOptions, ConsentDefinition, ConsentRegistry};
use serde::Deserialize;
use shared_logging::LogLevel;

/// Server configuration loaded from TOML.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address the HTTP listener binds to.
    pub listen: SocketAddr,
    /// Structured log file, if any.
    pub log_path: Option<PathBuf>,
    /// Records below this level are not written.
    pub log_level: LogLevel,
    /// JSON-lines file receiving record change events, if any.
    pub events_path: Option<PathBuf>,
    /// Phenotype and disease sources for diagnosis suggestion.
    pub vocabulary: Option<VocabularyPaths>,
    /// Initial users and records.
    pub seed: Option<PathBuf>,
    /// Access service switches.
    pub access: AccessOptions,
    /// Offered consents, in display order.
    pub consents: Vec<ConsentDefinition>,
    source_dir: PathBuf,
}

/// Vocabulary files backing diagnosis suggestion.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct VocabularyPaths {
    /// HPO ontology in OBO format.
    pub phenotype_obo: PathBuf,
    /// HPO disease annotations (`phenotype.hpoa`).
    pub disease_annotations: PathBuf,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ServerConfigSerde {
    #[serde(default)]
    server: ServerSection,
    #[serde(default)]
    logging: LoggingSection,
    vocabulary: Option<VocabularyPaths>,
    #[serde(default)]
    access: AccessSection,
    #[serde(default)]
    consents: Vec<ConsentDefinition>,
}

#[derive(Debug, Deserialize)]
struct ServerSection {
    #[serde(default = "default_listen")]
    listen: String,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            listen: default_listen(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct LoggingSection {
    path: Option<PathBuf>,
    level: Option<String>,
    events_path: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
struct AccessSection {
    seed: Option<PathBuf>,
    #[serde(flatten)]
    options: AccessOptions,
}

fn default_listen() -> String {
    "127.0.0.1:8080".into()
}

impl ServerConfig {
    /// Loads configuration from a TOML file; relative paths resolve against its directory.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path)
            .with_context(|| format!("reading server config {}", path.display()))?;
        let source_dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        Self::parse(&raw, source_dir).with_context(|| format!("parsing {}", path.display()))
    }

    /// Parses configuration text; relative paths resolve against `source_dir`.
    pub fn parse(raw: &str, source_dir: impl Into<PathBuf>) -> Result<Self> {
        let document: ServerConfigSerde = toml::from_str(raw)?;
        let source_dir = source_dir.into();

        let listen: SocketAddr = document
            .server
            .listen
            .parse()
            .with_context(|| format!("invalid listen address `{}`", document.server.listen))?;
        let log_level: LogLevel = match document.logging.level.as_deref() {
            Some(level) => level.parse().context("invalid logging level")?,
            None => LogLevel::Info,
        };
        let consents = if document.consents.is_empty() {
            default_definitions()
        } else {
            document.consents
        };
        let mut seen = HashSet::new();
        for consent in &consents {
            if consent.id.trim().is_empty() {
                bail!("consent ids must not be empty");
            }
            if !seen.insert(consent.id.as_str()) {
                bail!("duplicate consent id `{}`", consent.id);
            }
        }

        let mut config = Self {
            listen,
            log_path: document.logging.path,
            log_level,
            events_path: document.logging.events_path,
            vocabulary: document.vocabulary,
            seed: document.access.seed,
            access: document.access.options,
            consents,
            source_dir,
        };
        config.resolve_relative_paths();
        Ok(config)
    }

    fn resolve_relative_paths(&mut self) {
        let dir = self.source_dir.clone();
        let resolve = |path: &mut PathBuf| {
            if path.is_relative() {
                *path = dir.join(&*path);
            }
        };
        self.log_path.iter_mut().for_each(resolve);
        self.events_path.iter_mut().for_each(resolve);
        self.seed.iter_mut().for_each(resolve);
        if let Some(vocabulary) = &mut self.vocabulary {
            resolve(&mut vocabulary.phenotype_obo);
            resolve(&mut vocabulary.disease_annotations);
        }
    }

    /// Resolves a path relative to the configuration file.
    #[must_use]
    pub fn resolve_path(&self, candidate: impl AsRef<Path>) -> PathBuf {
        let candidate = candidate.as_ref();
        if candidate.is_absolute() {
            candidate.to_path_buf()
        } else {
            self.source_dir.join(candidate)
        }
    }

    /// Registry of the configured consents.
    #[must_use]
    pub fn consent_registry(&self) -> ConsentRegistry {
        ConsentRegistry::new(self.consents.clone())
    }
}
