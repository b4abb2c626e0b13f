//! High-level wiring of the owner and consent services.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::{
    consent::{ConsentRegistry, ConsentView},
    consents::ConsentService,
    error::AccessError,
    owner::{OwnerService, OwnerSummary},
    repository::PatientRepository,
    telemetry::PatientAccessTelemetry,
    user::{UserDirectory, UserRef},
};

/// Behaviour switches for the access services.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AccessOptions {
    /// Keep a replaced owner on the record as a `manage` collaborator.
    pub keep_previous_owner_as_collaborator: bool,
}

impl Default for AccessOptions {
    fn default() -> Self {
        Self {
            keep_previous_owner_as_collaborator: true,
        }
    }
}

/// Runtime bundling everything owner and consent requests need.
#[derive(Debug, Clone)]
pub struct PatientAccessRuntime {
    directory: Arc<UserDirectory>,
    owners: OwnerService,
    consents: ConsentService,
    telemetry: Option<PatientAccessTelemetry>,
}

impl PatientAccessRuntime {
    /// Wires the services over shared storage.
    #[must_use]
    pub fn new(
        repository: Arc<dyn PatientRepository>,
        directory: UserDirectory,
        registry: ConsentRegistry,
        options: AccessOptions,
    ) -> Self {
        let directory = Arc::new(directory);
        let owners = OwnerService::new(
            Arc::clone(&repository),
            Arc::clone(&directory),
            options.keep_previous_owner_as_collaborator,
        );
        let consents = ConsentService::new(repository, Arc::clone(&directory), Arc::new(registry));
        Self {
            directory,
            owners,
            consents,
            telemetry: None,
        }
    }

    /// Attaches telemetry sinks to every service.
    #[must_use]
    pub fn with_telemetry(mut self, telemetry: PatientAccessTelemetry) -> Self {
        self.owners = self.owners.with_telemetry(telemetry.clone());
        self.consents = self.consents.with_telemetry(telemetry.clone());
        self.telemetry = Some(telemetry);
        self
    }

    /// Accesses the telemetry handle.
    #[must_use]
    pub const fn telemetry(&self) -> Option<&PatientAccessTelemetry> {
        self.telemetry.as_ref()
    }

    /// Maps a raw caller name onto a known user; unknown or absent callers are anonymous.
    #[must_use]
    pub fn identify(&self, raw: Option<&str>) -> Option<UserRef> {
        raw.and_then(|raw| self.directory.resolve(raw))
    }

    /// See [`OwnerService::get_owner`].
    pub fn get_owner(
        &self,
        caller: Option<&UserRef>,
        patient_id: &str,
    ) -> Result<OwnerSummary, AccessError> {
        self.owners.get_owner(caller, patient_id)
    }

    /// See [`OwnerService::set_owner`].
    pub fn set_owner(
        &self,
        caller: Option<&UserRef>,
        patient_id: &str,
        username: &str,
    ) -> Result<OwnerSummary, AccessError> {
        self.owners.set_owner(caller, patient_id, username)
    }

    /// See [`ConsentService::list`].
    pub fn list_consents(
        &self,
        caller: Option<&UserRef>,
        patient_id: &str,
    ) -> Result<Vec<ConsentView>, AccessError> {
        self.consents.list(caller, patient_id)
    }

    /// See [`ConsentService::grant`].
    pub fn grant_consent(
        &self,
        caller: Option<&UserRef>,
        patient_id: &str,
        consent_id: &str,
    ) -> Result<ConsentView, AccessError> {
        self.consents.grant(caller, patient_id, consent_id)
    }

    /// See [`ConsentService::revoke`].
    pub fn revoke_consent(
        &self,
        caller: Option<&UserRef>,
        patient_id: &str,
        consent_id: &str,
    ) -> Result<ConsentView, AccessError> {
        self.consents.revoke(caller, patient_id, consent_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        consent::ConsentStatus, record::PatientRecord, repository::InMemoryPatientRepository,
        user::UserProfile,
    };
    use serde_json::Value;
    use shared_event_bus::MemoryEventBus;
    use tempfile::tempdir;

    fn runtime() -> (PatientAccessRuntime, InMemoryPatientRepository) {
        let mut directory = UserDirectory::new();
        directory.insert(UserProfile::new(UserRef::parse("alice").unwrap(), "Alice"));
        directory.insert(UserProfile::new(UserRef::parse("bob").unwrap(), "Bob"));
        let repository = InMemoryPatientRepository::new();
        repository.insert(PatientRecord::new("P0000001", UserRef::parse("alice").unwrap()));
        let runtime = PatientAccessRuntime::new(
            Arc::new(repository.clone()),
            directory,
            ConsentRegistry::default(),
            AccessOptions::default(),
        );
        (runtime, repository)
    }

    #[test]
    fn unknown_callers_are_anonymous() {
        let (runtime, _) = runtime();
        assert_eq!(
            runtime.identify(Some("XWiki.alice")),
            UserRef::parse("alice")
        );
        assert_eq!(runtime.identify(Some("mallory")), None);
        assert_eq!(runtime.identify(None), None);
    }

    #[test]
    fn telemetry_reaches_both_services() {
        let dir = tempdir().unwrap();
        let log_path = dir.path().join("access.log");
        let bus = Arc::new(MemoryEventBus::new(8));
        let telemetry = PatientAccessTelemetry::builder("patient_access")
            .log_path(&log_path)
            .event_publisher(bus.clone())
            .build()
            .unwrap();
        let (runtime, repository) = runtime();
        let runtime = runtime.with_telemetry(telemetry);
        assert!(runtime.telemetry().is_some());
        let alice = runtime.identify(Some("alice"));

        runtime.grant_consent(alice.as_ref(), "P0000001", "genetic").unwrap();
        runtime.set_owner(alice.as_ref(), "P0000001", "bob").unwrap();

        let lines: Vec<Value> = std::fs::read_to_string(&log_path)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        let messages: Vec<_> = lines.iter().map(|line| line["message"].as_str().unwrap()).collect();
        assert_eq!(messages, vec!["patient.consent.granted", "patient.owner.changed"]);
        assert_eq!(bus.snapshot().len(), 2);

        let record = repository.snapshot("P0000001").unwrap();
        assert_eq!(record.consent_status("genetic"), ConsentStatus::Yes);
        assert_eq!(record.owner.name(), "bob");
    }

    #[test]
    fn options_default_to_keeping_previous_owner() {
        let options: AccessOptions = serde_json::from_str("{}").unwrap();
        assert!(options.keep_previous_owner_as_collaborator);
    }
}
