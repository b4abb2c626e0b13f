use std::sync::Arc;

use serde_json::json;
use shared_event_bus::RecordChange;
use shared_logging::LogLevel;

use crate::{
    consent::{ConsentRegistry, ConsentStatus, ConsentView},
    error::AccessError,
    repository::PatientRepository,
    rights::{authorize, AccessLevel},
    telemetry::PatientAccessTelemetry,
    user::{UserDirectory, UserRef},
};

/// Lists, grants and revokes the configured consents on patient records.
#[derive(Clone)]
pub struct ConsentService {
    repository: Arc<dyn PatientRepository>,
    directory: Arc<UserDirectory>,
    registry: Arc<ConsentRegistry>,
    telemetry: Option<PatientAccessTelemetry>,
}

impl std::fmt::Debug for ConsentService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConsentService")
            .field("registry", &self.registry)
            .field("telemetry", &self.telemetry)
            .finish_non_exhaustive()
    }
}

impl ConsentService {
    /// Creates the service.
    #[must_use]
    pub fn new(
        repository: Arc<dyn PatientRepository>,
        directory: Arc<UserDirectory>,
        registry: Arc<ConsentRegistry>,
    ) -> Self {
        Self {
            repository,
            directory,
            registry,
            telemetry: None,
        }
    }

    /// Attaches telemetry sinks.
    #[must_use]
    pub fn with_telemetry(mut self, telemetry: PatientAccessTelemetry) -> Self {
        self.telemetry = Some(telemetry);
        self
    }

    /// Every configured consent with its status on the record. Requires view access.
    pub fn list(
        &self,
        caller: Option<&UserRef>,
        patient_id: &str,
    ) -> Result<Vec<ConsentView>, AccessError> {
        let entry = self
            .repository
            .get(patient_id)
            .ok_or_else(|| AccessError::NotFound(patient_id.to_string()))?;
        let record = entry.lock();
        authorize(&self.directory, &record, caller, AccessLevel::View)?;
        Ok(self
            .registry
            .definitions()
            .map(|definition| ConsentView::new(definition, record.consent_status(&definition.id)))
            .collect())
    }

    /// Marks a consent as granted. Granting twice is the same as granting once.
    pub fn grant(
        &self,
        caller: Option<&UserRef>,
        patient_id: &str,
        consent_id: &str,
    ) -> Result<ConsentView, AccessError> {
        self.update(caller, patient_id, consent_id, ConsentStatus::Yes)
    }

    /// Marks a consent as revoked. Revoking twice is the same as revoking once.
    pub fn revoke(
        &self,
        caller: Option<&UserRef>,
        patient_id: &str,
        consent_id: &str,
    ) -> Result<ConsentView, AccessError> {
        self.update(caller, patient_id, consent_id, ConsentStatus::No)
    }

    fn update(
        &self,
        caller: Option<&UserRef>,
        patient_id: &str,
        consent_id: &str,
        status: ConsentStatus,
    ) -> Result<ConsentView, AccessError> {
        let entry = self
            .repository
            .get(patient_id)
            .ok_or_else(|| AccessError::NotFound(patient_id.to_string()))?;
        let mut record = entry.lock();
        authorize(&self.directory, &record, caller, AccessLevel::Edit)?;
        let definition = self
            .registry
            .get(consent_id)
            .ok_or_else(|| AccessError::bad_request(format!("unknown consent `{consent_id}`")))?;
        let changed = record.set_consent(&definition.id, status);
        drop(record);

        if changed {
            self.record_change(caller, patient_id, &definition.id, status);
        }
        Ok(ConsentView::new(definition, status))
    }

    fn record_change(
        &self,
        caller: Option<&UserRef>,
        patient_id: &str,
        consent_id: &str,
        status: ConsentStatus,
    ) {
        let Some(tel) = &self.telemetry else {
            return;
        };
        let consent = consent_id.to_string();
        let change = if status.is_granted() {
            RecordChange::ConsentGranted { consent }
        } else {
            RecordChange::ConsentRevoked { consent }
        };
        let actor = caller.map(ToString::to_string);
        let _ = tel.log(
            LogLevel::Info,
            change.event_type(),
            actor.as_deref(),
            &json!({ "patient": patient_id, "consent": consent_id, "status": status }),
        );
        let _ = tel.event(patient_id, actor, change);
    }
}
