use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::json;
use shared_event_bus::RecordChange;
use shared_logging::LogLevel;

use crate::{
    error::AccessError,
    repository::{PatientRepository, SharedRecord},
    rights::{authorize, AccessLevel},
    telemetry::PatientAccessTelemetry,
    user::{UserDirectory, UserProfile, UserRef},
};

/// Kind of principal owning a record. Only users own records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OwnerKind {
    /// A user account.
    #[default]
    User,
}

/// Owner description returned to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnerSummary {
    /// Qualified user reference.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Contact address, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Principal kind.
    #[serde(rename = "type")]
    pub kind: OwnerKind,
}

impl OwnerSummary {
    fn describe(user: &UserRef, profile: Option<&UserProfile>) -> Self {
        Self {
            id: user.to_string(),
            name: profile.map_or_else(|| user.name().to_string(), |p| p.display_name().to_string()),
            email: profile.and_then(|p| p.email.clone()),
            kind: OwnerKind::User,
        }
    }
}

/// Reads and replaces record owners.
#[derive(Clone)]
pub struct OwnerService {
    repository: Arc<dyn PatientRepository>,
    directory: Arc<UserDirectory>,
    keep_previous_owner: bool,
    telemetry: Option<PatientAccessTelemetry>,
}

impl std::fmt::Debug for OwnerService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OwnerService")
            .field("keep_previous_owner", &self.keep_previous_owner)
            .field("telemetry", &self.telemetry)
            .finish_non_exhaustive()
    }
}

impl OwnerService {
    /// Creates the service.
    #[must_use]
    pub fn new(
        repository: Arc<dyn PatientRepository>,
        directory: Arc<UserDirectory>,
        keep_previous_owner: bool,
    ) -> Self {
        Self {
            repository,
            directory,
            keep_previous_owner,
            telemetry: None,
        }
    }

    /// Attaches telemetry sinks.
    #[must_use]
    pub fn with_telemetry(mut self, telemetry: PatientAccessTelemetry) -> Self {
        self.telemetry = Some(telemetry);
        self
    }

    /// Returns the owner of a record. Requires view access.
    pub fn get_owner(
        &self,
        caller: Option<&UserRef>,
        patient_id: &str,
    ) -> Result<OwnerSummary, AccessError> {
        let entry = self.lookup(patient_id)?;
        let record = entry.lock();
        authorize(&self.directory, &record, caller, AccessLevel::View)?;
        Ok(OwnerSummary::describe(
            &record.owner,
            self.directory.get(&record.owner),
        ))
    }

    /// Makes `username` the owner of a record. Requires edit access.
    ///
    /// Check order: record exists, caller is allowed, username names a known user.
    /// Assigning the current owner again succeeds without any change.
    pub fn set_owner(
        &self,
        caller: Option<&UserRef>,
        patient_id: &str,
        username: &str,
    ) -> Result<OwnerSummary, AccessError> {
        let entry = self.lookup(patient_id)?;
        let mut record = entry.lock();
        authorize(&self.directory, &record, caller, AccessLevel::Edit)?;

        if username.trim().is_empty() {
            return Err(AccessError::bad_request("owner id must not be empty"));
        }
        let new_owner = UserRef::parse(username)
            .ok_or_else(|| AccessError::bad_request(format!("invalid owner id `{username}`")))?;
        let profile = self
            .directory
            .get(&new_owner)
            .ok_or_else(|| AccessError::bad_request(format!("unknown user `{new_owner}`")))?;
        let summary = OwnerSummary::describe(&new_owner, Some(profile));
        if record.owner == new_owner {
            return Ok(summary);
        }
        let previous = record.transfer_ownership(new_owner.clone(), self.keep_previous_owner);
        drop(record);

        if let Some(tel) = &self.telemetry {
            let actor = caller.map(ToString::to_string);
            let _ = tel.log(
                LogLevel::Info,
                "patient.owner.changed",
                actor.as_deref(),
                &json!({
                    "patient": patient_id,
                    "previous": previous.to_string(),
                    "current": new_owner.to_string(),
                }),
            );
            let change = RecordChange::OwnerChanged {
                previous: previous.to_string(),
                current: new_owner.to_string(),
            };
            let _ = tel.event(patient_id, actor, change);
        }
        Ok(summary)
    }

    fn lookup(&self, patient_id: &str) -> Result<SharedRecord, AccessError> {
        self.repository
            .get(patient_id)
            .ok_or_else(|| AccessError::NotFound(patient_id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::telemetry::tests::{warn_records, RejectingPublisher};
    use crate::{
        record::PatientRecord,
        repository::InMemoryPatientRepository,
    };
    use shared_event_bus::MemoryEventBus;

    fn user(name: &str) -> UserRef {
        UserRef::parse(name).unwrap()
    }

    fn fixture(keep_previous: bool) -> (OwnerService, InMemoryPatientRepository) {
        let mut directory = UserDirectory::new();
        directory.insert(UserProfile::new(user("alice"), "Alice Liddell").with_email("alice@example.org"));
        directory.insert(UserProfile::new(user("bob"), "Bob Builder"));
        directory.insert(UserProfile::new(user("eve"), "Eve"));
        directory.insert(UserProfile::new(user("Admin"), "Administrator"));
        directory.grant_admin(&user("Admin"));
        let repository = InMemoryPatientRepository::new();
        repository.insert(PatientRecord::new("P0000001", user("alice")));
        let service = OwnerService::new(
            Arc::new(repository.clone()),
            Arc::new(directory),
            keep_previous,
        );
        (service, repository)
    }

    #[test]
    fn get_owner_describes_the_user() {
        let (service, _) = fixture(true);
        let summary = service.get_owner(Some(&user("alice")), "P0000001").unwrap();
        assert_eq!(summary.id, "xwiki:XWiki.alice");
        assert_eq!(summary.name, "Alice Liddell");
        assert_eq!(summary.email.as_deref(), Some("alice@example.org"));
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["type"], "user");
    }

    #[test]
    fn missing_record_is_not_found() {
        let (service, _) = fixture(true);
        assert_eq!(
            service.get_owner(Some(&user("Admin")), "P0000404"),
            Err(AccessError::NotFound("P0000404".into()))
        );
        assert!(matches!(
            service.set_owner(Some(&user("Admin")), "P0000404", "bob"),
            Err(AccessError::NotFound(_))
        ));
    }

    #[test]
    fn set_then_get_round_trips() {
        let (service, repository) = fixture(true);
        let summary = service
            .set_owner(Some(&user("alice")), "P0000001", "xwiki:XWiki.bob")
            .unwrap();
        assert_eq!(summary.id, "xwiki:XWiki.bob");
        assert_eq!(
            service.get_owner(Some(&user("bob")), "P0000001").unwrap().id,
            "xwiki:XWiki.bob"
        );
        let record = repository.snapshot("P0000001").unwrap();
        assert_eq!(record.collaborator_level(&user("alice")), Some(AccessLevel::Manage));
    }

    #[test]
    fn previous_owner_can_be_dropped() {
        let (service, repository) = fixture(false);
        service.set_owner(Some(&user("Admin")), "P0000001", "bob").unwrap();
        assert!(repository.snapshot("P0000001").unwrap().collaborators.is_empty());
        assert!(matches!(
            service.get_owner(Some(&user("alice")), "P0000001"),
            Err(AccessError::Forbidden(_))
        ));
    }

    #[test]
    fn forbidden_before_bad_request() {
        let (service, repository) = fixture(true);
        assert!(matches!(
            service.set_owner(Some(&user("eve")), "P0000001", ""),
            Err(AccessError::Forbidden(_))
        ));
        assert!(matches!(
            service.set_owner(None, "P0000001", "bob"),
            Err(AccessError::Forbidden(_))
        ));
        assert_eq!(repository.snapshot("P0000001").unwrap().owner, user("alice"));
    }

    #[test]
    fn invalid_or_unknown_owner_is_bad_request() {
        let (service, _) = fixture(true);
        for candidate in ["", "  ", "john doe", "ghost"] {
            assert!(
                matches!(
                    service.set_owner(Some(&user("alice")), "P0000001", candidate),
                    Err(AccessError::BadRequest(_))
                ),
                "{candidate:?}"
            );
        }
    }

    #[test]
    fn reassigning_current_owner_is_a_no_op() {
        let bus = Arc::new(MemoryEventBus::new(8));
        let telemetry = PatientAccessTelemetry::builder("patient_access")
            .event_publisher(bus.clone())
            .build()
            .unwrap();
        let (service, repository) = fixture(true);
        let service = service.with_telemetry(telemetry);
        let before = repository.snapshot("P0000001").unwrap();
        service.set_owner(Some(&user("alice")), "P0000001", "XWiki.alice").unwrap();
        assert_eq!(repository.snapshot("P0000001").unwrap(), before);
        assert!(bus.snapshot().is_empty());

        service.set_owner(Some(&user("alice")), "P0000001", "bob").unwrap();
        let events = bus.for_patient("P0000001");
        assert_eq!(events.len(), 1);
        assert_eq!(
            events[0].change,
            RecordChange::OwnerChanged {
                previous: "xwiki:XWiki.alice".into(),
                current: "xwiki:XWiki.bob".into(),
            }
        );
        assert_eq!(events[0].actor.as_deref(), Some("xwiki:XWiki.alice"));
    }

    #[test]
    fn failed_event_keeps_the_new_owner_and_warns() {
        let dir = tempfile::tempdir().unwrap();
        let log_path = dir.path().join("access.log");
        let telemetry = PatientAccessTelemetry::builder("patient_access")
            .log_path(&log_path)
            .event_publisher(Arc::new(RejectingPublisher))
            .build()
            .unwrap();
        let (service, repository) = fixture(true);
        let service = service.with_telemetry(telemetry);
        let summary = service
            .set_owner(Some(&user("alice")), "P0000001", "bob")
            .unwrap();
        assert_eq!(summary.id, "xwiki:XWiki.bob");
        assert_eq!(repository.snapshot("P0000001").unwrap().owner, user("bob"));
        let warnings = warn_records(&log_path);
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0]["metadata"]["event_type"], "patient.owner.changed");
        let content = std::fs::read_to_string(&log_path).unwrap();
        assert!(content.contains("\"message\":\"patient.owner.changed\""));
    }
}
