use std::{fs, path::Path};

use anyhow::{bail, Context, Result};
use indexmap::IndexMap;
use phenotips_patient_access::{
    AccessLevel, ConsentRegistry, ConsentStatus, PatientRecord, PatientRepository, UserDirectory,
    UserProfile, UserRef, Visibility,
};
use serde::Deserialize;

/// Initial users and patient records, as stored in the seed JSON file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SeedDocument {
    /// Known users.
    #[serde(default)]
    pub users: Vec<SeedUser>,
    /// Usernames holding administrator rights.
    #[serde(default)]
    pub admins: Vec<String>,
    /// Patient records.
    #[serde(default)]
    pub patients: Vec<SeedPatient>,
}

/// A user entry.
#[derive(Debug, Clone, Deserialize)]
pub struct SeedUser {
    /// Username in any accepted form.
    pub id: String,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Contact address.
    #[serde(default)]
    pub email: Option<String>,
}

/// A patient record entry.
#[derive(Debug, Clone, Deserialize)]
pub struct SeedPatient {
    /// Record identifier.
    pub id: String,
    /// Owner username.
    pub owner: String,
    /// Visibility.
    #[serde(default)]
    pub visibility: Visibility,
    /// Invited users and their levels.
    #[serde(default)]
    pub collaborators: IndexMap<String, AccessLevel>,
    /// Consent states.
    #[serde(default)]
    pub consents: IndexMap<String, ConsentStatus>,
}

impl SeedDocument {
    /// Reads a seed document from JSON.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path)
            .with_context(|| format!("reading seed {}", path.display()))?;
        serde_json::from_str(&raw).with_context(|| format!("parsing seed {}", path.display()))
    }

    /// Builds the user directory and stores every record.
    ///
    /// Owners and collaborators must be listed users, and consent ids must be configured.
    pub fn apply(
        self,
        repository: &dyn PatientRepository,
        registry: &ConsentRegistry,
    ) -> Result<UserDirectory> {
        let mut directory = UserDirectory::new();
        for entry in self.users {
            let user = parse_user(&entry.id)?;
            let mut profile = UserProfile::new(user, entry.name);
            profile.email = entry.email;
            directory.insert(profile);
        }
        for admin in &self.admins {
            let user = parse_user(admin)?;
            if !directory.grant_admin(&user) {
                bail!("administrator `{admin}` is not a listed user");
            }
        }
        for patient in self.patients {
            let record = build_record(&directory, registry, patient)?;
            repository.insert(record);
        }
        Ok(directory)
    }
}

fn parse_user(raw: &str) -> Result<UserRef> {
    UserRef::parse(raw).with_context(|| format!("invalid username `{raw}`"))
}

fn known_user(directory: &UserDirectory, raw: &str, patient: &str) -> Result<UserRef> {
    let user = parse_user(raw)?;
    if directory.get(&user).is_none() {
        bail!("record {patient} references unknown user `{raw}`");
    }
    Ok(user)
}

fn build_record(
    directory: &UserDirectory,
    registry: &ConsentRegistry,
    patient: SeedPatient,
) -> Result<PatientRecord> {
    if patient.id.trim().is_empty() {
        bail!("patient ids must not be empty");
    }
    let owner = known_user(directory, &patient.owner, &patient.id)?;
    let mut record = PatientRecord::new(&patient.id, owner).with_visibility(patient.visibility);
    for (name, level) in patient.collaborators {
        let user = known_user(directory, &name, &patient.id)?;
        record.set_collaborator(user, level);
    }
    for (consent, status) in patient.consents {
        if registry.get(&consent).is_none() {
            bail!("record {} references unknown consent `{consent}`", patient.id);
        }
        record.set_consent(&consent, status);
    }
    Ok(record)
}
