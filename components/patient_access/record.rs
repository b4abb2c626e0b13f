use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::{consent::ConsentStatus, rights::AccessLevel, user::UserRef};

/// Who may see a record without being explicitly invited.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    /// Only the owner, collaborators and administrators.
    #[default]
    Private,
    /// Private, but usable for anonymous matching.
    Matchable,
    /// Readable by everyone.
    Public,
    /// Editable by everyone.
    Open,
}

/// A patient record as far as ownership, sharing and consents are concerned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatientRecord {
    /// Record identifier, e.g. `P0000001`.
    pub id: String,
    /// The single owner.
    pub owner: UserRef,
    /// Visibility level.
    #[serde(default)]
    pub visibility: Visibility,
    /// Explicitly invited users, keyed by their qualified name.
    #[serde(default)]
    pub collaborators: IndexMap<UserRef, AccessLevel>,
    /// Consent states that have been touched; absent means not set.
    #[serde(default)]
    pub consents: IndexMap<String, ConsentStatus>,
    /// Last modification.
    pub modified_at: DateTime<Utc>,
}

impl PatientRecord {
    /// Creates a private record without collaborators or consents.
    #[must_use]
    pub fn new(id: impl Into<String>, owner: UserRef) -> Self {
        Self {
            id: id.into(),
            owner,
            visibility: Visibility::Private,
            collaborators: IndexMap::new(),
            consents: IndexMap::new(),
            modified_at: Utc::now(),
        }
    }

    /// Sets the visibility.
    #[must_use]
    pub const fn with_visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = visibility;
        self
    }

    /// Level granted to an invited user, if any.
    #[must_use]
    pub fn collaborator_level(&self, user: &UserRef) -> Option<AccessLevel> {
        self.collaborators.get(user).copied()
    }

    /// Invites a user or changes their level. `Owner` is capped to `Manage`; `None` removes them.
    pub fn set_collaborator(&mut self, user: UserRef, level: AccessLevel) {
        match level {
            AccessLevel::None => {
                self.collaborators.shift_remove(&user);
            }
            level => {
                self.collaborators.insert(user, level.min(AccessLevel::Manage));
            }
        }
    }

    /// Current status of a consent.
    #[must_use]
    pub fn consent_status(&self, consent: &str) -> ConsentStatus {
        self.consents.get(consent).copied().unwrap_or_default()
    }

    /// Sets a consent status and reports whether it changed.
    pub fn set_consent(&mut self, consent: &str, status: ConsentStatus) -> bool {
        if self.consent_status(consent) == status {
            return false;
        }
        self.consents.insert(consent.to_string(), status);
        self.touch();
        true
    }

    /// Replaces the owner and returns the previous one.
    ///
    /// The new owner leaves the collaborator list. When `keep_previous` is set the previous
    /// owner stays on as a `Manage` collaborator.
    pub fn transfer_ownership(&mut self, new_owner: UserRef, keep_previous: bool) -> UserRef {
        self.collaborators.shift_remove(&new_owner);
        let previous = std::mem::replace(&mut self.owner, new_owner);
        if keep_previous {
            self.set_collaborator(previous.clone(), AccessLevel::Manage);
        }
        self.touch();
        previous
    }

    fn touch(&mut self) {
        self.modified_at = Utc::now();
    }
}
