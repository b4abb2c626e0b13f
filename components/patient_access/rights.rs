use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{
    error::AccessError,
    record::{PatientRecord, Visibility},
    user::{UserDirectory, UserRef},
};

/// Ordered access levels; a higher level implies every lower one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessLevel {
    /// No access.
    None,
    /// Read the record.
    View,
    /// Modify the record.
    Edit,
    /// Modify the record and its sharing settings.
    Manage,
    /// Full control.
    Owner,
}

impl AccessLevel {
    /// Lowercase label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::View => "view",
            Self::Edit => "edit",
            Self::Manage => "manage",
            Self::Owner => "owner",
        }
    }
}

impl fmt::Display for AccessLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Visibility {
    /// Access granted to every caller by the visibility alone.
    #[must_use]
    pub const fn implied_access(self) -> AccessLevel {
        match self {
            Self::Private | Self::Matchable => AccessLevel::None,
            Self::Public => AccessLevel::View,
            Self::Open => AccessLevel::Edit,
        }
    }
}

/// Effective access of `caller` on `record`; `None` stands for an anonymous caller.
#[must_use]
pub fn access_level(
    directory: &UserDirectory,
    record: &PatientRecord,
    caller: Option<&UserRef>,
) -> AccessLevel {
    let public = record.visibility.implied_access();
    let Some(user) = caller else {
        return public;
    };
    if directory.is_admin(user) || &record.owner == user {
        return AccessLevel::Owner;
    }
    record
        .collaborator_level(user)
        .map_or(public, |level| level.max(public))
}

/// Fails with [`AccessError::Forbidden`] unless `caller` holds at least `required`.
pub fn authorize(
    directory: &UserDirectory,
    record: &PatientRecord,
    caller: Option<&UserRef>,
    required: AccessLevel,
) -> Result<(), AccessError> {
    let granted = access_level(directory, record, caller);
    if granted >= required {
        Ok(())
    } else {
        let who = caller.map_or_else(|| "anonymous caller".to_string(), ToString::to_string);
        Err(AccessError::Forbidden(format!(
            "{who} needs {required} access on {}",
            record.id
        )))
    }
}
