use std::{collections::HashSet, fmt, str::FromStr};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Wiki every local username belongs to.
pub const DEFAULT_WIKI: &str = "xwiki";
/// Space holding user profiles.
pub const DEFAULT_SPACE: &str = "XWiki";

/// Fully qualified user identity, written `wiki:Space.name`.
///
/// `xwiki:XWiki.jdoe`, `XWiki.jdoe` and `jdoe` all parse to the same reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct UserRef {
    wiki: String,
    space: String,
    name: String,
}

impl UserRef {
    /// Parses any accepted username form. Returns `None` for blank or malformed input.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        let (wiki, rest) = match raw.split_once(':') {
            Some((wiki, rest)) => (wiki, rest),
            None => (DEFAULT_WIKI, raw),
        };
        let (space, name) = match rest.split_once('.') {
            Some((space, name)) => (space, name),
            None => (DEFAULT_SPACE, rest),
        };
        [wiki, space, name]
            .iter()
            .all(|part| is_valid_part(part))
            .then(|| Self {
                wiki: wiki.to_string(),
                space: space.to_string(),
                name: name.to_string(),
            })
    }

    /// Local user name, e.g. `jdoe`.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Wiki the user lives in.
    #[must_use]
    pub fn wiki(&self) -> &str {
        &self.wiki
    }
}

fn is_valid_part(part: &str) -> bool {
    !part.is_empty()
        && part
            .chars()
            .all(|c| !c.is_whitespace() && c != ':' && c != '.')
}

impl fmt::Display for UserRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}.{}", self.wiki, self.space, self.name)
    }
}

impl FromStr for UserRef {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| format!("invalid user reference `{s}`"))
    }
}

impl TryFrom<String> for UserRef {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<UserRef> for String {
    fn from(value: UserRef) -> Self {
        value.to_string()
    }
}

/// Public profile of a known user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    /// Identity.
    pub user: UserRef,
    /// Display name; falls back to the local name when blank.
    pub name: String,
    /// Contact address, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl UserProfile {
    /// Creates a profile without an email address.
    #[must_use]
    pub fn new(user: UserRef, name: impl Into<String>) -> Self {
        Self {
            user,
            name: name.into(),
            email: None,
        }
    }

    /// Sets the contact address.
    #[must_use]
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// Name shown to other users.
    #[must_use]
    pub fn display_name(&self) -> &str {
        if self.name.trim().is_empty() {
            self.user.name()
        } else {
            &self.name
        }
    }
}

/// Known users and the subset holding administrator rights.
#[derive(Debug, Clone, Default)]
pub struct UserDirectory {
    profiles: IndexMap<UserRef, UserProfile>,
    admins: HashSet<UserRef>,
}

impl UserDirectory {
    /// Creates an empty directory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers or replaces a user profile.
    pub fn insert(&mut self, profile: UserProfile) {
        self.profiles.insert(profile.user.clone(), profile);
    }

    /// Marks a known user as administrator. Returns false if the user is unknown.
    pub fn grant_admin(&mut self, user: &UserRef) -> bool {
        if self.profiles.contains_key(user) {
            self.admins.insert(user.clone());
            true
        } else {
            false
        }
    }

    /// Builder-style variant of [`Self::insert`].
    #[must_use]
    pub fn with_user(mut self, profile: UserProfile) -> Self {
        self.insert(profile);
        self
    }

    /// Looks up a profile.
    #[must_use]
    pub fn get(&self, user: &UserRef) -> Option<&UserProfile> {
        self.profiles.get(user)
    }

    /// Parses a username and returns it only when it names a known user.
    #[must_use]
    pub fn resolve(&self, raw: &str) -> Option<UserRef> {
        UserRef::parse(raw).filter(|user| self.profiles.contains_key(user))
    }

    /// Whether the user holds administrator rights.
    #[must_use]
    pub fn is_admin(&self, user: &UserRef) -> bool {
        self.admins.contains(user)
    }

    /// Number of known users.
    #[must_use]
    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    /// Whether no users are known.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn username_forms_normalize() {
        let full = UserRef::parse("xwiki:XWiki.jdoe").unwrap();
        assert_eq!(UserRef::parse("XWiki.jdoe").unwrap(), full);
        assert_eq!(UserRef::parse("  jdoe ").unwrap(), full);
        assert_eq!(full.to_string(), "xwiki:XWiki.jdoe");
        assert_eq!(full.name(), "jdoe");
        assert_eq!(full.wiki(), "xwiki");
    }

    #[test]
    fn malformed_usernames_are_rejected() {
        for raw in ["", "   ", "xwiki:", "XWiki.", ":jdoe", "john doe", "a.b.c"] {
            assert!(UserRef::parse(raw).is_none(), "{raw} should not parse");
        }
    }

    #[test]
    fn directory_resolves_only_known_users() {
        let jdoe = UserRef::parse("jdoe").unwrap();
        let mut directory = UserDirectory::new()
            .with_user(UserProfile::new(jdoe.clone(), "John Doe").with_email("jdoe@example.org"));
        assert!(directory.grant_admin(&jdoe));
        assert!(!directory.grant_admin(&UserRef::parse("ghost").unwrap()));
        assert_eq!(directory.resolve("XWiki.jdoe"), Some(jdoe.clone()));
        assert_eq!(directory.resolve("ghost"), None);
        assert!(directory.is_admin(&jdoe));
        assert_eq!(directory.len(), 1);
    }

    #[test]
    fn display_name_falls_back_to_local_name() {
        let profile = UserProfile::new(UserRef::parse("asmith").unwrap(), " ");
        assert_eq!(profile.display_name(), "asmith");
    }

    #[test]
    fn serializes_as_qualified_string() {
        let user = UserRef::parse("jdoe").unwrap();
        assert_eq!(serde_json::to_string(&user).unwrap(), "\"xwiki:XWiki.jdoe\"");
        let back: UserRef = serde_json::from_str("\"jdoe\"").unwrap();
        assert_eq!(back, user);
    }
}
