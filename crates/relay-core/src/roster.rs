//! Registered-user directory for Relay.
//!
//! The roster validates and stores user profiles. Callers consult it
//! before registering an identity with the broker; the broker itself never
//! reads it.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Roster errors.
#[derive(Debug, Error)]
pub enum RosterError {
    /// The user's display name is blank.
    #[error("name cannot be empty")]
    MissingName,

    /// The user's identity is blank.
    #[error("user ID cannot be empty")]
    MissingId,

    /// The email address is not structurally valid.
    #[error("invalid email: {0}")]
    InvalidEmail(String),

    /// A user with this ID is already present.
    #[error("user already exists: {0}")]
    AlreadyExists(String),

    /// No user with this ID.
    #[error("user not found: {0}")]
    NotFound(String),
}

/// A chat user profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Unique identity, as used for broker registration.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Contact email address.
    pub email: String,
}

impl User {
    /// Create a new user profile.
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            email: email.into(),
        }
    }

    /// Validate the profile fields.
    ///
    /// # Errors
    ///
    /// Returns an error if the ID or name is blank, or the email is not
    /// structurally valid.
    pub fn validate(&self) -> Result<(), RosterError> {
        if self.name.trim().is_empty() {
            return Err(RosterError::MissingName);
        }
        if self.id.trim().is_empty() {
            return Err(RosterError::MissingId);
        }
        if !valid_email(&self.email) {
            return Err(RosterError::InvalidEmail(self.email.clone()));
        }
        Ok(())
    }
}

/// Structural email check: a single `@` with non-empty halves and no
/// whitespace.
fn valid_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && !domain.is_empty() && !domain.contains('@')
        }
        None => false,
    }
}

/// The directory of registered users.
#[derive(Debug, Default)]
pub struct Roster {
    users: DashMap<String, User>,
}

impl Roster {
    /// Create an empty roster.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a user to the roster.
    ///
    /// # Errors
    ///
    /// Returns a validation error for bad profiles, or
    /// [`RosterError::AlreadyExists`] for a duplicate ID.
    pub fn add(&self, user: User) -> Result<(), RosterError> {
        user.validate()?;

        match self.users.entry(user.id.clone()) {
            Entry::Occupied(_) => Err(RosterError::AlreadyExists(user.id)),
            Entry::Vacant(entry) => {
                debug!(user = %user.id, "User added to roster");
                entry.insert(user);
                Ok(())
            }
        }
    }

    /// Remove a user by ID, returning the removed profile.
    ///
    /// # Errors
    ///
    /// Returns [`RosterError::NotFound`] if the ID is absent.
    pub fn remove(&self, id: &str) -> Result<User, RosterError> {
        match self.users.remove(id) {
            Some((_, user)) => {
                debug!(user = %id, "User removed from roster");
                Ok(user)
            }
            None => Err(RosterError::NotFound(id.to_string())),
        }
    }

    /// Look up a user by ID.
    ///
    /// # Errors
    ///
    /// Returns [`RosterError::NotFound`] if the ID is absent.
    pub fn get(&self, id: &str) -> Result<User, RosterError> {
        self.users
            .get(id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| RosterError::NotFound(id.to_string()))
    }

    /// Check if a user ID is present.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.users.contains_key(id)
    }

    /// Get the number of registered users.
    #[must_use]
    pub fn len(&self) -> usize {
        self.users.len()
    }

    /// Check if the roster is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alice() -> User {
        User::new("alice", "Alice", "alice@example.com")
    }

    #[test]
    fn test_add_get_remove_round_trip() {
        let roster = Roster::new();
        roster.add(alice()).unwrap();

        assert!(roster.contains("alice"));
        assert_eq!(roster.len(), 1);
        assert_eq!(roster.get("alice").unwrap().name, "Alice");

        let removed = roster.remove("alice").unwrap();
        assert_eq!(removed.email, "alice@example.com");
        assert!(roster.is_empty());
    }

    #[test]
    fn test_duplicate_add_is_rejected() {
        let roster = Roster::new();
        roster.add(alice()).unwrap();

        assert!(matches!(
            roster.add(alice()),
            Err(RosterError::AlreadyExists(_))
        ));
        assert_eq!(roster.len(), 1);
    }

    #[test]
    fn test_missing_user_errors() {
        let roster = Roster::new();

        assert!(matches!(roster.get("ghost"), Err(RosterError::NotFound(_))));
        assert!(matches!(
            roster.remove("ghost"),
            Err(RosterError::NotFound(_))
        ));
    }

    #[test]
    fn test_validation_rejects_blank_fields() {
        assert!(matches!(
            User::new("alice", "  ", "alice@example.com").validate(),
            Err(RosterError::MissingName)
        ));
        assert!(matches!(
            User::new("", "Alice", "alice@example.com").validate(),
            Err(RosterError::MissingId)
        ));
    }

    #[test]
    fn test_validation_rejects_bad_emails() {
        for email in ["", "no-at-sign", "@nodomain", "nolocal@", "two@@ats", "has space@x"] {
            let user = User::new("alice", "Alice", email);
            assert!(
                matches!(user.validate(), Err(RosterError::InvalidEmail(_))),
                "accepted bad email {email:?}"
            );
        }
        assert!(User::new("alice", "Alice", "a@b").validate().is_ok());
    }
}
