//! User types for z-cohort.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{CohortError, Result};
use crate::UserId;

/// Maximum user name length in characters.
pub const USER_NAME_MAX_LEN: usize = 100;

/// A user that can be placed into segments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// The user ID.
    pub id: UserId,

    /// Display name.
    pub name: String,

    /// Inactive users are skipped by distributions that ask for active users only.
    pub active: bool,

    /// When the user was created.
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Create a new active user.
    ///
    /// # Errors
    ///
    /// Returns `CohortError::InvalidName` if the name is empty or too long.
    pub fn new(id: UserId, name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        validate_name(&name)?;
        Ok(Self {
            id,
            name,
            active: true,
            created_at: Utc::now(),
        })
    }

    /// Apply a partial update.
    ///
    /// # Errors
    ///
    /// Returns `CohortError::InvalidName` if the new name is invalid.
    pub fn apply(&mut self, patch: UserPatch) -> Result<()> {
        if let Some(name) = patch.name {
            validate_name(&name)?;
            self.name = name;
        }
        if let Some(active) = patch.active {
            self.active = active;
        }
        Ok(())
    }
}

/// Partial update of a user.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserPatch {
    /// New display name.
    #[serde(default)]
    pub name: Option<String>,
    /// New activity flag.
    #[serde(default)]
    pub active: Option<bool>,
}

fn validate_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(CohortError::InvalidName {
            field: "user name",
            reason: "must not be empty".into(),
        });
    }
    if name.chars().count() > USER_NAME_MAX_LEN {
        return Err(CohortError::InvalidName {
            field: "user name",
            reason: format!("must be at most {USER_NAME_MAX_LEN} characters"),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_user_is_active() {
        let user = User::new(UserId::new(1), "Ada").unwrap();
        assert!(user.active);
        assert_eq!(user.name, "Ada");
    }

    #[test]
    fn empty_name_rejected() {
        assert!(matches!(
            User::new(UserId::new(1), ""),
            Err(CohortError::InvalidName { field: "user name", .. })
        ));
    }

    #[test]
    fn patch_deactivates() {
        let mut user = User::new(UserId::new(1), "Ada").unwrap();
        user.apply(UserPatch {
            name: None,
            active: Some(false),
        })
        .unwrap();
        assert!(!user.active);
        assert_eq!(user.name, "Ada");
    }
}
