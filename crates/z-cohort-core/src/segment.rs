//! Segment types for z-cohort.
//!
//! A segment is a named cohort of users. It has a store-allocated integer id
//! and a unique, human-chosen slug that external systems use as a stable key.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{CohortError, Result};
use crate::SegmentId;

// ============================================================================
// Constants
// ============================================================================

/// Maximum slug length in characters.
pub const SLUG_MAX_LEN: usize = 50;

/// Maximum segment name length in characters.
pub const SEGMENT_NAME_MAX_LEN: usize = 100;

/// Maximum description length in characters.
pub const DESCRIPTION_MAX_LEN: usize = 200;

/// A validated segment slug matching `[A-Z0-9_]+`, at most 50 characters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Slug(String);

impl Slug {
    /// Validate and wrap a slug.
    ///
    /// # Errors
    ///
    /// Returns `CohortError::InvalidSlug` if the slug is empty, longer than
    /// [`SLUG_MAX_LEN`] or contains characters outside `[A-Z0-9_]`.
    pub fn parse(value: impl Into<String>) -> Result<Self> {
        let value = value.into();

        let reason = if value.is_empty() {
            Some("must not be empty".to_string())
        } else if value.len() > SLUG_MAX_LEN {
            Some(format!("must be at most {SLUG_MAX_LEN} characters"))
        } else if !value
            .bytes()
            .all(|b| b.is_ascii_uppercase() || b.is_ascii_digit() || b == b'_')
        {
            Some("must match [A-Z0-9_]+".to_string())
        } else {
            None
        };

        match reason {
            Some(reason) => Err(CohortError::InvalidSlug {
                slug: value,
                reason,
            }),
            None => Ok(Self(value)),
        }
    }

    /// The slug as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Slug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Slug {
    type Error = CohortError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(value)
    }
}

impl From<Slug> for String {
    fn from(slug: Slug) -> Self {
        slug.0
    }
}

/// A segment record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    /// Store-allocated identifier.
    pub id: SegmentId,

    /// Display name, unique across segments.
    pub name: String,

    /// External alias, unique across segments.
    pub slug: Slug,

    /// Optional free-form description.
    pub description: Option<String>,

    /// When the segment was created.
    pub created_at: DateTime<Utc>,

    /// When the segment was last updated.
    pub updated_at: DateTime<Utc>,
}

impl Segment {
    /// Build a segment from validated input and an allocated id.
    #[must_use]
    pub fn new(id: SegmentId, input: NewSegment) -> Self {
        let now = Utc::now();
        Self {
            id,
            name: input.name,
            slug: input.slug,
            description: input.description,
            created_at: now,
            updated_at: now,
        }
    }

    /// Apply a partial update and bump `updated_at`.
    ///
    /// An empty description clears it.
    ///
    /// # Errors
    ///
    /// Returns a validation error if the new name or description is invalid;
    /// the segment is left unchanged in that case.
    pub fn apply(&mut self, patch: SegmentPatch) -> Result<()> {
        if let Some(name) = &patch.name {
            validate_name(name)?;
        }
        let description = patch.description.map(|d| normalize_description(Some(d)));
        if let Some(Some(d)) = &description {
            validate_description(d)?;
        }

        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(description) = description {
            self.description = description;
        }
        self.updated_at = Utc::now();
        Ok(())
    }
}

/// Input for creating a segment.
#[derive(Debug, Clone, Deserialize)]
pub struct NewSegment {
    /// Display name.
    pub name: String,
    /// External alias.
    pub slug: Slug,
    /// Optional description.
    #[serde(default)]
    pub description: Option<String>,
}

impl NewSegment {
    /// Validate all fields of a new segment.
    ///
    /// # Errors
    ///
    /// Returns a validation error for an invalid slug, name or description.
    pub fn new(
        name: impl Into<String>,
        slug: impl Into<String>,
        description: Option<String>,
    ) -> Result<Self> {
        Self {
            name: name.into(),
            slug: Slug::parse(slug)?,
            description,
        }
        .validated()
    }

    /// Normalize the description and check the fields not covered by
    /// [`Slug`] validation. Deserialized input goes through this before it
    /// reaches the store.
    ///
    /// # Errors
    ///
    /// Returns a validation error for an invalid name or description.
    pub fn validated(mut self) -> Result<Self> {
        self.description = normalize_description(self.description);
        validate_name(&self.name)?;
        if let Some(description) = &self.description {
            validate_description(description)?;
        }
        Ok(self)
    }
}

/// Partial update of a segment. Slugs are immutable.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SegmentPatch {
    /// New display name.
    #[serde(default)]
    pub name: Option<String>,
    /// New description; an empty string clears it.
    #[serde(default)]
    pub description: Option<String>,
}

fn normalize_description(description: Option<String>) -> Option<String> {
    description.filter(|d| !d.trim().is_empty())
}

fn validate_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(CohortError::InvalidName {
            field: "segment name",
            reason: "must not be empty".into(),
        });
    }
    if name.chars().count() > SEGMENT_NAME_MAX_LEN {
        return Err(CohortError::InvalidName {
            field: "segment name",
            reason: format!("must be at most {SEGMENT_NAME_MAX_LEN} characters"),
        });
    }
    Ok(())
}

fn validate_description(description: &str) -> Result<()> {
    let len = description.chars().count();
    if len > DESCRIPTION_MAX_LEN {
        return Err(CohortError::DescriptionTooLong {
            len,
            max: DESCRIPTION_MAX_LEN,
        });
    }
    Ok(())
}
