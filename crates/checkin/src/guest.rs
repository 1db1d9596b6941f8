//! Core guest types for checkin.
//!
//! A [`Candidate`] is what a scan produces; a [`Guest`] is what a completed
//! check-in commits to the store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Party size assumed for records persisted before party sizes existed.
const LEGACY_PARTY_SIZE: u32 = 1;

/// Unique identifier assigned to a guest at commit time.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GuestId(String);

impl GuestId {
    /// Generate a fresh random identifier.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Borrow the identifier as a string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for GuestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A parsed scan awaiting party-size and gift confirmation.
///
/// Candidates are transient: they live between a scan and its commit or
/// cancellation and are never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    /// Guest name as encoded in the QR payload.
    pub name: String,
    /// Guest phone as encoded in the QR payload. Not validated.
    pub phone: String,
}

impl Candidate {
    /// Create a new candidate.
    #[must_use]
    pub fn new(name: impl Into<String>, phone: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            phone: phone.into(),
        }
    }

    /// Check whether `guest` is the same person: name compared
    /// case-insensitively, phone compared exactly.
    #[must_use]
    pub fn matches(&self, guest: &Guest) -> bool {
        self.phone == guest.phone && self.name.to_lowercase() == guest.name.to_lowercase()
    }

    /// The QR payload encoding this candidate.
    #[must_use]
    pub fn payload(&self) -> String {
        format!("{},{}", self.name, self.phone)
    }
}

/// A committed check-in record.
///
/// Guests are immutable once committed. The serialized form uses camelCase
/// keys; fields introduced after the first schema revision fall back to
/// defaults when absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Guest {
    /// Unique identifier.
    pub id: GuestId,

    /// Guest name.
    pub name: String,

    /// Guest phone.
    #[serde(default)]
    pub phone: String,

    /// Number of people represented by this check-in (at least 1).
    #[serde(default = "legacy_party_size")]
    pub party_size: u32,

    /// Number of gifts brought.
    #[serde(default)]
    pub gift_count: u32,

    /// When the guest was checked in.
    pub checked_in_at: DateTime<Utc>,
}

fn legacy_party_size() -> u32 {
    LEGACY_PARTY_SIZE
}

impl Guest {
    /// Finalize a candidate into a guest record stamped with the current time.
    pub(crate) fn commit(candidate: Candidate, party_size: u32, gift_count: u32) -> Self {
        Self {
            id: GuestId::generate(),
            name: candidate.name,
            phone: candidate.phone,
            party_size: party_size.max(1),
            gift_count,
            checked_in_at: Utc::now(),
        }
    }
}
