//! The check-in state machine.
//!
//! One check-in is in flight at a time:
//!
//! ```text
//! Idle --scan--> AwaitingPartySize --confirm--> AwaitingGiftCount --confirm--> Idle (+ Guest)
//!   ^                  |                               |
//!   +------cancel------+---------------cancel----------+
//! ```
//!
//! Scans are parsed and checked for duplicates on arrival; malformed codes
//! and repeat guests never leave `Idle`. Scans that arrive while a prompt
//! is open are ignored. Nothing reaches the [`GuestStore`] until the gift
//! count is confirmed.

use std::fmt;

use tracing::{debug, warn};

use crate::config::CheckInConfig;
use crate::error::{Error, Result};
use crate::guest::{Candidate, Guest};
use crate::parser::{parse_candidate, ParseError};
use crate::store::GuestStore;

/// Smallest allowed party size.
pub const MIN_PARTY_SIZE: u32 = 1;

/// Current stage of the check-in flow.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum FlowState {
    /// Scanner open, waiting for a code.
    #[default]
    Idle,
    /// Asking how many people are in the party.
    AwaitingPartySize {
        /// The scanned guest.
        candidate: Candidate,
        /// Current prompt value.
        party_size: u32,
    },
    /// Asking how many gifts the party brought.
    AwaitingGiftCount {
        /// The scanned guest.
        candidate: Candidate,
        /// Confirmed party size.
        party_size: u32,
        /// Current prompt value.
        gift_count: u32,
    },
}

impl FlowState {
    /// Short human-readable state name.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::AwaitingPartySize { .. } => "awaiting party size",
            Self::AwaitingGiftCount { .. } => "awaiting gift count",
        }
    }

    /// Check whether no check-in is in flight.
    #[must_use]
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }

    /// The in-flight candidate, if any.
    #[must_use]
    pub fn candidate(&self) -> Option<&Candidate> {
        match self {
            Self::Idle => None,
            Self::AwaitingPartySize { candidate, .. } | Self::AwaitingGiftCount { candidate, .. } => {
                Some(candidate)
            }
        }
    }
}

/// Outcome of delivering decoded text to the flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanOutcome {
    /// A check-in was already in flight; the scan was dropped.
    Ignored,
    /// The text was not a guest code.
    Rejected(ParseError),
    /// The guest has already checked in.
    Duplicate(Candidate),
    /// The party-size prompt is now open for this guest.
    Accepted(Candidate),
}

impl ScanOutcome {
    /// The operator notice for this outcome, if one should be shown.
    #[must_use]
    pub fn notification(&self) -> Option<Notification> {
        match self {
            Self::Ignored | Self::Accepted(_) => None,
            Self::Rejected(e) => Some(Notification::InvalidCode {
                reason: e.to_string(),
            }),
            Self::Duplicate(candidate) => Some(Notification::AlreadyCheckedIn {
                name: candidate.name.clone(),
            }),
        }
    }
}

/// A committed check-in.
#[derive(Debug)]
pub struct CheckIn {
    /// The committed guest.
    pub guest: Guest,
    /// Set when the guest could not be persisted. The guest is in the
    /// in-memory list either way.
    pub persist_error: Option<Error>,
}

impl CheckIn {
    /// The success notice for this check-in.
    #[must_use]
    pub fn notification(&self) -> Notification {
        Notification::CheckedIn {
            name: self.guest.name.clone(),
            party_size: self.guest.party_size,
            gift_count: self.guest.gift_count,
        }
    }
}

/// Transient operator notices raised by the flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    /// A guest was committed.
    CheckedIn {
        /// Guest name.
        name: String,
        /// Party size.
        party_size: u32,
        /// Gift count.
        gift_count: u32,
    },
    /// A repeat scan was refused.
    AlreadyCheckedIn {
        /// Guest name.
        name: String,
    },
    /// A scan could not be parsed.
    InvalidCode {
        /// Why it was rejected.
        reason: String,
    },
    /// The operator abandoned a check-in.
    Cancelled {
        /// Guest name.
        name: String,
    },
}

impl fmt::Display for Notification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CheckedIn {
                name,
                party_size,
                gift_count,
            } => {
                let people = if *party_size == 1 { "person" } else { "people" };
                let gifts = if *gift_count == 1 { "gift" } else { "gifts" };
                write!(
                    f,
                    "{name} checked in: {party_size} {people}, {gift_count} {gifts}"
                )
            }
            Self::AlreadyCheckedIn { name } => write!(f, "{name} has already checked in!"),
            Self::InvalidCode { reason } => write!(f, "Invalid QR code: {reason}"),
            Self::Cancelled { name } => write!(f, "Check-in for {name} cancelled"),
        }
    }
}

/// Drives one check-in at a time from scan to commit.
#[derive(Debug, Clone)]
pub struct CheckInFlow {
    state: FlowState,
    max_party_size: u32,
    default_party_size: u32,
}

impl Default for CheckInFlow {
    fn default() -> Self {
        Self::new(&CheckInConfig::default())
    }
}

impl CheckInFlow {
    /// Create an idle flow using the configured party-size bounds.
    #[must_use]
    pub fn new(config: &CheckInConfig) -> Self {
        let max_party_size = config.max_party_size.max(MIN_PARTY_SIZE);
        Self {
            state: FlowState::Idle,
            max_party_size,
            default_party_size: config
                .default_party_size
                .clamp(MIN_PARTY_SIZE, max_party_size),
        }
    }

    /// The current state.
    #[must_use]
    pub fn state(&self) -> &FlowState {
        &self.state
    }

    /// Check whether no check-in is in flight (the scanner may be open).
    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.state.is_idle()
    }

    /// Largest accepted party size.
    #[must_use]
    pub fn max_party_size(&self) -> u32 {
        self.max_party_size
    }

    /// Deliver decoded text from the scanner.
    ///
    /// Only acts when idle. A well-formed, first-time guest opens the
    /// party-size prompt at the default size.
    pub fn scan(&mut self, store: &GuestStore, text: &str) -> ScanOutcome {
        if !self.is_idle() {
            debug!(state = self.state.name(), "Ignoring scan while check-in in flight");
            return ScanOutcome::Ignored;
        }

        let candidate = match parse_candidate(text) {
            Ok(candidate) => candidate,
            Err(e) => {
                debug!(error = %e, "Rejected scan");
                return ScanOutcome::Rejected(e);
            }
        };

        if store.contains_duplicate(&candidate) {
            warn!(name = %candidate.name, phone = %candidate.phone, "Duplicate check-in refused");
            return ScanOutcome::Duplicate(candidate);
        }

        debug!(name = %candidate.name, "Scan accepted, awaiting party size");
        self.state = FlowState::AwaitingPartySize {
            candidate: candidate.clone(),
            party_size: self.default_party_size,
        };
        ScanOutcome::Accepted(candidate)
    }

    /// Add one to the party size, stopping at the maximum.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidTransition`] unless the party-size prompt is open.
    pub fn increment_party_size(&mut self) -> Result<u32> {
        let max = self.max_party_size;
        self.update_party_size("change party size", |n| n.saturating_add(1).min(max))
    }

    /// Subtract one from the party size, stopping at 1.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidTransition`] unless the party-size prompt is open.
    pub fn decrement_party_size(&mut self) -> Result<u32> {
        self.update_party_size("change party size", |n| {
            n.saturating_sub(1).max(MIN_PARTY_SIZE)
        })
    }

    /// Set the party size, clamped to `1..=max`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidTransition`] unless the party-size prompt is open.
    pub fn set_party_size(&mut self, size: u32) -> Result<u32> {
        let max = self.max_party_size;
        self.update_party_size("change party size", |_| size.clamp(MIN_PARTY_SIZE, max))
    }

    /// Confirm the party size and open the gift prompt at 0.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidTransition`] unless the party-size prompt is open.
    pub fn confirm_party_size(&mut self) -> Result<u32> {
        match std::mem::take(&mut self.state) {
            FlowState::AwaitingPartySize {
                candidate,
                party_size,
            } => {
                debug!(name = %candidate.name, party_size, "Party size confirmed");
                self.state = FlowState::AwaitingGiftCount {
                    candidate,
                    party_size,
                    gift_count: 0,
                };
                Ok(party_size)
            }
            other => {
                let state = other.name();
                self.state = other;
                Err(Error::InvalidTransition {
                    action: "confirm party size",
                    state,
                })
            }
        }
    }

    /// Add one gift.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidTransition`] unless the gift prompt is open.
    pub fn increment_gift_count(&mut self) -> Result<u32> {
        self.update_gift_count(|n| n.saturating_add(1))
    }

    /// Remove one gift, stopping at 0.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidTransition`] unless the gift prompt is open.
    pub fn decrement_gift_count(&mut self) -> Result<u32> {
        self.update_gift_count(|n| n.saturating_sub(1))
    }

    /// Set the gift count.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidTransition`] unless the gift prompt is open.
    pub fn set_gift_count(&mut self, count: u32) -> Result<u32> {
        self.update_gift_count(|_| count)
    }

    /// Confirm the gift count and commit the guest to `store`.
    ///
    /// The flow returns to idle even when persisting fails; the failure is
    /// reported in [`CheckIn::persist_error`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidTransition`] unless the gift prompt is open.
    pub fn confirm_gift_count(&mut self, store: &mut GuestStore) -> Result<CheckIn> {
        match std::mem::take(&mut self.state) {
            FlowState::AwaitingGiftCount {
                candidate,
                party_size,
                gift_count,
            } => {
                let guest = Guest::commit(candidate, party_size, gift_count);
                let persist_error = store.append(guest.clone()).err();
                Ok(CheckIn {
                    guest,
                    persist_error,
                })
            }
            other => {
                let state = other.name();
                self.state = other;
                Err(Error::InvalidTransition {
                    action: "confirm gift count",
                    state,
                })
            }
        }
    }

    /// Abandon the in-flight check-in, returning its candidate.
    ///
    /// Does nothing when idle.
    pub fn cancel(&mut self) -> Option<Candidate> {
        let candidate = match std::mem::take(&mut self.state) {
            FlowState::Idle => None,
            FlowState::AwaitingPartySize { candidate, .. }
            | FlowState::AwaitingGiftCount { candidate, .. } => Some(candidate),
        };
        if let Some(candidate) = &candidate {
            debug!(name = %candidate.name, "Check-in cancelled");
        }
        candidate
    }

    fn update_party_size(
        &mut self,
        action: &'static str,
        update: impl FnOnce(u32) -> u32,
    ) -> Result<u32> {
        match &mut self.state {
            FlowState::AwaitingPartySize { party_size, .. } => {
                *party_size = update(*party_size);
                Ok(*party_size)
            }
            other => Err(Error::InvalidTransition {
                action,
                state: other.name(),
            }),
        }
    }

    fn update_gift_count(&mut self, update: impl FnOnce(u32) -> u32) -> Result<u32> {
        match &mut self.state {
            FlowState::AwaitingGiftCount { gift_count, .. } => {
                *gift_count = update(*gift_count);
                Ok(*gift_count)
            }
            other => Err(Error::InvalidTransition {
                action: "change gift count",
                state: other.name(),
            }),
        }
    }
}
