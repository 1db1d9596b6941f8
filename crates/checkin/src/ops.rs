//! One-shot store operations behind the `admit` and `clear` commands.

use crate::config::CheckInConfig;
use crate::error::{Error, Result};
use crate::flow::{CheckIn, CheckInFlow, ScanOutcome};
use crate::store::GuestStore;

/// Check in `payload` without prompting.
///
/// `party_size` falls back to the configured default and is clamped to the
/// configured maximum. A failed save still commits the guest in memory and
/// is reported through [`CheckIn::persist_error`].
///
/// # Errors
///
/// Returns [`Error::Parse`] for a malformed payload and
/// [`Error::DuplicateGuest`] if the guest has already checked in.
pub fn admit(
    store: &mut GuestStore,
    config: &CheckInConfig,
    payload: &str,
    party_size: Option<u32>,
    gifts: u32,
) -> Result<CheckIn> {
    let mut flow = CheckInFlow::new(config);

    match flow.scan(store, payload) {
        ScanOutcome::Accepted(_) => {}
        ScanOutcome::Rejected(e) => return Err(Error::Parse(e)),
        ScanOutcome::Duplicate(candidate) => {
            return Err(Error::DuplicateGuest {
                name: candidate.name,
                phone: candidate.phone,
            })
        }
        ScanOutcome::Ignored => return Err(Error::internal("new flow was not idle")),
    }

    if let Some(size) = party_size {
        flow.set_party_size(size)?;
    }
    flow.confirm_party_size()?;
    flow.set_gift_count(gifts)?;
    flow.confirm_gift_count(store)
}

/// Result of [`clear`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClearOutcome {
    /// Nothing removed; the caller has to confirm first.
    Unconfirmed {
        /// Guests that would be removed.
        pending: usize,
    },
    /// The guest list was emptied.
    Cleared {
        /// Guests removed.
        removed: usize,
    },
}

/// Remove every guest, but only when `confirmed`.
///
/// # Errors
///
/// Returns an error if the emptied list cannot be saved.
pub fn clear(store: &mut GuestStore, confirmed: bool) -> Result<ClearOutcome> {
    let count = store.count();
    if !confirmed {
        return Ok(ClearOutcome::Unconfirmed { pending: count });
    }

    store.clear()?;
    Ok(ClearOutcome::Cleared { removed: count })
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;
    use std::sync::Arc;

    use super::*;
    use crate::storage::Storage;
    use crate::store::tests::FlakyStore;
    use crate::store::DEFAULT_EVENT_NAME;

    fn memory_store() -> GuestStore {
        GuestStore::load(
            Box::new(Storage::open_in_memory().unwrap()),
            DEFAULT_EVENT_NAME,
        )
        .unwrap()
    }

    #[test]
    fn test_admit_uses_defaults_and_clamps() {
        let mut store = memory_store();
        let config = CheckInConfig {
            max_party_size: 4,
            default_party_size: 2,
        };

        let check_in = admit(&mut store, &config, "Alex,1", None, 1).unwrap();
        assert!(check_in.persist_error.is_none());
        assert_eq!(check_in.guest.party_size, 2);

        admit(&mut store, &config, "Sam,2", Some(9), 0).unwrap();
        assert_eq!(store.guests()[0].party_size, 4);
        assert_eq!(store.total_people(), 6);
        assert_eq!(store.total_gifts(), 1);
    }

    #[test]
    fn test_admit_rejects_malformed_payload() {
        let mut store = memory_store();
        let err = admit(&mut store, &CheckInConfig::default(), "just a name", None, 0)
            .unwrap_err();
        assert!(matches!(err, Error::Parse(_)));
        assert!(store.is_empty());
    }

    #[test]
    fn test_admit_refuses_duplicate() {
        let mut store = memory_store();
        let config = CheckInConfig::default();
        admit(&mut store, &config, "Jane Doe,555", None, 0).unwrap();

        let err = admit(&mut store, &config, " jane doe , 555 ", Some(3), 2).unwrap_err();
        assert!(err.is_duplicate());
        assert_eq!(store.count(), 1);
        assert_eq!(store.total_people(), 1);
    }

    #[test]
    fn test_admit_reports_failed_save() {
        let backend = FlakyStore::new();
        let fail_writes = Arc::clone(&backend.fail_writes);
        let mut store = GuestStore::load(Box::new(backend), DEFAULT_EVENT_NAME).unwrap();
        fail_writes.store(true, Ordering::SeqCst);

        let check_in = admit(&mut store, &CheckInConfig::default(), "Alex,1", None, 0).unwrap();
        let err = check_in.persist_error.expect("save should have failed");
        assert!(err.is_storage_error());
        // Kept in memory for the next successful write.
        assert_eq!(store.count(), 1);
    }

    #[test]
    fn test_clear_requires_confirmation() {
        let mut store = memory_store();
        admit(&mut store, &CheckInConfig::default(), "Alex,1", None, 0).unwrap();
        admit(&mut store, &CheckInConfig::default(), "Sam,2", None, 0).unwrap();

        assert_eq!(
            clear(&mut store, false).unwrap(),
            ClearOutcome::Unconfirmed { pending: 2 }
        );
        assert_eq!(store.count(), 2);

        assert_eq!(
            clear(&mut store, true).unwrap(),
            ClearOutcome::Cleared { removed: 2 }
        );
        assert!(store.is_empty());
    }

    #[test]
    fn test_clear_reports_failed_save() {
        let backend = FlakyStore::new();
        let fail_writes = Arc::clone(&backend.fail_writes);
        let mut store = GuestStore::load(Box::new(backend), DEFAULT_EVENT_NAME).unwrap();
        admit(&mut store, &CheckInConfig::default(), "Alex,1", None, 0).unwrap();
        fail_writes.store(true, Ordering::SeqCst);

        let err = clear(&mut store, true).unwrap_err();
        assert!(err.is_storage_error());
    }
}
