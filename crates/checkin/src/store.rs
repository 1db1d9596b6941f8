//! The guest list and event name, persisted on every mutation.

use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::guest::{Candidate, Guest};
use crate::storage::KeyValueStore;

/// Storage key holding the JSON guest list.
pub const GUESTS_KEY: &str = "guests";

/// Storage key holding the event display name.
pub const EVENT_NAME_KEY: &str = "eventName";

/// Event name used when none has been stored or configured.
pub const DEFAULT_EVENT_NAME: &str = "Event Check-In";

/// Ordered collection of committed guests, newest first.
///
/// Every mutation is written through to the backing [`KeyValueStore`]
/// before the method returns. A failed write does not undo the in-memory
/// change: the error is logged and returned so the caller can warn the
/// operator, and the next successful write catches the backing store up.
#[derive(Debug)]
pub struct GuestStore {
    backend: Box<dyn KeyValueStore>,
    guests: Vec<Guest>,
    event_name: String,
}

impl GuestStore {
    /// Load the guest list and event name from `backend`.
    ///
    /// `default_event_name` is used when no name has been stored yet.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be read or the stored guest
    /// list is not valid JSON.
    pub fn load(
        backend: Box<dyn KeyValueStore>,
        default_event_name: impl Into<String>,
    ) -> Result<Self> {
        let guests = match backend.get_item(GUESTS_KEY)? {
            Some(raw) => {
                serde_json::from_str::<Vec<Guest>>(&raw).map_err(|source| Error::CorruptEntry {
                    key: GUESTS_KEY.to_string(),
                    source,
                })?
            }
            None => Vec::new(),
        };

        let event_name = backend
            .get_item(EVENT_NAME_KEY)?
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| default_event_name.into());

        debug!(guests = guests.len(), event = %event_name, "Loaded guest store");
        Ok(Self {
            backend,
            guests,
            event_name,
        })
    }

    /// Guests in reverse check-in order (most recent first).
    #[must_use]
    pub fn guests(&self) -> &[Guest] {
        &self.guests
    }

    /// Number of check-ins.
    #[must_use]
    pub fn count(&self) -> usize {
        self.guests.len()
    }

    /// Check whether no one has checked in.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.guests.is_empty()
    }

    /// Total number of people present (sum of party sizes).
    #[must_use]
    pub fn total_people(&self) -> u64 {
        self.guests.iter().map(|g| u64::from(g.party_size)).sum()
    }

    /// Total number of gifts received.
    #[must_use]
    pub fn total_gifts(&self) -> u64 {
        self.guests.iter().map(|g| u64::from(g.gift_count)).sum()
    }

    /// Find an existing guest matching `candidate` (case-insensitive name,
    /// exact phone).
    #[must_use]
    pub fn find_duplicate(&self, candidate: &Candidate) -> Option<&Guest> {
        self.guests.iter().find(|g| candidate.matches(g))
    }

    /// Check whether `candidate` has already checked in.
    #[must_use]
    pub fn contains_duplicate(&self, candidate: &Candidate) -> bool {
        self.find_duplicate(candidate).is_some()
    }

    /// The event display name.
    #[must_use]
    pub fn event_name(&self) -> &str {
        &self.event_name
    }

    /// Prepend a guest and persist the list.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the write fails. The guest stays in the
    /// in-memory list regardless.
    pub fn append(&mut self, guest: Guest) -> Result<()> {
        info!(id = %guest.id, name = %guest.name, party = guest.party_size, gifts = guest.gift_count, "Guest checked in");
        self.guests.insert(0, guest);
        self.save_guests()
    }

    /// Remove every guest and persist the empty list.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the write fails. The in-memory list is
    /// empty regardless.
    pub fn clear(&mut self) -> Result<()> {
        let removed = self.guests.len();
        self.guests.clear();
        info!(removed, "Guest list cleared");
        self.save_guests()
    }

    /// Rename the event. Surrounding whitespace is trimmed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EmptyEventName`] (leaving the name unchanged) if
    /// the trimmed name is empty, or a storage error if the write fails.
    pub fn set_event_name(&mut self, name: &str) -> Result<()> {
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::EmptyEventName);
        }

        name.clone_into(&mut self.event_name);
        info!(event = %self.event_name, "Event renamed");
        self.persist(EVENT_NAME_KEY, &self.event_name)
    }

    fn save_guests(&self) -> Result<()> {
        let raw = serde_json::to_string(&self.guests)?;
        self.persist(GUESTS_KEY, &raw)
    }

    fn persist(&self, key: &str, value: &str) -> Result<()> {
        self.backend.set_item(key, value).map_err(|e| {
            warn!(key, error = %e, "Failed to persist; in-memory state kept");
            e
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    use super::*;
    use crate::storage::Storage;

    /// A backend whose writes can be made to fail.
    #[derive(Debug)]
    pub(crate) struct FlakyStore {
        inner: Storage,
        pub(crate) fail_writes: Arc<AtomicBool>,
    }

    impl FlakyStore {
        pub(crate) fn new() -> Self {
            Self {
                inner: Storage::open_in_memory().unwrap(),
                fail_writes: Arc::new(AtomicBool::new(false)),
            }
        }
    }

    impl KeyValueStore for FlakyStore {
        fn get_item(&self, key: &str) -> Result<Option<String>> {
            self.inner.get_item(key)
        }

        fn set_item(&self, key: &str, value: &str) -> Result<()> {
            if self.fail_writes.load(Ordering::SeqCst) {
                return Err(Error::DatabaseQuery(rusqlite::Error::InvalidQuery));
            }
            self.inner.set_item(key, value)
        }
    }

    fn memory_store() -> GuestStore {
        GuestStore::load(
            Box::new(Storage::open_in_memory().unwrap()),
            DEFAULT_EVENT_NAME,
        )
        .unwrap()
    }

    fn guest(name: &str, phone: &str, party: u32, gifts: u32) -> Guest {
        Guest::commit(Candidate::new(name, phone), party, gifts)
    }

    #[test]
    fn test_load_empty() {
        let store = memory_store();
        assert!(store.is_empty());
        assert_eq!(store.count(), 0);
        assert_eq!(store.event_name(), DEFAULT_EVENT_NAME);
    }

    #[test]
    fn test_append_prepends() {
        let mut store = memory_store();
        store.append(guest("First", "1", 1, 0)).unwrap();
        store.append(guest("Second", "2", 1, 0)).unwrap();

        let names: Vec<&str> = store.guests().iter().map(|g| g.name.as_str()).collect();
        assert_eq!(names, vec!["Second", "First"]);
    }

    #[test]
    fn test_totals() {
        let mut store = memory_store();
        store.append(guest("A", "1", 3, 2)).unwrap();
        store.append(guest("B", "2", 2, 0)).unwrap();

        assert_eq!(store.count(), 2);
        assert_eq!(store.total_people(), 5);
        assert_eq!(store.total_gifts(), 2);
    }

    #[test]
    fn test_clear_resets_everything() {
        let mut store = memory_store();
        store.append(guest("A", "1", 4, 3)).unwrap();
        store.append(guest("B", "2", 2, 1)).unwrap();

        store.clear().unwrap();

        assert_eq!(store.count(), 0);
        assert_eq!(store.total_people(), 0);
        assert_eq!(store.total_gifts(), 0);
    }

    #[test]
    fn test_clear_empty_store() {
        let mut store = memory_store();
        store.clear().unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn test_duplicate_detection() {
        let mut store = memory_store();
        store.append(guest("Jane Doe", "555", 1, 0)).unwrap();

        assert!(store.contains_duplicate(&Candidate::new("jane doe", "555")));
        assert!(!store.contains_duplicate(&Candidate::new("jane doe", "556")));
        assert_eq!(
            store
                .find_duplicate(&Candidate::new("JANE DOE", "555"))
                .map(|g| g.name.as_str()),
            Some("Jane Doe")
        );
    }

    #[test]
    fn test_event_name_trimmed() {
        let mut store = memory_store();
        store.set_event_name("  Spring Gala  ").unwrap();
        assert_eq!(store.event_name(), "Spring Gala");
    }

    #[test]
    fn test_empty_event_name_rejected() {
        let mut store = memory_store();
        store.set_event_name("Gala").unwrap();

        let err = store.set_event_name("   ").unwrap_err();
        assert!(matches!(err, Error::EmptyEventName));
        assert_eq!(store.event_name(), "Gala");
    }

    #[test]
    fn test_round_trip_through_backend() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("checkin.db");

        {
            let mut store =
                GuestStore::load(Box::new(Storage::open(&path).unwrap()), DEFAULT_EVENT_NAME)
                    .unwrap();
            store.append(guest("First", "1", 2, 1)).unwrap();
            store.append(guest("Second", "2", 1, 0)).unwrap();
            store.set_event_name("Reunion").unwrap();
        }

        let store =
            GuestStore::load(Box::new(Storage::open(&path).unwrap()), DEFAULT_EVENT_NAME).unwrap();
        assert_eq!(store.event_name(), "Reunion");
        assert_eq!(store.guests()[0].name, "Second");
        assert_eq!(store.guests()[1].name, "First");
        assert_eq!(store.total_people(), 3);
    }

    #[test]
    fn test_load_legacy_records() {
        let backend = Storage::open_in_memory().unwrap();
        backend
            .set_item(
                GUESTS_KEY,
                r#"[{"id":"GUEST-002","name":"Sarah Williams","checkedInAt":"2024-05-01T18:31:00Z"},
                    {"id":"GUEST-001","name":"Alex Johnson","phone":"555","partySize":3,"checkedInAt":"2024-05-01T18:30:00Z"}]"#,
            )
            .unwrap();

        let store = GuestStore::load(Box::new(backend), DEFAULT_EVENT_NAME).unwrap();
        assert_eq!(store.count(), 2);
        assert_eq!(store.guests()[0].party_size, 1);
        assert_eq!(store.guests()[0].gift_count, 0);
        assert_eq!(store.total_people(), 4);
    }

    #[test]
    fn test_load_corrupt_guest_list() {
        let backend = Storage::open_in_memory().unwrap();
        backend.set_item(GUESTS_KEY, "{not json").unwrap();

        let err = GuestStore::load(Box::new(backend), DEFAULT_EVENT_NAME).unwrap_err();
        assert!(matches!(err, Error::CorruptEntry { .. }));
    }

    #[test]
    fn test_blank_stored_event_name_uses_default() {
        let backend = Storage::open_in_memory().unwrap();
        backend.set_item(EVENT_NAME_KEY, "  ").unwrap();

        let store = GuestStore::load(Box::new(backend), "Configured Name").unwrap();
        assert_eq!(store.event_name(), "Configured Name");
    }

    #[test]
    fn test_failed_write_keeps_memory_state() {
        let backend = FlakyStore::new();
        let fail = Arc::clone(&backend.fail_writes);
        let mut store = GuestStore::load(Box::new(backend), DEFAULT_EVENT_NAME).unwrap();

        fail.store(true, Ordering::SeqCst);
        let err = store.append(guest("A", "1", 2, 1)).unwrap_err();

        assert!(err.is_storage_error());
        assert_eq!(store.count(), 1);
        assert_eq!(store.total_people(), 2);
    }

    #[test]
    fn test_failed_clear_still_empties_memory() {
        let backend = FlakyStore::new();
        let fail = Arc::clone(&backend.fail_writes);
        let mut store = GuestStore::load(Box::new(backend), DEFAULT_EVENT_NAME).unwrap();
        store.append(guest("A", "1", 1, 0)).unwrap();

        fail.store(true, Ordering::SeqCst);
        assert!(store.clear().is_err());
        assert!(store.is_empty());
    }
}
