//! Presence registry: who is registered, who is online, and since when.

use std::collections::HashMap;

use chrono::Utc;
use parking_lot::RwLock;
use tracing::{debug, info};

use chathub_core::types::UserId;

use crate::error::SyncError;

use super::entry::{Key, PresenceEntry};

/// Both indexes live behind one lock so a reader can never observe one
/// updated without the other. Id allocation happens under the same lock.
#[derive(Debug)]
struct Indexes {
    /// User ID → entry
    by_id: HashMap<UserId, PresenceEntry>,
    /// Name → user ID
    by_name: HashMap<String, UserId>,
    /// Next candidate for [`Indexes::allocate`]
    next_id: u64,
}

impl Default for Indexes {
    fn default() -> Self {
        Self {
            by_id: HashMap::new(),
            by_name: HashMap::new(),
            next_id: 1,
        }
    }
}

impl Indexes {
    /// Hands out the lowest free id at or above the counter.
    fn allocate(&mut self) -> Result<UserId, SyncError> {
        loop {
            let candidate = UserId(self.next_id);
            let exhausted = self.next_id == u64::MAX;
            if !self.by_id.contains_key(&candidate) {
                self.next_id = self.next_id.saturating_add(1);
                return Ok(candidate);
            }
            if exhausted {
                return Err(SyncError::IdsExhausted);
            }
            self.next_id += 1;
        }
    }

    /// Adds a fresh entry. Never overwrites an existing id or name.
    fn insert(&mut self, user_id: UserId, name: &str) -> Result<PresenceEntry, SyncError> {
        if let Some(&owner) = self.by_name.get(name) {
            return Err(SyncError::NameTaken {
                name: name.to_string(),
                owner,
            });
        }
        if self.by_id.contains_key(&user_id) {
            return Err(SyncError::IdTaken(user_id));
        }

        let entry = PresenceEntry {
            user_id,
            name: name.to_string(),
            online: false,
            last_activity: Utc::now(),
        };
        self.by_name.insert(name.to_string(), user_id);
        self.by_id.insert(user_id, entry.clone());
        Ok(entry)
    }
}

/// Tracks presence state for all registered users.
#[derive(Debug, Default)]
pub struct PresenceRegistry {
    inner: RwLock<Indexes>,
}

impl PresenceRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a user. Idempotent for the same `(id, name)` pair; returns
    /// `true` when a new entry was created.
    ///
    /// Fails with [`SyncError::NameTaken`] when the name belongs to a
    /// different id, and with [`SyncError::IdTaken`] when the id belongs to
    /// a different name.
    pub fn register(&self, user_id: UserId, name: &str) -> Result<bool, SyncError> {
        let mut inner = self.inner.write();

        if inner.by_name.get(name) == Some(&user_id) {
            return Ok(false);
        }

        inner.insert(user_id, name)?;
        info!(user_id = %user_id, name = %name, "User registered");
        Ok(true)
    }

    /// Look a user up by name, registering it under a freshly allocated id
    /// if absent.
    ///
    /// Lookup, allocation and insert happen under one write lock, so two
    /// concurrent logins with the same name resolve to the same entry and
    /// a new id never collides with an explicitly registered one.
    pub fn register_name(&self, name: &str) -> Result<(PresenceEntry, bool), SyncError> {
        let mut inner = self.inner.write();

        let existing = inner
            .by_name
            .get(name)
            .and_then(|id| inner.by_id.get(id))
            .cloned();
        if let Some(entry) = existing {
            return Ok((entry, false));
        }

        let user_id = inner.allocate()?;
        let entry = inner.insert(user_id, name)?;
        info!(user_id = %user_id, name = %name, "User registered");
        Ok((entry, true))
    }

    /// Set a user's online flag and refresh its last activity.
    ///
    /// Returns the previous flag so callers can tell a transition from a
    /// repeat.
    pub fn set_online(&self, user_id: UserId, online: bool) -> Result<bool, SyncError> {
        let mut inner = self.inner.write();
        let entry = inner
            .by_id
            .get_mut(&user_id)
            .ok_or_else(|| SyncError::UnknownUser(Key::ById(user_id).to_string()))?;

        let was_online = entry.online;
        entry.online = online;
        entry.last_activity = Utc::now();
        debug!(user_id = %user_id, online, was_online, "Presence updated");
        Ok(was_online)
    }

    /// Refresh last activity without changing the online flag.
    pub fn touch(&self, user_id: UserId) -> Result<(), SyncError> {
        let mut inner = self.inner.write();
        let entry = inner
            .by_id
            .get_mut(&user_id)
            .ok_or_else(|| SyncError::UnknownUser(Key::ById(user_id).to_string()))?;
        entry.last_activity = Utc::now();
        Ok(())
    }

    /// Find an entry by id or by name.
    pub fn lookup(&self, key: &Key) -> Option<PresenceEntry> {
        let inner = self.inner.read();
        let user_id = match key {
            Key::ById(id) => *id,
            Key::ByName(name) => *inner.by_name.get(name)?,
        };
        inner.by_id.get(&user_id).cloned()
    }

    /// Whether the user is registered and online.
    pub fn is_online(&self, user_id: UserId) -> bool {
        self.inner
            .read()
            .by_id
            .get(&user_id)
            .map(|e| e.online)
            .unwrap_or(false)
    }

    /// Remove a user from both indexes.
    pub fn remove(&self, user_id: UserId) -> Option<PresenceEntry> {
        let mut inner = self.inner.write();
        let entry = inner.by_id.remove(&user_id)?;
        inner.by_name.remove(&entry.name);
        info!(user_id = %user_id, name = %entry.name, "User removed");
        Some(entry)
    }

    /// Point-in-time copy of every entry, ordered by id.
    pub fn snapshot(&self) -> Vec<PresenceEntry> {
        let mut entries: Vec<PresenceEntry> = self.inner.read().by_id.values().cloned().collect();
        entries.sort_by_key(|e| e.user_id);
        entries
    }

    /// Entries currently online, ordered by id.
    pub fn online(&self) -> Vec<PresenceEntry> {
        let mut entries: Vec<PresenceEntry> = self
            .inner
            .read()
            .by_id
            .values()
            .filter(|e| e.online)
            .cloned()
            .collect();
        entries.sort_by_key(|e| e.user_id);
        entries
    }

    /// Number of users currently online.
    pub fn online_count(&self) -> usize {
        self.inner.read().by_id.values().filter(|e| e.online).count()
    }

    /// Number of registered users.
    pub fn len(&self) -> usize {
        self.inner.read().by_id.len()
    }

    /// Whether no users are registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_by_id_and_name_agree() {
        let presence = PresenceRegistry::new();
        assert_eq!(presence.register(UserId(7), "Bob"), Ok(true));
        assert_eq!(presence.set_online(UserId(7), true), Ok(false));
        assert_eq!(presence.set_online(UserId(7), true), Ok(true));

        let by_id = presence.lookup(&Key::ById(UserId(7))).expect("by id");
        let by_name = presence.lookup(&"Bob".into()).expect("by name");
        assert!(by_id.online);
        assert_eq!(by_id, by_name);

        presence.remove(UserId(7));
        assert!(presence.lookup(&Key::ById(UserId(7))).is_none());
        assert!(presence.lookup(&Key::ByName("Bob".into())).is_none());
    }

    #[test]
    fn test_register_is_idempotent() {
        let presence = PresenceRegistry::new();
        assert_eq!(presence.register(UserId(1), "alice"), Ok(true));
        presence.set_online(UserId(1), true).expect("known user");
        assert_eq!(presence.register(UserId(1), "alice"), Ok(false));
        // Re-registering does not reset state.
        assert!(presence.is_online(UserId(1)));
        assert_eq!(presence.len(), 1);
    }

    #[test]
    fn test_register_rejects_taken_name() {
        let presence = PresenceRegistry::new();
        presence.register(UserId(1), "alice").expect("register");
        assert_eq!(
            presence.register(UserId(2), "alice"),
            Err(SyncError::NameTaken {
                name: "alice".into(),
                owner: UserId(1),
            })
        );
        assert!(presence.lookup(&Key::ById(UserId(2))).is_none());
    }

    #[test]
    fn test_set_online_unknown_user() {
        let presence = PresenceRegistry::new();
        assert!(matches!(
            presence.set_online(UserId(99), true),
            Err(SyncError::UnknownUser(_))
        ));
        assert!(presence.touch(UserId(99)).is_err());
    }

    #[test]
    fn test_register_name_allocates_once() {
        let presence = PresenceRegistry::new();
        let (first, created) = presence.register_name("carol").expect("login");
        assert!(created);
        assert_eq!(first.user_id, UserId(1));

        let (second, created) = presence.register_name("carol").expect("login");
        assert!(!created);
        assert_eq!(second.user_id, UserId(1));
    }

    #[test]
    fn test_register_name_skips_explicitly_registered_ids() {
        let presence = PresenceRegistry::new();
        presence.register(UserId(1), "eve").expect("register");
        presence.register(UserId(2), "mallory").expect("register");

        let (frank, created) = presence.register_name("frank").expect("login");
        assert!(created);
        assert_eq!(frank.user_id, UserId(3));

        let eve = presence.lookup(&Key::ByName("eve".into())).expect("eve");
        assert_eq!(eve.user_id, UserId(1));
        assert_eq!(eve.name, "eve");
        assert_eq!(presence.len(), 3);
    }

    #[test]
    fn test_register_at_max_id_keeps_indexes_consistent() {
        let presence = PresenceRegistry::new();
        presence.register(UserId(u64::MAX), "eve").expect("register");

        let (frank, _) = presence.register_name("frank").expect("login");
        assert_ne!(frank.user_id, UserId(u64::MAX));

        let eve = presence.lookup(&Key::ByName("eve".into())).expect("eve");
        assert_eq!(eve.name, "eve");
        assert_eq!(eve.user_id, UserId(u64::MAX));
        let by_id = presence.lookup(&Key::ById(UserId(u64::MAX))).expect("by id");
        assert_eq!(by_id, eve);
    }

    #[test]
    fn test_register_rejects_taken_id() {
        let presence = PresenceRegistry::new();
        presence.register(UserId(4), "alice").expect("register");
        assert_eq!(
            presence.register(UserId(4), "bob"),
            Err(SyncError::IdTaken(UserId(4)))
        );
        assert!(presence.lookup(&Key::ByName("bob".into())).is_none());
        assert_eq!(
            presence.lookup(&Key::ById(UserId(4))).map(|e| e.name),
            Some("alice".to_string())
        );
    }

    #[test]
    fn test_allocation_exhausted() {
        let presence = PresenceRegistry::new();
        presence.inner.write().next_id = u64::MAX;
        presence.register(UserId(u64::MAX), "eve").expect("register");
        assert_eq!(
            presence.register_name("frank").map(|(e, _)| e.user_id),
            Err(SyncError::IdsExhausted)
        );
        assert_eq!(presence.len(), 1);
    }

    #[test]
    fn test_snapshot_and_online_views() {
        let presence = PresenceRegistry::new();
        presence.register(UserId(2), "bob").expect("register");
        presence.register(UserId(1), "alice").expect("register");
        presence.set_online(UserId(2), true).expect("known user");

        let all: Vec<UserId> = presence.snapshot().iter().map(|e| e.user_id).collect();
        assert_eq!(all, vec![UserId(1), UserId(2)]);

        let online = presence.online();
        assert_eq!(online.len(), 1);
        assert_eq!(online[0].name, "bob");
        assert_eq!(presence.online_count(), 1);
    }

    #[test]
    fn test_concurrent_readers_never_see_half_removed_entry() {
        let presence = std::sync::Arc::new(PresenceRegistry::new());
        let writer = {
            let presence = presence.clone();
            std::thread::spawn(move || {
                for _ in 0..500 {
                    presence.register(UserId(1), "dave").expect("register");
                    presence.remove(UserId(1));
                }
            })
        };

        for _ in 0..500 {
            let by_name = presence.lookup(&Key::ByName("dave".into()));
            if let Some(entry) = by_name {
                assert_eq!(entry.user_id, UserId(1));
            }
        }
        writer.join().expect("writer");
    }
}
