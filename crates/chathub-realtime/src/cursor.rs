//! Per-user "last seen" watermarks.

use dashmap::DashMap;

use chathub_core::types::{MessageId, UserId};

/// Tracks, per user, the id of the last message that user has consumed.
///
/// Cursors only ever move forward.
#[derive(Debug, Default)]
pub struct CursorRegistry {
    /// User ID → last consumed message id
    cursors: DashMap<UserId, MessageId>,
}

impl CursorRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            cursors: DashMap::new(),
        }
    }

    /// Current cursor for a user, or [`MessageId::BEGINNING`] if the user
    /// has never consumed anything.
    pub fn get(&self, user_id: UserId) -> MessageId {
        self.cursors
            .get(&user_id)
            .map(|r| *r.value())
            .unwrap_or(MessageId::BEGINNING)
    }

    /// Move the cursor to `max(current, to)` and return the resulting value.
    pub fn advance(&self, user_id: UserId, to: MessageId) -> MessageId {
        let mut entry = self.cursors.entry(user_id).or_insert(MessageId::BEGINNING);
        if to > *entry {
            *entry = to;
        }
        *entry
    }

    /// Runs `read` against the user's current cursor while holding that
    /// user's entry, then advances to the id it returns.
    ///
    /// Two concurrent consumers for the same user are serialized, so they
    /// never both receive the same messages. Returns `None` without calling
    /// `read` when the user has no cursor.
    pub fn consume<R>(
        &self,
        user_id: UserId,
        read: impl FnOnce(MessageId) -> (R, Option<MessageId>),
    ) -> Option<R> {
        let mut entry = self.cursors.get_mut(&user_id)?;
        let (result, seen) = read(*entry);
        if let Some(seen) = seen {
            if seen > *entry {
                *entry = seen;
            }
        }
        Some(result)
    }

    /// Create the cursor at the beginning if the user has none yet.
    pub fn ensure(&self, user_id: UserId) {
        self.cursors.entry(user_id).or_insert(MessageId::BEGINNING);
    }

    /// Put the cursor back at the beginning.
    pub fn reset(&self, user_id: UserId) {
        self.cursors.insert(user_id, MessageId::BEGINNING);
    }

    /// Drop a removed user's cursor.
    pub fn remove(&self, user_id: UserId) -> Option<MessageId> {
        self.cursors.remove(&user_id).map(|(_, c)| c)
    }

    /// Number of tracked users.
    pub fn len(&self) -> usize {
        self.cursors.len()
    }

    /// Whether no cursors are tracked.
    pub fn is_empty(&self) -> bool {
        self.cursors.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_user_starts_at_beginning() {
        let cursors = CursorRegistry::new();
        assert_eq!(cursors.get(UserId(3)), MessageId::BEGINNING);
        assert!(cursors.is_empty());
    }

    #[test]
    fn test_advance_never_moves_backward() {
        let cursors = CursorRegistry::new();
        assert_eq!(cursors.advance(UserId(1), MessageId(5)), MessageId(5));
        assert_eq!(cursors.advance(UserId(1), MessageId(2)), MessageId(5));
        assert_eq!(cursors.get(UserId(1)), MessageId(5));
        assert_eq!(cursors.advance(UserId(1), MessageId(9)), MessageId(9));
    }

    #[test]
    fn test_consume_applies_returned_watermark() {
        let cursors = CursorRegistry::new();
        cursors.ensure(UserId(1));
        let seen_from = cursors.consume(UserId(1), |c| (c, Some(MessageId(3))));
        assert_eq!(seen_from, Some(MessageId::BEGINNING));
        assert_eq!(cursors.get(UserId(1)), MessageId(3));

        // Nothing new: cursor stays put.
        cursors.consume(UserId(1), |_| ((), None));
        assert_eq!(cursors.get(UserId(1)), MessageId(3));

        // A stale watermark is ignored.
        cursors.consume(UserId(1), |_| ((), Some(MessageId(1))));
        assert_eq!(cursors.get(UserId(1)), MessageId(3));
    }

    #[test]
    fn test_monotonic_under_concurrent_advances() {
        let cursors = std::sync::Arc::new(CursorRegistry::new());
        let handles: Vec<_> = (1..=8u64)
            .map(|n| {
                let cursors = cursors.clone();
                std::thread::spawn(move || {
                    for i in 0..100u64 {
                        cursors.advance(UserId(1), MessageId((i * n) % 250));
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().expect("thread");
        }
        let expected = (1..=8u64)
            .flat_map(|n| (0..100u64).map(move |i| (i * n) % 250))
            .max()
            .unwrap_or(0);
        assert_eq!(cursors.get(UserId(1)), MessageId(expected));
    }

    #[test]
    fn test_consume_does_not_create_cursor() {
        let cursors = CursorRegistry::new();
        let result = cursors.consume(UserId(2), |_| ((), Some(MessageId(8))));
        assert_eq!(result, None);
        assert!(cursors.is_empty());
    }

    #[test]
    fn test_reset_rewinds_to_beginning() {
        let cursors = CursorRegistry::new();
        cursors.advance(UserId(1), MessageId(6));
        cursors.ensure(UserId(1));
        assert_eq!(cursors.get(UserId(1)), MessageId(6));
        cursors.reset(UserId(1));
        assert_eq!(cursors.get(UserId(1)), MessageId::BEGINNING);
    }

    #[test]
    fn test_remove() {
        let cursors = CursorRegistry::new();
        cursors.ensure(UserId(4));
        assert_eq!(cursors.len(), 1);
        assert_eq!(cursors.remove(UserId(4)), Some(MessageId::BEGINNING));
        assert!(cursors.is_empty());
    }
}
