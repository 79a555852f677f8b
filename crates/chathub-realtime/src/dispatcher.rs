//! Broadcast dispatcher: session lifecycle and fan-out to live sessions.

use std::sync::Arc;

use chrono::Utc;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use chathub_core::config::RealtimeConfig;
use chathub_core::types::{SessionContext, UserIdentity};

use crate::connection::handle::{ConnectionHandle, ConnectionId};
use crate::connection::pool::ConnectionPool;
use crate::error::SyncError;
use crate::history::{Message, MessageLog};
use crate::message::types::{ChatLine, OutboundEvent};
use crate::metrics::SyncMetrics;
use crate::presence::PresenceRegistry;

/// Pushes chat and presence events to every connected session.
///
/// Delivery is best-effort: each session has a bounded queue and a full or
/// closed queue counts as a failed delivery to that session only.
#[derive(Debug)]
pub struct BroadcastDispatcher {
    /// Connection pool.
    pool: ConnectionPool,
    /// Shared message history.
    log: Arc<MessageLog>,
    /// Presence registry.
    presence: Arc<PresenceRegistry>,
    /// Metrics.
    metrics: Arc<SyncMetrics>,
    /// Serializes pool membership changes with the presence flag they imply.
    lifecycle: Mutex<()>,
    /// Configuration.
    config: RealtimeConfig,
}

impl BroadcastDispatcher {
    /// Creates a new dispatcher.
    pub fn new(
        config: RealtimeConfig,
        log: Arc<MessageLog>,
        presence: Arc<PresenceRegistry>,
        metrics: Arc<SyncMetrics>,
    ) -> Self {
        Self {
            pool: ConnectionPool::new(),
            log,
            presence,
            metrics,
            lifecycle: Mutex::new(()),
            config,
        }
    }

    /// Registers a live session for an already-registered user.
    ///
    /// Marks the user online, queues a private `connected` acknowledgement
    /// for the new session and, when the user was offline, a `user-joined`
    /// event for every other session. Returns the handle and the receiver
    /// the transport drains.
    pub fn on_connect(
        &self,
        session: SessionContext,
    ) -> Result<(Arc<ConnectionHandle>, mpsc::Receiver<OutboundEvent>), SyncError> {
        let (tx, rx) = mpsc::channel(self.config.channel_buffer_size);
        let handle = Arc::new(ConnectionHandle::new(session, tx));
        let user_id = handle.user_id();

        let was_online = {
            let _guard = self.lifecycle.lock();
            let was_online = self.presence.set_online(user_id, true)?;

            let existing = self.pool.get_user_connections(&user_id);
            if existing.len() >= self.config.max_connections_per_user {
                warn!(
                    user_id = %user_id,
                    count = existing.len(),
                    max = self.config.max_connections_per_user,
                    "User at max connections, oldest will be replaced"
                );
                if let Some(oldest) = existing.first() {
                    oldest.mark_dead();
                    self.pool.remove(&oldest.id);
                    self.metrics.connection_closed();
                }
            }

            // Queued before the session is reachable by any broadcast.
            handle.send(OutboundEvent::Connected {
                user_id,
                user: handle.session.username().to_string(),
            });
            self.pool.add(handle.clone());
            was_online
        };

        self.metrics.connection_opened();

        if !was_online {
            self.broadcast_except(
                Some(handle.id),
                OutboundEvent::UserJoined {
                    user_id,
                    user: handle.session.username().to_string(),
                    time: Utc::now(),
                },
            );
        }

        info!(
            conn_id = %handle.id,
            user_id = %user_id,
            "Session connected"
        );

        Ok((handle, rx))
    }

    /// Removes a session. When it was the user's last one, marks the user
    /// offline and tells the remaining sessions.
    ///
    /// Returns `false` if the connection was not registered.
    pub fn on_disconnect(&self, conn_id: &ConnectionId) -> bool {
        let (handle, went_offline) = {
            let _guard = self.lifecycle.lock();
            let Some(handle) = self.pool.remove(conn_id) else {
                return false;
            };
            handle.mark_dead();

            let user_id = handle.user_id();
            let went_offline = self.pool.get_user_connections(&user_id).is_empty()
                && match self.presence.set_online(user_id, false) {
                    Ok(was_online) => was_online,
                    Err(e) => {
                        debug!(user_id = %user_id, error = %e, "Disconnected user no longer registered");
                        false
                    }
                };
            (handle, went_offline)
        };

        self.metrics.connection_closed();

        if went_offline {
            self.broadcast(OutboundEvent::UserLeft {
                user_id: handle.user_id(),
                user: handle.session.username().to_string(),
                time: Utc::now(),
            });
        }

        info!(
            conn_id = %conn_id,
            user_id = %handle.user_id(),
            went_offline,
            "Session disconnected"
        );

        true
    }

    /// Appends to the log, then pushes the message to every connected
    /// session including the sender's.
    ///
    /// Every session connected at dispatch time has been offered the event
    /// when this returns.
    pub fn on_message(&self, author: &UserIdentity, content: &str) -> Result<Message, SyncError> {
        let message = match self.log.append(author.clone(), content) {
            Ok(m) => m,
            Err(e) => {
                self.metrics.message_rejected();
                return Err(e);
            }
        };
        self.metrics.message_posted();

        if let Err(e) = self.presence.touch(author.id) {
            debug!(user_id = %author.id, error = %e, "Author vanished before touch");
        }

        let delivered = self.broadcast(OutboundEvent::ChatMessage(ChatLine::from(&message)));

        debug!(
            message_id = %message.id,
            user_id = %author.id,
            delivered,
            "Message dispatched"
        );

        Ok(message)
    }

    /// Queues an event for one session.
    pub fn send_to(&self, conn_id: &ConnectionId, event: OutboundEvent) -> bool {
        match self.pool.get(conn_id) {
            Some(handle) => {
                let sent = handle.send(event);
                self.metrics.fan_out(u64::from(sent), u64::from(!sent));
                sent
            }
            None => {
                warn!(conn_id = %conn_id, "Send to unknown connection");
                false
            }
        }
    }

    /// Queues an event for every connected session. Returns how many
    /// sessions accepted it.
    pub fn broadcast(&self, event: OutboundEvent) -> usize {
        self.broadcast_except(None, event)
    }

    /// Queues an event for every connected session except `skip`.
    pub fn broadcast_except(&self, skip: Option<ConnectionId>, event: OutboundEvent) -> usize {
        let kind = event.kind();
        let mut sent = 0u64;
        let mut failed = 0u64;

        for conn in self.pool.all_connections() {
            if Some(conn.id) == skip {
                continue;
            }
            if conn.send(event.clone()) {
                sent += 1;
            } else {
                failed += 1;
                debug!(conn_id = %conn.id, event = kind, "Delivery failed");
            }
        }

        self.metrics.fan_out(sent, failed);
        sent as usize
    }

    /// Looks up a live session.
    pub fn connection(&self, conn_id: &ConnectionId) -> Option<Arc<ConnectionHandle>> {
        self.pool.get(conn_id)
    }

    /// Closes every session and marks their users offline.
    pub fn close_all(&self) {
        let _guard = self.lifecycle.lock();
        let all = self.pool.drain();
        for conn in &all {
            conn.mark_dead();
            self.metrics.connection_closed();
            let _ = self.presence.set_online(conn.user_id(), false);
        }
        info!(count = all.len(), "All sessions closed");
    }

    /// Returns the total connection count.
    pub fn connection_count(&self) -> usize {
        self.pool.connection_count()
    }

    /// Returns the number of unique connected users.
    pub fn user_count(&self) -> usize {
        self.pool.user_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chathub_core::types::UserId;

    struct Fixture {
        dispatcher: BroadcastDispatcher,
        presence: Arc<PresenceRegistry>,
        log: Arc<MessageLog>,
    }

    fn fixture(config: RealtimeConfig) -> Fixture {
        let log = Arc::new(MessageLog::new(100, 2000));
        let presence = Arc::new(PresenceRegistry::new());
        for (id, name) in [(1, "alice"), (2, "bob"), (3, "carol")] {
            presence.register(UserId(id), name).expect("register");
        }
        let dispatcher = BroadcastDispatcher::new(
            config,
            log.clone(),
            presence.clone(),
            Arc::new(SyncMetrics::new()),
        );
        Fixture {
            dispatcher,
            presence,
            log,
        }
    }

    fn session(id: u64, name: &str) -> SessionContext {
        SessionContext::new(UserIdentity::new(UserId(id), name))
    }

    fn drain(rx: &mut mpsc::Receiver<OutboundEvent>) -> Vec<OutboundEvent> {
        let mut events = Vec::new();
        while let Ok(ev) = rx.try_recv() {
            events.push(ev);
        }
        events
    }

    #[test]
    fn test_connect_acks_privately_and_announces_to_others() {
        let f = fixture(RealtimeConfig::default());
        let (_a, mut rx_a) = f.dispatcher.on_connect(session(1, "alice")).expect("connect");
        let (_b, mut rx_b) = f.dispatcher.on_connect(session(2, "bob")).expect("connect");

        let a_events = drain(&mut rx_a);
        assert_eq!(a_events[0].kind(), "connected");
        assert!(matches!(
            &a_events[1],
            OutboundEvent::UserJoined { user, .. } if user == "bob"
        ));

        let b_events = drain(&mut rx_b);
        assert_eq!(b_events.len(), 1);
        assert_eq!(
            b_events[0],
            OutboundEvent::Connected {
                user_id: UserId(2),
                user: "bob".into()
            }
        );
        assert!(f.presence.is_online(UserId(1)));
        assert!(f.presence.is_online(UserId(2)));
    }

    #[test]
    fn test_connected_ack_precedes_concurrent_broadcasts() {
        let f = Arc::new(fixture(RealtimeConfig::default()));
        let poster = {
            let f = f.clone();
            std::thread::spawn(move || {
                let alice = UserIdentity::new(UserId(1), "alice");
                for i in 0..100 {
                    f.dispatcher.on_message(&alice, &format!("m{i}")).expect("post");
                }
            })
        };

        for _ in 0..50 {
            let (handle, mut rx) = f.dispatcher.on_connect(session(2, "bob")).expect("connect");
            assert_eq!(rx.try_recv().map(|e| e.kind()).ok(), Some("connected"));
            f.dispatcher.on_disconnect(&handle.id);
        }
        poster.join().expect("poster");
    }

    #[test]
    fn test_connect_unknown_user_fails_without_side_effects() {
        let f = fixture(RealtimeConfig::default());
        let result = f.dispatcher.on_connect(session(42, "mallory"));
        assert!(matches!(result, Err(SyncError::UnknownUser(_))));
        assert_eq!(f.dispatcher.connection_count(), 0);
    }

    #[test]
    fn test_message_reaches_every_session_including_sender() {
        let f = fixture(RealtimeConfig::default());
        let (_a, mut rx_a) = f.dispatcher.on_connect(session(1, "alice")).expect("connect");
        let (_b, mut rx_b) = f.dispatcher.on_connect(session(2, "bob")).expect("connect");
        drain(&mut rx_a);
        drain(&mut rx_b);

        let msg = f
            .dispatcher
            .on_message(&UserIdentity::new(UserId(1), "alice"), "hi")
            .expect("post");
        assert_eq!(f.log.all(), vec![msg.clone()]);

        let expected = OutboundEvent::ChatMessage(ChatLine::from(&msg));
        assert_eq!(drain(&mut rx_a), vec![expected.clone()]);
        assert_eq!(drain(&mut rx_b), vec![expected]);
    }

    #[test]
    fn test_invalid_message_is_not_broadcast() {
        let f = fixture(RealtimeConfig::default());
        let (_a, mut rx_a) = f.dispatcher.on_connect(session(1, "alice")).expect("connect");
        drain(&mut rx_a);

        let err = f
            .dispatcher
            .on_message(&UserIdentity::new(UserId(1), "alice"), "")
            .unwrap_err();
        assert!(matches!(err, SyncError::InvalidMessage(_)));
        assert!(drain(&mut rx_a).is_empty());
        assert!(f.log.is_empty());
    }

    #[test]
    fn test_dropped_session_does_not_fail_broadcast() {
        let f = fixture(RealtimeConfig::default());
        let (_a, rx_a) = f.dispatcher.on_connect(session(1, "alice")).expect("connect");
        let (_b, mut rx_b) = f.dispatcher.on_connect(session(2, "bob")).expect("connect");
        drop(rx_a);
        drain(&mut rx_b);

        let result = f
            .dispatcher
            .on_message(&UserIdentity::new(UserId(2), "bob"), "anyone?");
        assert!(result.is_ok());
        assert_eq!(drain(&mut rx_b).len(), 1);
    }

    #[test]
    fn test_disconnect_announces_only_on_last_session() {
        let f = fixture(RealtimeConfig::default());
        let (a1, _rx_a1) = f.dispatcher.on_connect(session(1, "alice")).expect("connect");
        let (a2, _rx_a2) = f.dispatcher.on_connect(session(1, "alice")).expect("connect");
        let (_b, mut rx_b) = f.dispatcher.on_connect(session(2, "bob")).expect("connect");
        drain(&mut rx_b);

        assert!(f.dispatcher.on_disconnect(&a1.id));
        assert!(f.presence.is_online(UserId(1)));
        assert!(drain(&mut rx_b).is_empty());

        assert!(f.dispatcher.on_disconnect(&a2.id));
        assert!(!f.presence.is_online(UserId(1)));
        let events = drain(&mut rx_b);
        assert!(matches!(
            &events[..],
            [OutboundEvent::UserLeft { user, .. }] if user == "alice"
        ));

        assert!(!f.dispatcher.on_disconnect(&a2.id));
    }

    #[test]
    fn test_second_session_does_not_reannounce() {
        let f = fixture(RealtimeConfig::default());
        let (_b, mut rx_b) = f.dispatcher.on_connect(session(2, "bob")).expect("connect");
        f.dispatcher.on_connect(session(1, "alice")).expect("connect");
        drain(&mut rx_b);

        f.dispatcher.on_connect(session(1, "alice")).expect("connect");
        assert!(drain(&mut rx_b).is_empty());
    }

    #[test]
    fn test_max_connections_replaces_oldest() {
        let config = RealtimeConfig {
            max_connections_per_user: 1,
            ..RealtimeConfig::default()
        };
        let f = fixture(config);
        let (first, _rx1) = f.dispatcher.on_connect(session(3, "carol")).expect("connect");
        let (second, _rx2) = f.dispatcher.on_connect(session(3, "carol")).expect("connect");

        assert!(!first.is_alive());
        assert!(second.is_alive());
        assert_eq!(f.dispatcher.connection_count(), 1);
        assert!(f.dispatcher.connection(&first.id).is_none());
    }

    #[test]
    fn test_close_all_marks_everyone_offline() {
        let f = fixture(RealtimeConfig::default());
        f.dispatcher.on_connect(session(1, "alice")).expect("connect");
        f.dispatcher.on_connect(session(2, "bob")).expect("connect");

        f.dispatcher.close_all();
        assert_eq!(f.dispatcher.connection_count(), 0);
        assert_eq!(f.presence.online_count(), 0);
    }
}
