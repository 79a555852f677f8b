//! `SyncService`: the entry point HTTP and socket handlers call into.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use chathub_core::config::{RealtimeConfig, SyncConfig};
use chathub_core::types::{MessageId, SessionContext, UserId, UserIdentity};

use crate::connection::handle::{ConnectionHandle, ConnectionId};
use crate::connection::heartbeat::HeartbeatConfig;
use crate::cursor::CursorRegistry;
use crate::dispatcher::BroadcastDispatcher;
use crate::error::SyncError;
use crate::history::{EvictedCursorGap, Message, MessageLog};
use crate::message::types::{ChatLine, InboundEvent, OutboundEvent};
use crate::message::validator::validate_frame;
use crate::metrics::{MetricsSnapshot, SyncMetrics};
use crate::presence::{Key, PresenceEntry, PresenceRegistry};

/// Result of [`SyncService::poll`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Poll {
    /// Messages the user had not consumed yet, oldest first.
    pub messages: Vec<Message>,
    /// Present when some unseen messages were evicted before this poll.
    pub gap: Option<EvictedCursorGap>,
    /// The user's cursor after this poll.
    pub cursor: MessageId,
}

/// Owns the message log and the registries, and exposes the operations
/// both delivery paths share.
#[derive(Debug)]
pub struct SyncService {
    log: Arc<MessageLog>,
    cursors: CursorRegistry,
    presence: Arc<PresenceRegistry>,
    dispatcher: BroadcastDispatcher,
    metrics: Arc<SyncMetrics>,
    recent_window: usize,
    heartbeat: HeartbeatConfig,
}

impl SyncService {
    /// Builds the service and its registries from configuration.
    pub fn new(sync: &SyncConfig, realtime: &RealtimeConfig) -> Self {
        let log = Arc::new(MessageLog::from_config(sync));
        let presence = Arc::new(PresenceRegistry::new());
        let metrics = Arc::new(SyncMetrics::new());
        let dispatcher = BroadcastDispatcher::new(
            realtime.clone(),
            log.clone(),
            presence.clone(),
            metrics.clone(),
        );

        info!(
            history_capacity = log.capacity(),
            max_message_chars = sync.max_message_chars,
            "Sync service initialized"
        );

        Self {
            log,
            cursors: CursorRegistry::new(),
            presence,
            dispatcher,
            metrics,
            recent_window: sync.recent_window,
            heartbeat: HeartbeatConfig::from(realtime),
        }
    }

    /// Looks a user up by name, registering it when absent.
    ///
    /// Returns the identity and whether it was newly created.
    pub fn login(&self, name: &str) -> Result<(UserIdentity, bool), SyncError> {
        let (entry, created) = self.presence.register_name(name)?;
        if created {
            self.cursors.reset(entry.user_id);
        } else {
            self.cursors.ensure(entry.user_id);
        }
        Ok((entry.identity(), created))
    }

    /// Registers a user under a caller-chosen id.
    ///
    /// A newly created user starts reading from the beginning of the
    /// retained history.
    pub fn register(&self, identity: &UserIdentity) -> Result<bool, SyncError> {
        let created = self.presence.register(identity.id, &identity.name)?;
        if created {
            self.cursors.reset(identity.id);
        } else {
            self.cursors.ensure(identity.id);
        }
        Ok(created)
    }

    /// Turns a token or id into the session context handlers pass around.
    pub fn resolve(&self, key: &Key) -> Result<SessionContext, SyncError> {
        self.presence
            .lookup(key)
            .map(|entry| SessionContext::new(entry.identity()))
            .ok_or_else(|| SyncError::UnknownUser(key.to_string()))
    }

    /// Appends a message for a known user and pushes it to live sessions.
    pub fn post(&self, user_id: UserId, content: &str) -> Result<Message, SyncError> {
        let author = self.known(user_id)?;
        self.dispatcher.on_message(&author.identity(), content)
    }

    /// Returns what the user has not consumed yet and advances the cursor
    /// past it.
    pub fn poll(&self, user_id: UserId) -> Result<Poll, SyncError> {
        self.known(user_id)?;
        self.presence.touch(user_id)?;

        let poll = self
            .cursors
            .consume(user_id, |cursor| {
                let since = self.log.since(cursor);
                let last = since.last_id();
                let poll = Poll {
                    cursor: last.unwrap_or(cursor),
                    messages: since.messages,
                    gap: since.gap,
                };
                (poll, last)
            })
            .ok_or_else(|| SyncError::UnknownUser(Key::ById(user_id).to_string()))?;

        self.metrics.poll_served();

        if let Some(gap) = &poll.gap {
            warn!(
                user_id = %user_id,
                cursor = %gap.cursor,
                oldest_retained = %gap.oldest_retained,
                missed = gap.missed,
                "Poll cursor predates retained history"
            );
        }
        debug!(
            user_id = %user_id,
            count = poll.messages.len(),
            cursor = %poll.cursor,
            "Poll served"
        );

        Ok(poll)
    }

    /// Opens a live session for a resolved user.
    pub fn connect(
        &self,
        session: SessionContext,
    ) -> Result<(Arc<ConnectionHandle>, mpsc::Receiver<OutboundEvent>), SyncError> {
        self.dispatcher.on_connect(session)
    }

    /// Closes a live session. Returns `false` if it was already gone.
    pub fn disconnect(&self, conn_id: &ConnectionId) -> bool {
        self.dispatcher.on_disconnect(conn_id)
    }

    /// Handles one text frame received on a live session.
    ///
    /// Failures are reported to that session as an `error` event; nothing
    /// here closes the session.
    pub fn handle_inbound(&self, conn_id: &ConnectionId, raw: &str) {
        let Some(handle) = self.dispatcher.connection(conn_id) else {
            warn!(conn_id = %conn_id, "Frame from unknown connection");
            return;
        };

        if let Err(e) = validate_frame(raw) {
            handle.send(OutboundEvent::error("INVALID_FRAME", e.to_string()));
            return;
        }

        let event: InboundEvent = match serde_json::from_str(raw) {
            Ok(ev) => ev,
            Err(e) => {
                handle.send(OutboundEvent::error(
                    "INVALID_FRAME",
                    format!("Failed to parse event: {e}"),
                ));
                return;
            }
        };

        match event {
            InboundEvent::ChatMessage { text } => {
                if let Err(e) = self.post(handle.user_id(), &text) {
                    debug!(conn_id = %conn_id, error = %e, "Socket post rejected");
                    handle.send(OutboundEvent::error(error_code(&e), e.to_string()));
                }
            }
            InboundEvent::GetMessages => {
                let messages = self.recent().iter().map(ChatLine::from).collect();
                handle.send(OutboundEvent::Messages { messages });
            }
            InboundEvent::GetUserList => {
                handle.send(OutboundEvent::UserList {
                    users: self.users(),
                });
            }
            InboundEvent::Pong { .. } => {
                handle.record_pong();
            }
        }
    }

    /// The most recent messages, oldest first.
    pub fn recent(&self) -> Vec<Message> {
        self.log.recent(self.recent_window)
    }

    /// Presence snapshot, ordered by id.
    pub fn users(&self) -> Vec<PresenceEntry> {
        self.presence.snapshot()
    }

    /// Forgets a user's presence entry and cursor.
    ///
    /// Live sessions of that user stay open; their later posts fail with
    /// `UnknownUser`.
    pub fn remove_user(&self, user_id: UserId) -> Option<PresenceEntry> {
        let removed = self.presence.remove(user_id)?;
        self.cursors.remove(user_id);
        Some(removed)
    }

    /// Closes every live session.
    pub fn shutdown(&self) {
        info!("Shutting down sync service");
        self.dispatcher.close_all();
    }

    /// Heartbeat timing for socket handlers.
    pub fn heartbeat_config(&self) -> HeartbeatConfig {
        self.heartbeat.clone()
    }

    /// Counter snapshot.
    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Number of retained messages.
    pub fn history_len(&self) -> usize {
        self.log.len()
    }

    /// Number of users with at least one live session.
    pub fn online_count(&self) -> usize {
        self.presence.online_count()
    }

    /// Number of live sessions.
    pub fn connection_count(&self) -> usize {
        self.dispatcher.connection_count()
    }

    fn known(&self, user_id: UserId) -> Result<PresenceEntry, SyncError> {
        self.presence
            .lookup(&Key::ById(user_id))
            .ok_or_else(|| SyncError::UnknownUser(Key::ById(user_id).to_string()))
    }
}

fn error_code(err: &SyncError) -> &'static str {
    match err {
        SyncError::InvalidMessage(_) => "INVALID_MESSAGE",
        SyncError::UnknownUser(_) => "UNKNOWN_USER",
        SyncError::NameTaken { .. } => "NAME_TAKEN",
        SyncError::IdTaken(_) => "ID_TAKEN",
        SyncError::IdsExhausted => "INTERNAL_ERROR",
    }
}
