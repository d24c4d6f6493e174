use std::sync::{Arc, RwLock};

use tokio::sync::broadcast::{self, error::TryRecvError};
use uuid::Uuid;

use super::state::LoadStatus;

const EVENT_CAPACITY: usize = 16;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEventKind {
    LoggedIn { token: String },
    LoggedOut,
}

/// SessionEvent
///
/// Published on the hub whenever a session changes the persisted token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionEvent {
    /// The session that caused the change.
    pub origin: Uuid,
    pub kind: SessionEventKind,
}

/// SessionHub
///
/// Persistent token slot shared by every session of one client, plus the
/// channel that tells the other sessions about changes to it.
#[derive(Clone, Debug)]
pub struct SessionHub {
    token: Arc<RwLock<Option<String>>>,
    events: broadcast::Sender<SessionEvent>,
}

impl Default for SessionHub {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionHub {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            token: Arc::new(RwLock::new(None)),
            events,
        }
    }

    pub fn stored_token(&self) -> Option<String> {
        self.token.read().map(|t| t.clone()).unwrap_or_default()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    fn store(&self, origin: Uuid, token: Option<String>) {
        if let Ok(mut slot) = self.token.write() {
            *slot = token.clone();
        }
        let kind = match token {
            Some(token) => SessionEventKind::LoggedIn { token },
            None => SessionEventKind::LoggedOut,
        };
        // No receivers is fine: there is simply no other session to notify.
        let _ = self.events.send(SessionEvent { origin, kind });
    }
}

/// Session
///
/// The admin auth state of one client shell. It starts from whatever token
/// the hub holds and only changes through its own methods or `sync`.
#[derive(Debug)]
pub struct Session {
    id: Uuid,
    hub: SessionHub,
    events: broadcast::Receiver<SessionEvent>,
    token: Option<String>,
    status: LoadStatus,
    error: Option<String>,
}

impl Session {
    pub fn new(hub: &SessionHub) -> Self {
        let token = hub.stored_token();
        Self {
            id: Uuid::new_v4(),
            hub: hub.clone(),
            events: hub.subscribe(),
            token,
            status: LoadStatus::Idle,
            error: None,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    /// Holding a token is treated as being the admin; the server re-checks it
    /// on every protected request.
    pub fn is_admin(&self) -> bool {
        self.token.is_some()
    }

    pub fn status(&self) -> LoadStatus {
        self.status
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn login_started(&mut self) {
        self.status = LoadStatus::Loading;
        self.error = None;
    }

    pub fn login_succeeded(&mut self, token: String) {
        self.status = LoadStatus::Succeeded;
        self.error = None;
        self.token = Some(token.clone());
        self.hub.store(self.id, Some(token));
    }

    pub fn login_failed(&mut self, message: impl Into<String>) {
        self.status = LoadStatus::Failed;
        self.token = None;
        self.error = Some(message.into());
    }

    pub fn logout(&mut self) {
        self.clear();
        self.hub.store(self.id, None);
    }

    /// Applies pending events from other sessions. A foreign logout clears
    /// local state without touching the hub, which already changed. Returns
    /// the number of foreign events applied.
    pub fn sync(&mut self) -> usize {
        let mut applied = 0;
        loop {
            match self.events.try_recv() {
                Ok(event) if event.origin == self.id => continue,
                Ok(event) => {
                    applied += 1;
                    match event.kind {
                        SessionEventKind::LoggedOut => self.clear(),
                        SessionEventKind::LoggedIn { token } => {
                            self.token = Some(token);
                            self.error = None;
                        }
                    }
                }
                Err(TryRecvError::Lagged(skipped)) => {
                    // Missed events: fall back to the persisted slot.
                    tracing::debug!(skipped, "session lagged behind, reloading token");
                    self.token = self.hub.stored_token();
                    applied += 1;
                }
                Err(TryRecvError::Empty | TryRecvError::Closed) => break,
            }
        }
        applied
    }

    fn clear(&mut self) {
        self.token = None;
        self.status = LoadStatus::Idle;
        self.error = None;
    }
}
