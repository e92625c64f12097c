//! In-process auth event hub.
//!
//! Callback requests from the same browser share a flow id (kept in the
//! session cookie). When one of them confirms a session, the hub broadcasts
//! `SIGNED_IN` to every live subscriber for that flow and keeps the session
//! for a short while, so a duplicate request whose code was already spent
//! still finds it on its existing-session check or fallback probe.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use futures_util::StreamExt;
use futures_util::stream;
use mockable::Clock;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, warn};

use crate::domain::AuthEvent;
use crate::domain::Session;
use crate::domain::ports::{AuthEventStream, FlowId};

const CHANNEL_CAPACITY: usize = 64;

struct CachedSession {
    session: Session,
    stored_at: DateTime<Utc>,
}

/// Broadcasts auth-state changes keyed by flow id.
pub struct AuthEventHub {
    sender: broadcast::Sender<(FlowId, AuthEvent)>,
    sessions: Mutex<HashMap<FlowId, CachedSession>>,
    clock: Arc<dyn Clock>,
    ttl: TimeDelta,
}

impl AuthEventHub {
    /// Hub keeping confirmed sessions for `ttl`.
    pub fn new(clock: Arc<dyn Clock>, ttl: Duration) -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            sender,
            sessions: Mutex::new(HashMap::new()),
            clock,
            ttl: TimeDelta::from_std(ttl).unwrap_or(TimeDelta::MAX),
        }
    }

    fn sessions(&self) -> MutexGuard<'_, HashMap<FlowId, CachedSession>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record and broadcast `event` for `flow`.
    pub fn publish(&self, flow: FlowId, event: AuthEvent) {
        let now = self.clock.utc();
        {
            let mut sessions = self.sessions();
            sessions.retain(|_, cached| now - cached.stored_at < self.ttl);
            match event.clone().into_confirmed_session() {
                Some(session) => {
                    sessions.insert(
                        flow,
                        CachedSession {
                            session,
                            stored_at: now,
                        },
                    );
                }
                None => {
                    sessions.remove(&flow);
                }
            }
        }
        let kind = event.kind();
        match self.sender.send((flow, event)) {
            Ok(receivers) => debug!(%flow, %kind, receivers, "auth event published"),
            Err(_) => debug!(%flow, %kind, "auth event published without subscribers"),
        }
    }

    /// Session confirmed for `flow` within the retention window.
    pub fn cached_session(&self, flow: FlowId) -> Option<Session> {
        let now = self.clock.utc();
        let mut sessions = self.sessions();
        match sessions.get(&flow) {
            Some(cached) if now - cached.stored_at < self.ttl => Some(cached.session.clone()),
            Some(_) => {
                sessions.remove(&flow);
                None
            }
            None => None,
        }
    }

    /// Events for `flow` published after this call.
    pub fn subscribe(&self, flow: FlowId) -> AuthEventStream {
        let receiver = self.sender.subscribe();
        stream::unfold(receiver, move |mut receiver| async move {
            loop {
                match receiver.recv().await {
                    Ok((id, event)) if id == flow => return Some((event, receiver)),
                    Ok(_) => {}
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(%flow, skipped, "auth event subscriber lagged");
                    }
                    Err(RecvError::Closed) => return None,
                }
            }
        })
        .boxed()
    }
}
