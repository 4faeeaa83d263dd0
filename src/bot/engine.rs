//! Conversation engine: turns one inbound event into replies plus a session
//! update.
//!
//! Transport-free by construction: the teloxide endpoints feed it
//! [`InboundEvent`]s and deliver the returned [`Reply`] list.

use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex};

use anyhow::Result;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, error, warn};

use crate::catalog::Catalog;
use crate::db::Storage;
use crate::dialogue::DialogueState;
use crate::models::UserProfile;
use crate::notifier::NotifierHandle;
use crate::session::{Section, Session, SessionStore};

use super::reply::Reply;
use super::ui_builder;

#[derive(Debug, Clone, PartialEq)]
pub enum EventKind {
    Text(String),
    Callback(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct InboundEvent {
    pub user: UserProfile,
    pub kind: EventKind,
}

impl InboundEvent {
    pub fn text(user: UserProfile, text: impl Into<String>) -> Self {
        Self {
            user,
            kind: EventKind::Text(text.into()),
        }
    }

    pub fn callback(user: UserProfile, token: impl Into<String>) -> Self {
        Self {
            user,
            kind: EventKind::Callback(token.into()),
        }
    }
}

/// What happens to the stored dialogue state after a transition
#[derive(Debug, Clone, PartialEq)]
pub enum Next {
    Keep,
    Set(DialogueState),
    /// Drop the whole session row
    Clear,
}

/// Result of one transition
#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    pub replies: Vec<Reply>,
    pub next: Next,
    pub section: Option<Section>,
    /// Replies report a write that already happened, so they stand even if
    /// the session update fails
    pub committed: bool,
}

impl Step {
    pub fn keep(replies: Vec<Reply>) -> Self {
        Self {
            replies,
            next: Next::Keep,
            section: None,
            committed: false,
        }
    }

    pub fn set(state: DialogueState, replies: Vec<Reply>) -> Self {
        Self {
            replies,
            next: Next::Set(state),
            section: None,
            committed: false,
        }
    }

    pub fn clear(replies: Vec<Reply>) -> Self {
        Self {
            replies,
            next: Next::Clear,
            section: None,
            committed: false,
        }
    }

    pub fn in_section(mut self, section: Section) -> Self {
        self.section = Some(section);
        self
    }

    pub fn committed(mut self) -> Self {
        self.committed = true;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Command {
    Start,
    Help,
    Cancel,
}

/// Recognise `/start`, `/help`, `/cancel` (with optional `@bot` suffix and
/// trailing arguments) and the plain cancel words
pub(super) fn parse_command(text: &str) -> Option<Command> {
    let trimmed = text.trim();
    let lower = trimmed.to_lowercase();
    if lower == "скасувати" || lower == "cancel" {
        return Some(Command::Cancel);
    }

    let first = trimmed.split_whitespace().next()?;
    let name = first.strip_prefix('/')?;
    let name = name.split('@').next().unwrap_or(name);
    match name.to_lowercase().as_str() {
        "start" => Some(Command::Start),
        "help" => Some(Command::Help),
        "cancel" => Some(Command::Cancel),
        _ => None,
    }
}

/// One async mutex per user so a user's transitions never overlap.
///
/// Entries live only while a transition holds or waits on them.
#[derive(Default)]
pub struct UserLocks {
    locks: Arc<StdMutex<HashMap<i64, Arc<Mutex<()>>>>>,
}

/// Held for the duration of one transition; releasing the last holder
/// drops the user's entry
pub struct UserGuard {
    user_id: i64,
    guard: Option<OwnedMutexGuard<()>>,
    locks: Arc<StdMutex<HashMap<i64, Arc<Mutex<()>>>>>,
}

impl UserLocks {
    pub async fn acquire(&self, user_id: i64) -> UserGuard {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(|p| p.into_inner());
            Arc::clone(locks.entry(user_id).or_default())
        };
        UserGuard {
            user_id,
            guard: Some(lock.lock_owned().await),
            locks: Arc::clone(&self.locks),
        }
    }

    /// Users with a transition running or queued
    pub fn len(&self) -> usize {
        self.locks.lock().unwrap_or_else(|p| p.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Drop for UserGuard {
    fn drop(&mut self) {
        // Waiters hold their own clone, so a count of one after unlocking
        // means nobody else needs the entry
        self.guard.take();
        let mut locks = self.locks.lock().unwrap_or_else(|p| p.into_inner());
        if locks
            .get(&self.user_id)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            locks.remove(&self.user_id);
        }
    }
}

pub struct Engine<S: Storage> {
    pub(super) store: Arc<S>,
    pub(super) catalog: Catalog<S>,
    pub(super) sessions: SessionStore<S>,
    pub(super) notifier: NotifierHandle,
    locks: UserLocks,
}

impl<S: Storage> Engine<S> {
    pub fn new(store: Arc<S>, notifier: NotifierHandle) -> Self {
        Self {
            catalog: Catalog::new(Arc::clone(&store)),
            sessions: SessionStore::new(Arc::clone(&store)),
            store,
            notifier,
            locks: UserLocks::default(),
        }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn catalog(&self) -> &Catalog<S> {
        &self.catalog
    }

    pub fn sessions(&self) -> &SessionStore<S> {
        &self.sessions
    }

    /// Process one event to completion, including the session write.
    ///
    /// Never fails: any error is logged, the session is cleared and the user
    /// gets the generic failure notice.
    pub async fn handle(&self, event: InboundEvent) -> Vec<Reply> {
        let user_id = event.user.user_id;
        let _guard = self.locks.acquire(user_id).await;

        if let Err(e) = self.store.upsert_user(&event.user).await {
            warn!(user_id, error = %e, "Failed to upsert user");
        }

        let session = self.sessions.load(user_id).await;
        let from = session.state.tag();
        let outcome = match self.dispatch(&event, session).await {
            Ok(step) => match self.apply(user_id, &step).await {
                Ok(()) => Ok(step),
                Err(e) if step.committed => {
                    error!(user_id, from, error = %e, "Session update failed after commit");
                    Ok(step)
                }
                Err(e) => Err(e),
            },
            Err(e) => Err(e),
        };

        match outcome {
            Ok(step) => {
                debug!(user_id, from, next = ?step.next, "Transition complete");
                step.replies
            }
            Err(e) => {
                error!(user_id, from, error = %e, "Transition failed, resetting session");
                if let Err(e) = self.sessions.clear(user_id).await {
                    error!(user_id, error = %e, "Failed to clear session after error");
                }
                vec![ui_builder::failure_view()]
            }
        }
    }

    async fn dispatch(&self, event: &InboundEvent, session: Session) -> Result<Step> {
        match &event.kind {
            EventKind::Text(text) => match parse_command(text) {
                Some(command) => Ok(self.on_command(&event.user, command)),
                None => self.on_text(&event.user, session.state, text.trim()).await,
            },
            EventKind::Callback(token) => self.on_callback(&event.user, session, token).await,
        }
    }

    fn on_command(&self, user: &UserProfile, command: Command) -> Step {
        debug!(user_id = user.user_id, ?command, "Command received");
        match command {
            Command::Start => Step::clear(vec![ui_builder::welcome_view(&user.first_name)]),
            Command::Cancel => Step::clear(vec![ui_builder::cancelled_view()]),
            Command::Help => Step::keep(vec![ui_builder::help_view()]),
        }
    }

    async fn apply(&self, user_id: i64, step: &Step) -> Result<()> {
        match &step.next {
            Next::Keep => {
                if step.section.is_some() {
                    self.sessions.save(user_id, None, step.section).await?;
                }
            }
            Next::Set(state) => self.sessions.save(user_id, Some(state), step.section).await?,
            Next::Clear => {
                self.sessions.clear(user_id).await?;
                if step.section.is_some() {
                    self.sessions.save(user_id, None, step.section).await?;
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_command_forms() {
        assert_eq!(parse_command("/start"), Some(Command::Start));
        assert_eq!(parse_command("/start@farm_bot promo"), Some(Command::Start));
        assert_eq!(parse_command("  /HELP "), Some(Command::Help));
        assert_eq!(parse_command("/cancel"), Some(Command::Cancel));
        assert_eq!(parse_command("Скасувати"), Some(Command::Cancel));
        assert_eq!(parse_command("cancel"), Some(Command::Cancel));
    }

    #[test]
    fn test_parse_command_ignores_plain_text() {
        assert_eq!(parse_command("2"), None);
        assert_eq!(parse_command("cancel my order please"), None);
        assert_eq!(parse_command("/orders"), None);
        assert_eq!(parse_command(""), None);
    }

    #[tokio::test]
    async fn test_user_locks_serialize_same_user() {
        let locks = Arc::new(UserLocks::default());
        let guard = locks.acquire(1).await;

        let other = Arc::clone(&locks);
        let same_user = tokio::spawn(async move {
            let _g = other.acquire(1).await;
        });
        // A different user is not blocked
        let _g2 = locks.acquire(2).await;

        tokio::task::yield_now().await;
        assert!(!same_user.is_finished());
        drop(guard);
        same_user.await.unwrap();
    }

    #[tokio::test]
    async fn test_user_locks_release_entries() {
        let locks = Arc::new(UserLocks::default());
        for user_id in 0..1000 {
            let _g = locks.acquire(user_id).await;
        }
        assert!(locks.is_empty());

        // An entry survives while someone is still queued on it
        let first = locks.acquire(7).await;
        let other = Arc::clone(&locks);
        let waiter = tokio::spawn(async move {
            let _g = other.acquire(7).await;
        });
        tokio::task::yield_now().await;
        drop(first);
        assert_eq!(locks.len(), 1);
        waiter.await.unwrap();
        assert!(locks.is_empty());
    }
}
