//! Session store: the per-user `(state, last_section)` pair persisted after
//! every transition so a restarted process resumes users mid-flow.

use std::fmt;
use std::sync::Arc;

use anyhow::Result;
use tracing::warn;

use crate::db::Storage;
use crate::dialogue::DialogueState;
use crate::models::SessionPatch;

/// Screen a user last navigated to
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Section {
    #[default]
    MainMenu,
    Products,
    Faq,
    Contact,
    Cart,
    MyOrders,
}

impl Section {
    pub const ALL: [Section; 6] = [
        Section::MainMenu,
        Section::Products,
        Section::Faq,
        Section::Contact,
        Section::Cart,
        Section::MyOrders,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Section::MainMenu => "main_menu",
            Section::Products => "products",
            Section::Faq => "faq",
            Section::Contact => "contact",
            Section::Cart => "cart",
            Section::MyOrders => "my_orders",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.as_str() == value)
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Session {
    pub state: DialogueState,
    pub last_section: Section,
}

pub struct SessionStore<S: Storage> {
    store: Arc<S>,
}

impl<S: Storage> SessionStore<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Load the user's session.
    ///
    /// Never fails: a missing, unreadable or undecodable row yields the zero
    /// session.
    pub async fn load(&self, user_id: i64) -> Session {
        let row = match self.store.load_session(user_id).await {
            Ok(Some(row)) => row,
            Ok(None) => return Session::default(),
            Err(e) => {
                warn!(user_id, error = %e, "Failed to load session, starting from idle");
                return Session::default();
            }
        };

        let state = match DialogueState::from_parts(&row.state_tag, &row.scratch) {
            Ok(state) => state,
            Err(e) => {
                warn!(user_id, error = %e, "Discarding undecodable session state");
                DialogueState::Idle
            }
        };

        Session {
            state,
            last_section: Section::parse(&row.last_section).unwrap_or_default(),
        }
    }

    /// Upsert the provided fields, leaving the others as they are
    pub async fn save(
        &self,
        user_id: i64,
        state: Option<&DialogueState>,
        last_section: Option<Section>,
    ) -> Result<()> {
        let mut patch = SessionPatch {
            last_section: last_section.map(|s| s.as_str().to_string()),
            ..SessionPatch::default()
        };
        if let Some(state) = state {
            let (tag, scratch) = state.to_parts()?;
            patch.state_tag = Some(tag);
            patch.scratch = Some(scratch);
        }
        self.store.save_session(user_id, &patch).await
    }

    pub async fn clear(&self, user_id: i64) -> Result<()> {
        self.store.clear_session(user_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory_store::MemoryStorage;
    use crate::models::SessionPatch;
    use serde_json::json;

    fn store() -> (Arc<MemoryStorage>, SessionStore<MemoryStorage>) {
        let storage = Arc::new(MemoryStorage::new());
        (Arc::clone(&storage), SessionStore::new(storage))
    }

    #[tokio::test]
    async fn test_absent_session_is_zero() {
        let (_, sessions) = store();
        let session = sessions.load(1).await;
        assert_eq!(session, Session::default());
        assert!(session.state.is_idle());
        assert_eq!(session.last_section, Section::MainMenu);
    }

    #[tokio::test]
    async fn test_save_then_load() {
        let (_, sessions) = store();
        let state = DialogueState::WaitingQuantity { product_id: 3 };
        sessions.save(1, Some(&state), Some(Section::Products)).await.unwrap();

        let session = sessions.load(1).await;
        assert_eq!(session.state, state);
        assert_eq!(session.last_section, Section::Products);
    }

    #[tokio::test]
    async fn test_partial_save_keeps_other_fields() {
        let (_, sessions) = store();
        let state = DialogueState::WaitingPhoneForQuickOrder { product_id: 2 };
        sessions.save(1, Some(&state), Some(Section::Faq)).await.unwrap();
        sessions.save(1, None, Some(Section::Cart)).await.unwrap();

        let session = sessions.load(1).await;
        assert_eq!(session.state, state);
        assert_eq!(session.last_section, Section::Cart);
    }

    #[tokio::test]
    async fn test_clear_returns_zero_session() {
        let (_, sessions) = store();
        sessions
            .save(1, Some(&DialogueState::WaitingMessage), Some(Section::Contact))
            .await
            .unwrap();
        sessions.clear(1).await.unwrap();
        assert_eq!(sessions.load(1).await, Session::default());
    }

    #[tokio::test]
    async fn test_corrupt_row_loads_as_idle() {
        let (storage, sessions) = store();
        storage
            .save_session(
                1,
                &SessionPatch {
                    state_tag: Some("waiting_quantity".to_string()),
                    scratch: Some(json!({"product": "oops"})),
                    last_section: Some("nowhere".to_string()),
                },
            )
            .await
            .unwrap();

        assert_eq!(sessions.load(1).await, Session::default());
    }

    #[test]
    fn test_section_names_round_trip() {
        for section in Section::ALL {
            assert_eq!(Section::parse(section.as_str()), Some(section));
        }
        assert_eq!(Section::parse("admin"), None);
    }
}
