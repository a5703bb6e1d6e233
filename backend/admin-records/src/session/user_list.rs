//! User list screen state: paging, sorting, searching and moderation

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::{broadcast, Mutex};
use tracing::debug;

use super::{PageOutcome, SessionEvent, EVENT_CAPACITY};
use crate::config::Config;
use crate::error::{RecordsError, Result};
use crate::gateway::BackendGateway;
use crate::models::{StopRecord, UnsubscribeRecord, User, UserListType, UserSortType};
use crate::services::{reconciler, Cursor, CursorPaginator, ModerationExecutor};

/// Snapshot of the user list for one (list type, sort) context
#[derive(Debug, Clone, PartialEq)]
pub struct UserListState {
    list_type: UserListType,
    sort: UserSortType,
    users: Vec<User>,
    cursor: Cursor,
}

#[derive(Debug, Clone)]
pub enum UserListDelta {
    /// Switch context; drops users and rewinds the cursor
    Reset {
        list_type: UserListType,
        sort: UserSortType,
    },
    /// Replace users with a first page
    Loaded { users: Vec<User>, cursor: Cursor },
    /// Append a following page
    Appended { users: Vec<User>, cursor: Cursor },
    /// A user left this list
    Removed { user_id: String },
}

impl UserListState {
    pub fn new(list_type: UserListType, sort: UserSortType) -> Self {
        Self {
            list_type,
            sort,
            users: Vec::new(),
            cursor: Cursor::start(list_type.collection(), sort.order_by(list_type)),
        }
    }

    pub fn list_type(&self) -> UserListType {
        self.list_type
    }

    pub fn sort(&self) -> UserSortType {
        self.sort
    }

    pub fn users(&self) -> &[User] {
        &self.users
    }

    pub fn cursor(&self) -> &Cursor {
        &self.cursor
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    pub fn apply(&self, delta: UserListDelta) -> Self {
        match delta {
            UserListDelta::Reset { list_type, sort } => Self::new(list_type, sort),
            UserListDelta::Loaded { users, cursor } => Self {
                users,
                cursor,
                ..self.clone()
            },
            UserListDelta::Appended { users, cursor } => {
                let mut next = self.clone();
                next.users.extend(users);
                next.cursor = cursor;
                next
            }
            UserListDelta::Removed { user_id } => {
                let mut next = self.clone();
                next.users.retain(|user| user.id != user_id);
                next
            }
        }
    }
}

struct Inner {
    state: UserListState,
    generation: u64,
}

/// Owns one user list screen.
///
/// Paging fetches run one at a time. Selecting a new list type or sort order
/// does not wait for them: it bumps the generation and any fetch issued
/// before that is dropped on completion.
pub struct UserListSession {
    gateway: Arc<dyn BackendGateway>,
    paginator: CursorPaginator,
    executor: ModerationExecutor,
    page_size: usize,
    inner: Mutex<Inner>,
    fetch_lock: Mutex<()>,
    events: broadcast::Sender<SessionEvent>,
}

impl UserListSession {
    pub fn new(gateway: Arc<dyn BackendGateway>, config: &Config) -> Self {
        let executor = ModerationExecutor::new(gateway.clone())
            .allow_restore_from_unsubscribed(config.moderation.allow_restore_from_unsubscribed);
        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        Self {
            paginator: CursorPaginator::new(gateway.clone()),
            gateway,
            executor,
            page_size: config.paging.users_per_page,
            inner: Mutex::new(Inner {
                state: UserListState::new(UserListType::Active, UserSortType::default()),
                generation: 0,
            }),
            fetch_lock: Mutex::new(()),
            events,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    pub async fn state(&self) -> UserListState {
        self.inner.lock().await.state.clone()
    }

    pub async fn users(&self) -> Vec<User> {
        self.inner.lock().await.state.users.clone()
    }

    fn publish(&self, state: &UserListState) {
        // No subscribers is fine
        let _ = self.events.send(SessionEvent::ListReloaded);
        let _ = self.events.send(SessionEvent::EmptyState(state.is_empty()));
    }

    /// Reload the first page of the current context
    pub async fn load(&self) -> Result<PageOutcome> {
        let (list_type, sort) = {
            let inner = self.inner.lock().await;
            (inner.state.list_type, inner.state.sort)
        };
        self.select(list_type, sort).await
    }

    /// Switch to `list_type` / `sort` and load its first page. Latest call wins.
    ///
    /// The list is cleared before fetching; on error it stays cleared.
    pub async fn select(&self, list_type: UserListType, sort: UserSortType) -> Result<PageOutcome> {
        let (generation, cursor) = {
            let mut inner = self.inner.lock().await;
            inner.generation += 1;
            inner.state = inner.state.apply(UserListDelta::Reset { list_type, sort });
            self.publish(&inner.state);
            (inner.generation, inner.state.cursor.clone())
        };

        let page = self
            .paginator
            .next_page(
                cursor.collection(),
                cursor.order_by(),
                self.page_size,
                &cursor,
                |doc| list_type.decode_user(doc),
            )
            .await?;

        let mut inner = self.inner.lock().await;
        if inner.generation != generation {
            debug!(
                list_type = list_type.as_str(),
                "Dropping first page of a replaced context"
            );
            return Ok(PageOutcome::Discarded);
        }
        if page.exhausted {
            return Ok(PageOutcome::Exhausted);
        }

        let added = page.items.len();
        inner.state = inner.state.apply(UserListDelta::Loaded {
            users: page.items,
            cursor: page.cursor,
        });
        self.publish(&inner.state);

        Ok(PageOutcome::Applied { added })
    }

    /// Append the next page of the current context
    pub async fn load_next_page(&self) -> Result<PageOutcome> {
        let _fetching = self.fetch_lock.lock().await;

        let (generation, list_type, cursor) = {
            let inner = self.inner.lock().await;
            (inner.generation, inner.state.list_type, inner.state.cursor.clone())
        };

        let page = self
            .paginator
            .next_page(
                cursor.collection(),
                cursor.order_by(),
                self.page_size,
                &cursor,
                |doc| list_type.decode_user(doc),
            )
            .await?;

        let mut inner = self.inner.lock().await;
        if inner.generation != generation || inner.state.cursor != cursor {
            debug!(
                list_type = list_type.as_str(),
                "Dropping page fetched for a stale cursor"
            );
            return Ok(PageOutcome::Discarded);
        }
        if page.exhausted {
            return Ok(PageOutcome::Exhausted);
        }

        let added = page.items.len();
        inner.state = inner.state.apply(UserListDelta::Appended {
            users: page.items,
            cursor: page.cursor,
        });
        self.publish(&inner.state);

        Ok(PageOutcome::Applied { added })
    }

    /// Search by nickname without dropping the loaded pages.
    ///
    /// Exact matches come from the backend, substring matches from the loaded
    /// users. The list state itself is not modified.
    pub async fn search(&self, query: &str) -> Result<Vec<User>> {
        let (list_type, loaded) = {
            let inner = self.inner.lock().await;
            (inner.state.list_type, inner.state.users.clone())
        };

        if query.is_empty() {
            return Ok(loaded);
        }

        let collection = list_type.collection();
        let documents = self
            .gateway
            .search_by_field(
                &collection,
                &list_type.user_field("nickName"),
                &Value::String(query.to_string()),
            )
            .await
            .map_err(|e| RecordsError::fetch(&collection, e))?;

        let server_matches = documents
            .iter()
            .map(|doc| list_type.decode_user(doc))
            .collect::<Result<Vec<User>>>()?;

        Ok(reconciler::search(&loaded, &server_matches, query))
    }

    /// Drop `user_id` from the screen if it still shows `list_type`
    async fn remove(&self, list_type: UserListType, user_id: &str) {
        let mut inner = self.inner.lock().await;
        if inner.state.list_type != list_type {
            debug!(
                user_id = %user_id,
                list_type = list_type.as_str(),
                "List switched during moderation; nothing to remove"
            );
            return;
        }
        inner.state = inner.state.apply(UserListDelta::Removed {
            user_id: user_id.to_string(),
        });
        self.publish(&inner.state);
    }

    /// Suspend an active user
    pub async fn suspend(&self, user: &User, during_days: u32) -> Result<StopRecord> {
        let record = self.executor.suspend(user, during_days).await?;
        self.remove(UserListType::Active, &user.id).await;
        Ok(record)
    }

    /// Unsubscribe a user listed under `from`.
    ///
    /// `from` is the list the row was loaded from, not whatever list is on
    /// screen when the call lands.
    pub async fn unsubscribe(&self, user: &User, from: UserListType) -> Result<UnsubscribeRecord> {
        let record = self.executor.unsubscribe(user, from).await?;
        self.remove(from, &user.id).await;
        Ok(record)
    }

    /// Restore a user listed under `from` to the active list
    pub async fn restore(&self, user: &User, from: UserListType) -> Result<()> {
        self.executor.restore(user, from).await?;
        self.remove(from, &user.id).await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Map;

    fn user(id: &str) -> User {
        User {
            id: id.to_string(),
            nick_name: id.to_uppercase(),
            birth: String::new(),
            mbti: String::new(),
            phone_number: String::new(),
            image_urls: Vec::new(),
            created_date: 0.0,
            extra: Map::new(),
        }
    }

    #[test]
    fn test_apply_appends_without_reordering() {
        let state = UserListState::new(UserListType::Active, UserSortType::NameAscending);
        let cursor = state.cursor().clone();

        let state = state.apply(UserListDelta::Loaded {
            users: vec![user("a"), user("b")],
            cursor: cursor.clone(),
        });
        let state = state.apply(UserListDelta::Appended {
            users: vec![user("c")],
            cursor,
        });

        let ids: Vec<_> = state.users().iter().map(|u| u.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
        assert_eq!(state.sort(), UserSortType::NameAscending);
    }

    #[test]
    fn test_apply_remove_and_reset() {
        let state = UserListState::new(UserListType::Active, UserSortType::default());
        let cursor = state.cursor().clone();
        let state = state.apply(UserListDelta::Loaded {
            users: vec![user("a"), user("b")],
            cursor,
        });

        let removed = state.apply(UserListDelta::Removed {
            user_id: "a".to_string(),
        });
        assert_eq!(removed.users().len(), 1);
        assert_eq!(state.users().len(), 2);

        let reset = removed.apply(UserListDelta::Reset {
            list_type: UserListType::Suspended,
            sort: UserSortType::DateAscending,
        });
        assert!(reset.is_empty());
        assert_eq!(reset.list_type(), UserListType::Suspended);
        assert!(reset.cursor().last_seen().is_none());
        assert_eq!(reset.cursor().order_by().field, "user.createdDate");
    }
}
