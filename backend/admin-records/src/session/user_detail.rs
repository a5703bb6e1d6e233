//! User detail screen state: one paged record tab per record kind

use std::sync::Arc;

use futures::future::try_join_all;
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, warn};

use super::{PageOutcome, SessionEvent, EVENT_CAPACITY};
use crate::config::Config;
use crate::error::{RecordsError, Result};
use crate::gateway::BackendGateway;
use crate::models::{
    RecordEntry, RecordKind, StopRecord, SuspensionPeriod, UnsubscribeRecord, User, UserListType,
};
use crate::services::{BucketRecordFetcher, ModerationExecutor, RecordPage};

/// Entries materialized so far for one record kind.
///
/// `next_start_index` only grows and earlier entries keep their position.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageState {
    entries: Vec<RecordEntry>,
    next_start_index: usize,
}

#[derive(Debug, Clone)]
pub enum PageDelta {
    Appended(RecordPage),
    Reset,
}

impl PageState {
    pub fn entries(&self) -> &[RecordEntry] {
        &self.entries
    }

    pub fn next_start_index(&self) -> usize {
        self.next_start_index
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn apply(&self, delta: PageDelta) -> Self {
        match delta {
            PageDelta::Reset => Self::default(),
            PageDelta::Appended(page) => {
                if page.next_start_index < self.next_start_index {
                    warn!(
                        current = self.next_start_index,
                        offered = page.next_start_index,
                        "Ignoring page that would move the offset backwards"
                    );
                    return self.clone();
                }
                let mut next = self.clone();
                next.entries.extend(page.entries);
                next.next_start_index = page.next_start_index;
                next
            }
        }
    }
}

#[derive(Default)]
struct Slot {
    page: PageState,
    generation: u64,
}

#[derive(Default)]
struct KindSlot {
    state: Mutex<Slot>,
    fetch_lock: Mutex<()>,
}

/// Owns one user detail screen
pub struct UserDetailSession {
    user: User,
    list_type: Mutex<UserListType>,
    fetcher: BucketRecordFetcher,
    executor: ModerationExecutor,
    page_size: usize,
    slots: Vec<KindSlot>,
    selected: Mutex<RecordKind>,
    events: broadcast::Sender<SessionEvent>,
}

impl UserDetailSession {
    /// `list_type` is the bucket the user currently lives in
    pub fn new(
        gateway: Arc<dyn BackendGateway>,
        config: &Config,
        user: User,
        list_type: UserListType,
    ) -> Self {
        let executor = ModerationExecutor::new(gateway.clone())
            .allow_restore_from_unsubscribed(config.moderation.allow_restore_from_unsubscribed);
        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        Self {
            user,
            list_type: Mutex::new(list_type),
            fetcher: BucketRecordFetcher::new(gateway),
            executor,
            page_size: config.paging.records_per_page,
            slots: RecordKind::ALL.iter().map(|_| KindSlot::default()).collect(),
            selected: Mutex::new(RecordKind::Matching),
            events,
        }
    }

    pub fn user(&self) -> &User {
        &self.user
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    fn slot(&self, kind: RecordKind) -> &KindSlot {
        &self.slots[kind as usize]
    }

    pub async fn page(&self, kind: RecordKind) -> PageState {
        self.slot(kind).state.lock().await.page.clone()
    }

    pub async fn entries(&self, kind: RecordKind) -> Vec<RecordEntry> {
        self.slot(kind).state.lock().await.page.entries.clone()
    }

    pub async fn is_empty(&self, kind: RecordKind) -> bool {
        self.slot(kind).state.lock().await.page.is_empty()
    }

    pub async fn selected(&self) -> RecordKind {
        *self.selected.lock().await
    }

    /// Switch the visible tab; returns whether it has no entries
    pub async fn select(&self, kind: RecordKind) -> bool {
        *self.selected.lock().await = kind;
        let empty = self.is_empty(kind).await;
        let _ = self.events.send(SessionEvent::EmptyState(empty));
        empty
    }

    /// First page of every record kind, fetched concurrently
    pub async fn load_all(&self) -> Result<Vec<(RecordKind, PageOutcome)>> {
        try_join_all(
            RecordKind::ALL
                .iter()
                .map(|&kind| async move { Ok::<_, RecordsError>((kind, self.load_more(kind).await?)) }),
        )
        .await
    }

    /// Fetch and append the next page of `kind`
    pub async fn load_more(&self, kind: RecordKind) -> Result<PageOutcome> {
        let slot = self.slot(kind);
        let _fetching = slot.fetch_lock.lock().await;

        let (generation, start_index) = {
            let state = slot.state.lock().await;
            (state.generation, state.page.next_start_index)
        };

        let page = self
            .fetcher
            .fetch_page(&self.user.id, kind, self.page_size, start_index)
            .await?;

        let mut state = slot.state.lock().await;
        if state.generation != generation {
            debug!(
                user_id = %self.user.id,
                kind = kind.as_str(),
                "Dropping record page for a reset tab"
            );
            return Ok(PageOutcome::Discarded);
        }
        if page.is_exhausted() {
            return Ok(PageOutcome::Exhausted);
        }

        let added = page.entries.len();
        state.page = state.page.apply(PageDelta::Appended(page));
        let empty = state.page.is_empty();
        drop(state);

        let _ = self.events.send(SessionEvent::RecordsReloaded(kind));
        if self.selected().await == kind {
            let _ = self.events.send(SessionEvent::EmptyState(empty));
        }

        Ok(PageOutcome::Applied { added })
    }

    /// Drop everything loaded for `kind`; in-flight fetches for it are discarded
    pub async fn reset(&self, kind: RecordKind) {
        {
            let mut state = self.slot(kind).state.lock().await;
            state.generation += 1;
            state.page = state.page.apply(PageDelta::Reset);
        }
        let _ = self.events.send(SessionEvent::RecordsReloaded(kind));
    }

    pub async fn suspend(&self, during_days: u32) -> Result<StopRecord> {
        let mut list_type = self.list_type.lock().await;
        if *list_type != UserListType::Active {
            return Err(RecordsError::InvalidTransition {
                from: list_type.as_str().to_string(),
                to: UserListType::Suspended.as_str().to_string(),
            });
        }

        let record = self.executor.suspend(&self.user, during_days).await?;
        *list_type = UserListType::Suspended;
        Ok(record)
    }

    pub async fn suspend_for(&self, period: SuspensionPeriod) -> Result<StopRecord> {
        self.suspend(period.days()).await
    }

    pub async fn unsubscribe(&self) -> Result<UnsubscribeRecord> {
        let mut list_type = self.list_type.lock().await;
        let record = self.executor.unsubscribe(&self.user, *list_type).await?;
        *list_type = UserListType::Unsubscribed;
        Ok(record)
    }

    /// Bucket the user lives in as far as this session knows
    pub async fn list_type(&self) -> UserListType {
        *self.list_type.lock().await
    }
}
