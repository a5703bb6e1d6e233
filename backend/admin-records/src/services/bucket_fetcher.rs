//! Offset pagination over embedded record arrays.
//!
//! The backend cannot page inside a document, so every call reads the whole
//! bucket and re-derives the filtered, newest-first order before slicing. The
//! sort is stable, so identical bucket contents always yield identical pages.

use std::sync::Arc;

use tracing::debug;

use crate::error::{RecordsError, Result};
use crate::gateway::BackendGateway;
use crate::models::{RecordEntry, RecordKind};

/// Entries of one page plus the offset to request next
#[derive(Debug, Clone, PartialEq)]
pub struct RecordPage {
    pub entries: Vec<RecordEntry>,
    pub next_start_index: usize,
}

impl RecordPage {
    pub fn is_exhausted(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Filter `entries` for `kind`, order newest first and take the page at `start_index`
pub fn paginate(
    entries: Vec<RecordEntry>,
    kind: RecordKind,
    page_size: usize,
    start_index: usize,
) -> RecordPage {
    let mut filtered: Vec<RecordEntry> = entries.into_iter().filter(|e| kind.accepts(e)).collect();
    filtered.sort_by(|a, b| b.timestamp().total_cmp(&a.timestamp()));

    if start_index >= filtered.len() {
        return RecordPage {
            entries: Vec::new(),
            next_start_index: start_index,
        };
    }

    let end = start_index.saturating_add(page_size).min(filtered.len());
    let page: Vec<RecordEntry> = filtered.drain(start_index..end).collect();

    RecordPage {
        next_start_index: start_index + page.len(),
        entries: page,
    }
}

#[derive(Clone)]
pub struct BucketRecordFetcher {
    gateway: Arc<dyn BackendGateway>,
}

impl BucketRecordFetcher {
    pub fn new(gateway: Arc<dyn BackendGateway>) -> Self {
        Self { gateway }
    }

    /// One page of `kind` records for `user_id`. A user without a bucket has no
    /// records; that is an empty page, not an error.
    pub async fn fetch_page(
        &self,
        user_id: &str,
        kind: RecordKind,
        page_size: usize,
        start_index: usize,
    ) -> Result<RecordPage> {
        if page_size == 0 {
            return Err(RecordsError::InvalidInput(
                "page size must be greater than zero".to_string(),
            ));
        }

        let collection = kind.collection(user_id);
        let document = self
            .gateway
            .get_document(&collection, user_id)
            .await
            .map_err(|e| RecordsError::fetch(&collection, e))?;

        let entries = match document {
            Some(document) => kind.decode_entries(&document, &collection)?,
            None => {
                debug!(user_id = %user_id, kind = kind.as_str(), "No record bucket yet");
                Vec::new()
            }
        };

        let page = paginate(entries, kind, page_size, start_index);

        debug!(
            user_id = %user_id,
            kind = kind.as_str(),
            start_index,
            returned = page.entries.len(),
            next_start_index = page.next_start_index,
            "Fetched record page"
        );

        Ok(page)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BlockInfo, LikeInfo, LikeType};

    fn like(like_type: LikeType, date: f64, id: &str) -> RecordEntry {
        RecordEntry::Like(LikeInfo {
            liked_user_id: id.to_string(),
            like_type,
            created_date: date,
            nick_name: String::new(),
            mbti: String::new(),
            age: 0,
            image_url: String::new(),
        })
    }

    fn liked_id(entry: &RecordEntry) -> &str {
        match entry {
            RecordEntry::Like(info) => &info.liked_user_id,
            _ => panic!("not a like entry"),
        }
    }

    #[test]
    fn test_sorts_newest_first_with_stable_ties() {
        let entries = vec![
            like(LikeType::Like, 1.0, "old"),
            like(LikeType::Like, 5.0, "tie-first"),
            like(LikeType::Matching, 5.0, "tie-second"),
            like(LikeType::Like, 9.0, "new"),
        ];

        let page = paginate(entries, RecordKind::Like, 10, 0);
        let ids: Vec<_> = page.entries.iter().map(liked_id).collect();
        assert_eq!(ids, vec!["new", "tie-first", "tie-second", "old"]);
        assert_eq!(page.next_start_index, 4);
    }

    #[test]
    fn test_start_past_end_is_empty_and_keeps_index() {
        let entries = vec![like(LikeType::Like, 1.0, "a")];
        let page = paginate(entries, RecordKind::Like, 5, 3);

        assert!(page.is_exhausted());
        assert_eq!(page.next_start_index, 3);
    }

    #[test]
    fn test_dislike_excludes_plain_likes() {
        let entries = vec![
            like(LikeType::Like, 1.0, "a"),
            like(LikeType::Dislike, 2.0, "b"),
            like(LikeType::Matching, 3.0, "c"),
        ];
        let page = paginate(entries, RecordKind::Dislike, 5, 0);
        let ids: Vec<_> = page.entries.iter().map(liked_id).collect();
        assert_eq!(ids, vec!["c", "b"]);
    }

    #[test]
    fn test_foreign_entries_are_dropped() {
        let entries = vec![RecordEntry::Block(BlockInfo {
            blocked_user_id: "x".to_string(),
            created_date: 1.0,
            nick_name: String::new(),
            mbti: String::new(),
            age: 0,
            image_url: String::new(),
        })];
        assert!(paginate(entries, RecordKind::Report, 5, 0).is_exhausted());
    }
}
