//! # Admin Records
//!
//! Data-access core of the moderation console: browse the active, suspended and
//! unsubscribed user lists, move users between them, and page through each
//! user's activity records (likes, dislikes, matches, reports, blocks, payments).
//!
//! ## Architecture
//!
//! ```text
//! UserListSession ──┬── CursorPaginator ───────┐
//!                   ├── reconciler::search     │
//!                   └── ModerationExecutor ────┼──→ BackendGateway ──┬── PgGateway
//! UserDetailSession ┬── BucketRecordFetcher ───┤                     └── MemoryGateway
//!                   └── ModerationExecutor ────┘
//! ```
//!
//! - **Cursor pagination** for the user lists: exclusive-start cursor per
//!   (collection, order); an empty page or a repeated tail means exhausted.
//! - **Bucket pagination** for activity records: one document read per page,
//!   filter + stable newest-first sort + offset slice done client side.
//! - **Search while paged**: backend exact match merged with a substring filter
//!   of the loaded page.
//! - **Moderation moves**: write-then-delete (suspend, unsubscribe) or
//!   delete-then-write (restore); atomic when the gateway supports it.
//!
//! ## Usage
//!
//! ```ignore
//! use admin_records::{Config, Database, UserListSession, UserListType, UserSortType};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = Config::load()?;
//! let db = Database::connect(&config).await?;
//! let session = UserListSession::new(db.gateway(), &config);
//!
//! session.select(UserListType::Active, UserSortType::NameAscending).await?;
//! session.load_next_page().await?;
//! let hits = session.search("mina").await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod db;
pub mod error;
pub mod gateway;
pub mod models;
pub mod services;
pub mod session;

// Re-export commonly used types
pub use config::Config;
pub use db::Database;
pub use error::{GatewayError, RecordsError, Result, WriteStep};
pub use gateway::{BackendGateway, Collection, Document, MemoryGateway, OrderBy, PgGateway};
pub use models::{
    RecordEntry, RecordKind, StopRecord, SuspensionPeriod, UnsubscribeRecord, User, UserListType,
    UserSortType,
};
pub use services::{BucketRecordFetcher, Cursor, CursorPaginator, ModerationExecutor, RecordPage};
pub use session::{PageOutcome, SessionEvent, UserDetailSession, UserListSession};
