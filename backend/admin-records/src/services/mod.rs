mod bucket_fetcher;
mod moderation;
mod paginator;
pub mod reconciler;

pub use bucket_fetcher::{paginate, BucketRecordFetcher, RecordPage};
pub use moderation::ModerationExecutor;
pub use paginator::{Cursor, CursorPaginator, Page};
