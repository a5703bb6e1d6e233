pub mod moderation;
pub mod records;
pub mod user;

pub use moderation::{now_timestamp, StopRecord, SuspensionPeriod, UnsubscribeRecord};
pub use records::{BlockInfo, LikeInfo, LikeType, PaymentInfo, RecordEntry, RecordKind, ReportInfo};
pub use user::{User, UserListType, UserSortType};
