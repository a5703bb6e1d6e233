use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::models::user::User;

/// Suspension record stored in `stop/{userId}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StopRecord {
    pub created_date: f64,
    /// Suspension length in days
    pub during: u32,
    #[serde(default)]
    pub phone_number: String,
    pub user: User,
}

/// Withdrawal record stored in `unsubscribe/{userId}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnsubscribeRecord {
    pub created_date: f64,
    #[serde(default)]
    pub phone_number: String,
    pub user: User,
}

/// Preset suspension lengths offered to moderators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SuspensionPeriod {
    OneDay,
    ThreeDays,
    OneWeek,
    OneMonth,
}

impl SuspensionPeriod {
    pub const ALL: [SuspensionPeriod; 4] = [
        SuspensionPeriod::OneDay,
        SuspensionPeriod::ThreeDays,
        SuspensionPeriod::OneWeek,
        SuspensionPeriod::OneMonth,
    ];

    pub fn days(&self) -> u32 {
        match self {
            SuspensionPeriod::OneDay => 1,
            SuspensionPeriod::ThreeDays => 3,
            SuspensionPeriod::OneWeek => 7,
            SuspensionPeriod::OneMonth => 30,
        }
    }
}

/// Current time as fractional seconds since epoch, the backend's timestamp format
pub fn now_timestamp() -> f64 {
    let now = Utc::now();
    now.timestamp() as f64 + f64::from(now.timestamp_subsec_micros()) / 1_000_000.0
}
