use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::Result;
use crate::gateway::{Collection, Document, OrderBy};
use crate::models::moderation::{StopRecord, UnsubscribeRecord};

/// A member account as stored by the backend.
///
/// Fields the console does not model are kept in `extra` so a user can be
/// written back verbatim when restored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub nick_name: String,
    /// `yyyy-MM-dd`
    #[serde(default)]
    pub birth: String,
    #[serde(default)]
    pub mbti: String,
    #[serde(default)]
    pub phone_number: String,
    #[serde(rename = "imageURLs", default)]
    pub image_urls: Vec<String>,
    /// Sign-up time, seconds since epoch
    #[serde(default)]
    pub created_date: f64,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Moderation bucket a user belongs to; membership is exclusive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UserListType {
    Active,
    Suspended,
    Unsubscribed,
}

impl UserListType {
    pub fn collection(&self) -> Collection {
        match self {
            UserListType::Active => Collection::Users,
            UserListType::Suspended => Collection::Stop,
            UserListType::Unsubscribed => Collection::Unsubscribe,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            UserListType::Active => "active",
            UserListType::Suspended => "suspended",
            UserListType::Unsubscribed => "unsubscribed",
        }
    }

    /// Path of a user field inside this list's documents.
    ///
    /// Suspended and unsubscribed documents wrap the user under `user`.
    pub fn user_field(&self, field: &str) -> String {
        match self {
            UserListType::Active => field.to_string(),
            UserListType::Suspended | UserListType::Unsubscribed => format!("user.{}", field),
        }
    }

    pub fn decode_user(&self, document: &Document) -> Result<User> {
        let collection = self.collection();
        match self {
            UserListType::Active => document.decode(&collection),
            UserListType::Suspended => document
                .decode::<StopRecord>(&collection)
                .map(|record| record.user),
            UserListType::Unsubscribed => document
                .decode::<UnsubscribeRecord>(&collection)
                .map(|record| record.user),
        }
    }
}

/// Sort orders offered on the user list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum UserSortType {
    /// Newest sign-ups first
    #[default]
    DateDescending,
    DateAscending,
    NameDescending,
    NameAscending,
    /// Oldest members first. The legacy client sorted `birth` descending here,
    /// which listed the youngest first.
    AgeDescending,
    AgeAscending,
}

impl UserSortType {
    pub const ALL: [UserSortType; 6] = [
        UserSortType::DateDescending,
        UserSortType::DateAscending,
        UserSortType::NameDescending,
        UserSortType::NameAscending,
        UserSortType::AgeDescending,
        UserSortType::AgeAscending,
    ];

    /// User field and direction; age orders run over `birth`, inverted
    pub fn key(&self) -> (&'static str, bool) {
        match self {
            UserSortType::DateDescending => ("createdDate", true),
            UserSortType::DateAscending => ("createdDate", false),
            UserSortType::NameDescending => ("nickName", true),
            UserSortType::NameAscending => ("nickName", false),
            UserSortType::AgeDescending => ("birth", false),
            UserSortType::AgeAscending => ("birth", true),
        }
    }

    pub fn order_by(&self, list_type: UserListType) -> OrderBy {
        let (field, descending) = self.key();
        OrderBy::new(list_type.user_field(field), descending)
    }
}
