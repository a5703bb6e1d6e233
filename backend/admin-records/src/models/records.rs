//! Activity records kept as embedded arrays inside per-user bucket documents

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{RecordsError, Result};
use crate::gateway::{Collection, Document};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LikeType {
    Like,
    Dislike,
    Matching,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LikeInfo {
    pub liked_user_id: String,
    pub like_type: LikeType,
    pub created_date: f64,
    #[serde(default)]
    pub nick_name: String,
    #[serde(default)]
    pub mbti: String,
    #[serde(default)]
    pub age: u32,
    #[serde(rename = "imageURL", default)]
    pub image_url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportInfo {
    pub reported_user_id: String,
    pub reason: String,
    pub created_date: f64,
    #[serde(default)]
    pub nick_name: String,
    #[serde(default)]
    pub mbti: String,
    #[serde(default)]
    pub age: u32,
    #[serde(rename = "imageURL", default)]
    pub image_url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockInfo {
    pub blocked_user_id: String,
    pub created_date: f64,
    #[serde(default)]
    pub nick_name: String,
    #[serde(default)]
    pub mbti: String,
    #[serde(default)]
    pub age: u32,
    #[serde(rename = "imageURL", default)]
    pub image_url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentInfo {
    pub price: i64,
    #[serde(default)]
    pub purchase_chu_count: i64,
    #[serde(default)]
    pub payment_type: String,
    pub purchased_date: f64,
}

/// One materialized record, whatever its bucket
#[derive(Debug, Clone, PartialEq)]
pub enum RecordEntry {
    Like(LikeInfo),
    Report(ReportInfo),
    Block(BlockInfo),
    Payment(PaymentInfo),
}

impl RecordEntry {
    /// Sort key, seconds since epoch
    pub fn timestamp(&self) -> f64 {
        match self {
            RecordEntry::Like(info) => info.created_date,
            RecordEntry::Report(info) => info.created_date,
            RecordEntry::Block(info) => info.created_date,
            RecordEntry::Payment(info) => info.purchased_date,
        }
    }
}

/// Record tabs of the user detail view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordKind {
    Like,
    Dislike,
    Matching,
    Report,
    Block,
    Payment,
}

impl RecordKind {
    pub const ALL: [RecordKind; 6] = [
        RecordKind::Like,
        RecordKind::Dislike,
        RecordKind::Matching,
        RecordKind::Report,
        RecordKind::Block,
        RecordKind::Payment,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RecordKind::Like => "like",
            RecordKind::Dislike => "dislike",
            RecordKind::Matching => "matching",
            RecordKind::Report => "report",
            RecordKind::Block => "block",
            RecordKind::Payment => "payment",
        }
    }

    /// Collection holding the user's bucket; the bucket id is always the user id
    pub fn collection(&self, user_id: &str) -> Collection {
        match self {
            RecordKind::Like | RecordKind::Dislike | RecordKind::Matching => Collection::Likes,
            RecordKind::Report => Collection::Report {
                owner: user_id.to_string(),
            },
            RecordKind::Block => Collection::Block {
                owner: user_id.to_string(),
            },
            RecordKind::Payment => Collection::Payment,
        }
    }

    /// Embedded array field, as named by the backend
    pub fn array_field(&self) -> &'static str {
        match self {
            RecordKind::Like | RecordKind::Dislike | RecordKind::Matching => "recivedlikes",
            RecordKind::Report => "recivedReport",
            RecordKind::Block => "recivedBlock",
            RecordKind::Payment => "paymentInfos",
        }
    }

    /// Matching events are mutual interest and surface under like and dislike alike
    pub fn accepts(&self, entry: &RecordEntry) -> bool {
        match (self, entry) {
            (RecordKind::Like, RecordEntry::Like(info)) => {
                matches!(info.like_type, LikeType::Like | LikeType::Matching)
            }
            (RecordKind::Dislike, RecordEntry::Like(info)) => {
                matches!(info.like_type, LikeType::Dislike | LikeType::Matching)
            }
            (RecordKind::Matching, RecordEntry::Like(info)) => info.like_type == LikeType::Matching,
            (RecordKind::Report, RecordEntry::Report(_))
            | (RecordKind::Block, RecordEntry::Block(_))
            | (RecordKind::Payment, RecordEntry::Payment(_)) => true,
            _ => false,
        }
    }

    /// Decode the bucket's array in stored order. A bucket without the array
    /// field holds no records yet.
    pub fn decode_entries(&self, document: &Document, collection: &Collection) -> Result<Vec<RecordEntry>> {
        let raw = match document.data.get(self.array_field()) {
            None | Some(Value::Null) => return Ok(Vec::new()),
            Some(raw) => raw,
        };

        let decode_error = |source: serde_json::Error| RecordsError::Decode {
            collection: collection.path(),
            document_id: document.id.clone(),
            source,
        };

        fn parse<T: DeserializeOwned>(raw: &Value) -> serde_json::Result<Vec<T>> {
            Vec::<T>::deserialize(raw)
        }

        let entries = match self {
            RecordKind::Like | RecordKind::Dislike | RecordKind::Matching => parse::<LikeInfo>(raw)
                .map_err(decode_error)?
                .into_iter()
                .map(RecordEntry::Like)
                .collect(),
            RecordKind::Report => parse::<ReportInfo>(raw)
                .map_err(decode_error)?
                .into_iter()
                .map(RecordEntry::Report)
                .collect(),
            RecordKind::Block => parse::<BlockInfo>(raw)
                .map_err(decode_error)?
                .into_iter()
                .map(RecordEntry::Block)
                .collect(),
            RecordKind::Payment => parse::<PaymentInfo>(raw)
                .map_err(decode_error)?
                .into_iter()
                .map(RecordEntry::Payment)
                .collect(),
        };

        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn like(like_type: &str, date: f64) -> Value {
        json!({ "likedUserId": "x", "likeType": like_type, "createdDate": date })
    }

    #[test]
    fn test_like_filters_include_matching() {
        let doc = Document::new(
            "u1",
            json!({ "recivedlikes": [like("like", 1.0), like("dislike", 2.0), like("matching", 3.0)] }),
        );
        let entries = RecordKind::Like.decode_entries(&doc, &Collection::Likes).unwrap();

        let count = |kind: RecordKind| entries.iter().filter(|e| kind.accepts(e)).count();
        assert_eq!(count(RecordKind::Like), 2);
        assert_eq!(count(RecordKind::Dislike), 2);
        assert_eq!(count(RecordKind::Matching), 1);
        assert_eq!(count(RecordKind::Report), 0);
    }

    #[test]
    fn test_missing_array_is_empty_bucket() {
        let doc = Document::new("u1", json!({ "userId": "u1" }));
        let entries = RecordKind::Payment
            .decode_entries(&doc, &Collection::Payment)
            .unwrap();
        assert!(entries.is_empty());
    }

    #[test]
    fn test_malformed_array_is_decode_error() {
        let doc = Document::new("u1", json!({ "recivedBlock": [{ "createdDate": "yesterday" }] }));
        let collection = RecordKind::Block.collection("u1");
        let err = RecordKind::Block.decode_entries(&doc, &collection).unwrap_err();

        assert!(matches!(err, RecordsError::Decode { .. }));
        assert!(err.to_string().contains("users/u1/block/u1"));
    }

    #[test]
    fn test_payment_timestamp_uses_purchase_date() {
        let entry = RecordEntry::Payment(PaymentInfo {
            price: 1200,
            purchase_chu_count: 10,
            payment_type: "card".to_string(),
            purchased_date: 42.0,
        });
        assert_eq!(entry.timestamp(), 42.0);
    }
}
