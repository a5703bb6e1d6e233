// Moderation executor - moves users between the active, suspended and
// unsubscribed buckets
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;

use crate::error::{RecordsError, Result, TransferError, WriteStep};
use crate::gateway::{BackendGateway, DocumentMove, TransferOrder};
use crate::models::{now_timestamp, StopRecord, UnsubscribeRecord, User, UserListType};

/// Runs suspend / unsubscribe / restore as bucket moves.
///
/// A move is two writes unless the gateway overrides `transfer`. If the second
/// write fails the first stays applied and the error names the failed step;
/// every write is idempotent, so re-running the action converges.
#[derive(Clone)]
pub struct ModerationExecutor {
    gateway: Arc<dyn BackendGateway>,
    allow_restore_from_unsubscribed: bool,
}

impl ModerationExecutor {
    pub fn new(gateway: Arc<dyn BackendGateway>) -> Self {
        Self {
            gateway,
            allow_restore_from_unsubscribed: false,
        }
    }

    /// Permit reactivating withdrawn accounts (logged as a warning each time)
    pub fn allow_restore_from_unsubscribed(mut self, allow: bool) -> Self {
        self.allow_restore_from_unsubscribed = allow;
        self
    }

    /// Suspend an active user for `during_days` days
    pub async fn suspend(&self, user: &User, during_days: u32) -> Result<StopRecord> {
        if during_days == 0 {
            return Err(RecordsError::InvalidInput(
                "suspension must last at least one day".to_string(),
            ));
        }

        let record = StopRecord {
            created_date: now_timestamp(),
            during: during_days,
            phone_number: user.phone_number.clone(),
            user: user.clone(),
        };

        self.move_user(
            user,
            UserListType::Active,
            UserListType::Suspended,
            to_value(&record)?,
            TransferOrder::WriteThenDelete,
        )
        .await?;

        tracing::info!(
            user_id = %user.id,
            during_days,
            "User suspended"
        );

        Ok(record)
    }

    /// Withdraw a user from `from`; withdrawn is terminal
    pub async fn unsubscribe(&self, user: &User, from: UserListType) -> Result<UnsubscribeRecord> {
        if from == UserListType::Unsubscribed {
            return Err(invalid_transition(from, UserListType::Unsubscribed));
        }

        let record = UnsubscribeRecord {
            created_date: now_timestamp(),
            phone_number: user.phone_number.clone(),
            user: user.clone(),
        };

        self.move_user(
            user,
            from,
            UserListType::Unsubscribed,
            to_value(&record)?,
            TransferOrder::WriteThenDelete,
        )
        .await?;

        tracing::info!(
            user_id = %user.id,
            from = from.as_str(),
            "User unsubscribed"
        );

        Ok(record)
    }

    /// Put a user back into the active bucket, written verbatim
    pub async fn restore(&self, user: &User, from: UserListType) -> Result<()> {
        match from {
            UserListType::Active => {
                return Err(invalid_transition(from, UserListType::Active));
            }
            UserListType::Unsubscribed if !self.allow_restore_from_unsubscribed => {
                return Err(invalid_transition(from, UserListType::Active));
            }
            UserListType::Unsubscribed => {
                tracing::warn!(
                    user_id = %user.id,
                    "Reactivating an unsubscribed account"
                );
            }
            UserListType::Suspended => {}
        }

        self.move_user(
            user,
            from,
            UserListType::Active,
            to_value(user)?,
            TransferOrder::DeleteThenWrite,
        )
        .await?;

        tracing::info!(
            user_id = %user.id,
            from = from.as_str(),
            "User restored"
        );

        Ok(())
    }

    async fn move_user(
        &self,
        user: &User,
        from: UserListType,
        to: UserListType,
        data: Value,
        order: TransferOrder,
    ) -> Result<()> {
        let document_move = DocumentMove {
            document_id: user.id.clone(),
            source: from.collection(),
            destination: to.collection(),
            data,
            order,
        };

        self.gateway
            .transfer(document_move)
            .await
            .map_err(|TransferError { step, collection, source }| {
                let completed_first = match (order, step) {
                    (TransferOrder::WriteThenDelete, WriteStep::Delete)
                    | (TransferOrder::DeleteThenWrite, WriteStep::Set) => true,
                    _ => false,
                };
                if completed_first {
                    tracing::error!(
                        user_id = %user.id,
                        from = from.as_str(),
                        to = to.as_str(),
                        failed_step = %step,
                        "Moderation move half-applied; retry the action to converge"
                    );
                }
                RecordsError::write(&collection, &user.id, step, source)
            })
    }
}

fn to_value<T: Serialize>(record: &T) -> Result<Value> {
    serde_json::to_value(record)
        .map_err(|e| RecordsError::InvalidInput(format!("unserializable record: {}", e)))
}

fn invalid_transition(from: UserListType, to: UserListType) -> RecordsError {
    RecordsError::InvalidTransition {
        from: from.as_str().to_string(),
        to: to.as_str().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::{Collection, MemoryGateway, Operation};
    use serde_json::{json, Map};
    use tracing::Level;
    use tracing_subscriber::layer::{Context, SubscriberExt};
    use tracing_subscriber::Layer;

    /// Collects the level of every event emitted on this thread
    #[derive(Clone, Default)]
    struct LevelRecorder(Arc<std::sync::Mutex<Vec<Level>>>);

    impl<S: tracing::Subscriber> Layer<S> for LevelRecorder {
        fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
            self.0.lock().unwrap().push(*event.metadata().level());
        }
    }

    impl LevelRecorder {
        fn take(&self) -> Vec<Level> {
            std::mem::take(&mut *self.0.lock().unwrap())
        }
    }

    fn user(id: &str) -> User {
        User {
            id: id.to_string(),
            nick_name: "mina".to_string(),
            birth: "1998-03-02".to_string(),
            mbti: "enfp".to_string(),
            phone_number: "01012345678".to_string(),
            image_urls: Vec::new(),
            created_date: 1.0,
            extra: Map::new(),
        }
    }

    #[tokio::test]
    async fn test_suspend_writes_stop_record() {
        let gateway = MemoryGateway::new();
        let u = user("u1");
        gateway
            .insert(&Collection::Users, "u1", serde_json::to_value(&u).unwrap())
            .await;
        let executor = ModerationExecutor::new(Arc::new(gateway.clone()));

        let record = executor.suspend(&u, 3).await.unwrap();

        assert_eq!(record.during, 3);
        assert!(!gateway.contains(&Collection::Users, "u1").await);
        let stored = gateway.document(&Collection::Stop, "u1").await.unwrap();
        assert_eq!(stored["during"], json!(3));
        assert_eq!(stored["phoneNumber"], json!("01012345678"));
        assert_eq!(stored["user"]["nickName"], json!("mina"));
    }

    #[tokio::test]
    async fn test_zero_day_suspension_is_rejected() {
        let executor = ModerationExecutor::new(Arc::new(MemoryGateway::new()));
        let err = executor.suspend(&user("u1"), 0).await.unwrap_err();
        assert!(matches!(err, RecordsError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_transitions_outside_state_machine() {
        let executor = ModerationExecutor::new(Arc::new(MemoryGateway::new()));
        let u = user("u1");

        let err = executor
            .unsubscribe(&u, UserListType::Unsubscribed)
            .await
            .unwrap_err();
        assert!(matches!(err, RecordsError::InvalidTransition { .. }));

        let err = executor.restore(&u, UserListType::Active).await.unwrap_err();
        assert!(matches!(err, RecordsError::InvalidTransition { .. }));

        let err = executor
            .restore(&u, UserListType::Unsubscribed)
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid moderation transition: unsubscribed -> active"
        );
    }

    #[tokio::test]
    async fn test_restore_from_unsubscribed_when_allowed() {
        let gateway = MemoryGateway::new();
        let u = user("u1");
        let executor = ModerationExecutor::new(Arc::new(gateway.clone()))
            .allow_restore_from_unsubscribed(true);

        executor.unsubscribe(&u, UserListType::Active).await.unwrap();
        assert!(gateway.contains(&Collection::Unsubscribe, "u1").await);

        executor.restore(&u, UserListType::Unsubscribed).await.unwrap();
        assert!(!gateway.contains(&Collection::Unsubscribe, "u1").await);
        assert_eq!(
            gateway.document(&Collection::Users, "u1").await.unwrap(),
            serde_json::to_value(&u).unwrap()
        );
    }

    #[tokio::test]
    async fn test_completed_moves_log_at_info() {
        let recorder = LevelRecorder::default();
        let _guard =
            tracing::subscriber::set_default(tracing_subscriber::registry().with(recorder.clone()));

        let gateway = MemoryGateway::new();
        let u = user("u1");
        let executor = ModerationExecutor::new(Arc::new(gateway.clone()));

        executor.suspend(&u, 7).await.unwrap();
        executor.unsubscribe(&u, UserListType::Suspended).await.unwrap();
        let levels = recorder.take();
        assert_eq!(levels, vec![Level::INFO, Level::INFO]);

        let executor = executor.allow_restore_from_unsubscribed(true);
        executor.restore(&u, UserListType::Unsubscribed).await.unwrap();
        assert_eq!(recorder.take(), vec![Level::WARN, Level::INFO]);

        gateway.fail_on(Operation::DeleteDocument, &Collection::Users, 1).await;
        assert!(executor.suspend(&u, 1).await.is_err());
        assert_eq!(recorder.take(), vec![Level::ERROR]);
    }
}
