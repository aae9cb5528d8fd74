//! Delivers queued notifications by writing them to the notifications table

use matching::MatchStore;
use matching::model::{NewNotification, Notification};
use tracing::info;

use crate::runner::JobError;

pub async fn deliver(
    store: &dyn MatchStore,
    payload: &serde_json::Value,
) -> Result<Notification, JobError> {
    let new: NewNotification = serde_json::from_value(payload.clone())
        .map_err(|e| JobError::InvalidPayload(e.to_string()))?;

    let notification = store.insert_notification(&new).await?;
    info!(
        notification_id = %notification.id,
        user_id = %notification.user_id,
        kind = notification.kind.as_str(),
        "Notification delivered"
    );
    Ok(notification)
}

#[cfg(test)]
mod tests {
    use super::*;
    use matching::model::NotificationKind;
    use matching::store::MemoryMatchStore;
    use serde_json::json;

    #[tokio::test]
    async fn test_payload_becomes_notification() {
        let store = MemoryMatchStore::new();
        let payload = json!({
            "user_id": "ada@example.com",
            "kind": "match_confirmed",
            "match_id": null,
            "message": "New introduction"
        });

        let delivered = deliver(&store, &payload).await.unwrap();
        assert_eq!(delivered.kind, NotificationKind::MatchConfirmed);
        assert_eq!(store.notifications().len(), 1);
    }

    #[tokio::test]
    async fn test_malformed_payload_is_not_retryable() {
        let store = MemoryMatchStore::new();
        let err = deliver(&store, &json!({"kind": "carrier_pigeon"}))
            .await
            .unwrap_err();

        assert!(!err.is_retryable());
        assert!(store.notifications().is_empty());
    }
}
