use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dispatch_core::{DispatchError, DispatchResult};
use dispatch_domain::{DeliveryRecord, DeliveryRecordStore, DeliveryStatus, PickupPacket};
use tokio::sync::RwLock;
use tracing::debug;

/// 进程内的配送记录存储，用于嵌入式部署和测试
#[derive(Debug, Default)]
pub struct InMemoryDeliveryStore {
    records: RwLock<HashMap<String, DeliveryRecord>>,
}

impl InMemoryDeliveryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl DeliveryRecordStore for InMemoryDeliveryStore {
    async fn create_unaccepted(
        &self,
        order_id: &str,
        pickup: &PickupPacket,
    ) -> DispatchResult<DeliveryRecord> {
        let mut records = self.records.write().await;
        if records.contains_key(order_id) {
            return Err(DispatchError::DuplicateSession {
                order_id: order_id.to_string(),
            });
        }

        let record = DeliveryRecord::new_unaccepted(order_id, pickup.clone());
        records.insert(order_id.to_string(), record.clone());
        debug!("创建未接单配送记录: {}", order_id);
        Ok(record)
    }

    async fn mark_accepted(
        &self,
        order_id: &str,
        rider_id: &str,
        accepted_at: DateTime<Utc>,
    ) -> DispatchResult<DeliveryRecord> {
        let mut records = self.records.write().await;
        let record = records
            .get_mut(order_id)
            .ok_or_else(|| DispatchError::DeliveryNotFound {
                order_id: order_id.to_string(),
            })?;

        record.accept(rider_id, accepted_at)?;
        debug!("配送记录 {} 已由骑手 {} 接单", order_id, rider_id);
        Ok(record.clone())
    }

    async fn get(&self, order_id: &str) -> DispatchResult<Option<DeliveryRecord>> {
        Ok(self.records.read().await.get(order_id).cloned())
    }

    async fn update_status(
        &self,
        order_id: &str,
        from: DeliveryStatus,
        to: DeliveryStatus,
        at: DateTime<Utc>,
    ) -> DispatchResult<DeliveryRecord> {
        let mut records = self.records.write().await;
        let record = records
            .get_mut(order_id)
            .ok_or_else(|| DispatchError::DeliveryNotFound {
                order_id: order_id.to_string(),
            })?;

        if record.status != from {
            return Err(DispatchError::InvalidArgument(format!(
                "配送记录 {} 的状态已变更为 {}",
                order_id, record.status
            )));
        }

        record.advance(to, at)?;
        Ok(record.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dispatch_domain::Point;

    fn packet() -> PickupPacket {
        PickupPacket {
            pickup_code: "555".to_string(),
            pickup_location: Point::new(18.7883, 98.9853),
            destination: Point::new(18.6870, 98.8897),
        }
    }

    #[tokio::test]
    async fn test_accept_exactly_once() {
        let store = InMemoryDeliveryStore::new();
        store.create_unaccepted("o-1", &packet()).await.unwrap();

        let record = store.mark_accepted("o-1", "r-1", Utc::now()).await.unwrap();
        assert!(record.is_accepted);
        assert_eq!(record.rider_id.as_deref(), Some("r-1"));

        assert!(store.mark_accepted("o-1", "r-2", Utc::now()).await.is_err());
        let stored = store.get("o-1").await.unwrap().unwrap();
        assert_eq!(stored.rider_id.as_deref(), Some("r-1"));
    }

    #[tokio::test]
    async fn test_duplicate_create_rejected() {
        let store = InMemoryDeliveryStore::new();
        store.create_unaccepted("o-1", &packet()).await.unwrap();
        let result = store.create_unaccepted("o-1", &packet()).await;
        assert!(matches!(result, Err(DispatchError::DuplicateSession { .. })));
    }

    #[tokio::test]
    async fn test_status_update_requires_expected_state() {
        let store = InMemoryDeliveryStore::new();
        store.create_unaccepted("o-1", &packet()).await.unwrap();
        store.mark_accepted("o-1", "r-1", Utc::now()).await.unwrap();

        let stale = store
            .update_status(
                "o-1",
                DeliveryStatus::PickedUp,
                DeliveryStatus::Delivered,
                Utc::now(),
            )
            .await;
        assert!(stale.is_err());

        let record = store
            .update_status(
                "o-1",
                DeliveryStatus::Accepted,
                DeliveryStatus::PickedUp,
                Utc::now(),
            )
            .await
            .unwrap();
        assert_eq!(record.status, DeliveryStatus::PickedUp);
    }

    #[tokio::test]
    async fn test_missing_record() {
        let store = InMemoryDeliveryStore::new();
        assert!(store.get("nope").await.unwrap().is_none());
        assert!(matches!(
            store.mark_accepted("nope", "r-1", Utc::now()).await,
            Err(DispatchError::DeliveryNotFound { .. })
        ));
    }
}
