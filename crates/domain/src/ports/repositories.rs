use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dispatch_core::DispatchResult;

use crate::entities::{DeliveryRecord, DeliveryStatus, PickupPacket};

/// 配送记录存储
///
/// 同一订单最多写入两次派单相关数据：创建未接单记录、标记接单。
#[async_trait]
pub trait DeliveryRecordStore: Send + Sync {
    async fn create_unaccepted(
        &self,
        order_id: &str,
        pickup: &PickupPacket,
    ) -> DispatchResult<DeliveryRecord>;

    async fn mark_accepted(
        &self,
        order_id: &str,
        rider_id: &str,
        accepted_at: DateTime<Utc>,
    ) -> DispatchResult<DeliveryRecord>;

    async fn get(&self, order_id: &str) -> DispatchResult<Option<DeliveryRecord>>;

    /// 仅当当前状态等于 `from` 时才更新为 `to`
    async fn update_status(
        &self,
        order_id: &str,
        from: DeliveryStatus,
        to: DeliveryStatus,
        at: DateTime<Utc>,
    ) -> DispatchResult<DeliveryRecord>;
}
