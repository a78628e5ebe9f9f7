use std::sync::Arc;

use chrono::Utc;
use dispatch_core::{DispatchError, DispatchResult};
use dispatch_domain::{
    DeliveryRecord, DeliveryRecordStore, DeliveryStatus, PickupPacket, Point, RiderClaim,
    SessionStatus,
};
use dispatch_infrastructure::DispatchMetrics;
use serde::Serialize;
use tracing::{debug, info};

use crate::fee;
use crate::registry::SessionRegistry;

/// 订单配送状态查询结果
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderTracking {
    pub record: DeliveryRecord,
    /// 仍在派单中的订单会附带会话状态
    pub dispatch: Option<SessionStatus>,
}

/// 面向骑手客户端的派单服务
pub struct DeliveryService {
    registry: Arc<SessionRegistry>,
    store: Arc<dyn DeliveryRecordStore>,
    metrics: Arc<DispatchMetrics>,
}

fn require_id(value: &str, name: &str) -> DispatchResult<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(DispatchError::InvalidArgument(format!("{name}不能为空")));
    }
    Ok(value.to_string())
}

impl DeliveryService {
    pub fn new(
        registry: Arc<SessionRegistry>,
        store: Arc<dyn DeliveryRecordStore>,
        metrics: Arc<DispatchMetrics>,
    ) -> Self {
        Self {
            registry,
            store,
            metrics,
        }
    }

    /// 骑手接单
    ///
    /// 仲裁结果直接返回给调用方：中标返回取餐信息，其余结果映射为可区分的错误。
    pub async fn accept_order(&self, order_id: &str, rider_id: &str) -> DispatchResult<PickupPacket> {
        let claim = RiderClaim::new(require_id(order_id, "订单ID")?, require_id(rider_id, "骑手ID")?);

        let outcome = self.registry.claim(&claim).await?;
        self.metrics.record_claim(outcome.as_str());
        debug!(
            order_id = %claim.order_id,
            rider_id = %claim.rider_id,
            outcome = outcome.as_str(),
            "接单请求已处理"
        );

        outcome.into_packet(&claim)
    }

    pub async fn track_order(&self, order_id: &str) -> DispatchResult<OrderTracking> {
        let order_id = require_id(order_id, "订单ID")?;
        let record = self
            .store
            .get(&order_id)
            .await?
            .ok_or_else(|| DispatchError::DeliveryNotFound {
                order_id: order_id.clone(),
            })?;
        let dispatch = self
            .registry
            .lookup(&order_id)
            .ok()
            .map(|session| session.status());

        Ok(OrderTracking { record, dispatch })
    }

    /// 接单骑手上报取餐或送达
    pub async fn report_status(
        &self,
        order_id: &str,
        rider_id: &str,
        status: DeliveryStatus,
    ) -> DispatchResult<DeliveryRecord> {
        let order_id = require_id(order_id, "订单ID")?;
        let rider_id = require_id(rider_id, "骑手ID")?;
        if !matches!(status, DeliveryStatus::PickedUp | DeliveryStatus::Delivered) {
            return Err(DispatchError::InvalidArgument(format!(
                "骑手只能上报取餐或送达状态，收到: {status}"
            )));
        }

        let record = self
            .store
            .get(&order_id)
            .await?
            .ok_or_else(|| DispatchError::DeliveryNotFound {
                order_id: order_id.clone(),
            })?;
        if !record.is_assigned_to(&rider_id) {
            return Err(DispatchError::PermissionDenied(format!(
                "骑手 {rider_id} 不是订单 {order_id} 的配送骑手"
            )));
        }
        if !record.status.can_transition_to(status) {
            return Err(DispatchError::InvalidArgument(format!(
                "配送状态不能从 {} 变更为 {}",
                record.status, status
            )));
        }

        let updated = self
            .store
            .update_status(&order_id, record.status, status, Utc::now())
            .await?;
        info!(order_id = %order_id, rider_id = %rider_id, status = %status, "配送状态已更新");
        Ok(updated)
    }

    pub fn delivery_fee(&self, merchant: Point, customer: Point) -> DispatchResult<i32> {
        fee::delivery_fee(merchant, customer)
    }

    pub fn live_sessions(&self) -> usize {
        self.registry.live_count()
    }
}
