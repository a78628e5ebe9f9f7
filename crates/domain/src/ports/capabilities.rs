use async_trait::async_trait;
use dispatch_core::DispatchResult;

use crate::entities::{Address, PickupPacket, Point, RiderId};

/// 候选骑手匹配
///
/// 返回空列表是合法结果，表示当前没有可用骑手。
#[async_trait]
pub trait CandidateSelector: Send + Sync {
    async fn select_candidates(&self, pickup_address: &Address) -> DispatchResult<Vec<RiderId>>;
}

/// 地址解析为坐标
#[async_trait]
pub trait AddressResolver: Send + Sync {
    async fn resolve(&self, address: &Address) -> DispatchResult<Point>;
}

/// 向骑手设备推送接单邀请，尽力而为
#[async_trait]
pub trait RiderNotifier: Send + Sync {
    async fn push(&self, rider_id: &str, order_id: &str, packet: &PickupPacket)
        -> DispatchResult<()>;
}
