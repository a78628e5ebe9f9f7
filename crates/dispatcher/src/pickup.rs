use std::sync::Arc;

use dispatch_core::{DispatchError, DispatchResult};
use dispatch_domain::{Address, AddressResolver, PickupPacket, PlaceOrder, Point};
use rand::Rng;
use tracing::debug;

/// 取餐码范围 [100, 999]，只保证同一订单内不变
pub fn generate_pickup_code() -> String {
    rand::rng().random_range(100..=999).to_string()
}

/// 根据订单生成取餐信息
pub struct PickupPacketBuilder {
    resolver: Arc<dyn AddressResolver>,
}

impl PickupPacketBuilder {
    pub fn new(resolver: Arc<dyn AddressResolver>) -> Self {
        Self { resolver }
    }

    /// 商家地址解析为取餐点，顾客地址解析为目的地，任一失败则整单失败
    pub async fn build(&self, order: &PlaceOrder) -> DispatchResult<PickupPacket> {
        let pickup_location = self.resolve(&order.merchant_address).await?;
        let destination = self.resolve(&order.customer_address).await?;

        let packet = PickupPacket {
            pickup_code: generate_pickup_code(),
            pickup_location,
            destination,
        };
        debug!(order_id = %order.order_id, "取餐信息已生成");
        Ok(packet)
    }

    async fn resolve(&self, address: &Address) -> DispatchResult<Point> {
        self.resolver.resolve(address).await.map_err(|e| match e {
            DispatchError::AddressResolutionFailed { .. } => e,
            other => DispatchError::AddressResolutionFailed {
                address: address.to_string(),
                message: other.to_string(),
            },
        })
    }
}
