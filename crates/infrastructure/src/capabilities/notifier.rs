use std::collections::HashSet;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dispatch_core::{DispatchError, DispatchResult};
use dispatch_domain::{PickupPacket, RiderNotifier};
use tokio::sync::RwLock;
use tracing::info;

#[derive(Debug, Clone, PartialEq)]
pub struct PushRecord {
    pub rider_id: String,
    pub order_id: String,
    pub sent_at: DateTime<Utc>,
}

/// 只写日志的推送通知
///
/// 被标记为不可达的骑手推送会失败。
#[derive(Debug, Default)]
pub struct LoggingNotifier {
    pushes: RwLock<Vec<PushRecord>>,
    unreachable: HashSet<String>,
}

impl LoggingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_unreachable<I, S>(riders: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            pushes: RwLock::new(Vec::new()),
            unreachable: riders.into_iter().map(Into::into).collect(),
        }
    }

    pub async fn pushes(&self) -> Vec<PushRecord> {
        self.pushes.read().await.clone()
    }

    pub async fn pushed_riders(&self, order_id: &str) -> Vec<String> {
        self.pushes
            .read()
            .await
            .iter()
            .filter(|push| push.order_id == order_id)
            .map(|push| push.rider_id.clone())
            .collect()
    }
}

#[async_trait]
impl RiderNotifier for LoggingNotifier {
    async fn push(
        &self,
        rider_id: &str,
        order_id: &str,
        packet: &PickupPacket,
    ) -> DispatchResult<()> {
        if self.unreachable.contains(rider_id) {
            return Err(DispatchError::Notification(format!(
                "骑手 {rider_id} 的设备不可达"
            )));
        }

        info!(
            rider_id = rider_id,
            order_id = order_id,
            pickup_location = ?packet.pickup_location,
            "向骑手推送接单邀请"
        );

        self.pushes.write().await.push(PushRecord {
            rider_id: rider_id.to_string(),
            order_id: order_id.to_string(),
            sent_at: Utc::now(),
        });
        Ok(())
    }
}
