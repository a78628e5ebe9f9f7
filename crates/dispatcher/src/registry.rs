use std::sync::Arc;
use std::time::Duration;

use dashmap::{mapref::entry::Entry, DashMap};
use dispatch_core::{DispatchError, DispatchResult};
use dispatch_domain::{ClaimOutcome, OrderId, PickupPacket, RiderClaim, RiderId, SessionStatus};
use tokio::time::Instant;
use tracing::{debug, info};

use crate::session::DispatchSession;

/// 已结束订单的终态，用于识别重复事件和回答迟到的接单请求
#[derive(Debug, Clone)]
struct RetiredSession {
    status: SessionStatus,
    retired_at: Instant,
}

/// 派单会话注册表
///
/// 按订单ID分片存储会话，只有同一订单的操作会相互竞争。
pub struct SessionRegistry {
    live: DashMap<OrderId, Arc<DispatchSession>>,
    retired: DashMap<OrderId, RetiredSession>,
    retention: Duration,
}

impl SessionRegistry {
    pub fn new(retention: Duration) -> Self {
        Self {
            live: DashMap::new(),
            retired: DashMap::new(),
            retention,
        }
    }

    /// 为订单创建派单会话
    ///
    /// 订单已有活跃会话，或在保留期内已经处理过，都返回 `DuplicateSession`。
    pub fn open(
        &self,
        order_id: &str,
        candidates: Vec<RiderId>,
        packet: PickupPacket,
        deadline: Instant,
    ) -> DispatchResult<Arc<DispatchSession>> {
        match self.live.entry(order_id.to_string()) {
            Entry::Occupied(_) => Err(DispatchError::DuplicateSession {
                order_id: order_id.to_string(),
            }),
            // close 先写终态再移除活跃会话，持有分片锁时检查终态不会遗漏
            Entry::Vacant(_) if self.is_retired(order_id) => {
                Err(DispatchError::DuplicateSession {
                    order_id: order_id.to_string(),
                })
            }
            Entry::Vacant(entry) => {
                let session = Arc::new(DispatchSession::new(
                    order_id.to_string(),
                    candidates,
                    packet,
                    deadline,
                ));
                entry.insert(session.clone());
                debug!(
                    order_id = order_id,
                    candidates = session.candidates().len(),
                    "派单会话已创建"
                );
                Ok(session)
            }
        }
    }

    /// 提交接单请求
    ///
    /// 活跃会话由其仲裁者处理；已关闭的订单按保留的终态回答。
    pub async fn claim(&self, claim: &RiderClaim) -> DispatchResult<ClaimOutcome> {
        if let Some(session) = self.get_live(&claim.order_id) {
            return Ok(session.claim(claim).await);
        }

        match self.retired_status(&claim.order_id) {
            Some(SessionStatus::Claimed { .. }) => Ok(ClaimOutcome::AlreadyClaimed),
            Some(SessionStatus::Expired { reason }) => Ok(ClaimOutcome::Expired(reason)),
            Some(SessionStatus::Open) | None => Err(DispatchError::SessionNotFound {
                order_id: claim.order_id.clone(),
            }),
        }
    }

    pub fn lookup(&self, order_id: &str) -> DispatchResult<Arc<DispatchSession>> {
        self.get_live(order_id)
            .ok_or_else(|| DispatchError::SessionNotFound {
                order_id: order_id.to_string(),
            })
    }

    /// 移除已结束的会话并保留其终态
    pub fn close(&self, order_id: &str) -> DispatchResult<SessionStatus> {
        let session = self.lookup(order_id)?;
        let status = session.status();
        if !status.is_terminal() {
            return Err(DispatchError::SessionStillOpen {
                order_id: order_id.to_string(),
            });
        }

        // 先写入终态再移除活跃会话，期间到达的重复事件仍会被识别
        self.retired.insert(
            order_id.to_string(),
            RetiredSession {
                status: status.clone(),
                retired_at: Instant::now(),
            },
        );
        self.live.remove(order_id);

        info!(order_id = order_id, status = status.as_str(), "派单会话已关闭");
        Ok(status)
    }

    /// 订单是否有活跃会话或仍在保留期内
    pub fn is_known(&self, order_id: &str) -> bool {
        self.live.contains_key(order_id) || self.is_retired(order_id)
    }

    pub fn live_count(&self) -> usize {
        self.live.len()
    }

    pub fn retired_count(&self) -> usize {
        self.retired.len()
    }

    /// 清理超过保留期的终态记录
    pub fn prune_retired(&self) -> usize {
        let before = self.retired.len();
        let retention = self.retention;
        self.retired
            .retain(|_, retired| retired.retired_at.elapsed() < retention);
        let pruned = before.saturating_sub(self.retired.len());
        if pruned > 0 {
            debug!("清理了 {} 条过期的订单终态记录", pruned);
        }
        pruned
    }

    fn get_live(&self, order_id: &str) -> Option<Arc<DispatchSession>> {
        self.live.get(order_id).map(|entry| entry.value().clone())
    }

    fn retired_status(&self, order_id: &str) -> Option<SessionStatus> {
        self.retired
            .get(order_id)
            .filter(|retired| retired.retired_at.elapsed() < self.retention)
            .map(|retired| retired.status.clone())
    }

    fn is_retired(&self, order_id: &str) -> bool {
        self.retired_status(order_id).is_some()
    }
}
