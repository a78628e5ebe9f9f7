use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use dispatch_core::{
    config::models::{DispatchConfig, MessageQueueConfig},
    DispatchError, DispatchResult,
};
use dispatch_domain::{
    AddressResolver, CandidateSelector, DeliveryRecordStore, DispatchExpiredMessage,
    ExpiryReason, Message, MessageQueue, PlaceOrder, RiderAssignedMessage, RiderId,
    RiderNotifier, SessionStatus,
};
use dispatch_infrastructure::DispatchMetrics;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::broadcaster::{BroadcastSummary, OfferBroadcaster};
use crate::pickup::PickupPacketBuilder;
use crate::registry::SessionRegistry;
use crate::session::DispatchSession;

/// 派单引擎依赖的外部能力
#[derive(Clone)]
pub struct DispatchCollaborators {
    pub selector: Arc<dyn CandidateSelector>,
    pub resolver: Arc<dyn AddressResolver>,
    pub notifier: Arc<dyn RiderNotifier>,
    pub store: Arc<dyn DeliveryRecordStore>,
    pub message_queue: Arc<dyn MessageQueue>,
}

/// 派单最终结果
#[derive(Debug, Clone, PartialEq)]
pub enum DispatchOutcome {
    Assigned {
        rider_id: RiderId,
        accepted_at: DateTime<Utc>,
    },
    Expired {
        reason: ExpiryReason,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct DispatchReport {
    pub order_id: String,
    pub outcome: DispatchOutcome,
    pub broadcast: BroadcastSummary,
}

/// 派单引擎
///
/// 每个订单在独立任务中完成：选择候选骑手、生成取餐信息、创建会话、广播邀请，
/// 然后等待仲裁结果或截止时间。
pub struct DispatchEngine {
    registry: Arc<SessionRegistry>,
    selector: Arc<dyn CandidateSelector>,
    packet_builder: PickupPacketBuilder,
    broadcaster: Arc<OfferBroadcaster>,
    store: Arc<dyn DeliveryRecordStore>,
    message_queue: Arc<dyn MessageQueue>,
    metrics: Arc<DispatchMetrics>,
    offer_deadline: Duration,
    rider_assigned_queue: String,
    dispatch_expired_queue: String,
}

impl DispatchEngine {
    pub fn new(
        registry: Arc<SessionRegistry>,
        collaborators: DispatchCollaborators,
        metrics: Arc<DispatchMetrics>,
        dispatch_config: &DispatchConfig,
        queue_config: &MessageQueueConfig,
    ) -> Self {
        let broadcaster = Arc::new(OfferBroadcaster::new(
            collaborators.notifier,
            dispatch_config.notify_interval(),
            metrics.clone(),
        ));

        Self {
            registry,
            selector: collaborators.selector,
            packet_builder: PickupPacketBuilder::new(collaborators.resolver),
            broadcaster,
            store: collaborators.store,
            message_queue: collaborators.message_queue,
            metrics,
            offer_deadline: dispatch_config.offer_deadline(),
            rider_assigned_queue: queue_config.rider_assigned_queue.clone(),
            dispatch_expired_queue: queue_config.dispatch_expired_queue.clone(),
        }
    }

    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }

    /// 完成一个订单的派单流程
    ///
    /// 取餐信息生成失败或未接单记录写入失败时，不会发出任何通知。
    pub async fn dispatch(&self, order: PlaceOrder) -> DispatchResult<DispatchReport> {
        let order_id = order.order_id.trim().to_string();
        if order_id.is_empty() {
            return Err(DispatchError::InvalidArgument("订单ID不能为空".to_string()));
        }
        if self.registry.is_known(&order_id) {
            return Err(DispatchError::DuplicateSession { order_id });
        }

        let candidates = self
            .selector
            .select_candidates(&order.merchant_address)
            .await?;
        let packet = self.packet_builder.build(&order).await?;

        // 配送记录先于会话写入，写入失败时没有任何骑手能够接单
        if let Err(e) = self.store.create_unaccepted(&order_id, &packet).await {
            error!(order_id = %order_id, "创建配送记录失败，派单中止: {}", e);
            return Err(match e {
                DispatchError::DuplicateSession { .. } => e,
                other => DispatchError::PersistenceFailed(format!(
                    "创建订单 {order_id} 的配送记录失败: {other}"
                )),
            });
        }

        let deadline = Instant::now() + self.offer_deadline;
        let session = self
            .registry
            .open(&order_id, candidates, packet, deadline)?;
        self.metrics.record_session_opened();
        self.metrics.update_live_sessions(self.registry.live_count());

        info!(
            order_id = %order_id,
            candidates = session.candidates().len(),
            "开始派单"
        );

        let broadcast = self.start_broadcast(&session);
        let status = session.wait_for_resolution().await;

        let outcome = match status {
            SessionStatus::Claimed { rider_id } => self.finalize_claim(&session, rider_id).await,
            SessionStatus::Expired { reason } => self.finalize_expiry(&order_id, reason).await,
            SessionStatus::Open => {
                return Err(DispatchError::Internal(format!(
                    "订单 {order_id} 的派单会话未能结束"
                )))
            }
        };

        let broadcast = match broadcast {
            Some(handle) => handle.await.unwrap_or_else(|e| {
                warn!(order_id = %order_id, "广播任务异常结束: {}", e);
                BroadcastSummary::default()
            }),
            None => BroadcastSummary::default(),
        };

        if let Err(e) = self.registry.close(&order_id) {
            error!(order_id = %order_id, "关闭派单会话失败: {}", e);
        }
        self.metrics.update_live_sessions(self.registry.live_count());

        Ok(DispatchReport {
            order_id,
            outcome,
            broadcast,
        })
    }

    fn start_broadcast(
        &self,
        session: &Arc<DispatchSession>,
    ) -> Option<tokio::task::JoinHandle<BroadcastSummary>> {
        if session.status().is_terminal() {
            debug!(order_id = session.order_id(), "会话已结束，跳过广播");
            return None;
        }

        let broadcaster = self.broadcaster.clone();
        let session = session.clone();
        Some(tokio::spawn(async move {
            broadcaster
                .notify(
                    session.cancel_signal(),
                    session.order_id(),
                    session.candidates(),
                    session.packet(),
                )
                .await
        }))
    }

    /// 接单已经告知骑手，持久化失败只上报不撤销
    async fn finalize_claim(
        &self,
        session: &DispatchSession,
        rider_id: RiderId,
    ) -> DispatchOutcome {
        let order_id = session.order_id();
        let accepted_at = session.claimed_at().await.unwrap_or_else(Utc::now);
        self.metrics
            .record_time_to_claim(session.opened_at().elapsed().as_secs_f64());

        match self
            .store
            .mark_accepted(order_id, &rider_id, accepted_at)
            .await
        {
            Ok(_) => debug!(order_id = order_id, rider_id = %rider_id, "配送记录已标记为接单"),
            Err(e) => {
                error!(
                    order_id = order_id,
                    rider_id = %rider_id,
                    "接单已生效但配送记录更新失败，需要人工处理: {}",
                    e
                );
                self.metrics
                    .record_persistence_failure(order_id, &e.to_string());
            }
        }

        let event = Message::rider_assigned(RiderAssignedMessage {
            order_id: order_id.to_string(),
            rider_id: rider_id.clone(),
            accepted_at,
        });
        self.publish_event(&self.rider_assigned_queue, event).await;

        DispatchOutcome::Assigned {
            rider_id,
            accepted_at,
        }
    }

    async fn finalize_expiry(&self, order_id: &str, reason: ExpiryReason) -> DispatchOutcome {
        self.metrics.record_session_expired(reason.as_str());
        warn!(order_id = order_id, reason = %reason, "派单会话结束，没有骑手接单");

        let event = Message::dispatch_expired(DispatchExpiredMessage {
            order_id: order_id.to_string(),
            reason,
            expired_at: Utc::now(),
        });
        self.publish_event(&self.dispatch_expired_queue, event).await;

        DispatchOutcome::Expired { reason }
    }

    async fn publish_event(&self, queue: &str, event: Result<Message, serde_json::Error>) {
        let result = match event {
            Ok(message) => self.message_queue.publish_message(queue, &message).await,
            Err(e) => Err(e.into()),
        };
        if let Err(e) = result {
            error!("发布事件到队列 {} 失败: {}", queue, e);
        }
    }
}
