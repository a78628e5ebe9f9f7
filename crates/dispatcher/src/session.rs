use std::collections::HashSet;

use chrono::{DateTime, Utc};
use dispatch_domain::{
    ClaimOutcome, ExpiryReason, OrderId, PickupPacket, RiderClaim, RiderId, SessionStatus,
};
use tokio::sync::{watch, Mutex};
use tokio::time::{sleep_until, timeout_at, Instant};
use tracing::{debug, info};

/// 单个订单的派单会话，同时也是该订单的接单仲裁者
///
/// 会话状态只在自身的锁内修改，不同订单之间不共享任何可变状态。
/// 状态变化通过 `watch` 通道广播，用于取消广播和唤醒等待者。
pub struct DispatchSession {
    order_id: OrderId,
    candidates: Vec<RiderId>,
    eligible: HashSet<RiderId>,
    packet: PickupPacket,
    deadline: Instant,
    opened_at: Instant,
    state: Mutex<SessionState>,
    status_tx: watch::Sender<SessionStatus>,
}

struct SessionState {
    status: SessionStatus,
    claimed_at: Option<DateTime<Utc>>,
}

/// 会话的只读快照
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSnapshot {
    pub order_id: OrderId,
    pub status: SessionStatus,
    pub candidates: Vec<RiderId>,
    pub claimed_at: Option<DateTime<Utc>>,
}

impl DispatchSession {
    /// 创建会话；候选骑手为空时直接以 `NoCandidates` 结束
    pub fn new(
        order_id: OrderId,
        candidates: Vec<RiderId>,
        packet: PickupPacket,
        deadline: Instant,
    ) -> Self {
        let initial = if candidates.is_empty() {
            SessionStatus::Expired {
                reason: ExpiryReason::NoCandidates,
            }
        } else {
            SessionStatus::Open
        };
        let (status_tx, _) = watch::channel(initial.clone());
        let eligible = candidates.iter().cloned().collect();

        Self {
            order_id,
            candidates,
            eligible,
            packet,
            deadline,
            opened_at: Instant::now(),
            state: Mutex::new(SessionState {
                status: initial,
                claimed_at: None,
            }),
            status_tx,
        }
    }

    pub fn order_id(&self) -> &str {
        &self.order_id
    }

    /// 按通知顺序排列的候选骑手
    pub fn candidates(&self) -> &[RiderId] {
        &self.candidates
    }

    pub fn is_candidate(&self, rider_id: &str) -> bool {
        self.eligible.contains(rider_id)
    }

    pub fn packet(&self) -> &PickupPacket {
        &self.packet
    }

    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    pub fn opened_at(&self) -> Instant {
        self.opened_at
    }

    /// 最近一次提交的状态
    pub fn status(&self) -> SessionStatus {
        self.status_tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionStatus> {
        self.status_tx.subscribe()
    }

    pub fn cancel_signal(&self) -> CancelSignal {
        CancelSignal {
            status_rx: self.subscribe(),
            deadline: self.deadline,
        }
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        let state = self.state.lock().await;
        SessionSnapshot {
            order_id: self.order_id.clone(),
            status: state.status.clone(),
            candidates: self.candidates.clone(),
            claimed_at: state.claimed_at,
        }
    }

    /// 处理一次接单请求
    ///
    /// 等待会话锁的时间不超过会话截止时间。锁内依次检查截止时间和候选资格，
    /// 只有第一个合格请求能把状态从 `Open` 改为 `Claimed`。
    pub async fn claim(&self, claim: &RiderClaim) -> ClaimOutcome {
        let mut state = match timeout_at(self.deadline, self.state.lock()).await {
            Ok(state) => state,
            Err(_) => return self.outcome_for_committed(),
        };

        let current = state.status.clone();
        match current {
            SessionStatus::Open => {
                if Instant::now() >= self.deadline {
                    let reason = ExpiryReason::Deadline;
                    self.commit(&mut state, SessionStatus::Expired { reason });
                    info!(order_id = %self.order_id, "派单会话已过截止时间");
                    return ClaimOutcome::Expired(reason);
                }

                if !self.is_candidate(&claim.rider_id) {
                    debug!(
                        order_id = %self.order_id,
                        rider_id = %claim.rider_id,
                        "非候选骑手的接单请求被拒绝"
                    );
                    return ClaimOutcome::RiderNotEligible;
                }

                state.claimed_at = Some(claim.arrived_at);
                self.commit(
                    &mut state,
                    SessionStatus::Claimed {
                        rider_id: claim.rider_id.clone(),
                    },
                );
                info!(
                    order_id = %self.order_id,
                    rider_id = %claim.rider_id,
                    "骑手接单成功"
                );
                ClaimOutcome::Accepted(self.packet.clone())
            }
            SessionStatus::Claimed { .. } => ClaimOutcome::AlreadyClaimed,
            SessionStatus::Expired { reason } => ClaimOutcome::Expired(reason),
        }
    }

    /// 结束仍然开放的会话，返回最终状态
    pub async fn expire(&self, reason: ExpiryReason) -> SessionStatus {
        let mut state = self.state.lock().await;
        if state.status == SessionStatus::Open {
            self.commit(&mut state, SessionStatus::Expired { reason });
            info!(order_id = %self.order_id, reason = %reason, "派单会话已结束，无人接单");
        }
        state.status.clone()
    }

    /// 等待会话结束；截止时间到达时由调用方负责将会话标记为过期
    pub async fn wait_for_resolution(&self) -> SessionStatus {
        let mut status_rx = self.subscribe();
        let resolved = tokio::select! {
            result = status_rx.wait_for(SessionStatus::is_terminal) => {
                result.ok().map(|status| status.clone())
            }
            _ = sleep_until(self.deadline) => None,
        };

        match resolved {
            Some(status) => status,
            None => self.expire(ExpiryReason::Deadline).await,
        }
    }

    pub async fn claimed_at(&self) -> Option<DateTime<Utc>> {
        self.state.lock().await.claimed_at
    }

    fn commit(&self, state: &mut SessionState, status: SessionStatus) {
        state.status = status.clone();
        self.status_tx.send_replace(status);
    }

    fn outcome_for_committed(&self) -> ClaimOutcome {
        match self.status() {
            SessionStatus::Claimed { .. } => ClaimOutcome::AlreadyClaimed,
            SessionStatus::Expired { reason } => ClaimOutcome::Expired(reason),
            SessionStatus::Open => ClaimOutcome::Expired(ExpiryReason::Deadline),
        }
    }
}

/// 广播使用的协作式取消信号
///
/// 会话进入终态或截止时间到达后触发。
#[derive(Clone)]
pub struct CancelSignal {
    status_rx: watch::Receiver<SessionStatus>,
    deadline: Instant,
}

impl CancelSignal {
    pub fn is_cancelled(&self) -> bool {
        self.status_rx.borrow().is_terminal() || Instant::now() >= self.deadline
    }

    pub async fn cancelled(&mut self) {
        tokio::select! {
            _ = self.status_rx.wait_for(SessionStatus::is_terminal) => {}
            _ = sleep_until(self.deadline) => {}
        }
    }
}
