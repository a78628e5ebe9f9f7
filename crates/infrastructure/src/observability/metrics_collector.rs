//! 派单引擎指标
//!
//! 通过 `metrics` 门面记录，未安装导出器时所有记录都是空操作。

use metrics::{counter, gauge, histogram, Counter, Gauge, Histogram};
use tracing::warn;

/// 派单引擎的指标集合
pub struct DispatchMetrics {
    sessions_opened_total: Counter,
    sessions_expired_total: Counter,
    live_sessions: Gauge,
    time_to_claim: Histogram,
    notifications_sent_total: Counter,
    notifications_failed_total: Counter,
    persistence_failures_total: Counter,
    intake_retries_total: Counter,
    intake_dropped_total: Counter,
    intake_backlog: Gauge,
}

impl DispatchMetrics {
    pub fn new() -> Self {
        Self {
            sessions_opened_total: counter!("dispatch_sessions_opened_total"),
            sessions_expired_total: counter!("dispatch_sessions_expired_total"),
            live_sessions: gauge!("dispatch_live_sessions"),
            time_to_claim: histogram!("dispatch_time_to_claim_seconds"),
            notifications_sent_total: counter!("dispatch_notifications_sent_total"),
            notifications_failed_total: counter!("dispatch_notifications_failed_total"),
            persistence_failures_total: counter!("dispatch_persistence_failures_total"),
            intake_retries_total: counter!("dispatch_intake_retries_total"),
            intake_dropped_total: counter!("dispatch_intake_dropped_total"),
            intake_backlog: gauge!("dispatch_intake_backlog"),
        }
    }

    pub fn record_session_opened(&self) {
        self.sessions_opened_total.increment(1);
    }

    pub fn record_session_expired(&self, reason: &str) {
        self.sessions_expired_total.increment(1);
        counter!("dispatch_expirations_by_reason_total", "reason" => reason.to_string())
            .increment(1);
    }

    /// 按仲裁结果统计接单请求
    pub fn record_claim(&self, outcome: &'static str) {
        counter!("dispatch_claims_total", "outcome" => outcome).increment(1);
    }

    pub fn record_time_to_claim(&self, seconds: f64) {
        self.time_to_claim.record(seconds);
    }

    pub fn update_live_sessions(&self, count: usize) {
        self.live_sessions.set(count as f64);
    }

    pub fn record_notification(&self, success: bool) {
        if success {
            self.notifications_sent_total.increment(1);
        } else {
            self.notifications_failed_total.increment(1);
        }
    }

    /// 接单后写入配送记录失败，需要人工对账
    pub fn record_persistence_failure(&self, order_id: &str, error: &str) {
        self.persistence_failures_total.increment(1);
        warn!(
            order_id = order_id,
            error = error,
            "Delivery record persistence failed after claim"
        );
    }

    pub fn record_intake_retry(&self) {
        self.intake_retries_total.increment(1);
    }

    pub fn record_intake_dropped(&self) {
        self.intake_dropped_total.increment(1);
    }

    /// 等待派单的订单事件数
    pub fn update_intake_backlog(&self, size: u32) {
        self.intake_backlog.set(size as f64);
    }
}

impl Default for DispatchMetrics {
    fn default() -> Self {
        Self::new()
    }
}
