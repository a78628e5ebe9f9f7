use std::sync::Arc;
use std::time::Duration;

use dispatch_domain::{PickupPacket, RiderId, RiderNotifier};
use dispatch_infrastructure::DispatchMetrics;
use tracing::{debug, info, warn};

use crate::session::CancelSignal;

/// 一次广播的结果统计
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BroadcastSummary {
    pub notified: usize,
    pub failed: usize,
    /// 取消信号触发后未通知的候选骑手数
    pub skipped: usize,
}

/// 按排序依次通知候选骑手
///
/// 每次发送前检查取消信号；已经发出的通知允许完成。单个骑手通知失败不影响其他骑手。
pub struct OfferBroadcaster {
    notifier: Arc<dyn RiderNotifier>,
    notify_interval: Duration,
    metrics: Arc<DispatchMetrics>,
}

impl OfferBroadcaster {
    pub fn new(
        notifier: Arc<dyn RiderNotifier>,
        notify_interval: Duration,
        metrics: Arc<DispatchMetrics>,
    ) -> Self {
        Self {
            notifier,
            notify_interval,
            metrics,
        }
    }

    pub async fn notify(
        &self,
        mut signal: CancelSignal,
        order_id: &str,
        candidates: &[RiderId],
        packet: &PickupPacket,
    ) -> BroadcastSummary {
        let mut summary = BroadcastSummary::default();

        for (index, rider_id) in candidates.iter().enumerate() {
            if index > 0 && !self.notify_interval.is_zero() {
                tokio::select! {
                    _ = signal.cancelled() => {}
                    _ = tokio::time::sleep(self.notify_interval) => {}
                }
            }

            if signal.is_cancelled() {
                summary.skipped = candidates.len() - index;
                debug!(
                    order_id = order_id,
                    skipped = summary.skipped,
                    "派单会话已结束，停止通知剩余骑手"
                );
                break;
            }

            match self.notifier.push(rider_id, order_id, packet).await {
                Ok(()) => {
                    summary.notified += 1;
                    self.metrics.record_notification(true);
                }
                Err(e) => {
                    summary.failed += 1;
                    self.metrics.record_notification(false);
                    warn!(
                        order_id = order_id,
                        rider_id = %rider_id,
                        "通知骑手失败: {}",
                        e
                    );
                }
            }
        }

        info!(
            order_id = order_id,
            notified = summary.notified,
            failed = summary.failed,
            skipped = summary.skipped,
            "接单邀请广播结束"
        );
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::DispatchSession;
    use dispatch_domain::{Point, RiderClaim};
    use dispatch_infrastructure::LoggingNotifier;
    use tokio::time::Instant;

    fn packet() -> PickupPacket {
        PickupPacket {
            pickup_code: "512".to_string(),
            pickup_location: Point::new(18.7883, 98.9853),
            destination: Point::new(18.8482, 99.1403),
        }
    }

    fn riders() -> Vec<RiderId> {
        vec!["R1".to_string(), "R2".to_string(), "R3".to_string()]
    }

    fn session(ttl: Duration) -> Arc<DispatchSession> {
        Arc::new(DispatchSession::new(
            "order-1".to_string(),
            riders(),
            packet(),
            Instant::now() + ttl,
        ))
    }

    fn broadcaster(notifier: Arc<LoggingNotifier>, interval: Duration) -> Arc<OfferBroadcaster> {
        Arc::new(OfferBroadcaster::new(
            notifier,
            interval,
            Arc::new(DispatchMetrics::new()),
        ))
    }

    #[tokio::test]
    async fn test_failed_push_does_not_stop_broadcast() {
        let notifier = Arc::new(LoggingNotifier::with_unreachable(["R2"]));
        let session = session(Duration::from_secs(60));

        let summary = broadcaster(notifier.clone(), Duration::ZERO)
            .notify(session.cancel_signal(), "order-1", &riders(), &packet())
            .await;

        assert_eq!(
            summary,
            BroadcastSummary {
                notified: 2,
                failed: 1,
                skipped: 0
            }
        );
        assert_eq!(notifier.pushed_riders("order-1").await, vec!["R1", "R3"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_claim_stops_remaining_pushes() {
        let notifier = Arc::new(LoggingNotifier::new());
        let session = session(Duration::from_secs(900));
        let broadcaster = broadcaster(notifier.clone(), Duration::from_secs(10));

        let signal = session.cancel_signal();
        let handle = tokio::spawn(async move {
            broadcaster
                .notify(signal, "order-1", &riders(), &packet())
                .await
        });

        tokio::time::sleep(Duration::from_secs(5)).await;
        let outcome = session.claim(&RiderClaim::new("order-1", "R1")).await;
        assert!(matches!(outcome, dispatch_domain::ClaimOutcome::Accepted(_)));

        let summary = handle.await.unwrap();
        assert_eq!(
            summary,
            BroadcastSummary {
                notified: 1,
                failed: 0,
                skipped: 2
            }
        );
        assert_eq!(notifier.pushed_riders("order-1").await, vec!["R1"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_stops_remaining_pushes() {
        let notifier = Arc::new(LoggingNotifier::new());
        let session = session(Duration::from_secs(15));

        let summary = broadcaster(notifier.clone(), Duration::from_secs(10))
            .notify(session.cancel_signal(), "order-1", &riders(), &packet())
            .await;

        assert_eq!(
            summary,
            BroadcastSummary {
                notified: 2,
                failed: 0,
                skipped: 1
            }
        );
    }
}
