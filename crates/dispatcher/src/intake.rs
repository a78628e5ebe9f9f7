use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use dispatch_core::{
    config::models::{DispatchConfig, MessageQueueConfig},
    DispatchError, DispatchResult,
};
use dispatch_domain::{DispatchFailedMessage, Message, MessageQueue, MessageType, PlaceOrder};
use dispatch_infrastructure::DispatchMetrics;
use tokio::sync::{RwLock, Semaphore};
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::engine::DispatchEngine;

const MAINTENANCE_INTERVAL: Duration = Duration::from_secs(60);

/// 订单事件消费设置
#[derive(Debug, Clone)]
struct IntakeSettings {
    order_queue: String,
    failed_queue: String,
    max_retries: i32,
}

/// 订单事件消费者
///
/// 轮询已下单事件队列，每个订单在独立任务中派单，并发数受信号量限制。
pub struct OrderIntake {
    engine: Arc<DispatchEngine>,
    message_queue: Arc<dyn MessageQueue>,
    metrics: Arc<DispatchMetrics>,
    settings: Arc<IntakeSettings>,
    poll_interval: Duration,
    limiter: Arc<Semaphore>,
    max_concurrency: usize,
    running: Arc<RwLock<bool>>,
}

impl OrderIntake {
    pub fn new(
        engine: Arc<DispatchEngine>,
        message_queue: Arc<dyn MessageQueue>,
        metrics: Arc<DispatchMetrics>,
        dispatch_config: &DispatchConfig,
        queue_config: &MessageQueueConfig,
    ) -> Self {
        Self {
            engine,
            message_queue,
            metrics,
            settings: Arc::new(IntakeSettings {
                order_queue: queue_config.order_placed_queue.clone(),
                failed_queue: queue_config.dispatch_failed_queue.clone(),
                max_retries: queue_config.max_retries,
            }),
            poll_interval: dispatch_config.intake_poll_interval(),
            limiter: Arc::new(Semaphore::new(dispatch_config.max_concurrent_dispatches)),
            max_concurrency: dispatch_config.max_concurrent_dispatches,
            running: Arc::new(RwLock::new(false)),
        }
    }

    pub async fn stop(&self) -> DispatchResult<()> {
        let mut running = self.running.write().await;
        *running = false;
        info!("订单事件监听停止信号已发送");
        Ok(())
    }

    pub async fn is_running(&self) -> bool {
        *self.running.read().await
    }

    /// 正在进行的派单数
    pub fn in_flight(&self) -> usize {
        self.max_concurrency - self.limiter.available_permits()
    }

    /// 持续消费订单事件直到收到停止信号
    pub async fn listen_for_orders(&self) -> DispatchResult<()> {
        {
            let mut running = self.running.write().await;
            *running = true;
        }
        let queue_name = self.settings.order_queue.clone();
        info!("开始监听队列: {}", queue_name);

        let mut last_maintenance = Instant::now();
        loop {
            if !self.is_running().await {
                info!("收到停止信号，退出队列 {} 的监听", queue_name);
                break;
            }

            if last_maintenance.elapsed() >= MAINTENANCE_INTERVAL {
                self.engine.registry().prune_retired();
                if let Err(e) = self.refresh_backlog().await {
                    warn!("获取队列 {} 积压数量失败: {}", queue_name, e);
                }
                last_maintenance = Instant::now();
            }

            match self.message_queue.consume_messages(&queue_name).await {
                Ok(messages) => {
                    if messages.is_empty() {
                        tokio::time::sleep(self.poll_interval).await;
                    } else {
                        for message in messages {
                            self.handle_message(message).await;
                        }
                    }
                }
                Err(e) => {
                    error!("从队列 {} 消费消息时出错: {}", queue_name, e);
                    tokio::time::sleep(Duration::from_secs(1)).await;
                }
            }
        }

        Ok(())
    }

    /// 读取订单事件队列的积压数量并更新指标
    pub async fn refresh_backlog(&self) -> DispatchResult<u32> {
        let size = self
            .message_queue
            .get_queue_size(&self.settings.order_queue)
            .await?;
        self.metrics.update_intake_backlog(size);
        if size > 0 {
            debug!("队列 {} 积压 {} 条订单事件", self.settings.order_queue, size);
        }
        Ok(size)
    }

    /// 为订单事件启动派单任务，并发已满时在此等待
    pub async fn handle_message(&self, message: Message) {
        let order = match &message.message_type {
            MessageType::OrderPlaced(order) => order.clone(),
            _ => {
                debug!("忽略不支持的消息类型: {}", message.message_type_str());
                self.metrics.record_intake_dropped();
                return;
            }
        };

        let permit = match self.limiter.clone().acquire_owned().await {
            Ok(permit) => permit,
            Err(e) => {
                error!("派单并发限制器已关闭: {}", e);
                return;
            }
        };

        let engine = self.engine.clone();
        let message_queue = self.message_queue.clone();
        let metrics = self.metrics.clone();
        let settings = self.settings.clone();
        tokio::spawn(async move {
            let _permit = permit;
            Self::dispatch_order(engine, message_queue, metrics, settings, message, order).await;
        });
    }

    async fn dispatch_order(
        engine: Arc<DispatchEngine>,
        message_queue: Arc<dyn MessageQueue>,
        metrics: Arc<DispatchMetrics>,
        settings: Arc<IntakeSettings>,
        mut message: Message,
        order: PlaceOrder,
    ) {
        let order_id = order.order_id.clone();
        let error = match engine.dispatch(order).await {
            Ok(report) => {
                debug!(order_id = %order_id, outcome = ?report.outcome, "订单派单完成");
                return;
            }
            Err(e) => e,
        };

        match error {
            DispatchError::DuplicateSession { .. } => {
                info!(order_id = %order_id, "重复的订单事件，已忽略");
                metrics.record_intake_dropped();
            }
            e if e.is_retryable() && !message.is_retry_exhausted(settings.max_retries) => {
                message.increment_retry();
                warn!(
                    order_id = %order_id,
                    retry_count = message.retry_count,
                    "派单失败，订单事件重新入队: {}",
                    e
                );
                metrics.record_intake_retry();
                if let Err(publish_err) = message_queue
                    .publish_message(&settings.order_queue, &message)
                    .await
                {
                    error!(order_id = %order_id, "订单事件重新入队失败: {}", publish_err);
                }
            }
            e => {
                error!(
                    order_id = %order_id,
                    retry_count = message.retry_count,
                    "派单失败，不再重试: {}",
                    e
                );
                let failed = Message::dispatch_failed(DispatchFailedMessage {
                    order_id: order_id.clone(),
                    error_message: e.to_string(),
                    retry_count: message.retry_count,
                    failed_at: Utc::now(),
                });
                let result = match failed {
                    Ok(failed) => {
                        message_queue
                            .publish_message(&settings.failed_queue, &failed)
                            .await
                    }
                    Err(e) => Err(e.into()),
                };
                if let Err(publish_err) = result {
                    error!(order_id = %order_id, "发布派单失败事件出错: {}", publish_err);
                }
            }
        }
    }
}
