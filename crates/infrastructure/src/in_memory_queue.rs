use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use dispatch_core::DispatchResult;
use dispatch_domain::{Message, MessageQueue};
use tokio::sync::{mpsc, Mutex, RwLock};
use tracing::{debug, info};

/// 内存消息队列实现
///
/// 使用 Tokio channels 实现的进程内队列，适用于嵌入式部署和测试场景。
#[derive(Debug, Default)]
pub struct InMemoryMessageQueue {
    /// 队列名 -> 通道
    queues: RwLock<HashMap<String, Arc<QueueChannels>>>,
}

#[derive(Debug)]
struct QueueChannels {
    sender: mpsc::UnboundedSender<Message>,
    receiver: Mutex<mpsc::UnboundedReceiver<Message>>,
    size: AtomicU32,
    durable: bool,
}

impl InMemoryMessageQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// 获取或创建队列通道
    async fn get_or_create_queue(&self, queue_name: &str, durable: bool) -> Arc<QueueChannels> {
        if let Some(channels) = self.queues.read().await.get(queue_name) {
            return channels.clone();
        }

        let mut queues = self.queues.write().await;
        queues
            .entry(queue_name.to_string())
            .or_insert_with(|| {
                let (sender, receiver) = mpsc::unbounded_channel();
                info!("Created queue '{}' (durable: {})", queue_name, durable);
                Arc::new(QueueChannels {
                    sender,
                    receiver: Mutex::new(receiver),
                    size: AtomicU32::new(0),
                    durable,
                })
            })
            .clone()
    }

    /// 当前所有队列的名称和持久化标记
    pub async fn queue_names(&self) -> Vec<(String, bool)> {
        self.queues
            .read()
            .await
            .iter()
            .map(|(name, channels)| (name.clone(), channels.durable))
            .collect()
    }
}

#[async_trait]
impl MessageQueue for InMemoryMessageQueue {
    async fn publish_message(&self, queue: &str, message: &Message) -> DispatchResult<()> {
        let channels = self.get_or_create_queue(queue, false).await;

        // 接收端与发送端同生命周期，发送不会失败
        if channels.sender.send(message.clone()).is_ok() {
            channels.size.fetch_add(1, Ordering::Relaxed);
        }

        debug!("Published message {} to queue '{}'", message.id, queue);
        Ok(())
    }

    async fn consume_messages(&self, queue: &str) -> DispatchResult<Vec<Message>> {
        let channels = self.get_or_create_queue(queue, false).await;
        let mut messages = Vec::new();

        {
            let mut rx = channels.receiver.lock().await;
            while let Ok(message) = rx.try_recv() {
                messages.push(message);
            }
        }

        if !messages.is_empty() {
            channels
                .size
                .fetch_sub(messages.len() as u32, Ordering::Relaxed);
            debug!("Consumed {} messages from queue '{}'", messages.len(), queue);
        }

        Ok(messages)
    }

    async fn create_queue(&self, queue: &str, durable: bool) -> DispatchResult<()> {
        self.get_or_create_queue(queue, durable).await;
        Ok(())
    }

    async fn get_queue_size(&self, queue: &str) -> DispatchResult<u32> {
        Ok(self
            .queues
            .read()
            .await
            .get(queue)
            .map(|channels| channels.size.load(Ordering::Relaxed))
            .unwrap_or(0))
    }
}
