use async_trait::async_trait;
use dispatch_core::{config::models::MessageQueueConfig, DispatchError, DispatchResult};
use dispatch_domain::{Message, MessageQueue};
use lapin::{
    options::*, types::FieldTable, BasicProperties, Channel, Connection, ConnectionProperties,
    ExchangeKind, Queue,
};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

const JSON_CONTENT_TYPE: &str = "application/json";

/// RabbitMQ消息队列实现
///
/// 所有队列绑定到同一个 direct 交换机，路由键即队列名。
pub struct RabbitMQMessageQueue {
    connection: Connection,
    channel: Arc<Mutex<Channel>>,
    config: MessageQueueConfig,
}

impl RabbitMQMessageQueue {
    /// 创建新的RabbitMQ消息队列实例
    pub async fn new(config: MessageQueueConfig) -> DispatchResult<Self> {
        let connect = Connection::connect(&config.url, ConnectionProperties::default());
        let connection = tokio::time::timeout(config.connection_timeout(), connect)
            .await
            .map_err(|_| {
                DispatchError::MessageQueue(format!(
                    "连接RabbitMQ超时: {}秒",
                    config.connection_timeout_seconds
                ))
            })?
            .map_err(|e| DispatchError::MessageQueue(format!("连接RabbitMQ失败: {e}")))?;

        let channel = connection
            .create_channel()
            .await
            .map_err(|e| DispatchError::MessageQueue(format!("创建通道失败: {e}")))?;

        info!("成功连接到RabbitMQ: {}", config.url);

        let queue = Self {
            connection,
            channel: Arc::new(Mutex::new(channel)),
            config,
        };

        queue.declare_exchange().await?;

        Ok(queue)
    }

    async fn declare_exchange(&self) -> DispatchResult<()> {
        let channel = self.channel.lock().await;
        channel
            .exchange_declare(
                &self.config.exchange,
                ExchangeKind::Direct,
                ExchangeDeclareOptions {
                    durable: true,
                    ..Default::default()
                },
                FieldTable::default(),
            )
            .await
            .map_err(|e| {
                DispatchError::MessageQueue(format!(
                    "声明交换机 {} 失败: {e}",
                    self.config.exchange
                ))
            })?;

        debug!("交换机 {} 声明成功", self.config.exchange);
        Ok(())
    }

    /// 声明队列并绑定到交换机
    async fn declare_queue(
        &self,
        channel: &Channel,
        queue_name: &str,
        durable: bool,
    ) -> DispatchResult<Queue> {
        let queue = channel
            .queue_declare(
                queue_name,
                QueueDeclareOptions {
                    durable,
                    exclusive: false,
                    auto_delete: false,
                    ..Default::default()
                },
                FieldTable::default(),
            )
            .await
            .map_err(|e| DispatchError::MessageQueue(format!("声明队列 {queue_name} 失败: {e}")))?;

        channel
            .queue_bind(
                queue_name,
                &self.config.exchange,
                queue_name,
                QueueBindOptions::default(),
                FieldTable::default(),
            )
            .await
            .map_err(|e| DispatchError::MessageQueue(format!("绑定队列 {queue_name} 失败: {e}")))?;

        debug!("队列 {} 声明成功", queue_name);
        Ok(queue)
    }

    /// 获取连接状态
    pub fn is_connected(&self) -> bool {
        self.connection.status().connected()
    }

    /// 关闭连接
    pub async fn close(&self) -> DispatchResult<()> {
        self.connection
            .close(200, "正常关闭")
            .await
            .map_err(|e| DispatchError::MessageQueue(format!("关闭连接失败: {e}")))?;

        info!("RabbitMQ连接已关闭");
        Ok(())
    }
}

fn is_not_found(error: &lapin::Error) -> bool {
    let error_msg = error.to_string();
    error_msg.contains("NOT_FOUND") || error_msg.contains("404")
}

#[async_trait]
impl MessageQueue for RabbitMQMessageQueue {
    async fn publish_message(&self, queue: &str, message: &Message) -> DispatchResult<()> {
        let payload = message.serialize_bytes()?;
        let channel = self.channel.lock().await;

        let confirm = channel
            .basic_publish(
                &self.config.exchange,
                queue,
                BasicPublishOptions::default(),
                &payload,
                BasicProperties::default()
                    .with_delivery_mode(2) // 2 = persistent
                    .with_content_type(JSON_CONTENT_TYPE.into())
                    .with_message_id(message.id.as_str().into()),
            )
            .await
            .map_err(|e| DispatchError::MessageQueue(format!("发布消息到队列 {queue} 失败: {e}")))?;

        confirm
            .await
            .map_err(|e| DispatchError::MessageQueue(format!("消息发布确认失败: {e}")))?;

        debug!("消息已发布到队列: {}", queue);
        Ok(())
    }

    async fn consume_messages(&self, queue: &str) -> DispatchResult<Vec<Message>> {
        let channel = self.channel.lock().await;

        let delivery = match channel.basic_get(queue, BasicGetOptions::default()).await {
            Ok(Some(delivery)) => delivery,
            Ok(None) => return Ok(vec![]),
            Err(e) if is_not_found(&e) => {
                debug!("队列 {} 不存在，返回空结果", queue);
                return Ok(vec![]);
            }
            Err(e) => {
                return Err(DispatchError::MessageQueue(format!(
                    "从队列 {queue} 获取消息失败: {e}"
                )))
            }
        };

        channel
            .basic_ack(delivery.delivery_tag, BasicAckOptions::default())
            .await
            .map_err(|e| DispatchError::MessageQueue(format!("确认消息失败: {e}")))?;

        let content_type = delivery
            .properties
            .content_type()
            .as_ref()
            .map(|ct| ct.as_str().to_string());
        if let Some(content_type) = content_type.filter(|ct| ct != JSON_CONTENT_TYPE) {
            warn!("队列 {} 收到非JSON消息({})，已丢弃", queue, content_type);
            return Ok(vec![]);
        }

        match Message::deserialize_bytes(&delivery.data) {
            Ok(message) => Ok(vec![message]),
            Err(e) => {
                warn!("队列 {} 的消息无法解析，已丢弃: {}", queue, e);
                Ok(vec![])
            }
        }
    }

    async fn create_queue(&self, queue: &str, durable: bool) -> DispatchResult<()> {
        let channel = self.channel.lock().await;
        self.declare_queue(&channel, queue, durable).await?;
        Ok(())
    }

    async fn get_queue_size(&self, queue: &str) -> DispatchResult<u32> {
        let channel = self.channel.lock().await;
        let queue_info = channel
            .queue_declare(
                queue,
                QueueDeclareOptions {
                    passive: true,
                    ..Default::default()
                },
                FieldTable::default(),
            )
            .await;

        match queue_info {
            Ok(info) => Ok(info.message_count()),
            Err(e) if is_not_found(&e) => {
                debug!("队列 {} 不存在，返回大小为0", queue);
                Ok(0)
            }
            Err(e) => Err(DispatchError::MessageQueue(format!(
                "获取队列 {queue} 信息失败: {e}"
            ))),
        }
    }
}
