use std::sync::Arc;

use dispatch_core::{config::models::{MessageQueueConfig, MessageQueueType}, DispatchResult};
use dispatch_domain::MessageQueue;
use tracing::{debug, info};

use crate::{InMemoryMessageQueue, RabbitMQMessageQueue};

pub struct MessageQueueFactory;

impl MessageQueueFactory {
    pub async fn create(config: &MessageQueueConfig) -> DispatchResult<Arc<dyn MessageQueue>> {
        debug!("Creating message queue with type: {:?}", config.r#type);

        let queue: Arc<dyn MessageQueue> = match config.r#type {
            MessageQueueType::Rabbitmq => {
                info!("Initializing RabbitMQ message queue");
                Arc::new(RabbitMQMessageQueue::new(config.clone()).await?)
            }
            MessageQueueType::InMemory => {
                info!("Initializing in-memory message queue");
                Arc::new(InMemoryMessageQueue::new())
            }
        };

        for name in config.all_queues() {
            queue.create_queue(name, true).await?;
        }

        Ok(queue)
    }
}
