use async_trait::async_trait;
use dispatch_core::DispatchResult;

use crate::events::Message;

/// Interface for message queue operations
#[async_trait]
pub trait MessageQueue: Send + Sync {
    async fn publish_message(&self, queue: &str, message: &Message) -> DispatchResult<()>;
    async fn consume_messages(&self, queue: &str) -> DispatchResult<Vec<Message>>;
    async fn create_queue(&self, queue: &str, durable: bool) -> DispatchResult<()>;
    async fn get_queue_size(&self, queue: &str) -> DispatchResult<u32>;
}
