pub mod capabilities;
pub mod database;
pub mod in_memory_queue;
pub mod message_queue;
pub mod message_queue_factory;
pub mod observability;

pub use capabilities::*;
pub use database::*;
pub use in_memory_queue::InMemoryMessageQueue;
pub use message_queue::RabbitMQMessageQueue;
pub use message_queue_factory::MessageQueueFactory;
pub use observability::*;
