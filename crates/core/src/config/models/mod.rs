pub mod api_observability;
pub mod app_config;
pub mod database;
pub mod dispatch;
pub mod message_queue;

// Re-export main types for easier imports
pub use api_observability::{ApiConfig, ObservabilityConfig};
pub use app_config::AppConfig;
pub use database::{DatabaseConfig, StoreBackend};
pub use dispatch::DispatchConfig;
pub use message_queue::{MessageQueueConfig, MessageQueueType};
