pub mod config;
pub mod errors;
pub mod logging;

pub use config::models::{
    ApiConfig, AppConfig, DatabaseConfig, DispatchConfig, MessageQueueConfig, MessageQueueType,
    ObservabilityConfig, StoreBackend,
};
pub use errors::*;
pub use logging::{init_logging, LogFormat};

/// 统一的Result类型
pub type DispatchResult<T> = std::result::Result<T, DispatchError>;
