pub mod memory;
pub mod sqlite;

pub use memory::InMemoryDeliveryStore;
pub use sqlite::{DatabaseManager, SqliteDeliveryStore};

use std::sync::Arc;

use dispatch_core::{config::models::DatabaseConfig, DispatchResult, StoreBackend};
use dispatch_domain::DeliveryRecordStore;
use tracing::info;

/// 根据配置创建配送记录存储
pub async fn create_delivery_store(
    config: &DatabaseConfig,
) -> DispatchResult<Arc<dyn DeliveryRecordStore>> {
    match config.backend {
        StoreBackend::Memory => {
            info!("使用内存配送记录存储");
            Ok(Arc::new(InMemoryDeliveryStore::new()))
        }
        StoreBackend::Sqlite => {
            let manager = DatabaseManager::new(config).await?;
            manager.migrate().await?;
            info!("使用SQLite配送记录存储: {}", config.url);
            Ok(Arc::new(SqliteDeliveryStore::new(manager.pool().clone())))
        }
    }
}
