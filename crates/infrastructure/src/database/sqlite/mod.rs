pub mod sqlite_delivery_store;

pub use sqlite_delivery_store::SqliteDeliveryStore;

use std::str::FromStr;
use std::time::Duration;

use dispatch_core::{config::models::DatabaseConfig, DispatchResult};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use tracing::debug;

pub struct DatabaseManager {
    pool: SqlitePool,
}

impl DatabaseManager {
    pub async fn new(config: &DatabaseConfig) -> DispatchResult<Self> {
        let options = SqliteConnectOptions::from_str(&config.url)?.create_if_missing(true);

        // 内存数据库只存在于单个连接中，连接不能被回收
        let in_memory = config.url.contains(":memory:");
        let mut pool_options = SqlitePoolOptions::new()
            .acquire_timeout(Duration::from_secs(config.connection_timeout_seconds));
        pool_options = if in_memory {
            pool_options
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            pool_options.max_connections(config.max_connections)
        };

        let pool = pool_options.connect_with(options).await?;
        debug!("SQLite连接池已创建: {}", config.url);

        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn migrate(&self) -> DispatchResult<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS deliveries (
                order_id TEXT PRIMARY KEY,
                rider_id TEXT,
                is_accepted INTEGER NOT NULL DEFAULT 0,
                status TEXT NOT NULL,
                pickup_code TEXT NOT NULL,
                pickup_latitude REAL NOT NULL,
                pickup_longitude REAL NOT NULL,
                destination_latitude REAL NOT NULL,
                destination_longitude REAL NOT NULL,
                created_at TEXT NOT NULL,
                accepted_at TEXT,
                picked_up_at TEXT,
                delivered_at TEXT
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn health_check(&self) -> DispatchResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}
