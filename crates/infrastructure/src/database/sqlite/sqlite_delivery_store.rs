use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dispatch_core::{DispatchError, DispatchResult};
use dispatch_domain::{
    DeliveryRecord, DeliveryRecordStore, DeliveryStatus, PickupPacket, Point,
};
use sqlx::{Row, SqlitePool};
use tracing::debug;

const SELECT_DELIVERY: &str = r#"
    SELECT order_id, rider_id, is_accepted, status, pickup_code,
           pickup_latitude, pickup_longitude, destination_latitude, destination_longitude,
           created_at, accepted_at, picked_up_at, delivered_at
    FROM deliveries WHERE order_id = ?
"#;

pub struct SqliteDeliveryStore {
    pool: SqlitePool,
}

impl SqliteDeliveryStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn row_to_record(row: &sqlx::sqlite::SqliteRow) -> DispatchResult<DeliveryRecord> {
        let status: String = row.try_get("status")?;

        Ok(DeliveryRecord {
            order_id: row.try_get("order_id")?,
            rider_id: row.try_get("rider_id")?,
            is_accepted: row.try_get("is_accepted")?,
            status: status.parse()?,
            pickup: PickupPacket {
                pickup_code: row.try_get("pickup_code")?,
                pickup_location: Point::new(
                    row.try_get("pickup_latitude")?,
                    row.try_get("pickup_longitude")?,
                ),
                destination: Point::new(
                    row.try_get("destination_latitude")?,
                    row.try_get("destination_longitude")?,
                ),
            },
            created_at: row.try_get("created_at")?,
            accepted_at: row.try_get("accepted_at")?,
            picked_up_at: row.try_get("picked_up_at")?,
            delivered_at: row.try_get("delivered_at")?,
        })
    }

    async fn fetch(&self, order_id: &str) -> DispatchResult<Option<DeliveryRecord>> {
        let row = sqlx::query(SELECT_DELIVERY)
            .bind(order_id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(Self::row_to_record).transpose()
    }

    async fn fetch_existing(&self, order_id: &str) -> DispatchResult<DeliveryRecord> {
        self.fetch(order_id)
            .await?
            .ok_or_else(|| DispatchError::DeliveryNotFound {
                order_id: order_id.to_string(),
            })
    }
}

#[async_trait]
impl DeliveryRecordStore for SqliteDeliveryStore {
    async fn create_unaccepted(
        &self,
        order_id: &str,
        pickup: &PickupPacket,
    ) -> DispatchResult<DeliveryRecord> {
        let record = DeliveryRecord::new_unaccepted(order_id, pickup.clone());

        let result = sqlx::query(
            r#"
            INSERT INTO deliveries (
                order_id, is_accepted, status, pickup_code,
                pickup_latitude, pickup_longitude, destination_latitude, destination_longitude,
                created_at
            )
            VALUES (?, 0, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&record.order_id)
        .bind(record.status.as_str())
        .bind(&record.pickup.pickup_code)
        .bind(record.pickup.pickup_location.latitude)
        .bind(record.pickup.pickup_location.longitude)
        .bind(record.pickup.destination.latitude)
        .bind(record.pickup.destination.longitude)
        .bind(record.created_at)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => {
                debug!("创建未接单配送记录: {}", order_id);
                Ok(record)
            }
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                Err(DispatchError::DuplicateSession {
                    order_id: order_id.to_string(),
                })
            }
            Err(e) => Err(DispatchError::Database(e)),
        }
    }

    async fn mark_accepted(
        &self,
        order_id: &str,
        rider_id: &str,
        accepted_at: DateTime<Utc>,
    ) -> DispatchResult<DeliveryRecord> {
        let result = sqlx::query(
            r#"
            UPDATE deliveries
            SET rider_id = ?, is_accepted = 1, status = ?, accepted_at = ?
            WHERE order_id = ? AND is_accepted = 0
            "#,
        )
        .bind(rider_id)
        .bind(DeliveryStatus::Accepted.as_str())
        .bind(accepted_at)
        .bind(order_id)
        .execute(&self.pool)
        .await?;

        let record = self.fetch_existing(order_id).await?;
        if result.rows_affected() == 0 {
            return Err(DispatchError::InvalidArgument(format!(
                "订单 {} 已由骑手 {} 接单",
                order_id,
                record.rider_id.as_deref().unwrap_or_default()
            )));
        }

        debug!("配送记录 {} 已由骑手 {} 接单", order_id, rider_id);
        Ok(record)
    }

    async fn get(&self, order_id: &str) -> DispatchResult<Option<DeliveryRecord>> {
        self.fetch(order_id).await
    }

    async fn update_status(
        &self,
        order_id: &str,
        from: DeliveryStatus,
        to: DeliveryStatus,
        at: DateTime<Utc>,
    ) -> DispatchResult<DeliveryRecord> {
        let mut record = self.fetch_existing(order_id).await?;
        if record.status != from {
            return Err(DispatchError::InvalidArgument(format!(
                "配送记录 {} 的状态已变更为 {}",
                order_id, record.status
            )));
        }
        record.advance(to, at)?;

        let result = sqlx::query(
            r#"
            UPDATE deliveries
            SET status = ?, picked_up_at = ?, delivered_at = ?
            WHERE order_id = ? AND status = ?
            "#,
        )
        .bind(record.status.as_str())
        .bind(record.picked_up_at)
        .bind(record.delivered_at)
        .bind(order_id)
        .bind(from.as_str())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DispatchError::InvalidArgument(format!(
                "配送记录 {order_id} 的状态已被并发修改"
            )));
        }

        debug!("配送记录 {} 状态更新: {} -> {}", order_id, from, to);
        Ok(record)
    }
}
