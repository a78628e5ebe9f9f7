//! 派单相关的消息
//!
//! 所有事件都包装在同一个 `Message` 信封中，通过 `MessageType` 标签区分。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entities::{ExpiryReason, OrderId, PlaceOrder, RiderId};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub message_type: MessageType,
    pub payload: serde_json::Value,
    pub timestamp: DateTime<Utc>,
    pub retry_count: i32,
    pub correlation_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum MessageType {
    OrderPlaced(PlaceOrder),
    RiderAssigned(RiderAssignedMessage),
    DispatchExpired(DispatchExpiredMessage),
    DispatchFailed(DispatchFailedMessage),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiderAssignedMessage {
    pub order_id: OrderId,
    pub rider_id: RiderId,
    pub accepted_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DispatchExpiredMessage {
    pub order_id: OrderId,
    pub reason: ExpiryReason,
    pub expired_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DispatchFailedMessage {
    pub order_id: OrderId,
    pub error_message: String,
    pub retry_count: i32,
    pub failed_at: DateTime<Utc>,
}

impl Message {
    pub fn try_new(message_type: MessageType) -> Result<Self, serde_json::Error> {
        let payload = match &message_type {
            MessageType::OrderPlaced(msg) => serde_json::to_value(msg)?,
            MessageType::RiderAssigned(msg) => serde_json::to_value(msg)?,
            MessageType::DispatchExpired(msg) => serde_json::to_value(msg)?,
            MessageType::DispatchFailed(msg) => serde_json::to_value(msg)?,
        };
        Ok(Self {
            id: Uuid::new_v4().to_string(),
            message_type,
            payload,
            timestamp: Utc::now(),
            retry_count: 0,
            correlation_id: None,
        })
    }

    pub fn order_placed(order: PlaceOrder) -> Result<Self, serde_json::Error> {
        let order_id = order.order_id.clone();
        Ok(Self::try_new(MessageType::OrderPlaced(order))?.with_correlation_id(order_id))
    }

    pub fn rider_assigned(message: RiderAssignedMessage) -> Result<Self, serde_json::Error> {
        let order_id = message.order_id.clone();
        Ok(Self::try_new(MessageType::RiderAssigned(message))?.with_correlation_id(order_id))
    }

    pub fn dispatch_expired(message: DispatchExpiredMessage) -> Result<Self, serde_json::Error> {
        let order_id = message.order_id.clone();
        Ok(Self::try_new(MessageType::DispatchExpired(message))?.with_correlation_id(order_id))
    }

    pub fn dispatch_failed(message: DispatchFailedMessage) -> Result<Self, serde_json::Error> {
        let order_id = message.order_id.clone();
        Ok(Self::try_new(MessageType::DispatchFailed(message))?.with_correlation_id(order_id))
    }

    pub fn increment_retry(&mut self) {
        self.retry_count += 1;
    }

    pub fn with_correlation_id(mut self, correlation_id: String) -> Self {
        self.correlation_id = Some(correlation_id);
        self
    }

    pub fn is_retry_exhausted(&self, max_retries: i32) -> bool {
        self.retry_count >= max_retries
    }

    pub fn serialize_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    pub fn deserialize_bytes(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }

    pub fn message_type_str(&self) -> &'static str {
        match &self.message_type {
            MessageType::OrderPlaced(_) => "order_placed",
            MessageType::RiderAssigned(_) => "rider_assigned",
            MessageType::DispatchExpired(_) => "dispatch_expired",
            MessageType::DispatchFailed(_) => "dispatch_failed",
        }
    }

    /// 订单事件所属的订单ID
    pub fn order_id(&self) -> &str {
        match &self.message_type {
            MessageType::OrderPlaced(msg) => &msg.order_id,
            MessageType::RiderAssigned(msg) => &msg.order_id,
            MessageType::DispatchExpired(msg) => &msg.order_id,
            MessageType::DispatchFailed(msg) => &msg.order_id,
        }
    }
}
