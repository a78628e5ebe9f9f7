use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use dispatch_core::{DispatchError, DispatchResult};
use serde::{Deserialize, Serialize};

pub type OrderId = String;
pub type RiderId = String;

/// 经纬度坐标
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub latitude: f64,
    pub longitude: f64,
}

impl Point {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

/// 商家或顾客的地址
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Address {
    pub address_name: String,
    pub sub_district: String,
    pub district: String,
    pub province: String,
    pub postal_code: String,
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<&str> = [
            self.address_name.as_str(),
            self.sub_district.as_str(),
            self.district.as_str(),
            self.province.as_str(),
            self.postal_code.as_str(),
        ]
        .into_iter()
        .filter(|part| !part.is_empty())
        .collect();
        write!(f, "{}", parts.join(", "))
    }
}

/// 已下单事件中与派单相关的部分，支付和菜单信息会被忽略
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaceOrder {
    pub order_id: OrderId,
    #[serde(default)]
    pub merchant_id: String,
    pub merchant_address: Address,
    pub customer_address: Address,
}

/// 交给中标骑手的取餐信息
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PickupPacket {
    pub pickup_code: String,
    pub pickup_location: Point,
    pub destination: Point,
}

/// 派单会话结束但无人接单的原因
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpiryReason {
    /// 截止时间已到
    Deadline,
    /// 没有任何候选骑手
    NoCandidates,
}

impl ExpiryReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExpiryReason::Deadline => "deadline",
            ExpiryReason::NoCandidates => "no_candidates",
        }
    }
}

impl fmt::Display for ExpiryReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 派单会话状态
///
/// `Claimed` 携带中标骑手，因此"已接单"与"存在接单骑手"始终一致。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SessionStatus {
    Open,
    Claimed { rider_id: RiderId },
    Expired { reason: ExpiryReason },
}

impl SessionStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, SessionStatus::Open)
    }

    pub fn claimed_by(&self) -> Option<&str> {
        match self {
            SessionStatus::Claimed { rider_id } => Some(rider_id),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Open => "open",
            SessionStatus::Claimed { .. } => "claimed",
            SessionStatus::Expired { .. } => "expired",
        }
    }
}

/// 一次骑手接单请求，不会单独持久化
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiderClaim {
    pub order_id: OrderId,
    pub rider_id: RiderId,
    pub arrived_at: DateTime<Utc>,
}

impl RiderClaim {
    pub fn new(order_id: impl Into<OrderId>, rider_id: impl Into<RiderId>) -> Self {
        Self {
            order_id: order_id.into(),
            rider_id: rider_id.into(),
            arrived_at: Utc::now(),
        }
    }
}

/// 仲裁结果
#[derive(Debug, Clone, PartialEq)]
pub enum ClaimOutcome {
    Accepted(PickupPacket),
    AlreadyClaimed,
    Expired(ExpiryReason),
    RiderNotEligible,
}

impl ClaimOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClaimOutcome::Accepted(_) => "accepted",
            ClaimOutcome::AlreadyClaimed => "already_claimed",
            ClaimOutcome::Expired(_) => "expired",
            ClaimOutcome::RiderNotEligible => "rider_not_eligible",
        }
    }

    /// 转换为面向调用方的结果，非中标结果映射为对应的错误
    pub fn into_packet(self, claim: &RiderClaim) -> DispatchResult<PickupPacket> {
        match self {
            ClaimOutcome::Accepted(packet) => Ok(packet),
            ClaimOutcome::AlreadyClaimed => Err(DispatchError::AlreadyClaimed {
                order_id: claim.order_id.clone(),
            }),
            ClaimOutcome::Expired(ExpiryReason::NoCandidates) => {
                Err(DispatchError::NoCandidates {
                    order_id: claim.order_id.clone(),
                })
            }
            ClaimOutcome::Expired(_) => Err(DispatchError::Expired {
                order_id: claim.order_id.clone(),
            }),
            ClaimOutcome::RiderNotEligible => Err(DispatchError::RiderNotEligible {
                order_id: claim.order_id.clone(),
                rider_id: claim.rider_id.clone(),
            }),
        }
    }
}

/// 配送状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStatus {
    Unaccepted,
    Accepted,
    PickedUp,
    Delivered,
}

impl DeliveryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryStatus::Unaccepted => "unaccepted",
            DeliveryStatus::Accepted => "accepted",
            DeliveryStatus::PickedUp => "picked_up",
            DeliveryStatus::Delivered => "delivered",
        }
    }

    /// 状态只能逐步向前推进
    pub fn can_transition_to(&self, next: DeliveryStatus) -> bool {
        matches!(
            (self, next),
            (DeliveryStatus::Unaccepted, DeliveryStatus::Accepted)
                | (DeliveryStatus::Accepted, DeliveryStatus::PickedUp)
                | (DeliveryStatus::PickedUp, DeliveryStatus::Delivered)
        )
    }
}

impl FromStr for DeliveryStatus {
    type Err = DispatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "unaccepted" => Ok(DeliveryStatus::Unaccepted),
            "accepted" => Ok(DeliveryStatus::Accepted),
            "picked_up" => Ok(DeliveryStatus::PickedUp),
            "delivered" => Ok(DeliveryStatus::Delivered),
            other => Err(DispatchError::InvalidArgument(format!(
                "未知的配送状态: {other}"
            ))),
        }
    }
}

impl fmt::Display for DeliveryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 配送记录
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliveryRecord {
    pub order_id: OrderId,
    pub rider_id: Option<RiderId>,
    pub is_accepted: bool,
    pub status: DeliveryStatus,
    pub pickup: PickupPacket,
    pub created_at: DateTime<Utc>,
    pub accepted_at: Option<DateTime<Utc>>,
    pub picked_up_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
}

impl DeliveryRecord {
    pub fn new_unaccepted(order_id: impl Into<OrderId>, pickup: PickupPacket) -> Self {
        Self {
            order_id: order_id.into(),
            rider_id: None,
            is_accepted: false,
            status: DeliveryStatus::Unaccepted,
            pickup,
            created_at: Utc::now(),
            accepted_at: None,
            picked_up_at: None,
            delivered_at: None,
        }
    }

    /// 记录中标骑手，每条记录只能接单一次
    pub fn accept(&mut self, rider_id: &str, accepted_at: DateTime<Utc>) -> DispatchResult<()> {
        if self.is_accepted {
            return Err(DispatchError::InvalidArgument(format!(
                "订单 {} 已由骑手 {} 接单",
                self.order_id,
                self.rider_id.as_deref().unwrap_or_default()
            )));
        }
        self.rider_id = Some(rider_id.to_string());
        self.is_accepted = true;
        self.status = DeliveryStatus::Accepted;
        self.accepted_at = Some(accepted_at);
        Ok(())
    }

    /// 推进取餐/送达状态
    pub fn advance(&mut self, next: DeliveryStatus, at: DateTime<Utc>) -> DispatchResult<()> {
        if next == DeliveryStatus::Accepted {
            return Err(DispatchError::InvalidArgument(
                "接单状态只能通过接单流程设置".to_string(),
            ));
        }
        if !self.status.can_transition_to(next) {
            return Err(DispatchError::InvalidArgument(format!(
                "配送状态不能从 {} 变更为 {}",
                self.status, next
            )));
        }
        match next {
            DeliveryStatus::PickedUp => self.picked_up_at = Some(at),
            DeliveryStatus::Delivered => self.delivered_at = Some(at),
            DeliveryStatus::Unaccepted | DeliveryStatus::Accepted => {}
        }
        self.status = next;
        Ok(())
    }

    pub fn is_assigned_to(&self, rider_id: &str) -> bool {
        self.rider_id.as_deref() == Some(rider_id)
    }
}
