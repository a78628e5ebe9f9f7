use thiserror::Error;

/// 派单引擎错误类型定义
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("数据库错误: {0}")]
    Database(#[from] sqlx::Error),

    #[error("无效的参数: {0}")]
    InvalidArgument(String),

    #[error("派单会话未找到: {order_id}")]
    SessionNotFound { order_id: String },

    #[error("配送记录未找到: {order_id}")]
    DeliveryNotFound { order_id: String },

    #[error("订单 {order_id} 已存在派单会话")]
    DuplicateSession { order_id: String },

    #[error("骑手 {rider_id} 不在订单 {order_id} 的候选名单中")]
    RiderNotEligible { order_id: String, rider_id: String },

    #[error("订单 {order_id} 已被其他骑手接单")]
    AlreadyClaimed { order_id: String },

    #[error("订单 {order_id} 的派单已过期")]
    Expired { order_id: String },

    #[error("订单 {order_id} 没有可用的候选骑手")]
    NoCandidates { order_id: String },

    #[error("地址解析失败: {address} - {message}")]
    AddressResolutionFailed { address: String, message: String },

    #[error("派单会话 {order_id} 仍处于开放状态")]
    SessionStillOpen { order_id: String },

    #[error("持久化失败: {0}")]
    PersistenceFailed(String),

    #[error("权限不足: {0}")]
    PermissionDenied(String),

    #[error("通知发送失败: {0}")]
    Notification(String),

    #[error("消息队列错误: {0}")]
    MessageQueue(String),

    #[error("序列化错误: {0}")]
    Serialization(String),

    #[error("配置错误: {0}")]
    Configuration(String),

    #[error("内部错误: {0}")]
    Internal(String),
}

impl DispatchError {
    /// 是否可以由上游重新投递订单事件来重试
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            DispatchError::AddressResolutionFailed { .. }
                | DispatchError::PersistenceFailed(_)
                | DispatchError::MessageQueue(_)
                | DispatchError::Database(_)
        )
    }

    /// 稳定的错误类型标识，用于日志和API响应
    pub fn kind(&self) -> &'static str {
        match self {
            DispatchError::Database(_) => "DATABASE_ERROR",
            DispatchError::InvalidArgument(_) => "INVALID_ARGUMENT",
            DispatchError::SessionNotFound { .. } => "SESSION_NOT_FOUND",
            DispatchError::DeliveryNotFound { .. } => "DELIVERY_NOT_FOUND",
            DispatchError::DuplicateSession { .. } => "DUPLICATE_SESSION",
            DispatchError::RiderNotEligible { .. } => "RIDER_NOT_ELIGIBLE",
            DispatchError::AlreadyClaimed { .. } => "ALREADY_CLAIMED",
            DispatchError::Expired { .. } => "EXPIRED",
            DispatchError::NoCandidates { .. } => "NO_CANDIDATES",
            DispatchError::AddressResolutionFailed { .. } => "ADDRESS_RESOLUTION_FAILED",
            DispatchError::SessionStillOpen { .. } => "SESSION_STILL_OPEN",
            DispatchError::PersistenceFailed(_) => "PERSISTENCE_FAILED",
            DispatchError::PermissionDenied(_) => "PERMISSION_DENIED",
            DispatchError::Notification(_) => "NOTIFICATION_ERROR",
            DispatchError::MessageQueue(_) => "MESSAGE_QUEUE_ERROR",
            DispatchError::Serialization(_) => "SERIALIZATION_ERROR",
            DispatchError::Configuration(_) => "CONFIGURATION_ERROR",
            DispatchError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl From<serde_json::Error> for DispatchError {
    fn from(err: serde_json::Error) -> Self {
        DispatchError::Serialization(err.to_string())
    }
}
