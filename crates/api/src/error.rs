use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use dispatch_core::DispatchError;
use serde_json::json;
use tracing::error;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("派单错误: {0}")]
    Dispatch(#[from] DispatchError),

    #[error("请求参数错误: {0}")]
    BadRequest(String),
}

pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::Dispatch(e) => match e {
                DispatchError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
                DispatchError::SessionNotFound { .. } | DispatchError::DeliveryNotFound { .. } => {
                    StatusCode::NOT_FOUND
                }
                DispatchError::AlreadyClaimed { .. } | DispatchError::DuplicateSession { .. } => {
                    StatusCode::CONFLICT
                }
                DispatchError::Expired { .. } | DispatchError::NoCandidates { .. } => {
                    StatusCode::GONE
                }
                DispatchError::RiderNotEligible { .. } | DispatchError::PermissionDenied(_) => {
                    StatusCode::FORBIDDEN
                }
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }

    fn error_type(&self) -> &'static str {
        match self {
            ApiError::Dispatch(e) => e.kind(),
            ApiError::BadRequest(_) => "BAD_REQUEST",
        }
    }

    fn suggestions(&self) -> Vec<&'static str> {
        match self {
            ApiError::Dispatch(DispatchError::SessionNotFound { .. }) => vec![
                "请检查订单ID是否正确",
                "只有正在派单中的订单可以接单",
            ],
            ApiError::Dispatch(DispatchError::DeliveryNotFound { .. }) => {
                vec!["请检查订单ID是否正确"]
            }
            ApiError::Dispatch(DispatchError::AlreadyClaimed { .. }) => {
                vec!["该订单已由其他骑手接单，请等待新的派单邀请"]
            }
            ApiError::Dispatch(DispatchError::Expired { .. }) => {
                vec!["该订单的接单时间已过"]
            }
            ApiError::Dispatch(DispatchError::NoCandidates { .. }) => {
                vec!["该订单没有可接单的骑手"]
            }
            ApiError::Dispatch(DispatchError::RiderNotEligible { .. }) => {
                vec!["只有收到该订单邀请的骑手可以接单"]
            }
            ApiError::Dispatch(DispatchError::PermissionDenied(_)) => {
                vec!["只有接单骑手可以上报配送状态"]
            }
            ApiError::Dispatch(DispatchError::InvalidArgument(_)) | ApiError::BadRequest(_) => {
                vec!["请检查请求参数是否符合要求"]
            }
            _ => vec!["请稍后重试", "如果问题持续存在，请联系系统管理员"],
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("请求处理失败: {}", self);
        }

        let message = match &self {
            ApiError::Dispatch(e) => e.to_string(),
            ApiError::BadRequest(msg) => msg.clone(),
        };

        let body = Json(json!({
            "error": {
                "message": message,
                "type": self.error_type(),
                "code": status.as_u16(),
                "suggestions": self.suggestions(),
                "timestamp": chrono::Utc::now().to_rfc3339(),
            }
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status_of(error: DispatchError) -> StatusCode {
        ApiError::from(error).into_response().status()
    }

    #[test]
    fn test_claim_outcomes_map_to_distinct_statuses() {
        let order_id = "o-1".to_string();
        assert_eq!(
            status_of(DispatchError::AlreadyClaimed {
                order_id: order_id.clone()
            }),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_of(DispatchError::Expired {
                order_id: order_id.clone()
            }),
            StatusCode::GONE
        );
        assert_eq!(
            status_of(DispatchError::RiderNotEligible {
                order_id: order_id.clone(),
                rider_id: "R9".to_string(),
            }),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            status_of(DispatchError::SessionNotFound { order_id }),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn test_invalid_argument_is_bad_request() {
        assert_eq!(
            status_of(DispatchError::InvalidArgument("骑手ID不能为空".to_string())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::BadRequest("bad".to_string()).into_response().status(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_infrastructure_failures_are_internal() {
        assert_eq!(
            status_of(DispatchError::PersistenceFailed("disk full".to_string())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            status_of(DispatchError::MessageQueue("channel closed".to_string())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_error_type_uses_dispatch_kind() {
        let error = ApiError::from(DispatchError::NoCandidates {
            order_id: "o-2".to_string(),
        });
        assert_eq!(error.error_type(), "NO_CANDIDATES");
        assert_eq!(error.status(), StatusCode::GONE);
    }
}
