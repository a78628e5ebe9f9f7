//! # Dispatch API
//!
//! 骑手客户端使用的HTTP接口。
//!
//! ## API 端点
//!
//! - `POST /api/deliveries/{order_id}/accept` - 骑手接单，成功时返回取餐信息
//! - `GET /api/deliveries/{order_id}` - 查询配送记录和派单状态
//! - `POST /api/deliveries/{order_id}/status` - 接单骑手上报取餐或送达
//! - `GET /api/delivery-fee` - 按商家和顾客坐标计算配送费
//! - `GET /health` - 健康检查，包含当前活跃的派单会话数
//!
//! ## 错误响应
//!
//! ```json
//! {
//!   "error": {
//!     "message": "订单 o-1 已被其他骑手接单",
//!     "type": "ALREADY_CLAIMED",
//!     "code": 409,
//!     "suggestions": ["该订单已由其他骑手接单，请等待新的派单邀请"],
//!     "timestamp": "2024-01-01T00:00:00Z"
//!   }
//! }
//! ```

pub mod error;
pub mod handlers;
pub mod middleware;
pub mod response;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use dispatch_core::ApiConfig;
use dispatch_dispatcher::DeliveryService;
use tower::ServiceBuilder;

use middleware::{cors_layer, request_logging, trace_layer};
use routes::{create_routes, AppState};

/// 创建完整的API应用
pub fn create_app(service: Arc<DeliveryService>, api_config: &ApiConfig) -> Router {
    let state = AppState { service };

    let router = create_routes(state).layer(
        ServiceBuilder::new()
            .layer(trace_layer())
            .layer(axum::middleware::from_fn(request_logging)),
    );

    if api_config.cors_enabled {
        router.layer(cors_layer(&api_config.cors_origins))
    } else {
        router
    }
}
