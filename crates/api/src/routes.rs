use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use dispatch_dispatcher::DeliveryService;

use crate::handlers::{
    deliveries::{accept_order, get_delivery, get_delivery_fee, report_status},
    health::health_check,
};

/// API应用状态
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<DeliveryService>,
}

/// 创建API路由
pub fn create_routes(state: AppState) -> Router {
    Router::new()
        // 健康检查
        .route("/health", get(health_check))
        // 配送API
        .route("/api/deliveries/{order_id}", get(get_delivery))
        .route("/api/deliveries/{order_id}/accept", post(accept_order))
        .route("/api/deliveries/{order_id}/status", post(report_status))
        .route("/api/delivery-fee", get(get_delivery_fee))
        .with_state(state)
}
