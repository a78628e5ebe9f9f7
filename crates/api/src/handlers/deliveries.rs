use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    Json,
};
use dispatch_dispatcher::fee::haversine_distance;
use dispatch_domain::{DeliveryStatus, Point};
use serde::{Deserialize, Serialize};

use crate::{
    error::{ApiError, ApiResult},
    response::{success, success_with_message},
    routes::AppState,
};

/// 接单请求
#[derive(Debug, Deserialize)]
pub struct AcceptOrderRequest {
    /// 缺省时由服务层按空ID拒绝
    #[serde(default)]
    pub rider_id: String,
}

/// 配送状态上报请求
#[derive(Debug, Deserialize)]
pub struct ReportStatusRequest {
    #[serde(default)]
    pub rider_id: String,
    /// `picked_up` 或 `delivered`
    #[serde(default)]
    pub status: String,
}

#[derive(Debug, Deserialize)]
pub struct DeliveryFeeQuery {
    pub merchant_lat: f64,
    pub merchant_lng: f64,
    pub customer_lat: f64,
    pub customer_lng: f64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DeliveryFeeQuote {
    pub distance_km: f64,
    pub fee: i32,
}

fn point(latitude: f64, longitude: f64) -> ApiResult<Point> {
    if !(-90.0..=90.0).contains(&latitude) || !(-180.0..=180.0).contains(&longitude) {
        return Err(ApiError::BadRequest(format!(
            "坐标超出范围: ({latitude}, {longitude})"
        )));
    }
    Ok(Point::new(latitude, longitude))
}

/// 骑手接单
pub async fn accept_order(
    State(state): State<AppState>,
    Path(order_id): Path<String>,
    Json(request): Json<AcceptOrderRequest>,
) -> ApiResult<impl IntoResponse> {
    let packet = state
        .service
        .accept_order(&order_id, &request.rider_id)
        .await?;
    Ok(success_with_message(packet, "接单成功"))
}

/// 查询订单配送情况
pub async fn get_delivery(
    State(state): State<AppState>,
    Path(order_id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let tracking = state.service.track_order(&order_id).await?;
    Ok(success(tracking))
}

/// 接单骑手上报配送状态
pub async fn report_status(
    State(state): State<AppState>,
    Path(order_id): Path<String>,
    Json(request): Json<ReportStatusRequest>,
) -> ApiResult<impl IntoResponse> {
    let status: DeliveryStatus = request.status.parse()?;
    let record = state
        .service
        .report_status(&order_id, &request.rider_id, status)
        .await?;
    Ok(success(record))
}

/// 计算配送费
pub async fn get_delivery_fee(
    State(state): State<AppState>,
    Query(query): Query<DeliveryFeeQuery>,
) -> ApiResult<impl IntoResponse> {
    let merchant = point(query.merchant_lat, query.merchant_lng)?;
    let customer = point(query.customer_lat, query.customer_lng)?;

    let fee = state.service.delivery_fee(merchant, customer)?;
    Ok(success(DeliveryFeeQuote {
        distance_km: haversine_distance(merchant, customer),
        fee,
    }))
}
