use dispatch_core::{DispatchError, DispatchResult};
use dispatch_domain::Point;

const EARTH_RADIUS_KM: f64 = 6371.0;

/// 两点之间的大圆距离（公里）
pub fn haversine_distance(a: Point, b: Point) -> f64 {
    let lat1 = a.latitude.to_radians();
    let lat2 = b.latitude.to_radians();
    let d_lat = (b.latitude - a.latitude).to_radians();
    let d_lon = (b.longitude - a.longitude).to_radians();

    let h = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * h.sqrt().asin()
}

/// 按直线距离计算配送费
///
/// 5公里内免费，10公里内50，25公里内100，超出范围不配送。
pub fn delivery_fee(merchant: Point, customer: Point) -> DispatchResult<i32> {
    let distance = haversine_distance(merchant, customer);
    if !distance.is_finite() || !(0.0..=25.0).contains(&distance) {
        return Err(DispatchError::InvalidArgument(format!(
            "配送距离必须在0到25公里之间，当前为 {distance:.2} 公里"
        )));
    }

    let fee = match distance {
        d if d <= 5.0 => 0,
        d if d <= 10.0 => 50,
        _ => 100,
    };
    Ok(fee)
}
