use std::collections::HashMap;

use async_trait::async_trait;
use dispatch_core::{DispatchError, DispatchResult};
use dispatch_domain::{Address, AddressResolver, Point};
use tracing::debug;

/// 按行政区查表的地理编码器（清迈各区中心坐标）
pub struct DistrictGeocoder {
    districts: HashMap<String, Point>,
}

impl DistrictGeocoder {
    pub fn new() -> Self {
        let districts = [
            ("Mueang", Point::new(18.7883, 98.9853)),
            ("Hang Dong", Point::new(18.6870, 98.8897)),
            ("San Sai", Point::new(18.8578, 99.0631)),
            ("Mae Rim", Point::new(18.8998, 98.9311)),
            ("Doi Saket", Point::new(18.8482, 99.1403)),
        ]
        .into_iter()
        .map(|(name, point)| (name.to_string(), point))
        .collect();

        Self { districts }
    }

    pub fn with_districts(districts: HashMap<String, Point>) -> Self {
        Self { districts }
    }
}

impl Default for DistrictGeocoder {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AddressResolver for DistrictGeocoder {
    async fn resolve(&self, address: &Address) -> DispatchResult<Point> {
        let point = self
            .districts
            .get(address.district.trim())
            .copied()
            .ok_or_else(|| DispatchError::AddressResolutionFailed {
                address: address.to_string(),
                message: format!("无效的行政区: {}", address.district),
            })?;

        debug!("地址 {} 解析为 ({}, {})", address, point.latitude, point.longitude);
        Ok(point)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn address(district: &str) -> Address {
        Address {
            district: district.to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_known_district() {
        let geocoder = DistrictGeocoder::new();
        let point = geocoder.resolve(&address("San Sai")).await.unwrap();
        assert_eq!(point, Point::new(18.8578, 99.0631));
    }

    #[tokio::test]
    async fn test_unknown_district_fails() {
        let geocoder = DistrictGeocoder::new();
        let result = geocoder.resolve(&address("Atlantis")).await;
        assert!(matches!(
            result,
            Err(DispatchError::AddressResolutionFailed { .. })
        ));
    }
}
