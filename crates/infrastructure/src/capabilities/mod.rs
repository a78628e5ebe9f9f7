//! 外部能力的本地替身
//!
//! 真实的地理匹配、地理编码和推送服务不在本服务内实现。

pub mod candidates;
pub mod geocoding;
pub mod notifier;

pub use candidates::StaticRosterSelector;
pub use geocoding::DistrictGeocoder;
pub use notifier::{LoggingNotifier, PushRecord};
