//! 派单引擎依赖的外部能力
//!
//! 引擎只通过这些接口访问候选骑手匹配、地址解析、推送通知、配送记录存储和消息队列。

pub mod capabilities;
pub mod messaging;
pub mod repositories;

pub use capabilities::*;
pub use messaging::*;
pub use repositories::*;
