//! 派单引擎配置管理
//!
//! 配置加载顺序：
//! 1. 内置默认值
//! 2. TOML 配置文件
//! 3. 环境变量覆盖（前缀 `DISPATCH_`，层级分隔符 `__`）

pub mod models;

pub use models::*;
