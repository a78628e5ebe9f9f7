use std::time::Duration;

use serde::{Deserialize, Serialize};

/// 派单会话相关配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// 每个派单会话唯一的权威截止时间（秒）
    pub offer_deadline_seconds: u64,
    /// 相邻两次骑手通知之间的间隔（毫秒），0 表示连续发送
    pub notify_interval_ms: u64,
    /// 同时进行的派单任务上限
    pub max_concurrent_dispatches: usize,
    /// 已结束订单ID的保留时间（秒），用于识别重复投递的事件
    pub retired_retention_seconds: u64,
    /// 订单事件轮询间隔（毫秒）
    pub intake_poll_interval_ms: u64,
    /// 静态候选骑手名单
    pub rider_roster: Vec<String>,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            offer_deadline_seconds: 15 * 60,
            notify_interval_ms: 0,
            max_concurrent_dispatches: 100,
            retired_retention_seconds: 24 * 60 * 60,
            intake_poll_interval_ms: 100,
            rider_roster: vec![
                "rider001".to_string(),
                "rider002".to_string(),
                "rider003".to_string(),
                "rider004".to_string(),
                "rider005".to_string(),
            ],
        }
    }
}

impl DispatchConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.offer_deadline_seconds == 0 {
            return Err(anyhow::anyhow!("派单截止时间必须大于0"));
        }

        if self.max_concurrent_dispatches == 0 {
            return Err(anyhow::anyhow!("最大并发派单数必须大于0"));
        }

        if self.retired_retention_seconds < self.offer_deadline_seconds {
            return Err(anyhow::anyhow!(
                "已结束订单的保留时间({}秒)不能短于派单截止时间({}秒)",
                self.retired_retention_seconds,
                self.offer_deadline_seconds
            ));
        }

        if self.intake_poll_interval_ms == 0 {
            return Err(anyhow::anyhow!("订单事件轮询间隔必须大于0"));
        }

        if self.rider_roster.iter().any(|id| id.trim().is_empty()) {
            return Err(anyhow::anyhow!("骑手名单中不能包含空ID"));
        }

        Ok(())
    }

    pub fn offer_deadline(&self) -> Duration {
        Duration::from_secs(self.offer_deadline_seconds)
    }

    pub fn notify_interval(&self) -> Duration {
        Duration::from_millis(self.notify_interval_ms)
    }

    pub fn retired_retention(&self) -> Duration {
        Duration::from_secs(self.retired_retention_seconds)
    }

    pub fn intake_poll_interval(&self) -> Duration {
        Duration::from_millis(self.intake_poll_interval_ms)
    }
}
