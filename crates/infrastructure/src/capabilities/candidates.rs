use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use dispatch_core::DispatchResult;
use dispatch_domain::{Address, CandidateSelector, RiderId};
use tracing::debug;

/// 固定骑手名单
///
/// 每次选择时轮换名单起点，使排在首位通知的骑手依次变化。
pub struct StaticRosterSelector {
    roster: Vec<RiderId>,
    counter: AtomicUsize,
}

impl StaticRosterSelector {
    pub fn new(roster: Vec<RiderId>) -> Self {
        Self {
            roster,
            counter: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl CandidateSelector for StaticRosterSelector {
    async fn select_candidates(&self, pickup_address: &Address) -> DispatchResult<Vec<RiderId>> {
        if self.roster.is_empty() {
            debug!("骑手名单为空，地址 {} 没有候选骑手", pickup_address);
            return Ok(vec![]);
        }

        let offset = self.counter.fetch_add(1, Ordering::Relaxed) % self.roster.len();
        let mut candidates = self.roster.clone();
        candidates.rotate_left(offset);

        debug!(
            "为地址 {} 选出 {} 名候选骑手 (起点: {})",
            pickup_address,
            candidates.len(),
            offset
        );
        Ok(candidates)
    }
}
