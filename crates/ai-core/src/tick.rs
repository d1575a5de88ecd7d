use crate::{rng, AgentId, SplitMix64};

/// Ambient per-tick inputs shared by every instance ticked this frame.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TickContext {
    pub tick: u64,
    /// Monotonic simulation time in seconds.
    pub now: f32,
    pub seed: u64,
}

impl TickContext {
    pub fn new(tick: u64, now: f32, seed: u64) -> Self {
        Self { tick, now, seed }
    }

    pub fn rng_for_agent<A: AgentId>(&self, agent: A, stream: u64) -> SplitMix64 {
        let seed = rng::derive_seed(self.seed, agent.stable_id(), stream);
        SplitMix64::new(seed)
    }
}
