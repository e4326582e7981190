//! Engine-wide configuration: cache sizes and the enforcement deadline.
//!
//! Per-rule comparison settings (thresholds/weights/mode/global_threshold)
//! live on each rule instance via `RuleInstance::comparison_config`, not
//! here — `spec.md` §3 and §4.3 tie them to the rule, not the engine, so
//! two rules in the same family can disagree on how strict they are.

use std::time::Duration;

#[derive(Debug, Clone, Copy)]
pub struct EngineConfig {
    pub embedder_cache_capacity: usize,
    pub enforcement_deadline: Duration,
}

impl EngineConfig {
    pub fn with_defaults() -> Self {
        EngineConfig {
            embedder_cache_capacity: 4096,
            enforcement_deadline: Duration::from_millis(250),
        }
    }

    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.enforcement_deadline = deadline;
        self
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::with_defaults()
    }
}
