//! # Dispatch Metrics
//!
//! Process-local counters describing how tickets were routed. They feed logs
//! and the `stats()` snapshot only; no routing decision reads them.
//!
//! ```text
//! dispatch() ──► dispatched
//!     ├── rule fired ─────────► rule_matches
//!     ├── category default ───► category_fallbacks
//!     ├── hardcoded bucket ───► hardcoded_defaults
//!     └── nothing applied ────► unrouted
//! ```

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

use crate::types::{AssignmentDecision, DecisionSource};

/// Lock-free dispatch counters
#[derive(Debug, Default)]
pub struct DispatchMetrics {
    dispatched: AtomicU64,
    rule_matches: AtomicU64,
    category_fallbacks: AtomicU64,
    hardcoded_defaults: AtomicU64,
    unrouted: AtomicU64,
    agents_selected: AtomicU64,
    usage_write_failures: AtomicU64,
}

/// Point-in-time copy of [`DispatchMetrics`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchStats {
    pub dispatched: u64,
    pub rule_matches: u64,
    pub category_fallbacks: u64,
    pub hardcoded_defaults: u64,
    pub unrouted: u64,
    /// Decisions that named an agent
    pub agents_selected: u64,
    /// Failed `tickets_routed` increments
    pub usage_write_failures: u64,
}

impl DispatchMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count a finished decision
    pub fn record_decision(&self, decision: &AssignmentDecision) {
        self.dispatched.fetch_add(1, Ordering::Relaxed);

        let counter = match decision.source {
            Some(DecisionSource::Rule) => &self.rule_matches,
            Some(DecisionSource::CategoryFallback) => &self.category_fallbacks,
            Some(DecisionSource::HardcodedDefault) => &self.hardcoded_defaults,
            None => &self.unrouted,
        };
        counter.fetch_add(1, Ordering::Relaxed);

        if decision.agent_id.is_some() {
            self.agents_selected.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_usage_write_failure(&self) {
        self.usage_write_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> DispatchStats {
        DispatchStats {
            dispatched: self.dispatched.load(Ordering::Relaxed),
            rule_matches: self.rule_matches.load(Ordering::Relaxed),
            category_fallbacks: self.category_fallbacks.load(Ordering::Relaxed),
            hardcoded_defaults: self.hardcoded_defaults.load(Ordering::Relaxed),
            unrouted: self.unrouted.load(Ordering::Relaxed),
            agents_selected: self.agents_selected.load(Ordering::Relaxed),
            usage_write_failures: self.usage_write_failures.load(Ordering::Relaxed),
        }
    }
}
