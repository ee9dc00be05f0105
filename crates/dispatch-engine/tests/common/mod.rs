//! Shared fixtures for the dispatch integration tests

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use helpdesk_dispatch_engine::prelude::*;

/// Which store operations fail
#[derive(Debug, Clone, Copy, Default)]
pub struct Failures {
    pub rules: bool,
    pub groups: bool,
    pub categories: bool,
    pub counts: bool,
    pub usage: bool,
}

/// In-memory store that fails selected operations with `DataUnavailable`
pub struct FlakyStore {
    pub inner: InMemoryStore,
    pub failures: Failures,
    pub category_lookups: AtomicUsize,
}

impl FlakyStore {
    pub fn new(failures: Failures) -> Self {
        Self {
            inner: InMemoryStore::new(),
            failures,
            category_lookups: AtomicUsize::new(0),
        }
    }

    fn unavailable<T>(what: &str) -> Result<T> {
        Err(DispatchError::data_unavailable(format!("{} offline", what)))
    }
}

#[async_trait]
impl DispatchStore for FlakyStore {
    async fn active_rules(&self) -> Result<Vec<AssignmentRule>> {
        if self.failures.rules {
            return Self::unavailable("rules");
        }
        self.inner.active_rules().await
    }

    async fn get_group(&self, group_id: &str) -> Result<Option<Group>> {
        if self.failures.groups {
            return Self::unavailable("groups");
        }
        self.inner.get_group(group_id).await
    }

    async fn find_group_by_name(&self, name: &str) -> Result<Option<Group>> {
        if self.failures.groups {
            return Self::unavailable("groups");
        }
        self.inner.find_group_by_name(name).await
    }

    async fn assignment_counts_since(
        &self,
        agent_ids: &[String],
        since: DateTime<Utc>,
    ) -> Result<HashMap<String, u64>> {
        if self.failures.counts {
            return Self::unavailable("tickets");
        }
        self.inner.assignment_counts_since(agent_ids, since).await
    }

    async fn get_category(&self, key: &str) -> Result<Option<Category>> {
        self.category_lookups.fetch_add(1, Ordering::SeqCst);
        if self.failures.categories {
            return Self::unavailable("categories");
        }
        self.inner.get_category(key).await
    }

    async fn increment_rule_usage(&self, rule_id: &str) -> Result<()> {
        if self.failures.usage {
            return Self::unavailable("rule usage");
        }
        self.inner.increment_rule_usage(rule_id).await
    }
}

/// Configuration that awaits the usage increment inline
pub fn inline_config() -> DispatchConfig {
    let mut config = DispatchConfig::default();
    config.routing.record_usage_in_background = false;
    config
}

pub fn urgent_rule(id: &str, assign_to_type: AssignToType, assign_to_id: &str) -> AssignmentRule {
    AssignmentRule::new(format!("urgent {}", id), 1, assign_to_type, assign_to_id)
        .with_id(id)
        .with_condition(Condition::new(ConditionField::Priority, ConditionOperator::Equals, "urgent"))
}

pub fn ticket(priority: &str, category: &str) -> TicketSnapshot {
    TicketSnapshot {
        priority: Some(priority.to_string()),
        category: Some(category.to_string()),
        ..Default::default()
    }
}

/// Seed the two groups the hardcoded defaults resolve by name
pub fn add_default_groups(store: &InMemoryStore) {
    store
        .add_group(Group::new("g-software", "Software Support").with_member("sw-1"))
        .add_group(Group::new("g-endpoint", "Endpoint Support").with_member("ep-1"));
}
