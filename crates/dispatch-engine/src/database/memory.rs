//! In-memory dispatch store

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use tracing::debug;

use super::{name_key, DispatchStore};
use crate::error::{DispatchError, Result};
use crate::types::{AssignmentRule, Category, Group};

/// A ticket assignment counted by the load balancer
#[derive(Debug, Clone)]
struct AssignmentRecord {
    agent_id: String,
    created_at: DateTime<Utc>,
}

/// Dispatch store backed by process memory
#[derive(Default)]
pub struct InMemoryStore {
    rules: RwLock<Vec<AssignmentRule>>,
    groups: RwLock<Vec<Group>>,
    categories: RwLock<Vec<Category>>,
    assignments: RwLock<Vec<AssignmentRecord>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a rule; rules sharing a priority keep insertion order
    pub fn add_rule(&self, rule: AssignmentRule) -> &Self {
        self.rules.write().push(rule);
        self
    }

    /// Add or replace a group
    pub fn add_group(&self, group: Group) -> &Self {
        let mut groups = self.groups.write();
        groups.retain(|existing| existing.id != group.id);
        groups.push(group);
        self
    }

    /// Add or replace a category
    pub fn add_category(&self, category: Category) -> &Self {
        let mut categories = self.categories.write();
        categories.retain(|existing| existing.id != category.id);
        categories.push(category);
        self
    }

    /// Record a ticket assigned to an agent at the given time
    pub fn record_assignment(&self, agent_id: impl Into<String>, created_at: DateTime<Utc>) -> &Self {
        self.assignments.write().push(AssignmentRecord {
            agent_id: agent_id.into(),
            created_at,
        });
        self
    }

    /// Record `count` tickets for an agent at the given time
    pub fn record_assignments(&self, agent_id: &str, count: usize, created_at: DateTime<Utc>) -> &Self {
        for _ in 0..count {
            self.record_assignment(agent_id, created_at);
        }
        self
    }

    /// Current `tickets_routed` value of a rule
    pub fn rule_usage(&self, rule_id: &str) -> Option<i64> {
        self.rules
            .read()
            .iter()
            .find(|rule| rule.id == rule_id)
            .map(|rule| rule.tickets_routed)
    }
}

#[async_trait]
impl DispatchStore for InMemoryStore {
    async fn active_rules(&self) -> Result<Vec<AssignmentRule>> {
        let mut rules: Vec<AssignmentRule> = self
            .rules
            .read()
            .iter()
            .filter(|rule| rule.is_active)
            .cloned()
            .collect();

        // Stable sort keeps insertion order among equal priorities
        rules.sort_by_key(|rule| rule.priority);
        debug!("📋 Loaded {} active rules from memory", rules.len());
        Ok(rules)
    }

    async fn get_group(&self, group_id: &str) -> Result<Option<Group>> {
        Ok(self
            .groups
            .read()
            .iter()
            .find(|group| group.id == group_id)
            .cloned())
    }

    async fn find_group_by_name(&self, name: &str) -> Result<Option<Group>> {
        let wanted = name_key(name);
        Ok(self
            .groups
            .read()
            .iter()
            .find(|group| name_key(&group.name) == wanted)
            .cloned())
    }

    async fn assignment_counts_since(
        &self,
        agent_ids: &[String],
        since: DateTime<Utc>,
    ) -> Result<HashMap<String, u64>> {
        let mut counts = HashMap::new();
        for record in self.assignments.read().iter() {
            if record.created_at >= since && agent_ids.contains(&record.agent_id) {
                *counts.entry(record.agent_id.clone()).or_insert(0) += 1;
            }
        }
        Ok(counts)
    }

    async fn get_category(&self, key: &str) -> Result<Option<Category>> {
        let categories = self.categories.read();
        if let Some(category) = categories.iter().find(|category| category.id == key) {
            return Ok(Some(category.clone()));
        }

        let wanted = name_key(key);
        Ok(categories
            .iter()
            .find(|category| {
                category
                    .name
                    .as_deref()
                    .is_some_and(|name| name_key(name) == wanted)
            })
            .cloned())
    }

    async fn increment_rule_usage(&self, rule_id: &str) -> Result<()> {
        let mut rules = self.rules.write();
        let rule = rules
            .iter_mut()
            .find(|rule| rule.id == rule_id)
            .ok_or_else(|| DispatchError::not_found(format!("Rule not found: {}", rule_id)))?;
        rule.tickets_routed += 1;
        Ok(())
    }
}
