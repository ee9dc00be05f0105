//! # Dispatch Data Store
//!
//! The routing engine keeps no routing state of its own. Rules, groups,
//! categories and per-agent ticket counts are re-read through a
//! [`DispatchStore`] on every dispatch call.
//!
//! Two implementations ship with the crate:
//!
//! - [`memory::InMemoryStore`]: lock-guarded collections for tests and embedding
//! - [`sqlite::SqliteDispatchStore`]: sqlx-backed SQLite persistence
//!
//! The only write the engine performs is [`DispatchStore::increment_rule_usage`],
//! which is best-effort.

pub mod schema;
pub mod memory;
pub mod sqlite;

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::types::{AssignmentRule, Category, Group};

pub use memory::InMemoryStore;
pub use sqlite::SqliteDispatchStore;

/// Lookup key for group and category names: trimmed, Unicode lowercase
pub fn name_key(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Read access to routing data plus the rule usage counter
#[async_trait]
pub trait DispatchStore: Send + Sync {
    /// Active rules ordered by ascending priority, ties in creation order
    async fn active_rules(&self) -> Result<Vec<AssignmentRule>>;

    /// Look up a group by id
    async fn get_group(&self, group_id: &str) -> Result<Option<Group>>;

    /// Look up a group by name, ignoring case
    async fn find_group_by_name(&self, name: &str) -> Result<Option<Group>>;

    /// Active members of a group in enumeration order
    ///
    /// A missing group has no members.
    async fn active_group_members(&self, group_id: &str) -> Result<Vec<String>> {
        Ok(self
            .get_group(group_id)
            .await?
            .map(|group| group.active_members())
            .unwrap_or_default())
    }

    /// Number of tickets assigned to each of `agent_ids` created at or after `since`
    ///
    /// Agents without tickets may be absent from the returned map.
    async fn assignment_counts_since(
        &self,
        agent_ids: &[String],
        since: DateTime<Utc>,
    ) -> Result<HashMap<String, u64>>;

    /// Look up a category by id, falling back to a case-insensitive name match
    async fn get_category(&self, key: &str) -> Result<Option<Category>>;

    /// Bump a rule's `tickets_routed` counter
    async fn increment_rule_usage(&self, rule_id: &str) -> Result<()>;
}
