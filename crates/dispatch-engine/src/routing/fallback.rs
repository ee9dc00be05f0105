//! Fallback routing for tickets no rule claimed
//!
//! Two stages, tried in order by the engine:
//!
//! 1. [`CategoryFallback`] walks from the ticket's category towards the root
//!    looking for a category with a default group.
//! 2. [`DefaultRouting`] maps a coarse issue-type bucket to a group resolved
//!    once, by name, when the engine starts.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::DefaultRoutingConfig;
use crate::database::DispatchStore;
use crate::types::{AssignmentStrategy, TicketSnapshot};

/// Group and strategy found on the category chain
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryRoute {
    /// Category that carried the default group
    pub category_id: String,
    pub group_id: String,
    pub strategy: AssignmentStrategy,
}

/// Bounded walk up the category parent chain
pub struct CategoryFallback {
    store: Arc<dyn DispatchStore>,
    max_depth: usize,
}

impl CategoryFallback {
    pub fn new(store: Arc<dyn DispatchStore>, max_depth: usize) -> Self {
        Self { store, max_depth }
    }

    /// Find the nearest category, starting at `category_key`, with a default group
    ///
    /// Visits at most `max_depth` categories, so cyclic or overly deep data
    /// ends the walk instead of looping. A missing category, a failed lookup or
    /// an exhausted chain all yield `None`.
    pub async fn resolve_fallback(&self, category_key: &str) -> Option<CategoryRoute> {
        let mut current = category_key.to_string();

        for hop in 0..self.max_depth {
            let category = match self.store.get_category(&current).await {
                Ok(Some(category)) => category,
                Ok(None) => {
                    debug!("Category {} not found (hop {})", current, hop);
                    return None;
                }
                Err(e) => {
                    warn!("⚠️ Category {} unavailable: {}", current, e);
                    return None;
                }
            };

            if let Some(group_id) = category.default_group_id.as_deref().filter(|id| !id.trim().is_empty()) {
                debug!(
                    "🗂️ Category {} supplies group {} ({}) after {} hops",
                    category.id, group_id, category.assignment_strategy, hop
                );
                return Some(CategoryRoute {
                    category_id: category.id.clone(),
                    group_id: group_id.to_string(),
                    strategy: category.assignment_strategy,
                });
            }

            match category.parent_id {
                Some(parent_id) if !parent_id.trim().is_empty() => current = parent_id,
                _ => {
                    debug!("Category chain from {} reached a root without a default group", category_key);
                    return None;
                }
            }
        }

        warn!(
            "⚠️ Category chain from {} exhausted after {} hops without a default group",
            category_key, self.max_depth
        );
        None
    }
}

/// Coarse issue classification for last-resort routing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueBucket {
    Software,
    /// Hardware, endpoints and anything unclassified
    Endpoint,
}

impl IssueBucket {
    /// Classify an issue type; a value containing any software keyword is software
    pub fn classify(issue_type: Option<&str>, software_keywords: &[String]) -> Self {
        let Some(issue_type) = issue_type else {
            return IssueBucket::Endpoint;
        };

        let issue_type = issue_type.trim().to_lowercase();
        let is_software = software_keywords
            .iter()
            .map(|keyword| keyword.trim().to_lowercase())
            .any(|keyword| !keyword.is_empty() && issue_type.contains(&keyword));

        if is_software {
            IssueBucket::Software
        } else {
            IssueBucket::Endpoint
        }
    }
}

impl fmt::Display for IssueBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IssueBucket::Software => write!(f, "software"),
            IssueBucket::Endpoint => write!(f, "endpoint"),
        }
    }
}

/// Static bucket → group mapping, fixed for the engine's lifetime
#[derive(Debug, Clone, Default)]
pub struct DefaultRouting {
    software_group_id: Option<String>,
    endpoint_group_id: Option<String>,
    software_keywords: Vec<String>,
}

impl DefaultRouting {
    /// Build a mapping from known group ids
    pub fn new(
        software_group_id: Option<String>,
        endpoint_group_id: Option<String>,
        software_keywords: Vec<String>,
    ) -> Self {
        Self {
            software_group_id,
            endpoint_group_id,
            software_keywords,
        }
    }

    /// Resolve the configured group names against the store
    ///
    /// A name that cannot be resolved leaves its bucket empty; tickets falling
    /// into it stay unassigned.
    pub async fn resolve(store: &dyn DispatchStore, config: &DefaultRoutingConfig) -> Self {
        let software_group_id = Self::lookup(store, IssueBucket::Software, &config.software_group).await;
        let endpoint_group_id = Self::lookup(store, IssueBucket::Endpoint, &config.endpoint_group).await;

        Self::new(software_group_id, endpoint_group_id, config.software_issue_types.clone())
    }

    async fn lookup(store: &dyn DispatchStore, bucket: IssueBucket, name: &str) -> Option<String> {
        match store.find_group_by_name(name).await {
            Ok(Some(group)) => {
                info!("📌 Default {} group: {} ({})", bucket, group.name, group.id);
                Some(group.id)
            }
            Ok(None) => {
                warn!("⚠️ Default {} group '{}' not found; bucket left unrouted", bucket, name);
                None
            }
            Err(e) => {
                warn!("⚠️ Could not resolve default {} group '{}': {}", bucket, name, e);
                None
            }
        }
    }

    /// Bucket of a ticket: its issue type, or its category when no issue type is set
    pub fn bucket_for(&self, ticket: &TicketSnapshot) -> IssueBucket {
        let issue_type = ticket
            .issue_type
            .as_deref()
            .filter(|value| !value.trim().is_empty())
            .or_else(|| ticket.category.as_deref().filter(|value| !value.trim().is_empty()));

        IssueBucket::classify(issue_type, &self.software_keywords)
    }

    /// Group configured for a bucket
    pub fn group_for_bucket(&self, bucket: IssueBucket) -> Option<&str> {
        match bucket {
            IssueBucket::Software => self.software_group_id.as_deref(),
            IssueBucket::Endpoint => self.endpoint_group_id.as_deref(),
        }
    }
}
