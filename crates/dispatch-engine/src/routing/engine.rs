//! Dispatch orchestrator
//!
//! Runs one ticket through the routing stages in a fixed order and always
//! returns a decision:
//!
//! ```text
//! RuleMatch ──no match──► CategoryFallback ──exhausted──► HardcodedDefault ──► Done
//!     │                         │                               │
//!     └──────── match ──────────┴──────── group found ──────────┴──────────► Done
//! ```
//!
//! Each stage turns its own lookup failures into "nothing found", so a broken
//! data source only ever moves a ticket further down the pipeline.

use std::sync::Arc;

use tracing::{debug, info, warn};

use super::fallback::{CategoryFallback, DefaultRouting};
use super::fields;
use super::load_balancer::{Clock, LoadBalancer, SystemClock};
use super::rules::RuleMatcher;
use crate::config::DispatchConfig;
use crate::database::DispatchStore;
use crate::error::Result;
use crate::monitoring::{DispatchMetrics, DispatchStats};
use crate::types::{
    AssignToType, AssignmentDecision, AssignmentRule, AssignmentStrategy, ConditionField, DecisionSource,
    TicketSnapshot,
};

/// Ticket dispatch engine
///
/// Holds no routing state between calls; every [`dispatch`](Self::dispatch)
/// re-reads rules, groups, categories and loads from the store.
pub struct DispatchEngine {
    store: Arc<dyn DispatchStore>,
    config: DispatchConfig,
    rules: RuleMatcher,
    balancer: LoadBalancer,
    categories: CategoryFallback,
    defaults: DefaultRouting,
    metrics: Arc<DispatchMetrics>,
}

impl DispatchEngine {
    /// Create an engine on the wall clock, resolving default groups by name
    pub async fn new(store: Arc<dyn DispatchStore>, config: DispatchConfig) -> Result<Self> {
        Self::with_clock(store, config, Arc::new(SystemClock)).await
    }

    /// Create an engine with an explicit clock
    pub async fn with_clock(
        store: Arc<dyn DispatchStore>,
        config: DispatchConfig,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        config.validate()?;
        info!("🎯 Initializing dispatch engine");

        let defaults = DefaultRouting::resolve(store.as_ref(), &config.defaults).await;
        Self::from_parts(store, config, clock, defaults)
    }

    /// Assemble an engine from an already-resolved default mapping
    pub fn from_parts(
        store: Arc<dyn DispatchStore>,
        config: DispatchConfig,
        clock: Arc<dyn Clock>,
        defaults: DefaultRouting,
    ) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            rules: RuleMatcher::new(store.clone()),
            balancer: LoadBalancer::new(store.clone(), clock, config.routing.day_boundary),
            categories: CategoryFallback::new(store.clone(), config.routing.max_category_depth),
            store,
            config,
            defaults,
            metrics: Arc::new(DispatchMetrics::new()),
        })
    }

    /// Decide where a new ticket goes
    ///
    /// Never fails. A decision without a source and without ids means the
    /// ticket stays unassigned for manual triage.
    pub async fn dispatch(&self, ticket: &TicketSnapshot) -> AssignmentDecision {
        let decision = match self.route_by_rule(ticket).await {
            Some(decision) => decision,
            None => match self.route_by_category(ticket).await {
                Some(decision) => decision,
                None => self
                    .route_by_default(ticket)
                    .unwrap_or_else(AssignmentDecision::unassigned),
            },
        };

        self.metrics.record_decision(&decision);

        match decision.source {
            Some(source) => info!(
                "📨 Ticket routed via {}: group={:?} agent={:?} rule={:?}",
                source, decision.group_id, decision.agent_id, decision.rule_id
            ),
            None => warn!("⚠️ Ticket left unassigned: no rule, category or default group applied"),
        }

        decision
    }

    async fn route_by_rule(&self, ticket: &TicketSnapshot) -> Option<AssignmentDecision> {
        let rule = self.rules.find_match(ticket).await?;

        let mut decision = AssignmentDecision {
            assigned: true,
            source: Some(DecisionSource::Rule),
            rule_id: Some(rule.id.clone()),
            ..Default::default()
        };

        match rule.assign_to_type {
            AssignToType::Agent => {
                decision.agent_id = Some(rule.assign_to_id.clone());
            }
            AssignToType::Group => {
                decision.group_id = Some(rule.assign_to_id.clone());
            }
            AssignToType::RoundRobin => {
                decision.group_id = Some(rule.assign_to_id.clone());
                decision.agent_id = self.balancer.select_agent(&rule.assign_to_id).await;
            }
        }

        self.record_rule_usage(&rule).await;
        Some(decision)
    }

    async fn route_by_category(&self, ticket: &TicketSnapshot) -> Option<AssignmentDecision> {
        let category_key = fields::resolve(ConditionField::Category, ticket)?.trim();
        let route = self.categories.resolve_fallback(category_key).await?;

        let agent_id = match route.strategy {
            AssignmentStrategy::RoundRobin => self.balancer.select_agent(&route.group_id).await,
            AssignmentStrategy::Manual | AssignmentStrategy::Other => self.supervisor_first(&route.group_id).await,
        };

        Some(AssignmentDecision {
            assigned: false,
            group_id: Some(route.group_id),
            agent_id,
            source: Some(DecisionSource::CategoryFallback),
            rule_id: None,
            category_id: Some(route.category_id),
        })
    }

    fn route_by_default(&self, ticket: &TicketSnapshot) -> Option<AssignmentDecision> {
        let bucket = self.defaults.bucket_for(ticket);
        let Some(group_id) = self.defaults.group_for_bucket(bucket) else {
            debug!("No default group for {} bucket", bucket);
            return None;
        };

        Some(AssignmentDecision {
            group_id: Some(group_id.to_string()),
            source: Some(DecisionSource::HardcodedDefault),
            ..Default::default()
        })
    }

    /// Supervisor of a group that takes manually-routed tickets first
    async fn supervisor_first(&self, group_id: &str) -> Option<String> {
        match self.store.get_group(group_id).await {
            Ok(Some(group)) if group.assign_tasks_first => {
                let supervisor = group.supervisor_id.filter(|id| !id.trim().is_empty());
                if supervisor.is_none() {
                    warn!("⚠️ Group {} assigns tasks first but has no supervisor", group_id);
                }
                supervisor
            }
            Ok(Some(_)) => None,
            Ok(None) => {
                warn!("⚠️ Category default group {} does not exist", group_id);
                None
            }
            Err(e) => {
                warn!("⚠️ Group {} unavailable: {}", group_id, e);
                None
            }
        }
    }

    async fn record_rule_usage(&self, rule: &AssignmentRule) {
        let store = self.store.clone();
        let metrics = self.metrics.clone();
        let rule_id = rule.id.clone();

        let increment = async move {
            if let Err(e) = store.increment_rule_usage(&rule_id).await {
                warn!("⚠️ Failed to record usage of rule {}: {}", rule_id, e);
                metrics.record_usage_write_failure();
            }
        };

        if !self.config.routing.record_usage_in_background {
            increment.await;
            return;
        }

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(increment);
            }
            Err(_) => {
                debug!("No tokio runtime for background usage write, recording rule {} inline", rule.id);
                increment.await;
            }
        }
    }

    /// Counters accumulated since the engine was created
    pub fn stats(&self) -> DispatchStats {
        self.metrics.snapshot()
    }

    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::InMemoryStore;
    use crate::types::{AssignmentRule, Category, Condition, ConditionOperator, Group};

    fn inline_config() -> DispatchConfig {
        let mut config = DispatchConfig::default();
        config.routing.record_usage_in_background = false;
        config
    }

    fn urgent() -> Condition {
        Condition::new(ConditionField::Priority, ConditionOperator::Equals, "urgent")
    }

    fn ticket(category: &str) -> TicketSnapshot {
        TicketSnapshot {
            priority: Some("low".to_string()),
            category: Some(category.to_string()),
            ..Default::default()
        }
    }

    async fn engine(store: Arc<InMemoryStore>) -> DispatchEngine {
        DispatchEngine::new(store, inline_config()).await.unwrap()
    }

    #[tokio::test]
    async fn test_agent_rule_assigns_directly_and_counts_usage() {
        let store = Arc::new(InMemoryStore::new());
        store.add_rule(
            AssignmentRule::new("vip", 1, AssignToType::Agent, "agent-7")
                .with_id("r1")
                .with_condition(urgent()),
        );

        let engine = engine(store.clone()).await;
        let decision = engine
            .dispatch(&TicketSnapshot {
                priority: Some("URGENT".to_string()),
                ..Default::default()
            })
            .await;

        assert!(decision.assigned);
        assert_eq!(decision.agent_id.as_deref(), Some("agent-7"));
        assert_eq!(decision.group_id, None);
        assert_eq!(decision.rule_id.as_deref(), Some("r1"));
        assert_eq!(store.rule_usage("r1"), Some(1));
    }

    #[tokio::test]
    async fn test_round_robin_rule_selects_agent() {
        let store = Arc::new(InMemoryStore::new());
        store
            .add_group(Group::new("g1", "Network").with_member("x").with_member("y"))
            .add_rule(
                AssignmentRule::new("urgent", 1, AssignToType::RoundRobin, "g1")
                    .with_condition(urgent()),
            );
        store.record_assignments("x", 2, chrono::Utc::now());

        let engine = engine(store).await;
        let decision = engine
            .dispatch(&TicketSnapshot {
                priority: Some("urgent".to_string()),
                ..Default::default()
            })
            .await;

        assert!(decision.assigned);
        assert_eq!(decision.group_id.as_deref(), Some("g1"));
        assert_eq!(decision.agent_id.as_deref(), Some("y"));
    }

    #[tokio::test]
    async fn test_round_robin_rule_with_missing_group_keeps_group() {
        let store = Arc::new(InMemoryStore::new());
        store.add_rule(
            AssignmentRule::new("urgent", 1, AssignToType::RoundRobin, "gone").with_condition(urgent()),
        );

        let engine = engine(store).await;
        let decision = engine
            .dispatch(&TicketSnapshot {
                priority: Some("urgent".to_string()),
                ..Default::default()
            })
            .await;

        assert!(decision.assigned);
        assert_eq!(decision.group_id.as_deref(), Some("gone"));
        assert_eq!(decision.agent_id, None);
    }

    #[tokio::test]
    async fn test_manual_category_assigns_supervisor_first() {
        let store = Arc::new(InMemoryStore::new());
        store
            .add_group(
                Group::new("g-hw", "Hardware")
                    .with_member("tech")
                    .with_supervisor("boss", true),
            )
            .add_category(Category::new("printers").with_default_group("g-hw", AssignmentStrategy::Manual));

        let engine = engine(store).await;
        let decision = engine.dispatch(&ticket("printers")).await;

        assert!(!decision.assigned);
        assert_eq!(decision.source, Some(DecisionSource::CategoryFallback));
        assert_eq!(decision.group_id.as_deref(), Some("g-hw"));
        assert_eq!(decision.agent_id.as_deref(), Some("boss"));
        assert_eq!(decision.category_id.as_deref(), Some("printers"));
    }

    #[tokio::test]
    async fn test_padded_category_resolves_by_id() {
        let store = Arc::new(InMemoryStore::new());
        store
            .add_group(Group::new("g-net", "Network"))
            .add_category(Category::new("network").with_default_group("g-net", AssignmentStrategy::Manual));

        let engine = engine(store).await;
        let decision = engine.dispatch(&ticket("  network ")).await;

        assert_eq!(decision.source, Some(DecisionSource::CategoryFallback));
        assert_eq!(decision.category_id.as_deref(), Some("network"));
        assert_eq!(decision.group_id.as_deref(), Some("g-net"));
    }

    #[tokio::test]
    async fn test_manual_category_without_supervisor_first_is_group_only() {
        let store = Arc::new(InMemoryStore::new());
        store
            .add_group(Group::new("g-hw", "Hardware").with_supervisor("boss", false))
            .add_category(Category::new("printers").with_default_group("g-hw", AssignmentStrategy::Other));

        let engine = engine(store).await;
        let decision = engine.dispatch(&ticket("printers")).await;

        assert_eq!(decision.group_id.as_deref(), Some("g-hw"));
        assert_eq!(decision.agent_id, None);
    }

    #[tokio::test]
    async fn test_hardcoded_default_by_issue_type() {
        let store = Arc::new(InMemoryStore::new());
        store
            .add_group(Group::new("g-sw", "Software Support"))
            .add_group(Group::new("g-ep", "Endpoint Support"));

        let engine = engine(store).await;

        let software = engine
            .dispatch(&TicketSnapshot {
                issue_type: Some("Software".to_string()),
                ..Default::default()
            })
            .await;
        assert!(!software.assigned);
        assert_eq!(software.source, Some(DecisionSource::HardcodedDefault));
        assert_eq!(software.group_id.as_deref(), Some("g-sw"));

        let hardware = engine
            .dispatch(&TicketSnapshot {
                issue_type: Some("hardware".to_string()),
                ..Default::default()
            })
            .await;
        assert_eq!(hardware.group_id.as_deref(), Some("g-ep"));
        assert_eq!(hardware.agent_id, None);
    }

    #[tokio::test]
    async fn test_nothing_configured_leaves_ticket_unassigned() {
        let engine = engine(Arc::new(InMemoryStore::new())).await;
        let decision = engine.dispatch(&ticket("network")).await;

        assert_eq!(decision, AssignmentDecision::unassigned());
        assert!(!decision.is_routed());
    }

    #[tokio::test]
    async fn test_stats_track_sources() {
        let store = Arc::new(InMemoryStore::new());
        store
            .add_group(Group::new("g-ep", "Endpoint Support"))
            .add_rule(AssignmentRule::new("urgent", 1, AssignToType::Group, "g1").with_condition(urgent()));

        let engine = engine(store).await;
        engine
            .dispatch(&TicketSnapshot {
                priority: Some("urgent".to_string()),
                ..Default::default()
            })
            .await;
        engine.dispatch(&ticket("laptop")).await;

        let stats = engine.stats();
        assert_eq!(stats.dispatched, 2);
        assert_eq!(stats.rule_matches, 1);
        assert_eq!(stats.hardcoded_defaults, 1);
        assert_eq!(stats.usage_write_failures, 0);
    }

    #[tokio::test]
    async fn test_invalid_config_is_rejected() {
        let mut config = DispatchConfig::default();
        config.routing.max_category_depth = 0;

        let result = DispatchEngine::new(Arc::new(InMemoryStore::new()), config).await;
        assert!(result.is_err());
    }
}
