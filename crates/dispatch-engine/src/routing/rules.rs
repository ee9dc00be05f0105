//! First-match rule selection

use std::sync::Arc;

use tracing::{debug, warn};

use super::conditions;
use crate::database::DispatchStore;
use crate::types::{AssignmentRule, TicketSnapshot};

/// Return the first rule, in the given order, whose conditions all hold
///
/// `rules` must already be in precedence order. Rules without conditions and
/// inactive rules are skipped. Evaluation stops at the first full match.
pub fn first_matching_rule<'a>(
    rules: &'a [AssignmentRule],
    ticket: &TicketSnapshot,
) -> Option<&'a AssignmentRule> {
    for rule in rules {
        if !rule.is_active {
            continue;
        }

        // A rule without conditions would match everything
        if rule.conditions.is_empty() {
            debug!("⏭️ Skipping rule {} ({}): no conditions", rule.name, rule.id);
            continue;
        }

        if conditions::evaluate_all(&rule.conditions, ticket) {
            return Some(rule);
        }
    }

    None
}

/// Loads the active rule set and picks the first match
pub struct RuleMatcher {
    store: Arc<dyn DispatchStore>,
}

impl RuleMatcher {
    pub fn new(store: Arc<dyn DispatchStore>) -> Self {
        Self { store }
    }

    /// Find the rule that applies to a ticket
    ///
    /// An unreadable or empty rule source means no rule applies.
    pub async fn find_match(&self, ticket: &TicketSnapshot) -> Option<AssignmentRule> {
        let rules = match self.store.active_rules().await {
            Ok(rules) => rules,
            Err(e) => {
                warn!("⚠️ Assignment rules unavailable, skipping rule evaluation: {}", e);
                return None;
            }
        };

        if rules.is_empty() {
            debug!("No active assignment rules");
            return None;
        }

        let matched = first_matching_rule(&rules, ticket).cloned();
        match &matched {
            Some(rule) => debug!("✅ Rule {} ({}) matched at priority {}", rule.name, rule.id, rule.priority),
            None => debug!("❌ None of {} active rules matched", rules.len()),
        }
        matched
    }
}
