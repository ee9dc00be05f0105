//! Property tests for rule matching, condition evaluation and agent selection

use std::collections::HashMap;

use proptest::prelude::*;

use helpdesk_dispatch_engine::prelude::*;
use helpdesk_dispatch_engine::routing::conditions::{evaluate, evaluate_all};
use helpdesk_dispatch_engine::routing::load_balancer::least_loaded;
use helpdesk_dispatch_engine::routing::rules::first_matching_rule;

static PRIORITIES: [&str; 4] = ["urgent", "high", "low", "Urgent "];

fn rule_strategy() -> impl Strategy<Value = AssignmentRule> {
    (
        0i64..5,
        prop::collection::vec(prop::sample::select(&PRIORITIES[..]), 0..3),
        any::<bool>(),
    )
        .prop_map(|(priority, values, active)| {
            let mut rule = AssignmentRule::new("generated", priority, AssignToType::Group, "g");
            for value in values {
                rule = rule.with_condition(Condition::new(
                    ConditionField::Priority,
                    ConditionOperator::Equals,
                    value,
                ));
            }
            if !active {
                rule = rule.inactive();
            }
            rule
        })
}

fn ticket_strategy() -> impl Strategy<Value = TicketSnapshot> {
    prop::option::of(prop::sample::select(&PRIORITIES[..])).prop_map(|priority| TicketSnapshot {
        priority: priority.map(str::to_string),
        ..Default::default()
    })
}

proptest! {
    #[test]
    fn matched_rule_is_first_eligible_and_never_empty(
        rules in prop::collection::vec(rule_strategy(), 0..8),
        ticket in ticket_strategy(),
    ) {
        match first_matching_rule(&rules, &ticket) {
            Some(matched) => {
                prop_assert!(!matched.conditions.is_empty());
                prop_assert!(matched.is_active);
                prop_assert!(evaluate_all(&matched.conditions, &ticket));

                let position = rules.iter().position(|rule| std::ptr::eq(rule, matched)).unwrap();
                for earlier in &rules[..position] {
                    let eligible = earlier.is_active && !earlier.conditions.is_empty();
                    prop_assert!(!(eligible && evaluate_all(&earlier.conditions, &ticket)));
                }
            }
            None => {
                for rule in &rules {
                    let eligible = rule.is_active && !rule.conditions.is_empty();
                    prop_assert!(!(eligible && evaluate_all(&rule.conditions, &ticket)));
                }
            }
        }
    }

    #[test]
    fn equals_ignores_case_and_surrounding_whitespace(
        word in "[a-z]{1,12}",
        left_pad in " {0,3}",
        right_pad in " {0,3}",
    ) {
        let ticket = TicketSnapshot {
            department: Some(format!("{}{}{}", left_pad, word.to_uppercase(), right_pad)),
            ..Default::default()
        };
        let condition = Condition::new(ConditionField::Department, ConditionOperator::Equals, word.as_str());
        prop_assert!(evaluate(&condition, &ticket));
    }

    #[test]
    fn in_matches_exactly_the_listed_values(
        listed in prop::collection::vec("[a-z]{1,6}", 1..5),
        candidate in "[a-z]{1,6}",
    ) {
        let ticket = TicketSnapshot {
            source: Some(candidate.clone()),
            ..Default::default()
        };
        let csv = listed.join(" , ");
        let condition = Condition::new(ConditionField::Source, ConditionOperator::In, csv);
        prop_assert_eq!(evaluate(&condition, &ticket), listed.contains(&candidate));
    }

    #[test]
    fn least_loaded_picks_first_member_with_minimum(
        loads in prop::collection::vec(0u64..4, 1..8),
    ) {
        let members: Vec<String> = (0..loads.len()).map(|i| format!("agent-{}", i)).collect();
        // Zero counts are left out of the map, as the store may do
        let counts: HashMap<String, u64> = members
            .iter()
            .zip(&loads)
            .filter(|(_, load)| **load > 0)
            .map(|(member, load)| (member.clone(), *load))
            .collect();

        let minimum = loads.iter().copied().min().unwrap();
        let expected = loads.iter().position(|load| *load == minimum).unwrap();

        prop_assert_eq!(least_loaded(&members, &counts), Some(members[expected].as_str()));
    }
}
