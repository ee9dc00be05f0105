//! Condition evaluation
//!
//! All comparisons are case-insensitive and ignore surrounding whitespace.
//! Anything the evaluator cannot interpret yields `false`, so a malformed
//! condition can only make a rule stop matching.

use tracing::trace;

use super::fields;
use crate::types::{Condition, ConditionOperator, ConditionValue, TicketSnapshot};

/// Evaluate one condition against a ticket
pub fn evaluate(condition: &Condition, ticket: &TicketSnapshot) -> bool {
    let Some(actual) = fields::resolve(condition.field, ticket) else {
        trace!("condition on {} unsatisfiable: field absent", condition.field);
        return false;
    };
    let actual = normalize(actual);

    match condition.operator {
        ConditionOperator::Equals => equals(&actual, &condition.value),
        ConditionOperator::NotEquals => match &condition.value {
            ConditionValue::Text(expected) => actual != normalize(expected),
            ConditionValue::List(_) => false,
        },
        ConditionOperator::Contains => match &condition.value {
            ConditionValue::Text(expected) => actual.contains(&normalize(expected)),
            ConditionValue::List(_) => false,
        },
        ConditionOperator::In => in_elements(&condition.value).iter().any(|element| *element == actual),
        ConditionOperator::Unknown => false,
    }
}

/// Every condition holds; an empty list is vacuously true here, callers
/// decide whether empty rules are eligible
pub fn evaluate_all(conditions: &[Condition], ticket: &TicketSnapshot) -> bool {
    conditions.iter().all(|condition| evaluate(condition, ticket))
}

fn equals(actual: &str, expected: &ConditionValue) -> bool {
    match expected {
        ConditionValue::Text(expected) => actual == normalize(expected),
        ConditionValue::List(_) => false,
    }
}

/// Split an `in` operand into normalized elements
///
/// Accepts a native list or a comma-separated string; empty elements are
/// dropped.
pub fn in_elements(value: &ConditionValue) -> Vec<String> {
    let raw: Vec<&str> = match value {
        ConditionValue::List(items) => items.iter().map(String::as_str).collect(),
        ConditionValue::Text(text) => text.split(',').collect(),
    };

    raw.into_iter()
        .map(normalize)
        .filter(|element| !element.is_empty())
        .collect()
}

fn normalize(value: &str) -> String {
    value.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ConditionField;

    fn ticket() -> TicketSnapshot {
        TicketSnapshot {
            priority: Some(" urgent ".to_string()),
            department: Some("Finance".to_string()),
            subject: Some("VPN keeps Disconnecting".to_string()),
            source: Some("email".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_equals_ignores_case_and_whitespace() {
        let condition = Condition::new(ConditionField::Priority, ConditionOperator::Equals, "Urgent");
        assert!(evaluate(&condition, &ticket()));

        let condition = Condition::new(ConditionField::Priority, ConditionOperator::Equals, "low");
        assert!(!evaluate(&condition, &ticket()));
    }

    #[test]
    fn test_not_equals_negates() {
        let condition = Condition::new(ConditionField::Source, ConditionOperator::NotEquals, "portal");
        assert!(evaluate(&condition, &ticket()));

        let condition = Condition::new(ConditionField::Source, ConditionOperator::NotEquals, " EMAIL");
        assert!(!evaluate(&condition, &ticket()));
    }

    #[test]
    fn test_not_equals_on_missing_field_is_false() {
        let condition = Condition::new(ConditionField::UserType, ConditionOperator::NotEquals, "vip");
        assert!(!evaluate(&condition, &ticket()));
    }

    #[test]
    fn test_contains_is_substring_of_ticket_value() {
        let condition = Condition::new(ConditionField::Subject, ConditionOperator::Contains, "vpn");
        assert!(evaluate(&condition, &ticket()));

        let condition = Condition::new(ConditionField::Subject, ConditionOperator::Contains, "printer");
        assert!(!evaluate(&condition, &ticket()));
    }

    #[test]
    fn test_in_with_comma_separated_string() {
        let condition = Condition::new(ConditionField::Department, ConditionOperator::In, "hr, finance,it");
        assert!(evaluate(&condition, &ticket()));

        for department in ["a", " B ", "c"] {
            let ticket = TicketSnapshot {
                department: Some(department.to_string()),
                ..Default::default()
            };
            let condition = Condition::new(ConditionField::Department, ConditionOperator::In, "a, b,c");
            assert!(evaluate(&condition, &ticket), "expected {:?} to match", department);
        }
    }

    #[test]
    fn test_in_with_native_list() {
        let condition = Condition::new(
            ConditionField::Department,
            ConditionOperator::In,
            vec![" FINANCE ", "legal"],
        );
        assert!(evaluate(&condition, &ticket()));

        let condition = Condition::new(ConditionField::Department, ConditionOperator::In, vec!["legal"]);
        assert!(!evaluate(&condition, &ticket()));
    }

    #[test]
    fn test_in_elements_drop_empty_entries() {
        assert_eq!(
            in_elements(&ConditionValue::from("a,, b ,")),
            vec!["a".to_string(), "b".to_string()]
        );
    }

    #[test]
    fn test_unknown_operator_and_field_fail_closed() {
        let condition = Condition::new(ConditionField::Priority, ConditionOperator::Unknown, "urgent");
        assert!(!evaluate(&condition, &ticket()));

        let condition = Condition::new(ConditionField::Unknown, ConditionOperator::Equals, "urgent");
        assert!(!evaluate(&condition, &ticket()));
    }

    #[test]
    fn test_list_value_with_scalar_operator_fails_closed() {
        let condition = Condition::new(ConditionField::Priority, ConditionOperator::Equals, vec!["urgent"]);
        assert!(!evaluate(&condition, &ticket()));
    }
}
