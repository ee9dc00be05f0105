//! Field resolution against a ticket snapshot

use crate::types::{ConditionField, TicketSnapshot};

/// Read the value a condition field refers to
///
/// `category` falls back to `issue_type`; ticket data uses the two
/// interchangeably. Blank values count as absent. Unknown fields resolve to
/// `None`.
pub fn resolve(field: ConditionField, ticket: &TicketSnapshot) -> Option<&str> {
    match field {
        ConditionField::Category => present(&ticket.category).or_else(|| present(&ticket.issue_type)),
        ConditionField::Priority => present(&ticket.priority),
        ConditionField::Department => present(&ticket.department),
        ConditionField::UserType => present(&ticket.user_type),
        ConditionField::Subject => present(&ticket.subject),
        ConditionField::Source => present(&ticket.source),
        ConditionField::TicketType => present(&ticket.ticket_type),
        ConditionField::Unknown => None,
    }
}

/// Resolve a field given by name
pub fn resolve_by_name<'a>(field_name: &str, ticket: &'a TicketSnapshot) -> Option<&'a str> {
    let field = field_name.parse().unwrap_or(ConditionField::Unknown);
    resolve(field, ticket)
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.trim().is_empty())
}
