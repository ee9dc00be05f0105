//! Core types for the dispatch engine

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Ticket data as captured by intake, read-only for the duration of routing
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TicketSnapshot {
    pub category: Option<String>,
    pub priority: Option<String>,
    pub department: Option<String>,
    pub user_type: Option<String>,
    pub subject: Option<String>,
    pub source: Option<String>,
    pub issue_type: Option<String>,
    pub ticket_type: Option<String>,
}

/// Ticket field a rule condition can inspect
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionField {
    Category,
    Priority,
    Department,
    UserType,
    Subject,
    Source,
    TicketType,
    /// Anything the engine does not know how to read; never resolves
    #[serde(other)]
    Unknown,
}

impl ConditionField {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConditionField::Category => "category",
            ConditionField::Priority => "priority",
            ConditionField::Department => "department",
            ConditionField::UserType => "user_type",
            ConditionField::Subject => "subject",
            ConditionField::Source => "source",
            ConditionField::TicketType => "ticket_type",
            ConditionField::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ConditionField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConditionField {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_lowercase().as_str() {
            "category" => ConditionField::Category,
            "priority" => ConditionField::Priority,
            "department" => ConditionField::Department,
            "user_type" => ConditionField::UserType,
            "subject" => ConditionField::Subject,
            "source" => ConditionField::Source,
            "ticket_type" => ConditionField::TicketType,
            _ => ConditionField::Unknown,
        })
    }
}

/// Comparison applied by a condition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionOperator {
    Equals,
    NotEquals,
    Contains,
    In,
    /// Unrecognised operator; always evaluates to false
    #[serde(other)]
    Unknown,
}

/// Right-hand side of a condition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConditionValue {
    List(Vec<String>),
    Text(String),
}

impl From<&str> for ConditionValue {
    fn from(value: &str) -> Self {
        ConditionValue::Text(value.to_string())
    }
}

impl From<String> for ConditionValue {
    fn from(value: String) -> Self {
        ConditionValue::Text(value)
    }
}

impl From<Vec<String>> for ConditionValue {
    fn from(values: Vec<String>) -> Self {
        ConditionValue::List(values)
    }
}

impl From<Vec<&str>> for ConditionValue {
    fn from(values: Vec<&str>) -> Self {
        ConditionValue::List(values.into_iter().map(str::to_string).collect())
    }
}

/// A single rule condition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Condition {
    pub field: ConditionField,
    pub operator: ConditionOperator,
    pub value: ConditionValue,
}

impl Condition {
    pub fn new(
        field: ConditionField,
        operator: ConditionOperator,
        value: impl Into<ConditionValue>,
    ) -> Self {
        Self {
            field,
            operator,
            value: value.into(),
        }
    }
}

/// What a matching rule assigns the ticket to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssignToType {
    Group,
    Agent,
    RoundRobin,
}

impl AssignToType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssignToType::Group => "group",
            AssignToType::Agent => "agent",
            AssignToType::RoundRobin => "round_robin",
        }
    }
}

impl fmt::Display for AssignToType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AssignToType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "group" => Ok(AssignToType::Group),
            "agent" => Ok(AssignToType::Agent),
            "round_robin" => Ok(AssignToType::RoundRobin),
            other => Err(format!("Unknown assign_to_type: {}", other)),
        }
    }
}

/// Ordered, conditionally-triggered routing directive
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignmentRule {
    pub id: String,
    pub name: String,
    pub conditions: Vec<Condition>,
    pub assign_to_type: AssignToType,
    pub assign_to_id: String,
    /// Lower numbers are evaluated first
    pub priority: i64,
    pub is_active: bool,
    pub tickets_routed: i64,
}

impl AssignmentRule {
    /// Create an active rule with a generated id
    pub fn new(
        name: impl Into<String>,
        priority: i64,
        assign_to_type: AssignToType,
        assign_to_id: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            conditions: Vec::new(),
            assign_to_type,
            assign_to_id: assign_to_id.into(),
            priority,
            is_active: true,
            tickets_routed: 0,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_condition(mut self, condition: Condition) -> Self {
        self.conditions.push(condition);
        self
    }

    pub fn inactive(mut self) -> Self {
        self.is_active = false;
        self
    }
}

/// Group membership entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupMember {
    pub agent_id: String,
    pub is_active: bool,
}

/// A team of agents tickets can be routed to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub id: String,
    pub name: String,
    /// Members in enumeration order; ties in load balancing go to the earliest
    pub members: Vec<GroupMember>,
    pub supervisor_id: Option<String>,
    /// Hand manually-routed tickets straight to the supervisor
    pub assign_tasks_first: bool,
}

impl Group {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            members: Vec::new(),
            supervisor_id: None,
            assign_tasks_first: false,
        }
    }

    pub fn with_member(mut self, agent_id: impl Into<String>) -> Self {
        self.members.push(GroupMember {
            agent_id: agent_id.into(),
            is_active: true,
        });
        self
    }

    pub fn with_inactive_member(mut self, agent_id: impl Into<String>) -> Self {
        self.members.push(GroupMember {
            agent_id: agent_id.into(),
            is_active: false,
        });
        self
    }

    pub fn with_supervisor(mut self, supervisor_id: impl Into<String>, assign_tasks_first: bool) -> Self {
        self.supervisor_id = Some(supervisor_id.into());
        self.assign_tasks_first = assign_tasks_first;
        self
    }

    /// Ids of active members, in enumeration order
    pub fn active_members(&self) -> Vec<String> {
        self.members
            .iter()
            .filter(|member| member.is_active)
            .map(|member| member.agent_id.clone())
            .collect()
    }
}

/// How an agent is chosen once a category supplies a group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssignmentStrategy {
    RoundRobin,
    Manual,
    #[serde(other)]
    Other,
}

impl AssignmentStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssignmentStrategy::RoundRobin => "round_robin",
            AssignmentStrategy::Manual => "manual",
            AssignmentStrategy::Other => "other",
        }
    }
}

impl fmt::Display for AssignmentStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AssignmentStrategy {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_lowercase().as_str() {
            "round_robin" => AssignmentStrategy::RoundRobin,
            "manual" => AssignmentStrategy::Manual,
            _ => AssignmentStrategy::Other,
        })
    }
}

/// Ticket category node; categories form a forest through `parent_id`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: String,
    pub name: Option<String>,
    pub parent_id: Option<String>,
    pub default_group_id: Option<String>,
    pub assignment_strategy: AssignmentStrategy,
}

impl Category {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: None,
            parent_id: None,
            default_group_id: None,
            assignment_strategy: AssignmentStrategy::Manual,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_parent(mut self, parent_id: impl Into<String>) -> Self {
        self.parent_id = Some(parent_id.into());
        self
    }

    pub fn with_default_group(mut self, group_id: impl Into<String>, strategy: AssignmentStrategy) -> Self {
        self.default_group_id = Some(group_id.into());
        self.assignment_strategy = strategy;
        self
    }
}

/// Which stage of the pipeline produced a decision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionSource {
    Rule,
    CategoryFallback,
    HardcodedDefault,
}

impl fmt::Display for DecisionSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecisionSource::Rule => write!(f, "rule"),
            DecisionSource::CategoryFallback => write!(f, "category_fallback"),
            DecisionSource::HardcodedDefault => write!(f, "hardcoded_default"),
        }
    }
}

/// Outcome of one dispatch call
///
/// `assigned` is true only when a rule fired. Fallback stages may still fill
/// in `group_id`; `source` records which stage did. A decision with no
/// source and no ids means the ticket stays in the manual triage queue.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignmentDecision {
    pub assigned: bool,
    pub group_id: Option<String>,
    pub agent_id: Option<String>,
    pub source: Option<DecisionSource>,
    pub rule_id: Option<String>,
    /// Category that supplied the group on the fallback path
    pub category_id: Option<String>,
}

impl AssignmentDecision {
    /// Nothing could route the ticket
    pub fn unassigned() -> Self {
        Self::default()
    }

    pub fn is_routed(&self) -> bool {
        self.group_id.is_some() || self.agent_id.is_some()
    }
}
