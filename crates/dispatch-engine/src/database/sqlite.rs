//! SQLite dispatch store built on sqlx

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use tracing::{debug, info, warn};

use super::{name_key, schema, DispatchStore};
use crate::config::DatabaseConfig;
use crate::error::{DispatchError, Result};
use crate::types::{AssignToType, AssignmentRule, AssignmentStrategy, Category, Condition, Group, GroupMember};

/// Dispatch store persisted in SQLite
#[derive(Clone)]
pub struct SqliteDispatchStore {
    pool: SqlitePool,
}

#[derive(sqlx::FromRow, Debug)]
struct RuleRow {
    id: String,
    name: String,
    conditions: String,
    assign_to_type: String,
    assign_to_id: String,
    priority: i64,
    is_active: bool,
    tickets_routed: i64,
}

#[derive(sqlx::FromRow, Debug)]
struct GroupRow {
    id: String,
    name: String,
    supervisor_id: Option<String>,
    assign_tasks_first: bool,
}

#[derive(sqlx::FromRow, Debug)]
struct MemberRow {
    agent_id: String,
    is_active: bool,
}

#[derive(sqlx::FromRow, Debug)]
struct CategoryRow {
    id: String,
    name: Option<String>,
    parent_id: Option<String>,
    default_group_id: Option<String>,
    assignment_strategy: String,
}

impl TryFrom<RuleRow> for AssignmentRule {
    type Error = DispatchError;

    fn try_from(row: RuleRow) -> Result<Self> {
        let conditions: Vec<Condition> = serde_json::from_str(&row.conditions)?;
        let assign_to_type: AssignToType = row
            .assign_to_type
            .parse()
            .map_err(DispatchError::invalid_input)?;

        Ok(AssignmentRule {
            id: row.id,
            name: row.name,
            conditions,
            assign_to_type,
            assign_to_id: row.assign_to_id,
            priority: row.priority,
            is_active: row.is_active,
            tickets_routed: row.tickets_routed,
        })
    }
}

impl From<CategoryRow> for Category {
    fn from(row: CategoryRow) -> Self {
        let assignment_strategy = row
            .assignment_strategy
            .parse()
            .unwrap_or(AssignmentStrategy::Other);

        Category {
            id: row.id,
            name: row.name,
            parent_id: row.parent_id,
            default_group_id: row.default_group_id,
            assignment_strategy,
        }
    }
}

impl SqliteDispatchStore {
    /// Connect using the database configuration and apply the schema
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        info!("🗄️ Opening dispatch database at: {}", config.database_url);

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .connect(&config.database_url)
            .await?;

        Self::from_pool(pool).await
    }

    /// Create in-memory database for testing
    ///
    /// The pool is pinned to a single connection that never expires, since
    /// every SQLite memory connection is its own database.
    pub async fn new_in_memory() -> Result<Self> {
        info!("🗄️ Creating in-memory dispatch database");

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await?;

        Self::from_pool(pool).await
    }

    /// Wrap an existing pool and apply the schema
    pub async fn from_pool(pool: SqlitePool) -> Result<Self> {
        schema::initialize(&pool).await?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Insert or update a rule
    ///
    /// Updating keeps the rule's original position among equal priorities and
    /// its `tickets_routed` counter.
    pub async fn insert_rule(&self, rule: &AssignmentRule) -> Result<()> {
        debug!("🎯 Storing assignment rule {} ({})", rule.name, rule.id);

        let conditions = serde_json::to_string(&rule.conditions)?;

        sqlx::query(
            r#"
            INSERT INTO assignment_rules (
                id, name, conditions, assign_to_type, assign_to_id,
                priority, is_active, tickets_routed, created_seq
            ) VALUES (
                ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8,
                (SELECT COALESCE(MAX(created_seq), 0) + 1 FROM assignment_rules)
            )
            ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                conditions = excluded.conditions,
                assign_to_type = excluded.assign_to_type,
                assign_to_id = excluded.assign_to_id,
                priority = excluded.priority,
                is_active = excluded.is_active
            "#,
        )
        .bind(&rule.id)
        .bind(&rule.name)
        .bind(conditions)
        .bind(rule.assign_to_type.as_str())
        .bind(&rule.assign_to_id)
        .bind(rule.priority)
        .bind(rule.is_active)
        .bind(rule.tickets_routed)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Enable or disable a rule
    pub async fn set_rule_active(&self, rule_id: &str, is_active: bool) -> Result<()> {
        let result = sqlx::query("UPDATE assignment_rules SET is_active = ?1 WHERE id = ?2")
            .bind(is_active)
            .bind(rule_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DispatchError::not_found(format!("Rule not found: {}", rule_id)));
        }
        Ok(())
    }

    /// Current `tickets_routed` value of a rule
    pub async fn rule_usage(&self, rule_id: &str) -> Result<Option<i64>> {
        let usage = sqlx::query_scalar::<_, i64>(
            "SELECT tickets_routed FROM assignment_rules WHERE id = ?1",
        )
        .bind(rule_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(usage)
    }

    /// Insert or replace a group together with its membership list
    pub async fn insert_group(&self, group: &Group) -> Result<()> {
        debug!("👥 Storing group {} ({}) with {} members", group.name, group.id, group.members.len());

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO support_groups (id, name, name_key, supervisor_id, assign_tasks_first)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                name_key = excluded.name_key,
                supervisor_id = excluded.supervisor_id,
                assign_tasks_first = excluded.assign_tasks_first
            "#,
        )
        .bind(&group.id)
        .bind(&group.name)
        .bind(name_key(&group.name))
        .bind(&group.supervisor_id)
        .bind(group.assign_tasks_first)
        .execute(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM group_members WHERE group_id = ?1")
            .bind(&group.id)
            .execute(&mut *tx)
            .await?;

        for (position, member) in group.members.iter().enumerate() {
            sqlx::query(
                "INSERT INTO group_members (group_id, agent_id, is_active, position) VALUES (?1, ?2, ?3, ?4)",
            )
            .bind(&group.id)
            .bind(&member.agent_id)
            .bind(member.is_active)
            .bind(position as i64)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    /// Insert or replace a category
    pub async fn insert_category(&self, category: &Category) -> Result<()> {
        debug!("🗂️ Storing category {}", category.id);

        sqlx::query(
            r#"
            INSERT INTO categories (id, name, name_key, parent_id, default_group_id, assignment_strategy)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                name_key = excluded.name_key,
                parent_id = excluded.parent_id,
                default_group_id = excluded.default_group_id,
                assignment_strategy = excluded.assignment_strategy
            "#,
        )
        .bind(&category.id)
        .bind(&category.name)
        .bind(category.name.as_deref().map(name_key))
        .bind(&category.parent_id)
        .bind(&category.default_group_id)
        .bind(category.assignment_strategy.as_str())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Record a created ticket so it counts towards its assignee's load
    pub async fn record_ticket(
        &self,
        ticket_id: &str,
        assigned_to: Option<&str>,
        group_id: Option<&str>,
        created_at: DateTime<Utc>,
    ) -> Result<()> {
        sqlx::query(
            "INSERT INTO tickets (id, assigned_to, group_id, created_at_ms) VALUES (?1, ?2, ?3, ?4)",
        )
        .bind(ticket_id)
        .bind(assigned_to)
        .bind(group_id)
        .bind(created_at.timestamp_millis())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn load_members(&self, group_id: &str) -> Result<Vec<GroupMember>> {
        let rows = sqlx::query_as::<_, MemberRow>(
            "SELECT agent_id, is_active FROM group_members WHERE group_id = ?1 ORDER BY position ASC",
        )
        .bind(group_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| GroupMember {
                agent_id: row.agent_id,
                is_active: row.is_active,
            })
            .collect())
    }

    async fn group_from_row(&self, row: GroupRow) -> Result<Group> {
        let members = self.load_members(&row.id).await?;
        Ok(Group {
            id: row.id,
            name: row.name,
            members,
            supervisor_id: row.supervisor_id,
            assign_tasks_first: row.assign_tasks_first,
        })
    }
}

#[async_trait]
impl DispatchStore for SqliteDispatchStore {
    async fn active_rules(&self) -> Result<Vec<AssignmentRule>> {
        let rows = sqlx::query_as::<_, RuleRow>(
            r#"
            SELECT id, name, conditions, assign_to_type, assign_to_id,
                   priority, is_active, tickets_routed
            FROM assignment_rules
            WHERE is_active = 1
            ORDER BY priority ASC, created_seq ASC, id ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let mut rules = Vec::with_capacity(rows.len());
        for row in rows {
            let rule_id = row.id.clone();
            match AssignmentRule::try_from(row) {
                Ok(rule) => rules.push(rule),
                Err(e) => warn!("⚠️ Skipping unreadable assignment rule {}: {}", rule_id, e),
            }
        }

        debug!("📋 Loaded {} active rules", rules.len());
        Ok(rules)
    }

    async fn get_group(&self, group_id: &str) -> Result<Option<Group>> {
        let row = sqlx::query_as::<_, GroupRow>(
            "SELECT id, name, supervisor_id, assign_tasks_first FROM support_groups WHERE id = ?1",
        )
        .bind(group_id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(Some(self.group_from_row(row).await?)),
            None => Ok(None),
        }
    }

    async fn find_group_by_name(&self, name: &str) -> Result<Option<Group>> {
        let row = sqlx::query_as::<_, GroupRow>(
            r#"
            SELECT id, name, supervisor_id, assign_tasks_first
            FROM support_groups
            WHERE name_key = ?1
            ORDER BY id ASC
            LIMIT 1
            "#,
        )
        .bind(name_key(name))
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(Some(self.group_from_row(row).await?)),
            None => Ok(None),
        }
    }

    async fn active_group_members(&self, group_id: &str) -> Result<Vec<String>> {
        let members = sqlx::query_scalar::<_, String>(
            "SELECT agent_id FROM group_members WHERE group_id = ?1 AND is_active = 1 ORDER BY position ASC",
        )
        .bind(group_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(members)
    }

    async fn assignment_counts_since(
        &self,
        agent_ids: &[String],
        since: DateTime<Utc>,
    ) -> Result<HashMap<String, u64>> {
        if agent_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(
            "SELECT assigned_to, COUNT(*) AS ticket_count FROM tickets WHERE created_at_ms >= ",
        );
        builder.push_bind(since.timestamp_millis());
        builder.push(" AND assigned_to IN (");
        let mut separated = builder.separated(", ");
        for agent_id in agent_ids {
            separated.push_bind(agent_id.as_str());
        }
        separated.push_unseparated(")");
        builder.push(" GROUP BY assigned_to");

        let rows: Vec<(String, i64)> = builder.build_query_as().fetch_all(&self.pool).await?;

        Ok(rows
            .into_iter()
            .map(|(agent_id, count)| (agent_id, u64::try_from(count).unwrap_or(0)))
            .collect())
    }

    async fn get_category(&self, key: &str) -> Result<Option<Category>> {
        let by_id = sqlx::query_as::<_, CategoryRow>(
            "SELECT id, name, parent_id, default_group_id, assignment_strategy FROM categories WHERE id = ?1",
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(row) = by_id {
            return Ok(Some(row.into()));
        }

        let by_name = sqlx::query_as::<_, CategoryRow>(
            r#"
            SELECT id, name, parent_id, default_group_id, assignment_strategy
            FROM categories
            WHERE name_key = ?1
            ORDER BY id ASC
            LIMIT 1
            "#,
        )
        .bind(name_key(key))
        .fetch_optional(&self.pool)
        .await?;

        Ok(by_name.map(Category::from))
    }

    async fn increment_rule_usage(&self, rule_id: &str) -> Result<()> {
        let result = sqlx::query(
            "UPDATE assignment_rules SET tickets_routed = tickets_routed + 1 WHERE id = ?1",
        )
        .bind(rule_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DispatchError::not_found(format!("Rule not found: {}", rule_id)));
        }
        Ok(())
    }
}
