//! SQLite schema for the dispatch store
//!
//! Every statement is idempotent so the schema can be applied on each start.

use sqlx::SqlitePool;
use tracing::debug;

use crate::error::Result;

/// Create the assignment rules table
pub async fn create_assignment_rules_table(pool: &SqlitePool) -> Result<()> {
    debug!("📋 Creating assignment_rules table");

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS assignment_rules (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            conditions TEXT NOT NULL DEFAULT '[]',
            assign_to_type TEXT NOT NULL,
            assign_to_id TEXT NOT NULL,
            priority INTEGER NOT NULL DEFAULT 100,
            is_active INTEGER NOT NULL DEFAULT 1,
            tickets_routed INTEGER NOT NULL DEFAULT 0,
            created_seq INTEGER NOT NULL DEFAULT 0
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Create the support groups table
pub async fn create_support_groups_table(pool: &SqlitePool) -> Result<()> {
    debug!("📋 Creating support_groups table");

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS support_groups (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            name_key TEXT NOT NULL,
            supervisor_id TEXT,
            assign_tasks_first INTEGER NOT NULL DEFAULT 0
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Create the group members table
pub async fn create_group_members_table(pool: &SqlitePool) -> Result<()> {
    debug!("📋 Creating group_members table");

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS group_members (
            group_id TEXT NOT NULL,
            agent_id TEXT NOT NULL,
            is_active INTEGER NOT NULL DEFAULT 1,
            position INTEGER NOT NULL,
            PRIMARY KEY (group_id, agent_id),
            FOREIGN KEY (group_id) REFERENCES support_groups(id) ON DELETE CASCADE
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Create the categories table
pub async fn create_categories_table(pool: &SqlitePool) -> Result<()> {
    debug!("📋 Creating categories table");

    // No foreign key on parent_id: the fallback walk tolerates dangling parents
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS categories (
            id TEXT PRIMARY KEY,
            name TEXT,
            name_key TEXT,
            parent_id TEXT,
            default_group_id TEXT,
            assignment_strategy TEXT NOT NULL DEFAULT 'manual'
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Create the tickets table
///
/// Only the columns the load balancer reads are kept here.
pub async fn create_tickets_table(pool: &SqlitePool) -> Result<()> {
    debug!("📋 Creating tickets table");

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS tickets (
            id TEXT PRIMARY KEY,
            assigned_to TEXT,
            group_id TEXT,
            created_at_ms INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Create indexes for the routing queries
pub async fn create_indexes(pool: &SqlitePool) -> Result<()> {
    debug!("📋 Creating dispatch indexes");

    let statements = [
        "CREATE INDEX IF NOT EXISTS idx_rules_active_priority ON assignment_rules(is_active, priority, created_seq)",
        "CREATE INDEX IF NOT EXISTS idx_group_members_group ON group_members(group_id, position)",
        "CREATE INDEX IF NOT EXISTS idx_groups_name ON support_groups(name_key)",
        "CREATE INDEX IF NOT EXISTS idx_categories_name ON categories(name_key)",
        "CREATE INDEX IF NOT EXISTS idx_tickets_assignee_created ON tickets(assigned_to, created_at_ms)",
    ];

    for statement in statements {
        sqlx::query(statement).execute(pool).await?;
    }

    Ok(())
}

/// Apply the full schema
pub async fn initialize(pool: &SqlitePool) -> Result<()> {
    create_assignment_rules_table(pool).await?;
    create_support_groups_table(pool).await?;
    create_group_members_table(pool).await?;
    create_categories_table(pool).await?;
    create_tickets_table(pool).await?;
    create_indexes(pool).await?;

    debug!("✅ Dispatch schema ready");
    Ok(())
}
