//! # Helpdesk Dispatch Engine
//!
//! Routes newly created helpdesk tickets to a support group and, when the
//! configuration allows, to a specific agent.
//!
//! ## Routing Pipeline
//!
//! 1. **Rules**: active assignment rules are tried in priority order; the
//!    first whose conditions all hold decides the assignment
//! 2. **Category fallback**: the ticket's category chain is walked towards the
//!    root for a default group
//! 3. **Hardcoded defaults**: a software or endpoint group picked from the
//!    ticket's issue type
//!
//! Only a rule match reports `assigned = true`; the `source` field records
//! which stage produced the decision. Lookup failures never surface as
//! errors from [`DispatchEngine::dispatch`].
//!
//! ## Modules
//!
//! - [`routing`]: field resolution, condition evaluation, rule matching,
//!   load balancing, fallbacks and the engine itself
//! - [`database`]: the [`DispatchStore`] trait with in-memory and SQLite stores
//! - [`monitoring`]: dispatch counters
//! - [`config`]: layered configuration
//! - [`logging`]: tracing subscriber setup
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use helpdesk_dispatch_engine::prelude::*;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = DispatchConfig::default();
//!     let store = SqliteDispatchStore::connect(&config.database).await?;
//!
//!     let engine = DispatchEngine::new(Arc::new(store), config).await?;
//!
//!     let ticket = TicketSnapshot {
//!         priority: Some("urgent".to_string()),
//!         category: Some("network".to_string()),
//!         ..Default::default()
//!     };
//!     let decision = engine.dispatch(&ticket).await;
//!     println!("{:?}", decision);
//!
//!     Ok(())
//! }
//! ```

// Core modules
pub mod error;
pub mod config;
pub mod logging;
pub mod types;

// Routing
pub mod routing;
pub mod monitoring;

// Data access
pub mod database;

// Re-exports for convenience
pub use config::DispatchConfig;
pub use database::DispatchStore;
pub use error::{DispatchError, Result};
pub use routing::DispatchEngine;

/// Prelude module for convenient imports
pub mod prelude {
    // Core types
    pub use crate::{DispatchConfig, DispatchEngine, DispatchError, Result};

    // Configuration types
    pub use crate::config::{DatabaseConfig, DayBoundary, DefaultRoutingConfig, LoggingConfig, RoutingConfig};

    // Domain types
    pub use crate::types::{
        AssignToType, AssignmentDecision, AssignmentRule, AssignmentStrategy, Category, Condition,
        ConditionField, ConditionOperator, ConditionValue, DecisionSource, Group, GroupMember,
        TicketSnapshot,
    };

    // Routing types
    pub use crate::routing::{Clock, DefaultRouting, FixedClock, IssueBucket, SystemClock};

    // Monitoring types
    pub use crate::monitoring::DispatchStats;

    // Database types
    pub use crate::database::{DispatchStore, InMemoryStore, SqliteDispatchStore};

    // Common external types
    pub use chrono::{DateTime, Utc};
}
