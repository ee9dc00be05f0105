//! # Ticket Routing
//!
//! Decides which group and, where possible, which agent a new ticket goes to.
//!
//! ## Components
//!
//! - [`fields`]: reads a named field off a [`TicketSnapshot`](crate::types::TicketSnapshot)
//! - [`conditions`]: evaluates one rule condition, failing closed
//! - [`rules`]: first-match selection over priority-ordered rules
//! - [`load_balancer`]: least-loaded agent selection over today's tickets
//! - [`fallback`]: category chain walk and hardcoded default buckets
//! - [`engine`]: the [`DispatchEngine`] tying the stages together

pub mod fields;
pub mod conditions;
pub mod rules;
pub mod load_balancer;
pub mod fallback;
pub mod engine;

pub use engine::DispatchEngine;
pub use fallback::{CategoryFallback, CategoryRoute, DefaultRouting, IssueBucket};
pub use load_balancer::{Clock, FixedClock, LoadBalancer, SystemClock};
pub use rules::RuleMatcher;
