//! Least-loaded agent selection
//!
//! "Round robin" in helpdesk terms: among a group's active members, pick the
//! one with the fewest tickets assigned since the start of the current day.
//!
//! Selection is read-then-decide with no reservation. Two tickets dispatched
//! at the same moment can both see the same minimum and land on the same
//! agent; balance is restored over subsequent tickets. Making this strict
//! would need an atomic counter reservation in the data store.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, FixedOffset, Local, NaiveTime, TimeZone, Utc};
use tracing::{debug, info, warn};

use crate::config::DayBoundary;
use crate::database::DispatchStore;

/// Source of the current instant
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock frozen at one instant, for replaying decisions
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Start of the day containing `now`, in the zone selected by `boundary`
pub fn start_of_day(now: DateTime<Utc>, boundary: DayBoundary) -> DateTime<Utc> {
    match boundary {
        DayBoundary::Utc => midnight_in(&Utc, now),
        DayBoundary::Local => midnight_in(&Local, now),
        DayBoundary::FixedOffset { offset_minutes } => {
            match FixedOffset::east_opt(offset_minutes.saturating_mul(60)) {
                Some(offset) => midnight_in(&offset, now),
                None => {
                    warn!("⚠️ Invalid day boundary offset {} minutes, using UTC", offset_minutes);
                    midnight_in(&Utc, now)
                }
            }
        }
    }
}

fn midnight_in<Tz: TimeZone>(tz: &Tz, now: DateTime<Utc>) -> DateTime<Utc> {
    let midnight = now.with_timezone(tz).date_naive().and_time(NaiveTime::MIN);
    // Midnight can fall in a DST gap; take the earliest valid instant
    tz.from_local_datetime(&midnight)
        .earliest()
        .map(|start| start.with_timezone(&Utc))
        .unwrap_or_else(|| Utc.from_utc_datetime(&midnight))
}

/// Member with the lowest count; ties go to the earliest member
///
/// Members missing from `counts` have zero tickets.
pub fn least_loaded<'a>(members: &'a [String], counts: &HashMap<String, u64>) -> Option<&'a str> {
    let mut best: Option<(&str, u64)> = None;

    for member in members {
        let count = counts.get(member).copied().unwrap_or(0);
        match best {
            Some((_, best_count)) if count >= best_count => {}
            _ => best = Some((member.as_str(), count)),
        }
    }

    best.map(|(member, _)| member)
}

/// Picks the least-loaded active member of a group
pub struct LoadBalancer {
    store: Arc<dyn DispatchStore>,
    clock: Arc<dyn Clock>,
    day_boundary: DayBoundary,
}

impl LoadBalancer {
    pub fn new(store: Arc<dyn DispatchStore>, clock: Arc<dyn Clock>, day_boundary: DayBoundary) -> Self {
        Self {
            store,
            clock,
            day_boundary,
        }
    }

    /// Choose an agent from `group_id`
    ///
    /// Returns `None` when the group has no active members or any lookup
    /// fails; the caller keeps the group assignment either way.
    pub async fn select_agent(&self, group_id: &str) -> Option<String> {
        let members = match self.store.active_group_members(group_id).await {
            Ok(members) => members,
            Err(e) => {
                warn!("⚠️ Members of group {} unavailable: {}", group_id, e);
                return None;
            }
        };

        if members.is_empty() {
            warn!("⚠️ Group {} has no active members", group_id);
            return None;
        }

        let since = start_of_day(self.clock.now(), self.day_boundary);
        let counts = match self.store.assignment_counts_since(&members, since).await {
            Ok(counts) => counts,
            Err(e) => {
                warn!("⚠️ Ticket counts for group {} unavailable: {}", group_id, e);
                return None;
            }
        };

        debug!("📊 Group {} loads since {}: {:?}", group_id, since, counts);

        let selected = least_loaded(&members, &counts).map(str::to_string);
        if let Some(agent_id) = &selected {
            info!(
                "🎯 Selected agent {} from group {} ({} tickets today)",
                agent_id,
                group_id,
                counts.get(agent_id).copied().unwrap_or(0)
            );
        }
        selected
    }
}
