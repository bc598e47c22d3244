//! Status of one attendance day from punch times and the employee's
//! remaining late/permission allowances for the cycle.

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::payroll::attendance::DayStatus;

/// Late marks allowed per cycle.
pub const LATE_LIMIT: u32 = 3;
/// Permissions allowed per cycle.
pub const PERMISSION_LIMIT: u32 = 2;

const fn hm(hour: u32, min: u32) -> NaiveTime {
    match NaiveTime::from_hms_opt(hour, min, 0) {
        Some(t) => t,
        None => panic!("invalid time constant"),
    }
}

pub const GRACE_UNTIL: NaiveTime = hm(9, 16);
pub const LATE_UNTIL: NaiveTime = hm(9, 30);
pub const PERMISSION_UNTIL: NaiveTime = hm(11, 0);
pub const HALF_DAY_UNTIL: NaiveTime = hm(13, 0);
pub const EARLY_EXIT_FROM: NaiveTime = hm(15, 30);
pub const FULL_DAY_FROM: NaiveTime = hm(17, 30);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, ToSchema)]
pub struct DayPunch {
    #[serde(default)]
    #[schema(value_type = Option<String>, example = "09:20:00")]
    pub time_in: Option<NaiveTime>,
    #[serde(default)]
    #[schema(value_type = Option<String>, example = "17:45:00")]
    pub time_out: Option<NaiveTime>,
    #[serde(default)]
    pub is_weekly_off: bool,
    #[serde(default)]
    pub is_holiday: bool,
}

/// Allowances already used in the current cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct AllowanceCounters {
    #[serde(default)]
    pub late: u32,
    #[serde(default)]
    pub permission: u32,
}

impl AllowanceCounters {
    pub fn apply(&mut self, decision: &DayDecision) {
        self.late += decision.late_used;
        self.permission += decision.permission_used;
    }

    pub fn late_left(&self) -> bool {
        self.late < LATE_LIMIT
    }

    pub fn permission_left(&self) -> bool {
        self.permission < PERMISSION_LIMIT
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct DayDecision {
    #[schema(value_type = String, example = "P")]
    pub status: DayStatus,
    pub late_used: u32,
    pub permission_used: u32,
}

impl DayDecision {
    fn only(status: DayStatus) -> Self {
        Self {
            status,
            late_used: 0,
            permission_used: 0,
        }
    }
}

// midnight is how sheets record a missing punch
fn punch(t: Option<NaiveTime>) -> Option<NaiveTime> {
    t.filter(|t| *t != NaiveTime::MIN)
}

/// Decides the day's status. `counters` is a snapshot and is not changed;
/// feed the result to [`AllowanceCounters::apply`] to advance it.
pub fn evaluate_day(day: &DayPunch, counters: &AllowanceCounters) -> DayDecision {
    if day.is_holiday {
        return DayDecision::only(DayStatus::Holiday);
    }
    if day.is_weekly_off {
        return DayDecision::only(DayStatus::WeeklyOff);
    }

    let Some(time_in) = punch(day.time_in) else {
        return DayDecision::only(DayStatus::Absent);
    };

    let mut decision = DayDecision::only(DayStatus::Present);
    if time_in <= GRACE_UNTIL {
        // on time
    } else if time_in <= LATE_UNTIL {
        if counters.late_left() {
            decision.late_used = 1;
        } else if counters.permission_left() {
            decision.permission_used = 1;
        }
    } else if time_in <= PERMISSION_UNTIL {
        if counters.permission_left() {
            decision.permission_used = 1;
        }
    } else if time_in <= HALF_DAY_UNTIL {
        return DayDecision::only(DayStatus::HalfPresent);
    } else {
        return DayDecision::only(DayStatus::Absent);
    }

    let Some(time_out) = punch(day.time_out) else {
        return decision;
    };

    if time_out >= FULL_DAY_FROM {
        return decision;
    }
    if time_out >= EARLY_EXIT_FROM && counters.permission + decision.permission_used < PERMISSION_LIMIT
    {
        decision.permission_used += 1;
        return decision;
    }
    decision.status = DayStatus::HalfPresent;
    decision
}
