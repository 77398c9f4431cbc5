//! Campaign window arithmetic — authoring-local to UTC conversion, hour
//! clamping, and day-stepping of send candidates.

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, TimeZone, Timelike, Utc};
use chrono_tz::Tz;
use smartreach_core::{SmartReachError, SmartReachResult};

/// Converts a campaign-authoring local date/time into a UTC instant using
/// the organization's configured zone. Pure and deterministic given the
/// bundled timezone database.
#[derive(Debug, Clone, Copy)]
pub struct TimeWindowConverter {
    zone: Tz,
}

impl TimeWindowConverter {
    pub fn new(zone: &str) -> SmartReachResult<Self> {
        let zone = zone
            .parse::<Tz>()
            .map_err(|_| SmartReachError::InvalidTimezone(zone.to_string()))?;
        Ok(Self { zone })
    }

    pub fn zone(&self) -> Tz {
        self.zone
    }

    /// Convert a `"YYYY-MM-DD"` date and `"HH:MM"` time pair into UTC.
    /// DST folds and gaps resolve to the earliest valid instant.
    pub fn to_utc(&self, date: &str, time: &str) -> SmartReachResult<DateTime<Utc>> {
        let date = NaiveDate::parse_from_str(date, "%Y-%m-%d")
            .map_err(|e| SmartReachError::InvalidFormat(format!("date {date:?}: {e}")))?;
        let time = NaiveTime::parse_from_str(time, "%H:%M")
            .map_err(|e| SmartReachError::InvalidFormat(format!("time {time:?}: {e}")))?;
        let local = date.and_time(time);
        let zoned = self.zone.from_local_datetime(&local).earliest().ok_or_else(|| {
            SmartReachError::InvalidFormat(format!("{local} does not exist in {}", self.zone))
        })?;
        Ok(zoned.with_timezone(&Utc))
    }
}

/// A validated `[start, end]` send window. Every instant the estimator
/// returns lies inside it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CampaignWindow {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl CampaignWindow {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> SmartReachResult<Self> {
        if end <= start {
            return Err(SmartReachError::Validation(format!(
                "campaign end {end} must be after start {start}"
            )));
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        instant >= self.start && instant <= self.end
    }

    /// Latest usable hour-of-day: 23 once the window spans a calendar day
    /// boundary, otherwise the end's own hour.
    pub fn end_hour_bound(&self) -> u32 {
        if self.end.date_naive() > self.start.date_naive() {
            23
        } else {
            self.end.hour()
        }
    }

    /// Clamp an hour-of-day into `[start.hour, end_hour_bound]`.
    pub fn clamp_hour(&self, hour: u32) -> u32 {
        self.start.hour().max(hour.min(self.end_hour_bound()))
    }

    /// Step a candidate forward by whole days until it is no longer in the
    /// past. `None` when no in-window future day exists; the caller falls
    /// back to the window start rather than accept an out-of-window instant.
    pub fn advance_to_future(
        &self,
        mut candidate: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Option<DateTime<Utc>> {
        while candidate < now && candidate <= self.end {
            candidate += Duration::days(1);
        }
        if candidate > self.end {
            None
        } else {
            Some(candidate)
        }
    }
}
