//! Suggested campaign start time from an organization's open history.

use chrono::Timelike;
use smartreach_core::history::EngagementHistory;
use std::f64::consts::TAU;
use std::sync::Arc;
use uuid::Uuid;

const SECONDS_PER_DAY: f64 = 86_400.0;

/// What the campaign-authoring UI pre-fills as a start time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartTimeSuggestion {
    /// `HH:MM`, the mean open time-of-day across the organization.
    Time(String),
    /// No opened engagement records yet.
    NoData,
}

/// Averages open times-of-day for an organization.
///
/// The default is a plain arithmetic mean over seconds-since-midnight, which
/// mis-averages times that straddle midnight (23:50 and 00:10 average to
/// noon, not midnight). That limitation is documented rather than silently
/// corrected; the circular (vector) mean is available behind a config flag.
pub struct AutofillEngine {
    history: Arc<dyn EngagementHistory>,
    circular_mean: bool,
}

impl AutofillEngine {
    pub fn new(history: Arc<dyn EngagementHistory>, circular_mean: bool) -> Self {
        Self { history, circular_mean }
    }

    pub fn suggest_start_time(&self, org_id: Uuid) -> StartTimeSuggestion {
        let opens = self.history.opens_for(org_id);
        if opens.is_empty() {
            return StartTimeSuggestion::NoData;
        }

        let seconds: Vec<f64> = opens
            .iter()
            .map(|t| f64::from(t.time().num_seconds_from_midnight()))
            .collect();

        let mean = if self.circular_mean {
            circular_mean_seconds(&seconds)
        } else {
            seconds.iter().sum::<f64>() / seconds.len() as f64
        };

        let total = mean.round() as u32 % 86_400;
        StartTimeSuggestion::Time(format!("{:02}:{:02}", total / 3600, (total % 3600) / 60))
    }
}

/// Mean direction on the 24-hour circle, mapped back to seconds.
fn circular_mean_seconds(seconds: &[f64]) -> f64 {
    let (sin_sum, cos_sum) = seconds.iter().fold((0.0, 0.0), |(s, c), &sec| {
        let angle = sec / SECONDS_PER_DAY * TAU;
        (s + angle.sin(), c + angle.cos())
    });
    let mut angle = sin_sum.atan2(cos_sum);
    if angle < 0.0 {
        angle += TAU;
    }
    angle / TAU * SECONDS_PER_DAY
}
