//! Per-recipient send-time estimation from historical click behavior.

use crate::window::CampaignWindow;
use chrono::{DateTime, Timelike, Utc};
use smartreach_core::clock::Clock;
use smartreach_core::history::EngagementHistory;
use smartreach_core::types::HistoryScope;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

/// Computes the preferred send instant for one recipient: the recipient's
/// most frequent click hour, clamped into the campaign window and stepped
/// onto the first valid future day. Recipients with no click history get the
/// window start — a fallback, not an error.
pub struct OptimalTimeEstimator {
    history: Arc<dyn EngagementHistory>,
    clock: Arc<dyn Clock>,
    scope: HistoryScope,
}

impl OptimalTimeEstimator {
    pub fn new(
        history: Arc<dyn EngagementHistory>,
        clock: Arc<dyn Clock>,
        scope: HistoryScope,
    ) -> Self {
        Self { history, clock, scope }
    }

    /// The returned instant always lies inside `[window.start, window.end]`.
    pub fn optimal_send_time(
        &self,
        recipient_id: Uuid,
        campaign_id: Uuid,
        window: &CampaignWindow,
    ) -> DateTime<Utc> {
        let campaign_filter = match self.scope {
            HistoryScope::AllCampaigns => None,
            HistoryScope::CurrentCampaign => Some(campaign_id),
        };
        let clicks = self.history.clicks_for(recipient_id, campaign_filter);

        let Some(peak) = peak_click_hour(&clicks) else {
            debug!(%recipient_id, "no click history, falling back to window start");
            return window.start();
        };

        let hour = window.clamp_hour(peak);
        // Keep the start's minutes; only the hour comes from history.
        let candidate = window.start().with_hour(hour).unwrap_or(window.start());

        match window.advance_to_future(candidate, self.clock.now()) {
            Some(instant) => instant,
            None => {
                debug!(%recipient_id, "no future day left in window, falling back to start");
                window.start()
            }
        }
    }
}

/// Most frequent click hour-of-day (0–23, UTC). Ties break toward the
/// smallest hour value so the choice is deterministic.
fn peak_click_hour(clicks: &[DateTime<Utc>]) -> Option<u32> {
    if clicks.is_empty() {
        return None;
    }
    let mut counts = [0u32; 24];
    for click in clicks {
        counts[click.hour() as usize] += 1;
    }
    let mut best = 0usize;
    for hour in 1..24 {
        if counts[hour] > counts[best] {
            best = hour;
        }
    }
    Some(best as u32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use smartreach_core::clock::FixedClock;
    use smartreach_core::types::EngagementRecord;
    use std::sync::Mutex;

    fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap()
    }

    /// Canned history: returns the same click list for every recipient.
    struct CannedHistory {
        clicks: Vec<DateTime<Utc>>,
        seen_filter: Mutex<Option<Option<Uuid>>>,
    }

    impl CannedHistory {
        fn new(clicks: Vec<DateTime<Utc>>) -> Self {
            Self { clicks, seen_filter: Mutex::new(None) }
        }
    }

    impl EngagementHistory for CannedHistory {
        fn record_dispatch(&self, _record: EngagementRecord) {}

        fn clicks_for(&self, _recipient_id: Uuid, campaign_id: Option<Uuid>) -> Vec<DateTime<Utc>> {
            *self.seen_filter.lock().unwrap() = Some(campaign_id);
            self.clicks.clone()
        }

        fn opens_for(&self, _org_id: Uuid) -> Vec<DateTime<Utc>> {
            Vec::new()
        }
    }

    fn estimator_with(
        clicks: Vec<DateTime<Utc>>,
        now: DateTime<Utc>,
        scope: HistoryScope,
    ) -> OptimalTimeEstimator {
        OptimalTimeEstimator::new(
            Arc::new(CannedHistory::new(clicks)),
            Arc::new(FixedClock::new(now)),
            scope,
        )
    }

    fn clicks_at_hours(hours: &[u32]) -> Vec<DateTime<Utc>> {
        hours.iter().map(|&h| utc(2025, 1, 10, h, 15)).collect()
    }

    // 1. Histogram ----------------------------------------------------------

    #[test]
    fn test_peak_hour_majority_wins() {
        // {9: 8, 14: 2}
        let mut hours = vec![9u32; 8];
        hours.extend([14, 14]);
        assert_eq!(peak_click_hour(&clicks_at_hours(&hours)), Some(9));
    }

    #[test]
    fn test_peak_hour_tie_breaks_low() {
        // {9: 3, 14: 3}
        let hours = [14, 9, 14, 9, 14, 9];
        assert_eq!(peak_click_hour(&clicks_at_hours(&hours)), Some(9));
    }

    #[test]
    fn test_peak_hour_empty_is_none() {
        assert_eq!(peak_click_hour(&[]), None);
    }

    // 2. Fallbacks -----------------------------------------------------------

    #[test]
    fn test_no_history_returns_window_start() {
        let window = CampaignWindow::new(utc(2025, 3, 1, 9, 0), utc(2025, 3, 5, 23, 0)).unwrap();
        let estimator =
            estimator_with(Vec::new(), utc(2025, 2, 28, 0, 0), HistoryScope::AllCampaigns);
        let instant =
            estimator.optimal_send_time(Uuid::new_v4(), Uuid::new_v4(), &window);
        assert_eq!(instant, window.start());
    }

    #[test]
    fn test_exhausted_window_returns_start() {
        let window = CampaignWindow::new(utc(2025, 3, 1, 9, 0), utc(2025, 3, 2, 23, 0)).unwrap();
        // "now" is past the whole window, so every advanced candidate
        // overflows the end.
        let estimator = estimator_with(
            clicks_at_hours(&[10, 10, 10]),
            utc(2025, 3, 7, 0, 0),
            HistoryScope::AllCampaigns,
        );
        let instant =
            estimator.optimal_send_time(Uuid::new_v4(), Uuid::new_v4(), &window);
        assert_eq!(instant, window.start());
    }

    // 3. In-window guarantee --------------------------------------------------

    #[test]
    fn test_result_always_inside_window() {
        let window = CampaignWindow::new(utc(2025, 3, 1, 18, 0), utc(2025, 3, 5, 10, 0)).unwrap();
        let now = utc(2025, 3, 1, 0, 0);
        for hour in 0..24 {
            let estimator = estimator_with(
                clicks_at_hours(&[hour, hour]),
                now,
                HistoryScope::AllCampaigns,
            );
            let instant =
                estimator.optimal_send_time(Uuid::new_v4(), Uuid::new_v4(), &window);
            assert!(window.contains(instant), "hour {hour} produced {instant}");
        }
    }

    #[test]
    fn test_history_hour_inside_multi_day_bound_is_kept() {
        // Multi-day window starting 18:00 ⇒ end-hour bound 23, so a peak
        // hour of 20 survives untouched.
        let window = CampaignWindow::new(utc(2025, 3, 1, 18, 0), utc(2025, 3, 5, 10, 0)).unwrap();
        let estimator = estimator_with(
            clicks_at_hours(&[20, 20, 20]),
            utc(2025, 3, 1, 0, 0),
            HistoryScope::AllCampaigns,
        );
        let instant =
            estimator.optimal_send_time(Uuid::new_v4(), Uuid::new_v4(), &window);
        assert_eq!(instant, utc(2025, 3, 1, 20, 0));
    }

    #[test]
    fn test_past_candidate_moves_to_next_day() {
        let window = CampaignWindow::new(utc(2025, 3, 1, 9, 0), utc(2025, 3, 10, 23, 0)).unwrap();
        let estimator = estimator_with(
            clicks_at_hours(&[10, 10]),
            utc(2025, 3, 2, 15, 0),
            HistoryScope::AllCampaigns,
        );
        let instant =
            estimator.optimal_send_time(Uuid::new_v4(), Uuid::new_v4(), &window);
        assert_eq!(instant, utc(2025, 3, 3, 10, 0));
    }

    // 4. History scope --------------------------------------------------------

    #[test]
    fn test_scope_controls_campaign_filter() {
        let window = CampaignWindow::new(utc(2025, 3, 1, 9, 0), utc(2025, 3, 5, 23, 0)).unwrap();
        let campaign_id = Uuid::new_v4();

        let history = Arc::new(CannedHistory::new(Vec::new()));
        let estimator = OptimalTimeEstimator::new(
            history.clone(),
            Arc::new(FixedClock::new(utc(2025, 2, 28, 0, 0))),
            HistoryScope::CurrentCampaign,
        );
        estimator.optimal_send_time(Uuid::new_v4(), campaign_id, &window);
        assert_eq!(*history.seen_filter.lock().unwrap(), Some(Some(campaign_id)));

        let history = Arc::new(CannedHistory::new(Vec::new()));
        let estimator = OptimalTimeEstimator::new(
            history.clone(),
            Arc::new(FixedClock::new(utc(2025, 2, 28, 0, 0))),
            HistoryScope::AllCampaigns,
        );
        estimator.optimal_send_time(Uuid::new_v4(), campaign_id, &window);
        assert_eq!(*history.seen_filter.lock().unwrap(), Some(None));
    }
}
