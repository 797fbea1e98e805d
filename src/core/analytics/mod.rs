//! Analytics Aggregator
//!
//! Applies atomic updates to the per-asset view/completion counters in
//! the ledger. Views and playback progress are independent signals: a
//! view is recorded once per render of the share page, while playback
//! progress only accumulates completion fractions.

use std::sync::Arc;

use tracing::debug;

use crate::core::{ledger::AssetLedger, CoreError, CoreResult, TimeSec};

/// View/completion counter updates over the ledger.
pub struct AnalyticsAggregator {
    ledger: Arc<AssetLedger>,
}

impl AnalyticsAggregator {
    pub fn new(ledger: Arc<AssetLedger>) -> Self {
        Self { ledger }
    }

    /// Records one render of the share view. Does not touch completion.
    pub async fn on_view_rendered(&self, id: &str) -> CoreResult<()> {
        self.ledger.update(id, |record| record.view_count += 1).await?;
        debug!(id, "view recorded");
        Ok(())
    }

    /// Records playback progress for one viewing session.
    ///
    /// `watched_seconds` is clamped to `[0, duration]`; the resulting
    /// completion fraction is clamped to `[0, 1]` and added to the
    /// record's `completion_sum`. Does not touch `view_count`.
    pub async fn on_playback_progress(&self, id: &str, watched_seconds: TimeSec) -> CoreResult<()> {
        if !watched_seconds.is_finite() {
            return Err(CoreError::Validation(format!(
                "watchedSeconds must be finite: {watched_seconds}"
            )));
        }

        self.ledger
            .update(id, |record| {
                let fraction = completion_fraction(watched_seconds, record.duration_sec);
                record.completion_sum += fraction;
            })
            .await?;
        Ok(())
    }

    /// Average completion in percent, rounded; 0 when unviewed.
    pub async fn average_completion(&self, id: &str) -> CoreResult<u32> {
        let record = self
            .ledger
            .get(id)
            .ok_or_else(|| CoreError::NotFound(format!("asset not found: {id}")))?;
        Ok(record.average_completion())
    }
}

/// Completion fraction of one playback, always in `[0, 1]`.
fn completion_fraction(watched_seconds: TimeSec, duration_sec: TimeSec) -> f64 {
    if duration_sec <= 0.0 {
        return 0.0;
    }
    let watched = watched_seconds.clamp(0.0, duration_sec);
    (watched / duration_sec).clamp(0.0, 1.0)
}
