//! Sink and reporter seams, and the record projection handed to them.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use ratebridge_common::{Rate, RateRecord};
use tracing::{info, instrument, warn};

use crate::engine::RunOutcome;
use crate::error::FxResult;

/// Project rates into publishable records, keeping accumulation order.
pub fn build_records(rates: &[Rate]) -> Vec<RateRecord> {
    rates.iter().map(Rate::to_record).collect()
}

/// Persists finished records.
#[async_trait]
pub trait RateSink: Send + Sync {
    /// Get the sink name.
    fn name(&self) -> &str;

    /// Persist one record stamped with `created_at`.
    async fn persist(&self, record: &RateRecord, created_at: DateTime<Utc>) -> FxResult<()>;

    /// Called once after every record has been offered.
    async fn flush(&self) -> FxResult<()> {
        Ok(())
    }
}

/// Renders and delivers the human-readable summary of a run.
#[async_trait]
pub trait Reporter: Send + Sync {
    /// Get the reporter name.
    fn name(&self) -> &str;

    async fn deliver(&self, outcome: &RunOutcome) -> FxResult<()>;
}

/// Result of offering every record to a sink.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PersistSummary {
    pub persisted: usize,
    pub failed: usize,
}

/// Offer each record to `sink` in order. A failing record is logged and skipped.
#[instrument(skip_all, fields(sink = sink.name(), records = records.len()))]
pub async fn persist_all(sink: &dyn RateSink, records: &[RateRecord]) -> PersistSummary {
    let created_at = Utc::now();
    let mut summary = PersistSummary::default();

    for record in records {
        match sink.persist(record, created_at).await {
            Ok(()) => summary.persisted += 1,
            Err(e) => {
                warn!(
                    from = %record.from,
                    to = %record.to,
                    error = %e,
                    "Failed to persist rate"
                );
                summary.failed += 1;
            }
        }
    }

    if let Err(e) = sink.flush().await {
        warn!(error = %e, "Sink flush failed");
    }

    info!(
        persisted = summary.persisted,
        failed = summary.failed,
        "Records offered to sink"
    );
    summary
}

/// In-memory sink for testing.
#[cfg(any(test, feature = "test-utils"))]
pub struct MockSink {
    records: std::sync::Mutex<Vec<(RateRecord, DateTime<Utc>)>>,
    fail_pairs: Vec<(String, String)>,
}

#[cfg(any(test, feature = "test-utils"))]
impl MockSink {
    pub fn new() -> Self {
        Self {
            records: std::sync::Mutex::new(Vec::new()),
            fail_pairs: Vec::new(),
        }
    }

    /// Reject the record for `from -> to`.
    pub fn failing_on(mut self, from: &str, to: &str) -> Self {
        self.fail_pairs.push((from.to_string(), to.to_string()));
        self
    }

    pub fn records(&self) -> Vec<RateRecord> {
        self.records
            .lock()
            .map(|r| r.iter().map(|(rec, _)| rec.clone()).collect())
            .unwrap_or_default()
    }
}

#[cfg(any(test, feature = "test-utils"))]
impl Default for MockSink {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(any(test, feature = "test-utils"))]
#[async_trait]
impl RateSink for MockSink {
    fn name(&self) -> &str {
        "mock"
    }

    async fn persist(&self, record: &RateRecord, created_at: DateTime<Utc>) -> FxResult<()> {
        if self
            .fail_pairs
            .iter()
            .any(|(from, to)| *from == record.from && *to == record.to)
        {
            return Err(crate::FxError::Sink(format!(
                "rejected {}->{}",
                record.from, record.to
            )));
        }
        self.records
            .lock()
            .map_err(|e| crate::FxError::Sink(e.to_string()))?
            .push((record.clone(), created_at));
        Ok(())
    }
}

/// Reporter that keeps delivered outcomes for testing.
#[cfg(any(test, feature = "test-utils"))]
#[derive(Default)]
pub struct MockReporter {
    delivered: std::sync::Mutex<Vec<RunOutcome>>,
}

#[cfg(any(test, feature = "test-utils"))]
impl MockReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn delivered(&self) -> Vec<RunOutcome> {
        self.delivered
            .lock()
            .map(|d| d.clone())
            .unwrap_or_default()
    }
}

#[cfg(any(test, feature = "test-utils"))]
#[async_trait]
impl Reporter for MockReporter {
    fn name(&self) -> &str {
        "mock"
    }

    async fn deliver(&self, outcome: &RunOutcome) -> FxResult<()> {
        self.delivered
            .lock()
            .map_err(|e| crate::FxError::Report(e.to_string()))?
            .push(outcome.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratebridge_common::{Currency, RateNote};
    use rust_decimal_macros::dec;

    fn records() -> Vec<RateRecord> {
        let usd = Rate::new(
            Currency::usd(),
            Currency::eur(),
            dec!(0.9),
            RateNote::Direct {
                source: "HB".to_string(),
                sell: dec!(1.1),
                buy: dec!(1.12),
            },
        );
        let eur_usd = Rate::new(
            Currency::eur(),
            Currency::usd(),
            dec!(1.1111),
            RateNote::Reversed {
                original: dec!(0.9),
            },
        );
        build_records(&[usd, eur_usd])
    }

    #[test]
    fn test_build_records_keeps_order() {
        let records = records();
        assert_eq!(records[0].from, "USD");
        assert_eq!(records[1].from, "EUR");
        assert_eq!(records[1].note, "reversed from 0.9");
    }

    #[tokio::test]
    async fn test_persist_all() {
        let sink = MockSink::new();

        let summary = persist_all(&sink, &records()).await;

        assert_eq!(summary, PersistSummary { persisted: 2, failed: 0 });
        assert_eq!(sink.records(), records());
    }

    #[tokio::test]
    async fn test_record_failure_does_not_stop_the_rest() {
        let sink = MockSink::new().failing_on("USD", "EUR");

        let summary = persist_all(&sink, &records()).await;

        assert_eq!(summary, PersistSummary { persisted: 1, failed: 1 });
        let stored = sink.records();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].from, "EUR");
    }
}
