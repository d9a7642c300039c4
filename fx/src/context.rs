//! Per-run context handed to every pipeline stage.

use chrono::{DateTime, Utc};
use ratebridge_common::{Currency, RequiredCurrencies};
use rust_decimal::Decimal;
use uuid::Uuid;

/// Configuration and identity of one pipeline run.
///
/// Stages receive this explicitly instead of consulting global state; the
/// `run_id` is attached to every log line emitted for the run.
#[derive(Debug, Clone)]
pub struct RunContext {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    /// Currency all direct quotes are denominated against.
    pub base: Currency,
    pub required: RequiredCurrencies,
    /// Maximum allowed divergence between sources, in percent.
    pub tolerance_pct: Decimal,
}

impl RunContext {
    pub fn new(base: Currency, required: RequiredCurrencies, tolerance_pct: Decimal) -> Self {
        Self {
            run_id: Uuid::now_v7(),
            started_at: Utc::now(),
            base,
            required,
            tolerance_pct,
        }
    }

    /// Required currencies other than the base, in configured order.
    pub fn quoted_currencies(&self) -> impl Iterator<Item = &Currency> {
        self.required.quoted_against(&self.base)
    }

    /// Whether `code` is a currency the sources are expected to quote.
    pub fn is_quoted_code(&self, code: &str) -> bool {
        code != self.base.code() && self.required.contains_code(code)
    }
}
