//! Main rate derivation pipeline.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use ratebridge_common::{Currency, Quote, Rate, RateKind, RateRecord, RequiredCurrencies};
use rust_decimal::Decimal;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::context::RunContext;
use crate::error::{FxError, FxResult};
use crate::gap_fill::{fill_gaps, UnresolvedPair};
use crate::mid_rate::direct_rates;
use crate::output::{build_records, persist_all, PersistSummary, RateSink, Reporter};
use crate::parser::parse_quotes;
use crate::rotation::rotate;
use crate::source::{RawRow, SourceFetcher, SourceLayout};
use crate::validation::{cross_validate, ValidationReport};

/// Configuration for the FX engine.
#[derive(Debug, Clone)]
pub struct FxEngineConfig {
    pub base: Currency,
    pub required: RequiredCurrencies,
    /// Maximum allowed divergence between sources, in percent.
    pub tolerance_pct: Decimal,
    /// Source whose quotes become the direct rates.
    pub primary: SourceLayout,
    /// Source used only to cross-check the primary.
    pub secondary: SourceLayout,
}

impl FxEngineConfig {
    /// Validate configuration.
    pub fn validate(&self) -> FxResult<()> {
        if self.required.quoted_against(&self.base).next().is_none() {
            return Err(FxError::Configuration(
                "Required currency set has no currency besides the base".to_string(),
            ));
        }

        if self.tolerance_pct <= Decimal::ZERO {
            return Err(FxError::Configuration(
                "Tolerance must be a positive percentage".to_string(),
            ));
        }

        for layout in [&self.primary, &self.secondary] {
            if layout.url.is_empty() {
                return Err(FxError::Configuration(format!(
                    "Source {} has no URL",
                    layout.name
                )));
            }
        }

        if self.primary.name == self.secondary.name {
            return Err(FxError::Configuration(
                "Primary and secondary sources must have distinct names".to_string(),
            ));
        }

        Ok(())
    }
}

/// Everything a completed run produced.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub run_id: Uuid,
    pub base: Currency,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Final rate table in accumulation order.
    pub rates: Vec<Rate>,
    /// `rates` projected for sinks and reporters.
    pub records: Vec<RateRecord>,
    pub unresolved: Vec<UnresolvedPair>,
    /// Currencies whose quote could not produce a direct rate.
    pub degenerate: Vec<Currency>,
    pub validation: ValidationReport,
}

impl RunOutcome {
    pub fn count(&self, kind: RateKind) -> usize {
        self.rates.iter().filter(|r| r.kind() == kind).count()
    }
}

/// Derive the complete rate table from already fetched rows.
///
/// Both sources must parse to at least one quote and agree within tolerance
/// before any rate is computed.
#[instrument(skip_all, fields(run_id = %ctx.run_id))]
pub fn derive_rates(
    ctx: &RunContext,
    primary: (&SourceLayout, &[RawRow]),
    secondary: (&SourceLayout, &[RawRow]),
) -> FxResult<RunOutcome> {
    let primary_quotes = parse_quotes(ctx, primary.0, primary.1)?;
    let secondary_quotes = parse_quotes(ctx, secondary.0, secondary.1)?;

    derive_from_quotes(ctx, &primary_quotes, &secondary_quotes)
}

/// Validate, compute, complete and rotate. Rates come from `primary` only.
pub fn derive_from_quotes(
    ctx: &RunContext,
    primary: &[Quote],
    secondary: &[Quote],
) -> FxResult<RunOutcome> {
    let validation = cross_validate(ctx, primary, secondary)?;

    let direct = direct_rates(ctx, primary);
    let filled = fill_gaps(ctx, direct.rates);
    let rates = rotate(&ctx.base, filled.rates);
    let records = build_records(&rates);

    let outcome = RunOutcome {
        run_id: ctx.run_id,
        base: ctx.base.clone(),
        started_at: ctx.started_at,
        finished_at: Utc::now(),
        rates,
        records,
        unresolved: filled.unresolved,
        degenerate: direct.degenerate,
        validation,
    };

    info!(
        run_id = %ctx.run_id,
        rates = outcome.rates.len(),
        direct = outcome.count(RateKind::Direct),
        triangulated = outcome.count(RateKind::Triangulated),
        reversed = outcome.count(RateKind::Reversed),
        unresolved = outcome.unresolved.len(),
        "Rate table derived"
    );

    Ok(outcome)
}

/// The main FX engine.
pub struct FxEngine {
    fetcher: Arc<dyn SourceFetcher>,
    config: FxEngineConfig,
}

impl FxEngine {
    /// Create a new FX engine with the given fetcher.
    pub fn new(fetcher: Arc<dyn SourceFetcher>, config: FxEngineConfig) -> Self {
        Self { fetcher, config }
    }

    pub fn config(&self) -> &FxEngineConfig {
        &self.config
    }

    /// Fresh context for one run.
    pub fn context(&self) -> RunContext {
        RunContext::new(
            self.config.base.clone(),
            self.config.required.clone(),
            self.config.tolerance_pct,
        )
    }

    /// Fetch both sources one after the other and derive the rate table.
    #[instrument(skip(self, ctx), fields(run_id = %ctx.run_id, fetcher = self.fetcher.name()))]
    pub async fn derive(&self, ctx: &RunContext) -> FxResult<RunOutcome> {
        info!(base = %ctx.base, required = %ctx.required, "Starting rate run");

        let primary = &self.config.primary;
        let secondary = &self.config.secondary;

        let primary_rows = self.fetcher.fetch_rows(primary).await?;
        info!(source = %primary.name, rows = primary_rows.len(), "Fetched primary source");
        let primary_quotes = parse_quotes(ctx, primary, &primary_rows)?;

        let secondary_rows = self.fetcher.fetch_rows(secondary).await?;
        info!(source = %secondary.name, rows = secondary_rows.len(), "Fetched secondary source");
        let secondary_quotes = parse_quotes(ctx, secondary, &secondary_rows)?;

        derive_from_quotes(ctx, &primary_quotes, &secondary_quotes)
    }

    /// Hand a derived rate table to the sink and the reporter.
    ///
    /// Callers derive first, so nothing is published from a failed run.
    pub async fn publish(
        &self,
        outcome: &RunOutcome,
        sink: &dyn RateSink,
        reporter: &dyn Reporter,
    ) -> FxResult<PersistSummary> {
        let persisted = persist_all(sink, &outcome.records).await;
        reporter.deliver(outcome).await?;

        info!(run_id = %outcome.run_id, "Rate run complete");
        Ok(persisted)
    }
}
