//! One complete, lock-guarded publishing run.

use std::sync::Arc;

use ratebridge_fx::{
    FxEngine, FxError, FxResult, PersistSummary, RateSink, Reporter, RunOutcome, SourceFetcher,
};
use tracing::{error, info, instrument};

use crate::config::{RunnerConfig, SinkTarget};
use crate::fetcher::HttpTableFetcher;
use crate::reporter::RenderedReporter;
use crate::run_lock::RunLock;
use crate::sink::{JsonLinesSink, PgSink, StdoutSink};

/// Where the records go: an adapter the caller already holds, or the
/// configured target, opened only once the rate table is derived.
enum SinkSource<'a> {
    Ready(&'a dyn RateSink),
    Configured(&'a SinkTarget),
}

async fn execute_locked(
    config: &RunnerConfig,
    fetcher: Arc<dyn SourceFetcher>,
    sink: SinkSource<'_>,
    reporter: &dyn Reporter,
) -> FxResult<(RunOutcome, PersistSummary)> {
    let _lock = RunLock::acquire(&config.lock_path)?;

    let engine = FxEngine::new(fetcher, config.engine_config());
    let outcome = engine.derive(&engine.context()).await?;

    let opened: Box<dyn RateSink>;
    let sink = match sink {
        SinkSource::Ready(sink) => sink,
        SinkSource::Configured(target) => {
            opened = open_sink(target).await?;
            opened.as_ref()
        }
    };

    let persisted = engine.publish(&outcome, sink, reporter).await?;
    Ok((outcome, persisted))
}

#[instrument(skip_all, fields(lock = %config.lock_path.display()))]
async fn execute(
    config: &RunnerConfig,
    fetcher: Arc<dyn SourceFetcher>,
    sink: SinkSource<'_>,
    reporter: &dyn Reporter,
) -> FxResult<(RunOutcome, PersistSummary)> {
    let result = execute_locked(config, fetcher, sink, reporter).await;

    match &result {
        Ok((outcome, persisted)) => info!(
            run_id = %outcome.run_id,
            records = outcome.records.len(),
            persisted = persisted.persisted,
            failed = persisted.failed,
            unresolved = outcome.unresolved.len(),
            "Run succeeded"
        ),
        Err(e) => error!(code = e.error_code(), error = %e, "Run failed"),
    }

    result
}

/// Run the pipeline with the given adapters while holding the run lock.
///
/// The lock is taken before anything is fetched and released on return,
/// whatever the outcome.
pub async fn run_with(
    config: &RunnerConfig,
    fetcher: Arc<dyn SourceFetcher>,
    sink: &dyn RateSink,
    reporter: &dyn Reporter,
) -> FxResult<(RunOutcome, PersistSummary)> {
    execute(config, fetcher, SinkSource::Ready(sink), reporter).await
}

async fn open_sink(target: &SinkTarget) -> FxResult<Box<dyn RateSink>> {
    let sink: Box<dyn RateSink> = match target {
        SinkTarget::Postgres(url) => Box::new(PgSink::connect(url).await?),
        SinkTarget::JsonLines(path) => Box::new(JsonLinesSink::open(path)?),
        SinkTarget::Stdout => Box::new(StdoutSink),
    };
    Ok(sink)
}

/// Run the pipeline against the configured HTTP sources, sink and report.
///
/// The sink is opened after the lock is held and the rate table is derived,
/// so a refused or failed run leaves no sink file or table behind.
pub async fn run(config: &RunnerConfig) -> FxResult<(RunOutcome, PersistSummary)> {
    config.validate().map_err(FxError::Configuration)?;

    let fetcher = Arc::new(HttpTableFetcher::new(config.request_timeout)?);
    let reporter = RenderedReporter::new(config.report.path.clone(), config.report.format);

    execute(config, fetcher, SinkSource::Configured(&config.sink), &reporter).await
}
