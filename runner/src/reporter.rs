//! Report delivery.

use std::path::PathBuf;

use async_trait::async_trait;
use ratebridge_fx::{render, FxError, FxResult, ReportFormat, Reporter, RunOutcome};
use tracing::info;

/// Writes the rendered report to a file, or to stdout when no path is set.
pub struct RenderedReporter {
    path: Option<PathBuf>,
    format: ReportFormat,
}

impl RenderedReporter {
    pub fn new(path: Option<PathBuf>, format: ReportFormat) -> Self {
        Self { path, format }
    }
}

#[async_trait]
impl Reporter for RenderedReporter {
    fn name(&self) -> &str {
        match self.format {
            ReportFormat::Text => "text",
            ReportFormat::Html => "html",
        }
    }

    async fn deliver(&self, outcome: &RunOutcome) -> FxResult<()> {
        let rendered = render(outcome, self.format);

        match &self.path {
            Some(path) => {
                tokio::fs::write(path, rendered)
                    .await
                    .map_err(|e| FxError::Report(format!("{}: {}", path.display(), e)))?;
                info!(path = %path.display(), "Report written");
            }
            None => print!("{rendered}"),
        }

        Ok(())
    }
}
