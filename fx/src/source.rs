//! Source fetcher trait and table layout descriptors.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::FxResult;

/// Column index that holds the buying price unless a layout says otherwise.
pub const DEFAULT_BUY_COLUMN: usize = 3;

/// One table row as ordered raw text cells.
pub type RawRow = Vec<String>;

/// Where a source publishes its table and which columns matter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceLayout {
    /// Short feed name used in notes and logs (e.g. `HB`).
    pub name: String,
    pub url: String,
    /// CSS selector matching candidate tables.
    pub table_selector: String,
    /// Which of the matched tables holds the quotes.
    pub table_index: usize,
    pub currency_column: usize,
    pub sell_column: usize,
    pub buy_column: usize,
}

impl SourceLayout {
    /// Create a layout reading the first `table` on the page with the default buy column.
    pub fn new(
        name: impl Into<String>,
        url: impl Into<String>,
        currency_column: usize,
        sell_column: usize,
    ) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            table_selector: "table".to_string(),
            table_index: 0,
            currency_column,
            sell_column,
            buy_column: DEFAULT_BUY_COLUMN,
        }
    }

    pub fn with_table(mut self, selector: impl Into<String>, index: usize) -> Self {
        self.table_selector = selector.into();
        self.table_index = index;
        self
    }

    pub fn with_buy_column(mut self, column: usize) -> Self {
        self.buy_column = column;
        self
    }
}

/// Retrieves the raw quote table of one source.
///
/// Implementations make a single attempt; any failure is reported as
/// [`crate::FxError::SourceFetch`] and aborts the run.
#[async_trait]
pub trait SourceFetcher: Send + Sync {
    /// Get the fetcher name.
    fn name(&self) -> &str;

    /// Fetch every data row of the table described by `layout`.
    async fn fetch_rows(&self, layout: &SourceLayout) -> FxResult<Vec<RawRow>>;
}

/// Mock fetcher for testing.
#[cfg(any(test, feature = "test-utils"))]
pub struct MockSourceFetcher {
    tables: std::collections::HashMap<String, FxResult<Vec<RawRow>>>,
    calls: std::sync::atomic::AtomicUsize,
}

#[cfg(any(test, feature = "test-utils"))]
impl MockSourceFetcher {
    pub fn new() -> Self {
        Self {
            tables: std::collections::HashMap::new(),
            calls: std::sync::atomic::AtomicUsize::new(0),
        }
    }

    /// Serve `rows` for the layout named `source`.
    pub fn with_rows(mut self, source: &str, rows: Vec<Vec<&str>>) -> Self {
        let rows = rows
            .into_iter()
            .map(|row| row.into_iter().map(str::to_string).collect())
            .collect();
        self.tables.insert(source.to_string(), Ok(rows));
        self
    }

    /// Fail every fetch of the layout named `source`.
    pub fn with_failure(mut self, source: &str, reason: &str) -> Self {
        self.tables.insert(
            source.to_string(),
            Err(crate::FxError::SourceFetch {
                source_name: source.to_string(),
                reason: reason.to_string(),
            }),
        );
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(std::sync::atomic::Ordering::SeqCst)
    }
}

#[cfg(any(test, feature = "test-utils"))]
impl Default for MockSourceFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(any(test, feature = "test-utils"))]
#[async_trait]
impl SourceFetcher for MockSourceFetcher {
    fn name(&self) -> &str {
        "mock"
    }

    async fn fetch_rows(&self, layout: &SourceLayout) -> FxResult<Vec<RawRow>> {
        self.calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        match self.tables.get(&layout.name) {
            Some(Ok(rows)) => Ok(rows.clone()),
            Some(Err(err)) => Err(crate::FxError::SourceFetch {
                source_name: layout.name.clone(),
                reason: err.to_string(),
            }),
            None => Err(crate::FxError::SourceFetch {
                source_name: layout.name.clone(),
                reason: "no table registered".to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_defaults() {
        let layout = SourceLayout::new("HB", "https://example.test/rates", 0, 2);
        assert_eq!(layout.buy_column, DEFAULT_BUY_COLUMN);
        assert_eq!(layout.table_selector, "table");
        assert_eq!(layout.table_index, 0);

        let layout = layout.with_table("table.rates", 1).with_buy_column(4);
        assert_eq!(layout.table_selector, "table.rates");
        assert_eq!(layout.table_index, 1);
        assert_eq!(layout.buy_column, 4);
    }

    #[tokio::test]
    async fn test_mock_fetcher() {
        let fetcher = MockSourceFetcher::new()
            .with_rows("HB", vec![vec!["USD", "x", "1.10", "1.09"]])
            .with_failure("BOC", "timeout");

        let hb = SourceLayout::new("HB", "u", 0, 2);
        let rows = fetcher.fetch_rows(&hb).await.unwrap();
        assert_eq!(rows, vec![vec!["USD", "x", "1.10", "1.09"]]);

        let boc = SourceLayout::new("BOC", "u", 0, 2);
        assert!(matches!(
            fetcher.fetch_rows(&boc).await,
            Err(crate::FxError::SourceFetch { .. })
        ));
        assert_eq!(fetcher.calls(), 2);
    }
}
