//! HTTP source fetcher extracting quote tables from published HTML pages.

use std::time::Duration;

use async_trait::async_trait;
use ratebridge_fx::{FxError, FxResult, RawRow, SourceFetcher, SourceLayout};
use reqwest::Client;
use scraper::{Html, Selector};
use tracing::{debug, instrument};

fn fetch_error(layout: &SourceLayout, reason: impl Into<String>) -> FxError {
    FxError::SourceFetch {
        source_name: layout.name.clone(),
        reason: reason.into(),
    }
}

/// Extract the data rows of the table selected by `layout` from an HTML document.
///
/// Rows without `td` cells (header rows) are skipped. Cell text is returned raw;
/// cleansing happens in the quote parser.
pub fn extract_rows(html: &str, layout: &SourceLayout) -> FxResult<Vec<RawRow>> {
    let table_selector = Selector::parse(&layout.table_selector).map_err(|_| {
        FxError::Configuration(format!(
            "Invalid table selector {:?} for {}",
            layout.table_selector, layout.name
        ))
    })?;
    let row_selector = Selector::parse("tr").map_err(|_| fetch_error(layout, "bad row selector"))?;
    let cell_selector =
        Selector::parse("td").map_err(|_| fetch_error(layout, "bad cell selector"))?;

    let document = Html::parse_document(html);
    let table = document
        .select(&table_selector)
        .nth(layout.table_index)
        .ok_or_else(|| {
            fetch_error(
                layout,
                format!(
                    "no table #{} matching {:?}",
                    layout.table_index, layout.table_selector
                ),
            )
        })?;

    let rows = table
        .select(&row_selector)
        .map(|tr| {
            tr.select(&cell_selector)
                .map(|td| td.text().collect::<String>())
                .collect::<RawRow>()
        })
        .filter(|cells| !cells.is_empty())
        .collect();

    Ok(rows)
}

/// Fetches a source page with a single GET request.
#[derive(Clone)]
pub struct HttpTableFetcher {
    client: Client,
}

impl HttpTableFetcher {
    /// Create a fetcher whose requests time out after `timeout`.
    pub fn new(timeout: Duration) -> FxResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("ratebridge/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| FxError::Configuration(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self { client })
    }
}

#[async_trait]
impl SourceFetcher for HttpTableFetcher {
    fn name(&self) -> &str {
        "http"
    }

    #[instrument(skip(self), fields(source = %layout.name, url = %layout.url))]
    async fn fetch_rows(&self, layout: &SourceLayout) -> FxResult<Vec<RawRow>> {
        let response = self
            .client
            .get(&layout.url)
            .send()
            .await
            .map_err(|e| fetch_error(layout, e.to_string()))?;

        if !response.status().is_success() {
            return Err(fetch_error(
                layout,
                format!("HTTP status {}", response.status()),
            ));
        }

        let body = response
            .text()
            .await
            .map_err(|e| fetch_error(layout, e.to_string()))?;
        debug!(bytes = body.len(), "Fetched source page");

        extract_rows(&body, layout)
    }
}
