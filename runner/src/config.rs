//! Runner configuration.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use ratebridge_common::{Currency, RequiredCurrencies};
use ratebridge_fx::{FxEngineConfig, ReportFormat, SourceLayout};
use rust_decimal::Decimal;

/// Where finished records are persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkTarget {
    /// Postgres connection URL.
    Postgres(String),
    /// Append one JSON object per record to this file.
    JsonLines(PathBuf),
    /// Print records to stdout (dry runs).
    Stdout,
}

/// Report configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportConfig {
    /// Output file; stdout when `None`.
    pub path: Option<PathBuf>,
    pub format: ReportFormat,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            path: None,
            format: ReportFormat::Text,
        }
    }
}

/// Main runner configuration.
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Base currency all quotes are denominated against.
    pub base: Currency,
    /// Currencies the published table must cover.
    pub required: RequiredCurrencies,
    /// Maximum allowed divergence between the two sources, in percent.
    pub tolerance_pct: Decimal,
    /// Source providing the direct rates.
    pub primary: SourceLayout,
    /// Source used to cross-check the primary.
    pub secondary: SourceLayout,
    pub sink: SinkTarget,
    pub report: ReportConfig,
    /// Lock file guarding against concurrent runs.
    pub lock_path: PathBuf,
    /// HTTP request timeout for each source fetch.
    pub request_timeout: Duration,
    /// Emit JSON log lines.
    pub log_json: bool,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            base: Currency::eur(),
            required: RequiredCurrencies::new([Currency::usd(), Currency::gbp()]),
            tolerance_pct: Decimal::from(5),
            primary: SourceLayout::new("PRIMARY", "", 0, 2),
            secondary: SourceLayout::new("SECONDARY", "", 0, 2),
            sink: SinkTarget::Stdout,
            report: ReportConfig::default(),
            lock_path: std::env::temp_dir().join("ratebridge.lock"),
            request_timeout: Duration::from_secs(30),
            log_json: false,
        }
    }
}

fn parse_var<T: FromStr>(key: &str, value: &str) -> Result<T, String>
where
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| format!("Invalid value for {key}: {e}"))
}

fn apply_source(
    layout: &mut SourceLayout,
    prefix: &str,
    lookup: &impl Fn(&str) -> Option<String>,
) -> Result<(), String> {
    let key = |suffix: &str| format!("RATEBRIDGE_{prefix}_{suffix}");

    if let Some(name) = lookup(&key("NAME")) {
        layout.name = name;
    }
    if let Some(url) = lookup(&key("URL")) {
        layout.url = url;
    }
    if let Some(selector) = lookup(&key("TABLE")) {
        layout.table_selector = selector;
    }
    if let Some(index) = lookup(&key("TABLE_INDEX")) {
        layout.table_index = parse_var(&key("TABLE_INDEX"), &index)?;
    }
    if let Some(col) = lookup(&key("CURRENCY_COL")) {
        layout.currency_column = parse_var(&key("CURRENCY_COL"), &col)?;
    }
    if let Some(col) = lookup(&key("SELL_COL")) {
        layout.sell_column = parse_var(&key("SELL_COL"), &col)?;
    }
    if let Some(col) = lookup(&key("BUY_COL")) {
        layout.buy_column = parse_var(&key("BUY_COL"), &col)?;
    }

    Ok(())
}

impl RunnerConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, String> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from any key/value source, falling back to defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, String> {
        let mut config = Self::default();

        if let Some(base) = lookup("RATEBRIDGE_BASE_CURRENCY") {
            config.base = Currency::parse(&base).map_err(|e| e.to_string())?;
        }

        if let Some(list) = lookup("RATEBRIDGE_CURRENCIES") {
            config.required = RequiredCurrencies::parse_list(&list).map_err(|e| e.to_string())?;
        }

        if let Some(tolerance) = lookup("RATEBRIDGE_TOLERANCE_PCT") {
            config.tolerance_pct = parse_var("RATEBRIDGE_TOLERANCE_PCT", &tolerance)?;
        }

        apply_source(&mut config.primary, "PRIMARY", &lookup)?;
        apply_source(&mut config.secondary, "SECONDARY", &lookup)?;

        if let Some(path) = lookup("RATEBRIDGE_SINK_PATH") {
            config.sink = SinkTarget::JsonLines(PathBuf::from(path));
        }

        if let Some(url) = lookup("DATABASE_URL") {
            config.sink = SinkTarget::Postgres(url);
        }

        if let Some(path) = lookup("RATEBRIDGE_REPORT_PATH") {
            config.report.path = Some(PathBuf::from(path));
        }

        if let Some(format) = lookup("RATEBRIDGE_REPORT_FORMAT") {
            config.report.format = format
                .parse()
                .map_err(|e: ratebridge_fx::FxError| e.to_string())?;
        }

        if let Some(path) = lookup("RATEBRIDGE_LOCK_PATH") {
            config.lock_path = PathBuf::from(path);
        }

        if let Some(secs) = lookup("RATEBRIDGE_REQUEST_TIMEOUT_SECS") {
            config.request_timeout =
                Duration::from_secs(parse_var("RATEBRIDGE_REQUEST_TIMEOUT_SECS", &secs)?);
        }

        if let Some(format) = lookup("RATEBRIDGE_LOG_FORMAT") {
            config.log_json = format.eq_ignore_ascii_case("json");
        }

        Ok(config)
    }

    /// Engine configuration derived from this runner configuration.
    pub fn engine_config(&self) -> FxEngineConfig {
        FxEngineConfig {
            base: self.base.clone(),
            required: self.required.clone(),
            tolerance_pct: self.tolerance_pct,
            primary: self.primary.clone(),
            secondary: self.secondary.clone(),
        }
    }

    /// Validate configuration.
    pub fn validate(&self) -> Result<(), String> {
        self.engine_config().validate().map_err(|e| e.to_string())?;

        if self.lock_path.as_os_str().is_empty() {
            return Err("Lock path cannot be empty".to_string());
        }

        if self.request_timeout.is_zero() {
            return Err("Request timeout cannot be 0".to_string());
        }

        if let SinkTarget::Postgres(url) = &self.sink {
            if url.is_empty() {
                return Err("Database URL cannot be empty".to_string());
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratebridge_fx::DEFAULT_BUY_COLUMN;
    use rust_decimal_macros::dec;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    fn valid_vars() -> Vec<(&'static str, &'static str)> {
        vec![
            ("RATEBRIDGE_PRIMARY_NAME", "HB"),
            ("RATEBRIDGE_PRIMARY_URL", "https://hb.test/rates"),
            ("RATEBRIDGE_SECONDARY_NAME", "BOC"),
            ("RATEBRIDGE_SECONDARY_URL", "https://boc.test/rates"),
        ]
    }

    #[test]
    fn test_default_config_needs_urls() {
        let config = RunnerConfig::default();
        assert!(config.validate().is_err());
        assert_eq!(config.base, Currency::eur());
        assert_eq!(config.primary.buy_column, DEFAULT_BUY_COLUMN);
    }

    #[test]
    fn test_from_lookup() {
        let mut vars = valid_vars();
        vars.extend([
            ("RATEBRIDGE_BASE_CURRENCY", "usd"),
            ("RATEBRIDGE_CURRENCIES", "EUR,GBP,CHF"),
            ("RATEBRIDGE_TOLERANCE_PCT", "2.5"),
            ("RATEBRIDGE_SECONDARY_CURRENCY_COL", "1"),
            ("RATEBRIDGE_SECONDARY_SELL_COL", "4"),
            ("RATEBRIDGE_SECONDARY_BUY_COL", "5"),
            ("RATEBRIDGE_SECONDARY_TABLE", "table.kurs"),
            ("RATEBRIDGE_SECONDARY_TABLE_INDEX", "2"),
            ("RATEBRIDGE_SINK_PATH", "/tmp/rates.jsonl"),
            ("RATEBRIDGE_REPORT_FORMAT", "html"),
            ("RATEBRIDGE_LOG_FORMAT", "JSON"),
        ]);

        let config = RunnerConfig::from_lookup(lookup(&vars)).unwrap();

        assert!(config.validate().is_ok());
        assert_eq!(config.base, Currency::usd());
        assert_eq!(config.required.to_string(), "EUR,GBP,CHF");
        assert_eq!(config.tolerance_pct, dec!(2.5));
        assert_eq!(config.primary.name, "HB");
        assert_eq!(config.secondary.currency_column, 1);
        assert_eq!(config.secondary.sell_column, 4);
        assert_eq!(config.secondary.buy_column, 5);
        assert_eq!(config.secondary.table_selector, "table.kurs");
        assert_eq!(config.secondary.table_index, 2);
        assert_eq!(config.sink, SinkTarget::JsonLines(PathBuf::from("/tmp/rates.jsonl")));
        assert_eq!(config.report.format, ReportFormat::Html);
        assert!(config.log_json);
    }

    #[test]
    fn test_database_url_selects_postgres() {
        let mut vars = valid_vars();
        vars.extend([
            ("RATEBRIDGE_SINK_PATH", "/tmp/rates.jsonl"),
            ("DATABASE_URL", "postgres://localhost/rates"),
        ]);

        let config = RunnerConfig::from_lookup(lookup(&vars)).unwrap();

        assert_eq!(
            config.sink,
            SinkTarget::Postgres("postgres://localhost/rates".to_string())
        );
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        assert!(
            RunnerConfig::from_lookup(lookup(&[("RATEBRIDGE_CURRENCIES", "USD,DOLLARS")])).is_err()
        );
        assert!(
            RunnerConfig::from_lookup(lookup(&[("RATEBRIDGE_TOLERANCE_PCT", "five")])).is_err()
        );
        assert!(
            RunnerConfig::from_lookup(lookup(&[("RATEBRIDGE_PRIMARY_SELL_COL", "-1")])).is_err()
        );
        assert!(RunnerConfig::from_lookup(lookup(&[("RATEBRIDGE_REPORT_FORMAT", "pdf")])).is_err());
    }

    #[test]
    fn test_invalid_config() {
        let mut config = RunnerConfig::from_lookup(lookup(&valid_vars())).unwrap();
        assert!(config.validate().is_ok());

        config.request_timeout = Duration::ZERO;
        assert!(config.validate().is_err());
    }
}
