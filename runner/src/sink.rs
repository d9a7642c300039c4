//! Sink adapters persisting finished rate records.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use ratebridge_common::RateRecord;
use ratebridge_fx::{FxError, FxResult, RateSink};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::postgres::{PgPool, PgPoolOptions};
use tracing::info;

/// A record as written by the file and stdout sinks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredRate {
    pub from: String,
    pub to: String,
    pub value: Decimal,
    pub note: String,
    pub created_at: DateTime<Utc>,
}

impl StoredRate {
    pub fn new(record: &RateRecord, created_at: DateTime<Utc>) -> Self {
        Self {
            from: record.from.clone(),
            to: record.to.clone(),
            value: record.value,
            note: record.note.clone(),
            created_at,
        }
    }
}

/// Appends one JSON object per record to a file.
pub struct JsonLinesSink {
    path: PathBuf,
    writer: Mutex<BufWriter<File>>,
}

impl JsonLinesSink {
    /// Open `path` for appending, creating it if needed.
    pub fn open(path: impl AsRef<Path>) -> FxResult<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| FxError::Sink(format!("Cannot open {}: {}", path.display(), e)))?;

        Ok(Self {
            path,
            writer: Mutex::new(BufWriter::new(file)),
        })
    }
}

#[async_trait]
impl RateSink for JsonLinesSink {
    fn name(&self) -> &str {
        "jsonl"
    }

    async fn persist(&self, record: &RateRecord, created_at: DateTime<Utc>) -> FxResult<()> {
        let line = serde_json::to_string(&StoredRate::new(record, created_at))
            .map_err(|e| FxError::Sink(e.to_string()))?;
        let mut writer = self
            .writer
            .lock()
            .map_err(|e| FxError::Sink(e.to_string()))?;
        writeln!(writer, "{line}").map_err(|e| FxError::Sink(e.to_string()))
    }

    async fn flush(&self) -> FxResult<()> {
        let mut writer = self
            .writer
            .lock()
            .map_err(|e| FxError::Sink(e.to_string()))?;
        writer
            .flush()
            .map_err(|e| FxError::Sink(format!("{}: {}", self.path.display(), e)))
    }
}

/// Prints records as JSON lines on stdout.
#[derive(Debug, Default)]
pub struct StdoutSink;

#[async_trait]
impl RateSink for StdoutSink {
    fn name(&self) -> &str {
        "stdout"
    }

    async fn persist(&self, record: &RateRecord, created_at: DateTime<Utc>) -> FxResult<()> {
        let line = serde_json::to_string(&StoredRate::new(record, created_at))
            .map_err(|e| FxError::Sink(e.to_string()))?;
        println!("{line}");
        Ok(())
    }
}

const CREATE_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS exchange_rates (
    id BIGSERIAL PRIMARY KEY,
    from_currency CHAR(3) NOT NULL,
    to_currency CHAR(3) NOT NULL,
    rate NUMERIC(18, 4) NOT NULL,
    note TEXT NOT NULL,
    created_at TIMESTAMPTZ NOT NULL
)
"#;

const INSERT_RATE: &str = r#"
INSERT INTO exchange_rates (from_currency, to_currency, rate, note, created_at)
VALUES ($1, $2, $3, $4, $5)
"#;

/// Inserts records into the `exchange_rates` Postgres table.
pub struct PgSink {
    pool: PgPool,
}

impl PgSink {
    /// Connect and make sure the table exists.
    pub async fn connect(database_url: &str) -> FxResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(1)
            .connect(database_url)
            .await
            .map_err(|e| FxError::Sink(format!("Database connection failed: {e}")))?;

        sqlx::query(CREATE_TABLE)
            .execute(&pool)
            .await
            .map_err(|e| FxError::Sink(format!("Schema setup failed: {e}")))?;

        info!("Connected to rate database");
        Ok(Self { pool })
    }
}

#[async_trait]
impl RateSink for PgSink {
    fn name(&self) -> &str {
        "postgres"
    }

    async fn persist(&self, record: &RateRecord, created_at: DateTime<Utc>) -> FxResult<()> {
        sqlx::query(INSERT_RATE)
            .bind(&record.from)
            .bind(&record.to)
            .bind(record.value)
            .bind(&record.note)
            .bind(created_at)
            .execute(&self.pool)
            .await
            .map_err(|e| FxError::Sink(e.to_string()))?;
        Ok(())
    }

    async fn flush(&self) -> FxResult<()> {
        self.pool.close().await;
        Ok(())
    }
}
