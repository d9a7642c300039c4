//! RateBridge FX Engine
//!
//! Derives a complete exchange rate table from two bank quote feeds.
//!
//! # Pipeline
//!
//! - Raw table rows are normalized into quotes for the required currencies
//! - The primary feed is cross-checked against the secondary within a tolerance
//! - Primary quotes become direct mid rates against the base currency
//! - Missing currency pairs are triangulated through the base currency
//! - Every base-denominated rate gains its reversed counterpart
//!
//! # Example
//!
//! ```rust,ignore
//! use ratebridge_fx::{FxEngine, FxEngineConfig};
//!
//! let engine = FxEngine::new(fetcher, config);
//! let outcome = engine.derive(&engine.context()).await?;
//! let persisted = engine.publish(&outcome, &sink, &reporter).await?;
//! ```

pub mod context;
pub mod engine;
pub mod error;
pub mod gap_fill;
pub mod mid_rate;
pub mod output;
pub mod parser;
pub mod report;
pub mod rotation;
pub mod source;
pub mod validation;

pub use context::RunContext;
pub use engine::{derive_from_quotes, derive_rates, FxEngine, FxEngineConfig, RunOutcome};
pub use error::{FxError, FxResult, QuoteSide};
pub use gap_fill::{fill_gaps, GapFill, MissingLeg, UnresolvedPair};
pub use mid_rate::{direct_rates, mid_rate, DirectRates};
pub use output::{build_records, persist_all, PersistSummary, RateSink, Reporter};
pub use parser::parse_quotes;
pub use report::{render, ReportFormat};
pub use rotation::{reverse, rotate};
pub use source::{RawRow, SourceFetcher, SourceLayout, DEFAULT_BUY_COLUMN};
pub use validation::{cross_validate, Divergence, ValidationReport};

#[cfg(any(test, feature = "test-utils"))]
pub use output::{MockReporter, MockSink};
#[cfg(any(test, feature = "test-utils"))]
pub use source::MockSourceFetcher;
