//! Pipeline entry points over the configured courts.
//!
//! - `Aggregator` / `run_aggregator`: fan out fetch, detect, extract and
//!   normalize across sources, merge into one ordered record set
//! - `query`: court, recency and free-text filtering
//! - `ExportGenerator`: batch and single-case HTML documents

pub mod aggregate;
pub mod cancel;
pub mod export;
pub mod query;

pub use aggregate::{Aggregator, compare_records, run_aggregator};
pub use cancel::{CancelHandle, CancelToken, cancellation};
pub use export::{ExportDocument, ExportGenerator, spanish_long_date, write_json};
pub use query::{QueryFilter, SearchField, query};
