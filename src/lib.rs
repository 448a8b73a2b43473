//! GA4 Report Library
//!
//! Reporting over the Google Analytics 4 Data and Admin APIs: property
//! selection, preset and ad-hoc queries, derived dimensions, and tabular, JSON
//! or CSV output with client-side sorting, filtering and pagination.
//!
//! ## Architecture Overview
//!
//! - [`dimensions`] - Registry of derived dimensions and their transforms
//! - [`pipeline`] - Dimension resolution and row shaping (build, transform, project)
//! - [`query`] - Query specifications, date ranges and request building
//! - [`models`] - Wire types for the Data/Admin APIs and the in-memory row type
//! - [`client`] - HTTP client for `runReport` and `accountSummaries`
//! - [`reporter`] - Orchestrates fetch, shaping, view and rendering
//! - [`view`] - Sort, filter and paginate state passed through rendering
//! - [`display`] - Table, JSON and CSV renderers
//! - [`presets`] - Named report definitions
//! - [`flow`] - Entry-page flow report built from two grouped queries
//! - [`state`] - Persisted property selection
//! - [`config`] - Configuration management with environment variable support
//! - [`logging`] - Structured logging with JSON and pretty-print formats
//!
//! ## Row pipeline
//!
//! ```rust
//! use ga4_report::models::{ApiRow, CellValue, ValueCell};
//! use ga4_report::pipeline::RowShaper;
//! use ga4_report::query::QuerySpec;
//!
//! let query = QuerySpec::new(vec!["domain".to_string()], vec!["sessions".to_string()]);
//! let shaper = RowShaper::new(&query);
//! assert_eq!(shaper.resolved().api_dimensions, vec!["pagePath".to_string()]);
//!
//! let raw = ApiRow {
//!     dimension_values: vec![ValueCell { value: Some("/products/shoe".to_string()) }],
//!     metric_values: vec![ValueCell { value: Some("5".to_string()) }],
//! };
//! let row = shaper.shape(&raw);
//! assert_eq!(row["domain"], CellValue::text("example.com"));
//! assert!(!row.contains_key("pagePath"));
//! ```

pub mod client;
pub mod config;
pub mod dimensions;
pub mod display;
pub mod flow;
pub mod logging;
pub mod models;
pub mod pipeline;
pub mod presets;
pub mod query;
pub mod reporter;
pub mod state;
pub mod view;

pub use models::{CellValue, Row};
pub use pipeline::RowShaper;
pub use query::QuerySpec;
pub use reporter::AnalyticsReporter;
