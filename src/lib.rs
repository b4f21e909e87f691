//! `customer-cleaning` is a small batch pipeline that turns a customer export (a delimited file)
//! into a cleaned SQLite relation.
//!
//! A run goes through five stages, in order, each consuming the dataset produced by the
//! previous one:
//!
//! 1. **Load** ([`stages::load`]): read the file into an in-memory [`types::DataSet`].
//! 2. **Validate** ([`stages::validate`]): check for `id`, `name`, `email`, `signup_date`.
//! 3. **Clean** ([`stages::clean`]): lowercase `email`, parse `signup_date`, type `id`, and drop
//!    rows without `id` or `email`.
//! 4. **Transform** ([`stages::transform`]): derive `days_since_signup`.
//! 5. **Persist** ([`stages::persist`]): replace the `customers` relation in one transaction.
//!
//! The first failing stage stops the run and its [`PipelineError`] is returned unchanged.
//!
//! ## Quick example
//!
//! ```no_run
//! use customer_cleaning::config::{PipelineOptions, StoreOptions};
//! use customer_cleaning::pipeline::Pipeline;
//!
//! # fn main() -> Result<(), customer_cleaning::PipelineError> {
//! let pipeline = Pipeline::new(PipelineOptions {
//!     store: StoreOptions {
//!         database_path: "data/cleaned_customers.db".into(),
//!         table: "customers".to_string(),
//!     },
//!     ..Default::default()
//! });
//! let summary = pipeline.run("data/raw/customers.csv")?;
//! println!("persisted {} rows", summary.rows_persisted);
//! # Ok(())
//! # }
//! ```
//!
//! ## Handling errors by kind
//!
//! Type-coercion failures are a refinement of cleaning failures, so a caller can match broadly
//! or narrowly:
//!
//! ```rust
//! use customer_cleaning::{CleaningFailure, PipelineError};
//! use customer_cleaning::types::DataType;
//!
//! let err = PipelineError::wrong_data_type("signup_date", 2, "last tuesday", DataType::Timestamp);
//! match &err {
//!     PipelineError::CleaningData { failure: CleaningFailure::WrongDataType { .. }, column } => {
//!         assert_eq!(column, "signup_date");
//!     }
//!     PipelineError::CleaningData { .. } => unreachable!("generic cleaning failure"),
//!     _ => unreachable!(),
//! }
//! assert!(err.is_cleaning_error());
//! ```
//!
//! ## Modules
//!
//! - [`pipeline`]: the orchestrator and its observer hooks
//! - [`stages`]: the five stage functions
//! - [`types`]: schema + in-memory dataset types
//! - [`config`]: option structs and the data directory layout
//! - [`cache`]: JSON snapshots of intermediate datasets
//! - [`summary`]: descriptive statistics and value counts
//! - [`error`]: error types

pub mod cache;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod stages;
pub mod summary;
pub mod types;

pub use error::{CacheError, CleaningFailure, PipelineError, PipelineResult};
pub use pipeline::{run, Pipeline, PipelineStage, RunSummary};
