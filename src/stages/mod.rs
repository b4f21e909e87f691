//! Stage functions.
//!
//! Each stage takes the dataset produced by the previous one and returns the next:
//!
//! - [`load`]: delimited file -> all-text [`crate::types::DataSet`]
//! - [`validate`]: required-column check (never mutates)
//! - [`clean`]: lowercase `email`, parse `signup_date`, type integral `id`s, drop rows missing `id`/`email`
//! - [`transform`]: derive `days_since_signup`
//! - [`persist`]: replace the destination relation in SQLite
//!
//! [`crate::pipeline::Pipeline`] runs them in that order. They are public so a single stage can
//! be exercised on its own.

pub mod clean;
pub mod load;
pub mod persist;
pub mod transform;
pub mod validate;

pub use clean::{clean, CleanOutcome};
pub use load::{load_from_path, load_from_reader};
pub use persist::{persist, PersistStats};
pub use transform::{transform, transform_at};
pub use validate::{validate, ValidationReport};

/// Customer identifier column.
pub const ID: &str = "id";
/// Display name column.
pub const NAME: &str = "name";
/// Contact email column.
pub const EMAIL: &str = "email";
/// Signup date column.
pub const SIGNUP_DATE: &str = "signup_date";
/// Column derived by the transform stage.
pub const DAYS_SINCE_SIGNUP: &str = "days_since_signup";

/// Columns every input must carry.
pub const REQUIRED_COLUMNS: [&str; 4] = [ID, NAME, EMAIL, SIGNUP_DATE];
