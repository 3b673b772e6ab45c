//! Output formatters for run reports.
//!
//! - [`text`]: human-readable listing and summary
//! - [`json`]: machine-readable document for scripting
//!
//! # Example
//!
//! ```no_run
//! use linkdupe::duplicates::deduplicate;
//! use linkdupe::output::JsonOutput;
//! use std::path::Path;
//!
//! let report = deduplicate(Path::new(".")).unwrap();
//! println!("{}", JsonOutput::new(&report, false).to_json_pretty().unwrap());
//! ```

pub mod json;
pub mod text;

pub use json::JsonOutput;
pub use text::TextOutput;
