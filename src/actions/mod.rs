//! Filesystem actions.
//!
//! The only action is [`merge`]: replacing confirmed duplicates with
//! hardlinks to a single representative, through a staging rename so
//! that a failed link never loses the original.
//!
//! ```no_run
//! use linkdupe::actions::merge::{MergeConfig, Merger};
//!
//! let merger = Merger::new(MergeConfig::default().with_dry_run(true));
//! let summary = merger.merge_all(&[]);
//! assert_eq!(summary.planned, 0);
//! ```

pub mod merge;

pub use merge::{LinkAction, LinkOps, MergeConfig, MergeError, MergeSummary, Merger, OsLinkOps};
