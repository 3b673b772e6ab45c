//! Duplicate detection and run orchestration.
//!
//! This module provides functionality for:
//! - Merge-eligibility grouping (device, permissions, owner, group, size)
//! - Content matching by full-file hash
//! - The [`Deduplicator`] that drives a whole run

pub mod finder;
pub mod groups;
pub mod matcher;

pub use finder::{deduplicate, DedupConfig, Deduplicator};
pub use groups::{group_candidates, CandidateGroup, CandidateKey, ContentGroup, GroupingStats};
pub use matcher::{match_contents, MatchStats, MatcherConfig};
