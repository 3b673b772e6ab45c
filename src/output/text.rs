//! Human-readable run summary.
//!
//! Lists every merge (or planned merge) and every failure, then a short
//! summary block. Colors come from `yansi` and follow its global switch,
//! so `--no-color` is handled by the caller disabling yansi.

use std::io::{self, Write};

use bytesize::ByteSize;
use yansi::Paint;

use crate::report::{Outcome, Report};

/// Text formatter for a [`Report`].
#[derive(Debug)]
pub struct TextOutput<'a> {
    report: &'a Report,
    dry_run: bool,
}

impl<'a> TextOutput<'a> {
    /// Create text output for a report.
    #[must_use]
    pub fn new(report: &'a Report, dry_run: bool) -> Self {
        Self { report, dry_run }
    }

    /// Write the listing and summary.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        for outcome in &self.report.outcomes {
            match outcome {
                Outcome::Merged {
                    path,
                    representative,
                    ..
                } => writeln!(
                    writer,
                    "{} {} -> {}",
                    "linked".green(),
                    path.display(),
                    representative.display()
                )?,
                Outcome::Planned {
                    path,
                    representative,
                    ..
                } => writeln!(
                    writer,
                    "{} {} -> {}",
                    "would link".cyan(),
                    path.display(),
                    representative.display()
                )?,
                Outcome::Failed { path, cause } => {
                    writeln!(
                        writer,
                        "{} {}: {}",
                        "failed".red().bold(),
                        path.display(),
                        cause.message
                    )?;
                    if let Some(ref staged) = cause.staged_path {
                        writeln!(
                            writer,
                            "       {} {}",
                            "original content at".yellow(),
                            staged.display()
                        )?;
                    }
                }
            }
        }

        self.write_summary(writer)
    }

    fn write_summary<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        let stats = &self.report.stats;

        if !self.report.outcomes.is_empty() {
            writeln!(writer)?;
        }
        writeln!(
            writer,
            "{} {} files ({}) in {} ms",
            "Scanned".bold(),
            stats.files_scanned,
            ByteSize::b(stats.bytes_scanned),
            stats.duration_ms
        )?;
        writeln!(
            writer,
            "  {} candidate groups, {} identical groups",
            stats.candidate_groups, stats.content_groups
        )?;

        if self.dry_run {
            let planned_bytes: u64 = self
                .report
                .outcomes
                .iter()
                .filter_map(|o| match o {
                    Outcome::Planned { size, .. } => Some(*size),
                    _ => None,
                })
                .sum();
            writeln!(
                writer,
                "  {} files would be linked (up to {})",
                stats.planned.cyan(),
                ByteSize::b(planned_bytes)
            )?;
        } else {
            writeln!(
                writer,
                "  {} files linked, {} reclaimed",
                stats.merged.green(),
                ByteSize::b(stats.bytes_reclaimed)
            )?;
        }

        let skipped = stats.already_linked + stats.cross_device + stats.linked_paths_skipped;
        if skipped > 0 {
            writeln!(
                writer,
                "  {} already linked, {} on other devices",
                stats.already_linked + stats.linked_paths_skipped,
                stats.cross_device
            )?;
        }
        if stats.failures > 0 {
            writeln!(writer, "  {} failures", stats.failures.red().bold())?;
        }
        if stats.interrupted {
            writeln!(writer, "  {}", "Interrupted before completion".yellow())?;
        }
        Ok(())
    }
}
