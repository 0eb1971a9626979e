//! Per-record outcome reporting for mask generation.
//!
//! Mirrors the structure of a validation report: a flat list of entries,
//! counters derived from it, and a human-readable `Display`. The report also
//! serializes to JSON for programmatic use.

use serde::Serialize;
use std::fmt;

use crate::normalize::RegionRecord;

/// The result of rasterizing a batch of region records.
#[derive(Clone, Debug, Default, Serialize)]
pub struct RenderReport {
    /// True when no files were written.
    pub dry_run: bool,
    /// One entry per record processed, in processing order.
    pub outcomes: Vec<RenderOutcome>,
}

impl RenderReport {
    /// Creates a new empty report.
    pub fn new(dry_run: bool) -> Self {
        Self {
            dry_run,
            outcomes: Vec::new(),
        }
    }

    /// Records a successfully produced (or, in a dry run, planned) mask.
    pub fn add_success(&mut self, record: &RegionRecord, mask: String, width: u32, height: u32) {
        let status = if self.dry_run {
            RenderStatus::Planned { width, height }
        } else {
            RenderStatus::Written { width, height }
        };
        self.outcomes.push(RenderOutcome::new(record, mask, status));
    }

    /// Records a failed record together with the reason.
    pub fn add_failure(&mut self, record: &RegionRecord, mask: String, reason: impl Into<String>) {
        let status = RenderStatus::Failed {
            reason: reason.into(),
        };
        self.outcomes.push(RenderOutcome::new(record, mask, status));
    }

    /// Number of records processed.
    pub fn total(&self) -> usize {
        self.outcomes.len()
    }

    /// Number of masks written or planned.
    pub fn success_count(&self) -> usize {
        self.outcomes.iter().filter(|o| !o.is_failure()).count()
    }

    /// Number of records that failed.
    pub fn failure_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_failure()).count()
    }

    /// Returns true if every record succeeded.
    pub fn is_ok(&self) -> bool {
        self.failure_count() == 0
    }

    /// Iterate over failed outcomes.
    pub fn failures(&self) -> impl Iterator<Item = &RenderOutcome> {
        self.outcomes.iter().filter(|o| o.is_failure())
    }
}

impl fmt::Display for RenderReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let verb = if self.dry_run { "Planned" } else { "Wrote" };
        writeln!(f, "{} {} mask(s)", verb, self.success_count())?;

        for outcome in self.outcomes.iter().filter(|o| !o.is_failure()) {
            writeln!(f, "  {}", outcome)?;
        }

        let failures = self.failure_count();
        if failures > 0 {
            writeln!(f)?;
            writeln!(f, "Failed ({}):", failures)?;
            for outcome in self.failures() {
                writeln!(f, "  {}", outcome)?;
            }
        }

        Ok(())
    }
}

/// What happened to a single region record.
#[derive(Clone, Debug, Serialize)]
pub struct RenderOutcome {
    /// Source image file name, `{filename}.{filetype}`.
    pub source: String,
    /// Class label (empty for untyped regions).
    #[serde(rename = "type")]
    pub region_type: String,
    pub count: usize,
    /// Mask file name inside the output directory.
    pub mask: String,
    #[serde(flatten)]
    pub status: RenderStatus,
}

impl RenderOutcome {
    fn new(record: &RegionRecord, mask: String, status: RenderStatus) -> Self {
        Self {
            source: record.source_file_name(),
            region_type: record.region_type.clone(),
            count: record.count,
            mask,
            status,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self.status, RenderStatus::Failed { .. })
    }
}

impl fmt::Display for RenderOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.status {
            RenderStatus::Written { width, height } | RenderStatus::Planned { width, height } => {
                write!(f, "{} -> {} ({}x{})", self.source, self.mask, width, height)
            }
            RenderStatus::Failed { reason } => {
                write!(f, "{} -> {}: {}", self.source, self.mask, reason)
            }
        }
    }
}

/// Outcome kind for one record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RenderStatus {
    /// The mask was written to disk.
    Written { width: u32, height: u32 },
    /// Dry run: the mask would have been written.
    Planned { width: u32, height: u32 },
    /// The record could not be rasterized.
    Failed { reason: String },
}
