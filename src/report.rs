//! Migration report: what each pass migrated, skipped and degraded.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use crate::entity::EntityKind;
use crate::error::{MigrationError, Result};

/// A lossy but non-fatal coercion of one field
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Degradation {
    /// Integer column that did not parse and was written as 0
    IntegerCoercedToZero,
    /// Integer column holding a number too large for a 64-bit column,
    /// written as 0
    IntegerOutOfRange,
    /// Date column that matched no known layout and was written as NULL
    DateUnparsed,
    /// Boolean column holding something other than 0/1, written as false
    BooleanDefaulted,
    /// Foreign key that did not resolve and was written as NULL
    UnresolvedReference,
}

impl fmt::Display for Degradation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Degradation::IntegerCoercedToZero => "integers coerced to 0",
            Degradation::IntegerOutOfRange => "out-of-range integers set to 0",
            Degradation::DateUnparsed => "unparsed dates set to NULL",
            Degradation::BooleanDefaulted => "unexpected booleans set to false",
            Degradation::UnresolvedReference => "unresolved references set to NULL",
        };
        f.write_str(text)
    }
}

/// Why a source row produced no insert
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    UnresolvedTenant,
    UnresolvedOutstanding,
    UnresolvedPayment,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            SkipReason::UnresolvedTenant => "unknown tenant",
            SkipReason::UnresolvedOutstanding => "unknown outstanding",
            SkipReason::UnresolvedPayment => "unknown payment",
        };
        f.write_str(text)
    }
}

/// A degradation tied to the target column it affected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FieldDegradation {
    pub column: &'static str,
    pub kind: Degradation,
}

/// Counters for a single pass
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PassReport {
    pub entity: EntityKind,
    pub rows_read: usize,
    pub migrated: usize,
    pub skipped: BTreeMap<SkipReason, usize>,
    pub degraded: BTreeMap<Degradation, usize>,
}

impl PassReport {
    pub fn new(entity: EntityKind) -> Self {
        Self {
            entity,
            rows_read: 0,
            migrated: 0,
            skipped: BTreeMap::new(),
            degraded: BTreeMap::new(),
        }
    }

    pub fn record_migrated(&mut self, degradations: &[FieldDegradation]) {
        self.migrated += 1;
        for degradation in degradations {
            *self.degraded.entry(degradation.kind).or_insert(0) += 1;
        }
    }

    pub fn record_skipped(&mut self, reason: SkipReason) {
        *self.skipped.entry(reason).or_insert(0) += 1;
    }

    pub fn skipped_total(&self) -> usize {
        self.skipped.values().sum()
    }

    pub fn degraded_total(&self) -> usize {
        self.degraded.values().sum()
    }

    pub fn skipped_for(&self, reason: SkipReason) -> usize {
        self.skipped.get(&reason).copied().unwrap_or(0)
    }

    pub fn degraded_for(&self, kind: Degradation) -> usize {
        self.degraded.get(&kind).copied().unwrap_or(0)
    }
}

/// Report for a whole run, one entry per pass in pass order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MigrationReport {
    pub passes: Vec<PassReport>,
}

impl MigrationReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, pass: PassReport) {
        self.passes.push(pass);
    }

    pub fn pass(&self, entity: EntityKind) -> Option<&PassReport> {
        self.passes.iter().find(|p| p.entity == entity)
    }

    pub fn total_migrated(&self) -> usize {
        self.passes.iter().map(|p| p.migrated).sum()
    }

    pub fn total_skipped(&self) -> usize {
        self.passes.iter().map(PassReport::skipped_total).sum()
    }

    /// Degradation counts summed over every pass
    pub fn degradation_totals(&self) -> BTreeMap<Degradation, usize> {
        let mut totals = BTreeMap::new();
        for pass in &self.passes {
            for (kind, count) in &pass.degraded {
                *totals.entry(*kind).or_insert(0) += count;
            }
        }
        totals
    }

    /// Write the report as pretty-printed JSON.
    pub fn write_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json).map_err(|source| MigrationError::Io {
            path: path.to_path_buf(),
            source,
        })
    }
}
