//! Per-row record building and outcomes.

use uuid::Uuid;

use crate::entity::{EntityKind, InsertRecord, SqlValue};
use crate::error::Result;
use crate::normalize::{clean, FieldType};
use crate::report::{Degradation, FieldDegradation, SkipReason};
use crate::source::SourceRow;

/// What happened to one source row
#[derive(Debug, Clone, PartialEq)]
pub enum RowOutcome {
    Migrated(MigratedRow),
    Skipped(SkipReason),
}

/// A row that produced an insert record
#[derive(Debug, Clone, PartialEq)]
pub struct MigratedRow {
    pub record: InsertRecord,
    /// Legacy key to record in the pass's identifier map, if the entity is
    /// referenced by later passes
    pub legacy_key: Option<String>,
    pub degradations: Vec<FieldDegradation>,
}

/// Builds the insert record for one source row, cleaning each source
/// column into its target column and keeping track of degradations.
pub struct RecordBuilder<'r> {
    row: &'r SourceRow,
    record: InsertRecord,
    legacy_key: Option<String>,
    degradations: Vec<FieldDegradation>,
}

impl<'r> RecordBuilder<'r> {
    /// Start a record with a freshly generated id
    pub fn new(entity: EntityKind, row: &'r SourceRow) -> Self {
        Self {
            row,
            record: InsertRecord::new(entity, Uuid::new_v4()),
            legacy_key: None,
            degradations: Vec::new(),
        }
    }

    /// Id generated for this record
    pub fn id(&self) -> Uuid {
        self.record.id().unwrap_or_default()
    }

    /// Remember the row's legacy key so later passes can resolve it.
    pub fn legacy_key(&mut self, source: &str) -> Result<&mut Self> {
        self.legacy_key = Some(self.row.key(source)?.to_string());
        Ok(self)
    }

    pub fn text(&mut self, column: &'static str, source: &str) -> Result<&mut Self> {
        self.field(column, source, FieldType::Text)
    }

    pub fn integer(&mut self, column: &'static str, source: &str) -> Result<&mut Self> {
        self.field(column, source, FieldType::Integer)
    }

    pub fn boolean(&mut self, column: &'static str, source: &str) -> Result<&mut Self> {
        self.field(column, source, FieldType::Boolean)
    }

    pub fn date(&mut self, column: &'static str, source: &str) -> Result<&mut Self> {
        self.field(column, source, FieldType::Date)
    }

    /// A foreign key that must exist; callers skip the row before this point
    /// when it does not.
    pub fn id_ref(&mut self, column: &'static str, id: Uuid) -> &mut Self {
        self.record.push(column, SqlValue::Uuid(id));
        self
    }

    /// A nullable foreign key. An unresolved reference is written as NULL
    /// and counted.
    pub fn optional_ref(&mut self, column: &'static str, id: Option<Uuid>) -> &mut Self {
        if id.is_none() {
            self.degrade(column, Degradation::UnresolvedReference);
        }
        self.record.push(column, SqlValue::reference(id));
        self
    }

    fn field(&mut self, column: &'static str, source: &str, field_type: FieldType) -> Result<&mut Self> {
        let cleaned = clean(self.row.get(source)?, field_type);
        if let Some(kind) = cleaned.degradation {
            self.degrade(column, kind);
        }
        self.record.push(column, cleaned.value);
        Ok(self)
    }

    fn degrade(&mut self, column: &'static str, kind: Degradation) {
        tracing::debug!(
            file = self.row.file(),
            line = self.row.line(),
            column,
            ?kind,
            "Degraded field"
        );
        self.degradations.push(FieldDegradation { column, kind });
    }

    pub fn finish(self) -> RowOutcome {
        RowOutcome::Migrated(MigratedRow {
            record: self.record,
            legacy_key: self.legacy_key,
            degradations: self.degradations,
        })
    }
}
