//! Entity migration in dependency order.
//!
//! The [`Migrator`] runs the nine passes one after another. Identifier maps
//! flow forward by shared reference: properties feed tenants and
//! transactions, tenants feed everything tenant-owned, and outstandings plus
//! transactions feed the payment mappings.

pub mod passes;
pub mod record;

pub use passes::{
    migrate_debit_notes, migrate_outstandings, migrate_payment_mappings, migrate_penalties,
    migrate_properties, migrate_rent_factors, migrate_tenants, migrate_transactions, run_pass,
    seed_owner, PassOutput,
};
pub use record::{MigratedRow, RecordBuilder, RowOutcome};

use std::path::{Path, PathBuf};
use uuid::Uuid;

use crate::config::MigrationConfig;
use crate::entity::{EntityKind, InsertRecord};
use crate::error::{MigrationError, Result};
use crate::id_map::IdentifierMap;
use crate::report::MigrationReport;
use crate::source::SourceTable;
use crate::statement;

/// A source file that passed the header check
#[derive(Debug, Clone)]
pub struct SourceCheck {
    pub entity: EntityKind,
    pub path: PathBuf,
    pub columns: usize,
}

/// Everything a completed run produced
#[derive(Debug, Clone)]
pub struct MigrationOutput {
    /// Id of the synthetic admin user that owns the migrated data
    pub owner_id: Uuid,
    /// Insert records in pass order
    pub records: Vec<InsertRecord>,
    pub report: MigrationReport,
}

impl MigrationOutput {
    /// Append a pass's records and report, handing back its identifier map.
    fn absorb(&mut self, pass: PassOutput) -> IdentifierMap {
        self.records.extend(pass.records);
        self.report.push(pass.report);
        pass.ids
    }

    /// Write all statements to `path`. Returns the number written.
    pub fn write_sql<P: AsRef<Path>>(&self, path: P) -> Result<usize> {
        statement::write_sql_file(path, &self.records)
    }

    /// Write the JSON report and the SQL file, skipping whichever path is
    /// `None`. The report is written first, so a failed report write leaves
    /// no SQL file. Returns the number of statements written, if any.
    pub fn write_files(&self, sql: Option<&Path>, report: Option<&Path>) -> Result<Option<usize>> {
        if let Some(report) = report {
            self.report.write_json(report)?;
        }
        sql.map(|path| self.write_sql(path)).transpose()
    }

    /// Records produced for one entity, in source order
    pub fn records_for(&self, entity: EntityKind) -> impl Iterator<Item = &InsertRecord> {
        self.records.iter().filter(move |r| r.entity() == entity)
    }
}

/// Runs a full migration for one configuration
pub struct Migrator {
    config: MigrationConfig,
}

impl Migrator {
    pub fn new(config: MigrationConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &MigrationConfig {
        &self.config
    }

    /// Open the source table for `entity`, checking its header.
    pub fn open_source(&self, entity: EntityKind) -> Result<SourceTable> {
        let path = self
            .config
            .source_path(entity)
            .ok_or_else(|| MigrationError::Config {
                path: self.config.input_dir.clone(),
                message: format!("{} has no source file", entity.label()),
            })?;
        SourceTable::open(path, entity.required_columns())
    }

    /// Check that every source file exists and carries its required columns.
    ///
    /// Stops at the first failing source.
    pub fn validate_sources(&self) -> Result<Vec<SourceCheck>> {
        EntityKind::ALL
            .into_iter()
            .filter(|entity| entity.default_source().is_some())
            .map(|entity| {
                let source = self.open_source(entity)?;
                Ok(SourceCheck {
                    entity,
                    path: source.path().to_path_buf(),
                    columns: source.headers().len(),
                })
            })
            .collect()
    }

    /// Run all nine passes.
    ///
    /// Sources are checked before the first pass, so a missing file or
    /// column fails the run before any work is done.
    pub fn run(&self) -> Result<MigrationOutput> {
        tracing::info!(input_dir = %self.config.input_dir.display(), "Starting migration");
        self.validate_sources()?;

        let (owner_id, owner) = seed_owner(&self.config.admin);
        let mut output = MigrationOutput {
            owner_id,
            records: Vec::new(),
            report: MigrationReport::new(),
        };
        output.absorb(owner);

        let pass = migrate_properties(&mut self.open_source(EntityKind::Property)?, owner_id)?;
        let properties = output.absorb(pass);

        let pass = migrate_tenants(
            &mut self.open_source(EntityKind::Tenant)?,
            owner_id,
            &properties,
        )?;
        let tenants = output.absorb(pass);

        let pass = migrate_rent_factors(&mut self.open_source(EntityKind::RentFactor)?, &tenants)?;
        output.absorb(pass);

        let pass = migrate_transactions(
            &mut self.open_source(EntityKind::Transaction)?,
            owner_id,
            &tenants,
            &properties,
        )?;
        let transactions = output.absorb(pass);

        let pass = migrate_outstandings(&mut self.open_source(EntityKind::Outstanding)?, &tenants)?;
        let outstandings = output.absorb(pass);

        let pass = migrate_debit_notes(&mut self.open_source(EntityKind::DebitNote)?, &tenants)?;
        output.absorb(pass);

        let pass = migrate_payment_mappings(
            &mut self.open_source(EntityKind::OutstandingPaymentMapping)?,
            &outstandings,
            &transactions,
        )?;
        output.absorb(pass);

        let pass = migrate_penalties(&mut self.open_source(EntityKind::Penalty)?)?;
        let penalties = output.absorb(pass);
        tracing::debug!(penalties = penalties.len(), "Penalty ids mapped");

        tracing::info!(
            statements = output.records.len(),
            skipped = output.report.total_skipped(),
            "Migration complete"
        );
        Ok(output)
    }
}
