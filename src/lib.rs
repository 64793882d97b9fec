//! # tms-migrate: Legacy Tenant-Management Data Migration
//!
//! Reads the CSV exports of the legacy tenant-management database and turns
//! them into SQL `INSERT` statements for the new schema, replacing every
//! legacy key with a fresh UUID along the way.
//!
//! ## Features
//!
//! - **Field normalization**: text escaping, integer coercion, boolean
//!   normalization and multi-layout date parsing ([`normalize`])
//! - **Identifier remapping**: legacy keys mapped to new ids per entity, with
//!   foreign keys stitched across nine dependent record types ([`migrate`])
//! - **Migration report**: rows migrated, skipped and degraded per pass
//!   ([`report`])
//!
//! ## Pass order
//!
//! ```text
//! user -> properties -> tenants -> rent factors -> transactions
//!      -> tenant outstandings -> tenant debit notes
//!      -> outstanding payment mappings -> penalties
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use tms_migrate::{MigrationConfig, Migrator};
//!
//! let config = MigrationConfig::load_or_default("migration.yaml")?;
//! let output = Migrator::new(config.clone()).run()?;
//! output.write_sql(&config.output_file)?;
//! # Ok::<(), tms_migrate::MigrationError>(())
//! ```

// Core modules
pub mod entity;
pub mod error;
pub mod normalize;
pub mod id_map;
pub mod statement;
pub mod report;

// CSV sources and configuration
pub mod source;
pub mod config;

// The nine passes and their driver
pub mod migrate;

// Re-export key types
pub use entity::{EntityKind, InsertRecord, SqlValue};
pub use error::MigrationError;
pub use normalize::{clean, Cleaned, FieldType};
pub use id_map::{IdentifierMap, IdentifierMapBuilder};
pub use report::{Degradation, MigrationReport, PassReport, SkipReason};
pub use source::{SourceRow, SourceTable};
pub use config::{AdminUser, MigrationConfig};
pub use migrate::{MigrationOutput, Migrator, RowOutcome};
