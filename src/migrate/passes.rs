//! The nine migration passes.
//!
//! Each pass reads one source table, takes the identifier maps of earlier
//! passes by shared reference, and returns its records, its report and its
//! own (frozen) identifier map.

use std::io::Read;
use uuid::Uuid;

use crate::config::AdminUser;
use crate::entity::{EntityKind, InsertRecord, SqlValue};
use crate::error::Result;
use crate::id_map::{IdentifierMap, IdentifierMapBuilder};
use crate::migrate::record::{RecordBuilder, RowOutcome};
use crate::report::{PassReport, SkipReason};
use crate::source::{SourceRow, SourceTable};

/// Everything one pass produced
#[derive(Debug, Clone)]
pub struct PassOutput {
    pub records: Vec<InsertRecord>,
    pub report: PassReport,
    /// Legacy-to-new ids for the rows this pass migrated. Empty for entities
    /// nothing else refers to.
    pub ids: IdentifierMap,
}

/// Drive one pass over `source`, folding each row's outcome into the pass
/// output.
pub fn run_pass<R, F>(entity: EntityKind, source: &mut SourceTable<R>, mut migrate_row: F) -> Result<PassOutput>
where
    R: Read,
    F: FnMut(&SourceRow) -> Result<RowOutcome>,
{
    let mut report = PassReport::new(entity);
    let mut ids = IdentifierMapBuilder::new(entity);
    let mut records = Vec::new();

    for row in source.rows() {
        let row = row?;
        report.rows_read += 1;

        match migrate_row(&row)? {
            RowOutcome::Migrated(migrated) => {
                if let (Some(legacy), Some(id)) = (migrated.legacy_key, migrated.record.id()) {
                    ids.insert(legacy, id);
                }
                report.record_migrated(&migrated.degradations);
                records.push(migrated.record);
            }
            RowOutcome::Skipped(reason) => {
                tracing::debug!(
                    file = row.file(),
                    line = row.line(),
                    %reason,
                    "Skipped row"
                );
                report.record_skipped(reason);
            }
        }
    }

    log_pass(&report);
    Ok(PassOutput {
        records,
        report,
        ids: ids.freeze(),
    })
}

fn log_pass(report: &PassReport) {
    tracing::info!(
        entity = report.entity.key(),
        rows = report.rows_read,
        migrated = report.migrated,
        skipped = report.skipped_total(),
        "Processed {}",
        report.entity
    );

    for (reason, count) in &report.skipped {
        tracing::warn!(entity = report.entity.key(), count, "Skipped rows: {}", reason);
    }
    for (kind, count) in &report.degraded {
        tracing::warn!(entity = report.entity.key(), count, "Degraded fields: {}", kind);
    }
}

/// Pass 1: the synthetic admin user that owns every migrated record.
pub fn seed_owner(admin: &AdminUser) -> (Uuid, PassOutput) {
    let id = Uuid::new_v4();
    let record = InsertRecord::new(EntityKind::User, id)
        .with("name", SqlValue::Text(admin.name.clone()))
        .with("email", SqlValue::Text(admin.email.clone()))
        .with("password", SqlValue::Text(admin.password_hash.clone()));

    let mut report = PassReport::new(EntityKind::User);
    report.record_migrated(&[]);
    log_pass(&report);

    let output = PassOutput {
        records: vec![record],
        report,
        ids: IdentifierMap::empty(EntityKind::User),
    };
    (id, output)
}

/// Pass 2: properties, keyed by `PROPERTY_ID`.
pub fn migrate_properties<R: Read>(source: &mut SourceTable<R>, owner: Uuid) -> Result<PassOutput> {
    run_pass(EntityKind::Property, source, |row| {
        let mut record = RecordBuilder::new(EntityKind::Property, row);
        record
            .legacy_key("PROPERTY_ID")?
            .text("name", "PROPERTY_NAME")?
            .text("address", "ADDRESS")?
            .text("landlord_name", "LANDLORD_NAME")?
            .text("property_bill_name", "PROPERTY_BILL_NAME")?
            .text("ward", "WARD")?
            .integer("number_of_blocks", "NUMBER_OF_BLOCKS")?
            .text("phone_number", "PHONE_NUMBER")?
            .text("fax_number", "FAX_NUMBER")?
            .id_ref("user_id", owner)
            .date("created_at", "CREATED_ON")?
            .date("updated_at", "UPDATED_ON")?;
        Ok(record.finish())
    })
}

/// Pass 3: tenants. An unknown property leaves `property_id` NULL but keeps
/// the tenant.
pub fn migrate_tenants<R: Read>(
    source: &mut SourceTable<R>,
    owner: Uuid,
    properties: &IdentifierMap,
) -> Result<PassOutput> {
    run_pass(EntityKind::Tenant, source, |row| {
        let property = properties.resolve(row.key("PROPERTY_ID")?);

        let mut record = RecordBuilder::new(EntityKind::Tenant, row);
        record
            .legacy_key("TENANT_ID")?
            .text("name", "TENANT_NAME")?
            .text("salutation", "SALUTATION")?
            .text("building_floor", "BUILDING_FLOOR")?
            .text("property_type", "PROPERTY_TYPE")?
            .text("property_number", "PROPERTY_NUMBER")?
            .text("phone", "TENANT_MOBILE_NUMBER")?
            .text("notes", "NOTES")?
            .date("tenancy_date", "TENANCY_DATE")?
            .date("tenancy_end_date", "TENANCY_END_DATE")?
            .boolean("is_active", "IS_ACTIVE")?
            .boolean("send_sms", "SendSMS")?
            .text("tenant_code", "TENANT_CODE")?
            .integer("floor_sort_value", "FLOOR_SORT_VALUE")?
            .text("numeric_room_number", "Numberic_Room_Number")?
            .optional_ref("property_id", property)
            .id_ref("user_id", owner)
            .date("created_at", "CREATED_ON")?
            .date("updated_at", "UPDATED_ON")?;
        Ok(record.finish())
    })
}

/// Pass 4: rent factors. Rows for unknown tenants are dropped.
pub fn migrate_rent_factors<R: Read>(
    source: &mut SourceTable<R>,
    tenants: &IdentifierMap,
) -> Result<PassOutput> {
    run_pass(EntityKind::RentFactor, source, |row| {
        let Some(tenant) = tenants.resolve(row.key("TENANT_ID")?) else {
            return Ok(RowOutcome::Skipped(SkipReason::UnresolvedTenant));
        };

        let mut record = RecordBuilder::new(EntityKind::RentFactor, row);
        record
            .id_ref("tenant_id", tenant)
            .integer("basic_rent", "BASIC_RENT")?
            .integer("property_tax", "PROPERTY_TAX")?
            .integer("repair_cess", "REPAIR_CESS")?
            .integer("misc", "MISC")?
            .integer("cheque_return_charge", "CHEQUE_RETURN_CHARGE")?
            .text("financial_year", "FinancialYear")?
            .date("created_at", "CREATED_ON")?
            .date("updated_at", "UPDATED_ON")?;
        Ok(record.finish())
    })
}

/// Pass 5: payment entries become transactions. Rows for unknown tenants are
/// dropped; an unknown property is written as NULL.
pub fn migrate_transactions<R: Read>(
    source: &mut SourceTable<R>,
    owner: Uuid,
    tenants: &IdentifierMap,
    properties: &IdentifierMap,
) -> Result<PassOutput> {
    run_pass(EntityKind::Transaction, source, |row| {
        let Some(tenant) = tenants.resolve(row.key("TENANT_ID")?) else {
            return Ok(RowOutcome::Skipped(SkipReason::UnresolvedTenant));
        };
        let property = properties.resolve(row.key("PROPERTY_ID")?);

        let mut record = RecordBuilder::new(EntityKind::Transaction, row);
        record
            .legacy_key("ID")?
            .id_ref("tenant_id", tenant)
            .optional_ref("property_id", property)
            .date("rent_month", "RENT_MONTH")?
            .integer("penalty_amount", "PENALTY_AMOUNT")?
            .integer("current_rent", "CURRENT_RENT")?
            .integer("amount", "RECEIVED_AMOUNT")?
            .text("payment_method", "PAYMENT_METHOD")?
            .text("cheque_number", "CHEQUE_NUMBER")?
            .date("cheque_date", "CHEQUE_DATE")?
            .text("bank_name", "BANK_NAME")?
            .text("bank_branch", "BANK_BRANCH")?
            .text("group_payment_id", "GROUP_PAYMENT_ID")?
            .integer("payment_type", "PAYMENT_TYPE")?
            .id_ref("user_id", owner)
            .date("created_at", "ENTRY_CREATED_ON")?
            .date("updated_at", "ENTRY_UPDATED_ON")?;
        Ok(record.finish())
    })
}

/// Pass 6: tenant outstandings, kept in their own map for payment mappings.
pub fn migrate_outstandings<R: Read>(
    source: &mut SourceTable<R>,
    tenants: &IdentifierMap,
) -> Result<PassOutput> {
    run_pass(EntityKind::Outstanding, source, |row| {
        let Some(tenant) = tenants.resolve(row.key("TENANT_ID")?) else {
            return Ok(RowOutcome::Skipped(SkipReason::UnresolvedTenant));
        };

        let mut record = RecordBuilder::new(EntityKind::Outstanding, row);
        record
            .legacy_key("ID")?
            .id_ref("tenant_id", tenant)
            .integer("outstanding_type", "OUTSTANDING_TYPE")?
            .integer("outstanding_amount", "OUTSTANDING_AMOUNT")?
            .date("outstanding_as_on", "OUTSTANDING_AS_ON")?
            .date("created_at", "CREATED_ON")?
            .date("updated_at", "UPDATED_ON")?;
        Ok(record.finish())
    })
}

/// Pass 7: tenant debit notes. `AMOUNT` stays text as in the legacy table.
pub fn migrate_debit_notes<R: Read>(
    source: &mut SourceTable<R>,
    tenants: &IdentifierMap,
) -> Result<PassOutput> {
    run_pass(EntityKind::DebitNote, source, |row| {
        let Some(tenant) = tenants.resolve(row.key("TENANT_ID")?) else {
            return Ok(RowOutcome::Skipped(SkipReason::UnresolvedTenant));
        };

        let mut record = RecordBuilder::new(EntityKind::DebitNote, row);
        record
            .id_ref("tenant_id", tenant)
            .text("for_description", "FOR_DESCRIPTION")?
            .date("from_date", "FROM_DATE")?
            .date("to_date", "TO_DATE")?
            .text("amount", "AMOUNT")?
            .date("due_date", "DUE_DATE")?
            .date("created_at", "CREATED_ON")?
            .date("updated_at", "UPDATED_ON")?;
        Ok(record.finish())
    })
}

/// Pass 8: outstanding/payment links. Both sides must resolve.
pub fn migrate_payment_mappings<R: Read>(
    source: &mut SourceTable<R>,
    outstandings: &IdentifierMap,
    transactions: &IdentifierMap,
) -> Result<PassOutput> {
    run_pass(EntityKind::OutstandingPaymentMapping, source, |row| {
        let Some(outstanding) = outstandings.resolve(row.key("TENANT_OUTSTANDING_ID")?) else {
            return Ok(RowOutcome::Skipped(SkipReason::UnresolvedOutstanding));
        };
        let Some(payment) = transactions.resolve(row.key("PAYMENT_ID")?) else {
            return Ok(RowOutcome::Skipped(SkipReason::UnresolvedPayment));
        };

        let mut record = RecordBuilder::new(EntityKind::OutstandingPaymentMapping, row);
        record
            .id_ref("tenant_outstanding_id", outstanding)
            .id_ref("payment_id", payment)
            .date("created_at", "CREATED_ON")?;
        Ok(record.finish())
    })
}

/// Pass 9: penalty interest rates. Nothing in this run refers to them, but
/// their ids are still mapped.
pub fn migrate_penalties<R: Read>(source: &mut SourceTable<R>) -> Result<PassOutput> {
    run_pass(EntityKind::Penalty, source, |row| {
        let mut record = RecordBuilder::new(EntityKind::Penalty, row);
        record
            .legacy_key("ID")?
            .integer("interest_rate", "INTEREST_RATE")?
            .date("effective_from", "EFFECTIVE_FROM")?
            .date("created_at", "CREATED_ON")?
            .date("updated_at", "UPDATED_ON")?;
        Ok(record.finish())
    })
}
