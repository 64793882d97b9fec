//! End-to-end tests running the full migration over a directory of exports

use std::fs;
use std::path::Path;

use tms_migrate::{
    Degradation, EntityKind, MigrationConfig, MigrationError, Migrator, SkipReason, SqlValue,
};

const PROPERTY: &str = "PROPERTY_ID,PROPERTY_NAME,ADDRESS,LANDLORD_NAME,PROPERTY_BILL_NAME,WARD,NUMBER_OF_BLOCKS,PHONE_NUMBER,FAX_NUMBER,CREATED_ON,UPDATED_ON";
const TENANTS: &str = "TENANT_ID,PROPERTY_ID,TENANT_NAME,SALUTATION,BUILDING_FLOOR,PROPERTY_TYPE,PROPERTY_NUMBER,TENANT_MOBILE_NUMBER,NOTES,TENANCY_DATE,TENANCY_END_DATE,IS_ACTIVE,SendSMS,TENANT_CODE,FLOOR_SORT_VALUE,Numberic_Room_Number,CREATED_ON,UPDATED_ON";
const RENT_FACTORS: &str = "TENANT_ID,BASIC_RENT,PROPERTY_TAX,REPAIR_CESS,MISC,CHEQUE_RETURN_CHARGE,FinancialYear,CREATED_ON,UPDATED_ON";
const PAYMENTS: &str = "ID,TENANT_ID,PROPERTY_ID,RENT_MONTH,PENALTY_AMOUNT,CURRENT_RENT,RECEIVED_AMOUNT,PAYMENT_METHOD,CHEQUE_NUMBER,CHEQUE_DATE,BANK_NAME,BANK_BRANCH,GROUP_PAYMENT_ID,PAYMENT_TYPE,ENTRY_CREATED_ON,ENTRY_UPDATED_ON";
const OUTSTANDINGS: &str = "ID,TENANT_ID,OUTSTANDING_TYPE,OUTSTANDING_AMOUNT,OUTSTANDING_AS_ON,CREATED_ON,UPDATED_ON";
const DEBIT_NOTES: &str = "TENANT_ID,FOR_DESCRIPTION,FROM_DATE,TO_DATE,AMOUNT,DUE_DATE,CREATED_ON,UPDATED_ON";
const MAPPINGS: &str = "TENANT_OUTSTANDING_ID,PAYMENT_ID,CREATED_ON";
const PENALTIES: &str = "ID,INTEREST_RATE,EFFECTIVE_FROM,CREATED_ON,UPDATED_ON";

fn write_csv(dir: &Path, entity: EntityKind, header: &str, rows: &[&str]) {
    let mut contents = String::from(header);
    for row in rows {
        contents.push('\n');
        contents.push_str(row);
    }
    contents.push('\n');
    fs::write(dir.join(entity.default_source().unwrap()), contents).unwrap();
}

/// Write all eight exports with header rows only
fn write_empty_exports(dir: &Path) {
    write_csv(dir, EntityKind::Property, PROPERTY, &[]);
    write_csv(dir, EntityKind::Tenant, TENANTS, &[]);
    write_csv(dir, EntityKind::RentFactor, RENT_FACTORS, &[]);
    write_csv(dir, EntityKind::Transaction, PAYMENTS, &[]);
    write_csv(dir, EntityKind::Outstanding, OUTSTANDINGS, &[]);
    write_csv(dir, EntityKind::DebitNote, DEBIT_NOTES, &[]);
    write_csv(dir, EntityKind::OutstandingPaymentMapping, MAPPINGS, &[]);
    write_csv(dir, EntityKind::Penalty, PENALTIES, &[]);
}

fn config_for(dir: &Path) -> MigrationConfig {
    MigrationConfig {
        input_dir: dir.to_path_buf(),
        output_file: dir.join("out").join("migration_data.sql"),
        ..MigrationConfig::default()
    }
}

#[test]
fn test_property_and_tenant_are_linked() {
    let dir = tempfile::tempdir().unwrap();
    write_empty_exports(dir.path());
    write_csv(
        dir.path(),
        EntityKind::Property,
        PROPERTY,
        &["10,Sea View,1 Shore Rd,Mr Rao,Sea View,A,2,555,,01-04-23,"],
    );
    write_csv(
        dir.path(),
        EntityKind::Tenant,
        TENANTS,
        &["1,10,Asha,Ms,2,Shop,12,555,,01-04-20,,1,1,T1,2,12,,"],
    );

    let output = Migrator::new(config_for(dir.path())).run().unwrap();

    // admin user + one property + one tenant
    assert_eq!(output.records.len(), 3);
    assert_eq!(output.records[0].table(), "user");

    let properties: Vec<_> = output.records_for(EntityKind::Property).collect();
    let tenants: Vec<_> = output.records_for(EntityKind::Tenant).collect();
    assert_eq!(properties.len(), 1);
    assert_eq!(tenants.len(), 1);

    let property_id = properties[0].id().unwrap();
    assert_eq!(tenants[0].get("property_id"), Some(&SqlValue::Uuid(property_id)));
    assert_eq!(tenants[0].get("user_id"), Some(&SqlValue::Uuid(output.owner_id)));
    assert_eq!(properties[0].get("user_id"), Some(&SqlValue::Uuid(output.owner_id)));
    assert_ne!(property_id, tenants[0].id().unwrap());
}

#[test]
fn test_full_run_across_all_passes() {
    let dir = tempfile::tempdir().unwrap();
    write_empty_exports(dir.path());
    write_csv(
        dir.path(),
        EntityKind::Property,
        PROPERTY,
        &["10,Sea View,1 Shore Rd,D'Souza,Sea View,A,2,555,,01-04-23,"],
    );
    write_csv(
        dir.path(),
        EntityKind::Tenant,
        TENANTS,
        &[
            "1,10,Asha,Ms,2,Shop,12,555,,01-04-20,,1,0,T1,2,12,,",
            "2,42,Ravi,Mr,1,Flat,3,556,,01-04-21,,yes,0,T2,1,3,,",
        ],
    );
    write_csv(
        dir.path(),
        EntityKind::RentFactor,
        RENT_FACTORS,
        &["1,1000,10,5,0,100,2023-24,,", "9,500,10,5,0,100,2023-24,,"],
    );
    write_csv(
        dir.path(),
        EntityKind::Transaction,
        PAYMENTS,
        &[
            "100,1,10,01-04-23,0,1000,1000.0,Cash,,,,,G1,1,2023-04-02 09:00:00.000,",
            "101,2,10,01-04-23,0,900,900,Cash,,,,,G2,1,,",
            "102,9,10,01-04-23,0,900,900,Cash,,,,,G3,1,,",
        ],
    );
    write_csv(
        dir.path(),
        EntityKind::Outstanding,
        OUTSTANDINGS,
        &["5,1,2,300,31-03-23,,"],
    );
    write_csv(
        dir.path(),
        EntityKind::DebitNote,
        DEBIT_NOTES,
        &["1,Repairs,01-04-23,30-04-23,1500.50,15-05-2023,,"],
    );
    write_csv(
        dir.path(),
        EntityKind::OutstandingPaymentMapping,
        MAPPINGS,
        &["5,100,", "5,102,", "6,100,"],
    );
    write_csv(
        dir.path(),
        EntityKind::Penalty,
        PENALTIES,
        &["1,18,01-04-2020,,"],
    );

    let config = config_for(dir.path());
    let output = Migrator::new(config.clone()).run().unwrap();
    let report = &output.report;

    assert_eq!(report.passes.len(), 9);
    let order: Vec<_> = report.passes.iter().map(|p| p.entity).collect();
    assert_eq!(order, EntityKind::ALL.to_vec());

    assert_eq!(report.pass(EntityKind::Tenant).unwrap().migrated, 2);
    assert_eq!(
        report
            .pass(EntityKind::Tenant)
            .unwrap()
            .degraded_for(Degradation::UnresolvedReference),
        1
    );
    assert_eq!(
        report
            .pass(EntityKind::Tenant)
            .unwrap()
            .degraded_for(Degradation::BooleanDefaulted),
        1
    );
    assert_eq!(
        report
            .pass(EntityKind::RentFactor)
            .unwrap()
            .skipped_for(SkipReason::UnresolvedTenant),
        1
    );
    assert_eq!(report.pass(EntityKind::Transaction).unwrap().migrated, 2);
    assert_eq!(
        report
            .pass(EntityKind::OutstandingPaymentMapping)
            .unwrap()
            .skipped_for(SkipReason::UnresolvedPayment),
        1
    );
    assert_eq!(
        report
            .pass(EntityKind::OutstandingPaymentMapping)
            .unwrap()
            .skipped_for(SkipReason::UnresolvedOutstanding),
        1
    );
    // 1 user, 1 property, 2 tenants, 1 rent factor, 2 transactions,
    // 1 outstanding, 1 debit note, 1 mapping, 1 penalty
    assert_eq!(report.total_migrated(), 11);
    assert_eq!(report.total_skipped(), 4);

    // the mapping points at the migrated outstanding and transaction
    let outstanding = output.records_for(EntityKind::Outstanding).next().unwrap();
    let payment = output.records_for(EntityKind::Transaction).next().unwrap();
    let mapping = output
        .records_for(EntityKind::OutstandingPaymentMapping)
        .next()
        .unwrap();
    assert_eq!(
        mapping.get("tenant_outstanding_id"),
        Some(&SqlValue::Uuid(outstanding.id().unwrap()))
    );
    assert_eq!(mapping.get("payment_id"), Some(&SqlValue::Uuid(payment.id().unwrap())));

    let written = output.write_sql(&config.output_file).unwrap();
    assert_eq!(written, 11);

    let sql = fs::read_to_string(&config.output_file).unwrap();
    let lines: Vec<_> = sql.lines().collect();
    assert_eq!(lines.len(), 11);
    assert!(lines[0].starts_with("INSERT INTO \"user\" (id, name, email, password)"));
    assert!(lines[1].starts_with("INSERT INTO properties"));
    assert!(lines[1].contains("'D''Souza'"));
    assert!(lines[1].contains("'2023-04-01 00:00:00'"));
    assert!(lines.iter().all(|line| line.ends_with(");")));
    assert!(lines[10].starts_with("INSERT INTO penalties"));
}

#[test]
fn test_missing_source_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    write_empty_exports(dir.path());
    fs::remove_file(dir.path().join("Tenant_DebitNotes.csv")).unwrap();

    let config = config_for(dir.path());
    let err = Migrator::new(config.clone()).run().unwrap_err();

    match err {
        MigrationError::SourceMissing { path } => {
            assert!(path.ends_with("Tenant_DebitNotes.csv"));
        }
        other => panic!("unexpected error: {}", other),
    }
    assert!(!config.output_file.exists());
}

#[test]
fn test_missing_column_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    write_empty_exports(dir.path());
    write_csv(
        dir.path(),
        EntityKind::Penalty,
        "ID,INTEREST_RATE,CREATED_ON,UPDATED_ON",
        &[],
    );

    let err = Migrator::new(config_for(dir.path())).validate_sources().unwrap_err();
    match err {
        MigrationError::MissingColumn { column, .. } => assert_eq!(column, "EFFECTIVE_FROM"),
        other => panic!("unexpected error: {}", other),
    }
}

#[test]
fn test_validate_sources_lists_every_file() {
    let dir = tempfile::tempdir().unwrap();
    write_empty_exports(dir.path());

    let checks = Migrator::new(config_for(dir.path())).validate_sources().unwrap();

    assert_eq!(checks.len(), 8);
    assert_eq!(checks[0].entity, EntityKind::Property);
    assert_eq!(checks[0].columns, 11);
    assert!(checks.iter().all(|c| c.entity != EntityKind::User));
}

#[test]
fn test_empty_exports_still_seed_owner() {
    let dir = tempfile::tempdir().unwrap();
    write_empty_exports(dir.path());

    let config = config_for(dir.path());
    let output = Migrator::new(config.clone()).run().unwrap();
    assert_eq!(output.records.len(), 1);

    let report_path = dir.path().join("report.json");
    output.report.write_json(&report_path).unwrap();
    let report: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&report_path).unwrap()).unwrap();
    assert_eq!(report["passes"].as_array().unwrap().len(), 9);
    assert_eq!(report["passes"][0]["entity"], "user");
}

#[test]
fn test_source_override_from_config() {
    let dir = tempfile::tempdir().unwrap();
    write_empty_exports(dir.path());
    fs::rename(
        dir.path().join("Penatly_interest_master.csv"),
        dir.path().join("penalties.csv"),
    )
    .unwrap();

    let yaml = format!(
        "input_dir: {}\nsources:\n  penalty: penalties.csv\n",
        dir.path().display()
    );
    let config = MigrationConfig::from_yaml(&yaml).unwrap();

    assert!(Migrator::new(config).run().is_ok());
}

#[test]
fn test_report_failure_writes_no_sql() {
    let dir = tempfile::tempdir().unwrap();
    write_empty_exports(dir.path());

    let config = config_for(dir.path());
    let output = Migrator::new(config.clone()).run().unwrap();

    // a directory where the report should go makes the report write fail
    let report_path = dir.path().join("report.json");
    fs::create_dir(&report_path).unwrap();

    let err = output
        .write_files(Some(config.output_file.as_path()), Some(report_path.as_path()))
        .unwrap_err();
    assert!(matches!(err, MigrationError::Io { .. }));
    assert!(!config.output_file.exists());
}

#[test]
fn test_write_files_without_sql_path() {
    let dir = tempfile::tempdir().unwrap();
    write_empty_exports(dir.path());

    let config = config_for(dir.path());
    let output = Migrator::new(config.clone()).run().unwrap();
    let report_path = dir.path().join("report.json");

    let written = output.write_files(None, Some(report_path.as_path())).unwrap();
    assert_eq!(written, None);
    assert!(report_path.is_file());
    assert!(!config.output_file.exists());

    let written = output.write_files(Some(config.output_file.as_path()), None).unwrap();
    assert_eq!(written, Some(1));
    assert!(config.output_file.is_file());
}
