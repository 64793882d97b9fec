//! Target entities and the typed values written into their insert statements.
//!
//! Every row that survives migration becomes an [`InsertRecord`]: a target
//! table plus an ordered list of column/value pairs. Values stay typed until
//! the statement builder renders them, so quoting happens in exactly one place.

use chrono::NaiveDateTime;
use indexmap::IndexMap;
use serde::Serialize;
use std::fmt;
use uuid::Uuid;

use crate::statement;

/// A typed value bound for one column of an insert statement
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Text(String),
    Integer(i64),
    Bool(bool),
    Timestamp(NaiveDateTime),
    Uuid(Uuid),
}

impl SqlValue {
    pub fn is_null(&self) -> bool {
        matches!(self, SqlValue::Null)
    }

    /// Reference to another record, or NULL when the reference is unresolved.
    pub fn reference(id: Option<Uuid>) -> Self {
        id.map(SqlValue::Uuid).unwrap_or(SqlValue::Null)
    }
}

/// Renders the value as a SQL literal.
impl fmt::Display for SqlValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SqlValue::Null => write!(f, "NULL"),
            SqlValue::Text(s) => write!(f, "{}", statement::quote_literal(s)),
            SqlValue::Integer(i) => write!(f, "{}", i),
            SqlValue::Bool(b) => write!(f, "{}", b),
            SqlValue::Timestamp(ts) => {
                let formatted = ts.format(statement::TIMESTAMP_FORMAT).to_string();
                write!(f, "{}", statement::quote_literal(&formatted))
            }
            SqlValue::Uuid(id) => write!(f, "'{}'", id),
        }
    }
}

/// The record types produced by a migration run, in pass order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    User,
    Property,
    Tenant,
    RentFactor,
    Transaction,
    Outstanding,
    DebitNote,
    OutstandingPaymentMapping,
    Penalty,
}

impl EntityKind {
    /// All entity kinds in the order their passes run.
    pub const ALL: [EntityKind; 9] = [
        EntityKind::User,
        EntityKind::Property,
        EntityKind::Tenant,
        EntityKind::RentFactor,
        EntityKind::Transaction,
        EntityKind::Outstanding,
        EntityKind::DebitNote,
        EntityKind::OutstandingPaymentMapping,
        EntityKind::Penalty,
    ];

    /// Target table name
    pub fn table(self) -> &'static str {
        match self {
            EntityKind::User => "user",
            EntityKind::Property => "properties",
            EntityKind::Tenant => "tenants",
            EntityKind::RentFactor => "rent_factors",
            EntityKind::Transaction => "transactions",
            EntityKind::Outstanding => "tenant_outstandings",
            EntityKind::DebitNote => "tenant_debit_notes",
            EntityKind::OutstandingPaymentMapping => "tenant_outstanding_payment_mappings",
            EntityKind::Penalty => "penalties",
        }
    }

    /// Key used for this entity in configuration files and reports
    pub fn key(self) -> &'static str {
        match self {
            EntityKind::User => "user",
            EntityKind::Property => "property",
            EntityKind::Tenant => "tenant",
            EntityKind::RentFactor => "rent_factor",
            EntityKind::Transaction => "transaction",
            EntityKind::Outstanding => "outstanding",
            EntityKind::DebitNote => "debit_note",
            EntityKind::OutstandingPaymentMapping => "outstanding_payment_mapping",
            EntityKind::Penalty => "penalty",
        }
    }

    /// Human-readable plural used in console output
    pub fn label(self) -> &'static str {
        match self {
            EntityKind::User => "user",
            EntityKind::Property => "properties",
            EntityKind::Tenant => "tenants",
            EntityKind::RentFactor => "rent factors",
            EntityKind::Transaction => "transactions",
            EntityKind::Outstanding => "tenant outstandings",
            EntityKind::DebitNote => "tenant debit notes",
            EntityKind::OutstandingPaymentMapping => "outstanding payment mappings",
            EntityKind::Penalty => "penalties",
        }
    }

    /// Legacy export file name. The synthetic user has no source file.
    pub fn default_source(self) -> Option<&'static str> {
        match self {
            EntityKind::User => None,
            EntityKind::Property => Some("property.csv"),
            EntityKind::Tenant => Some("tenants.csv"),
            EntityKind::RentFactor => Some("tenant_rent_factors.csv"),
            EntityKind::Transaction => Some("Tenant_payment_entries.csv"),
            EntityKind::Outstanding => Some("Tenant_outstandings.csv"),
            EntityKind::DebitNote => Some("Tenant_DebitNotes.csv"),
            EntityKind::OutstandingPaymentMapping => {
                Some("Tenent_outstanding_payment_mappings.csv")
            }
            EntityKind::Penalty => Some("Penatly_interest_master.csv"),
        }
    }

    /// Header columns the source file must carry.
    pub fn required_columns(self) -> &'static [&'static str] {
        match self {
            EntityKind::User => &[],
            EntityKind::Property => &[
                "PROPERTY_ID",
                "PROPERTY_NAME",
                "ADDRESS",
                "LANDLORD_NAME",
                "PROPERTY_BILL_NAME",
                "WARD",
                "NUMBER_OF_BLOCKS",
                "PHONE_NUMBER",
                "FAX_NUMBER",
                "CREATED_ON",
                "UPDATED_ON",
            ],
            EntityKind::Tenant => &[
                "TENANT_ID",
                "PROPERTY_ID",
                "TENANT_NAME",
                "SALUTATION",
                "BUILDING_FLOOR",
                "PROPERTY_TYPE",
                "PROPERTY_NUMBER",
                "TENANT_MOBILE_NUMBER",
                "NOTES",
                "TENANCY_DATE",
                "TENANCY_END_DATE",
                "IS_ACTIVE",
                "SendSMS",
                "TENANT_CODE",
                "FLOOR_SORT_VALUE",
                "Numberic_Room_Number",
                "CREATED_ON",
                "UPDATED_ON",
            ],
            EntityKind::RentFactor => &[
                "TENANT_ID",
                "BASIC_RENT",
                "PROPERTY_TAX",
                "REPAIR_CESS",
                "MISC",
                "CHEQUE_RETURN_CHARGE",
                "FinancialYear",
                "CREATED_ON",
                "UPDATED_ON",
            ],
            EntityKind::Transaction => &[
                "ID",
                "TENANT_ID",
                "PROPERTY_ID",
                "RENT_MONTH",
                "PENALTY_AMOUNT",
                "CURRENT_RENT",
                "RECEIVED_AMOUNT",
                "PAYMENT_METHOD",
                "CHEQUE_NUMBER",
                "CHEQUE_DATE",
                "BANK_NAME",
                "BANK_BRANCH",
                "GROUP_PAYMENT_ID",
                "PAYMENT_TYPE",
                "ENTRY_CREATED_ON",
                "ENTRY_UPDATED_ON",
            ],
            EntityKind::Outstanding => &[
                "ID",
                "TENANT_ID",
                "OUTSTANDING_TYPE",
                "OUTSTANDING_AMOUNT",
                "OUTSTANDING_AS_ON",
                "CREATED_ON",
                "UPDATED_ON",
            ],
            EntityKind::DebitNote => &[
                "TENANT_ID",
                "FOR_DESCRIPTION",
                "FROM_DATE",
                "TO_DATE",
                "AMOUNT",
                "DUE_DATE",
                "CREATED_ON",
                "UPDATED_ON",
            ],
            EntityKind::OutstandingPaymentMapping => {
                &["TENANT_OUTSTANDING_ID", "PAYMENT_ID", "CREATED_ON"]
            }
            EntityKind::Penalty => &[
                "ID",
                "INTEREST_RATE",
                "EFFECTIVE_FROM",
                "CREATED_ON",
                "UPDATED_ON",
            ],
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.key() == key)
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One row bound for a target table.
///
/// Column order is insertion order, and the generated `id` column always
/// comes first.
#[derive(Debug, Clone, PartialEq)]
pub struct InsertRecord {
    entity: EntityKind,
    values: IndexMap<&'static str, SqlValue>,
}

impl InsertRecord {
    pub fn new(entity: EntityKind, id: Uuid) -> Self {
        let mut values = IndexMap::new();
        values.insert("id", SqlValue::Uuid(id));
        Self { entity, values }
    }

    pub fn push(&mut self, column: &'static str, value: SqlValue) {
        self.values.insert(column, value);
    }

    pub fn with(mut self, column: &'static str, value: SqlValue) -> Self {
        self.push(column, value);
        self
    }

    pub fn entity(&self) -> EntityKind {
        self.entity
    }

    pub fn table(&self) -> &'static str {
        self.entity.table()
    }

    pub fn id(&self) -> Option<Uuid> {
        match self.values.get("id") {
            Some(SqlValue::Uuid(id)) => Some(*id),
            _ => None,
        }
    }

    pub fn get(&self, column: &str) -> Option<&SqlValue> {
        self.values.get(column)
    }

    pub fn columns(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.values.keys().copied()
    }

    pub fn values(&self) -> impl Iterator<Item = &SqlValue> {
        self.values.values()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_value_literals() {
        assert_eq!(SqlValue::Null.to_string(), "NULL");
        assert_eq!(SqlValue::Integer(-4).to_string(), "-4");
        assert_eq!(SqlValue::Bool(true).to_string(), "true");
        assert_eq!(SqlValue::Text("O'Brien".to_string()).to_string(), "'O''Brien'");

        let ts = NaiveDate::from_ymd_opt(2023, 12, 31)
            .unwrap()
            .and_hms_opt(8, 5, 0)
            .unwrap();
        assert_eq!(SqlValue::Timestamp(ts).to_string(), "'2023-12-31 08:05:00'");
    }

    #[test]
    fn test_reference_value() {
        let id = Uuid::new_v4();
        assert_eq!(SqlValue::reference(Some(id)), SqlValue::Uuid(id));
        assert!(SqlValue::reference(None).is_null());
    }

    #[test]
    fn test_record_keeps_id_first() {
        let id = Uuid::new_v4();
        let record = InsertRecord::new(EntityKind::Penalty, id)
            .with("interest_rate", SqlValue::Integer(2))
            .with("effective_from", SqlValue::Null);

        let columns: Vec<_> = record.columns().collect();
        assert_eq!(columns, vec!["id", "interest_rate", "effective_from"]);
        assert_eq!(record.id(), Some(id));
        assert_eq!(record.table(), "penalties");
    }

    #[test]
    fn test_entity_keys_round_trip() {
        for kind in EntityKind::ALL {
            assert_eq!(EntityKind::from_key(kind.key()), Some(kind));
        }
        assert_eq!(EntityKind::from_key("landlord"), None);
    }

    #[test]
    fn test_every_sourced_entity_has_columns() {
        for kind in EntityKind::ALL {
            assert_eq!(kind.default_source().is_some(), !kind.required_columns().is_empty());
        }
    }
}
