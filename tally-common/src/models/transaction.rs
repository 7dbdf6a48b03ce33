use chrono::NaiveDate;
use diesel::{Insertable, Queryable, QueryableByName};
use serde::{Deserialize, Serialize};
use std::time::SystemTime;
use uuid::Uuid;

use crate::models::joint_account::JointAccount;
use crate::models::UnrecognizedDiscriminant;
use crate::schema::transactions;

/// Whether a transaction adds to or draws from the account. The stored
/// `amount_cents` is always a non-negative magnitude; sign is implied here.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    Income,
    Expense,
}

impl TryFrom<i16> for TransactionKind {
    type Error = UnrecognizedDiscriminant;

    fn try_from(value: i16) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(TransactionKind::Income),
            1 => Ok(TransactionKind::Expense),
            v => Err(UnrecognizedDiscriminant(v)),
        }
    }
}

impl From<TransactionKind> for i16 {
    fn from(kind: TransactionKind) -> Self {
        match kind {
            TransactionKind::Income => 0,
            TransactionKind::Expense => 1,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, Associations, Identifiable, Queryable, QueryableByName)]
#[diesel(belongs_to(JointAccount, foreign_key = joint_account_id))]
#[diesel(table_name = transactions)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Transaction {
    pub id: Uuid,
    pub joint_account_id: Uuid,

    pub amount_cents: i64,
    pub currency: String,
    pub kind: i16,
    pub category: String,
    pub date: NaiveDate,
    pub note: Option<String>,

    pub added_by_user_id: Uuid,
    pub added_by_user_name: String,

    pub modified_timestamp: SystemTime,
    pub created_timestamp: SystemTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = transactions)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct NewTransaction<'a> {
    pub id: Uuid,
    pub joint_account_id: Uuid,

    pub amount_cents: i64,
    pub currency: &'a str,
    pub kind: i16,
    pub category: &'a str,
    pub date: NaiveDate,
    pub note: Option<&'a str>,

    pub added_by_user_id: Uuid,
    pub added_by_user_name: &'a str,

    pub modified_timestamp: SystemTime,
    pub created_timestamp: SystemTime,
}
