use chrono::NaiveDate;
use diesel::{Insertable, Queryable, QueryableByName};
use serde::{Deserialize, Serialize};
use std::time::SystemTime;
use uuid::Uuid;

use crate::models::joint_account::JointAccount;
use crate::models::UnrecognizedDiscriminant;
use crate::schema::subscriptions;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BillingCycle {
    Monthly,
    Yearly,
}

impl TryFrom<i16> for BillingCycle {
    type Error = UnrecognizedDiscriminant;

    fn try_from(value: i16) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(BillingCycle::Monthly),
            1 => Ok(BillingCycle::Yearly),
            v => Err(UnrecognizedDiscriminant(v)),
        }
    }
}

impl From<BillingCycle> for i16 {
    fn from(cycle: BillingCycle) -> Self {
        match cycle {
            BillingCycle::Monthly => 0,
            BillingCycle::Yearly => 1,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, Associations, Identifiable, Queryable, QueryableByName)]
#[diesel(belongs_to(JointAccount, foreign_key = joint_account_id))]
#[diesel(table_name = subscriptions)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Subscription {
    pub id: Uuid,
    pub joint_account_id: Uuid,

    pub name: String,
    pub amount_cents: i64,
    pub currency: String,
    pub cycle: i16,
    pub next_billing_date: NaiveDate,

    pub added_by_user_id: Uuid,

    pub modified_timestamp: SystemTime,
    pub created_timestamp: SystemTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = subscriptions)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct NewSubscription<'a> {
    pub id: Uuid,
    pub joint_account_id: Uuid,

    pub name: &'a str,
    pub amount_cents: i64,
    pub currency: &'a str,
    pub cycle: i16,
    pub next_billing_date: NaiveDate,

    pub added_by_user_id: Uuid,

    pub modified_timestamp: SystemTime,
    pub created_timestamp: SystemTime,
}
