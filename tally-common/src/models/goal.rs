use chrono::NaiveDate;
use diesel::{Insertable, Queryable, QueryableByName};
use serde::{Deserialize, Serialize};
use std::time::SystemTime;
use uuid::Uuid;

use crate::models::joint_account::JointAccount;
use crate::schema::goals;

#[derive(Clone, Debug, Serialize, Deserialize, Associations, Identifiable, Queryable, QueryableByName)]
#[diesel(belongs_to(JointAccount, foreign_key = joint_account_id))]
#[diesel(table_name = goals)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Goal {
    pub id: Uuid,
    pub joint_account_id: Uuid,

    pub name: String,
    pub target_cents: i64,
    pub current_cents: i64,
    pub currency: String,
    pub deadline: Option<NaiveDate>,

    pub modified_timestamp: SystemTime,
    pub created_timestamp: SystemTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = goals)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct NewGoal<'a> {
    pub id: Uuid,
    pub joint_account_id: Uuid,

    pub name: &'a str,
    pub target_cents: i64,
    pub current_cents: i64,
    pub currency: &'a str,
    pub deadline: Option<NaiveDate>,

    pub modified_timestamp: SystemTime,
    pub created_timestamp: SystemTime,
}
