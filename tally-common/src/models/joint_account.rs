use diesel::{Insertable, Queryable, QueryableByName};
use serde::{Deserialize, Serialize};
use std::time::SystemTime;
use uuid::Uuid;

use crate::schema::joint_accounts;

#[derive(Clone, Debug, Serialize, Deserialize, Identifiable, Queryable, QueryableByName)]
#[diesel(table_name = joint_accounts)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct JointAccount {
    pub id: Uuid,
    pub name: String,

    pub primary_currency: String,
    pub admin_user_id: Uuid,

    pub modified_timestamp: SystemTime,
    pub created_timestamp: SystemTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = joint_accounts)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct NewJointAccount<'a> {
    pub id: Uuid,
    pub name: &'a str,

    pub primary_currency: &'a str,
    pub admin_user_id: Uuid,

    pub modified_timestamp: SystemTime,
    pub created_timestamp: SystemTime,
}
