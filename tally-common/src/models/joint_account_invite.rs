use diesel::{Insertable, Queryable, QueryableByName};
use serde::{Deserialize, Serialize};
use std::time::SystemTime;
use uuid::Uuid;

use crate::models::joint_account::JointAccount;
use crate::models::UnrecognizedDiscriminant;
use crate::schema::joint_account_invites;

/// Stored invite state. Expiry is never stored; an invite past its
/// `expiration` is treated as dead at respond time regardless of status.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InviteStatus {
    Pending,
    Accepted,
    Declined,
}

impl TryFrom<i16> for InviteStatus {
    type Error = UnrecognizedDiscriminant;

    fn try_from(value: i16) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(InviteStatus::Pending),
            1 => Ok(InviteStatus::Accepted),
            2 => Ok(InviteStatus::Declined),
            v => Err(UnrecognizedDiscriminant(v)),
        }
    }
}

impl From<InviteStatus> for i16 {
    fn from(status: InviteStatus) -> Self {
        match status {
            InviteStatus::Pending => 0,
            InviteStatus::Accepted => 1,
            InviteStatus::Declined => 2,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, Associations, Identifiable, Queryable, QueryableByName)]
#[diesel(belongs_to(JointAccount, foreign_key = joint_account_id))]
#[diesel(table_name = joint_account_invites)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct JointAccountInvite {
    pub id: Uuid,
    pub joint_account_id: Uuid,

    pub invited_email: String,
    pub invited_by_user_id: Uuid,

    pub status: i16,

    pub expiration: SystemTime,
    pub created_timestamp: SystemTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = joint_account_invites)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct NewJointAccountInvite<'a> {
    pub id: Uuid,
    pub joint_account_id: Uuid,

    pub invited_email: &'a str,
    pub invited_by_user_id: Uuid,

    pub status: i16,

    pub expiration: SystemTime,
    pub created_timestamp: SystemTime,
}
