use diesel::{Insertable, Queryable};
use serde::{Deserialize, Serialize};
use std::time::SystemTime;
use uuid::Uuid;

use crate::models::joint_account::JointAccount;
use crate::models::user::User;
use crate::models::UnrecognizedDiscriminant;
use crate::schema::joint_account_members;

/// The single role lattice for joint accounts. `Admin` is held by exactly one
/// member per account (the creator) and can never be removed or reassigned.
#[derive(Clone, Copy, Debug, Eq, Ord, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountRole {
    Viewer,
    Editor,
    Admin,
}

impl AccountRole {
    pub fn can_edit_finances(&self) -> bool {
        matches!(self, AccountRole::Editor | AccountRole::Admin)
    }

    pub fn can_manage_members(&self) -> bool {
        matches!(self, AccountRole::Admin)
    }
}

impl TryFrom<i16> for AccountRole {
    type Error = UnrecognizedDiscriminant;

    fn try_from(value: i16) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(AccountRole::Viewer),
            1 => Ok(AccountRole::Editor),
            2 => Ok(AccountRole::Admin),
            v => Err(UnrecognizedDiscriminant(v)),
        }
    }
}

impl From<AccountRole> for i16 {
    fn from(role: AccountRole) -> Self {
        match role {
            AccountRole::Viewer => 0,
            AccountRole::Editor => 1,
            AccountRole::Admin => 2,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, Associations, Identifiable, Queryable)]
#[diesel(belongs_to(User, foreign_key = user_id))]
#[diesel(belongs_to(JointAccount, foreign_key = joint_account_id))]
#[diesel(table_name = joint_account_members, primary_key(joint_account_id, user_id))]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct JointAccountMember {
    pub joint_account_id: Uuid,
    pub user_id: Uuid,

    pub role: i16,

    pub joined_timestamp: SystemTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = joint_account_members, primary_key(joint_account_id, user_id))]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct NewJointAccountMember {
    pub joint_account_id: Uuid,
    pub user_id: Uuid,

    pub role: i16,

    pub joined_timestamp: SystemTime,
}
