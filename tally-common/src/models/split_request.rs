use diesel::{Insertable, Queryable, QueryableByName};
use serde::{Deserialize, Serialize};
use std::time::SystemTime;
use uuid::Uuid;

use crate::models::chat_message::ChatMessage;
use crate::models::joint_account::JointAccount;
use crate::models::UnrecognizedDiscriminant;
use crate::schema::split_requests;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SplitRequestStatus {
    Open,
    Completed,
}

impl TryFrom<i16> for SplitRequestStatus {
    type Error = UnrecognizedDiscriminant;

    fn try_from(value: i16) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(SplitRequestStatus::Open),
            1 => Ok(SplitRequestStatus::Completed),
            v => Err(UnrecognizedDiscriminant(v)),
        }
    }
}

impl From<SplitRequestStatus> for i16 {
    fn from(status: SplitRequestStatus) -> Self {
        match status {
            SplitRequestStatus::Open => 0,
            SplitRequestStatus::Completed => 1,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, Associations, Identifiable, Queryable, QueryableByName)]
#[diesel(belongs_to(ChatMessage, foreign_key = chat_message_id))]
#[diesel(belongs_to(JointAccount, foreign_key = joint_account_id))]
#[diesel(table_name = split_requests)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct SplitRequest {
    pub id: Uuid,
    pub chat_message_id: Uuid,
    pub joint_account_id: Uuid,

    pub requested_by_user_id: Uuid,

    pub total_cents: i64,
    pub share_cents: i64,
    pub currency: String,
    pub note: Option<String>,

    pub status: i16,

    pub modified_timestamp: SystemTime,
    pub created_timestamp: SystemTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = split_requests)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct NewSplitRequest<'a> {
    pub id: Uuid,
    pub chat_message_id: Uuid,
    pub joint_account_id: Uuid,

    pub requested_by_user_id: Uuid,

    pub total_cents: i64,
    pub share_cents: i64,
    pub currency: &'a str,
    pub note: Option<&'a str>,

    pub status: i16,

    pub modified_timestamp: SystemTime,
    pub created_timestamp: SystemTime,
}
