use diesel::{Insertable, Queryable, QueryableByName};
use serde::{Deserialize, Serialize};
use std::time::SystemTime;
use uuid::Uuid;

use crate::models::joint_account::JointAccount;
use crate::models::UnrecognizedDiscriminant;
use crate::schema::chat_messages;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    Text,
    Image,
    System,
    SplitRequest,
    GoalMilestone,
    TransactionShare,
    Leaderboard,
    MonthlyRecap,
}

impl TryFrom<i16> for MessageKind {
    type Error = UnrecognizedDiscriminant;

    fn try_from(value: i16) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(MessageKind::Text),
            1 => Ok(MessageKind::Image),
            2 => Ok(MessageKind::System),
            3 => Ok(MessageKind::SplitRequest),
            4 => Ok(MessageKind::GoalMilestone),
            5 => Ok(MessageKind::TransactionShare),
            6 => Ok(MessageKind::Leaderboard),
            7 => Ok(MessageKind::MonthlyRecap),
            v => Err(UnrecognizedDiscriminant(v)),
        }
    }
}

impl From<MessageKind> for i16 {
    fn from(kind: MessageKind) -> Self {
        match kind {
            MessageKind::Text => 0,
            MessageKind::Image => 1,
            MessageKind::System => 2,
            MessageKind::SplitRequest => 3,
            MessageKind::GoalMilestone => 4,
            MessageKind::TransactionShare => 5,
            MessageKind::Leaderboard => 6,
            MessageKind::MonthlyRecap => 7,
        }
    }
}

/// One element of a message's `read_by` JSON array.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct ReadReceipt {
    pub user_id: Uuid,
    pub read_timestamp: u64,
}

#[derive(Clone, Debug, Serialize, Deserialize, Associations, Identifiable, Queryable, QueryableByName)]
#[diesel(belongs_to(JointAccount, foreign_key = joint_account_id))]
#[diesel(table_name = chat_messages)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct ChatMessage {
    pub id: Uuid,
    pub joint_account_id: Uuid,

    // None for system-generated messages
    pub sender_user_id: Option<Uuid>,
    pub sender_name: String,

    pub kind: i16,
    pub body: String,
    pub data: Option<serde_json::Value>,
    pub read_by: serde_json::Value,

    pub created_timestamp: SystemTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = chat_messages)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct NewChatMessage<'a> {
    pub id: Uuid,
    pub joint_account_id: Uuid,

    pub sender_user_id: Option<Uuid>,
    pub sender_name: &'a str,

    pub kind: i16,
    pub body: &'a str,
    pub data: Option<&'a serde_json::Value>,
    pub read_by: &'a serde_json::Value,

    pub created_timestamp: SystemTime,
}
