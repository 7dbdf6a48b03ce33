use diesel::{Insertable, Queryable};
use serde::{Deserialize, Serialize};
use std::time::SystemTime;
use uuid::Uuid;

use crate::models::user::User;
use crate::models::UnrecognizedDiscriminant;
use crate::schema::notifications;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    InviteReceived,
    InviteAccepted,
    InviteDeclined,
    TransactionActivity,
    GoalActivity,
    GoalMilestone,
    SubscriptionActivity,
    ChatActivity,
    SplitRequestActivity,
    MemberActivity,
    AccountActivity,
}

impl TryFrom<i16> for NotificationKind {
    type Error = UnrecognizedDiscriminant;

    fn try_from(value: i16) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(NotificationKind::InviteReceived),
            1 => Ok(NotificationKind::InviteAccepted),
            2 => Ok(NotificationKind::InviteDeclined),
            3 => Ok(NotificationKind::TransactionActivity),
            4 => Ok(NotificationKind::GoalActivity),
            5 => Ok(NotificationKind::GoalMilestone),
            6 => Ok(NotificationKind::SubscriptionActivity),
            7 => Ok(NotificationKind::ChatActivity),
            8 => Ok(NotificationKind::SplitRequestActivity),
            9 => Ok(NotificationKind::MemberActivity),
            10 => Ok(NotificationKind::AccountActivity),
            v => Err(UnrecognizedDiscriminant(v)),
        }
    }
}

impl From<NotificationKind> for i16 {
    fn from(kind: NotificationKind) -> Self {
        match kind {
            NotificationKind::InviteReceived => 0,
            NotificationKind::InviteAccepted => 1,
            NotificationKind::InviteDeclined => 2,
            NotificationKind::TransactionActivity => 3,
            NotificationKind::GoalActivity => 4,
            NotificationKind::GoalMilestone => 5,
            NotificationKind::SubscriptionActivity => 6,
            NotificationKind::ChatActivity => 7,
            NotificationKind::SplitRequestActivity => 8,
            NotificationKind::MemberActivity => 9,
            NotificationKind::AccountActivity => 10,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, Associations, Identifiable, Queryable)]
#[diesel(belongs_to(User, foreign_key = user_id))]
#[diesel(table_name = notifications)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Notification {
    pub id: Uuid,
    pub user_id: Uuid,

    pub kind: i16,
    pub payload: serde_json::Value,
    pub is_unread: bool,

    pub created_timestamp: SystemTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = notifications)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct NewNotification<'a> {
    pub id: Uuid,
    pub user_id: Uuid,

    pub kind: i16,
    pub payload: &'a serde_json::Value,
    pub is_unread: bool,

    pub created_timestamp: SystemTime,
}
