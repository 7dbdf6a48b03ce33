use diesel::Queryable;
use serde::{Deserialize, Serialize};
use std::time::SystemTime;
use uuid::Uuid;

use crate::models::joint_account_member::AccountRole;
use crate::models::notification::Notification;
use crate::models::split_request_participant::SplitRequestParticipant;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OutputJointAccount {
    pub id: Uuid,
    pub name: String,
    pub primary_currency: String,
    pub admin_user_id: Uuid,
    /// The requesting user's own role in this account
    pub role: AccountRole,
    pub modified_timestamp: SystemTime,
    pub created_timestamp: SystemTime,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OutputMember {
    pub user_id: Uuid,
    pub name: String,
    pub email: String,
    pub role: AccountRole,
    pub joined_timestamp: SystemTime,
}

/// An invitation joined with the account and inviter names the recipient sees.
#[derive(Clone, Debug, Serialize, Deserialize, Queryable)]
pub struct OutputInvitation {
    pub id: Uuid,
    pub joint_account_id: Uuid,
    pub account_name: String,
    pub invited_email: String,
    pub invited_by_user_id: Uuid,
    pub inviter_name: String,
    pub status: i16,
    pub expiration: SystemTime,
    pub created_timestamp: SystemTime,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OutputSplitRequest {
    pub id: Uuid,
    pub chat_message_id: Uuid,
    pub joint_account_id: Uuid,
    pub requested_by_user_id: Uuid,
    pub total_cents: i64,
    pub share_cents: i64,
    pub currency: String,
    pub note: Option<String>,
    pub status: i16,
    pub participants: Vec<SplitRequestParticipant>,
    pub modified_timestamp: SystemTime,
    pub created_timestamp: SystemTime,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OutputNotifications {
    pub notifications: Vec<Notification>,
    pub unread_count: i64,
}
