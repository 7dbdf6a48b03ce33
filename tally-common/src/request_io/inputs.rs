use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::chat_message::MessageKind;
use crate::models::joint_account_member::AccountRole;
use crate::models::split_request_participant::ParticipantStatus;
use crate::models::subscription::BillingCycle;
use crate::models::transaction::TransactionKind;
use crate::validators;

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct InputNewUser {
    pub name: String,
    pub primary_currency: String,
}

impl InputNewUser {
    pub fn validate_currency_code(&self) -> validators::Validity {
        validators::validate_currency_code(&self.primary_currency)
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct InputEditUserPrefs {
    pub name: String,
    pub primary_currency: String,
    pub notifications_enabled: bool,
}

impl InputEditUserPrefs {
    pub fn validate_currency_code(&self) -> validators::Validity {
        validators::validate_currency_code(&self.primary_currency)
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct InputPushSubscription {
    pub endpoint: String,
    pub keys: serde_json::Value,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct InputAccountId {
    pub account_id: Uuid,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct InputNewJointAccount {
    pub name: String,
    pub primary_currency: String,
}

impl InputNewJointAccount {
    pub fn validate_currency_code(&self) -> validators::Validity {
        validators::validate_currency_code(&self.primary_currency)
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct InputEditJointAccount {
    pub account_id: Uuid,
    pub name: String,
    pub primary_currency: String,
}

impl InputEditJointAccount {
    pub fn validate_currency_code(&self) -> validators::Validity {
        validators::validate_currency_code(&self.primary_currency)
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct InputMemberRole {
    pub account_id: Uuid,
    pub user_id: Uuid,
    pub role: AccountRole,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct InputMemberId {
    pub account_id: Uuid,
    pub user_id: Uuid,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct InputNewInvitation {
    pub account_id: Uuid,
    pub recipient_email: String,
}

impl InputNewInvitation {
    pub fn validate_email_address(&self) -> validators::Validity {
        validators::validate_email_address(&self.recipient_email)
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct InputInvitationId {
    pub invitation_id: Uuid,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct InputNewTransaction {
    pub account_id: Uuid,
    pub amount_cents: i64,
    pub currency: String,
    pub kind: TransactionKind,
    pub category: String,
    pub date: NaiveDate,
    pub note: Option<String>,
}

impl InputNewTransaction {
    pub fn validate_currency_code(&self) -> validators::Validity {
        validators::validate_currency_code(&self.currency)
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct InputEditTransaction {
    pub transaction_id: Uuid,
    pub account_id: Uuid,
    pub amount_cents: i64,
    pub currency: String,
    pub kind: TransactionKind,
    pub category: String,
    pub date: NaiveDate,
    pub note: Option<String>,
}

impl InputEditTransaction {
    pub fn validate_currency_code(&self) -> validators::Validity {
        validators::validate_currency_code(&self.currency)
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct InputTransactionId {
    pub transaction_id: Uuid,
    pub account_id: Uuid,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct InputNewGoal {
    pub account_id: Uuid,
    pub name: String,
    pub target_cents: i64,
    pub currency: String,
    pub deadline: Option<NaiveDate>,
}

impl InputNewGoal {
    pub fn validate_currency_code(&self) -> validators::Validity {
        validators::validate_currency_code(&self.currency)
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct InputEditGoal {
    pub goal_id: Uuid,
    pub account_id: Uuid,
    pub name: String,
    pub target_cents: i64,
    pub current_cents: i64,
    pub deadline: Option<NaiveDate>,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct InputGoalContribution {
    pub goal_id: Uuid,
    pub account_id: Uuid,
    pub amount_cents: i64,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct InputGoalId {
    pub goal_id: Uuid,
    pub account_id: Uuid,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct InputNewSubscription {
    pub account_id: Uuid,
    pub name: String,
    pub amount_cents: i64,
    pub currency: String,
    pub cycle: BillingCycle,
    pub next_billing_date: NaiveDate,
}

impl InputNewSubscription {
    pub fn validate_currency_code(&self) -> validators::Validity {
        validators::validate_currency_code(&self.currency)
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct InputEditSubscription {
    pub subscription_id: Uuid,
    pub account_id: Uuid,
    pub name: String,
    pub amount_cents: i64,
    pub currency: String,
    pub cycle: BillingCycle,
    pub next_billing_date: NaiveDate,
}

impl InputEditSubscription {
    pub fn validate_currency_code(&self) -> validators::Validity {
        validators::validate_currency_code(&self.currency)
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct InputSubscriptionId {
    pub subscription_id: Uuid,
    pub account_id: Uuid,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct InputNewChatMessage {
    pub account_id: Uuid,
    pub body: String,
    pub kind: Option<MessageKind>,
    pub data: Option<serde_json::Value>,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct InputChatMessagesQuery {
    pub account_id: Uuid,
    /// Unix seconds; only messages older than this are returned
    pub before: Option<u64>,
    pub limit: Option<i64>,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct InputMarkMessageRead {
    pub message_id: Uuid,
    pub account_id: Uuid,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct InputNewSplitRequest {
    pub account_id: Uuid,
    pub total_cents: i64,
    pub currency: String,
    pub note: Option<String>,
}

impl InputNewSplitRequest {
    pub fn validate_currency_code(&self) -> validators::Validity {
        validators::validate_currency_code(&self.currency)
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct InputSplitResponse {
    pub split_request_id: Uuid,
    pub account_id: Uuid,
    pub response: ParticipantStatus,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct InputNotificationId {
    pub notification_id: Uuid,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct InputNotificationsQuery {
    pub limit: Option<i64>,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct InputEventsQuery {
    pub account_id: Option<Uuid>,
}
