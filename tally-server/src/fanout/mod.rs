//! Best-effort propagation of account activity to everyone but the user who
//! caused it.
//!
//! Every public method spawns a task and returns immediately; handlers call
//! them after the store write succeeds and never wait on delivery. Inside a
//! task the three channels (live room event, push notification, persisted
//! notification row) are attempted independently. A failure on any of them is
//! logged and swallowed so one dead channel or one bad recipient never blocks
//! the others. The store write remains the only source of truth.

use tally_common::db::{self, DbThreadPool};
use tally_common::milestone::{self, Milestone};
use tally_common::models::chat_message::{ChatMessage, MessageKind};
use tally_common::models::goal::Goal;
use tally_common::models::joint_account::JointAccount;
use tally_common::models::joint_account_invite::{InviteStatus, JointAccountInvite};
use tally_common::models::joint_account_member::AccountRole;
use tally_common::models::notification::NotificationKind;
use tally_common::models::split_request::SplitRequest;
use tally_common::models::split_request_participant::ParticipantStatus;
use tally_common::models::subscription::{BillingCycle, Subscription};
use tally_common::models::transaction::{Transaction, TransactionKind};
use tally_common::money;
use tally_common::push::{PushError, PushNotification, PushSender};
use tally_common::realtime::{RoomEvent, RoomId, RoomRegistry};

use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

/// Name app-authored chat notices are attributed to.
const NOTICE_SENDER_NAME: &str = "Tally";

/// Push bodies longer than this get cut; providers truncate anyway and the
/// full text lives in the chat or notification row.
const PUSH_BODY_MAX_CHARS: usize = 140;

#[derive(Clone)]
pub struct Broadcaster {
    db_thread_pool: DbThreadPool,
    rooms: RoomRegistry,
    push_sender: Arc<PushSender>,
}

/// Owned push content a spawned task can hold across awaits.
struct PushContent {
    title: String,
    body: String,
    tag: String,
    data: serde_json::Value,
}

impl Broadcaster {
    pub fn new(
        db_thread_pool: DbThreadPool,
        rooms: RoomRegistry,
        push_sender: Arc<PushSender>,
    ) -> Self {
        Self {
            db_thread_pool,
            rooms,
            push_sender,
        }
    }

    /// Announces a new transaction to the account room, appends the system
    /// chat message for it, and notifies every member except the one who
    /// recorded it.
    pub fn transaction_recorded(&self, transaction: Transaction) {
        let broadcaster = self.clone();

        tokio::spawn(async move {
            let Some(account) = broadcaster.load_account(transaction.joint_account_id).await
            else {
                return;
            };

            let announcement = format!(
                "{} added {}.",
                transaction.added_by_user_name,
                transaction_summary(&transaction)
            );

            broadcaster
                .post_chat_notice(
                    account.id,
                    MessageKind::System,
                    &announcement,
                    json!({ "transaction_id": transaction.id }),
                )
                .await;

            broadcaster
                .rooms
                .publish(
                    RoomId::Account(account.id),
                    RoomEvent {
                        event: "transaction_recorded",
                        payload: json!({
                            "actor_user_id": transaction.added_by_user_id,
                            "transaction": transaction,
                        }),
                    },
                )
                .await;

            broadcaster
                .notify_other_members(
                    &account,
                    transaction.added_by_user_id,
                    NotificationKind::TransactionActivity,
                    &announcement,
                    format!("transaction_{}", transaction.id),
                    json!({
                        "kind": "transaction_activity",
                        "joint_account_id": account.id,
                        "transaction_id": transaction.id,
                    }),
                )
                .await;
        });
    }

    pub fn transaction_updated(&self, actor_id: Uuid, transaction: Transaction) {
        self.transaction_changed(actor_id, transaction, "transaction_updated", "updated");
    }

    pub fn transaction_deleted(&self, actor_id: Uuid, transaction: Transaction) {
        self.transaction_changed(actor_id, transaction, "transaction_deleted", "deleted");
    }

    fn transaction_changed(
        &self,
        actor_id: Uuid,
        transaction: Transaction,
        event: &'static str,
        verb: &'static str,
    ) {
        let broadcaster = self.clone();

        tokio::spawn(async move {
            let Some(account) = broadcaster.load_account(transaction.joint_account_id).await
            else {
                return;
            };
            let actor_name = broadcaster.load_user_name(actor_id).await;

            broadcaster
                .rooms
                .publish(
                    RoomId::Account(account.id),
                    RoomEvent {
                        event,
                        payload: json!({
                            "actor_user_id": actor_id,
                            "transaction": transaction,
                        }),
                    },
                )
                .await;

            let announcement = format!(
                "{} {} {}.",
                actor_name,
                verb,
                transaction_summary(&transaction)
            );

            broadcaster
                .notify_other_members(
                    &account,
                    actor_id,
                    NotificationKind::TransactionActivity,
                    &announcement,
                    format!("transaction_{}", transaction.id),
                    json!({
                        "kind": "transaction_activity",
                        "joint_account_id": account.id,
                        "transaction_id": transaction.id,
                    }),
                )
                .await;
        });
    }

    pub fn goal_created(&self, actor_id: Uuid, goal: Goal) {
        let broadcaster = self.clone();

        tokio::spawn(async move {
            let Some(account) = broadcaster.load_account(goal.joint_account_id).await else {
                return;
            };
            let actor_name = broadcaster.load_user_name(actor_id).await;

            broadcaster.publish_goal_saved(account.id, actor_id, &goal).await;

            let announcement = format!(
                "{} created the goal \"{}\" ({}).",
                actor_name,
                goal.name,
                money::format_cents(goal.target_cents, &goal.currency)
            );

            broadcaster
                .notify_other_members(
                    &account,
                    actor_id,
                    NotificationKind::GoalActivity,
                    &announcement,
                    format!("goal_{}", goal.id),
                    json!({
                        "kind": "goal_activity",
                        "joint_account_id": account.id,
                        "goal_id": goal.id,
                    }),
                )
                .await;
        });
    }

    /// Fan-out for a general goal edit. Balance changes made this way still
    /// count toward milestones, so the pre-update balance rides along.
    pub fn goal_updated(&self, actor_id: Uuid, previous_cents: i64, goal: Goal) {
        let broadcaster = self.clone();

        tokio::spawn(async move {
            let Some(account) = broadcaster.load_account(goal.joint_account_id).await else {
                return;
            };
            let actor_name = broadcaster.load_user_name(actor_id).await;

            broadcaster.publish_goal_saved(account.id, actor_id, &goal).await;

            let announcement = format!("{} updated the goal \"{}\".", actor_name, goal.name);

            broadcaster
                .notify_other_members(
                    &account,
                    actor_id,
                    NotificationKind::GoalActivity,
                    &announcement,
                    format!("goal_{}", goal.id),
                    json!({
                        "kind": "goal_activity",
                        "joint_account_id": account.id,
                        "goal_id": goal.id,
                    }),
                )
                .await;

            broadcaster
                .announce_milestone(&account, actor_id, previous_cents, &goal)
                .await;
        });
    }

    pub fn goal_contributed(
        &self,
        actor_id: Uuid,
        contributed_cents: i64,
        previous_cents: i64,
        goal: Goal,
    ) {
        let broadcaster = self.clone();

        tokio::spawn(async move {
            let Some(account) = broadcaster.load_account(goal.joint_account_id).await else {
                return;
            };
            let actor_name = broadcaster.load_user_name(actor_id).await;

            broadcaster.publish_goal_saved(account.id, actor_id, &goal).await;

            let announcement = format!(
                "{} added {} to the goal \"{}\".",
                actor_name,
                money::format_cents(contributed_cents, &goal.currency),
                goal.name
            );

            broadcaster
                .notify_other_members(
                    &account,
                    actor_id,
                    NotificationKind::GoalActivity,
                    &announcement,
                    format!("goal_{}", goal.id),
                    json!({
                        "kind": "goal_activity",
                        "joint_account_id": account.id,
                        "goal_id": goal.id,
                    }),
                )
                .await;

            broadcaster
                .announce_milestone(&account, actor_id, previous_cents, &goal)
                .await;
        });
    }

    pub fn goal_deleted(&self, actor_id: Uuid, goal: Goal) {
        let broadcaster = self.clone();

        tokio::spawn(async move {
            let Some(account) = broadcaster.load_account(goal.joint_account_id).await else {
                return;
            };
            let actor_name = broadcaster.load_user_name(actor_id).await;

            broadcaster
                .rooms
                .publish(
                    RoomId::Account(account.id),
                    RoomEvent {
                        event: "goal_deleted",
                        payload: json!({
                            "actor_user_id": actor_id,
                            "goal_id": goal.id,
                        }),
                    },
                )
                .await;

            let announcement = format!("{} deleted the goal \"{}\".", actor_name, goal.name);

            broadcaster
                .notify_other_members(
                    &account,
                    actor_id,
                    NotificationKind::GoalActivity,
                    &announcement,
                    format!("goal_{}", goal.id),
                    json!({
                        "kind": "goal_activity",
                        "joint_account_id": account.id,
                        "goal_id": goal.id,
                    }),
                )
                .await;
        });
    }

    pub fn subscription_created(&self, subscription: Subscription) {
        let actor_id = subscription.added_by_user_id;
        let broadcaster = self.clone();

        tokio::spawn(async move {
            let Some(account) = broadcaster.load_account(subscription.joint_account_id).await
            else {
                return;
            };
            let actor_name = broadcaster.load_user_name(actor_id).await;

            broadcaster
                .publish_subscription_saved(account.id, actor_id, &subscription)
                .await;

            let announcement = format!(
                "{} added the {} subscription \"{}\" ({}).",
                actor_name,
                cycle_label(&subscription),
                subscription.name,
                money::format_cents(subscription.amount_cents, &subscription.currency)
            );

            broadcaster
                .notify_subscription_activity(&account, actor_id, &subscription, &announcement)
                .await;
        });
    }

    pub fn subscription_updated(&self, actor_id: Uuid, subscription: Subscription) {
        let broadcaster = self.clone();

        tokio::spawn(async move {
            let Some(account) = broadcaster.load_account(subscription.joint_account_id).await
            else {
                return;
            };
            let actor_name = broadcaster.load_user_name(actor_id).await;

            broadcaster
                .publish_subscription_saved(account.id, actor_id, &subscription)
                .await;

            let announcement = format!(
                "{} updated the subscription \"{}\".",
                actor_name, subscription.name
            );

            broadcaster
                .notify_subscription_activity(&account, actor_id, &subscription, &announcement)
                .await;
        });
    }

    pub fn subscription_deleted(&self, actor_id: Uuid, subscription: Subscription) {
        let broadcaster = self.clone();

        tokio::spawn(async move {
            let Some(account) = broadcaster.load_account(subscription.joint_account_id).await
            else {
                return;
            };
            let actor_name = broadcaster.load_user_name(actor_id).await;

            broadcaster
                .rooms
                .publish(
                    RoomId::Account(account.id),
                    RoomEvent {
                        event: "subscription_deleted",
                        payload: json!({
                            "actor_user_id": actor_id,
                            "subscription_id": subscription.id,
                        }),
                    },
                )
                .await;

            let announcement = format!(
                "{} removed the subscription \"{}\".",
                actor_name, subscription.name
            );

            broadcaster
                .notify_subscription_activity(&account, actor_id, &subscription, &announcement)
                .await;
        });
    }

    pub fn account_updated(&self, actor_id: Uuid, account: JointAccount) {
        let broadcaster = self.clone();

        tokio::spawn(async move {
            let actor_name = broadcaster.load_user_name(actor_id).await;

            broadcaster
                .rooms
                .publish(
                    RoomId::Account(account.id),
                    RoomEvent {
                        event: "account_updated",
                        payload: json!({
                            "actor_user_id": actor_id,
                            "account": account,
                        }),
                    },
                )
                .await;

            let announcement = format!(
                "{} updated the settings of \"{}\".",
                actor_name, account.name
            );

            broadcaster
                .notify_other_members(
                    &account,
                    actor_id,
                    NotificationKind::AccountActivity,
                    &announcement,
                    format!("account_{}", account.id),
                    json!({
                        "kind": "account_activity",
                        "joint_account_id": account.id,
                    }),
                )
                .await;
        });
    }

    /// The membership rows are gone by the time this runs, so the recipient
    /// list is captured by the caller before the delete.
    pub fn account_deleted(
        &self,
        actor_id: Uuid,
        account: JointAccount,
        member_ids: Vec<Uuid>,
    ) {
        let broadcaster = self.clone();

        tokio::spawn(async move {
            let actor_name = broadcaster.load_user_name(actor_id).await;

            broadcaster
                .rooms
                .publish(
                    RoomId::Account(account.id),
                    RoomEvent {
                        event: "account_deleted",
                        payload: json!({
                            "actor_user_id": actor_id,
                            "joint_account_id": account.id,
                        }),
                    },
                )
                .await;

            let recipients: Vec<Uuid> = member_ids.into_iter().filter(|id| *id != actor_id).collect();
            let announcement = format!("{} deleted the account \"{}\".", actor_name, account.name);

            broadcaster
                .push_to_users(
                    &recipients,
                    &PushContent {
                        title: account.name.clone(),
                        body: announcement.clone(),
                        tag: format!("account_{}", account.id),
                        data: json!({
                            "kind": "account_activity",
                            "joint_account_id": account.id,
                        }),
                    },
                )
                .await;

            broadcaster
                .persist_notifications(
                    &recipients,
                    NotificationKind::AccountActivity,
                    &json!({
                        "joint_account_id": account.id,
                        "account_name": account.name,
                        "message": announcement,
                    }),
                )
                .await;
        });
    }

    pub fn member_role_changed(
        &self,
        actor_id: Uuid,
        joint_account_id: Uuid,
        member_user_id: Uuid,
        new_role: AccountRole,
    ) {
        let broadcaster = self.clone();

        tokio::spawn(async move {
            let Some(account) = broadcaster.load_account(joint_account_id).await else {
                return;
            };
            let actor_name = broadcaster.load_user_name(actor_id).await;
            let member_name = broadcaster.load_user_name(member_user_id).await;

            broadcaster
                .rooms
                .publish(
                    RoomId::Account(account.id),
                    RoomEvent {
                        event: "member_role_changed",
                        payload: json!({
                            "actor_user_id": actor_id,
                            "user_id": member_user_id,
                            "role": new_role,
                        }),
                    },
                )
                .await;

            let announcement = format!(
                "{} made {} {} of \"{}\".",
                actor_name,
                member_name,
                role_phrase(new_role),
                account.name
            );

            broadcaster
                .notify_other_members(
                    &account,
                    actor_id,
                    NotificationKind::MemberActivity,
                    &announcement,
                    format!("member_{}", account.id),
                    json!({
                        "kind": "member_activity",
                        "joint_account_id": account.id,
                        "user_id": member_user_id,
                    }),
                )
                .await;
        });
    }

    pub fn member_removed(
        &self,
        actor_id: Uuid,
        joint_account_id: Uuid,
        removed_user_id: Uuid,
    ) {
        let broadcaster = self.clone();

        tokio::spawn(async move {
            let Some(account) = broadcaster.load_account(joint_account_id).await else {
                return;
            };
            let actor_name = broadcaster.load_user_name(actor_id).await;
            let removed_name = broadcaster.load_user_name(removed_user_id).await;

            broadcaster
                .rooms
                .publish(
                    RoomId::Account(account.id),
                    RoomEvent {
                        event: "member_removed",
                        payload: json!({
                            "actor_user_id": actor_id,
                            "user_id": removed_user_id,
                        }),
                    },
                )
                .await;

            // The removed user's membership row is already gone, so they are
            // added back into the recipient list by hand
            let mut recipients = broadcaster.other_member_ids(account.id, actor_id).await;
            recipients.push(removed_user_id);

            let announcement = format!(
                "{} removed {} from \"{}\".",
                actor_name, removed_name, account.name
            );

            broadcaster
                .push_to_users(
                    &recipients,
                    &PushContent {
                        title: account.name.clone(),
                        body: announcement.clone(),
                        tag: format!("member_{}", account.id),
                        data: json!({
                            "kind": "member_activity",
                            "joint_account_id": account.id,
                            "user_id": removed_user_id,
                        }),
                    },
                )
                .await;

            broadcaster
                .persist_notifications(
                    &recipients,
                    NotificationKind::MemberActivity,
                    &json!({
                        "joint_account_id": account.id,
                        "account_name": account.name,
                        "message": announcement,
                        "user_id": removed_user_id,
                    }),
                )
                .await;
        });
    }

    pub fn member_left(&self, joint_account_id: Uuid, user_id: Uuid) {
        let broadcaster = self.clone();

        tokio::spawn(async move {
            let Some(account) = broadcaster.load_account(joint_account_id).await else {
                return;
            };
            let user_name = broadcaster.load_user_name(user_id).await;

            broadcaster
                .rooms
                .publish(
                    RoomId::Account(account.id),
                    RoomEvent {
                        event: "member_left",
                        payload: json!({ "user_id": user_id }),
                    },
                )
                .await;

            let announcement = format!("{} left \"{}\".", user_name, account.name);

            broadcaster
                .notify_other_members(
                    &account,
                    user_id,
                    NotificationKind::MemberActivity,
                    &announcement,
                    format!("member_{}", account.id),
                    json!({
                        "kind": "member_activity",
                        "joint_account_id": account.id,
                        "user_id": user_id,
                    }),
                )
                .await;
        });
    }

    /// Personal-channel notice to the invited user. Quietly does nothing when
    /// the invitee has no user account yet; the invite email is their only
    /// notice in that case.
    pub fn invitation_sent(&self, invitation: JointAccountInvite) {
        let broadcaster = self.clone();

        tokio::spawn(async move {
            let Some(account) = broadcaster.load_account(invitation.joint_account_id).await
            else {
                return;
            };
            let inviter_name = broadcaster.load_user_name(invitation.invited_by_user_id).await;

            let db_thread_pool = broadcaster.db_thread_pool.clone();
            let invited_email = invitation.invited_email.clone();

            let invited_user = tokio::task::spawn_blocking(move || {
                let user_dao = db::user::Dao::new(&db_thread_pool);
                user_dao.get_user_by_email(&invited_email)
            })
            .await;

            let Some(Some(invited_user)) =
                check_db_result(invited_user, "Fan-out failed to look up invited user")
            else {
                return;
            };

            broadcaster
                .rooms
                .publish(
                    RoomId::User(invited_user.id),
                    RoomEvent {
                        event: "invitation_received",
                        payload: json!({
                            "invitation_id": invitation.id,
                            "joint_account_id": account.id,
                            "account_name": account.name,
                            "inviter_name": inviter_name,
                        }),
                    },
                )
                .await;

            let recipient = [invited_user.id];
            let announcement = format!(
                "{} invited you to join \"{}\".",
                inviter_name, account.name
            );

            broadcaster
                .push_to_users(
                    &recipient,
                    &PushContent {
                        title: account.name.clone(),
                        body: announcement.clone(),
                        tag: format!("invitation_{}", invitation.id),
                        data: json!({
                            "kind": "invitation_received",
                            "invitation_id": invitation.id,
                            "joint_account_id": account.id,
                        }),
                    },
                )
                .await;

            broadcaster
                .persist_notifications(
                    &recipient,
                    NotificationKind::InviteReceived,
                    &json!({
                        "invitation_id": invitation.id,
                        "joint_account_id": account.id,
                        "account_name": account.name,
                        "message": announcement,
                    }),
                )
                .await;
        });
    }

    /// Tells the inviter how their invitation was answered. An acceptance
    /// additionally announces the new member to the account room.
    pub fn invitation_responded(&self, responder_id: Uuid, invitation: JointAccountInvite) {
        let accepted = InviteStatus::try_from(invitation.status) == Ok(InviteStatus::Accepted);
        let broadcaster = self.clone();

        tokio::spawn(async move {
            let Some(account) = broadcaster.load_account(invitation.joint_account_id).await
            else {
                return;
            };
            let responder_name = broadcaster.load_user_name(responder_id).await;

            if accepted {
                broadcaster
                    .rooms
                    .publish(
                        RoomId::Account(account.id),
                        RoomEvent {
                            event: "member_joined",
                            payload: json!({
                                "user_id": responder_id,
                                "user_name": responder_name,
                                "role": AccountRole::Editor,
                            }),
                        },
                    )
                    .await;
            }

            let (event, kind, verb) = if accepted {
                ("invitation_accepted", NotificationKind::InviteAccepted, "accepted")
            } else {
                ("invitation_declined", NotificationKind::InviteDeclined, "declined")
            };

            broadcaster
                .rooms
                .publish(
                    RoomId::User(invitation.invited_by_user_id),
                    RoomEvent {
                        event,
                        payload: json!({
                            "invitation_id": invitation.id,
                            "joint_account_id": account.id,
                            "responder_name": responder_name,
                        }),
                    },
                )
                .await;

            let recipient = [invitation.invited_by_user_id];
            let announcement = format!(
                "{} {} your invitation to \"{}\".",
                responder_name, verb, account.name
            );

            broadcaster
                .push_to_users(
                    &recipient,
                    &PushContent {
                        title: account.name.clone(),
                        body: announcement.clone(),
                        tag: format!("invitation_{}", invitation.id),
                        data: json!({
                            "kind": event,
                            "invitation_id": invitation.id,
                            "joint_account_id": account.id,
                        }),
                    },
                )
                .await;

            broadcaster
                .persist_notifications(
                    &recipient,
                    kind,
                    &json!({
                        "invitation_id": invitation.id,
                        "joint_account_id": account.id,
                        "account_name": account.name,
                        "message": announcement,
                    }),
                )
                .await;
        });
    }

    pub fn chat_message_posted(&self, message: ChatMessage) {
        let broadcaster = self.clone();

        tokio::spawn(async move {
            let Some(account) = broadcaster.load_account(message.joint_account_id).await else {
                return;
            };

            broadcaster
                .rooms
                .publish(
                    RoomId::Account(account.id),
                    RoomEvent {
                        event: "chat_message",
                        payload: json!({ "message": message }),
                    },
                )
                .await;

            // Messages not sent by a user are announced by the flow that
            // created them
            let Some(sender_id) = message.sender_user_id else {
                return;
            };

            let announcement = format!(
                "{}: {}",
                message.sender_name,
                push_preview(&message.body)
            );

            broadcaster
                .notify_other_members(
                    &account,
                    sender_id,
                    NotificationKind::ChatActivity,
                    &announcement,
                    format!("chat_{}", account.id),
                    json!({
                        "kind": "chat_activity",
                        "joint_account_id": account.id,
                        "message_id": message.id,
                    }),
                )
                .await;
        });
    }

    /// Announces the split card to the room, then asks each participant for
    /// their share over their personal channels.
    pub fn split_request_opened(
        &self,
        message: ChatMessage,
        split_request: SplitRequest,
        participant_ids: Vec<Uuid>,
    ) {
        let broadcaster = self.clone();

        tokio::spawn(async move {
            let Some(account) = broadcaster.load_account(split_request.joint_account_id).await
            else {
                return;
            };

            broadcaster
                .rooms
                .publish(
                    RoomId::Account(account.id),
                    RoomEvent {
                        event: "chat_message",
                        payload: json!({ "message": message }),
                    },
                )
                .await;

            let share = money::format_cents(split_request.share_cents, &split_request.currency);

            for participant_id in &participant_ids {
                broadcaster
                    .rooms
                    .publish(
                        RoomId::User(*participant_id),
                        RoomEvent {
                            event: "split_request_received",
                            payload: json!({
                                "split_request_id": split_request.id,
                                "joint_account_id": account.id,
                                "account_name": account.name,
                                "requester_name": message.sender_name,
                                "share_cents": split_request.share_cents,
                                "currency": split_request.currency,
                            }),
                        },
                    )
                    .await;
            }

            let announcement = format!(
                "{} requests {} from you.",
                message.sender_name, share
            );

            broadcaster
                .push_to_users(
                    &participant_ids,
                    &PushContent {
                        title: account.name.clone(),
                        body: announcement.clone(),
                        tag: format!("split_{}", split_request.id),
                        data: json!({
                            "kind": "split_request_received",
                            "split_request_id": split_request.id,
                            "joint_account_id": account.id,
                        }),
                    },
                )
                .await;

            broadcaster
                .persist_notifications(
                    &participant_ids,
                    NotificationKind::SplitRequestActivity,
                    &json!({
                        "split_request_id": split_request.id,
                        "joint_account_id": account.id,
                        "account_name": account.name,
                        "message": announcement,
                    }),
                )
                .await;
        });
    }

    pub fn split_request_resolved(
        &self,
        responder_id: Uuid,
        response: ParticipantStatus,
        split_request: SplitRequest,
        completed: bool,
    ) {
        let broadcaster = self.clone();

        tokio::spawn(async move {
            let Some(account) = broadcaster.load_account(split_request.joint_account_id).await
            else {
                return;
            };
            let responder_name = broadcaster.load_user_name(responder_id).await;

            broadcaster
                .rooms
                .publish(
                    RoomId::Account(account.id),
                    RoomEvent {
                        event: "split_request_updated",
                        payload: json!({
                            "split_request_id": split_request.id,
                            "responder_user_id": responder_id,
                            "response": response,
                            "completed": completed,
                        }),
                    },
                )
                .await;

            let share = money::format_cents(split_request.share_cents, &split_request.currency);
            let announcement = match response {
                ParticipantStatus::Paid => {
                    format!("{responder_name} paid their {share} share.")
                }
                _ => format!("{responder_name} declined their {share} share."),
            };

            let recipient = [split_request.requested_by_user_id];

            broadcaster
                .push_to_users(
                    &recipient,
                    &PushContent {
                        title: account.name.clone(),
                        body: announcement.clone(),
                        tag: format!("split_{}", split_request.id),
                        data: json!({
                            "kind": "split_request_updated",
                            "split_request_id": split_request.id,
                            "joint_account_id": account.id,
                        }),
                    },
                )
                .await;

            broadcaster
                .persist_notifications(
                    &recipient,
                    NotificationKind::SplitRequestActivity,
                    &json!({
                        "split_request_id": split_request.id,
                        "joint_account_id": account.id,
                        "account_name": account.name,
                        "message": announcement,
                        "completed": completed,
                    }),
                )
                .await;
        });
    }

    /// Push plus persisted notification for every member except `actor_id`,
    /// with the account name as the push title.
    async fn notify_other_members(
        &self,
        account: &JointAccount,
        actor_id: Uuid,
        kind: NotificationKind,
        announcement: &str,
        push_tag: String,
        push_data: serde_json::Value,
    ) {
        let recipients = self.other_member_ids(account.id, actor_id).await;

        self.push_to_users(
            &recipients,
            &PushContent {
                title: account.name.clone(),
                body: announcement.to_string(),
                tag: push_tag,
                data: push_data,
            },
        )
        .await;

        self.persist_notifications(
            &recipients,
            kind,
            &json!({
                "joint_account_id": account.id,
                "account_name": account.name,
                "message": announcement,
            }),
        )
        .await;
    }

    async fn notify_subscription_activity(
        &self,
        account: &JointAccount,
        actor_id: Uuid,
        subscription: &Subscription,
        announcement: &str,
    ) {
        self.notify_other_members(
            account,
            actor_id,
            NotificationKind::SubscriptionActivity,
            announcement,
            format!("subscription_{}", subscription.id),
            json!({
                "kind": "subscription_activity",
                "joint_account_id": account.id,
                "subscription_id": subscription.id,
            }),
        )
        .await;
    }

    async fn publish_goal_saved(&self, joint_account_id: Uuid, actor_id: Uuid, goal: &Goal) {
        self.rooms
            .publish(
                RoomId::Account(joint_account_id),
                RoomEvent {
                    event: "goal_saved",
                    payload: json!({
                        "actor_user_id": actor_id,
                        "goal": goal,
                    }),
                },
            )
            .await;
    }

    async fn publish_subscription_saved(
        &self,
        joint_account_id: Uuid,
        actor_id: Uuid,
        subscription: &Subscription,
    ) {
        self.rooms
            .publish(
                RoomId::Account(joint_account_id),
                RoomEvent {
                    event: "subscription_saved",
                    payload: json!({
                        "actor_user_id": actor_id,
                        "subscription": subscription,
                    }),
                },
            )
            .await;
    }

    /// Emits the milestone chat notice and notifications when the balance
    /// move crossed a quarter of the target.
    async fn announce_milestone(
        &self,
        account: &JointAccount,
        actor_id: Uuid,
        previous_cents: i64,
        goal: &Goal,
    ) {
        let Some(milestone) =
            milestone::crossed(previous_cents, goal.current_cents, goal.target_cents)
        else {
            return;
        };

        let announcement = match milestone {
            Milestone::Achieved => {
                format!("The goal \"{}\" has been fully funded!", goal.name)
            }
            Milestone::Quarter(_) => format!(
                "The goal \"{}\" is {}% funded.",
                goal.name,
                milestone.percent()
            ),
        };

        self.post_chat_notice(
            account.id,
            MessageKind::GoalMilestone,
            &announcement,
            json!({
                "goal_id": goal.id,
                "percent": milestone.percent(),
            }),
        )
        .await;

        self.notify_other_members(
            account,
            actor_id,
            NotificationKind::GoalMilestone,
            &announcement,
            format!("goal_milestone_{}", goal.id),
            json!({
                "kind": "goal_milestone",
                "joint_account_id": account.id,
                "goal_id": goal.id,
                "percent": milestone.percent(),
            }),
        )
        .await;
    }

    /// Writes an app-authored chat message and announces it to the room like
    /// any other message.
    async fn post_chat_notice(
        &self,
        joint_account_id: Uuid,
        kind: MessageKind,
        body: &str,
        data: serde_json::Value,
    ) {
        let db_thread_pool = self.db_thread_pool.clone();
        let message_body = body.to_string();

        let message = tokio::task::spawn_blocking(move || {
            let chat_dao = db::chat::Dao::new(&db_thread_pool);
            chat_dao.create_message(
                joint_account_id,
                None,
                NOTICE_SENDER_NAME,
                kind,
                &message_body,
                Some(&data),
            )
        })
        .await;

        let Some(message) = check_db_result(message, "Fan-out failed to record chat notice")
        else {
            return;
        };

        self.rooms
            .publish(
                RoomId::Account(joint_account_id),
                RoomEvent {
                    event: "chat_message",
                    payload: json!({ "message": message }),
                },
            )
            .await;
    }

    async fn load_account(&self, joint_account_id: Uuid) -> Option<JointAccount> {
        let db_thread_pool = self.db_thread_pool.clone();

        let account = tokio::task::spawn_blocking(move || {
            let account_dao = db::account::Dao::new(&db_thread_pool);
            account_dao.get_joint_account(joint_account_id)
        })
        .await;

        check_db_result(account, "Fan-out failed to load account")
    }

    /// Display name for announcement text. Falls back to a placeholder so one
    /// failed lookup doesn't silence the whole fan-out.
    async fn load_user_name(&self, user_id: Uuid) -> String {
        let db_thread_pool = self.db_thread_pool.clone();

        let user = tokio::task::spawn_blocking(move || {
            let user_dao = db::user::Dao::new(&db_thread_pool);
            user_dao.get_user_by_id(user_id)
        })
        .await;

        match check_db_result(user, "Fan-out failed to load user") {
            Some(user) => user.name,
            None => String::from("A member"),
        }
    }

    async fn other_member_ids(&self, joint_account_id: Uuid, actor_id: Uuid) -> Vec<Uuid> {
        let db_thread_pool = self.db_thread_pool.clone();

        let member_ids = tokio::task::spawn_blocking(move || {
            let account_dao = db::account::Dao::new(&db_thread_pool);
            account_dao.get_member_user_ids(joint_account_id)
        })
        .await;

        match check_db_result(member_ids, "Fan-out failed to load account members") {
            Some(ids) => ids.into_iter().filter(|id| *id != actor_id).collect(),
            None => Vec::new(),
        }
    }

    async fn push_to_users(&self, user_ids: &[Uuid], push: &PushContent) {
        if user_ids.is_empty() {
            return;
        }

        let db_thread_pool = self.db_thread_pool.clone();
        let ids = user_ids.to_vec();

        let subscriptions = tokio::task::spawn_blocking(move || {
            let user_dao = db::user::Dao::new(&db_thread_pool);
            user_dao.get_push_subscriptions(&ids)
        })
        .await;

        let Some(subscriptions) =
            check_db_result(subscriptions, "Fan-out failed to load push subscriptions")
        else {
            return;
        };

        for subscription in subscriptions {
            let notification = PushNotification {
                title: &push.title,
                body: &push.body,
                tag: &push.tag,
                data: &push.data,
            };

            match self
                .push_sender
                .send(&subscription.endpoint, &subscription.keys, notification)
                .await
            {
                Ok(()) => (),
                Err(PushError::ExpiredSubscription) => {
                    log::warn!(
                        "Push endpoint for user {} is no longer valid; removing the subscription",
                        subscription.user_id
                    );

                    self.remove_push_subscription(subscription.user_id).await;
                }
                Err(e) => log::error!("Failed to deliver push notification: {e}"),
            }
        }
    }

    async fn remove_push_subscription(&self, user_id: Uuid) {
        let db_thread_pool = self.db_thread_pool.clone();

        let result = tokio::task::spawn_blocking(move || {
            let user_dao = db::user::Dao::new(&db_thread_pool);
            user_dao.delete_push_subscription(user_id)
        })
        .await;

        let _ = check_db_result(result, "Failed to remove expired push subscription");
    }

    async fn persist_notifications(
        &self,
        user_ids: &[Uuid],
        kind: NotificationKind,
        payload: &serde_json::Value,
    ) {
        if user_ids.is_empty() {
            return;
        }

        let db_thread_pool = self.db_thread_pool.clone();
        let ids = user_ids.to_vec();
        let payload = payload.clone();

        let result = tokio::task::spawn_blocking(move || {
            let notification_dao = db::notification::Dao::new(&db_thread_pool);
            notification_dao.create_notifications(&ids, kind, &payload)
        })
        .await;

        let _ = check_db_result(result, "Fan-out failed to persist notifications");
    }
}

fn check_db_result<T, E: std::fmt::Display>(
    result: Result<Result<T, E>, tokio::task::JoinError>,
    context: &str,
) -> Option<T> {
    match result {
        Ok(Ok(value)) => Some(value),
        Ok(Err(e)) => {
            log::error!("{context}: {e}");
            None
        }
        Err(e) => {
            log::error!("{context}: {e}");
            None
        }
    }
}

fn transaction_summary(transaction: &Transaction) -> String {
    let amount = money::format_cents(transaction.amount_cents, &transaction.currency);

    match TransactionKind::try_from(transaction.kind) {
        Ok(TransactionKind::Income) => {
            format!("income of {} ({})", amount, transaction.category)
        }
        Ok(TransactionKind::Expense) => {
            format!("an expense of {} for {}", amount, transaction.category)
        }
        Err(_) => format!("a transaction of {amount}"),
    }
}

fn cycle_label(subscription: &Subscription) -> &'static str {
    match BillingCycle::try_from(subscription.cycle) {
        Ok(BillingCycle::Monthly) => "monthly",
        Ok(BillingCycle::Yearly) => "yearly",
        Err(_) => "recurring",
    }
}

fn role_phrase(role: AccountRole) -> &'static str {
    match role {
        AccountRole::Viewer => "a viewer",
        AccountRole::Editor => "an editor",
        AccountRole::Admin => "the admin",
    }
}

fn push_preview(body: &str) -> String {
    if body.chars().count() <= PUSH_BODY_MAX_CHARS {
        return body.to_string();
    }

    let mut preview: String = body.chars().take(PUSH_BODY_MAX_CHARS - 1).collect();
    preview.push('…');

    preview
}
