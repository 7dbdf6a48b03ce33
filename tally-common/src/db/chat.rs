use diesel::{dsl, BelongingToDsl, ExpressionMethods, GroupedBy, QueryDsl, RunQueryDsl};
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

use crate::db::{DaoError, DbThreadPool};
use crate::models::chat_message::{ChatMessage, MessageKind, NewChatMessage, ReadReceipt};
use crate::models::split_request::{NewSplitRequest, SplitRequest, SplitRequestStatus};
use crate::models::split_request_participant::{
    NewSplitRequestParticipant, ParticipantStatus, SplitRequestParticipant,
};
use crate::schema::chat_messages as chat_message_fields;
use crate::schema::chat_messages::dsl::chat_messages;
use crate::schema::split_request_participants as participant_fields;
use crate::schema::split_request_participants::dsl::split_request_participants;
use crate::schema::split_requests as split_request_fields;
use crate::schema::split_requests::dsl::split_requests;

pub struct Dao {
    db_thread_pool: DbThreadPool,
}

impl Dao {
    pub fn new(db_thread_pool: &DbThreadPool) -> Self {
        Self {
            db_thread_pool: db_thread_pool.clone(),
        }
    }

    pub fn create_message(
        &self,
        joint_account_id: Uuid,
        sender_user_id: Option<Uuid>,
        sender_name: &str,
        kind: MessageKind,
        body: &str,
        data: Option<&serde_json::Value>,
    ) -> Result<ChatMessage, DaoError> {
        // The sender has seen their own message from the moment it exists
        let read_by = match sender_user_id {
            Some(user_id) => serde_json::json!([ReadReceipt {
                user_id,
                read_timestamp: unix_timestamp_secs(),
            }]),
            None => serde_json::json!([]),
        };

        let new_message = NewChatMessage {
            id: Uuid::now_v7(),
            joint_account_id,
            sender_user_id,
            sender_name,
            kind: kind.into(),
            body,
            data,
            read_by: &read_by,
            created_timestamp: SystemTime::now(),
        };

        Ok(dsl::insert_into(chat_messages)
            .values(&new_message)
            .get_result::<ChatMessage>(&mut self.db_thread_pool.get()?)?)
    }

    pub fn get_messages(
        &self,
        joint_account_id: Uuid,
        before: Option<SystemTime>,
        limit: i64,
    ) -> Result<Vec<ChatMessage>, DaoError> {
        let mut query = chat_messages
            .filter(chat_message_fields::joint_account_id.eq(joint_account_id))
            .into_boxed();

        if let Some(before) = before {
            query = query.filter(chat_message_fields::created_timestamp.lt(before));
        }

        Ok(query
            .order(chat_message_fields::created_timestamp.desc())
            .limit(limit)
            .load::<ChatMessage>(&mut self.db_thread_pool.get()?)?)
    }

    /// Appends the user's read receipt to the message. Reading a message twice
    /// leaves the first receipt in place.
    pub fn mark_message_read(
        &self,
        message_id: Uuid,
        joint_account_id: Uuid,
        user_id: Uuid,
    ) -> Result<(), DaoError> {
        let mut db_connection = self.db_thread_pool.get()?;

        db_connection
            .build_transaction()
            .run::<_, diesel::result::Error, _>(|conn| {
                let message = chat_messages
                    .find(message_id)
                    .filter(chat_message_fields::joint_account_id.eq(joint_account_id))
                    .get_result::<ChatMessage>(conn)?;

                let mut receipts: Vec<ReadReceipt> = serde_json::from_value(message.read_by)
                    .map_err(|e| diesel::result::Error::DeserializationError(Box::new(e)))?;

                if receipts.iter().any(|r| r.user_id == user_id) {
                    return Ok(());
                }

                receipts.push(ReadReceipt {
                    user_id,
                    read_timestamp: unix_timestamp_secs(),
                });

                let read_by = serde_json::to_value(&receipts)
                    .map_err(|e| diesel::result::Error::SerializationError(Box::new(e)))?;

                dsl::update(chat_messages.find(message_id))
                    .set(chat_message_fields::read_by.eq(read_by))
                    .execute(conn)?;

                Ok(())
            })?;

        Ok(())
    }

    /// Creates the split request, its participant rows, and the chat message
    /// that carries it in a single transaction.
    #[allow(clippy::too_many_arguments)]
    pub fn create_split_request(
        &self,
        joint_account_id: Uuid,
        requested_by_user_id: Uuid,
        requester_name: &str,
        total_cents: i64,
        share_cents: i64,
        currency: &str,
        note: Option<&str>,
        participant_user_ids: &[Uuid],
    ) -> Result<(ChatMessage, SplitRequest), DaoError> {
        let current_time = SystemTime::now();
        let message_id = Uuid::now_v7();
        let split_request_id = Uuid::now_v7();

        let message_data = serde_json::json!({
            "split_request_id": split_request_id,
            "total_cents": total_cents,
            "share_cents": share_cents,
            "currency": currency,
        });

        let read_by = serde_json::json!([ReadReceipt {
            user_id: requested_by_user_id,
            read_timestamp: unix_timestamp_secs(),
        }]);

        let new_message = NewChatMessage {
            id: message_id,
            joint_account_id,
            sender_user_id: Some(requested_by_user_id),
            sender_name: requester_name,
            kind: MessageKind::SplitRequest.into(),
            body: note.unwrap_or_default(),
            data: Some(&message_data),
            read_by: &read_by,
            created_timestamp: current_time,
        };

        let new_split_request = NewSplitRequest {
            id: split_request_id,
            chat_message_id: message_id,
            joint_account_id,
            requested_by_user_id,
            total_cents,
            share_cents,
            currency,
            note,
            status: SplitRequestStatus::Open.into(),
            modified_timestamp: current_time,
            created_timestamp: current_time,
        };

        // The requester owes nothing, so they never get a participant row
        let new_participants: Vec<NewSplitRequestParticipant> = participant_user_ids
            .iter()
            .filter(|user_id| **user_id != requested_by_user_id)
            .map(|user_id| NewSplitRequestParticipant {
                split_request_id,
                user_id: *user_id,
                status: ParticipantStatus::Pending.into(),
                responded_timestamp: None,
            })
            .collect();

        let mut db_connection = self.db_thread_pool.get()?;

        let (message, split_request) = db_connection
            .build_transaction()
            .run::<_, diesel::result::Error, _>(|conn| {
                let message = dsl::insert_into(chat_messages)
                    .values(&new_message)
                    .get_result::<ChatMessage>(conn)?;

                let split_request = dsl::insert_into(split_requests)
                    .values(&new_split_request)
                    .get_result::<SplitRequest>(conn)?;

                dsl::insert_into(split_request_participants)
                    .values(&new_participants)
                    .execute(conn)?;

                Ok((message, split_request))
            })?;

        Ok((message, split_request))
    }

    pub fn get_split_request(
        &self,
        split_request_id: Uuid,
        joint_account_id: Uuid,
    ) -> Result<(SplitRequest, Vec<SplitRequestParticipant>), DaoError> {
        let mut db_connection = self.db_thread_pool.get()?;

        let split_request = split_requests
            .find(split_request_id)
            .filter(split_request_fields::joint_account_id.eq(joint_account_id))
            .get_result::<SplitRequest>(&mut db_connection)?;

        let participants = SplitRequestParticipant::belonging_to(&split_request)
            .order(participant_fields::user_id.asc())
            .load::<SplitRequestParticipant>(&mut db_connection)?;

        Ok((split_request, participants))
    }

    pub fn get_open_split_requests(
        &self,
        joint_account_id: Uuid,
    ) -> Result<Vec<(SplitRequest, Vec<SplitRequestParticipant>)>, DaoError> {
        let mut db_connection = self.db_thread_pool.get()?;

        let loaded_requests = split_requests
            .filter(split_request_fields::joint_account_id.eq(joint_account_id))
            .filter(split_request_fields::status.eq(i16::from(SplitRequestStatus::Open)))
            .order(split_request_fields::created_timestamp.desc())
            .load::<SplitRequest>(&mut db_connection)?;

        let grouped_participants = SplitRequestParticipant::belonging_to(&loaded_requests)
            .order(participant_fields::user_id.asc())
            .load::<SplitRequestParticipant>(&mut db_connection)?
            .grouped_by(&loaded_requests);

        Ok(loaded_requests
            .into_iter()
            .zip(grouped_participants)
            .collect())
    }

    /// Records the participant's response. The boolean in the returned pair is
    /// true when this response was the last one outstanding and the request
    /// flipped to completed.
    pub fn respond_to_split_request(
        &self,
        split_request_id: Uuid,
        joint_account_id: Uuid,
        user_id: Uuid,
        response: ParticipantStatus,
    ) -> Result<(SplitRequest, bool), DaoError> {
        if response == ParticipantStatus::Pending {
            return Err(DaoError::InvalidState(
                "A split request response cannot be pending.",
            ));
        }

        let mut db_connection = self.db_thread_pool.get()?;

        db_connection
            .build_transaction()
            .run::<_, DaoError, _>(|conn| {
                let split_request = split_requests
                    .find(split_request_id)
                    .filter(split_request_fields::joint_account_id.eq(joint_account_id))
                    .get_result::<SplitRequest>(conn)?;

                if split_request.status != i16::from(SplitRequestStatus::Open) {
                    return Err(DaoError::InvalidState(
                        "Split request has already been completed.",
                    ));
                }

                let participant = split_request_participants
                    .find((split_request_id, user_id))
                    .get_result::<SplitRequestParticipant>(conn)?;

                if participant.status != i16::from(ParticipantStatus::Pending) {
                    return Err(DaoError::InvalidState(
                        "Participant has already responded to this split request.",
                    ));
                }

                dsl::update(split_request_participants.find((split_request_id, user_id)))
                    .set((
                        participant_fields::status.eq(i16::from(response)),
                        participant_fields::responded_timestamp.eq(SystemTime::now()),
                    ))
                    .execute(conn)?;

                let outstanding = split_request_participants
                    .filter(participant_fields::split_request_id.eq(split_request_id))
                    .filter(participant_fields::status.eq(i16::from(ParticipantStatus::Pending)))
                    .count()
                    .get_result::<i64>(conn)?;

                if outstanding == 0 {
                    let completed = dsl::update(split_requests.find(split_request_id))
                        .set((
                            split_request_fields::status
                                .eq(i16::from(SplitRequestStatus::Completed)),
                            split_request_fields::modified_timestamp.eq(dsl::now),
                        ))
                        .get_result::<SplitRequest>(conn)?;

                    return Ok((completed, true));
                }

                Ok((split_request, false))
            })
    }
}

fn unix_timestamp_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
