use diesel::{Insertable, Queryable};
use serde::{Deserialize, Serialize};
use std::time::SystemTime;
use uuid::Uuid;

use crate::models::split_request::SplitRequest;
use crate::models::user::User;
use crate::models::UnrecognizedDiscriminant;
use crate::schema::split_request_participants;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParticipantStatus {
    Pending,
    Paid,
    Declined,
}

impl TryFrom<i16> for ParticipantStatus {
    type Error = UnrecognizedDiscriminant;

    fn try_from(value: i16) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(ParticipantStatus::Pending),
            1 => Ok(ParticipantStatus::Paid),
            2 => Ok(ParticipantStatus::Declined),
            v => Err(UnrecognizedDiscriminant(v)),
        }
    }
}

impl From<ParticipantStatus> for i16 {
    fn from(status: ParticipantStatus) -> Self {
        match status {
            ParticipantStatus::Pending => 0,
            ParticipantStatus::Paid => 1,
            ParticipantStatus::Declined => 2,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, Associations, Identifiable, Queryable)]
#[diesel(belongs_to(SplitRequest, foreign_key = split_request_id))]
#[diesel(belongs_to(User, foreign_key = user_id))]
#[diesel(table_name = split_request_participants, primary_key(split_request_id, user_id))]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct SplitRequestParticipant {
    pub split_request_id: Uuid,
    pub user_id: Uuid,

    pub status: i16,

    pub responded_timestamp: Option<SystemTime>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = split_request_participants, primary_key(split_request_id, user_id))]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct NewSplitRequestParticipant {
    pub split_request_id: Uuid,
    pub user_id: Uuid,

    pub status: i16,

    pub responded_timestamp: Option<SystemTime>,
}
