use std::fmt;

pub mod chat_message;
pub mod goal;
pub mod job_registry_item;
pub mod joint_account;
pub mod joint_account_invite;
pub mod joint_account_member;
pub mod notification;
pub mod push_subscription;
pub mod split_request;
pub mod split_request_participant;
pub mod subscription;
pub mod transaction;
pub mod user;

/// Returned when a stored discriminant doesn't map to a known enum variant.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct UnrecognizedDiscriminant(pub i16);

impl std::error::Error for UnrecognizedDiscriminant {}

impl fmt::Display for UnrecognizedDiscriminant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Unrecognized discriminant: {}", self.0)
    }
}
