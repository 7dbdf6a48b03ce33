pub mod account;
pub mod chat;
pub mod event;
pub mod goal;
pub mod health;
pub mod notification;
pub mod subscription;
pub mod transaction;
pub mod user;

pub mod verification {
    use actix_web::web;
    use tally_common::db::{self, DbThreadPool};
    use tally_common::models::joint_account_member::AccountRole;
    use uuid::Uuid;

    use super::error::HttpErrorResponse;

    pub const NOT_A_MEMBER_MSG: &str = "User is not a member of this account.";
    pub const CANNOT_EDIT_FINANCES_MSG: &str =
        "User's role on this account cannot modify finances.";
    pub const CANNOT_MANAGE_MEMBERS_MSG: &str =
        "Only the account admin can manage members and account settings.";

    /// Every account-scoped operation authorizes through this lookup. A user
    /// without a membership row gets the same rejection for every operation
    /// and learns nothing else about the account.
    pub async fn verify_membership(
        joint_account_id: Uuid,
        user_id: Uuid,
        db_thread_pool: &DbThreadPool,
    ) -> Result<AccountRole, HttpErrorResponse> {
        let account_dao = db::account::Dao::new(db_thread_pool);
        let membership =
            match web::block(move || account_dao.get_membership(joint_account_id, user_id)).await? {
                Ok(m) => m,
                Err(e) => {
                    log::error!("{e}");
                    return Err(HttpErrorResponse::InternalError(String::from(
                        "Failed to check account membership",
                    )));
                }
            };

        let Some(member) = membership else {
            return Err(HttpErrorResponse::UserDisallowed(String::from(
                NOT_A_MEMBER_MSG,
            )));
        };

        match AccountRole::try_from(member.role) {
            Ok(role) => Ok(role),
            Err(e) => {
                log::error!("{e}");
                Err(HttpErrorResponse::InternalError(String::from(
                    "Failed to check account membership",
                )))
            }
        }
    }

    /// Membership check plus the financial-write gate. A member whose role
    /// cannot edit finances is rejected with an error type distinct from the
    /// not-a-member rejection.
    pub async fn verify_can_edit_finances(
        joint_account_id: Uuid,
        user_id: Uuid,
        db_thread_pool: &DbThreadPool,
    ) -> Result<AccountRole, HttpErrorResponse> {
        let role = verify_membership(joint_account_id, user_id, db_thread_pool).await?;

        if !role.can_edit_finances() {
            return Err(HttpErrorResponse::InsufficientRole(String::from(
                CANNOT_EDIT_FINANCES_MSG,
            )));
        }

        Ok(role)
    }

    pub async fn verify_can_manage_members(
        joint_account_id: Uuid,
        user_id: Uuid,
        db_thread_pool: &DbThreadPool,
    ) -> Result<AccountRole, HttpErrorResponse> {
        let role = verify_membership(joint_account_id, user_id, db_thread_pool).await?;

        if !role.can_manage_members() {
            return Err(HttpErrorResponse::InsufficientRole(String::from(
                CANNOT_MANAGE_MEMBERS_MSG,
            )));
        }

        Ok(role)
    }
}

pub mod error {
    use tally_common::token::TokenError;

    use actix_web::http::StatusCode;
    use actix_web::{HttpResponse, HttpResponseBuilder};
    use serde::Serialize;
    use std::fmt;

    /// Stable numeric codes clients can match on without parsing messages.
    #[derive(Clone, Copy, Debug, Eq, PartialEq)]
    #[repr(u32)]
    pub enum ErrorType {
        // 400
        IncorrectlyFormed = 0,
        InvalidAmount = 1,
        OutOfDate = 2,
        InvalidState = 3,
        ConflictWithExisting = 4,

        // 401
        IncorrectCredential = 5,
        TokenExpired = 6,
        TokenMissing = 7,
        WrongTokenType = 8,

        // 403
        UserDisallowed = 9,
        InsufficientRole = 10,

        // 404
        UserDoesNotExist = 11,
        AccountDoesNotExist = 12,
        InvitationDoesNotExist = 13,
        TransactionDoesNotExist = 14,
        GoalDoesNotExist = 15,
        SubscriptionDoesNotExist = 16,
        MessageDoesNotExist = 17,
        SplitRequestDoesNotExist = 18,
        NotificationDoesNotExist = 19,

        // 500
        InternalError = 20,
    }

    impl From<ErrorType> for u32 {
        fn from(err_type: ErrorType) -> Self {
            err_type as u32
        }
    }

    #[derive(Debug)]
    pub enum DoesNotExistType {
        User,
        Account,
        Invitation,
        Transaction,
        Goal,
        Subscription,
        Message,
        SplitRequest,
        Notification,
    }

    #[derive(Debug)]
    pub enum HttpErrorResponse {
        // 400
        IncorrectlyFormed(String),
        InvalidAmount(String),
        OutOfDate(String),
        InvalidState(String),
        ConflictWithExisting(String),

        // 401
        IncorrectCredential(String),
        TokenExpired(String),
        TokenMissing(String),
        WrongTokenType(String),

        // 403
        UserDisallowed(String),
        InsufficientRole(String),

        // 404
        DoesNotExist(String, DoesNotExistType),

        // 500
        InternalError(String),
    }

    #[derive(Debug, Serialize)]
    pub struct ServerErrorResponse {
        pub err_type: u32,
        pub err_message: String,
    }

    impl std::error::Error for HttpErrorResponse {}

    impl fmt::Display for HttpErrorResponse {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            let server_error: ServerErrorResponse = self.into();
            write!(f, "{:?}", server_error)
        }
    }

    impl From<HttpErrorResponse> for ServerErrorResponse {
        fn from(resp: HttpErrorResponse) -> Self {
            (&resp).into()
        }
    }

    impl From<&HttpErrorResponse> for ServerErrorResponse {
        fn from(resp: &HttpErrorResponse) -> Self {
            match resp {
                // 400
                HttpErrorResponse::IncorrectlyFormed(msg) => ServerErrorResponse {
                    err_type: ErrorType::IncorrectlyFormed.into(),
                    err_message: format!("Incorrectly formed request: {msg}"),
                },
                HttpErrorResponse::InvalidAmount(msg) => ServerErrorResponse {
                    err_type: ErrorType::InvalidAmount.into(),
                    err_message: format!("Invalid amount: {msg}"),
                },
                HttpErrorResponse::OutOfDate(msg) => ServerErrorResponse {
                    err_type: ErrorType::OutOfDate.into(),
                    err_message: format!("Out of date: {msg}"),
                },
                HttpErrorResponse::InvalidState(msg) => ServerErrorResponse {
                    err_type: ErrorType::InvalidState.into(),
                    err_message: format!("Invalid state: {msg}"),
                },
                HttpErrorResponse::ConflictWithExisting(msg) => ServerErrorResponse {
                    err_type: ErrorType::ConflictWithExisting.into(),
                    err_message: format!("Conflict with existing data: {msg}"),
                },

                // 401
                HttpErrorResponse::IncorrectCredential(msg) => ServerErrorResponse {
                    err_type: ErrorType::IncorrectCredential.into(),
                    err_message: format!("Incorrect credential: {msg}"),
                },
                HttpErrorResponse::TokenExpired(msg) => ServerErrorResponse {
                    err_type: ErrorType::TokenExpired.into(),
                    err_message: format!("Token expired: {msg}"),
                },
                HttpErrorResponse::TokenMissing(msg) => ServerErrorResponse {
                    err_type: ErrorType::TokenMissing.into(),
                    err_message: format!("Token missing: {msg}"),
                },
                HttpErrorResponse::WrongTokenType(msg) => ServerErrorResponse {
                    err_type: ErrorType::WrongTokenType.into(),
                    err_message: format!("Wrong token type: {msg}"),
                },

                // 403
                HttpErrorResponse::UserDisallowed(msg) => ServerErrorResponse {
                    err_type: ErrorType::UserDisallowed.into(),
                    err_message: format!("User disallowed: {msg}"),
                },
                HttpErrorResponse::InsufficientRole(msg) => ServerErrorResponse {
                    err_type: ErrorType::InsufficientRole.into(),
                    err_message: format!("Insufficient role: {msg}"),
                },

                // 404
                HttpErrorResponse::DoesNotExist(msg, dne_type) => ServerErrorResponse {
                    err_type: match dne_type {
                        DoesNotExistType::User => ErrorType::UserDoesNotExist,
                        DoesNotExistType::Account => ErrorType::AccountDoesNotExist,
                        DoesNotExistType::Invitation => ErrorType::InvitationDoesNotExist,
                        DoesNotExistType::Transaction => ErrorType::TransactionDoesNotExist,
                        DoesNotExistType::Goal => ErrorType::GoalDoesNotExist,
                        DoesNotExistType::Subscription => ErrorType::SubscriptionDoesNotExist,
                        DoesNotExistType::Message => ErrorType::MessageDoesNotExist,
                        DoesNotExistType::SplitRequest => ErrorType::SplitRequestDoesNotExist,
                        DoesNotExistType::Notification => ErrorType::NotificationDoesNotExist,
                    }
                    .into(),
                    err_message: format!("Does not exist: {msg}"),
                },

                // 500
                HttpErrorResponse::InternalError(msg) => ServerErrorResponse {
                    err_type: ErrorType::InternalError.into(),
                    err_message: format!("Internal error: {msg}"),
                },
            }
        }
    }

    impl actix_web::error::ResponseError for HttpErrorResponse {
        fn error_response(&self) -> HttpResponse {
            HttpResponseBuilder::new(self.status_code()).json(ServerErrorResponse::from(self))
        }

        fn status_code(&self) -> StatusCode {
            match *self {
                HttpErrorResponse::IncorrectlyFormed(_)
                | HttpErrorResponse::InvalidAmount(_)
                | HttpErrorResponse::OutOfDate(_)
                | HttpErrorResponse::InvalidState(_)
                | HttpErrorResponse::ConflictWithExisting(_) => StatusCode::BAD_REQUEST,
                HttpErrorResponse::IncorrectCredential(_)
                | HttpErrorResponse::TokenExpired(_)
                | HttpErrorResponse::TokenMissing(_)
                | HttpErrorResponse::WrongTokenType(_) => StatusCode::UNAUTHORIZED,
                HttpErrorResponse::UserDisallowed(_) | HttpErrorResponse::InsufficientRole(_) => {
                    StatusCode::FORBIDDEN
                }
                HttpErrorResponse::DoesNotExist(_, _) => StatusCode::NOT_FOUND,
                HttpErrorResponse::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            }
        }
    }

    impl From<actix_web::error::BlockingError> for HttpErrorResponse {
        fn from(_err: actix_web::error::BlockingError) -> Self {
            HttpErrorResponse::InternalError(String::from("Actix thread pool failure"))
        }
    }

    impl From<TokenError> for HttpErrorResponse {
        fn from(err: TokenError) -> Self {
            match err {
                TokenError::TokenInvalid => {
                    HttpErrorResponse::IncorrectCredential(String::from("Invalid token"))
                }
                TokenError::TokenExpired => {
                    HttpErrorResponse::TokenExpired(String::from("Token expired"))
                }
                TokenError::TokenMissing => {
                    HttpErrorResponse::TokenMissing(String::from("Missing token"))
                }
                TokenError::WrongTokenType => {
                    HttpErrorResponse::WrongTokenType(String::from("Wrong token type"))
                }
            }
        }
    }
}
