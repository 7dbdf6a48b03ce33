use tally_common::db::{self, DaoError, DbThreadPool};
use tally_common::models::chat_message::MessageKind;
use tally_common::money;
use tally_common::request_io::inputs::{
    InputAccountId, InputChatMessagesQuery, InputMarkMessageRead, InputNewChatMessage,
    InputNewSplitRequest, InputSplitResponse,
};
use tally_common::request_io::outputs::OutputSplitRequest;
use tally_common::validators::Validity;

use actix_web::{web, HttpResponse};
use std::time::{Duration, UNIX_EPOCH};

use crate::fanout::Broadcaster;
use crate::handlers::error::{DoesNotExistType, HttpErrorResponse};
use crate::handlers::verification;
use crate::middleware::auth::{Access, VerifiedToken};
use crate::middleware::FromHeader;

const DEFAULT_MESSAGE_PAGE_SIZE: i64 = 50;
const MAX_MESSAGE_PAGE_SIZE: i64 = 100;

pub async fn post_message(
    db_thread_pool: web::Data<DbThreadPool>,
    broadcaster: web::Data<Broadcaster>,
    user_access_token: VerifiedToken<Access, FromHeader>,
    message_data: web::Json<InputNewChatMessage>,
) -> Result<HttpResponse, HttpErrorResponse> {
    let kind = message_data.kind.unwrap_or(MessageKind::Text);

    // System, split, milestone, and recap messages are written by the server
    // itself
    if !matches!(
        kind,
        MessageKind::Text | MessageKind::Image | MessageKind::TransactionShare
    ) {
        return Err(HttpErrorResponse::IncorrectlyFormed(String::from(
            "Only text, image, and transaction share messages can be posted directly.",
        )));
    }

    if kind == MessageKind::Text && message_data.body.trim().is_empty() {
        return Err(HttpErrorResponse::IncorrectlyFormed(String::from(
            "Message body cannot be empty.",
        )));
    }

    let user_id = user_access_token.claims.user_id;
    let account_id = message_data.account_id;

    verification::verify_can_edit_finances(account_id, user_id, &db_thread_pool).await?;

    let message = match web::block(move || {
        let user_dao = db::user::Dao::new(&db_thread_pool);
        let chat_dao = db::chat::Dao::new(&db_thread_pool);

        let user = user_dao.get_user_by_id(user_id)?;

        chat_dao.create_message(
            account_id,
            Some(user_id),
            &user.name,
            kind,
            &message_data.body,
            message_data.data.as_ref(),
        )
    })
    .await?
    {
        Ok(m) => m,
        Err(e) => {
            log::error!("{e}");
            return Err(HttpErrorResponse::InternalError(String::from(
                "Failed to post message",
            )));
        }
    };

    broadcaster.chat_message_posted(message.clone());

    Ok(HttpResponse::Created().json(message))
}

pub async fn get_messages(
    db_thread_pool: web::Data<DbThreadPool>,
    user_access_token: VerifiedToken<Access, FromHeader>,
    query: web::Query<InputChatMessagesQuery>,
) -> Result<HttpResponse, HttpErrorResponse> {
    let user_id = user_access_token.claims.user_id;
    let account_id = query.account_id;

    verification::verify_membership(account_id, user_id, &db_thread_pool).await?;

    let before = query.before.map(|secs| UNIX_EPOCH + Duration::from_secs(secs));
    let limit = query
        .limit
        .unwrap_or(DEFAULT_MESSAGE_PAGE_SIZE)
        .clamp(1, MAX_MESSAGE_PAGE_SIZE);

    let messages = match web::block(move || {
        let chat_dao = db::chat::Dao::new(&db_thread_pool);
        chat_dao.get_messages(account_id, before, limit)
    })
    .await?
    {
        Ok(m) => m,
        Err(e) => {
            log::error!("{e}");
            return Err(HttpErrorResponse::InternalError(String::from(
                "Failed to get messages",
            )));
        }
    };

    Ok(HttpResponse::Ok().json(messages))
}

pub async fn mark_message_read(
    db_thread_pool: web::Data<DbThreadPool>,
    user_access_token: VerifiedToken<Access, FromHeader>,
    read_data: web::Json<InputMarkMessageRead>,
) -> Result<HttpResponse, HttpErrorResponse> {
    let user_id = user_access_token.claims.user_id;
    let account_id = read_data.account_id;
    let message_id = read_data.message_id;

    verification::verify_membership(account_id, user_id, &db_thread_pool).await?;

    match web::block(move || {
        let chat_dao = db::chat::Dao::new(&db_thread_pool);
        chat_dao.mark_message_read(message_id, account_id, user_id)
    })
    .await?
    {
        Ok(_) => (),
        Err(e) => match e {
            DaoError::QueryFailure(diesel::result::Error::NotFound) => {
                return Err(HttpErrorResponse::DoesNotExist(
                    String::from("No message with the given ID"),
                    DoesNotExistType::Message,
                ));
            }
            _ => {
                log::error!("{e}");
                return Err(HttpErrorResponse::InternalError(String::from(
                    "Failed to mark message read",
                )));
            }
        },
    }

    Ok(HttpResponse::Ok().finish())
}

pub async fn create_split_request(
    db_thread_pool: web::Data<DbThreadPool>,
    broadcaster: web::Data<Broadcaster>,
    user_access_token: VerifiedToken<Access, FromHeader>,
    split_data: web::Json<InputNewSplitRequest>,
) -> Result<HttpResponse, HttpErrorResponse> {
    if split_data.total_cents <= 0 {
        return Err(HttpErrorResponse::InvalidAmount(String::from(
            "Split total must be positive.",
        )));
    }

    if let Validity::Invalid(msg) = split_data.validate_currency_code() {
        return Err(HttpErrorResponse::IncorrectlyFormed(msg));
    }

    let user_id = user_access_token.claims.user_id;
    let account_id = split_data.account_id;

    verification::verify_can_edit_finances(account_id, user_id, &db_thread_pool).await?;

    let (message, split_request, participants, participant_ids) = match web::block(move || {
        let user_dao = db::user::Dao::new(&db_thread_pool);
        let account_dao = db::account::Dao::new(&db_thread_pool);
        let chat_dao = db::chat::Dao::new(&db_thread_pool);

        let user = user_dao.get_user_by_id(user_id)?;
        let member_ids = account_dao.get_member_user_ids(account_id)?;

        let participant_ids: Vec<uuid::Uuid> = member_ids
            .iter()
            .copied()
            .filter(|id| *id != user_id)
            .collect();

        if participant_ids.is_empty() {
            return Err(DaoError::InvalidState(
                "There are no other members to split with.",
            ));
        }

        let share_cents =
            money::split_share_cents(split_data.total_cents, participant_ids.len() as u32);

        let (message, split_request) = chat_dao.create_split_request(
            account_id,
            user_id,
            &user.name,
            split_data.total_cents,
            share_cents,
            &split_data.currency,
            split_data.note.as_deref(),
            &member_ids,
        )?;

        let (_, participant_rows) = chat_dao.get_split_request(split_request.id, account_id)?;

        Ok((message, split_request, participant_rows, participant_ids))
    })
    .await?
    {
        Ok(s) => s,
        Err(e) => match e {
            DaoError::InvalidState(msg) => {
                return Err(HttpErrorResponse::InvalidState(String::from(msg)));
            }
            _ => {
                log::error!("{e}");
                return Err(HttpErrorResponse::InternalError(String::from(
                    "Failed to create split request",
                )));
            }
        },
    };

    broadcaster.split_request_opened(message, split_request.clone(), participant_ids);

    Ok(HttpResponse::Created().json(OutputSplitRequest {
        id: split_request.id,
        chat_message_id: split_request.chat_message_id,
        joint_account_id: split_request.joint_account_id,
        requested_by_user_id: split_request.requested_by_user_id,
        total_cents: split_request.total_cents,
        share_cents: split_request.share_cents,
        currency: split_request.currency,
        note: split_request.note,
        status: split_request.status,
        participants,
        modified_timestamp: split_request.modified_timestamp,
        created_timestamp: split_request.created_timestamp,
    }))
}

pub async fn respond_to_split_request(
    db_thread_pool: web::Data<DbThreadPool>,
    broadcaster: web::Data<Broadcaster>,
    user_access_token: VerifiedToken<Access, FromHeader>,
    response_data: web::Json<InputSplitResponse>,
) -> Result<HttpResponse, HttpErrorResponse> {
    let user_id = user_access_token.claims.user_id;
    let account_id = response_data.account_id;
    let split_request_id = response_data.split_request_id;
    let response = response_data.response;

    verification::verify_membership(account_id, user_id, &db_thread_pool).await?;

    let (split_request, completed) = match web::block(move || {
        let chat_dao = db::chat::Dao::new(&db_thread_pool);
        chat_dao.respond_to_split_request(split_request_id, account_id, user_id, response)
    })
    .await?
    {
        Ok(s) => s,
        Err(e) => match e {
            DaoError::QueryFailure(diesel::result::Error::NotFound) => {
                return Err(HttpErrorResponse::DoesNotExist(
                    String::from(
                        "No split request with the given ID awaiting a response from this user",
                    ),
                    DoesNotExistType::SplitRequest,
                ));
            }
            DaoError::InvalidState(msg) => {
                return Err(HttpErrorResponse::InvalidState(String::from(msg)));
            }
            _ => {
                log::error!("{e}");
                return Err(HttpErrorResponse::InternalError(String::from(
                    "Failed to respond to split request",
                )));
            }
        },
    };

    broadcaster.split_request_resolved(user_id, response, split_request.clone(), completed);

    Ok(HttpResponse::Ok().json(split_request))
}

pub async fn get_open_split_requests(
    db_thread_pool: web::Data<DbThreadPool>,
    user_access_token: VerifiedToken<Access, FromHeader>,
    query: web::Query<InputAccountId>,
) -> Result<HttpResponse, HttpErrorResponse> {
    let user_id = user_access_token.claims.user_id;
    let account_id = query.account_id;

    verification::verify_membership(account_id, user_id, &db_thread_pool).await?;

    let split_requests = match web::block(move || {
        let chat_dao = db::chat::Dao::new(&db_thread_pool);
        chat_dao.get_open_split_requests(account_id)
    })
    .await?
    {
        Ok(s) => s,
        Err(e) => {
            log::error!("{e}");
            return Err(HttpErrorResponse::InternalError(String::from(
                "Failed to get split requests",
            )));
        }
    };

    let output: Vec<OutputSplitRequest> = split_requests
        .into_iter()
        .map(|(split_request, participants)| OutputSplitRequest {
            id: split_request.id,
            chat_message_id: split_request.chat_message_id,
            joint_account_id: split_request.joint_account_id,
            requested_by_user_id: split_request.requested_by_user_id,
            total_cents: split_request.total_cents,
            share_cents: split_request.share_cents,
            currency: split_request.currency,
            note: split_request.note,
            status: split_request.status,
            participants,
            modified_timestamp: split_request.modified_timestamp,
            created_timestamp: split_request.created_timestamp,
        })
        .collect();

    Ok(HttpResponse::Ok().json(output))
}
