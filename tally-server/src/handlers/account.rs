use tally_common::db::{self, DaoError, DbThreadPool};
use tally_common::email::templates::InviteMessage;
use tally_common::email::{EmailMessage, EmailSender};
use tally_common::models::joint_account_member::AccountRole;
use tally_common::request_io::inputs::{
    InputAccountId, InputEditJointAccount, InputInvitationId, InputMemberId, InputMemberRole,
    InputNewInvitation, InputNewJointAccount,
};
use tally_common::request_io::outputs::{OutputJointAccount, OutputMember};
use tally_common::validators::Validity;

use actix_web::{web, HttpResponse};
use std::sync::Arc;

use crate::env;
use crate::fanout::Broadcaster;
use crate::handlers::error::{DoesNotExistType, HttpErrorResponse};
use crate::handlers::verification;
use crate::middleware::auth::{Access, VerifiedToken};
use crate::middleware::FromHeader;

const INVITE_EMAIL_SUBJECT: &str = "You've been invited to a shared account on Tally";

pub async fn create(
    db_thread_pool: web::Data<DbThreadPool>,
    user_access_token: VerifiedToken<Access, FromHeader>,
    account_data: web::Json<InputNewJointAccount>,
) -> Result<HttpResponse, HttpErrorResponse> {
    if let Validity::Invalid(msg) = account_data.validate_currency_code() {
        return Err(HttpErrorResponse::IncorrectlyFormed(msg));
    }

    let user_id = user_access_token.claims.user_id;

    let account = match web::block(move || {
        let account_dao = db::account::Dao::new(&db_thread_pool);
        account_dao.create_joint_account(
            &account_data.name,
            &account_data.primary_currency,
            user_id,
        )
    })
    .await?
    {
        Ok(a) => a,
        Err(e) => {
            log::error!("{e}");
            return Err(HttpErrorResponse::InternalError(String::from(
                "Failed to create account",
            )));
        }
    };

    Ok(HttpResponse::Created().json(OutputJointAccount {
        id: account.id,
        name: account.name,
        primary_currency: account.primary_currency,
        admin_user_id: account.admin_user_id,
        role: AccountRole::Admin,
        modified_timestamp: account.modified_timestamp,
        created_timestamp: account.created_timestamp,
    }))
}

pub async fn get(
    db_thread_pool: web::Data<DbThreadPool>,
    user_access_token: VerifiedToken<Access, FromHeader>,
    query: web::Query<InputAccountId>,
) -> Result<HttpResponse, HttpErrorResponse> {
    let user_id = user_access_token.claims.user_id;
    let account_id = query.account_id;

    let role = verification::verify_membership(account_id, user_id, &db_thread_pool).await?;

    let account = match web::block(move || {
        let account_dao = db::account::Dao::new(&db_thread_pool);
        account_dao.get_joint_account(account_id)
    })
    .await?
    {
        Ok(a) => a,
        Err(e) => match e {
            DaoError::QueryFailure(diesel::result::Error::NotFound) => {
                return Err(HttpErrorResponse::DoesNotExist(
                    String::from("No account with the given ID"),
                    DoesNotExistType::Account,
                ));
            }
            _ => {
                log::error!("{e}");
                return Err(HttpErrorResponse::InternalError(String::from(
                    "Failed to get account",
                )));
            }
        },
    };

    Ok(HttpResponse::Ok().json(OutputJointAccount {
        id: account.id,
        name: account.name,
        primary_currency: account.primary_currency,
        admin_user_id: account.admin_user_id,
        role,
        modified_timestamp: account.modified_timestamp,
        created_timestamp: account.created_timestamp,
    }))
}

pub async fn get_all(
    db_thread_pool: web::Data<DbThreadPool>,
    user_access_token: VerifiedToken<Access, FromHeader>,
) -> Result<HttpResponse, HttpErrorResponse> {
    let user_id = user_access_token.claims.user_id;

    let accounts = match web::block(move || {
        let account_dao = db::account::Dao::new(&db_thread_pool);
        account_dao.get_joint_accounts_for_user(user_id)
    })
    .await?
    {
        Ok(a) => a,
        Err(e) => {
            log::error!("{e}");
            return Err(HttpErrorResponse::InternalError(String::from(
                "Failed to get accounts",
            )));
        }
    };

    let mut output = Vec::with_capacity(accounts.len());

    for (account, role) in accounts {
        let role = match AccountRole::try_from(role) {
            Ok(r) => r,
            Err(e) => {
                log::error!("{e}");
                return Err(HttpErrorResponse::InternalError(String::from(
                    "Failed to get accounts",
                )));
            }
        };

        output.push(OutputJointAccount {
            id: account.id,
            name: account.name,
            primary_currency: account.primary_currency,
            admin_user_id: account.admin_user_id,
            role,
            modified_timestamp: account.modified_timestamp,
            created_timestamp: account.created_timestamp,
        });
    }

    Ok(HttpResponse::Ok().json(output))
}

pub async fn edit(
    db_thread_pool: web::Data<DbThreadPool>,
    broadcaster: web::Data<Broadcaster>,
    user_access_token: VerifiedToken<Access, FromHeader>,
    account_data: web::Json<InputEditJointAccount>,
) -> Result<HttpResponse, HttpErrorResponse> {
    if let Validity::Invalid(msg) = account_data.validate_currency_code() {
        return Err(HttpErrorResponse::IncorrectlyFormed(msg));
    }

    let user_id = user_access_token.claims.user_id;
    let account_id = account_data.account_id;

    verification::verify_can_manage_members(account_id, user_id, &db_thread_pool).await?;

    let account = match web::block(move || {
        let account_dao = db::account::Dao::new(&db_thread_pool);
        account_dao.update_joint_account(
            account_id,
            &account_data.name,
            &account_data.primary_currency,
        )
    })
    .await?
    {
        Ok(a) => a,
        Err(e) => match e {
            DaoError::QueryFailure(diesel::result::Error::NotFound) => {
                return Err(HttpErrorResponse::DoesNotExist(
                    String::from("No account with the given ID"),
                    DoesNotExistType::Account,
                ));
            }
            _ => {
                log::error!("{e}");
                return Err(HttpErrorResponse::InternalError(String::from(
                    "Failed to update account",
                )));
            }
        },
    };

    broadcaster.account_updated(user_id, account.clone());

    Ok(HttpResponse::Ok().json(OutputJointAccount {
        id: account.id,
        name: account.name,
        primary_currency: account.primary_currency,
        admin_user_id: account.admin_user_id,
        role: AccountRole::Admin,
        modified_timestamp: account.modified_timestamp,
        created_timestamp: account.created_timestamp,
    }))
}

pub async fn delete(
    db_thread_pool: web::Data<DbThreadPool>,
    broadcaster: web::Data<Broadcaster>,
    user_access_token: VerifiedToken<Access, FromHeader>,
    query: web::Query<InputAccountId>,
) -> Result<HttpResponse, HttpErrorResponse> {
    let user_id = user_access_token.claims.user_id;
    let account_id = query.account_id;

    verification::verify_can_manage_members(account_id, user_id, &db_thread_pool).await?;

    // The member list must be captured before the delete cascades it away
    let (account, member_ids) = match web::block(move || {
        let account_dao = db::account::Dao::new(&db_thread_pool);

        let account = account_dao.get_joint_account(account_id)?;
        let member_ids = account_dao.get_member_user_ids(account_id)?;
        account_dao.delete_joint_account(account_id)?;

        Ok((account, member_ids))
    })
    .await?
    {
        Ok(a) => a,
        Err(e) => match e {
            DaoError::QueryFailure(diesel::result::Error::NotFound) => {
                return Err(HttpErrorResponse::DoesNotExist(
                    String::from("No account with the given ID"),
                    DoesNotExistType::Account,
                ));
            }
            _ => {
                log::error!("{e}");
                return Err(HttpErrorResponse::InternalError(String::from(
                    "Failed to delete account",
                )));
            }
        },
    };

    broadcaster.account_deleted(user_id, account, member_ids);

    Ok(HttpResponse::Ok().finish())
}

pub async fn get_members(
    db_thread_pool: web::Data<DbThreadPool>,
    user_access_token: VerifiedToken<Access, FromHeader>,
    query: web::Query<InputAccountId>,
) -> Result<HttpResponse, HttpErrorResponse> {
    let user_id = user_access_token.claims.user_id;
    let account_id = query.account_id;

    verification::verify_membership(account_id, user_id, &db_thread_pool).await?;

    let members = match web::block(move || {
        let account_dao = db::account::Dao::new(&db_thread_pool);
        account_dao.get_members(account_id)
    })
    .await?
    {
        Ok(m) => m,
        Err(e) => {
            log::error!("{e}");
            return Err(HttpErrorResponse::InternalError(String::from(
                "Failed to get account members",
            )));
        }
    };

    let mut output = Vec::with_capacity(members.len());

    for (member, name, email) in members {
        let role = match AccountRole::try_from(member.role) {
            Ok(r) => r,
            Err(e) => {
                log::error!("{e}");
                return Err(HttpErrorResponse::InternalError(String::from(
                    "Failed to get account members",
                )));
            }
        };

        output.push(OutputMember {
            user_id: member.user_id,
            name,
            email,
            role,
            joined_timestamp: member.joined_timestamp,
        });
    }

    Ok(HttpResponse::Ok().json(output))
}

pub async fn edit_member_role(
    db_thread_pool: web::Data<DbThreadPool>,
    broadcaster: web::Data<Broadcaster>,
    user_access_token: VerifiedToken<Access, FromHeader>,
    role_data: web::Json<InputMemberRole>,
) -> Result<HttpResponse, HttpErrorResponse> {
    let user_id = user_access_token.claims.user_id;
    let account_id = role_data.account_id;
    let target_user_id = role_data.user_id;
    let new_role = role_data.role;

    verification::verify_can_manage_members(account_id, user_id, &db_thread_pool).await?;

    match web::block(move || {
        let account_dao = db::account::Dao::new(&db_thread_pool);
        account_dao.set_member_role(account_id, target_user_id, new_role)
    })
    .await?
    {
        Ok(_) => (),
        Err(e) => match e {
            DaoError::InvalidState(msg) => {
                return Err(HttpErrorResponse::InvalidState(String::from(msg)));
            }
            DaoError::QueryFailure(diesel::result::Error::NotFound) => {
                return Err(HttpErrorResponse::DoesNotExist(
                    String::from("No member with the given user ID in this account"),
                    DoesNotExistType::User,
                ));
            }
            _ => {
                log::error!("{e}");
                return Err(HttpErrorResponse::InternalError(String::from(
                    "Failed to change member role",
                )));
            }
        },
    }

    broadcaster.member_role_changed(user_id, account_id, target_user_id, new_role);

    Ok(HttpResponse::Ok().finish())
}

pub async fn remove_member(
    db_thread_pool: web::Data<DbThreadPool>,
    broadcaster: web::Data<Broadcaster>,
    user_access_token: VerifiedToken<Access, FromHeader>,
    query: web::Query<InputMemberId>,
) -> Result<HttpResponse, HttpErrorResponse> {
    let user_id = user_access_token.claims.user_id;
    let account_id = query.account_id;
    let target_user_id = query.user_id;

    verification::verify_can_manage_members(account_id, user_id, &db_thread_pool).await?;

    match web::block(move || {
        let account_dao = db::account::Dao::new(&db_thread_pool);
        account_dao.remove_member(account_id, target_user_id)
    })
    .await?
    {
        Ok(_) => (),
        Err(e) => match e {
            DaoError::InvalidState(msg) => {
                return Err(HttpErrorResponse::InvalidState(String::from(msg)));
            }
            DaoError::QueryFailure(diesel::result::Error::NotFound) => {
                return Err(HttpErrorResponse::DoesNotExist(
                    String::from("No member with the given user ID in this account"),
                    DoesNotExistType::User,
                ));
            }
            _ => {
                log::error!("{e}");
                return Err(HttpErrorResponse::InternalError(String::from(
                    "Failed to remove member",
                )));
            }
        },
    }

    broadcaster.member_removed(user_id, account_id, target_user_id);

    Ok(HttpResponse::Ok().finish())
}

pub async fn leave(
    db_thread_pool: web::Data<DbThreadPool>,
    broadcaster: web::Data<Broadcaster>,
    user_access_token: VerifiedToken<Access, FromHeader>,
    query: web::Query<InputAccountId>,
) -> Result<HttpResponse, HttpErrorResponse> {
    let user_id = user_access_token.claims.user_id;
    let account_id = query.account_id;

    verification::verify_membership(account_id, user_id, &db_thread_pool).await?;

    match web::block(move || {
        let account_dao = db::account::Dao::new(&db_thread_pool);
        account_dao.leave_account(account_id, user_id)
    })
    .await?
    {
        Ok(_) => (),
        Err(e) => match e {
            DaoError::InvalidState(msg) => {
                return Err(HttpErrorResponse::InvalidState(String::from(msg)));
            }
            DaoError::QueryFailure(diesel::result::Error::NotFound) => {
                return Err(HttpErrorResponse::DoesNotExist(
                    String::from("No account with the given ID"),
                    DoesNotExistType::Account,
                ));
            }
            _ => {
                log::error!("{e}");
                return Err(HttpErrorResponse::InternalError(String::from(
                    "Failed to leave account",
                )));
            }
        },
    }

    broadcaster.member_left(account_id, user_id);

    Ok(HttpResponse::Ok().finish())
}

pub async fn create_invitation(
    db_thread_pool: web::Data<DbThreadPool>,
    smtp_thread_pool: web::Data<Arc<EmailSender>>,
    broadcaster: web::Data<Broadcaster>,
    user_access_token: VerifiedToken<Access, FromHeader>,
    invitation_data: web::Json<InputNewInvitation>,
) -> Result<HttpResponse, HttpErrorResponse> {
    if let Validity::Invalid(msg) = invitation_data.validate_email_address() {
        return Err(HttpErrorResponse::IncorrectlyFormed(msg));
    }

    let user_id = user_access_token.claims.user_id;
    let account_id = invitation_data.account_id;

    verification::verify_can_manage_members(account_id, user_id, &db_thread_pool).await?;

    let (invitation, account_name, inviter_name) = match web::block(move || {
        let account_dao = db::account::Dao::new(&db_thread_pool);
        let user_dao = db::user::Dao::new(&db_thread_pool);

        let invitation = account_dao.create_invitation(
            account_id,
            &invitation_data.recipient_email,
            user_id,
            env::CONF.invite_lifetime,
        )?;
        let account = account_dao.get_joint_account(account_id)?;
        let inviter = user_dao.get_user_by_id(user_id)?;

        Ok((invitation, account.name, inviter.name))
    })
    .await?
    {
        Ok(i) => i,
        Err(e) => match e {
            DaoError::ConflictWithExisting(msg) => {
                return Err(HttpErrorResponse::ConflictWithExisting(String::from(msg)));
            }
            DaoError::QueryFailure(diesel::result::Error::NotFound) => {
                return Err(HttpErrorResponse::DoesNotExist(
                    String::from("No account with the given ID"),
                    DoesNotExistType::Account,
                ));
            }
            _ => {
                log::error!("{e}");
                return Err(HttpErrorResponse::InternalError(String::from(
                    "Failed to create invitation",
                )));
            }
        },
    };

    let email_message = EmailMessage {
        body: InviteMessage::generate(
            &inviter_name,
            &account_name,
            &env::CONF.invite_accept_url,
            invitation.id,
            env::CONF.invite_lifetime,
        ),
        subject: INVITE_EMAIL_SUBJECT,
        from: env::CONF.email_from_address.clone(),
        reply_to: env::CONF.email_reply_to_address.clone(),
        destination: &invitation.invited_email,
        is_html: true,
    };

    // The invite row is already committed; email delivery is best-effort
    if let Err(e) = smtp_thread_pool.send(email_message).await {
        log::error!(
            "Failed to send invitation email for invitation {}: {e}",
            invitation.id
        );
    }

    broadcaster.invitation_sent(invitation.clone());

    Ok(HttpResponse::Created().json(invitation))
}

pub async fn accept_invitation(
    db_thread_pool: web::Data<DbThreadPool>,
    broadcaster: web::Data<Broadcaster>,
    user_access_token: VerifiedToken<Access, FromHeader>,
    query: web::Query<InputInvitationId>,
) -> Result<HttpResponse, HttpErrorResponse> {
    let claims = user_access_token.claims;
    let user_id = claims.user_id;
    let invitation_id = query.invitation_id;

    let invitation = match web::block(move || {
        let account_dao = db::account::Dao::new(&db_thread_pool);
        account_dao.accept_invitation(invitation_id, &claims.user_email, claims.user_id)
    })
    .await?
    {
        Ok(i) => i,
        Err(e) => match e {
            DaoError::QueryFailure(diesel::result::Error::NotFound) => {
                return Err(HttpErrorResponse::DoesNotExist(
                    String::from("No invitation with the given ID"),
                    DoesNotExistType::Invitation,
                ));
            }
            DaoError::QueryFailure(diesel::result::Error::DatabaseError(
                diesel::result::DatabaseErrorKind::ForeignKeyViolation,
                _,
            )) => {
                return Err(HttpErrorResponse::InvalidState(String::from(
                    "A user profile is required to accept an invitation.",
                )));
            }
            DaoError::Disallowed(msg) => {
                return Err(HttpErrorResponse::UserDisallowed(String::from(msg)));
            }
            DaoError::InvalidState(msg) => {
                return Err(HttpErrorResponse::InvalidState(String::from(msg)));
            }
            DaoError::OutOfDate(msg) => {
                return Err(HttpErrorResponse::OutOfDate(String::from(msg)));
            }
            DaoError::ConflictWithExisting(msg) => {
                return Err(HttpErrorResponse::ConflictWithExisting(String::from(msg)));
            }
            _ => {
                log::error!("{e}");
                return Err(HttpErrorResponse::InternalError(String::from(
                    "Failed to accept invitation",
                )));
            }
        },
    };

    broadcaster.invitation_responded(user_id, invitation.clone());

    Ok(HttpResponse::Ok().json(invitation))
}

pub async fn decline_invitation(
    db_thread_pool: web::Data<DbThreadPool>,
    broadcaster: web::Data<Broadcaster>,
    user_access_token: VerifiedToken<Access, FromHeader>,
    query: web::Query<InputInvitationId>,
) -> Result<HttpResponse, HttpErrorResponse> {
    let claims = user_access_token.claims;
    let user_id = claims.user_id;
    let invitation_id = query.invitation_id;

    let invitation = match web::block(move || {
        let account_dao = db::account::Dao::new(&db_thread_pool);
        account_dao.decline_invitation(invitation_id, &claims.user_email)
    })
    .await?
    {
        Ok(i) => i,
        Err(e) => match e {
            DaoError::QueryFailure(diesel::result::Error::NotFound) => {
                return Err(HttpErrorResponse::DoesNotExist(
                    String::from("No invitation with the given ID"),
                    DoesNotExistType::Invitation,
                ));
            }
            DaoError::Disallowed(msg) => {
                return Err(HttpErrorResponse::UserDisallowed(String::from(msg)));
            }
            DaoError::InvalidState(msg) => {
                return Err(HttpErrorResponse::InvalidState(String::from(msg)));
            }
            DaoError::OutOfDate(msg) => {
                return Err(HttpErrorResponse::OutOfDate(String::from(msg)));
            }
            _ => {
                log::error!("{e}");
                return Err(HttpErrorResponse::InternalError(String::from(
                    "Failed to decline invitation",
                )));
            }
        },
    };

    broadcaster.invitation_responded(user_id, invitation.clone());

    Ok(HttpResponse::Ok().json(invitation))
}

pub async fn get_all_pending_invitations(
    db_thread_pool: web::Data<DbThreadPool>,
    user_access_token: VerifiedToken<Access, FromHeader>,
) -> Result<HttpResponse, HttpErrorResponse> {
    let user_email = user_access_token.claims.user_email;

    let invitations = match web::block(move || {
        let account_dao = db::account::Dao::new(&db_thread_pool);
        account_dao.get_pending_invitations_for_email(&user_email)
    })
    .await?
    {
        Ok(i) => i,
        Err(e) => {
            log::error!("{e}");
            return Err(HttpErrorResponse::InternalError(String::from(
                "Failed to get invitations",
            )));
        }
    };

    Ok(HttpResponse::Ok().json(invitations))
}

pub async fn get_invitations_for_account(
    db_thread_pool: web::Data<DbThreadPool>,
    user_access_token: VerifiedToken<Access, FromHeader>,
    query: web::Query<InputAccountId>,
) -> Result<HttpResponse, HttpErrorResponse> {
    let user_id = user_access_token.claims.user_id;
    let account_id = query.account_id;

    verification::verify_membership(account_id, user_id, &db_thread_pool).await?;

    let invitations = match web::block(move || {
        let account_dao = db::account::Dao::new(&db_thread_pool);
        account_dao.get_pending_invitations_for_account(account_id)
    })
    .await?
    {
        Ok(i) => i,
        Err(e) => {
            log::error!("{e}");
            return Err(HttpErrorResponse::InternalError(String::from(
                "Failed to get invitations",
            )));
        }
    };

    Ok(HttpResponse::Ok().json(invitations))
}

#[cfg(test)]
mod tests {
    use tally_common::db;
    use tally_common::models::joint_account_invite::{InviteStatus, JointAccountInvite};
    use tally_common::models::joint_account_member::AccountRole;
    use tally_common::request_io::inputs::{
        InputEditJointAccount, InputMemberRole, InputNewInvitation,
    };
    use tally_common::request_io::outputs::{OutputInvitation, OutputJointAccount, OutputMember};
    use tally_common::threadrand::SecureRng;

    use actix_web::body::to_bytes;
    use actix_web::http::StatusCode;
    use actix_web::test::{self, TestRequest};
    use actix_web::web::Data;
    use actix_web::App;
    use std::time::Duration;
    use uuid::Uuid;

    use crate::env;
    use crate::handlers::test_utils::{self, gen_access_token};

    #[actix_web::test]
    async fn test_create_and_get_account() {
        let app = test::init_service(
            App::new()
                .app_data(Data::new(env::testing::DB_THREAD_POOL.clone()))
                .app_data(Data::new(env::testing::SMTP_THREAD_POOL.clone()))
                .app_data(Data::new(env::testing::BROADCASTER.clone()))
                .app_data(Data::new(env::testing::ROOM_REGISTRY.clone()))
                .configure(crate::services::api::configure),
        )
        .await;

        let (admin, admin_token) = test_utils::create_user().await;
        let account = test_utils::create_account(&admin_token).await;

        assert_eq!(account.admin_user_id, admin.id);

        let req = TestRequest::get()
            .uri(&format!("/api/account?account_id={}", account.id))
            .insert_header(("AccessToken", admin_token.as_str()))
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::OK);

        let resp_body = to_bytes(resp.into_body()).await.unwrap();
        let fetched: OutputJointAccount = serde_json::from_slice(&resp_body).unwrap();

        assert_eq!(fetched.id, account.id);
        assert_eq!(fetched.role, AccountRole::Admin);

        // A non-member gets a membership rejection, not the account
        let (_, outsider_token) = test_utils::create_user().await;

        let req = TestRequest::get()
            .uri(&format!("/api/account?account_id={}", account.id))
            .insert_header(("AccessToken", outsider_token.as_str()))
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::FORBIDDEN);

        let resp_body = to_bytes(resp.into_body()).await.unwrap();
        let err: serde_json::Value = serde_json::from_slice(&resp_body).unwrap();
        assert_eq!(err["err_type"], 9);
    }

    #[actix_web::test]
    async fn test_get_all_accounts() {
        let app = test::init_service(
            App::new()
                .app_data(Data::new(env::testing::DB_THREAD_POOL.clone()))
                .app_data(Data::new(env::testing::SMTP_THREAD_POOL.clone()))
                .app_data(Data::new(env::testing::BROADCASTER.clone()))
                .app_data(Data::new(env::testing::ROOM_REGISTRY.clone()))
                .configure(crate::services::api::configure),
        )
        .await;

        let (_, user_token) = test_utils::create_user().await;
        let own_account = test_utils::create_account(&user_token).await;

        let (_, other_admin_token) = test_utils::create_user().await;
        let other_account = test_utils::create_account(&other_admin_token).await;

        // Join the other account through the invitation workflow
        let req = TestRequest::get()
            .uri("/api/user")
            .insert_header(("AccessToken", user_token.as_str()))
            .to_request();
        let resp = test::call_service(&app, req).await;
        let resp_body = to_bytes(resp.into_body()).await.unwrap();
        let user: tally_common::models::user::User =
            serde_json::from_slice(&resp_body).unwrap();

        let invitation = InputNewInvitation {
            account_id: other_account.id,
            recipient_email: user.email.clone(),
        };

        let req = TestRequest::post()
            .uri("/api/account/invitation")
            .insert_header(("AccessToken", other_admin_token.as_str()))
            .set_json(&invitation)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);

        let resp_body = to_bytes(resp.into_body()).await.unwrap();
        let invitation: JointAccountInvite = serde_json::from_slice(&resp_body).unwrap();

        let req = TestRequest::put()
            .uri(&format!(
                "/api/account/invitation/accept?invitation_id={}",
                invitation.id
            ))
            .insert_header(("AccessToken", user_token.as_str()))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let req = TestRequest::get()
            .uri("/api/account/all")
            .insert_header(("AccessToken", user_token.as_str()))
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::OK);

        let resp_body = to_bytes(resp.into_body()).await.unwrap();
        let accounts: Vec<OutputJointAccount> = serde_json::from_slice(&resp_body).unwrap();

        assert_eq!(accounts.len(), 2);

        let own = accounts.iter().find(|a| a.id == own_account.id).unwrap();
        assert_eq!(own.role, AccountRole::Admin);

        let joined = accounts.iter().find(|a| a.id == other_account.id).unwrap();
        assert_eq!(joined.role, AccountRole::Editor);
    }

    #[actix_web::test]
    async fn test_edit_account_distinguishes_roles() {
        let app = test::init_service(
            App::new()
                .app_data(Data::new(env::testing::DB_THREAD_POOL.clone()))
                .app_data(Data::new(env::testing::SMTP_THREAD_POOL.clone()))
                .app_data(Data::new(env::testing::BROADCASTER.clone()))
                .app_data(Data::new(env::testing::ROOM_REGISTRY.clone()))
                .configure(crate::services::api::configure),
        )
        .await;

        let (_, admin_token) = test_utils::create_user().await;
        let account = test_utils::create_account(&admin_token).await;

        let (_, editor_token) =
            test_utils::add_member(account.id, &admin_token, AccountRole::Editor).await;
        let (_, outsider_token) = test_utils::create_user().await;

        let edit = InputEditJointAccount {
            account_id: account.id,
            name: String::from("Household"),
            primary_currency: String::from("EUR"),
        };

        // An editor can change finances but not the account itself
        let req = TestRequest::put()
            .uri("/api/account")
            .insert_header(("AccessToken", editor_token.as_str()))
            .set_json(&edit)
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::FORBIDDEN);

        let resp_body = to_bytes(resp.into_body()).await.unwrap();
        let err: serde_json::Value = serde_json::from_slice(&resp_body).unwrap();
        assert_eq!(err["err_type"], 10);

        let req = TestRequest::put()
            .uri("/api/account")
            .insert_header(("AccessToken", outsider_token.as_str()))
            .set_json(&edit)
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::FORBIDDEN);

        let resp_body = to_bytes(resp.into_body()).await.unwrap();
        let err: serde_json::Value = serde_json::from_slice(&resp_body).unwrap();
        assert_eq!(err["err_type"], 9);

        let req = TestRequest::put()
            .uri("/api/account")
            .insert_header(("AccessToken", admin_token.as_str()))
            .set_json(&edit)
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::OK);

        let account_dao = db::account::Dao::new(&env::testing::DB_THREAD_POOL);
        let saved = account_dao.get_joint_account(account.id).unwrap();

        assert_eq!(saved.name, "Household");
        assert_eq!(saved.primary_currency, "EUR");
    }

    #[actix_web::test]
    async fn test_delete_account_requires_admin() {
        let app = test::init_service(
            App::new()
                .app_data(Data::new(env::testing::DB_THREAD_POOL.clone()))
                .app_data(Data::new(env::testing::SMTP_THREAD_POOL.clone()))
                .app_data(Data::new(env::testing::BROADCASTER.clone()))
                .app_data(Data::new(env::testing::ROOM_REGISTRY.clone()))
                .configure(crate::services::api::configure),
        )
        .await;

        let (_, admin_token) = test_utils::create_user().await;
        let account = test_utils::create_account(&admin_token).await;

        let (_, editor_token) =
            test_utils::add_member(account.id, &admin_token, AccountRole::Editor).await;

        let req = TestRequest::delete()
            .uri(&format!("/api/account?account_id={}", account.id))
            .insert_header(("AccessToken", editor_token.as_str()))
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::FORBIDDEN);

        let req = TestRequest::delete()
            .uri(&format!("/api/account?account_id={}", account.id))
            .insert_header(("AccessToken", admin_token.as_str()))
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::OK);

        // Memberships cascade with the account row
        let req = TestRequest::get()
            .uri("/api/account/all")
            .insert_header(("AccessToken", admin_token.as_str()))
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::OK);

        let resp_body = to_bytes(resp.into_body()).await.unwrap();
        let accounts: Vec<OutputJointAccount> = serde_json::from_slice(&resp_body).unwrap();
        assert!(accounts.is_empty());
    }

    #[actix_web::test]
    async fn test_member_role_rules() {
        let app = test::init_service(
            App::new()
                .app_data(Data::new(env::testing::DB_THREAD_POOL.clone()))
                .app_data(Data::new(env::testing::SMTP_THREAD_POOL.clone()))
                .app_data(Data::new(env::testing::BROADCASTER.clone()))
                .app_data(Data::new(env::testing::ROOM_REGISTRY.clone()))
                .configure(crate::services::api::configure),
        )
        .await;

        let (admin, admin_token) = test_utils::create_user().await;
        let account = test_utils::create_account(&admin_token).await;

        let (member, member_token) =
            test_utils::add_member(account.id, &admin_token, AccountRole::Viewer).await;

        // Admin promotes the viewer to editor
        let promote = InputMemberRole {
            account_id: account.id,
            user_id: member.id,
            role: AccountRole::Editor,
        };

        let req = TestRequest::put()
            .uri("/api/account/member/role")
            .insert_header(("AccessToken", admin_token.as_str()))
            .set_json(&promote)
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::OK);

        let account_dao = db::account::Dao::new(&env::testing::DB_THREAD_POOL);
        let membership = account_dao
            .get_membership(account.id, member.id)
            .unwrap()
            .unwrap();
        assert_eq!(membership.role, i16::from(AccountRole::Editor));

        // The admin's own role can never be changed
        let demote_admin = InputMemberRole {
            account_id: account.id,
            user_id: admin.id,
            role: AccountRole::Viewer,
        };

        let req = TestRequest::put()
            .uri("/api/account/member/role")
            .insert_header(("AccessToken", admin_token.as_str()))
            .set_json(&demote_admin)
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let resp_body = to_bytes(resp.into_body()).await.unwrap();
        let err: serde_json::Value = serde_json::from_slice(&resp_body).unwrap();
        assert_eq!(err["err_type"], 3);

        // The admin role can never be handed out
        let assign_admin = InputMemberRole {
            account_id: account.id,
            user_id: member.id,
            role: AccountRole::Admin,
        };

        let req = TestRequest::put()
            .uri("/api/account/member/role")
            .insert_header(("AccessToken", admin_token.as_str()))
            .set_json(&assign_admin)
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        // Non-admins cannot touch roles at all
        let self_promote = InputMemberRole {
            account_id: account.id,
            user_id: member.id,
            role: AccountRole::Editor,
        };

        let req = TestRequest::put()
            .uri("/api/account/member/role")
            .insert_header(("AccessToken", member_token.as_str()))
            .set_json(&self_promote)
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::FORBIDDEN);

        // An ID that is not a member of the account is a 404
        let missing = InputMemberRole {
            account_id: account.id,
            user_id: Uuid::now_v7(),
            role: AccountRole::Editor,
        };

        let req = TestRequest::put()
            .uri("/api/account/member/role")
            .insert_header(("AccessToken", admin_token.as_str()))
            .set_json(&missing)
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn test_remove_member_rules() {
        let app = test::init_service(
            App::new()
                .app_data(Data::new(env::testing::DB_THREAD_POOL.clone()))
                .app_data(Data::new(env::testing::SMTP_THREAD_POOL.clone()))
                .app_data(Data::new(env::testing::BROADCASTER.clone()))
                .app_data(Data::new(env::testing::ROOM_REGISTRY.clone()))
                .configure(crate::services::api::configure),
        )
        .await;

        let (admin, admin_token) = test_utils::create_user().await;
        let account = test_utils::create_account(&admin_token).await;

        let (member, member_token) =
            test_utils::add_member(account.id, &admin_token, AccountRole::Editor).await;

        // Members cannot remove anyone
        let req = TestRequest::delete()
            .uri(&format!(
                "/api/account/member?account_id={}&user_id={}",
                account.id, admin.id
            ))
            .insert_header(("AccessToken", member_token.as_str()))
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::FORBIDDEN);

        // The admin cannot be removed, even by themselves
        let req = TestRequest::delete()
            .uri(&format!(
                "/api/account/member?account_id={}&user_id={}",
                account.id, admin.id
            ))
            .insert_header(("AccessToken", admin_token.as_str()))
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let req = TestRequest::delete()
            .uri(&format!(
                "/api/account/member?account_id={}&user_id={}",
                account.id, member.id
            ))
            .insert_header(("AccessToken", admin_token.as_str()))
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::OK);

        let account_dao = db::account::Dao::new(&env::testing::DB_THREAD_POOL);
        assert!(account_dao
            .get_membership(account.id, member.id)
            .unwrap()
            .is_none());
    }

    #[actix_web::test]
    async fn test_leave_account() {
        let app = test::init_service(
            App::new()
                .app_data(Data::new(env::testing::DB_THREAD_POOL.clone()))
                .app_data(Data::new(env::testing::SMTP_THREAD_POOL.clone()))
                .app_data(Data::new(env::testing::BROADCASTER.clone()))
                .app_data(Data::new(env::testing::ROOM_REGISTRY.clone()))
                .configure(crate::services::api::configure),
        )
        .await;

        let (_, admin_token) = test_utils::create_user().await;
        let account = test_utils::create_account(&admin_token).await;

        let (member, member_token) =
            test_utils::add_member(account.id, &admin_token, AccountRole::Editor).await;

        // A non-member cannot leave
        let (_, outsider_token) = test_utils::create_user().await;

        let req = TestRequest::delete()
            .uri(&format!("/api/account/leave?account_id={}", account.id))
            .insert_header(("AccessToken", outsider_token.as_str()))
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::FORBIDDEN);

        // The admin's exit path is deleting the account, not leaving it
        let req = TestRequest::delete()
            .uri(&format!("/api/account/leave?account_id={}", account.id))
            .insert_header(("AccessToken", admin_token.as_str()))
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let resp_body = to_bytes(resp.into_body()).await.unwrap();
        let err: serde_json::Value = serde_json::from_slice(&resp_body).unwrap();
        assert_eq!(err["err_type"], 3);
        assert!(err["err_message"]
            .as_str()
            .unwrap()
            .contains("Admin cannot leave their own account."));

        let req = TestRequest::delete()
            .uri(&format!("/api/account/leave?account_id={}", account.id))
            .insert_header(("AccessToken", member_token.as_str()))
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::OK);

        let account_dao = db::account::Dao::new(&env::testing::DB_THREAD_POOL);
        assert!(account_dao
            .get_membership(account.id, member.id)
            .unwrap()
            .is_none());
    }

    #[actix_web::test]
    async fn test_invitation_accept_flow() {
        let app = test::init_service(
            App::new()
                .app_data(Data::new(env::testing::DB_THREAD_POOL.clone()))
                .app_data(Data::new(env::testing::SMTP_THREAD_POOL.clone()))
                .app_data(Data::new(env::testing::BROADCASTER.clone()))
                .app_data(Data::new(env::testing::ROOM_REGISTRY.clone()))
                .configure(crate::services::api::configure),
        )
        .await;

        let (_, admin_token) = test_utils::create_user().await;
        let account = test_utils::create_account(&admin_token).await;

        let (invitee, invitee_token) = test_utils::create_user().await;

        let invitation = InputNewInvitation {
            account_id: account.id,
            recipient_email: invitee.email.to_uppercase(),
        };

        let req = TestRequest::post()
            .uri("/api/account/invitation")
            .insert_header(("AccessToken", admin_token.as_str()))
            .set_json(&invitation)
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::CREATED);

        let resp_body = to_bytes(resp.into_body()).await.unwrap();
        let created: JointAccountInvite = serde_json::from_slice(&resp_body).unwrap();

        // Stored lowercased no matter how it was typed
        assert_eq!(created.invited_email, invitee.email.to_lowercase());
        assert_eq!(created.status, i16::from(InviteStatus::Pending));

        let req = TestRequest::put()
            .uri(&format!(
                "/api/account/invitation/accept?invitation_id={}",
                created.id
            ))
            .insert_header(("AccessToken", invitee_token.as_str()))
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::OK);

        let resp_body = to_bytes(resp.into_body()).await.unwrap();
        let accepted: JointAccountInvite = serde_json::from_slice(&resp_body).unwrap();
        assert_eq!(accepted.status, i16::from(InviteStatus::Accepted));

        // Accepting creates the membership with the editor role
        let account_dao = db::account::Dao::new(&env::testing::DB_THREAD_POOL);
        let membership = account_dao
            .get_membership(account.id, invitee.id)
            .unwrap()
            .unwrap();
        assert_eq!(membership.role, i16::from(AccountRole::Editor));

        let req = TestRequest::get()
            .uri(&format!("/api/account/members?account_id={}", account.id))
            .insert_header(("AccessToken", invitee_token.as_str()))
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::OK);

        let resp_body = to_bytes(resp.into_body()).await.unwrap();
        let members: Vec<OutputMember> = serde_json::from_slice(&resp_body).unwrap();
        assert_eq!(members.len(), 2);

        // A resolved invitation cannot be responded to again
        let req = TestRequest::put()
            .uri(&format!(
                "/api/account/invitation/accept?invitation_id={}",
                created.id
            ))
            .insert_header(("AccessToken", invitee_token.as_str()))
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let resp_body = to_bytes(resp.into_body()).await.unwrap();
        let err: serde_json::Value = serde_json::from_slice(&resp_body).unwrap();
        assert!(err["err_message"]
            .as_str()
            .unwrap()
            .contains("already been responded to."));

        // Inviting a user who is now a member is a conflict
        let invitation = InputNewInvitation {
            account_id: account.id,
            recipient_email: invitee.email.clone(),
        };

        let req = TestRequest::post()
            .uri("/api/account/invitation")
            .insert_header(("AccessToken", admin_token.as_str()))
            .set_json(&invitation)
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let resp_body = to_bytes(resp.into_body()).await.unwrap();
        let err: serde_json::Value = serde_json::from_slice(&resp_body).unwrap();
        assert_eq!(err["err_type"], 4);
        assert!(err["err_message"]
            .as_str()
            .unwrap()
            .contains("already a member"));
    }

    #[actix_web::test]
    async fn test_invitation_decline_flow() {
        let app = test::init_service(
            App::new()
                .app_data(Data::new(env::testing::DB_THREAD_POOL.clone()))
                .app_data(Data::new(env::testing::SMTP_THREAD_POOL.clone()))
                .app_data(Data::new(env::testing::BROADCASTER.clone()))
                .app_data(Data::new(env::testing::ROOM_REGISTRY.clone()))
                .configure(crate::services::api::configure),
        )
        .await;

        let (_, admin_token) = test_utils::create_user().await;
        let account = test_utils::create_account(&admin_token).await;

        let (invitee, invitee_token) = test_utils::create_user().await;

        let invitation = InputNewInvitation {
            account_id: account.id,
            recipient_email: invitee.email.clone(),
        };

        let req = TestRequest::post()
            .uri("/api/account/invitation")
            .insert_header(("AccessToken", admin_token.as_str()))
            .set_json(&invitation)
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::CREATED);

        let resp_body = to_bytes(resp.into_body()).await.unwrap();
        let created: JointAccountInvite = serde_json::from_slice(&resp_body).unwrap();

        let req = TestRequest::put()
            .uri(&format!(
                "/api/account/invitation/decline?invitation_id={}",
                created.id
            ))
            .insert_header(("AccessToken", invitee_token.as_str()))
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::OK);

        let resp_body = to_bytes(resp.into_body()).await.unwrap();
        let declined: JointAccountInvite = serde_json::from_slice(&resp_body).unwrap();
        assert_eq!(declined.status, i16::from(InviteStatus::Declined));

        // Declining never creates a membership
        let account_dao = db::account::Dao::new(&env::testing::DB_THREAD_POOL);
        assert!(account_dao
            .get_membership(account.id, invitee.id)
            .unwrap()
            .is_none());

        // Terminal state; a second decline is rejected
        let req = TestRequest::put()
            .uri(&format!(
                "/api/account/invitation/decline?invitation_id={}",
                created.id
            ))
            .insert_header(("AccessToken", invitee_token.as_str()))
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn test_duplicate_pending_invitation_rejected() {
        let app = test::init_service(
            App::new()
                .app_data(Data::new(env::testing::DB_THREAD_POOL.clone()))
                .app_data(Data::new(env::testing::SMTP_THREAD_POOL.clone()))
                .app_data(Data::new(env::testing::BROADCASTER.clone()))
                .app_data(Data::new(env::testing::ROOM_REGISTRY.clone()))
                .configure(crate::services::api::configure),
        )
        .await;

        let (_, admin_token) = test_utils::create_user().await;
        let account = test_utils::create_account(&admin_token).await;

        let recipient_email = format!("invitee{}@test.com", SecureRng::next_u128());

        let invitation = InputNewInvitation {
            account_id: account.id,
            recipient_email: recipient_email.clone(),
        };

        let req = TestRequest::post()
            .uri("/api/account/invitation")
            .insert_header(("AccessToken", admin_token.as_str()))
            .set_json(&invitation)
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::CREATED);

        // Same address, different casing
        let duplicate = InputNewInvitation {
            account_id: account.id,
            recipient_email: recipient_email.to_uppercase(),
        };

        let req = TestRequest::post()
            .uri("/api/account/invitation")
            .insert_header(("AccessToken", admin_token.as_str()))
            .set_json(&duplicate)
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let resp_body = to_bytes(resp.into_body()).await.unwrap();
        let err: serde_json::Value = serde_json::from_slice(&resp_body).unwrap();
        assert_eq!(err["err_type"], 4);
        assert!(err["err_message"]
            .as_str()
            .unwrap()
            .contains("Invitation already pending."));
    }

    #[actix_web::test]
    async fn test_invitation_requires_admin() {
        let app = test::init_service(
            App::new()
                .app_data(Data::new(env::testing::DB_THREAD_POOL.clone()))
                .app_data(Data::new(env::testing::SMTP_THREAD_POOL.clone()))
                .app_data(Data::new(env::testing::BROADCASTER.clone()))
                .app_data(Data::new(env::testing::ROOM_REGISTRY.clone()))
                .configure(crate::services::api::configure),
        )
        .await;

        let (_, admin_token) = test_utils::create_user().await;
        let account = test_utils::create_account(&admin_token).await;

        let (_, editor_token) =
            test_utils::add_member(account.id, &admin_token, AccountRole::Editor).await;

        let invitation = InputNewInvitation {
            account_id: account.id,
            recipient_email: format!("invitee{}@test.com", SecureRng::next_u128()),
        };

        let req = TestRequest::post()
            .uri("/api/account/invitation")
            .insert_header(("AccessToken", editor_token.as_str()))
            .set_json(&invitation)
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::FORBIDDEN);

        let resp_body = to_bytes(resp.into_body()).await.unwrap();
        let err: serde_json::Value = serde_json::from_slice(&resp_body).unwrap();
        assert_eq!(err["err_type"], 10);
    }

    #[actix_web::test]
    async fn test_invitation_wrong_recipient_rejected() {
        let app = test::init_service(
            App::new()
                .app_data(Data::new(env::testing::DB_THREAD_POOL.clone()))
                .app_data(Data::new(env::testing::SMTP_THREAD_POOL.clone()))
                .app_data(Data::new(env::testing::BROADCASTER.clone()))
                .app_data(Data::new(env::testing::ROOM_REGISTRY.clone()))
                .configure(crate::services::api::configure),
        )
        .await;

        let (_, admin_token) = test_utils::create_user().await;
        let account = test_utils::create_account(&admin_token).await;

        let (invitee, _) = test_utils::create_user().await;
        let (_, interloper_token) = test_utils::create_user().await;

        let invitation = InputNewInvitation {
            account_id: account.id,
            recipient_email: invitee.email.clone(),
        };

        let req = TestRequest::post()
            .uri("/api/account/invitation")
            .insert_header(("AccessToken", admin_token.as_str()))
            .set_json(&invitation)
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::CREATED);

        let resp_body = to_bytes(resp.into_body()).await.unwrap();
        let created: JointAccountInvite = serde_json::from_slice(&resp_body).unwrap();

        let req = TestRequest::put()
            .uri(&format!(
                "/api/account/invitation/accept?invitation_id={}",
                created.id
            ))
            .insert_header(("AccessToken", interloper_token.as_str()))
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::FORBIDDEN);

        let resp_body = to_bytes(resp.into_body()).await.unwrap();
        let err: serde_json::Value = serde_json::from_slice(&resp_body).unwrap();
        assert_eq!(err["err_type"], 9);

        // The invitation is still pending for its real recipient
        let account_dao = db::account::Dao::new(&env::testing::DB_THREAD_POOL);
        let stored = account_dao.get_invitation(created.id).unwrap();
        assert_eq!(stored.status, i16::from(InviteStatus::Pending));
    }

    #[actix_web::test]
    async fn test_expired_invitation_rejected() {
        let app = test::init_service(
            App::new()
                .app_data(Data::new(env::testing::DB_THREAD_POOL.clone()))
                .app_data(Data::new(env::testing::SMTP_THREAD_POOL.clone()))
                .app_data(Data::new(env::testing::BROADCASTER.clone()))
                .app_data(Data::new(env::testing::ROOM_REGISTRY.clone()))
                .configure(crate::services::api::configure),
        )
        .await;

        let (admin, admin_token) = test_utils::create_user().await;
        let account = test_utils::create_account(&admin_token).await;

        let (invitee, invitee_token) = test_utils::create_user().await;

        // Invitations created through the API always get the configured
        // lifetime, so an already-expired one has to be planted directly
        let account_dao = db::account::Dao::new(&env::testing::DB_THREAD_POOL);
        let expired = account_dao
            .create_invitation(account.id, &invitee.email, admin.id, Duration::ZERO)
            .unwrap();

        let req = TestRequest::put()
            .uri(&format!(
                "/api/account/invitation/accept?invitation_id={}",
                expired.id
            ))
            .insert_header(("AccessToken", invitee_token.as_str()))
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let resp_body = to_bytes(resp.into_body()).await.unwrap();
        let err: serde_json::Value = serde_json::from_slice(&resp_body).unwrap();
        assert_eq!(err["err_type"], 2);
        assert!(err["err_message"]
            .as_str()
            .unwrap()
            .contains("Invitation has expired."));

        let account_dao = db::account::Dao::new(&env::testing::DB_THREAD_POOL);
        assert!(account_dao
            .get_membership(account.id, invitee.id)
            .unwrap()
            .is_none());
    }

    #[actix_web::test]
    async fn test_pending_invitation_lists() {
        let app = test::init_service(
            App::new()
                .app_data(Data::new(env::testing::DB_THREAD_POOL.clone()))
                .app_data(Data::new(env::testing::SMTP_THREAD_POOL.clone()))
                .app_data(Data::new(env::testing::BROADCASTER.clone()))
                .app_data(Data::new(env::testing::ROOM_REGISTRY.clone()))
                .configure(crate::services::api::configure),
        )
        .await;

        let (admin, admin_token) = test_utils::create_user().await;
        let account = test_utils::create_account(&admin_token).await;

        let (invitee, invitee_token) = test_utils::create_user().await;

        let invitation = InputNewInvitation {
            account_id: account.id,
            recipient_email: invitee.email.clone(),
        };

        let req = TestRequest::post()
            .uri("/api/account/invitation")
            .insert_header(("AccessToken", admin_token.as_str()))
            .set_json(&invitation)
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::CREATED);

        let resp_body = to_bytes(resp.into_body()).await.unwrap();
        let created: JointAccountInvite = serde_json::from_slice(&resp_body).unwrap();

        // The invitee sees it with the account and inviter names resolved
        let req = TestRequest::get()
            .uri("/api/account/invitation/all_pending")
            .insert_header(("AccessToken", invitee_token.as_str()))
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::OK);

        let resp_body = to_bytes(resp.into_body()).await.unwrap();
        let pending: Vec<OutputInvitation> = serde_json::from_slice(&resp_body).unwrap();

        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, created.id);
        assert_eq!(pending[0].account_name, account.name);
        assert_eq!(pending[0].inviter_name, admin.name);

        // Members see the account's pending invitations
        let req = TestRequest::get()
            .uri(&format!(
                "/api/account/invitation/all_for_account?account_id={}",
                account.id
            ))
            .insert_header(("AccessToken", admin_token.as_str()))
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::OK);

        let resp_body = to_bytes(resp.into_body()).await.unwrap();
        let for_account: Vec<OutputInvitation> = serde_json::from_slice(&resp_body).unwrap();
        assert_eq!(for_account.len(), 1);

        // Non-members do not
        let req = TestRequest::get()
            .uri(&format!(
                "/api/account/invitation/all_for_account?account_id={}",
                account.id
            ))
            .insert_header(("AccessToken", invitee_token.as_str()))
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::FORBIDDEN);

        // Accepting clears it from both lists
        let req = TestRequest::put()
            .uri(&format!(
                "/api/account/invitation/accept?invitation_id={}",
                created.id
            ))
            .insert_header(("AccessToken", invitee_token.as_str()))
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::OK);

        let req = TestRequest::get()
            .uri("/api/account/invitation/all_pending")
            .insert_header(("AccessToken", invitee_token.as_str()))
            .to_request();
        let resp = test::call_service(&app, req).await;

        let resp_body = to_bytes(resp.into_body()).await.unwrap();
        let pending: Vec<OutputInvitation> = serde_json::from_slice(&resp_body).unwrap();
        assert!(pending.is_empty());

        let req = TestRequest::get()
            .uri(&format!(
                "/api/account/invitation/all_for_account?account_id={}",
                account.id
            ))
            .insert_header(("AccessToken", admin_token.as_str()))
            .to_request();
        let resp = test::call_service(&app, req).await;

        let resp_body = to_bytes(resp.into_body()).await.unwrap();
        let for_account: Vec<OutputInvitation> = serde_json::from_slice(&resp_body).unwrap();
        assert!(for_account.is_empty());
    }

    #[actix_web::test]
    async fn test_accept_requires_profile() {
        let app = test::init_service(
            App::new()
                .app_data(Data::new(env::testing::DB_THREAD_POOL.clone()))
                .app_data(Data::new(env::testing::SMTP_THREAD_POOL.clone()))
                .app_data(Data::new(env::testing::BROADCASTER.clone()))
                .app_data(Data::new(env::testing::ROOM_REGISTRY.clone()))
                .configure(crate::services::api::configure),
        )
        .await;

        let (_, admin_token) = test_utils::create_user().await;
        let account = test_utils::create_account(&admin_token).await;

        // A verified identity that never created a profile row
        let ghost_email = format!("ghost{}@test.com", SecureRng::next_u128());
        let ghost_token = gen_access_token(Uuid::now_v7(), &ghost_email);

        let invitation = InputNewInvitation {
            account_id: account.id,
            recipient_email: ghost_email.clone(),
        };

        let req = TestRequest::post()
            .uri("/api/account/invitation")
            .insert_header(("AccessToken", admin_token.as_str()))
            .set_json(&invitation)
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::CREATED);

        let resp_body = to_bytes(resp.into_body()).await.unwrap();
        let created: JointAccountInvite = serde_json::from_slice(&resp_body).unwrap();

        let req = TestRequest::put()
            .uri(&format!(
                "/api/account/invitation/accept?invitation_id={}",
                created.id
            ))
            .insert_header(("AccessToken", ghost_token.as_str()))
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }
}
