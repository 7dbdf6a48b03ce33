use tally_common::db::{self, DaoError, DbThreadPool};
use tally_common::request_io::inputs::{InputEditUserPrefs, InputNewUser, InputPushSubscription};
use tally_common::validators::Validity;

use actix_web::{web, HttpResponse};

use crate::handlers::error::{DoesNotExistType, HttpErrorResponse};
use crate::middleware::auth::{Access, VerifiedToken};
use crate::middleware::FromHeader;

/// Provisions the profile row for the identity in the access token. The
/// token, not the request body, is the source of the user's ID and email.
pub async fn create(
    db_thread_pool: web::Data<DbThreadPool>,
    user_access_token: VerifiedToken<Access, FromHeader>,
    user_data: web::Json<InputNewUser>,
) -> Result<HttpResponse, HttpErrorResponse> {
    if let Validity::Invalid(msg) = user_data.validate_currency_code() {
        return Err(HttpErrorResponse::IncorrectlyFormed(msg));
    }

    let claims = user_access_token.claims;

    let user = match web::block(move || {
        let user_dao = db::user::Dao::new(&db_thread_pool);
        user_dao.create_user(
            claims.user_id,
            &claims.user_email,
            &user_data.name,
            &user_data.primary_currency,
        )
    })
    .await?
    {
        Ok(u) => u,
        Err(e) => match e {
            DaoError::QueryFailure(diesel::result::Error::DatabaseError(
                diesel::result::DatabaseErrorKind::UniqueViolation,
                _,
            )) => {
                return Err(HttpErrorResponse::ConflictWithExisting(String::from(
                    "A user with this ID or email already exists.",
                )));
            }
            _ => {
                log::error!("{e}");
                return Err(HttpErrorResponse::InternalError(String::from(
                    "Failed to create user",
                )));
            }
        },
    };

    Ok(HttpResponse::Created().json(user))
}

pub async fn get(
    db_thread_pool: web::Data<DbThreadPool>,
    user_access_token: VerifiedToken<Access, FromHeader>,
) -> Result<HttpResponse, HttpErrorResponse> {
    let user_id = user_access_token.claims.user_id;

    let user = match web::block(move || {
        let user_dao = db::user::Dao::new(&db_thread_pool);
        user_dao.get_user_by_id(user_id)
    })
    .await?
    {
        Ok(u) => u,
        Err(e) => match e {
            DaoError::QueryFailure(diesel::result::Error::NotFound) => {
                return Err(HttpErrorResponse::DoesNotExist(
                    String::from("No user with the given ID"),
                    DoesNotExistType::User,
                ));
            }
            _ => {
                log::error!("{e}");
                return Err(HttpErrorResponse::InternalError(String::from(
                    "Failed to get user",
                )));
            }
        },
    };

    Ok(HttpResponse::Ok().json(user))
}

pub async fn edit_preferences(
    db_thread_pool: web::Data<DbThreadPool>,
    user_access_token: VerifiedToken<Access, FromHeader>,
    prefs_data: web::Json<InputEditUserPrefs>,
) -> Result<HttpResponse, HttpErrorResponse> {
    if let Validity::Invalid(msg) = prefs_data.validate_currency_code() {
        return Err(HttpErrorResponse::IncorrectlyFormed(msg));
    }

    let user_id = user_access_token.claims.user_id;

    let user = match web::block(move || {
        let user_dao = db::user::Dao::new(&db_thread_pool);
        user_dao.update_user_preferences(
            user_id,
            &prefs_data.name,
            &prefs_data.primary_currency,
            prefs_data.notifications_enabled,
        )
    })
    .await?
    {
        Ok(u) => u,
        Err(e) => match e {
            DaoError::QueryFailure(diesel::result::Error::NotFound) => {
                return Err(HttpErrorResponse::DoesNotExist(
                    String::from("No user with the given ID"),
                    DoesNotExistType::User,
                ));
            }
            _ => {
                log::error!("{e}");
                return Err(HttpErrorResponse::InternalError(String::from(
                    "Failed to update user preferences",
                )));
            }
        },
    };

    Ok(HttpResponse::Ok().json(user))
}

pub async fn subscribe_push(
    db_thread_pool: web::Data<DbThreadPool>,
    user_access_token: VerifiedToken<Access, FromHeader>,
    subscription_data: web::Json<InputPushSubscription>,
) -> Result<HttpResponse, HttpErrorResponse> {
    if !subscription_data.endpoint.starts_with("https://") {
        return Err(HttpErrorResponse::IncorrectlyFormed(String::from(
            "Push endpoint must be an HTTPS URL.",
        )));
    }

    let user_id = user_access_token.claims.user_id;

    match web::block(move || {
        let user_dao = db::user::Dao::new(&db_thread_pool);
        user_dao.upsert_push_subscription(
            user_id,
            &subscription_data.endpoint,
            &subscription_data.keys,
        )
    })
    .await?
    {
        Ok(_) => (),
        Err(e) => {
            log::error!("{e}");
            return Err(HttpErrorResponse::InternalError(String::from(
                "Failed to save push subscription",
            )));
        }
    }

    Ok(HttpResponse::Created().finish())
}

pub async fn unsubscribe_push(
    db_thread_pool: web::Data<DbThreadPool>,
    user_access_token: VerifiedToken<Access, FromHeader>,
) -> Result<HttpResponse, HttpErrorResponse> {
    let user_id = user_access_token.claims.user_id;

    match web::block(move || {
        let user_dao = db::user::Dao::new(&db_thread_pool);
        user_dao.delete_push_subscription(user_id)
    })
    .await?
    {
        Ok(_) => (),
        Err(e) => {
            log::error!("{e}");
            return Err(HttpErrorResponse::InternalError(String::from(
                "Failed to delete push subscription",
            )));
        }
    }

    Ok(HttpResponse::Ok().finish())
}

#[cfg(test)]
mod tests {
    use tally_common::db;
    use tally_common::models::user::User;
    use tally_common::request_io::inputs::{
        InputEditUserPrefs, InputNewUser, InputPushSubscription,
    };
    use tally_common::threadrand::SecureRng;

    use actix_web::body::to_bytes;
    use actix_web::http::StatusCode;
    use actix_web::test::{self, TestRequest};
    use actix_web::web::Data;
    use actix_web::App;
    use serde_json::json;
    use uuid::Uuid;

    use crate::env;
    use crate::handlers::test_utils::{self, gen_access_token};

    #[actix_web::test]
    async fn test_create_user() {
        let app = test::init_service(
            App::new()
                .app_data(Data::new(env::testing::DB_THREAD_POOL.clone()))
                .app_data(Data::new(env::testing::SMTP_THREAD_POOL.clone()))
                .app_data(Data::new(env::testing::BROADCASTER.clone()))
                .app_data(Data::new(env::testing::ROOM_REGISTRY.clone()))
                .configure(crate::services::api::configure),
        )
        .await;

        let user_id = Uuid::now_v7();
        let user_email = format!("Upper.Case{}@Test.com", SecureRng::next_u128());
        let access_token = gen_access_token(user_id, &user_email);

        let new_user = InputNewUser {
            name: String::from("Taylor"),
            primary_currency: String::from("USD"),
        };

        let req = TestRequest::post()
            .uri("/api/user")
            .insert_header(("AccessToken", access_token.as_str()))
            .set_json(&new_user)
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::CREATED);

        let resp_body = to_bytes(resp.into_body()).await.unwrap();
        let user: User = serde_json::from_slice(&resp_body).unwrap();

        assert_eq!(user.id, user_id);
        assert_eq!(user.email, user_email.to_lowercase());
        assert_eq!(user.name, "Taylor");
        assert!(user.notifications_enabled);

        // Same identity again should conflict
        let req = TestRequest::post()
            .uri("/api/user")
            .insert_header(("AccessToken", access_token.as_str()))
            .set_json(&new_user)
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let resp_body = to_bytes(resp.into_body()).await.unwrap();
        let err: serde_json::Value = serde_json::from_slice(&resp_body).unwrap();
        assert_eq!(err["err_type"], 4);
    }

    #[actix_web::test]
    async fn test_create_user_rejects_invalid_currency() {
        let app = test::init_service(
            App::new()
                .app_data(Data::new(env::testing::DB_THREAD_POOL.clone()))
                .app_data(Data::new(env::testing::SMTP_THREAD_POOL.clone()))
                .app_data(Data::new(env::testing::BROADCASTER.clone()))
                .app_data(Data::new(env::testing::ROOM_REGISTRY.clone()))
                .configure(crate::services::api::configure),
        )
        .await;

        let user_id = Uuid::now_v7();
        let user_email = format!("test_user{}@test.com", SecureRng::next_u128());
        let access_token = gen_access_token(user_id, &user_email);

        let new_user = InputNewUser {
            name: String::from("Taylor"),
            primary_currency: String::from("usd"),
        };

        let req = TestRequest::post()
            .uri("/api/user")
            .insert_header(("AccessToken", access_token.as_str()))
            .set_json(&new_user)
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let resp_body = to_bytes(resp.into_body()).await.unwrap();
        let err: serde_json::Value = serde_json::from_slice(&resp_body).unwrap();
        assert_eq!(err["err_type"], 0);
    }

    #[actix_web::test]
    async fn test_get_user() {
        let app = test::init_service(
            App::new()
                .app_data(Data::new(env::testing::DB_THREAD_POOL.clone()))
                .app_data(Data::new(env::testing::SMTP_THREAD_POOL.clone()))
                .app_data(Data::new(env::testing::BROADCASTER.clone()))
                .app_data(Data::new(env::testing::ROOM_REGISTRY.clone()))
                .configure(crate::services::api::configure),
        )
        .await;

        let (user, access_token) = test_utils::create_user().await;

        let req = TestRequest::get()
            .uri("/api/user")
            .insert_header(("AccessToken", access_token.as_str()))
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::OK);

        let resp_body = to_bytes(resp.into_body()).await.unwrap();
        let fetched: User = serde_json::from_slice(&resp_body).unwrap();

        assert_eq!(fetched.id, user.id);
        assert_eq!(fetched.email, user.email);

        // No profile row yet for a fresh identity
        let stranger_token = gen_access_token(
            Uuid::now_v7(),
            &format!("test_user{}@test.com", SecureRng::next_u128()),
        );

        let req = TestRequest::get()
            .uri("/api/user")
            .insert_header(("AccessToken", stranger_token.as_str()))
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn test_get_user_fails_without_token() {
        let app = test::init_service(
            App::new()
                .app_data(Data::new(env::testing::DB_THREAD_POOL.clone()))
                .app_data(Data::new(env::testing::SMTP_THREAD_POOL.clone()))
                .app_data(Data::new(env::testing::BROADCASTER.clone()))
                .app_data(Data::new(env::testing::ROOM_REGISTRY.clone()))
                .configure(crate::services::api::configure),
        )
        .await;

        let req = TestRequest::get().uri("/api/user").to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[actix_web::test]
    async fn test_edit_preferences() {
        let app = test::init_service(
            App::new()
                .app_data(Data::new(env::testing::DB_THREAD_POOL.clone()))
                .app_data(Data::new(env::testing::SMTP_THREAD_POOL.clone()))
                .app_data(Data::new(env::testing::BROADCASTER.clone()))
                .app_data(Data::new(env::testing::ROOM_REGISTRY.clone()))
                .configure(crate::services::api::configure),
        )
        .await;

        let (user, access_token) = test_utils::create_user().await;

        let edited_prefs = InputEditUserPrefs {
            name: String::from("Renamed User"),
            primary_currency: String::from("EUR"),
            notifications_enabled: false,
        };

        let req = TestRequest::put()
            .uri("/api/user/preferences")
            .insert_header(("AccessToken", access_token.as_str()))
            .set_json(&edited_prefs)
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::OK);

        let user_dao = db::user::Dao::new(&env::testing::DB_THREAD_POOL);
        let saved = user_dao.get_user_by_id(user.id).unwrap();

        assert_eq!(saved.name, "Renamed User");
        assert_eq!(saved.primary_currency, "EUR");
        assert!(!saved.notifications_enabled);

        let bad_prefs = InputEditUserPrefs {
            name: String::from("Renamed User"),
            primary_currency: String::from("euros"),
            notifications_enabled: true,
        };

        let req = TestRequest::put()
            .uri("/api/user/preferences")
            .insert_header(("AccessToken", access_token.as_str()))
            .set_json(&bad_prefs)
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn test_push_subscription_lifecycle() {
        let app = test::init_service(
            App::new()
                .app_data(Data::new(env::testing::DB_THREAD_POOL.clone()))
                .app_data(Data::new(env::testing::SMTP_THREAD_POOL.clone()))
                .app_data(Data::new(env::testing::BROADCASTER.clone()))
                .app_data(Data::new(env::testing::ROOM_REGISTRY.clone()))
                .configure(crate::services::api::configure),
        )
        .await;

        let (user, access_token) = test_utils::create_user().await;

        let subscription = InputPushSubscription {
            endpoint: String::from("https://push.example.com/send/abc123"),
            keys: json!({"p256dh": "BKeyMaterial", "auth": "AuthSecret"}),
        };

        let req = TestRequest::post()
            .uri("/api/user/push_subscription")
            .insert_header(("AccessToken", access_token.as_str()))
            .set_json(&subscription)
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::CREATED);

        let user_dao = db::user::Dao::new(&env::testing::DB_THREAD_POOL);
        let saved = user_dao.get_push_subscriptions(&[user.id]).unwrap();

        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0].endpoint, "https://push.example.com/send/abc123");

        // Re-subscribing from a new endpoint replaces the old one
        let replacement = InputPushSubscription {
            endpoint: String::from("https://push.example.com/send/def456"),
            keys: json!({"p256dh": "BKeyMaterial2", "auth": "AuthSecret2"}),
        };

        let req = TestRequest::post()
            .uri("/api/user/push_subscription")
            .insert_header(("AccessToken", access_token.as_str()))
            .set_json(&replacement)
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::CREATED);

        let saved = user_dao.get_push_subscriptions(&[user.id]).unwrap();

        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0].endpoint, "https://push.example.com/send/def456");

        let req = TestRequest::delete()
            .uri("/api/user/push_subscription")
            .insert_header(("AccessToken", access_token.as_str()))
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::OK);

        assert!(user_dao.get_push_subscriptions(&[user.id]).unwrap().is_empty());
    }

    #[actix_web::test]
    async fn test_push_subscription_rejects_non_https_endpoint() {
        let app = test::init_service(
            App::new()
                .app_data(Data::new(env::testing::DB_THREAD_POOL.clone()))
                .app_data(Data::new(env::testing::SMTP_THREAD_POOL.clone()))
                .app_data(Data::new(env::testing::BROADCASTER.clone()))
                .app_data(Data::new(env::testing::ROOM_REGISTRY.clone()))
                .configure(crate::services::api::configure),
        )
        .await;

        let (_, access_token) = test_utils::create_user().await;

        let subscription = InputPushSubscription {
            endpoint: String::from("http://push.example.com/send/abc123"),
            keys: json!({"p256dh": "BKeyMaterial", "auth": "AuthSecret"}),
        };

        let req = TestRequest::post()
            .uri("/api/user/push_subscription")
            .insert_header(("AccessToken", access_token.as_str()))
            .set_json(&subscription)
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }
}
