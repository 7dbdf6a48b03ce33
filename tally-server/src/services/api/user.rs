use actix_web::web::*;

use crate::handlers::user;

pub fn configure(cfg: &mut ServiceConfig) {
    cfg.service(
        scope("/user")
            .route("", post().to(user::create))
            .route("", get().to(user::get))
            .route("/preferences", put().to(user::edit_preferences))
            .route("/push_subscription", post().to(user::subscribe_push))
            .route("/push_subscription", delete().to(user::unsubscribe_push)),
    );
}
