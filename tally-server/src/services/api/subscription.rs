use actix_web::web::*;

use crate::handlers::subscription;

pub fn configure(cfg: &mut ServiceConfig) {
    cfg.service(
        scope("/subscription")
            .route("", post().to(subscription::create))
            .route("", put().to(subscription::edit))
            .route("", delete().to(subscription::delete))
            .route("/all", get().to(subscription::get_all)),
    );
}
