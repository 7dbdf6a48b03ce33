use actix_web::web::*;

use crate::handlers::notification;

pub fn configure(cfg: &mut ServiceConfig) {
    cfg.service(
        scope("/notification")
            .route("/all", get().to(notification::get_all))
            .route("/read", put().to(notification::mark_read))
            .route("/read_all", put().to(notification::mark_all_read)),
    );
}
