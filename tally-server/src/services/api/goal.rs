use actix_web::web::*;

use crate::handlers::goal;

pub fn configure(cfg: &mut ServiceConfig) {
    cfg.service(
        scope("/goal")
            .route("", post().to(goal::create))
            .route("", get().to(goal::get))
            .route("", put().to(goal::edit))
            .route("", delete().to(goal::delete))
            .route("/all", get().to(goal::get_all))
            .route("/contribute", post().to(goal::contribute)),
    );
}
