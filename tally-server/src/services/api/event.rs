use actix_web::web::*;

use crate::handlers::event;

pub fn configure(cfg: &mut ServiceConfig) {
    cfg.service(scope("/events").route("", get().to(event::subscribe)));
}
