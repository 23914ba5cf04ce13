pub mod users;
pub mod genres;
pub mod actors;
pub mod plays;
pub mod theatre_halls;
pub mod performances;
pub mod reservations;

use axum::Router;
use std::sync::Arc;

use crate::config::Config;

pub fn routes(config: &Config) -> Router<Arc<crate::AppState>> {
    Router::new()
        .merge(users::routes())
        .merge(genres::routes())
        .merge(actors::routes())
        .merge(plays::routes(config.media.max_upload_bytes))
        .merge(theatre_halls::routes())
        .merge(performances::routes())
        .merge(reservations::routes())
}
