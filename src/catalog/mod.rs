use crate::state::AppState;
use axum::Router;

mod dto;
pub mod handlers;
pub mod repo;
pub mod repo_types;
pub mod serials;
pub mod services;

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(handlers::category_routes())
        .merge(handlers::product_routes())
}
