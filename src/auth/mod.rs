use crate::state::AppState;
use axum::Router;

mod claims;
mod dto;
pub(crate) mod extractors;
pub mod handlers;
pub mod jwt;
pub mod memory_repo;
pub mod password;
pub mod repo;
pub mod repo_types;
pub mod services;
pub mod validation;

pub fn router(allow_delete_all: bool) -> Router<AppState> {
    handlers::account_routes(allow_delete_all)
}
