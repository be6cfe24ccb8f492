use std::collections::HashMap;

use axum::{
    extract::{Query, State},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde_json::Value;
use tracing::{error, info, instrument, warn};

use crate::{
    auth::{
        dto::{Confirmation, DeletedCount, IdRequest, LoginRequest, RegisterRequest, UpdateRequest},
        extractors::{JsonBody, SessionUser, AUTH_TOKEN_HEADER},
        repo_types::UserRecord,
        services,
        validation::{self, BY_ID, LOGIN, REGISTER, UPDATE},
    },
    error::{AuthError, AuthResult},
    state::AppState,
};

const BASE: &str = "/api/auth";

/// Routes under `/api/auth`. The development-only bulk delete is mounted
/// only when `allow_delete_all` is set.
pub fn account_routes(allow_delete_all: bool) -> Router<AppState> {
    let all = if allow_delete_all {
        get(list_all).delete(delete_all)
    } else {
        get(list_all)
    };
    Router::new()
        .route(&format!("{BASE}/register"), post(register))
        .route(&format!("{BASE}/login"), post(login))
        .route(&format!("{BASE}/all"), all)
        .route(&format!("{BASE}/me"), get(get_me))
        .route(
            BASE,
            get(get_by_id).patch(update_by_id).delete(delete_by_id),
        )
        .route(
            &format!("{BASE}/"),
            get(get_by_id).patch(update_by_id).delete(delete_by_id),
        )
}

fn report(op: &'static str) -> impl Fn(AuthError) -> AuthError {
    move |e| {
        if e.status().is_server_error() {
            error!(op, error = %e, "request failed");
        } else if let AuthError::ValidationFailed(errors) = &e {
            warn!(op, violations = errors.len(), "request rejected by validation");
        } else {
            warn!(op, error = %e, "request rejected");
        }
        e
    }
}

fn query_body(params: HashMap<String, String>) -> Value {
    Value::Object(
        params
            .into_iter()
            .map(|(k, v)| (k, Value::String(v)))
            .collect(),
    )
}

#[instrument(skip(state, body))]
pub async fn register(
    State(state): State<AppState>,
    JsonBody(body): JsonBody,
) -> AuthResult<Json<UserRecord>> {
    let req: RegisterRequest = validation::parse(body, REGISTER).map_err(report("register"))?;
    let user = services::register(state.directory.as_ref(), req)
        .await
        .map_err(report("register"))?;
    info!(user_id = %user.id, username = %user.username, "user registered");
    Ok(Json(user))
}

#[instrument(skip(state, body))]
pub async fn login(
    State(state): State<AppState>,
    JsonBody(body): JsonBody,
) -> AuthResult<impl IntoResponse> {
    let req: LoginRequest = validation::parse(body, LOGIN).map_err(report("login"))?;
    let username = req.username.clone();
    let token = services::login(state.directory.as_ref(), &state.tokens, req)
        .await
        .map_err(report("login"))?;
    info!(username = %username, "user logged in");
    Ok(([(AUTH_TOKEN_HEADER, token.clone())], token))
}

#[instrument(skip(state, params))]
pub async fn get_by_id(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> AuthResult<Json<UserRecord>> {
    let req: IdRequest = validation::parse(query_body(params), BY_ID).map_err(report("get"))?;
    let user = services::get_by_id(state.directory.as_ref(), &req.id)
        .await
        .map_err(report("get"))?;
    Ok(Json(user))
}

#[instrument(skip(state))]
pub async fn list_all(State(state): State<AppState>) -> AuthResult<Json<Vec<UserRecord>>> {
    let users = services::list_all(state.directory.as_ref())
        .await
        .map_err(report("list"))?;
    Ok(Json(users))
}

#[instrument(skip(state, body))]
pub async fn update_by_id(
    State(state): State<AppState>,
    JsonBody(body): JsonBody,
) -> AuthResult<Json<Confirmation>> {
    let req: UpdateRequest = validation::parse(body, UPDATE).map_err(report("update"))?;
    let id = services::update_by_id(state.directory.as_ref(), req)
        .await
        .map_err(report("update"))?;
    info!(user_id = %id, "user updated");
    Ok(Json(Confirmation::new("user updated")))
}

#[instrument(skip(state, params))]
pub async fn delete_by_id(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> AuthResult<Json<Confirmation>> {
    let req: IdRequest = validation::parse(query_body(params), BY_ID).map_err(report("delete"))?;
    let id = services::delete_by_id(state.directory.as_ref(), &req.id)
        .await
        .map_err(report("delete"))?;
    info!(user_id = %id, "user deleted");
    Ok(Json(Confirmation::new("user deleted")))
}

#[instrument(skip(state))]
pub async fn delete_all(State(state): State<AppState>) -> AuthResult<Json<DeletedCount>> {
    let deleted = services::delete_all(state.directory.as_ref())
        .await
        .map_err(report("delete_all"))?;
    warn!(deleted, "all users deleted");
    Ok(Json(DeletedCount {
        message: "all users deleted".into(),
        deleted,
    }))
}

#[instrument(skip(state))]
pub async fn get_me(
    State(state): State<AppState>,
    SessionUser(user_id): SessionUser,
) -> AuthResult<Json<UserRecord>> {
    let user = services::get_by_id(state.directory.as_ref(), &user_id.to_string())
        .await
        .map_err(report("me"))?;
    Ok(Json(user))
}
