//! Staff accounts and login.

use crate::api::{ApiJson, ApiPath, ApiResult, AppState};
use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use greenfis_core::{NewUser, User, UserPatch, UserProfile};
use serde::Deserialize;
use tracing::info;

#[derive(Debug, Deserialize)]
pub struct Login {
    pub username: String,
    pub password: String,
}

pub async fn login(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<Login>,
) -> ApiResult<Json<UserProfile>> {
    let username = body.username.clone();
    let user = state
        .run(move |store| store.authenticate(&body.username, &body.password))
        .await
        .inspect_err(|_| info!(%username, "login failed"))?;
    info!(user_id = user.id, "login");
    Ok(Json(user.into()))
}

pub async fn list(State(state): State<AppState>) -> ApiResult<Json<Vec<UserProfile>>> {
    let users = state.run(|store| store.list::<User>()).await?;
    Ok(Json(users.iter().map(UserProfile::from).collect()))
}

pub async fn show(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<u64>,
) -> ApiResult<Json<UserProfile>> {
    let user = state.run(move |store| store.fetch::<User>(id)).await?;
    Ok(Json(user.into()))
}

pub async fn create(
    State(state): State<AppState>,
    ApiJson(input): ApiJson<NewUser>,
) -> ApiResult<(StatusCode, Json<UserProfile>)> {
    let now = state.now();
    let user = state
        .run(move |store| store.create_user(input, now))
        .await?;
    info!(user_id = user.id, role = ?user.role, "user created");
    Ok((StatusCode::CREATED, Json(user.into())))
}

pub async fn update(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<u64>,
    ApiJson(patch): ApiJson<UserPatch>,
) -> ApiResult<Json<UserProfile>> {
    let user = state.run(move |store| store.update_user(id, patch)).await?;
    info!(user_id = id, "user updated");
    Ok(Json(user.into()))
}

pub async fn remove(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<u64>,
) -> ApiResult<StatusCode> {
    state.run(move |store| store.delete_user(id)).await?;
    info!(user_id = id, "user deleted");
    Ok(StatusCode::NO_CONTENT)
}
