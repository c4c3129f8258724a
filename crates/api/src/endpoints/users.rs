//! Users endpoints: registration, profiles, avatars and subscriptions.

use axum::{
    Json, Router,
    extract::{OriginalUri, Path, Query, State},
    http::StatusCode,
    routing::{get, post, put},
};
use foodgram_common::{AppError, AppResult};
use foodgram_core::CreateUserInput;
use serde::Deserialize;

use crate::{
    extractors::{AuthUser, MaybeAuthUser},
    middleware::AppState,
    pagination::{Page, PageQuery},
    response::{AvatarResponse, CreatedUserResponse, SubscriptionResponse, UserResponse},
};

/// Avatar upload request.
#[derive(Debug, Deserialize)]
pub struct AvatarRequest {
    /// Base64 data URL.
    pub avatar: Option<String>,
}

/// `?recipes_limit=` for subscription previews.
#[derive(Debug, Default, Deserialize)]
pub struct RecipesLimitQuery {
    pub recipes_limit: Option<u64>,
}

async fn list(
    State(state): State<AppState>,
    viewer: MaybeAuthUser,
    OriginalUri(uri): OriginalUri,
    Query(page): Query<PageQuery>,
) -> AppResult<Json<Page<UserResponse>>> {
    let params = page.params(&state.pagination)?;
    let (users, count) = state
        .user_service
        .list(params.offset(), params.limit)
        .await?;

    let results = state
        .user_service
        .views(viewer.id(), users)
        .await?
        .into_iter()
        .map(|v| UserResponse::new(v, &state))
        .collect();
    Ok(Json(Page::new(
        results,
        count,
        params,
        &state.base_url,
        &uri,
    )?))
}

/// Register a new user.
async fn register(
    State(state): State<AppState>,
    Json(input): Json<CreateUserInput>,
) -> AppResult<(StatusCode, Json<CreatedUserResponse>)> {
    let user = state.user_service.create(input).await?;
    Ok((StatusCode::CREATED, Json(user.into())))
}

async fn retrieve(
    State(state): State<AppState>,
    viewer: MaybeAuthUser,
    Path(id): Path<i32>,
) -> AppResult<Json<UserResponse>> {
    let user = state.user_service.get(id).await?;
    let view = state.user_service.view(viewer.id(), user).await?;
    Ok(Json(UserResponse::new(view, &state)))
}

/// Get current user.
async fn me(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> AppResult<Json<UserResponse>> {
    let view = state.user_service.view(Some(user.id), user).await?;
    Ok(Json(UserResponse::new(view, &state)))
}

async fn set_avatar(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Json(req): Json<AvatarRequest>,
) -> AppResult<Json<AvatarResponse>> {
    let data_url = req
        .avatar
        .filter(|a| !a.is_empty())
        .ok_or_else(|| AppError::Validation("Avatar must be provided.".to_string()))?;

    let user = state.user_service.set_avatar(user, &data_url).await?;
    let avatar = user
        .avatar
        .as_deref()
        .map(|key| state.file_url(key))
        .unwrap_or_default();
    Ok(Json(AvatarResponse { avatar }))
}

async fn delete_avatar(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> AppResult<StatusCode> {
    state.user_service.delete_avatar(user).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Authors the current user follows.
async fn subscriptions(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    OriginalUri(uri): OriginalUri,
    Query(page): Query<PageQuery>,
    Query(query): Query<RecipesLimitQuery>,
) -> AppResult<Json<Page<SubscriptionResponse>>> {
    let params = page.params(&state.pagination)?;
    let (views, count) = state
        .follow_service
        .list(user.id, params.offset(), params.limit, query.recipes_limit)
        .await?;

    let results = views
        .into_iter()
        .map(|v| SubscriptionResponse::new(v, &state))
        .collect();
    Ok(Json(Page::new(
        results,
        count,
        params,
        &state.base_url,
        &uri,
    )?))
}

async fn subscribe(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<i32>,
    Query(query): Query<RecipesLimitQuery>,
) -> AppResult<(StatusCode, Json<SubscriptionResponse>)> {
    let view = state
        .follow_service
        .subscribe(user.id, id, query.recipes_limit)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(SubscriptionResponse::new(view, &state)),
    ))
}

async fn unsubscribe(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<i32>,
) -> AppResult<StatusCode> {
    state.follow_service.unsubscribe(user.id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/users/", get(list).post(register))
        .route("/users/me/", get(me))
        .route("/users/me/avatar/", put(set_avatar).delete(delete_avatar))
        .route("/users/subscriptions/", get(subscriptions))
        .route("/users/{id}/", get(retrieve))
        .route("/users/{id}/subscribe/", post(subscribe).delete(unsubscribe))
}
