use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};

use usercache_core::users::User;

use crate::{error::AppError, service::FlushOutcome, state::AppState};

/// Envelope for successful data responses.
#[derive(Debug, Serialize)]
pub struct DataResponse<T> {
    pub data: T,
}

/// Result of an update or delete.
#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

#[derive(Debug, Deserialize)]
pub struct InsertUser {
    pub name: String,
}

/// A user ID as sent by clients, either a JSON number or a string.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum RawId {
    Number(i64),
    Text(String),
}

impl RawId {
    fn into_string(self) -> String {
        match self {
            RawId::Number(id) => id.to_string(),
            RawId::Text(id) => id,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateUser {
    pub id: RawId,
    pub name: String,
}

/// List every committed user (GET /getAll).
pub async fn get_all(State(state): State<AppState>) -> Result<Json<DataResponse<Vec<User>>>, AppError> {
    let users = state.users.get_all().await?;
    Ok(Json(DataResponse { data: users }))
}

/// Buffer a new user (POST /insert).
///
/// Responds 201 with the accepted user; it has no `id` until flushed.
pub async fn insert(
    State(state): State<AppState>,
    Json(payload): Json<InsertUser>,
) -> Result<impl IntoResponse, AppError> {
    let user = state.users.insert_new(&payload.name).await?;

    tracing::info!(external_id = %user.external_id, "Accepted new user");

    Ok((StatusCode::CREATED, Json(DataResponse { data: user })))
}

/// Rename a user (PATCH /update).
pub async fn update(
    State(state): State<AppState>,
    Json(payload): Json<UpdateUser>,
) -> Result<Json<SuccessResponse>, AppError> {
    let success = state
        .users
        .update_name_by_id(&payload.id.into_string(), &payload.name)
        .await?;
    Ok(Json(SuccessResponse { success }))
}

/// Delete a user (DELETE /delete/{id}).
pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SuccessResponse>, AppError> {
    let success = state.users.delete_by_id(&id).await?;
    Ok(Json(SuccessResponse { success }))
}

/// Users with exactly this name (GET /search/{name}).
pub async fn search(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<DataResponse<Vec<User>>>, AppError> {
    let users = state.users.search_by_name(&name).await?;
    Ok(Json(DataResponse { data: users }))
}

/// A single user by ID (GET /users/{id}).
pub async fn get_by_id(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    match state.users.get_by_id(&id).await? {
        Some(user) => Ok(Json(DataResponse { data: user }).into_response()),
        None => Ok(StatusCode::NOT_FOUND.into_response()),
    }
}

/// Run a flush cycle now (POST /flush).
pub async fn flush(State(state): State<AppState>) -> Result<Json<FlushOutcome>, AppError> {
    let outcome = state.flusher.flush_once().await?;
    Ok(Json(outcome))
}
