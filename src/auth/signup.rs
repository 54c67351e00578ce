use axum::{Json, debug_handler, extract::State, http::StatusCode};
use serde::Deserialize;
use sqlx::SqlitePool;

use crate::{AppJson, AppResult, db::User, error::{self, Error}};

use super::create_user;

#[derive(Deserialize)]
pub(crate) struct SignupRequest {
    #[serde(default)]
    id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    password: String,
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn signup(
    State(db_pool): State<SqlitePool>,
    AppJson(SignupRequest { id, name, password }): AppJson<SignupRequest>,
) -> AppResult<(StatusCode, Json<User>)> {
    error::require("id", &id)?;
    error::require("name", &name)?;
    error::require("password", &password)?;

    if !create_user(&db_pool, &id, &name, &password).await? {
        return Err(Error::validation("User ID already exists, please login"))?;
    }

    tracing::info!(user = %id, "user signed up");
    Ok((StatusCode::CREATED, Json(User { id, name })))
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn list_users(State(db_pool): State<SqlitePool>) -> AppResult<Json<Vec<User>>> {
    let users = sqlx::query_as("SELECT id,name FROM users ORDER BY rowid")
        .fetch_all(&db_pool)
        .await?;
    Ok(Json(users))
}
