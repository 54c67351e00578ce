use axum::{Json, debug_handler, extract::State, http::StatusCode, response::{IntoResponse, Response}};
use serde::Deserialize;
use sqlx::SqlitePool;

use crate::{AppJson, AppResult, error::Error};

use super::find_user;

#[derive(Deserialize)]
pub(crate) struct LoginRequest {
    #[serde(default)]
    id: String,
    #[serde(default)]
    password: String,
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn login(
    State(db_pool): State<SqlitePool>,
    AppJson(LoginRequest { id, password }): AppJson<LoginRequest>,
) -> AppResult<Response> {
    if id.is_empty() || password.is_empty() {
        return Err(Error::validation("Enter both id and password"))?;
    }

    let Some(user) = find_user(&db_pool, &id, &password).await? else {
        return Ok((StatusCode::UNAUTHORIZED, Json(serde_json::json!({"message": "No user found"}))).into_response());
    };

    Ok(Json(user).into_response())
}
