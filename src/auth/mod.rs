//! Account records behind the identities the relay and claims trust.
//!
//! Only enough to create an identity and check it exists; the relay itself
//! takes whatever identity a client presents.

mod login;
mod signup;

use axum::{Router, routing::{get, post}};
use sqlx::SqlitePool;

use crate::{AppState, db::User};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/signup", get(signup::list_users).post(signup::signup))
        .route("/login", post(login::login))
}

/// Inserts a user unless the id is taken. Returns whether it was created.
pub(crate) async fn create_user(db_pool: &SqlitePool, id: &str, name: &str, password: &str) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("INSERT INTO users (id,name,password) VALUES (?,?,?) ON CONFLICT (id) DO NOTHING")
        .bind(id)
        .bind(name)
        .bind(password)
        .execute(db_pool)
        .await?;
    Ok(result.rows_affected() == 1)
}

pub(crate) async fn find_user(db_pool: &SqlitePool, id: &str, password: &str) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as("SELECT id,name FROM users WHERE id=? AND password=?")
        .bind(id)
        .bind(password)
        .fetch_optional(db_pool)
        .await
}
