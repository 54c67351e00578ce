use axum::{Json, debug_handler, extract::{Query, State}};
use serde::Deserialize;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::{AppResult, db::{self, Message}, error};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct HistoryQuery {
    my_id: String,
    other_id: String,
}

type MessageRow = (String, String, String, String, i64);

fn from_row((id, sender, receiver, text, created_at): MessageRow) -> Result<Message, sqlx::Error> {
    Ok(Message {
        id: Uuid::parse_str(&id).map_err(|err| sqlx::Error::Decode(Box::new(err)))?,
        sender,
        receiver,
        text,
        created_at: db::from_millis(created_at),
    })
}

/// Appends a message. Returns once the row is durable.
pub async fn append(db_pool: &SqlitePool, sender: &str, receiver: &str, text: &str) -> Result<Message, sqlx::Error> {
    let id = Uuid::now_v7();
    let created_at = db::now_millis();
    sqlx::query("INSERT INTO messages (id,sender,receiver,text,created_at) VALUES (?,?,?,?,?)")
        .bind(id.to_string())
        .bind(sender)
        .bind(receiver)
        .bind(text)
        .bind(created_at)
        .execute(db_pool)
        .await?;

    Ok(Message {
        id,
        sender: sender.to_owned(),
        receiver: receiver.to_owned(),
        text: text.to_owned(),
        created_at: db::from_millis(created_at),
    })
}

/// Every message exchanged between `a` and `b`, oldest first.
pub async fn conversation(db_pool: &SqlitePool, a: &str, b: &str) -> Result<Vec<Message>, sqlx::Error> {
    let rows: Vec<MessageRow> = sqlx::query_as(
        r#"SELECT id,sender,receiver,text,created_at FROM messages
        WHERE (sender=? AND receiver=?) OR (sender=? AND receiver=?)
        ORDER BY created_at, rowid"#,
    )
    .bind(a)
    .bind(b)
    .bind(b)
    .bind(a)
    .fetch_all(db_pool)
    .await?;

    rows.into_iter().map(from_row).collect()
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn messages(
    State(db_pool): State<SqlitePool>,
    Query(HistoryQuery { my_id, other_id }): Query<HistoryQuery>,
) -> AppResult<Json<Vec<Message>>> {
    error::require("myId", &my_id)?;
    error::require("otherId", &other_id)?;

    Ok(Json(conversation(&db_pool, &my_id, &other_id).await?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn conversation_includes_both_directions_in_order() {
        let db_pool = db::test_pool().await;
        append(&db_pool, "ana", "ben", "m1").await.unwrap();
        append(&db_pool, "ben", "ana", "m2").await.unwrap();
        append(&db_pool, "cat", "ana", "other").await.unwrap();
        append(&db_pool, "ana", "ben", "m3").await.unwrap();

        let texts: Vec<_> = conversation(&db_pool, "ben", "ana")
            .await
            .unwrap()
            .into_iter()
            .map(|m| m.text)
            .collect();
        assert_eq!(texts, ["m1", "m2", "m3"]);
    }

    #[tokio::test]
    async fn same_millisecond_keeps_insertion_order() {
        let db_pool = db::test_pool().await;
        // identical timestamps, ids sorting opposite to insertion
        let rows = [
            ("0190a0b0-0000-7000-8000-000000000002", "second"),
            ("0190a0b0-0000-7000-8000-000000000001", "first"),
        ];
        for (id, text) in rows {
            sqlx::query("INSERT INTO messages (id,sender,receiver,text,created_at) VALUES (?,?,?,?,?)")
                .bind(id)
                .bind("ana")
                .bind("ben")
                .bind(text)
                .bind(1_000_i64)
                .execute(&db_pool)
                .await
                .unwrap();
        }

        let texts: Vec<_> = conversation(&db_pool, "ana", "ben")
            .await
            .unwrap()
            .into_iter()
            .map(|m| m.text)
            .collect();
        assert_eq!(texts, ["second", "first"]);
    }

    #[tokio::test]
    async fn appended_message_round_trips_fields() {
        let db_pool = db::test_pool().await;
        let sent = append(&db_pool, "ana", "ben", "hello").await.unwrap();
        let stored = conversation(&db_pool, "ana", "ben").await.unwrap();
        assert_eq!(stored, vec![sent]);
    }
}
