use axum::{Json, debug_handler, extract::State, http::StatusCode};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::{
    AppJson, AppResult,
    db::{Listing, ListingStatus},
    error,
};

#[derive(Debug, Deserialize)]
pub struct NewListing {
    #[serde(default, alias = "id")]
    pub reporter: String,
    #[serde(default)]
    pub item: String,
    #[serde(default)]
    pub place: String,
}

impl NewListing {
    pub fn new(reporter: &str, item: &str, place: &str) -> Self {
        Self {
            reporter: reporter.to_owned(),
            item: item.to_owned(),
            place: place.to_owned(),
        }
    }
}

#[derive(Serialize)]
pub(crate) struct ListingAdded {
    message: &'static str,
    id: String,
}

pub async fn create(db_pool: &SqlitePool, NewListing { reporter, item, place }: NewListing) -> error::Result<Listing> {
    error::require("id", &reporter)?;
    error::require("item", &item)?;
    error::require("place", &place)?;

    let id = Uuid::now_v7().to_string();
    sqlx::query("INSERT INTO listings (id,item,place,reporter,status) VALUES (?,?,?,?,?)")
        .bind(&id)
        .bind(&item)
        .bind(&place)
        .bind(&reporter)
        .bind(ListingStatus::Available)
        .execute(db_pool)
        .await?;

    tracing::info!(listing = %id, item, place, reporter, "listing reported");
    Ok(Listing {
        id,
        item,
        place,
        reporter,
        status: ListingStatus::Available,
        claimant: None,
    })
}

pub async fn all(db_pool: &SqlitePool) -> Result<Vec<Listing>, sqlx::Error> {
    sqlx::query_as("SELECT id,item,place,reporter,status,claimant FROM listings ORDER BY rowid")
        .fetch_all(db_pool)
        .await
}

pub async fn get(db_pool: &SqlitePool, id: &str) -> Result<Option<Listing>, sqlx::Error> {
    sqlx::query_as("SELECT id,item,place,reporter,status,claimant FROM listings WHERE id=?")
        .bind(id)
        .fetch_optional(db_pool)
        .await
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn add_product(
    State(db_pool): State<SqlitePool>,
    AppJson(new_listing): AppJson<NewListing>,
) -> AppResult<(StatusCode, Json<ListingAdded>)> {
    let listing = create(&db_pool, new_listing).await?;
    Ok((
        StatusCode::CREATED,
        Json(ListingAdded {
            message: "Product added",
            id: listing.id,
        }),
    ))
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn list_products(State(db_pool): State<SqlitePool>) -> AppResult<Json<Vec<Listing>>> {
    Ok(Json(all(&db_pool).await?))
}
