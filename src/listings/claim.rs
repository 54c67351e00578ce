use axum::{Json, debug_handler, extract::State};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

use crate::{
    AppJson, AppResult,
    db::Listing,
    error::{self, Error},
};

#[derive(Deserialize)]
pub(crate) struct ClaimRequest {
    #[serde(default)]
    item: String,
    #[serde(default)]
    place: String,
    #[serde(default)]
    claimerid: String,
}

#[derive(Serialize)]
pub(crate) struct ClaimResponse {
    message: &'static str,
    product: Listing,
}

/// Moves one available listing labelled `(item, place)` to claimed.
///
/// This is a single conditional update; the store decides the winner when
/// several claims race. When more than one available listing carries the
/// same labels, any one of them may be taken.
pub async fn claim(db_pool: &SqlitePool, item: &str, place: &str, claimant: &str) -> error::Result<Listing> {
    error::require("item", item)?;
    error::require("place", place)?;
    error::require("claimerid", claimant)?;

    let claimed: Option<Listing> = sqlx::query_as(
        r#"UPDATE listings SET status='claimed', claimant=?
        WHERE rowid=(SELECT rowid FROM listings WHERE item=? AND place=? AND status='available' ORDER BY rowid LIMIT 1)
        AND status='available'
        RETURNING id,item,place,reporter,status,claimant"#,
    )
    .bind(claimant)
    .bind(item)
    .bind(place)
    .fetch_optional(db_pool)
    .await?;

    match claimed {
        Some(listing) => {
            tracing::info!(listing = %listing.id, item, place, claimant, "listing claimed");
            Ok(listing)
        }
        None => {
            tracing::debug!(item, place, claimant, "nothing claimable");
            Err(Error::NotClaimable)
        }
    }
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn claim_listing(
    State(db_pool): State<SqlitePool>,
    AppJson(ClaimRequest { item, place, claimerid }): AppJson<ClaimRequest>,
) -> AppResult<Json<ClaimResponse>> {
    let product = claim(&db_pool, &item, &place, &claimerid).await?;
    Ok(Json(ClaimResponse {
        message: "Item successfully claimed",
        product,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        db::{self, ListingStatus},
        listings::products::{self, NewListing},
    };

    async fn pool_with_wallet() -> (SqlitePool, Listing) {
        let db_pool = db::test_pool().await;
        let listing = products::create(&db_pool, NewListing::new("rep", "Wallet", "Library")).await.unwrap();
        (db_pool, listing)
    }

    #[tokio::test]
    async fn first_claim_wins() {
        let (db_pool, listing) = pool_with_wallet().await;

        let claimed = claim(&db_pool, "Wallet", "Library", "x").await.unwrap();
        assert_eq!(claimed.id, listing.id);
        assert_eq!(claimed.status, ListingStatus::Claimed);
        assert_eq!(claimed.claimant.as_deref(), Some("x"));
    }

    #[tokio::test]
    async fn concurrent_claims_have_exactly_one_winner() {
        let (db_pool, listing) = pool_with_wallet().await;

        let mut tasks = Vec::new();
        for n in 0..8 {
            let db_pool = db_pool.clone();
            tasks.push(tokio::spawn(async move {
                let claimant = format!("claimant{n}");
                (claim(&db_pool, "Wallet", "Library", &claimant).await, claimant)
            }));
        }

        let mut winners = Vec::new();
        for task in tasks {
            match task.await.unwrap() {
                (Ok(listing), claimant) => winners.push((listing, claimant)),
                (Err(Error::NotClaimable), _) => {}
                (Err(err), _) => panic!("unexpected error: {err}"),
            }
        }

        assert_eq!(winners.len(), 1);
        let (won, claimant) = &winners[0];
        let stored = products::get(&db_pool, &listing.id).await.unwrap().unwrap();
        assert_eq!(&stored, won);
        assert_eq!(stored.claimant.as_ref(), Some(claimant));
    }

    #[tokio::test]
    async fn absent_listing_is_not_claimable_and_untouched() {
        let db_pool = db::test_pool().await;
        let other = products::create(&db_pool, NewListing::new("rep", "Keys", "Library")).await.unwrap();

        let before = products::all(&db_pool).await.unwrap();
        assert!(matches!(claim(&db_pool, "Wallet", "Library", "x").await, Err(Error::NotClaimable)));
        let after = products::all(&db_pool).await.unwrap();

        assert_eq!(before, after);
        assert_eq!(after, vec![other]);
    }

    #[tokio::test]
    async fn repeating_a_won_claim_keeps_failing() {
        let (db_pool, listing) = pool_with_wallet().await;
        claim(&db_pool, "Wallet", "Library", "x").await.unwrap();

        for _ in 0..3 {
            assert!(matches!(claim(&db_pool, "Wallet", "Library", "x").await, Err(Error::NotClaimable)));
        }
        let stored = products::get(&db_pool, &listing.id).await.unwrap().unwrap();
        assert_eq!(stored.status, ListingStatus::Claimed);
        assert_eq!(stored.claimant.as_deref(), Some("x"));
    }

    #[tokio::test]
    async fn duplicate_labels_claim_one_at_a_time() {
        let db_pool = db::test_pool().await;
        products::create(&db_pool, NewListing::new("a", "Umbrella", "Gym")).await.unwrap();
        products::create(&db_pool, NewListing::new("b", "Umbrella", "Gym")).await.unwrap();

        let first = claim(&db_pool, "Umbrella", "Gym", "x").await.unwrap();
        let second = claim(&db_pool, "Umbrella", "Gym", "y").await.unwrap();
        assert_ne!(first.id, second.id);
        assert!(matches!(claim(&db_pool, "Umbrella", "Gym", "z").await, Err(Error::NotClaimable)));
    }

    #[tokio::test]
    async fn missing_fields_are_rejected_before_the_store() {
        let (db_pool, listing) = pool_with_wallet().await;

        assert!(matches!(claim(&db_pool, "", "Library", "x").await, Err(Error::Validation(_))));
        assert!(matches!(claim(&db_pool, "Wallet", "", "x").await, Err(Error::Validation(_))));
        assert!(matches!(claim(&db_pool, "Wallet", "Library", "").await, Err(Error::Validation(_))));

        let stored = products::get(&db_pool, &listing.id).await.unwrap().unwrap();
        assert_eq!(stored.status, ListingStatus::Available);
    }

    #[tokio::test]
    async fn whitespace_claimant_is_taken_as_given() {
        let (db_pool, _) = pool_with_wallet().await;

        let claimed = claim(&db_pool, "Wallet", "Library", " ").await.unwrap();
        assert_eq!(claimed.claimant.as_deref(), Some(" "));
    }

    #[tokio::test]
    async fn store_rejects_claimed_without_claimant() {
        let (db_pool, listing) = pool_with_wallet().await;

        let result = sqlx::query("UPDATE listings SET status='claimed' WHERE id=?")
            .bind(&listing.id)
            .execute(&db_pool)
            .await;
        assert!(result.is_err());
    }
}
