//! Claim races against a file database with a full connection pool, so the
//! conditional update is hit by writers on separate connections.

use campusrelay::{
    db::{self, ListingStatus},
    error::Error,
    listings::{
        claim,
        products::{self, NewListing},
    },
};

const LISTINGS: usize = 20;
const CLAIMANTS: usize = 32;

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn every_listing_has_exactly_one_winner_across_connections() {
    let dir = tempfile::tempdir().unwrap();
    let url = format!("sqlite://{}", dir.path().join("race.db").display());
    let db_pool = db::connect(&url, 16).await.unwrap();

    let mut listings = Vec::new();
    for n in 0..LISTINGS {
        let place = format!("Locker {n}");
        listings.push(products::create(&db_pool, NewListing::new("rep", "Bag", &place)).await.unwrap());
    }

    let mut tasks = Vec::new();
    for listing in &listings {
        for c in 0..CLAIMANTS {
            let db_pool = db_pool.clone();
            let place = listing.place.clone();
            tasks.push(tokio::spawn(async move {
                let claimant = format!("c{c}");
                (place.clone(), claim(&db_pool, "Bag", &place, &claimant).await.map(|won| (won, claimant)))
            }));
        }
    }

    let mut winners = std::collections::HashMap::new();
    let mut lost = 0;
    for task in tasks {
        match task.await.unwrap() {
            (place, Ok(won)) => assert!(winners.insert(place, won).is_none(), "two winners for one listing"),
            (_, Err(Error::NotClaimable)) => lost += 1,
            (_, Err(err)) => panic!("claim failed in the store: {err}"),
        }
    }

    assert_eq!(winners.len(), LISTINGS);
    assert_eq!(lost, LISTINGS * (CLAIMANTS - 1));

    for listing in &listings {
        let (won, claimant) = &winners[&listing.place];
        let stored = products::get(&db_pool, &listing.id).await.unwrap().unwrap();
        assert_eq!(&stored, won);
        assert_eq!(stored.status, ListingStatus::Claimed);
        assert_eq!(stored.claimant.as_ref(), Some(claimant));
    }
}
