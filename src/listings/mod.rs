mod claim;
pub mod products;

use axum::{Router, routing::{get, post}};

use crate::AppState;

pub use claim::claim;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/claim", post(claim::claim_listing))
        .route("/products", get(products::list_products).post(products::add_product))
}
