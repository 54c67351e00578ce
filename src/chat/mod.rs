pub mod frame;
pub mod history;
mod relay;
mod session;
mod ws;

use axum::{Router, routing::get};

use crate::AppState;

pub use relay::{Delivery, Relay};
pub use session::{FrameOutcome, Session, SessionState};
pub use ws::{ConnectionSettings, run_connection};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/ws", get(ws::chat_ws))
        .route("/messages", get(history::messages))
}
