//! Web layer for the route finder.
//!
//! Exposes the itinerary query and route lookup as JSON over HTTP.

mod dto;
mod routes;
mod state;

pub use dto::*;
pub use routes::{AppError, create_router};
pub use state::{AppState, AppStore};
