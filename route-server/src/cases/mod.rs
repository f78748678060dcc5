//! Case resolution.
//!
//! Classifies an (origin, destination) pair into the travel patterns the
//! engine knows and builds a priced itinerary for each match. Handlers form a
//! closed, ordered set ([`CaseHandler`]); the [`Dispatcher`] runs them in
//! priority order, isolates failures, and ranks what they find.

mod config;
mod dispatcher;
mod handler;
mod rank;
mod scan;
mod single;
mod transfer;

#[cfg(test)]
mod scenario_tests;

pub use config::CaseConfig;
pub use dispatcher::{DispatchError, DispatchResult, Dispatcher, HandlerFailure, TransferPolicy};
pub use handler::{CaseError, CaseHandler, HandlerContext};
pub use rank::{deduplicate, finalize, rank_results};
pub use scan::{ScanPoint, Scanner, nearest_in_range};
