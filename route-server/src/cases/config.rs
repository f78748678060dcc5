//! Radii and thresholds for the case handlers.

use crate::network::SideClassifier;

/// Distances and limits used while matching a query to a travel pattern.
///
/// All distances are meters. Handlers receive this by reference; nothing
/// reads thresholds from globals, so tests can vary any of them.
#[derive(Debug, Clone, PartialEq)]
pub struct CaseConfig {
    /// Both pins must be this close to a route for single-route matching.
    pub single_route_radius_m: f64,

    /// Loose matching radius; routes this close are fetched and considered.
    pub loose_radius_m: f64,

    /// Boarding/alighting radius for simple transfers.
    pub transfer_radius_m: f64,

    /// Pins closer than this are on the corridor, whichever side.
    pub on_corridor_m: f64,

    /// Pins closer than this are classified by which side they are on.
    /// Anything further is on the opposite side.
    pub near_side_m: f64,

    /// An endpoint must be further than this to trigger opposite-side handling.
    pub opposite_min_m: f64,

    /// Both-opposite handling needs at least one endpoint further than this.
    pub both_opposite_min_m: f64,

    /// How far from the origin an alternate boarding point may be.
    pub alternate_boarding_radius_m: f64,

    /// Search radius around each pin when both are off the corridor.
    pub both_opposite_search_m: f64,

    /// Destination radius for transfers that alight off the corridor.
    pub transfer_end_radius_m: f64,

    /// Alighting scan radius for those transfers.
    pub transfer_alighting_radius_m: f64,

    /// Sampling step when scanning a route for boarding or alighting points.
    pub scan_step_m: f64,

    /// Itineraries kept per route pair.
    pub top_n_per_pair: usize,

    /// Hard cap on route pairs examined for transfers.
    pub max_route_pairs: usize,

    /// Maximum number of itineraries returned for one query.
    pub max_results: usize,
}

impl CaseConfig {
    pub fn with_single_route_radius(mut self, meters: f64) -> Self {
        self.single_route_radius_m = meters;
        self
    }

    pub fn with_transfer_radius(mut self, meters: f64) -> Self {
        self.transfer_radius_m = meters;
        self
    }

    pub fn with_scan_step(mut self, meters: f64) -> Self {
        self.scan_step_m = meters;
        self
    }

    pub fn with_max_route_pairs(mut self, pairs: usize) -> Self {
        self.max_route_pairs = pairs;
        self
    }

    pub fn with_max_results(mut self, results: usize) -> Self {
        self.max_results = results;
        self
    }

    /// The widest radius any handler looks at. Fetching routes within this
    /// of each pin gives every handler the candidates it needs.
    pub fn fetch_radius_m(&self) -> f64 {
        [
            self.single_route_radius_m,
            self.loose_radius_m,
            self.transfer_radius_m,
            self.alternate_boarding_radius_m,
            self.both_opposite_search_m,
            self.transfer_end_radius_m,
            self.transfer_alighting_radius_m,
        ]
        .into_iter()
        .fold(0.0, f64::max)
    }

    /// Side classifier using this config's thresholds.
    pub fn side_classifier(&self) -> SideClassifier {
        SideClassifier::new(self.on_corridor_m, self.near_side_m)
    }
}

impl Default for CaseConfig {
    fn default() -> Self {
        Self {
            single_route_radius_m: 200.0,
            loose_radius_m: 500.0,
            transfer_radius_m: 100.0,
            on_corridor_m: 15.0,
            near_side_m: 30.0,
            opposite_min_m: 20.0,
            both_opposite_min_m: 8.0,
            alternate_boarding_radius_m: 200.0,
            both_opposite_search_m: 100.0,
            transfer_end_radius_m: 500.0,
            transfer_alighting_radius_m: 100.0,
            scan_step_m: 10.0,
            top_n_per_pair: 5,
            max_route_pairs: 64,
            max_results: 20,
        }
    }
}
