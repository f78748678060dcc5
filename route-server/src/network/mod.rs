//! Per-query view of the route network.
//!
//! A [`RouteNetworkView`] holds every candidate route fetched for one
//! (origin, destination) pair, each already projected onto both pins and
//! classified by side. Handlers read from the view and never touch the
//! route store.

mod side;

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::domain::{LatLng, RoutePolyline, Side};
use crate::geometry::{Projection, locate};

pub use side::SideClassifier;

/// A route near the query, with both pins projected onto it.
#[derive(Debug, Clone)]
pub struct Candidate {
    route: Arc<RoutePolyline>,
    origin: Projection,
    destination: Projection,
    origin_side: Side,
    destination_side: Side,
}

impl Candidate {
    /// Project both pins onto `route`.
    ///
    /// Returns `None` when the route has no usable projection.
    pub fn new(
        route: Arc<RoutePolyline>,
        origin: LatLng,
        destination: LatLng,
        classifier: &SideClassifier,
    ) -> Option<Self> {
        let line = route.line();
        let origin_proj = match locate(line, origin) {
            Ok(p) => p,
            Err(e) => {
                warn!(route = %route.id(), error = %e, "dropping candidate: origin projection failed");
                return None;
            }
        };
        let destination_proj = match locate(line, destination) {
            Ok(p) => p,
            Err(e) => {
                warn!(route = %route.id(), error = %e, "dropping candidate: destination projection failed");
                return None;
            }
        };

        let origin_side = classifier.classify_projection(line, origin, &origin_proj);
        let destination_side = classifier.classify_projection(line, destination, &destination_proj);

        Some(Self {
            route,
            origin: origin_proj,
            destination: destination_proj,
            origin_side,
            destination_side,
        })
    }

    pub fn route(&self) -> &Arc<RoutePolyline> {
        &self.route
    }

    /// Projection of the origin pin.
    pub fn origin(&self) -> &Projection {
        &self.origin
    }

    /// Projection of the destination pin.
    pub fn destination(&self) -> &Projection {
        &self.destination
    }

    pub fn origin_side(&self) -> Side {
        self.origin_side
    }

    pub fn destination_side(&self) -> Side {
        self.destination_side
    }

    pub fn is_closed_loop(&self) -> bool {
        self.route.is_closed_loop()
    }

    /// Whether the route passes within `radius_m` of the origin.
    pub fn near_origin(&self, radius_m: f64) -> bool {
        self.origin.distance_m <= radius_m
    }

    /// Whether the route passes within `radius_m` of the destination.
    pub fn near_destination(&self, radius_m: f64) -> bool {
        self.destination.distance_m <= radius_m
    }
}

/// Every candidate route for one query.
#[derive(Debug, Clone)]
pub struct RouteNetworkView {
    origin: LatLng,
    destination: LatLng,
    candidates: Vec<Candidate>,
}

impl RouteNetworkView {
    /// Build the view from fetched routes.
    ///
    /// Routes are de-duplicated by id and ordered by id so results do not
    /// depend on store ordering. Routes that cannot be projected are dropped.
    pub fn build(
        origin: LatLng,
        destination: LatLng,
        routes: impl IntoIterator<Item = Arc<RoutePolyline>>,
        classifier: &SideClassifier,
    ) -> Self {
        let mut seen = HashSet::new();
        let mut candidates: Vec<Candidate> = routes
            .into_iter()
            .filter(|route| seen.insert(route.id().clone()))
            .filter_map(|route| Candidate::new(route, origin, destination, classifier))
            .collect();
        candidates.sort_by(|a, b| a.route.id().cmp(b.route.id()));

        debug!(candidates = candidates.len(), "built route network view");

        Self {
            origin,
            destination,
            candidates,
        }
    }

    pub fn origin(&self) -> LatLng {
        self.origin
    }

    pub fn destination(&self) -> LatLng {
        self.destination
    }

    pub fn candidates(&self) -> &[Candidate] {
        &self.candidates
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    /// Candidates passing within `radius_m` of both pins.
    pub fn near_both(&self, radius_m: f64) -> impl Iterator<Item = &Candidate> {
        self.candidates
            .iter()
            .filter(move |c| c.near_origin(radius_m) && c.near_destination(radius_m))
    }

    /// Candidates passing within `radius_m` of the origin, nearest first.
    pub fn near_origin(&self, radius_m: f64) -> Vec<&Candidate> {
        let mut near: Vec<&Candidate> = self
            .candidates
            .iter()
            .filter(|c| c.near_origin(radius_m))
            .collect();
        near.sort_by(|a, b| a.origin.distance_m.total_cmp(&b.origin.distance_m));
        near
    }

    /// Candidates passing within `radius_m` of the destination, nearest first.
    pub fn near_destination(&self, radius_m: f64) -> Vec<&Candidate> {
        let mut near: Vec<&Candidate> = self
            .candidates
            .iter()
            .filter(|c| c.near_destination(radius_m))
            .collect();
        near.sort_by(|a, b| a.destination.distance_m.total_cmp(&b.destination.distance_m));
        near
    }
}
