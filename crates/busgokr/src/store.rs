//! Caller-owned stores for data fetched once per entity
//!
//! Routes and stations stay immutable values. Waypoints and search distances
//! that should be remembered live here instead, keyed by entity id.

use std::collections::{BTreeMap, HashMap};

use rust_decimal::Decimal;
use tracing::debug;

use crate::client::BusApi;
use crate::error::BusError;
use crate::models::{BusRouteWaypoint, GeoPoint, NearbyStation};

/// Which waypoint listing of a route
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WaypointKind {
    /// Coordinates only
    Plain,
    /// Stations with sequence and timing data
    Detailed,
}

/// Waypoints per route, fetched at most once
#[derive(Debug, Default)]
pub struct RouteWaypoints {
    waypoints: HashMap<(i64, WaypointKind), Vec<BusRouteWaypoint>>,
}

impl RouteWaypoints {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Waypoints of `route_id`, fetching them through `api` the first time
    ///
    /// A failed fetch is not remembered; the next call tries again.
    ///
    /// # Errors
    ///
    /// Returns whatever the underlying fetch returns.
    pub async fn get_or_fetch<A>(
        &mut self,
        api: &A,
        route_id: i64,
        kind: WaypointKind,
    ) -> Result<&[BusRouteWaypoint], BusError>
    where
        A: BusApi + ?Sized,
    {
        let key = (route_id, kind);
        if !self.waypoints.contains_key(&key) {
            let fetched = match kind {
                WaypointKind::Plain => api.route_waypoints(route_id).await?,
                WaypointKind::Detailed => api.route_waypoints_detailed(route_id).await?,
            };
            debug!(route_id, ?kind, count = fetched.len(), "Remembering waypoints");
            self.waypoints.insert(key, fetched);
        }
        Ok(self.waypoints.entry(key).or_default().as_slice())
    }

    /// Remembered waypoints, without fetching
    #[must_use]
    pub fn get(&self, route_id: i64, kind: WaypointKind) -> Option<&[BusRouteWaypoint]> {
        self.waypoints.get(&(route_id, kind)).map(Vec::as_slice)
    }
}

/// Distances from query points to stations, across position searches
#[derive(Debug, Default)]
pub struct StationDistances {
    distances: HashMap<i64, BTreeMap<GeoPoint, Decimal>>,
}

impl StationDistances {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the distance of every hit under its query point
    ///
    /// A distance already recorded for the same station and query point is
    /// kept.
    pub fn record<'a>(&mut self, hits: impl IntoIterator<Item = &'a NearbyStation>) {
        for hit in hits {
            self.distances
                .entry(hit.station.id)
                .or_default()
                .entry(hit.query)
                .or_insert(hit.distance);
        }
    }

    /// Distance of a station from one query point
    #[must_use]
    pub fn distance(&self, station_id: i64, query: GeoPoint) -> Option<Decimal> {
        self.distances.get(&station_id)?.get(&query).copied()
    }

    /// Every recorded distance of a station, ordered by query point
    #[must_use]
    pub fn distances(&self, station_id: i64) -> Option<&BTreeMap<GeoPoint, Decimal>> {
        self.distances.get(&station_id)
    }
}
