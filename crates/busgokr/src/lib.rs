//! Client for the Seoul bus.go.kr transit open-data service
//!
//! Looks up bus routes, stations, arrival predictions, vehicle positions and
//! subway stations, turning the service's loosely typed JSON envelopes into
//! typed values and typed errors.
//!
//! # Architecture
//!
//! [`EndpointRegistry`] maps operation names to `*.bms` URLs and their query
//! parameters. [`BusClient`] implements [`BusApi`] on top of a [`Transport`]
//! (HTTP via [`HttpTransport`] by default): it fetches, checks the response
//! envelope, maps every row and promotes empty results to the not-found kind
//! of [`BusError`] that fits the operation. Waypoints and search distances
//! that should be remembered go into the caller-owned [`RouteWaypoints`] and
//! [`StationDistances`] stores.
//!
//! # Example
//!
//! ```rust,ignore
//! use busgokr::{BusApi, BusClient, BusConfig, RouteLookup};
//!
//! let client = BusClient::new(&BusConfig::default())?;
//!
//! match client.get_bus_route(None, Some("N26")).await? {
//!     RouteLookup::Single(route) => println!("{route}: every {:?} min", route.interval),
//!     RouteLookup::Many(routes) => println!("{} routes", routes.len()),
//! }
//! ```

mod client;
mod config;
pub mod endpoints;
pub mod envelope;
mod error;
pub mod mapping;
mod models;
mod store;
mod transport;

pub use client::{BusApi, BusClient};
pub use config::BusConfig;
pub use endpoints::{ApiScope, EndpointRegistry, EndpointTemplate, QueryEncoding};
pub use envelope::Decoded;
pub use error::{BusError, TransportError};
pub use models::{
    ArrivingVehicle, BusArrivalInfo, BusOperatingTimes, BusPosition, BusRoute, BusRouteWaypoint,
    BusStation, Coordinates, CorrectionFactors, GeoPoint, NearbyStation, RouteLookup, RouteType,
    ServiceTime, SubwayStation, WaypointDetail,
};
pub use store::{RouteWaypoints, StationDistances, WaypointKind};
pub use transport::{HttpTransport, Transport};
