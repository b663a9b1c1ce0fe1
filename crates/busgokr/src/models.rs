//! Bus data models
//!
//! Typed representations of routes, waypoints, stations, arrival predictions
//! and vehicle positions as reported by the bus.go.kr open-data service.

use std::fmt;

use chrono::{NaiveDateTime, NaiveTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A coordinate pair in one reference system
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GeoPoint {
    /// Longitude (WGS-84) or easting (TM)
    pub x: Decimal,
    /// Latitude (WGS-84) or northing (TM)
    pub y: Decimal,
}

impl GeoPoint {
    /// Create a point
    #[must_use]
    pub const fn new(x: Decimal, y: Decimal) -> Self {
        Self { x, y }
    }
}

impl fmt::Display for GeoPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// WGS-84 and Korea 1985 TM coordinates of one location
///
/// Endpoints report one pair, the other, or both; at least one is always set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "CoordinatePairs")]
pub struct Coordinates {
    #[serde(skip_serializing_if = "Option::is_none")]
    gps: Option<GeoPoint>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tm: Option<GeoPoint>,
}

impl Coordinates {
    /// Combine the pairs found in a payload, `None` if neither is present
    #[must_use]
    pub const fn from_pairs(gps: Option<GeoPoint>, tm: Option<GeoPoint>) -> Option<Self> {
        if gps.is_none() && tm.is_none() {
            return None;
        }
        Some(Self { gps, tm })
    }

    /// Coordinates known only in WGS-84
    #[must_use]
    pub const fn gps_only(point: GeoPoint) -> Self {
        Self {
            gps: Some(point),
            tm: None,
        }
    }

    /// Coordinates known only in TM
    #[must_use]
    pub const fn tm_only(point: GeoPoint) -> Self {
        Self {
            gps: None,
            tm: Some(point),
        }
    }

    /// WGS-84 pair (longitude, latitude)
    #[must_use]
    pub const fn gps(&self) -> Option<GeoPoint> {
        self.gps
    }

    /// Korea 1985 TM pair (easting, northing)
    #[must_use]
    pub const fn tm(&self) -> Option<GeoPoint> {
        self.tm
    }
}

#[derive(Deserialize)]
struct CoordinatePairs {
    #[serde(default)]
    gps: Option<GeoPoint>,
    #[serde(default)]
    tm: Option<GeoPoint>,
}

impl TryFrom<CoordinatePairs> for Coordinates {
    type Error = &'static str;

    fn try_from(pairs: CoordinatePairs) -> Result<Self, Self::Error> {
        Self::from_pairs(pairs.gps, pairs.tm).ok_or("coordinates need a gps or tm pair")
    }
}

/// Route category as used by `routeType` and the `stRttp` search parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteType {
    /// Shared / public
    Public,
    /// Airport limousine
    Airport,
    /// Village (maeul) bus
    Village,
    /// Trunk (blue)
    Trunk,
    /// Branch (green)
    Branch,
    /// Circular (yellow)
    Circle,
    /// Wide-area express (red)
    Express,
    /// Incheon
    Incheon,
    /// Gyeonggi
    Gyeonggi,
    /// Any code outside the documented set
    Other(i64),
}

impl RouteType {
    /// Map an upstream category code
    #[must_use]
    pub const fn from_code(code: i64) -> Self {
        match code {
            0 => Self::Public,
            1 => Self::Airport,
            2 => Self::Village,
            3 => Self::Trunk,
            4 => Self::Branch,
            5 => Self::Circle,
            6 => Self::Express,
            7 => Self::Incheon,
            8 => Self::Gyeonggi,
            other => Self::Other(other),
        }
    }

    /// Upstream category code
    #[must_use]
    pub const fn code(self) -> i64 {
        match self {
            Self::Public => 0,
            Self::Airport => 1,
            Self::Village => 2,
            Self::Trunk => 3,
            Self::Branch => 4,
            Self::Circle => 5,
            Self::Express => 6,
            Self::Incheon => 7,
            Self::Gyeonggi => 8,
            Self::Other(code) => code,
        }
    }

    /// Human-readable label
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Public => "public",
            Self::Airport => "airport",
            Self::Village => "village",
            Self::Trunk => "trunk",
            Self::Branch => "branch",
            Self::Circle => "circle",
            Self::Express => "express",
            Self::Incheon => "incheon",
            Self::Gyeonggi => "gyeonggi",
            Self::Other(_) => "other",
        }
    }
}

impl fmt::Display for RouteType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// First/last service time; listings report either a full timestamp or a time of day
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ServiceTime {
    /// `YYYYMMDDHHMMSS`
    Timestamp(NaiveDateTime),
    /// `HH:MM`
    TimeOfDay(NaiveTime),
}

impl ServiceTime {
    /// Time of day regardless of representation
    #[must_use]
    pub fn time(&self) -> NaiveTime {
        match self {
            Self::Timestamp(ts) => ts.time(),
            Self::TimeOfDay(t) => *t,
        }
    }
}

/// A bus route
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusRoute {
    /// Route identifier (`busRouteId`)
    pub id: i64,
    /// Display name, e.g. "N26"
    pub name: String,
    /// Operating company; not reported by every listing
    #[serde(skip_serializing_if = "Option::is_none")]
    pub corporation: Option<String>,
    /// Route category
    #[serde(skip_serializing_if = "Option::is_none")]
    pub route_type: Option<RouteType>,
    /// Service interval in minutes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interval: Option<u32>,
    /// Route length
    #[serde(skip_serializing_if = "Option::is_none")]
    pub length: Option<f64>,
    /// First stop name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_station: Option<String>,
    /// Last stop name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_station: Option<String>,
    /// First regular departure
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_bus: Option<ServiceTime>,
    /// Last regular departure
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_bus: Option<ServiceTime>,
    /// First low-floor departure
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_low_bus: Option<ServiceTime>,
    /// Last low-floor departure
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_low_bus: Option<ServiceTime>,
}

impl BusRoute {
    /// Display size of the route, which is its length (0 when unknown)
    #[must_use]
    pub fn size(&self) -> f64 {
        self.length.unwrap_or_default()
    }
}

impl fmt::Display for BusRoute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// Result of the composite route lookup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RouteLookup {
    /// Exactly one route matched
    Single(BusRoute),
    /// Several routes matched the name
    Many(Vec<BusRoute>),
}

impl RouteLookup {
    /// Collapse a single match into `Single`
    #[must_use]
    pub fn from_matches(mut routes: Vec<BusRoute>) -> Self {
        if routes.len() == 1 {
            if let Some(route) = routes.pop() {
                return Self::Single(route);
            }
        }
        Self::Many(routes)
    }

    /// All matched routes
    #[must_use]
    pub fn into_routes(self) -> Vec<BusRoute> {
        match self {
            Self::Single(route) => vec![route],
            Self::Many(routes) => routes,
        }
    }
}

/// One point along a route, optionally enriched with station data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusRouteWaypoint {
    /// Location of the waypoint
    pub coordinates: Coordinates,
    /// Station data; present only for waypoints from the detailed listing
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<WaypointDetail>,
}

impl BusRouteWaypoint {
    /// Whether this waypoint carries station data
    #[must_use]
    pub const fn is_detailed(&self) -> bool {
        self.detail.is_some()
    }
}

/// Station data attached to a detailed waypoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaypointDetail {
    /// Station identifier
    pub station_id: i64,
    /// Station name
    pub station_name: String,
    /// Public short code; leading zeros are significant
    #[serde(skip_serializing_if = "Option::is_none")]
    pub serial_number: Option<String>,
    /// Position of the stop within the route
    pub sequence: u32,
    /// Speed on the section leading to this stop
    #[serde(skip_serializing_if = "Option::is_none")]
    pub section_speed: Option<u32>,
    /// Cumulative section distance
    #[serde(skip_serializing_if = "Option::is_none")]
    pub section_distance: Option<Decimal>,
    /// The route turns around at this stop
    pub turnaround: bool,
    /// Transfers are possible at this stop
    pub transfer: bool,
    /// First service at this stop
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_time: Option<NaiveTime>,
    /// Last service at this stop
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_time: Option<NaiveTime>,
}

/// A bus station
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusStation {
    /// Station identifier
    pub id: i64,
    /// Display name
    pub name: String,
    /// Public short code (`arsId`); leading zeros are significant
    #[serde(skip_serializing_if = "Option::is_none")]
    pub serial_number: Option<String>,
    /// Location of the station
    pub coordinates: Coordinates,
    /// Station type code
    #[serde(skip_serializing_if = "Option::is_none")]
    pub station_type: Option<i64>,
}

impl fmt::Display for BusStation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.serial_number {
            Some(serial) => write!(f, "{} [{serial}]", self.name),
            None => write!(f, "{}", self.name),
        }
    }
}

/// A station returned by a position search, with its distance from the query point
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NearbyStation {
    /// The station
    pub station: BusStation,
    /// Point the search was made from
    pub query: GeoPoint,
    /// Distance between `query` and the station
    pub distance: Decimal,
}

/// Corrections applied by the upstream prediction model
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorrectionFactors {
    /// Average-based correction
    #[serde(skip_serializing_if = "Option::is_none")]
    pub average: Option<Decimal>,
    /// Exponential smoothing correction
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exponential: Option<Decimal>,
    /// Kalman filter correction
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kalman: Option<Decimal>,
    /// Neural network correction
    #[serde(skip_serializing_if = "Option::is_none")]
    pub neural: Option<Decimal>,
}

/// A vehicle approaching a station
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArrivingVehicle {
    /// Vehicle identifier
    pub vehicle_id: i64,
    /// License plate
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plate_number: Option<String>,
    /// Section the vehicle is currently in
    #[serde(skip_serializing_if = "Option::is_none")]
    pub section_order: Option<u32>,
    /// Name of the station the vehicle is currently at or past
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_station: Option<String>,
    /// Estimated travel time in seconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub travel_time_secs: Option<u32>,
    /// Estimated travel speed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub travel_speed: Option<u32>,
    /// The vehicle has arrived
    pub arrived: bool,
    /// This is the last vehicle of the day
    pub is_last: bool,
    /// Prediction model corrections
    pub correction: CorrectionFactors,
}

/// Arrival prediction for one route at one station
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusArrivalInfo {
    /// Station identifier
    pub station_id: i64,
    /// Station name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub station_name: Option<String>,
    /// Station short code
    #[serde(skip_serializing_if = "Option::is_none")]
    pub serial_number: Option<String>,
    /// Route identifier
    pub route_id: i64,
    /// Route name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub route_name: Option<String>,
    /// Direction of travel
    #[serde(skip_serializing_if = "Option::is_none")]
    pub direction: Option<String>,
    /// Service interval in minutes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interval: Option<u32>,
    /// The last bus of the day has already left
    pub last_bus_departed: bool,
    /// When the prediction was made
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requested_at: Option<NaiveDateTime>,
    /// Next arriving vehicle
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_vehicle: Option<ArrivingVehicle>,
    /// Vehicle after the next one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub following_vehicle: Option<ArrivingVehicle>,
}

/// Service hours of a route at one station
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusOperatingTimes {
    /// Route name
    pub route_name: String,
    /// Route identifier
    #[serde(skip_serializing_if = "Option::is_none")]
    pub route_id: Option<i64>,
    /// Station short code
    #[serde(skip_serializing_if = "Option::is_none")]
    pub serial_number: Option<String>,
    /// Station name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub station_name: Option<String>,
    /// First regular departure
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_bus: Option<NaiveDateTime>,
    /// Last regular departure
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_bus: Option<NaiveDateTime>,
    /// First low-floor departure
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_low_bus: Option<NaiveDateTime>,
    /// Last low-floor departure
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_low_bus: Option<NaiveDateTime>,
}

/// Live position of a vehicle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusPosition {
    /// Vehicle identifier
    pub vehicle_id: i64,
    /// License plate
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plate_number: Option<String>,
    /// Section the vehicle is in
    #[serde(skip_serializing_if = "Option::is_none")]
    pub section_order: Option<u32>,
    /// Location of the vehicle
    pub coordinates: Coordinates,
    /// Distance travelled within the current section
    #[serde(skip_serializing_if = "Option::is_none")]
    pub section_distance: Option<Decimal>,
    /// The vehicle is stopped at a station
    pub stopped: bool,
    /// This is the last vehicle of the day
    pub is_last: bool,
    /// The vehicle is in service
    pub running: bool,
    /// When the position was recorded
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recorded_at: Option<NaiveDateTime>,
}

/// A subway station
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubwayStation {
    /// Station identifier
    pub id: i64,
    /// Station name
    pub name: String,
    /// Line identifier
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line_id: Option<i64>,
    /// Line name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line_name: Option<String>,
}

impl fmt::Display for SubwayStation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.line_name {
            Some(line) => write!(f, "{} ({line})", self.name),
            None => write!(f, "{}", self.name),
        }
    }
}
