//! bus.go.kr resolution strategies
//!
//! Each operation builds its URL from the [`EndpointRegistry`], fetches it
//! through a [`Transport`], classifies the envelope and maps every row. Empty
//! results become the not-found kind that fits the selector; the two
//! composite lookups fall back from one selector to the next and report every
//! failed attempt.

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde_json::Value;
use tracing::{debug, instrument};

use crate::config::BusConfig;
use crate::endpoints::{ApiScope, EndpointRegistry, operation};
use crate::envelope::{self, Decoded};
use crate::error::BusError;
use crate::mapping::{self, RouteTimes};
use crate::models::{
    BusArrivalInfo, BusOperatingTimes, BusPosition, BusRoute, BusRouteWaypoint, BusStation,
    GeoPoint, NearbyStation, RouteLookup, RouteType, SubwayStation,
};
use crate::transport::{HttpTransport, Transport};

/// Operations offered by the bus.go.kr service
#[async_trait]
pub trait BusApi: Send + Sync {
    /// Look up a route by its identifier
    async fn get_route_by_id(&self, route_id: i64) -> Result<BusRoute, BusError>;

    /// Search routes whose name contains `name`
    async fn search_routes(&self, name: &str) -> Result<Vec<BusRoute>, BusError>;

    /// Search low-floor routes whose name contains `name`
    async fn search_low_floor_routes(&self, name: &str) -> Result<Vec<BusRoute>, BusError>;

    /// Search routes of one category whose name contains `name`
    async fn search_routes_by_type(
        &self,
        name: &str,
        route_type: RouteType,
    ) -> Result<Vec<BusRoute>, BusError>;

    /// All night routes; service times are times of day
    async fn night_routes(&self) -> Result<Vec<BusRoute>, BusError>;

    /// All airport routes
    async fn airport_routes(&self) -> Result<Vec<BusRoute>, BusError>;

    /// Routes serving the station with serial number `ars_id`
    async fn routes_by_station(&self, ars_id: &str) -> Result<Vec<BusRoute>, BusError>;

    /// Coordinates of every point along a route
    async fn route_waypoints(&self, route_id: i64) -> Result<Vec<BusRouteWaypoint>, BusError>;

    /// Stations along a route, in route order
    async fn route_waypoints_detailed(
        &self,
        route_id: i64,
    ) -> Result<Vec<BusRouteWaypoint>, BusError>;

    /// Arrival prediction for one route at one station
    async fn arrival_info(
        &self,
        route_id: i64,
        station_id: i64,
        ord: u32,
    ) -> Result<BusArrivalInfo, BusError>;

    /// Arrival predictions for every station of a route
    async fn arrivals_by_route(&self, route_id: i64) -> Result<Vec<BusArrivalInfo>, BusError>;

    /// Stations within `radius` meters of a point
    async fn stations_by_position(
        &self,
        x: Decimal,
        y: Decimal,
        radius: u32,
    ) -> Result<Vec<NearbyStation>, BusError>;

    /// Routes passing within `radius` meters of a point
    async fn routes_by_position(
        &self,
        x: Decimal,
        y: Decimal,
        radius: u32,
    ) -> Result<Vec<BusRoute>, BusError>;

    /// Stations whose name contains `name`
    async fn stations_by_name(&self, name: &str) -> Result<Vec<BusStation>, BusError>;

    /// First and last departures of a route at a station
    async fn operating_times(
        &self,
        ars_id: &str,
        route_id: i64,
    ) -> Result<BusOperatingTimes, BusError>;

    /// Live positions of every vehicle on a route
    async fn vehicle_positions_by_route(&self, route_id: i64)
    -> Result<Vec<BusPosition>, BusError>;

    /// Live position of one vehicle
    async fn vehicle_position(&self, vehicle_id: i64) -> Result<BusPosition, BusError>;

    /// Subway stations whose name contains `name`
    async fn subway_stations_by_name(&self, name: &str) -> Result<Vec<SubwayStation>, BusError>;

    /// Resolve a route by id, falling back to a name search
    ///
    /// A single name match collapses to [`RouteLookup::Single`].
    ///
    /// # Errors
    ///
    /// `MissingParameters` without any selector (no request is made),
    /// `BusRouteNotFound` with every collected message when all selectors
    /// fail, and any other error unchanged as soon as it occurs.
    #[instrument(skip(self))]
    async fn get_bus_route(
        &self,
        route_id: Option<i64>,
        name: Option<&str>,
    ) -> Result<RouteLookup, BusError> {
        let name = name.map(str::trim).filter(|n| !n.is_empty());
        if route_id.is_none() && name.is_none() {
            return Err(BusError::MissingParameters(
                "a route id or a route name is required".to_string(),
            ));
        }

        let mut failures = LookupFailures::default();

        if let Some(route_id) = route_id {
            match self.get_route_by_id(route_id).await {
                Ok(route) => return Ok(RouteLookup::Single(route)),
                Err(err @ BusError::IdNotFound(_)) => failures.record(&err),
                Err(err) => return Err(err),
            }
        }

        if let Some(name) = name {
            match self.search_routes(name).await {
                Ok(routes) => return Ok(RouteLookup::from_matches(routes)),
                Err(err @ BusError::NameNotFound(_)) => failures.record(&err),
                Err(err) => return Err(err),
            }
        }

        Err(failures.into_route_not_found())
    }

    /// Search routes by category first, then by name alone
    ///
    /// The category search only runs for a non-empty name; an empty name goes
    /// straight to the plain listing.
    ///
    /// # Errors
    ///
    /// `BusRouteNotFound` with every collected message when all searches come
    /// back empty, and any other error unchanged as soon as it occurs.
    #[instrument(skip(self))]
    async fn find_bus_routes(
        &self,
        name: &str,
        route_type: Option<RouteType>,
    ) -> Result<Vec<BusRoute>, BusError> {
        let name = name.trim();
        let mut failures = LookupFailures::default();

        if let Some(route_type) = route_type.filter(|_| !name.is_empty()) {
            match self.search_routes_by_type(name, route_type).await {
                Ok(routes) => return Ok(routes),
                Err(err @ BusError::NameNotFound(_)) => failures.record(&err),
                Err(err) => return Err(err),
            }
        }

        match self.search_routes(name).await {
            Ok(routes) => Ok(routes),
            Err(err @ BusError::NameNotFound(_)) => {
                failures.record(&err);
                Err(failures.into_route_not_found())
            }
            Err(err) => Err(err),
        }
    }
}

/// Not-found messages collected across fallback steps
#[derive(Debug, Default)]
struct LookupFailures {
    messages: Vec<String>,
}

impl LookupFailures {
    fn record(&mut self, err: &BusError) {
        debug!(%err, "Lookup step found nothing");
        self.messages.push(err.to_string());
    }

    fn into_route_not_found(self) -> BusError {
        BusError::BusRouteNotFound(self.messages.join(", "))
    }
}

/// Client for the bus.go.kr open-data service
#[derive(Debug)]
pub struct BusClient<T = HttpTransport> {
    registry: EndpointRegistry,
    transport: T,
}

impl BusClient<HttpTransport> {
    /// Create a client talking HTTP to the configured service
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationError` for an invalid configuration and a
    /// transport error if the HTTP client cannot be initialized.
    pub fn new(config: &BusConfig) -> Result<Self, BusError> {
        config.validate().map_err(BusError::ConfigurationError)?;
        let transport = HttpTransport::new(config)?;
        Ok(Self::with_transport(
            EndpointRegistry::new(&config.base_url),
            transport,
        ))
    }
}

impl<T: Transport> BusClient<T> {
    /// Create a client from an explicit registry and transport
    #[must_use]
    pub const fn with_transport(registry: EndpointRegistry, transport: T) -> Self {
        Self {
            registry,
            transport,
        }
    }

    /// Registry this client resolves operations against
    #[must_use]
    pub const fn registry(&self) -> &EndpointRegistry {
        &self.registry
    }

    async fn fetch(
        &self,
        scope: ApiScope,
        operation: &str,
        values: &[String],
    ) -> Result<Decoded, BusError> {
        let url = self.registry.lookup(scope, operation)?.build_url(values)?;
        debug!(%url, operation, "Requesting");
        let body = self.transport.get_json(&url).await?;
        envelope::decode(body)
    }

    async fn fetch_bus(&self, operation: &str, values: &[String]) -> Result<Decoded, BusError> {
        self.fetch(ApiScope::Bus, operation, values).await
    }
}

fn map_rows<R>(
    rows: Vec<Value>,
    mapper: impl Fn(Value) -> Result<R, BusError>,
) -> Result<Vec<R>, BusError> {
    let mapped = rows.into_iter().map(mapper).collect::<Result<Vec<_>, _>>()?;
    debug!(count = mapped.len(), "Mapped results");
    Ok(mapped)
}

/// First row of a lookup; extra rows are ignored
fn first_row(rows: Vec<Value>) -> Result<Value, BusError> {
    rows.into_iter()
        .next()
        .ok_or_else(|| BusError::MalformedResponse("empty result list".to_string()))
}

fn timestamp_route(row: Value) -> Result<BusRoute, BusError> {
    mapping::bus_route(row, RouteTimes::Timestamp)
}

#[async_trait]
impl<T: Transport> BusApi for BusClient<T> {
    #[instrument(skip(self))]
    async fn get_route_by_id(&self, route_id: i64) -> Result<BusRoute, BusError> {
        let rows = self
            .fetch_bus(operation::ROUTE_INFO, &[route_id.to_string()])
            .await?
            .or_not_found(|| {
                BusError::IdNotFound(format!("No busroute with id {route_id} found."))
            })?;
        timestamp_route(first_row(rows)?)
    }

    #[instrument(skip(self))]
    async fn search_routes(&self, name: &str) -> Result<Vec<BusRoute>, BusError> {
        let rows = self
            .fetch_bus(operation::ROUTE_LIST, &[name.to_string()])
            .await?
            .or_not_found(|| {
                BusError::NameNotFound(format!("No busroutes with name {name} found."))
            })?;
        map_rows(rows, timestamp_route)
    }

    #[instrument(skip(self))]
    async fn search_low_floor_routes(&self, name: &str) -> Result<Vec<BusRoute>, BusError> {
        let rows = self
            .fetch_bus(operation::ROUTE_LIST_LOW, &[name.to_string()])
            .await?
            .or_not_found(|| {
                BusError::NameNotFound(format!("No low floor busroutes with name {name} found."))
            })?;
        map_rows(rows, timestamp_route)
    }

    #[instrument(skip(self))]
    async fn search_routes_by_type(
        &self,
        name: &str,
        route_type: RouteType,
    ) -> Result<Vec<BusRoute>, BusError> {
        let rows = self
            .fetch_bus(
                operation::ROUTE_LIST_BY_TYPE,
                &[name.to_string(), route_type.code().to_string()],
            )
            .await?
            .or_not_found(|| {
                BusError::NameNotFound(format!(
                    "No {route_type} busroutes with name {name} found."
                ))
            })?;
        map_rows(rows, timestamp_route)
    }

    #[instrument(skip(self))]
    async fn night_routes(&self) -> Result<Vec<BusRoute>, BusError> {
        let rows = self
            .fetch_bus(operation::ROUTE_LIST_NIGHT, &[])
            .await?
            .into_rows();
        map_rows(rows, |row| mapping::bus_route(row, RouteTimes::TimeOfDay))
    }

    #[instrument(skip(self))]
    async fn airport_routes(&self) -> Result<Vec<BusRoute>, BusError> {
        let rows = self
            .fetch_bus(operation::ROUTE_LIST_AIRPORT, &[])
            .await?
            .into_rows();
        map_rows(rows, timestamp_route)
    }

    #[instrument(skip(self))]
    async fn routes_by_station(&self, ars_id: &str) -> Result<Vec<BusRoute>, BusError> {
        let rows = self
            .fetch_bus(operation::ROUTES_BY_STATION, &[ars_id.to_string()])
            .await?
            .or_not_found(|| {
                BusError::IdNotFound(format!("No busroutes for station {ars_id} found."))
            })?;
        map_rows(rows, timestamp_route)
    }

    #[instrument(skip(self))]
    async fn route_waypoints(&self, route_id: i64) -> Result<Vec<BusRouteWaypoint>, BusError> {
        let rows = self
            .fetch_bus(operation::ROUTE_PATH, &[route_id.to_string()])
            .await?
            .or_not_found(|| {
                BusError::IdNotFound(format!("No waypoints for busroute with id {route_id} found."))
            })?;
        map_rows(rows, mapping::waypoint)
    }

    #[instrument(skip(self))]
    async fn route_waypoints_detailed(
        &self,
        route_id: i64,
    ) -> Result<Vec<BusRouteWaypoint>, BusError> {
        let rows = self
            .fetch_bus(operation::ROUTE_PATH_DETAILED, &[route_id.to_string()])
            .await?
            .or_not_found(|| {
                BusError::IdNotFound(format!("No stations for busroute with id {route_id} found."))
            })?;
        let waypoints = rows
            .into_iter()
            .enumerate()
            .map(|(index, row)| mapping::detailed_waypoint(row, index + 1))
            .collect::<Result<Vec<_>, _>>()?;
        debug!(count = waypoints.len(), "Mapped results");
        Ok(waypoints)
    }

    #[instrument(skip(self))]
    async fn arrival_info(
        &self,
        route_id: i64,
        station_id: i64,
        ord: u32,
    ) -> Result<BusArrivalInfo, BusError> {
        let rows = self
            .fetch_bus(
                operation::ARRIVAL_INFO_BY_ROUTE_AND_STATION,
                &[route_id.to_string(), station_id.to_string(), ord.to_string()],
            )
            .await?
            .or_not_found(|| {
                BusError::IdNotFound(format!(
                    "No arrival info for busroute {route_id} at station {station_id} found."
                ))
            })?;
        mapping::arrival_info(first_row(rows)?)
    }

    #[instrument(skip(self))]
    async fn arrivals_by_route(&self, route_id: i64) -> Result<Vec<BusArrivalInfo>, BusError> {
        let rows = self
            .fetch_bus(operation::ARRIVAL_INFO_BY_ROUTE, &[route_id.to_string()])
            .await?
            .or_not_found(|| {
                BusError::IdNotFound(format!(
                    "No arrival info for busroute with id {route_id} found."
                ))
            })?;
        map_rows(rows, mapping::arrival_info)
    }

    #[instrument(skip(self))]
    async fn stations_by_position(
        &self,
        x: Decimal,
        y: Decimal,
        radius: u32,
    ) -> Result<Vec<NearbyStation>, BusError> {
        let query = GeoPoint::new(x, y);
        let rows = self
            .fetch_bus(
                operation::STATIONS_BY_POSITION,
                &[x.to_string(), y.to_string(), radius.to_string()],
            )
            .await?
            .or_not_found(|| {
                BusError::NoStationAtPosition(format!(
                    "No stations within {radius}m of {query} found."
                ))
            })?;
        map_rows(rows, |row| mapping::nearby_station(row, query))
    }

    #[instrument(skip(self))]
    async fn routes_by_position(
        &self,
        x: Decimal,
        y: Decimal,
        radius: u32,
    ) -> Result<Vec<BusRoute>, BusError> {
        let query = GeoPoint::new(x, y);
        let rows = self
            .fetch_bus(
                operation::ROUTES_BY_POSITION,
                &[x.to_string(), y.to_string(), radius.to_string()],
            )
            .await?
            .or_not_found(|| {
                BusError::NoRouteAtPosition(format!(
                    "No busroutes within {radius}m of {query} found."
                ))
            })?;
        map_rows(rows, timestamp_route)
    }

    #[instrument(skip(self))]
    async fn stations_by_name(&self, name: &str) -> Result<Vec<BusStation>, BusError> {
        let rows = self
            .fetch_bus(operation::STATION_BY_NAME, &[name.to_string()])
            .await?
            .or_not_found(|| {
                BusError::NameNotFound(format!("No stations with name {name} found."))
            })?;
        map_rows(rows, mapping::named_station)
    }

    #[instrument(skip(self))]
    async fn operating_times(
        &self,
        ars_id: &str,
        route_id: i64,
    ) -> Result<BusOperatingTimes, BusError> {
        let rows = self
            .fetch_bus(
                operation::OPERATING_TIMES_BY_STATION_AND_ROUTE,
                &[ars_id.to_string(), route_id.to_string()],
            )
            .await?
            .or_not_found(|| {
                BusError::IdNotFound(format!(
                    "No operating times for busroute {route_id} at station {ars_id} found."
                ))
            })?;
        mapping::operating_times(first_row(rows)?)
    }

    #[instrument(skip(self))]
    async fn vehicle_positions_by_route(
        &self,
        route_id: i64,
    ) -> Result<Vec<BusPosition>, BusError> {
        let rows = self
            .fetch_bus(operation::BUS_POSITION_BY_ROUTE, &[route_id.to_string()])
            .await?
            .or_not_found(|| {
                BusError::IdNotFound(format!("No buses on busroute with id {route_id} found."))
            })?;
        map_rows(rows, mapping::bus_position)
    }

    #[instrument(skip(self))]
    async fn vehicle_position(&self, vehicle_id: i64) -> Result<BusPosition, BusError> {
        let rows = self
            .fetch_bus(operation::BUS_POSITION_BY_VEHICLE, &[vehicle_id.to_string()])
            .await?
            .or_not_found(|| BusError::IdNotFound(format!("No bus with id {vehicle_id} found.")))?;
        mapping::bus_position(first_row(rows)?)
    }

    #[instrument(skip(self))]
    async fn subway_stations_by_name(&self, name: &str) -> Result<Vec<SubwayStation>, BusError> {
        let rows = self
            .fetch(
                ApiScope::Subway,
                operation::SUBWAY_STATION_BY_NAME,
                &[name.to_string()],
            )
            .await?
            .or_not_found(|| {
                BusError::NameNotFound(format!("No subway stations with name {name} found."))
            })?;
        map_rows(rows, mapping::subway_station)
    }
}
