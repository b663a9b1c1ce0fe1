//! Endpoint registry
//!
//! Maps semantic operation names to the upstream `*.bms` paths and the
//! ordered query parameters each one takes. The registry is built once from
//! the configured base URL and handed to the client, so tests can point it
//! at a mock server.

use std::collections::HashMap;
use std::fmt;

use crate::error::BusError;

/// Sub-API an operation belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ApiScope {
    /// Bus routes, stations, arrivals and vehicle positions
    Bus,
    /// Subway stations, arrivals and timetables
    Subway,
    /// Journey planning
    Path,
}

impl ApiScope {
    /// URL path segment of this sub-API
    #[must_use]
    pub const fn segment(self) -> &'static str {
        match self {
            Self::Bus => "bus",
            Self::Subway => "subway",
            Self::Path => "path",
        }
    }
}

impl fmt::Display for ApiScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.segment())
    }
}

/// How query values are percent-encoded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryEncoding {
    /// Encoded once
    Single,
    /// Encoded twice; the service decodes station-name searches one extra time
    Double,
}

/// Static description of one upstream endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Endpoint {
    /// File name below the scope path, e.g. `getRouteInfo.bms`
    pub path: &'static str,
    /// Query parameter names, in the order values are supplied
    pub params: &'static [&'static str],
    /// Encoding applied to every query value
    pub encoding: QueryEncoding,
}

impl Endpoint {
    const fn new(path: &'static str, params: &'static [&'static str]) -> Self {
        Self {
            path,
            params,
            encoding: QueryEncoding::Single,
        }
    }

    const fn double_encoded(path: &'static str, params: &'static [&'static str]) -> Self {
        Self {
            path,
            params,
            encoding: QueryEncoding::Double,
        }
    }
}

/// Operation names understood by the registry
pub mod operation {
    pub const ROUTE_INFO: &str = "route_info";
    pub const ROUTE_LIST: &str = "route_list";
    pub const ROUTE_LIST_LOW: &str = "route_list_low";
    pub const ROUTE_LIST_NIGHT: &str = "route_list_night";
    pub const ROUTE_LIST_AIRPORT: &str = "route_list_airport";
    pub const ROUTE_LIST_BY_TYPE: &str = "route_list_by_type";
    pub const ROUTE_PATH: &str = "route_path";
    pub const ROUTE_PATH_DETAILED: &str = "route_path_detailed";
    pub const ROUTE_PATH_REALTIME: &str = "route_path_realtime";
    pub const ROUTE_PATH_REALTIME_LOW: &str = "route_path_realtime_low";
    pub const ARRIVAL_INFO_BY_ROUTE: &str = "arrival_info_by_route";
    pub const ARRIVAL_INFO_BY_ROUTE_AND_STATION: &str = "arrival_info_by_route_and_station";
    pub const STATIONS_BY_POSITION: &str = "stations_by_position";
    pub const ROUTES_BY_POSITION: &str = "routes_by_position";
    pub const STATION_BY_NAME: &str = "station_by_name";
    pub const STATION_BY_NAME_LOW: &str = "station_by_name_low";
    pub const ROUTES_BY_STATION: &str = "routes_by_station";
    pub const ROUTES_BY_STATION_REALTIME: &str = "routes_by_station_realtime";
    pub const ROUTES_BY_STATION_REALTIME_LOW: &str = "routes_by_station_realtime_low";
    pub const OPERATING_TIMES_BY_STATION_AND_ROUTE: &str = "operating_times_by_station_and_route";
    pub const BUS_POSITION_BY_ROUTE: &str = "bus_position_by_route";
    pub const BUS_POSITION_BY_ROUTE_LOW: &str = "bus_position_by_route_low";
    pub const BUS_POSITION_BY_VEHICLE: &str = "bus_position_by_vehicle";

    pub const SUBWAY_STATION_BY_ROUTE: &str = "station_by_route";
    pub const SUBWAY_STATION_BY_NAME: &str = "station_by_name";
    pub const SUBWAY_ARRIVAL_INFO: &str = "arrival_info_by_route_and_station";
    pub const SUBWAY_STATION_BY_ID: &str = "station_by_id";
    pub const SUBWAY_TIMETABLE_BY_STATION: &str = "timetable_by_station";
    pub const SUBWAY_LAST_TRAIN_BY_STATION: &str = "last_train_by_station";
    pub const SUBWAY_BUS_BY_STATION: &str = "bus_by_station";
    pub const SUBWAY_STATION_POSITION_BY_ID: &str = "station_position_by_id";
    pub const SUBWAY_ENTRANCE_INFO_BY_STATION: &str = "entrance_info_by_station";
    pub const SUBWAY_TRAIN_INFO_BY_STATION: &str = "train_info_by_station";

    pub const PATH_CLOSEST_STATION_BY_POSITION: &str = "closest_station_by_position";
    pub const PATH_LOCATION_BY_NAME: &str = "location_by_name";
    pub const PATH_BY_BUS: &str = "path_by_bus";
    pub const PATH_BY_SUBWAY: &str = "path_by_subway";
    pub const PATH_BY_BUS_AND_SUBWAY: &str = "path_by_bus_and_subway";
}

const POSITION: &[&str] = &["tmX", "tmY", "radius"];
const JOURNEY: &[&str] = &["startX", "startY", "endX", "endY"];

const BUS_ENDPOINTS: &[(&str, Endpoint)] = &[
    (operation::ROUTE_INFO, Endpoint::new("getRouteInfo.bms", &["busRouteId"])),
    (operation::ROUTE_LIST, Endpoint::new("getBusRouteList.bms", &["strSrch"])),
    (operation::ROUTE_LIST_LOW, Endpoint::new("getLowBusRoute.bms", &["strSrch"])),
    (operation::ROUTE_LIST_NIGHT, Endpoint::new("getNBusRoute.bms", &[])),
    (operation::ROUTE_LIST_AIRPORT, Endpoint::new("getAirBusRoute.bms", &[])),
    (operation::ROUTE_LIST_BY_TYPE, Endpoint::new("getRttpRoute.bms", &["strSrch", "stRttp"])),
    (operation::ROUTE_PATH, Endpoint::new("getRoutePath.bms", &["busRouteId"])),
    (operation::ROUTE_PATH_DETAILED, Endpoint::new("getStaionByRoute.bms", &["busRouteId"])),
    (operation::ROUTE_PATH_REALTIME, Endpoint::new("getRttpRouteAndPos.bms", &["busRouteId"])),
    (operation::ROUTE_PATH_REALTIME_LOW, Endpoint::new("getLowRouteAndPos.bms", &["busRouteId"])),
    (operation::ARRIVAL_INFO_BY_ROUTE, Endpoint::new("getArrInfoByRouteAll.bms", &["busRouteId"])),
    (
        operation::ARRIVAL_INFO_BY_ROUTE_AND_STATION,
        Endpoint::new("getArrInfoByRoute.bms", &["busRouteId", "stId", "ord"]),
    ),
    (operation::STATIONS_BY_POSITION, Endpoint::new("getStationByPos.bms", POSITION)),
    (operation::ROUTES_BY_POSITION, Endpoint::new("getNearRouteByPos.bms", POSITION)),
    (operation::STATION_BY_NAME, Endpoint::double_encoded("getStationByName.bms", &["stSrch"])),
    (
        operation::STATION_BY_NAME_LOW,
        Endpoint::double_encoded("getLowStationByName.bms", &["stSrch"]),
    ),
    (operation::ROUTES_BY_STATION, Endpoint::new("getRouteByStation.bms", &["arsId"])),
    (operation::ROUTES_BY_STATION_REALTIME, Endpoint::new("getStationByUid.bms", &["arsId"])),
    (
        operation::ROUTES_BY_STATION_REALTIME_LOW,
        Endpoint::new("getLowStationByUid.bms", &["arsId"]),
    ),
    (
        operation::OPERATING_TIMES_BY_STATION_AND_ROUTE,
        Endpoint::new("getBustimeByStation.bms", &["arsId", "busRouteId"]),
    ),
    (operation::BUS_POSITION_BY_ROUTE, Endpoint::new("getBusPosByRtid.bms", &["busRouteId"])),
    (
        operation::BUS_POSITION_BY_ROUTE_LOW,
        Endpoint::new("getLowBusPosByRtid.bms", &["busRouteId"]),
    ),
    (operation::BUS_POSITION_BY_VEHICLE, Endpoint::new("getBusPosByVehId.bms", &["vehId"])),
];

const SUBWAY_ENDPOINTS: &[(&str, Endpoint)] = &[
    (operation::SUBWAY_STATION_BY_ROUTE, Endpoint::new("getStatnByRoute.bms", &["subwayId"])),
    (operation::SUBWAY_STATION_BY_NAME, Endpoint::new("getStatnByNm.bms", &["statnNm"])),
    (operation::SUBWAY_ARRIVAL_INFO, Endpoint::new("getArvlByInfo.bms", &["subwayId", "statnId"])),
    (operation::SUBWAY_STATION_BY_ID, Endpoint::new("getStatnById.bms", &["subwayId", "statnId"])),
    (
        operation::SUBWAY_TIMETABLE_BY_STATION,
        Endpoint::new("getPlanByStatn.bms", &["subwayId", "statnId", "tabType"]),
    ),
    (
        operation::SUBWAY_LAST_TRAIN_BY_STATION,
        Endpoint::new("getLastcarByStatn.bms", &["subwayId", "statnId"]),
    ),
    (operation::SUBWAY_BUS_BY_STATION, Endpoint::new("getBusByStation.bms", &["statnId"])),
    (
        operation::SUBWAY_STATION_POSITION_BY_ID,
        Endpoint::new("getStatnByIdPos.bms", &["subwayId", "statnId"]),
    ),
    (operation::SUBWAY_ENTRANCE_INFO_BY_STATION, Endpoint::new("getEntrcByInfo.bms", &["statnId"])),
    (
        operation::SUBWAY_TRAIN_INFO_BY_STATION,
        Endpoint::new("getStatnTrainInfo.bms", &["subwayId", "statnId"]),
    ),
];

const PATH_ENDPOINTS: &[(&str, Endpoint)] = &[
    (
        operation::PATH_CLOSEST_STATION_BY_POSITION,
        Endpoint::new("getNearStationByPos.bms", POSITION),
    ),
    (operation::PATH_LOCATION_BY_NAME, Endpoint::new("getLocationInfo.bms", &["stSrch"])),
    (operation::PATH_BY_BUS, Endpoint::new("getPathInfoByBus.bms", JOURNEY)),
    (operation::PATH_BY_SUBWAY, Endpoint::new("getPathInfoBySubway.bms", JOURNEY)),
    (operation::PATH_BY_BUS_AND_SUBWAY, Endpoint::new("getPathInfoByBusNSub.bms", JOURNEY)),
];

/// A resolved endpoint: absolute URL without query plus its parameter names
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointTemplate {
    /// Absolute URL of the endpoint, without query string
    pub url: String,
    /// Query parameter names in order
    pub params: &'static [&'static str],
    /// Encoding applied to every query value
    pub encoding: QueryEncoding,
}

impl EndpointTemplate {
    /// Build the full request URL from values given in parameter order
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationError` if the number of values does not match
    /// the number of declared parameters.
    pub fn build_url(&self, values: &[String]) -> Result<String, BusError> {
        if values.len() != self.params.len() {
            return Err(BusError::ConfigurationError(format!(
                "{} expects {} parameter(s) ({}), got {}",
                self.url,
                self.params.len(),
                self.params.join(", "),
                values.len()
            )));
        }

        if values.is_empty() {
            return Ok(self.url.clone());
        }

        let query = self
            .params
            .iter()
            .zip(values)
            .map(|(name, value)| format!("{name}={}", self.encode(value)))
            .collect::<Vec<_>>()
            .join("&");

        Ok(format!("{}?{query}", self.url))
    }

    fn encode(&self, value: &str) -> String {
        let once = urlencoding::encode(value);
        match self.encoding {
            QueryEncoding::Single => once.into_owned(),
            QueryEncoding::Double => urlencoding::encode(&once).into_owned(),
        }
    }
}

/// Registry of every known endpoint, grouped by sub-API
#[derive(Debug, Clone)]
pub struct EndpointRegistry {
    base_url: String,
    tables: HashMap<ApiScope, HashMap<&'static str, Endpoint>>,
}

impl EndpointRegistry {
    /// Build the registry rooted at `base_url` (e.g. `http://m.bus.go.kr/mBus`)
    #[must_use]
    pub fn new(base_url: &str) -> Self {
        let tables: HashMap<ApiScope, HashMap<&'static str, Endpoint>> = [
            (ApiScope::Bus, BUS_ENDPOINTS),
            (ApiScope::Subway, SUBWAY_ENDPOINTS),
            (ApiScope::Path, PATH_ENDPOINTS),
        ]
        .into_iter()
        .map(|(scope, entries)| (scope, entries.iter().copied().collect()))
        .collect();

        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            tables,
        }
    }

    /// Base URL all endpoint URLs are built from
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Look up an operation in a sub-API
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationError` if the operation is unknown in `scope`.
    pub fn lookup(&self, scope: ApiScope, operation: &str) -> Result<EndpointTemplate, BusError> {
        let endpoint = self
            .tables
            .get(&scope)
            .and_then(|table| table.get(operation))
            .ok_or_else(|| {
                BusError::ConfigurationError(format!("unknown {scope} operation: {operation}"))
            })?;

        Ok(EndpointTemplate {
            url: format!("{}/{}/{}", self.base_url, scope.segment(), endpoint.path),
            params: endpoint.params,
            encoding: endpoint.encoding,
        })
    }

    /// Operation names registered for a sub-API
    #[must_use]
    pub fn operations(&self, scope: ApiScope) -> Vec<&'static str> {
        let mut names: Vec<_> = self
            .tables
            .get(&scope)
            .map(|table| table.keys().copied().collect())
            .unwrap_or_default();
        names.sort_unstable();
        names
    }
}
