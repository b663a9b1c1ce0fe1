//! Field mappers
//!
//! Convert one raw result object into one typed entity. The service sends
//! almost everything as strings, pads absent timestamps with blanks and reuses
//! field names with different meanings across endpoints, so every raw field is
//! read as loose text and coerced explicitly here.
//!
//! Only required fields (identifiers, names, and a location for located
//! entities) fail a mapping; an optional field that is absent, blank or
//! unparseable is left unset.

use std::str::FromStr;

use chrono::{NaiveDateTime, NaiveTime};
use rust_decimal::Decimal;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use tracing::warn;

use crate::error::BusError;
use crate::models::{
    ArrivingVehicle, BusArrivalInfo, BusOperatingTimes, BusPosition, BusRoute, BusRouteWaypoint,
    BusStation, Coordinates, CorrectionFactors, GeoPoint, NearbyStation, RouteType, ServiceTime,
    SubwayStation, WaypointDetail,
};

/// Route and arrival timestamps, e.g. `20150112043000`
pub const ROUTE_TIMESTAMP: &str = "%Y%m%d%H%M%S";
/// Night-route and detailed-waypoint times, e.g. `23:30 `
pub const TIME_OF_DAY: &str = "%H:%M";
/// Arrival request timestamp, e.g. `2015-01-12 10:20:30.123456`
pub const REQUEST_TIMESTAMP: &str = "%Y-%m-%d %H:%M:%S%.f";

/// How a route listing encodes first/last service times
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteTimes {
    /// Full `YYYYMMDDHHMMSS` timestamps
    Timestamp,
    /// `HH:MM` with trailing padding (night routes)
    TimeOfDay,
}

/// A loosely typed payload value
///
/// Strings, numbers and booleans are kept as text; null and whitespace-only
/// strings are absent.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
struct Field(Option<String>);

impl<'de> Deserialize<'de> for Field {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Ok(Self(match value {
            Value::String(s) if s.trim().is_empty() => None,
            Value::String(s) => Some(s),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(if b { "Y" } else { "N" }.to_string()),
            Value::Null | Value::Array(_) | Value::Object(_) => None,
        }))
    }
}

impl Field {
    fn raw(&self) -> Option<&str> {
        self.0.as_deref().map(str::trim)
    }

    fn text(self) -> Option<String> {
        self.0
    }

    fn required_text(self, name: &str) -> Result<String, BusError> {
        self.0
            .ok_or_else(|| BusError::MalformedResponse(format!("missing required field {name}")))
    }

    fn parse<T: FromStr>(&self, name: &str) -> Option<T> {
        let raw = self.raw()?;
        let parsed = raw.parse().ok();
        if parsed.is_none() {
            warn!(field = name, value = raw, "Dropping unparseable field");
        }
        parsed
    }

    fn required<T: FromStr>(&self, name: &str) -> Result<T, BusError> {
        let raw = self
            .raw()
            .ok_or_else(|| BusError::MalformedResponse(format!("missing required field {name}")))?;
        raw.parse().map_err(|_| {
            BusError::MalformedResponse(format!("field {name} is not numeric: {raw:?}"))
        })
    }

    fn decimal(&self, name: &str) -> Option<Decimal> {
        let raw = self.raw()?;
        let parsed = Decimal::from_str(raw)
            .or_else(|_| Decimal::from_scientific(raw))
            .ok();
        if parsed.is_none() {
            warn!(field = name, value = raw, "Dropping unparseable decimal");
        }
        parsed
    }

    /// `Y` and `1` are set; anything else, including absence, is unset
    fn flag(&self) -> bool {
        matches!(self.raw(), Some("Y" | "y" | "1"))
    }

    fn timestamp(&self, name: &str, format: &str) -> Option<NaiveDateTime> {
        let raw = self.raw()?;
        let parsed = NaiveDateTime::parse_from_str(raw, format).ok();
        if parsed.is_none() {
            warn!(field = name, value = raw, "Dropping unparseable timestamp");
        }
        parsed
    }

    fn time_of_day(&self, name: &str) -> Option<NaiveTime> {
        let raw = self.raw()?;
        let parsed = NaiveTime::parse_from_str(raw, TIME_OF_DAY).ok();
        if parsed.is_none() {
            warn!(field = name, value = raw, "Dropping unparseable time of day");
        }
        parsed
    }

    fn service_time(&self, name: &str, times: RouteTimes) -> Option<ServiceTime> {
        match times {
            RouteTimes::Timestamp => self
                .timestamp(name, ROUTE_TIMESTAMP)
                .map(ServiceTime::Timestamp),
            RouteTimes::TimeOfDay => self.time_of_day(name).map(ServiceTime::TimeOfDay),
        }
    }
}

fn point(x: &Field, y: &Field, name: &str) -> Option<GeoPoint> {
    Some(GeoPoint::new(x.decimal(name)?, y.decimal(name)?))
}

fn located(
    gps: Option<GeoPoint>,
    tm: Option<GeoPoint>,
    entity: &str,
) -> Result<Coordinates, BusError> {
    Coordinates::from_pairs(gps, tm)
        .ok_or_else(|| BusError::MalformedResponse(format!("{entity} has no coordinates")))
}

fn from_row<T: DeserializeOwned>(value: Value, entity: &str) -> Result<T, BusError> {
    if !value.is_object() {
        return Err(BusError::MalformedResponse(format!(
            "{entity} row is not an object"
        )));
    }
    serde_json::from_value(value).map_err(|e| BusError::MalformedResponse(format!("{entity}: {e}")))
}

/// Planar distance to the station's TM pair, or its WGS-84 pair if TM is unknown
///
/// Saturates at `Decimal::MAX` when the offsets leave the decimal range.
fn planar_distance(from: GeoPoint, to: &Coordinates) -> Decimal {
    let Some(target) = to.tm().or_else(|| to.gps()) else {
        return Decimal::ZERO;
    };
    let (Some(dx), Some(dy)) = (
        target.x.checked_sub(from.x).and_then(|d| d.to_f64()),
        target.y.checked_sub(from.y).and_then(|d| d.to_f64()),
    ) else {
        return Decimal::MAX;
    };
    Decimal::from_f64(dx.hypot(dy)).map_or(Decimal::MAX, |d| d.round_dp(2))
}

// --- Raw result rows ---

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct RawBusRoute {
    bus_route_id: Field,
    bus_route_nm: Field,
    corp_nm: Field,
    route_type: Field,
    bus_route_type: Field,
    term: Field,
    length: Field,
    st_station_nm: Field,
    ed_station_nm: Field,
    first_bus_tm: Field,
    last_bus_tm: Field,
    first_low_tm: Field,
    last_low_tm: Field,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct RawWaypoint {
    gps_x: Field,
    gps_y: Field,
    pos_x: Field,
    pos_y: Field,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct RawStationWaypoint {
    station: Field,
    station_nm: Field,
    ars_id: Field,
    seq: Field,
    sect_spd: Field,
    full_sect_dist: Field,
    turn_yn: Field,
    trans_yn: Field,
    begin_tm: Field,
    last_tm: Field,
    gps_x: Field,
    gps_y: Field,
    pos_x: Field,
    pos_y: Field,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct RawPositionStation {
    station_id: Field,
    station_nm: Field,
    ars_id: Field,
    station_tp: Field,
    dist: Field,
    gps_x: Field,
    gps_y: Field,
    pos_x: Field,
    pos_y: Field,
}

/// Name search reports the WGS-84 pair under `tmX`/`tmY`
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct RawNamedStation {
    st_id: Field,
    st_nm: Field,
    ars_id: Field,
    station_tp: Field,
    tm_x: Field,
    tm_y: Field,
    pos_x: Field,
    pos_y: Field,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct RawArrival {
    st_id: Field,
    st_nm: Field,
    ars_id: Field,
    bus_route_id: Field,
    rt_nm: Field,
    dir: Field,
    term: Field,
    last_bus_yn: Field,
    mk_tm: Field,
    veh_id1: Field,
    plain_no1: Field,
    sect_ord1: Field,
    station_nm1: Field,
    tra_time1: Field,
    tra_spd1: Field,
    is_arrive1: Field,
    is_last1: Field,
    avg_cf1: Field,
    exp_cf1: Field,
    kal_cf1: Field,
    neu_cf1: Field,
    veh_id2: Field,
    plain_no2: Field,
    sect_ord2: Field,
    station_nm2: Field,
    tra_time2: Field,
    tra_spd2: Field,
    is_arrive2: Field,
    is_last2: Field,
    avg_cf2: Field,
    exp_cf2: Field,
    kal_cf2: Field,
    neu_cf2: Field,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct RawOperatingTimes {
    bus_route_nm: Field,
    bus_route_id: Field,
    ars_id: Field,
    station_nm: Field,
    first_bus_tm: Field,
    last_bus_tm: Field,
    first_low_tm: Field,
    last_low_tm: Field,
}

/// Vehicle positions report the TM pair under `tmX`/`tmY`
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct RawBusPosition {
    veh_id: Field,
    plain_no: Field,
    sect_ord: Field,
    sect_dist: Field,
    stop_flag: Field,
    islastyn: Field,
    isrunyn: Field,
    data_tm: Field,
    gps_x: Field,
    gps_y: Field,
    tm_x: Field,
    tm_y: Field,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct RawSubwayStation {
    statn_id: Field,
    statn_nm: Field,
    subway_id: Field,
    subway_nm: Field,
}

// --- Mappers ---

/// Map a route row
///
/// # Errors
///
/// Returns `MalformedResponse` if `busRouteId` or `busRouteNm` is missing or
/// the id is not numeric.
pub fn bus_route(value: Value, times: RouteTimes) -> Result<BusRoute, BusError> {
    let raw: RawBusRoute = from_row(value, "bus route")?;

    let route_type = raw
        .route_type
        .parse::<i64>("routeType")
        .or_else(|| raw.bus_route_type.parse("busRouteType"))
        .map(RouteType::from_code);

    Ok(BusRoute {
        id: raw.bus_route_id.required("busRouteId")?,
        route_type,
        interval: raw.term.parse("term"),
        length: raw.length.parse("length"),
        first_bus: raw.first_bus_tm.service_time("firstBusTm", times),
        last_bus: raw.last_bus_tm.service_time("lastBusTm", times),
        first_low_bus: raw.first_low_tm.service_time("firstLowTm", times),
        last_low_bus: raw.last_low_tm.service_time("lastLowTm", times),
        name: raw.bus_route_nm.required_text("busRouteNm")?,
        corporation: raw.corp_nm.text(),
        start_station: raw.st_station_nm.text(),
        end_station: raw.ed_station_nm.text(),
    })
}

/// Map a plain route-path row
///
/// # Errors
///
/// Returns `MalformedResponse` if neither coordinate pair is present.
pub fn waypoint(value: Value) -> Result<BusRouteWaypoint, BusError> {
    let raw: RawWaypoint = from_row(value, "waypoint")?;
    Ok(BusRouteWaypoint {
        coordinates: located(
            point(&raw.gps_x, &raw.gps_y, "gpsX/gpsY"),
            point(&raw.pos_x, &raw.pos_y, "posX/posY"),
            "waypoint",
        )?,
        detail: None,
    })
}

/// Map a station-by-route row; `position` (1-based) stands in for a missing `seq`
///
/// # Errors
///
/// Returns `MalformedResponse` if the station id or name is missing, or
/// neither coordinate pair is present.
pub fn detailed_waypoint(value: Value, position: usize) -> Result<BusRouteWaypoint, BusError> {
    let raw: RawStationWaypoint = from_row(value, "waypoint")?;

    let coordinates = located(
        point(&raw.gps_x, &raw.gps_y, "gpsX/gpsY"),
        point(&raw.pos_x, &raw.pos_y, "posX/posY"),
        "waypoint",
    )?;

    let sequence = raw
        .seq
        .parse("seq")
        .unwrap_or_else(|| u32::try_from(position).unwrap_or(u32::MAX));

    let detail = WaypointDetail {
        station_id: raw.station.required("station")?,
        sequence,
        section_speed: raw.sect_spd.parse("sectSpd"),
        section_distance: raw.full_sect_dist.decimal("fullSectDist"),
        turnaround: raw.turn_yn.flag(),
        transfer: raw.trans_yn.flag(),
        first_time: raw.begin_tm.time_of_day("beginTm"),
        last_time: raw.last_tm.time_of_day("lastTm"),
        station_name: raw.station_nm.required_text("stationNm")?,
        serial_number: raw.ars_id.text(),
    };

    Ok(BusRouteWaypoint {
        coordinates,
        detail: Some(detail),
    })
}

/// Map a position-search row, recording its distance from `query`
///
/// The upstream `dist` is used when reported; otherwise the planar distance
/// to the station is computed.
///
/// # Errors
///
/// Returns `MalformedResponse` if the station id or name is missing, or
/// neither coordinate pair is present.
pub fn nearby_station(value: Value, query: GeoPoint) -> Result<NearbyStation, BusError> {
    let raw: RawPositionStation = from_row(value, "station")?;

    let station = BusStation {
        id: raw.station_id.required("stationId")?,
        station_type: raw.station_tp.parse("stationTp"),
        coordinates: located(
            point(&raw.gps_x, &raw.gps_y, "gpsX/gpsY"),
            point(&raw.pos_x, &raw.pos_y, "posX/posY"),
            "station",
        )?,
        name: raw.station_nm.required_text("stationNm")?,
        serial_number: raw.ars_id.text(),
    };

    let distance = raw
        .dist
        .decimal("dist")
        .unwrap_or_else(|| planar_distance(query, &station.coordinates));

    Ok(NearbyStation {
        station,
        query,
        distance,
    })
}

/// Map a station-by-name row
///
/// # Errors
///
/// Returns `MalformedResponse` if `stId` or `stNm` is missing, or neither
/// coordinate pair is present.
pub fn named_station(value: Value) -> Result<BusStation, BusError> {
    let raw: RawNamedStation = from_row(value, "station")?;
    Ok(BusStation {
        id: raw.st_id.required("stId")?,
        station_type: raw.station_tp.parse("stationTp"),
        coordinates: located(
            point(&raw.tm_x, &raw.tm_y, "tmX/tmY"),
            point(&raw.pos_x, &raw.pos_y, "posX/posY"),
            "station",
        )?,
        name: raw.st_nm.required_text("stNm")?,
        serial_number: raw.ars_id.text(),
    })
}

struct VehicleFields<'a> {
    veh_id: &'a Field,
    plain_no: &'a Field,
    sect_ord: &'a Field,
    station_nm: &'a Field,
    tra_time: &'a Field,
    tra_spd: &'a Field,
    is_arrive: &'a Field,
    is_last: &'a Field,
    avg_cf: &'a Field,
    exp_cf: &'a Field,
    kal_cf: &'a Field,
    neu_cf: &'a Field,
}

impl VehicleFields<'_> {
    /// `None` when no vehicle is reported (absent or zero id)
    fn into_vehicle(self) -> Option<ArrivingVehicle> {
        let vehicle_id = self.veh_id.parse::<i64>("vehId").filter(|id| *id != 0)?;
        Some(ArrivingVehicle {
            vehicle_id,
            plate_number: self.plain_no.clone().text(),
            section_order: self.sect_ord.parse("sectOrd"),
            current_station: self.station_nm.clone().text(),
            travel_time_secs: self.tra_time.parse("traTime"),
            travel_speed: self.tra_spd.parse("traSpd"),
            arrived: self.is_arrive.flag(),
            is_last: self.is_last.flag(),
            correction: CorrectionFactors {
                average: self.avg_cf.decimal("avgCf"),
                exponential: self.exp_cf.decimal("expCf"),
                kalman: self.kal_cf.decimal("kalCf"),
                neural: self.neu_cf.decimal("neuCf"),
            },
        })
    }
}

/// Map an arrival-info row
///
/// # Errors
///
/// Returns `MalformedResponse` if `stId` or `busRouteId` is missing or not
/// numeric.
pub fn arrival_info(value: Value) -> Result<BusArrivalInfo, BusError> {
    let raw: RawArrival = from_row(value, "arrival info")?;

    let next_vehicle = VehicleFields {
        veh_id: &raw.veh_id1,
        plain_no: &raw.plain_no1,
        sect_ord: &raw.sect_ord1,
        station_nm: &raw.station_nm1,
        tra_time: &raw.tra_time1,
        tra_spd: &raw.tra_spd1,
        is_arrive: &raw.is_arrive1,
        is_last: &raw.is_last1,
        avg_cf: &raw.avg_cf1,
        exp_cf: &raw.exp_cf1,
        kal_cf: &raw.kal_cf1,
        neu_cf: &raw.neu_cf1,
    }
    .into_vehicle();

    let following_vehicle = VehicleFields {
        veh_id: &raw.veh_id2,
        plain_no: &raw.plain_no2,
        sect_ord: &raw.sect_ord2,
        station_nm: &raw.station_nm2,
        tra_time: &raw.tra_time2,
        tra_spd: &raw.tra_spd2,
        is_arrive: &raw.is_arrive2,
        is_last: &raw.is_last2,
        avg_cf: &raw.avg_cf2,
        exp_cf: &raw.exp_cf2,
        kal_cf: &raw.kal_cf2,
        neu_cf: &raw.neu_cf2,
    }
    .into_vehicle();

    Ok(BusArrivalInfo {
        station_id: raw.st_id.required("stId")?,
        route_id: raw.bus_route_id.required("busRouteId")?,
        interval: raw.term.parse("term"),
        last_bus_departed: raw.last_bus_yn.flag(),
        requested_at: raw.mk_tm.timestamp("mkTm", REQUEST_TIMESTAMP),
        station_name: raw.st_nm.text(),
        serial_number: raw.ars_id.text(),
        route_name: raw.rt_nm.text(),
        direction: raw.dir.text(),
        next_vehicle,
        following_vehicle,
    })
}

/// Map an operating-times row
///
/// # Errors
///
/// Returns `MalformedResponse` if `busRouteNm` is missing.
pub fn operating_times(value: Value) -> Result<BusOperatingTimes, BusError> {
    let raw: RawOperatingTimes = from_row(value, "operating times")?;
    Ok(BusOperatingTimes {
        route_id: raw.bus_route_id.parse("busRouteId"),
        first_bus: raw.first_bus_tm.timestamp("firstBusTm", ROUTE_TIMESTAMP),
        last_bus: raw.last_bus_tm.timestamp("lastBusTm", ROUTE_TIMESTAMP),
        first_low_bus: raw.first_low_tm.timestamp("firstLowTm", ROUTE_TIMESTAMP),
        last_low_bus: raw.last_low_tm.timestamp("lastLowTm", ROUTE_TIMESTAMP),
        route_name: raw.bus_route_nm.required_text("busRouteNm")?,
        serial_number: raw.ars_id.text(),
        station_name: raw.station_nm.text(),
    })
}

/// Map a vehicle-position row
///
/// # Errors
///
/// Returns `MalformedResponse` if `vehId` is missing or neither coordinate
/// pair is present.
pub fn bus_position(value: Value) -> Result<BusPosition, BusError> {
    let raw: RawBusPosition = from_row(value, "bus position")?;
    Ok(BusPosition {
        vehicle_id: raw.veh_id.required("vehId")?,
        section_order: raw.sect_ord.parse("sectOrd"),
        coordinates: located(
            point(&raw.gps_x, &raw.gps_y, "gpsX/gpsY"),
            point(&raw.tm_x, &raw.tm_y, "tmX/tmY"),
            "bus position",
        )?,
        section_distance: raw.sect_dist.decimal("sectDist"),
        stopped: raw.stop_flag.flag(),
        is_last: raw.islastyn.flag(),
        running: raw.isrunyn.flag(),
        recorded_at: raw.data_tm.timestamp("dataTm", ROUTE_TIMESTAMP),
        plate_number: raw.plain_no.text(),
    })
}

/// Map a subway station row
///
/// # Errors
///
/// Returns `MalformedResponse` if `statnId` or `statnNm` is missing.
pub fn subway_station(value: Value) -> Result<SubwayStation, BusError> {
    let raw: RawSubwayStation = from_row(value, "subway station")?;
    Ok(SubwayStation {
        id: raw.statn_id.required("statnId")?,
        line_id: raw.subway_id.parse("subwayId"),
        name: raw.statn_nm.required_text("statnNm")?,
        line_name: raw.subway_nm.text(),
    })
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use serde_json::json;

    use super::*;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn route_json() -> Value {
        json!({
            "busRouteId": "100100118",
            "busRouteNm": "N26",
            "corpNm": "중부운수",
            "routeType": "3",
            "term": "10",
            "length": "41.3",
            "stStationNm": "중랑차고지",
            "edStationNm": "개화역",
            "firstBusTm": "20150112043000",
            "lastBusTm": "20150112223000",
            "firstLowTm": "              ",
            "lastLowTm": "              "
        })
    }

    #[test]
    fn test_bus_route_fields() {
        let route = bus_route(route_json(), RouteTimes::Timestamp).unwrap();
        assert_eq!(route.id, 100_100_118);
        assert_eq!(route.name, "N26");
        assert_eq!(route.corporation.as_deref(), Some("중부운수"));
        assert_eq!(route.route_type, Some(RouteType::Trunk));
        assert_eq!(route.interval, Some(10));
        assert!((route.length.unwrap() - 41.3).abs() < f64::EPSILON);
        assert_eq!(route.start_station.as_deref(), Some("중랑차고지"));
        assert_eq!(route.end_station.as_deref(), Some("개화역"));

        let first = NaiveDate::from_ymd_opt(2015, 1, 12)
            .unwrap()
            .and_hms_opt(4, 30, 0)
            .unwrap();
        assert_eq!(route.first_bus, Some(ServiceTime::Timestamp(first)));
    }

    #[test]
    fn test_blank_timestamps_are_absent() {
        let route = bus_route(route_json(), RouteTimes::Timestamp).unwrap();
        assert!(route.first_low_bus.is_none());
        assert!(route.last_low_bus.is_none());
    }

    #[test]
    fn test_numeric_json_values_are_accepted() {
        let route = bus_route(
            json!({ "busRouteId": 100_100_118, "busRouteNm": "N26", "term": 10, "length": 41.3 }),
            RouteTimes::Timestamp,
        )
        .unwrap();
        assert_eq!(route.id, 100_100_118);
        assert_eq!(route.interval, Some(10));
    }

    #[test]
    fn test_absent_corporation_is_unset() {
        let route = bus_route(
            json!({ "busRouteId": "1", "busRouteNm": "6001" }),
            RouteTimes::Timestamp,
        )
        .unwrap();
        assert!(route.corporation.is_none());
        assert!(route.first_bus.is_none());
        assert!(route.route_type.is_none());
    }

    #[test]
    fn test_route_type_alias() {
        let route = bus_route(
            json!({ "busRouteId": "1", "busRouteNm": "6001", "busRouteType": "1" }),
            RouteTimes::Timestamp,
        )
        .unwrap();
        assert_eq!(route.route_type, Some(RouteType::Airport));
    }

    #[test]
    fn test_night_route_time_of_day() {
        let route = bus_route(
            json!({
                "busRouteId": "100100411",
                "busRouteNm": "N13",
                "firstBusTm": "23:30 ",
                "lastBusTm": "03:55 "
            }),
            RouteTimes::TimeOfDay,
        )
        .unwrap();
        assert_eq!(
            route.first_bus,
            Some(ServiceTime::TimeOfDay(NaiveTime::from_hms_opt(23, 30, 0).unwrap()))
        );
        assert_eq!(
            route.last_bus,
            Some(ServiceTime::TimeOfDay(NaiveTime::from_hms_opt(3, 55, 0).unwrap()))
        );
    }

    #[test]
    fn test_unparseable_optional_field_is_dropped() {
        let route = bus_route(
            json!({
                "busRouteId": "1",
                "busRouteNm": "1",
                "term": "ten",
                "firstBusTm": "not a time"
            }),
            RouteTimes::Timestamp,
        )
        .unwrap();
        assert!(route.interval.is_none());
        assert!(route.first_bus.is_none());
    }

    #[test]
    fn test_required_fields() {
        let err = bus_route(json!({ "busRouteNm": "N26" }), RouteTimes::Timestamp).unwrap_err();
        assert!(matches!(err, BusError::MalformedResponse(ref m) if m.contains("busRouteId")));

        let err = bus_route(
            json!({ "busRouteId": "abc", "busRouteNm": "N26" }),
            RouteTimes::Timestamp,
        )
        .unwrap_err();
        assert!(matches!(err, BusError::MalformedResponse(ref m) if m.contains("not numeric")));

        let err = bus_route(json!({ "busRouteId": "1", "busRouteNm": "  " }), RouteTimes::Timestamp)
            .unwrap_err();
        assert!(matches!(err, BusError::MalformedResponse(ref m) if m.contains("busRouteNm")));

        let err = bus_route(json!("N26"), RouteTimes::Timestamp).unwrap_err();
        assert!(matches!(err, BusError::MalformedResponse(_)));
    }

    #[test]
    fn test_plain_waypoint() {
        let wp = waypoint(json!({
            "gpsX": "127.0937",
            "gpsY": "37.6101",
            "posX": "206312.5",
            "posY": "457230.1"
        }))
        .unwrap();
        assert_eq!(wp.coordinates.gps(), Some(GeoPoint::new(dec("127.0937"), dec("37.6101"))));
        assert_eq!(wp.coordinates.tm(), Some(GeoPoint::new(dec("206312.5"), dec("457230.1"))));
        assert!(!wp.is_detailed());
    }

    #[test]
    fn test_waypoint_half_pair_is_absent() {
        let wp = waypoint(json!({ "gpsX": "127.0937", "posX": "206312.5", "posY": "457230.1" }))
            .unwrap();
        assert!(wp.coordinates.gps().is_none());
        assert!(wp.coordinates.tm().is_some());

        let err = waypoint(json!({ "gpsX": "127.0937" })).unwrap_err();
        assert!(matches!(err, BusError::MalformedResponse(ref m) if m.contains("coordinates")));
    }

    #[test]
    fn test_detailed_waypoint() {
        let wp = detailed_waypoint(
            json!({
                "station": "107000001",
                "stationNm": "중랑차고지",
                "arsId": "0012",
                "seq": "1",
                "sectSpd": "24",
                "fullSectDist": "0.5",
                "turnYn": "N",
                "transYn": "Y",
                "beginTm": "04:30 ",
                "lastTm": "22:40 ",
                "gpsX": "127.0937",
                "gpsY": "37.6101"
            }),
            1,
        )
        .unwrap();

        let detail = wp.detail.unwrap();
        assert_eq!(detail.station_id, 107_000_001);
        assert_eq!(detail.station_name, "중랑차고지");
        assert_eq!(detail.serial_number.as_deref(), Some("0012"));
        assert_eq!(detail.sequence, 1);
        assert_eq!(detail.section_speed, Some(24));
        assert_eq!(detail.section_distance, Some(dec("0.5")));
        assert!(!detail.turnaround);
        assert!(detail.transfer);
        assert_eq!(detail.first_time, NaiveTime::from_hms_opt(4, 30, 0));
        assert_eq!(detail.last_time, NaiveTime::from_hms_opt(22, 40, 0));
    }

    #[test]
    fn test_detailed_waypoint_sequence_falls_back_to_position() {
        let wp = detailed_waypoint(
            json!({ "station": "1", "stationNm": "A", "turnYn": "1", "posX": "1", "posY": "2" }),
            7,
        )
        .unwrap();
        let detail = wp.detail.unwrap();
        assert_eq!(detail.sequence, 7);
        assert!(detail.turnaround);
        assert!(!detail.transfer);
    }

    #[test]
    fn test_named_station_reads_gps_from_tm_fields() {
        let station = named_station(json!({
            "stId": "122000248",
            "stNm": "강남역",
            "arsId": "03227",
            "tmX": "127.0276",
            "tmY": "37.4979",
            "posX": "202000.1",
            "posY": "444000.2"
        }))
        .unwrap();
        assert_eq!(station.id, 122_000_248);
        assert_eq!(station.serial_number.as_deref(), Some("03227"));
        assert_eq!(
            station.coordinates.gps(),
            Some(GeoPoint::new(dec("127.0276"), dec("37.4979")))
        );
        assert_eq!(
            station.coordinates.tm(),
            Some(GeoPoint::new(dec("202000.1"), dec("444000.2")))
        );
    }

    #[test]
    fn test_nearby_station_uses_reported_distance() {
        let query = GeoPoint::new(dec("202000"), dec("444000"));
        let hit = nearby_station(
            json!({
                "stationId": "122000248",
                "stationNm": "강남역",
                "arsId": "03227",
                "stationTp": "0",
                "dist": "87",
                "posX": "202060",
                "posY": "444080"
            }),
            query,
        )
        .unwrap();
        assert_eq!(hit.distance, dec("87"));
        assert_eq!(hit.query, query);
        assert_eq!(hit.station.station_type, Some(0));
    }

    #[test]
    fn test_nearby_station_computes_missing_distance() {
        let query = GeoPoint::new(dec("202000"), dec("444000"));
        let hit = nearby_station(
            json!({
                "stationId": "122000248",
                "stationNm": "강남역",
                "posX": "202030",
                "posY": "444040"
            }),
            query,
        )
        .unwrap();
        assert_eq!(hit.distance, dec("50"));
    }

    #[test]
    fn test_nearby_station_distance_saturates_out_of_range() {
        let query = GeoPoint::new(Decimal::MAX, Decimal::ZERO);
        let hit = nearby_station(
            json!({
                "stationId": "122000248",
                "stationNm": "강남역",
                "posX": "-1000",
                "posY": "0"
            }),
            query,
        )
        .unwrap();
        assert_eq!(hit.distance, Decimal::MAX);
    }

    #[test]
    fn test_arrival_info() {
        let info = arrival_info(json!({
            "stId": "112000001",
            "stNm": "중랑차고지",
            "arsId": "07001",
            "busRouteId": "100100118",
            "rtNm": "N26",
            "dir": "개화역",
            "term": "10",
            "lastBusYn": "N",
            "mkTm": "2015-01-12 10:20:30.123456",
            "vehId1": "111033115",
            "plainNo1": "서울74사3115",
            "sectOrd1": "3",
            "stationNm1": "면목역",
            "traTime1": "240",
            "traSpd1": "21",
            "isArrive1": "0",
            "isLast1": "1",
            "avgCf1": "1.02",
            "expCf1": "0.98",
            "kalCf1": "1.1",
            "neuCf1": "0.9",
            "vehId2": "0",
            "plainNo2": " "
        }))
        .unwrap();

        assert_eq!(info.station_id, 112_000_001);
        assert_eq!(info.route_id, 100_100_118);
        assert_eq!(info.serial_number.as_deref(), Some("07001"));
        assert_eq!(info.interval, Some(10));
        assert!(!info.last_bus_departed);

        let requested = NaiveDate::from_ymd_opt(2015, 1, 12)
            .unwrap()
            .and_hms_micro_opt(10, 20, 30, 123_456)
            .unwrap();
        assert_eq!(info.requested_at, Some(requested));

        let next = info.next_vehicle.unwrap();
        assert_eq!(next.vehicle_id, 111_033_115);
        assert_eq!(next.plate_number.as_deref(), Some("서울74사3115"));
        assert_eq!(next.section_order, Some(3));
        assert_eq!(next.travel_time_secs, Some(240));
        assert!(!next.arrived);
        assert!(next.is_last);
        assert_eq!(next.correction.kalman, Some(dec("1.1")));

        assert!(info.following_vehicle.is_none());
    }

    #[test]
    fn test_arrival_request_time_without_fraction() {
        let info = arrival_info(json!({
            "stId": "1",
            "busRouteId": "2",
            "mkTm": "2015-01-12 10:20:30",
            "lastBusYn": "Y"
        }))
        .unwrap();
        assert!(info.requested_at.is_some());
        assert!(info.last_bus_departed);
        assert!(info.next_vehicle.is_none());
    }

    #[test]
    fn test_operating_times() {
        let times = operating_times(json!({
            "busRouteNm": "N26",
            "busRouteId": "100100118",
            "arsId": "07001",
            "stationNm": "중랑차고지",
            "firstBusTm": "20150112043000",
            "lastBusTm": "20150112223000",
            "firstLowTm": " ",
            "lastLowTm": null
        }))
        .unwrap();
        assert_eq!(times.route_id, Some(100_100_118));
        assert!(times.first_bus.is_some());
        assert!(times.first_low_bus.is_none());
        assert!(times.last_low_bus.is_none());
    }

    #[test]
    fn test_bus_position_reads_tm_from_tm_fields() {
        let pos = bus_position(json!({
            "vehId": "111033115",
            "plainNo": "서울74사3115",
            "sectOrd": "12",
            "sectDist": "130.5",
            "stopFlag": "1",
            "islastyn": "0",
            "isrunyn": "1",
            "dataTm": "20150112102030",
            "gpsX": "127.08",
            "gpsY": "37.59",
            "tmX": "205000.1",
            "tmY": "455000.2"
        }))
        .unwrap();
        assert_eq!(pos.vehicle_id, 111_033_115);
        assert!(pos.stopped);
        assert!(!pos.is_last);
        assert!(pos.running);
        assert_eq!(pos.coordinates.tm(), Some(GeoPoint::new(dec("205000.1"), dec("455000.2"))));
        assert!(pos.recorded_at.is_some());
    }

    #[test]
    fn test_subway_station() {
        let station = subway_station(json!({
            "statnId": "1002000222",
            "statnNm": "강남",
            "subwayId": "1002",
            "subwayNm": "2호선"
        }))
        .unwrap();
        assert_eq!(station.id, 1_002_000_222);
        assert_eq!(station.line_id, Some(1002));

        assert!(subway_station(json!({ "statnNm": "강남" })).is_err());
    }

    mod proptest_tests {
        use proptest::prelude::*;

        use super::*;

        proptest! {
            #[test]
            fn serial_numbers_keep_leading_zeros(serial in "0[0-9]{1,5}") {
                let station = named_station(json!({
                    "stId": "1",
                    "stNm": "A",
                    "arsId": serial.clone(),
                    "posX": "1",
                    "posY": "1"
                }))
                .unwrap();
                prop_assert_eq!(station.serial_number, Some(serial));
            }

            #[test]
            fn whitespace_timestamps_are_absent(padding in "[ \t]{0,14}") {
                let route = bus_route(
                    json!({
                        "busRouteId": "1",
                        "busRouteNm": "1",
                        "firstBusTm": padding.clone(),
                        "lastLowTm": padding
                    }),
                    RouteTimes::Timestamp,
                )
                .unwrap();
                prop_assert!(route.first_bus.is_none());
                prop_assert!(route.last_low_bus.is_none());
            }

            #[test]
            fn explicit_route_fields_round_trip(
                id in 1_i64..1_000_000_000,
                name in "[A-Z]?[0-9]{1,4}",
                term in 1_u32..120,
            ) {
                let route = bus_route(
                    json!({
                        "busRouteId": id.to_string(),
                        "busRouteNm": name.clone(),
                        "term": term.to_string()
                    }),
                    RouteTimes::Timestamp,
                )
                .unwrap();
                prop_assert_eq!(route.id, id);
                prop_assert_eq!(route.name, name);
                prop_assert_eq!(route.interval, Some(term));
            }
        }
    }
}
