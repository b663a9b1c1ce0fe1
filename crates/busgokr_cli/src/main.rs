//! busgokr CLI
//!
//! Query the bus.go.kr open-data service from the command line and print
//! the results as JSON.

#![allow(clippy::print_stdout)]

use std::path::{Path, PathBuf};

use anyhow::Context;
use busgokr::{BusApi, BusClient, BusConfig, RouteType};
use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use serde_json::Value;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// busgokr CLI
#[derive(Debug, Parser)]
#[command(name = "busgokr")]
#[command(author, version, about = "Seoul bus.go.kr transit data client", long_about = None)]
struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Configuration file (default: busgokr.toml in the working directory)
    #[arg(short, long, global = true, env = "BUSGOKR_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Look up a route by id, falling back to its name
    Route {
        /// Route identifier
        #[arg(long)]
        id: Option<i64>,

        /// Route name, e.g. N26
        #[arg(long)]
        name: Option<String>,
    },

    /// Search routes by name, optionally narrowed to one category first
    Routes {
        /// Part of the route name
        name: String,

        /// Category code (0 public, 1 airport, 2 village, 3 trunk, 4 branch, ...)
        #[arg(long)]
        route_type: Option<i64>,
    },

    /// List the waypoints of a route
    Waypoints {
        /// Route identifier
        route_id: i64,

        /// List stations with sequence and timing instead of bare coordinates
        #[arg(long)]
        detailed: bool,
    },

    /// Show arrival predictions for a route
    Arrivals {
        /// Route identifier
        route_id: i64,

        /// Restrict to one station (requires --ord)
        #[arg(long, requires = "ord")]
        station: Option<i64>,

        /// Order of the station within the route
        #[arg(long, requires = "station")]
        ord: Option<u32>,
    },

    /// Search stations by name
    Stations {
        /// Part of the station name
        name: String,
    },

    /// Find stations (or routes) around a point
    Nearby {
        /// Longitude
        x: Decimal,

        /// Latitude
        y: Decimal,

        /// Search radius in meters
        #[arg(long, default_value_t = 300)]
        radius: u32,

        /// List routes instead of stations
        #[arg(long)]
        routes: bool,
    },

    /// Show first and last departures of a route at a station
    Times {
        /// Station serial number, e.g. 03227
        ars_id: String,

        /// Route identifier
        route_id: i64,
    },

    /// Show live vehicle positions of a route
    Positions {
        /// Route identifier
        route_id: i64,
    },

    /// Search subway stations by name
    Subway {
        /// Part of the station name
        name: String,
    },
}

/// Determine log filter level from verbosity count
const fn log_filter_from_verbosity(verbose: u8) -> &'static str {
    match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

/// Load configuration: defaults, then the config file, then `BUSGOKR_*` variables
fn load_config(path: Option<&Path>) -> Result<BusConfig, config::ConfigError> {
    let file = match path {
        Some(path) => config::File::from(path),
        None => config::File::with_name("busgokr").required(false),
    };

    let settings = config::Config::builder()
        .add_source(file)
        // e.g. BUSGOKR_BASE_URL, BUSGOKR_TIMEOUT_SECS
        .add_source(
            config::Environment::with_prefix("BUSGOKR")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    settings.try_deserialize()
}

async fn run(api: &impl BusApi, command: Commands) -> anyhow::Result<Value> {
    let value = match command {
        Commands::Route { id, name } => {
            serde_json::to_value(api.get_bus_route(id, name.as_deref()).await?)?
        },
        Commands::Routes { name, route_type } => {
            let routes = api
                .find_bus_routes(&name, route_type.map(RouteType::from_code))
                .await?;
            serde_json::to_value(routes)?
        },
        Commands::Waypoints { route_id, detailed } => {
            let waypoints = if detailed {
                api.route_waypoints_detailed(route_id).await?
            } else {
                api.route_waypoints(route_id).await?
            };
            serde_json::to_value(waypoints)?
        },
        Commands::Arrivals {
            route_id,
            station: Some(station),
            ord: Some(ord),
        } => serde_json::to_value(api.arrival_info(route_id, station, ord).await?)?,
        Commands::Arrivals { route_id, .. } => {
            serde_json::to_value(api.arrivals_by_route(route_id).await?)?
        },
        Commands::Stations { name } => serde_json::to_value(api.stations_by_name(&name).await?)?,
        Commands::Nearby {
            x,
            y,
            radius,
            routes,
        } => {
            if routes {
                serde_json::to_value(api.routes_by_position(x, y, radius).await?)?
            } else {
                serde_json::to_value(api.stations_by_position(x, y, radius).await?)?
            }
        },
        Commands::Times { ars_id, route_id } => {
            serde_json::to_value(api.operating_times(&ars_id, route_id).await?)?
        },
        Commands::Positions { route_id } => {
            serde_json::to_value(api.vehicle_positions_by_route(route_id).await?)?
        },
        Commands::Subway { name } => {
            serde_json::to_value(api.subway_stations_by_name(&name).await?)?
        },
    };
    Ok(value)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = log_filter_from_verbosity(cli.verbose);

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(filter))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = load_config(cli.config.as_deref()).context("failed to load configuration")?;
    info!(base_url = %config.base_url, "Using bus.go.kr service");

    let client = BusClient::new(&config)?;
    let output = run(&client, cli.command).await?;

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn parse(args: &[&str]) -> Result<Cli, clap::Error> {
        Cli::try_parse_from(args)
    }

    #[test]
    fn log_filter_verbosity_levels() {
        assert_eq!(log_filter_from_verbosity(0), "warn");
        assert_eq!(log_filter_from_verbosity(1), "info");
        assert_eq!(log_filter_from_verbosity(2), "debug");
        assert_eq!(log_filter_from_verbosity(3), "trace");
        assert_eq!(log_filter_from_verbosity(10), "trace");
    }

    #[test]
    fn parse_route_by_id_and_name() {
        let cli = parse(&["busgokr", "route", "--id", "100100118", "--name", "N26"]).unwrap();
        match cli.command {
            Commands::Route { id, name } => {
                assert_eq!(id, Some(100_100_118));
                assert_eq!(name.as_deref(), Some("N26"));
            },
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn parse_route_without_selectors() {
        // the library reports the missing selector
        let cli = parse(&["busgokr", "route"]).unwrap();
        assert!(matches!(cli.command, Commands::Route { id: None, name: None }));
    }

    #[test]
    fn parse_routes_with_type() {
        let cli = parse(&["busgokr", "routes", "60", "--route-type", "1"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Routes { ref name, route_type: Some(1) } if name == "60"
        ));
    }

    #[test]
    fn parse_arrivals_station_requires_ord() {
        assert!(parse(&["busgokr", "arrivals", "1", "--station", "2"]).is_err());

        let cli = parse(&["busgokr", "arrivals", "1", "--station", "2", "--ord", "3"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Arrivals { route_id: 1, station: Some(2), ord: Some(3) }
        ));
    }

    #[test]
    fn parse_nearby_decimals() {
        let cli = parse(&["busgokr", "nearby", "127.0276", "37.4979", "--routes"]).unwrap();
        match cli.command {
            Commands::Nearby { x, y, radius, routes } => {
                assert_eq!(x.to_string(), "127.0276");
                assert_eq!(y.to_string(), "37.4979");
                assert_eq!(radius, 300);
                assert!(routes);
            },
            other => panic!("unexpected command: {other:?}"),
        }

        assert!(parse(&["busgokr", "nearby", "east", "37.4979"]).is_err());
    }

    #[test]
    fn parse_times_keeps_leading_zero() {
        let cli = parse(&["busgokr", "times", "03227", "100100118"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Times { ref ars_id, route_id: 100_100_118 } if ars_id == "03227"
        ));
    }

    #[test]
    fn parse_global_flags_after_subcommand() {
        let cli = parse(&["busgokr", "subway", "강남", "-vv", "--config", "x.toml"]).unwrap();
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.config, Some(PathBuf::from("x.toml")));
    }

    #[test]
    fn load_config_from_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "base_url = \"http://localhost:8080/mBus\"").unwrap();
        writeln!(file, "timeout_secs = 3").unwrap();

        let config = load_config(Some(file.path())).unwrap();
        assert_eq!(config.base_url, "http://localhost:8080/mBus");
        assert_eq!(config.timeout_secs, 3);
        assert!(config.user_agent.starts_with("busgokr/"));
    }

    #[test]
    fn load_config_missing_explicit_file_fails() {
        assert!(load_config(Some(Path::new("/nonexistent/busgokr.toml"))).is_err());
    }
}
