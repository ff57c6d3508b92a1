//! Rank events from a seed document by distance from a given position.
#![cfg_attr(not(any(test, doctest)), deny(clippy::unwrap_used))]
#![cfg_attr(not(any(test, doctest)), deny(clippy::expect_used))]

use std::ffi::OsString;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use cap_std::{ambient_authority, fs::Dir};
use clap::Parser;
use gather::config::GatherSettings;
use gather::domain::ports::FixedLocation;
use gather::domain::{Coordinate, NearbyEvents, NearbyEventsService};
use gather::outbound::memory::InMemoryBackend;
use ortho_config::OrthoConfig;
use serde::Serialize;
use tokio::runtime::Builder;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt};

/// `gather-nearby` command arguments.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "gather-nearby",
    about = "List events from a seed file, nearest first",
    version
)]
struct CliArgs {
    /// Path to a JSON document with `users` and `events` arrays.
    #[arg(long = "seed", value_name = "path")]
    seed_path: PathBuf,
    /// Observer position as `lat,lng`. Without it events stay unranked.
    #[arg(long = "at", value_name = "lat,lng", value_parser = parse_position)]
    position: Option<Coordinate>,
}

/// One output row.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Row {
    id: String,
    title: String,
    distance_km: Option<f64>,
    distance_label: Option<String>,
}

fn main() -> io::Result<()> {
    if let Err(e) = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .with_writer(io::stderr)
        .try_init()
    {
        warn!(error = %e, "tracing init failed");
    }

    let runtime = Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|error| io::Error::other(format!("create Tokio runtime: {error}")))?;
    runtime.block_on(async_main())
}

async fn async_main() -> io::Result<()> {
    let args = CliArgs::try_parse().map_err(io::Error::other)?;
    let settings = GatherSettings::load_from_iter([OsString::from("gather-nearby")])
        .map_err(|error| io::Error::other(format!("load settings: {error}")))?;
    let options = settings
        .ranking_options()
        .map_err(|error| io::Error::new(io::ErrorKind::InvalidInput, error))?;

    let seed = read_seed(&args.seed_path)?;
    let backend = Arc::new(
        InMemoryBackend::from_json(&seed)
            .map_err(|error| io::Error::new(io::ErrorKind::InvalidData, error))?,
    );
    let service = NearbyEventsService::new(
        Arc::clone(&backend),
        backend,
        Arc::new(FixedLocation(args.position)),
        options,
    );

    let nearby = service
        .nearby()
        .await
        .map_err(|error| io::Error::other(format!("rank events: {error}")))?;
    info!(count = nearby.len(), ranked = args.position.is_some(), "events listed");

    let mut stdout = io::stdout().lock();
    serde_json::to_writer_pretty(&mut stdout, &rows(&nearby)).map_err(io::Error::other)?;
    writeln!(stdout)
}

fn rows(nearby: &NearbyEvents) -> Vec<Row> {
    match nearby {
        NearbyEvents::Ranked(events) => events
            .iter()
            .map(|ranked| Row {
                id: ranked.event.id().to_string(),
                title: ranked.event.title().as_ref().to_owned(),
                distance_km: ranked.distance_km,
                distance_label: ranked.distance_label(),
            })
            .collect(),
        NearbyEvents::Unranked(events) => events
            .iter()
            .map(|event| Row {
                id: event.id().to_string(),
                title: event.title().as_ref().to_owned(),
                distance_km: None,
                distance_label: None,
            })
            .collect(),
    }
}

fn parse_position(raw: &str) -> Result<Coordinate, String> {
    let (lat_text, lng_text) = raw
        .split_once(',')
        .ok_or_else(|| "position must be `lat,lng`".to_owned())?;
    let lat = lat_text
        .trim()
        .parse::<f64>()
        .map_err(|error| format!("failed to parse latitude: {error}"))?;
    let lng = lng_text
        .trim()
        .parse::<f64>()
        .map_err(|error| format!("failed to parse longitude: {error}"))?;
    Coordinate::new(lat, lng).map_err(|error| error.to_string())
}

fn read_seed(path: &Path) -> io::Result<String> {
    let parent = path
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let file_name = path
        .file_name()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "seed path must be a file"))?;
    let directory = Dir::open_ambient_dir(parent, ambient_authority()).map_err(|error| {
        io::Error::other(format!(
            "open seed directory '{}': {error}",
            parent.display()
        ))
    })?;
    directory
        .read_to_string(Path::new(file_name))
        .map_err(|error| io::Error::other(format!("read seed '{}': {error}", path.display())))
}
