use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use metro_cli::config::{self, Config};
use metro_cli::display;
use metro_cli::model::{CaptureEvent, CaptureOptions, Coordinates, DEFAULT_CAPTURE_TIMEOUT};
use metro_cli::transit::model::{nearby_stop_areas, resolve_place, DeparturesResponse};
use metro_cli::transit::{self, PlaceTarget, StopArea};
use metro_cli::{storage, CacheError, LocationCapture, TransitClient, TransitError, TransportMode};
use serde::Serialize;
use std::io::Write;
use std::time::Duration;
use time::{OffsetDateTime, PrimitiveDateTime};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// A message for the terminal, tagged with its stream.
enum Line {
    Out(String),
    Err(String),
}

impl Line {
    /// Locks the stream for this one line only; the tracing subscriber shares stderr.
    fn emit(&self) {
        let _ = match self {
            Line::Out(msg) => {
                let mut out = std::io::stdout().lock();
                writeln!(out, "{msg}").and_then(|_| out.flush())
            }
            Line::Err(msg) => {
                let mut err = std::io::stderr().lock();
                writeln!(err, "{msg}").and_then(|_| err.flush())
            }
        };
    }
}

/// Terminal output written from one blocking thread, in the order it was queued.
struct Console {
    tx: mpsc::UnboundedSender<Line>,
    writer: JoinHandle<()>,
}

impl Console {
    fn start() -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<Line>();
        let writer = tokio::task::spawn_blocking(move || {
            while let Some(line) = rx.blocking_recv() {
                line.emit();
            }
        });
        Self { tx, writer }
    }

    fn out(&self, msg: impl Into<String>) {
        let _ = self.tx.send(Line::Out(msg.into()));
    }

    fn err(&self, msg: impl Into<String>) {
        let _ = self.tx.send(Line::Err(msg.into()));
    }

    /// Drain queued lines before returning.
    async fn finish(self) {
        drop(self.tx);
        let _ = self.writer.await;
    }
}

#[derive(Debug, Parser, Clone)]
#[command(
    name = "metro",
    version,
    about = "Paris transit departures near you, with browser-based location capture"
)]
pub struct Cli {
    /// Enable debug logging (RUST_LOG overrides)
    #[arg(long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Next departures at a station, or around you with --here
    Departures(DeparturesArgs),
    /// Detect your location via the browser (opens a tab)
    Locate(LocateArgs),
    /// Show configuration and cached location
    Config,
    /// Manage the cached location
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

/// Flags shared by every command that may capture a location.
#[derive(Debug, clap::Args, Clone)]
pub struct CaptureArgs {
    /// Fixed port for the local location page (default: random)
    #[arg(long)]
    pub port: Option<u16>,

    /// How long to wait for the browser to report a location
    #[arg(long)]
    pub timeout: Option<humantime::Duration>,

    /// Reuse a cached location younger than this (e.g. 5m, 1h)
    #[arg(long)]
    pub cache: Option<humantime::Duration>,

    /// Do not try to open a browser; just print the URL
    #[arg(long)]
    pub no_browser: bool,
}

#[derive(Debug, clap::Args, Clone)]
pub struct LocateArgs {
    #[command(flatten)]
    pub capture: CaptureArgs,

    /// Print the result as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, clap::Args, Clone)]
pub struct DeparturesArgs {
    /// Station to search for (default: default_station from the config)
    pub query: Vec<String>,

    /// Use your current location instead of a station name
    #[arg(long, conflicts_with = "query")]
    pub here: bool,

    /// Transport mode: metro, rer, train, tram, bus or all
    #[arg(long, short, default_value = "metro")]
    pub mode: TransportMode,

    #[command(flatten)]
    pub capture: CaptureArgs,
}

#[derive(Debug, Subcommand, Clone)]
pub enum CacheAction {
    /// Delete the cached location
    Clear,
}

/// Where a reported location came from.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
enum LocationSource {
    Browser,
    Cache,
}

#[derive(Debug, Serialize)]
struct LocationReport {
    lat: f64,
    lon: f64,
    source: LocationSource,
}

impl LocationReport {
    fn new(coords: Coordinates, source: LocationSource) -> Self {
        Self {
            lat: coords.lat,
            lon: coords.lon,
            source,
        }
    }

    fn coordinates(&self) -> Coordinates {
        Coordinates::new(self.lat, self.lon)
    }

    fn summary(&self) -> String {
        match self.source {
            LocationSource::Browser => format!("Found you at {}", self.coordinates()),
            LocationSource::Cache => format!("Using cached location ({})", self.coordinates()),
        }
    }
}

pub async fn run(args: Cli) -> Result<()> {
    match args.command {
        Command::Departures(departures) => run_departures(departures).await,
        Command::Locate(locate) => run_locate(locate).await,
        Command::Config => run_config(),
        Command::Cache {
            action: CacheAction::Clear,
        } => run_cache_clear(),
    }
}

/// Resolved capture settings for one invocation: flags over config over defaults.
#[derive(Debug, Clone)]
pub struct LocateSettings {
    pub capture: CaptureOptions,
    pub cache_ttl: Option<Duration>,
}

pub fn build_settings(args: &CaptureArgs, cfg: &Config) -> LocateSettings {
    let capture = CaptureOptions {
        timeout: args
            .timeout
            .map(Duration::from)
            .or(cfg.locate.timeout)
            .unwrap_or(DEFAULT_CAPTURE_TIMEOUT),
        port: args.port.or(cfg.locate.port).filter(|p| *p != 0),
        open_browser: !args.no_browser && cfg.locate.open_browser.unwrap_or(true),
        ..CaptureOptions::default()
    };
    let cache_ttl = args
        .cache
        .map(Duration::from)
        .or(cfg.locate.cache)
        .filter(|ttl| !ttl.is_zero());
    LocateSettings { capture, cache_ttl }
}

async fn run_locate(args: LocateArgs) -> Result<()> {
    let cfg = Config::load().context("loading config")?;
    let settings = build_settings(&args.capture, &cfg);
    let console = Console::start();

    let res = locate_with_cache(&settings, &console).await;
    let res = match res {
        Ok(report) if args.json => serde_json::to_string(&report)
            .map(|json| console.out(json))
            .map_err(anyhow::Error::from),
        Ok(report) => {
            console.out(report.summary());
            Ok(())
        }
        Err(e) => Err(e),
    };

    console.finish().await;
    res
}

async fn locate_with_cache(settings: &LocateSettings, console: &Console) -> Result<LocationReport> {
    if let Some(ttl) = settings.cache_ttl {
        match storage::load_location(ttl) {
            Ok(coords) => return Ok(LocationReport::new(coords, LocationSource::Cache)),
            Err(e) if e.is_stale() => tracing::debug!(reason = %e, "cache not usable"),
            Err(e) => tracing::warn!(error = %e, "ignoring unreadable location cache"),
        }
    }

    console.err(if settings.capture.open_browser {
        "Locating you... (opening browser)"
    } else {
        "Locating you..."
    });

    let (evt_tx, mut evt_rx) = mpsc::unbounded_channel::<CaptureEvent>();
    let capture = LocationCapture::new(settings.capture.clone());
    let handle = tokio::spawn(async move { capture.run(Some(evt_tx)).await });

    while let Some(ev) = evt_rx.recv().await {
        for line in event_lines(&ev) {
            console.err(line);
        }
    }

    let coords = handle
        .await
        .context("location capture task failed")?
        .context("could not get location")?;

    if settings.cache_ttl.is_some() {
        match storage::save_location(coords) {
            Ok(path) => tracing::debug!(path = %path.display(), "cached location"),
            Err(e) => console.err(format!("Could not cache location: {e}")),
        }
    }

    Ok(LocationReport::new(coords, LocationSource::Browser))
}

/// Human-readable progress lines for a capture event.
fn event_lines(ev: &CaptureEvent) -> Vec<String> {
    match ev {
        CaptureEvent::Listening {
            local_url,
            lan_url: Some(lan_url),
            ..
        } => vec![
            format!("Open in your browser: {lan_url}"),
            format!("  (or locally: {local_url})"),
        ],
        CaptureEvent::Listening {
            local_url,
            lan_url: None,
            ..
        } => vec![format!("Open in your browser: {local_url}")],
        CaptureEvent::BrowserLaunch { opened: false } => {
            vec!["No browser could be opened; use the URL above.".into()]
        }
        CaptureEvent::BrowserLaunch { opened: true } => Vec::new(),
    }
}

async fn run_departures(args: DeparturesArgs) -> Result<()> {
    let cfg = Config::load().context("loading config")?;
    let token = cfg.resolved_token().with_context(|| {
        format!(
            "no API token: set {} or `token` in {}",
            config::TOKEN_ENV,
            config::config_path().display()
        )
    })?;
    let client = TransitClient::new(
        cfg.api_url.as_deref().unwrap_or(transit::DEFAULT_API_URL),
        token,
    )?;

    let console = Console::start();
    let res = departures(&args, &cfg, &client, &console).await;
    console.finish().await;
    res
}

async fn departures(
    args: &DeparturesArgs,
    cfg: &Config,
    client: &TransitClient,
    console: &Console,
) -> Result<()> {
    if args.here {
        let settings = build_settings(&args.capture, cfg);
        let report = locate_with_cache(&settings, console).await?;
        console.err(report.summary());
        return boards_near(client, report.coordinates(), args.mode, console).await;
    }

    let query = match (args.query.is_empty(), cfg.default_station.as_deref()) {
        (false, _) => args.query.join(" "),
        (true, Some(station)) => station.to_string(),
        (true, None) => {
            bail!("no station given: pass a name, use --here, or set default_station in the config")
        }
    };
    let places = client
        .places(&query)
        .await
        .with_context(|| format!("searching for \"{query}\""))?;
    match resolve_place(&places.places) {
        Some(PlaceTarget::StopArea(area)) => {
            board(client, &area, transit::STATION_DEPARTURES, args.mode, console).await
        }
        Some(PlaceTarget::Position { name, coords }) => {
            console.err(format!("Stations near {name}"));
            boards_near(client, coords, args.mode, console).await
        }
        None => bail!("no station found for \"{query}\""),
    }
}

/// One board per stop area within walking distance of `coords`.
async fn boards_near(
    client: &TransitClient,
    coords: Coordinates,
    mode: TransportMode,
    console: &Console,
) -> Result<()> {
    let nearby = match client
        .places_nearby(coords, transit::NEARBY_RADIUS_M, mode)
        .await
    {
        Ok(resp) => resp.places_nearby,
        Err(TransitError::NotFound) => Vec::new(),
        Err(e) => return Err(e).context("looking up nearby stations"),
    };
    let areas = nearby_stop_areas(&nearby);
    if areas.is_empty() {
        match mode {
            TransportMode::All => bail!(
                "no stations within {} m of {coords}",
                transit::NEARBY_RADIUS_M
            ),
            _ => bail!(
                "no {mode} stations within {} m of {coords}",
                transit::NEARBY_RADIUS_M
            ),
        }
    }

    for area in &areas {
        if let Err(e) = board(client, area, transit::NEARBY_DEPARTURES, mode, console).await {
            console.err(format!("{}: {e:#}", area.name));
        }
    }
    Ok(())
}

async fn board(
    client: &TransitClient,
    area: &StopArea,
    count: u32,
    mode: TransportMode,
    console: &Console,
) -> Result<()> {
    let resp = match client.departures(&area.id, count, mode).await {
        Ok(resp) => resp,
        Err(TransitError::NotFound) => DeparturesResponse::default(),
        Err(e) => return Err(e).with_context(|| format!("departures for {}", area.name)),
    };

    console.out(area.name.clone());
    let lines = display::departure_board(&resp.departures, reference_time(&resp));
    if lines.is_empty() {
        console.out("  No upcoming departures.");
    }
    for line in lines {
        console.out(format!("  {line}"));
    }
    console.out("");
    Ok(())
}

/// The API's own clock when it reports one, since departure times are in its zone.
fn reference_time(resp: &DeparturesResponse) -> PrimitiveDateTime {
    resp.context
        .as_ref()
        .and_then(|c| c.current_datetime.as_deref())
        .and_then(display::parse_navitia_time)
        .unwrap_or_else(|| {
            let now = OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc());
            PrimitiveDateTime::new(now.date(), now.time())
        })
}

fn run_config() -> Result<()> {
    let cfg = Config::load().context("loading config")?;
    let mut lines = vec![format!("Config file: {}", config::config_path().display()), String::new()];

    lines.push(format!(
        "  {}:     {}",
        config::TOKEN_ENV,
        if cfg.resolved_token().is_some() { "set" } else { "(not set)" }
    ));
    lines.push(format!(
        "  API URL:         {}",
        cfg.api_url.as_deref().unwrap_or(transit::DEFAULT_API_URL)
    ));
    lines.push(format!(
        "  Default station: {}",
        cfg.default_station.as_deref().unwrap_or("(not set)")
    ));
    lines.push(format!(
        "  Locate timeout:  {}",
        humantime::format_duration(cfg.locate.timeout.unwrap_or(DEFAULT_CAPTURE_TIMEOUT))
    ));
    lines.push(format!(
        "  Locate port:     {}",
        cfg.locate
            .port
            .map(|p| p.to_string())
            .unwrap_or_else(|| "(random)".into())
    ));
    lines.push(format!(
        "  Location cache:  {}",
        cfg.locate
            .cache
            .map(|ttl| humantime::format_duration(ttl).to_string())
            .unwrap_or_else(|| "(disabled)".into())
    ));

    match storage::cache_path() {
        Ok(path) => {
            lines.push(format!("\nCache file: {}", path.display()));
            lines.push(format!("  {}", describe_cache(&path)));
        }
        Err(e) => lines.push(format!("\nCache file: {e}")),
    }

    for line in lines {
        println!("{line}");
    }
    Ok(())
}

fn describe_cache(path: &std::path::Path) -> String {
    match storage::read_entry(path) {
        Ok(Some(entry)) => {
            let age = entry.age(OffsetDateTime::now_utc());
            format!(
                "{} (captured {} ago)",
                entry.coordinates(),
                humantime::format_duration(Duration::from_secs(age.as_secs()))
            )
        }
        Ok(None) => "(empty)".into(),
        Err(CacheError::Decode(e)) => format!("(unreadable: {e})"),
        Err(e) => format!("({e})"),
    }
}

fn run_cache_clear() -> Result<()> {
    let path = storage::cache_path()?;
    if storage::clear_location()? {
        println!("Removed {}", path.display());
    } else {
        println!("No cached location at {}", path.display());
    }
    Ok(())
}
