//! CLI entry point for the ridership recovery toolkit.
//!
//! Each subcommand is one unit of work: fetch or read its inputs, restrict
//! them to the study area, compute derived metrics, and write CSV, GeoJSON
//! and JSON artifacts for the report's charts and maps.

use std::collections::HashMap;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use ridership_recovery::analyzers::{
    commute, demographics, network, remote_work, returners, service, stations,
};
use ridership_recovery::census::{BlockGroup, fetch_block_groups};
use ridership_recovery::config::StudyConfig;
use ridership_recovery::fetch::auth::UrlParam;
use ridership_recovery::fetch::{BasicClient, HttpClient};
use ridership_recovery::geography::AllowList;
use ridership_recovery::geojson::{
    properties_of, read_feature_collection, write_feature_collection,
};
use ridership_recovery::gtfs::Feed;
use ridership_recovery::lodes::{FlowRow, fetch_workplace_flows};
use ridership_recovery::output::{append_record, read_records, write_records, write_summary};
use serde::Serialize;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "ridership_recovery")]
#[command(about = "Bay Area ridership recovery analyses", long_about = None)]
struct Cli {
    /// Study configuration (JSON). Built-in defaults are used if absent.
    #[arg(short, long, global = true, default_value = "study.json")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch ACS block-group demographics and build the study-area layer
    Census {
        /// Directory with downloaded source layers
        #[arg(long, default_value = "data/raw")]
        raw_dir: PathBuf,

        /// Directory for derived tables and layers
        #[arg(long, default_value = "data/processed")]
        processed_dir: PathBuf,

        /// Directory for summaries
        #[arg(short, long, default_value = "outputs")]
        output_dir: PathBuf,
    },
    /// Fetch LODES origin-destination flows and analyze commuter loss
    Lehd {
        /// Directory for the filtered flow tables
        #[arg(long, default_value = "data/lehd")]
        lehd_dir: PathBuf,

        /// Directory for summaries
        #[arg(short, long, default_value = "outputs")]
        output_dir: PathBuf,
    },
    /// Build the bus route layer and station connectivity from a GTFS feed
    Gtfs {
        /// Directory holding the GTFS text files
        #[arg(long, default_value = "data/raw/ac_transit")]
        gtfs_dir: PathBuf,

        #[arg(long, default_value = "data/processed")]
        processed_dir: PathBuf,

        #[arg(short, long, default_value = "outputs")]
        output_dir: PathBuf,
    },
    /// Compare ridership loss across BART stations
    Stations {
        #[arg(long, default_value = "data/processed")]
        processed_dir: PathBuf,

        #[arg(short, long, default_value = "outputs")]
        output_dir: PathBuf,
    },
    /// Work-from-home retention and changed travel patterns
    RemoteWork {
        #[arg(short, long, default_value = "outputs")]
        output_dir: PathBuf,
    },
    /// Where former transit riders among office returners went
    Returners {
        #[arg(short, long, default_value = "outputs")]
        output_dir: PathBuf,
    },
    /// On-time performance, excess wait time and dual-system degradation
    Service {
        /// Historical performance CSV (Fiscal_Year, On_Time_Performance_%)
        #[arg(
            long,
            default_value = "data/processed/bart_historical_performance_metrics.csv"
        )]
        otp_csv: PathBuf,

        /// Temporal equity CSV (Fiscal_Year, Income_Category, Estimated_EWT_Min)
        #[arg(long, default_value = "data/processed/temporal_equity_analysis.csv")]
        ewt_csv: PathBuf,

        #[arg(short, long, default_value = "outputs")]
        output_dir: PathBuf,
    },
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    let _file_guard = init_logging()?;

    let cli = Cli::parse();
    let config = StudyConfig::load(&cli.config)
        .with_context(|| format!("loading study config {}", cli.config.display()))?;
    let allow = config
        .study_area
        .allow_list()
        .context("building study-area allow-list")?;
    info!(level = ?allow.level(), codes = allow.len(), "Study area ready");

    match cli.command {
        Commands::Census {
            raw_dir,
            processed_dir,
            output_dir,
        } => run_census(&config, &allow, &raw_dir, &processed_dir, &output_dir)?,
        Commands::Lehd {
            lehd_dir,
            output_dir,
        } => run_lehd(&config, &allow, &lehd_dir, &output_dir)?,
        Commands::Gtfs {
            gtfs_dir,
            processed_dir,
            output_dir,
        } => run_gtfs(&config, &gtfs_dir, &processed_dir, &output_dir)?,
        Commands::Stations {
            processed_dir,
            output_dir,
        } => run_stations(&config, &processed_dir, &output_dir)?,
        Commands::RemoteWork { output_dir } => run_remote_work(&config, &output_dir)?,
        Commands::Returners { output_dir } => run_returners(&config, &output_dir)?,
        Commands::Service {
            otp_csv,
            ewt_csv,
            output_dir,
        } => run_service(&config, &otp_csv, &ewt_csv, &output_dir)?,
    }

    Ok(())
}

/// Logging setup: colored stderr + JSON rolling log file.
fn init_logging() -> Result<WorkerGuard> {
    let log_file_path = std::env::var("LOG_FILE_PATH")
        .unwrap_or_else(|_| "logs/ridership_recovery.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("ridership_recovery.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_filter = EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?);
    let json_filter = EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(stderr_filter);

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(json_filter);

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    Ok(file_guard)
}

/// Census client, keyed when `CENSUS_API_KEY` is set.
fn census_client() -> Result<Box<dyn HttpClient>> {
    let basic = BasicClient::new().context("building HTTP client")?;
    match std::env::var("CENSUS_API_KEY") {
        Ok(key) if !key.is_empty() => Ok(Box::new(UrlParam::census_key(basic, key))),
        _ => {
            warn!("CENSUS_API_KEY not set, using the anonymous request quota");
            Ok(Box::new(basic))
        }
    }
}

#[tracing::instrument(skip_all)]
fn run_census(
    config: &StudyConfig,
    allow: &AllowList,
    raw_dir: &Path,
    processed_dir: &Path,
    output_dir: &Path,
) -> Result<()> {
    let client = census_client()?;
    let block_groups = fetch_block_groups(&*client, &config.census)
        .context("fetching ACS block groups")?;

    write_records(
        &processed_dir.join("alameda_block_groups_demographics.csv"),
        &block_groups,
    )?;

    let study: Vec<BlockGroup> = allow
        .filter(&block_groups, |bg: &&BlockGroup| bg.geoid.as_str())
        .cloned()
        .collect();
    if study.is_empty() {
        warn!("No block groups fall inside the study area");
    }
    let summary = demographics::summarize_block_groups(&study);
    write_summary(
        &output_dir.join("block_group_summary.json"),
        "block_group_demographics",
        &summary,
    )?;

    let geometry_path = raw_dir.join("alameda_block_groups.geojson");
    if !geometry_path.exists() {
        warn!(path = %geometry_path.display(), "Block-group geometry not found, skipping layer");
        return Ok(());
    }

    let rows = block_groups
        .iter()
        .map(|bg| Ok((bg.geoid.clone(), properties_of(bg)?)))
        .collect::<Result<HashMap<_, _>>>()?;
    let mut layer = read_feature_collection(&geometry_path)
        .context("reading block-group geometry")?;
    layer.join_properties("GEOID", &rows);
    let layer = layer.retain_admitted("GEOID", allow);
    write_feature_collection(
        &processed_dir.join("berkeley_block_groups_with_demographics.geojson"),
        &layer,
    )?;

    let tracts_path = processed_dir.join("berkeley_tracts_with_demographics.geojson");
    if tracts_path.exists() {
        let tracts = read_feature_collection(&tracts_path)
            .context("reading tract layer")?;
        let comparison = demographics::compare_granularity(&tracts, &layer);
        info!(
            tracts = comparison.tracts,
            block_groups = comparison.block_groups,
            ratio = comparison.ratio,
            "Tract vs block-group comparison"
        );
        write_summary(
            &output_dir.join("tract_vs_block_group.json"),
            "granularity_comparison",
            &comparison,
        )?;
    } else {
        warn!(path = %tracts_path.display(), "Tract layer not found, skipping comparison");
    }

    Ok(())
}

#[derive(Serialize)]
struct CommuteReport {
    summaries: Vec<commute::CommuteSummary>,
    loss: commute::CommuterLoss,
    origin_counties: Vec<commute::OriginCounty>,
}

#[tracing::instrument(skip_all)]
fn run_lehd(
    config: &StudyConfig,
    allow: &AllowList,
    lehd_dir: &Path,
    output_dir: &Path,
) -> Result<()> {
    let client = BasicClient::new().context("building HTTP client")?;
    let settings = &config.lodes;

    let mut summaries = Vec::new();
    let mut origin_counties = Vec::new();
    for year in [settings.pre_year, settings.post_year] {
        let flows = fetch_workplace_flows(&client, &settings.query, year, allow)
            .with_context(|| format!("fetching LODES OD flows for {year}"))?;

        write_records(
            &lehd_dir.join(format!("berkeley_od_{year}.csv")),
            flows.iter().map(FlowRow::from),
        )?;

        let summary = commute::summarize(year, &flows, allow);
        info!(
            year,
            total_jobs = summary.total_jobs,
            commute_in = summary.commute_in,
            pct_commute_in = summary.pct_commute_in,
            "Commute summary"
        );
        summaries.push(summary);
        origin_counties.extend(commute::top_origin_counties(
            year,
            &flows,
            config.top_origin_counties,
        ));
    }

    let loss = commute::commuter_loss(&summaries[0], &summaries[1], config.transit_share);
    info!(
        commuters_lost = loss.commuters_lost,
        transit_commuters_lost = loss.transit_commuters_lost,
        "Commuter loss"
    );

    append_record(&output_dir.join("lehd_commute_history.csv"), &loss)?;
    write_records(
        &output_dir.join("lehd_origin_counties.csv"),
        &origin_counties,
    )?;
    let report = CommuteReport {
        summaries,
        loss,
        origin_counties,
    };
    write_summary(
        &output_dir.join("lehd_commute_analysis.json"),
        "lehd_commute",
        &report,
    )?;
    Ok(())
}

#[tracing::instrument(skip_all)]
fn run_gtfs(
    config: &StudyConfig,
    gtfs_dir: &Path,
    processed_dir: &Path,
    output_dir: &Path,
) -> Result<()> {
    let feed = Feed::load(gtfs_dir).context("loading GTFS feed")?;
    let settings = &config.network;

    let stops = feed.stops_within(&settings.bbox);
    let route_ids = feed.routes_serving(&stops);
    info!(
        stops = stops.len(),
        routes = route_ids.len(),
        "Routes serving the study area"
    );

    let shapes = feed.route_shapes(&route_ids, settings.max_routes);
    write_feature_collection(
        &output_dir.join("ac_transit_route_network.geojson"),
        &network::route_features(&shapes),
    )?;

    let peak = network::PeakWindow {
        start_hour: settings.peak_start_hour,
        end_hour: settings.peak_end_hour,
    };
    let connectivity: Vec<network::Connectivity> = config
        .stations
        .iter()
        .map(|s| network::station_connectivity(&feed, s, settings.catchment_radius_miles, peak))
        .collect();
    write_records(
        &processed_dir.join("bart_ac_transit_connectivity.csv"),
        &connectivity,
    )?;
    Ok(())
}

#[tracing::instrument(skip_all)]
fn run_stations(config: &StudyConfig, processed_dir: &Path, output_dir: &Path) -> Result<()> {
    let metrics = stations::compare_stations(&config.stations, config.low_income_threshold);
    for m in &metrics {
        info!(
            station = %m.station,
            pct_loss = m.pct_loss,
            income = m.income_category.label(),
            "Station ridership"
        );
    }

    write_records(&processed_dir.join("station_comparison.csv"), &metrics)?;
    let layer = stations::station_features(&config.stations, &metrics)?;
    write_feature_collection(&output_dir.join("bart_stations.geojson"), &layer)?;
    write_summary(
        &output_dir.join("station_comparison.json"),
        "station_comparison",
        &metrics,
    )?;
    Ok(())
}

#[derive(Serialize)]
struct RemoteWorkReport {
    retention: Option<remote_work::WfhRetention>,
    changed_patterns: Vec<remote_work::PatternShareRow>,
}

#[tracing::instrument(skip_all)]
fn run_remote_work(config: &StudyConfig, output_dir: &Path) -> Result<()> {
    let flow = remote_work::wfh_flow(&config.wfh_series);
    write_records(&output_dir.join("wfh_flow.csv"), &flow)?;

    let retention = remote_work::wfh_retention(&config.wfh_series);
    if retention.is_none() {
        warn!("WFH series is empty");
    }
    let changed_patterns = remote_work::pattern_shares(&config.changed_patterns);
    write_records(&output_dir.join("changed_patterns.csv"), &changed_patterns)?;

    let report = RemoteWorkReport {
        retention,
        changed_patterns,
    };
    write_summary(&output_dir.join("remote_work.json"), "remote_work", &report)?;
    Ok(())
}

#[tracing::instrument(skip_all)]
fn run_returners(config: &StudyConfig, output_dir: &Path) -> Result<()> {
    let analysis = returners::analyze_returners(
        config.returners_total,
        config.transit_share,
        config.workforce,
        &config.returner_breakdown,
        &config.mode_share,
    );
    info!(
        former_transit_riders = analysis.former_transit_riders,
        implied_returners = ?analysis.implied_returners,
        "Returner analysis"
    );

    write_records(
        &output_dir.join("returner_breakdown.csv"),
        &analysis.breakdown,
    )?;
    write_summary(&output_dir.join("returners.json"), "returners", &analysis)?;
    Ok(())
}

#[derive(Serialize)]
struct ServiceReport {
    otp_goal: f64,
    otp_low: Option<service::OtpLow>,
    dual_system: Vec<service::DualSystemRow>,
}

#[tracing::instrument(skip_all)]
fn run_service(
    config: &StudyConfig,
    otp_csv: &Path,
    ewt_csv: &Path,
    output_dir: &Path,
) -> Result<()> {
    let mut otp_low = None;
    if otp_csv.exists() {
        let records: Vec<service::OtpRecord> =
            read_records(otp_csv).context("reading OTP history")?;
        let series = service::otp_series(&records, config.otp_goal);
        otp_low = service::otp_low(&series, config.otp_goal);
        write_records(&output_dir.join("bart_otp_series.csv"), &series)?;
    } else {
        warn!(path = %otp_csv.display(), "OTP history not found, skipping OTP series");
    }

    if ewt_csv.exists() {
        let records: Vec<service::EwtRecord> = read_records(ewt_csv)
            .context("reading excess wait time table")?;
        let means = service::ewt_by_income(&records);
        write_records(&output_dir.join("ewt_by_income.csv"), &means)?;
    } else {
        warn!(path = %ewt_csv.display(), "Excess wait time table not found, skipping");
    }

    let dual_system = service::dual_system(&config.bart_series, &config.ac_transit_series);
    write_records(
        &output_dir.join("dual_system_degradation.csv"),
        &dual_system,
    )?;

    let report = ServiceReport {
        otp_goal: config.otp_goal,
        otp_low,
        dual_system,
    };
    write_summary(
        &output_dir.join("service_quality.json"),
        "service_quality",
        &report,
    )?;
    Ok(())
}
