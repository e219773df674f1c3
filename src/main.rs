// ██╗     ███████╗ █████╗ ██████╗
// ██║     ██╔════╝██╔══██╗██╔══██╗
// ██║     █████╗  ███████║██║  ██║
// ██║     ██╔══╝  ██╔══██║██║  ██║
// ███████╗███████╗██║  ██║██████╔╝
// ╚══════╝╚══════╝╚═╝  ╚═╝╚═════╝
//
// ██╗  ██╗ ██████╗ ██╗   ██╗███╗   ██╗██████╗
// ██║  ██║██╔═══██╗██║   ██║████╗  ██║██╔══██╗
// ███████║██║   ██║██║   ██║██╔██╗ ██║██║  ██║
// ██╔══██║██║   ██║██║   ██║██║╚██╗██║██║  ██║
// ██║  ██║╚██████╔╝╚██████╔╝██║ ╚████║██████╔╝
// ╚═╝  ╚═╝ ╚═════╝  ╚═════╝ ╚═╝  ╚═══╝╚═════╝
//
// E N G I N E
//
// The most overkill sales-lead discovery engine ever conceived.
// Rust + Tokio + Aho-Corasick + SIMD + fail-soft geocoding.
// All to figure out which jewelry stores to call after a robbery.

mod config;
mod confirmer;
mod finder;
mod geo;
mod inferrer;
mod models;
mod nearby;
mod publisher;
mod text_analyzer;

use std::fs::File;
use std::io::{self, BufRead, BufReader};

use tokio::signal;
use tokio::sync::watch;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::Config;
use crate::geo::{GeoLocationService, GoogleMapsProvider};
use crate::models::{IncidentReport, LeadRecord};
use crate::nearby::NearbyBusinessFinder;
use crate::publisher::RecordPublisher;

fn print_banner() {
    let banner = r#"

    ╔══════════════════════════════════════════════════════════════════╗
    ║                                                                  ║
    ║     ██╗     ███████╗ █████╗ ██████╗                              ║
    ║     ██║     ██╔════╝██╔══██╗██╔══██╗                             ║
    ║     ██║     █████╗  ███████║██║  ██║                             ║
    ║     ██║     ██╔══╝  ██╔══██║██║  ██║                             ║
    ║     ███████╗███████╗██║  ██║██████╔╝                             ║
    ║     ╚══════╝╚══════╝╚═╝  ╚═╝╚═════╝                              ║
    ║                                                                  ║
    ║     ██╗  ██╗ ██████╗ ██╗   ██╗███╗   ██╗██████╗                  ║
    ║     ██║  ██║██╔═══██╗██║   ██║████╗  ██║██╔══██╗                 ║
    ║     ███████║██║   ██║██║   ██║██╔██╗ ██║██║  ██║                 ║
    ║     ██╔══██║██║   ██║██║   ██║██║╚██╗██║██║  ██║                 ║
    ║     ██║  ██║╚██████╔╝╚██████╔╝██║ ╚████║██████╔╝                 ║
    ║     ╚═╝  ╚═╝ ╚═════╝  ╚═════╝ ╚═╝  ╚═══╝╚═════╝                  ║
    ║                                                                  ║
    ║        ⚡ CRIME-TO-LEAD DISCOVERY ENGINE ⚡                      ║
    ║                                                                  ║
    ║   Resolve:  Analyzer | Inferrer | Confirmer fallback chain       ║
    ║   Canvass:  jewelry | luxury_goods | sports_memorabilia          ║
    ║   Score:    Haversine distance + category gate (0-6)             ║
    ║   Speed:    SIMD-Accelerated Aho-Corasick Gazetteers             ║
    ║                                                                  ║
    ║   "Every incident is somebody's sales opportunity."              ║
    ║                                                                  ║
    ╚══════════════════════════════════════════════════════════════════╝

    "#;
    // stderr, same as the logs — stdout belongs to the record stream.
    eprintln!("{}", banner);
}

/// Read the incident feed as JSON lines, skipping anything malformed.
/// One bad line is one warning, never a dead batch.
fn read_reports(config: &Config) -> anyhow::Result<Vec<IncidentReport>> {
    let reader: Box<dyn BufRead> = match &config.input_path {
        Some(path) => {
            info!(path = path.as_str(), "reading incident feed from file");
            Box::new(BufReader::new(File::open(path)?))
        }
        None => {
            info!("reading incident feed from stdin");
            Box::new(BufReader::new(io::stdin()))
        }
    };

    let mut reports = Vec::new();
    for (lineno, line) in reader.lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        match serde_json::from_str::<IncidentReport>(trimmed) {
            Ok(report) => reports.push(report),
            Err(e) => warn!(
                line = lineno + 1,
                error = %e,
                "skipping malformed incident line"
            ),
        }
    }
    Ok(reports)
}

#[tokio::main(flavor = "multi_thread", worker_threads = 4)]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing. Logs go to stderr so the JSON-line record
    // stream on stdout stays machine-readable.
    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .with_target(true)
        .with_ansi(true)
        .init();

    print_banner();

    info!("🐕 LEAD HOUND ENGINE initializing...");

    // Load configuration
    let config = Config::from_env();
    if config.maps_api_key.is_empty() {
        warn!(
            "no LEAD_HOUND_MAPS_API_KEY configured — every provider call will fail soft \
             and no address will ever confirm"
        );
    }
    info!(
        radius_m = config.search_radius_meters,
        max_per_category = config.max_results_per_category,
        confirmation_calls = config.max_confirmation_calls,
        "✅ Configuration loaded"
    );

    // Incident feed
    let reports = read_reports(&config)?;
    info!(incidents = reports.len(), "✅ Incident feed loaded");

    // Lock-free crossbeam channel between the pipeline and the publisher
    let (record_tx, record_rx) = crossbeam_channel::bounded::<LeadRecord>(10_000);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // ═══════════════════════════════════════════
    // SPAWN RECORD PUBLISHER
    // ═══════════════════════════════════════════
    let (record_publisher, pub_stats) = RecordPublisher::new(record_rx, shutdown_rx);
    let publisher_handle = tokio::spawn(async move {
        info!("📤 Record Publisher: ONLINE");
        if let Err(e) = record_publisher.run().await {
            error!("📤 Record Publisher error: {}", e);
        }
        info!("📤 Record Publisher: OFFLINE");
    });

    // ═══════════════════════════════════════════
    // THE PIPELINE — strictly sequential, one incident at a time
    // ═══════════════════════════════════════════
    let provider = GoogleMapsProvider::new(&config)?;
    let geo = GeoLocationService::new(provider, &config);
    let business_finder = NearbyBusinessFinder::new(geo, config.clone());

    info!("🟢 ALL SYSTEMS ONLINE — LEAD HOUND ENGINE ACTIVE");

    let total = reports.len();
    let tx = &record_tx;
    let pipeline = async {
        for (i, report) in reports.iter().enumerate() {
            info!(
                incident = i + 1,
                total,
                business = %report.display_name(),
                "processing incident"
            );
            for record in business_finder.process_incident(report).await {
                if tx.send(record).is_err() {
                    error!("record channel closed — publisher died mid-run?");
                    return;
                }
            }
        }
    };

    tokio::select! {
        _ = pipeline => {
            info!("all incidents processed");
        }
        _ = signal::ctrl_c() => {
            warn!("🛑 Shutdown signal received — abandoning remaining incidents");
        }
    }

    // Hand-off complete: close the channel, tell the publisher to drain.
    drop(record_tx);
    let _ = shutdown_tx.send(true);

    info!("⏳ Waiting for publisher to drain (timeout: 10s)...");
    let _ = tokio::time::timeout(std::time::Duration::from_secs(10), publisher_handle).await;

    let pipeline_stats = business_finder.stats.snapshot();
    let publisher_stats = RecordPublisher::snapshot(&pub_stats);
    info!(
        incidents = pipeline_stats.incidents_processed,
        resolved = pipeline_stats.addresses_resolved,
        geocode_failures = pipeline_stats.geocode_failures,
        leads = pipeline_stats.leads_emitted,
        failures = pipeline_stats.incident_failures,
        published = publisher_stats.records_published,
        "run complete"
    );

    info!("💀 LEAD HOUND ENGINE: OFFLINE");
    Ok(())
}
