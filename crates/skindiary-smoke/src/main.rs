//! Skin Diary Smoke Harness
//!
//! Registers the offline agent against a running Skin Diary server, replays a
//! set of page and asset requests through it, and prints a JSON report.

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Context;
use serde_json::json;
use skindiary_common::{init_logging, LogConfig, LogFormat};
use skindiary_net::{LoaderConfig, Request, ResourceLoader};
use skindiary_sw::{
    AgentConfig, FetchEvent, FetchOutcome, LogNotifier, RegistrationOptions,
    ServiceWorkerContainer, ServiceWorkerEvent,
};
use tracing::{info, warn};
use url::Url;

struct Args {
    origin: Option<String>,
    config: Option<String>,
    log_format: String,
    paths: Vec<String>,
    timeout_ms: u64,
}

impl Args {
    fn parse() -> Self {
        let mut args = std::env::args().skip(1);
        let mut origin = None;
        let mut config = None;
        let mut log_format = "compact".to_string();
        let mut paths = vec![
            "/".to_string(),
            "/history".to_string(),
            "/static/js/app.js".to_string(),
        ];
        let mut timeout_ms = 10_000u64;

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--origin" => {
                    origin = args.next();
                }
                "--config" => {
                    config = args.next();
                }
                "--log-format" => {
                    if let Some(val) = args.next() {
                        log_format = val;
                    }
                }
                "--paths" => {
                    if let Some(val) = args.next() {
                        paths = val.split(',').map(|p| p.trim().to_string()).collect();
                    }
                }
                "--timeout-ms" => {
                    if let Some(val) = args.next() {
                        timeout_ms = val.parse().unwrap_or(10_000);
                    }
                }
                _ => {}
            }
        }

        Self {
            origin,
            config,
            log_format,
            paths,
            timeout_ms,
        }
    }
}

/// Paths whose last segment has no extension are requested as page navigations.
fn is_page(path: &str) -> bool {
    path.rsplit('/')
        .next()
        .map(|name| !name.contains('.'))
        .unwrap_or(true)
}

fn load_config(args: &Args) -> anyhow::Result<AgentConfig> {
    let mut config = match &args.config {
        Some(path) => AgentConfig::from_file(path)
            .with_context(|| format!("loading agent config from {path}"))?,
        None => AgentConfig::default(),
    };

    if let Some(origin) = &args.origin {
        config.origin = Url::parse(origin).with_context(|| format!("invalid origin {origin}"))?;
    }
    config.network_timeout = Duration::from_millis(args.timeout_ms);
    config.validate()?;
    Ok(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let format: LogFormat = args.log_format.parse()?;
    init_logging(LogConfig::default().with_format(format))?;

    let config = load_config(&args)?;
    info!(
        origin = %config.origin,
        cache = %config.cache_name,
        paths = args.paths.len(),
        "Starting Skin Diary Smoke Harness"
    );

    let loader = ResourceLoader::new(LoaderConfig {
        default_timeout: config.network_timeout,
        ..Default::default()
    })?;
    let (container, mut events) =
        ServiceWorkerContainer::new(Arc::new(loader), Arc::new(LogNotifier));

    let script_url = config.origin.join("/service-worker.js")?;
    let origin = config.origin.clone();

    let started = Instant::now();
    let scope = container
        .register(script_url.as_str(), config, RegistrationOptions::default())
        .await
        .context("registering offline agent")?;
    let install_ms = started.elapsed().as_secs_f64() * 1000.0;

    let mut requests = Vec::new();
    for path in &args.paths {
        let url = origin.join(path)?;
        let request = if is_page(path) {
            Request::navigate(url.clone())
        } else {
            Request::get(url.clone())
        };

        let started = Instant::now();
        let outcome = container.fetch(FetchEvent::new(request)).await;
        let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;

        let entry = match outcome {
            Ok(FetchOutcome::Respond(response)) => json!({
                "url": url.as_str(),
                "status": response.status,
                "source": format!("{:?}", response.source),
                "bytes": response.body.len(),
                "ms": (elapsed_ms * 100.0).round() / 100.0,
            }),
            Ok(FetchOutcome::Passthrough) => json!({
                "url": url.as_str(),
                "source": "Passthrough",
            }),
            Err(e) => {
                warn!(url = %url, error = %e, "Request unresolved");
                json!({
                    "url": url.as_str(),
                    "error": e.to_string(),
                })
            }
        };
        requests.push(entry);
    }

    container.settle().await;

    let mut lifecycle = Vec::new();
    while let Ok(event) = events.try_recv() {
        if let ServiceWorkerEvent::StateChange { new_state, .. } = event {
            lifecycle.push(format!("{new_state:?}"));
        }
    }

    let caches = container.caches();
    let caches = caches.read().await;
    let cache_summary: Vec<serde_json::Value> = caches
        .keys()
        .into_iter()
        .map(|name| {
            let entries = caches.get(&name).map(|c| c.len()).unwrap_or(0);
            json!({ "name": name, "entries": entries })
        })
        .collect();

    let report = json!({
        "scope": scope,
        "install_ms": (install_ms * 100.0).round() / 100.0,
        "lifecycle": lifecycle,
        "caches": cache_summary,
        "requests": requests,
    });
    println!("{}", serde_json::to_string_pretty(&report)?);

    Ok(())
}
