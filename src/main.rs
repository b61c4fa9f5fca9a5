//! Command-line entrypoint: wires argument parsing, logging, and the
//! orchestrator together and drives one scan per target, writing JSON
//! and/or a plain-text summary per spec §6.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;

use webfp::config::ScanConfig;
use webfp::context::StageOptions;
use webfp::fingerprint::Catalog;
use webfp::orchestrator::Orchestrator;
use webfp::output::{json, pretty, SiteReport};
use webfp::request::RequesterConfig;

/// Fingerprint-driven web-application information gatherer.
#[derive(Parser, Debug)]
#[command(name = "webfp", about = "Identify CMSes, platforms, and known vulnerabilities on a web server")]
struct Cli {
    /// Target URL to scan.
    url: Option<String>,

    /// Read target URLs from a file, one per line. Combinable with a
    /// positional URL.
    #[arg(short = 'l', long = "url-file", value_name = "FILE")]
    url_file: Option<PathBuf>,

    /// Directory holding the fingerprint catalog (cms/, js/, platform/, ...).
    #[arg(long = "data-dir", value_name = "DIR", default_value = "./data")]
    data_dir: PathBuf,

    /// Suppress the redirect confirmation prompt.
    #[arg(short = 'q', long = "quiet")]
    quiet: bool,

    /// Stop the CMS stage after N distinct CMSes are confirmed.
    #[arg(short = 'n', long = "stop-after", value_name = "N", default_value_t = 1)]
    stop_after: usize,

    /// Run every stage to completion, ignoring `stop_after`.
    #[arg(short = 'a', long = "run-all")]
    run_all: bool,

    /// Enable the AllCMS stage (no new probes, matches every cached response).
    #[arg(short = 'm', long = "match-all")]
    match_all: bool,

    /// Override the User-Agent header.
    #[arg(short = 'u', long = "user-agent", value_name = "UA")]
    user_agent: Option<String>,

    /// Disable subdomain enumeration.
    #[arg(short = 'd', long = "no-subdomains")]
    no_subdomains: bool,

    /// Worker pool size.
    #[arg(short = 't', long = "threads", value_name = "N", default_value_t = 10)]
    threads: usize,

    /// Skip loading a previously saved cache.
    #[arg(long = "no-cache-load")]
    no_cache_load: bool,

    /// Skip saving the cache at the end of the scan.
    #[arg(long = "no-cache-save")]
    no_cache_save: bool,

    /// Shorthand for both `--no-cache-load` and `--no-cache-save`.
    #[arg(short = 'N')]
    no_cache: bool,

    /// Proxy all requests through `host:port`.
    #[arg(long = "proxy", value_name = "HOST:PORT")]
    proxy: Option<String>,

    /// Increase logging verbosity. Repeatable.
    #[arg(short = 'v', action = clap::ArgAction::Count)]
    verbosity: u8,

    /// Write JSON results to PATH in addition to the text summary.
    #[arg(short = 'w', long = "write-json", value_name = "PATH")]
    write_json: Option<PathBuf>,
}

fn init_logging(verbosity: u8) {
    let level = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

fn collect_targets(cli: &Cli) -> anyhow::Result<Vec<String>> {
    let mut targets = Vec::new();
    if let Some(url) = &cli.url {
        targets.push(url.clone());
    }
    if let Some(path) = &cli.url_file {
        let text = fs::read_to_string(path)?;
        targets.extend(text.lines().map(str::trim).filter(|l| !l.is_empty()).map(str::to_string));
    }
    if targets.is_empty() {
        anyhow::bail!("no target specified: pass a URL or -l FILE");
    }
    Ok(targets)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbosity);

    let targets = match collect_targets(&cli) {
        Ok(t) => t,
        Err(e) => {
            eprintln!("error: {e}");
            std::process::exit(2);
        }
    };

    let catalog = Arc::new(Catalog::load(&cli.data_dir)?);

    let mut requester_config = RequesterConfig { threads: cli.threads.max(1), proxy: cli.proxy.clone(), ..RequesterConfig::default() };
    if let Some(ua) = &cli.user_agent {
        requester_config.user_agent = ua.clone();
    }

    let stage_options = StageOptions {
        batch_size: 20,
        stop_after: cli.stop_after,
        run_all: cli.run_all,
        match_all: cli.match_all,
        subdomains: !cli.no_subdomains,
        quiet: cli.quiet,
        verbosity: cli.verbosity,
    };

    let mut config_builder = ScanConfig::builder().data_dir(cli.data_dir.clone()).targets(targets);
    config_builder = config_builder
        .requester(requester_config.clone())
        .stage_options(stage_options.clone())
        .no_cache_load(cli.no_cache_load || cli.no_cache)
        .no_cache_save(cli.no_cache_save || cli.no_cache);
    if let Some(path) = &cli.write_json {
        config_builder = config_builder.output_path(path.clone());
    }
    let config = config_builder.build()?;

    let cache_dir = config.cache_dir.clone();
    fs::create_dir_all(&cache_dir).ok();
    webfp::cache::Cache::sweep_expired(&cache_dir, webfp::cache::DEFAULT_TTL_SECS);

    let mut orchestrator = Orchestrator::new(catalog, cache_dir, config.requester.clone(), config.stage_options.clone());
    orchestrator.no_cache_load = config.no_cache_load;
    orchestrator.no_cache_save = config.no_cache_save;

    let mut reports: Vec<SiteReport> = Vec::with_capacity(config.targets.len());
    for target in &config.targets {
        let report = orchestrator.scan_target(target).await;
        if !config.stage_options.quiet {
            print!("{}", pretty::render(&report));
        }
        reports.push(report);
    }

    if let Some(path) = &config.output_path {
        json::write_to_file(&reports, path)?;
    }

    Ok(())
}
