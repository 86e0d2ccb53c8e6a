use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use pinchain_config::Config;
use pinchain_core::checkpoint::{DohTxtResolver, StaticTxtResolver, TxtResolver};
use pinchain_core::hardforks::{self, HardFork};
use pinchain_core::{CheckpointRegistry, MergeReport, NetworkType};
use std::fmt::Write as _;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Settings for the startup merge, after CLI overrides are applied.
#[derive(Debug, Clone)]
pub struct StartupOptions {
    pub network: NetworkType,
    pub checkpoints_file: PathBuf,
    pub run_dns: bool,
    pub doh_endpoint: String,
    pub dns_timeout: Duration,
    pub dns_refresh_interval: Duration,
}

impl StartupOptions {
    pub fn from_config(cfg: &Config) -> Self {
        Self {
            network: cfg.network,
            checkpoints_file: cfg.checkpoints_file_resolved(),
            run_dns: cfg.enable_dns_checkpoints,
            doh_endpoint: cfg.doh_endpoint.clone(),
            dns_timeout: Duration::from_secs(cfg.dns_timeout_secs),
            dns_refresh_interval: Duration::from_secs(cfg.dns_refresh_interval_secs),
        }
    }

    pub fn resolver(&self) -> Result<Arc<dyn TxtResolver>> {
        if !self.run_dns {
            return Ok(Arc::new(StaticTxtResolver::default()));
        }
        let resolver = DohTxtResolver::new(self.doh_endpoint.clone(), self.dns_timeout)
            .context("failed to build DNS checkpoint resolver")?;
        Ok(Arc::new(resolver))
    }
}

/// Checkpoint state shared with validation code once startup is done.
pub struct NodeState {
    pub checkpoints: Arc<CheckpointRegistry>,
    pub resolver: Arc<dyn TxtResolver>,
    pub dns_enabled: bool,
    pub started_at: DateTime<Utc>,
}

pub type NodeHandle = Arc<NodeState>;

/// Merge all checkpoint sources. A fatal merge error stops startup.
pub fn init_checkpoints(
    opts: &StartupOptions,
    resolver: Arc<dyn TxtResolver>,
) -> Result<(NodeHandle, MergeReport)> {
    let (registry, report) = CheckpointRegistry::load(
        opts.network,
        Some(opts.checkpoints_file.as_path()),
        resolver.as_ref(),
        opts.run_dns,
    )
    .context("refusing to start with inconsistent checkpoints")?;

    log_merge_report(&report);

    let state = NodeState {
        checkpoints: Arc::new(registry),
        resolver,
        dns_enabled: opts.run_dns,
        started_at: Utc::now(),
    };
    Ok((Arc::new(state), report))
}

fn log_merge_report(report: &MergeReport) {
    log::info!(
        "Checkpoints merged: {} compiled, {} from file ({} ignored), {} from DNS",
        report.defaults_added,
        report.file_added,
        report.file_skipped,
        report.dns_accepted
    );
    if report.dns_malformed > 0 {
        log::debug!("{} malformed DNS checkpoint records dropped", report.dns_malformed);
    }
    for rejected in &report.dns_rejected {
        log::warn!(
            "DNS checkpoint {:?} rejected: {}",
            rejected.record,
            rejected.error
        );
    }
    if let Some(reason) = &report.dns_unavailable {
        log::warn!("DNS checkpoints unavailable, continuing without them: {}", reason);
    }
}

/// One DNS refresh pass, run off the async executor since the resolver blocks.
pub async fn refresh_dns_once(handle: &NodeHandle) -> Result<MergeReport> {
    let h = handle.clone();
    let report =
        tokio::task::spawn_blocking(move || h.checkpoints.refresh_dns(h.resolver.as_ref()))
            .await
            .context("DNS refresh task failed")?;

    if report.has_dns_conflicts() {
        log::warn!(
            "DNS refresh rejected {} conflicting checkpoint records",
            report.dns_rejected.len()
        );
    }
    Ok(report)
}

/// Refresh DNS checkpoints every `every` until the task is dropped.
pub async fn run_dns_refresh(handle: NodeHandle, every: Duration) {
    if every.is_zero() {
        return;
    }
    let mut ticker = tokio::time::interval(every);
    // first tick fires immediately; startup already queried DNS
    ticker.tick().await;
    loop {
        ticker.tick().await;
        if let Err(e) = refresh_dns_once(&handle).await {
            log::error!("{:#}", e);
        }
    }
}

fn format_time(unix: i64) -> String {
    DateTime::<Utc>::from_timestamp(unix, 0)
        .map(|t| t.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| unix.to_string())
}

fn format_fork(fork: &HardFork) -> String {
    format!(
        "v{:<3} height {:>8}  threshold {:>3}  ~{}",
        fork.version,
        fork.height,
        fork.threshold,
        format_time(fork.time)
    )
}

/// Human-readable checkpoint and fork status for `chain_height`.
pub fn status_report(handle: &NodeHandle, chain_height: Option<u64>) -> String {
    let registry = &handle.checkpoints;
    let network = registry.network();
    let snapshot = registry.snapshot();
    let mut out = String::new();

    let _ = writeln!(out, "network:              {}", network);
    let _ = writeln!(
        out,
        "loaded at:            {}",
        handle.started_at.format("%Y-%m-%d %H:%M:%S UTC")
    );
    let _ = writeln!(out, "checkpoints:          {}", snapshot.len());
    let _ = writeln!(out, "difficulty pins:      {}", snapshot.difficulty_points().len());
    let _ = writeln!(out, "highest checkpoint:   {}", snapshot.max_height());
    if let Some((height, hash)) = snapshot.points().last_key_value() {
        let _ = writeln!(out, "highest hash:         {} @ {}", hash, height);
    }
    let _ = writeln!(
        out,
        "DNS checkpoints:      {}",
        if handle.dns_enabled { "enabled" } else { "disabled" }
    );
    if let Some(till) = hardforks::version_1_till(network) {
        let _ = writeln!(out, "version 1 till:       {}", till);
    }

    if let Some(height) = chain_height {
        let _ = writeln!(
            out,
            "in checkpoint zone:   {}",
            snapshot.in_checkpoint_zone(height)
        );
        if let Some(fork) = hardforks::version_at(network, height) {
            let _ = writeln!(out, "active fork:          {}", format_fork(fork));
        }
        if let Some(fork) = hardforks::next_fork_after(network, height) {
            let _ = writeln!(out, "next fork:            {}", format_fork(fork));
        }
    }

    let _ = writeln!(out, "hard forks:");
    for fork in hardforks::hard_forks(network) {
        let _ = writeln!(out, "  {}", format_fork(fork));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pinchain_core::BlockCheck;

    const H100: &str = "b922e51c7cccba7f7fd12b395b942a6092566c47879862b127405dc16c3b415a";
    const FRESH: &str = "0d5882e703a4e715450cc2538ead37d2ad2960c0ad9245546187c04b11ae5b4c";

    fn options(network: NetworkType, run_dns: bool) -> StartupOptions {
        StartupOptions {
            network,
            checkpoints_file: std::env::temp_dir().join("pinchain-node-no-such-file.json"),
            run_dns,
            doh_endpoint: String::new(),
            dns_timeout: Duration::from_secs(1),
            dns_refresh_interval: Duration::from_secs(60),
        }
    }

    #[test]
    fn test_init_mainnet_checkpoints() {
        let opts = options(NetworkType::Mainnet, false);
        let (handle, report) = init_checkpoints(&opts, opts.resolver().unwrap()).unwrap();
        assert!(report.defaults_added > 0);
        assert_eq!(
            handle.checkpoints.check_block(100, &H100.parse().unwrap()),
            BlockCheck::Matches
        );
    }

    #[test]
    fn test_init_fails_on_conflicting_file() {
        let path = std::env::temp_dir().join(format!(
            "pinchain-node-conflict-{}.json",
            std::process::id()
        ));
        std::fs::write(
            &path,
            format!(
                r#"{{"hashlines":[{{"height":100,"hash":"{}"}},{{"height":100,"hash":"{}"}}]}}"#,
                H100, FRESH
            ),
        )
        .unwrap();
        let mut opts = options(NetworkType::Testnet, false);
        opts.checkpoints_file = path.clone();

        let result = init_checkpoints(&opts, opts.resolver().unwrap());
        std::fs::remove_file(&path).unwrap();

        let err = result.err().unwrap();
        assert!(format!("{:#}", err).contains("height 100"));
    }

    #[test]
    fn test_status_report_mentions_forks() {
        let opts = options(NetworkType::Mainnet, false);
        let (handle, _) = init_checkpoints(&opts, opts.resolver().unwrap()).unwrap();
        let report = status_report(&handle, Some(200_000));
        assert!(report.contains("highest checkpoint:   263664"));
        assert!(report.contains("in checkpoint zone:   true"));
        assert!(report.contains("v13"));
        assert!(report.contains("next fork:"));
    }

    #[tokio::test]
    async fn test_refresh_dns_once_appends_records() {
        let opts = options(NetworkType::Stagenet, true);
        let resolver: Arc<dyn TxtResolver> =
            Arc::new(StaticTxtResolver::new([format!("500:{}", FRESH)]));
        let (handle, report) = init_checkpoints(&opts, resolver).unwrap();
        // the startup merge already saw the record
        assert_eq!(report.dns_accepted, 1);

        let report = refresh_dns_once(&handle).await.unwrap();
        assert_eq!(report.dns_accepted, 1);
        assert!(!report.has_dns_conflicts());
        assert_eq!(handle.checkpoints.max_height(), 500);
    }
}
