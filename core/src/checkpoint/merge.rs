use super::defaults::init_default_checkpoints;
use super::loader::{TxtResolver, dns_urls, load_checkpoint_file, parse_dns_record};
use super::{BlockHash, CheckpointError, Checkpoints, MergeError, SourceKind};
use crate::network::NetworkType;
use std::path::Path;

/// A DNS record that parsed but could not be added.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedRecord {
    pub height: u64,
    pub record: String,
    pub error: CheckpointError,
}

/// What a merge did, source by source.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeReport {
    pub defaults_added: usize,
    pub file_found: bool,
    pub file_added: usize,
    pub file_skipped: usize,
    pub dns_accepted: usize,
    pub dns_malformed: usize,
    pub dns_rejected: Vec<RejectedRecord>,
    /// Set when the DNS lookup itself failed. The merge still succeeds.
    pub dns_unavailable: Option<String>,
}

impl MergeReport {
    /// True if at least one DNS record contradicted an existing pin.
    pub fn has_dns_conflicts(&self) -> bool {
        !self.dns_rejected.is_empty()
    }
}

/// Build the checkpoint set for `network` from all sources, in order of
/// trust: compiled defaults, then the checkpoint file, then DNS.
///
/// Failures from defaults or the file are fatal. DNS failures are recorded in
/// the report and never abort the merge.
pub fn merge_checkpoints(
    checkpoints: &mut Checkpoints,
    network: NetworkType,
    checkpoints_file: Option<&Path>,
    resolver: &dyn TxtResolver,
    run_dns: bool,
) -> Result<MergeReport, MergeError> {
    let mut report = MergeReport::default();

    report.defaults_added =
        init_default_checkpoints(checkpoints, network).map_err(|(height, error)| MergeError {
            source_kind: SourceKind::Defaults,
            height: Some(height),
            error,
        })?;
    log::info!(
        "Loaded {} compiled {} checkpoints, max height {}",
        report.defaults_added,
        network,
        checkpoints.max_height()
    );

    load_new_checkpoints(
        checkpoints,
        network,
        checkpoints_file,
        resolver,
        run_dns,
        &mut report,
    )?;

    Ok(report)
}

/// Apply the file and (optionally) DNS sources on top of what `checkpoints`
/// already holds.
pub fn load_new_checkpoints(
    checkpoints: &mut Checkpoints,
    network: NetworkType,
    checkpoints_file: Option<&Path>,
    resolver: &dyn TxtResolver,
    run_dns: bool,
    report: &mut MergeReport,
) -> Result<(), MergeError> {
    if let Some(path) = checkpoints_file {
        load_checkpoints_from_file(checkpoints, path, report)?;
    }
    if run_dns {
        load_checkpoints_from_dns(checkpoints, network, resolver, report);
    }
    Ok(())
}

/// Add file records above the current max height. Records at or below it
/// are not added, so the file can only extend what is already pinned; one
/// that contradicts an existing pin is still a fatal conflict.
pub fn load_checkpoints_from_file(
    checkpoints: &mut Checkpoints,
    path: &Path,
    report: &mut MergeReport,
) -> Result<(), MergeError> {
    let fatal = |height: Option<u64>, error: CheckpointError| MergeError {
        source_kind: SourceKind::File,
        height,
        error,
    };

    let records = match load_checkpoint_file(path).map_err(|e| fatal(None, e))? {
        Some(records) => records,
        None => return Ok(()),
    };
    report.file_found = true;

    log::info!("Adding checkpoints from blockchain hashfile {:?}", path);
    let prev_max_height = checkpoints.max_height();
    log::debug!("Hard-coded max checkpoint height is {}", prev_max_height);

    for record in records {
        if record.height <= prev_max_height {
            if let Some(existing) = checkpoints.points().get(&record.height) {
                let proposed: BlockHash = record
                    .hash
                    .parse()
                    .map_err(|e| fatal(Some(record.height), e))?;
                if proposed != *existing {
                    return Err(fatal(
                        Some(record.height),
                        CheckpointError::ConflictingCheckpoint {
                            height: record.height,
                            existing: *existing,
                            proposed,
                        },
                    ));
                }
            }
            log::debug!("ignoring checkpoint height {}", record.height);
            report.file_skipped += 1;
            continue;
        }

        log::debug!(
            "Adding checkpoint height {}, hash={}",
            record.height,
            record.hash
        );
        checkpoints
            .add_checkpoint(record.height, &record.hash, record.difficulty.as_deref())
            .map_err(|e| fatal(Some(record.height), e))?;
        report.file_added += 1;
    }

    Ok(())
}

/// Add `height:hash` TXT records published for `network`.
///
/// Lookup failure is fail-open: DNS being unreachable must never keep the
/// node from starting, so it is logged and recorded in the report only.
/// Malformed records are dropped one by one. Records that conflict with an
/// existing pin are rejected and recorded, the rest of the batch still
/// applies.
pub fn load_checkpoints_from_dns(
    checkpoints: &mut Checkpoints,
    network: NetworkType,
    resolver: &dyn TxtResolver,
    report: &mut MergeReport,
) {
    let records = match resolver.resolve_txt(dns_urls(network)) {
        Ok(records) => records,
        Err(e) => {
            log::warn!("Skipping DNS checkpoints for {}: {}", network, e);
            report.dns_unavailable = Some(e.to_string());
            return;
        }
    };

    for record in records {
        let Some((height, hash)) = parse_dns_record(&record) else {
            log::debug!("Ignoring malformed DNS checkpoint record {:?}", record);
            report.dns_malformed += 1;
            continue;
        };

        match checkpoints.insert_checkpoint(height, hash, None) {
            Ok(()) => report.dns_accepted += 1,
            Err(error) => {
                log::error!("Rejected DNS checkpoint at height {}: {}", height, error);
                report.dns_rejected.push(RejectedRecord {
                    height,
                    record,
                    error,
                });
            }
        }
    }
}
