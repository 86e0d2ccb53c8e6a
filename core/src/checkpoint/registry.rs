use super::merge::{MergeReport, load_checkpoints_from_dns, merge_checkpoints};
use super::{BlockCheck, BlockHash, Checkpoints, MergeError, TxtResolver};
use crate::network::NetworkType;
use parking_lot::{Mutex, RwLock};
use std::path::Path;
use std::sync::Arc;

/// Shared checkpoint handle for the rest of the node.
///
/// Readers take an `Arc` snapshot and query it without holding any lock.
/// Writers build a new store from the current one and swap it in, so a
/// reader sees either the old or the new set, never a partial update.
pub struct CheckpointRegistry {
    network: NetworkType,
    current: RwLock<Arc<Checkpoints>>,
    // serializes refreshes; readers never touch it
    writer: Mutex<()>,
}

impl CheckpointRegistry {
    pub fn new(network: NetworkType, checkpoints: Checkpoints) -> Self {
        Self {
            network,
            current: RwLock::new(Arc::new(checkpoints)),
            writer: Mutex::new(()),
        }
    }

    /// Run the startup merge and wrap the result.
    pub fn load(
        network: NetworkType,
        checkpoints_file: Option<&Path>,
        resolver: &dyn TxtResolver,
        run_dns: bool,
    ) -> Result<(Self, MergeReport), MergeError> {
        let mut checkpoints = Checkpoints::new();
        let report =
            merge_checkpoints(&mut checkpoints, network, checkpoints_file, resolver, run_dns)?;
        Ok((Self::new(network, checkpoints), report))
    }

    pub fn network(&self) -> NetworkType {
        self.network
    }

    pub fn snapshot(&self) -> Arc<Checkpoints> {
        self.current.read().clone()
    }

    /// Re-run the DNS source and publish any new entries.
    pub fn refresh_dns(&self, resolver: &dyn TxtResolver) -> MergeReport {
        let _guard = self.writer.lock();

        let mut next = (*self.snapshot()).clone();
        let mut report = MergeReport::default();
        load_checkpoints_from_dns(&mut next, self.network, resolver, &mut report);

        if report.dns_accepted > 0 {
            let before = self.current.read().max_height();
            let after = next.max_height();
            *self.current.write() = Arc::new(next);
            log::info!(
                "DNS checkpoint refresh applied {} records, max height {} -> {}",
                report.dns_accepted,
                before,
                after
            );
        }
        report
    }

    pub fn check_block(&self, height: u64, hash: &BlockHash) -> BlockCheck {
        self.snapshot().check_block(height, hash)
    }

    pub fn in_checkpoint_zone(&self, height: u64) -> bool {
        self.snapshot().in_checkpoint_zone(height)
    }

    pub fn is_alternative_block_allowed(&self, blockchain_height: u64, block_height: u64) -> bool {
        self.snapshot()
            .is_alternative_block_allowed(blockchain_height, block_height)
    }

    pub fn max_height(&self) -> u64 {
        self.snapshot().max_height()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checkpoint::StaticTxtResolver;
    use std::thread;

    const H100: &str = "b922e51c7cccba7f7fd12b395b942a6092566c47879862b127405dc16c3b415a";
    const OTHER: &str = "4161494672a7ef39e1a1c6d5e4b3c6e899b5a945cd1dd7239ad734189c663f29";

    #[test]
    fn test_load_and_query() {
        let (registry, report) = CheckpointRegistry::load(
            NetworkType::Mainnet,
            None,
            &StaticTxtResolver::default(),
            false,
        )
        .unwrap();
        assert!(report.defaults_added > 0);
        assert_eq!(registry.network(), NetworkType::Mainnet);
        assert_eq!(
            registry.check_block(100, &H100.parse().unwrap()),
            BlockCheck::Matches
        );
        assert!(registry.in_checkpoint_zone(263664));
        assert!(!registry.in_checkpoint_zone(263665));
        assert!(!registry.is_alternative_block_allowed(300000, 263664));
        assert!(registry.is_alternative_block_allowed(300000, 263665));
    }

    #[test]
    fn test_refresh_appends_without_touching_old_snapshot() {
        let registry = CheckpointRegistry::new(NetworkType::Stagenet, Checkpoints::new());
        let old = registry.snapshot();

        let resolver = StaticTxtResolver::new([format!("100:{}", H100)]);
        let report = registry.refresh_dns(&resolver);
        assert_eq!(report.dns_accepted, 1);
        assert!(old.is_empty());
        assert_eq!(registry.max_height(), 100);

        // a conflicting refresh changes nothing
        let resolver = StaticTxtResolver::new([format!("100:{}", OTHER)]);
        let report = registry.refresh_dns(&resolver);
        assert!(report.has_dns_conflicts());
        assert_eq!(
            registry.snapshot().points()[&100],
            H100.parse::<BlockHash>().unwrap()
        );
    }

    #[test]
    fn test_concurrent_readers_during_refresh() {
        let registry = Arc::new(CheckpointRegistry::new(
            NetworkType::Stagenet,
            Checkpoints::new(),
        ));

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let registry = registry.clone();
                thread::spawn(move || {
                    for _ in 0..1000 {
                        let snap = registry.snapshot();
                        let max = snap.max_height();
                        assert!(max == 0 || max == 100);
                        assert_eq!(snap.in_checkpoint_zone(100), max == 100);
                    }
                })
            })
            .collect();

        registry.refresh_dns(&StaticTxtResolver::new([format!("100:{}", H100)]));

        for r in readers {
            r.join().unwrap();
        }
        assert_eq!(registry.max_height(), 100);
    }
}
