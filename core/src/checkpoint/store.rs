use super::{BlockHash, CheckpointError, CheckpointResult};
use primitive_types::U256;
use std::collections::BTreeMap;

/// Outcome of checking a block against the pinned hashes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockCheck {
    /// No checkpoint at this height; ordinary consensus rules apply.
    NotCheckpointed,
    Matches,
    Mismatches,
}

impl BlockCheck {
    pub fn is_checkpoint(&self) -> bool {
        !matches!(self, BlockCheck::NotCheckpointed)
    }

    /// `false` only for a hash that contradicts a pin.
    pub fn passes(&self) -> bool {
        !matches!(self, BlockCheck::Mismatches)
    }
}

/// Checkpoint store: pinned hashes and pinned cumulative difficulties by height.
///
/// Both maps are append-only. A height may be re-added with the same value any
/// number of times, never with a different one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Checkpoints {
    points: BTreeMap<u64, BlockHash>,
    difficulty_points: BTreeMap<u64, U256>,
}

impl Checkpoints {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pin `height` to `hash_str` and, when given and non-empty, to a
    /// cumulative difficulty written in decimal.
    ///
    /// The call is atomic: on any error neither map is touched.
    pub fn add_checkpoint(
        &mut self,
        height: u64,
        hash_str: &str,
        difficulty_str: Option<&str>,
    ) -> CheckpointResult<()> {
        let hash: BlockHash = hash_str.parse()?;
        let difficulty = match difficulty_str.filter(|s| !s.is_empty()) {
            Some(s) => Some(
                U256::from_dec_str(s)
                    .map_err(|_| CheckpointError::MalformedDifficulty(s.to_string()))?,
            ),
            None => None,
        };
        self.insert_checkpoint(height, hash, difficulty)
    }

    /// Typed form of [`Checkpoints::add_checkpoint`] for already parsed values.
    pub fn insert_checkpoint(
        &mut self,
        height: u64,
        hash: BlockHash,
        difficulty: Option<U256>,
    ) -> CheckpointResult<()> {
        if let Some(existing) = self.points.get(&height) {
            if *existing != hash {
                return Err(CheckpointError::ConflictingCheckpoint {
                    height,
                    existing: *existing,
                    proposed: hash,
                });
            }
        }

        if let (Some(proposed), Some(existing)) =
            (difficulty, self.difficulty_points.get(&height))
        {
            if *existing != proposed {
                return Err(CheckpointError::ConflictingDifficulty {
                    height,
                    existing: *existing,
                    proposed,
                });
            }
        }

        self.points.insert(height, hash);
        if let Some(difficulty) = difficulty {
            self.difficulty_points.insert(height, difficulty);
        }
        Ok(())
    }

    /// True if `height` is at or below the highest checkpoint.
    pub fn in_checkpoint_zone(&self, height: u64) -> bool {
        self.points
            .last_key_value()
            .is_some_and(|(max, _)| height <= *max)
    }

    /// Check a block hash against the checkpoint at `height`, if any.
    pub fn check_block(&self, height: u64, hash: &BlockHash) -> BlockCheck {
        match self.points.get(&height) {
            None => BlockCheck::NotCheckpointed,
            Some(pinned) if pinned == hash => {
                log::info!("CHECKPOINT PASSED FOR HEIGHT {} {}", height, hash);
                BlockCheck::Matches
            }
            Some(pinned) => {
                log::warn!(
                    "CHECKPOINT FAILED FOR HEIGHT {}. EXPECTED HASH: {}, FETCHED HASH: {}",
                    height,
                    pinned,
                    hash
                );
                BlockCheck::Mismatches
            }
        }
    }

    pub fn is_block_valid(&self, height: u64, hash: &BlockHash) -> bool {
        self.check_block(height, hash).passes()
    }

    /// Whether an alternative block at `block_height` may be accepted while the
    /// main chain is `blockchain_height` long.
    ///
    /// An alternative branch may only fork after the last checkpoint at or
    /// below the current chain height. Height 0 is never allowed.
    pub fn is_alternative_block_allowed(&self, blockchain_height: u64, block_height: u64) -> bool {
        if block_height == 0 {
            return false;
        }

        match self.points.range(..=blockchain_height).next_back() {
            // chain has not reached the first checkpoint yet
            None => true,
            Some((checkpoint_height, _)) => *checkpoint_height < block_height,
        }
    }

    /// Highest checkpointed height, 0 when empty.
    pub fn max_height(&self) -> u64 {
        self.points.last_key_value().map(|(h, _)| *h).unwrap_or(0)
    }

    pub fn points(&self) -> &BTreeMap<u64, BlockHash> {
        &self.points
    }

    pub fn difficulty_points(&self) -> &BTreeMap<u64, U256> {
        &self.difficulty_points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Fails if any height pinned in both stores carries different hashes.
    /// Neither store is modified.
    pub fn check_for_conflicts(&self, other: &Checkpoints) -> CheckpointResult<()> {
        for (height, proposed) in other.points() {
            if let Some(existing) = self.points.get(height) {
                if existing != proposed {
                    return Err(CheckpointError::ConflictingCheckpoint {
                        height: *height,
                        existing: *existing,
                        proposed: *proposed,
                    });
                }
            }
        }
        Ok(())
    }
}
