pub mod checkpoint;
pub mod hardforks;
pub mod network;

pub use checkpoint::{
    BlockCheck, BlockHash, CheckpointError, CheckpointRegistry, Checkpoints, MergeError,
    MergeReport,
};
pub use network::NetworkType;
