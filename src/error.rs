use thiserror::Error;

/// Why a block cannot extend (or sit in) the chain.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChainError {
    #[error("block {position} prev_hash does not match predecessor hash")]
    BrokenLink { position: u64 },

    #[error("block {position} hash does not match its contents")]
    HashMismatch { position: u64 },

    #[error("block position {actual} does not follow {previous}")]
    PositionGap { previous: u64, actual: u64 },
}
