//! The hash chain of checkout blocks and the shared handle used by the server.

use std::sync::{Arc, PoisonError, RwLock};

use crate::error::ChainError;
use crate::model::{Block, HashedRecord};

/// Result of [`HashChain::append`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppendOutcome {
    /// The block now at the tip.
    Accepted(Block),
    /// The candidate was discarded; the chain is unchanged.
    Rejected { reason: ChainError },
}

/// Ordered, append-only blocks. Never empty: index 0 is genesis.
#[derive(Debug)]
pub struct HashChain {
    blocks: Vec<Block>,
}

impl HashChain {
    pub fn initialize() -> Self {
        let genesis = Block::create(&Block::seed(), HashedRecord::genesis());
        Self {
            blocks: vec![genesis],
        }
    }

    pub fn tip(&self) -> &Block {
        // `blocks` starts with genesis and is never truncated.
        &self.blocks[self.blocks.len() - 1]
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    /// Block at a 1-indexed position.
    pub fn get(&self, position: u64) -> Option<&Block> {
        let idx = position.checked_sub(1)?;
        self.blocks.get(usize::try_from(idx).ok()?)
    }

    /// Build a block on the current tip and push it if it validates.
    pub fn append(&mut self, payload: HashedRecord) -> AppendOutcome {
        let previous = self.tip();
        let candidate = Block::create(previous, payload);
        match Self::check_successor(&candidate, previous) {
            Ok(()) => {
                self.blocks.push(candidate.clone());
                AppendOutcome::Accepted(candidate)
            }
            Err(reason) => AppendOutcome::Rejected { reason },
        }
    }

    /// Checks link, own hash, then position; reports the first failure.
    pub fn check_successor(candidate: &Block, previous: &Block) -> Result<(), ChainError> {
        if previous.hash != candidate.prev_hash {
            return Err(ChainError::BrokenLink {
                position: candidate.position,
            });
        }
        if !candidate.has_valid_hash() {
            return Err(ChainError::HashMismatch {
                position: candidate.position,
            });
        }
        if previous.position + 1 != candidate.position {
            return Err(ChainError::PositionGap {
                previous: previous.position,
                actual: candidate.position,
            });
        }
        Ok(())
    }

    pub fn is_valid_successor(candidate: &Block, previous: &Block) -> bool {
        Self::check_successor(candidate, previous).is_ok()
    }

    /// Every broken invariant in chain order; genesis is checked against the seed.
    pub fn audit(&self) -> Vec<ChainError> {
        let seed = Block::seed();
        std::iter::once(&seed)
            .chain(self.blocks.iter())
            .zip(self.blocks.iter())
            .filter_map(|(prev, block)| Self::check_successor(block, prev).err())
            .collect()
    }

    pub fn snapshot(&self) -> Vec<Block> {
        self.blocks.clone()
    }
}

/// Cloneable handle to the process-wide chain.
///
/// Appends hold the write lock across read-tip/build/validate/push; reads share.
#[derive(Debug, Clone)]
pub struct SharedChain {
    inner: Arc<RwLock<HashChain>>,
}

impl SharedChain {
    pub fn new(chain: HashChain) -> Self {
        Self {
            inner: Arc::new(RwLock::new(chain)),
        }
    }

    pub fn append(&self, payload: HashedRecord) -> AppendOutcome {
        // A panic can't leave a half-pushed block behind, so poison is ignored.
        let mut guard = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        guard.append(payload)
    }

    pub fn snapshot(&self) -> Vec<Block> {
        self.read(HashChain::snapshot)
    }

    pub fn get(&self, position: u64) -> Option<Block> {
        self.read(|c| c.get(position).cloned())
    }

    pub fn audit(&self) -> Vec<ChainError> {
        self.read(HashChain::audit)
    }

    pub fn len(&self) -> usize {
        self.read(HashChain::len)
    }

    fn read<T>(&self, f: impl FnOnce(&HashChain) -> T) -> T {
        let guard = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        f(&guard)
    }
}
