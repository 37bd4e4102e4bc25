//! Data model for checkout events, chain blocks and book metadata.

use serde::{Deserialize, Serialize};
use time::{format_description::well_known::Rfc3339, OffsetDateTime};

use crate::crypto::hash_concat;

/// A book checkout event, committed into a block as its payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HashedRecord {
    pub book_id: String,
    pub user: String,
    /// Caller-supplied; never parsed.
    pub checkout_date: String,
    pub is_genesis: bool,
}

impl HashedRecord {
    /// Payload of the synthetic first block.
    pub fn genesis() -> Self {
        Self {
            is_genesis: true,
            ..Self::default()
        }
    }

    /// Compact JSON in declared field order.
    fn canonical_bytes(&self) -> Vec<u8> {
        // Only strings and a bool: serialization cannot fail.
        serde_json::to_vec(self).unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    /// 1 for genesis; 0 only on the seed block.
    pub position: u64,
    pub payload: HashedRecord,
    /// RFC3339 timestamp string.
    pub timestamp: String,
    /// SHA-256 hex of (position, timestamp, payload, prev_hash).
    pub hash: String,
    /// Hash of the predecessor; empty for the seed.
    pub prev_hash: String,
}

impl Block {
    /// Zero-valued block that genesis is built on top of. Never stored.
    pub fn seed() -> Self {
        Self {
            position: 0,
            payload: HashedRecord::default(),
            timestamp: String::new(),
            hash: String::new(),
            prev_hash: String::new(),
        }
    }

    /// Build the successor of `previous` carrying `payload`, stamped now.
    pub fn create(previous: &Block, payload: HashedRecord) -> Self {
        Self::create_at(previous, payload, now_rfc3339())
    }

    /// Same as [`Block::create`] with an explicit timestamp.
    pub fn create_at(previous: &Block, payload: HashedRecord, timestamp: String) -> Self {
        let mut block = Self {
            position: previous.position + 1,
            payload,
            timestamp,
            hash: String::new(),
            prev_hash: previous.hash.clone(),
        };
        block.hash = block.compute_hash();
        block
    }

    /// Recompute the digest from the block's current fields.
    pub fn compute_hash(&self) -> String {
        hash_concat(&[
            self.position.to_string().as_bytes(),
            self.timestamp.as_bytes(),
            &self.payload.canonical_bytes(),
            self.prev_hash.as_bytes(),
        ])
    }

    /// True when the stored hash still matches the fields.
    pub fn has_valid_hash(&self) -> bool {
        self.compute_hash() == self.hash
    }
}

/// Book metadata record. `id` is assigned server-side.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Book {
    pub id: String,
    pub title: String,
    pub author: String,
    pub publish_date: String,
    pub isbn: String,
}

fn now_rfc3339() -> String {
    let now = OffsetDateTime::now_utc();
    now.format(&Rfc3339)
        .unwrap_or_else(|_| now.unix_timestamp().to_string())
}
