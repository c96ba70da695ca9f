//! # Stored Document Entities
//!
//! ## Clusters
//!
//! - **Deltas**: `BlockDelta` - one document per native block actually indexed
//! - **Actions**: `ActionRecord`, `RawAction`, `InternalTransfer` - one document
//!   per indexed EVM transaction
//!
//! Documents are immutable once written. They are created by the ingestion
//! process and only ever deleted in bulk during repair.

use serde::{Deserialize, Serialize};
use std::fmt;

// =============================================================================
// CLUSTER A: DELTAS
// =============================================================================

/// Mapped (EVM) block coordinate nested under `@global`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct GlobalBlock {
    /// EVM block number.
    pub block_num: u64,
}

/// One indexed native chain block.
///
/// `block_num` is the chain-native number; `@global.block_num` is the EVM
/// block number, offset from the native one by a fixed delta.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct BlockDelta {
    /// Ingestion timestamp.
    #[serde(rename = "@timestamp", default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    /// Native block number.
    pub block_num: u64,
    /// Mapped EVM block number.
    #[serde(rename = "@global")]
    pub global: GlobalBlock,
    /// Native block id.
    #[serde(rename = "@blockHash", default, skip_serializing_if = "Option::is_none")]
    pub block_hash: Option<String>,
    /// EVM block hash.
    #[serde(rename = "@evmBlockHash", default, skip_serializing_if = "Option::is_none")]
    pub evm_block_hash: Option<String>,
    /// Parent EVM block hash.
    #[serde(rename = "@evmPrevBlockHash", default, skip_serializing_if = "Option::is_none")]
    pub evm_prev_block_hash: Option<String>,
    /// Receipts trie root.
    #[serde(rename = "@receiptsRootHash", default, skip_serializing_if = "Option::is_none")]
    pub receipts_root_hash: Option<String>,
    /// Transactions trie root.
    #[serde(rename = "@transactionsRoot", default, skip_serializing_if = "Option::is_none")]
    pub transactions_root: Option<String>,
}

impl BlockDelta {
    /// Create a bare delta carrying only its two block coordinates.
    pub fn new(native_block_num: u64, global_block_num: u64) -> Self {
        Self {
            block_num: native_block_num,
            global: GlobalBlock {
                block_num: global_block_num,
            },
            ..Self::default()
        }
    }

    /// Chain-native block number.
    pub fn native_block_num(&self) -> u64 {
        self.block_num
    }

    /// Mapped EVM block number.
    pub fn global_block_num(&self) -> u64 {
        self.global.block_num
    }

    /// Both coordinates, for log lines.
    pub fn block_nums(&self) -> BlockNums {
        BlockNums {
            native: self.block_num,
            global: self.global.block_num,
        }
    }
}

/// `[native|global]` pair rendered with thousands separators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockNums {
    pub native: u64,
    pub global: u64,
}

impl fmt::Display for BlockNums {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}|{}]", group_thousands(self.native), group_thousands(self.global))
    }
}

fn group_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

// =============================================================================
// CLUSTER B: ACTIONS
// =============================================================================

/// One indexed EVM transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ActionRecord {
    /// Ingestion timestamp.
    #[serde(rename = "@timestamp", default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    /// Native transaction id that carried the EVM transaction.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trx_id: Option<String>,
    /// Decoded EVM transaction.
    #[serde(rename = "@raw")]
    pub raw: RawAction,
}

/// Decoded EVM transaction payload nested under `@raw`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct RawAction {
    /// Content-addressed transaction hash, unique across the dataset.
    pub hash: String,
    /// EVM block number (a `BlockDelta` global block number).
    pub block: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    /// Receipt status (1 = success).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<u8>,
    /// Internal value transfers produced while executing the transaction.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub itxs: Vec<InternalTransfer>,
}

/// Internal call recorded by the EVM trace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct InternalTransfer {
    #[serde(rename = "callType", default, skip_serializing_if = "Option::is_none")]
    pub call_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

impl ActionRecord {
    /// Create a bare action carrying only its hash and EVM block.
    pub fn new(hash: impl Into<String>, evm_block_num: u64) -> Self {
        Self {
            raw: RawAction {
                hash: hash.into(),
                block: evm_block_num,
                ..RawAction::default()
            },
            ..Self::default()
        }
    }

    pub fn hash(&self) -> &str {
        &self.raw.hash
    }

    /// EVM block this transaction belongs to.
    pub fn evm_block_num(&self) -> u64 {
        self.raw.block
    }
}
