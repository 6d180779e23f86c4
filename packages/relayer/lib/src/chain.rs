//! Types shared between the source chain, the bridge contract and the sync engine.

use std::fmt;

use alloy::{
    consensus::Header,
    eips::BlockNumberOrTag,
    primitives::{Bytes, TxHash, B256},
};

/// A block header fetched from the source chain.
///
/// Holds the full consensus header so that it can be re-encoded exactly the way the source
/// chain hashes it, together with the hash the source chain reported for it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SourceHeader {
    /// The block hash as reported by the source chain.
    pub hash: B256,
    /// The consensus header fields.
    pub header: Header,
}

impl SourceHeader {
    /// Create a new [`SourceHeader`].
    #[must_use]
    pub const fn new(hash: B256, header: Header) -> Self {
        Self { hash, header }
    }

    /// The block number.
    #[must_use]
    pub const fn number(&self) -> u64 {
        self.header.number
    }

    /// The hash of the parent block.
    #[must_use]
    pub const fn parent_hash(&self) -> B256 {
        self.header.parent_hash
    }
}

impl From<alloy::rpc::types::Header> for SourceHeader {
    fn from(header: alloy::rpc::types::Header) -> Self {
        Self {
            hash: header.hash,
            header: header.inner,
        }
    }
}

/// The canonical byte encoding of a header, as submitted to the bridge.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EncodedHeader(Bytes);

impl EncodedHeader {
    /// Wrap already encoded header bytes.
    #[must_use]
    pub const fn new(bytes: Bytes) -> Self {
        Self(bytes)
    }

    /// The encoded bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// The length of the encoding in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if the encoding is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Consume into the inner bytes.
    #[must_use]
    pub fn into_bytes(self) -> Bytes {
        self.0
    }
}

/// A reference to a source chain block.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BlockRef {
    /// The current head of the source chain.
    Latest,
    /// The block at the given number.
    Number(u64),
}

impl From<BlockRef> for BlockNumberOrTag {
    fn from(block: BlockRef) -> Self {
        match block {
            BlockRef::Latest => Self::Latest,
            BlockRef::Number(number) => Self::Number(number),
        }
    }
}

impl fmt::Display for BlockRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Latest => f.write_str("latest"),
            Self::Number(number) => write!(f, "{number}"),
        }
    }
}

/// The record the bridge keeps for an accepted header.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StoredHeader {
    /// The block number of the header.
    pub block_number: u64,
    /// The parent hash of the header.
    pub parent_hash: B256,
}

/// The acknowledgement of a header submission.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SubmitReceipt {
    /// The hash of the submission transaction.
    pub tx_hash: TxHash,
    /// The block the transaction was included in, when the receipt was awaited.
    pub block_number: Option<u64>,
}

/// State scoped to a single sync iteration.
///
/// Created when an iteration starts and dropped when it ends, so nothing in here survives a
/// failed iteration.
#[derive(Debug, Default)]
pub struct SyncIteration {
    /// The block number of the bridge endpoint.
    pub target_block_number: u64,
    /// The source chain head observed at the start of the iteration.
    pub source_latest_number: u64,
    /// The last block both chains agree on.
    pub fork_point: Option<SourceHeader>,
    /// Encoded headers to submit, in increasing block order.
    pub pending_headers: Vec<EncodedHeader>,
}

impl SyncIteration {
    /// How far the bridge lags behind the source chain.
    #[must_use]
    pub const fn blocks_behind(&self) -> i128 {
        self.source_latest_number as i128 - self.target_block_number as i128
    }
}

/// The result of a single sync iteration.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IterationOutcome {
    /// The bridge endpoint was already handled by an earlier iteration.
    AlreadySeen,
    /// The bridge already records the source chain head.
    CaughtUp {
        /// The block number both chains are at.
        block_number: u64,
    },
    /// There was nothing to submit after the fork point.
    EmptyBatch,
    /// A batch of headers was submitted.
    Submitted {
        /// The first submitted block number.
        first: u64,
        /// The last submitted block number.
        last: u64,
        /// The number of submitted headers.
        count: usize,
        /// The submission transaction hash.
        tx_hash: TxHash,
    },
}

impl IterationOutcome {
    /// A short label, used for logs and metrics.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::AlreadySeen => "already_seen",
            Self::CaughtUp { .. } => "caught_up",
            Self::EmptyBatch => "empty_batch",
            Self::Submitted { .. } => "submitted",
        }
    }

    /// Returns true if the engine should wait before the next iteration.
    #[must_use]
    pub const fn is_idle(&self) -> bool {
        !matches!(self, Self::Submitted { .. })
    }
}
