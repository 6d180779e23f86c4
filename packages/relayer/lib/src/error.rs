//! This module defines the errors raised while relaying headers.

use alloy::{
    primitives::B256,
    transports::{RpcError, TransportError},
};

/// Error types for the header relay.
///
/// Every variant belongs to exactly one of three classes, which decide what the sync loop does
/// with it:
/// - transient ([`RelayError::is_transient`]): retried in place with backoff,
/// - fatal ([`RelayError::is_fatal`]): surfaced to the process boundary,
/// - everything else: the current iteration is abandoned and retried from scratch.
#[derive(Debug, thiserror::Error)]
#[allow(clippy::module_name_repetitions)]
pub enum RelayError {
    /// Provider error
    #[error("provider error: {0}")]
    ProviderError(#[from] TransportError),

    /// A read against the bridge contract failed.
    #[error("bridge contract call `{method}` failed: {source}")]
    ContractRead {
        /// The contract method that was called.
        method: &'static str,
        /// Why the call failed.
        #[source]
        source: alloy::contract::Error,
    },

    /// Block not found error
    #[error("block not found for block {0}")]
    BlockNotFound(String),

    /// The bridge returned a header record that cannot be interpreted.
    #[error("bridge reports an invalid header record for {hash}: {reason}")]
    InvalidStoredHeader {
        /// The queried header hash.
        hash: B256,
        /// Why the record is invalid.
        reason: String,
    },

    /// The submission transaction was rejected, reverted or never acknowledged.
    #[error("header submission rejected: {0}")]
    SubmissionRejected(String),

    /// The rewind reached genesis without meeting a header the bridge knows.
    #[error("no common ancestor found rewinding from block {from}; the bridge tracks a different network")]
    ReorgExhausted {
        /// The block number the rewind started from.
        from: u64,
    },

    /// The rewind walked further back than the configured bound.
    #[error("rewind from block {from} exceeded the maximum depth of {max_depth} blocks")]
    RewindLimitExceeded {
        /// The block number the rewind started from.
        from: u64,
        /// The configured maximum rewind depth.
        max_depth: u64,
    },

    /// The canonical encoding of a header does not hash to the hash the source chain reports.
    #[error("encoded header {number} hashes to {computed}, source chain reports {expected}")]
    EncodingMismatch {
        /// The block number of the header.
        number: u64,
        /// The hash reported by the source chain.
        expected: B256,
        /// The keccak hash of the produced encoding.
        computed: B256,
    },

    /// Invalid relayer configuration.
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl RelayError {
    /// Returns true if the error is a network hiccup worth retrying at the point of failure.
    ///
    /// RPC failures only count when the request never got an answer or the node asked to be
    /// retried; error responses and undecodable replies are fatal.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::ProviderError(err) => is_network_failure(err),
            Self::ContractRead { source, .. } => match source {
                alloy::contract::Error::TransportError(err) => is_network_failure(err),
                _ => false,
            },
            Self::BlockNotFound(_) => true,
            _ => false,
        }
    }

    /// Returns true if the error must terminate the relayer.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::ProviderError(_) | Self::ContractRead { .. } => !self.is_transient(),
            Self::ReorgExhausted { .. }
            | Self::RewindLimitExceeded { .. }
            | Self::EncodingMismatch { .. }
            | Self::InvalidStoredHeader { .. }
            | Self::Config(_) => true,
            Self::BlockNotFound(_) | Self::SubmissionRejected(_) => false,
        }
    }
}

fn is_network_failure(err: &TransportError) -> bool {
    match err {
        RpcError::Transport(_) | RpcError::NullResp => true,
        RpcError::ErrorResp(payload) => payload.is_retry_err(),
        _ => false,
    }
}
