//! Solidity types for `Bridge.sol` and `BridgeBinance.sol`.
//!
//! Both deployments expose the same header-log surface to the relayer, so a single binding
//! covers the proof-of-work and the proof-of-authority variants.

use alloy_primitives::{B256, U256};

#[cfg(feature = "rpc")]
alloy_sol_types::sol!(
    #[sol(rpc)]
    #[derive(Debug, PartialEq, Eq)]
    #[allow(missing_docs, clippy::pedantic)]
    contract Bridge {
        function getLongestChainEndpoint() external view returns (bytes32 hash);
        function getHeader(bytes32 blockHash) external view returns (bytes32 parentHash, uint256 blockNumber, uint256 totalDifficulty);
        function isHeaderStored(bytes32 blockHash) external view returns (bool);
        function submitHeaders(bytes[] calldata rlpHeaders) external;
    }
);

// NOTE: Some environments won't compile with the `rpc` features.
#[cfg(not(feature = "rpc"))]
alloy_sol_types::sol!(
    #[derive(Debug, PartialEq, Eq)]
    #[allow(missing_docs, clippy::pedantic)]
    contract Bridge {
        function getLongestChainEndpoint() external view returns (bytes32 hash);
        function getHeader(bytes32 blockHash) external view returns (bytes32 parentHash, uint256 blockNumber, uint256 totalDifficulty);
        function isHeaderStored(bytes32 blockHash) external view returns (bool);
        function submitHeaders(bytes[] calldata rlpHeaders) external;
    }
);

/// The EVM `uint256` block number the bridge stores, narrowed to the relayer's `u64`.
///
/// Returns `None` when the stored value does not fit, which only a corrupted or foreign
/// contract can produce.
#[must_use]
pub fn narrow_block_number(block_number: U256) -> Option<u64> {
    u64::try_from(block_number).ok()
}

impl Bridge::getHeaderReturn {
    /// Returns the stored block number, if it fits in a `u64`.
    #[must_use]
    pub fn block_number(&self) -> Option<u64> {
        narrow_block_number(self.blockNumber)
    }

    /// Returns the stored parent hash.
    #[must_use]
    pub const fn parent_hash(&self) -> B256 {
        self.parentHash
    }
}

#[cfg(test)]
mod tests {
    use alloy_sol_types::SolCall;

    use super::*;

    #[test]
    fn submit_headers_selector_matches_signature() {
        assert_eq!(Bridge::submitHeadersCall::SIGNATURE, "submitHeaders(bytes[])");
        assert_eq!(
            Bridge::getLongestChainEndpointCall::SIGNATURE,
            "getLongestChainEndpoint()"
        );
    }

    #[test]
    fn narrows_block_numbers() {
        assert_eq!(narrow_block_number(U256::from(95_u64)), Some(95));
        assert_eq!(narrow_block_number(U256::MAX), None);
    }
}
