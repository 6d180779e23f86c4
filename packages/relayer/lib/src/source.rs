//! Defines the [`SourceChainClient`] trait and its Ethereum RPC implementation.

use alloy::providers::Provider;

use crate::{
    chain::{BlockRef, SourceHeader},
    error::RelayError,
};

/// Read access to the chain whose headers are relayed.
#[async_trait::async_trait]
pub trait SourceChainClient: Send + Sync {
    /// Fetch the header of a block.
    async fn block(&self, block: BlockRef) -> Result<SourceHeader, RelayError>;
}

/// The `EthSourceClient` reads headers over the Ethereum JSON-RPC API.
///
/// Works for any EVM chain that serves Ethereum-shaped headers, including proof-of-authority
/// chains whose seal lives in `extraData`.
#[derive(Debug, Clone)]
#[allow(clippy::module_name_repetitions)]
pub struct EthSourceClient<P: Provider> {
    provider: P,
}

impl<P: Provider> EthSourceClient<P> {
    /// Create a new `EthSourceClient`
    pub const fn new(provider: P) -> Self {
        Self { provider }
    }

    /// Fetches the chain ID of the source chain.
    /// # Errors
    /// Returns an error if the request fails
    pub async fn chain_id(&self) -> Result<u64, RelayError> {
        Ok(self.provider.get_chain_id().await?)
    }
}

#[async_trait::async_trait]
impl<P: Provider> SourceChainClient for EthSourceClient<P> {
    async fn block(&self, block: BlockRef) -> Result<SourceHeader, RelayError> {
        let fetched = self
            .provider
            .get_block_by_number(block.into())
            .await?
            .ok_or_else(|| RelayError::BlockNotFound(block.to_string()))?;

        Ok(fetched.header.into())
    }
}

#[cfg(test)]
mod tests {
    use alloy::{
        consensus::Header,
        primitives::B256,
        providers::ProviderBuilder,
        rpc::types::{Block, Transaction},
        transports::mock::Asserter,
    };

    use super::*;

    fn client(asserter: &Asserter) -> EthSourceClient<impl Provider> {
        EthSourceClient::new(ProviderBuilder::new().connect_mocked_client(asserter.clone()))
    }

    #[tokio::test]
    async fn fetches_headers_with_their_reported_hash() {
        let asserter = Asserter::new();
        let header = Header {
            number: 95,
            parent_hash: B256::repeat_byte(1),
            ..Default::default()
        };
        let block = Block::<Transaction>::empty(alloy::rpc::types::Header::new(header.clone()));
        asserter.push_success(&block);

        let fetched = client(&asserter).block(BlockRef::Number(95)).await.unwrap();

        assert_eq!(fetched.number(), 95);
        assert_eq!(fetched.hash, header.hash_slow());
        assert_eq!(fetched.header, header);
    }

    #[tokio::test]
    async fn unknown_block_is_not_found() {
        let asserter = Asserter::new();
        asserter.push_success(&Option::<()>::None);

        let err = client(&asserter).block(BlockRef::Number(96)).await.unwrap_err();

        assert!(matches!(&err, RelayError::BlockNotFound(block) if block == "96"));
        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn error_response_is_fatal() {
        let asserter = Asserter::new();
        asserter.push_failure_msg("the method eth_getBlockByNumber does not exist");

        let err = client(&asserter).block(BlockRef::Latest).await.unwrap_err();

        assert!(matches!(err, RelayError::ProviderError(_)));
        assert!(err.is_fatal());
    }

    #[tokio::test]
    async fn undecodable_block_is_fatal() {
        let asserter = Asserter::new();
        asserter.push_success(&"not a block");

        let err = client(&asserter).block(BlockRef::Latest).await.unwrap_err();

        assert!(err.is_fatal());
    }

    #[tokio::test]
    async fn unreachable_node_is_transient() {
        let err = client(&Asserter::new())
            .block(BlockRef::Latest)
            .await
            .unwrap_err();

        assert!(err.is_transient());
    }
}
