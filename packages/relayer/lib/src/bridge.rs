//! Defines the [`BridgeContractClient`] trait and its implementation on top of the on-chain
//! bridge contract.

use alloy::{
    network::ReceiptResponse,
    primitives::{Address, TxHash, B256},
    providers::Provider,
};
use header_relay_solidity_types::bridge::Bridge::{self, BridgeInstance};

use crate::{
    chain::{EncodedHeader, StoredHeader, SubmitReceipt},
    error::RelayError,
};

/// Access to the header log kept by the bridge contract on the target chain.
#[async_trait::async_trait]
pub trait BridgeContractClient: Send + Sync {
    /// The hash of the tip of the longest chain the bridge knows.
    async fn current_endpoint(&self) -> Result<B256, RelayError>;

    /// The record the bridge keeps for a header.
    async fn stored_header(&self, hash: B256) -> Result<StoredHeader, RelayError>;

    /// Returns true if the bridge has accepted the header.
    async fn is_header_stored(&self, hash: B256) -> Result<bool, RelayError>;

    /// Submits consecutive encoded headers, in increasing block order, as one transaction.
    async fn submit_headers(&self, headers: Vec<EncodedHeader>)
        -> Result<SubmitReceipt, RelayError>;
}

/// The `BridgeContract` talks to a deployed bridge through an alloy provider.
#[derive(Debug, Clone)]
pub struct BridgeContract<P: Provider> {
    bridge: BridgeInstance<P>,
    confirm_submissions: bool,
}

impl<P: Provider> BridgeContract<P> {
    /// Create a new `BridgeContract`.
    ///
    /// When `confirm_submissions` is set, submissions wait for the transaction receipt and a
    /// reverted transaction is reported as rejected.
    pub fn new(address: Address, provider: P, confirm_submissions: bool) -> Self {
        Self {
            bridge: BridgeInstance::new(address, provider),
            confirm_submissions,
        }
    }

    /// The address of the bridge contract.
    pub fn address(&self) -> &Address {
        self.bridge.address()
    }
}

fn read_failed(method: &'static str) -> impl FnOnce(alloy::contract::Error) -> RelayError {
    move |source| RelayError::ContractRead { method, source }
}

/// Turns the receipt of a submission into a [`SubmitReceipt`], rejecting reverted transactions.
fn confirmed(
    tx_hash: TxHash,
    receipt: &impl ReceiptResponse,
) -> Result<SubmitReceipt, RelayError> {
    if !receipt.status() {
        return Err(RelayError::SubmissionRejected(format!(
            "transaction {tx_hash} reverted"
        )));
    }

    Ok(SubmitReceipt {
        tx_hash,
        block_number: receipt.block_number(),
    })
}

#[async_trait::async_trait]
impl<P: Provider> BridgeContractClient for BridgeContract<P> {
    async fn current_endpoint(&self) -> Result<B256, RelayError> {
        self.bridge
            .getLongestChainEndpoint()
            .call()
            .await
            .map_err(read_failed("getLongestChainEndpoint"))
    }

    async fn stored_header(&self, hash: B256) -> Result<StoredHeader, RelayError> {
        let record: Bridge::getHeaderReturn = self
            .bridge
            .getHeader(hash)
            .call()
            .await
            .map_err(read_failed("getHeader"))?;

        let block_number =
            record
                .block_number()
                .ok_or_else(|| RelayError::InvalidStoredHeader {
                    hash,
                    reason: format!("block number {} does not fit in 64 bits", record.blockNumber),
                })?;

        Ok(StoredHeader {
            block_number,
            parent_hash: record.parent_hash(),
        })
    }

    async fn is_header_stored(&self, hash: B256) -> Result<bool, RelayError> {
        self.bridge
            .isHeaderStored(hash)
            .call()
            .await
            .map_err(read_failed("isHeaderStored"))
    }

    async fn submit_headers(
        &self,
        headers: Vec<EncodedHeader>,
    ) -> Result<SubmitReceipt, RelayError> {
        let headers = headers.into_iter().map(EncodedHeader::into_bytes).collect();

        let pending = self
            .bridge
            .submitHeaders(headers)
            .send()
            .await
            .map_err(|e| RelayError::SubmissionRejected(e.to_string()))?;
        let tx_hash = *pending.tx_hash();
        tracing::debug!(%tx_hash, "Header submission broadcast");

        if !self.confirm_submissions {
            return Ok(SubmitReceipt {
                tx_hash,
                block_number: None,
            });
        }

        let receipt = pending.get_receipt().await.map_err(|e| {
            RelayError::SubmissionRejected(format!("no receipt for {tx_hash}: {e}"))
        })?;
        confirmed(tx_hash, &receipt)
    }
}
