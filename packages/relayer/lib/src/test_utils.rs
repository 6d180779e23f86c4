//! In-memory source chain and bridge used by the sync engine tests.

use std::{
    collections::{HashMap, HashSet},
    sync::{Arc, Mutex},
};

use alloy::{
    consensus::Header,
    primitives::{Bytes, TxHash, B256},
    rlp::Decodable,
    transports::TransportErrorKind,
};

use crate::{
    bridge::BridgeContractClient,
    chain::{BlockRef, EncodedHeader, SourceHeader, StoredHeader, SubmitReceipt},
    error::RelayError,
    source::SourceChainClient,
};

/// Builds a chain of `len + 1` linked headers starting at genesis.
pub fn build_chain(len: u64, seed: u8) -> Vec<SourceHeader> {
    let genesis = header(0, B256::ZERO, seed);
    let mut chain = vec![genesis];
    extend_chain(&mut chain, len, seed);
    chain
}

/// Builds an alternative branch that forks off after `base`.
pub fn fork_from(base: &SourceHeader, up_to: u64, seed: u8) -> Vec<SourceHeader> {
    let mut chain = vec![base.clone()];
    extend_chain(&mut chain, up_to, seed);
    chain.remove(0);
    chain
}

fn extend_chain(chain: &mut Vec<SourceHeader>, up_to: u64, seed: u8) {
    while let Some(parent) = chain.last().filter(|parent| parent.number() < up_to) {
        let next = header(parent.number() + 1, parent.hash, seed);
        chain.push(next);
    }
}

fn header(number: u64, parent_hash: B256, seed: u8) -> SourceHeader {
    let header = Header {
        parent_hash,
        number,
        gas_limit: 30_000_000,
        timestamp: 1_700_000_000 + number * 12,
        extra_data: Bytes::from(vec![seed]),
        base_fee_per_gas: Some(1_000_000_000),
        ..Default::default()
    };
    SourceHeader::new(header.hash_slow(), header)
}

/// A call recorded by the in-memory clients.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Call {
    Block(BlockRef),
    Endpoint,
    StoredHeader(B256),
    IsStored(B256),
    Submit(Vec<u64>),
}

#[derive(Default)]
struct SourceState {
    blocks: Vec<SourceHeader>,
    corrupted: HashMap<u64, B256>,
    failures_left: usize,
}

/// A source chain served from memory.
#[derive(Clone)]
pub struct MockSource {
    state: Arc<Mutex<SourceState>>,
    calls: Arc<Mutex<Vec<Call>>>,
}

impl MockSource {
    pub fn new(blocks: Vec<SourceHeader>, calls: Arc<Mutex<Vec<Call>>>) -> Self {
        Self {
            state: Arc::new(Mutex::new(SourceState {
                blocks,
                ..Default::default()
            })),
            calls,
        }
    }

    /// Makes the next `count` requests fail with a transport error.
    pub fn fail_next(&self, count: usize) {
        self.state.lock().unwrap().failures_left = count;
    }

    /// Reports a wrong hash for the block at `number`.
    pub fn corrupt_hash(&self, number: u64) {
        self.state
            .lock()
            .unwrap()
            .corrupted
            .insert(number, B256::repeat_byte(0xee));
    }
}

#[async_trait::async_trait]
impl SourceChainClient for MockSource {
    async fn block(&self, block: BlockRef) -> Result<SourceHeader, RelayError> {
        self.calls.lock().unwrap().push(Call::Block(block));

        let mut state = self.state.lock().unwrap();
        if state.failures_left > 0 {
            state.failures_left -= 1;
            return Err(RelayError::ProviderError(TransportErrorKind::custom_str(
                "connection refused",
            )));
        }

        let found = match block {
            BlockRef::Latest => state.blocks.last().cloned(),
            BlockRef::Number(number) => state
                .blocks
                .iter()
                .find(|header| header.number() == number)
                .cloned(),
        };
        let mut found = found.ok_or_else(|| RelayError::BlockNotFound(block.to_string()))?;
        if let Some(hash) = state.corrupted.get(&found.number()) {
            found.hash = *hash;
        }
        Ok(found)
    }
}

struct BridgeState {
    endpoint: B256,
    headers: HashMap<B256, StoredHeader>,
    apply_submissions: bool,
    lose_acknowledgements: bool,
    reject_next: usize,
    submitted: usize,
}

/// A bridge contract kept in memory.
///
/// Accepts a batch only if its first header extends a stored header and every header links to
/// the one before it. Headers that are already stored make the whole batch fail.
#[derive(Clone)]
pub struct MockBridge {
    state: Arc<Mutex<BridgeState>>,
    calls: Arc<Mutex<Vec<Call>>>,
}

impl MockBridge {
    /// Creates a bridge that stores `headers`, with the last one as endpoint.
    pub fn new(headers: &[SourceHeader], calls: Arc<Mutex<Vec<Call>>>) -> Self {
        let endpoint = headers.last().map_or(B256::ZERO, |header| header.hash);
        let headers = headers
            .iter()
            .map(|header| {
                (
                    header.hash,
                    StoredHeader {
                        block_number: header.number(),
                        parent_hash: header.parent_hash(),
                    },
                )
            })
            .collect();

        Self {
            state: Arc::new(Mutex::new(BridgeState {
                endpoint,
                headers,
                apply_submissions: true,
                lose_acknowledgements: false,
                reject_next: 0,
                submitted: 0,
            })),
            calls,
        }
    }

    /// Accepts submissions without ever including them, like a transaction stuck in the mempool.
    pub fn never_apply(&self) {
        self.state.lock().unwrap().apply_submissions = false;
    }

    /// Applies submissions but reports them as failed and keeps serving the old endpoint.
    pub fn lose_acknowledgements(&self) {
        self.state.lock().unwrap().lose_acknowledgements = true;
    }

    /// Rejects the next `count` submissions.
    pub fn reject_next(&self, count: usize) {
        self.state.lock().unwrap().reject_next = count;
    }

    pub fn endpoint(&self) -> B256 {
        self.state.lock().unwrap().endpoint
    }

    pub fn stored_count(&self) -> usize {
        self.state.lock().unwrap().headers.len()
    }

    pub fn contains(&self, hash: &B256) -> bool {
        self.state.lock().unwrap().headers.contains_key(hash)
    }
}

fn decode(encoded: &EncodedHeader) -> SourceHeader {
    let header = Header::decode(&mut encoded.as_bytes()).unwrap();
    SourceHeader::new(header.hash_slow(), header)
}

#[async_trait::async_trait]
impl BridgeContractClient for MockBridge {
    async fn current_endpoint(&self) -> Result<B256, RelayError> {
        self.calls.lock().unwrap().push(Call::Endpoint);
        Ok(self.state.lock().unwrap().endpoint)
    }

    async fn stored_header(&self, hash: B256) -> Result<StoredHeader, RelayError> {
        self.calls.lock().unwrap().push(Call::StoredHeader(hash));
        Ok(self
            .state
            .lock()
            .unwrap()
            .headers
            .get(&hash)
            .copied()
            .unwrap_or(StoredHeader {
                block_number: 0,
                parent_hash: B256::ZERO,
            }))
    }

    async fn is_header_stored(&self, hash: B256) -> Result<bool, RelayError> {
        self.calls.lock().unwrap().push(Call::IsStored(hash));
        Ok(self.state.lock().unwrap().headers.contains_key(&hash))
    }

    async fn submit_headers(
        &self,
        headers: Vec<EncodedHeader>,
    ) -> Result<SubmitReceipt, RelayError> {
        let decoded: Vec<SourceHeader> = headers.iter().map(decode).collect();
        self.calls
            .lock()
            .unwrap()
            .push(Call::Submit(decoded.iter().map(SourceHeader::number).collect()));

        let mut state = self.state.lock().unwrap();
        state.submitted += 1;
        let tx_hash = TxHash::with_last_byte(u8::try_from(state.submitted % 256).unwrap());

        if state.reject_next > 0 {
            state.reject_next -= 1;
            return Err(RelayError::SubmissionRejected("execution reverted".to_string()));
        }
        if !state.apply_submissions {
            return Ok(SubmitReceipt {
                tx_hash,
                block_number: None,
            });
        }

        let Some(first) = decoded.first() else {
            return Err(RelayError::SubmissionRejected("empty batch".to_string()));
        };
        if !state.headers.contains_key(&first.parent_hash()) {
            return Err(RelayError::SubmissionRejected("unknown parent".to_string()));
        }
        for pair in decoded.windows(2) {
            if pair[1].parent_hash() != pair[0].hash {
                return Err(RelayError::SubmissionRejected("broken linkage".to_string()));
            }
        }
        if decoded
            .iter()
            .any(|header| state.headers.contains_key(&header.hash))
        {
            return Err(RelayError::SubmissionRejected(
                "header already stored".to_string(),
            ));
        }

        for header in &decoded {
            state.headers.insert(
                header.hash,
                StoredHeader {
                    block_number: header.number(),
                    parent_hash: header.parent_hash(),
                },
            );
        }
        if state.lose_acknowledgements {
            return Err(RelayError::SubmissionRejected(
                "timed out waiting for receipt".to_string(),
            ));
        }
        if let Some(last) = decoded.last() {
            state.endpoint = last.hash;
        }

        Ok(SubmitReceipt {
            tx_hash,
            block_number: Some(1),
        })
    }
}

/// Returns the decoded block numbers of every submitted batch.
pub fn submissions(calls: &Mutex<Vec<Call>>) -> Vec<Vec<u64>> {
    calls
        .lock()
        .unwrap()
        .iter()
        .filter_map(|call| match call {
            Call::Submit(numbers) => Some(numbers.clone()),
            _ => None,
        })
        .collect()
}

/// Returns every block request.
pub fn block_requests(calls: &Mutex<Vec<Call>>) -> Vec<BlockRef> {
    calls
        .lock()
        .unwrap()
        .iter()
        .filter_map(|call| match call {
            Call::Block(block) => Some(*block),
            _ => None,
        })
        .collect()
}
