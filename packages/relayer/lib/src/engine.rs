//! The sync engine keeps the bridge contract in step with the source chain.
//!
//! Every iteration reads the endpoint of the bridge, finds the last block both chains agree on
//! and submits the source headers that follow it in one bounded batch. Nothing but the
//! [`SeenCache`] survives from one iteration to the next.

use std::time::Duration;

use alloy::primitives::B256;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::{
    bridge::BridgeContractClient,
    chain::{BlockRef, EncodedHeader, IterationOutcome, SourceHeader, SyncIteration},
    encoder::encode_header,
    error::RelayError,
    metrics,
    retry::{with_retry, RetryConfig},
    seen_cache::{SeenCache, DEFAULT_SEEN_CACHE_CAPACITY},
    source::SourceChainClient,
};

/// Tuning of a [`SyncEngine`].
#[derive(Clone, Debug, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Seconds to wait after an idle or failed iteration.
    pub poll_interval_secs: u64,
    /// The maximum number of headers per submission.
    pub max_batch_size: usize,
    /// How far the engine may walk back looking for a common ancestor; `None` is unbounded.
    pub max_rewind_depth: Option<u64>,
    /// The number of bridge endpoints remembered as already relayed from.
    pub seen_cache_capacity: usize,
    /// Retries for reads that fail because of the network.
    pub retry: RetryConfig,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: 5,
            max_batch_size: 10,
            max_rewind_depth: Some(1024),
            seen_cache_capacity: DEFAULT_SEEN_CACHE_CAPACITY,
            retry: RetryConfig::default(),
        }
    }
}

impl SyncConfig {
    /// The wait between idle iterations.
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }
}

/// Relays headers from one source chain into one bridge contract.
pub struct SyncEngine<S, B> {
    network: String,
    source: S,
    bridge: B,
    config: SyncConfig,
    seen: SeenCache,
}

impl<S, B> SyncEngine<S, B>
where
    S: SourceChainClient,
    B: BridgeContractClient,
{
    /// Creates a new [`SyncEngine`] with an empty [`SeenCache`].
    pub fn new(network: impl Into<String>, source: S, bridge: B, config: SyncConfig) -> Self {
        let seen = SeenCache::new(config.seen_cache_capacity);
        Self {
            network: network.into(),
            source,
            bridge,
            config,
            seen,
        }
    }

    /// The name of the network this engine relays.
    #[must_use]
    pub fn network(&self) -> &str {
        &self.network
    }

    /// The endpoints already relayed from.
    #[must_use]
    pub const fn seen(&self) -> &SeenCache {
        &self.seen
    }

    /// Runs sync iterations until `shutdown` is cancelled.
    ///
    /// Recoverable failures abandon the current iteration and the loop tries again after the
    /// poll interval. Cancellation is observed between iterations and while waiting.
    ///
    /// # Errors
    /// Returns the first error for which [`RelayError::is_fatal`] holds.
    pub async fn run(&mut self, shutdown: CancellationToken) -> Result<(), RelayError> {
        info!(
            network = %self.network,
            poll_interval_secs = self.config.poll_interval_secs,
            max_batch_size = self.config.max_batch_size,
            "Starting header sync"
        );

        while !shutdown.is_cancelled() {
            let idle = match self.step().await {
                Ok(outcome) => {
                    metrics::record_iteration(&self.network, outcome.label());
                    outcome.is_idle()
                }
                Err(err) if err.is_fatal() => {
                    error!(network = %self.network, %err, "Header sync failed");
                    metrics::record_iteration(&self.network, "fatal");
                    return Err(err);
                }
                Err(err) => {
                    warn!(network = %self.network, %err, "Sync iteration abandoned");
                    metrics::record_iteration(&self.network, "failed");
                    true
                }
            };

            if idle {
                tokio::select! {
                    () = shutdown.cancelled() => break,
                    () = tokio::time::sleep(self.config.poll_interval()) => {}
                }
            }
        }

        info!(network = %self.network, "Header sync stopped");
        Ok(())
    }

    /// Runs a single sync iteration.
    ///
    /// # Errors
    /// Returns an error if any read fails after its retries, the rewind fails or the submission
    /// is rejected.
    #[tracing::instrument(skip_all, fields(network = %self.network))]
    pub async fn step(&mut self) -> Result<IterationOutcome, RelayError> {
        let retry = &self.config.retry;

        let endpoint = with_retry(retry, "current_endpoint", || {
            self.bridge.current_endpoint()
        })
        .await?;
        if self.seen.contains(&endpoint) {
            debug!(%endpoint, "Bridge endpoint already relayed from");
            return Ok(IterationOutcome::AlreadySeen);
        }

        let stored = with_retry(retry, "stored_header", || {
            self.bridge.stored_header(endpoint)
        })
        .await?;
        let head = with_retry(retry, "latest_block", || {
            self.source.block(BlockRef::Latest)
        })
        .await?;

        let mut iteration = SyncIteration {
            target_block_number: stored.block_number,
            source_latest_number: head.number(),
            ..Default::default()
        };
        info!(
            target_block = iteration.target_block_number,
            source_head = iteration.source_latest_number,
            blocks_behind = %iteration.blocks_behind(),
            "Checked bridge position"
        );
        metrics::record_position(
            &self.network,
            iteration.target_block_number,
            iteration.source_latest_number,
        );

        if iteration.blocks_behind() == 0 {
            return Ok(IterationOutcome::CaughtUp {
                block_number: iteration.target_block_number,
            });
        }
        if iteration.blocks_behind() < 0 {
            warn!(
                target_block = iteration.target_block_number,
                source_head = iteration.source_latest_number,
                "Source chain is behind the bridge"
            );
        }

        let fork_point = self
            .resolve_fork_point(
                iteration.target_block_number,
                iteration.source_latest_number,
            )
            .await?;
        iteration.pending_headers = self
            .collect_batch(&fork_point, iteration.source_latest_number)
            .await?;
        let first = fork_point.number() + 1;
        iteration.fork_point = Some(fork_point);

        if iteration.pending_headers.is_empty() {
            debug!("No headers to submit");
            return Ok(IterationOutcome::EmptyBatch);
        }

        let count = iteration.pending_headers.len();
        let last = first + count as u64 - 1;
        info!(first, last, count, "Submitting block headers");

        let receipt = match self
            .bridge
            .submit_headers(std::mem::take(&mut iteration.pending_headers))
            .await
        {
            Ok(receipt) => receipt,
            Err(err) => {
                metrics::SUBMISSION_FAILURES
                    .with_label_values(&[self.network.as_str()])
                    .inc();
                return Err(err);
            }
        };

        info!(
            first,
            last,
            count,
            tx_hash = %receipt.tx_hash,
            included_in = ?receipt.block_number,
            "Submitted block headers"
        );
        metrics::SUBMITTED_HEADERS
            .with_label_values(&[self.network.as_str()])
            .inc_by(count as u64);
        self.seen.insert(endpoint);

        Ok(IterationOutcome::Submitted {
            first,
            last,
            count,
            tx_hash: receipt.tx_hash,
        })
    }

    /// Finds the newest block at or below `min(target_block_number, source_head)` that the
    /// bridge has stored.
    ///
    /// # Errors
    /// Returns [`RelayError::ReorgExhausted`] if genesis is passed without a match and
    /// [`RelayError::RewindLimitExceeded`] if the walk exceeds the configured depth.
    pub async fn resolve_fork_point(
        &self,
        target_block_number: u64,
        source_head: u64,
    ) -> Result<SourceHeader, RelayError> {
        let retry = &self.config.retry;
        let start = target_block_number.min(source_head);
        let mut cursor = start;

        loop {
            let candidate = with_retry(retry, "block", || {
                self.source.block(BlockRef::Number(cursor))
            })
            .await?;
            let hash = candidate.hash;
            if with_retry(retry, "is_header_stored", || {
                self.bridge.is_header_stored(hash)
            })
            .await?
            {
                if cursor < start {
                    info!(
                        fork_point = cursor,
                        rewound = start - cursor,
                        "Found common ancestor"
                    );
                    metrics::REWOUND_BLOCKS
                        .with_label_values(&[self.network.as_str()])
                        .inc_by(start - cursor);
                }
                return Ok(candidate);
            }

            if cursor == 0 {
                return Err(RelayError::ReorgExhausted { from: start });
            }
            if let Some(max_depth) = self.config.max_rewind_depth {
                if start - cursor + 1 > max_depth {
                    return Err(RelayError::RewindLimitExceeded {
                        from: start,
                        max_depth,
                    });
                }
            }

            debug!(block_number = cursor, %hash, "Header unknown to the bridge, rewinding");
            cursor -= 1;
        }
    }

    /// Fetches and encodes the source headers following `fork_point`, at most
    /// `max_batch_size` of them and none beyond `source_head`.
    ///
    /// Stops early if a fetched header does not extend the previous one, which means the source
    /// chain reorganised mid-collection; the linked prefix is still returned.
    ///
    /// # Errors
    /// Returns an error if a block cannot be fetched or encoded.
    pub async fn collect_batch(
        &self,
        fork_point: &SourceHeader,
        source_head: u64,
    ) -> Result<Vec<EncodedHeader>, RelayError> {
        let retry = &self.config.retry;
        let max_batch_size = self.config.max_batch_size.max(1);
        let mut headers = Vec::new();
        let mut parent: B256 = fork_point.hash;
        let mut cursor = fork_point.number();

        while headers.len() < max_batch_size && cursor < source_head {
            cursor += 1;
            let header = with_retry(retry, "block", || {
                self.source.block(BlockRef::Number(cursor))
            })
            .await?;

            if header.parent_hash() != parent {
                warn!(
                    block_number = cursor,
                    expected_parent = %parent,
                    parent = %header.parent_hash(),
                    "Source chain reorganised while collecting headers, truncating batch"
                );
                break;
            }

            headers.push(encode_header(&header)?);
            parent = header.hash;
        }

        Ok(headers)
    }
}
