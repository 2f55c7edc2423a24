use std::time::Duration;

use alloy_primitives::Address as AlloyAddress;
use chainequity_chain::{AlloyChainClient, ChainClient};
use chainequity_store::Store;
use futures::{stream::BoxStream, StreamExt};
use tokio::time::Instant;

use crate::{
    apply::{apply_prepared_event, prepare_decoded_event},
    backoff::ReconnectPolicy,
    error::IndexerError,
    guard::AutoIndexGuard,
    state::{IndexerState, StateCell, StateHandle},
};

/// Metadata key naming the highest block whose events are fully persisted;
/// advanced monotonically at the end of each sync pass.
const LAST_SYNCED_BLOCK_KEY: &str = "last_synced_block";

#[derive(Debug, Clone)]
pub struct IndexerConfig {
    /// Preferred push-subscription endpoint; `None` means poll-only.
    pub ws_url: Option<String>,
    /// Always-present endpoint used for backfill, `eth_getLogs`, and as the
    /// poll safety net's block-number source.
    pub http_url: String,
    pub contract: AlloyAddress,
    /// Block to start indexing from if the store has no prior state.
    pub start_block: u64,
    pub debounce: Duration,
    pub poll_interval: Duration,
    pub reconnect: ReconnectPolicy,
    pub allow_remote_rpc: bool,
}

impl Default for IndexerConfig {
    fn default() -> Self {
        Self {
            ws_url: None,
            http_url: "http://127.0.0.1:8545".to_string(),
            contract: AlloyAddress::ZERO,
            start_block: 0,
            debounce: Duration::from_millis(400),
            poll_interval: Duration::from_secs(3),
            reconnect: ReconnectPolicy::default(),
            allow_remote_rpc: false,
        }
    }
}

/// Drives the subscribe-or-poll indexing loop: a
/// push subscription (when available) debounced to coalesce bursts of new
/// heads, backstopped by an always-on poll timer so progress never
/// silently stalls, with exponential-backoff reconnect when the
/// subscription drops.
pub struct Indexer {
    store: Store,
    config: IndexerConfig,
    state: StateCell,
    state_handle: StateHandle,
}

impl Indexer {
    pub fn new(store: Store, config: IndexerConfig) -> Result<Self, IndexerError> {
        AutoIndexGuard::check(&config.http_url, config.allow_remote_rpc)?;
        if let Some(ws) = &config.ws_url {
            AutoIndexGuard::check(ws, config.allow_remote_rpc)?;
        }

        let (state, state_handle) = StateCell::new(IndexerState::Starting);
        Ok(Self { store, config, state, state_handle })
    }

    pub fn state_handle(&self) -> StateHandle {
        self.state_handle.clone()
    }

    pub async fn run(&self, mut shutdown: tokio::sync::oneshot::Receiver<()>) -> Result<(), IndexerError> {
        let http_client = AlloyChainClient::connect_http(&self.config.http_url, self.config.contract)?;

        self.state.set(IndexerState::Starting);
        self.run_sync_pass(&http_client).await;
        self.state.set(IndexerState::Running);

        let mut attempt = 0u32;
        let mut subscription = self.try_subscribe().await;

        let mut poll_timer = tokio::time::interval(self.config.poll_interval);
        poll_timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        let mut debounce_deadline: Option<Instant> = None;

        loop {
            tokio::select! {
                biased;

                _ = &mut shutdown => {
                    self.state.set(IndexerState::Stopped);
                    return Ok(());
                }

                head = next_head(&mut subscription), if subscription.is_some() => {
                    match head {
                        Some(_) => {
                            debounce_deadline = Some(Instant::now() + self.config.debounce);
                        }
                        None => {
                            tracing::warn!("subscription stream closed, entering reconnect loop");
                            subscription = None;
                            self.state.set(IndexerState::Reconnecting);
                            subscription = self.reconnect(&mut attempt).await;

                            if subscription.is_none() {
                                // `reconnect` only returns `None` here after
                                // exhausting `max_attempts` — a subscription
                                // can only reach this branch if `ws_url` was
                                // configured in the first place. Per §4.4:
                                // "On exhaustion, transition to STOPPED and
                                // surface fatal."
                                self.state.set(IndexerState::Stopped);
                                return Err(IndexerError::ReconnectExhausted(
                                    self.config.reconnect.max_attempts,
                                ));
                            }
                            self.state.set(IndexerState::Running);
                        }
                    }
                }

                _ = sleep_until_opt(debounce_deadline), if debounce_deadline.is_some() => {
                    debounce_deadline = None;
                    self.state.set(IndexerState::Syncing);
                    self.run_sync_pass(&http_client).await;
                    self.state.set(IndexerState::Running);
                }

                _ = poll_timer.tick() => {
                    self.state.set(IndexerState::Syncing);
                    self.run_sync_pass(&http_client).await;
                    self.state.set(IndexerState::Running);
                }
            }
        }
    }

    async fn try_subscribe(&self) -> Option<BoxStream<'static, u64>> {
        let ws_url = self.config.ws_url.as_ref()?;
        match AlloyChainClient::connect_ws(ws_url, self.config.contract).await {
            Ok(client) => match client.subscribe_new_heads().await {
                Ok(stream) => {
                    tracing::info!("subscribed to new heads");
                    Some(owning_subscription(client, stream))
                }
                Err(e) => {
                    tracing::warn!(error = %e, "subscribe_new_heads unsupported, falling back to poll");
                    None
                }
            },
            Err(e) => {
                tracing::warn!(error = %e, "ws connect failed, falling back to poll");
                None
            }
        }
    }

    async fn reconnect(&self, attempt: &mut u32) -> Option<BoxStream<'static, u64>> {
        let Some(ws_url) = self.config.ws_url.clone() else { return None };

        while *attempt < self.config.reconnect.max_attempts {
            let delay = self.config.reconnect.delay_for(*attempt);
            tokio::time::sleep(delay).await;

            match AlloyChainClient::connect_ws(&ws_url, self.config.contract).await {
                Ok(client) => match client.subscribe_new_heads().await {
                    Ok(stream) => {
                        tracing::info!(attempt, "subscription reconnected");
                        *attempt = 0;
                        return Some(owning_subscription(client, stream));
                    }
                    Err(e) => tracing::warn!(attempt, error = %e, "resubscribe failed"),
                },
                Err(e) => tracing::warn!(attempt, error = %e, "reconnect attempt failed"),
            }

            *attempt += 1;
        }

        tracing::error!(
            max_attempts = self.config.reconnect.max_attempts,
            "exhausted reconnect attempts, stopping indexer"
        );
        None
    }

    /// Runs one sync pass and classifies the outcome per §7's error-handling
    /// policy: a chain/decode error is transient (the range wasn't
    /// committed, so `last_synced_block` is untouched and the next pass
    /// re-arms over the same window) and is logged, not propagated — "the
    /// Indexer surfaces only fatal errors; transient errors are swallowed
    /// after logging." A `Store` error means the final transaction commit
    /// (or a read needed to drive it) failed, which §7 calls fatal: "Store
    /// commit failure. Recovery: abort the process" — continuing would risk
    /// `last_synced_block` drifting out of sync with what's actually
    /// persisted, so the process exits with a non-zero status rather than
    /// looping on a broken store.
    async fn run_sync_pass(&self, chain: &dyn ChainClient) {
        match self.catch_up(chain).await {
            Ok(()) => {}
            Err(err @ (IndexerError::Chain(_) | IndexerError::Decode(_))) => {
                tracing::warn!(error = %err, "transient sync pass failure, will retry on next tick");
            }
            Err(err @ IndexerError::Store(_)) => {
                tracing::error!(error = %err, "fatal store failure during sync pass, aborting process");
                std::process::exit(1);
            }
            Err(err) => {
                tracing::error!(error = %err, "unexpected fatal error during sync pass, aborting process");
                std::process::exit(1);
            }
        }
    }

    /// One sync pass: indexes every block from
    /// `last_synced_block + 1` (or `start_block` on a fresh store) up to the
    /// current chain head, inclusive, then advances `last_synced_block`.
    /// A failure anywhere in the range leaves `last_synced_block` untouched,
    /// so the next pass re-attempts the same window — safe because event
    /// insertion is idempotent on `(transaction_hash, log_index)`.
    async fn catch_up(&self, chain: &dyn ChainClient) -> Result<(), IndexerError> {
        let from_block = match self.store.get_metadata(LAST_SYNCED_BLOCK_KEY).await? {
            Some(raw) => raw
                .parse::<u64>()
                .map_err(|_| IndexerError::Store(chainequity_store::StoreError::Corrupt(format!(
                    "non-numeric {LAST_SYNCED_BLOCK_KEY}: {raw}"
                ))))?
                + 1,
            None => self.config.start_block,
        };
        let to_block = chain.block_number().await?;

        if from_block > to_block {
            return Ok(());
        }

        let logs = chain.query_logs(from_block, to_block).await?;

        // Resolve every log's RPC-dependent side effects up front; the
        // transaction below never awaits the chain. The split
        // multiplier is threaded through in memory rather than re-read from
        // the store, since none of this pass's writes are visible until the
        // whole batch commits at the end.
        let mut multiplier_bps = crate::apply::current_split_multiplier_bps(&self.store).await?;
        let mut prepared = Vec::with_capacity(logs.len());
        for log in logs {
            let Some(decoded) = chainequity_decoder::decode_log(&log)? else { continue };

            let block = chain.get_block(decoded.block_number).await?;
            let receipt = chain
                .get_transaction_receipt(log.transaction_hash)
                .await
                .unwrap_or(None);

            let (event, next_multiplier_bps) = prepare_decoded_event(
                chain,
                multiplier_bps,
                decoded,
                block.timestamp,
                receipt.as_ref().and_then(|r| r.gas_used.clone()),
                receipt.as_ref().and_then(|r| r.gas_price.clone()),
            )
            .await?;
            multiplier_bps = next_multiplier_bps;
            prepared.push(event);
        }

        let mut tx = self.store.begin().await?;
        for event in prepared {
            apply_prepared_event(&mut tx, event).await?;
        }
        tx.set_metadata(LAST_SYNCED_BLOCK_KEY, &to_block.to_string()).await?;
        tx.commit().await?;

        tracing::debug!(from_block, to_block, "sync pass committed");

        Ok(())
    }
}

async fn next_head(subscription: &mut Option<BoxStream<'static, u64>>) -> Option<u64> {
    match subscription {
        Some(stream) => stream.next().await,
        None => futures::future::pending().await,
    }
}

async fn sleep_until_opt(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => futures::future::pending().await,
    }
}

/// Wraps a new-heads stream together with the `AlloyChainClient` it was
/// derived from, so the underlying WS connection isn't dropped the moment
/// `try_subscribe`/`reconnect` return.
struct SubscriptionStream {
    _client: AlloyChainClient,
    inner: BoxStream<'static, u64>,
}

impl futures::Stream for SubscriptionStream {
    type Item = u64;

    fn poll_next(
        mut self: std::pin::Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Option<Self::Item>> {
        self.inner.as_mut().poll_next(cx)
    }
}

fn owning_subscription(
    client: AlloyChainClient,
    inner: BoxStream<'static, u64>,
) -> BoxStream<'static, u64> {
    Box::pin(SubscriptionStream { _client: client, inner })
}

#[cfg(test)]
mod tests {
    use alloy_primitives::{Address as AlloyAddress, B256, U256};
    use async_trait::async_trait;
    use chainequity_chain::{BlockInfo, ChainClientError, RawLog, ReceiptInfo};
    use chainequity_store::Store;

    use super::*;

    /// A `ChainClient` whose `block_number` always fails, standing in for a
    /// transient RPC outage (a dropped connection, a provider timeout).
    struct AlwaysFailsChain;

    #[async_trait]
    impl ChainClient for AlwaysFailsChain {
        async fn block_number(&self) -> Result<u64, ChainClientError> {
            Err(ChainClientError::Rpc("simulated outage".into()))
        }
        async fn get_block(&self, _number: u64) -> Result<BlockInfo, ChainClientError> {
            unreachable!("block_number fails before get_block is ever called")
        }
        async fn get_transaction_receipt(
            &self,
            _tx_hash: B256,
        ) -> Result<Option<ReceiptInfo>, ChainClientError> {
            unreachable!()
        }
        async fn query_logs(&self, _from: u64, _to: u64) -> Result<Vec<RawLog>, ChainClientError> {
            unreachable!()
        }
        async fn subscribe_new_heads(
            &self,
        ) -> Result<futures::stream::BoxStream<'static, u64>, ChainClientError> {
            unreachable!()
        }
        async fn balance_of(&self, _holder: AlloyAddress) -> Result<U256, ChainClientError> {
            unreachable!()
        }
        async fn split_multiplier(&self) -> Result<U256, ChainClientError> {
            unreachable!()
        }
        async fn name(&self) -> Result<String, ChainClientError> {
            unreachable!()
        }
        async fn symbol(&self) -> Result<String, ChainClientError> {
            unreachable!()
        }
        async fn decimals(&self) -> Result<u8, ChainClientError> {
            unreachable!()
        }
        async fn total_supply(&self) -> Result<U256, ChainClientError> {
            unreachable!()
        }
        async fn is_approved(&self, _holder: AlloyAddress) -> Result<bool, ChainClientError> {
            unreachable!()
        }
    }

    fn indexer_for(store: Store) -> Indexer {
        Indexer::new(store, IndexerConfig::default()).expect("default config points at localhost")
    }

    #[tokio::test]
    async fn transient_chain_error_is_swallowed_not_propagated() {
        let store = Store::connect("sqlite::memory:").await.unwrap();
        let indexer = indexer_for(store.clone());

        // Must return (not propagate, not exit) on a transient chain error.
        indexer.run_sync_pass(&AlwaysFailsChain).await;

        // Nothing was committed, so the next pass re-attempts the same
        // range — the window untouched, not advanced past a failed block.
        assert_eq!(store.get_metadata("last_synced_block").await.unwrap(), None);
    }
}
