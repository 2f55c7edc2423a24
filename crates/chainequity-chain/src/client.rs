use std::time::Duration;

use alloy::{
    primitives::{Address as AlloyAddress, B256, U256},
    providers::{Provider, ProviderBuilder, RootProvider, WsConnect},
    rpc::types::Filter,
    transports::BoxTransport,
};
use async_trait::async_trait;
use futures::{stream::BoxStream, StreamExt};

use crate::{contract::IEquityToken, error::ChainClientError};

/// Batch size ceiling for `query_logs`: 1000 blocks per RPC call.
const LOG_RANGE_CHUNK: u64 = 1000;
/// Retry policy for transaction-receipt propagation lag.
const RECEIPT_MAX_RETRIES: u32 = 3;
const RECEIPT_BACKOFF: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy)]
pub struct BlockInfo {
    pub timestamp: u64,
}

#[derive(Debug, Clone)]
pub struct ReceiptInfo {
    pub gas_used: Option<String>,
    pub gas_price: Option<String>,
}

/// A single decoded-agnostic log entry as returned by `query_logs`.
/// Decoding it into a `DecodedEvent` is the decoder crate's job.
#[derive(Debug, Clone)]
pub struct RawLog {
    pub address: AlloyAddress,
    pub topics: Vec<B256>,
    pub data: Vec<u8>,
    pub block_number: u64,
    pub transaction_hash: B256,
    pub log_index: u64,
}

impl TryFrom<alloy::rpc::types::Log> for RawLog {
    type Error = ChainClientError;

    fn try_from(log: alloy::rpc::types::Log) -> Result<Self, Self::Error> {
        Ok(Self {
            address: log.address(),
            topics: log.topics().to_vec(),
            data: log.data().data.to_vec(),
            block_number: log
                .block_number
                .ok_or_else(|| ChainClientError::InvalidResponse("log missing block number".into()))?,
            transaction_hash: log
                .transaction_hash
                .ok_or_else(|| ChainClientError::InvalidResponse("log missing tx hash".into()))?,
            log_index: log
                .log_index
                .ok_or_else(|| ChainClientError::InvalidResponse("log missing log index".into()))?,
        })
    }
}

/// The interface the indexer consumes from a JSON-RPC + subscription
/// provider. `subscribe_new_heads` is allowed to fail (e.g. an HTTP-only
/// transport) — callers fall back to the poll safety net instead.
#[async_trait]
pub trait ChainClient: Send + Sync {
    async fn block_number(&self) -> Result<u64, ChainClientError>;
    async fn get_block(&self, number: u64) -> Result<BlockInfo, ChainClientError>;
    async fn get_transaction_receipt(
        &self,
        tx_hash: B256,
    ) -> Result<Option<ReceiptInfo>, ChainClientError>;
    async fn query_logs(&self, from_block: u64, to_block: u64) -> Result<Vec<RawLog>, ChainClientError>;
    async fn subscribe_new_heads(&self) -> Result<BoxStream<'static, u64>, ChainClientError>;

    async fn balance_of(&self, holder: AlloyAddress) -> Result<U256, ChainClientError>;
    async fn split_multiplier(&self) -> Result<U256, ChainClientError>;
    async fn name(&self) -> Result<String, ChainClientError>;
    async fn symbol(&self) -> Result<String, ChainClientError>;
    async fn decimals(&self) -> Result<u8, ChainClientError>;
    async fn total_supply(&self) -> Result<U256, ChainClientError>;
    async fn is_approved(&self, holder: AlloyAddress) -> Result<bool, ChainClientError>;
}

/// `alloy`-backed implementation configured for exactly one
/// `(url, contractAddress)` pair.
pub struct AlloyChainClient {
    provider: RootProvider<BoxTransport>,
    contract: AlloyAddress,
    supports_subscription: bool,
}

impl AlloyChainClient {
    /// Connect over WebSocket — supports push `newHeads` subscriptions.
    pub async fn connect_ws(url: &str, contract: AlloyAddress) -> Result<Self, ChainClientError> {
        let provider = ProviderBuilder::new()
            .on_ws(WsConnect::new(url))
            .await
            .map_err(|e| ChainClientError::Transport(e.to_string()))?
            .boxed();

        Ok(Self { provider, contract, supports_subscription: true })
    }

    /// Connect over plain HTTP JSON-RPC — `subscribe_new_heads` will error
    /// and the caller must rely on the poll safety net.
    pub fn connect_http(url: &str, contract: AlloyAddress) -> Result<Self, ChainClientError> {
        let url = url.parse().map_err(|_| ChainClientError::Transport(format!("invalid url: {url}")))?;
        let provider = ProviderBuilder::new().on_http(url).boxed();
        Ok(Self { provider, contract, supports_subscription: false })
    }

    fn token(&self) -> IEquityToken::IEquityTokenInstance<BoxTransport, &RootProvider<BoxTransport>> {
        IEquityToken::new(self.contract, &self.provider)
    }
}

#[async_trait]
impl ChainClient for AlloyChainClient {
    async fn block_number(&self) -> Result<u64, ChainClientError> {
        self.provider
            .get_block_number()
            .await
            .map_err(|e| ChainClientError::Rpc(e.to_string()))
    }

    async fn get_block(&self, number: u64) -> Result<BlockInfo, ChainClientError> {
        let block = self
            .provider
            .get_block_by_number(number.into(), false)
            .await
            .map_err(|e| ChainClientError::Rpc(e.to_string()))?
            .ok_or_else(|| ChainClientError::InvalidResponse(format!("block {number} not found")))?;

        Ok(BlockInfo { timestamp: block.header.timestamp })
    }

    async fn get_transaction_receipt(
        &self,
        tx_hash: B256,
    ) -> Result<Option<ReceiptInfo>, ChainClientError> {
        for attempt in 0..RECEIPT_MAX_RETRIES {
            match self.provider.get_transaction_receipt(tx_hash).await {
                Ok(Some(receipt)) => {
                    return Ok(Some(ReceiptInfo {
                        gas_used: Some(receipt.gas_used.to_string()),
                        gas_price: receipt.effective_gas_price.map(|p| p.to_string()),
                    }))
                }
                Ok(None) => {
                    if attempt + 1 < RECEIPT_MAX_RETRIES {
                        tokio::time::sleep(RECEIPT_BACKOFF * (attempt + 1)).await;
                    }
                }
                Err(e) => return Err(ChainClientError::Rpc(e.to_string())),
            }
        }

        // Non-fatal: the indexer persists the event with null gas fields.
        tracing::debug!(tx_hash = %tx_hash, "receipt unavailable after retries, persisting without gas fields");
        Ok(None)
    }

    async fn query_logs(&self, from_block: u64, to_block: u64) -> Result<Vec<RawLog>, ChainClientError> {
        if from_block > to_block {
            return Ok(Vec::new());
        }

        let mut out = Vec::new();
        let mut start = from_block;
        while start <= to_block {
            let end = (start + LOG_RANGE_CHUNK - 1).min(to_block);
            let filter = Filter::new().address(self.contract).from_block(start).to_block(end);
            let logs = self
                .provider
                .get_logs(&filter)
                .await
                .map_err(|e| ChainClientError::Rpc(e.to_string()))?;

            for log in logs {
                out.push(RawLog::try_from(log)?);
            }

            start = end + 1;
        }

        Ok(out)
    }

    async fn subscribe_new_heads(&self) -> Result<BoxStream<'static, u64>, ChainClientError> {
        if !self.supports_subscription {
            return Err(ChainClientError::Transport(
                "transport does not support push subscriptions".into(),
            ));
        }

        let subscription = self
            .provider
            .subscribe_blocks()
            .await
            .map_err(|e| ChainClientError::Rpc(e.to_string()))?;

        Ok(subscription.into_stream().map(|header| header.number).boxed())
    }

    async fn balance_of(&self, holder: AlloyAddress) -> Result<U256, ChainClientError> {
        self.token()
            .balanceOf(holder)
            .call()
            .await
            .map(|r| r._0)
            .map_err(|e| ChainClientError::Rpc(e.to_string()))
    }

    async fn split_multiplier(&self) -> Result<U256, ChainClientError> {
        self.token()
            .splitMultiplier()
            .call()
            .await
            .map(|r| r._0)
            .map_err(|e| ChainClientError::Rpc(e.to_string()))
    }

    async fn name(&self) -> Result<String, ChainClientError> {
        self.token()
            .name()
            .call()
            .await
            .map(|r| r._0)
            .map_err(|e| ChainClientError::Rpc(e.to_string()))
    }

    async fn symbol(&self) -> Result<String, ChainClientError> {
        self.token()
            .symbol()
            .call()
            .await
            .map(|r| r._0)
            .map_err(|e| ChainClientError::Rpc(e.to_string()))
    }

    async fn decimals(&self) -> Result<u8, ChainClientError> {
        self.token()
            .decimals()
            .call()
            .await
            .map(|r| r._0)
            .map_err(|e| ChainClientError::Rpc(e.to_string()))
    }

    async fn total_supply(&self) -> Result<U256, ChainClientError> {
        self.token()
            .totalSupply()
            .call()
            .await
            .map(|r| r._0)
            .map_err(|e| ChainClientError::Rpc(e.to_string()))
    }

    async fn is_approved(&self, holder: AlloyAddress) -> Result<bool, ChainClientError> {
        self.token()
            .isApproved(holder)
            .call()
            .await
            .map(|r| r._0)
            .map_err(|e| ChainClientError::Rpc(e.to_string()))
    }
}
