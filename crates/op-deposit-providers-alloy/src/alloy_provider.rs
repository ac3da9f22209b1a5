//! An [`L1Provider`] implementation backed by an alloy JSON-RPC client.

use alloy_primitives::{keccak256, map::HashMap, Address, Bytes, B256, U256, U64};
use alloy_provider::{Provider, ReqwestProvider};
use alloy_transport::{RpcError, TransportErrorKind};
use async_trait::async_trait;
use lru::LruCache;
use op_deposit_indexer::{
    errors::{IndexerError, IndexerErrorKind},
    traits::L1Provider,
};
use op_deposit_primitives::DepositLog;
use serde::Deserialize;
use std::{num::NonZeroUsize, sync::Mutex, time::Duration};

const LOG_TARGET: &str = "op-deposit-providers-alloy::alloy_provider";

/// Timestamp-cache capacity. Sized a little above the default catch-up batch size so a
/// single realtime check interval estimate never evicts the safe head / safe head - 1 pair
/// it just looked up.
const TIMESTAMP_CACHE_SIZE: usize = 64;

/// Per-call retry budget before a JSON-RPC method is surfaced as a failure: retry up to 3
/// times inside the call, then let the caller reschedule the handler after the retry
/// interval.
const MAX_ATTEMPTS: u32 = 3;

/// The topic0 selector for `TransactionDeposited(address,address,uint256,bytes)`.
const DEPOSIT_EVENT_ABI_HASH: B256 = op_deposit_primitives::DEPOSIT_EVENT_ABI_HASH;

/// Concrete [`L1Provider`] over `alloy-provider`/`reqwest`, with per-call retry/backoff and
/// an LRU cache for block timestamps.
#[derive(Debug)]
pub struct AlloyL1Provider {
    inner: ReqwestProvider,
    timestamp_cache: Mutex<LruCache<u64, u64>>,
}

impl AlloyL1Provider {
    /// Creates a new [`AlloyL1Provider`] wrapping the given alloy provider.
    pub fn new(inner: ReqwestProvider) -> Self {
        Self {
            inner,
            timestamp_cache: Mutex::new(LruCache::new(
                NonZeroUsize::new(TIMESTAMP_CACHE_SIZE).unwrap(),
            )),
        }
    }

    /// Creates a new [`AlloyL1Provider`] from the provided L1 RPC URL.
    pub fn new_http(url: reqwest::Url) -> Self {
        Self::new(ReqwestProvider::new_http(url))
    }

    /// Issues `raw_request` with a fixed retry budget, sleeping briefly between attempts.
    async fn retrying_request<Params, Resp>(
        &self,
        method: &'static str,
        params: Params,
    ) -> Result<Resp, IndexerErrorKind>
    where
        Params: serde::Serialize + Send + Sync + Clone,
        Resp: serde::de::DeserializeOwned + Send,
    {
        crate::inc!(PROVIDER_CALLS, &["l1_provider", method]);
        crate::timer!(START, PROVIDER_RESPONSE_TIME, &["l1_provider", method], timer);

        let mut last_err: Option<RpcError<TransportErrorKind>> = None;
        for attempt in 0..MAX_ATTEMPTS {
            if attempt > 0 {
                tokio::time::sleep(Duration::from_millis(200 * attempt as u64)).await;
            }
            match self.inner.raw_request(method.into(), params.clone()).await {
                Ok(resp) => {
                    crate::timer!(STOP, timer);
                    return Ok(resp);
                }
                Err(e) => {
                    tracing::warn!(target: LOG_TARGET, method, attempt, error = %e, "rpc call failed");
                    last_err = Some(e);
                }
            }
        }
        crate::timer!(DISCARD, timer);
        crate::inc!(PROVIDER_ERRORS, &["l1_provider", method]);
        Err(IndexerError::Rpc { method, source: last_err.unwrap().to_string() }.retryable())
    }
}

/// The JSON shape of an `eth_getLogs`/`eth_getFilterChanges` response entry.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RpcLog {
    address: Address,
    topics: Vec<B256>,
    data: Bytes,
    #[serde(default)]
    removed: bool,
    block_hash: B256,
    block_number: U64,
    log_index: U64,
    transaction_hash: B256,
}

impl From<RpcLog> for DepositLog {
    fn from(log: RpcLog) -> Self {
        Self {
            address: log.address,
            topics: log.topics,
            data: log.data,
            block_hash: log.block_hash,
            block_number: log.block_number.to::<u64>(),
            log_index: log.log_index.to::<u64>(),
            transaction_hash: log.transaction_hash,
            removed: log.removed,
        }
    }
}

/// The subset of an `eth_getBlockByNumber` response this provider reads.
#[derive(Debug, Deserialize)]
struct RpcBlockHeader {
    number: U64,
    timestamp: U64,
}

fn block_tag(n: u64) -> String {
    format!("0x{n:x}")
}

/// Returns the first 4 bytes of `keccak256(signature)`, the Solidity ABI function selector.
fn selector(signature: &str) -> [u8; 4] {
    keccak256(signature.as_bytes())[..4].try_into().expect("4 byte slice")
}

#[async_trait]
impl L1Provider for AlloyL1Provider {
    async fn system_config(
        &self,
        system_config: Address,
    ) -> Result<(Address, u64), IndexerErrorKind> {
        let portal_data: Bytes = selector("optimismPortal()").to_vec().into();
        let portal_return: Bytes = self
            .retrying_request(
                "eth_call",
                serde_json::json!([{ "to": system_config, "data": portal_data }, "latest"]),
            )
            .await?;
        if portal_return.len() < 32 {
            return Err(IndexerError::Rpc {
                method: "eth_call",
                source: "optimismPortal() returned fewer than 32 bytes".into(),
            }
            .retryable());
        }
        let optimism_portal = Address::from_slice(&portal_return[12..32]);

        let start_block_data: Bytes = selector("startBlock()").to_vec().into();
        let start_block_return: Bytes = self
            .retrying_request(
                "eth_call",
                serde_json::json!([{ "to": system_config, "data": start_block_data }, "latest"]),
            )
            .await?;
        if start_block_return.len() < 32 {
            return Err(IndexerError::Rpc {
                method: "eth_call",
                source: "startBlock() returned fewer than 32 bytes".into(),
            }
            .retryable());
        }
        let start_block = U256::from_be_slice(&start_block_return[..32]);
        let start_block_l1: u64 = start_block.try_into().map_err(|_| {
            IndexerError::Rpc {
                method: "eth_call",
                source: "startBlock() returned a value wider than u64".into(),
            }
            .retryable()
        })?;

        Ok((optimism_portal, start_block_l1))
    }

    async fn safe_head(&self) -> Result<u64, IndexerErrorKind> {
        let header: RpcBlockHeader = self
            .retrying_request("eth_getBlockByNumber", serde_json::json!(["safe", false]))
            .await?;
        Ok(header.number.to::<u64>())
    }

    async fn transaction_exists(&self, tx_hash: B256) -> Result<bool, IndexerErrorKind> {
        let receipt: Option<serde_json::Value> = self
            .retrying_request("eth_getTransactionByHash", serde_json::json!([tx_hash]))
            .await?;
        Ok(receipt.is_some())
    }

    async fn get_logs(
        &self,
        address: Address,
        from_block: u64,
        to_block: u64,
    ) -> Result<Vec<DepositLog>, IndexerErrorKind> {
        let logs: Vec<RpcLog> = self
            .retrying_request(
                "eth_getLogs",
                serde_json::json!([{
                    "address": address,
                    "fromBlock": block_tag(from_block),
                    "toBlock": block_tag(to_block),
                    "topics": [DEPOSIT_EVENT_ABI_HASH],
                }]),
            )
            .await?;
        Ok(logs.into_iter().map(DepositLog::from).collect())
    }

    async fn get_logs_from(
        &self,
        address: Address,
        from_block: u64,
    ) -> Result<Vec<DepositLog>, IndexerErrorKind> {
        let logs: Vec<RpcLog> = self
            .retrying_request(
                "eth_getLogs",
                serde_json::json!([{
                    "address": address,
                    "fromBlock": block_tag(from_block),
                    "toBlock": "latest",
                    "topics": [DEPOSIT_EVENT_ABI_HASH],
                }]),
            )
            .await?;
        Ok(logs.into_iter().map(DepositLog::from).collect())
    }

    async fn install_filter(
        &self,
        address: Address,
        from_block: u64,
    ) -> Result<String, IndexerErrorKind> {
        self.retrying_request(
            "eth_newFilter",
            serde_json::json!([{
                "address": address,
                "fromBlock": block_tag(from_block),
                "toBlock": "latest",
                "topics": [DEPOSIT_EVENT_ABI_HASH],
            }]),
        )
        .await
    }

    async fn poll_filter(&self, filter_id: &str) -> Result<Vec<DepositLog>, IndexerErrorKind> {
        match self
            .retrying_request::<_, Vec<RpcLog>>(
                "eth_getFilterChanges",
                serde_json::json!([filter_id]),
            )
            .await
        {
            Ok(logs) => Ok(logs.into_iter().map(DepositLog::from).collect()),
            Err(IndexerErrorKind::Retryable(IndexerError::Rpc { source, .. }))
                if source.to_ascii_lowercase().contains("filter not found") =>
            {
                Err(IndexerError::FilterNotFound(filter_id.to_string()).retryable())
            }
            Err(e) => Err(e),
        }
    }

    async fn uninstall_filter(&self, filter_id: &str) -> Result<(), IndexerErrorKind> {
        let _: bool = self
            .retrying_request("eth_uninstallFilter", serde_json::json!([filter_id]))
            .await?;
        Ok(())
    }

    async fn block_timestamps(
        &self,
        block_numbers: &[u64],
    ) -> Result<HashMap<u64, u64>, IndexerErrorKind> {
        let mut out = HashMap::default();
        let mut misses = Vec::new();
        {
            let mut cache = self.timestamp_cache.lock().unwrap();
            for &n in block_numbers {
                match cache.get(&n) {
                    Some(&ts) => {
                        out.insert(n, ts);
                    }
                    None => misses.push(n),
                }
            }
        }

        // One `eth_getBlockByNumber` per cache miss, behind the LRU; a missing lookup here
        // is degraded, never fatal to the caller.
        for n in misses {
            let header: Result<RpcBlockHeader, IndexerErrorKind> = self
                .retrying_request("eth_getBlockByNumber", serde_json::json!([block_tag(n), false]))
                .await;
            if let Ok(header) = header {
                let ts = header.timestamp.to::<u64>();
                self.timestamp_cache.lock().unwrap().put(n, ts);
                out.insert(n, ts);
            }
        }

        Ok(out)
    }
}
